//! Construction-time configuration for the codec/COSE layers.
//!
//! Deliberately not global mutable mappers: these are plain, immutable
//! structs set once at construction and read thereafter. Nothing in this
//! crate mutates a config after it has been handed to a builder.

/// Controls how [`crate::payload::Instant`] fields are serialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CborConfig {
    /// When `true` (the default), `Instant` fields are wrapped in CBOR tag 0
    /// (standard date/time string) on encode. Decoding always accepts tag 0,
    /// tag 1, untagged numeric seconds and untagged ISO date-time text
    /// regardless of this setting.
    pub tag_instants: bool,
}

impl Default for CborConfig {
    fn default() -> Self {
        Self {
            tag_instants: true,
        }
    }
}

/// Controls COSE_Sign1 header placement and outer-tag behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoseConfig {
    /// When `true` (the default) the `kid` header parameter is placed in
    /// the protected header. When `false` it is placed in the unprotected
    /// header instead.
    pub kid_in_protected: bool,
    /// When `true` (the default) the signed structure is wrapped in CBOR
    /// tag 18 on encode. Decoding accepts the tag whether or not it is
    /// present.
    pub wrap_tag18: bool,
}

impl Default for CoseConfig {
    fn default() -> Self {
        Self {
            kid_in_protected: true,
            wrap_tag18: true,
        }
    }
}

/// The instant against which a decoded certificate's `exp` claim is
/// evaluated. Defaults to wall-clock `now`, but is always explicit so tests
/// can replay a fixed instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Seconds since the Unix epoch.
    pub now: i64,
}

impl ValidationConfig {
    /// Builds a validation config pinned to `now` (seconds since epoch).
    pub fn at(now: i64) -> Self {
        Self { now }
    }

    /// Builds a validation config pinned to the current wall-clock time.
    pub fn now() -> Self {
        Self {
            now: chrono::Utc::now().timestamp(),
        }
    }
}
