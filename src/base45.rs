//! Base45 codec, per draft-faltstrom-base45, over the alphabet
//! `0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:`.
//!
//! This is a thin wrapper over the `base45` crate, preferring to delegate
//! codec primitives to a dedicated crate rather than hand-rolling the
//! alphabet arithmetic. The crate already enforces the rules for decoding:
//! unknown characters, group values that overflow (`>65535` for a 3-char
//! group, `>255` for a trailing 2-char group) and a length `≡ 1 (mod 3)`
//! all surface as [`base45::DecodeError`] variants.

pub use base45::DecodeError;

/// Encodes a byte sequence into its Base45 representation.
///
/// Every 2-byte group expands to 3 characters; a trailing odd byte expands
/// to 2. The encoder never fails: any byte sequence has a Base45 encoding.
pub fn encode(data: &[u8]) -> String {
    base45::encode(data)
}

/// Decodes a Base45 string back into bytes.
///
/// Operates on ASCII bytes only; callers are expected to have already
/// stripped the `HC1:` prefix. No whitespace is trimmed.
pub fn decode(data: &str) -> Result<Vec<u8>, DecodeError> {
    base45::decode(data)
}
