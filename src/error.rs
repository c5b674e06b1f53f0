use crate::cose::CoseError;
use crate::cwt::CwtParseError;
use crate::mrz::MrzError;
use crate::uvci::UvciError;
use thiserror::Error;

/// The closed error taxonomy for the whole pipeline (encode, decode, sign, verify).
///
/// Every layer (Base45, deflate, CBOR, CWT, COSE) keeps its own granular
/// error type so that a caller inspecting that layer directly gets precise
/// variants; this is the facade-level error [`crate::service`] returns,
/// wrapping the others rather than re-describing them.
#[derive(Error, Debug)]
pub enum Error {
    /// A DCC payload failed a structural invariant on encode or decode
    /// (empty entry list, duplicate UVCI, out-of-range dose number, ...).
    #[error("schema error: {0}")]
    SchemaError(String),

    /// Malformed CBOR at any layer.
    #[error("CBOR error: {0}")]
    CborError(String),

    /// Invalid Base45 alphabet character or group value.
    #[error("Base45 error: {0}")]
    Base45Error(#[from] base45::DecodeError),

    /// Inflate failed in strict mode.
    #[error("compression error: {0}")]
    CompressionError(String),

    /// The signature did not validate for any candidate certificate, or the
    /// algorithm does not match the candidate's key type/curve.
    #[error("signature failure: {0}")]
    SignatureFailure(String),

    /// The provider returned no certificates and neither a country nor a KID
    /// could be derived to narrow the lookup.
    #[error("no certificate available to verify the signature")]
    NoCertificate,

    /// The signature verified but `exp` is earlier than the validation instant.
    #[error("certificate expired at {0}")]
    Expired(i64),

    /// The certificate provider surfaced its own error.
    #[error("key lookup error: {0}")]
    KeyLookupError(String),

    /// Internal consistency failure; should never surface in correct use.
    #[error("internal invariant violation: {0}")]
    InvariantViolation(String),
}

impl From<ciborium::de::Error<std::io::Error>> for Error {
    fn from(e: ciborium::de::Error<std::io::Error>) -> Self {
        Error::CborError(e.to_string())
    }
}

impl From<ciborium::ser::Error<std::io::Error>> for Error {
    fn from(e: ciborium::ser::Error<std::io::Error>) -> Self {
        Error::CborError(e.to_string())
    }
}

impl From<CwtParseError> for Error {
    fn from(e: CwtParseError) -> Self {
        match e {
            CwtParseError::CborError(inner) => Error::CborError(inner.to_string()),
            CwtParseError::InvalidPayload(inner) => Error::SchemaError(inner.to_string()),
            other => Error::CborError(other.to_string()),
        }
    }
}

impl From<CoseError> for Error {
    fn from(e: CoseError) -> Self {
        match e {
            CoseError::NoMatchingSignature => Error::SignatureFailure(e.to_string()),
            CoseError::AlgorithmMismatch(_, _) => Error::SignatureFailure(e.to_string()),
            other => Error::SignatureFailure(other.to_string()),
        }
    }
}

impl From<MrzError> for Error {
    fn from(e: MrzError) -> Self {
        Error::SchemaError(e.to_string())
    }
}

impl From<UvciError> for Error {
    fn from(e: UvciError) -> Self {
        Error::SchemaError(e.to_string())
    }
}

impl From<crate::deflate::DeflateError> for Error {
    fn from(e: crate::deflate::DeflateError) -> Self {
        Error::CompressionError(e.to_string())
    }
}
