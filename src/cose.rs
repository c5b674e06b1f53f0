//! COSE_Sign1 envelope (RFC 8152 §4.2): header construction, `Sig_structure1`
//! canonical encoding, signing and multi-candidate verification.
//!
//! Grounded on an earlier `cwt.rs` that built the same 4-element
//! `[protected, unprotected, payload, signature]` array and the
//! `["Signature1", protected, external_aad, payload]` structure to sign over
//! by hand with `ciborium::value::Value`, rather than via a dedicated COSE
//! crate (a dedicated crate like `coset` targets a broader header-parameter
//! surface than this module needs). This keeps that manual-`Value` approach
//! and generalises it from an ES256/PS256-only case to the full
//! six-algorithm set in [`crate::signer`].

use crate::certificate::Certificate;
use crate::config::CoseConfig;
use crate::signer::{self, SignAlgorithm, Signer};
use ciborium::value::{Integer, Value};
use thiserror::Error;

const COSE_SIGN1_TAG: u64 = 18;
const HEADER_ALG: i128 = 1;
const HEADER_KID: i128 = 4;

/// Errors from signing or verifying at the COSE layer.
#[derive(Error, Debug)]
pub enum CoseError {
    /// No candidate certificate's signature validated.
    #[error("no candidate certificate produced a valid signature")]
    NoMatchingSignature,
    /// The COSE `alg` does not match the candidate certificate's key type/curve.
    #[error("algorithm {0:?} does not match certificate key algorithm {1:?}")]
    AlgorithmMismatch(SignAlgorithm, crate::certificate::KeyAlgorithm),
    /// Building or reading key material failed.
    #[error("key error: {0}")]
    KeyError(#[from] crate::certificate::KeyParseError),
    /// Signing failed at the underlying crypto library.
    #[error("signing failed")]
    SigningFailed,
    /// The bytes did not decode as a 4-element COSE_Sign1 array.
    #[error("malformed COSE_Sign1 structure: {0}")]
    Malformed(String),
    /// The protected header had no (or an unrecognised) `alg` value.
    #[error("missing or unrecognised alg header")]
    UnknownAlgorithm,
    /// CBOR decoding of the envelope failed.
    #[error("CBOR error: {0}")]
    CborError(String),
}

impl From<ciborium::de::Error<std::io::Error>> for CoseError {
    fn from(e: ciborium::de::Error<std::io::Error>) -> Self {
        CoseError::CborError(e.to_string())
    }
}

/// A parsed but not-yet-verified COSE_Sign1 envelope.
pub struct CoseSign1 {
    protected_bytes: Vec<u8>,
    unprotected: Vec<(Value, Value)>,
    payload: Vec<u8>,
    signature: Vec<u8>,
}

impl CoseSign1 {
    /// Parses `bytes` as a COSE_Sign1 structure, unwrapping an optional tag 18.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoseError> {
        let value: Value = ciborium::de::from_reader(bytes)?;
        let value = match value {
            Value::Tag(tag, inner) if tag == COSE_SIGN1_TAG => *inner,
            other => other,
        };
        let array = match value {
            Value::Array(items) if items.len() == 4 => items,
            _ => {
                return Err(CoseError::Malformed(
                    "expected a 4-element COSE_Sign1 array".into(),
                ))
            }
        };
        let mut iter = array.into_iter();
        let protected_bytes = match iter.next().unwrap() {
            Value::Bytes(b) => b,
            _ => return Err(CoseError::Malformed("protected header must be bstr".into())),
        };
        let unprotected = match iter.next().unwrap() {
            Value::Map(m) => m,
            _ => return Err(CoseError::Malformed("unprotected header must be a map".into())),
        };
        let payload = match iter.next().unwrap() {
            Value::Bytes(b) => b,
            _ => return Err(CoseError::Malformed("payload must be bstr".into())),
        };
        let signature = match iter.next().unwrap() {
            Value::Bytes(b) => b,
            _ => return Err(CoseError::Malformed("signature must be bstr".into())),
        };
        Ok(CoseSign1 {
            protected_bytes,
            unprotected,
            payload,
            signature,
        })
    }

    /// The decoded CWT payload bytes, still undecoded as CBOR.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The `alg` header value, read from the protected header first and the
    /// unprotected header as a fallback.
    pub fn algorithm(&self) -> Result<SignAlgorithm, CoseError> {
        let protected = decode_header_map(&self.protected_bytes)?;
        find_int(&protected, HEADER_ALG)
            .or_else(|| find_int(&self.unprotected, HEADER_ALG))
            .and_then(SignAlgorithm::from_cose_id)
            .ok_or(CoseError::UnknownAlgorithm)
    }

    /// The `kid` header value, read from the protected header first and the
    /// unprotected header as a fallback.
    pub fn kid(&self) -> Result<Option<Vec<u8>>, CoseError> {
        let protected = decode_header_map(&self.protected_bytes)?;
        let kid = find_bytes(&protected, HEADER_KID).or_else(|| find_bytes(&self.unprotected, HEADER_KID));
        Ok(kid)
    }

    /// Verifies the envelope against `certificate`, trying the algorithm
    /// declared in the header.
    pub fn verify(&self, certificate: &Certificate) -> Result<(), CoseError> {
        let algorithm = self.algorithm()?;
        let to_verify = sig_structure(&self.protected_bytes, &self.payload);
        signer::verify(algorithm, certificate, &to_verify, &self.signature)
    }

    /// Tries every certificate in `candidates` in order, returning the first
    /// that verifies. Several signers can share the same truncated KID, so a
    /// lookup may hand back more than one candidate to try in turn.
    pub fn verify_any<'a, I>(&self, candidates: I) -> Result<&'a Certificate, CoseError>
    where
        I: IntoIterator<Item = &'a Certificate>,
    {
        for cert in candidates {
            if self.verify(cert).is_ok() {
                return Ok(cert);
            }
        }
        Err(CoseError::NoMatchingSignature)
    }
}

/// Signs `payload` (already-CBOR-encoded CWT bytes) with `signer`, producing
/// a complete COSE_Sign1 envelope, optionally wrapped in tag 18 per `config`.
pub fn sign(signer: &Signer, payload: &[u8], config: &CoseConfig) -> Result<Vec<u8>, CoseError> {
    let kid = signer.certificate().kid().to_vec();

    let (protected_entries, unprotected_entries) = if config.kid_in_protected {
        (
            vec![
                (Value::Integer(HEADER_ALG.into()), Value::Integer((signer.algorithm().cose_id()).into())),
                (Value::Integer(HEADER_KID.into()), Value::Bytes(kid)),
            ],
            vec![],
        )
    } else {
        (
            vec![(
                Value::Integer(HEADER_ALG.into()),
                Value::Integer((signer.algorithm().cose_id()).into()),
            )],
            vec![(Value::Integer(HEADER_KID.into()), Value::Bytes(kid))],
        )
    };

    let mut protected_bytes = Vec::new();
    ciborium::ser::into_writer(&Value::Map(protected_entries), &mut protected_bytes)
        .map_err(|e| CoseError::Malformed(e.to_string()))?;

    let to_sign = sig_structure(&protected_bytes, payload);
    let signature = signer.sign(&to_sign)?;

    let array = Value::Array(vec![
        Value::Bytes(protected_bytes),
        Value::Map(unprotected_entries),
        Value::Bytes(payload.to_vec()),
        Value::Bytes(signature),
    ]);

    let value = if config.wrap_tag18 {
        Value::Tag(COSE_SIGN1_TAG, Box::new(array))
    } else {
        array
    };

    let mut out = Vec::new();
    ciborium::ser::into_writer(&value, &mut out).map_err(|e| CoseError::Malformed(e.to_string()))?;
    Ok(out)
}

/// Builds the canonical `Sig_structure1` bytes to sign or verify over
/// (RFC 8152 §4.4), with an empty `external_aad`.
fn sig_structure(protected_bytes: &[u8], payload: &[u8]) -> Vec<u8> {
    let structure = Value::Array(vec![
        Value::Text("Signature1".to_string()),
        Value::Bytes(protected_bytes.to_vec()),
        Value::Bytes(vec![]),
        Value::Bytes(payload.to_vec()),
    ]);
    let mut out = Vec::new();
    ciborium::ser::into_writer(&structure, &mut out).expect("Sig_structure1 is always encodable");
    out
}

fn decode_header_map(bytes: &[u8]) -> Result<Vec<(Value, Value)>, CoseError> {
    if bytes.is_empty() {
        return Ok(vec![]);
    }
    let value: Value = ciborium::de::from_reader(bytes)?;
    match value {
        Value::Map(m) => Ok(m),
        _ => Err(CoseError::Malformed("header must be a CBOR map".into())),
    }
}

fn find_int(entries: &[(Value, Value)], key: i128) -> Option<i128> {
    entries.iter().find_map(|(k, v)| {
        if k == &Value::Integer(Integer::from(key)) {
            v.as_integer().and_then(|i| i128::try_from(i).ok())
        } else {
            None
        }
    })
}

fn find_bytes(entries: &[(Value, Value)], key: i128) -> Option<Vec<u8>> {
    entries.iter().find_map(|(k, v)| {
        if k == &Value::Integer(Integer::from(key)) {
            v.as_bytes().cloned()
        } else {
            None
        }
    })
}
