//! CWT (RFC 8392) claims layer: typed accessors over an ordered CBOR map,
//! plus a builder that materialises one.
//!
//! This sits below [`crate::cose`] (which signs/verifies the bytes this
//! module produces) and above [`crate::payload`] (whose CBOR `Value` is
//! embedded under the `hcert` claim). Kept deliberately permissive on
//! decode, in the spirit of an earlier `CwtHeader` parser this grew out of:
//! an unrecognised or malformed claim never aborts the whole parse, only
//! the typed accessor for that claim returns `None`.

use crate::payload::{Dgc, PayloadError};
use ciborium::value::Value;
use std::convert::TryInto;
use thiserror::Error;

const CBOR_WEB_TOKEN_TAG: u64 = 61;

const CLAIM_ISSUER: i128 = 1;
const CLAIM_SUBJECT: i128 = 2;
const CLAIM_AUDIENCE: i128 = 3;
const CLAIM_EXPIRATION: i128 = 4;
const CLAIM_NOT_BEFORE: i128 = 5;
const CLAIM_ISSUED_AT: i128 = 6;
const CLAIM_CWT_ID: i128 = 7;
const CLAIM_HCERT: i128 = -260;
const CLAIM_HCERT_LEGACY: i128 = -65537;
const HCERT_DGC_V1: i128 = 1;

/// Errors parsing a CWT claims map.
#[derive(Error, Debug)]
pub enum CwtParseError {
    /// The bytes were not valid CBOR.
    #[error("cannot parse CWT as CBOR: {0}")]
    CborError(#[from] ciborium::de::Error<std::io::Error>),
    /// The top-level CBOR value (after unwrapping an optional tag 61) was not a map.
    #[error("CWT claims value is not a CBOR map")]
    NotAMap,
    /// Neither `-260` nor `-65537` was present.
    #[error("CWT has no hcert claim")]
    MissingHcert,
    /// The `hcert` claim did not contain a `1` (dgc v1) sub-key.
    #[error("hcert claim has no dgc v1 entry")]
    MissingDgcV1,
    /// The embedded DCC payload failed to parse.
    #[error("cannot parse embedded DCC payload: {0}")]
    InvalidPayload(#[from] PayloadError),
}

/// Either one audience value or several: one value serialises as a CBOR
/// text string, two or more as an array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// A single audience.
    One(String),
    /// Two or more audiences.
    Many(Vec<String>),
}

impl Audience {
    fn to_value(&self) -> Value {
        match self {
            Audience::One(a) => Value::Text(a.clone()),
            Audience::Many(items) => {
                Value::Array(items.iter().cloned().map(Value::Text).collect())
            }
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(Audience::One(s.clone())),
            Value::Array(items) => {
                let strings: Option<Vec<String>> =
                    items.iter().map(|v| v.as_text().map(String::from)).collect();
                strings.map(Audience::Many)
            }
            _ => None,
        }
    }
}

fn claim_key(key: i128) -> Value {
    Value::Integer(key.into())
}

fn find<'a>(claims: &'a [(Value, Value)], key: i128) -> Option<&'a Value> {
    claims
        .iter()
        .find(|(k, _)| k.as_integer().map(i128::from) == Some(key))
        .map(|(_, v)| v)
}

/// A decoded or to-be-encoded CWT claims set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cwt {
    claims: Vec<(Value, Value)>,
}

impl Cwt {
    /// Parses `data` as a CWT claims map, unwrapping an optional outer tag 61.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CwtParseError> {
        let value: Value = ciborium::de::from_reader(data)?;
        let value = match value {
            Value::Tag(tag, inner) if tag == CBOR_WEB_TOKEN_TAG => *inner,
            other => other,
        };
        let claims = match value {
            Value::Map(entries) => entries,
            _ => return Err(CwtParseError::NotAMap),
        };
        Ok(Cwt { claims })
    }

    /// Serialises the claims map to CBOR bytes (no outer tag 61).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        ciborium::ser::into_writer(&Value::Map(self.claims.clone()), &mut out)
            .expect("serialising a Value tree to a Vec is infallible");
        out
    }

    /// `iss` (claim 1).
    pub fn issuer(&self) -> Option<String> {
        find(&self.claims, CLAIM_ISSUER)
            .and_then(Value::as_text)
            .map(String::from)
    }

    /// `sub` (claim 2).
    pub fn subject(&self) -> Option<String> {
        find(&self.claims, CLAIM_SUBJECT)
            .and_then(Value::as_text)
            .map(String::from)
    }

    /// `aud` (claim 3).
    pub fn audience(&self) -> Option<Audience> {
        find(&self.claims, CLAIM_AUDIENCE).and_then(Audience::from_value)
    }

    /// `exp` (claim 4), seconds since epoch.
    pub fn expiration(&self) -> Option<i64> {
        find(&self.claims, CLAIM_EXPIRATION)
            .and_then(Value::as_integer)
            .and_then(|i| i128::from(i).try_into().ok())
    }

    /// `nbf` (claim 5), seconds since epoch.
    pub fn not_before(&self) -> Option<i64> {
        find(&self.claims, CLAIM_NOT_BEFORE)
            .and_then(Value::as_integer)
            .and_then(|i| i128::from(i).try_into().ok())
    }

    /// `iat` (claim 6), seconds since epoch.
    pub fn issued_at(&self) -> Option<i64> {
        find(&self.claims, CLAIM_ISSUED_AT)
            .and_then(Value::as_integer)
            .and_then(|i| i128::from(i).try_into().ok())
    }

    /// `cti` (claim 7).
    pub fn cwt_id(&self) -> Option<Vec<u8>> {
        find(&self.claims, CLAIM_CWT_ID)
            .and_then(Value::as_bytes)
            .cloned()
    }

    /// Reads and decodes the embedded DCC payload from the `hcert` claim.
    ///
    /// Prefers the canonical key `-260`, falling back to the legacy
    /// `-65537` key when only that one is present.
    pub fn hcert_v1(&self) -> Result<Dgc, CwtParseError> {
        let hcert = find(&self.claims, CLAIM_HCERT)
            .or_else(|| find(&self.claims, CLAIM_HCERT_LEGACY))
            .ok_or(CwtParseError::MissingHcert)?;
        let hcert_map = hcert.as_map().ok_or(CwtParseError::MissingHcert)?;
        let dgc_value = hcert_map
            .iter()
            .find(|(k, _)| k.as_integer().map(i128::from) == Some(HCERT_DGC_V1))
            .map(|(_, v)| v)
            .ok_or(CwtParseError::MissingDgcV1)?;
        Ok(Dgc::from_value(dgc_value)?)
    }

    /// Access to an arbitrary claim, for callers that need claims beyond
    /// the typed set above.
    pub fn claim(&self, key: i128) -> Option<&Value> {
        find(&self.claims, key)
    }
}

/// Fluent, owned builder for a [`Cwt`]'s claims map.
#[derive(Debug, Default)]
pub struct CwtBuilder {
    claims: Vec<(Value, Value)>,
}

impl CwtBuilder {
    /// Starts an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `iss` (claim 1).
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.claims.push((claim_key(CLAIM_ISSUER), Value::Text(issuer.into())));
        self
    }

    /// Sets `sub` (claim 2).
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.claims.push((claim_key(CLAIM_SUBJECT), Value::Text(subject.into())));
        self
    }

    /// Sets `aud` (claim 3).
    pub fn audience(mut self, audience: Audience) -> Self {
        self.claims.push((claim_key(CLAIM_AUDIENCE), audience.to_value()));
        self
    }

    /// Sets `exp` (claim 4), seconds since epoch.
    pub fn expiration(mut self, exp: i64) -> Self {
        self.claims.push((claim_key(CLAIM_EXPIRATION), Value::Integer(exp.into())));
        self
    }

    /// Sets `nbf` (claim 5), seconds since epoch.
    pub fn not_before(mut self, nbf: i64) -> Self {
        self.claims.push((claim_key(CLAIM_NOT_BEFORE), Value::Integer(nbf.into())));
        self
    }

    /// Sets `iat` (claim 6), seconds since epoch.
    pub fn issued_at(mut self, iat: i64) -> Self {
        self.claims.push((claim_key(CLAIM_ISSUED_AT), Value::Integer(iat.into())));
        self
    }

    /// Sets `cti` (claim 7).
    pub fn cwt_id(mut self, id: Vec<u8>) -> Self {
        self.claims.push((claim_key(CLAIM_CWT_ID), Value::Bytes(id)));
        self
    }

    /// Places `dgc_value` (the DCC payload, already decoded to CBOR) under
    /// `-260 → {1: dgc_value}`. The value at key 1 is a decoded CBOR object,
    /// never a byte string — this is on-wire visible and is what
    /// distinguishes `hcert` from an opaque blob claim.
    pub fn dgc_v1(mut self, dgc_value: Value) -> Self {
        let hcert = Value::Map(vec![(claim_key(HCERT_DGC_V1), dgc_value)]);
        self.claims.push((claim_key(CLAIM_HCERT), hcert));
        self
    }

    /// Escape hatch: sets an arbitrary integer-keyed claim to a decoded value.
    pub fn claim(mut self, key: i128, value: Value) -> Self {
        self.claims.push((claim_key(key), value));
        self
    }

    /// Escape hatch: sets an arbitrary integer-keyed claim from raw CBOR bytes.
    pub fn claim_raw(mut self, key: i128, raw: &[u8]) -> Result<Self, CwtParseError> {
        let value: Value = ciborium::de::from_reader(raw)?;
        self.claims.push((claim_key(key), value));
        Ok(self)
    }

    /// Materialises the claims map and serialises it to CBOR bytes.
    pub fn build(self) -> Vec<u8> {
        Cwt { claims: self.claims }.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CborConfig;
    use crate::payload::Dgc;

    fn sample_dgc_value() -> Value {
        let dgc = Dgc {
            version: "1.3.0".into(),
            ..Default::default()
        };
        dgc.to_value(&CborConfig::default())
    }

    #[test]
    fn builds_and_parses_typed_claims() {
        let bytes = CwtBuilder::new()
            .issuer("SE")
            .issued_at(1_000)
            .expiration(2_000)
            .cwt_id(vec![1, 2, 3])
            .build();

        let cwt = Cwt::from_bytes(&bytes).unwrap();
        assert_eq!(cwt.issuer().as_deref(), Some("SE"));
        assert_eq!(cwt.issued_at(), Some(1_000));
        assert_eq!(cwt.expiration(), Some(2_000));
        assert_eq!(cwt.cwt_id(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn unwraps_the_optional_cwt_tag() {
        let inner = CwtBuilder::new().issuer("IT").build();
        let inner_value: Value = ciborium::de::from_reader(inner.as_slice()).unwrap();
        let tagged = Value::Tag(CBOR_WEB_TOKEN_TAG, Box::new(inner_value));
        let mut tagged_bytes = Vec::new();
        ciborium::ser::into_writer(&tagged, &mut tagged_bytes).unwrap();

        let cwt = Cwt::from_bytes(&tagged_bytes).unwrap();
        assert_eq!(cwt.issuer().as_deref(), Some("IT"));
    }

    #[test]
    fn reads_dgc_v1_from_hcert_claim() {
        let bytes = CwtBuilder::new().dgc_v1(sample_dgc_value()).build();
        let cwt = Cwt::from_bytes(&bytes).unwrap();
        let dgc = cwt.hcert_v1().unwrap();
        assert_eq!(dgc.version, "1.3.0");
    }

    #[test]
    fn falls_back_to_the_legacy_hcert_key() {
        let hcert = Value::Map(vec![(claim_key(HCERT_DGC_V1), sample_dgc_value())]);
        let bytes = CwtBuilder::new().claim(CLAIM_HCERT_LEGACY, hcert).build();
        let cwt = Cwt::from_bytes(&bytes).unwrap();
        assert_eq!(cwt.hcert_v1().unwrap().version, "1.3.0");
    }

    #[test]
    fn prefers_the_canonical_hcert_key_when_both_are_present() {
        let legacy = Value::Map(vec![(
            claim_key(HCERT_DGC_V1),
            Dgc {
                version: "0.0.1".into(),
                ..Default::default()
            }
            .to_value(&CborConfig::default()),
        )]);
        let bytes = CwtBuilder::new()
            .claim(CLAIM_HCERT_LEGACY, legacy)
            .dgc_v1(sample_dgc_value())
            .build();
        let cwt = Cwt::from_bytes(&bytes).unwrap();
        assert_eq!(cwt.hcert_v1().unwrap().version, "1.3.0");
    }

    #[test]
    fn audience_collapses_a_single_value_to_a_scalar() {
        let bytes = CwtBuilder::new()
            .audience(Audience::One("AT".into()))
            .build();
        let cwt = Cwt::from_bytes(&bytes).unwrap();
        assert_eq!(cwt.audience(), Some(Audience::One("AT".into())));
    }
}
