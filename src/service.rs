//! The end-to-end encode/decode facade: orchestrates name normalisation,
//! CBOR, CWT, COSE_Sign1, deflate, Base45 and the `HC1:` envelope into the
//! two operations callers actually want.
//!
//! Grounded on the top-level `dgc.rs`/`trustlist.rs` pairing this crate grew
//! out of, which likewise wired a parsed `Cwt` together with a trust-list
//! lookup and an expiry check behind a couple of free functions. This
//! module keeps that shape but replaces a single always-system-clock check
//! with an injected [`ValidationConfig`], and splits "build the signed
//! bytes" from "wrap them for a barcode" into named raw variants rather
//! than leaving that distinction implicit.

use crate::base45;
use crate::certificate::{Certificate, CertificateProvider};
use crate::config::{CborConfig, CoseConfig, ValidationConfig};
use crate::cose::{self, CoseSign1};
use crate::cwt::{Cwt, CwtBuilder};
use crate::deflate;
use crate::error::Error;
use crate::payload::{Dgc, Instant};
use crate::signer::Signer;
use chrono::Utc;

const HC1_PREFIX: &str = "HC1:";

/// Metadata returned alongside a decoded payload: the certificate that
/// verified the signature, the issuing country, and the CWT's timing claims.
#[derive(Debug, Clone)]
pub struct Metadata {
    /// The certificate whose signature validated.
    pub certificate: Certificate,
    /// `iss`: the issuing country, read from the CWT (also the country
    /// attribute on `certificate`'s Subject, which must agree for `iss` to
    /// have been derivable from it in the first place).
    pub country: Option<String>,
    /// `iat`: seconds since epoch.
    pub issued_at: Option<i64>,
    /// `exp`: seconds since epoch. `None` means the certificate carried no
    /// expiration claim, which is logged but not treated as a failure.
    pub expiration: Option<i64>,
}

/// Builds `"HC1:"`-prefixed barcode strings from DCC payloads.
///
/// Owns a [`Signer`] plus the two construction-time codec configurations;
/// none of the three are mutated after [`Encoder::new`].
pub struct Encoder {
    signer: Signer,
    cbor_config: CborConfig,
    cose_config: CoseConfig,
}

impl Encoder {
    /// Builds an encoder bound to `signer`, with default codec configuration
    /// (tag-0 instants, `kid` in the protected header, outer tag 18).
    pub fn new(signer: Signer) -> Self {
        Encoder {
            signer,
            cbor_config: CborConfig::default(),
            cose_config: CoseConfig::default(),
        }
    }

    /// Overrides the CBOR codec configuration.
    pub fn with_cbor_config(mut self, cbor_config: CborConfig) -> Self {
        self.cbor_config = cbor_config;
        self
    }

    /// Overrides the COSE_Sign1 codec configuration.
    pub fn with_cose_config(mut self, cose_config: CoseConfig) -> Self {
        self.cose_config = cose_config;
        self
    }

    /// Signs `payload`, returning the signed CWT bytes (a COSE_Sign1
    /// envelope) without deflate/Base45/prefix framing — one layer below
    /// [`Encoder::encode`]. `iat` is set to the current wall-clock time.
    pub fn encode_cwt_bytes(&self, payload: &Dgc, expiration: Instant) -> Result<Vec<u8>, Error> {
        self.encode_cwt_bytes_at(payload, expiration, Instant::from_unix_seconds(Utc::now().timestamp()))
    }

    /// Builds a complete `"HC1:"` barcode string: normalise, CBOR-encode,
    /// wrap in a CWT, sign, deflate and Base45-encode. `iat` is set to the
    /// current wall-clock time.
    pub fn encode(&self, payload: &Dgc, expiration: Instant) -> Result<String, Error> {
        let signed = self.encode_cwt_bytes(payload, expiration)?;
        wrap_barcode(&signed)
    }

    /// As [`Encoder::encode_cwt_bytes`], but with an explicit `iat` instead
    /// of the wall clock — used by tests that need a reproducible claim set.
    fn encode_cwt_bytes_at(&self, payload: &Dgc, expiration: Instant, issued_at: Instant) -> Result<Vec<u8>, Error> {
        let mut payload = payload.clone();
        payload.normalise();
        payload
            .validate()
            .map_err(|e| Error::SchemaError(e.to_string()))?;

        let country = self.signer.certificate().country()?;
        let dgc_value = payload.to_value(&self.cbor_config);

        let cwt_bytes = CwtBuilder::new()
            .issuer(country)
            .issued_at(issued_at.unix_seconds())
            .expiration(expiration.unix_seconds())
            .dgc_v1(dgc_value)
            .build();

        Ok(cose::sign(&self.signer, &cwt_bytes, &self.cose_config)?)
    }

    /// As [`Encoder::encode`], but with an explicit `iat`.
    fn encode_at(&self, payload: &Dgc, expiration: Instant, issued_at: Instant) -> Result<String, Error> {
        let signed = self.encode_cwt_bytes_at(payload, expiration, issued_at)?;
        wrap_barcode(&signed)
    }
}

fn wrap_barcode(signed: &[u8]) -> Result<String, Error> {
    let compressed = deflate::compress(signed)?;
    Ok(format!("{HC1_PREFIX}{}", base45::encode(&compressed)))
}

/// Verifies and decodes `"HC1:"` barcode strings into DCC payloads.
///
/// Holds only the construction-time [`ValidationConfig`]; the certificate
/// lookup is always supplied per call, since it is the one boundary this
/// crate never owns itself.
pub struct Decoder {
    validation: ValidationConfig,
}

impl Decoder {
    /// Builds a decoder that validates `exp` against `validation`.
    pub fn new(validation: ValidationConfig) -> Self {
        Decoder { validation }
    }

    /// Verifies and decodes already-signed CWT bytes (a COSE_Sign1
    /// envelope), without stripping a prefix or inflating — the raw variant
    /// mirroring [`Encoder::encode_cwt_bytes`].
    pub fn decode_cwt_bytes(
        &self,
        signed: &[u8],
        provider: &dyn CertificateProvider,
    ) -> Result<(Dgc, Metadata), Error> {
        let envelope = CoseSign1::from_bytes(signed)?;
        let kid = envelope.kid()?;
        let cwt = Cwt::from_bytes(envelope.payload())?;
        let country = cwt.issuer();

        if country.is_none() && kid.is_none() {
            return Err(Error::NoCertificate);
        }

        let candidates = provider
            .lookup(country.as_deref(), kid.as_deref())
            .map_err(|e| Error::KeyLookupError(e.0))?;
        if candidates.is_empty() {
            return Err(Error::NoCertificate);
        }

        let certificate = envelope.verify_any(candidates.iter())?.clone();

        let expiration = cwt.expiration();
        match expiration {
            Some(exp) if exp < self.validation.now => return Err(Error::Expired(exp)),
            Some(_) => {}
            None => log::warn!("decoded CWT carries no exp claim; treating as valid"),
        }

        let dgc = cwt.hcert_v1()?;
        dgc.validate().map_err(|e| Error::SchemaError(e.to_string()))?;

        Ok((
            dgc,
            Metadata {
                certificate,
                country,
                issued_at: cwt.issued_at(),
                expiration,
            },
        ))
    }

    /// Verifies and decodes a complete `"HC1:"` barcode string: strips the
    /// prefix if present (logging only, never failing on its absence),
    /// Base45-decodes, inflates leniently, then delegates to
    /// [`Decoder::decode_cwt_bytes`].
    pub fn decode(&self, data: &str, provider: &dyn CertificateProvider) -> Result<(Dgc, Metadata), Error> {
        let stripped = match data.strip_prefix(HC1_PREFIX) {
            Some(rest) => rest,
            None => {
                log::debug!("decoding input with no '{HC1_PREFIX}' prefix");
                data
            }
        };
        let compressed = base45::decode(stripped)?;
        let signed = deflate::decompress(&compressed, false)?;
        self.decode_cwt_bytes(&signed, provider)
    }
}
