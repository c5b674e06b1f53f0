//! X.509 signer certificates, KID derivation and the `CertificateProvider`
//! lookup boundary.
//!
//! Grounded on a `trustlist.rs` module that parsed a base64 X.509
//! certificate with `x509_parser` and derived a KID as the first 8 bytes of
//! the SHA-256 digest over the DER bytes. This module keeps that derivation
//! but drops the bespoke JSON trust-list format (distributing trust lists is
//! out of scope here) in favour of a `CertificateProvider` trait this crate
//! calls into, plus a minimal in-memory implementation for tests and simple
//! callers.

use ring::digest;
use thiserror::Error;

/// Errors parsing a certificate or extracting data from it.
#[derive(Error, Debug)]
pub enum KeyParseError {
    /// The DER bytes did not parse as an X.509 certificate.
    #[error("failed to parse X.509 certificate: {0}")]
    X509ParseError(String),
    /// The certificate's Subject DN had no `C=` (country) attribute.
    #[error("certificate subject has no country (C=) attribute")]
    MissingCountry,
    /// The certificate's public key algorithm/curve is not one this crate supports.
    #[error("unsupported public key algorithm")]
    UnsupportedKeyAlgorithm,
}

/// The public-key shape a certificate carries, used to bind a COSE `alg`
/// identifier to a compatible key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    /// EC key on P-256 (used with ES256).
    EcP256,
    /// EC key on P-384 (used with ES384).
    EcP384,
    /// EC key on P-521 (used with ES512).
    EcP521,
    /// RSA key (used with PS256/PS384/PS512).
    Rsa,
}

const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
const OID_P256: &str = "1.2.840.10045.3.1.7";
const OID_P384: &str = "1.3.132.0.34";
const OID_P521: &str = "1.3.132.0.35";
const OID_COUNTRY_NAME: &str = "2.5.4.6";

/// A signer's X.509 certificate, identified on the wire by its KID.
///
/// Holds the owned DER bytes and re-parses lazily (`x509_parser`'s borrowed
/// `X509Certificate` cannot be stored alongside its own buffer without a
/// self-referential struct); the DER was already validated to parse once at
/// construction, so re-parsing here cannot fail.
#[derive(Debug, Clone)]
pub struct Certificate {
    der: Vec<u8>,
}

impl Certificate {
    /// Parses and validates `der` as an X.509 certificate.
    pub fn from_der(der: Vec<u8>) -> Result<Self, KeyParseError> {
        x509_parser::parse_x509_certificate(&der)
            .map_err(|e| KeyParseError::X509ParseError(e.to_string()))?;
        Ok(Certificate { der })
    }

    /// The raw DER bytes.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// The KID: the first 8 bytes of SHA-256 over the DER encoding.
    pub fn kid(&self) -> [u8; 8] {
        let digest = digest::digest(&digest::SHA256, &self.der);
        let mut kid = [0u8; 8];
        kid.copy_from_slice(&digest.as_ref()[..8]);
        kid
    }

    /// The ISO-3166 country from the Subject `C=` attribute.
    pub fn country(&self) -> Result<String, KeyParseError> {
        let (_, cert) = x509_parser::parse_x509_certificate(&self.der)
            .map_err(|e| KeyParseError::X509ParseError(e.to_string()))?;
        cert.subject()
            .iter_attributes()
            .find(|attr| attr.attr_type().to_id_string() == OID_COUNTRY_NAME)
            .and_then(|attr| attr.as_str().ok())
            .map(str::to_string)
            .ok_or(KeyParseError::MissingCountry)
    }

    /// The key algorithm/curve, used for COSE `alg` binding.
    pub fn key_algorithm(&self) -> Result<KeyAlgorithm, KeyParseError> {
        let (_, cert) = x509_parser::parse_x509_certificate(&self.der)
            .map_err(|e| KeyParseError::X509ParseError(e.to_string()))?;
        let spki = &cert.tbs_certificate.subject_pki;
        let alg_oid = spki.algorithm.algorithm.to_id_string();
        match alg_oid.as_str() {
            OID_EC_PUBLIC_KEY => {
                let curve_oid = spki
                    .algorithm
                    .parameters
                    .as_ref()
                    .and_then(|p| p.as_oid().ok())
                    .map(|oid| oid.to_id_string())
                    .ok_or(KeyParseError::UnsupportedKeyAlgorithm)?;
                match curve_oid.as_str() {
                    OID_P256 => Ok(KeyAlgorithm::EcP256),
                    OID_P384 => Ok(KeyAlgorithm::EcP384),
                    OID_P521 => Ok(KeyAlgorithm::EcP521),
                    _ => Err(KeyParseError::UnsupportedKeyAlgorithm),
                }
            }
            OID_RSA_ENCRYPTION => Ok(KeyAlgorithm::Rsa),
            _ => Err(KeyParseError::UnsupportedKeyAlgorithm),
        }
    }

    /// The raw `subjectPublicKey` bit-string contents: a SEC1 point for EC
    /// keys, a PKCS#1 `RSAPublicKey` DER for RSA keys. This is exactly the
    /// shape `ring`'s `UnparsedPublicKey` expects for both families.
    pub fn public_key_bytes(&self) -> Result<Vec<u8>, KeyParseError> {
        let (_, cert) = x509_parser::parse_x509_certificate(&self.der)
            .map_err(|e| KeyParseError::X509ParseError(e.to_string()))?;
        Ok(cert
            .tbs_certificate
            .subject_pki
            .subject_public_key
            .data
            .to_vec())
    }
}

/// Errors the certificate provider boundary surfaces, distinct from
/// verification outcomes: this is the provider's own failure to produce a
/// candidate list (e.g. a backing store being unreachable).
#[derive(Error, Debug)]
#[error("certificate provider error: {0}")]
pub struct KeyLookupError(pub String);

/// The only abstract boundary through which this crate indexes
/// certificates. It never indexes certificates itself — lookup semantics
/// (trust-list distribution, revocation, caching) live entirely on the
/// implementer's side.
pub trait CertificateProvider {
    /// Returns every candidate certificate for `(country, kid)`. When
    /// `country` is absent, every certificate for `kid` is returned; when
    /// `kid` is absent, every certificate for `country`. The core refuses
    /// to call this when both are absent.
    fn lookup(
        &self,
        country: Option<&str>,
        kid: Option<&[u8]>,
    ) -> Result<Vec<Certificate>, KeyLookupError>;
}

/// A minimal in-memory [`CertificateProvider`], suitable for tests and
/// simple single-process callers. Production callers that need trust-list
/// distribution or revocation implement the trait themselves.
#[derive(Debug, Default)]
pub struct CertificateStore {
    certificates: Vec<Certificate>,
}

impl CertificateStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a certificate to the store.
    pub fn add(&mut self, certificate: Certificate) {
        self.certificates.push(certificate);
    }
}

impl CertificateProvider for CertificateStore {
    fn lookup(
        &self,
        country: Option<&str>,
        kid: Option<&[u8]>,
    ) -> Result<Vec<Certificate>, KeyLookupError> {
        Ok(self
            .certificates
            .iter()
            .filter(|cert| {
                let country_matches = country
                    .map(|c| cert.country().map(|cc| cc == c).unwrap_or(false))
                    .unwrap_or(true);
                let kid_matches = kid.map(|k| cert.kid() == k).unwrap_or(true);
                country_matches && kid_matches
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kid_is_deterministic_over_der_bytes() {
        let der = vec![1, 2, 3, 4, 5];
        let cert = Certificate { der: der.clone() };
        let expected = digest::digest(&digest::SHA256, &der);
        assert_eq!(&cert.kid()[..], &expected.as_ref()[..8]);
    }

    #[test]
    fn store_filters_by_kid_only_when_country_absent() {
        let mut store = CertificateStore::new();
        let cert = Certificate {
            der: vec![9, 9, 9],
        };
        let kid = cert.kid();
        store.add(cert);
        let found = store.lookup(None, Some(&kid)).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn store_returns_empty_for_unknown_kid() {
        let store = CertificateStore::new();
        let found = store.lookup(None, Some(&[0u8; 8])).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn from_der_rejects_garbage() {
        assert!(Certificate::from_der(vec![0xde, 0xad, 0xbe, 0xef]).is_err());
    }
}
