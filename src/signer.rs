//! Signature primitives: ECDSA (raw `r‖s`) and RSASSA-PSS, bound to the six
//! COSE algorithms this crate supports.
//!
//! ES256/ES384 and PS256/PS384/PS512 go through `ring`, which already
//! returns (and expects, for verification) the fixed-length `r‖s` encoding
//! for ECDSA rather than DER. `ring` has no P-521 support, so ES512 is
//! implemented against the RustCrypto `p521`/`ecdsa` stack instead (see
//! DESIGN.md); that stack's `Signature::to_bytes()` is also already the
//! fixed-width concatenation, not DER, so no conversion is needed on encode
//! either way. A DER-to-raw converter is kept only for the liberal decode
//! path: a peer is allowed to hand back either raw `r‖s` or a DER-encoded
//! signature, and verification accepts both.

use crate::certificate::{Certificate, KeyAlgorithm};
use crate::cose::CoseError;
use ring::rand::SystemRandom;
use ring::signature as ring_sig;
use signature::{Signer as _, Verifier as _};

/// The six COSE algorithms this crate signs and verifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignAlgorithm {
    /// ECDSA over P-256 with SHA-256.
    Es256,
    /// ECDSA over P-384 with SHA-384.
    Es384,
    /// ECDSA over P-521 with SHA-512.
    Es512,
    /// RSASSA-PSS with SHA-256.
    Ps256,
    /// RSASSA-PSS with SHA-384.
    Ps384,
    /// RSASSA-PSS with SHA-512.
    Ps512,
}

impl SignAlgorithm {
    /// The COSE integer identifier (RFC 8152 §8).
    pub fn cose_id(self) -> i128 {
        match self {
            SignAlgorithm::Es256 => -7,
            SignAlgorithm::Es384 => -35,
            SignAlgorithm::Es512 => -36,
            SignAlgorithm::Ps256 => -37,
            SignAlgorithm::Ps384 => -38,
            SignAlgorithm::Ps512 => -39,
        }
    }

    /// Parses a COSE integer identifier.
    pub fn from_cose_id(id: i128) -> Option<Self> {
        match id {
            -7 => Some(SignAlgorithm::Es256),
            -35 => Some(SignAlgorithm::Es384),
            -36 => Some(SignAlgorithm::Es512),
            -37 => Some(SignAlgorithm::Ps256),
            -38 => Some(SignAlgorithm::Ps384),
            -39 => Some(SignAlgorithm::Ps512),
            _ => None,
        }
    }

    /// For ECDSA algorithms, the byte length of each of `r` and `s`
    /// (32/48/66 for P-256/P-384/P-521); `None` for RSA.
    pub fn ecdsa_component_len(self) -> Option<usize> {
        match self {
            SignAlgorithm::Es256 => Some(32),
            SignAlgorithm::Es384 => Some(48),
            SignAlgorithm::Es512 => Some(66),
            _ => None,
        }
    }

    /// Whether `key_alg` is compatible with this signature algorithm.
    pub fn matches_key(self, key_alg: KeyAlgorithm) -> bool {
        matches!(
            (self, key_alg),
            (SignAlgorithm::Es256, KeyAlgorithm::EcP256)
                | (SignAlgorithm::Es384, KeyAlgorithm::EcP384)
                | (SignAlgorithm::Es512, KeyAlgorithm::EcP521)
                | (SignAlgorithm::Ps256, KeyAlgorithm::Rsa)
                | (SignAlgorithm::Ps384, KeyAlgorithm::Rsa)
                | (SignAlgorithm::Ps512, KeyAlgorithm::Rsa)
        )
    }
}

enum PrivateKey {
    EcdsaRing(ring_sig::EcdsaKeyPair),
    EcdsaP521(p521::ecdsa::SigningKey),
    Rsa(ring_sig::RsaKeyPair),
}

/// A signer: a private key bound to an algorithm and its signer certificate.
///
/// A non-generic struct plus the [`PkiCredential`] trait below, since this
/// crate has exactly one concrete credential shape (a PKCS#8 key plus a DER
/// certificate) but callers may want to stub that shape out in tests.
pub struct Signer {
    algorithm: SignAlgorithm,
    private_key: PrivateKey,
    certificate: Certificate,
}

impl Signer {
    /// Builds a signer from a PKCS#8-encoded private key and the matching
    /// certificate. Fails early if the certificate's Subject has no
    /// country attribute, since the service facade needs it for `iss`.
    pub fn new(
        algorithm: SignAlgorithm,
        pkcs8_der: &[u8],
        certificate: Certificate,
    ) -> Result<Self, CoseError> {
        certificate.country()?;
        let cert_alg = certificate.key_algorithm()?;
        if !algorithm.matches_key(cert_alg) {
            return Err(CoseError::AlgorithmMismatch(algorithm, cert_alg));
        }

        let private_key = match algorithm {
            SignAlgorithm::Es256 => {
                let kp = ring_sig::EcdsaKeyPair::from_pkcs8(
                    &ring_sig::ECDSA_P256_SHA256_FIXED_SIGNING,
                    pkcs8_der,
                )
                .map_err(|_| CoseError::SigningFailed)?;
                PrivateKey::EcdsaRing(kp)
            }
            SignAlgorithm::Es384 => {
                let kp = ring_sig::EcdsaKeyPair::from_pkcs8(
                    &ring_sig::ECDSA_P384_SHA384_FIXED_SIGNING,
                    pkcs8_der,
                )
                .map_err(|_| CoseError::SigningFailed)?;
                PrivateKey::EcdsaRing(kp)
            }
            SignAlgorithm::Es512 => {
                let kp = p521::ecdsa::SigningKey::from_pkcs8_der(pkcs8_der)
                    .map_err(|_| CoseError::SigningFailed)?;
                PrivateKey::EcdsaP521(kp)
            }
            SignAlgorithm::Ps256 | SignAlgorithm::Ps384 | SignAlgorithm::Ps512 => {
                let kp = ring_sig::RsaKeyPair::from_pkcs8(pkcs8_der)
                    .map_err(|_| CoseError::SigningFailed)?;
                PrivateKey::Rsa(kp)
            }
        };

        Ok(Signer {
            algorithm,
            private_key,
            certificate,
        })
    }

    /// The bound signing algorithm.
    pub fn algorithm(&self) -> SignAlgorithm {
        self.algorithm
    }

    /// The signer's certificate (and hence its KID and country).
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Signs `message`, returning the algorithm's wire encoding: fixed
    /// `r‖s` for ECDSA, the raw PSS signature for RSA.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CoseError> {
        match &self.private_key {
            PrivateKey::EcdsaRing(kp) => {
                let rng = SystemRandom::new();
                let sig = kp
                    .sign(&rng, message)
                    .map_err(|_| CoseError::SigningFailed)?;
                Ok(sig.as_ref().to_vec())
            }
            PrivateKey::EcdsaP521(kp) => {
                let sig: p521::ecdsa::Signature = kp.sign(message);
                Ok(sig.to_bytes().to_vec())
            }
            PrivateKey::Rsa(kp) => {
                let padding = match self.algorithm {
                    SignAlgorithm::Ps256 => &ring_sig::RSA_PSS_SHA256,
                    SignAlgorithm::Ps384 => &ring_sig::RSA_PSS_SHA384,
                    SignAlgorithm::Ps512 => &ring_sig::RSA_PSS_SHA512,
                    _ => unreachable!("RSA private key is only ever bound to a PS* algorithm"),
                };
                let rng = SystemRandom::new();
                let mut signature = vec![0u8; kp.public_modulus_len()];
                kp.sign(padding, &rng, message, &mut signature)
                    .map_err(|_| CoseError::SigningFailed)?;
                Ok(signature)
            }
        }
    }
}

/// A credential capable of signing on behalf of a certificate: a trait over
/// three operations — the signer's certificate, its public key bytes, and
/// the ability to produce a signature — so that test suites can stub a
/// credential without going through PKCS#8/DER parsing. [`Signer`] is the
/// one concrete, production implementation.
pub trait PkiCredential {
    /// The credential's certificate (and hence its KID and country).
    fn certificate(&self) -> &Certificate;
    /// The credential's public key bytes, in the shape [`verify`] expects.
    fn public_key(&self) -> Result<Vec<u8>, crate::certificate::KeyParseError>;
    /// Signs `message` with the credential's private key.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CoseError>;
}

impl PkiCredential for Signer {
    fn certificate(&self) -> &Certificate {
        Signer::certificate(self)
    }

    fn public_key(&self) -> Result<Vec<u8>, crate::certificate::KeyParseError> {
        self.certificate.public_key_bytes()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CoseError> {
        Signer::sign(self, message)
    }
}

/// Verifies `signature` over `message` for `certificate`, rejecting the
/// pairing up front if `algorithm` does not bind to the certificate's key
/// type/curve.
pub fn verify(
    algorithm: SignAlgorithm,
    certificate: &Certificate,
    message: &[u8],
    signature: &[u8],
) -> Result<(), CoseError> {
    let key_alg = certificate.key_algorithm()?;
    if !algorithm.matches_key(key_alg) {
        return Err(CoseError::AlgorithmMismatch(algorithm, key_alg));
    }
    let public_key = certificate.public_key_bytes()?;

    match algorithm {
        SignAlgorithm::Es256 => verify_ecdsa_ring(
            &ring_sig::ECDSA_P256_SHA256_FIXED,
            &public_key,
            message,
            signature,
            32,
        ),
        SignAlgorithm::Es384 => verify_ecdsa_ring(
            &ring_sig::ECDSA_P384_SHA384_FIXED,
            &public_key,
            message,
            signature,
            48,
        ),
        SignAlgorithm::Es512 => verify_ecdsa_p521(&public_key, message, signature),
        SignAlgorithm::Ps256 => verify_rsa(
            &ring_sig::RSA_PSS_2048_8192_SHA256,
            &public_key,
            message,
            signature,
        ),
        SignAlgorithm::Ps384 => verify_rsa(
            &ring_sig::RSA_PSS_2048_8192_SHA384,
            &public_key,
            message,
            signature,
        ),
        SignAlgorithm::Ps512 => verify_rsa(
            &ring_sig::RSA_PSS_2048_8192_SHA512,
            &public_key,
            message,
            signature,
        ),
    }
}

fn verify_ecdsa_ring(
    alg: &'static dyn ring_sig::VerificationAlgorithm,
    public_key: &[u8],
    message: &[u8],
    signature: &[u8],
    component_len: usize,
) -> Result<(), CoseError> {
    let raw = if signature.len() == component_len * 2 {
        signature.to_vec()
    } else {
        der_to_raw_ecdsa(signature, component_len).ok_or(CoseError::NoMatchingSignature)?
    };
    ring_sig::UnparsedPublicKey::new(alg, public_key)
        .verify(message, &raw)
        .map_err(|_| CoseError::NoMatchingSignature)
}

fn verify_ecdsa_p521(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), CoseError> {
    use p521::ecdsa::{Signature, VerifyingKey};

    let verifying_key = VerifyingKey::from_sec1_bytes(public_key)
        .map_err(|_| CoseError::NoMatchingSignature)?;

    let raw = if signature.len() == 132 {
        signature.to_vec()
    } else {
        der_to_raw_ecdsa(signature, 66).ok_or(CoseError::NoMatchingSignature)?
    };
    let sig = Signature::try_from(raw.as_slice()).map_err(|_| CoseError::NoMatchingSignature)?;
    verifying_key
        .verify(message, &sig)
        .map_err(|_| CoseError::NoMatchingSignature)
}

fn verify_rsa(
    alg: &'static dyn ring_sig::VerificationAlgorithm,
    public_key: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<(), CoseError> {
    ring_sig::UnparsedPublicKey::new(alg, public_key)
        .verify(message, signature)
        .map_err(|_| CoseError::NoMatchingSignature)
}

/// Converts a DER-encoded ECDSA signature (`SEQUENCE { r INTEGER, s INTEGER }`)
/// into the fixed-length `r‖s` encoding, left-padding/truncating each
/// component to `component_len` bytes. Used only on the liberal decode path;
/// this crate's encoder never emits DER.
fn der_to_raw_ecdsa(der: &[u8], component_len: usize) -> Option<Vec<u8>> {
    // SEQUENCE
    if der.first() != Some(&0x30) {
        return None;
    }
    let (seq_len, mut pos) = read_der_length(der, 1)?;
    if pos + seq_len > der.len() {
        return None;
    }

    let (r, next) = read_der_integer(der, pos)?;
    pos = next;
    let (s, next) = read_der_integer(der, pos)?;
    pos = next;
    let _ = pos;

    let mut out = Vec::with_capacity(component_len * 2);
    out.extend(fixed_width(&r, component_len)?);
    out.extend(fixed_width(&s, component_len)?);
    Some(out)
}

fn read_der_length(data: &[u8], pos: usize) -> Option<(usize, usize)> {
    let first = *data.get(pos)?;
    if first & 0x80 == 0 {
        Some((first as usize, pos + 1))
    } else {
        let num_bytes = (first & 0x7f) as usize;
        let mut len = 0usize;
        for i in 0..num_bytes {
            len = (len << 8) | (*data.get(pos + 1 + i)? as usize);
        }
        Some((len, pos + 1 + num_bytes))
    }
}

fn read_der_integer(data: &[u8], pos: usize) -> Option<(Vec<u8>, usize)> {
    if data.get(pos) != Some(&0x02) {
        return None;
    }
    let (len, start) = read_der_length(data, pos + 1)?;
    let end = start + len;
    if end > data.len() {
        return None;
    }
    Some((data[start..end].to_vec(), end))
}

/// Strips a leading zero sign byte or left-pads with zeros to exactly `len` bytes.
fn fixed_width(component: &[u8], len: usize) -> Option<Vec<u8>> {
    let trimmed = {
        let mut s = component;
        while s.len() > 1 && s[0] == 0 {
            s = &s[1..];
        }
        s
    };
    if trimmed.len() > len {
        return None;
    }
    let mut out = vec![0u8; len - trimmed.len()];
    out.extend_from_slice(trimmed);
    Some(out)
}
