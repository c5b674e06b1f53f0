#![warn(missing_docs)]
#![doc(html_logo_url = "https://github.com/rust-italia/dgc/raw/main/dgc-rust-logo.svg")]
#![doc = include_str!("../README.md")]

mod base45;
mod certificate;
mod config;
mod cose;
mod cwt;
mod deflate;
mod error;
mod mrz;
mod payload;
mod service;
mod signer;
mod uvci;

pub use crate::base45::{decode as base45_decode, encode as base45_encode, DecodeError as Base45DecodeError};
pub use crate::certificate::{
    Certificate, CertificateProvider, CertificateStore, KeyAlgorithm, KeyLookupError, KeyParseError,
};
pub use crate::config::{CborConfig, CoseConfig, ValidationConfig};
pub use crate::cose::{CoseError, CoseSign1};
pub use crate::cwt::{Audience, Cwt, CwtBuilder, CwtParseError};
pub use crate::deflate::{
    compress as deflate_compress, decompress as deflate_decompress, looks_compressed, DeflateError,
};
pub use crate::error::Error;
pub use crate::mrz::transliterate as mrz_transliterate;
pub use crate::payload::{Dgc, DgcName, Instant, LocalDate, PayloadError, Recovery, Test, Vaccination};
pub use crate::service::{Decoder, Encoder, Metadata};
pub use crate::signer::{PkiCredential, SignAlgorithm, Signer};
pub use crate::uvci::{
    add_checksum as uvci_checksum, checksum as uvci_checksum_char, validate_checksum as uvci_validate_checksum,
    UvciBuilder, UvciError,
};
