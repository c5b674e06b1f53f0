//! Raw zlib compression around the signed CWT bytes.
//!
//! Encoding always uses maximum compression (`flate2::Compression::best()`,
//! following the pattern used by ecosystem DCC/HCERT encoders that wrap a
//! `ZlibEncoder` around the CBOR payload). Decoding uses the `inflate` crate,
//! matching an earlier `parse.rs::decompress`, with a strict/lenient switch:
//! lenient mode swallows a framing error and returns the input unchanged,
//! on the theory that it was never actually compressed in the first place.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;
use thiserror::Error;

/// Errors from the deflate layer.
#[derive(Error, Debug)]
pub enum DeflateError {
    /// The data could not be inflated and strict mode was requested.
    #[error("could not decompress the data: {0}")]
    Inflate(String),
    /// Writing to the in-memory zlib encoder failed (should not happen for a `Vec` sink).
    #[error("could not compress the data: {0}")]
    Deflate(String),
}

/// Compresses `data` with raw zlib framing at maximum compression.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, DeflateError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(data)
        .map_err(|e| DeflateError::Deflate(e.to_string()))?;
    encoder.finish().map_err(|e| DeflateError::Deflate(e.to_string()))
}

/// Decompresses `data`.
///
/// In strict mode a framing error is propagated as [`DeflateError::Inflate`].
/// In lenient mode a framing error is swallowed and the input is returned
/// unchanged, which is what [`crate::service`] uses on the decode path so a
/// certificate that was never actually compressed can still be read.
pub fn decompress(data: &[u8], strict: bool) -> Result<Vec<u8>, DeflateError> {
    match inflate::inflate_bytes_zlib(data) {
        Ok(decompressed) => Ok(decompressed),
        Err(e) if strict => Err(DeflateError::Inflate(e)),
        Err(e) => {
            log::debug!("lenient inflate: treating input as already decompressed ({e})");
            Ok(data.to_vec())
        }
    }
}

/// Diagnostic-only probe: does `input` look like raw zlib data?
///
/// Never gates correctness; a caller wanting to short-circuit obviously
/// uncompressed input should still attempt [`decompress`] in lenient mode.
pub fn looks_compressed(input: &[u8]) -> bool {
    matches!(input.first(), Some(0x78))
}
