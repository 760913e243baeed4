//! Gzip wrapper around the encoded document.
//!
//! Thin helpers over `flate2`. Compression is all or nothing: a compressed
//! snapshot is one gzip member holding the whole JSON document.

use std::io::{self, Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::error::SerdeError;
use crate::options::BEST_COMPRESSION;

/// Gzip `bytes` at `level`.
///
/// # Errors
///
/// Returns [`SerdeError::InvalidCompressionLevel`] if `level` is above
/// [`BEST_COMPRESSION`], or [`SerdeError::Compress`] if the encoder fails.
pub fn compress(bytes: &[u8], level: u32) -> Result<Vec<u8>, SerdeError> {
    check_level(level)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(bytes).map_err(SerdeError::Compress)?;
    encoder.finish().map_err(SerdeError::Compress)
}

/// Inflate a gzip stream produced by [`compress`].
///
/// # Errors
///
/// Returns [`SerdeError::CorruptStream`] if `bytes` is not a complete gzip
/// stream.
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>, SerdeError> {
    if bytes.is_empty() {
        return Err(SerdeError::CorruptStream(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "empty input",
        )));
    }
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(SerdeError::CorruptStream)?;
    Ok(out)
}

pub(crate) fn check_level(level: u32) -> Result<(), SerdeError> {
    if level > BEST_COMPRESSION {
        return Err(SerdeError::InvalidCompressionLevel(level));
    }
    Ok(())
}
