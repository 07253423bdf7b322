//! Gzip compression with a bounded expansion on decompress.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("gzip stream error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decompressed size exceeds {max} bytes")]
    ExceedsMaximumSize { max: usize },
}

/// Gzip `content`.
pub fn compress(content: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content)?;
    Ok(encoder.finish()?)
}

/// Gunzip `compressed`, failing as soon as the output passes
/// `max_decompressed_size` bytes.
pub fn decompress(
    compressed: &[u8],
    max_decompressed_size: usize,
) -> Result<Vec<u8>, CompressionError> {
    let limit = max_decompressed_size as u64 + 1;
    let mut output = Vec::new();
    GzDecoder::new(compressed)
        .take(limit)
        .read_to_end(&mut output)?;

    if output.len() > max_decompressed_size {
        return Err(CompressionError::ExceedsMaximumSize {
            max: max_decompressed_size,
        });
    }
    Ok(output)
}
