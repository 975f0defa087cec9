//! Gzip compression for image payloads
//!
//! The framed payload is a plain RFC 1952 gzip member so that anyone who
//! pulls the bytes out of an exported image can inflate them with standard
//! tools.
//!
//! **Design**:
//! - Level 0-9, default 6 (zlib default)
//! - `decompress` rejects anything that is not a complete gzip member
//! - Empty input round-trips (a gzip member with an empty body)
//! - Inflated output is capped, so a tiny crafted stream cannot exhaust memory

use crate::error::{ArchiveError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Highest level accepted by the gzip encoder
pub const MAX_LEVEL: u32 = 9;

/// Default compression level
pub const DEFAULT_LEVEL: u32 = 6;

/// Default cap on decompressed output (512 MiB)
pub const MAX_DECOMPRESSED_LEN: usize = 512 * 1024 * 1024;

/// Compression configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionConfig {
    /// Gzip level (0 = store, 9 = smallest)
    pub level: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        CompressionConfig {
            level: DEFAULT_LEVEL,
        }
    }
}

impl CompressionConfig {
    /// Create config with the given level
    pub fn with_level(level: u32) -> Result<Self> {
        if level > MAX_LEVEL {
            return Err(ArchiveError::Config(format!(
                "compression level {} out of range (0-{})",
                level, MAX_LEVEL
            )));
        }
        Ok(CompressionConfig { level })
    }

    /// Fastest setting, still a valid gzip stream
    pub fn fast() -> Self {
        CompressionConfig { level: 1 }
    }

    /// Smallest output
    pub fn best() -> Self {
        CompressionConfig { level: MAX_LEVEL }
    }
}

/// Compress data into a single gzip member
pub fn compress(data: &[u8], config: &CompressionConfig) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(
        Vec::with_capacity(data.len() / 2 + 32),
        Compression::new(config.level),
    );
    encoder.write_all(data)?;
    let compressed = encoder.finish()?;
    Ok(compressed)
}

/// Decompress a gzip member, capped at [`MAX_DECOMPRESSED_LEN`]
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    decompress_limited(data, MAX_DECOMPRESSED_LEN)
}

/// Decompress a gzip member, failing once the output passes `limit` bytes
pub fn decompress_limited(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Err(ArchiveError::Decode("empty gzip stream".to_string()));
    }

    // One byte past the limit is enough to tell "at" from "over"
    let mut decoder = GzDecoder::new(data).take(limit as u64 + 1);
    let mut decompressed = Vec::with_capacity(data.len().saturating_mul(4).min(limit));
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| ArchiveError::Decode(format!("gzip decompression failed: {}", e)))?;

    if decompressed.len() > limit {
        return Err(ArchiveError::Decode(format!(
            "decompressed payload exceeds {} bytes",
            limit
        )));
    }
    Ok(decompressed)
}

/// Compress on the blocking thread pool
#[cfg(feature = "async")]
pub async fn compress_async(data: Vec<u8>, config: CompressionConfig) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || compress(&data, &config))
        .await
        .map_err(|e| ArchiveError::Decode(format!("compression task failed: {}", e)))?
}

/// Decompress on the blocking thread pool
#[cfg(feature = "async")]
pub async fn decompress_async(data: Vec<u8>, limit: usize) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || decompress_limited(&data, limit))
        .await
        .map_err(|e| ArchiveError::Decode(format!("decompression task failed: {}", e)))?
}
