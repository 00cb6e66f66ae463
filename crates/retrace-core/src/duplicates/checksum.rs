//! Exact content checksums for the first duplicate tier.
//!
//! Two bases are supported and they group differently:
//!
//! - [`ChecksumBasis::FileBytes`] hashes the file as stored. A PNG and a
//!   lossless re-encode of the same pixels are *different* files.
//! - [`ChecksumBasis::DecodedPixels`] hashes dimensions plus RGBA8 pixels, so
//!   the same two files are exact duplicates. Lossy re-encodes still differ
//!   and fall through to the perceptual tier.

use blake3::Hasher as Blake3Hasher;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// What an exact-duplicate checksum is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumBasis {
    /// Raw file bytes
    #[default]
    FileBytes,
    /// Decoded pixel data
    DecodedPixels,
}

/// BLAKE3 digest, hex-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentChecksum(String);

impl ContentChecksum {
    /// Checksum of an in-memory buffer.
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut hasher = Blake3Hasher::new();
        hasher.update(data);
        Self(hasher.finalize().to_hex().to_string())
    }

    /// Streaming checksum of a file's bytes.
    pub fn of_file(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut hasher = Blake3Hasher::new();

        let mut buffer = [0u8; 65536];
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(Self(hasher.finalize().to_hex().to_string()))
    }

    /// Checksum of decoded pixels, independent of the file encoding.
    pub fn of_pixels(image: &DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let mut hasher = Blake3Hasher::new();
        hasher.update(&rgba.width().to_le_bytes());
        hasher.update(&rgba.height().to_le_bytes());
        hasher.update(rgba.as_raw());
        Self(hasher.finalize().to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight hex digits, for group labels and log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(8)]
    }
}

impl fmt::Display for ContentChecksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
