//! Per-image visual fingerprints.
//!
//! A fingerprint is a fixed-shape record: three 256-bit perceptual hashes, a
//! 3x32-bin colour histogram and a scalar edge density. Every field has a
//! compile-time length, so distance functions never see mismatched vectors.
//!
//! - **extractor**: computes a fingerprint from decoded pixels
//! - **edges**: Sobel-based edge density

pub mod edges;
pub mod extractor;

pub use extractor::FeatureExtractor;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of the square hash grid (16x16 = 256 bits).
pub const HASH_GRID: u32 = 16;

/// Width of every perceptual hash in bits.
pub const HASH_BITS: usize = (HASH_GRID * HASH_GRID) as usize;

/// Width of every perceptual hash in bytes.
pub const HASH_BYTES: usize = HASH_BITS / 8;

/// Bins per colour channel.
pub const HISTOGRAM_BINS: usize = 32;

/// Fixed-width perceptual hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct BitHash([u8; HASH_BYTES]);

impl BitHash {
    pub const fn from_array(bytes: [u8; HASH_BYTES]) -> Self {
        Self(bytes)
    }

    /// Copy a hash produced by a hasher. Short input is zero-padded and long
    /// input truncated; hashers configured with [`HASH_GRID`] produce exactly
    /// [`HASH_BYTES`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Self {
        debug_assert_eq!(bytes.len(), HASH_BYTES);
        let mut out = [0u8; HASH_BYTES];
        let n = bytes.len().min(HASH_BYTES);
        out[..n].copy_from_slice(&bytes[..n]);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_BYTES] {
        &self.0
    }

    /// Number of differing bits.
    pub fn hamming(&self, other: &BitHash) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    /// `1 - hamming / HASH_BITS`, in [0, 1].
    pub fn similarity(&self, other: &BitHash) -> f64 {
        1.0 - f64::from(self.hamming(other)) / HASH_BITS as f64
    }

    /// Copy of this hash with every bit outside `[start, end)` cleared.
    ///
    /// Used as a bucket key: two hashes agree on a band exactly when their
    /// masked copies are equal.
    pub fn masked(&self, start: usize, end: usize) -> BitHash {
        let mut out = [0u8; HASH_BYTES];
        for bit in start..end.min(HASH_BITS) {
            let byte = bit / 8;
            let mask = 0x80u8 >> (bit % 8);
            out[byte] |= self.0[byte] & mask;
        }
        BitHash(out)
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != HASH_BYTES * 2 || !hex.is_ascii() {
            return None;
        }
        let mut out = [0u8; HASH_BYTES];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(out))
    }
}

impl fmt::Display for BitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<BitHash> for String {
    fn from(hash: BitHash) -> Self {
        hash.to_hex()
    }
}

impl TryFrom<String> for BitHash {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        BitHash::from_hex(&value).ok_or_else(|| format!("invalid {HASH_BITS}-bit hex hash"))
    }
}

/// Per-channel colour distributions, channel order R, G, B.
///
/// Each channel is normalized by pixel count and sums to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorHistogram {
    pub channels: [[f32; HISTOGRAM_BINS]; 3],
}

impl ColorHistogram {
    /// Similarity of two histograms in [0, 1].
    ///
    /// Per channel `1 - L1 / 2` (the L1 distance of two distributions lies in
    /// [0, 2]), averaged across the three channels.
    pub fn similarity(&self, other: &ColorHistogram) -> f64 {
        let total: f64 = self
            .channels
            .iter()
            .zip(other.channels.iter())
            .map(|(a, b)| {
                let l1: f64 = a
                    .iter()
                    .zip(b.iter())
                    .map(|(x, y)| f64::from((x - y).abs()))
                    .sum();
                (1.0 - l1 / 2.0).clamp(0.0, 1.0)
            })
            .sum();
        total / 3.0
    }
}

/// The full fixed-shape feature record for one image.
///
/// Depends only on pixel content. Recompute when the source bytes change;
/// there is no partial update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFingerprint {
    /// DCT-based perceptual hash (pHash)
    pub perceptual_hash: BitHash,

    /// Gradient hash (dHash)
    pub difference_hash: BitHash,

    /// Mean hash (aHash)
    pub average_hash: BitHash,

    /// Normalized RGB histograms
    pub color_histogram: ColorHistogram,

    /// Fraction of edge pixels, in [0, 1]
    pub edge_density: f64,
}
