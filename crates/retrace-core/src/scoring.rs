//! Weighted similarity between two fingerprints.
//!
//! Each feature is turned into a similarity in [0, 1] and the three are
//! combined with fixed policy weights (default 0.4 / 0.3 / 0.3):
//!
//! ```text
//! visual = mean(pHash, dHash, aHash similarity)   // 1 - hamming / 256 each
//! color  = mean over R,G,B of (1 - L1 / 2)
//! edge   = 1 - |density_a - density_b|
//! value  = (wv*visual + wc*color + we*edge) / (wv + wc + we)
//! ```
//!
//! The visual component always averages all three hash variants. Every term
//! is symmetric in its arguments, so `score(a, b) == score(b, a)` holds
//! bit-for-bit.

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::fingerprint::ImageFingerprint;

/// Per-feature sub-scores, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub visual: f64,
    pub color: f64,
    pub edge: f64,
}

/// Similarity of one fingerprint pair. Ephemeral, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScore {
    /// Weighted combination, in [0, 1]
    pub value: f64,
    pub components: ScoreComponents,
}

/// Scores fingerprint pairs with a fixed set of weights.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityScorer {
    weights: ScoringConfig,
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

impl SimilarityScorer {
    pub fn new(weights: ScoringConfig) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringConfig {
        &self.weights
    }

    pub fn score(&self, a: &ImageFingerprint, b: &ImageFingerprint) -> SimilarityScore {
        let components = ScoreComponents {
            visual: Self::visual_similarity(a, b),
            color: a.color_histogram.similarity(&b.color_histogram),
            edge: 1.0 - (a.edge_density - b.edge_density).abs().min(1.0),
        };
        SimilarityScore {
            value: self.combine(&components),
            components,
        }
    }

    fn visual_similarity(a: &ImageFingerprint, b: &ImageFingerprint) -> f64 {
        let total = a.perceptual_hash.similarity(&b.perceptual_hash)
            + a.difference_hash.similarity(&b.difference_hash)
            + a.average_hash.similarity(&b.average_hash);
        total / 3.0
    }

    fn combine(&self, c: &ScoreComponents) -> f64 {
        let w = &self.weights;
        let total = w.total();
        if total <= 0.0 {
            return 0.0;
        }
        let weighted = w.visual * c.visual + w.color * c.color + w.edge * c.edge;
        (weighted / total).clamp(0.0, 1.0)
    }
}
