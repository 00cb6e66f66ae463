//! Capture date and GPS inference.
//!
//! A target photo's missing metadata is estimated from reference photos that
//! look like it. References are ranked by similarity ([`ReferenceLibrary`]),
//! those scoring at least the threshold qualify, and one of three modes turns
//! the qualifying set into a [`MetadataEstimate`]:
//!
//! - **most similar**: timestamp of the best candidate, confidence = its score
//! - **weighted average**: score-weighted mean timestamp, confidence =
//!   score-weighted mean score (`sum(s^2) / sum(s)`)
//! - **interpolated**: score-weighted point between the two best candidates,
//!   confidence = mean of their scores; one qualifying candidate degrades to
//!   most similar
//!
//! GPS, when requested, is always copied from the best GPS-bearing candidate.
//! Coordinates are never averaged.
//!
//! Nothing here touches files. Applying an estimate is the caller's job.

pub mod folder;
pub mod path_date;
pub mod ranking;

pub use folder::{
    DateSource, FolderDatePlan, FolderDatePlanner, FolderPhoto, PlannedAction, PlannedDate,
    RewriteReason, SkipReason,
};
pub use path_date::{date_from_name, date_from_path};
pub use ranking::{ReferenceLibrary, ReferencePhoto};

use std::cmp::Ordering;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::config::InferenceConfig;
use crate::fingerprint::ImageFingerprint;
use crate::math::weighted_mean;
use crate::scoring::SimilarityScorer;
use crate::types::{GpsCoordinate, PhotoId};

/// How qualifying references are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationMode {
    #[default]
    MostSimilar,
    WeightedAverage,
    Interpolated,
}

/// The method that actually produced an estimate.
///
/// Differs from the configured mode when interpolation had too few candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationMethod {
    MostSimilar,
    WeightedAverage,
    Interpolated,
}

/// A dated reference photo scored against one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCandidate {
    pub id: PhotoId,
    pub captured_at: NaiveDateTime,
    pub gps: Option<GpsCoordinate>,
    pub score: f64,
}

impl ReferenceCandidate {
    /// Ranking order: higher score first, then earlier timestamp, then id.
    pub fn cmp_rank(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.captured_at.cmp(&other.captured_at))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Inferred capture metadata for one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEstimate {
    pub timestamp: NaiveDateTime,
    /// In [0, 1]
    pub confidence: f64,
    pub gps: Option<GpsCoordinate>,
    pub method: EstimationMethod,
    /// Number of qualifying candidates
    pub supporting: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoEstimateReason {
    /// No candidate scored at or above the threshold
    InsufficientCandidates,
}

/// Outcome of inference. Not finding an estimate is a normal result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Estimate {
    Found(MetadataEstimate),
    NoEstimate {
        reason: NoEstimateReason,
        /// Candidates examined before the threshold was applied
        considered: usize,
    },
}

impl Estimate {
    pub fn found(&self) -> Option<&MetadataEstimate> {
        match self {
            Estimate::Found(estimate) => Some(estimate),
            Estimate::NoEstimate { .. } => None,
        }
    }

    /// Confidence of the estimate, 0 when there is none.
    pub fn confidence(&self) -> f64 {
        self.found().map(|e| e.confidence).unwrap_or(0.0)
    }
}

/// Estimates capture metadata with a fixed configuration.
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    config: InferenceConfig,
}

impl InferenceEngine {
    pub fn new(config: InferenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Estimate from already-scored candidates.
    pub fn estimate(&self, candidates: &[ReferenceCandidate]) -> Estimate {
        estimate(
            candidates,
            self.config.mode,
            self.config.threshold,
            self.config.include_gps,
        )
    }

    /// Rank `library` against `target` and estimate from the top candidates.
    pub fn infer(
        &self,
        target: &ImageFingerprint,
        library: &ReferenceLibrary,
        scorer: &SimilarityScorer,
    ) -> Estimate {
        self.infer_excluding(target, None, library, scorer)
    }

    /// [`infer`](Self::infer) for a target that may itself be a reference;
    /// `own_id` never votes for its own date.
    pub fn infer_excluding(
        &self,
        target: &ImageFingerprint,
        own_id: Option<&PhotoId>,
        library: &ReferenceLibrary,
        scorer: &SimilarityScorer,
    ) -> Estimate {
        let candidates = library.rank_excluding(target, own_id, scorer, self.config.top_k);
        self.estimate(&candidates)
    }
}

/// Estimate capture metadata from `candidates`.
///
/// Candidates scoring below `threshold` are ignored; a score equal to the
/// threshold qualifies.
pub fn estimate(
    candidates: &[ReferenceCandidate],
    mode: EstimationMode,
    threshold: f64,
    include_gps: bool,
) -> Estimate {
    let mut qualifying: Vec<&ReferenceCandidate> =
        candidates.iter().filter(|c| c.score >= threshold).collect();
    if qualifying.is_empty() {
        tracing::debug!(
            "No reference of {} reached threshold {:.2}",
            candidates.len(),
            threshold
        );
        return Estimate::NoEstimate {
            reason: NoEstimateReason::InsufficientCandidates,
            considered: candidates.len(),
        };
    }
    qualifying.sort_by(|a, b| a.cmp_rank(b));

    let best = qualifying[0];
    let (timestamp, confidence, method) = match mode {
        EstimationMode::MostSimilar => (best.captured_at, best.score, EstimationMethod::MostSimilar),
        EstimationMode::WeightedAverage => (
            weighted_timestamp(&qualifying),
            weighted_confidence(&qualifying),
            EstimationMethod::WeightedAverage,
        ),
        EstimationMode::Interpolated if qualifying.len() >= 2 => {
            let pair = &qualifying[..2];
            (
                weighted_timestamp(pair),
                (pair[0].score + pair[1].score) / 2.0,
                EstimationMethod::Interpolated,
            )
        }
        EstimationMode::Interpolated => {
            (best.captured_at, best.score, EstimationMethod::MostSimilar)
        }
    };

    // Most-similar reports one photo, so its GPS goes with its timestamp.
    // Blended timestamps take the best GPS-bearing qualifying candidate.
    let gps = match method {
        _ if !include_gps => None,
        EstimationMethod::MostSimilar => best.gps,
        EstimationMethod::WeightedAverage | EstimationMethod::Interpolated => {
            qualifying.iter().find_map(|c| c.gps)
        }
    };

    Estimate::Found(MetadataEstimate {
        timestamp,
        confidence: confidence.clamp(0.0, 1.0),
        gps,
        method,
        supporting: qualifying.len(),
    })
}

/// Score-weighted mean of the candidates' timestamps, to the nearest second.
///
/// Offsets are taken from the earliest timestamp so the mean is computed on
/// small numbers.
fn weighted_timestamp(candidates: &[&ReferenceCandidate]) -> NaiveDateTime {
    let earliest = candidates
        .iter()
        .map(|c| c.captured_at)
        .min()
        .unwrap_or_default();
    let offsets: Vec<f64> = candidates
        .iter()
        .map(|c| (c.captured_at - earliest).num_seconds() as f64)
        .collect();
    let weights: Vec<f64> = candidates.iter().map(|c| c.score).collect();
    let mean = weighted_mean(&offsets, &weights).unwrap_or(0.0);
    earliest + Duration::seconds(mean.round() as i64)
}

fn weighted_confidence(candidates: &[&ReferenceCandidate]) -> f64 {
    let scores: Vec<f64> = candidates.iter().map(|c| c.score).collect();
    weighted_mean(&scores, &scores).unwrap_or(0.0)
}
