//! Reference library and similarity ranking.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::fingerprint::ImageFingerprint;
use crate::scoring::SimilarityScorer;
use crate::types::{GpsCoordinate, PhotoId};

use super::ReferenceCandidate;

/// A photo with a trusted capture date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePhoto {
    pub id: PhotoId,
    pub fingerprint: ImageFingerprint,
    pub captured_at: NaiveDateTime,
    pub gps: Option<GpsCoordinate>,
}

/// The bounded set of dated photos a target is compared against.
#[derive(Debug, Clone, Default)]
pub struct ReferenceLibrary {
    photos: Vec<ReferencePhoto>,
}

impl ReferenceLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reference. Photos without a capture date cannot vote on one and
    /// are rejected; returns whether the photo was added.
    pub fn insert(
        &mut self,
        id: PhotoId,
        fingerprint: ImageFingerprint,
        captured_at: Option<NaiveDateTime>,
        gps: Option<GpsCoordinate>,
    ) -> bool {
        match captured_at {
            Some(captured_at) => {
                self.photos.push(ReferencePhoto {
                    id,
                    fingerprint,
                    captured_at,
                    gps,
                });
                true
            }
            None => {
                tracing::debug!("Reference {} has no capture date, ignored", id);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn photos(&self) -> &[ReferencePhoto] {
        &self.photos
    }

    /// Score every reference against `target` and return them best first.
    ///
    /// `top_k` limits the result; 0 returns every reference.
    pub fn rank(
        &self,
        target: &ImageFingerprint,
        scorer: &SimilarityScorer,
        top_k: usize,
    ) -> Vec<ReferenceCandidate> {
        self.rank_excluding(target, None, scorer, top_k)
    }

    /// [`rank`](Self::rank) without the reference `exclude`, for a target
    /// that is itself in the library.
    pub fn rank_excluding(
        &self,
        target: &ImageFingerprint,
        exclude: Option<&PhotoId>,
        scorer: &SimilarityScorer,
        top_k: usize,
    ) -> Vec<ReferenceCandidate> {
        let mut candidates: Vec<ReferenceCandidate> = self
            .photos
            .par_iter()
            .filter(|photo| exclude != Some(&photo.id))
            .map(|photo| ReferenceCandidate {
                id: photo.id.clone(),
                captured_at: photo.captured_at,
                gps: photo.gps,
                score: scorer.score(target, &photo.fingerprint).value,
            })
            .collect();
        candidates.sort_by(|a, b| a.cmp_rank(b));
        if top_k > 0 {
            candidates.truncate(top_k);
        }
        candidates
    }
}

impl FromIterator<ReferencePhoto> for ReferenceLibrary {
    fn from_iter<I: IntoIterator<Item = ReferencePhoto>>(iter: I) -> Self {
        Self {
            photos: iter.into_iter().collect(),
        }
    }
}
