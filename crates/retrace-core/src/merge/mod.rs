//! Keep/supersede decisions for duplicate groups.
//!
//! A [`MergeResolver`] turns one [`DuplicateGroup`] plus each member's file
//! metadata into a [`MergeDecision`]. Superseded members are designations
//! only; moving them to the recovery directory is the caller's job.
//!
//! When a strategy cannot pick a single keep (members tie on every
//! criterion) the group is left unresolved for review rather than decided
//! arbitrarily.

pub mod recommend;

pub use recommend::{
    is_likely_screenshot, is_screenshot_name, recommend_strategy, Recommendation,
    RecommendationReason,
};

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::config::DatesConfig;
use crate::duplicates::DuplicateGroup;
use crate::metadata::ExifReader;
use crate::pipeline::PhotoRecord;
use crate::types::{GpsCoordinate, PhotoId};

/// Policy for choosing the member to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// No designation; the group is left as is
    KeepAll,
    /// Highest resolution, then larger file, then earliest file name
    BestQuality,
    /// Earliest valid capture date
    Timeline,
    /// Best quality, plus missing date/GPS filled from the others
    #[default]
    SmartMerge,
    /// Always defer to an external decision
    Review,
}

/// How a run picks the strategy for each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategySelection {
    /// `[merge] strategy` from the config
    #[default]
    Configured,
    /// The same strategy for every group
    Fixed(MergeStrategy),
    /// Each group's [`recommend_strategy`]
    Recommended,
}

/// What the resolver knows about one member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberMetadata {
    pub id: PhotoId,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
    pub captured_at: Option<NaiveDateTime>,
    pub gps: Option<GpsCoordinate>,
}

impl MemberMetadata {
    /// Combine an extracted record with its EXIF date and GPS.
    pub fn from_record(record: &PhotoRecord, reader: &dyn ExifReader) -> Self {
        Self {
            id: record.id.clone(),
            file_name: record.id.file_name().to_string(),
            width: record.image.width,
            height: record.image.height,
            file_size: record.file_size,
            captured_at: reader.read_date(&record.path),
            gps: reader.read_gps(&record.path),
        }
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Best-quality order: more pixels, then larger file, then file name.
    fn cmp_quality(&self, other: &Self) -> Ordering {
        other
            .pixel_count()
            .cmp(&self.pixel_count())
            .then_with(|| other.file_size.cmp(&self.file_size))
            .then_with(|| self.file_name.cmp(&other.file_name))
    }
}

/// Fields to add to the kept file. Never replaces a value the keep has.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataPatch {
    pub captured_at: Option<NaiveDateTime>,
    /// Member the date came from
    pub date_from: Option<PhotoId>,
    pub gps: Option<GpsCoordinate>,
    /// Member the GPS came from
    pub gps_from: Option<PhotoId>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        self.captured_at.is_none() && self.gps.is_none()
    }
}

/// A strategy that could not apply as configured and what was used instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    /// Timeline found no valid date; best quality was used
    NoValidTimestamps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// The review strategy was selected
    ManualReview,
    /// The leading members tie on every criterion
    Ambiguous,
    /// A member had no metadata
    MissingMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum MergeDecision {
    KeepAll,
    Resolved {
        keep: PhotoId,
        /// Sorted by id
        supersede: Vec<PhotoId>,
        patch: MetadataPatch,
        fallback: Option<Fallback>,
        strategy: MergeStrategy,
    },
    Unresolved {
        reason: UnresolvedReason,
        strategy: MergeStrategy,
    },
}

impl MergeDecision {
    pub fn keep(&self) -> Option<&PhotoId> {
        match self {
            MergeDecision::Resolved { keep, .. } => Some(keep),
            _ => None,
        }
    }

    pub fn supersede(&self) -> &[PhotoId] {
        match self {
            MergeDecision::Resolved { supersede, .. } => supersede,
            _ => &[],
        }
    }
}

/// Applies merge strategies to duplicate groups.
#[derive(Debug, Clone)]
pub struct MergeResolver {
    dates: DatesConfig,
    now: NaiveDateTime,
}

impl MergeResolver {
    /// `now` bounds valid capture dates; pass the current local time.
    pub fn new(dates: DatesConfig, now: NaiveDateTime) -> Self {
        Self { dates, now }
    }

    pub fn resolve(
        &self,
        group: &DuplicateGroup,
        strategy: MergeStrategy,
        metadata: &[MemberMetadata],
    ) -> MergeDecision {
        match strategy {
            MergeStrategy::KeepAll => return MergeDecision::KeepAll,
            MergeStrategy::Review => {
                return MergeDecision::Unresolved {
                    reason: UnresolvedReason::ManualReview,
                    strategy,
                }
            }
            _ => {}
        }

        let by_id: HashMap<&PhotoId, &MemberMetadata> =
            metadata.iter().map(|m| (&m.id, m)).collect();
        let members: Option<Vec<&MemberMetadata>> =
            group.members.iter().map(|id| by_id.get(id).copied()).collect();
        let Some(mut members) = members else {
            tracing::warn!("Group {:?} has members without metadata", group.members);
            return MergeDecision::Unresolved {
                reason: UnresolvedReason::MissingMetadata,
                strategy,
            };
        };
        members.sort_by(|a, b| a.cmp_quality(b));

        let (keep, fallback) = match strategy {
            MergeStrategy::Timeline => match self.earliest_valid(&members) {
                Some(pick) => (pick, None),
                None => (best_quality(&members), Some(Fallback::NoValidTimestamps)),
            },
            _ => (best_quality(&members), None),
        };
        let Some(keep) = keep else {
            return MergeDecision::Unresolved {
                reason: UnresolvedReason::Ambiguous,
                strategy,
            };
        };

        let superseded: Vec<&MemberMetadata> =
            members.iter().copied().filter(|m| m.id != keep.id).collect();
        let patch = if strategy == MergeStrategy::SmartMerge {
            self.patch_for(keep, &superseded)
        } else {
            MetadataPatch::default()
        };

        let mut supersede: Vec<PhotoId> = superseded.iter().map(|m| m.id.clone()).collect();
        supersede.sort();

        MergeDecision::Resolved {
            keep: keep.id.clone(),
            supersede,
            patch,
            fallback,
            strategy,
        }
    }

    /// Member with the earliest valid date, ties broken by quality.
    /// `None` when no member has a valid date.
    fn earliest_valid<'a>(&self, members: &[&'a MemberMetadata]) -> Option<Option<&'a MemberMetadata>> {
        let earliest = members
            .iter()
            .filter_map(|m| self.valid_date(m))
            .min()?;
        let tied: Vec<&MemberMetadata> = members
            .iter()
            .copied()
            .filter(|m| self.valid_date(m) == Some(earliest))
            .collect();
        Some(best_quality(&tied))
    }

    fn valid_date(&self, member: &MemberMetadata) -> Option<NaiveDateTime> {
        member
            .captured_at
            .filter(|ts| self.dates.is_plausible(ts, &self.now))
    }

    /// `superseded` is in best-quality order.
    fn patch_for(&self, keep: &MemberMetadata, superseded: &[&MemberMetadata]) -> MetadataPatch {
        let mut patch = MetadataPatch::default();
        if keep.captured_at.is_none() {
            if let Some((ts, from)) = superseded
                .iter()
                .filter_map(|m| self.valid_date(m).map(|ts| (ts, &m.id)))
                .min_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)))
            {
                patch.captured_at = Some(ts);
                patch.date_from = Some(from.clone());
            }
        }
        if keep.gps.is_none() {
            if let Some(m) = superseded.iter().find(|m| m.gps.is_some()) {
                patch.gps = m.gps;
                patch.gps_from = Some(m.id.clone());
            }
        }
        patch
    }
}

/// First of `sorted` (best-quality order) unless the top two tie on every
/// criterion. `None` also for an empty slice.
fn best_quality<'a>(sorted: &[&'a MemberMetadata]) -> Option<&'a MemberMetadata> {
    match sorted {
        [] => None,
        [first, second, ..] if first.cmp_quality(second) == Ordering::Equal => None,
        [first, ..] => Some(first),
    }
}

/// Where superseded members of a group belong: `<recovery_dir>/group_<label>`.
pub fn recovery_path(recovery_dir: &Path, group: &DuplicateGroup) -> PathBuf {
    recovery_dir.join(format!("group_{}", group.label()))
}
