//! Capture dates proposed from dated folder and file names.
//!
//! Photos in a folder named after a day are spread over that day at a fixed
//! interval in file-name order, starting at noon. Only photos whose current
//! date is missing, implausible or far from the folder date are rewritten,
//! unless overwriting is forced.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::config::{DatesConfig, FolderDatesConfig};
use crate::metadata::ExifReader;
use crate::pipeline::FileDiscovery;

use super::path_date::date_from_path;

/// Where a folder's date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    FolderName,
    /// The folder name had no date; the first dated file name was used
    FileName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteReason {
    NoExif,
    ForceOverwrite,
    /// Before the minimum valid year or in the future
    InvalidDate,
    /// Further than `max_deviation_days` from the folder date
    Deviation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    ValidExif,
    /// The spaced-out date falls outside the representable range
    OutOfRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlannedAction {
    Rewrite {
        timestamp: NaiveDateTime,
        reason: RewriteReason,
    },
    Skip {
        reason: SkipReason,
    },
}

/// A photo and its current capture date, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderPhoto {
    pub path: PathBuf,
    pub existing: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedDate {
    pub path: PathBuf,
    pub existing: Option<NaiveDateTime>,
    #[serde(flatten)]
    pub action: PlannedAction,
}

/// Proposals for one folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderDatePlan {
    pub folder: PathBuf,
    pub folder_date: NaiveDateTime,
    pub source: DateSource,
    pub entries: Vec<PlannedDate>,
}

impl FolderDatePlan {
    /// Entries that would be rewritten, with their new timestamp.
    pub fn rewrites(&self) -> impl Iterator<Item = (&Path, NaiveDateTime)> {
        self.entries.iter().filter_map(|e| match e.action {
            PlannedAction::Rewrite { timestamp, .. } => Some((e.path.as_path(), timestamp)),
            PlannedAction::Skip { .. } => None,
        })
    }
}

pub struct FolderDatePlanner {
    config: FolderDatesConfig,
    dates: DatesConfig,
    now: NaiveDateTime,
}

impl FolderDatePlanner {
    /// `now` bounds plausible dates; pass the current local time.
    pub fn new(config: FolderDatesConfig, dates: DatesConfig, now: NaiveDateTime) -> Self {
        Self { config, dates, now }
    }

    /// Date for `folder`: from its own name, else from the first dated name
    /// among `files` in sorted order.
    pub fn folder_date(folder: &Path, files: &[PathBuf]) -> Option<(NaiveDateTime, DateSource)> {
        if let Some(date) = date_from_path(folder) {
            return Some((date, DateSource::FolderName));
        }
        let mut sorted: Vec<&PathBuf> = files.iter().collect();
        sorted.sort();
        sorted
            .into_iter()
            .find_map(|f| date_from_path(f))
            .map(|date| (date, DateSource::FileName))
    }

    /// Plan one folder. Photos are taken in file-name order and the n-th photo
    /// (counting skipped ones) is proposed `folder_date + n * interval`.
    pub fn plan(
        &self,
        folder: &Path,
        folder_date: NaiveDateTime,
        source: DateSource,
        photos: &[FolderPhoto],
    ) -> FolderDatePlan {
        let mut sorted: Vec<&FolderPhoto> = photos.iter().collect();
        sorted.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));

        let entries = sorted
            .into_iter()
            .enumerate()
            .map(|(idx, photo)| {
                let reason = self.rewrite_reason(photo.existing, folder_date);
                let action = match (reason, self.spaced(folder_date, idx)) {
                    (Some(reason), Some(timestamp)) => PlannedAction::Rewrite { timestamp, reason },
                    (Some(_), None) => {
                        tracing::warn!(
                            "Date for {:?} is out of range (interval {} min)",
                            photo.path,
                            self.config.interval_minutes
                        );
                        PlannedAction::Skip {
                            reason: SkipReason::OutOfRange,
                        }
                    }
                    (None, _) => PlannedAction::Skip {
                        reason: SkipReason::ValidExif,
                    },
                };
                PlannedDate {
                    path: photo.path.clone(),
                    existing: photo.existing,
                    action,
                }
            })
            .collect();

        FolderDatePlan {
            folder: folder.to_path_buf(),
            folder_date,
            source,
            entries,
        }
    }

    /// `folder_date + idx * interval`, or `None` on overflow.
    fn spaced(&self, folder_date: NaiveDateTime, idx: usize) -> Option<NaiveDateTime> {
        let minutes = i64::try_from(idx)
            .ok()?
            .checked_mul(self.config.interval_minutes)?;
        folder_date.checked_add_signed(Duration::try_minutes(minutes)?)
    }

    fn rewrite_reason(
        &self,
        existing: Option<NaiveDateTime>,
        folder_date: NaiveDateTime,
    ) -> Option<RewriteReason> {
        let Some(existing) = existing else {
            return Some(RewriteReason::NoExif);
        };
        if self.config.overwrite_existing {
            Some(RewriteReason::ForceOverwrite)
        } else if !self.dates.is_plausible(&existing, &self.now) {
            Some(RewriteReason::InvalidDate)
        } else if (existing - folder_date).num_days().abs() > self.config.max_deviation_days {
            Some(RewriteReason::Deviation)
        } else {
            None
        }
    }

    /// Plan every folder under `root` that has a derivable date, ordered by
    /// folder date.
    pub fn plan_tree(
        &self,
        root: &Path,
        discovery: &FileDiscovery,
        reader: &dyn ExifReader,
    ) -> Vec<FolderDatePlan> {
        let mut by_folder: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
        for file in discovery.discover(root) {
            if let Some(parent) = file.path.parent() {
                by_folder
                    .entry(parent.to_path_buf())
                    .or_default()
                    .push(file.path);
            }
        }

        let mut plans: Vec<FolderDatePlan> = by_folder
            .into_iter()
            .filter_map(|(folder, files)| {
                let Some((date, source)) = Self::folder_date(&folder, &files) else {
                    tracing::debug!("No date for folder {:?}", folder);
                    return None;
                };
                let photos: Vec<FolderPhoto> = files
                    .into_iter()
                    .map(|path| FolderPhoto {
                        existing: reader.read_date(&path),
                        path,
                    })
                    .collect();
                Some(self.plan(&folder, date, source, &photos))
            })
            .collect();
        plans.sort_by(|a, b| {
            a.folder_date
                .cmp(&b.folder_date)
                .then_with(|| a.folder.cmp(&b.folder))
        });

        tracing::info!("Planned dates for {} folders", plans.len());
        plans
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessingConfig;
    use crate::types::GpsCoordinate;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn planner() -> FolderDatePlanner {
        FolderDatePlanner::new(
            FolderDatesConfig::default(),
            DatesConfig::default(),
            ts(2025, 1, 1, 0, 0),
        )
    }

    fn photo(name: &str, existing: Option<NaiveDateTime>) -> FolderPhoto {
        FolderPhoto {
            path: PathBuf::from(format!("/photos/2024-12-25/{name}")),
            existing,
        }
    }

    #[test]
    fn test_plan_spaces_photos_and_keeps_valid_ones() {
        let folder_date = ts(2024, 12, 25, 12, 0);
        let photos = [
            photo("c.jpg", None),
            photo("a.jpg", Some(ts(2024, 12, 24, 18, 0))),
            photo("b.jpg", Some(ts(1980, 1, 1, 0, 0))),
            photo("d.jpg", Some(ts(2021, 5, 5, 10, 0))),
        ];
        let plan = planner().plan(
            Path::new("/photos/2024-12-25"),
            folder_date,
            DateSource::FolderName,
            &photos,
        );

        let actions: Vec<&PlannedAction> = plan.entries.iter().map(|e| &e.action).collect();
        assert_eq!(
            actions,
            vec![
                &PlannedAction::Skip {
                    reason: SkipReason::ValidExif
                },
                &PlannedAction::Rewrite {
                    timestamp: ts(2024, 12, 25, 12, 2),
                    reason: RewriteReason::InvalidDate
                },
                &PlannedAction::Rewrite {
                    timestamp: ts(2024, 12, 25, 12, 4),
                    reason: RewriteReason::NoExif
                },
                &PlannedAction::Rewrite {
                    timestamp: ts(2024, 12, 25, 12, 6),
                    reason: RewriteReason::Deviation
                },
            ]
        );
        assert_eq!(plan.rewrites().count(), 3);
    }

    #[test]
    fn test_future_date_is_invalid() {
        let plan = planner().plan(
            Path::new("/photos/x"),
            ts(2024, 12, 25, 12, 0),
            DateSource::FolderName,
            &[photo("a.jpg", Some(ts(2030, 1, 1, 0, 0)))],
        );
        assert!(matches!(
            plan.entries[0].action,
            PlannedAction::Rewrite {
                reason: RewriteReason::InvalidDate,
                ..
            }
        ));
    }

    #[test]
    fn test_force_overwrite() {
        let planner = FolderDatePlanner::new(
            FolderDatesConfig {
                overwrite_existing: true,
                ..FolderDatesConfig::default()
            },
            DatesConfig::default(),
            ts(2025, 1, 1, 0, 0),
        );
        let plan = planner.plan(
            Path::new("/photos/x"),
            ts(2024, 12, 25, 12, 0),
            DateSource::FolderName,
            &[photo("a.jpg", Some(ts(2024, 12, 25, 9, 0)))],
        );
        assert_eq!(
            plan.entries[0].action,
            PlannedAction::Rewrite {
                timestamp: ts(2024, 12, 25, 12, 0),
                reason: RewriteReason::ForceOverwrite
            }
        );
    }

    #[test]
    fn test_huge_interval_skips_instead_of_overflowing() {
        let planner = FolderDatePlanner::new(
            FolderDatesConfig {
                interval_minutes: 1_000_000_000_000,
                ..FolderDatesConfig::default()
            },
            DatesConfig::default(),
            ts(2025, 1, 1, 0, 0),
        );
        let plan = planner.plan(
            Path::new("/photos/2024-12-25"),
            ts(2024, 12, 25, 12, 0),
            DateSource::FolderName,
            &[photo("a.jpg", None), photo("b.jpg", None)],
        );
        assert_eq!(
            plan.entries[0].action,
            PlannedAction::Rewrite {
                timestamp: ts(2024, 12, 25, 12, 0),
                reason: RewriteReason::NoExif
            }
        );
        assert_eq!(
            plan.entries[1].action,
            PlannedAction::Skip {
                reason: SkipReason::OutOfRange
            }
        );
    }

    #[test]
    fn test_folder_date_falls_back_to_file_name() {
        let files = vec![
            PathBuf::from("/misc/IMG_20230704_1.jpg"),
            PathBuf::from("/misc/DSC0001.jpg"),
        ];
        assert_eq!(
            FolderDatePlanner::folder_date(Path::new("/misc"), &files),
            Some((ts(2023, 7, 4, 12, 0), DateSource::FileName))
        );
        assert_eq!(
            FolderDatePlanner::folder_date(Path::new("/trip 2022.08.01"), &files),
            Some((ts(2022, 8, 1, 12, 0), DateSource::FolderName))
        );
        assert_eq!(FolderDatePlanner::folder_date(Path::new("/misc"), &[]), None);
    }

    struct NoExif;

    impl ExifReader for NoExif {
        fn read_date(&self, _path: &Path) -> Option<NaiveDateTime> {
            None
        }

        fn read_gps(&self, _path: &Path) -> Option<GpsCoordinate> {
            None
        }
    }

    #[test]
    fn test_plan_tree_groups_by_folder() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("2021-06-01")).unwrap();
        std::fs::create_dir_all(root.join("2020-01-15")).unwrap();
        std::fs::create_dir_all(root.join("undated")).unwrap();
        std::fs::write(root.join("2021-06-01/b.jpg"), b"x").unwrap();
        std::fs::write(root.join("2021-06-01/a.jpg"), b"x").unwrap();
        std::fs::write(root.join("2020-01-15/z.png"), b"x").unwrap();
        std::fs::write(root.join("undated/x.jpg"), b"x").unwrap();

        let discovery = FileDiscovery::new(ProcessingConfig::default());
        let plans = planner().plan_tree(root, &discovery, &NoExif);
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].folder_date, ts(2020, 1, 15, 12, 0));
        assert_eq!(plans[1].entries.len(), 2);
        assert!(plans[1].entries[0].path.ends_with("a.jpg"));
    }
}
