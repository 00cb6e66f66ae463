//! Sub-configuration structs with their defaults.

use crate::duplicates::ChecksumBasis;
use crate::inference::EstimationMode;
use crate::merge::MergeStrategy;
use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Where superseded duplicates should be moved. Relative paths are
    /// resolved against the scanned root; `~` is expanded.
    pub recovery_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            recovery_dir: ".backup/duplicates".to_string(),
        }
    }
}

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of parallel workers for fingerprint extraction
    pub parallel_workers: usize,

    /// Supported input extensions
    pub supported_formats: Vec<String>,

    /// Directory names never descended into (backups, recovery folders)
    pub skip_dirs: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 4,
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
                "tif".to_string(),
                "tiff".to_string(),
            ],
            skip_dirs: vec![".backup".to_string()],
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 20000,
        }
    }
}

/// Similarity weights. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight of the perceptual-hash (structural) component
    pub visual: f64,

    /// Weight of the colour-histogram component
    pub color: f64,

    /// Weight of the edge-density component
    pub edge: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            visual: 0.4,
            color: 0.3,
            edge: 0.3,
        }
    }
}

impl ScoringConfig {
    /// Sum of the three weights.
    pub fn total(&self) -> f64 {
        self.visual + self.color + self.edge
    }
}

/// Date/GPS inference settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// How qualifying references are combined into one timestamp
    pub mode: EstimationMode,

    /// Minimum similarity for a reference to take part (inclusive)
    pub threshold: f64,

    /// Number of best references kept per target (0 = all)
    pub top_k: usize,

    /// Copy GPS from the best GPS-bearing reference
    pub include_gps: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            mode: EstimationMode::MostSimilar,
            threshold: 0.70,
            top_k: 5,
            include_gps: true,
        }
    }
}

/// Duplicate detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicatesConfig {
    /// Maximum pHash Hamming distance for near-duplicates (inclusive)
    pub max_hamming_distance: u32,

    /// What the exact-duplicate checksum is computed over
    pub checksum_basis: ChecksumBasis,
}

impl Default for DuplicatesConfig {
    fn default() -> Self {
        Self {
            max_hamming_distance: 5,
            checksum_basis: ChecksumBasis::FileBytes,
        }
    }
}

/// Merge policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Strategy applied to every duplicate group in a run
    pub strategy: MergeStrategy,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            strategy: MergeStrategy::SmartMerge,
        }
    }
}

/// Plausibility rules for capture dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatesConfig {
    /// Capture dates before this year are treated as camera-clock garbage
    pub min_valid_year: i32,
}

impl Default for DatesConfig {
    fn default() -> Self {
        Self {
            min_valid_year: 2000,
        }
    }
}

impl DatesConfig {
    /// Whether `ts` can be a real capture date: not before `min_valid_year`
    /// and not after `now`.
    pub fn is_plausible(&self, ts: &NaiveDateTime, now: &NaiveDateTime) -> bool {
        ts.year() >= self.min_valid_year && ts <= now
    }
}

/// Largest accepted `folder_dates.interval_minutes`: one day.
pub const MAX_INTERVAL_MINUTES: i64 = 24 * 60;

/// Folder/filename date settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderDatesConfig {
    /// Spacing between consecutive photos of one folder, in minutes
    /// (at most [`MAX_INTERVAL_MINUTES`])
    pub interval_minutes: i64,

    /// Replace valid existing EXIF dates too
    pub overwrite_existing: bool,

    /// Existing dates further than this from the folder date are replaced
    pub max_deviation_days: i64,
}

impl Default for FolderDatesConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 2,
            overwrite_existing: false,
            max_deviation_days: 365,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "jsonl".to_string(),
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
