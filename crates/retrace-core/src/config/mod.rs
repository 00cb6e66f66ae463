//! Configuration management for retrace.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. The loaded [`Config`] is an immutable value: components receive
//! the section they need at construction and never consult global state.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Processing settings
    pub processing: ProcessingConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Similarity weights
    pub scoring: ScoringConfig,

    /// Date/GPS inference settings
    pub inference: InferenceConfig,

    /// Duplicate detection settings
    pub duplicates: DuplicatesConfig,

    /// Merge policy settings
    pub merge: MergeConfig,

    /// Capture date plausibility
    pub dates: DatesConfig,

    /// Folder/filename date settings
    pub folder_dates: FolderDatesConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// - macOS: ~/Library/Application Support/com.retrace.retrace/config.toml
    /// - Linux: ~/.config/retrace/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\retrace\config\config.toml
    ///
    /// Falls back to ~/.retrace/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "retrace", "retrace")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".retrace").join("config.toml")
            })
    }

    /// Resolve the recovery directory for superseded duplicates under `root`.
    ///
    /// `~` is expanded; a relative setting is joined onto `root`.
    pub fn recovery_dir(&self, root: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(&self.general.recovery_dir);
        let path = PathBuf::from(expanded.into_owned());
        if path.is_absolute() {
            path
        } else {
            root.join(path)
        }
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::EstimationMode;
    use crate::merge::MergeStrategy;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.processing.parallel_workers, 4);
        assert_eq!(config.inference.threshold, 0.70);
        assert_eq!(config.inference.top_k, 5);
        assert_eq!(config.duplicates.max_hamming_distance, 5);
        assert_eq!(config.folder_dates.interval_minutes, 2);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[scoring]"));
        assert!(toml.contains("[inference]"));
        assert!(toml.contains("[duplicates]"));
    }

    #[test]
    fn test_toml_roundtrip_preserves_enums() {
        let mut config = Config::default();
        config.inference.mode = EstimationMode::WeightedAverage;
        config.merge.strategy = MergeStrategy::Timeline;
        let parsed = Config::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed.inference.mode, EstimationMode::WeightedAverage);
        assert_eq!(parsed.merge.strategy, MergeStrategy::Timeline);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = Config::from_toml(
            r#"
            [inference]
            mode = "interpolated"
            threshold = 0.8
            "#,
        )
        .unwrap();
        assert_eq!(config.inference.mode, EstimationMode::Interpolated);
        assert_eq!(config.inference.threshold, 0.8);
        assert_eq!(config.inference.top_k, 5);
        assert_eq!(config.scoring, ScoringConfig::default());
    }

    #[test]
    fn test_invalid_toml_values_rejected_on_load() {
        let err = Config::from_toml("[scoring]\nvisual = 0.9\n").unwrap_err();
        assert!(err.to_string().contains("scoring"));
    }

    #[test]
    fn test_recovery_dir_relative_to_root() {
        let config = Config::default();
        let dir = config.recovery_dir(Path::new("/photos"));
        assert_eq!(dir, PathBuf::from("/photos/.backup/duplicates"));
    }

    #[test]
    fn test_recovery_dir_absolute() {
        let mut config = Config::default();
        config.general.recovery_dir = "/var/recovery".to_string();
        assert_eq!(
            config.recovery_dir(Path::new("/photos")),
            PathBuf::from("/var/recovery")
        );
    }
}
