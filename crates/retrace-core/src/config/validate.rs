//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::fingerprint::HASH_BITS;
use crate::output::OutputFormat;

use super::{Config, MAX_INTERVAL_MINUTES};

/// Tolerance when checking that the scoring weights sum to one.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.parallel_workers == 0 {
            return Err(ConfigError::ValidationError(
                "processing.parallel_workers must be > 0".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }

        let weights = [
            ("visual", self.scoring.visual),
            ("color", self.scoring.color),
            ("edge", self.scoring.edge),
        ];
        for (name, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "scoring.{name} must be a non-negative number"
                )));
            }
        }
        if (self.scoring.total() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::ValidationError(format!(
                "scoring weights must sum to 1.0 (got {})",
                self.scoring.total()
            )));
        }

        if !(0.0..=1.0).contains(&self.inference.threshold) {
            return Err(ConfigError::ValidationError(
                "inference.threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if self.duplicates.max_hamming_distance as usize >= HASH_BITS {
            return Err(ConfigError::ValidationError(format!(
                "duplicates.max_hamming_distance must be < {HASH_BITS}"
            )));
        }
        if !(0..=MAX_INTERVAL_MINUTES).contains(&self.folder_dates.interval_minutes) {
            return Err(ConfigError::ValidationError(format!(
                "folder_dates.interval_minutes must be between 0 and {MAX_INTERVAL_MINUTES}"
            )));
        }
        if self.folder_dates.max_deviation_days < 0 {
            return Err(ConfigError::ValidationError(
                "folder_dates.max_deviation_days must be >= 0".into(),
            ));
        }
        if let Err(e) = self.output.format.parse::<OutputFormat>() {
            return Err(ConfigError::ValidationError(format!("output.format: {e}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_parallel_workers() {
        let mut config = Config::default();
        config.processing.parallel_workers = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("parallel_workers"));
    }

    #[test]
    fn test_validate_rejects_weights_not_summing_to_one() {
        let mut config = Config::default();
        config.scoring.visual = 0.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sum to 1.0"));
    }

    #[test]
    fn test_validate_accepts_retuned_weights() {
        let mut config = Config::default();
        config.scoring.visual = 0.6;
        config.scoring.color = 0.2;
        config.scoring.edge = 0.2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_weight() {
        let mut config = Config::default();
        config.scoring.visual = 1.1;
        config.scoring.color = -0.1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("scoring.color"));
    }

    #[test]
    fn test_validate_rejects_invalid_threshold() {
        let mut config = Config::default();
        config.inference.threshold = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("threshold"));

        config.inference.threshold = -0.1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("threshold"));
    }

    #[test]
    fn test_validate_rejects_hamming_distance_beyond_hash_width() {
        let mut config = Config::default();
        config.duplicates.max_hamming_distance = HASH_BITS as u32;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_hamming_distance"));
    }

    #[test]
    fn test_validate_rejects_unknown_output_format() {
        let mut config = Config::default();
        config.output.format = "yaml".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output.format"));
    }

    #[test]
    fn test_validate_bounds_folder_interval() {
        let mut config = Config::default();
        config.folder_dates.interval_minutes = MAX_INTERVAL_MINUTES;
        assert!(config.validate().is_ok());

        config.folder_dates.interval_minutes = 1_000_000_000_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("interval_minutes"));

        config.folder_dates.interval_minutes = -1;
        assert!(config.validate().is_err());
    }
}
