//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.provider.backend.as_str(), "tryon-api" | "replicate") {
            return Err(ConfigError::ValidationError(format!(
                "provider.backend must be \"tryon-api\" or \"replicate\", got \"{}\"",
                self.provider.backend
            )));
        }
        if self.provider.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "provider.base_url must not be empty".into(),
            ));
        }
        if self.polling.interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "polling.interval_ms must be > 0".into(),
            ));
        }
        if self.polling.max_interval_ms < self.polling.interval_ms {
            return Err(ConfigError::ValidationError(
                "polling.max_interval_ms must be >= polling.interval_ms".into(),
            ));
        }
        if !self.polling.backoff_factor.is_finite() || self.polling.backoff_factor < 1.0 {
            return Err(ConfigError::ValidationError(
                "polling.backoff_factor must be a finite number >= 1.0".into(),
            ));
        }
        if self.polling.attempt_timeout_cap_ms == 0 {
            return Err(ConfigError::ValidationError(
                "polling.attempt_timeout_cap_ms must be > 0".into(),
            ));
        }
        if self.compression.quality == 0 || self.compression.quality > 100 {
            return Err(ConfigError::ValidationError(
                "compression.quality must be between 1 and 100".into(),
            ));
        }
        if self.compression.max_width == 0 || self.compression.max_height == 0 {
            return Err(ConfigError::ValidationError(
                "compression.max_width and compression.max_height must be > 0".into(),
            ));
        }
        if self.limits.max_input_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_input_bytes must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.fetch_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.fetch_timeout_ms must be > 0".into(),
            ));
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
    fn test_validate_rejects_unknown_backend() {
        let mut config = Config::default();
        config.provider.backend = "clothflow".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("provider.backend"));

        config.provider.backend = "replicate".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.polling.interval_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("interval_ms"));
    }

    #[test]
    fn test_validate_rejects_cap_below_interval() {
        let mut config = Config::default();
        config.polling.max_interval_ms = 1000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_interval_ms"));
    }

    #[test]
    fn test_validate_rejects_shrinking_backoff() {
        let mut config = Config::default();
        config.polling.backoff_factor = 0.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("backoff_factor"));

        config.polling.backoff_factor = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_invalid_quality() {
        let mut config = Config::default();
        config.compression.quality = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("quality"));

        config.compression.quality = 101;
        assert!(config.validate().is_err());
    }
}
