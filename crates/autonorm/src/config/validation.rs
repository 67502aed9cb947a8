//! Configuration validation.

use super::Config;
use crate::error::{NormalizeError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    let ratios = [
        ("profiling.type_coverage", config.profiling.type_coverage),
        (
            "profiling.multivalued_fraction",
            config.profiling.multivalued_fraction,
        ),
        (
            "entity.confidence_threshold",
            config.entity.confidence_threshold,
        ),
        (
            "entity.min_uniqueness_ratio",
            config.entity.min_uniqueness_ratio,
        ),
        (
            "foreign_keys.acceptance_threshold",
            config.foreign_keys.acceptance_threshold,
        ),
    ];

    for (name, value) in ratios {
        if !(0.0..=1.0).contains(&value) {
            return Err(NormalizeError::Config(format!(
                "{} must be within [0, 1], got {}",
                name, value
            )));
        }
    }

    if config.profiling.max_key_size == 0 {
        return Err(NormalizeError::Config(
            "profiling.max_key_size must be at least 1".into(),
        ));
    }

    if let Some(0) = config.entity.min_unique_values {
        return Err(NormalizeError::Config(
            "entity.min_unique_values must be at least 1".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_out_of_range_threshold() {
        let mut config = Config::default();
        config.entity.confidence_threshold = 1.5;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_key_size() {
        let mut config = Config::default();
        config.profiling.max_key_size = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_unique_floor() {
        let mut config = Config::default();
        config.entity.min_unique_values = Some(0);
        assert!(validate(&config).is_err());
    }
}
