//! Configuration validation

use super::loader::{Config, ConfigError, ConfigResult};

/// Checks a configuration for values the library cannot operate with
pub fn validate_config(config: &Config) -> ConfigResult<()> {
    if config.scanner.max_workers == 0 {
        return Err(ConfigError::Invalid(
            "scanner.max_workers must be at least 1".to_string(),
        ));
    }
    if config.save.timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "save.timeout_secs must be at least 1".to_string(),
        ));
    }
    if config.save.max_region_mib == 0 && !config.save.include_large {
        return Err(ConfigError::Invalid(
            "save.max_region_mib of 0 would skip every region".to_string(),
        ));
    }
    if config.guard.low >= config.guard.high {
        return Err(ConfigError::Invalid(format!(
            "guard window is empty: low 0x{:x} >= high 0x{:x}",
            config.guard.low, config.guard.high
        )));
    }
    Ok(())
}
