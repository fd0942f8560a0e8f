//! Configuration loading from a TOML file

use super::defaults::{GuardSettings, SaveSettings, ScannerSettings};
use crate::core::types::{Addr, MemSize};
use crate::map::AddressGuard;
use crate::snapshot::SaveOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration-related error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scanner: ScannerSettings,
    pub save: SaveSettings,
    pub guard: GuardSettings,
}

impl Config {
    /// The save policy expressed as pipeline options
    pub fn save_options(&self) -> SaveOptions {
        SaveOptions {
            max_region_size: MemSize::new(self.save.max_region_mib * 1024 * 1024),
            timeout: Duration::from_secs(self.save.timeout_secs),
            include_large: self.save.include_large,
        }
    }

    /// The guard windows expressed as an address guard
    pub fn address_guard(&self) -> AddressGuard {
        AddressGuard {
            low: Addr::new(self.guard.low),
            high: Addr::new(self.guard.high),
        }
    }
}

/// Loads configuration from a TOML file; a missing file yields the
/// defaults
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_config(Path::new("/nonexistent/memlens.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[save]\nmax_region_mib = 7\n[guard]\nhigh = 0x7fffffffffff").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.save.max_region_mib, 7);
        // untouched sections keep their defaults
        assert_eq!(config.save.timeout_secs, 30);
        assert_eq!(config.guard.high, 0x7FFF_FFFF_FFFF);
        assert_eq!(config.guard.low, 0x10000);
    }

    #[test]
    fn test_parse_error_surfaces() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not [valid toml").unwrap();
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_save_options_conversion() {
        let config = Config::default();
        let options = config.save_options();
        assert_eq!(options.max_region_size, MemSize::new(100 * 1024 * 1024));
        assert_eq!(options.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_address_guard_conversion() {
        let config = Config::default();
        let guard = config.address_guard();
        assert_eq!(guard, AddressGuard::default());
    }

    #[test]
    fn test_round_trip() {
        let config = Config::default();
        let text = toml::to_string(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
