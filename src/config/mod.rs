//! Configuration for scanning, saving and address validation
//!
//! Settings load from an optional TOML file; every section falls back to
//! defaults suitable for mainstream 64-bit targets.

mod defaults;
mod loader;
mod validator;

pub use defaults::{GuardSettings, SaveSettings, ScannerSettings};
pub use loader::{load_config, Config, ConfigError, ConfigResult};
pub use validator::validate_config;
