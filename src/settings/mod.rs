//! Daemon settings: a TOML file plus `DNS_FAILOVER_*` environment
//! overrides, loaded and validated by [`ConfigManager`].

pub mod constants;
pub mod errors;
pub mod impls;
pub mod types;

pub use errors::{SettingsError, ValidationError};
pub use types::{ConfigManager, Settings, ValidatedSettings, WatchTarget};
