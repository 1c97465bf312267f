// Standard library
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

// 3rd party crates
use serde::Deserialize;
use tokio::sync::RwLock;
use url::Url;

// Project imports
use crate::health::constants::default_health_check_name;
use crate::monitor::types::RecordType;
use crate::service::constants::{default_monitor_expiry, default_reaper_interval};
use crate::service::types::FailoverConfig;

// Current module imports
use super::constants::{default_log_level, default_status_interval};

#[derive(Debug, Deserialize, Clone)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Monitor garbage collection, in seconds.
#[derive(Debug, Deserialize, Clone)]
pub struct MonitorSettings {
    #[serde(default = "default_monitor_expiry")]
    pub expiry: u64,
    #[serde(default = "default_reaper_interval", alias = "reaperInterval")]
    pub reaper_interval: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Status {
    #[serde(default = "default_status_interval")]
    pub interval: u64,
}

/// A target the daemon queries on every status round.
///
/// Exactly one of `address` and `domain` must be set.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    #[serde(default)]
    pub address: Option<IpAddr>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default = "default_record_type", alias = "recordType")]
    pub record_type: RecordType,
    #[serde(default = "default_health_check_name", alias = "healthCheck")]
    pub health_check: String,
    #[serde(default)]
    pub url: Option<Url>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub monitor: MonitorSettings,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub watch: Vec<WatchTarget>,

    #[serde(flatten)]
    pub failover: FailoverConfig,
}

fn default_record_type() -> RecordType {
    RecordType::A
}

/// Manages the application settings, allowing for loading and reloading configurations.
pub struct ConfigManager {
    pub settings: Arc<RwLock<Settings>>,
    pub config_path: PathBuf,
}

/// Settings that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedSettings(pub(super) Settings);
