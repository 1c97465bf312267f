// Standard library
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use std::{env, fs};

// 3rd party crates
use config::{Config, Environment, File};
use tokio::sync::RwLock;
use tracing::{error, info};

// Project imports
use crate::monitor::types::MonitorKey;
use crate::service::constants::{DEFAULT_MONITOR_EXPIRY_SECS, DEFAULT_REAPER_INTERVAL_SECS};
use crate::service::types::ServiceOptions;

// Current module imports
use super::constants::{
    default_log_level, default_status_interval, CONFIG_PATH_ENV, DEFAULT_CONFIG, ENV_PREFIX,
};
use super::errors::{SettingsError, ValidationError};
use super::types::{
    ConfigManager, Log, MonitorSettings, Settings, Status, ValidatedSettings, WatchTarget,
};

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            expiry: DEFAULT_MONITOR_EXPIRY_SECS,
            reaper_interval: DEFAULT_REAPER_INTERVAL_SECS,
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Self {
            interval: default_status_interval(),
        }
    }
}

impl WatchTarget {
    pub fn monitor_key(&self) -> Result<MonitorKey, ValidationError> {
        match (&self.address, &self.domain) {
            (Some(address), None) => Ok(MonitorKey::address(
                &self.health_check,
                *address,
                self.url.as_ref(),
            )),
            (None, Some(domain)) if !domain.trim().is_empty() => Ok(MonitorKey::domain(
                &self.health_check,
                domain.trim(),
                self.record_type,
                self.url.as_ref(),
            )),
            _ => Err(ValidationError::InvalidWatchTarget),
        }
    }
}

impl Settings {
    pub fn get_log_level(&self) -> String {
        self.log.level.to_lowercase()
    }

    pub fn get_status_interval(&self) -> Duration {
        Duration::from_secs(self.status.interval)
    }

    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            monitor_expiry: Duration::from_secs(self.monitor.expiry),
            reaper_interval: Duration::from_secs(self.monitor.reaper_interval),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        // Validate log level
        match self.log.level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => return Err(ValidationError::InvalidLogLevel(self.log.level.clone())),
        }

        if self.monitor.expiry == 0 {
            return Err(ValidationError::InvalidMonitorExpiry);
        }
        if self.monitor.reaper_interval == 0 {
            return Err(ValidationError::InvalidReaperInterval);
        }
        if self.status.interval == 0 {
            return Err(ValidationError::InvalidStatusInterval);
        }

        for target in &self.watch {
            target.monitor_key()?;
        }

        self.failover.validate()
    }
}

impl ConfigManager {
    /// Creates a new `ConfigManager` instance by loading and validating the configuration.
    pub fn new() -> Result<Self, SettingsError> {
        let config_path: PathBuf = Self::get_config_path()?;
        Self::with_path(config_path)
    }

    /// Loads the configuration from `config_path`, writing the default
    /// configuration there first if the file does not exist.
    pub fn with_path(config_path: PathBuf) -> Result<Self, SettingsError> {
        Self::ensure_config_file_exists(&config_path)?;

        let settings: Settings = Self::load_settings(&config_path)?;

        // Validate settings before proceeding
        let validated_settings = ValidatedSettings::new(settings).map_err(|e| {
            error!("Configuration validation failed: {}", e);
            e
        })?;

        Ok(ConfigManager {
            settings: Arc::new(RwLock::new(validated_settings.into_inner())),
            config_path,
        })
    }

    /// Determines the configuration file path.
    fn get_config_path() -> Result<PathBuf, SettingsError> {
        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            Ok(PathBuf::from(path))
        } else if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir.join("dns-failover").join("config.toml"))
        } else {
            error!("Could not determine the configuration directory");
            Err(SettingsError::NoConfigDir)
        }
    }

    /// Ensures that the configuration file exists, creating it if necessary.
    fn ensure_config_file_exists(config_path: &Path) -> Result<(), SettingsError> {
        if !config_path.exists() {
            if let Some(parent_dir) = config_path.parent() {
                fs::create_dir_all(parent_dir).map_err(|e| {
                    error!("Failed to create configuration directory: {}", e);
                    e
                })?;
            }
            fs::write(config_path, DEFAULT_CONFIG).map_err(|e| {
                error!("Failed to create default configuration file: {}", e);
                e
            })?;
            info!("Default configuration file created at: {:?}", config_path);
        }
        Ok(())
    }

    /// Loads the settings from the configuration file and environment variables.
    fn load_settings(config_path: &Path) -> Result<Settings, SettingsError> {
        let config_file: &str = config_path.to_str().ok_or_else(|| {
            error!("Configuration file path contains invalid UTF-8 characters");
            SettingsError::InvalidPath
        })?;

        let settings: Config = Config::builder()
            .add_source(File::with_name(config_file))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Reloads the configuration from the file.
    ///
    /// An invalid file leaves the current settings in place.
    pub async fn reload(&self) -> Result<Settings, SettingsError> {
        let new_settings: Settings = Self::load_settings(&self.config_path)?;

        // Validate settings before updating
        let validated_settings = ValidatedSettings::new(new_settings).map_err(|e| {
            error!("Configuration validation failed during reload: {}", e);
            e
        })?;

        let settings = validated_settings.into_inner();
        *self.settings.write().await = settings.clone();
        info!("Configuration reloaded from {:?}", self.config_path);
        Ok(settings)
    }

    /// Clones the current settings.
    pub async fn get_settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    pub async fn get_log_level(&self) -> String {
        self.settings.read().await.get_log_level()
    }
}

impl ValidatedSettings {
    pub fn new(settings: Settings) -> Result<Self, ValidationError> {
        settings.validate()?;
        Ok(ValidatedSettings(settings))
    }

    pub fn into_inner(self) -> Settings {
        self.0
    }
}

// Implement Deref to allow transparent access to Settings fields
impl std::ops::Deref for ValidatedSettings {
    type Target = Settings;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
