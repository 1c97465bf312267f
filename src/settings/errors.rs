// 3rd party crates
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid log level: {0}. Must be one of: error, warn, info, debug, trace")]
    InvalidLogLevel(String),
    #[error("Monitor expiry must be greater than 0")]
    InvalidMonitorExpiry,
    #[error("Reaper interval must be greater than 0")]
    InvalidReaperInterval,
    #[error("Status interval must be greater than 0")]
    InvalidStatusInterval,
    #[error("A {0} has an empty name")]
    EmptyName(&'static str),
    #[error("Duplicate {section} name: {name}")]
    DuplicateName { section: &'static str, name: String },
    #[error("Health check '{health_check}': {field} must be greater than 0")]
    ZeroValue {
        health_check: String,
        field: &'static str,
    },
    #[error("Health check '{health_check}': URL {url} must use http or https")]
    InvalidUrl { health_check: String, url: String },
    #[error("Email alert '{0}' is enabled but has no recipients")]
    MissingRecipients(String),
    #[error("Duplicate maintenance network: {0}")]
    DuplicateNetwork(String),
    #[error("Watch target must name exactly one of address or domain")]
    InvalidWatchTarget,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Could not determine the configuration directory")]
    NoConfigDir,
    #[error("Configuration file path contains invalid UTF-8 characters")]
    InvalidPath,
    #[error("Failed to write configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),
}
