/// Name given to configuration entries that omit one.
pub const DEFAULT_NAME: &str = "default";

/// Health check defaults
pub const DEFAULT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PORT: u16 = 80;

/// Pause between two attempts of the same probe cycle.
pub const RETRY_DELAY_MS: u64 = 500;

pub const USER_AGENT: &str = concat!("dns-failover/", env!("CARGO_PKG_VERSION"));

pub fn default_health_check_name() -> String {
    DEFAULT_NAME.to_string()
}

pub fn default_interval() -> u64 {
    DEFAULT_INTERVAL_SECS
}

pub fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

pub fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

pub fn default_port() -> u16 {
    DEFAULT_PORT
}
