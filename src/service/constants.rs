/// Monitors not queried for this long are retired.
pub const DEFAULT_MONITOR_EXPIRY_SECS: u64 = 60 * 60; // 1 hour

/// Pause between the end of one reaper sweep and the start of the next.
pub const DEFAULT_REAPER_INTERVAL_SECS: u64 = 15 * 60; // 15 minutes

/// Message of the response returned for targets under maintenance.
pub const UNDER_MAINTENANCE: &str = "Under maintenance";

pub fn default_monitor_expiry() -> u64 {
    DEFAULT_MONITOR_EXPIRY_SECS
}

pub fn default_reaper_interval() -> u64 {
    DEFAULT_REAPER_INTERVAL_SECS
}
