pub const DEFAULT_SMTP_PORT: u16 = 25;

/// Upper bound on a single web hook delivery.
pub const WEB_HOOK_TIMEOUT_SECS: u64 = 30;

pub fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}
