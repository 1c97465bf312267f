/// Configuration file written on first start.
pub const DEFAULT_CONFIG: &str = r#"
# Logging configuration
[log]
# Level can be "error", "warn", "info", "debug", or "trace"
level = "info"

# Monitors nobody queried for `expiry` seconds are retired by a sweep
# running every `reaper_interval` seconds.
[monitor]
expiry = 3600
reaper_interval = 900

# How often watched targets are queried and reported, in seconds
[status]
interval = 60

# Health checks. Without a URL a check is a TCP connect to `port`;
# with one it is an HTTP(S) GET that must answer 2xx.
[[health_checks]]
name = "default"
interval = 60
retries = 3
timeout = 10
port = 80

[[health_checks]]
name = "web"
interval = 30
url = "http://localhost/health"
web_hook = "ops"
email_alert = "ops-mail"

# Web hooks receive a JSON document on every status change
[[web_hooks]]
name = "ops"
enabled = false
urls = ["https://hooks.example.com/dns-failover"]

[[email_alerts]]
name = "ops-mail"
enabled = false
alert_to = ["ops@example.com"]
smtp_server = "smtp.example.com"
smtp_port = 25
mail_from = "dns-failover@example.com"

# Networks taken out of rotation. A more specific entry with
# `enable = false` keeps part of a wider network in service.
# [[under_maintenance]]
# network = "192.0.2.0/24"
# enable = true

# Targets queried by the status loop, by address or by domain
[[watch]]
address = "127.0.0.1"
health_check = "default"

# [[watch]]
# domain = "example.com"
# record_type = "AAAA"
# health_check = "web"
"#;

pub const CONFIG_PATH_ENV: &str = "DNS_FAILOVER_CONFIG_PATH";
pub const ENV_PREFIX: &str = "DNS_FAILOVER";

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_status_interval() -> u64 {
    60 // 1 minute
}

