// Standard library
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

// 3rd party crates
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

// Project imports
use crate::monitor::types::RecordType;

use super::constants::{
    default_health_check_name, default_interval, default_port, default_retries, default_timeout,
};
use super::traits::Prober;

/// Verdict of a health check for a single target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// No probe has completed yet.
    Unknown,
    /// The last probe cycle succeeded.
    Healthy,
    /// The last probe cycle failed, or the query could not be served.
    Failed,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Unknown => write!(f, "Unknown"),
            HealthStatus::Healthy => write!(f, "Healthy"),
            HealthStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Immutable result of one probe cycle, or a synthesized placeholder.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResponse {
    pub(super) status: HealthStatus,
    pub(super) message: Option<String>,
    pub(super) date_time: DateTime<Utc>,
}

/// Parameters of a named health check, as read from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    #[serde(default = "default_health_check_name")]
    pub name: String,
    /// Seconds between two probe cycles.
    #[serde(default = "default_interval")]
    pub interval: u64,
    /// Attempts per probe cycle before the cycle is reported as failed.
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Seconds a single attempt may take.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Port used for TCP reachability probes.
    #[serde(default = "default_port")]
    pub port: u16,
    /// URL probed when the query itself does not supply one.
    #[serde(default)]
    pub url: Option<Url>,
    #[serde(default, alias = "emailAlert")]
    pub email_alert: Option<String>,
    #[serde(default, alias = "webHook")]
    pub web_hook: Option<String>,
}

/// A named probe definition shared by every Monitor that references it.
///
/// Reloading replaces the parameters in place so running Monitors pick up
/// the new values on their next cycle.
pub struct HealthCheck {
    pub(super) name: String,
    pub(super) config: RwLock<HealthCheckConfig>,
    pub(super) prober: Arc<dyn Prober>,
}

/// What a single probe attempt is aimed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeTarget {
    Address(IpAddr),
    Domain {
        domain: String,
        record_type: RecordType,
        address: IpAddr,
    },
}

/// A fully described probe attempt handed to a [`Prober`].
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub target: ProbeTarget,
    pub url: Option<Url>,
    pub port: u16,
    pub timeout: Duration,
}

/// Probes over the network: TCP connect or HTTP(S) GET.
///
/// HTTP clients are cached per URL host and pinned socket address, so
/// repeated cycles against one target reuse its connection pool.
#[derive(Debug, Clone)]
pub struct NetworkProber {
    pub(super) user_agent: String,
    pub(super) clients: Arc<DashMap<(Option<String>, SocketAddr), Client>>,
}

/// Resolves domains through the operating system resolver.
#[derive(Debug, Clone, Default)]
pub struct SystemResolver;
