// Standard library
use std::net::IpAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

// 3rd party crates
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

// Project imports
use crate::alerts::traits::MailTransport;
use crate::alerts::types::{EmailAlert, EmailAlertConfig, WebHook, WebHookConfig};
use crate::health::traits::{Prober, Resolver};
use crate::health::types::{HealthCheck, HealthCheckConfig, HealthCheckResponse};
use crate::maintenance::types::{MaintenanceEntry, MaintenanceOverlay};
use crate::monitor::types::{Monitor, MonitorKey};

/// Engine configuration consumed by `HealthService::reload`.
///
/// Every section may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FailoverConfig {
    #[serde(default, alias = "emailAlerts")]
    pub email_alerts: Vec<EmailAlertConfig>,
    #[serde(default, alias = "webHooks")]
    pub web_hooks: Vec<WebHookConfig>,
    #[serde(default, alias = "healthChecks")]
    pub health_checks: Vec<HealthCheckConfig>,
    #[serde(default, alias = "underMaintenance")]
    pub under_maintenance: Vec<MaintenanceEntry>,
}

/// Timing of Monitor garbage collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    /// A Monitor not queried for longer than this is retired.
    pub monitor_expiry: Duration,
    /// Pause between two reaper sweeps.
    pub reaper_interval: Duration,
}

/// Host-provided collaborators of the engine.
#[derive(Clone)]
pub struct Collaborators {
    pub prober: Arc<dyn Prober>,
    pub resolver: Arc<dyn Resolver>,
    pub mail_transport: Arc<dyn MailTransport>,
}

/// Read-only view of one live Monitor.
#[derive(Debug, Clone)]
pub struct MonitorInfo {
    pub key: MonitorKey,
    /// Real probe result.
    pub response: HealthCheckResponse,
    /// Verdict handed to callers, maintenance applied.
    pub visible: HealthCheckResponse,
    pub addresses: Vec<IpAddr>,
    /// Seconds since the last query.
    pub idle_secs: u64,
}

/// Periodic sweep retiring idle Monitors.
pub struct Reaper {
    pub(super) shutdown_tx: watch::Sender<bool>,
    pub(super) handle: Option<JoinHandle<()>>,
}

/// Registry of health checks, alert sinks, maintenance entries and
/// Monitors. Answers status queries from the DNS answer path.
pub struct HealthService {
    pub(super) options: ServiceOptions,
    pub(super) runtime: Handle,
    pub(super) collaborators: Collaborators,
    pub(super) health_checks: Arc<DashMap<String, Arc<HealthCheck>>>,
    pub(super) email_alerts: Arc<DashMap<String, Arc<EmailAlert>>>,
    pub(super) web_hooks: Arc<DashMap<String, Arc<WebHook>>>,
    pub(super) maintenance: RwLock<MaintenanceOverlay>,
    pub(super) monitors: Arc<DashMap<MonitorKey, Arc<Monitor>>>,
    pub(super) reaper: Mutex<Option<Reaper>>,
    pub(super) disposed: AtomicBool,
}
