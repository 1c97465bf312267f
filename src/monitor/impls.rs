// Standard library
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

// 3rd party crates
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, trace};
use url::Url;

// Project imports
use crate::health::types::HealthCheckResponse;

use super::functions::run_monitor_loop;
use super::types::{Monitor, MonitorContext, MonitorKey, MonitorState, MonitorTask, RecordType};

impl RecordType {
    /// Whether `address` belongs to this record type's family.
    pub fn matches(&self, address: &IpAddr) -> bool {
        match self {
            RecordType::A => address.is_ipv4(),
            RecordType::Aaaa => address.is_ipv6(),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::Aaaa => write!(f, "AAAA"),
        }
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            _ => Err(format!("Unsupported record type: {}", s)),
        }
    }
}

impl MonitorKey {
    pub fn address(health_check: &str, address: IpAddr, url: Option<&Url>) -> Self {
        MonitorKey::Address {
            health_check: health_check.to_string(),
            address,
            url: url.cloned(),
        }
    }

    /// Domain-form key; the domain is lower-cased so case variants of one
    /// name share a Monitor.
    pub fn domain(
        health_check: &str,
        domain: &str,
        record_type: RecordType,
        url: Option<&Url>,
    ) -> Self {
        MonitorKey::Domain {
            health_check: health_check.to_string(),
            domain: domain.to_lowercase(),
            record_type,
            url: url.cloned(),
        }
    }

    pub fn health_check(&self) -> &str {
        match self {
            MonitorKey::Address { health_check, .. } => health_check,
            MonitorKey::Domain { health_check, .. } => health_check,
        }
    }

    pub fn url(&self) -> Option<&Url> {
        match self {
            MonitorKey::Address { url, .. } => url.as_ref(),
            MonitorKey::Domain { url, .. } => url.as_ref(),
        }
    }

    /// Human readable target without the health check name.
    pub fn target(&self) -> String {
        match self {
            MonitorKey::Address { address, .. } => address.to_string(),
            MonitorKey::Domain {
                domain,
                record_type,
                ..
            } => format!("{} {}", domain, record_type),
        }
    }
}

impl fmt::Display for MonitorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorKey::Address {
                health_check,
                address,
                url,
            } => {
                write!(f, "{}|{}", health_check, address)?;
                if let Some(url) = url {
                    write!(f, "|{}", url)?;
                }
                Ok(())
            }
            MonitorKey::Domain {
                health_check,
                domain,
                record_type,
                url,
            } => {
                write!(f, "{}|{}|{}", health_check, domain, record_type)?;
                if let Some(url) = url {
                    write!(f, "|{}", url)?;
                }
                Ok(())
            }
        }
    }
}

impl Monitor {
    /// Creates an idle Monitor; nothing is probed until [`Monitor::start`].
    pub fn new(key: MonitorKey) -> Self {
        let addresses = match &key {
            MonitorKey::Address { address, .. } => vec![*address],
            MonitorKey::Domain { .. } => Vec::new(),
        };

        Self {
            key,
            state: Arc::new(RwLock::new(MonitorState {
                response: HealthCheckResponse::unknown(),
                addresses,
            })),
            last_access: Mutex::new(Instant::now()),
            task: Mutex::new(MonitorTask {
                shutdown_tx: None,
                handle: None,
                disposed: false,
            }),
        }
    }

    /// Spawns the probing loop on `runtime`.
    ///
    /// Does nothing when the loop already runs or the Monitor was disposed,
    /// so a Monitor never owns more than one loop.
    pub fn start(&self, runtime: &Handle, context: MonitorContext) -> bool {
        let mut task = self.task.lock();
        if task.disposed || task.handle.is_some() {
            return false;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = runtime.spawn(run_monitor_loop(
            self.key.clone(),
            Arc::clone(&self.state),
            context,
            shutdown_rx,
        ));

        task.shutdown_tx = Some(shutdown_tx);
        task.handle = Some(handle);
        trace!(monitor = %self.key, "Monitor started");
        true
    }

    pub fn key(&self) -> &MonitorKey {
        &self.key
    }

    /// The real result of the latest probe cycle.
    pub fn last_response(&self) -> HealthCheckResponse {
        self.state.read().response.clone()
    }

    pub fn snapshot(&self) -> MonitorState {
        self.state.read().clone()
    }

    /// Addresses the verdict applies to: the fixed address, or the
    /// addresses the domain resolved to on the last cycle.
    pub fn addresses(&self) -> Vec<IpAddr> {
        self.state.read().addresses.clone()
    }

    /// Records a query against this Monitor.
    pub fn touch(&self) {
        *self.last_access.lock() = Instant::now();
    }

    pub fn last_access(&self) -> Instant {
        *self.last_access.lock()
    }

    /// True iff the Monitor was not queried for longer than `expiry`.
    pub fn is_expired(&self, now: Instant, expiry: Duration) -> bool {
        now.saturating_duration_since(self.last_access()) > expiry
    }

    /// Whether a probing loop is currently alive.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stops the probing loop and waits until it is gone.
    ///
    /// An in-flight probe is cancelled. Later calls, and later `start`
    /// calls, are no-ops.
    pub async fn dispose(&self) {
        let (shutdown_tx, handle) = {
            let mut task = self.task.lock();
            task.disposed = true;
            (task.shutdown_tx.take(), task.handle.take())
        };

        if let Some(shutdown_tx) = shutdown_tx {
            let _ = shutdown_tx.send(true);
        }

        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
            debug!(monitor = %self.key, "Monitor disposed");
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().handle.take() {
            handle.abort();
        }
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("key", &self.key.to_string())
            .field("last_response", &self.last_response())
            .finish()
    }
}
