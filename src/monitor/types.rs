// Standard library
use std::net::IpAddr;
use std::sync::Arc;

// 3rd party crates
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use url::Url;

// Project imports
use crate::alerts::types::AlertDispatcher;
use crate::health::traits::Resolver;
use crate::health::types::{HealthCheck, HealthCheckResponse};

/// Address family a domain-form Monitor resolves its target to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    A,
    #[serde(rename = "AAAA", alias = "Aaaa", alias = "aaaa")]
    Aaaa,
}

/// Identity of a monitored target.
///
/// Equal keys share one Monitor. The `Display` form is the flat, stable
/// serialization: `check|address[|url]` or `check|domain|type[|url]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MonitorKey {
    Address {
        health_check: String,
        address: IpAddr,
        url: Option<Url>,
    },
    Domain {
        health_check: String,
        /// Always lower case.
        domain: String,
        record_type: RecordType,
        url: Option<Url>,
    },
}

/// Latest probe outcome of a Monitor.
#[derive(Debug, Clone)]
pub struct MonitorState {
    /// Real probe result, never rewritten by maintenance overrides.
    pub response: HealthCheckResponse,
    /// Addresses the last cycle probed.
    pub addresses: Vec<IpAddr>,
}

/// What a probing loop needs from the registry, without owning it.
#[derive(Clone)]
pub struct MonitorContext {
    pub health_checks: Arc<DashMap<String, Arc<HealthCheck>>>,
    pub dispatcher: AlertDispatcher,
    pub resolver: Arc<dyn Resolver>,
}

pub(super) struct MonitorTask {
    pub(super) shutdown_tx: Option<watch::Sender<bool>>,
    pub(super) handle: Option<JoinHandle<()>>,
    pub(super) disposed: bool,
}

/// One live probing loop and its cached verdict.
pub struct Monitor {
    pub(super) key: MonitorKey,
    pub(super) state: Arc<RwLock<MonitorState>>,
    pub(super) last_access: Mutex<Instant>,
    pub(super) task: Mutex<MonitorTask>,
}
