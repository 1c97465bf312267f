//! Health-check engine backing DNS failover.
//!
//! The authoritative DNS answer path asks [`HealthService`] whether a target
//! is up and gets the latest cached verdict without waiting on the network.
//! Background [`Monitor`](monitor::Monitor)s keep those verdicts fresh,
//! report transitions to alert sinks and are retired once nobody asks about
//! their target anymore.

pub mod alerts;
pub mod health;
pub mod maintenance;
pub mod monitor;
pub mod service;
pub mod settings;

pub use health::{HealthCheckResponse, HealthStatus};
pub use monitor::{MonitorKey, RecordType};
pub use service::{FailoverConfig, HealthService, ServiceOptions};
