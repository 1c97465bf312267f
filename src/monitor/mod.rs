//! Monitors
//!
//! One [`Monitor`] exists per [`MonitorKey`]. It owns a background loop
//! that runs its health check on the check's interval and caches the
//! latest [`HealthCheckResponse`](crate::health::HealthCheckResponse).
//! Readers only ever see whole responses; the loop swaps them under a
//! short write lock.

pub mod functions;
pub mod impls;
pub mod types;

pub use types::{Monitor, MonitorContext, MonitorKey, MonitorState, RecordType};
