//! Registry and status queries
//!
//! [`HealthService`] owns every health check, alert sink, maintenance entry
//! and Monitor. [`HealthService::reload`] reconciles them against a
//! [`FailoverConfig`]; the `query_*` methods answer from cached state only,
//! creating Monitors lazily on first use. A [`Reaper`] retires Monitors
//! nobody asked about for a while.

pub mod constants;
pub mod errors;
pub mod impls;
pub mod reaper;
pub mod types;

pub use errors::ServiceError;
pub use types::{Collaborators, FailoverConfig, HealthService, MonitorInfo, Reaper, ServiceOptions};
