//! Health-Check Executor
//!
//! A [`HealthCheck`] is a named, reusable probe definition. Executing it
//! against a target runs one probe cycle (up to `retries` attempts, each
//! bounded by `timeout`) and always yields a [`HealthCheckResponse`]:
//! transport faults are caught here and never reach the Monitor loop.
//!
//! Two protocol families are supported by [`NetworkProber`]:
//! - address reachability: a TCP connect to the configured port,
//! - application check: an HTTP(S) `GET` of the probe URL, pinned to the
//!   probed address, succeeding on any 2xx status.
//!
//! The family is chosen by whether a probe URL is present, either on the
//! query or in the health check configuration.

pub mod constants;
pub mod errors;
pub mod impls;
pub mod traits;
pub mod types;

pub use errors::ProbeError;
pub use traits::{Prober, Resolver};
pub use types::{
    HealthCheck, HealthCheckConfig, HealthCheckResponse, HealthStatus, NetworkProber,
    ProbeRequest, ProbeTarget, SystemResolver,
};
