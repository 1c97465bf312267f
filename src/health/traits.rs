// Standard library
use std::net::IpAddr;

// 3rd party crates
use async_trait::async_trait;

// Project imports
use crate::monitor::types::RecordType;

use super::errors::ProbeError;
use super::types::ProbeRequest;

/// Performs one probe attempt against a concrete target.
///
/// Implementations report transport faults as [`ProbeError`]; the health
/// check turns them into a `Failed` response, so a prober never has to
/// worry about terminating a Monitor.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, request: &ProbeRequest) -> Result<(), ProbeError>;
}

/// Resolves a monitored domain to the addresses it currently points at.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(
        &self,
        domain: &str,
        record_type: RecordType,
    ) -> Result<Vec<IpAddr>, ProbeError>;
}
