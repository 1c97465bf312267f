// Standard library
use std::collections::BTreeMap;
use std::net::IpAddr;

// 3rd party crates
use serde::{Deserialize, Serialize};

/// An IP network in CIDR notation, host bits cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetworkAddress {
    pub(super) address: IpAddr,
    pub(super) prefix_length: u8,
}

/// One `underMaintenance` configuration entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceEntry {
    pub network: NetworkAddress,
    /// `true` forces targets inside `network` out of rotation.
    #[serde(alias = "enabled")]
    pub enable: bool,
}

/// Manual maintenance overrides, keyed by network.
///
/// Lookups pick the most specific network containing the address, so a
/// narrower `enable = false` entry carves a hole out of a wider maintenance
/// network.
#[derive(Debug, Clone, Default)]
pub struct MaintenanceOverlay {
    pub(super) networks: BTreeMap<NetworkAddress, bool>,
}
