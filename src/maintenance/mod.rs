//! Maintenance Overlay
//!
//! A flat set of `(network, enable)` entries consulted when a verdict is
//! handed to a caller. It never alters probe results themselves.

pub mod errors;
pub mod impls;
pub mod types;

pub use errors::NetworkAddressError;
pub use types::{MaintenanceEntry, MaintenanceOverlay, NetworkAddress};
