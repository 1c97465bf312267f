// Standard library
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

// 3rd party crates
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

// Current module imports
use super::errors::NetworkAddressError;
use super::types::{MaintenanceEntry, MaintenanceOverlay, NetworkAddress};

fn max_prefix(address: &IpAddr) -> u8 {
    match address {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn mask(address: IpAddr, prefix_length: u8) -> IpAddr {
    match address {
        IpAddr::V4(v4) => {
            let bits = u32::from(v4);
            let mask = if prefix_length == 0 {
                0
            } else {
                u32::MAX << (32 - u32::from(prefix_length))
            };
            IpAddr::V4(Ipv4Addr::from(bits & mask))
        }
        IpAddr::V6(v6) => {
            let bits = u128::from(v6);
            let mask = if prefix_length == 0 {
                0
            } else {
                u128::MAX << (128 - u32::from(prefix_length))
            };
            IpAddr::V6(Ipv6Addr::from(bits & mask))
        }
    }
}

impl NetworkAddress {
    pub fn new(address: IpAddr, prefix_length: u8) -> Result<Self, NetworkAddressError> {
        let max = max_prefix(&address);
        if prefix_length > max {
            return Err(NetworkAddressError::PrefixTooLong {
                network: format!("{}/{}", address, prefix_length),
                prefix: prefix_length,
                max,
            });
        }

        Ok(Self {
            address: mask(address, prefix_length),
            prefix_length,
        })
    }

    /// A network holding exactly one address.
    pub fn host(address: IpAddr) -> Self {
        Self {
            address,
            prefix_length: max_prefix(&address),
        }
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }

    pub fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    pub fn contains(&self, address: &IpAddr) -> bool {
        if self.address.is_ipv4() != address.is_ipv4() {
            return false;
        }
        mask(*address, self.prefix_length) == self.address
    }
}

impl FromStr for NetworkAddress {
    type Err = NetworkAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('/') {
            Some((address, prefix)) => {
                let address: IpAddr = address
                    .parse()
                    .map_err(|_| NetworkAddressError::InvalidAddress(s.to_string()))?;
                let prefix: u8 = prefix
                    .parse()
                    .map_err(|_| NetworkAddressError::InvalidPrefix(s.to_string()))?;
                Self::new(address, prefix)
            }
            None => {
                let address: IpAddr = s
                    .parse()
                    .map_err(|_| NetworkAddressError::InvalidAddress(s.to_string()))?;
                Ok(Self::host(address))
            }
        }
    }
}

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_length)
    }
}

impl Serialize for NetworkAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NetworkAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

impl MaintenanceOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every entry and repopulates from `entries`.
    pub fn replace(&mut self, entries: &[MaintenanceEntry]) {
        self.networks.clear();
        for entry in entries {
            self.networks.entry(entry.network).or_insert(entry.enable);
        }
        debug!(count = self.networks.len(), "Maintenance networks replaced");
    }

    /// The `enable` flag of the most specific network holding `address`.
    pub fn lookup(&self, address: &IpAddr) -> Option<bool> {
        self.networks
            .iter()
            .filter(|(network, _)| network.contains(address))
            .max_by_key(|(network, _)| network.prefix_length)
            .map(|(_, enable)| *enable)
    }

    pub fn is_under_maintenance(&self, address: &IpAddr) -> bool {
        self.lookup(address).unwrap_or(false)
    }

    /// True when any of `addresses` is under maintenance.
    pub fn any_under_maintenance(&self, addresses: &[IpAddr]) -> bool {
        addresses.iter().any(|a| self.is_under_maintenance(a))
    }

    pub fn entries(&self) -> Vec<MaintenanceEntry> {
        self.networks
            .iter()
            .map(|(network, enable)| MaintenanceEntry {
                network: *network,
                enable: *enable,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(network: &str, enable: bool) -> MaintenanceEntry {
        MaintenanceEntry {
            network: network.parse().unwrap(),
            enable,
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn parses_and_masks_networks() {
        let network: NetworkAddress = "192.168.10.77/24".parse().unwrap();
        assert_eq!(network.to_string(), "192.168.10.0/24");
        assert_eq!(network.address(), ip("192.168.10.0"));
        assert!(network.contains(&ip("192.168.10.1")));
        assert!(!network.contains(&ip("192.168.11.1")));

        let host: NetworkAddress = "2001:db8::1".parse().unwrap();
        assert_eq!(host.prefix_length(), 128);
        assert!(host.contains(&ip("2001:db8::1")));
        assert!(!host.contains(&ip("2001:db8::2")));
    }

    #[test]
    fn rejects_malformed_networks() {
        assert!(matches!(
            "10.0.0.0/33".parse::<NetworkAddress>(),
            Err(NetworkAddressError::PrefixTooLong { .. })
        ));
        assert!(matches!(
            "10.0.0/8".parse::<NetworkAddress>(),
            Err(NetworkAddressError::InvalidAddress(_))
        ));
        assert!(matches!(
            "10.0.0.0/x".parse::<NetworkAddress>(),
            Err(NetworkAddressError::InvalidPrefix(_))
        ));
    }

    #[test]
    fn families_never_match_each_other() {
        let network: NetworkAddress = "0.0.0.0/0".parse().unwrap();
        assert!(network.contains(&ip("8.8.8.8")));
        assert!(!network.contains(&ip("::1")));
    }

    #[test]
    fn most_specific_network_wins() {
        let mut overlay = MaintenanceOverlay::new();
        overlay.replace(&[
            entry("10.0.0.0/8", true),
            entry("10.1.0.0/16", false),
            entry("10.1.2.0/24", true),
        ]);

        assert!(overlay.is_under_maintenance(&ip("10.9.9.9")));
        assert!(!overlay.is_under_maintenance(&ip("10.1.9.9")));
        assert!(overlay.is_under_maintenance(&ip("10.1.2.3")));
        assert_eq!(overlay.lookup(&ip("192.0.2.1")), None);
    }

    #[test]
    fn replace_clears_previous_entries() {
        let mut overlay = MaintenanceOverlay::new();
        overlay.replace(&[entry("10.0.0.0/8", true)]);
        assert!(overlay.is_under_maintenance(&ip("10.0.0.1")));

        overlay.replace(&[entry("192.0.2.0/24", true)]);
        assert_eq!(overlay.len(), 1);
        assert!(!overlay.is_empty());
        assert!(!overlay.is_under_maintenance(&ip("10.0.0.1")));
        assert!(overlay.any_under_maintenance(&[ip("10.0.0.1"), ip("192.0.2.5")]));

        overlay.replace(&[]);
        assert!(overlay.is_empty());
        assert!(!overlay.any_under_maintenance(&[ip("192.0.2.5")]));
    }

    #[test]
    fn entries_deserialize_from_json() {
        let entry: MaintenanceEntry =
            serde_json::from_str(r#"{ "network": "192.0.2.0/24", "enable": true }"#).unwrap();
        assert_eq!(entry.network.to_string(), "192.0.2.0/24");
        assert!(entry.enable);

        let bad = serde_json::from_str::<MaintenanceEntry>(
            r#"{ "network": "not-a-network", "enable": true }"#,
        );
        assert!(bad.is_err());
    }
}
