// 3rd party crates
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkAddressError {
    #[error("Invalid IP address in network '{0}'")]
    InvalidAddress(String),
    #[error("Invalid prefix length in network '{0}'")]
    InvalidPrefix(String),
    #[error("Prefix length {prefix} exceeds {max} in network '{network}'")]
    PrefixTooLong { network: String, prefix: u8, max: u8 },
}
