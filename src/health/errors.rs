// Standard library
use std::net::IpAddr;

// 3rd party crates
use thiserror::Error;

/// Transport or protocol failure of a single probe attempt.
///
/// Never leaves the executor: it is rendered into a `Failed` response.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Connection to {address}:{port} failed: {error}")]
    Connect {
        address: IpAddr,
        port: u16,
        error: std::io::Error,
    },

    #[error("Timed out after {0} ms")]
    Timeout(u128),

    #[error("HTTP request to {url} failed: {error}")]
    Http { url: String, error: reqwest::Error },

    #[error("HTTP request to {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("URL {0} has no host")]
    MissingHost(String),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Failed to resolve {domain}: {message}")]
    Resolve { domain: String, message: String },

    #[error("No {record_type} address found for {domain}")]
    NoAddress { domain: String, record_type: String },
}
