// 3rd party crates
use thiserror::Error;

/// Delivery failure of an alert sink. Logged by the dispatcher, never
/// propagated to the Monitor that raised the transition.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Web hook request to {url} failed: {error}")]
    Http { url: String, error: reqwest::Error },

    #[error("Web hook {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to build HTTP client: {0}")]
    HttpClientBuild(#[from] reqwest::Error),

    #[error("Email alert '{0}' has no recipients")]
    NoRecipients(String),

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    #[error("{0} of {1} deliveries failed")]
    Partial(usize, usize),
}
