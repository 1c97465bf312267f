// 3rd party crates
use thiserror::Error;

// Project imports
use crate::settings::errors::ValidationError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("The health service must be created inside a tokio runtime")]
    NoRuntime,
    #[error("The health service has been shut down")]
    ShutDown,
    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),
    #[error("Malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
