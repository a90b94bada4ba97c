use argo_submit_types::{ApiStatus, InvalidResourceName};
use thiserror::Error;

use crate::config::ConfigError;

/// Error surfaced by API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Connection, TLS or protocol failure before a response was read.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The API server answered with a non-success status.
    #[error("API server returned HTTP {code}: {status}")]
    Status { code: u16, status: ApiStatus },
    #[error("failed to decode API response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidName(#[from] InvalidResourceName),
}

impl ApiError {
    /// HTTP status code when the server rejected the request.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}
