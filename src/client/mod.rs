//! HTTP client for the scanning service endpoints.

mod http_client;

pub use http_client::{file_name, is_dot_segment, ScanClient, USER_AGENT};

use thiserror::Error;

/// Errors that can occur while talking to the scanning service.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to build HTTP client: {0}")]
    Build(reqwest::Error),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// `.` and `..` would be collapsed out of the request path.
    #[error("Invalid task id: {0:?}")]
    InvalidTaskId(String),

    #[error("Invalid response: {0}")]
    Parse(String),

    /// The service answered `success: false`. Holds its error text verbatim.
    #[error("{0}")]
    Rejected(String),
}

impl ClientError {
    /// Domain failures reported by the backend, as opposed to transport trouble.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ClientError::Rejected(_))
    }
}
