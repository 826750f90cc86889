//! Error types for the Open5e client.
//!
//! # Design
//! Three kinds surface from a query: the connection could not be made
//! (`TransportError`), the server answered with a non-2xx status
//! (`HttpError`), or the body was not JSON (`DecodeError`). None of them is
//! recovered inside the crate. `ConfigError` and `UrlError` only occur while
//! constructing a client or a request from a bad base URL.

use thiserror::Error;

/// Errors returned by `Open5eClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No response was obtained: connect failure or timeout, after retries.
    #[error("transport failed after {attempts} attempt(s): {source}")]
    TransportError {
        attempts: u32,
        #[source]
        source: ureq::Error,
    },

    /// The server returned a non-2xx status.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body is not valid JSON.
    #[error("response body is not valid JSON: {0}")]
    DecodeError(#[from] serde_json::Error),

    #[error("invalid client configuration: {0}")]
    ConfigError(String),

    #[error("invalid request URL: {0}")]
    UrlError(#[from] url::ParseError),
}

impl ApiError {
    /// HTTP status code, when the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::TransportError { .. })
    }
}
