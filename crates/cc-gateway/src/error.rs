//! Backend errors
//!
//! Every transport, permission or decoding failure on the way to the
//! work-item backend or the extension data service ends up here. Callers
//! surface these verbatim; nothing in this crate retries.

use serde::Serialize;

/// Failure talking to a backend service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum GatewayError {
    /// Connection, TLS or timeout failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success response
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// Credentials rejected or insufficient permissions
    #[error("unauthorized (HTTP {0})")]
    Unauthorized(u16),

    /// Requested resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Response body did not have the expected shape
    #[error("decode error: {0}")]
    Decode(String),

    /// Connection settings are incomplete or invalid
    #[error("configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Check if this is a missing-resource error
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Map a non-success status to an error
    #[must_use]
    pub fn from_status(status: u16, body: String, resource: &str) -> Self {
        match status {
            401 | 403 => Self::Unauthorized(status),
            404 => Self::NotFound(resource.to_string()),
            _ => Self::Status { status, body },
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
