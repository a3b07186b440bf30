//! Error types for the conformance engine
//!
//! Three kinds reach callers:
//! - backend failures, surfaced verbatim from the gateway
//! - unmet preconditions (no project, no open work item)
//! - catalogue validation failures
//!
//! An empty link-query result is never an error; discovery reports it as
//! "nothing linked yet".

use cc_gateway::GatewayError;
use cc_model::ValidationError;
use serde_json::json;

/// Engine error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConformanceError {
    /// Transport, status or permission failure talking to a backend
    #[error("backend error: {0}")]
    Backend(#[from] GatewayError),

    /// Required context is missing; the feature is unavailable
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Rejected catalogue edit
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ConformanceError {
    /// Missing-context error
    #[inline]
    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Check if this is a backend failure
    #[inline]
    #[must_use]
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_))
    }

    /// JSON rendering of the cause, appended to error banners
    #[must_use]
    pub fn report(&self) -> String {
        let value = match self {
            Self::Backend(cause) => json!({ "kind": "backend", "cause": cause }),
            Self::Precondition(message) => json!({ "kind": "precondition", "message": message }),
            Self::Validation(cause) => json!({
                "kind": "validation",
                "message": cause.to_string(),
                "subject": cause.subject(),
            }),
        };
        value.to_string()
    }
}

/// Result alias for engine operations
pub type Result<T, E = ConformanceError> = std::result::Result<T, E>;
