//! Error types for the SCIM client.

use scimsync_core::{RequestError, SyncError};
use thiserror::Error;

/// Result type alias using `ScimClientError`.
pub type ScimClientResult<T> = Result<T, ScimClientError>;

/// Errors returned by a SCIM target or the transport in front of it.
#[derive(Debug, Error)]
pub enum ScimClientError {
    /// Resource does not exist (404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Uniqueness violation (409).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Target asked us to slow down (429).
    #[error("Rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Bearer token rejected (401/403).
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// Any other non-2xx answer.
    #[error("SCIM error {status}: {detail}")]
    ScimError { status: u16, detail: String },

    /// Connection could not be established.
    #[error("Target unreachable: {0}")]
    Unreachable(String),

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A 2xx body that is not the expected SCIM resource.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Client could not be constructed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transient failures persisted through every retry.
    #[error("{message}")]
    MaxRetriesExceeded { attempts: u32, message: String },
}

impl ScimClientError {
    /// Transient failure worth retrying: rate limiting, connect errors and
    /// timeouts.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Unreachable(_) => true,
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }

    /// A 5xx answer from the target.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ScimError { status, .. } if *status >= 500)
    }

    /// HTTP status behind this error, if the target answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound(_) => Some(404),
            Self::Conflict(_) => Some(409),
            Self::RateLimited { .. } => Some(429),
            Self::ScimError { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<ScimClientError> for RequestError {
    fn from(error: ScimClientError) -> Self {
        Self {
            status: error.status(),
            message: error.to_string(),
        }
    }
}

impl From<ScimClientError> for SyncError {
    fn from(error: ScimClientError) -> Self {
        SyncError::load(error)
    }
}
