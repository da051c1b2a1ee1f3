//! Error types for the Google Workspace identity source.

use scimsync_core::SyncError;
use thiserror::Error;

/// Result type alias using `GoogleError`.
pub type GoogleResult<T> = Result<T, GoogleError>;

/// Errors that can occur when talking to Google Workspace.
#[derive(Debug, Error)]
pub enum GoogleError {
    /// Credentials or client settings are unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The token endpoint refused the service account assertion.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Admin SDK error response.
    #[error("Directory API error: {code} - {message}")]
    Api { code: u16, message: String },

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The JWT assertion could not be signed.
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    /// Transient failures persisted through every retry.
    #[error("Maximum retries ({attempts}) exceeded: {message}")]
    MaxRetriesExceeded { attempts: u32, message: String },
}

impl GoogleError {
    /// Status code of an API error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { code, .. } => Some(*code),
            Self::RateLimited { .. } => Some(429),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<GoogleError> for SyncError {
    fn from(error: GoogleError) -> Self {
        SyncError::Load(error.to_string())
    }
}
