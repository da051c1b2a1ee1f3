//! Error taxonomy for a sync run.
//!
//! Run-level failures ([`SyncError`]) abort before a [`crate::SyncStat`] is
//! produced. Per-record failures ([`RequestError`]) never abort; they become
//! failure entries in the phase log and the reconciler moves on.

use thiserror::Error;

use crate::model::ResourceKind;

/// Result type alias using `SyncError`.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that abort a whole sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A phase was invoked before the state it needs was loaded.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Source or target data could not be fetched.
    #[error("load failed: {0}")]
    Load(String),

    /// Two target records of the same kind carry the same `externalId`.
    #[error("data integrity: {kind} externalId \"{external_id}\" is used by more than one target record")]
    DuplicateExternalId {
        kind: ResourceKind,
        external_id: String,
    },
}

impl SyncError {
    /// Build a [`SyncError::Load`] from any displayable error.
    pub fn load(error: impl std::fmt::Display) -> Self {
        Self::Load(error.to_string())
    }
}

/// A single create/patch/delete call against the target failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct RequestError {
    /// HTTP status if the target answered at all.
    pub status: Option<u16>,
    /// Human-readable description.
    pub message: String,
}

impl RequestError {
    /// Create a request error without a status code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Create a request error for a non-2xx answer.
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}
