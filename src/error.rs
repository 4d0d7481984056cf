//! Error types for roster operations.
//!
//! The remote-facing taxonomy follows the reconciliation contract:
//! - transport failures are transient and may succeed if simply re-invoked,
//! - protocol violations need a fix on the remote side or in the request,
//! - a missing upstream record is a valid negative result, not a fault.
//!
//! All three are absorbed at the repository boundary during reconciliation
//! and surfaced through the error sink only; callers of the repository never
//! see them.

use thiserror::Error;

/// Errors that can occur while serving or refreshing the local roster.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network-level failure reaching the remote directory (connect failure,
    /// timeout, interrupted body).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The remote answered, but not in a form we can use (unexpected status
    /// code, malformed body).
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The remote directory has no record for this id.
    #[error("employee {0} not found in remote directory")]
    NotFound(u32),

    /// Unusable configuration (bad base URL, invalid header value).
    #[error("configuration error: {0}")]
    Config(String),

    /// Database error from the SQLite store.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type alias for roster operations.
pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    /// Returns true if re-invoking the failed operation could succeed with
    /// nothing else changing. Only transport failures qualify; protocol and
    /// configuration errors repeat until fixed at their source.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Transport(_))
    }

    /// Returns true for the valid-negative-result case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound(_))
    }
}
