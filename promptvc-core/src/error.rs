//! Error types for history operations

use crate::object::Commit;
use crate::storage::StorageError;

/// Result type for history operations
pub type Result<T> = std::result::Result<T, VcsError>;

/// Coarse classification used by the presentation layer to decide how an
/// error is surfaced (inline, notification, or a decision prompt).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; rejected synchronously and never retried
    Validation,
    /// Local state no longer has the named item
    NotFound,
    /// Expected decision point (divergent histories)
    Conflict,
    /// Remote credential problem; requires re-authentication
    Auth,
    /// Transport problem; retrying is safe
    Transient,
    /// Durable storage failed
    Storage,
}

/// Errors raised by the history store
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    #[error("Branch '{0}' already exists")]
    DuplicateName(String),

    #[error("Branch name cannot be empty")]
    EmptyName,

    #[error("Commit message cannot be empty")]
    EmptyMessage,

    #[error("Unknown branch: {0}")]
    UnknownBranch(String),

    #[error("Selected branch '{0}' no longer exists")]
    NotFound(String),

    #[error("Cannot fast-forward '{target}' to '{source_branch}': histories have diverged")]
    MergeConflict {
        source_branch: String,
        target: String,
        source_head: Option<Box<Commit>>,
        target_head: Option<Box<Commit>>,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl VcsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VcsError::DuplicateName(_) | VcsError::EmptyName | VcsError::EmptyMessage => {
                ErrorKind::Validation
            }
            VcsError::UnknownBranch(_) | VcsError::NotFound(_) => ErrorKind::NotFound,
            VcsError::MergeConflict { .. } => ErrorKind::Conflict,
            VcsError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether re-invoking the same call can succeed without user action
    pub fn is_retryable(&self) -> bool {
        matches!(self, VcsError::Storage(_))
    }
}
