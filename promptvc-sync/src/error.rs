//! Error types for remote synchronization

use promptvc_core::{CommitId, ErrorKind, StorageError, VcsError};

/// Failure reported by a `RemoteService` implementation
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("credential rejected by remote (HTTP {0})")]
    Unauthorized(u16),

    #[error("remote returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("token exchange rejected: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RemoteError::Unauthorized(_))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RemoteError::Decode(e.to_string())
        } else {
            RemoteError::Transport(e.to_string())
        }
    }
}

/// Errors returned by sync operations
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Not connected to a remote; sign in first")]
    NotConnected,

    #[error("No remote repository selected")]
    NoRepository,

    #[error("Authorization failed: {0}")]
    AuthExchange(String),

    #[error("Remote credential expired or was revoked; sign in again")]
    AuthExpired,

    #[error("Network error: {0}")]
    Network(#[source] RemoteError),

    #[error("Push stopped at commit {first_failed} after {pushed} commit(s): {reason}")]
    PartialPush {
        first_failed: CommitId,
        pushed: usize,
        #[source]
        reason: RemoteError,
    },

    #[error("View was closed; result discarded")]
    Detached,

    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl SyncError {
    /// Map a remote failure outside of a push sequence
    pub(crate) fn from_remote(e: RemoteError) -> Self {
        if e.is_unauthorized() {
            SyncError::AuthExpired
        } else {
            SyncError::Network(e)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::NotConnected | SyncError::AuthExchange(_) | SyncError::AuthExpired => {
                ErrorKind::Auth
            }
            SyncError::NoRepository => ErrorKind::Validation,
            SyncError::Network(_) | SyncError::PartialPush { .. } | SyncError::Detached => {
                ErrorKind::Transient
            }
            SyncError::Vcs(e) => e.kind(),
            SyncError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether re-invoking the same operation is safe and may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Network(_) | SyncError::PartialPush { .. } | SyncError::Storage(_) => true,
            SyncError::Vcs(e) => e.is_retryable(),
            _ => false,
        }
    }
}
