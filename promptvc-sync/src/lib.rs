//! PromptVC Sync Library
//!
//! Remote synchronization for PromptVC workspaces:
//! - `RemoteService` seam and its HTTP JSON client
//! - Connection state machine, push and pull (`SyncAdapter`)
//! - Local/remote commit correlation and sync log
//! - View controller with per-action status and notifications

pub mod adapter;
pub mod config;
pub mod controller;
pub mod error;
pub mod remote;
pub mod state;
pub mod status;
pub mod sync_log;

pub use adapter::{ConnectionState, PullReport, PushReport, SharedHistory, SyncAdapter};
pub use config::RemoteConfig;
pub use controller::SyncController;
pub use error::{RemoteError, SyncError};
pub use remote::{HttpRemote, RemoteCommit, RemoteCommitDraft, RemoteCommitId, RemoteService};
pub use state::{BranchSyncState, SyncState};
pub use status::{MountGuard, OperationStatus, RemoteAction};
pub use sync_log::{SyncDirection, SyncLog, SyncLogEntry};
