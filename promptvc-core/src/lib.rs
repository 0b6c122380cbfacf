//! PromptVC Core Library
//!
//! Version control for prompt iterations:
//! - Object model (Commit, Snapshot)
//! - Branches as append-only commit sequences
//! - History store with local persistence
//! - Fast-forward-or-flag merge policy
//! - Remote link model (credential + chosen repository)
//! - Self-expiring notification channel

pub mod branch;
pub mod config;
pub mod error;
pub mod link;
pub mod merge;
pub mod notify;
pub mod object;
pub mod repository;
pub mod storage;

pub use branch::Branch;
pub use config::StoreConfig;
pub use error::{ErrorKind, Result, VcsError};
pub use link::{AccessToken, RemoteLink, RemoteRepoRef};
pub use merge::MergeOutcome;
pub use notify::{Notification, NotificationKind, Notifier, NOTIFICATION_TTL};
pub use object::{Commit, CommitId, Snapshot};
pub use repository::{HistoryStore, Workspace};
pub use storage::{FileStorage, LocalStorage, MemoryStorage, StorageError};
