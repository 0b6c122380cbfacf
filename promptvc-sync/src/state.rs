//! Local/remote commit correlation.
//!
//! Local and remote commits have unrelated ids, so the adapter keeps an
//! explicit mapping per (remote repository, branch) plus a pull cursor: the
//! last remote commit already seen on that branch.

use crate::remote::RemoteCommitId;
use chrono::{DateTime, Utc};
use promptvc_core::storage::{self, LocalStorage, StorageError};
use promptvc_core::{CommitId, RemoteRepoRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Correlation state for one remote branch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSyncState {
    #[serde(default)]
    pub local_to_remote: BTreeMap<CommitId, RemoteCommitId>,
    #[serde(default)]
    pub remote_to_local: BTreeMap<RemoteCommitId, CommitId>,
    /// Last remote commit fetched by a pull
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<RemoteCommitId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
}

impl BranchSyncState {
    pub fn is_pushed(&self, local: &CommitId) -> bool {
        self.local_to_remote.contains_key(local)
    }

    pub fn is_known_remote(&self, remote: &RemoteCommitId) -> bool {
        self.remote_to_local.contains_key(remote)
    }

    pub fn remote_id(&self, local: &CommitId) -> Option<&RemoteCommitId> {
        self.local_to_remote.get(local)
    }

    pub fn record(&mut self, local: CommitId, remote: RemoteCommitId) {
        self.remote_to_local.insert(remote.clone(), local.clone());
        self.local_to_remote.insert(local, remote);
    }
}

/// Persisted correlation state for a workspace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(default)]
    branches: BTreeMap<String, BranchSyncState>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from storage; missing documents yield an empty state
    pub fn load(storage: &dyn LocalStorage, key: &str) -> Result<Self, StorageError> {
        Ok(storage::load_json(storage, key)?.unwrap_or_default())
    }

    pub fn save(&self, storage: &dyn LocalStorage, key: &str) -> Result<(), StorageError> {
        storage::save_json(storage, key, self)
    }

    pub fn branch(&self, repo: &RemoteRepoRef, branch: &str) -> Option<&BranchSyncState> {
        self.branches.get(&scope_key(repo, branch))
    }

    pub fn branch_mut(&mut self, repo: &RemoteRepoRef, branch: &str) -> &mut BranchSyncState {
        self.branches.entry(scope_key(repo, branch)).or_default()
    }

    /// Drop all correlation for `repo`
    pub fn forget_repository(&mut self, repo: &RemoteRepoRef) {
        let prefix = format!("{}#", repo.id);
        self.branches.retain(|k, _| !k.starts_with(&prefix));
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

fn scope_key(repo: &RemoteRepoRef, branch: &str) -> String {
    format!("{}#{}", repo.id, branch)
}
