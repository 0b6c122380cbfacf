//! History store for a single prompt workspace
//!
//! Holds the branch set, the selected-branch pointer and the optional remote
//! link. Every mutation runs to completion synchronously, is written to local
//! storage, and bumps a change counter that views watch to re-render.

use crate::branch::Branch;
use crate::config::StoreConfig;
use crate::error::{Result, VcsError};
use crate::link::RemoteLink;
use crate::merge::{self, MergeOutcome};
use crate::object::{Commit, Snapshot};
use crate::storage::{self, LocalStorage, MemoryStorage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Version tag written into the workspace document
pub const WORKSPACE_FORMAT_VERSION: u32 = 1;

/// Branches of one prompt plus the selection pointer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    branches: Vec<Branch>,
    selected: String,
    #[serde(default)]
    remote: Option<RemoteLink>,
}

impl Workspace {
    fn new(default_branch: &str) -> Self {
        Self {
            branches: vec![Branch::new(default_branch.to_string())],
            selected: default_branch.to_string(),
            remote: None,
        }
    }
}

/// On-disk shape of the workspace
#[derive(Serialize)]
struct WorkspaceDocument<'a> {
    version: u32,
    branches: &'a [Branch],
    selected: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote: Option<Cow<'a, RemoteLink>>,
}

/// Owned, persisted history for one prompt
pub struct HistoryStore {
    workspace: Workspace,
    storage: Arc<dyn LocalStorage>,
    config: StoreConfig,
    changes: watch::Sender<u64>,
}

impl HistoryStore {
    /// Open the workspace stored under `config.storage_key`, creating it on
    /// first use with one empty, selected default branch.
    pub fn open(storage: Arc<dyn LocalStorage>, config: StoreConfig) -> Result<Self> {
        let loaded: Option<Workspace> = storage::load_json(storage.as_ref(), &config.storage_key)?;
        let (changes, _) = watch::channel(0);

        let store = match loaded {
            Some(workspace) => {
                info!(
                    "Loaded workspace '{}' ({} branches)",
                    config.storage_key,
                    workspace.branches.len()
                );
                Self {
                    workspace,
                    storage,
                    config,
                    changes,
                }
            }
            None => {
                info!(
                    "Creating workspace '{}' with branch '{}'",
                    config.storage_key, config.default_branch
                );
                let store = Self {
                    workspace: Workspace::new(&config.default_branch),
                    storage,
                    config,
                    changes,
                };
                store.persist()?;
                store
            }
        };

        Ok(store)
    }

    /// Workspace backed by a fresh in-memory storage
    pub fn in_memory() -> Result<Self> {
        Self::open(Arc::new(MemoryStorage::new()), StoreConfig::default())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Storage backing this workspace (shared with the sync adapter)
    pub fn storage(&self) -> Arc<dyn LocalStorage> {
        Arc::clone(&self.storage)
    }

    /// Receiver that changes on every mutation
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    // ── Reads ──────────────────────────────────────────────────

    /// All branches in creation order
    pub fn list_branches(&self) -> &[Branch] {
        &self.workspace.branches
    }

    pub fn branch_names(&self) -> Vec<&str> {
        self.workspace.branches.iter().map(|b| b.name()).collect()
    }

    pub fn get_branch(&self, name: &str) -> Result<&Branch> {
        self.find(name)
            .ok_or_else(|| VcsError::UnknownBranch(name.to_string()))
    }

    /// Commits of `name`, oldest first
    pub fn commits(&self, name: &str) -> Result<&[Commit]> {
        Ok(self.get_branch(name)?.commits())
    }

    pub fn head(&self, name: &str) -> Result<Option<&Commit>> {
        Ok(self.get_branch(name)?.head())
    }

    pub fn selected_branch_name(&self) -> &str {
        &self.workspace.selected
    }

    /// The selected branch; `NotFound` if it has been deleted
    pub fn get_active_branch(&self) -> Result<&Branch> {
        self.find(&self.workspace.selected)
            .ok_or_else(|| VcsError::NotFound(self.workspace.selected.clone()))
    }

    pub fn remote_link(&self) -> Option<&RemoteLink> {
        self.workspace.remote.as_ref()
    }

    // ── Mutations ──────────────────────────────────────────────

    /// Point the selection at `name`. Commit data is untouched.
    pub fn select_branch(&mut self, name: &str) -> Result<()> {
        if self.find(name).is_none() {
            return Err(VcsError::UnknownBranch(name.to_string()));
        }
        debug!("Selecting branch '{}'", name);
        self.workspace.selected = name.to_string();
        self.changed()
    }

    /// Create `name` as a copy of `from`'s current history.
    ///
    /// The copy is independent: later commits to either branch do not show
    /// up in the other.
    pub fn create_branch(&mut self, name: &str, from: &str, select: bool) -> Result<&Branch> {
        let name = validate_name(name)?;
        if self.find(&name).is_some() {
            return Err(VcsError::DuplicateName(name));
        }
        let commits = self.get_branch(from)?.commits().to_vec();

        info!(
            "Creating branch '{}' from '{}' ({} commits)",
            name,
            from,
            commits.len()
        );
        self.insert_branch(Branch::with_commits(name, commits), select)
    }

    /// Create `name` with no commits
    pub fn create_empty_branch(&mut self, name: &str, select: bool) -> Result<&Branch> {
        let name = validate_name(name)?;
        if self.find(&name).is_some() {
            return Err(VcsError::DuplicateName(name));
        }

        info!("Creating empty branch '{}'", name);
        self.insert_branch(Branch::new(name), select)
    }

    /// Remove `name`. Deleting the selected branch leaves the selection
    /// dangling until another branch is selected.
    pub fn delete_branch(&mut self, name: &str) -> Result<Branch> {
        let idx = self
            .index_of(name)
            .ok_or_else(|| VcsError::UnknownBranch(name.to_string()))?;
        let removed = self.workspace.branches.remove(idx);

        info!("Deleted branch '{}' ({} commits)", name, removed.len());
        self.changed()?;
        Ok(removed)
    }

    /// Append a new commit to `branch`.
    ///
    /// All or nothing: if the workspace cannot be saved the branch is left
    /// unchanged.
    pub fn commit(&mut self, branch: &str, message: &str, snapshot: Snapshot) -> Result<Commit> {
        self.append(branch, message, None, snapshot)
    }

    /// Append a commit fetched from a remote, keeping its remote timestamp
    pub fn append_remote_commit(
        &mut self,
        branch: &str,
        message: &str,
        timestamp: DateTime<Utc>,
        snapshot: Snapshot,
    ) -> Result<Commit> {
        self.append(branch, message, Some(timestamp), snapshot)
    }

    /// Fast-forward `target` to `source`.
    ///
    /// Fails with `MergeConflict` (both branches unchanged) unless `target`'s
    /// history is a prefix of `source`'s.
    pub fn merge(&mut self, source: &str, target: &str) -> Result<MergeOutcome> {
        let source_branch = self.get_branch(source)?;
        let target_branch = self.get_branch(target)?;

        let outcome = merge::plan(source_branch, target_branch)?;
        if let MergeOutcome::FastForwarded { added } = outcome {
            let commits = source_branch.commits().to_vec();
            let idx = self
                .index_of(target)
                .ok_or_else(|| VcsError::UnknownBranch(target.to_string()))?;
            self.workspace.branches[idx].replace_commits(commits);

            info!("Fast-forwarded '{}' to '{}' (+{} commits)", target, source, added);
            self.changed()?;
        } else {
            debug!("'{}' already up to date with '{}'", target, source);
        }

        Ok(outcome)
    }

    /// Store or clear the remote link
    pub fn set_remote_link(&mut self, link: Option<RemoteLink>) -> Result<()> {
        match &link {
            Some(l) => info!(
                "Remote link set (repository: {})",
                l.repository.as_ref().map(|r| r.id.as_str()).unwrap_or("<none>")
            ),
            None => info!("Remote link cleared"),
        }
        self.workspace.remote = link;
        self.changed()
    }

    // ── Internals ──────────────────────────────────────────────

    fn append(
        &mut self,
        branch: &str,
        message: &str,
        timestamp: Option<DateTime<Utc>>,
        snapshot: Snapshot,
    ) -> Result<Commit> {
        let idx = self
            .index_of(branch)
            .ok_or_else(|| VcsError::UnknownBranch(branch.to_string()))?;
        let message = message.trim();
        if message.is_empty() {
            return Err(VcsError::EmptyMessage);
        }

        let commit = match timestamp {
            Some(ts) => Commit::with_timestamp(message.to_string(), ts, snapshot),
            None => Commit::new(message.to_string(), snapshot),
        };
        self.workspace.branches[idx].push(commit.clone());

        // A commit that could not be written is taken back out
        if let Err(e) = self.persist() {
            self.workspace.branches[idx].pop();
            warn!("Commit to '{}' not saved: {}", branch, e);
            return Err(e);
        }
        self.changes.send_modify(|n| *n += 1);

        info!(
            "Committed {} to '{}': {}",
            commit.id().short(),
            branch,
            commit.message()
        );
        Ok(commit)
    }

    fn insert_branch(&mut self, branch: Branch, select: bool) -> Result<&Branch> {
        if select {
            self.workspace.selected = branch.name().to_string();
        }
        self.workspace.branches.push(branch);
        self.changed()?;

        let last = self.workspace.branches.len() - 1;
        Ok(&self.workspace.branches[last])
    }

    fn find(&self, name: &str) -> Option<&Branch> {
        self.workspace.branches.iter().find(|b| b.name() == name)
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.workspace.branches.iter().position(|b| b.name() == name)
    }

    /// Persist, then notify watchers. Watchers are notified even when the
    /// write fails, since the in-memory state did change.
    fn changed(&mut self) -> Result<()> {
        let result = self.persist();
        self.changes.send_modify(|n| *n += 1);
        result
    }

    fn persist(&self) -> Result<()> {
        let remote = self.workspace.remote.as_ref().map(|link| {
            if self.config.persist_credentials {
                Cow::Borrowed(link)
            } else {
                Cow::Owned(link.without_secret())
            }
        });
        let document = WorkspaceDocument {
            version: WORKSPACE_FORMAT_VERSION,
            branches: &self.workspace.branches,
            selected: &self.workspace.selected,
            remote,
        };
        storage::save_json(self.storage.as_ref(), &self.config.storage_key, &document)?;
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(VcsError::EmptyName);
    }
    Ok(name.to_string())
}
