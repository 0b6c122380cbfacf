//! Remote sync adapter
//!
//! Per-workspace connection state machine:
//!
//! ```text
//! Disconnected -> Authenticating -> Connected -> {Listing, Pushing, Pulling} -> Connected
//! ```
//!
//! A rejected credential from any state clears the remote link and returns to
//! `Disconnected`; other failures return to `Connected`. The history store is
//! only locked for short synchronous sections, never across a network call,
//! so local commits can be made while a push or pull is in flight.

use crate::error::SyncError;
use crate::remote::{RemoteCommitDraft, RemoteService};
use crate::state::SyncState;
use crate::status::MountGuard;
use crate::sync_log::{SyncDirection, SyncLog, SyncLogEntry};
use chrono::Utc;
use promptvc_core::{
    AccessToken, Commit, HistoryStore, LocalStorage, RemoteLink, RemoteRepoRef, Snapshot,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// History store handle shared between views and the adapter
pub type SharedHistory = Arc<Mutex<HistoryStore>>;

/// Message given to pulled commits whose remote message is blank
pub const PULLED_COMMIT_FALLBACK_MESSAGE: &str = "Pulled from remote";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Authenticating,
    Connected,
    Listing,
    Pushing,
    Pulling,
}

/// Outcome of a push
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReport {
    /// Commits created on the remote by this call
    pub pushed: usize,
    /// Commits skipped because the remote already has them
    pub skipped: usize,
}

/// Outcome of a pull
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullReport {
    /// Local commits created, in remote order
    pub appended: Vec<Commit>,
    /// Remote commits ignored because they are already correlated
    pub skipped: usize,
}

pub struct SyncAdapter {
    remote: Arc<dyn RemoteService>,
    history: SharedHistory,
    state: ConnectionState,
    sync_state: SyncState,
    storage: Arc<dyn LocalStorage>,
    sync_state_key: String,
    log: SyncLog,
    guard: MountGuard,
}

impl SyncAdapter {
    /// Create an adapter for the workspace in `history`. Starts `Connected`
    /// when the workspace already holds a usable credential.
    pub async fn new(remote: Arc<dyn RemoteService>, history: SharedHistory) -> Result<Self, SyncError> {
        let (storage, sync_state_key, log_key, connected) = {
            let store = history.lock().await;
            let config = store.config();
            (
                store.storage(),
                config.sync_state_key(),
                config.sync_log_key(),
                store.remote_link().is_some_and(RemoteLink::has_token),
            )
        };

        let sync_state = SyncState::load(storage.as_ref(), &sync_state_key)?;
        let state = if connected {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        };
        debug!("Sync adapter ready ({:?})", state);

        Ok(Self {
            remote,
            history,
            state,
            sync_state,
            log: SyncLog::new(Arc::clone(&storage), log_key),
            storage,
            sync_state_key,
            guard: MountGuard::new(),
        })
    }

    /// Use `guard` to detect view teardown
    pub fn with_guard(mut self, guard: MountGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn guard(&self) -> &MountGuard {
        &self.guard
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn history(&self) -> &SharedHistory {
        &self.history
    }

    pub fn sync_state(&self) -> &SyncState {
        &self.sync_state
    }

    pub fn log(&self) -> &SyncLog {
        &self.log
    }

    /// Repository chosen on the current link
    pub async fn linked_repository(&self) -> Option<RemoteRepoRef> {
        let store = self.history.lock().await;
        store.remote_link().and_then(|l| l.repository.clone())
    }

    // ── Authentication ─────────────────────────────────────────

    /// Exchange a one-time authorization code and store the resulting link.
    ///
    /// Never retried: a failed exchange means the authorization flow has to
    /// start over with a new code.
    pub async fn authenticate(&mut self, code: &str) -> Result<RemoteLink, SyncError> {
        let previous = self.state;
        self.state = ConnectionState::Authenticating;
        info!("Exchanging authorization code");

        let exchanged = self.remote.exchange_code(code).await;
        let token = match exchanged {
            Ok(token) if self.guard.is_mounted() => token,
            Ok(_) => {
                self.state = previous;
                return Err(SyncError::Detached);
            }
            Err(e) => {
                warn!("Authorization code exchange failed: {}", e);
                self.state = previous;
                return Err(SyncError::AuthExchange(e.to_string()));
            }
        };

        let link = RemoteLink::new(token);
        self.state = ConnectionState::Connected;
        self.history
            .lock()
            .await
            .set_remote_link(Some(link.clone()))?;
        info!("Connected to remote");
        Ok(link)
    }

    /// Forget the credential
    pub async fn disconnect(&mut self) -> Result<(), SyncError> {
        self.state = ConnectionState::Disconnected;
        self.history.lock().await.set_remote_link(None)?;
        info!("Disconnected from remote");
        Ok(())
    }

    /// Remember `repo` as the link's repository
    pub async fn select_repository(&mut self, repo: RemoteRepoRef) -> Result<(), SyncError> {
        let mut store = self.history.lock().await;
        let mut link = store
            .remote_link()
            .cloned()
            .ok_or(SyncError::NotConnected)?;
        info!("Selected remote repository {}", repo.id);
        link.repository = Some(repo);
        store.set_remote_link(Some(link))?;
        Ok(())
    }

    // ── Repositories ───────────────────────────────────────────

    pub async fn list_repositories(&mut self) -> Result<Vec<RemoteRepoRef>, SyncError> {
        let token = self.token().await?;
        self.state = ConnectionState::Listing;

        let result = self
            .remote
            .list_repositories(&token)
            .await
            .map_err(SyncError::from_remote);
        self.settle(result).await
    }

    pub async fn create_repository(&mut self, name: &str, private: bool) -> Result<RemoteRepoRef, SyncError> {
        let token = self.token().await?;
        self.state = ConnectionState::Listing;
        info!("Creating remote repository '{}'", name);

        let result = self
            .remote
            .create_repository(&token, name, private)
            .await
            .map_err(SyncError::from_remote);
        self.settle(result).await
    }

    // ── Push / pull ────────────────────────────────────────────

    /// Create every local commit of `branch` the remote branch does not have
    /// yet, oldest first.
    ///
    /// Not transactional: on failure the commits created so far stay pushed
    /// and `PartialPush` names the first one that failed. Re-running skips
    /// what is already pushed. Stops with `Detached` after the commit in
    /// flight when the view is torn down.
    pub async fn push(&mut self, repo: &RemoteRepoRef, branch: &str) -> Result<PushReport, SyncError> {
        let token = self.token().await?;
        let commits = self.history.lock().await.commits(branch)?.to_vec();

        self.state = ConnectionState::Pushing;
        let started = Instant::now();
        let result = self.push_commits(&token, repo, branch, commits).await;

        let transferred = match &result {
            Ok(report) => report.pushed,
            Err(SyncError::PartialPush { pushed, .. }) => *pushed,
            Err(_) => 0,
        };
        self.record_run(SyncDirection::Push, repo, branch, transferred, started, &result);
        self.settle(result).await
    }

    /// Append remote commits newer than the pull cursor after the local head.
    ///
    /// Unpushed local commits are kept; the branch may need a merge check
    /// against divergence afterwards. If an append fails, the commits already
    /// appended stay correlated and a retry continues after them.
    pub async fn pull(&mut self, repo: &RemoteRepoRef, branch: &str) -> Result<PullReport, SyncError> {
        let token = self.token().await?;
        self.history.lock().await.get_branch(branch)?;

        self.state = ConnectionState::Pulling;
        let started = Instant::now();
        let result = self.pull_commits(&token, repo, branch).await;

        let transferred = result.as_ref().map(|r| r.appended.len()).unwrap_or(0);
        self.record_run(SyncDirection::Pull, repo, branch, transferred, started, &result);
        self.settle(result).await
    }

    async fn push_commits(
        &mut self,
        token: &AccessToken,
        repo: &RemoteRepoRef,
        branch: &str,
        commits: Vec<Commit>,
    ) -> Result<PushReport, SyncError> {
        let total = commits.len();
        let pending: Vec<Commit> = {
            let known = self.sync_state.branch(repo, branch);
            commits
                .into_iter()
                .filter(|c| !known.is_some_and(|k| k.is_pushed(c.id())))
                .collect()
        };
        let skipped = total - pending.len();
        info!(
            "Pushing {} commit(s) of '{}' to {} ({} already pushed)",
            pending.len(),
            branch,
            repo.id,
            skipped
        );

        let mut pushed = 0;
        for commit in &pending {
            let draft = RemoteCommitDraft::from(commit);
            match self.remote.create_commit(token, repo, branch, &draft).await {
                Ok(created) => {
                    debug!("Pushed {} as {}", commit.id().short(), created.id);
                    self.sync_state
                        .branch_mut(repo, branch)
                        .record(commit.id().clone(), created.id);
                    self.save_sync_state()?;
                    pushed += 1;
                    if !self.guard.is_mounted() {
                        debug!("View detached; stopping push after {} commit(s)", pushed);
                        return Err(SyncError::Detached);
                    }
                }
                Err(e) if e.is_unauthorized() => return Err(SyncError::AuthExpired),
                Err(e) => {
                    warn!("Push of {} failed: {}", commit.id().short(), e);
                    return Err(SyncError::PartialPush {
                        first_failed: commit.id().clone(),
                        pushed,
                        reason: e,
                    });
                }
            }
        }

        self.sync_state.branch_mut(repo, branch).last_sync = Some(Utc::now());
        self.save_sync_state()?;
        Ok(PushReport { pushed, skipped })
    }

    async fn pull_commits(
        &mut self,
        token: &AccessToken,
        repo: &RemoteRepoRef,
        branch: &str,
    ) -> Result<PullReport, SyncError> {
        let cursor = self
            .sync_state
            .branch(repo, branch)
            .and_then(|b| b.cursor.clone());
        let fetched = self
            .remote
            .list_commits(token, repo, branch, cursor.as_ref())
            .await
            .map_err(SyncError::from_remote)?;
        self.ensure_mounted()?;

        let mut appended = Vec::new();
        let mut skipped = 0;
        let mut failure = None;
        {
            let mut store = self.history.lock().await;
            for remote_commit in &fetched {
                let sync = self.sync_state.branch_mut(repo, branch);
                if sync.is_known_remote(&remote_commit.id) {
                    skipped += 1;
                    continue;
                }
                let message = if remote_commit.message.trim().is_empty() {
                    PULLED_COMMIT_FALLBACK_MESSAGE
                } else {
                    remote_commit.message.as_str()
                };
                // A failed append leaves the branch unchanged
                match store.append_remote_commit(
                    branch,
                    message,
                    remote_commit.timestamp,
                    Snapshot::new(remote_commit.content.clone()),
                ) {
                    Ok(local) => {
                        sync.record(local.id().clone(), remote_commit.id.clone());
                        appended.push(local);
                    }
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
        }

        // Keep the pairs of commits already appended so a retry skips them
        if let Some(e) = failure {
            warn!(
                "Pull into '{}' stopped after {} commit(s): {}",
                branch,
                appended.len(),
                e
            );
            if let Err(save_err) = self.save_sync_state() {
                warn!("Failed to save sync state: {}", save_err);
            }
            return Err(e.into());
        }

        let sync = self.sync_state.branch_mut(repo, branch);
        if let Some(last) = fetched.last() {
            sync.cursor = Some(last.id.clone());
        }
        sync.last_sync = Some(Utc::now());
        self.save_sync_state()?;

        info!(
            "Pulled {} commit(s) into '{}' from {} ({} already known)",
            appended.len(),
            branch,
            repo.id,
            skipped
        );
        Ok(PullReport { appended, skipped })
    }

    // ── Internals ──────────────────────────────────────────────

    async fn token(&self) -> Result<AccessToken, SyncError> {
        if self.state == ConnectionState::Disconnected {
            return Err(SyncError::NotConnected);
        }
        let store = self.history.lock().await;
        store
            .remote_link()
            .and_then(|l| l.token.clone())
            .ok_or(SyncError::NotConnected)
    }

    fn ensure_mounted(&self) -> Result<(), SyncError> {
        if self.guard.is_mounted() {
            Ok(())
        } else {
            debug!("View detached; discarding remote result");
            Err(SyncError::Detached)
        }
    }

    /// Return to a resting state after a remote call
    async fn settle<T>(&mut self, result: Result<T, SyncError>) -> Result<T, SyncError> {
        match &result {
            Err(SyncError::AuthExpired) => {
                warn!("Remote rejected the credential; clearing link");
                self.state = ConnectionState::Disconnected;
                if let Err(e) = self.history.lock().await.set_remote_link(None) {
                    warn!("Failed to persist cleared link: {}", e);
                }
            }
            _ => self.state = ConnectionState::Connected,
        }
        result
    }

    fn save_sync_state(&self) -> Result<(), SyncError> {
        self.sync_state
            .save(self.storage.as_ref(), &self.sync_state_key)?;
        Ok(())
    }

    fn record_run<T>(
        &self,
        direction: SyncDirection,
        repo: &RemoteRepoRef,
        branch: &str,
        transferred: usize,
        started: Instant,
        result: &Result<T, SyncError>,
    ) {
        let mut entry = SyncLogEntry::new(direction, &repo.id, branch);
        entry.commits_transferred = transferred as u64;
        entry.duration_ms = started.elapsed().as_millis() as u64;
        if let Err(e) = result {
            entry.success = false;
            entry.error = Some(e.to_string());
        }
        if let Err(e) = self.log.append(&entry) {
            warn!("Failed to write sync log: {}", e);
        }
    }
}
