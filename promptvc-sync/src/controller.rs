//! Presentation-facing controller
//!
//! Wraps the sync adapter and the shared history store for one view: tracks a
//! loading status per remote action, turns every outcome into a
//! `Notification`, and stops touching anything once the view is torn down.

use crate::adapter::{PullReport, PushReport, SharedHistory, SyncAdapter};
use crate::error::SyncError;
use crate::status::{MountGuard, OperationStatus, RemoteAction};
use promptvc_core::{Commit, MergeOutcome, Notifier, RemoteLink, RemoteRepoRef, Snapshot, VcsError};
use std::collections::HashMap;
use tracing::debug;

pub struct SyncController {
    adapter: SyncAdapter,
    notifier: Notifier,
    statuses: HashMap<RemoteAction, OperationStatus>,
    guard: MountGuard,
}

impl SyncController {
    pub fn new(adapter: SyncAdapter, notifier: Notifier) -> Self {
        let guard = adapter.guard().clone();
        Self {
            adapter,
            notifier,
            statuses: HashMap::new(),
            guard,
        }
    }

    pub fn adapter(&self) -> &SyncAdapter {
        &self.adapter
    }

    pub fn history(&self) -> &SharedHistory {
        self.adapter.history()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn guard(&self) -> &MountGuard {
        &self.guard
    }

    pub fn status(&self, action: RemoteAction) -> OperationStatus {
        self.statuses.get(&action).cloned().unwrap_or_default()
    }

    pub fn is_loading(&self, action: RemoteAction) -> bool {
        self.status(action).is_loading()
    }

    /// View teardown: later completions are ignored and the notification goes away
    pub fn teardown(&self) {
        debug!("Tearing down sync controller");
        self.guard.unmount();
        self.notifier.clear();
    }

    // ── Remote actions ─────────────────────────────────────────

    pub async fn authenticate(&mut self, code: &str) -> Result<RemoteLink, SyncError> {
        self.begin(RemoteAction::Authenticate);
        let result = self.adapter.authenticate(code).await;
        self.resolve(RemoteAction::Authenticate, result, |_| {
            "Connected to remote".to_string()
        })
    }

    pub async fn list_repositories(&mut self) -> Result<Vec<RemoteRepoRef>, SyncError> {
        self.begin(RemoteAction::ListRepositories);
        let result = self.adapter.list_repositories().await;
        self.resolve(RemoteAction::ListRepositories, result, |repos| {
            format!("Found {} repositories", repos.len())
        })
    }

    /// Create a repository and link it
    pub async fn create_repository(&mut self, name: &str, private: bool) -> Result<RemoteRepoRef, SyncError> {
        self.begin(RemoteAction::CreateRepository);
        let result = match self.adapter.create_repository(name, private).await {
            Ok(repo) if self.guard.is_mounted() => self
                .adapter
                .select_repository(repo.clone())
                .await
                .map(|()| repo),
            other => other,
        };
        self.resolve(RemoteAction::CreateRepository, result, |repo| {
            format!("Created repository {}", repo.name)
        })
    }

    pub async fn select_repository(&mut self, repo: RemoteRepoRef) -> Result<(), SyncError> {
        let result = self.adapter.select_repository(repo).await;
        if let Err(e) = &result {
            self.notifier.error(e.to_string());
        }
        result
    }

    pub async fn disconnect(&mut self) -> Result<(), SyncError> {
        let result = self.adapter.disconnect().await;
        match &result {
            Ok(()) => self.notifier.success("Disconnected from remote"),
            Err(e) => self.notifier.error(e.to_string()),
        };
        result
    }

    /// Push `branch` to the linked repository
    pub async fn push(&mut self, branch: &str) -> Result<PushReport, SyncError> {
        self.begin(RemoteAction::Push);
        let result = match self.adapter.linked_repository().await {
            Some(repo) => self.adapter.push(&repo, branch).await,
            None => Err(SyncError::NoRepository),
        };
        self.resolve(RemoteAction::Push, result, |report| match report.pushed {
            0 => "Remote already up to date".to_string(),
            n => format!("Pushed {} commit(s)", n),
        })
    }

    /// Pull the linked repository into `branch`
    pub async fn pull(&mut self, branch: &str) -> Result<PullReport, SyncError> {
        self.begin(RemoteAction::Pull);
        let result = match self.adapter.linked_repository().await {
            Some(repo) => self.adapter.pull(&repo, branch).await,
            None => Err(SyncError::NoRepository),
        };
        self.resolve(RemoteAction::Pull, result, |report| match report.appended.len() {
            0 => "No new commits".to_string(),
            n => format!("Pulled {} commit(s)", n),
        })
    }

    // ── Local actions ──────────────────────────────────────────

    /// Commit on `branch`. Validation errors are returned for inline display
    /// and do not produce a notification.
    pub async fn commit(&mut self, branch: &str, message: &str, snapshot: Snapshot) -> Result<Commit, VcsError> {
        let result = self.history().lock().await.commit(branch, message, snapshot);
        self.report_local(&result, |c| format!("Committed {}", c.id().short()));
        result
    }

    pub async fn create_branch(&mut self, name: &str, from: &str) -> Result<(), VcsError> {
        let result = self
            .history()
            .lock()
            .await
            .create_branch(name, from, true)
            .map(|_| ());
        self.report_local(&result, |_| format!("Created branch '{}'", name));
        result
    }

    /// Merge `source` into `target`. A conflict is reported as an error
    /// notification and returned so the caller can offer resolution.
    pub async fn merge(&mut self, source: &str, target: &str) -> Result<MergeOutcome, VcsError> {
        let result = self.history().lock().await.merge(source, target);
        self.report_local(&result, |outcome| match outcome {
            MergeOutcome::UpToDate => format!("'{}' is already up to date", target),
            MergeOutcome::FastForwarded { added } => {
                format!("Merged '{}' into '{}' (+{} commits)", source, target, added)
            }
        });
        result
    }

    // ── Internals ──────────────────────────────────────────────

    fn begin(&mut self, action: RemoteAction) {
        self.statuses.insert(action, OperationStatus::InFlight);
    }

    fn resolve<T>(
        &mut self,
        action: RemoteAction,
        result: Result<T, SyncError>,
        describe: impl FnOnce(&T) -> String,
    ) -> Result<T, SyncError> {
        if !self.guard.is_mounted() {
            debug!("Ignoring {:?} completion after teardown", action);
            return result;
        }

        let (ok, message) = match &result {
            Ok(value) => (true, describe(value)),
            Err(e) => (false, e.to_string()),
        };
        if ok {
            self.notifier.success(message.clone());
        } else {
            self.notifier.error(message.clone());
        }
        self.statuses
            .insert(action, OperationStatus::Resolved { ok, message });
        result
    }

    fn report_local<T>(&self, result: &Result<T, VcsError>, describe: impl FnOnce(&T) -> String) {
        if !self.guard.is_mounted() {
            return;
        }
        match result {
            Ok(value) => {
                self.notifier.success(describe(value));
            }
            Err(VcsError::EmptyMessage | VcsError::EmptyName | VcsError::DuplicateName(_)) => {}
            Err(e) => {
                self.notifier.error(e.to_string());
            }
        }
    }
}
