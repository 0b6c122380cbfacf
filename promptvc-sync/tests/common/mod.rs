//! Shared helpers for sync tests: a scripted in-memory remote.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use promptvc_core::{
    AccessToken, HistoryStore, LocalStorage, MemoryStorage, RemoteRepoRef, StorageError,
    StoreConfig,
};
use promptvc_sync::{
    RemoteCommit, RemoteCommitDraft, RemoteCommitId, RemoteError, RemoteService, SharedHistory,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const VALID_CODE: &str = "code-ok";
pub const TOKEN: &str = "tok-1";

#[derive(Default)]
struct State {
    revoked: bool,
    offline: bool,
    /// Creates allowed before every further create fails with HTTP 502
    creates_left: Option<usize>,
    repos: Vec<RemoteRepoRef>,
    commits: HashMap<(String, String), Vec<RemoteCommit>>,
    next_id: u64,
    create_calls: usize,
}

/// In-memory `RemoteService` with scriptable failures
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<State>,
    /// When set, `create_commit` waits on it before answering
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_repository(&self, id: &str) -> RemoteRepoRef {
        let repo = RemoteRepoRef::new(id, id);
        self.state.lock().unwrap().repos.push(repo.clone());
        repo
    }

    /// Let `n` more commit creations succeed, then fail the rest
    pub fn fail_creates_after(&self, n: usize) {
        self.state.lock().unwrap().creates_left = Some(n);
    }

    pub fn heal(&self) {
        let mut state = self.state.lock().unwrap();
        state.creates_left = None;
        state.offline = false;
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    pub fn revoke_token(&self) {
        self.state.lock().unwrap().revoked = true;
    }

    pub fn ungate_creates(&self) {
        *self.gate.lock().unwrap() = None;
    }

    pub fn gate_creates(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }

    /// Commit made on the remote by someone else
    pub fn inject_commit(&self, repo: &RemoteRepoRef, branch: &str, message: &str, content: &str) -> RemoteCommitId {
        let mut state = self.state.lock().unwrap();
        let commit = state.next_commit(message, content);
        let id = commit.id.clone();
        state
            .commits
            .entry((repo.id.clone(), branch.to_string()))
            .or_default()
            .push(commit);
        id
    }

    pub fn remote_commits(&self, repo: &RemoteRepoRef, branch: &str) -> Vec<RemoteCommit> {
        self.state
            .lock()
            .unwrap()
            .commits
            .get(&(repo.id.clone(), branch.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }

    fn check(&self, token: &AccessToken) -> Result<(), RemoteError> {
        let state = self.state.lock().unwrap();
        if state.offline {
            return Err(RemoteError::Transport("connection refused".into()));
        }
        if state.revoked || token.secret() != TOKEN {
            return Err(RemoteError::Unauthorized(401));
        }
        Ok(())
    }
}

impl State {
    fn next_commit(&mut self, message: &str, content: &str) -> RemoteCommit {
        self.next_id += 1;
        RemoteCommit {
            id: RemoteCommitId::new(format!("r{}", self.next_id)),
            message: message.to_string(),
            timestamp: Utc::now(),
            content: content.to_string(),
        }
    }
}

#[async_trait]
impl RemoteService for FakeRemote {
    async fn exchange_code(&self, code: &str) -> Result<AccessToken, RemoteError> {
        if self.state.lock().unwrap().offline {
            return Err(RemoteError::Transport("connection refused".into()));
        }
        if code == VALID_CODE {
            Ok(AccessToken::new(TOKEN))
        } else {
            Err(RemoteError::Rejected("bad_verification_code".into()))
        }
    }

    async fn list_repositories(&self, token: &AccessToken) -> Result<Vec<RemoteRepoRef>, RemoteError> {
        self.check(token)?;
        Ok(self.state.lock().unwrap().repos.clone())
    }

    async fn create_repository(
        &self,
        token: &AccessToken,
        name: &str,
        private: bool,
    ) -> Result<RemoteRepoRef, RemoteError> {
        self.check(token)?;
        let mut repo = RemoteRepoRef::new(format!("me/{}", name), name);
        repo.private = private;
        self.state.lock().unwrap().repos.push(repo.clone());
        Ok(repo)
    }

    async fn list_commits(
        &self,
        token: &AccessToken,
        repo: &RemoteRepoRef,
        branch: &str,
        since: Option<&RemoteCommitId>,
    ) -> Result<Vec<RemoteCommit>, RemoteError> {
        self.check(token)?;
        let all = self.remote_commits(repo, branch);
        let start = since
            .and_then(|since| all.iter().position(|c| &c.id == since))
            .map(|i| i + 1)
            .unwrap_or(0);
        Ok(all[start..].to_vec())
    }

    async fn create_commit(
        &self,
        token: &AccessToken,
        repo: &RemoteRepoRef,
        branch: &str,
        commit: &RemoteCommitDraft,
    ) -> Result<RemoteCommit, RemoteError> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check(token)?;

        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;
        match state.creates_left {
            Some(0) => {
                return Err(RemoteError::Status {
                    status: 502,
                    body: "bad gateway".into(),
                });
            }
            Some(n) => state.creates_left = Some(n - 1),
            None => {}
        }
        let mut created = state.next_commit(&commit.message, &commit.content);
        created.timestamp = commit.timestamp;
        state
            .commits
            .entry((repo.id.clone(), branch.to_string()))
            .or_default()
            .push(created.clone());
        Ok(created)
    }
}

pub fn shared_store() -> (SharedHistory, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let store = HistoryStore::open(storage.clone(), StoreConfig::default()).unwrap();
    (Arc::new(tokio::sync::Mutex::new(store)), storage)
}

/// Memory storage that can be told to reject workspace writes.
///
/// Only the workspace document is affected; sync state and log writes go
/// through.
#[derive(Default)]
pub struct FlakyStorage {
    inner: MemoryStorage,
    /// Workspace writes allowed before each further one fails
    writes_left: Mutex<Option<usize>>,
}

impl FlakyStorage {
    pub fn fail_workspace_writes_after(&self, n: usize) {
        *self.writes_left.lock().unwrap() = Some(n);
    }

    pub fn heal(&self) {
        *self.writes_left.lock().unwrap() = None;
    }
}

impl LocalStorage for FlakyStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if key == StoreConfig::default().storage_key {
            let mut left = self.writes_left.lock().unwrap();
            match *left {
                Some(0) => return Err(StorageError::Backend("quota".into())),
                Some(n) => *left = Some(n - 1),
                None => {}
            }
        }
        self.inner.write(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }
}

pub fn flaky_store() -> (SharedHistory, Arc<FlakyStorage>) {
    let storage = Arc::new(FlakyStorage::default());
    let store = HistoryStore::open(storage.clone(), StoreConfig::default()).unwrap();
    (Arc::new(tokio::sync::Mutex::new(store)), storage)
}
