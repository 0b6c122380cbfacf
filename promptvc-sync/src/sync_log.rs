//! Sync log: a bounded record of completed push/pull runs.

use chrono::Utc;
use promptvc_core::storage::{self, LocalStorage, StorageError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Entries kept before the oldest are dropped
pub const MAX_LOG_ENTRIES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    Push,
    Pull,
}

impl std::fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncDirection::Push => f.write_str("push"),
            SyncDirection::Pull => f.write_str("pull"),
        }
    }
}

/// One push or pull run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub direction: SyncDirection,
    pub repository: String,
    pub branch: String,
    /// Unix seconds
    pub timestamp: i64,
    pub commits_transferred: u64,
    pub duration_ms: u64,
    pub success: bool,
    pub error: Option<String>,
}

impl SyncLogEntry {
    pub fn new(direction: SyncDirection, repository: &str, branch: &str) -> Self {
        Self {
            direction,
            repository: repository.to_string(),
            branch: branch.to_string(),
            timestamp: Utc::now().timestamp(),
            commits_transferred: 0,
            duration_ms: 0,
            success: true,
            error: None,
        }
    }
}

/// Sync log stored as one JSON array under a storage key
pub struct SyncLog {
    storage: Arc<dyn LocalStorage>,
    key: String,
}

impl SyncLog {
    pub fn new(storage: Arc<dyn LocalStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Append an entry, dropping the oldest beyond `MAX_LOG_ENTRIES`
    pub fn append(&self, entry: &SyncLogEntry) -> Result<(), StorageError> {
        let mut entries = self.all()?;
        entries.push(entry.clone());
        if entries.len() > MAX_LOG_ENTRIES {
            let excess = entries.len() - MAX_LOG_ENTRIES;
            entries.drain(..excess);
        }
        storage::save_json(self.storage.as_ref(), &self.key, &entries)
    }

    /// All entries, oldest first
    pub fn all(&self) -> Result<Vec<SyncLogEntry>, StorageError> {
        Ok(storage::load_json(self.storage.as_ref(), &self.key)?.unwrap_or_default())
    }

    pub fn latest(&self) -> Result<Option<SyncLogEntry>, StorageError> {
        Ok(self.all()?.into_iter().last())
    }

    /// Entries for one remote branch
    pub fn for_branch(&self, repository: &str, branch: &str) -> Result<Vec<SyncLogEntry>, StorageError> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|e| e.repository == repository && e.branch == branch)
            .collect())
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(&self.key)
    }
}

/// Format a sync log entry for human-readable display.
pub fn format_entry(entry: &SyncLogEntry) -> String {
    let date = chrono::DateTime::from_timestamp(entry.timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| entry.timestamp.to_string());

    let status = if entry.success { "OK" } else { "FAILED" };

    format!(
        "[{}] {} {}:{} | {} commits | {}ms | {}{}",
        date,
        entry.direction,
        entry.repository,
        entry.branch,
        entry.commits_transferred,
        entry.duration_ms,
        status,
        entry
            .error
            .as_ref()
            .map(|e| format!(" ({})", e))
            .unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptvc_core::MemoryStorage;

    fn log() -> SyncLog {
        SyncLog::new(Arc::new(MemoryStorage::new()), "prompt-vc.sync-log")
    }

    #[test]
    fn test_append_and_latest() {
        let log = log();
        assert!(log.latest().unwrap().is_none());

        let mut first = SyncLogEntry::new(SyncDirection::Push, "me/p", "main");
        first.commits_transferred = 3;
        log.append(&first).unwrap();
        log.append(&SyncLogEntry::new(SyncDirection::Pull, "me/p", "exp"))
            .unwrap();

        assert_eq!(log.all().unwrap().len(), 2);
        assert_eq!(log.latest().unwrap().unwrap().direction, SyncDirection::Pull);
        assert_eq!(log.for_branch("me/p", "main").unwrap(), vec![first]);
    }

    #[test]
    fn test_bounded() {
        let log = log();
        for i in 0..(MAX_LOG_ENTRIES + 5) {
            let mut entry = SyncLogEntry::new(SyncDirection::Push, "r", "main");
            entry.commits_transferred = i as u64;
            log.append(&entry).unwrap();
        }
        let all = log.all().unwrap();
        assert_eq!(all.len(), MAX_LOG_ENTRIES);
        assert_eq!(all[0].commits_transferred, 5);
    }

    #[test]
    fn test_format_entry() {
        let entry = SyncLogEntry {
            direction: SyncDirection::Push,
            repository: "me/p".into(),
            branch: "main".into(),
            timestamp: 0,
            commits_transferred: 2,
            duration_ms: 15,
            success: false,
            error: Some("HTTP 502".into()),
        };
        assert_eq!(
            format_entry(&entry),
            "[1970-01-01 00:00:00 UTC] push me/p:main | 2 commits | 15ms | FAILED (HTTP 502)"
        );
    }

    #[test]
    fn test_clear() {
        let log = log();
        log.append(&SyncLogEntry::new(SyncDirection::Pull, "r", "main"))
            .unwrap();
        log.clear().unwrap();
        assert!(log.all().unwrap().is_empty());
    }
}
