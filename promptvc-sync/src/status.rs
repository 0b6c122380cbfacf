//! Per-operation status and the view teardown guard

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Remote operations that drive a loading indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteAction {
    Authenticate,
    ListRepositories,
    CreateRepository,
    Push,
    Pull,
}

/// Tri-state status of one operation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OperationStatus {
    #[default]
    Idle,
    InFlight,
    Resolved { ok: bool, message: String },
}

impl OperationStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, OperationStatus::InFlight)
    }
}

/// Shared "view is still mounted" flag.
///
/// Clones observe the same flag. Once unmounted, completions of in-flight
/// remote calls are dropped instead of being applied.
#[derive(Debug, Clone)]
pub struct MountGuard {
    mounted: Arc<AtomicBool>,
}

impl MountGuard {
    pub fn new() -> Self {
        Self {
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
    }
}

impl Default for MountGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_shared_between_clones() {
        let guard = MountGuard::new();
        let view = guard.clone();
        assert!(guard.is_mounted());
        view.unmount();
        assert!(!guard.is_mounted());
    }

    #[test]
    fn test_status_serialization() {
        let status = OperationStatus::Resolved {
            ok: false,
            message: "offline".into(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "resolved");
        assert_eq!(json["ok"], false);
        assert!(!status.is_loading());
        assert!(OperationStatus::InFlight.is_loading());
    }
}
