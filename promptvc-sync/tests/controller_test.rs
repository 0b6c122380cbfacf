//! Controller tests: per-action status, notifications, teardown

mod common;

use common::{FakeRemote, VALID_CODE, shared_store};
use promptvc_core::{NotificationKind, Notifier, Snapshot, VcsError};
use promptvc_sync::{OperationStatus, RemoteAction, SyncAdapter, SyncController, SyncError};
use std::sync::Arc;
use std::time::Duration;

async fn controller(remote: &Arc<FakeRemote>) -> SyncController {
    let (history, _) = shared_store();
    let adapter = SyncAdapter::new(remote.clone(), history).await.unwrap();
    SyncController::new(adapter, Notifier::new())
}

#[tokio::test(start_paused = true)]
async fn test_authenticate_resolves_and_notifies() {
    let remote = FakeRemote::new();
    let mut ctl = controller(&remote).await;
    assert_eq!(ctl.status(RemoteAction::Authenticate), OperationStatus::Idle);

    ctl.authenticate(VALID_CODE).await.unwrap();
    assert!(!ctl.is_loading(RemoteAction::Authenticate));
    assert!(matches!(
        ctl.status(RemoteAction::Authenticate),
        OperationStatus::Resolved { ok: true, .. }
    ));
    let shown = ctl.notifier().current().unwrap();
    assert_eq!(shown.kind, NotificationKind::Success);

    tokio::time::sleep(Duration::from_secs(3) + Duration::from_millis(10)).await;
    assert!(ctl.notifier().current().is_none());
}

#[tokio::test]
async fn test_push_without_repository() {
    let remote = FakeRemote::new();
    let mut ctl = controller(&remote).await;
    ctl.authenticate(VALID_CODE).await.unwrap();

    let err = ctl.push("main").await.unwrap_err();
    assert!(matches!(err, SyncError::NoRepository));
    assert!(matches!(
        ctl.status(RemoteAction::Push),
        OperationStatus::Resolved { ok: false, .. }
    ));
    assert_eq!(
        ctl.notifier().current().unwrap().kind,
        NotificationKind::Error
    );
}

#[tokio::test]
async fn test_create_repository_links_it_then_push_and_pull() {
    let remote = FakeRemote::new();
    let mut ctl = controller(&remote).await;
    ctl.authenticate(VALID_CODE).await.unwrap();

    let repo = ctl.create_repository("prompts", true).await.unwrap();
    assert!(repo.private);
    assert_eq!(ctl.adapter().linked_repository().await, Some(repo.clone()));

    ctl.commit("main", "First draft", Snapshot::new("You are helpful."))
        .await
        .unwrap();
    let pushed = ctl.push("main").await.unwrap();
    assert_eq!(pushed.pushed, 1);
    assert_eq!(
        ctl.notifier().current().unwrap().message,
        "Pushed 1 commit(s)"
    );

    remote.inject_commit(&repo, "main", "Edited on the web", "You are concise.");
    let pulled = ctl.pull("main").await.unwrap();
    assert_eq!(pulled.appended.len(), 1);
    assert_eq!(ctl.history().lock().await.commits("main").unwrap().len(), 2);
}

#[tokio::test]
async fn test_validation_errors_are_not_notified() {
    let remote = FakeRemote::new();
    let mut ctl = controller(&remote).await;

    let err = ctl
        .commit("main", "   ", Snapshot::new("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, VcsError::EmptyMessage));
    assert!(ctl.notifier().current().is_none());

    let err = ctl.commit("missing", "Msg", Snapshot::new("x")).await.unwrap_err();
    assert!(matches!(err, VcsError::UnknownBranch(_)));
    assert_eq!(
        ctl.notifier().current().unwrap().kind,
        NotificationKind::Error
    );
}

#[tokio::test]
async fn test_merge_conflict_is_reported() {
    let remote = FakeRemote::new();
    let mut ctl = controller(&remote).await;

    ctl.commit("main", "A", Snapshot::new("a")).await.unwrap();
    ctl.create_branch("exp", "main").await.unwrap();
    ctl.commit("main", "B", Snapshot::new("b")).await.unwrap();
    ctl.commit("exp", "C", Snapshot::new("c")).await.unwrap();

    let err = ctl.merge("main", "exp").await.unwrap_err();
    assert!(matches!(err, VcsError::MergeConflict { .. }));
    assert_eq!(
        ctl.notifier().current().unwrap().kind,
        NotificationKind::Error
    );
}

#[tokio::test]
async fn test_teardown_ignores_late_completion() {
    let remote = FakeRemote::new();
    let mut ctl = controller(&remote).await;
    ctl.authenticate(VALID_CODE).await.unwrap();
    let repo = ctl.create_repository("prompts", false).await.unwrap();
    remote.inject_commit(&repo, "main", "Remote", "r");

    ctl.teardown();
    assert!(ctl.notifier().current().is_none());

    let err = ctl.pull("main").await.unwrap_err();
    assert!(matches!(err, SyncError::Detached));
    assert!(ctl.notifier().current().is_none());
    assert!(ctl.is_loading(RemoteAction::Pull));
    assert!(ctl.history().lock().await.commits("main").unwrap().is_empty());
}
