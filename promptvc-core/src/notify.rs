//! Notification/status channel
//!
//! Holds at most one notification. Each `notify` replaces the current one and
//! restarts the expiry timer; after `NOTIFICATION_TTL` without another call
//! the notification clears itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How long a notification stays visible
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Sequence number within this notifier
    pub id: u64,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

struct Inner {
    current: watch::Sender<Option<Notification>>,
    expiry: Mutex<Option<JoinHandle<()>>>,
    next_id: AtomicU64,
    ttl: Duration,
}

/// Single-slot, self-expiring notification holder. Clones share state.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<Inner>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::with_ttl(NOTIFICATION_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                current,
                expiry: Mutex::new(None),
                next_id: AtomicU64::new(1),
                ttl,
            }),
        }
    }

    /// Show `message`, replacing whatever is visible.
    ///
    /// Expiry needs a tokio runtime; outside one the notification stays until
    /// the next `notify` or `clear`.
    pub fn notify(&self, message: impl Into<String>, kind: NotificationKind) -> Notification {
        let notification = Notification {
            id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
            message: message.into(),
            kind,
            created_at: Utc::now(),
        };
        debug!("Notify ({:?}): {}", kind, notification.message);

        self.cancel_expiry();
        self.inner.current.send_replace(Some(notification.clone()));

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let inner = Arc::clone(&self.inner);
                let id = notification.id;
                let task = handle.spawn(async move {
                    tokio::time::sleep(inner.ttl).await;
                    inner.current.send_if_modified(|current| {
                        if current.as_ref().map(|n| n.id) == Some(id) {
                            *current = None;
                            true
                        } else {
                            false
                        }
                    });
                });
                *self.expiry_slot() = Some(task);
            }
            Err(_) => warn!("No tokio runtime; notification will not expire"),
        }

        notification
    }

    pub fn success(&self, message: impl Into<String>) -> Notification {
        self.notify(message, NotificationKind::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> Notification {
        self.notify(message, NotificationKind::Error)
    }

    /// Remove the current notification immediately
    pub fn clear(&self) {
        self.cancel_expiry();
        self.inner.current.send_replace(None);
    }

    /// Currently visible notification
    pub fn current(&self) -> Option<Notification> {
        self.inner.current.borrow().clone()
    }

    /// Receiver for views that re-render on change
    pub fn subscribe(&self) -> watch::Receiver<Option<Notification>> {
        self.inner.current.subscribe()
    }

    fn cancel_expiry(&self) {
        if let Some(task) = self.expiry_slot().take() {
            task.abort();
        }
    }

    fn expiry_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inner
            .expiry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
