//! Change notifications.
//!
//! Observers subscribe to the bus to learn about completed mutations, for
//! example to refresh a file listing or rebuild a package index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_core::FileDescriptor;
use tokio::sync::broadcast;

/// A completed change worth announcing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// A file was written.
    Written { path: String },

    /// A directory was created.
    DirectoryCreated { path: String },

    /// A copy finished.
    Copied {
        source: String,
        destination: String,
        actor: String,
    },

    /// A move finished.
    Moved {
        source: String,
        destination: String,
        actor: String,
    },

    /// A file or directory was deleted.
    Deleted { path: String },

    /// An entry was moved to the trash.
    Trashed { path: String },

    /// An entry was restored from the trash.
    Restored { path: String },

    /// A module's trash was emptied.
    TrashEmptied { module: String },

    /// A file was uploaded.
    Uploaded { file: FileDescriptor, actor: String },

    /// The user package directory changed; package metadata should be regenerated.
    PackagesChanged { directory: String },
}

impl Notification {
    /// Get the notification name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Written { .. } => "written",
            Self::DirectoryCreated { .. } => "directory_created",
            Self::Copied { .. } => "copied",
            Self::Moved { .. } => "moved",
            Self::Deleted { .. } => "deleted",
            Self::Trashed { .. } => "trashed",
            Self::Restored { .. } => "restored",
            Self::TrashEmptied { .. } => "trash_emptied",
            Self::Uploaded { .. } => "uploaded",
            Self::PackagesChanged { .. } => "packages_changed",
        }
    }
}

/// A notification stamped with the time it was emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// When the notification was emitted.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub notification: Notification,
}

/// Broadcast channel for notifications.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    tx: broadcast::Sender<NotificationEvent>,
}

impl NotificationBus {
    /// Create a bus that buffers up to `capacity` undelivered events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to future notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Emit a notification.
    ///
    /// Having no subscriber is not an error; the event is dropped.
    pub fn emit(&self, notification: Notification) {
        let name = notification.name();
        let event = NotificationEvent {
            timestamp: Utc::now(),
            notification,
        };
        if self.tx.send(event).is_err() {
            tracing::trace!(notification = name, "no subscribers for notification");
        }
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(64)
    }
}
