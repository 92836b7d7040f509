//! One-shot watch notifications.

use serde::Deserialize;
use serde::Serialize;

/// What triggered a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WatchEventKind {
    /// A watched path came into existence.
    NodeCreated,
    /// A watched node was deleted.
    NodeDeleted,
    /// A watched node's data changed.
    NodeDataChanged,
    /// The children of a watched node changed.
    NodeChildrenChanged,
    /// The session that registered the watch expired.
    SessionExpired,
    /// The session that registered the watch was closed.
    SessionClosed,
}

impl WatchEventKind {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NodeCreated => "node-created",
            Self::NodeDeleted => "node-deleted",
            Self::NodeDataChanged => "node-data-changed",
            Self::NodeChildrenChanged => "node-children-changed",
            Self::SessionExpired => "session-expired",
            Self::SessionClosed => "session-closed",
        }
    }
}

/// A single watch notification.
///
/// The store delivers at most one event per registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    /// Why the watch fired.
    pub kind: WatchEventKind,
    /// Path the watch was registered on.
    pub path: String,
}

impl WatchEvent {
    /// Create a new watch event.
    pub fn new(kind: WatchEventKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// Returns true if the event reports the end of the registering session
    /// rather than a change to the node tree.
    pub fn is_session_event(&self) -> bool {
        matches!(self.kind, WatchEventKind::SessionExpired | WatchEventKind::SessionClosed)
    }
}
