//! One-shot watch handles.

use linden_node_types::WatchEvent;
use linden_node_types::WatchEventKind;

use crate::traits::WatchReceiver;

/// A registered one-shot watch.
///
/// Resolves exactly once. Continuous observation re-registers after every
/// fire. If the store drops the registration without delivering (for
/// example because the client went away), the watch resolves with a
/// `SessionClosed` event so waiters never hang.
#[derive(Debug)]
pub struct NodeWatch {
    path: String,
    rx: WatchReceiver,
}

impl NodeWatch {
    pub(crate) fn new(path: impl Into<String>, rx: WatchReceiver) -> Self {
        Self { path: path.into(), rx }
    }

    /// Path the watch was registered on.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Wait for the watch to fire.
    pub async fn fired(self) -> WatchEvent {
        match self.rx.await {
            Ok(event) => event,
            Err(_) => WatchEvent::new(WatchEventKind::SessionClosed, self.path),
        }
    }
}
