//! Cleanup guard for contender nodes created by in-flight operations.

use std::sync::Arc;

use linden_store::NodeStore;
use linden_store::StoreClient;
use tracing::debug;
use tracing::warn;

/// Deletes a freshly created node unless disarmed.
///
/// An `acquire` or `participate` future dropped between creating its node
/// and handing it to bookkeeping would otherwise leave a phantom contender
/// that blocks every peer behind it until the session expires. Dropping the
/// guard schedules the delete on the current runtime. Deletes retry through
/// connection loss for as long as the owning session can still be alive.
pub(crate) struct PendingNode<S: NodeStore + ?Sized + 'static> {
    client: Arc<StoreClient<S>>,
    path: Option<String>,
}

impl<S: NodeStore + ?Sized + 'static> PendingNode<S> {
    pub(crate) fn new(client: Arc<StoreClient<S>>, path: impl Into<String>) -> Self {
        Self {
            client,
            path: Some(path.into()),
        }
    }

    /// Keep the node; the caller now owns its cleanup.
    pub(crate) fn disarm(mut self) -> String {
        self.path.take().unwrap_or_default()
    }

    /// Delete the node now, logging failures.
    pub(crate) async fn delete_now(mut self) {
        if let Some(path) = self.path.take() {
            remove(&self.client, &path).await;
        }
    }
}

impl<S: NodeStore + ?Sized + 'static> Drop for PendingNode<S> {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(path = %path, "no runtime to remove abandoned contender node");
            return;
        };
        let client = Arc::clone(&self.client);
        runtime.spawn(async move { remove(&client, &path).await });
    }
}

async fn remove<S: NodeStore + ?Sized + 'static>(client: &StoreClient<S>, path: &str) {
    match client.remove_owned_node(path).await {
        Ok(()) => debug!(path = %path, "removed contender node"),
        Err(err) if err.needs_reconnect() => {
            debug!(path = %path, error = %err, "contender node went with its session")
        }
        Err(err) => warn!(path = %path, error = %err, "failed to remove contender node"),
    }
}
