//! Continuous membership observation.

use std::sync::Arc;
use std::time::Duration;

use linden_constants::coordination::SERVICE_WATCH_CHANNEL_CAPACITY;
use linden_constants::session::TRANSIENT_RETRY_DELAY_MS;
use linden_store::ClientError;
use linden_store::NodeStore;
use linden_store::NodeWatch;
use linden_store::StoreClient;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;

use super::resolve_instances;
use super::types::ServiceInstance;

/// Stream of membership snapshots for one service.
///
/// The first item is the membership at the time the watch started; each
/// later item is the full instance list after a change. Connection loss
/// is retried; the stream ends when the session does or on any other store
/// failure. Dropping it stops the background task.
pub struct ServiceWatch {
    service: String,
    rx: mpsc::Receiver<Vec<ServiceInstance>>,
    cancel: CancellationToken,
}

impl ServiceWatch {
    /// Service being observed.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Next membership snapshot, or `None` once the watch has ended.
    pub async fn next(&mut self) -> Option<Vec<ServiceInstance>> {
        self.rx.recv().await
    }

    /// Stop observing.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ServiceWatch {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub(crate) fn spawn_service_watch<S: NodeStore + ?Sized + 'static>(
    client: Arc<StoreClient<S>>,
    service: String,
    dir: String,
) -> ServiceWatch {
    let (tx, rx) = mpsc::channel(SERVICE_WATCH_CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let name = service.clone();

    tokio::spawn(async move {
        loop {
            let (instances, watch) = match snapshot(&client, &name, &dir).await {
                Ok(result) => result,
                Err(err) if err.is_connection_loss() => {
                    debug!(service = %name, error = %err, "store unreachable, retrying service watch");
                    tokio::select! {
                        _ = token.cancelled() => return,
                        _ = tokio::time::sleep(Duration::from_millis(TRANSIENT_RETRY_DELAY_MS)) => continue,
                    }
                }
                Err(err) => {
                    warn!(service = %name, error = %err, "service watch failed");
                    return;
                }
            };
            debug!(service = %name, instances = instances.len(), "service membership snapshot");

            tokio::select! {
                _ = token.cancelled() => return,
                sent = tx.send(instances) => {
                    if sent.is_err() {
                        return;
                    }
                }
            }

            tokio::select! {
                _ = token.cancelled() => return,
                event = watch.fired() => {
                    if event.is_session_event() {
                        debug!(service = %name, kind = event.kind.as_str(), "service watch ended with session");
                        return;
                    }
                }
            }
        }
    });

    ServiceWatch { service, rx, cancel }
}

async fn snapshot<S: NodeStore + ?Sized + 'static>(
    client: &StoreClient<S>,
    service: &str,
    dir: &str,
) -> Result<(Vec<ServiceInstance>, NodeWatch), ClientError> {
    let (children, watch) = client.watch_children(dir).await?;
    let instances = resolve_instances(client, service, dir, &children).await?;
    Ok((instances, watch))
}
