//! Distributed mutual exclusion over ephemeral-sequential nodes.
//!
//! Each contender creates `locks/<name>/lock-NNNNNNNNNN`. The lowest
//! surviving sequence holds the lock. Everyone else watches only the node
//! directly ahead of it, so a release wakes exactly one waiter:
//!
//! ```text
//! lock-0000000003  <- holder
//! lock-0000000005  <- watches 3
//! lock-0000000009  <- watches 5
//! ```
//!
//! When a watch fires the waiter re-lists and re-checks the full minimum
//! rather than assuming it moved to the front. Crashed holders release
//! implicitly because their node dies with their session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use linden_constants::coordination::DEFAULT_LOCK_TIMEOUT_MS;
use linden_constants::coordination::MAX_LOCK_TIMEOUT_MS;
use linden_constants::namespace::LOCK_PREFIX;
use linden_constants::session::TRANSIENT_RETRY_DELAY_MS;
use linden_node_types::CreateMode;
use linden_node_types::Sequence;
use linden_node_types::path;
use linden_store::NodeStore;
use linden_store::StoreClient;
use snafu::ResultExt;
use tokio::sync::Mutex;
use tokio::sync::MutexGuard;
use tokio::time::Instant;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::error::CoordinationError;
use crate::error::InvalidNameSnafu;
use crate::error::missing_sequence;
use crate::guard::PendingNode;
use crate::pure::LockPosition;
use crate::pure::lock_position;
use crate::types::ParticipantInfo;
use crate::types::SessionOwned;
use crate::types::prune_stale;

/// Configuration for distributed locks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockConfig {
    /// Timeout used by [`DistributedLock::acquire_default`].
    pub default_timeout: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
        }
    }
}

/// A lock held by this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldLock {
    /// Lock name.
    pub name: String,
    /// Path of this process's contender node.
    pub node_path: String,
    /// Its position in the queue.
    pub sequence: Sequence,
    /// How long acquisition waited.
    pub waited: Duration,
}

/// Distributed lock manager for one store session.
///
/// Tracks the locks this process holds by name. At most one holder exists
/// per name, so a second `acquire` of a name this process already holds
/// queues behind the first like any other contender. Locks acquired under
/// a session that has since ended are forgotten.
pub struct DistributedLock<S: NodeStore + ?Sized + 'static> {
    client: Arc<StoreClient<S>>,
    config: LockConfig,
    held: Mutex<HashMap<String, SessionOwned<HeldLock>>>,
}

impl<S: NodeStore + ?Sized + 'static> DistributedLock<S> {
    /// Create a lock manager sharing `client`'s session.
    pub fn new(client: Arc<StoreClient<S>>, config: LockConfig) -> Self {
        Self {
            client,
            config,
            held: Mutex::new(HashMap::new()),
        }
    }

    /// The lock configuration.
    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Acquire `name` with the configured default timeout.
    pub async fn acquire_default(&self, name: &str) -> Result<HeldLock, CoordinationError> {
        self.acquire(name, self.config.default_timeout).await
    }

    /// Acquire `name`, waiting at most `timeout`.
    ///
    /// On timeout this process's contender node is removed and
    /// [`CoordinationError::LockTimeout`] is returned. Dropping the future
    /// before it resolves also removes the node.
    pub async fn acquire(&self, name: &str, timeout: Duration) -> Result<HeldLock, CoordinationError> {
        let timeout = timeout.min(Duration::from_millis(MAX_LOCK_TIMEOUT_MS));
        let started = Instant::now();
        let deadline = started + timeout;

        let dir = self.client.namespace().lock(name).context(InvalidNameSnafu { name })?;
        self.client.ensure_path(&dir).await?;

        let payload = ParticipantInfo::current().to_payload()?;
        let session = self.client.session_id();
        let created = self
            .client
            .create_node(&path::join(&dir, LOCK_PREFIX), &payload, CreateMode::EphemeralSequential)
            .await?;
        let sequence = created.sequence.ok_or_else(|| missing_sequence(&created.path))?;
        let pending = PendingNode::new(Arc::clone(&self.client), created.path.clone());
        debug!(lock = %name, sequence = sequence.value(), "queued for lock");

        loop {
            // Connection loss with the session still live is retried until
            // the deadline; anything else aborts and the guard removes the node.
            let children = match self.client.list_children(&dir).await {
                Ok(children) => children,
                Err(err) if err.is_connection_loss() => {
                    debug!(lock = %name, error = %err, "store unreachable while queued");
                    if !pause_before_retry(deadline).await {
                        return Err(timed_out(pending, name, timeout).await);
                    }
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let predecessor = match lock_position(&children, LOCK_PREFIX, sequence) {
                LockPosition::Holder => break,
                LockPosition::Absent => {
                    pending.disarm();
                    warn!(lock = %name, sequence = sequence.value(), "contender node vanished");
                    return Err(CoordinationError::SessionLost { name: name.to_string() });
                }
                LockPosition::Waiting { predecessor } => path::join(&dir, &predecessor.name),
            };

            let (stat, watch) = match self.client.watch_existence(&predecessor).await {
                Ok(result) => result,
                Err(err) if err.is_connection_loss() => {
                    debug!(lock = %name, error = %err, "store unreachable while watching predecessor");
                    if !pause_before_retry(deadline).await {
                        return Err(timed_out(pending, name, timeout).await);
                    }
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            if stat.is_none() {
                // Gone between list and watch; re-check.
                continue;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, watch.fired()).await {
                Ok(event) if event.is_session_event() => {
                    pending.disarm();
                    warn!(lock = %name, "session ended while waiting for lock");
                    return Err(CoordinationError::SessionLost { name: name.to_string() });
                }
                Ok(_) => continue,
                Err(_) => return Err(timed_out(pending, name, timeout).await),
            }
        }

        let node_path = pending.disarm();
        let held = HeldLock {
            name: name.to_string(),
            node_path,
            sequence,
            waited: started.elapsed(),
        };
        info!(
            lock = %name,
            sequence = sequence.value(),
            waited_ms = held.waited.as_millis() as u64,
            "lock acquired"
        );
        let mut locks = self.live_locks().await;
        locks.insert(name.to_string(), SessionOwned::new(session, held.clone()));
        Ok(held)
    }

    /// Release `name`.
    ///
    /// Returns `false` if this process does not hold it, which includes a
    /// lock lost with an ended session. A failed remote delete is logged.
    pub async fn release(&self, name: &str) -> bool {
        let Some(SessionOwned { value: held, .. }) = self.live_locks().await.remove(name) else {
            debug!(lock = %name, "release of lock not held");
            return false;
        };
        if let Err(err) = self.client.remove_owned_node(&held.node_path).await {
            warn!(lock = %name, error = %err, "failed to delete lock node");
        }
        info!(lock = %name, sequence = held.sequence.value(), "lock released");
        true
    }

    /// Release every held lock.
    pub async fn release_all(&self) {
        let names: Vec<String> = self.live_locks().await.keys().cloned().collect();
        for name in names {
            self.release(&name).await;
        }
    }

    /// Local bookkeeping, checked against the current session.
    pub async fn is_locked(&self, name: &str) -> bool {
        self.live_locks().await.contains_key(name)
    }

    /// Names of every lock this process holds, sorted.
    pub async fn held_locks(&self) -> Vec<String> {
        let mut names: Vec<String> = self.live_locks().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// The held map with locks of ended sessions removed.
    async fn live_locks(&self) -> MutexGuard<'_, HashMap<String, SessionOwned<HeldLock>>> {
        let mut held = self.held.lock().await;
        for name in prune_stale(&mut held, self.client.session_id()) {
            info!(lock = %name, "lock went with its session");
        }
        held
    }
}

/// Sleep before retrying a transient failure. Returns false once `deadline`
/// has passed.
async fn pause_before_retry(deadline: Instant) -> bool {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return false;
    }
    tokio::time::sleep(remaining.min(Duration::from_millis(TRANSIENT_RETRY_DELAY_MS))).await;
    Instant::now() < deadline
}

async fn timed_out<S: NodeStore + ?Sized + 'static>(
    pending: PendingNode<S>,
    name: &str,
    timeout: Duration,
) -> CoordinationError {
    pending.delete_now().await;
    info!(lock = %name, timeout_ms = timeout.as_millis() as u64, "lock acquisition timed out");
    CoordinationError::LockTimeout {
        name: name.to_string(),
        timeout_ms: timeout.as_millis() as u64,
    }
}
