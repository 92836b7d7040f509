//! Session-managed client for the coordination store.
//!
//! [`StoreClient`] owns one session at a time. It opens the session with a
//! bounded retry loop, keeps it alive with a heartbeat task, ensures the
//! Linden namespaces exist, and exposes the path-level primitives that the
//! lock, election and discovery recipes are built from.
//!
//! Raw store errors are translated on the way out:
//!
//! - failure to open a session becomes [`ClientError::Connection`]
//! - session expiry or connection loss during an operation becomes
//!   [`ClientError::Session`], and expiry moves the state to `Expired`
//! - everything else becomes [`ClientError::Node`]

use std::sync::Arc;
use std::time::Duration;

use linden_constants::session::TRANSIENT_RETRY_DELAY_MS;
use linden_node_types::ChildNode;
use linden_node_types::CreateMode;
use linden_node_types::CreatedNode;
use linden_node_types::NodePayload;
use linden_node_types::NodeStat;
use linden_node_types::NodeStoreError;
use linden_node_types::SessionId;
use linden_node_types::path;
use snafu::ResultExt;
use tokio::sync::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::error::ClientError;
use crate::error::NodeSnafu;
use crate::error::NotConnectedSnafu;
use crate::error::PayloadSnafu;
use crate::namespace::Namespace;
use crate::session::SessionConfig;
use crate::session::SessionState;
use crate::session::heartbeat_interval;
use crate::traits::CreateRequest;
use crate::traits::NodeStore;
use crate::watch::NodeWatch;

/// A node read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedNode {
    /// Structured payload, or raw bytes if the data was not a JSON object.
    pub payload: NodePayload,
    /// Node metadata.
    pub stat: NodeStat,
}

/// Client owning a session to a [`NodeStore`].
pub struct StoreClient<S: NodeStore + ?Sized> {
    store: Arc<S>,
    config: SessionConfig,
    namespace: Namespace,
    state: Arc<watch::Sender<SessionState>>,
    /// Serializes connect/reconnect/close and owns the heartbeat token.
    lifecycle: Mutex<Option<CancellationToken>>,
}

impl<S: NodeStore + ?Sized + 'static> StoreClient<S> {
    /// Create a client. No session is opened until [`connect`](Self::connect).
    pub fn new(store: Arc<S>, config: SessionConfig) -> Result<Self, ClientError> {
        let namespace = Namespace::new(config.base_path.clone()).context(NodeSnafu {
            path: config.base_path.clone(),
        })?;
        let (state, _) = watch::channel(SessionState::Disconnected);
        Ok(Self {
            store,
            config,
            namespace,
            state: Arc::new(state),
            lifecycle: Mutex::new(None),
        })
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The namespace layout.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Subscribe to session state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// The live session id, if connected.
    pub fn session_id(&self) -> Option<SessionId> {
        self.state().session()
    }

    /// Returns true while a session is live.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Establish a session, or reuse the live one.
    ///
    /// Concurrent callers are serialized; only the first opens a session.
    pub async fn connect(&self) -> Result<SessionId, ClientError> {
        let mut heartbeat = self.lifecycle.lock().await;
        if let Some(session) = self.session_id() {
            return Ok(session);
        }
        self.open_locked(&mut heartbeat).await
    }

    /// Discard the current session (if any) and open a new one.
    ///
    /// Ephemeral nodes owned by the old session are gone afterwards.
    pub async fn reconnect(&self) -> Result<SessionId, ClientError> {
        let mut heartbeat = self.lifecycle.lock().await;
        self.teardown_locked(&mut heartbeat, SessionState::Disconnected).await;
        self.open_locked(&mut heartbeat).await
    }

    /// Close the session. Safe to call repeatedly.
    pub async fn close(&self) {
        let mut heartbeat = self.lifecycle.lock().await;
        self.teardown_locked(&mut heartbeat, SessionState::Closed).await;
    }

    async fn open_locked(&self, heartbeat: &mut Option<CancellationToken>) -> Result<SessionId, ClientError> {
        if let Some(token) = heartbeat.take() {
            token.cancel();
        }
        self.state.send_replace(SessionState::Connecting);

        let max_attempts = self.config.connect_retries.saturating_add(1);
        let mut last_error = NodeStoreError::Failed {
            reason: "no connection attempt made".to_string(),
        };

        for attempt in 0..max_attempts {
            if attempt > 0 {
                debug!(attempt, "retrying session open");
                tokio::time::sleep(self.config.retry_delay).await;
            }

            match self.store.open_session(self.config.session_timeout).await {
                Ok(grant) => {
                    self.state.send_replace(SessionState::Connected {
                        session: grant.session,
                        timeout: grant.timeout,
                    });
                    *heartbeat = Some(self.spawn_heartbeat(grant.session, grant.timeout));
                    info!(
                        session = %grant.session,
                        timeout_ms = grant.timeout.as_millis() as u64,
                        "session established"
                    );

                    for root in self.namespace.roots() {
                        self.ensure_path(&root).await?;
                    }
                    return Ok(grant.session);
                }
                Err(err) => {
                    warn!(attempt, error = %err, "failed to open session");
                    last_error = err;
                }
            }
        }

        self.state.send_replace(SessionState::Disconnected);
        Err(ClientError::Connection {
            attempts: max_attempts,
            source: last_error,
        })
    }

    async fn teardown_locked(&self, heartbeat: &mut Option<CancellationToken>, next: SessionState) {
        if let Some(token) = heartbeat.take() {
            token.cancel();
        }
        if let Some(session) = self.session_id() {
            if let Err(err) = self.store.close_session(session).await {
                debug!(session = %session, error = %err, "close_session failed");
            }
            info!(session = %session, "session closed");
        }
        self.state.send_replace(next);
    }

    fn spawn_heartbeat(&self, session: SessionId, timeout: Duration) -> CancellationToken {
        let token = CancellationToken::new();
        let cancel = token.clone();
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        let interval = heartbeat_interval(timeout);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                match store.ping(session).await {
                    Ok(()) => {}
                    Err(NodeStoreError::SessionExpired { .. }) => {
                        warn!(session = %session, "session expired");
                        mark_expired(&state, session);
                        break;
                    }
                    Err(err) => debug!(session = %session, error = %err, "heartbeat failed"),
                }
            }
        });

        token
    }

    fn live_session(&self) -> Result<SessionId, ClientError> {
        let state = self.state();
        state.session().ok_or_else(|| NotConnectedSnafu { state: state.as_str() }.build())
    }

    /// Translate a raw store error, recording session expiry.
    fn translate(&self, session: SessionId, path: &str, source: NodeStoreError) -> ClientError {
        if matches!(source, NodeStoreError::SessionExpired { .. }) {
            mark_expired(&self.state, session);
        }
        if source.is_session_loss() {
            ClientError::Session {
                path: path.to_string(),
                source,
            }
        } else {
            ClientError::Node {
                path: path.to_string(),
                source,
            }
        }
    }

    /// Create every missing persistent node along `target`.
    ///
    /// Losing a creation race to another client counts as success.
    pub async fn ensure_path(&self, target: &str) -> Result<(), ClientError> {
        let session = self.live_session()?;
        path::validate_path(target).context(NodeSnafu { path: target })?;

        for segment in path::ancestors_inclusive(target) {
            let present = self
                .store
                .exists(session, &segment)
                .await
                .map_err(|err| self.translate(session, &segment, err))?;
            if present.is_some() {
                continue;
            }
            match self
                .store
                .create(session, CreateRequest::new(segment.clone(), Vec::new(), CreateMode::Persistent))
                .await
            {
                Ok(_) => debug!(path = %segment, "created path segment"),
                Err(err) if err.is_node_exists() => {}
                Err(err) => return Err(self.translate(session, &segment, err)),
            }
        }
        Ok(())
    }

    /// Create a node. Sequential modes treat `path_prefix` as a name prefix
    /// and return the store-assigned path and sequence.
    pub async fn create_node(
        &self,
        path_prefix: &str,
        payload: &NodePayload,
        mode: CreateMode,
    ) -> Result<CreatedNode, ClientError> {
        let session = self.live_session()?;
        let data = payload.to_bytes().context(PayloadSnafu { path: path_prefix })?;
        self.store
            .create(session, CreateRequest::new(path_prefix, data, mode))
            .await
            .map_err(|err| self.translate(session, path_prefix, err))
    }

    /// Read a node's payload and stat.
    pub async fn get_node(&self, node_path: &str) -> Result<FetchedNode, ClientError> {
        let session = self.live_session()?;
        let node = self.store.get(session, node_path).await.map_err(|err| self.translate(session, node_path, err))?;
        Ok(FetchedNode {
            payload: NodePayload::decode(&node.data),
            stat: node.stat,
        })
    }

    /// Overwrite a node's payload unconditionally.
    pub async fn set_node(&self, node_path: &str, payload: &NodePayload) -> Result<NodeStat, ClientError> {
        let session = self.live_session()?;
        let data = payload.to_bytes().context(PayloadSnafu { path: node_path })?;
        self.store
            .set(session, node_path, data, None)
            .await
            .map_err(|err| self.translate(session, node_path, err))
    }

    /// Delete a node. A node that is already gone counts as success.
    pub async fn delete_node(&self, node_path: &str) -> Result<(), ClientError> {
        let session = self.live_session()?;
        match self.store.delete(session, node_path, None).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_no_node() => Ok(()),
            Err(err) => Err(self.translate(session, node_path, err)),
        }
    }

    /// Delete a node owned by the current session, retrying through
    /// connection loss.
    ///
    /// Retries stop once the session changes or one session timeout has
    /// passed without reaching the store. Either way the store has expired,
    /// or is about to expire, the session and the node with it.
    pub async fn remove_owned_node(&self, node_path: &str) -> Result<(), ClientError> {
        let (session, timeout) = match self.state() {
            SessionState::Connected { session, timeout } => (session, timeout),
            other => return NotConnectedSnafu { state: other.as_str() }.fail(),
        };
        let started = Instant::now();
        let mut attempt: u32 = 0;
        loop {
            match self.delete_node(node_path).await {
                Ok(()) => return Ok(()),
                Err(err)
                    if err.is_connection_loss()
                        && self.session_id() == Some(session)
                        && started.elapsed() < timeout =>
                {
                    attempt = attempt.saturating_add(1);
                    debug!(path = %node_path, attempt, error = %err, "store unreachable, retrying delete");
                    tokio::time::sleep(Duration::from_millis(TRANSIENT_RETRY_DELAY_MS)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Stat of a node, or `None` if it does not exist.
    pub async fn exists(&self, node_path: &str) -> Result<Option<NodeStat>, ClientError> {
        let session = self.live_session()?;
        self.store.exists(session, node_path).await.map_err(|err| self.translate(session, node_path, err))
    }

    /// Children of a node, in no particular order.
    pub async fn list_children(&self, node_path: &str) -> Result<Vec<ChildNode>, ClientError> {
        let session = self.live_session()?;
        self.store.children(session, node_path).await.map_err(|err| self.translate(session, node_path, err))
    }

    /// List children and register a one-shot watch on membership changes.
    pub async fn watch_children(&self, node_path: &str) -> Result<(Vec<ChildNode>, NodeWatch), ClientError> {
        let session = self.live_session()?;
        let (children, rx) = self
            .store
            .watch_children(session, node_path)
            .await
            .map_err(|err| self.translate(session, node_path, err))?;
        Ok((children, NodeWatch::new(node_path, rx)))
    }

    /// Stat a node and register a one-shot watch on its creation, deletion or
    /// data change.
    pub async fn watch_existence(&self, node_path: &str) -> Result<(Option<NodeStat>, NodeWatch), ClientError> {
        let session = self.live_session()?;
        let (stat, rx) = self
            .store
            .watch_exists(session, node_path)
            .await
            .map_err(|err| self.translate(session, node_path, err))?;
        Ok((stat, NodeWatch::new(node_path, rx)))
    }
}

impl<S: NodeStore + ?Sized> Drop for StoreClient<S> {
    fn drop(&mut self) {
        if let Some(token) = self.lifecycle.get_mut().take() {
            token.cancel();
        }
    }
}

fn mark_expired(state: &watch::Sender<SessionState>, session: SessionId) {
    state.send_if_modified(|current| {
        if current.session() == Some(session) {
            *current = SessionState::Expired;
            true
        } else {
            false
        }
    });
}

#[cfg(test)]
mod tests {
    use linden_node_types::WatchEventKind;

    use super::*;
    use crate::inmemory::DeterministicNodeStore;

    fn client(store: &Arc<DeterministicNodeStore>) -> StoreClient<DeterministicNodeStore> {
        let config = SessionConfig::default().with_retries(3, Duration::from_millis(1));
        StoreClient::new(Arc::clone(store), config).unwrap()
    }

    #[tokio::test]
    async fn test_connect_creates_namespaces() {
        let store = DeterministicNodeStore::new();
        let client = client(&store);
        client.connect().await.unwrap();

        for root in ["/linden/services", "/linden/locks", "/linden/elections", "/linden/config"] {
            assert!(store.contains(root).await, "missing {root}");
        }
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let store = DeterministicNodeStore::new();
        let client = client(&store);
        let first = client.connect().await.unwrap();
        let second = client.connect().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_connect_retries_then_succeeds() {
        let store = DeterministicNodeStore::new();
        store.refuse_connects(2).await;
        let client = client(&store);
        assert!(client.connect().await.is_ok());
    }

    #[tokio::test]
    async fn test_connect_gives_up_after_retry_budget() {
        let store = DeterministicNodeStore::new();
        store.refuse_connects(10).await;
        let client = client(&store);
        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, ClientError::Connection { attempts: 4, .. }));
        assert_eq!(client.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_operations_require_session() {
        let store = DeterministicNodeStore::new();
        let client = client(&store);
        let err = client.list_children("/").await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Session);
    }

    #[tokio::test]
    async fn test_ensure_path_is_idempotent() {
        let store = DeterministicNodeStore::new();
        let client = client(&store);
        client.connect().await.unwrap();
        client.ensure_path("/linden/locks/a/b").await.unwrap();
        client.ensure_path("/linden/locks/a/b").await.unwrap();
        assert!(store.contains("/linden/locks/a/b").await);
    }

    #[tokio::test]
    async fn test_create_get_set_delete() {
        let store = DeterministicNodeStore::new();
        let client = client(&store);
        client.connect().await.unwrap();

        let mut payload = NodePayload::default();
        payload.insert("owner", serde_json::json!("a"));
        let created = client.create_node("/linden/config/x", &payload, CreateMode::Persistent).await.unwrap();
        assert_eq!(created.sequence, None);

        let fetched = client.get_node(&created.path).await.unwrap();
        assert_eq!(fetched.payload, payload);

        payload.insert("owner", serde_json::json!("b"));
        let stat = client.set_node(&created.path, &payload).await.unwrap();
        assert_eq!(stat.version, 1);

        client.delete_node(&created.path).await.unwrap();
        client.delete_node(&created.path).await.unwrap();
        assert!(client.get_node(&created.path).await.unwrap_err().is_no_node());
    }

    #[tokio::test]
    async fn test_create_under_missing_parent_is_node_error() {
        let store = DeterministicNodeStore::new();
        let client = client(&store);
        client.connect().await.unwrap();
        let err = client
            .create_node("/linden/nowhere/x", &NodePayload::default(), CreateMode::Ephemeral)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Node);
    }

    #[tokio::test]
    async fn test_get_node_falls_back_to_raw() {
        let store = DeterministicNodeStore::new();
        let client = client(&store);
        let session = client.connect().await.unwrap();
        store
            .create(session, CreateRequest::new("/linden/config/raw", b"not json".to_vec(), CreateMode::Persistent))
            .await
            .unwrap();
        let fetched = client.get_node("/linden/config/raw").await.unwrap();
        assert_eq!(fetched.payload.as_raw(), Some(&b"not json"[..]));
    }

    #[tokio::test]
    async fn test_expiry_marks_state_and_reconnect_recovers() {
        let store = DeterministicNodeStore::new();
        let client = client(&store);
        let old = client.connect().await.unwrap();
        let mut states = client.subscribe_state();

        store.expire_session(old).await;
        let err = client.list_children("/linden").await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Session);
        states.changed().await.unwrap();
        assert_eq!(*states.borrow(), SessionState::Expired);

        let new = client.connect().await.unwrap();
        assert_ne!(old, new);
        assert!(client.list_children("/linden").await.is_ok());
    }

    #[tokio::test]
    async fn test_close_removes_ephemerals_and_is_idempotent() {
        let store = DeterministicNodeStore::new();
        let client = client(&store);
        client.connect().await.unwrap();
        let node = client
            .create_node("/linden/services/e", &NodePayload::default(), CreateMode::Ephemeral)
            .await
            .unwrap();

        client.close().await;
        client.close().await;
        assert_eq!(client.state(), SessionState::Closed);
        assert!(!store.contains(&node.path).await);
    }

    #[tokio::test]
    async fn test_watch_children_fires_once() {
        let store = DeterministicNodeStore::new();
        let client = client(&store);
        client.connect().await.unwrap();
        let (children, watch) = client.watch_children("/linden/services").await.unwrap();
        assert!(children.is_empty());

        client.ensure_path("/linden/services/api").await.unwrap();
        let event = watch.fired().await;
        assert_eq!(event.kind, WatchEventKind::NodeChildrenChanged);
    }

    #[tokio::test]
    async fn test_remove_owned_node_outlasts_brief_outage() {
        let store = DeterministicNodeStore::new();
        let client = Arc::new(client(&store));
        client.connect().await.unwrap();
        client.ensure_path("/linden/locks").await.unwrap();
        let node = client
            .create_node("/linden/locks/n-", &NodePayload::default(), CreateMode::EphemeralSequential)
            .await
            .unwrap();

        store.set_available(false).await;
        let removal = {
            let client = Arc::clone(&client);
            let path = node.path.clone();
            tokio::spawn(async move { client.remove_owned_node(&path).await })
        };
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(!removal.is_finished());
        store.set_available(true).await;

        removal.await.unwrap().unwrap();
        assert!(!store.contains(&node.path).await);
    }

    #[tokio::test]
    async fn test_remove_owned_node_without_session() {
        let store = DeterministicNodeStore::new();
        let client = client(&store);
        let err = client.remove_owned_node("/linden/locks/x").await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Session);
    }
}
