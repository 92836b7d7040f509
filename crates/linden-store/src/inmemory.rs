//! In-memory implementation of [`NodeStore`] for testing and simulation.
//!
//! Provides a deterministic, non-persistent node tree that honors the store
//! semantics the coordination recipes depend on:
//!
//! - ephemeral nodes are deleted when their session closes or expires
//! - sequence suffixes are unique and strictly increasing per parent
//! - watches are one-shot and fire at most once per registration
//! - a session's own pending watches receive a session event when it ends
//!
//! Fault injection hooks (`expire_session`, `set_available`,
//! `refuse_connects`) let tests simulate crashes and partitions without a
//! real ensemble.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use linden_constants::coordination::MAX_NODE_DATA_SIZE;
use linden_constants::session::MAX_SESSION_TIMEOUT_MS;
use linden_constants::session::MIN_SESSION_TIMEOUT_MS;
use linden_node_types::ChildNode;
use linden_node_types::CreatedNode;
use linden_node_types::NodeData;
use linden_node_types::NodeStat;
use linden_node_types::NodeStoreError;
use linden_node_types::Sequence;
use linden_node_types::SessionId;
use linden_node_types::WatchEvent;
use linden_node_types::WatchEventKind;
use linden_node_types::now_unix_ms;
use linden_node_types::path;
use tokio::sync::Mutex;
use tokio::sync::oneshot;

use crate::traits::CreateRequest;
use crate::traits::NodeStore;
use crate::traits::SessionGrant;
use crate::traits::WatchReceiver;

/// In-memory deterministic implementation of [`NodeStore`].
///
/// # Limitations
///
/// - No persistence across restarts
/// - Single process only; "remote" peers are simulated by opening several
///   sessions against one shared instance
/// - Session expiry is evaluated lazily on every call rather than by a timer
///
/// # Example
///
/// ```ignore
/// let store = DeterministicNodeStore::new();
/// let grant = store.open_session(Duration::from_secs(10)).await?;
/// store.create(grant.session, CreateRequest::new("/app", Vec::new(), CreateMode::Persistent)).await?;
/// ```
pub struct DeterministicNodeStore {
    inner: Mutex<StoreState>,
}

struct StoreState {
    nodes: BTreeMap<String, NodeEntry>,
    sessions: HashMap<SessionId, SessionEntry>,
    child_watches: HashMap<String, Vec<PendingWatch>>,
    exist_watches: HashMap<String, Vec<PendingWatch>>,
    next_session: u64,
    refused_connects: u32,
    is_available: bool,
    fired_watches: u64,
}

struct NodeEntry {
    data: Vec<u8>,
    stat: NodeStat,
    sequence: Option<Sequence>,
    next_child_sequence: u64,
}

struct SessionEntry {
    timeout: Duration,
    last_seen: Instant,
}

struct PendingWatch {
    session: SessionId,
    tx: oneshot::Sender<WatchEvent>,
}

impl Default for DeterministicNodeStore {
    fn default() -> Self {
        let mut nodes = BTreeMap::new();
        let now = now_unix_ms();
        nodes.insert(path::ROOT.to_string(), NodeEntry {
            data: Vec::new(),
            stat: NodeStat {
                created_at_ms: now,
                modified_at_ms: now,
                ..Default::default()
            },
            sequence: None,
            next_child_sequence: 0,
        });
        Self {
            inner: Mutex::new(StoreState {
                nodes,
                sessions: HashMap::new(),
                child_watches: HashMap::new(),
                exist_watches: HashMap::new(),
                next_session: 0,
                refused_connects: 0,
                is_available: true,
                fired_watches: 0,
            }),
        }
    }
}

impl DeterministicNodeStore {
    /// Create a new in-memory store containing only the root node.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Expire a session as if the owning process had crashed.
    ///
    /// Its pending watches receive `SessionExpired`, then its ephemeral nodes
    /// are deleted, firing the watches other sessions hold on them.
    pub async fn expire_session(&self, session: SessionId) {
        let mut state = self.inner.lock().await;
        state.end_session(session, WatchEventKind::SessionExpired);
    }

    /// Simulate the store becoming unreachable (or reachable again).
    ///
    /// While unavailable every call fails with `ConnectionLoss`. Sessions are
    /// not expired by this alone.
    pub async fn set_available(&self, is_available: bool) {
        self.inner.lock().await.is_available = is_available;
    }

    /// Make the next `count` calls to `open_session` fail.
    pub async fn refuse_connects(&self, count: u32) {
        self.inner.lock().await.refused_connects = count;
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.inner.lock().await.sessions.len()
    }

    /// Total number of watch notifications delivered so far.
    pub async fn fired_watch_count(&self) -> u64 {
        self.inner.lock().await.fired_watches
    }

    /// Number of watches currently registered on `path` (children + existence).
    pub async fn pending_watch_count(&self, path: &str) -> usize {
        let state = self.inner.lock().await;
        state.child_watches.get(path).map_or(0, Vec::len) + state.exist_watches.get(path).map_or(0, Vec::len)
    }

    /// Direct inspection helper: does `path` exist?
    pub async fn contains(&self, path: &str) -> bool {
        self.inner.lock().await.nodes.contains_key(path)
    }
}

impl StoreState {
    /// Validate the session, reaping any that have timed out first.
    fn touch(&mut self, session: SessionId) -> Result<(), NodeStoreError> {
        if !self.is_available {
            return Err(NodeStoreError::ConnectionLoss {
                reason: "store unavailable".to_string(),
            });
        }
        self.reap_expired(Instant::now());
        match self.sessions.get_mut(&session) {
            Some(entry) => {
                entry.last_seen = Instant::now();
                Ok(())
            }
            None => Err(NodeStoreError::SessionExpired { session }),
        }
    }

    fn reap_expired(&mut self, now: Instant) {
        let expired: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.last_seen) > entry.timeout)
            .map(|(id, _)| *id)
            .collect();
        for session in expired {
            self.end_session(session, WatchEventKind::SessionExpired);
        }
    }

    fn end_session(&mut self, session: SessionId, kind: WatchEventKind) {
        if self.sessions.remove(&session).is_none() {
            return;
        }

        // The session's own watches learn about its end, not about the deletes.
        let mut own = Vec::new();
        for watches in self.child_watches.values_mut().chain(self.exist_watches.values_mut()) {
            let (mine, others): (Vec<_>, Vec<_>) = watches.drain(..).partition(|w| w.session == session);
            *watches = others;
            own.extend(mine);
        }
        for watch in own {
            let _ = watch.tx.send(WatchEvent::new(kind, String::new()));
            self.fired_watches += 1;
        }

        let owned: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, entry)| entry.stat.ephemeral_owner == Some(session))
            .map(|(p, _)| p.clone())
            .collect();
        for node_path in owned {
            self.remove_node(&node_path);
        }
    }

    fn remove_node(&mut self, node_path: &str) {
        if self.nodes.remove(node_path).is_none() {
            return;
        }
        if let Some(parent) = path::parent(node_path)
            && let Some(entry) = self.nodes.get_mut(parent)
        {
            entry.stat.num_children = entry.stat.num_children.saturating_sub(1);
        }
        self.fire_exist(node_path, WatchEventKind::NodeDeleted);
        self.fire_children(node_path, WatchEventKind::NodeDeleted);
        if let Some(parent) = path::parent(node_path) {
            self.fire_children(parent, WatchEventKind::NodeChildrenChanged);
        }
    }

    fn fire_exist(&mut self, node_path: &str, kind: WatchEventKind) {
        if let Some(watches) = self.exist_watches.remove(node_path) {
            self.fired_watches += deliver(watches, &WatchEvent::new(kind, node_path));
        }
    }

    fn fire_children(&mut self, node_path: &str, kind: WatchEventKind) {
        if let Some(watches) = self.child_watches.remove(node_path) {
            self.fired_watches += deliver(watches, &WatchEvent::new(kind, node_path));
        }
    }

    fn children_of(&self, node_path: &str) -> Vec<ChildNode> {
        let prefix = if node_path == path::ROOT {
            path::ROOT.to_string()
        } else {
            format!("{node_path}/")
        };
        self.nodes
            .range(prefix.clone()..)
            .take_while(|(p, _)| p.starts_with(&prefix))
            .filter(|(p, _)| p.len() > prefix.len() && !p[prefix.len()..].contains('/'))
            .map(|(p, entry)| ChildNode::new(path::basename(p), entry.sequence))
            .collect()
    }

    fn register(map: &mut HashMap<String, Vec<PendingWatch>>, node_path: &str, session: SessionId) -> WatchReceiver {
        let (tx, rx) = oneshot::channel();
        map.entry(node_path.to_string()).or_default().push(PendingWatch { session, tx });
        rx
    }
}

fn deliver(watches: Vec<PendingWatch>, event: &WatchEvent) -> u64 {
    let mut delivered = 0;
    for watch in watches {
        if watch.tx.send(event.clone()).is_ok() {
            delivered += 1;
        }
    }
    delivered
}

fn check_size(data: &[u8]) -> Result<(), NodeStoreError> {
    if data.len() > MAX_NODE_DATA_SIZE {
        return Err(NodeStoreError::DataTooLarge {
            size: data.len(),
            max: MAX_NODE_DATA_SIZE,
        });
    }
    Ok(())
}

#[async_trait]
impl NodeStore for DeterministicNodeStore {
    async fn open_session(&self, requested_timeout: Duration) -> Result<SessionGrant, NodeStoreError> {
        let mut state = self.inner.lock().await;
        if !state.is_available {
            return Err(NodeStoreError::ConnectionLoss {
                reason: "store unavailable".to_string(),
            });
        }
        if state.refused_connects > 0 {
            state.refused_connects -= 1;
            return Err(NodeStoreError::ConnectionLoss {
                reason: "connection refused".to_string(),
            });
        }

        let timeout_ms = (requested_timeout.as_millis() as u64).clamp(MIN_SESSION_TIMEOUT_MS, MAX_SESSION_TIMEOUT_MS);
        let timeout = Duration::from_millis(timeout_ms);
        state.next_session += 1;
        let session = SessionId(state.next_session);
        state.sessions.insert(session, SessionEntry {
            timeout,
            last_seen: Instant::now(),
        });
        Ok(SessionGrant { session, timeout })
    }

    async fn close_session(&self, session: SessionId) -> Result<(), NodeStoreError> {
        let mut state = self.inner.lock().await;
        state.end_session(session, WatchEventKind::SessionClosed);
        Ok(())
    }

    async fn ping(&self, session: SessionId) -> Result<(), NodeStoreError> {
        self.inner.lock().await.touch(session)
    }

    async fn create(&self, session: SessionId, request: CreateRequest) -> Result<CreatedNode, NodeStoreError> {
        let mut state = self.inner.lock().await;
        state.touch(session)?;
        check_size(&request.data)?;
        path::validate_path(&request.path)?;

        let parent_path = match path::parent(&request.path) {
            Some(p) => p.to_string(),
            None => {
                return Err(NodeStoreError::NodeExists {
                    path: request.path.clone(),
                });
            }
        };
        let parent = state.nodes.get_mut(&parent_path).ok_or_else(|| NodeStoreError::NoNode {
            path: parent_path.clone(),
        })?;
        if parent.stat.is_ephemeral() {
            return Err(NodeStoreError::NoChildrenForEphemerals { path: parent_path });
        }

        let sequence = if request.mode.is_sequential() {
            let seq = Sequence::new(parent.next_child_sequence);
            parent.next_child_sequence += 1;
            Some(seq)
        } else {
            None
        };
        let final_path = match sequence {
            Some(seq) => format!("{}{}", request.path, seq.suffix()),
            None => request.path.clone(),
        };
        path::validate_path(&final_path)?;
        if state.nodes.contains_key(&final_path) {
            return Err(NodeStoreError::NodeExists { path: final_path });
        }

        let now = now_unix_ms();
        state.nodes.insert(final_path.clone(), NodeEntry {
            data: request.data,
            stat: NodeStat {
                version: 0,
                created_at_ms: now,
                modified_at_ms: now,
                ephemeral_owner: request.mode.is_ephemeral().then_some(session),
                num_children: 0,
            },
            sequence,
            next_child_sequence: 0,
        });
        if let Some(parent) = state.nodes.get_mut(&parent_path) {
            parent.stat.num_children += 1;
        }

        state.fire_exist(&final_path, WatchEventKind::NodeCreated);
        state.fire_children(&parent_path, WatchEventKind::NodeChildrenChanged);

        Ok(CreatedNode {
            path: final_path,
            sequence,
        })
    }

    async fn get(&self, session: SessionId, path: &str) -> Result<NodeData, NodeStoreError> {
        let mut state = self.inner.lock().await;
        state.touch(session)?;
        let entry = state.nodes.get(path).ok_or_else(|| NodeStoreError::NoNode { path: path.to_string() })?;
        Ok(NodeData {
            data: entry.data.clone(),
            stat: entry.stat.clone(),
        })
    }

    async fn set(
        &self,
        session: SessionId,
        path: &str,
        data: Vec<u8>,
        expected_version: Option<u32>,
    ) -> Result<NodeStat, NodeStoreError> {
        let mut state = self.inner.lock().await;
        state.touch(session)?;
        check_size(&data)?;
        let entry = state.nodes.get_mut(path).ok_or_else(|| NodeStoreError::NoNode { path: path.to_string() })?;
        if let Some(expected) = expected_version
            && expected != entry.stat.version
        {
            return Err(NodeStoreError::BadVersion {
                path: path.to_string(),
                expected,
                actual: entry.stat.version,
            });
        }
        entry.data = data;
        entry.stat.version += 1;
        entry.stat.modified_at_ms = now_unix_ms();
        let stat = entry.stat.clone();
        state.fire_exist(path, WatchEventKind::NodeDataChanged);
        Ok(stat)
    }

    async fn delete(
        &self,
        session: SessionId,
        path: &str,
        expected_version: Option<u32>,
    ) -> Result<(), NodeStoreError> {
        let mut state = self.inner.lock().await;
        state.touch(session)?;
        if path == path::ROOT {
            return Err(NodeStoreError::InvalidPath {
                path: path.to_string(),
                reason: "cannot delete the root".to_string(),
            });
        }
        let entry = state.nodes.get(path).ok_or_else(|| NodeStoreError::NoNode { path: path.to_string() })?;
        if let Some(expected) = expected_version
            && expected != entry.stat.version
        {
            return Err(NodeStoreError::BadVersion {
                path: path.to_string(),
                expected,
                actual: entry.stat.version,
            });
        }
        if entry.stat.num_children > 0 {
            return Err(NodeStoreError::NotEmpty { path: path.to_string() });
        }
        state.remove_node(path);
        Ok(())
    }

    async fn exists(&self, session: SessionId, path: &str) -> Result<Option<NodeStat>, NodeStoreError> {
        let mut state = self.inner.lock().await;
        state.touch(session)?;
        Ok(state.nodes.get(path).map(|entry| entry.stat.clone()))
    }

    async fn children(&self, session: SessionId, path: &str) -> Result<Vec<ChildNode>, NodeStoreError> {
        let mut state = self.inner.lock().await;
        state.touch(session)?;
        if !state.nodes.contains_key(path) {
            return Err(NodeStoreError::NoNode { path: path.to_string() });
        }
        Ok(state.children_of(path))
    }

    async fn watch_children(
        &self,
        session: SessionId,
        path: &str,
    ) -> Result<(Vec<ChildNode>, WatchReceiver), NodeStoreError> {
        let mut state = self.inner.lock().await;
        state.touch(session)?;
        if !state.nodes.contains_key(path) {
            return Err(NodeStoreError::NoNode { path: path.to_string() });
        }
        let children = state.children_of(path);
        let rx = StoreState::register(&mut state.child_watches, path, session);
        Ok((children, rx))
    }

    async fn watch_exists(
        &self,
        session: SessionId,
        path: &str,
    ) -> Result<(Option<NodeStat>, WatchReceiver), NodeStoreError> {
        let mut state = self.inner.lock().await;
        state.touch(session)?;
        path::validate_path(path)?;
        let stat = state.nodes.get(path).map(|entry| entry.stat.clone());
        let rx = StoreState::register(&mut state.exist_watches, path, session);
        Ok((stat, rx))
    }
}
