//! The coordination store contract.
//!
//! [`NodeStore`] is the surface Linden needs from a ZooKeeper-class store
//! SDK: sessions with a negotiated timeout, node CRUD with creation modes,
//! children listings and one-shot watches. Wire framing, consensus and
//! replication live behind this trait.

use std::time::Duration;

use async_trait::async_trait;
use linden_node_types::ChildNode;
use linden_node_types::CreateMode;
use linden_node_types::CreatedNode;
use linden_node_types::NodeData;
use linden_node_types::NodeStat;
use linden_node_types::NodeStoreError;
use linden_node_types::SessionId;
use linden_node_types::WatchEvent;
use tokio::sync::oneshot;

/// A freshly opened session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionGrant {
    /// Session identifier used for every subsequent call.
    pub session: SessionId,
    /// Timeout the store actually granted.
    pub timeout: Duration,
}

/// Request to create a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    /// Full path, or the name prefix for sequential modes.
    pub path: String,
    /// Encoded payload.
    pub data: Vec<u8>,
    /// Creation mode.
    pub mode: CreateMode,
}

impl CreateRequest {
    /// Create a request.
    pub fn new(path: impl Into<String>, data: Vec<u8>, mode: CreateMode) -> Self {
        Self {
            path: path.into(),
            data,
            mode,
        }
    }
}

/// Receiving half of a one-shot watch registration.
pub type WatchReceiver = oneshot::Receiver<WatchEvent>;

/// Hierarchical node store with sessions, ephemeral/sequential nodes and watches.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Open a new session, requesting the given timeout.
    async fn open_session(&self, requested_timeout: Duration) -> Result<SessionGrant, NodeStoreError>;

    /// Close a session, deleting its ephemeral nodes. Closing an unknown session succeeds.
    async fn close_session(&self, session: SessionId) -> Result<(), NodeStoreError>;

    /// Keep a session alive.
    async fn ping(&self, session: SessionId) -> Result<(), NodeStoreError>;

    /// Create a node. Sequential modes append the store-assigned suffix.
    async fn create(&self, session: SessionId, request: CreateRequest) -> Result<CreatedNode, NodeStoreError>;

    /// Read a node.
    async fn get(&self, session: SessionId, path: &str) -> Result<NodeData, NodeStoreError>;

    /// Replace a node's data, optionally conditional on its current version.
    async fn set(
        &self,
        session: SessionId,
        path: &str,
        data: Vec<u8>,
        expected_version: Option<u32>,
    ) -> Result<NodeStat, NodeStoreError>;

    /// Delete a childless node, optionally conditional on its current version.
    async fn delete(&self, session: SessionId, path: &str, expected_version: Option<u32>)
    -> Result<(), NodeStoreError>;

    /// Stat a node if it exists.
    async fn exists(&self, session: SessionId, path: &str) -> Result<Option<NodeStat>, NodeStoreError>;

    /// List the direct children of a node.
    async fn children(&self, session: SessionId, path: &str) -> Result<Vec<ChildNode>, NodeStoreError>;

    /// List children and register a one-shot watch on the children list.
    async fn watch_children(
        &self,
        session: SessionId,
        path: &str,
    ) -> Result<(Vec<ChildNode>, WatchReceiver), NodeStoreError>;

    /// Stat a node and register a one-shot watch on its existence and data.
    ///
    /// The watch is registered even if the node does not exist yet.
    async fn watch_exists(
        &self,
        session: SessionId,
        path: &str,
    ) -> Result<(Option<NodeStat>, WatchReceiver), NodeStoreError>;
}

// Blanket implementation for Arc<T>
#[async_trait]
impl<T: NodeStore + ?Sized> NodeStore for std::sync::Arc<T> {
    async fn open_session(&self, requested_timeout: Duration) -> Result<SessionGrant, NodeStoreError> {
        (**self).open_session(requested_timeout).await
    }

    async fn close_session(&self, session: SessionId) -> Result<(), NodeStoreError> {
        (**self).close_session(session).await
    }

    async fn ping(&self, session: SessionId) -> Result<(), NodeStoreError> {
        (**self).ping(session).await
    }

    async fn create(&self, session: SessionId, request: CreateRequest) -> Result<CreatedNode, NodeStoreError> {
        (**self).create(session, request).await
    }

    async fn get(&self, session: SessionId, path: &str) -> Result<NodeData, NodeStoreError> {
        (**self).get(session, path).await
    }

    async fn set(
        &self,
        session: SessionId,
        path: &str,
        data: Vec<u8>,
        expected_version: Option<u32>,
    ) -> Result<NodeStat, NodeStoreError> {
        (**self).set(session, path, data, expected_version).await
    }

    async fn delete(
        &self,
        session: SessionId,
        path: &str,
        expected_version: Option<u32>,
    ) -> Result<(), NodeStoreError> {
        (**self).delete(session, path, expected_version).await
    }

    async fn exists(&self, session: SessionId, path: &str) -> Result<Option<NodeStat>, NodeStoreError> {
        (**self).exists(session, path).await
    }

    async fn children(&self, session: SessionId, path: &str) -> Result<Vec<ChildNode>, NodeStoreError> {
        (**self).children(session, path).await
    }

    async fn watch_children(
        &self,
        session: SessionId,
        path: &str,
    ) -> Result<(Vec<ChildNode>, WatchReceiver), NodeStoreError> {
        (**self).watch_children(session, path).await
    }

    async fn watch_exists(
        &self,
        session: SessionId,
        path: &str,
    ) -> Result<(Option<NodeStat>, WatchReceiver), NodeStoreError> {
        (**self).watch_exists(session, path).await
    }
}
