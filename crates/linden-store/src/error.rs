//! Error types for the store client.

use linden_node_types::NodeStoreError;
use linden_node_types::PayloadError;
use snafu::Snafu;

/// Coarse classification of every error Linden surfaces.
///
/// Callers branch on the kind rather than on concrete variants: a
/// `Connection` or `Session` error means "reconnect, then retry", a `Node`
/// error means the operation itself was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The store could not be reached within the retry budget.
    Connection,
    /// The session was lost or never established.
    Session,
    /// A node operation was rejected.
    Node,
    /// A lock was not acquired within its timeout.
    LockTimeout,
    /// Leadership was not gained within the requested bound.
    ElectionTimeout,
}

/// Errors from [`StoreClient`](crate::StoreClient) operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ClientError {
    /// Opening a session failed on every attempt.
    #[snafu(display("failed to connect after {attempts} attempts: {source}"))]
    Connection {
        /// Number of attempts made.
        attempts: u32,
        /// The last error reported by the store.
        source: NodeStoreError,
    },

    /// No session is currently established.
    #[snafu(display("not connected ({state})"))]
    NotConnected {
        /// Name of the current session state.
        state: &'static str,
    },

    /// The session ended underneath an operation.
    #[snafu(display("session lost during operation on '{path}': {source}"))]
    Session {
        /// Path the operation targeted.
        path: String,
        /// The underlying store error.
        source: NodeStoreError,
    },

    /// The store rejected a node operation.
    #[snafu(display("node operation on '{path}' failed: {source}"))]
    Node {
        /// Path the operation targeted.
        path: String,
        /// The underlying store error.
        source: NodeStoreError,
    },

    /// A payload could not be encoded.
    #[snafu(display("failed to encode payload for '{path}': {source}"))]
    Payload {
        /// Path the payload was destined for.
        path: String,
        /// The encoding error.
        source: PayloadError,
    },
}

impl ClientError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Connection { .. } => ErrorKind::Connection,
            ClientError::NotConnected { .. } | ClientError::Session { .. } => ErrorKind::Session,
            ClientError::Node { .. } | ClientError::Payload { .. } => ErrorKind::Node,
        }
    }

    /// Returns true if the target node did not exist.
    pub fn is_no_node(&self) -> bool {
        matches!(self, ClientError::Node { source, .. } if source.is_no_node())
    }

    /// Returns true if the target node already existed.
    pub fn is_node_exists(&self) -> bool {
        matches!(self, ClientError::Node { source, .. } if source.is_node_exists())
    }

    /// Returns true if the store was unreachable but the session may still be
    /// alive. Retrying the same operation on the same session is worthwhile.
    pub fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            ClientError::Session {
                source: NodeStoreError::ConnectionLoss { .. },
                ..
            }
        )
    }

    /// Returns true if the caller must reconnect before retrying.
    pub fn needs_reconnect(&self) -> bool {
        matches!(self.kind(), ErrorKind::Connection | ErrorKind::Session)
    }
}
