//! Raw errors reported by the coordination store.

use thiserror::Error;

use crate::SessionId;

/// Errors returned by a node store backend.
///
/// These mirror the result codes of a ZooKeeper-class store. Higher layers
/// translate them into connection, session and node error kinds.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NodeStoreError {
    #[error("node '{path}' does not exist")]
    NoNode { path: String },
    #[error("node '{path}' already exists")]
    NodeExists { path: String },
    #[error("node '{path}' has children")]
    NotEmpty { path: String },
    #[error("version mismatch on '{path}': expected {expected}, actual {actual}")]
    BadVersion { path: String, expected: u32, actual: u32 },
    #[error("ephemeral node '{path}' cannot have children")]
    NoChildrenForEphemerals { path: String },
    #[error("session {session} expired")]
    SessionExpired { session: SessionId },
    #[error("connection lost: {reason}")]
    ConnectionLoss { reason: String },
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
    #[error("data size {size} exceeds maximum of {max} bytes")]
    DataTooLarge { size: usize, max: usize },
    #[error("operation failed: {reason}")]
    Failed { reason: String },
}

impl NodeStoreError {
    /// Returns true if the error means the session can no longer be used.
    pub fn is_session_loss(&self) -> bool {
        matches!(self, Self::SessionExpired { .. } | Self::ConnectionLoss { .. })
    }

    /// Returns true for `NoNode`.
    pub fn is_no_node(&self) -> bool {
        matches!(self, Self::NoNode { .. })
    }

    /// Returns true for `NodeExists`.
    pub fn is_node_exists(&self) -> bool {
        matches!(self, Self::NodeExists { .. })
    }
}

/// Errors encoding a structured node payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("payload must be a JSON object, got {kind}")]
    NotAnObject { kind: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_node_display() {
        let err = NodeStoreError::NoNode {
            path: "/linden/locks".to_string(),
        };
        assert_eq!(err.to_string(), "node '/linden/locks' does not exist");
    }

    #[test]
    fn test_session_loss_classification() {
        assert!(NodeStoreError::SessionExpired { session: SessionId(1) }.is_session_loss());
        assert!(
            NodeStoreError::ConnectionLoss {
                reason: "reset".to_string()
            }
            .is_session_loss()
        );
        assert!(!NodeStoreError::NoNode { path: "/a".to_string() }.is_session_loss());
    }
}
