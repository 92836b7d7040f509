//! Error types for coordination primitives.

use linden_node_types::NodeStoreError;
use linden_node_types::PayloadError;
use linden_store::ClientError;
use linden_store::ErrorKind;
use snafu::Snafu;

/// Errors from coordination primitives.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CoordinationError {
    /// Underlying store client error.
    #[snafu(display("{source}"))]
    Client {
        /// The client error.
        source: ClientError,
    },

    /// A lock, election, service or config name is not a valid path segment.
    #[snafu(display("invalid name '{name}': {source}"))]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        source: NodeStoreError,
    },

    /// The lock was not acquired in time. This process's contender node has
    /// been removed.
    #[snafu(display("timed out after {timeout_ms}ms acquiring lock '{name}'"))]
    LockTimeout {
        /// Lock name.
        name: String,
        /// The bound that was exceeded.
        timeout_ms: u64,
    },

    /// Leadership was not gained in time. The candidacy remains active.
    #[snafu(display("timed out after {timeout_ms}ms waiting for leadership of '{name}'"))]
    ElectionTimeout {
        /// Election name.
        name: String,
        /// The bound that was exceeded.
        timeout_ms: u64,
    },

    /// This component already holds an active candidacy for the election.
    #[snafu(display("already participating in election '{name}'"))]
    AlreadyParticipating {
        /// Election name.
        name: String,
    },

    /// The candidacy ended before leadership was gained.
    #[snafu(display("no longer participating in election '{name}'"))]
    NotParticipating {
        /// Election name.
        name: String,
    },

    /// The session ended while the operation was in progress. Every node it
    /// created is gone.
    #[snafu(display("session lost while coordinating '{name}'"))]
    SessionLost {
        /// Lock, election or service name.
        name: String,
    },

    /// A payload could not be encoded.
    #[snafu(display("payload error: {source}"))]
    Payload {
        /// The encoding error.
        source: PayloadError,
    },
}

impl CoordinationError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoordinationError::Client { source } => source.kind(),
            CoordinationError::LockTimeout { .. } => ErrorKind::LockTimeout,
            CoordinationError::ElectionTimeout { .. } => ErrorKind::ElectionTimeout,
            CoordinationError::SessionLost { .. } => ErrorKind::Session,
            CoordinationError::InvalidName { .. }
            | CoordinationError::AlreadyParticipating { .. }
            | CoordinationError::NotParticipating { .. }
            | CoordinationError::Payload { .. } => ErrorKind::Node,
        }
    }
}

impl From<ClientError> for CoordinationError {
    fn from(source: ClientError) -> Self {
        CoordinationError::Client { source }
    }
}

impl From<PayloadError> for CoordinationError {
    fn from(source: PayloadError) -> Self {
        CoordinationError::Payload { source }
    }
}

/// The store returned a sequential node without a sequence number.
pub(crate) fn missing_sequence(path: &str) -> CoordinationError {
    CoordinationError::Client {
        source: ClientError::Node {
            path: path.to_string(),
            source: NodeStoreError::Failed {
                reason: "sequential node created without a sequence".to_string(),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let timeout = CoordinationError::LockTimeout {
            name: "export-job".to_string(),
            timeout_ms: 5000,
        };
        assert_eq!(timeout.kind(), ErrorKind::LockTimeout);
        assert!(timeout.to_string().contains("export-job"));

        let election = CoordinationError::ElectionTimeout {
            name: "primary".to_string(),
            timeout_ms: 10,
        };
        assert_eq!(election.kind(), ErrorKind::ElectionTimeout);

        let lost = CoordinationError::SessionLost { name: "x".to_string() };
        assert_eq!(lost.kind(), ErrorKind::Session);

        assert_eq!(missing_sequence("/a").kind(), ErrorKind::Node);
    }
}
