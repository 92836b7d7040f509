//! Node identity, statistics and session identifiers.

use std::fmt;

use linden_constants::namespace::SEQUENCE_DIGITS;
use serde::Deserialize;
use serde::Serialize;

use crate::path;

/// Identifier of a store session.
///
/// Ephemeral nodes record the session that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Get the raw session id.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

/// Store-assigned sequence number of a sequential node.
///
/// Sequence numbers are unique and strictly increasing within one parent,
/// which makes them the only ordering key the coordination recipes need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Sequence(pub u64);

impl Sequence {
    /// Create a new sequence number.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw sequence value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Zero-padded suffix the store appends to the requested name.
    pub fn suffix(&self) -> String {
        format!("{:0width$}", self.0, width = SEQUENCE_DIGITS)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// Metadata the store keeps for every node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NodeStat {
    /// Data version, incremented on every set.
    pub version: u32,
    /// Creation time (Unix ms).
    pub created_at_ms: u64,
    /// Last modification time (Unix ms).
    pub modified_at_ms: u64,
    /// Owning session for ephemeral nodes.
    pub ephemeral_owner: Option<SessionId>,
    /// Number of direct children.
    pub num_children: u32,
}

impl NodeStat {
    /// Returns true if the node is ephemeral.
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral_owner.is_some()
    }
}

/// Result of a successful create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedNode {
    /// Final path, including the sequence suffix for sequential modes.
    pub path: String,
    /// Sequence assigned by the store (sequential modes only).
    pub sequence: Option<Sequence>,
}

impl CreatedNode {
    /// Last path segment of the created node.
    pub fn name(&self) -> &str {
        path::basename(&self.path)
    }
}

/// A direct child of a node as reported by a children listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChildNode {
    /// Child name (not the full path).
    pub name: String,
    /// Sequence assigned at creation, if the child is sequential.
    pub sequence: Option<Sequence>,
}

impl ChildNode {
    /// Create a child entry.
    pub fn new(name: impl Into<String>, sequence: Option<Sequence>) -> Self {
        Self {
            name: name.into(),
            sequence,
        }
    }
}

/// Raw node contents together with its stat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    /// Payload bytes exactly as stored.
    pub data: Vec<u8>,
    /// Node metadata.
    pub stat: NodeStat,
}
