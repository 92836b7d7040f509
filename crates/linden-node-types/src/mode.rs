//! Node creation modes.

use serde::Deserialize;
use serde::Serialize;

/// How a node is created and how long it lives.
///
/// Ephemeral nodes are owned by the creating session and vanish when it ends.
/// Sequential nodes get a store-assigned, monotonically increasing suffix
/// that is unique within the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CreateMode {
    /// Lives until explicitly deleted.
    #[default]
    Persistent,
    /// Deleted when the owning session ends.
    Ephemeral,
    /// Persistent with a sequence suffix.
    PersistentSequential,
    /// Ephemeral with a sequence suffix.
    EphemeralSequential,
}

impl CreateMode {
    /// Returns true if the node is tied to its session.
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Self::Ephemeral | Self::EphemeralSequential)
    }

    /// Returns true if the store appends a sequence suffix.
    pub fn is_sequential(&self) -> bool {
        matches!(self, Self::PersistentSequential | Self::EphemeralSequential)
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Persistent => "persistent",
            Self::Ephemeral => "ephemeral",
            Self::PersistentSequential => "persistent-sequential",
            Self::EphemeralSequential => "ephemeral-sequential",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_flags() {
        assert!(!CreateMode::Persistent.is_ephemeral());
        assert!(!CreateMode::Persistent.is_sequential());
        assert!(CreateMode::Ephemeral.is_ephemeral());
        assert!(!CreateMode::Ephemeral.is_sequential());
        assert!(!CreateMode::PersistentSequential.is_ephemeral());
        assert!(CreateMode::PersistentSequential.is_sequential());
        assert!(CreateMode::EphemeralSequential.is_ephemeral());
        assert!(CreateMode::EphemeralSequential.is_sequential());
    }

    #[test]
    fn test_default_is_persistent() {
        assert_eq!(CreateMode::default(), CreateMode::Persistent);
    }
}
