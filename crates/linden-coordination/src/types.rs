//! Shared types for coordination primitives.

use std::collections::HashMap;

use linden_node_types::NodePayload;
use linden_node_types::PayloadError;
use linden_node_types::SessionId;
use linden_node_types::now_unix_ms;
use serde::Deserialize;
use serde::Serialize;

/// Identity of the process that created a coordination node.
///
/// Injected into every lock, candidate and instance payload so peers can
/// tell who is in front of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    /// Operating system process id.
    pub pid: u32,
    /// Host the process runs on.
    pub hostname: String,
    /// When the node was created (Unix ms).
    pub registered_at_ms: u64,
}

impl ParticipantInfo {
    /// Identity of the calling process, stamped now.
    pub fn current() -> Self {
        Self {
            pid: std::process::id(),
            hostname: local_hostname(),
            registered_at_ms: now_unix_ms(),
        }
    }

    /// Encode as a structured payload.
    pub fn to_payload(&self) -> Result<NodePayload, PayloadError> {
        NodePayload::from_serializable(self)
    }

    /// Decode from a payload, if it carries participant fields.
    pub fn from_payload(payload: &NodePayload) -> Option<Self> {
        payload.decode_as()
    }
}

fn local_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Local record of something whose node lives in one store session.
#[derive(Debug, Clone)]
pub(crate) struct SessionOwned<T> {
    pub(crate) session: Option<SessionId>,
    pub(crate) value: T,
}

impl<T> SessionOwned<T> {
    pub(crate) fn new(session: Option<SessionId>, value: T) -> Self {
        Self { session, value }
    }

    /// Whether the owning session is still the current one.
    pub(crate) fn is_live(&self, current: Option<SessionId>) -> bool {
        current.is_some() && self.session == current
    }
}

/// Drop records whose session is gone. Returns the removed keys, sorted.
pub(crate) fn prune_stale<T>(records: &mut HashMap<String, SessionOwned<T>>, current: Option<SessionId>) -> Vec<String> {
    let mut stale: Vec<String> =
        records.iter().filter(|(_, record)| !record.is_live(current)).map(|(key, _)| key.clone()).collect();
    stale.sort();
    for key in &stale {
        records.remove(key);
    }
    stale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_is_stamped() {
        let info = ParticipantInfo::current();
        assert_eq!(info.pid, std::process::id());
        assert!(info.registered_at_ms > 0);
        assert!(!info.hostname.is_empty());
    }

    #[test]
    fn test_payload_roundtrip_tolerates_extra_fields() {
        let info = ParticipantInfo::current();
        let mut payload = info.to_payload().unwrap();
        payload.insert("port", serde_json::json!(8080));
        assert_eq!(ParticipantInfo::from_payload(&payload), Some(info));
    }

    #[test]
    fn test_raw_payload_has_no_participant() {
        let payload = NodePayload::Raw(b"opaque".to_vec());
        assert_eq!(ParticipantInfo::from_payload(&payload), None);
    }

    #[test]
    fn test_prune_drops_records_of_other_sessions() {
        let mut records = HashMap::new();
        records.insert("kept".to_string(), SessionOwned::new(Some(SessionId(2)), 1));
        records.insert("old".to_string(), SessionOwned::new(Some(SessionId(1)), 2));
        records.insert("orphan".to_string(), SessionOwned::new(None, 3));

        assert_eq!(prune_stale(&mut records, Some(SessionId(2))), vec!["old".to_string(), "orphan".to_string()]);
        assert_eq!(records.len(), 1);
        assert_eq!(prune_stale(&mut records, None), vec!["kept".to_string()]);
        assert!(records.is_empty());
    }
}
