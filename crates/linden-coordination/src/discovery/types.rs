//! Service discovery types.

use std::collections::BTreeMap;

use linden_node_types::NodePayload;
use linden_node_types::Sequence;
use serde::Deserialize;
use serde::Serialize;

use crate::types::ParticipantInfo;

/// What an instance advertises about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServiceInfo {
    /// Host or address peers should connect to.
    pub host: String,
    /// Port peers should connect to.
    pub port: u16,
    /// Free-form attributes (version, zone, ...).
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ServiceInfo {
    /// Create info with no metadata.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            metadata: BTreeMap::new(),
        }
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// `host:port`.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A registration owned by this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRegistration {
    /// Service name.
    pub service: String,
    /// Path of the instance node.
    pub node_path: String,
    /// The instance's sequence under its service.
    pub sequence: Sequence,
}

/// One discovered instance of a service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceInstance {
    /// Service name.
    pub service: String,
    /// Instance node name, e.g. `instance-0000000004`.
    pub name: String,
    /// Full path of the instance node.
    pub node_path: String,
    /// Store-assigned sequence, if the node carries one.
    pub sequence: Option<Sequence>,
    /// Decoded service info, if the payload is structured and well-formed.
    pub info: Option<ServiceInfo>,
    /// Identity of the registering process, if present.
    pub participant: Option<ParticipantInfo>,
    /// The payload as stored; raw bytes if it was not a JSON object.
    pub payload: NodePayload,
}

impl ServiceInstance {
    pub(crate) fn from_payload(
        service: &str,
        name: &str,
        node_path: String,
        sequence: Option<Sequence>,
        payload: NodePayload,
    ) -> Self {
        Self {
            service: service.to_string(),
            name: name.to_string(),
            node_path,
            sequence,
            info: payload.decode_as(),
            participant: ParticipantInfo::from_payload(&payload),
            payload,
        }
    }

    /// `host:port`, if the instance advertised one.
    pub fn endpoint(&self) -> Option<String> {
        self.info.as_ref().map(ServiceInfo::endpoint)
    }
}
