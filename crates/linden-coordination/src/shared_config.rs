//! Persistent key/value entries under the `config` subtree.
//!
//! Entries outlive the session that wrote them. There is no change
//! notification; readers poll.

use std::sync::Arc;

use linden_node_types::CreateMode;
use linden_node_types::NodePayload;
use linden_store::NodeStore;
use linden_store::StoreClient;
use serde_json::Value;
use snafu::ResultExt;
use tracing::debug;

use crate::error::CoordinationError;
use crate::error::InvalidNameSnafu;

/// Shared configuration store for one session.
pub struct SharedConfig<S: NodeStore + ?Sized + 'static> {
    client: Arc<StoreClient<S>>,
}

impl<S: NodeStore + ?Sized + 'static> SharedConfig<S> {
    pub fn new(client: Arc<StoreClient<S>>) -> Self {
        Self { client }
    }

    /// Create or overwrite `key`. `value` must be a JSON object.
    pub async fn put(&self, key: &str, value: Value) -> Result<(), CoordinationError> {
        let node_path = self.client.namespace().config_key(key).context(InvalidNameSnafu { name: key })?;
        let payload = NodePayload::from_serializable(&value)?;

        if self.client.exists(&node_path).await?.is_none() {
            match self.client.create_node(&node_path, &payload, CreateMode::Persistent).await {
                Ok(_) => {
                    debug!(key = %key, "config entry created");
                    return Ok(());
                }
                Err(err) if err.is_node_exists() => {}
                Err(err) => return Err(err.into()),
            }
        }
        let stat = self.client.set_node(&node_path, &payload).await?;
        debug!(key = %key, version = stat.version, "config entry updated");
        Ok(())
    }

    /// Read `key`, or `None` if absent.
    pub async fn get(&self, key: &str) -> Result<Option<NodePayload>, CoordinationError> {
        let node_path = self.client.namespace().config_key(key).context(InvalidNameSnafu { name: key })?;
        match self.client.get_node(&node_path).await {
            Ok(node) => Ok(Some(node.payload)),
            Err(err) if err.is_no_node() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Remove `key`. Missing keys are not an error.
    pub async fn delete(&self, key: &str) -> Result<(), CoordinationError> {
        let node_path = self.client.namespace().config_key(key).context(InvalidNameSnafu { name: key })?;
        self.client.delete_node(&node_path).await?;
        Ok(())
    }

    /// Every key, sorted.
    pub async fn keys(&self) -> Result<Vec<String>, CoordinationError> {
        let mut keys: Vec<String> = self
            .client
            .list_children(&self.client.namespace().config())
            .await?
            .into_iter()
            .map(|child| child.name)
            .collect();
        keys.sort();
        Ok(keys)
    }
}
