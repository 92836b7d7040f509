//! Service discovery over ephemeral-sequential instance nodes.
//!
//! Each registration creates `services/<name>/instance-NNNNNNNNNN` carrying
//! the caller's [`ServiceInfo`] plus the registering process's identity.
//! Instances vanish with their session, so discovery reflects crashed
//! members without any health checking.

mod types;
mod watch;

use std::collections::HashMap;
use std::sync::Arc;

use linden_constants::coordination::MAX_SERVICE_DISCOVERY_RESULTS;
use linden_constants::namespace::INSTANCE_PREFIX;
use linden_node_types::ChildNode;
use linden_node_types::CreateMode;
use linden_node_types::NodePayload;
use linden_node_types::path;
use linden_store::ClientError;
use linden_store::NodeStore;
use linden_store::StoreClient;
use snafu::ResultExt;
use tokio::sync::Mutex;
use tokio::sync::MutexGuard;
use tracing::debug;
use tracing::info;
use tracing::warn;
pub use types::ServiceInfo;
pub use types::ServiceInstance;
pub use types::ServiceRegistration;
pub use watch::ServiceWatch;

use crate::error::CoordinationError;
use crate::error::InvalidNameSnafu;
use crate::error::missing_sequence;
use crate::pure::sort_by_sequence;
use crate::types::ParticipantInfo;
use crate::types::SessionOwned;
use crate::types::prune_stale;

/// Service registry for one store session.
///
/// Tracks at most one registration per service name for this process.
/// Registrations made under a session that has since ended are forgotten;
/// their instance nodes went with it.
pub struct ServiceDiscovery<S: NodeStore + ?Sized + 'static> {
    client: Arc<StoreClient<S>>,
    registrations: Mutex<HashMap<String, SessionOwned<ServiceRegistration>>>,
}

impl<S: NodeStore + ?Sized + 'static> ServiceDiscovery<S> {
    /// Create a registry sharing `client`'s session.
    pub fn new(client: Arc<StoreClient<S>>) -> Self {
        Self {
            client,
            registrations: Mutex::new(HashMap::new()),
        }
    }

    /// Register an instance of `name`.
    ///
    /// Registering a name this process already registered replaces the
    /// previous instance node.
    pub async fn register_service(
        &self,
        name: &str,
        info: &ServiceInfo,
    ) -> Result<ServiceRegistration, CoordinationError> {
        let dir = self.client.namespace().service(name).context(InvalidNameSnafu { name })?;
        self.client.ensure_path(&dir).await?;

        let mut payload = NodePayload::from_serializable(info)?;
        payload.merge(&ParticipantInfo::current().to_payload()?);

        let session = self.client.session_id();
        let created = self
            .client
            .create_node(&path::join(&dir, INSTANCE_PREFIX), &payload, CreateMode::EphemeralSequential)
            .await?;
        let sequence = created.sequence.ok_or_else(|| missing_sequence(&created.path))?;
        let registration = ServiceRegistration {
            service: name.to_string(),
            node_path: created.path,
            sequence,
        };

        let previous = self
            .live_registrations()
            .await
            .insert(name.to_string(), SessionOwned::new(session, registration.clone()));
        if let Some(SessionOwned { value: previous, .. }) = previous
            && let Err(err) = self.client.remove_owned_node(&previous.node_path).await
        {
            warn!(service = %name, error = %err, "failed to delete replaced instance node");
        }

        info!(
            service = %name,
            endpoint = %info.endpoint(),
            sequence = sequence.value(),
            "service registered"
        );
        Ok(registration)
    }

    /// Remove this process's instance of `name`. Returns `false` if none.
    pub async fn unregister_service(&self, name: &str) -> bool {
        let Some(SessionOwned { value: registration, .. }) = self.live_registrations().await.remove(name) else {
            debug!(service = %name, "unregister without registration");
            return false;
        };
        if let Err(err) = self.client.remove_owned_node(&registration.node_path).await {
            warn!(service = %name, error = %err, "failed to delete instance node");
        }
        info!(service = %name, sequence = registration.sequence.value(), "service unregistered");
        true
    }

    /// Remove every registration this process made.
    pub async fn unregister_all(&self) {
        let names: Vec<String> = self.live_registrations().await.keys().cloned().collect();
        for name in names {
            self.unregister_service(&name).await;
        }
    }

    /// Registrations this process currently holds, sorted by service.
    pub async fn registrations(&self) -> Vec<ServiceRegistration> {
        let mut registrations: Vec<ServiceRegistration> =
            self.live_registrations().await.values().map(|record| record.value.clone()).collect();
        registrations.sort_by(|a, b| a.service.cmp(&b.service));
        registrations
    }

    async fn live_registrations(&self) -> MutexGuard<'_, HashMap<String, SessionOwned<ServiceRegistration>>> {
        let mut registrations = self.registrations.lock().await;
        for service in prune_stale(&mut registrations, self.client.session_id()) {
            info!(service = %service, "registration went with its session");
        }
        registrations
    }

    /// Every service name known to the store, sorted.
    pub async fn list_services(&self) -> Result<Vec<String>, CoordinationError> {
        let mut names: Vec<String> = self
            .client
            .list_children(&self.client.namespace().services())
            .await?
            .into_iter()
            .map(|child| child.name)
            .collect();
        names.sort();
        Ok(names)
    }

    /// Live instances of `name`, or of every service when `None`.
    ///
    /// Instances are ordered by sequence within each service. The result is
    /// capped at [`MAX_SERVICE_DISCOVERY_RESULTS`].
    pub async fn discover_services(&self, name: Option<&str>) -> Result<Vec<ServiceInstance>, CoordinationError> {
        let services = match name {
            Some(name) => vec![name.to_string()],
            None => self.list_services().await?,
        };

        let mut instances = Vec::new();
        for service in services {
            let dir = self.client.namespace().service(&service).context(InvalidNameSnafu { name: service.as_str() })?;
            let children = match self.client.list_children(&dir).await {
                Ok(children) => children,
                Err(err) if err.is_no_node() => continue,
                Err(err) => return Err(err.into()),
            };
            instances.extend(resolve_instances(&self.client, &service, &dir, &children).await?);
            if instances.len() >= MAX_SERVICE_DISCOVERY_RESULTS as usize {
                instances.truncate(MAX_SERVICE_DISCOVERY_RESULTS as usize);
                break;
            }
        }
        Ok(instances)
    }

    /// Endpoint of the longest-registered live instance of `name`.
    pub async fn get_service_endpoint(&self, name: &str) -> Result<Option<String>, CoordinationError> {
        let instances = self.discover_services(Some(name)).await?;
        Ok(instances.iter().find_map(ServiceInstance::endpoint))
    }

    /// Observe membership of `name`.
    pub async fn watch_service(&self, name: &str) -> Result<ServiceWatch, CoordinationError> {
        let dir = self.client.namespace().service(name).context(InvalidNameSnafu { name })?;
        self.client.ensure_path(&dir).await?;
        Ok(watch::spawn_service_watch(Arc::clone(&self.client), name.to_string(), dir))
    }
}

/// Fetch every instance in `children`, skipping nodes that vanished.
pub(crate) async fn resolve_instances<S: NodeStore + ?Sized + 'static>(
    client: &StoreClient<S>,
    service: &str,
    dir: &str,
    children: &[ChildNode],
) -> Result<Vec<ServiceInstance>, ClientError> {
    let mut instances = Vec::new();
    for child in sort_by_sequence(children, INSTANCE_PREFIX) {
        let node_path = path::join(dir, &child.name);
        match client.get_node(&node_path).await {
            Ok(node) => instances.push(ServiceInstance::from_payload(
                service,
                &child.name,
                node_path,
                child.sequence,
                node.payload,
            )),
            Err(err) if err.is_no_node() => {}
            Err(err) => return Err(err),
        }
    }
    Ok(instances)
}
