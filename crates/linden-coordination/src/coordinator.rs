//! Facade composing discovery, election, locks and shared config over one
//! session.
//!
//! The session is opened lazily by the first operation. [`Coordinator::shutdown`]
//! tears state down in an order that lets peers react immediately instead
//! of waiting for session expiry:
//!
//! 1. unregister every service instance
//! 2. withdraw from every election
//! 3. release every held lock
//! 4. close the session

use std::sync::Arc;
use std::time::Duration;

use linden_node_types::NodePayload;
use linden_node_types::SessionId;
use linden_store::NodeStore;
use linden_store::SessionConfig;
use linden_store::SessionState;
use linden_store::StoreClient;
use serde_json::Value;
use tracing::info;

use crate::discovery::ServiceDiscovery;
use crate::discovery::ServiceInfo;
use crate::discovery::ServiceInstance;
use crate::discovery::ServiceRegistration;
use crate::discovery::ServiceWatch;
use crate::election::ElectionConfig;
use crate::election::ElectionHandle;
use crate::election::LeaderElection;
use crate::election::LeaderInfo;
use crate::error::CoordinationError;
use crate::lock::DistributedLock;
use crate::lock::HeldLock;
use crate::lock::LockConfig;
use crate::shared_config::SharedConfig;

/// Everything a [`Coordinator`] needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub session: SessionConfig,
    pub lock: LockConfig,
    pub election: ElectionConfig,
}

/// One process's coordination context.
///
/// Independent coordinators may share a store, each with its own session;
/// tests use this to simulate several processes.
pub struct Coordinator<S: NodeStore + ?Sized + 'static> {
    client: Arc<StoreClient<S>>,
    discovery: ServiceDiscovery<S>,
    election: LeaderElection<S>,
    lock: DistributedLock<S>,
    shared_config: SharedConfig<S>,
}

impl<S: NodeStore + ?Sized + 'static> Coordinator<S> {
    /// Create a coordinator. No session is opened yet.
    pub fn new(store: Arc<S>, config: CoordinatorConfig) -> Result<Self, CoordinationError> {
        let client = Arc::new(StoreClient::new(store, config.session)?);
        Ok(Self {
            discovery: ServiceDiscovery::new(Arc::clone(&client)),
            election: LeaderElection::new(Arc::clone(&client), config.election),
            lock: DistributedLock::new(Arc::clone(&client), config.lock),
            shared_config: SharedConfig::new(Arc::clone(&client)),
            client,
        })
    }

    /// Connect if not already connected. Safe to call repeatedly.
    pub async fn initialize(&self) -> Result<SessionId, CoordinationError> {
        Ok(self.client.connect().await?)
    }

    /// The underlying client.
    pub fn client(&self) -> &Arc<StoreClient<S>> {
        &self.client
    }

    /// Current session state.
    pub fn session_state(&self) -> SessionState {
        self.client.state()
    }

    /// Tear down every registration, candidacy and lock, then close the
    /// session.
    pub async fn shutdown(&self) {
        self.discovery.unregister_all().await;
        self.election.withdraw_all().await;
        self.lock.release_all().await;
        self.client.close().await;
        info!("coordinator shut down");
    }

    // Service discovery

    pub async fn register_service(
        &self,
        name: &str,
        info: &ServiceInfo,
    ) -> Result<ServiceRegistration, CoordinationError> {
        self.initialize().await?;
        self.discovery.register_service(name, info).await
    }

    pub async fn unregister_service(&self, name: &str) -> bool {
        self.discovery.unregister_service(name).await
    }

    pub async fn discover_services(&self, name: Option<&str>) -> Result<Vec<ServiceInstance>, CoordinationError> {
        self.initialize().await?;
        self.discovery.discover_services(name).await
    }

    pub async fn list_services(&self) -> Result<Vec<String>, CoordinationError> {
        self.initialize().await?;
        self.discovery.list_services().await
    }

    pub async fn watch_service(&self, name: &str) -> Result<ServiceWatch, CoordinationError> {
        self.initialize().await?;
        self.discovery.watch_service(name).await
    }

    pub async fn get_service_endpoint(&self, name: &str) -> Result<Option<String>, CoordinationError> {
        self.initialize().await?;
        self.discovery.get_service_endpoint(name).await
    }

    // Leader election

    pub async fn participate(&self, name: &str) -> Result<ElectionHandle, CoordinationError> {
        self.initialize().await?;
        self.election.participate(name).await
    }

    pub async fn withdraw(&self, name: &str) -> bool {
        self.election.withdraw(name).await
    }

    pub async fn current_leader(&self, name: &str) -> Result<Option<LeaderInfo>, CoordinationError> {
        self.initialize().await?;
        self.election.current_leader(name).await
    }

    // Locks

    /// Acquire `name`, waiting at most `timeout` or the configured default.
    pub async fn acquire_lock(&self, name: &str, timeout: Option<Duration>) -> Result<HeldLock, CoordinationError> {
        self.initialize().await?;
        match timeout {
            Some(timeout) => self.lock.acquire(name, timeout).await,
            None => self.lock.acquire_default(name).await,
        }
    }

    pub async fn release_lock(&self, name: &str) -> bool {
        self.lock.release(name).await
    }

    pub async fn is_locked(&self, name: &str) -> bool {
        self.lock.is_locked(name).await
    }

    pub async fn held_locks(&self) -> Vec<String> {
        self.lock.held_locks().await
    }

    // Shared configuration

    pub async fn put_config(&self, key: &str, value: Value) -> Result<(), CoordinationError> {
        self.initialize().await?;
        self.shared_config.put(key, value).await
    }

    pub async fn get_config(&self, key: &str) -> Result<Option<NodePayload>, CoordinationError> {
        self.initialize().await?;
        self.shared_config.get(key).await
    }

    pub async fn delete_config(&self, key: &str) -> Result<(), CoordinationError> {
        self.initialize().await?;
        self.shared_config.delete(key).await
    }

    pub async fn config_keys(&self) -> Result<Vec<String>, CoordinationError> {
        self.initialize().await?;
        self.shared_config.keys().await
    }
}
