//! Linden: client-side coordination over a ZooKeeper-class node store.
//!
//! Independent service instances get three capabilities from one session:
//!
//! - mutual exclusion ([`DistributedLock`])
//! - single-leader selection ([`LeaderElection`])
//! - dynamic membership ([`ServiceDiscovery`])
//!
//! [`Coordinator`] bundles them with lazy connect and ordered shutdown, and
//! [`config::LindenConfig`] loads its settings from TOML and `LINDEN_*`
//! environment variables.
//!
//! # Example
//!
//! ```ignore
//! let store = DeterministicNodeStore::new();
//! let config = LindenConfig::load_with_layers()?;
//! let coordinator = Coordinator::new(store, config.coordinator_config())?;
//!
//! let held = coordinator.acquire_lock("export-job", Some(Duration::from_secs(5))).await?;
//! // ... exclusive work ...
//! coordinator.release_lock("export-job").await;
//! coordinator.shutdown().await;
//! ```

pub mod config;

pub use linden_coordination::CoordinationError;
pub use linden_coordination::Coordinator;
pub use linden_coordination::CoordinatorConfig;
pub use linden_coordination::DistributedLock;
pub use linden_coordination::ElectionConfig;
pub use linden_coordination::ElectionHandle;
pub use linden_coordination::ElectionState;
pub use linden_coordination::ErrorKind;
pub use linden_coordination::HeldLock;
pub use linden_coordination::LeaderElection;
pub use linden_coordination::LeaderInfo;
pub use linden_coordination::LeadershipEvent;
pub use linden_coordination::LockConfig;
pub use linden_coordination::ParticipantInfo;
pub use linden_coordination::ServiceDiscovery;
pub use linden_coordination::ServiceInfo;
pub use linden_coordination::ServiceInstance;
pub use linden_coordination::ServiceRegistration;
pub use linden_coordination::ServiceWatch;
pub use linden_coordination::SharedConfig;
pub use linden_node_types::CreateMode;
pub use linden_node_types::NodePayload;
pub use linden_node_types::Sequence;
pub use linden_node_types::SessionId;
pub use linden_store::ClientError;
pub use linden_store::DeterministicNodeStore;
pub use linden_store::NodeStore;
pub use linden_store::SessionConfig;
pub use linden_store::SessionState;
pub use linden_store::StoreClient;
