//! Coordination recipes over a hierarchical node store.
//!
//! All three recipes rest on one primitive: ephemeral-sequential nodes
//! ordered by their store-assigned sequence.
//!
//! - [`DistributedLock`]: first in line holds; waiters watch only their
//!   predecessor
//! - [`LeaderElection`]: first in line leads; candidates watch the whole
//!   election and are notified on leadership edges
//! - [`ServiceDiscovery`]: instances register ephemerally and are listed or
//!   watched by service name
//!
//! [`SharedConfig`] stores persistent entries under the `config` subtree, and
//! [`Coordinator`] composes everything behind a single session with lazy
//! connect and ordered shutdown.

mod coordinator;
pub mod discovery;
pub mod election;
mod error;
mod guard;
pub mod lock;
pub mod pure;
mod shared_config;
mod types;

pub use coordinator::Coordinator;
pub use coordinator::CoordinatorConfig;
pub use discovery::ServiceDiscovery;
pub use discovery::ServiceInfo;
pub use discovery::ServiceInstance;
pub use discovery::ServiceRegistration;
pub use discovery::ServiceWatch;
pub use election::ElectionConfig;
pub use election::ElectionHandle;
pub use election::ElectionState;
pub use election::LeaderElection;
pub use election::LeaderInfo;
pub use election::LeadershipEvent;
pub use error::CoordinationError;
pub use linden_store::ErrorKind;
pub use lock::DistributedLock;
pub use lock::HeldLock;
pub use lock::LockConfig;
pub use shared_config::SharedConfig;
pub use types::ParticipantInfo;
