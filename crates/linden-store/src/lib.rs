//! Session-managed access to a hierarchical coordination store.
//!
//! This crate provides:
//!
//! - [`NodeStore`]: the store SDK contract (sessions, node CRUD, one-shot watches)
//! - [`StoreClient`]: session lifecycle, retries, heartbeats and error translation
//! - [`Namespace`]: the path layout shared by every coordination recipe
//! - [`DeterministicNodeStore`]: an in-memory store for tests and simulation

mod client;
mod error;
pub mod inmemory;
mod namespace;
mod session;
mod traits;
mod watch;

pub use client::FetchedNode;
pub use client::StoreClient;
pub use error::ClientError;
pub use error::ErrorKind;
pub use inmemory::DeterministicNodeStore;
pub use namespace::Namespace;
pub use session::SessionConfig;
pub use session::SessionState;
pub use session::heartbeat_interval;
pub use traits::CreateRequest;
pub use traits::NodeStore;
pub use traits::SessionGrant;
pub use traits::WatchReceiver;
pub use watch::NodeWatch;
