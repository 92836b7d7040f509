//! Types describing the hierarchical node store that Linden coordinates through.
//!
//! These types model the contract of a ZooKeeper-class store: slash-delimited
//! paths, node creation modes, store-assigned sequence numbers, one-shot watch
//! events and the raw errors the store SDK reports. They carry no behavior
//! beyond validation and encoding so that both the client and alternative
//! store backends can share them.

mod error;
mod mode;
mod node;
pub mod path;
mod payload;
mod time;
mod watch;

pub use error::NodeStoreError;
pub use error::PayloadError;
pub use mode::CreateMode;
pub use node::ChildNode;
pub use node::CreatedNode;
pub use node::NodeData;
pub use node::NodeStat;
pub use node::Sequence;
pub use node::SessionId;
pub use payload::NodePayload;
pub use time::now_unix_ms;
pub use watch::WatchEvent;
pub use watch::WatchEventKind;
