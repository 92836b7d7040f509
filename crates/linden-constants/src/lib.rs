//! Centralized constants for the Linden coordination client.
//!
//! Every bound used by the session layer, the namespace layout and the
//! coordination primitives lives here so that relationships between them can
//! be checked at compile time (see `assertions`).
//!
//! # Modules
//!
//! - [`session`]: session timeouts, connect retry policy, heartbeats
//! - [`namespace`]: well-known subtree names and node prefixes
//! - [`coordination`]: lock, election and discovery bounds
//!
//! # Usage
//!
//! ```
//! use linden_constants::namespace::LOCKS_NODE;
//! use linden_constants::session::DEFAULT_SESSION_TIMEOUT_MS;
//! ```

mod assertions;
pub mod coordination;
pub mod namespace;
pub mod session;

pub use namespace::CANDIDATE_PREFIX;
pub use namespace::DEFAULT_BASE_PATH;
pub use namespace::INSTANCE_PREFIX;
pub use namespace::LOCK_PREFIX;
pub use session::DEFAULT_CONNECT_RETRIES;
pub use session::DEFAULT_RETRY_DELAY_MS;
pub use session::DEFAULT_SESSION_TIMEOUT_MS;
