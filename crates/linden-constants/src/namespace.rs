//! Namespace layout shared by every process using the same base root.
//!
//! ```text
//! /linden
//! ├── services/<service>/instance-0000000007
//! ├── locks/<lock>/lock-0000000012
//! ├── elections/<election>/candidate-0000000003
//! └── config/<key>
//! ```

/// Default base root for all coordination nodes.
pub const DEFAULT_BASE_PATH: &str = "/linden";

/// Subtree holding one child per registered service.
pub const SERVICES_NODE: &str = "services";

/// Subtree holding one child per lock name.
pub const LOCKS_NODE: &str = "locks";

/// Subtree holding one child per election name.
pub const ELECTIONS_NODE: &str = "elections";

/// Subtree holding shared configuration entries.
pub const CONFIG_NODE: &str = "config";

/// Prefix of service instance nodes.
pub const INSTANCE_PREFIX: &str = "instance-";

/// Prefix of election candidate nodes.
pub const CANDIDATE_PREFIX: &str = "candidate-";

/// Prefix of lock contender nodes.
pub const LOCK_PREFIX: &str = "lock-";

/// Width of the zero-padded sequence suffix appended by the store.
pub const SEQUENCE_DIGITS: usize = 10;

/// Maximum length of a single path segment (service, lock or election name).
pub const MAX_SEGMENT_SIZE: usize = 255;

/// Maximum total path length in bytes.
pub const MAX_PATH_SIZE: usize = 4096;
