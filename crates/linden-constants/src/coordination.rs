//! Constants for the coordination primitives.

// ============================================================================
// Locks
// ============================================================================

/// Default bound on how long `acquire` waits (10 seconds).
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 10_000;

/// Largest acquire timeout accepted from configuration (1 hour).
pub const MAX_LOCK_TIMEOUT_MS: u64 = 3_600_000;

// ============================================================================
// Elections
// ============================================================================

/// Default bound for `wait_for_leadership` (30 seconds).
pub const DEFAULT_LEADERSHIP_TIMEOUT_MS: u64 = 30_000;

/// Largest leadership wait accepted from configuration (1 hour).
pub const MAX_LEADERSHIP_TIMEOUT_MS: u64 = 3_600_000;

// ============================================================================
// Discovery
// ============================================================================

/// Maximum instances returned by a single discovery call.
pub const MAX_SERVICE_DISCOVERY_RESULTS: u32 = 1_000;

/// Buffered membership snapshots per service watch before back-pressure.
pub const SERVICE_WATCH_CHANNEL_CAPACITY: usize = 16;

// ============================================================================
// Node Data
// ============================================================================

/// Maximum payload size of a single node (1 MB, matching the store default).
pub const MAX_NODE_DATA_SIZE: usize = 1024 * 1024;
