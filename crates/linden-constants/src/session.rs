//! Session and connection constants.
//!
//! The coordination store negotiates a session timeout with every client.
//! Ephemeral nodes survive exactly as long as the session, so these values
//! bound how long a crashed process can keep a lock or leadership.

// ============================================================================
// Session Timeouts
// ============================================================================

/// Default requested session timeout (30 seconds).
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 30_000;

/// Smallest session timeout the client will request (2 seconds).
///
/// Anything shorter makes spurious expiry under GC pauses likely.
pub const MIN_SESSION_TIMEOUT_MS: u64 = 2_000;

/// Largest session timeout the client will request (5 minutes).
pub const MAX_SESSION_TIMEOUT_MS: u64 = 300_000;

/// Heartbeats are sent every `timeout / HEARTBEAT_DIVISOR`.
pub const HEARTBEAT_DIVISOR: u32 = 3;

// ============================================================================
// Connect Retry Policy
// ============================================================================

/// Default number of retries after the first failed connect attempt.
pub const DEFAULT_CONNECT_RETRIES: u32 = 5;

/// Upper bound on connect retries accepted from configuration.
pub const MAX_CONNECT_RETRIES: u32 = 100;

/// Fixed delay between connect attempts (1 second).
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

/// Upper bound on the delay between connect attempts (1 minute).
pub const MAX_RETRY_DELAY_MS: u64 = 60_000;

// ============================================================================
// Transient Failures
// ============================================================================

/// Pause between retries of an operation that hit connection loss while the
/// session was still live (100 milliseconds).
pub const TRANSIENT_RETRY_DELAY_MS: u64 = 100;
