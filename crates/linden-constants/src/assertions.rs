//! Compile-time relationships between constants.

use super::coordination::*;
use super::namespace::*;
use super::session::*;

// ============================================================================
// Session
// ============================================================================

const _: () = assert!(MIN_SESSION_TIMEOUT_MS > 0);
const _: () = assert!(MIN_SESSION_TIMEOUT_MS <= DEFAULT_SESSION_TIMEOUT_MS);
const _: () = assert!(DEFAULT_SESSION_TIMEOUT_MS <= MAX_SESSION_TIMEOUT_MS);
const _: () = assert!(HEARTBEAT_DIVISOR >= 2);
const _: () = assert!(DEFAULT_CONNECT_RETRIES <= MAX_CONNECT_RETRIES);
const _: () = assert!(DEFAULT_RETRY_DELAY_MS <= MAX_RETRY_DELAY_MS);
const _: () = assert!(TRANSIENT_RETRY_DELAY_MS > 0);
const _: () = assert!(TRANSIENT_RETRY_DELAY_MS < MIN_SESSION_TIMEOUT_MS);

// ============================================================================
// Namespace
// ============================================================================

const _: () = assert!(SEQUENCE_DIGITS >= 10);
const _: () = assert!(MAX_SEGMENT_SIZE < MAX_PATH_SIZE);
const _: () = assert!(DEFAULT_BASE_PATH.len() < MAX_PATH_SIZE);

// ============================================================================
// Coordination
// ============================================================================

const _: () = assert!(DEFAULT_LOCK_TIMEOUT_MS <= MAX_LOCK_TIMEOUT_MS);
const _: () = assert!(DEFAULT_LEADERSHIP_TIMEOUT_MS <= MAX_LEADERSHIP_TIMEOUT_MS);
const _: () = assert!(MAX_SERVICE_DISCOVERY_RESULTS > 0);
const _: () = assert!(SERVICE_WATCH_CHANNEL_CAPACITY > 0);
const _: () = assert!(MAX_NODE_DATA_SIZE > 0);
