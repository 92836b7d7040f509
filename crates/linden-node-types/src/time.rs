//! Wall-clock helpers.

/// Get current Unix timestamp in milliseconds.
///
/// Returns 0 if system time is before UNIX epoch instead of panicking.
#[inline]
pub fn now_unix_ms() -> u64 {
    use std::time::SystemTime;
    use std::time::UNIX_EPOCH;
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
