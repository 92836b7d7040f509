//! Pure functions for coordination logic.
//!
//! Deterministic and side-effect free; the async recipes call these after
//! every store round-trip.

mod election;
mod ordering;

pub use election::compute_next_election_state;
pub use election::compute_withdraw_event;
pub use ordering::LockPosition;
pub use ordering::front_runner;
pub use ordering::is_front;
pub use ordering::lock_position;
pub use ordering::sort_by_sequence;
