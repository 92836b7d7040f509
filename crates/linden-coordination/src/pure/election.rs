//! Pure election state transitions.
//!
//! Leadership events fire only on edges of the state machine:
//!
//! ```text
//! Candidate | Follower --(in front)-->  Leader     emits Elected
//! Leader              --(behind)---->   Follower   emits Demoted
//! Leader              --(withdraw)-->   Withdrawn  emits Demoted
//! anything else                          no event
//! ```
//!
//! Re-evaluating with an unchanged position is a no-op, so membership churn
//! behind the leader never produces duplicate notifications.

use crate::election::ElectionState;
use crate::election::LeadershipEvent;

/// Compute the state after an evaluation, and the event to emit if any.
///
/// `NotParticipating` and `Withdrawn` are terminal for evaluation.
#[inline]
pub fn compute_next_election_state(
    current: ElectionState,
    is_front: bool,
) -> (ElectionState, Option<LeadershipEvent>) {
    match (current, is_front) {
        (ElectionState::NotParticipating | ElectionState::Withdrawn, _) => (current, None),
        (ElectionState::Leader, true) => (ElectionState::Leader, None),
        (ElectionState::Leader, false) => (ElectionState::Follower, Some(LeadershipEvent::Demoted)),
        (ElectionState::Candidate | ElectionState::Follower, true) => {
            (ElectionState::Leader, Some(LeadershipEvent::Elected))
        }
        (ElectionState::Candidate | ElectionState::Follower, false) => (ElectionState::Follower, None),
    }
}

/// Compute the event emitted when a candidacy ends, voluntarily or by
/// session loss.
#[inline]
pub fn compute_withdraw_event(current: ElectionState) -> Option<LeadershipEvent> {
    match current {
        ElectionState::Leader => Some(LeadershipEvent::Demoted),
        _ => None,
    }
}
