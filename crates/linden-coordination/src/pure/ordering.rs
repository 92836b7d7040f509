//! Pure ordering functions over sequential children.
//!
//! Every recipe orders contenders by the store-assigned [`Sequence`] alone.
//! Children without a sequence, or without the recipe's name prefix, are
//! ignored. Sequences are unique per parent, so no tie-break is needed.

use linden_node_types::ChildNode;
use linden_node_types::Sequence;

/// Where a lock contender stands in its queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockPosition<'a> {
    /// Lowest surviving sequence: the lock is held.
    Holder,
    /// Someone is ahead; watch only the immediate predecessor.
    Waiting {
        /// The next-lower surviving contender.
        predecessor: &'a ChildNode,
    },
    /// The contender's own node is gone (session loss or external delete).
    Absent,
}

/// Contenders carrying `prefix` and a sequence, ascending by sequence.
pub fn sort_by_sequence<'a>(children: &'a [ChildNode], prefix: &str) -> Vec<&'a ChildNode> {
    let mut ordered: Vec<&ChildNode> = children
        .iter()
        .filter(|child| child.sequence.is_some() && child.name.starts_with(prefix))
        .collect();
    ordered.sort_by_key(|child| child.sequence);
    ordered
}

/// The contender in front of the queue, if any.
pub fn front_runner<'a>(children: &'a [ChildNode], prefix: &str) -> Option<&'a ChildNode> {
    children
        .iter()
        .filter(|child| child.sequence.is_some() && child.name.starts_with(prefix))
        .min_by_key(|child| child.sequence)
}

/// Whether `own` is in front. `None` if `own` is not among the children.
pub fn is_front(children: &[ChildNode], prefix: &str, own: Sequence) -> Option<bool> {
    let front = front_runner(children, prefix)?;
    let present = children.iter().any(|child| child.sequence == Some(own) && child.name.starts_with(prefix));
    if !present {
        return None;
    }
    Some(front.sequence == Some(own))
}

/// Locate `own` in a lock queue.
///
/// The predecessor is the highest sequence strictly below `own`.
pub fn lock_position<'a>(children: &'a [ChildNode], prefix: &str, own: Sequence) -> LockPosition<'a> {
    let ordered = sort_by_sequence(children, prefix);
    let Some(index) = ordered.iter().position(|child| child.sequence == Some(own)) else {
        return LockPosition::Absent;
    };
    match index.checked_sub(1) {
        None => LockPosition::Holder,
        Some(prev) => LockPosition::Waiting {
            predecessor: ordered[prev],
        },
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn child(prefix: &str, seq: u64) -> ChildNode {
        let sequence = Sequence::new(seq);
        ChildNode::new(format!("{prefix}{}", sequence.suffix()), Some(sequence))
    }

    #[test]
    fn test_sort_ignores_foreign_children() {
        let children = vec![
            child("lock-", 7),
            ChildNode::new("stray", None),
            child("lock-", 2),
            child("other-", 1),
        ];
        let ordered: Vec<u64> = sort_by_sequence(&children, "lock-")
            .into_iter()
            .filter_map(|c| c.sequence.map(|s| s.value()))
            .collect();
        assert_eq!(ordered, vec![2, 7]);
    }

    #[test]
    fn test_lowest_is_holder() {
        let children = vec![child("lock-", 5), child("lock-", 3), child("lock-", 9)];
        assert_eq!(lock_position(&children, "lock-", Sequence::new(3)), LockPosition::Holder);
    }

    #[test]
    fn test_predecessor_skips_gaps() {
        let children = vec![child("lock-", 1), child("lock-", 4), child("lock-", 9)];
        match lock_position(&children, "lock-", Sequence::new(9)) {
            LockPosition::Waiting { predecessor } => assert_eq!(predecessor.sequence, Some(Sequence::new(4))),
            other => panic!("expected Waiting, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_own_node_is_absent() {
        let children = vec![child("lock-", 1)];
        assert_eq!(lock_position(&children, "lock-", Sequence::new(2)), LockPosition::Absent);
        assert_eq!(is_front(&children, "lock-", Sequence::new(2)), None);
    }

    #[test]
    fn test_is_front() {
        let children = vec![child("candidate-", 3), child("candidate-", 8)];
        assert_eq!(is_front(&children, "candidate-", Sequence::new(3)), Some(true));
        assert_eq!(is_front(&children, "candidate-", Sequence::new(8)), Some(false));
        assert_eq!(front_runner(&[], "candidate-"), None);
    }

    proptest! {
        #[test]
        fn prop_exactly_one_holder(seqs in proptest::collection::btree_set(0u64..10_000, 1..32)) {
            let children: Vec<ChildNode> = seqs.iter().map(|s| child("lock-", *s)).collect();
            let holders = seqs
                .iter()
                .filter(|s| lock_position(&children, "lock-", Sequence::new(**s)) == LockPosition::Holder)
                .count();
            prop_assert_eq!(holders, 1);
        }

        #[test]
        fn prop_predecessor_is_next_lower(seqs in proptest::collection::btree_set(0u64..10_000, 2..32)) {
            let children: Vec<ChildNode> = seqs.iter().map(|s| child("lock-", *s)).collect();
            let sorted: Vec<u64> = seqs.iter().copied().collect();
            for pair in sorted.windows(2) {
                match lock_position(&children, "lock-", Sequence::new(pair[1])) {
                    LockPosition::Waiting { predecessor } => {
                        prop_assert_eq!(predecessor.sequence, Some(Sequence::new(pair[0])));
                    }
                    other => prop_assert!(false, "expected Waiting, got {:?}", other),
                }
            }
        }

        #[test]
        fn prop_front_runner_is_minimum(seqs in proptest::collection::btree_set(0u64..10_000, 1..32)) {
            let children: Vec<ChildNode> = seqs.iter().rev().map(|s| child("candidate-", *s)).collect();
            let min = seqs.iter().next().copied();
            prop_assert_eq!(front_runner(&children, "candidate-").and_then(|c| c.sequence).map(|s| s.value()), min);
        }
    }
}
