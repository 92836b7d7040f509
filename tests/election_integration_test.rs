//! Leader election across simulated processes.

mod support;

use std::time::Duration;

use linden::CoordinationError;
use linden::ElectionHandle;
use linden::ElectionState;
use linden::LeadershipEvent;
use support::SETTLE;
use support::SimCluster;
use support::eventually;

fn drain(handle: &mut ElectionHandle) -> Vec<LeadershipEvent> {
    std::iter::from_fn(|| handle.try_next_event()).collect()
}

fn leaders(handles: &[ElectionHandle]) -> usize {
    handles.iter().filter(|h| h.is_leader()).count()
}

#[tokio::test]
async fn test_exactly_one_leader() {
    let cluster = SimCluster::new();
    let processes = cluster.processes(5);
    let mut handles = Vec::new();
    for process in &processes {
        handles.push(process.participate("scheduler").await.unwrap());
    }

    assert!(eventually(SETTLE, || async { leaders(&handles) == 1 }).await);
    assert!(handles[0].is_leader());
    for handle in &handles[1..] {
        assert_eq!(handle.state(), ElectionState::Follower);
    }

    let leader = processes[3].current_leader("scheduler").await.unwrap().unwrap();
    assert_eq!(leader.node_path, handles[0].node_path());
    assert_eq!(leader.sequence, handles[0].sequence());
}

#[tokio::test]
async fn test_primary_writer_failover() {
    let cluster = SimCluster::new();
    let processes = cluster.processes(3);
    let mut handles = Vec::new();
    for process in &processes {
        handles.push(process.participate("primary-writer").await.unwrap());
    }
    handles[0].wait_for_leadership(SETTLE).await.unwrap();
    assert_eq!(drain(&mut handles[0]), vec![LeadershipEvent::Elected]);

    cluster.crash(&processes[0]).await;

    handles[1].wait_for_leadership(SETTLE).await.unwrap();
    assert!(eventually(SETTLE, || async { handles[0].state() == ElectionState::Withdrawn }).await);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(drain(&mut handles[1]), vec![LeadershipEvent::Elected]);
    assert_eq!(drain(&mut handles[2]), Vec::<LeadershipEvent>::new());
    assert_eq!(drain(&mut handles[0]), vec![LeadershipEvent::Demoted]);
    assert_eq!(handles[2].state(), ElectionState::Follower);
    assert_eq!(leaders(&handles), 1);

    let leader = processes[2].current_leader("primary-writer").await.unwrap().unwrap();
    assert_eq!(leader.node_path, handles[1].node_path());
}

#[tokio::test]
async fn test_withdraw_hands_over_leadership() {
    let cluster = SimCluster::new();
    let first = cluster.process();
    let second = cluster.process();

    let mut leader = first.participate("indexer").await.unwrap();
    let mut follower = second.participate("indexer").await.unwrap();
    assert!(leader.is_leader());

    assert!(first.withdraw("indexer").await);
    follower.wait_for_leadership(SETTLE).await.unwrap();

    assert_eq!(leader.state(), ElectionState::Withdrawn);
    assert_eq!(drain(&mut leader), vec![LeadershipEvent::Elected, LeadershipEvent::Demoted]);
    assert_eq!(drain(&mut follower), vec![LeadershipEvent::Elected]);

    // Withdrawn candidacies cannot wait for leadership anymore.
    let err = leader.wait_for_leadership(Duration::from_millis(10)).await.unwrap_err();
    assert!(matches!(err, CoordinationError::NotParticipating { .. }));
}

#[tokio::test]
async fn test_follower_churn_does_not_notify_leader() {
    let cluster = SimCluster::new();
    let leader_process = cluster.process();
    let mut leader = leader_process.participate("planner").await.unwrap();
    assert_eq!(drain(&mut leader), vec![LeadershipEvent::Elected]);

    for _ in 0..3 {
        let churn = cluster.process();
        churn.participate("planner").await.unwrap();
        churn.shutdown().await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(leader.is_leader());
    assert!(drain(&mut leader).is_empty());
}

#[tokio::test]
async fn test_wait_for_leadership_times_out() {
    let cluster = SimCluster::new();
    let first = cluster.process();
    let second = cluster.process();

    let _leader = first.participate("compactor").await.unwrap();
    let follower = second.participate("compactor").await.unwrap();
    let err = follower.wait_for_leadership(Duration::from_millis(30)).await.unwrap_err();
    assert!(matches!(err, CoordinationError::ElectionTimeout { .. }));
}

#[tokio::test]
async fn test_double_participation_is_rejected() {
    let cluster = SimCluster::new();
    let process = cluster.process();

    let _handle = process.participate("router").await.unwrap();
    let err = process.participate("router").await.unwrap_err();
    assert!(matches!(err, CoordinationError::AlreadyParticipating { .. }));
}

#[tokio::test]
async fn test_withdraw_is_idempotent() {
    let cluster = SimCluster::new();
    let process = cluster.process();
    let observer = cluster.process();

    let handle = process.participate("janitor").await.unwrap();
    assert!(process.withdraw("janitor").await);
    assert!(!process.withdraw("janitor").await);
    assert!(!cluster.store.contains(handle.node_path()).await);
    assert_eq!(observer.current_leader("janitor").await.unwrap(), None);
}

#[tokio::test]
async fn test_current_leader_of_unknown_election() {
    let cluster = SimCluster::new();
    let observer = cluster.process();
    assert_eq!(observer.current_leader("nobody-here").await.unwrap(), None);
}

#[tokio::test]
async fn test_brief_outage_keeps_single_leader() {
    let cluster = SimCluster::new();
    let first = cluster.process();
    let second = cluster.process();
    let observer = cluster.process();

    let leader = first.participate("dispatcher").await.unwrap();
    let mut follower = second.participate("dispatcher").await.unwrap();
    cluster.store.set_available(false).await;
    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    cluster.store.set_available(true).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(leader.state(), ElectionState::Leader);
    assert_eq!(follower.state(), ElectionState::Follower);
    let current = observer.current_leader("dispatcher").await.unwrap().unwrap();
    assert_eq!(current.node_path, leader.node_path());

    assert!(first.withdraw("dispatcher").await);
    follower.wait_for_leadership(SETTLE).await.unwrap();
    assert!(!cluster.store.contains(leader.node_path()).await);
    assert_eq!(drain(&mut follower), vec![LeadershipEvent::Elected]);
}
