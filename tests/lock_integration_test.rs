//! Distributed lock behavior across simulated processes.
//!
//! Each process is an independent `Coordinator` with its own session on one
//! shared `DeterministicNodeStore`.

mod support;

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use linden::CoordinationError;
use linden::ErrorKind;
use support::SETTLE;
use support::SimCluster;
use support::eventually;

#[tokio::test]
async fn test_mutual_exclusion_across_processes() {
    let cluster = SimCluster::new();
    let processes = cluster.processes(6);
    let inside = Arc::new(AtomicUsize::new(0));
    let max_inside = Arc::new(AtomicUsize::new(0));

    let mut tasks = Vec::new();
    for process in &processes {
        let process = Arc::clone(process);
        let inside = Arc::clone(&inside);
        let max_inside = Arc::clone(&max_inside);
        tasks.push(tokio::spawn(async move {
            process.acquire_lock("ledger", Some(Duration::from_secs(10))).await.unwrap();
            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
            max_inside.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            inside.fetch_sub(1, Ordering::SeqCst);
            assert!(process.release_lock("ledger").await);
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    assert_eq!(cluster.lock_queue_len(&processes[0], "ledger").await, 0);
}

#[tokio::test]
async fn test_export_job_scenario() {
    let cluster = SimCluster::new();
    let first = cluster.process();
    let second = cluster.process();

    let held = first.acquire_lock("export-job", Some(Duration::from_secs(5))).await.unwrap();
    assert!(held.waited < Duration::from_millis(500));

    let waiter = {
        let second = Arc::clone(&second);
        tokio::spawn(async move { second.acquire_lock("export-job", Some(Duration::from_secs(5))).await })
    };
    assert!(eventually(SETTLE, || async { cluster.lock_queue_len(&first, "export-job").await == 2 }).await);
    assert!(!second.is_locked("export-job").await);

    assert!(first.release_lock("export-job").await);
    let granted = tokio::time::timeout(SETTLE, waiter).await.unwrap().unwrap().unwrap();
    assert!(granted.sequence > held.sequence);
    assert!(second.is_locked("export-job").await);
    assert!(!first.is_locked("export-job").await);
}

#[tokio::test]
async fn test_release_wakes_only_the_next_waiter() {
    let cluster = SimCluster::new();
    let holder = cluster.process();
    let waiters = cluster.processes(3);
    holder.acquire_lock("compaction", None).await.unwrap();

    let mut tasks = Vec::new();
    for (idx, waiter) in waiters.iter().enumerate() {
        let waiter = Arc::clone(waiter);
        tasks.push(tokio::spawn(async move { waiter.acquire_lock("compaction", None).await }));
        // Queue the waiters in a known order.
        assert!(eventually(SETTLE, || async { cluster.lock_queue_len(&holder, "compaction").await == idx + 2 }).await);
    }

    let dir = holder.client().namespace().lock("compaction").unwrap();
    let all_watching = eventually(SETTLE, || async {
        let children = holder.client().list_children(&dir).await.unwrap();
        let mut watches = 0;
        for child in &children {
            watches += cluster.store.pending_watch_count(&format!("{dir}/{}", child.name)).await;
        }
        watches == 3
    })
    .await;
    assert!(all_watching, "every waiter should watch exactly its predecessor");

    let fired_before = cluster.store.fired_watch_count().await;
    assert!(holder.release_lock("compaction").await);
    assert!(eventually(SETTLE, || async { waiters[0].is_locked("compaction").await }).await);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(cluster.store.fired_watch_count().await - fired_before, 1);
    assert!(!waiters[1].is_locked("compaction").await);
    assert!(!waiters[2].is_locked("compaction").await);

    // Drain the rest of the queue in order.
    assert!(waiters[0].release_lock("compaction").await);
    assert!(eventually(SETTLE, || async { waiters[1].is_locked("compaction").await }).await);
    assert!(waiters[1].release_lock("compaction").await);
    assert!(eventually(SETTLE, || async { waiters[2].is_locked("compaction").await }).await);
    for task in tasks {
        task.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn test_holder_crash_releases_lock() {
    let cluster = SimCluster::new();
    let holder = cluster.process();
    let waiter = cluster.process();

    holder.acquire_lock("rebalance", None).await.unwrap();
    let pending = {
        let waiter = Arc::clone(&waiter);
        tokio::spawn(async move { waiter.acquire_lock("rebalance", Some(Duration::from_secs(5))).await })
    };
    assert!(eventually(SETTLE, || async { cluster.lock_queue_len(&waiter, "rebalance").await == 2 }).await);

    cluster.crash(&holder).await;

    tokio::time::timeout(SETTLE, pending).await.unwrap().unwrap().unwrap();
    assert!(waiter.is_locked("rebalance").await);
}

#[tokio::test]
async fn test_timeout_leaves_no_phantom_contender() {
    let cluster = SimCluster::new();
    let holder = cluster.process();
    let impatient = cluster.process();
    let patient = cluster.process();

    holder.acquire_lock("reindex", None).await.unwrap();
    let err = impatient.acquire_lock("reindex", Some(Duration::from_millis(50))).await.unwrap_err();
    assert!(matches!(err, CoordinationError::LockTimeout { .. }));
    assert_eq!(err.kind(), ErrorKind::LockTimeout);
    assert_eq!(cluster.lock_queue_len(&holder, "reindex").await, 1);

    // The next contender queues directly behind the holder.
    let pending = {
        let patient = Arc::clone(&patient);
        tokio::spawn(async move { patient.acquire_lock("reindex", Some(Duration::from_secs(5))).await })
    };
    assert!(eventually(SETTLE, || async { cluster.lock_queue_len(&holder, "reindex").await == 2 }).await);
    holder.release_lock("reindex").await;
    tokio::time::timeout(SETTLE, pending).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_aborted_acquire_cleans_up() {
    let cluster = SimCluster::new();
    let holder = cluster.process();
    let quitter = cluster.process();

    holder.acquire_lock("snapshot", None).await.unwrap();
    let pending = {
        let quitter = Arc::clone(&quitter);
        tokio::spawn(async move { quitter.acquire_lock("snapshot", Some(Duration::from_secs(30))).await })
    };
    assert!(eventually(SETTLE, || async { cluster.lock_queue_len(&holder, "snapshot").await == 2 }).await);

    pending.abort();
    assert!(pending.await.unwrap_err().is_cancelled());
    assert!(eventually(SETTLE, || async { cluster.lock_queue_len(&holder, "snapshot").await == 1 }).await);
}

#[tokio::test]
async fn test_unrelated_names_do_not_serialize() {
    let cluster = SimCluster::new();
    let a = cluster.process();
    let b = cluster.process();

    a.acquire_lock("alpha", None).await.unwrap();
    let held = tokio::time::timeout(Duration::from_millis(500), b.acquire_lock("beta", None))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(held.name, "beta");
    assert_eq!(a.held_locks().await, vec!["alpha".to_string()]);
    assert_eq!(b.held_locks().await, vec!["beta".to_string()]);
}

#[tokio::test]
async fn test_release_is_idempotent() {
    let cluster = SimCluster::new();
    let process = cluster.process();

    process.acquire_lock("nightly", None).await.unwrap();
    assert!(process.release_lock("nightly").await);
    assert!(!process.release_lock("nightly").await);
    assert!(!process.is_locked("nightly").await);
    assert_eq!(cluster.lock_queue_len(&process, "nightly").await, 0);
}

#[tokio::test]
async fn test_handover_survives_brief_outage() {
    let cluster = SimCluster::new();
    let holder = cluster.process();
    let waiter = cluster.process();
    let latecomer = cluster.process();

    holder.acquire_lock("settlement", None).await.unwrap();
    let pending = {
        let waiter = Arc::clone(&waiter);
        tokio::spawn(async move { waiter.acquire_lock("settlement", Some(Duration::from_secs(5))).await })
    };
    assert!(eventually(SETTLE, || async { cluster.lock_queue_len(&holder, "settlement").await == 2 }).await);

    // The waiter wakes on the release while the store is unreachable.
    assert!(holder.release_lock("settlement").await);
    cluster.store.set_available(false).await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    cluster.store.set_available(true).await;

    tokio::time::timeout(SETTLE, pending).await.unwrap().unwrap().unwrap();
    assert!(waiter.is_locked("settlement").await);
    assert_eq!(cluster.lock_queue_len(&holder, "settlement").await, 1);

    assert!(waiter.release_lock("settlement").await);
    tokio::time::timeout(Duration::from_millis(500), latecomer.acquire_lock("settlement", None))
        .await
        .unwrap()
        .unwrap();
    assert!(latecomer.release_lock("settlement").await);
    assert_eq!(cluster.lock_queue_len(&holder, "settlement").await, 0);
}

#[tokio::test]
async fn test_timeout_during_outage_leaves_no_contender() {
    let cluster = SimCluster::new();
    let holder = cluster.process();
    let impatient = cluster.process();

    holder.acquire_lock("archive", None).await.unwrap();
    let pending = {
        let impatient = Arc::clone(&impatient);
        tokio::spawn(async move { impatient.acquire_lock("archive", Some(Duration::from_millis(100))).await })
    };
    assert!(eventually(SETTLE, || async { cluster.lock_queue_len(&holder, "archive").await == 2 }).await);

    cluster.store.set_available(false).await;
    tokio::time::sleep(Duration::from_millis(250)).await;
    cluster.store.set_available(true).await;

    let err = tokio::time::timeout(SETTLE, pending).await.unwrap().unwrap().unwrap_err();
    assert!(matches!(err, CoordinationError::LockTimeout { .. }));
    assert!(eventually(SETTLE, || async { cluster.lock_queue_len(&holder, "archive").await == 1 }).await);
    assert!(holder.is_locked("archive").await);
}
