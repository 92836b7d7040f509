//! Shared fixtures for multi-process integration tests.
//!
//! A [`SimCluster`] is one in-memory store plus any number of independent
//! coordinators, each standing in for a separate process with its own session.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use linden::Coordinator;
use linden::CoordinatorConfig;
use linden::DeterministicNodeStore;
use linden::SessionConfig;

pub type SimCoordinator = Coordinator<DeterministicNodeStore>;

pub struct SimCluster {
    pub store: Arc<DeterministicNodeStore>,
    config: CoordinatorConfig,
}

impl SimCluster {
    pub fn new() -> Self {
        Self::with_config(CoordinatorConfig::default())
    }

    pub fn with_config(config: CoordinatorConfig) -> Self {
        Self {
            store: DeterministicNodeStore::new(),
            config,
        }
    }

    /// Config whose connect retries fail fast.
    pub fn fast_retry_config() -> CoordinatorConfig {
        CoordinatorConfig {
            session: SessionConfig::default().with_retries(1, Duration::from_millis(5)),
            ..Default::default()
        }
    }

    /// A new "process".
    pub fn process(&self) -> Arc<SimCoordinator> {
        Arc::new(SimCoordinator::new(Arc::clone(&self.store), self.config.clone()).unwrap())
    }

    pub fn processes(&self, count: usize) -> Vec<Arc<SimCoordinator>> {
        (0..count).map(|_| self.process()).collect()
    }

    /// Crash a process: its session expires without any cleanup on its side.
    pub async fn crash(&self, process: &SimCoordinator) {
        let session = process.client().session_id().expect("process has no session");
        self.store.expire_session(session).await;
    }

    /// Number of contender nodes currently queued on lock `name`.
    pub async fn lock_queue_len(&self, observer: &SimCoordinator, name: &str) -> usize {
        observer.initialize().await.unwrap();
        let dir = observer.client().namespace().lock(name).unwrap();
        match observer.client().list_children(&dir).await {
            Ok(children) => children.len(),
            Err(err) if err.is_no_node() => 0,
            Err(err) => panic!("listing lock queue failed: {err}"),
        }
    }
}

/// Poll `check` until it returns true or `timeout` elapses.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub const SETTLE: Duration = Duration::from_secs(2);
