//! Leader election over ephemeral-sequential candidate nodes.
//!
//! Each participant creates `elections/<name>/candidate-NNNNNNNNNN`; the
//! lowest surviving sequence is the leader. Unlike the lock, every candidate
//! watches the whole election directory and re-evaluates on any membership
//! change. Elections have few participants, so the O(n) fan-out is accepted.
//!
//! Transitions are delivered through an [`ElectionHandle`]:
//!
//! - [`ElectionHandle::subscribe`] exposes the current [`ElectionState`]
//! - [`ElectionHandle::next_event`] yields [`LeadershipEvent`]s, which fire
//!   only on leadership edges
//!
//! A candidacy never survives its session. On session loss it moves to
//! `Withdrawn` (emitting `Demoted` if it was leading) and the caller must
//! participate again after reconnecting.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use linden_constants::coordination::DEFAULT_LEADERSHIP_TIMEOUT_MS;
use linden_constants::coordination::MAX_LEADERSHIP_TIMEOUT_MS;
use linden_constants::namespace::CANDIDATE_PREFIX;
use linden_constants::session::TRANSIENT_RETRY_DELAY_MS;
use linden_node_types::ChildNode;
use linden_node_types::CreateMode;
use linden_node_types::Sequence;
use linden_node_types::path;
use linden_store::NodeStore;
use linden_store::StoreClient;
use snafu::ResultExt;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::error::CoordinationError;
use crate::error::InvalidNameSnafu;
use crate::error::missing_sequence;
use crate::guard::PendingNode;
use crate::pure::compute_next_election_state;
use crate::pure::compute_withdraw_event;
use crate::pure::front_runner;
use crate::pure::is_front;
use crate::types::ParticipantInfo;

/// Configuration for leader election.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionConfig {
    /// Bound used by [`ElectionHandle::wait_until_leader`].
    pub leadership_timeout: Duration,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            leadership_timeout: Duration::from_millis(DEFAULT_LEADERSHIP_TIMEOUT_MS),
        }
    }
}

/// State of one candidacy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElectionState {
    #[default]
    NotParticipating,
    /// Node created, not yet evaluated.
    Candidate,
    Leader,
    Follower,
    /// Candidacy ended, voluntarily or by session loss.
    Withdrawn,
}

impl ElectionState {
    /// Returns true if currently the leader.
    pub fn is_leader(&self) -> bool {
        matches!(self, ElectionState::Leader)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ElectionState::NotParticipating => "not_participating",
            ElectionState::Candidate => "candidate",
            ElectionState::Leader => "leader",
            ElectionState::Follower => "follower",
            ElectionState::Withdrawn => "withdrawn",
        }
    }
}

impl fmt::Display for ElectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leadership edge notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeadershipEvent {
    /// This candidate became leader.
    Elected,
    /// This candidate stopped being leader.
    Demoted,
}

/// The candidate currently in front of an election.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderInfo {
    /// Path of the leader's candidate node.
    pub node_path: String,
    /// Its sequence.
    pub sequence: Sequence,
    /// Identity injected at participation, if the payload carries it.
    pub participant: Option<ParticipantInfo>,
}

/// Shared between the component, its watch task and nothing else.
struct Candidacy {
    node_path: String,
    sequence: Sequence,
    state: watch::Sender<ElectionState>,
    events: mpsc::UnboundedSender<LeadershipEvent>,
    cancel: CancellationToken,
}

impl Candidacy {
    /// Apply an evaluation result atomically with respect to `end`.
    fn apply(&self, name: &str, front: bool) {
        self.state.send_if_modified(|state| {
            let (next, event) = compute_next_election_state(*state, front);
            if let Some(event) = event {
                match event {
                    LeadershipEvent::Elected => {
                        info!(election = %name, sequence = self.sequence.value(), "acquired leadership")
                    }
                    LeadershipEvent::Demoted => {
                        info!(election = %name, sequence = self.sequence.value(), "lost leadership")
                    }
                }
                let _ = self.events.send(event);
            }
            if next == *state {
                return false;
            }
            *state = next;
            true
        });
    }

    /// Move to `Withdrawn`, emitting `Demoted` if leading.
    fn end(&self, name: &str) {
        self.cancel.cancel();
        self.state.send_if_modified(|state| {
            if *state == ElectionState::Withdrawn {
                return false;
            }
            if let Some(event) = compute_withdraw_event(*state) {
                info!(election = %name, sequence = self.sequence.value(), "lost leadership");
                let _ = self.events.send(event);
            }
            *state = ElectionState::Withdrawn;
            true
        });
    }
}

type Candidacies = Arc<Mutex<HashMap<String, Arc<Candidacy>>>>;

/// Leader election participant for one store session.
///
/// # Example
///
/// ```ignore
/// let election = LeaderElection::new(client, ElectionConfig::default());
/// let mut handle = election.participate("primary-writer").await?;
/// while let Some(event) = handle.next_event().await {
///     match event {
///         LeadershipEvent::Elected => start_writing(),
///         LeadershipEvent::Demoted => stop_writing(),
///     }
/// }
/// ```
pub struct LeaderElection<S: NodeStore + ?Sized + 'static> {
    client: Arc<StoreClient<S>>,
    config: ElectionConfig,
    candidacies: Candidacies,
}

impl<S: NodeStore + ?Sized + 'static> LeaderElection<S> {
    /// Create an election participant sharing `client`'s session.
    pub fn new(client: Arc<StoreClient<S>>, config: ElectionConfig) -> Self {
        Self {
            client,
            config,
            candidacies: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The election configuration.
    pub fn config(&self) -> &ElectionConfig {
        &self.config
    }

    /// Enter the election `name`.
    ///
    /// Creates a candidate node, evaluates once before returning, then keeps
    /// re-evaluating in a background task until withdrawn or the session
    /// ends.
    pub async fn participate(&self, name: &str) -> Result<ElectionHandle, CoordinationError> {
        let dir = self.client.namespace().election(name).context(InvalidNameSnafu { name })?;
        if self.candidacies.lock().await.contains_key(name) {
            return Err(CoordinationError::AlreadyParticipating { name: name.to_string() });
        }
        self.client.ensure_path(&dir).await?;

        let payload = ParticipantInfo::current().to_payload()?;
        let created = self
            .client
            .create_node(&path::join(&dir, CANDIDATE_PREFIX), &payload, CreateMode::EphemeralSequential)
            .await?;
        let sequence = created.sequence.ok_or_else(|| missing_sequence(&created.path))?;
        let pending = PendingNode::new(Arc::clone(&self.client), created.path.clone());

        let (state_tx, state_rx) = watch::channel(ElectionState::Candidate);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let candidacy = Arc::new(Candidacy {
            node_path: created.path.clone(),
            sequence,
            state: state_tx,
            events: events_tx,
            cancel: CancellationToken::new(),
        });
        debug!(election = %name, sequence = sequence.value(), "entered election");

        let children = self.client.list_children(&dir).await?;
        match is_front(&children, CANDIDATE_PREFIX, sequence) {
            Some(front) => candidacy.apply(name, front),
            None => {
                pending.disarm();
                return Err(CoordinationError::SessionLost { name: name.to_string() });
            }
        }

        {
            let mut candidacies = self.candidacies.lock().await;
            if candidacies.contains_key(name) {
                drop(candidacies);
                pending.delete_now().await;
                return Err(CoordinationError::AlreadyParticipating { name: name.to_string() });
            }
            candidacies.insert(name.to_string(), Arc::clone(&candidacy));
        }
        pending.disarm();

        tokio::spawn(watch_loop(
            Arc::clone(&self.client),
            Arc::clone(&self.candidacies),
            name.to_string(),
            dir,
            Arc::clone(&candidacy),
        ));

        Ok(ElectionHandle {
            name: name.to_string(),
            node_path: created.path,
            sequence,
            leadership_timeout: self.config.leadership_timeout,
            state_rx,
            events_rx,
        })
    }

    /// Leave the election `name`. Returns `false` if not participating.
    pub async fn withdraw(&self, name: &str) -> bool {
        let Some(candidacy) = self.candidacies.lock().await.remove(name) else {
            debug!(election = %name, "withdraw without active candidacy");
            return false;
        };
        candidacy.end(name);
        if let Err(err) = self.client.remove_owned_node(&candidacy.node_path).await {
            warn!(election = %name, error = %err, "failed to delete candidate node");
        }
        info!(election = %name, sequence = candidacy.sequence.value(), "withdrew from election");
        true
    }

    /// Withdraw from every active election.
    pub async fn withdraw_all(&self) {
        let names: Vec<String> = self.candidacies.lock().await.keys().cloned().collect();
        for name in names {
            self.withdraw(&name).await;
        }
    }

    /// Names of every election this process participates in, sorted.
    pub async fn active_elections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.candidacies.lock().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Local view of the candidacy state for `name`.
    pub async fn state(&self, name: &str) -> ElectionState {
        match self.candidacies.lock().await.get(name) {
            Some(candidacy) => *candidacy.state.borrow(),
            None => ElectionState::NotParticipating,
        }
    }

    /// The candidate currently in front of `name`, read from the store.
    pub async fn current_leader(&self, name: &str) -> Result<Option<LeaderInfo>, CoordinationError> {
        let dir = self.client.namespace().election(name).context(InvalidNameSnafu { name })?;
        let mut children = match self.client.list_children(&dir).await {
            Ok(children) => children,
            Err(err) if err.is_no_node() => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        // The front runner may vanish between listing and reading.
        while let Some(front) = front_runner(&children, CANDIDATE_PREFIX).cloned() {
            let node_path = path::join(&dir, &front.name);
            match self.client.get_node(&node_path).await {
                Ok(node) => {
                    return Ok(front.sequence.map(|sequence| LeaderInfo {
                        node_path,
                        sequence,
                        participant: ParticipantInfo::from_payload(&node.payload),
                    }));
                }
                Err(err) if err.is_no_node() => children.retain(|child| child.name != front.name),
                Err(err) => return Err(err.into()),
            }
        }
        Ok(None)
    }
}

/// Re-evaluate on every membership change until cancelled or the session ends.
///
/// Connection loss with the session still live is retried. Any other
/// failure ends the candidacy, removing its node first unless the session
/// took the node with it.
async fn watch_loop<S: NodeStore + ?Sized + 'static>(
    client: Arc<StoreClient<S>>,
    candidacies: Candidacies,
    name: String,
    dir: String,
    candidacy: Arc<Candidacy>,
) {
    loop {
        if candidacy.cancel.is_cancelled() {
            return;
        }
        let (children, watch) = match client.watch_children(&dir).await {
            Ok(result) => result,
            Err(err) if err.is_connection_loss() => {
                debug!(election = %name, error = %err, "store unreachable, retrying election watch");
                tokio::select! {
                    _ = candidacy.cancel.cancelled() => return,
                    _ = tokio::time::sleep(Duration::from_millis(TRANSIENT_RETRY_DELAY_MS)) => continue,
                }
            }
            Err(err) if err.needs_reconnect() => {
                warn!(election = %name, error = %err, "session ended during election");
                break;
            }
            Err(err) => {
                warn!(election = %name, error = %err, "election watch failed");
                if let Err(err) = client.remove_owned_node(&candidacy.node_path).await {
                    warn!(election = %name, error = %err, "failed to delete candidate node");
                }
                break;
            }
        };
        if !evaluate(&candidacy, &name, &children) {
            break;
        }

        tokio::select! {
            _ = candidacy.cancel.cancelled() => return,
            event = watch.fired() => {
                if event.is_session_event() {
                    warn!(election = %name, kind = event.kind.as_str(), "session ended during election");
                    break;
                }
            }
        }
    }

    candidacy.end(&name);
    let mut map = candidacies.lock().await;
    if map.get(&name).is_some_and(|current| Arc::ptr_eq(current, &candidacy)) {
        map.remove(&name);
    }
}

/// Returns false if the candidate node is gone.
fn evaluate(candidacy: &Candidacy, name: &str, children: &[ChildNode]) -> bool {
    match is_front(children, CANDIDATE_PREFIX, candidacy.sequence) {
        Some(front) => {
            candidacy.apply(name, front);
            true
        }
        None => {
            warn!(election = %name, sequence = candidacy.sequence.value(), "candidate node vanished");
            false
        }
    }
}

/// Handle to one candidacy.
///
/// Dropping the handle does not withdraw; call
/// [`LeaderElection::withdraw`].
#[derive(Debug)]
pub struct ElectionHandle {
    name: String,
    node_path: String,
    sequence: Sequence,
    leadership_timeout: Duration,
    state_rx: watch::Receiver<ElectionState>,
    events_rx: mpsc::UnboundedReceiver<LeadershipEvent>,
}

impl ElectionHandle {
    /// Election name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of this candidate's node.
    pub fn node_path(&self) -> &str {
        &self.node_path
    }

    /// This candidate's position.
    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    /// Current state.
    pub fn state(&self) -> ElectionState {
        *self.state_rx.borrow()
    }

    /// Returns true if currently the leader.
    pub fn is_leader(&self) -> bool {
        self.state().is_leader()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ElectionState> {
        self.state_rx.clone()
    }

    /// Next leadership event. `None` once the candidacy has ended and every
    /// event has been consumed.
    pub async fn next_event(&mut self) -> Option<LeadershipEvent> {
        self.events_rx.recv().await
    }

    /// Next leadership event if one is already queued.
    pub fn try_next_event(&mut self) -> Option<LeadershipEvent> {
        self.events_rx.try_recv().ok()
    }

    /// Wait until this candidate leads, at most `timeout`.
    ///
    /// Fails with [`CoordinationError::ElectionTimeout`] if the bound passes
    /// (the candidacy stays active) or
    /// [`CoordinationError::NotParticipating`] if it ends first.
    pub async fn wait_for_leadership(&self, timeout: Duration) -> Result<(), CoordinationError> {
        let timeout = timeout.min(Duration::from_millis(MAX_LEADERSHIP_TIMEOUT_MS));
        let mut rx = self.state_rx.clone();
        let wait = async {
            loop {
                match *rx.borrow_and_update() {
                    ElectionState::Leader => return Ok(()),
                    ElectionState::Withdrawn => {
                        return Err(CoordinationError::NotParticipating {
                            name: self.name.clone(),
                        });
                    }
                    _ => {}
                }
                if rx.changed().await.is_err() {
                    return Err(CoordinationError::NotParticipating {
                        name: self.name.clone(),
                    });
                }
            }
        };
        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(CoordinationError::ElectionTimeout {
                name: self.name.clone(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// [`wait_for_leadership`](Self::wait_for_leadership) with the configured bound.
    pub async fn wait_until_leader(&self) -> Result<(), CoordinationError> {
        self.wait_for_leadership(self.leadership_timeout).await
    }
}
