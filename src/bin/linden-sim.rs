//! Simulate several coordinating processes against one in-memory store.
//!
//! Every simulated process gets its own [`Coordinator`] and session on a shared
//! [`DeterministicNodeStore`], so the recipes behave exactly as they would
//! across machines, minus the network.
//!
//! ```bash
//! linden-sim lock-race --processes 5 --name export-job
//! linden-sim election --candidates 3 --name primary-writer
//! RUST_LOG=debug linden-sim discovery --instances 4 --service payments
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use linden::Coordinator;
use linden::CoordinatorConfig;
use linden::DeterministicNodeStore;
use linden::LeadershipEvent;
use linden::ServiceInfo;
use linden::config::LindenConfig;
use tokio::task::JoinSet;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "linden-sim")]
struct Args {
    /// Path to TOML configuration file (overrides LINDEN_CONFIG).
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Several processes contend for one lock; each holds it briefly.
    LockRace {
        /// Number of simulated processes.
        #[arg(long, default_value = "3")]
        processes: usize,

        /// Lock name.
        #[arg(long, default_value = "export-job")]
        name: String,

        /// How long each holder keeps the lock, in milliseconds.
        #[arg(long, default_value = "50")]
        hold_ms: u64,
    },

    /// Candidates elect a leader; the leader then crashes and a successor
    /// takes over.
    Election {
        /// Number of candidates.
        #[arg(long, default_value = "3")]
        candidates: usize,

        /// Election name.
        #[arg(long, default_value = "primary-writer")]
        name: String,
    },

    /// Instances register, a watcher follows membership, then instances leave.
    Discovery {
        /// Number of service instances.
        #[arg(long, default_value = "3")]
        instances: u16,

        /// Service name.
        #[arg(long, default_value = "payments")]
        service: String,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}

type SimCoordinator = Coordinator<DeterministicNodeStore>;

fn spawn_processes(store: &Arc<DeterministicNodeStore>, config: &CoordinatorConfig, count: usize) -> Result<Vec<Arc<SimCoordinator>>> {
    (0..count)
        .map(|_| {
            SimCoordinator::new(Arc::clone(store), config.clone())
                .map(Arc::new)
                .context("failed to create coordinator")
        })
        .collect()
}

async fn lock_race(store: Arc<DeterministicNodeStore>, config: CoordinatorConfig, processes: usize, name: String, hold: Duration) -> Result<()> {
    let coordinators = spawn_processes(&store, &config, processes)?;
    let mut tasks = JoinSet::new();

    for (idx, coordinator) in coordinators.into_iter().enumerate() {
        let name = name.clone();
        tasks.spawn(async move {
            let held = coordinator.acquire_lock(&name, None).await?;
            info!(process = idx, sequence = %held.sequence, waited_ms = held.waited.as_millis() as u64, "holding lock");
            tokio::time::sleep(hold).await;
            coordinator.release_lock(&name).await;
            coordinator.shutdown().await;
            anyhow::Ok(idx)
        });
    }

    let mut order = Vec::with_capacity(processes);
    while let Some(joined) = tasks.join_next().await {
        order.push(joined.context("process task panicked")??);
    }
    info!(?order, "every process held the lock exactly once");
    Ok(())
}

async fn election(store: Arc<DeterministicNodeStore>, config: CoordinatorConfig, candidates: usize, name: String) -> Result<()> {
    let coordinators = spawn_processes(&store, &config, candidates)?;
    let mut handles = Vec::with_capacity(candidates);
    for coordinator in &coordinators {
        handles.push(coordinator.participate(&name).await?);
    }

    let leader_idx = handles.iter().position(|h| h.is_leader()).context("no leader after every candidate joined")?;
    let leader = coordinators[leader_idx].current_leader(&name).await?;
    info!(process = leader_idx, leader = ?leader.map(|l| l.node_path), "leader elected");

    let session = coordinators[leader_idx].client().session_id().context("leader has no session")?;
    warn!(process = leader_idx, %session, "expiring leader session");
    store.expire_session(session).await;

    let (successor_idx, successor) = handles
        .iter_mut()
        .enumerate()
        .filter(|(idx, _)| *idx != leader_idx)
        .min_by_key(|(_, h)| h.sequence())
        .context("no surviving candidate")?;
    successor.wait_until_leader().await?;
    while let Some(event) = successor.try_next_event() {
        if event == LeadershipEvent::Elected {
            info!(process = successor_idx, sequence = %successor.sequence(), "took over leadership");
        }
    }

    let current = coordinators[successor_idx].current_leader(&name).await?;
    info!(leader = ?current.map(|l| l.node_path), "leadership after failover");

    for coordinator in &coordinators {
        coordinator.shutdown().await;
    }
    Ok(())
}

async fn discovery(store: Arc<DeterministicNodeStore>, config: CoordinatorConfig, instances: u16, service: String) -> Result<()> {
    let observer = SimCoordinator::new(Arc::clone(&store), config.clone())?;
    let mut watch = observer.watch_service(&service).await?;
    let initial = watch.next().await.unwrap_or_default();
    info!(service = %service, instances = initial.len(), "watching service");

    let members = spawn_processes(&store, &config, usize::from(instances))?;
    for (idx, member) in members.iter().enumerate() {
        let port = 9000u16.saturating_add(idx as u16);
        let info = ServiceInfo::new("127.0.0.1", port).with_metadata("zone", if idx % 2 == 0 { "a" } else { "b" });
        member.register_service(&service, &info).await?;
    }

    while instances > 0 {
        let Some(snapshot) = watch.next().await else { break };
        info!(instances = snapshot.len(), "membership changed");
        if snapshot.len() == usize::from(instances) {
            break;
        }
    }

    if let Some(endpoint) = observer.get_service_endpoint(&service).await? {
        info!(%endpoint, "preferred endpoint");
    }

    for member in &members {
        member.shutdown().await;
    }
    let remaining = observer.discover_services(Some(&service)).await?;
    info!(instances = remaining.len(), "after every instance shut down");

    watch.stop();
    observer.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let mut config = LindenConfig::from_toml_file(path)?;
            config.apply_env_overrides(&linden::config::EnvLookup::process())?;
            config.validate()?;
            config
        }
        None => LindenConfig::load_with_layers()?,
    };
    let runtime = config.coordinator_config();
    let store = DeterministicNodeStore::new();

    match args.command {
        Command::LockRace {
            processes,
            name,
            hold_ms,
        } => lock_race(store, runtime, processes, name, Duration::from_millis(hold_ms)).await,
        Command::Election { candidates, name } => election(store, runtime, candidates, name).await,
        Command::Discovery { instances, service } => discovery(store, runtime, instances, service).await,
    }
}
