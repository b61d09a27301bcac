//! Headless host for the Zero Trust Network simulator.
//!
//! Drives a [`Simulator`] in real time on tokio, the way a render loop would:
//!
//! - `SystemEnv` for wall-clock time and a seeded draw stream
//! - A frame-paced `tokio::time::interval` calling `tick` (missed frames are
//!   skipped, never replayed)
//! - Periodic metrics reports through `tracing`
//! - Optional CBOR snapshot load on startup and save on exit
//!
//! ## Architecture
//!
//! ```text
//! ztns-server
//!   ├─ SystemEnv     (production Environment impl)
//!   ├─ Runner        (frame loop, action logging, reports)
//!   └─ snapshot I/O  (load/save topology files)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod system_env;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

pub use error::ServerError;
pub use system_env::SystemEnv;
use tokio::time::MissedTickBehavior;
use ztns_core::{
    ComponentKind, Environment, Metrics, MetricsSnapshot, SimAction, SimulationConfig, Simulator,
    Topology, TopologySnapshot,
};

/// Highest accepted frame rate.
pub const MAX_FPS: u32 = 240;

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Ticks per second.
    pub fps: u32,
    /// Stop after this long; `None` runs until interrupted.
    pub duration: Option<Duration>,
    /// Time between metrics reports.
    pub report_every: Duration,
    /// Snapshot to start from instead of the demo topology.
    pub load_path: Option<PathBuf>,
    /// Where to save the topology on exit.
    pub save_path: Option<PathBuf>,
    /// Seed for the random draws; `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Engine tunables.
    pub simulation: SimulationConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            duration: None,
            report_every: Duration::from_secs(5),
            load_path: None,
            save_path: None,
            seed: None,
            simulation: SimulationConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Check the runner settings and the engine tunables.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.fps == 0 || self.fps > MAX_FPS {
            return Err(ServerError::Runner(format!(
                "fps must be in 1..={MAX_FPS}, got {}",
                self.fps
            )));
        }
        if self.report_every.is_zero() {
            return Err(ServerError::Runner("report interval must be non-zero".to_string()));
        }
        self.simulation.validate()?;
        Ok(())
    }

    /// Time between two ticks.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.fps.max(1)
    }
}

/// Counters gathered while running.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Ticks performed.
    pub ticks: u64,
    /// Packets spawned automatically.
    pub spawned: u64,
    /// Packets delivered.
    pub delivered: u64,
    /// Packets discarded because an endpoint disappeared.
    pub dropped: u64,
    /// Denied accesses (failures and spawn-time denials).
    pub denied: u64,
    /// Metrics at the end of the run.
    pub metrics: MetricsSnapshot,
}

impl RunSummary {
    fn record(&mut self, action: &SimAction) {
        match action {
            SimAction::PacketSpawned { .. } => self.spawned += 1,
            SimAction::PacketDelivered { .. } => self.delivered += 1,
            SimAction::PacketDropped { .. } => self.dropped += 1,
            SimAction::AccessDenied { .. } => self.denied += 1,
        }
    }
}

/// Real-time host for a simulator.
///
/// # Type Parameters
///
/// - `E`: Environment implementation for time/randomness
pub struct Runner<E: Environment = SystemEnv> {
    sim: Simulator<E>,
    config: RunnerConfig,
    summary: RunSummary,
}

impl Runner<SystemEnv> {
    /// Build a runner over the system clock, seeded from `config.seed`.
    pub fn from_config(config: RunnerConfig) -> Result<Self, ServerError> {
        let env = config.seed.map_or_else(SystemEnv::new, SystemEnv::with_seed);
        Self::with_env(env, config)
    }
}

impl<E: Environment> Runner<E> {
    /// Build a runner, loading the configured snapshot or the demo topology.
    pub fn with_env(env: E, config: RunnerConfig) -> Result<Self, ServerError> {
        config.validate()?;

        let topology = match &config.load_path {
            Some(path) => load_topology(path)?,
            None => demo_topology(),
        };

        let sim = Simulator::new(env, topology, Metrics::new(), config.simulation.clone());
        Ok(Self { sim, config, summary: RunSummary::default() })
    }

    /// Simulator being hosted.
    pub fn simulator(&self) -> &Simulator<E> {
        &self.sim
    }

    /// Runner configuration.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Counters so far; `metrics` is filled in by [`Runner::finish`].
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Start the clock.
    pub fn start(&mut self) {
        self.sim.start();
    }

    /// Perform one tick and log what happened.
    pub fn step(&mut self) -> Vec<SimAction> {
        let actions = self.sim.tick();
        self.summary.ticks += 1;

        for action in &actions {
            self.summary.record(action);
            log_action(action);
        }
        actions
    }

    /// Log the current metrics.
    pub fn report(&self) {
        tracing::info!(
            "tick {} | {} | {} in flight",
            self.summary.ticks,
            self.sim.metrics(),
            self.sim.packets().len()
        );
    }

    /// Tick at the configured frame rate until the duration elapses or the
    /// process is interrupted, then [`finish`](Runner::finish).
    pub async fn run(mut self) -> Result<RunSummary, ServerError> {
        self.start();

        let mut frames = tokio::time::interval(self.config.frame_interval());
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut reports = tokio::time::interval(self.config.report_every);
        reports.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick completes immediately.
        reports.tick().await;

        let deadline = self.config.duration;
        let stop = async move {
            match deadline {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(stop);

        let interrupt = tokio::signal::ctrl_c();
        tokio::pin!(interrupt);

        loop {
            tokio::select! {
                _ = frames.tick() => {
                    self.step();
                }
                _ = reports.tick() => self.report(),
                () = &mut stop => {
                    tracing::info!("Run duration elapsed");
                    break;
                }
                result = &mut interrupt => {
                    match result {
                        Ok(()) => tracing::info!("Interrupted, shutting down"),
                        Err(e) => tracing::warn!("Signal handler failed: {}", e),
                    }
                    break;
                }
            }
        }

        self.finish()
    }

    /// Pause, report, save the topology if asked and return the summary.
    pub fn finish(mut self) -> Result<RunSummary, ServerError> {
        self.sim.pause();
        self.report();

        if let Some(path) = &self.config.save_path {
            save_topology(self.sim.topology(), path)?;
        }

        self.summary.metrics = self.sim.metrics();
        Ok(self.summary)
    }
}

fn log_action(action: &SimAction) {
    match action {
        SimAction::PacketSpawned { packet_id, source, target, kind } => {
            tracing::debug!("Packet {packet_id} ({kind}) {source} -> {target}");
        },
        SimAction::PacketDelivered { packet_id, response_time_ms } => {
            tracing::debug!("Packet {packet_id} delivered in {response_time_ms:.2}ms");
        },
        SimAction::PacketDropped { packet_id } => {
            tracing::debug!("Packet {packet_id} dropped");
        },
        SimAction::AccessDenied { component: Some(id) } => {
            tracing::info!("Access denied at {id}");
        },
        SimAction::AccessDenied { component: None } => {
            tracing::info!("Access denied on spawn");
        },
    }
}

/// Demo Zero Trust layout.
///
/// client → proxy → resource, client → identity provider, proxy → policy
/// engine.
pub fn demo_topology() -> Topology {
    let mut topology = Topology::new();

    let client = topology.add_component(ComponentKind::Client, 100.0, 300.0).id().clone();
    let idp = topology.add_component(ComponentKind::IdentityProvider, 300.0, 100.0).id().clone();
    let proxy = topology.add_component(ComponentKind::Proxy, 300.0, 300.0).id().clone();
    let policy = topology.add_component(ComponentKind::PolicyEngine, 500.0, 100.0).id().clone();
    let resource = topology.add_component(ComponentKind::Resource, 500.0, 300.0).id().clone();

    topology.add_connection(&client, &proxy);
    topology.add_connection(&proxy, &resource);
    topology.add_connection(&client, &idp);
    topology.add_connection(&proxy, &policy);

    topology
}

/// Read and rebuild a topology from a CBOR snapshot file.
pub fn load_topology(path: &Path) -> Result<Topology, ServerError> {
    let bytes = std::fs::read(path)
        .map_err(|source| ServerError::Io { path: path.to_path_buf(), source })?;

    let topology = TopologySnapshot::decode(&bytes)
        .and_then(TopologySnapshot::into_topology)
        .inspect_err(|e| tracing::warn!("Rejected snapshot {}: {}", path.display(), e))?;

    tracing::info!(
        "Loaded {} ({} components, {} connections)",
        path.display(),
        topology.component_count(),
        topology.connection_count()
    );
    Ok(topology)
}

/// Write the topology structure as a CBOR snapshot file.
pub fn save_topology(topology: &Topology, path: &Path) -> Result<(), ServerError> {
    let bytes = TopologySnapshot::capture(topology).encode()?;
    std::fs::write(path, bytes)
        .map_err(|source| ServerError::Io { path: path.to_path_buf(), source })?;

    tracing::info!("Saved topology to {}", path.display());
    Ok(())
}
