//! Hive CLI
//!
//! Drive the swarm intelligence layer without a transport: run a seeded
//! simulation, replay recorded events, or print the effective configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::Duration;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use hive_core::{
    Clock, InteractionResult, InteractionType, ManualClock, ResourceAnnouncement, ResourceInfo,
    SwarmMessage, SystemClock,
};
use hive_swarm::{run_maintenance, MessageOutcome, Swarm, SwarmConfig};

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

const REGIONS: [&str; 3] = ["eu-west", "us-east", "ap-south"];
const CAPABILITIES: [&str; 3] = ["gpu", "storage", "relay"];
const RESOURCE_TYPES: [&str; 3] = ["wasm", "controller", "patch"];

#[derive(Parser)]
#[command(name = "hive")]
#[command(author, version, about = "Hive: swarm intelligence for a decentralized agent platform", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,

    /// TOML configuration file (or set HIVE_CONFIG env var)
    #[arg(short, long, env = "HIVE_CONFIG", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a seeded synthetic swarm on a simulated clock
    Simulate {
        /// Number of synthetic peers
        #[arg(long, default_value = "24")]
        peers: usize,

        /// Number of announced resources
        #[arg(long, default_value = "6")]
        resources: usize,

        /// Simulation rounds; each round ends with a maintenance pass
        #[arg(long, default_value = "8")]
        rounds: usize,

        /// Simulated hours between rounds
        #[arg(long, default_value = "6")]
        hours_per_round: i64,

        /// RNG seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Feed a JSON-lines event file through the swarm and print a snapshot
    Replay {
        /// One encoded swarm message per line
        #[arg(short, long)]
        events: PathBuf,

        /// Run background maintenance for this many milliseconds after replay
        #[arg(long, default_value = "0")]
        maintain_for_ms: u64,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate {
            peers,
            resources,
            rounds,
            hours_per_round,
            seed,
        } => {
            simulate(config, peers, resources, rounds, hours_per_round, seed)?;
        }
        Commands::Replay {
            events,
            maintain_for_ms,
        } => {
            replay(config, &events, maintain_for_ms).await?;
        }
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SwarmConfig> {
    match path {
        Some(path) => {
            info!("Loading config from {}", path.display());
            SwarmConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))
        }
        None => Ok(SwarmConfig::from_toml_str(DEFAULT_CONFIG)?),
    }
}

/// Per-peer behaviour of the synthetic swarm
struct SimPeer {
    id: String,
    reliability: f64,
    latency_ms: f64,
    bandwidth_mbps: f64,
    region: &'static str,
    capabilities: Vec<String>,
}

impl SimPeer {
    fn generate(index: usize, rng: &mut StdRng) -> Self {
        let capabilities = CAPABILITIES
            .iter()
            .filter(|_| rng.gen_bool(0.4))
            .map(|c| c.to_string())
            .collect();
        Self {
            id: format!("peer-{:02}", index),
            reliability: rng.gen_range(0.3..0.98),
            latency_ms: rng.gen_range(5.0..400.0),
            bandwidth_mbps: rng.gen_range(1.0..500.0),
            region: REGIONS[index % REGIONS.len()],
            capabilities,
        }
    }

    fn outcome(&self, rng: &mut StdRng) -> InteractionResult {
        if rng.gen_bool(self.reliability) {
            InteractionResult::Success
        } else if rng.gen_bool(0.5) {
            InteractionResult::Timeout
        } else {
            InteractionResult::Failure
        }
    }
}

fn simulate(
    config: SwarmConfig,
    peer_count: usize,
    resource_count: usize,
    rounds: usize,
    hours_per_round: i64,
    seed: u64,
) -> Result<()> {
    println!("🐝 Hive swarm simulation\n");
    println!(
        "Peers: {} | Resources: {} | Rounds: {} | Step: {}h | Seed: {}\n",
        peer_count, resource_count, rounds, hours_per_round, seed
    );

    let mut rng = StdRng::seed_from_u64(seed);
    let clock = ManualClock::starting_now();
    let ttl = config.resources.ttl();
    let swarm = Swarm::new(config, clock.clone())?;

    let peers: Vec<SimPeer> = (0..peer_count)
        .map(|i| SimPeer::generate(i, &mut rng))
        .collect();

    // Announce resources from random owners through the wire codec
    let mut resource_ids = Vec::with_capacity(resource_count);
    for i in 0..resource_count {
        let resource_type = RESOURCE_TYPES[i % RESOURCE_TYPES.len()];
        let id = format!("res-{:02}", i);
        let resource = ResourceInfo::new(&id, &format!("module-{}", i), resource_type, "1.0.0")
            .with_tags(&[resource_type, REGIONS[i % REGIONS.len()]])
            .with_content(id.as_bytes());
        let owners = peers.choose_multiple(&mut rng, peers.len().min(3));
        for owner in owners {
            let mut announcement = ResourceAnnouncement::new(&owner.id, resource.clone(), ttl);
            announcement.expires_at = clock.now() + ttl;
            let frame = SwarmMessage::ResourceAnnouncement(announcement).encode()?;
            if let MessageOutcome::Ignored(reason) = swarm.handle_frame(&frame) {
                warn!("Announcement ignored: {}", reason);
            }
        }
        resource_ids.push(id);
    }

    for round in 1..=rounds {
        for peer in &peers {
            let connected = rng.gen_bool(0.6);
            swarm.handle_message(SwarmMessage::PeerStatus {
                peer_id: peer.id.clone(),
                connected,
                regions: vec![peer.region.to_string()],
                capabilities: peer.capabilities.clone(),
            });

            for _ in 0..rng.gen_range(1..4) {
                let interaction = *InteractionType::ALL
                    .choose(&mut rng)
                    .unwrap_or(&InteractionType::NetworkConnection);
                swarm.handle_message(SwarmMessage::Interaction {
                    peer_id: peer.id.clone(),
                    interaction,
                    result: peer.outcome(&mut rng),
                });
            }

            let jitter = rng.gen_range(0.8..1.2);
            swarm.handle_message(SwarmMessage::NetworkSample {
                peer_id: peer.id.clone(),
                latency_ms: peer.latency_ms * jitter,
                bandwidth_mbps: peer.bandwidth_mbps / jitter,
                packet_loss: (1.0 - peer.reliability) * 10.0,
            });
        }

        for _ in 0..peers.len() {
            let pair: Vec<&SimPeer> = peers.choose_multiple(&mut rng, 2).collect();
            if let [a, b] = pair.as_slice() {
                swarm.handle_message(SwarmMessage::EdgeSample {
                    source: a.id.clone(),
                    target: b.id.clone(),
                    latency_ms: (a.latency_ms + b.latency_ms) / 2.0,
                    bandwidth_mbps: a.bandwidth_mbps.min(b.bandwidth_mbps),
                    quality: a.reliability * b.reliability,
                });
            }
        }

        clock.advance(Duration::hours(hours_per_round));
        let report = swarm.maintain();
        println!(
            "Round {:>2}: decayed {:>2} | expired {:>2} | connected {:>2} | connect {:?} | disconnect {:?}",
            round,
            report.decayed_scores,
            report.expired_resources,
            report.topology.connected,
            report.topology.connect,
            report
                .topology
                .disconnect
                .iter()
                .map(|c| c.peer_id.as_str())
                .collect::<Vec<_>>(),
        );
    }

    println!("\n📊 Best routes:");
    for id in &resource_ids {
        match swarm.routing().best_route(id) {
            Some(route) => println!(
                "   {} via {} (reputation {:.1})",
                id,
                route.peer_id,
                swarm.reputation().score(&route.peer_id)
            ),
            None => println!("   {} has no route", id),
        }
    }

    println!("\n🛡️  Trusted peers (>= 60):");
    for peer in swarm.reputation().trusted_peers(60.0) {
        let record = swarm.reputation().peer_score(&peer);
        println!(
            "   {} {:.1} ({} interactions, {:.0}% success)",
            peer,
            record.score,
            record.interaction_count,
            record.success_ratio().unwrap_or(0.0) * 100.0
        );
    }

    let gpu = swarm
        .topology()
        .find_optimal_peers(5, &["gpu".to_string()]);
    println!("\n⚡ Best unconnected GPU peers: {:?}", gpu);

    Ok(())
}

async fn replay(config: SwarmConfig, events: &Path, maintain_for_ms: u64) -> Result<()> {
    let content = fs::read_to_string(events)
        .with_context(|| format!("failed to read events from {}", events.display()))?;
    let swarm = Arc::new(Swarm::new(config, SystemClock::shared())?);

    let mut applied = 0usize;
    let mut skipped = 0usize;
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match swarm.handle_frame(line.as_bytes()) {
            MessageOutcome::Applied => applied += 1,
            MessageOutcome::Ignored(reason) => {
                warn!("Line {}: {}", line_no + 1, reason);
                skipped += 1;
            }
            MessageOutcome::Passthrough { kind, payload } => {
                info!("Line {}: passing through {} ({} bytes)", line_no + 1, kind, payload.len());
                skipped += 1;
            }
        }
    }
    info!("Replayed {} events ({} not applied)", applied, skipped);

    if maintain_for_ms > 0 {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_maintenance(swarm.clone(), shutdown_rx));
        tokio::time::sleep(StdDuration::from_millis(maintain_for_ms)).await;
        shutdown_tx.send(true)?;
        let totals = handle.await?;
        info!(
            "Maintenance ran {} decay, {} expiry and {} topology passes",
            totals.decay_passes, totals.expiry_passes, totals.topology_passes
        );
    }

    println!("{}", serde_json::to_string_pretty(&swarm.snapshot())?);
    Ok(())
}
