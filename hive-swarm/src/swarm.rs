//! Swarm facade
//!
//! Wires the five components together around one clock:
//! - Transport events arrive as [`SwarmMessage`]s and are dispatched to the
//!   component that owns them
//! - A maintenance pass runs decay, expiry and topology planning
//! - A snapshot gathers the read-only views for status reporting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use hive_core::{
    NetworkStats, PeerScore, ResourceInfo, SharedClock, SwarmMessage, TopologyGraph,
};

use crate::config::{ConfigError, SwarmConfig};
use crate::monitor::NetworkMonitor;
use crate::reputation::ReputationSystem;
use crate::resources::ResourceManager;
use crate::routing::RoutingManager;
use crate::topology::{TopologyManager, TopologyRecommendation};

/// What happened to an inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    /// The owning component absorbed the event
    Applied,
    /// The event was valid but ignored (e.g. an expired announcement)
    Ignored(String),
    /// Not a swarm event; handed back for another layer to interpret
    Passthrough { kind: String, payload: Vec<u8> },
}

/// Result of one maintenance pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceReport {
    pub decayed_scores: usize,
    pub expired_resources: usize,
    pub topology: TopologyRecommendation,
}

/// Read-only view of the whole layer for status reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmSnapshot {
    pub taken_at: DateTime<Utc>,
    pub scores: Vec<PeerScore>,
    pub network: HashMap<String, NetworkStats>,
    pub connected_peers: Vec<String>,
    pub topology: TopologyGraph,
    pub resources: Vec<ResourceInfo>,
    pub resource_count: usize,
    pub route_count: usize,
}

/// The swarm intelligence layer
#[derive(Debug)]
pub struct Swarm {
    config: SwarmConfig,
    clock: SharedClock,
    reputation: Arc<ReputationSystem>,
    monitor: Arc<NetworkMonitor>,
    routing: Arc<RoutingManager>,
    topology: Arc<TopologyManager>,
    resources: Arc<ResourceManager>,
}

impl Swarm {
    /// Validate the configuration and wire the components
    pub fn new(config: SwarmConfig, clock: SharedClock) -> Result<Self, ConfigError> {
        config.validate()?;

        let reputation = Arc::new(ReputationSystem::new(
            config.reputation.clone(),
            clock.clone(),
        ));
        let monitor = Arc::new(NetworkMonitor::new());
        let routing = Arc::new(RoutingManager::new(
            config.routing.clone(),
            clock.clone(),
            reputation.clone(),
            monitor.clone(),
        ));
        let topology = Arc::new(TopologyManager::new(
            config.topology.clone(),
            clock.clone(),
            reputation.clone(),
            routing.clone(),
        ));
        let resources = Arc::new(ResourceManager::new(
            config.resources.clone(),
            clock.clone(),
            reputation.clone(),
            routing.clone(),
        ));

        info!("Swarm layer initialized");
        Ok(Self {
            config,
            clock,
            reputation,
            monitor,
            routing,
            topology,
            resources,
        })
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn reputation(&self) -> &Arc<ReputationSystem> {
        &self.reputation
    }

    pub fn monitor(&self) -> &Arc<NetworkMonitor> {
        &self.monitor
    }

    pub fn routing(&self) -> &Arc<RoutingManager> {
        &self.routing
    }

    pub fn topology(&self) -> &Arc<TopologyManager> {
        &self.topology
    }

    pub fn resources(&self) -> &Arc<ResourceManager> {
        &self.resources
    }

    /// Dispatch a transport event to the component that owns it
    pub fn handle_message(&self, message: SwarmMessage) -> MessageOutcome {
        debug!("Handling {} message", message.kind());
        match message {
            SwarmMessage::PeerStatus {
                peer_id,
                connected,
                regions,
                capabilities,
            } => {
                self.topology
                    .update_peer_connection(&peer_id, connected, &regions, &capabilities);
                MessageOutcome::Applied
            }
            SwarmMessage::Interaction {
                peer_id,
                interaction,
                result,
            } => {
                self.reputation
                    .record_interaction(&peer_id, interaction, result);
                MessageOutcome::Applied
            }
            SwarmMessage::NetworkSample {
                peer_id,
                latency_ms,
                bandwidth_mbps,
                packet_loss,
            } => {
                self.monitor
                    .update_network_stats(&peer_id, latency_ms, bandwidth_mbps, packet_loss);
                MessageOutcome::Applied
            }
            SwarmMessage::EdgeSample {
                source,
                target,
                latency_ms,
                bandwidth_mbps,
                quality,
            } => {
                self.topology
                    .update_edge(&source, &target, latency_ms, bandwidth_mbps, quality);
                MessageOutcome::Applied
            }
            SwarmMessage::ResourceAnnouncement(announcement) => {
                let id = announcement.id;
                if self.resources.handle_resource_announcement(announcement) {
                    MessageOutcome::Applied
                } else {
                    MessageOutcome::Ignored(format!("announcement {} expired", id))
                }
            }
            SwarmMessage::Opaque { kind, payload } => {
                MessageOutcome::Passthrough { kind, payload }
            }
        }
    }

    /// Decode and dispatch a raw frame; undecodable frames are passed through
    pub fn handle_frame(&self, frame: &[u8]) -> MessageOutcome {
        match SwarmMessage::decode(frame) {
            Ok(message) => self.handle_message(message),
            Err(e) => {
                warn!("Undecodable frame ({} bytes): {}", frame.len(), e);
                MessageOutcome::Passthrough {
                    kind: "undecodable".to_string(),
                    payload: frame.to_vec(),
                }
            }
        }
    }

    /// One synchronous pass of every periodic task
    pub fn maintain(&self) -> MaintenanceReport {
        MaintenanceReport {
            decayed_scores: self.reputation.decay_scores(),
            expired_resources: self.resources.remove_expired_resources(),
            topology: self.topology.optimize_topology(),
        }
    }

    pub fn snapshot(&self) -> SwarmSnapshot {
        SwarmSnapshot {
            taken_at: self.clock.now(),
            scores: self.reputation.all_scores(),
            network: self.monitor.all_network_stats(),
            connected_peers: self.topology.connected_peers(),
            topology: self.topology.topology(),
            resources: self.resources.all_resources(),
            resource_count: self.resources.resource_count(),
            route_count: self.routing.route_count(),
        }
    }
}
