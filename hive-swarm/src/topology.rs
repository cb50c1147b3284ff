//! Topology management
//!
//! Tracks which peers are known, which are connected and how well they are
//! linked, and turns that into advisory connect/prune recommendations. Nothing
//! here opens or closes a connection; the transport acts on the advice.

use chrono::Duration;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use hive_core::{
    clamp_non_negative, clamp_unit, EdgeKey, PeerConnection, Position, SharedClock,
    TopologyEdge, TopologyGraph, TopologyNode,
};

use crate::config::TopologyConfig;
use crate::reputation::ReputationSystem;
use crate::routing::RoutingManager;

#[derive(Debug, Default)]
struct TopologyState {
    graph: TopologyGraph,
    connections: HashMap<String, PeerConnection>,
}

/// A connected peer suggested for disconnection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PruneCandidate {
    pub peer_id: String,
    /// Reputation scaled by how recently the peer was seen
    pub score: f64,
    /// Resources currently routed through this peer
    pub routes_served: usize,
}

/// Advisory outcome of [`TopologyManager::optimize_topology`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyRecommendation {
    pub connected: usize,
    pub connect: Vec<String>,
    pub disconnect: Vec<PruneCandidate>,
}

impl TopologyRecommendation {
    pub fn is_empty(&self) -> bool {
        self.connect.is_empty() && self.disconnect.is_empty()
    }
}

/// Connection graph and connection bookkeeping behind a single lock
#[derive(Debug)]
pub struct TopologyManager {
    config: TopologyConfig,
    clock: SharedClock,
    reputation: Arc<ReputationSystem>,
    routing: Arc<RoutingManager>,
    state: RwLock<TopologyState>,
}

impl TopologyManager {
    pub fn new(
        config: TopologyConfig,
        clock: SharedClock,
        reputation: Arc<ReputationSystem>,
        routing: Arc<RoutingManager>,
    ) -> Self {
        Self {
            config,
            clock,
            reputation,
            routing,
            state: RwLock::new(TopologyState::default()),
        }
    }

    /// Record a connect/disconnect event.
    ///
    /// `connection_count` goes up on every call with `connected = true`, even
    /// when the peer was already connected.
    pub fn update_peer_connection(
        &self,
        peer_id: &str,
        connected: bool,
        regions: &[String],
        capabilities: &[String],
    ) {
        let now = self.clock.now();
        let mut state = self.state.write();

        let connection = state
            .connections
            .entry(peer_id.to_string())
            .or_insert_with(|| PeerConnection {
                peer_id: peer_id.to_string(),
                connected: false,
                last_seen: now,
                connection_count: 0,
                regions: Vec::new(),
                capabilities: Vec::new(),
            });
        connection.connected = connected;
        connection.last_seen = now;
        if connected {
            connection.connection_count += 1;
        }
        connection.regions = regions.to_vec();
        connection.capabilities = capabilities.to_vec();

        let node = state
            .graph
            .nodes
            .entry(peer_id.to_string())
            .or_insert_with(|| TopologyNode {
                peer_id: peer_id.to_string(),
                position: Position::default(),
                region: String::new(),
                capabilities: Vec::new(),
                last_updated: now,
            });
        node.region = regions.first().cloned().unwrap_or_default();
        node.capabilities = capabilities.to_vec();
        node.last_updated = now;

        debug!(
            "Peer {} {}",
            peer_id,
            if connected { "connected" } else { "disconnected" }
        );
    }

    /// Forget a peer: its node, its connection record and every edge touching it
    pub fn remove_peer(&self, peer_id: &str) -> bool {
        let mut state = self.state.write();
        let had_node = state.graph.nodes.remove(peer_id).is_some();
        let had_connection = state.connections.remove(peer_id).is_some();
        let edges_before = state.graph.edges.len();
        state.graph.edges.retain(|key, _| !key.touches(peer_id));
        let edges_removed = edges_before - state.graph.edges.len();

        if had_node || had_connection || edges_removed > 0 {
            debug!("Removed peer {} and {} edges", peer_id, edges_removed);
            true
        } else {
            false
        }
    }

    /// Upsert the undirected edge between two peers. Self-loops are ignored.
    pub fn update_edge(
        &self,
        source: &str,
        target: &str,
        latency_ms: f64,
        bandwidth_mbps: f64,
        quality: f64,
    ) {
        if source == target {
            debug!("Ignoring self-loop edge for {}", source);
            return;
        }
        let edge = TopologyEdge {
            latency_ms: clamp_non_negative(latency_ms),
            bandwidth_mbps: clamp_non_negative(bandwidth_mbps),
            quality: clamp_unit(quality),
            last_updated: self.clock.now(),
        };
        self.state
            .write()
            .graph
            .edges
            .insert(EdgeKey::new(source, target), edge);
    }

    /// Currently connected peers, ordered by peer id
    pub fn connected_peers(&self) -> Vec<String> {
        let mut peers: Vec<String> = self
            .state
            .read()
            .connections
            .values()
            .filter(|c| c.connected)
            .map(|c| c.peer_id.clone())
            .collect();
        peers.sort();
        peers
    }

    pub fn peer_connection(&self, peer_id: &str) -> Option<PeerConnection> {
        self.state.read().connections.get(peer_id).cloned()
    }

    /// Deep copy of the graph
    pub fn topology(&self) -> TopologyGraph {
        self.state.read().graph.clone()
    }

    /// Proximity in `[0, 1]` from measured edges, 1.0 when nothing was measured
    fn proximity(&self, graph: &TopologyGraph, peer_id: &str) -> f64 {
        let latencies: Vec<f64> = graph
            .edges_of(peer_id)
            .map(|(_, edge)| edge.latency_ms)
            .collect();
        if latencies.is_empty() {
            return 1.0;
        }
        let mean = latencies.iter().sum::<f64>() / latencies.len() as f64;
        1.0 - (mean / self.config.distance_latency_ceiling_ms).min(1.0)
    }

    /// Best known-but-unconnected peers holding every required capability
    pub fn find_optimal_peers(&self, max_peers: usize, required: &[String]) -> Vec<String> {
        let candidates: Vec<(String, f64)> = {
            let state = self.state.read();
            state
                .graph
                .nodes
                .values()
                .filter(|node| {
                    !state
                        .connections
                        .get(&node.peer_id)
                        .is_some_and(|c| c.connected)
                })
                .filter(|node| node.has_all_capabilities(required))
                .map(|node| {
                    (
                        node.peer_id.clone(),
                        self.proximity(&state.graph, &node.peer_id),
                    )
                })
                .collect()
        };

        let mut scored: Vec<(String, f64)> = candidates
            .into_iter()
            .map(|(peer_id, proximity)| {
                let score = self.config.reputation_weight
                    * (self.reputation.score(&peer_id) / 100.0)
                    + self.config.distance_weight * proximity;
                (peer_id, score)
            })
            .collect();
        scored.sort_by(|(a, a_score), (b, b_score)| {
            b_score.total_cmp(a_score).then_with(|| a.cmp(b))
        });
        scored.truncate(max_peers);
        scored.into_iter().map(|(peer_id, _)| peer_id).collect()
    }

    fn recency_factor(&self, age: Duration) -> f64 {
        if age < self.config.fresh_window() {
            self.config.fresh_factor
        } else if age < self.config.recent_window() {
            self.config.recent_factor
        } else {
            self.config.stale_factor
        }
    }

    /// Recommend growth below the minimum and pruning above the maximum
    pub fn optimize_topology(&self) -> TopologyRecommendation {
        let now = self.clock.now();
        let connected: Vec<(String, Duration)> = self
            .state
            .read()
            .connections
            .values()
            .filter(|c| c.connected)
            .map(|c| (c.peer_id.clone(), now - c.last_seen))
            .collect();
        let count = connected.len();
        let mut recommendation = TopologyRecommendation {
            connected: count,
            ..Default::default()
        };

        if count < self.config.min_peers {
            recommendation.connect = self.find_optimal_peers(self.config.min_peers - count, &[]);
            info!(
                "Topology below minimum ({} < {}), recommending {} new peers",
                count,
                self.config.min_peers,
                recommendation.connect.len()
            );
        } else if count > self.config.max_peers {
            let mut ranked: Vec<(String, f64)> = connected
                .into_iter()
                .map(|(peer_id, age)| {
                    let score = self.reputation.score(&peer_id) * self.recency_factor(age);
                    (peer_id, score)
                })
                .collect();
            ranked.sort_by(|(a, a_score), (b, b_score)| {
                a_score.total_cmp(b_score).then_with(|| a.cmp(b))
            });
            ranked.truncate(count.saturating_sub(self.config.target_peers));

            recommendation.disconnect = ranked
                .into_iter()
                .map(|(peer_id, score)| PruneCandidate {
                    routes_served: self.routing.peer_route_count(&peer_id),
                    peer_id,
                    score,
                })
                .collect();
            info!(
                "Topology above maximum ({} > {}), recommending {} disconnections",
                count,
                self.config.max_peers,
                recommendation.disconnect.len()
            );
        }

        recommendation
    }
}
