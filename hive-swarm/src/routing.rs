//! Adaptive routing
//!
//! Keeps candidate routes per resource and ranks them by a composite of the
//! peer's reputation, its last measured link quality and the route's own cost
//! and success history.

use parking_lot::RwLock;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use hive_core::{Route, SharedClock};

use crate::config::RoutingConfig;
use crate::monitor::NetworkMonitor;
use crate::reputation::ReputationSystem;

/// Routing table: resource id -> at most one route per peer
#[derive(Debug)]
pub struct RoutingManager {
    config: RoutingConfig,
    clock: SharedClock,
    reputation: Arc<ReputationSystem>,
    monitor: Arc<NetworkMonitor>,
    routes: RwLock<HashMap<String, Vec<Route>>>,
}

impl RoutingManager {
    pub fn new(
        config: RoutingConfig,
        clock: SharedClock,
        reputation: Arc<ReputationSystem>,
        monitor: Arc<NetworkMonitor>,
    ) -> Self {
        Self {
            config,
            clock,
            reputation,
            monitor,
            routes: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a route, replacing any existing route through the same peer
    pub fn add_route(&self, resource_id: &str, route: Route) {
        let mut route = route.sanitized();
        route.resource_id = resource_id.to_string();

        let mut routes = self.routes.write();
        let entries = routes.entry(resource_id.to_string()).or_default();
        match entries.iter_mut().find(|r| r.peer_id == route.peer_id) {
            Some(existing) => *existing = route,
            None => {
                debug!("New route to {} via {}", resource_id, route.peer_id);
                entries.push(route);
            }
        }
    }

    /// Remove the route through `peer_id`, if any
    pub fn remove_route(&self, resource_id: &str, peer_id: &str) {
        let mut routes = self.routes.write();
        if let Some(entries) = routes.get_mut(resource_id) {
            entries.retain(|r| r.peer_id != peer_id);
            if entries.is_empty() {
                routes.remove(resource_id);
            }
        }
    }

    /// Remove every route through `peer_id`. Returns how many were dropped.
    pub fn remove_peer_routes(&self, peer_id: &str) -> usize {
        let mut removed = 0;
        let mut routes = self.routes.write();
        routes.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|r| r.peer_id != peer_id);
            removed += before - entries.len();
            !entries.is_empty()
        });
        removed
    }

    /// Unranked copy of the routes for a resource
    pub fn routes(&self, resource_id: &str) -> Vec<Route> {
        self.routes
            .read()
            .get(resource_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Resources with at least one route
    pub fn resources(&self) -> Vec<String> {
        self.routes.read().keys().cloned().collect()
    }

    pub fn route_count(&self) -> usize {
        self.routes.read().values().map(Vec::len).sum()
    }

    /// Number of resources reachable through `peer_id`
    pub fn peer_route_count(&self, peer_id: &str) -> usize {
        self.routes
            .read()
            .values()
            .filter(|entries| entries.iter().any(|r| r.peer_id == peer_id))
            .count()
    }

    /// Composite score in `[0, 1]`
    pub fn composite_score(&self, route: &Route) -> f64 {
        let weights = &self.config.weights;
        let stats = self.monitor.network_stats(&route.peer_id);

        let reputation = self.reputation.score(&route.peer_id) / 100.0;
        let latency = 1.0 - (stats.latency_ms / self.config.latency_ceiling_ms).min(1.0);
        let bandwidth = (stats.bandwidth_mbps / self.config.bandwidth_ceiling_mbps).min(1.0);
        let packet_loss = 1.0 - stats.packet_loss / 100.0;
        let cost = 1.0 - (route.cost / self.config.cost_ceiling).min(1.0);

        weights.reputation * reputation
            + weights.latency * latency
            + weights.bandwidth * bandwidth
            + weights.packet_loss * packet_loss
            + weights.cost * cost
            + weights.success_rate * route.success_rate
    }

    /// Routes for a resource, best first. Equal scores fall back to peer id order.
    pub fn ranked_routes(&self, resource_id: &str) -> Vec<(Route, f64)> {
        // scored outside the table lock; scoring reads other components
        let candidates = self.routes(resource_id);
        let mut scored: Vec<(Route, f64)> = candidates
            .into_iter()
            .map(|route| {
                let score = self.composite_score(&route);
                (route, score)
            })
            .collect();
        scored.sort_by(|(a, a_score), (b, b_score)| {
            b_score
                .total_cmp(a_score)
                .then_with(|| a.peer_id.cmp(&b.peer_id))
        });
        scored
    }

    /// Highest ranked route.
    ///
    /// `last_used` is stamped on the returned copy only; the table keeps its
    /// previous value.
    pub fn best_route(&self, resource_id: &str) -> Option<Route> {
        let (mut route, score) = self.ranked_routes(resource_id).into_iter().next()?;
        route.last_used = Some(self.clock.now());
        debug!(
            "Best route to {} via {} (score {:.3})",
            resource_id, route.peer_id, score
        );
        Some(route)
    }

    /// Top `count` routes, best first
    pub fn multiple_routes(&self, resource_id: &str, count: usize) -> Vec<Route> {
        self.ranked_routes(resource_id)
            .into_iter()
            .take(count)
            .map(|(route, _)| route)
            .collect()
    }

    /// Uniformly random route, ignoring score
    pub fn random_route(&self, resource_id: &str) -> Option<Route> {
        let routes = self.routes.read();
        routes
            .get(resource_id)?
            .choose(&mut rand::thread_rng())
            .cloned()
    }

    /// Ranked routes whose peer meets the reputation threshold
    pub fn trusted_routes(&self, resource_id: &str, threshold: f64) -> Vec<Route> {
        self.ranked_routes(resource_id)
            .into_iter()
            .filter(|(route, _)| self.reputation.is_trusted_peer(&route.peer_id, threshold))
            .map(|(route, _)| route)
            .collect()
    }
}
