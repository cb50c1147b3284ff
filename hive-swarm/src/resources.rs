//! Resource discovery
//!
//! Tracks which resources exist in the swarm and which peers hold them.
//! Remote announcements also register a route through the announcing peer.
//!
//! `updated_at` is stamped with the local receipt time on every upsert, so
//! expiry measures how long ago this node last heard about a resource.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use hive_core::{ResourceAnnouncement, ResourceInfo, ResourceQuery, Route, SharedClock};

use crate::config::ResourceConfig;
use crate::reputation::ReputationSystem;
use crate::routing::RoutingManager;

#[derive(Debug, Default)]
struct ResourceState {
    resources: HashMap<String, ResourceInfo>,
    /// resource id -> owning peers, without duplicates
    owners: HashMap<String, Vec<String>>,
}

/// Known resources and their owners behind a single lock
#[derive(Debug)]
pub struct ResourceManager {
    config: ResourceConfig,
    clock: SharedClock,
    reputation: Arc<ReputationSystem>,
    routing: Arc<RoutingManager>,
    state: RwLock<ResourceState>,
}

impl ResourceManager {
    pub fn new(
        config: ResourceConfig,
        clock: SharedClock,
        reputation: Arc<ReputationSystem>,
        routing: Arc<RoutingManager>,
    ) -> Self {
        Self {
            config,
            clock,
            reputation,
            routing,
            state: RwLock::new(ResourceState::default()),
        }
    }

    fn upsert(state: &mut ResourceState, mut resource: ResourceInfo, now: DateTime<Utc>) {
        if let Some(existing) = state.resources.get(&resource.id) {
            resource.created_at = existing.created_at;
        }
        resource.updated_at = now;
        state.resources.insert(resource.id.clone(), resource);
    }

    /// Publish a resource held locally. No owner entry is recorded.
    pub fn announce_resource(&self, resource: ResourceInfo) {
        let now = self.clock.now();
        debug!("Local resource {} ({})", resource.id, resource.name);
        Self::upsert(&mut self.state.write(), resource, now);
    }

    /// Ingest a remote announcement.
    ///
    /// Returns `false` when the announcement had already expired on arrival
    /// and was ignored.
    pub fn handle_resource_announcement(&self, announcement: ResourceAnnouncement) -> bool {
        let now = self.clock.now();
        if announcement.is_expired(now) {
            debug!(
                "Dropping expired announcement {} from {}",
                announcement.id, announcement.peer_id
            );
            return false;
        }

        let resource_id = announcement.resource.id.clone();
        let peer_id = announcement.peer_id;
        {
            let mut state = self.state.write();
            Self::upsert(&mut state, announcement.resource, now);
            let owners = state.owners.entry(resource_id.clone()).or_default();
            if !owners.contains(&peer_id) {
                owners.push(peer_id.clone());
            }
        }

        let qos = &self.config.announced_route;
        let route = Route::new(&resource_id, &peer_id)
            .with_cost(qos.cost)
            .with_latency(qos.latency_ms)
            .with_bandwidth(qos.bandwidth_mbps)
            .with_success_rate(qos.success_rate);
        self.routing.add_route(&resource_id, route);

        debug!("Peer {} announced resource {}", peer_id, resource_id);
        true
    }

    /// Drop resources not refreshed within the TTL, with their owner lists.
    ///
    /// Routes registered for them stay in the routing table.
    pub fn remove_expired_resources(&self) -> usize {
        let Some(cutoff) = self.clock.now().checked_sub_signed(self.config.ttl()) else {
            return 0;
        };
        let mut state = self.state.write();

        let expired: Vec<String> = state
            .resources
            .values()
            .filter(|r| r.updated_at < cutoff)
            .map(|r| r.id.clone())
            .collect();
        for id in &expired {
            state.resources.remove(id);
            state.owners.remove(id);
        }
        drop(state);

        if !expired.is_empty() {
            info!("Removed {} expired resources", expired.len());
        }
        expired.len()
    }

    /// Resources matching every populated field of `query`, unordered
    pub fn find_resources(&self, query: &ResourceQuery) -> Vec<ResourceInfo> {
        self.state
            .read()
            .resources
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect()
    }

    pub fn resource(&self, resource_id: &str) -> Option<ResourceInfo> {
        self.state.read().resources.get(resource_id).cloned()
    }

    pub fn resource_owners(&self, resource_id: &str) -> Vec<String> {
        self.state
            .read()
            .owners
            .get(resource_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Resources the peer is recorded as owning
    pub fn resources_by_peer(&self, peer_id: &str) -> Vec<ResourceInfo> {
        let state = self.state.read();
        state
            .owners
            .iter()
            .filter(|(_, owners)| owners.iter().any(|o| o == peer_id))
            .filter_map(|(id, _)| state.resources.get(id).cloned())
            .collect()
    }

    pub fn all_resources(&self) -> Vec<ResourceInfo> {
        self.state.read().resources.values().cloned().collect()
    }

    pub fn resource_count(&self) -> usize {
        self.state.read().resources.len()
    }

    /// Owners of a resource meeting the reputation threshold
    pub fn trusted_resource_owners(&self, resource_id: &str, threshold: f64) -> Vec<String> {
        self.resource_owners(resource_id)
            .into_iter()
            .filter(|peer| self.reputation.is_trusted_peer(peer, threshold))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ReputationConfig, RoutingConfig};
    use crate::monitor::NetworkMonitor;
    use chrono::Duration;
    use hive_core::{Clock, InteractionResult, InteractionType, ManualClock};

    struct Fixture {
        clock: Arc<ManualClock>,
        reputation: Arc<ReputationSystem>,
        routing: Arc<RoutingManager>,
        resources: ResourceManager,
    }

    fn fixture() -> Fixture {
        fixture_with(ResourceConfig::default())
    }

    fn fixture_with(config: ResourceConfig) -> Fixture {
        let clock = ManualClock::starting_now();
        let reputation = Arc::new(ReputationSystem::new(
            ReputationConfig::default(),
            clock.clone(),
        ));
        let routing = Arc::new(RoutingManager::new(
            RoutingConfig::default(),
            clock.clone(),
            reputation.clone(),
            Arc::new(NetworkMonitor::new()),
        ));
        let resources = ResourceManager::new(
            config,
            clock.clone(),
            reputation.clone(),
            routing.clone(),
        );
        Fixture {
            clock,
            reputation,
            routing,
            resources,
        }
    }

    fn info(id: &str) -> ResourceInfo {
        ResourceInfo::new(id, id, "wasm", "1.0.0")
    }

    fn announce(f: &Fixture, peer: &str, resource: ResourceInfo) -> bool {
        let mut announcement = ResourceAnnouncement::new(peer, resource, Duration::hours(1));
        announcement.expires_at = f.clock.now() + Duration::hours(1);
        f.resources.handle_resource_announcement(announcement)
    }

    #[test]
    fn test_local_announce_has_no_owner() {
        let f = fixture();
        f.resources.announce_resource(info("r1"));
        assert!(f.resources.resource("r1").is_some());
        assert!(f.resources.resource_owners("r1").is_empty());
        assert!(f.routing.routes("r1").is_empty());
    }

    #[test]
    fn test_remote_announcement_registers_owner_and_route() {
        let f = fixture();
        assert!(announce(&f, "p1", info("r1")));
        assert!(announce(&f, "p1", info("r1")));
        assert!(announce(&f, "p2", info("r1")));

        assert_eq!(f.resources.resource_owners("r1"), ["p1", "p2"]);
        let routes = f.routing.routes("r1");
        assert_eq!(routes.len(), 2);
        let route = routes.iter().find(|r| r.peer_id == "p1").unwrap();
        assert_eq!(route.cost, 10.0);
        assert_eq!(route.latency_ms, 50.0);
        assert_eq!(route.bandwidth_mbps, 50.0);
        assert_eq!(route.success_rate, 1.0);
    }

    #[test]
    fn test_expired_announcement_ignored() {
        let f = fixture();
        let mut announcement = ResourceAnnouncement::new("p1", info("r1"), Duration::hours(1));
        announcement.expires_at = f.clock.now() - Duration::seconds(1);

        assert!(!f.resources.handle_resource_announcement(announcement));
        assert_eq!(f.resources.resource_count(), 0);
        assert!(f.routing.routes("r1").is_empty());
    }

    #[test]
    fn test_upsert_keeps_created_at() {
        let f = fixture();
        f.resources.announce_resource(info("r1"));
        let first = f.resources.resource("r1").unwrap();

        f.clock.advance(Duration::hours(2));
        f.resources
            .announce_resource(info("r1").with_description("second revision"));
        let second = f.resources.resource("r1").unwrap();

        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.updated_at, f.clock.now());
        assert_eq!(second.description, "second revision");
    }

    #[test]
    fn test_unrepresentable_ttl_never_expires() {
        let f = fixture_with(ResourceConfig {
            ttl_hours: i64::MAX,
            ..Default::default()
        });
        f.resources.announce_resource(info("r1"));
        f.clock.advance(Duration::days(3650));

        assert_eq!(f.resources.remove_expired_resources(), 0);
        assert!(f.resources.resource("r1").is_some());
    }

    #[test]
    fn test_expiry_sweeps_resources_but_not_routes() {
        let f = fixture();
        announce(&f, "p1", info("old"));
        f.clock.advance(Duration::hours(20));
        announce(&f, "p1", info("fresh"));
        f.clock.advance(Duration::hours(5));

        assert_eq!(f.resources.remove_expired_resources(), 1);
        assert!(f.resources.resource("old").is_none());
        assert!(f.resources.resource_owners("old").is_empty());
        assert!(f.resources.resource("fresh").is_some());
        assert_eq!(f.routing.routes("old").len(), 1);

        assert_eq!(f.resources.remove_expired_resources(), 0);
    }

    #[test]
    fn test_find_resources() {
        let f = fixture();
        f.resources
            .announce_resource(info("r1").with_tags(&["x", "y"]));
        f.resources.announce_resource(info("r2").with_tags(&["x"]));
        f.resources
            .announce_resource(ResourceInfo::new("r3", "r3", "patch", "2.0").with_tags(&["y", "x", "z"]));

        let mut both: Vec<_> = f
            .resources
            .find_resources(&ResourceQuery::new().tags(&["x", "y"]))
            .into_iter()
            .map(|r| r.id)
            .collect();
        both.sort();
        assert_eq!(both, ["r1", "r3"]);

        let patches = f
            .resources
            .find_resources(&ResourceQuery::new().resource_type("patch").tags(&["x"]));
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].id, "r3");

        assert_eq!(f.resources.find_resources(&ResourceQuery::new()).len(), 3);
        assert!(f
            .resources
            .find_resources(&ResourceQuery::new().name("r1").version("9.9"))
            .is_empty());
    }

    #[test]
    fn test_resources_by_peer() {
        let f = fixture();
        announce(&f, "p1", info("r1"));
        announce(&f, "p1", info("r2"));
        announce(&f, "p2", info("r2"));

        let mut ids: Vec<_> = f
            .resources
            .resources_by_peer("p1")
            .into_iter()
            .map(|r| r.id)
            .collect();
        ids.sort();
        assert_eq!(ids, ["r1", "r2"]);
        assert_eq!(f.resources.resources_by_peer("p2").len(), 1);
        assert!(f.resources.resources_by_peer("p3").is_empty());
    }

    #[test]
    fn test_trusted_resource_owners() {
        let f = fixture();
        announce(&f, "good", info("r1"));
        announce(&f, "bad", info("r1"));
        f.reputation.record_interaction(
            "good",
            InteractionType::ModuleTransfer,
            InteractionResult::Success,
        );
        f.reputation.record_interaction(
            "bad",
            InteractionType::ModuleTransfer,
            InteractionResult::Failure,
        );

        assert_eq!(f.resources.trusted_resource_owners("r1", 50.0), ["good"]);
        assert!(f.resources.trusted_resource_owners("missing", 0.0).is_empty());
    }

    #[test]
    fn test_returned_records_are_copies() {
        let f = fixture();
        f.resources.announce_resource(info("r1"));
        let mut all = f.resources.all_resources();
        all[0].name = "mutated".to_string();
        assert_eq!(f.resources.resource("r1").unwrap().name, "r1");
        assert_eq!(f.resources.resource_count(), 1);
    }
}
