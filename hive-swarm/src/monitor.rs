//! Last-known QoS per peer

use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::trace;

use hive_core::NetworkStats;

/// Latest link measurement per peer; a new sample replaces the old one
#[derive(Debug, Default)]
pub struct NetworkMonitor {
    stats: RwLock<HashMap<String, NetworkStats>>,
}

impl NetworkMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_network_stats(
        &self,
        peer_id: &str,
        latency_ms: f64,
        bandwidth_mbps: f64,
        packet_loss: f64,
    ) {
        let sample = NetworkStats::new(latency_ms, bandwidth_mbps, packet_loss);
        trace!("Network sample for {}: {:?}", peer_id, sample);
        self.stats.write().insert(peer_id.to_string(), sample);
    }

    /// Latest sample, defaults for peers never measured
    pub fn network_stats(&self, peer_id: &str) -> NetworkStats {
        self.stats
            .read()
            .get(peer_id)
            .copied()
            .unwrap_or_default()
    }

    pub fn all_network_stats(&self) -> HashMap<String, NetworkStats> {
        self.stats.read().clone()
    }
}
