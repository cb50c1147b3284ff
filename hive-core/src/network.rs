//! QoS samples and candidate routes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{clamp_non_negative, clamp_unit};

/// Latency assumed for peers that were never measured (ms)
pub const DEFAULT_LATENCY_MS: f64 = 100.0;

/// Bandwidth assumed for peers that were never measured (Mbps)
pub const DEFAULT_BANDWIDTH_MBPS: f64 = 10.0;

/// Packet loss assumed for peers that were never measured (%)
pub const DEFAULT_PACKET_LOSS: f64 = 0.0;

/// Last-known link quality towards a peer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub latency_ms: f64,
    pub bandwidth_mbps: f64,
    /// Packet loss percentage in `[0, 100]`
    pub packet_loss: f64,
}

impl NetworkStats {
    /// Build a sample, clamping each measurement into its valid range
    pub fn new(latency_ms: f64, bandwidth_mbps: f64, packet_loss: f64) -> Self {
        Self {
            latency_ms: clamp_non_negative(latency_ms),
            bandwidth_mbps: clamp_non_negative(bandwidth_mbps),
            packet_loss: clamp_non_negative(packet_loss).min(100.0),
        }
    }
}

impl Default for NetworkStats {
    fn default() -> Self {
        Self {
            latency_ms: DEFAULT_LATENCY_MS,
            bandwidth_mbps: DEFAULT_BANDWIDTH_MBPS,
            packet_loss: DEFAULT_PACKET_LOSS,
        }
    }
}

/// A candidate path to a resource through one peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub peer_id: String,
    pub resource_id: String,
    pub cost: f64,
    pub latency_ms: f64,
    pub bandwidth_mbps: f64,
    pub last_used: Option<DateTime<Utc>>,
    /// Prior success rate in `[0, 1]`
    pub success_rate: f64,
}

impl Route {
    /// A route with no usage history and a perfect prior
    pub fn new(resource_id: &str, peer_id: &str) -> Self {
        Self {
            peer_id: peer_id.to_string(),
            resource_id: resource_id.to_string(),
            cost: 0.0,
            latency_ms: DEFAULT_LATENCY_MS,
            bandwidth_mbps: DEFAULT_BANDWIDTH_MBPS,
            last_used: None,
            success_rate: 1.0,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = clamp_non_negative(cost);
        self
    }

    pub fn with_latency(mut self, latency_ms: f64) -> Self {
        self.latency_ms = clamp_non_negative(latency_ms);
        self
    }

    pub fn with_bandwidth(mut self, bandwidth_mbps: f64) -> Self {
        self.bandwidth_mbps = clamp_non_negative(bandwidth_mbps);
        self
    }

    pub fn with_success_rate(mut self, success_rate: f64) -> Self {
        self.success_rate = clamp_unit(success_rate);
        self
    }

    /// Clamp caller-supplied fields into range
    pub fn sanitized(mut self) -> Self {
        self.cost = clamp_non_negative(self.cost);
        self.latency_ms = clamp_non_negative(self.latency_ms);
        self.bandwidth_mbps = clamp_non_negative(self.bandwidth_mbps);
        self.success_rate = clamp_unit(self.success_rate);
        self
    }
}
