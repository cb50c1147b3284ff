//! Swarm configuration
//!
//! Every tunable constant of the reputation, routing, topology and resource
//! components lives here. Each section deserializes with defaults so a TOML
//! file only needs the keys it overrides.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("Route weights must be non-negative and sum to 1.0 (got {0})")]
    RouteWeights(f64),

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("Peer bounds must satisfy min <= target <= max (got {min}/{target}/{max})")]
    PeerBounds {
        min: usize,
        target: usize,
        max: usize,
    },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    pub reputation: ReputationConfig,
    pub routing: RoutingConfig,
    pub topology: TopologyConfig,
    pub resources: ResourceConfig,
    pub maintenance: MaintenanceSchedule,
}

impl SwarmConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SwarmConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reputation.validate()?;
        self.routing.validate()?;
        self.topology.validate()?;
        self.resources.validate()?;
        self.maintenance.validate()
    }

    pub fn with_reputation(mut self, reputation: ReputationConfig) -> Self {
        self.reputation = reputation;
        self
    }

    pub fn with_routing(mut self, routing: RoutingConfig) -> Self {
        self.routing = routing;
        self
    }

    pub fn with_topology(mut self, topology: TopologyConfig) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_resources(mut self, resources: ResourceConfig) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_maintenance(mut self, maintenance: MaintenanceSchedule) -> Self {
        self.maintenance = maintenance;
        self
    }
}

/// Longest staleness, expiry or recency window accepted (100 years)
pub const MAX_WINDOW_HOURS: i64 = 100 * 365 * 24;

/// Longest maintenance interval accepted (one year)
pub const MAX_INTERVAL_MS: u64 = 365 * 24 * 60 * 60 * 1000;

/// A configured window, saturating when chrono cannot represent it
fn window_or_max(window: Option<Duration>) -> Duration {
    window.unwrap_or_else(Duration::max_value)
}

fn check_window(
    field: &'static str,
    value: i64,
    window: Option<Duration>,
) -> Result<(), ConfigError> {
    if value <= 0 {
        return Err(ConfigError::Zero(field));
    }
    match window {
        Some(window) if window <= Duration::hours(MAX_WINDOW_HOURS) => Ok(()),
        _ => Err(ConfigError::OutOfRange {
            field,
            value: value as f64,
        }),
    }
}

fn check_interval(field: &'static str, ms: u64) -> Result<(), ConfigError> {
    if ms == 0 {
        return Err(ConfigError::Zero(field));
    }
    if ms > MAX_INTERVAL_MS {
        return Err(ConfigError::OutOfRange {
            field,
            value: ms as f64,
        });
    }
    Ok(())
}

fn check_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value })
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value })
    }
}

/// Reputation scoring and decay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationConfig {
    /// Score given to peers with no history
    pub neutral_score: f64,
    /// Records untouched for longer than this are stale
    pub stale_after_hours: i64,
    /// Multiplier applied to the delta of an interaction on a stale record
    pub stale_interaction_factor: f64,
    /// Fraction of the score lost per stale day
    pub decay_per_day: f64,
    /// Decay never shrinks a score below this fraction in one pass
    pub decay_floor: f64,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            neutral_score: hive_core::NEUTRAL_SCORE,
            stale_after_hours: 24,
            stale_interaction_factor: 0.8,
            decay_per_day: 0.01,
            decay_floor: 0.5,
        }
    }
}

impl ReputationConfig {
    pub fn stale_after(&self) -> Duration {
        window_or_max(Duration::try_hours(self.stale_after_hours))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(hive_core::MIN_SCORE..=hive_core::MAX_SCORE).contains(&self.neutral_score) {
            return Err(ConfigError::OutOfRange {
                field: "reputation.neutral_score",
                value: self.neutral_score,
            });
        }
        check_window(
            "reputation.stale_after_hours",
            self.stale_after_hours,
            Duration::try_hours(self.stale_after_hours),
        )?;
        check_unit(
            "reputation.stale_interaction_factor",
            self.stale_interaction_factor,
        )?;
        check_unit("reputation.decay_per_day", self.decay_per_day)?;
        check_unit("reputation.decay_floor", self.decay_floor)
    }
}

/// Weights of the composite route score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteWeights {
    pub reputation: f64,
    pub latency: f64,
    pub bandwidth: f64,
    pub packet_loss: f64,
    pub cost: f64,
    pub success_rate: f64,
}

impl Default for RouteWeights {
    fn default() -> Self {
        Self {
            reputation: 0.30,
            latency: 0.20,
            bandwidth: 0.20,
            packet_loss: 0.10,
            cost: 0.10,
            success_rate: 0.10,
        }
    }
}

impl RouteWeights {
    pub fn sum(&self) -> f64 {
        self.reputation
            + self.latency
            + self.bandwidth
            + self.packet_loss
            + self.cost
            + self.success_rate
    }

    fn all_non_negative(&self) -> bool {
        [
            self.reputation,
            self.latency,
            self.bandwidth,
            self.packet_loss,
            self.cost,
            self.success_rate,
        ]
        .iter()
        .all(|w| *w >= 0.0)
    }
}

/// Route ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Latency at or above which the latency factor bottoms out (ms)
    pub latency_ceiling_ms: f64,
    /// Bandwidth at or above which the bandwidth factor saturates (Mbps)
    pub bandwidth_ceiling_mbps: f64,
    /// Cost at or above which the cost factor bottoms out
    pub cost_ceiling: f64,
    pub weights: RouteWeights,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            latency_ceiling_ms: 1000.0,
            bandwidth_ceiling_mbps: 1000.0,
            cost_ceiling: 100.0,
            weights: RouteWeights::default(),
        }
    }
}

impl RoutingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let sum = self.weights.sum();
        if !self.weights.all_non_negative() || (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::RouteWeights(sum));
        }
        check_positive("routing.latency_ceiling_ms", self.latency_ceiling_ms)?;
        check_positive("routing.bandwidth_ceiling_mbps", self.bandwidth_ceiling_mbps)?;
        check_positive("routing.cost_ceiling", self.cost_ceiling)
    }
}

/// Connection planning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Below this many connected peers, growth is recommended
    pub min_peers: usize,
    /// Above this many connected peers, pruning is recommended
    pub max_peers: usize,
    /// Pruning trims the connected set back down to this size
    pub target_peers: usize,
    pub reputation_weight: f64,
    pub distance_weight: f64,
    /// Edge latency at or above which a candidate counts as maximally distant (ms)
    pub distance_latency_ceiling_ms: f64,
    /// Peers seen within this window count as fresh
    pub fresh_window_secs: i64,
    /// Peers seen within this window count as recent
    pub recent_window_secs: i64,
    pub fresh_factor: f64,
    pub recent_factor: f64,
    pub stale_factor: f64,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            min_peers: 5,
            max_peers: 20,
            target_peers: 15,
            reputation_weight: 0.7,
            distance_weight: 0.3,
            distance_latency_ceiling_ms: 1000.0,
            fresh_window_secs: 60,
            recent_window_secs: 3600,
            fresh_factor: 1.0,
            recent_factor: 0.8,
            stale_factor: 0.5,
        }
    }
}

impl TopologyConfig {
    pub fn fresh_window(&self) -> Duration {
        window_or_max(Duration::try_seconds(self.fresh_window_secs))
    }

    pub fn recent_window(&self) -> Duration {
        window_or_max(Duration::try_seconds(self.recent_window_secs))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_peers <= self.target_peers && self.target_peers <= self.max_peers) {
            return Err(ConfigError::PeerBounds {
                min: self.min_peers,
                target: self.target_peers,
                max: self.max_peers,
            });
        }
        check_unit("topology.reputation_weight", self.reputation_weight)?;
        check_unit("topology.distance_weight", self.distance_weight)?;
        check_positive(
            "topology.distance_latency_ceiling_ms",
            self.distance_latency_ceiling_ms,
        )?;
        check_unit("topology.fresh_factor", self.fresh_factor)?;
        check_unit("topology.recent_factor", self.recent_factor)?;
        check_unit("topology.stale_factor", self.stale_factor)?;
        check_window(
            "topology.fresh_window_secs",
            self.fresh_window_secs,
            Duration::try_seconds(self.fresh_window_secs),
        )?;
        check_window(
            "topology.recent_window_secs",
            self.recent_window_secs,
            Duration::try_seconds(self.recent_window_secs),
        )?;
        if self.recent_window_secs < self.fresh_window_secs {
            return Err(ConfigError::OutOfRange {
                field: "topology.recent_window_secs",
                value: self.recent_window_secs as f64,
            });
        }
        Ok(())
    }
}

/// QoS assumed for a route learned from an announcement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnouncedRouteQos {
    pub cost: f64,
    pub latency_ms: f64,
    pub bandwidth_mbps: f64,
    pub success_rate: f64,
}

impl Default for AnnouncedRouteQos {
    fn default() -> Self {
        Self {
            cost: 10.0,
            latency_ms: 50.0,
            bandwidth_mbps: 50.0,
            success_rate: 1.0,
        }
    }
}

/// Resource tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Resources not refreshed within this window are swept
    pub ttl_hours: i64,
    pub announced_route: AnnouncedRouteQos,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 24,
            announced_route: AnnouncedRouteQos::default(),
        }
    }
}

impl ResourceConfig {
    pub fn ttl(&self) -> Duration {
        window_or_max(Duration::try_hours(self.ttl_hours))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_window(
            "resources.ttl_hours",
            self.ttl_hours,
            Duration::try_hours(self.ttl_hours),
        )?;
        check_unit(
            "resources.announced_route.success_rate",
            self.announced_route.success_rate,
        )
    }
}

/// Intervals for the periodic maintenance calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceSchedule {
    pub decay_interval_ms: u64,
    pub expiry_interval_ms: u64,
    pub topology_interval_ms: u64,
}

impl Default for MaintenanceSchedule {
    fn default() -> Self {
        Self {
            decay_interval_ms: 24 * 60 * 60 * 1000,
            expiry_interval_ms: 60 * 60 * 1000,
            topology_interval_ms: 5 * 60 * 1000,
        }
    }
}

impl MaintenanceSchedule {
    fn validate(&self) -> Result<(), ConfigError> {
        check_interval("maintenance.decay_interval_ms", self.decay_interval_ms)?;
        check_interval("maintenance.expiry_interval_ms", self.expiry_interval_ms)?;
        check_interval("maintenance.topology_interval_ms", self.topology_interval_ms)
    }
}
