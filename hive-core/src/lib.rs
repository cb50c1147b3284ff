//! Hive Core - Domain model for the swarm intelligence layer
//!
//! This crate provides the shared vocabulary of the swarm:
//! - Peer reputation records and interaction outcomes
//! - QoS samples and candidate routes
//! - Topology graph nodes, edges and connection bookkeeping
//! - Resource metadata and announcements
//! - The tagged message union delivered by the transport
//! - An injectable clock for staleness and expiry

pub mod clock;
pub mod message;
pub mod network;
pub mod peer;
pub mod resource;
pub mod topology;

pub use clock::*;
pub use message::*;
pub use network::*;
pub use peer::*;
pub use resource::*;
pub use topology::*;

/// Score assigned to peers with no recorded history
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Minimum reputation score
pub const MIN_SCORE: f64 = 0.0;

/// Maximum reputation score
pub const MAX_SCORE: f64 = 100.0;

/// Clamp a reputation score into `[MIN_SCORE, MAX_SCORE]`.
///
/// NaN collapses to the neutral score.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return NEUTRAL_SCORE;
    }
    score.clamp(MIN_SCORE, MAX_SCORE)
}

/// Clamp a non-negative measurement (latency, bandwidth, cost).
pub fn clamp_non_negative(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.max(0.0)
}

/// Clamp a ratio into `[0, 1]`.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_score_bounds() {
        assert_eq!(clamp_score(-3.0), 0.0);
        assert_eq!(clamp_score(140.0), 100.0);
        assert_eq!(clamp_score(42.5), 42.5);
        assert_eq!(clamp_score(f64::NAN), NEUTRAL_SCORE);
    }

    #[test]
    fn test_clamp_helpers() {
        assert_eq!(clamp_non_negative(-1.0), 0.0);
        assert_eq!(clamp_unit(1.7), 1.0);
        assert_eq!(clamp_unit(f64::NAN), 0.0);
    }
}
