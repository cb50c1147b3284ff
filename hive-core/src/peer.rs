//! Peer reputation records
//!
//! A peer's trust is a bounded score in `[0, 100]`, built up from the outcomes
//! of interactions observed by the transport:
//! - Every outcome carries a base delta (success, failure, timeout)
//! - Every interaction kind scales that delta by its severity
//! - Untouched records decay back toward zero over time

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{clamp_score, NEUTRAL_SCORE};

/// Kinds of interaction the transport reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    /// A module artifact was transferred to or from the peer
    ModuleTransfer,
    /// A controller message was exchanged with the peer
    ControllerCommunication,
    /// A plain connection attempt
    NetworkConnection,
    /// The peer executed a module on our behalf
    ModuleExecution,
}

impl InteractionType {
    pub const ALL: [InteractionType; 4] = [
        InteractionType::ModuleTransfer,
        InteractionType::ControllerCommunication,
        InteractionType::NetworkConnection,
        InteractionType::ModuleExecution,
    ];

    /// Severity multiplier applied to the outcome delta
    pub fn weight(&self) -> f64 {
        match self {
            InteractionType::ModuleTransfer => 1.5,
            InteractionType::ControllerCommunication => 1.2,
            InteractionType::NetworkConnection => 1.0,
            InteractionType::ModuleExecution => 1.3,
        }
    }
}

/// Outcome of an interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionResult {
    Success,
    Failure,
    Timeout,
}

impl InteractionResult {
    /// Base score delta before severity and staleness scaling
    pub fn base_delta(&self) -> f64 {
        match self {
            InteractionResult::Success => 2.0,
            InteractionResult::Failure => -5.0,
            InteractionResult::Timeout => -3.0,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, InteractionResult::Success)
    }
}

/// Reputation record for a single peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerScore {
    pub peer_id: String,
    /// Trust score in `[0, 100]`
    pub score: f64,
    pub last_updated: DateTime<Utc>,
    pub interaction_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub last_failure: Option<DateTime<Utc>>,
}

impl PeerScore {
    /// A fresh record at the neutral score
    pub fn neutral(peer_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            peer_id: peer_id.to_string(),
            score: NEUTRAL_SCORE,
            last_updated: now,
            interaction_count: 0,
            success_count: 0,
            failure_count: 0,
            last_failure: None,
        }
    }

    /// Add `delta` to the score, keeping it in bounds
    pub fn adjust(&mut self, delta: f64) {
        self.score = clamp_score(self.score + delta);
    }

    /// Fraction of interactions that succeeded, `None` without history
    pub fn success_ratio(&self) -> Option<f64> {
        if self.interaction_count == 0 {
            return None;
        }
        Some(self.success_count as f64 / self.interaction_count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_weights() {
        assert_eq!(InteractionType::ModuleTransfer.weight(), 1.5);
        assert_eq!(InteractionType::ControllerCommunication.weight(), 1.2);
        assert_eq!(InteractionType::NetworkConnection.weight(), 1.0);
        assert_eq!(InteractionType::ModuleExecution.weight(), 1.3);
    }

    #[test]
    fn test_result_deltas() {
        assert_eq!(InteractionResult::Success.base_delta(), 2.0);
        assert_eq!(InteractionResult::Failure.base_delta(), -5.0);
        assert_eq!(InteractionResult::Timeout.base_delta(), -3.0);
    }

    #[test]
    fn test_adjust_clamps() {
        let mut record = PeerScore::neutral("p1", Utc::now());
        record.adjust(80.0);
        assert_eq!(record.score, 100.0);
        record.adjust(-250.0);
        assert_eq!(record.score, 0.0);
    }

    #[test]
    fn test_success_ratio() {
        let mut record = PeerScore::neutral("p1", Utc::now());
        assert!(record.success_ratio().is_none());
        record.interaction_count = 4;
        record.success_count = 3;
        assert_eq!(record.success_ratio(), Some(0.75));
    }

    #[test]
    fn test_interaction_type_wire_name() {
        let json = serde_json::to_string(&InteractionType::ModuleTransfer).unwrap();
        assert_eq!(json, "\"module_transfer\"");
    }
}
