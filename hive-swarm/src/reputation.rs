//! Peer reputation
//!
//! Converts interaction outcomes reported by the transport into a bounded
//! trust score per peer:
//! - Records are created lazily at the neutral score
//! - Each outcome moves the score by `base * weight * staleness`
//! - Records nobody touched for a day decay towards zero

use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, info};

use hive_core::{
    clamp_score, InteractionResult, InteractionType, PeerScore, SharedClock,
};

use crate::config::ReputationConfig;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Per-peer trust scores behind a single lock
#[derive(Debug)]
pub struct ReputationSystem {
    config: ReputationConfig,
    clock: SharedClock,
    scores: RwLock<HashMap<String, PeerScore>>,
}

impl ReputationSystem {
    pub fn new(config: ReputationConfig, clock: SharedClock) -> Self {
        Self {
            config,
            clock,
            scores: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ReputationConfig {
        &self.config
    }

    fn neutral_record(&self, peer_id: &str) -> PeerScore {
        let mut record = PeerScore::neutral(peer_id, self.clock.now());
        record.score = clamp_score(self.config.neutral_score);
        record
    }

    /// Fold an interaction outcome into the peer's score
    pub fn record_interaction(
        &self,
        peer_id: &str,
        interaction: InteractionType,
        result: InteractionResult,
    ) {
        let now = self.clock.now();
        let mut scores = self.scores.write();
        let record = scores
            .entry(peer_id.to_string())
            .or_insert_with(|| self.neutral_record(peer_id));

        record.interaction_count += 1;
        if result.is_success() {
            record.success_count += 1;
        } else {
            record.failure_count += 1;
            record.last_failure = Some(now);
        }

        let decay_factor = if now - record.last_updated > self.config.stale_after() {
            self.config.stale_interaction_factor
        } else {
            1.0
        };
        let delta = result.base_delta() * interaction.weight() * decay_factor;
        record.adjust(delta);
        record.last_updated = now;

        debug!(
            "Peer {} {:?}/{:?}: {:+.2} -> {:.2}",
            peer_id, interaction, result, delta, record.score
        );
    }

    /// Current score, neutral for unknown peers
    pub fn score(&self, peer_id: &str) -> f64 {
        self.scores
            .read()
            .get(peer_id)
            .map(|record| clamp_score(record.score))
            .unwrap_or_else(|| clamp_score(self.config.neutral_score))
    }

    /// Copy of the peer's record, a neutral record for unknown peers
    pub fn peer_score(&self, peer_id: &str) -> PeerScore {
        self.scores
            .read()
            .get(peer_id)
            .cloned()
            .unwrap_or_else(|| self.neutral_record(peer_id))
    }

    /// Decay every record untouched for longer than the staleness window.
    ///
    /// Returns the number of records decayed. A decayed record is refreshed,
    /// so calling this twice in a row decays nothing the second time.
    pub fn decay_scores(&self) -> usize {
        let now = self.clock.now();
        let stale_after = self.config.stale_after();
        let mut decayed = 0;

        let mut scores = self.scores.write();
        for record in scores.values_mut() {
            let age = now - record.last_updated;
            if age <= stale_after {
                continue;
            }
            let days_stale = age.num_seconds() as f64 / SECONDS_PER_DAY;
            let factor = (1.0 - self.config.decay_per_day * days_stale).max(self.config.decay_floor);
            record.score = clamp_score(record.score * factor);
            record.last_updated = now;
            decayed += 1;
        }
        drop(scores);

        if decayed > 0 {
            info!("Decayed {} stale peer scores", decayed);
        }
        decayed
    }

    pub fn is_trusted_peer(&self, peer_id: &str, threshold: f64) -> bool {
        self.score(peer_id) >= clamp_score(threshold)
    }

    /// Known peers at or above `threshold`, ordered by peer id
    pub fn trusted_peers(&self, threshold: f64) -> Vec<String> {
        let threshold = clamp_score(threshold);
        let mut trusted: Vec<String> = self
            .scores
            .read()
            .values()
            .filter(|record| clamp_score(record.score) >= threshold)
            .map(|record| record.peer_id.clone())
            .collect();
        trusted.sort();
        trusted
    }

    /// Copies of every record, ordered by peer id
    pub fn all_scores(&self) -> Vec<PeerScore> {
        let mut all: Vec<PeerScore> = self.scores.read().values().cloned().collect();
        all.sort_by(|a, b| a.peer_id.cmp(&b.peer_id));
        all
    }

    pub fn peer_count(&self) -> usize {
        self.scores.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use hive_core::{Clock, ManualClock, NEUTRAL_SCORE};
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::sync::Arc;

    fn system() -> (ReputationSystem, Arc<ManualClock>) {
        let clock = ManualClock::starting_now();
        (
            ReputationSystem::new(ReputationConfig::default(), clock.clone()),
            clock,
        )
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_unknown_peer_is_neutral() {
        let (reputation, _) = system();
        assert_eq!(reputation.score("nobody"), NEUTRAL_SCORE);

        let record = reputation.peer_score("nobody");
        assert_eq!(record.score, NEUTRAL_SCORE);
        assert_eq!(record.interaction_count, 0);
        assert_eq!(reputation.peer_count(), 0);
    }

    #[test]
    fn test_single_module_transfer_success() {
        let (reputation, _) = system();
        reputation.record_interaction(
            "p1",
            InteractionType::ModuleTransfer,
            InteractionResult::Success,
        );
        assert_close(reputation.score("p1"), 53.0);
    }

    #[test]
    fn test_success_streak_then_failure() {
        let (reputation, _) = system();
        let mut observed = Vec::new();
        for result in [
            InteractionResult::Success,
            InteractionResult::Success,
            InteractionResult::Success,
            InteractionResult::Failure,
        ] {
            reputation.record_interaction("p1", InteractionType::ModuleTransfer, result);
            observed.push(reputation.score("p1"));
        }

        for (actual, expected) in observed.iter().zip([53.0, 56.0, 59.0, 51.5]) {
            assert_close(*actual, expected);
        }

        let record = reputation.peer_score("p1");
        assert_eq!(record.interaction_count, 4);
        assert_eq!(record.success_count, 3);
        assert_eq!(record.failure_count, 1);
        assert!(record.last_failure.is_some());
    }

    #[test]
    fn test_timeout_counts_as_failure() {
        let (reputation, clock) = system();
        reputation.record_interaction(
            "p1",
            InteractionType::NetworkConnection,
            InteractionResult::Timeout,
        );
        let record = reputation.peer_score("p1");
        assert_close(record.score, 47.0);
        assert_eq!(record.failure_count, 1);
        assert_eq!(record.last_failure, Some(clock.now()));
    }

    #[test]
    fn test_stale_record_dampens_delta() {
        let (reputation, clock) = system();
        reputation.record_interaction(
            "p1",
            InteractionType::NetworkConnection,
            InteractionResult::Success,
        );
        clock.advance(Duration::hours(25));
        reputation.record_interaction(
            "p1",
            InteractionType::NetworkConnection,
            InteractionResult::Success,
        );
        // 52 + 2.0 * 1.0 * 0.8
        assert_close(reputation.score("p1"), 53.6);
    }

    #[test]
    fn test_score_stays_in_bounds() {
        let (reputation, clock) = system();
        let mut rng = StdRng::seed_from_u64(7);
        let results = [
            InteractionResult::Success,
            InteractionResult::Failure,
            InteractionResult::Timeout,
        ];

        for _ in 0..2_000 {
            let peer = format!("p{}", rng.gen_range(0..4));
            let interaction = InteractionType::ALL[rng.gen_range(0..4)];
            // bias towards one side so the bounds actually get hit
            let result = if rng.gen_bool(0.8) {
                results[0]
            } else {
                results[rng.gen_range(1..3)]
            };
            reputation.record_interaction(&peer, interaction, result);
            if rng.gen_bool(0.01) {
                clock.advance(Duration::hours(30));
                reputation.decay_scores();
            }
            let score = reputation.score(&peer);
            assert!((0.0..=100.0).contains(&score), "score {} escaped", score);
        }
    }

    #[test]
    fn test_repeated_failures_floor_at_zero() {
        let (reputation, _) = system();
        for _ in 0..50 {
            reputation.record_interaction(
                "bad",
                InteractionType::ModuleTransfer,
                InteractionResult::Failure,
            );
        }
        assert_eq!(reputation.score("bad"), 0.0);
    }

    #[test]
    fn test_decay_bounds() {
        let (reputation, clock) = system();
        for _ in 0..10 {
            reputation.record_interaction(
                "p1",
                InteractionType::ModuleTransfer,
                InteractionResult::Success,
            );
        }
        let before = reputation.score("p1");

        clock.advance(Duration::days(3));
        assert_eq!(reputation.decay_scores(), 1);
        let after = reputation.score("p1");

        assert!(after <= before);
        assert!(after >= 0.5 * before);
        assert_close(after, before * 0.97);
    }

    #[test]
    fn test_decay_floor_applies_for_very_stale_peers() {
        let (reputation, clock) = system();
        reputation.record_interaction(
            "p1",
            InteractionType::NetworkConnection,
            InteractionResult::Success,
        );
        clock.advance(Duration::days(400));
        reputation.decay_scores();
        assert_close(reputation.score("p1"), 26.0);
    }

    #[test]
    fn test_decay_is_idempotent() {
        let (reputation, clock) = system();
        reputation.record_interaction(
            "p1",
            InteractionType::NetworkConnection,
            InteractionResult::Success,
        );
        clock.advance(Duration::days(2));
        assert_eq!(reputation.decay_scores(), 1);
        let once = reputation.score("p1");
        assert_eq!(reputation.decay_scores(), 0);
        assert_eq!(reputation.score("p1"), once);
    }

    #[test]
    fn test_unrepresentable_staleness_window() {
        let clock = ManualClock::starting_now();
        let reputation = ReputationSystem::new(
            ReputationConfig {
                stale_after_hours: i64::MAX,
                ..Default::default()
            },
            clock.clone(),
        );
        reputation.record_interaction(
            "p1",
            InteractionType::ModuleTransfer,
            InteractionResult::Success,
        );
        clock.advance(Duration::days(3650));
        reputation.record_interaction(
            "p1",
            InteractionType::ModuleTransfer,
            InteractionResult::Success,
        );

        // the window is never crossed, so no dampening and no decay
        assert_close(reputation.score("p1"), 56.0);
        assert_eq!(reputation.decay_scores(), 0);
    }

    #[test]
    fn test_fresh_records_do_not_decay() {
        let (reputation, clock) = system();
        reputation.record_interaction(
            "p1",
            InteractionType::NetworkConnection,
            InteractionResult::Success,
        );
        clock.advance(Duration::hours(23));
        assert_eq!(reputation.decay_scores(), 0);
        assert_close(reputation.score("p1"), 52.0);
    }

    #[test]
    fn test_trusted_peers() {
        let (reputation, _) = system();
        reputation.record_interaction(
            "good",
            InteractionType::ModuleTransfer,
            InteractionResult::Success,
        );
        reputation.record_interaction(
            "bad",
            InteractionType::ModuleTransfer,
            InteractionResult::Failure,
        );

        assert!(reputation.is_trusted_peer("good", 52.0));
        assert!(!reputation.is_trusted_peer("bad", 50.0));
        // unknown peers sit at neutral
        assert!(reputation.is_trusted_peer("unknown", 50.0));
        // out of range thresholds are clamped
        assert!(!reputation.is_trusted_peer("good", 250.0));
        assert!(reputation.is_trusted_peer("bad", -10.0));

        let trusted = reputation.trusted_peers(50.0);
        assert_eq!(trusted, vec!["good".to_string()]);
    }

    #[test]
    fn test_all_scores_sorted_copies() {
        let (reputation, _) = system();
        for peer in ["c", "a", "b"] {
            reputation.record_interaction(
                peer,
                InteractionType::ControllerCommunication,
                InteractionResult::Success,
            );
        }
        let mut all = reputation.all_scores();
        let ids: Vec<_> = all.iter().map(|r| r.peer_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);

        all[0].score = 0.0;
        assert_close(reputation.score("a"), 52.4);
    }

    #[test]
    fn test_concurrent_recording() {
        let (reputation, _) = system();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        reputation.record_interaction(
                            "shared",
                            InteractionType::NetworkConnection,
                            InteractionResult::Success,
                        );
                    }
                });
            }
        });
        let record = reputation.peer_score("shared");
        assert_eq!(record.interaction_count, 800);
        assert_eq!(record.score, 100.0);
    }
}
