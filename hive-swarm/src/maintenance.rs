//! Periodic maintenance driver
//!
//! The components never schedule themselves. This driver is an optional
//! caller-side scheduler that runs decay, expiry and topology planning on
//! independent tokio intervals until told to stop.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::MAX_INTERVAL_MS;
use crate::swarm::Swarm;

/// How many times each task ran before shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceTotals {
    pub decay_passes: u64,
    pub expiry_passes: u64,
    pub topology_passes: u64,
}

/// Run maintenance until `shutdown` flips to `true` or its sender is dropped
pub async fn run_maintenance(
    swarm: Arc<Swarm>,
    mut shutdown: watch::Receiver<bool>,
) -> MaintenanceTotals {
    let schedule = swarm.config().maintenance.clone();
    let ticker = |ms: u64| {
        let period = Duration::from_millis(ms.clamp(1, MAX_INTERVAL_MS));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    };
    let mut decay = ticker(schedule.decay_interval_ms);
    let mut expiry = ticker(schedule.expiry_interval_ms);
    let mut topology = ticker(schedule.topology_interval_ms);
    let mut totals = MaintenanceTotals::default();

    info!(
        "Maintenance started (decay {}ms, expiry {}ms, topology {}ms)",
        schedule.decay_interval_ms, schedule.expiry_interval_ms, schedule.topology_interval_ms
    );

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = decay.tick() => {
                let decayed = swarm.reputation().decay_scores();
                totals.decay_passes += 1;
                debug!("Decay pass: {} scores decayed", decayed);
            }
            _ = expiry.tick() => {
                let expired = swarm.resources().remove_expired_resources();
                totals.expiry_passes += 1;
                debug!("Expiry pass: {} resources removed", expired);
            }
            _ = topology.tick() => {
                let recommendation = swarm.topology().optimize_topology();
                totals.topology_passes += 1;
                debug!(
                    "Topology pass: {} to connect, {} to disconnect",
                    recommendation.connect.len(),
                    recommendation.disconnect.len()
                );
            }
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    info!("Maintenance stopped: {:?}", totals);
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MaintenanceSchedule, SwarmConfig};
    use chrono::Duration as ChronoDuration;
    use hive_core::{InteractionResult, InteractionType, ManualClock, ResourceInfo};

    fn fast_swarm() -> (Arc<Swarm>, Arc<ManualClock>) {
        let clock = ManualClock::starting_now();
        let config = SwarmConfig::default().with_maintenance(MaintenanceSchedule {
            decay_interval_ms: 10,
            expiry_interval_ms: 15,
            topology_interval_ms: 20,
        });
        (Arc::new(Swarm::new(config, clock.clone()).unwrap()), clock)
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_tasks_until_shutdown() {
        let (swarm, clock) = fast_swarm();
        swarm.reputation().record_interaction(
            "p1",
            InteractionType::ModuleTransfer,
            InteractionResult::Success,
        );
        swarm
            .resources()
            .announce_resource(ResourceInfo::new("r1", "agent", "wasm", "1.0"));
        clock.advance(ChronoDuration::days(2));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_maintenance(swarm.clone(), rx));

        // virtual time; 55ms falls between ticks of every interval
        tokio::time::sleep(Duration::from_millis(55)).await;
        tx.send(true).unwrap();
        let totals = handle.await.unwrap();

        assert_eq!(
            totals,
            MaintenanceTotals {
                decay_passes: 5,
                expiry_passes: 3,
                topology_passes: 2,
            }
        );
        assert!(swarm.reputation().score("p1") < 53.0);
        assert_eq!(swarm.resources().resource_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_sender_dropped() {
        let (swarm, _) = fast_swarm();
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_maintenance(swarm, rx));
        drop(tx);
        let totals = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(totals, MaintenanceTotals::default());
    }
}
