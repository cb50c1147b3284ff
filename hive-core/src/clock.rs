//! Time source for staleness and expiry decisions
//!
//! Every component asks a [`Clock`] for "now" instead of calling `Utc::now()`
//! directly. Production code uses [`SystemClock`]; tests and the simulator
//! drive a [`ManualClock`] forward to cross the 24h staleness windows.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// A source of wall-clock time
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock shared between components
pub type SharedClock = Arc<dyn Clock>;

/// Reads the system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn shared() -> SharedClock {
        Arc::new(SystemClock)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    current: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    /// Start at the given instant
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: RwLock::new(start),
        }
    }

    /// Start at the current system time
    pub fn starting_now() -> Arc<Self> {
        Arc::new(Self::new(Utc::now()))
    }

    /// Advance time by `by`
    pub fn advance(&self, by: Duration) {
        *self.current.write() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::starting_now();
        let start = clock.now();
        clock.advance(Duration::hours(25));
        assert_eq!(clock.now() - start, Duration::hours(25));
    }

    #[test]
    fn test_manual_clock_as_shared() {
        let manual = ManualClock::starting_now();
        let shared: SharedClock = manual.clone();
        manual.advance(Duration::minutes(5));
        assert_eq!(shared.now(), manual.now());
    }
}
