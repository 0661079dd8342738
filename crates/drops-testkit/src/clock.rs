//! Controllable wall clock.

use drops_core::{PhysicalClock, PhysicalTime};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Clock frozen at a fixed instant until explicitly moved.
///
/// Clones share the same instant, so a test can keep a handle after moving
/// the clock into a runtime.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    /// Clock frozen at `now`.
    pub fn new(now: PhysicalTime) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(now.ts_ms)),
        }
    }

    /// Clock frozen at `secs` seconds past the Unix epoch.
    pub fn at_secs(secs: u64) -> Self {
        Self::new(PhysicalTime::from_secs(secs))
    }

    /// Jump to `now`, forwards or backwards.
    pub fn set(&self, now: PhysicalTime) {
        self.now_ms.store(now.ts_ms, Ordering::SeqCst);
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: Duration) -> PhysicalTime {
        let delta = by.as_millis() as u64;
        let previous = self.now_ms.fetch_add(delta, Ordering::SeqCst);
        PhysicalTime::from_millis(previous + delta)
    }

    /// Current reading.
    pub fn now(&self) -> PhysicalTime {
        PhysicalTime::from_millis(self.now_ms.load(Ordering::SeqCst))
    }
}

impl PhysicalClock for ManualClock {
    fn physical_time(&self) -> PhysicalTime {
        self.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_same_instant() {
        let clock = ManualClock::at_secs(100);
        let handle = clock.clone();
        handle.advance(Duration::from_secs(30));
        assert_eq!(clock.physical_time(), PhysicalTime::from_secs(130));
        clock.set(PhysicalTime::from_secs(5));
        assert_eq!(handle.now().as_secs(), 5);
    }
}
