//! Wall-clock time
//!
//! Epoch phases are decided by comparing the clock at call time against stored
//! epoch boundaries; nothing is scheduled. The clock is injected through
//! [`PhysicalClock`] so tests can drive it explicitly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct PhysicalTime {
    /// Milliseconds since the Unix epoch
    pub ts_ms: u64,
}

impl PhysicalTime {
    /// From milliseconds.
    pub const fn from_millis(ts_ms: u64) -> Self {
        Self { ts_ms }
    }

    /// From whole seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self { ts_ms: secs * 1000 }
    }

    /// Whole seconds, rounded down.
    pub fn as_secs(&self) -> u64 {
        self.ts_ms / 1000
    }

    /// Round down to a multiple of `interval`.
    pub fn floor_to(&self, interval: Duration) -> Self {
        let step = interval.as_millis() as u64;
        if step == 0 {
            return *self;
        }
        Self {
            ts_ms: (self.ts_ms / step) * step,
        }
    }
}

impl Add<Duration> for PhysicalTime {
    type Output = PhysicalTime;

    fn add(self, rhs: Duration) -> Self::Output {
        Self {
            ts_ms: self.ts_ms.saturating_add(rhs.as_millis() as u64),
        }
    }
}

impl fmt::Display for PhysicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}s", self.ts_ms / 1000, self.ts_ms % 1000)
    }
}

/// Source of the current wall-clock time.
pub trait PhysicalClock: Send + Sync {
    /// Current time.
    fn physical_time(&self) -> PhysicalTime;
}

/// Operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl PhysicalClock for SystemClock {
    fn physical_time(&self) -> PhysicalTime {
        let ts_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        PhysicalTime { ts_ms }
    }
}
