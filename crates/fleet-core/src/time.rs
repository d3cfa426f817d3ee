//! Wall-clock abstraction.
//!
//! # Design
//!
//! The engine never calls `Instant::now()` directly.  Every tick reads time
//! through a [`Clock`], which reports the elapsed [`Duration`] since an
//! arbitrary origin.  Only differences between readings are meaningful:
//!
//!   sim_delta = (now - last_tick_at) * time_scale
//!
//! [`SystemClock`] is the real-time source.  [`ManualClock`] is advanced
//! explicitly, so tests (and offline replays) are fully deterministic.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

// ── Clock ─────────────────────────────────────────────────────────────────────

/// A monotonic time source.
///
/// Implementations must be `Send + Sync` so a fleet can be driven from a
/// background thread while the UI thread holds another clone.
pub trait Clock: Send + Sync {
    /// Time elapsed since this clock's origin.  Never decreases.
    fn now(&self) -> Duration;
}

// ── SystemClock ───────────────────────────────────────────────────────────────

/// Real monotonic time, measured from construction.
#[derive(Clone, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

// ── ManualClock ───────────────────────────────────────────────────────────────

/// A clock that only moves when told to.
///
/// Clones share the same counter: hand one clone to the fleet and keep
/// another to advance time from the test body.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    /// A clock reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let step = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        // fetch_update never fails with an always-Some closure.
        let _ = self.nanos.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
            Some(n.saturating_add(step))
        });
    }

    /// Jump to `at` if it is later than the current reading.  Earlier values
    /// are ignored so the clock stays monotonic.
    pub fn set(&self, at: Duration) {
        let target = u64::try_from(at.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_max(target, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}
