//! Time Access for KVMemo
//!
//! TTL deadlines are absolute epoch-millisecond timestamps, so they need a
//! wall clock; latency and uptime need a monotonic clock that is immune to
//! NTP adjustments. Both are reached through the `Clock` trait so that
//! tests can substitute a controllable clock and drive TTL expiry
//! deterministically instead of sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch. Used for TTL `expire_at` deadlines
/// and entry creation timestamps.
pub type EpochMillis = u64;

/// Source of wall-clock and monotonic time.
///
/// The engine holds a `Arc<dyn Clock>` chosen at construction; production
/// code uses [`SystemClock`], tests use [`ManualClock`].
pub trait Clock: Send + Sync {
    /// Current wall-clock time in milliseconds since the Unix epoch.
    fn epoch_millis(&self) -> EpochMillis;

    /// A monotonic instant for measuring durations.
    fn monotonic(&self) -> Instant;
}

/// Production clock backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_millis(&self) -> EpochMillis {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }

    fn monotonic(&self) -> Instant {
        Instant::now()
    }
}

/// Test clock whose wall time only moves when told to.
///
/// `monotonic()` still returns real instants; only the epoch time is
/// simulated, which is what TTL behavior depends on.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    /// Creates a manual clock starting at the given epoch time.
    pub fn starting_at(now_ms: EpochMillis) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
        }
    }

    /// Advances the wall clock by `delta_ms` milliseconds.
    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    /// Sets the wall clock to an absolute epoch time.
    pub fn set(&self, now_ms: EpochMillis) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn epoch_millis(&self) -> EpochMillis {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn monotonic(&self) -> Instant {
        Instant::now()
    }
}
