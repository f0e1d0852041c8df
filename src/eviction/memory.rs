//! Memory Budget Tracking
//!
//! A single atomic counter of reserved bytes against a fixed ceiling. The
//! tracker does not inspect objects; callers report byte deltas using the
//! same size estimate at reserve and release time.
//!
//! The counter is eventually consistent under concurrency (relaxed
//! ordering, no lock); the eviction path re-checks the limit as it works,
//! so a momentarily stale read is harmless.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Tracks approximate memory usage of the engine against a fixed limit.
#[derive(Debug)]
pub struct MemoryTracker {
    max_bytes: usize,
    used_bytes: AtomicUsize,
}

impl MemoryTracker {
    /// Creates a tracker with the given ceiling in bytes.
    pub fn new(max_bytes: usize) -> Self {
        assert!(max_bytes > 0, "memory limit must be greater than zero");
        Self {
            max_bytes,
            used_bytes: AtomicUsize::new(0),
        }
    }

    /// Adds `bytes` to the counter. Returns true if usage is still within
    /// the limit after the reservation.
    pub fn reserve(&self, bytes: usize) -> bool {
        self.used_bytes.fetch_add(bytes, Ordering::Relaxed);
        !self.is_over_limit()
    }

    /// Subtracts `bytes` from the counter.
    ///
    /// # Panics
    ///
    /// Panics if the release would drive the counter negative. Reserve and
    /// release are paired one-to-one per entry, so an underflow means a
    /// double release and the accounting can no longer be trusted.
    pub fn release(&self, bytes: usize) {
        let prev = self.used_bytes.fetch_sub(bytes, Ordering::Relaxed);
        assert!(
            prev >= bytes,
            "memory tracker underflow: released {bytes} bytes with only {prev} reserved"
        );
    }

    /// Current reserved bytes.
    pub fn used(&self) -> usize {
        self.used_bytes.load(Ordering::Relaxed)
    }

    /// Configured ceiling in bytes.
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Returns true while usage exceeds the ceiling.
    pub fn is_over_limit(&self) -> bool {
        self.used() > self.max_bytes
    }
}
