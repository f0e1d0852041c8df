//! Eviction Policies
//!
//! A policy observes key accesses and, when asked, names the next victim.
//! Policies track keys only; they never own entry data and never touch
//! shards. The eviction manager serializes all calls, so implementations
//! need no internal locking.

use bytes::Bytes;

use crate::config::EvictionPolicyKind;
use crate::storage::recency::RecencyList;

/// Capability set every eviction policy provides.
///
/// The engine holds one boxed policy selected at construction. The
/// recency-ordered variant is the default; frequency-ordered or random
/// variants fit the same surface.
pub trait EvictionPolicy: Send {
    /// A key was read.
    fn on_read(&mut self, key: &Bytes);

    /// A key was written (created or overwritten).
    fn on_write(&mut self, key: &Bytes);

    /// A key was removed (deleted, expired, or evicted elsewhere).
    fn on_delete(&mut self, key: &Bytes);

    /// Removes and returns the next eviction victim, or `None` when the
    /// policy tracks no keys.
    fn select_victim(&mut self) -> Option<Bytes>;

    /// Number of tracked keys.
    fn len(&self) -> usize;

    /// Returns true when no keys are tracked.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Recency-ordered policy: reads and writes both count as a touch, and the
/// least recently used key is evicted first.
#[derive(Debug)]
pub struct LruPolicy {
    recency: RecencyList,
}

impl LruPolicy {
    pub fn new() -> Self {
        Self {
            recency: RecencyList::unbounded(),
        }
    }
}

impl Default for LruPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl EvictionPolicy for LruPolicy {
    fn on_read(&mut self, key: &Bytes) {
        self.recency.touch(key);
    }

    fn on_write(&mut self, key: &Bytes) {
        self.recency.touch(key);
    }

    fn on_delete(&mut self, key: &Bytes) {
        self.recency.remove(key);
    }

    fn select_victim(&mut self) -> Option<Bytes> {
        self.recency.pop_lru()
    }

    fn len(&self) -> usize {
        self.recency.len()
    }
}

/// Policy that never evicts. Under sustained pressure the engine keeps
/// accepting writes and logs; useful when the operator prefers growth over
/// data loss.
#[derive(Debug, Default)]
pub struct NoopPolicy;

impl EvictionPolicy for NoopPolicy {
    fn on_read(&mut self, _key: &Bytes) {}

    fn on_write(&mut self, _key: &Bytes) {}

    fn on_delete(&mut self, _key: &Bytes) {}

    fn select_victim(&mut self) -> Option<Bytes> {
        None
    }

    fn len(&self) -> usize {
        0
    }
}

/// Builds the policy selected in the configuration.
pub fn build_policy(kind: EvictionPolicyKind) -> Box<dyn EvictionPolicy> {
    match kind {
        EvictionPolicyKind::Lru => Box::new(LruPolicy::new()),
        EvictionPolicyKind::None => Box::new(NoopPolicy),
    }
}
