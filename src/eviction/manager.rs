//! Eviction Manager
//!
//! Coordinates the eviction policy with the memory budget. The manager
//! observes every read, write, and delete, keeps a per-key ledger of the
//! bytes charged at write time, and produces victim lists when the budget
//! is exceeded.
//!
//! ## Side-effect boundary
//!
//! The manager never mutates shard state. Its output is an advisory victim
//! list; the engine performs the destructive deletes and keeps the global
//! TTL index in step. Releasing a victim's charge happens here, as the
//! victim is popped, so the drain loop terminates exactly when enough
//! bytes have been reclaimed; the engine does not release again for those
//! keys.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::eviction::memory::MemoryTracker;
use crate::eviction::policy::EvictionPolicy;

struct PolicyState {
    policy: Box<dyn EvictionPolicy>,
    /// Bytes charged per live key, recorded at write time and released
    /// exactly once on whichever removal path fires first.
    charges: HashMap<Bytes, usize>,
}

/// Tracks access patterns and selects eviction victims under memory
/// pressure.
pub struct EvictionManager {
    memory: Arc<MemoryTracker>,
    state: Mutex<PolicyState>,
}

impl EvictionManager {
    /// Creates a manager over the given policy and memory tracker.
    pub fn new(policy: Box<dyn EvictionPolicy>, memory: Arc<MemoryTracker>) -> Self {
        Self {
            memory,
            state: Mutex::new(PolicyState {
                policy,
                charges: HashMap::new(),
            }),
        }
    }

    /// A key was read; refresh its standing in the policy.
    pub fn on_read(&self, key: &Bytes) {
        self.state.lock().policy.on_read(key);
    }

    /// A key was written. Records `charge` bytes against the budget,
    /// releasing any prior charge for the same key first (overwrite).
    pub fn on_write(&self, key: &Bytes, charge: usize) {
        let mut state = self.state.lock();
        if let Some(prior) = state.charges.insert(key.clone(), charge) {
            self.memory.release(prior);
        }
        self.memory.reserve(charge);
        state.policy.on_write(key);
    }

    /// A key was removed. Releases its recorded charge and drops it from
    /// the policy. Unknown keys are tolerated; removal races between the
    /// sweeper, eviction, and explicit deletes are benign.
    pub fn on_delete(&self, key: &Bytes) {
        let mut state = self.state.lock();
        if let Some(charge) = state.charges.remove(key) {
            self.memory.release(charge);
        }
        state.policy.on_delete(key);
    }

    /// Pops victims until the budget is respected or the policy runs dry.
    ///
    /// Each victim's recorded charge is released as it is popped. Returns
    /// the victim list for the engine to delete; a partial list means
    /// pressure persists and will be retried on the next trigger.
    pub fn collect_victims(&self) -> Vec<Bytes> {
        let mut state = self.state.lock();
        let mut victims = Vec::new();

        while self.memory.is_over_limit() {
            let Some(victim) = state.policy.select_victim() else {
                break;
            };
            if let Some(charge) = state.charges.remove(&victim) {
                self.memory.release(charge);
            }
            victims.push(victim);
        }

        victims
    }

    /// Returns true while reserved bytes exceed the budget.
    pub fn is_over_limit(&self) -> bool {
        self.memory.is_over_limit()
    }

    /// Current reserved bytes.
    pub fn memory_used(&self) -> usize {
        self.memory.used()
    }

    /// Configured memory ceiling.
    pub fn memory_limit(&self) -> usize {
        self.memory.max_bytes()
    }

    /// Number of keys the policy currently tracks.
    pub fn tracked_keys(&self) -> usize {
        self.state.lock().policy.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eviction::policy::{LruPolicy, NoopPolicy};

    fn key(s: &str) -> Bytes {
        Bytes::from(s.to_string())
    }

    fn manager_with_limit(max_bytes: usize) -> EvictionManager {
        EvictionManager::new(
            Box::new(LruPolicy::new()),
            Arc::new(MemoryTracker::new(max_bytes)),
        )
    }

    #[test]
    fn test_write_reserves_and_delete_releases() {
        let manager = manager_with_limit(1000);

        manager.on_write(&key("a"), 100);
        assert_eq!(manager.memory_used(), 100);

        manager.on_delete(&key("a"));
        assert_eq!(manager.memory_used(), 0);
        assert_eq!(manager.tracked_keys(), 0);
    }

    #[test]
    fn test_overwrite_releases_prior_charge() {
        let manager = manager_with_limit(1000);

        manager.on_write(&key("a"), 100);
        manager.on_write(&key("a"), 40);

        assert_eq!(manager.memory_used(), 40);
        assert_eq!(manager.tracked_keys(), 1);
    }

    #[test]
    fn test_delete_of_unknown_key_is_noop() {
        let manager = manager_with_limit(1000);
        manager.on_delete(&key("ghost"));
        assert_eq!(manager.memory_used(), 0);
    }

    #[test]
    fn test_collect_victims_drains_until_under_limit() {
        let manager = manager_with_limit(250);

        manager.on_write(&key("a"), 100);
        manager.on_write(&key("b"), 100);
        manager.on_write(&key("c"), 100);
        assert!(manager.is_over_limit());

        let victims = manager.collect_victims();

        // Evicting the oldest key is enough to get back to 200 bytes.
        assert_eq!(victims, vec![key("a")]);
        assert!(!manager.is_over_limit());
        assert_eq!(manager.memory_used(), 200);
    }

    #[test]
    fn test_collect_victims_respects_recency() {
        let manager = manager_with_limit(150);

        manager.on_write(&key("a"), 100);
        manager.on_write(&key("b"), 100);
        // Touching "a" makes "b" the older key.
        manager.on_read(&key("a"));

        assert_eq!(manager.collect_victims(), vec![key("b")]);
    }

    #[test]
    fn test_collect_victims_partial_when_policy_runs_dry() {
        let manager = EvictionManager::new(
            Box::new(NoopPolicy),
            Arc::new(MemoryTracker::new(10)),
        );

        manager.on_write(&key("a"), 100);
        assert!(manager.is_over_limit());

        // The policy tracks nothing, so nothing can be reclaimed.
        assert!(manager.collect_victims().is_empty());
        assert!(manager.is_over_limit());
    }

    #[test]
    fn test_collect_victims_when_under_limit_is_empty() {
        let manager = manager_with_limit(1000);
        manager.on_write(&key("a"), 10);
        assert!(manager.collect_victims().is_empty());
        assert_eq!(manager.tracked_keys(), 1);
    }
}
