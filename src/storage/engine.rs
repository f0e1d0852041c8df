//! Key-Value Engine
//!
//! The orchestration layer that composes the sharded store, the global TTL
//! index, and the eviction manager, and enforces the invariants that cross
//! subsystem boundaries. This is the surface the network layer calls.
//!
//! ## Architecture
//!
//! ```text
//!                         ┌──────────────┐
//!        set/get/delete   │    Engine    │   process_expired (sweeper)
//!       ─────────────────►│              │◄──────────────────────────
//!                         └──────┬───────┘
//!                ┌───────────────┼───────────────────┐
//!                ▼               ▼                   ▼
//!         ┌────────────┐  ┌─────────────┐   ┌─────────────────┐
//!         │  ShardSet  │  │  TtlIndex   │   │ EvictionManager │
//!         │ (N shards) │  │  (global,   │   │ (policy + byte  │
//!         │            │  │   mutex)    │   │  ledger)        │
//!         └────────────┘  └─────────────┘   └─────────────────┘
//! ```
//!
//! ## Ordering
//!
//! Writes and deletes update the shard first, then the global TTL index,
//! then the eviction manager. A concurrent reader therefore never observes
//! a value for a key the global index already considers reclaimed; the
//! index momentarily lagging the shard is resolved by the shard's own
//! expiry check on read.
//!
//! ## Reclamation
//!
//! Three mutators converge on the keyspace: client operations, the TTL
//! sweep, and eviction. Only shards mutate their own entry maps; the
//! sweeper and the eviction manager produce key lists that the engine
//! turns into routed shard deletions. A sweep or eviction hitting a key
//! that is already gone is silently tolerated.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{KvError, KvResult};
use crate::eviction::policy::build_policy;
use crate::eviction::{EvictionManager, MemoryTracker};
use crate::storage::entry::charge_for;
use crate::storage::shard::{GetOutcome, ShardSet};
use crate::storage::ttl_index::TtlIndex;

/// The public key-value engine.
///
/// Cheap to share behind an `Arc`; every method takes `&self` and the
/// engine itself holds no lock across subsystem boundaries.
///
/// # Example
///
/// ```
/// use kvmemo::config::Config;
/// use kvmemo::storage::Engine;
/// use bytes::Bytes;
///
/// let engine = Engine::new(&Config::default()).unwrap();
///
/// engine.set(Bytes::from("name"), Bytes::from("kvmemo"), None).unwrap();
/// assert_eq!(engine.get(&Bytes::from("name")), Some(Bytes::from("kvmemo")));
///
/// engine.delete(&Bytes::from("name"));
/// assert_eq!(engine.get(&Bytes::from("name")), None);
/// ```
pub struct Engine {
    shards: ShardSet,
    /// Global deadline tracking across all shards; one exclusive mutex per
    /// access, bounded because per-operation index work is a single key.
    ttl_index: Mutex<TtlIndex>,
    eviction: EvictionManager,
    clock: Arc<dyn Clock>,
    max_value_bytes: usize,
    enable_ttl: bool,
    started: std::time::Instant,
}

impl Engine {
    /// Builds an engine from a validated configuration using the system
    /// clock.
    pub fn new(config: &Config) -> KvResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Builds an engine with an injected clock. Tests use this with a
    /// manual clock to drive TTL expiry deterministically.
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> KvResult<Self> {
        config.validate()?;

        let memory = Arc::new(MemoryTracker::new(config.max_memory_bytes));
        let eviction = EvictionManager::new(build_policy(config.eviction_policy), memory);
        let started = clock.monotonic();

        Ok(Self {
            shards: ShardSet::new(config.shard_count, config.shard_capacity),
            ttl_index: Mutex::new(TtlIndex::new()),
            eviction,
            clock,
            max_value_bytes: config.max_value_bytes,
            enable_ttl: config.enable_ttl,
            started,
        })
    }

    /// Stores `key = value`, optionally expiring after `ttl_ms`
    /// milliseconds.
    ///
    /// Overwrites any previous value and clears any previous TTL binding
    /// when `ttl_ms` is `None`. Rejects oversized values, a zero TTL, and
    /// any TTL when TTL support is disabled; nothing is mutated on
    /// rejection. May trigger inline eviction when the write pushes memory
    /// usage past the budget.
    pub fn set(&self, key: Bytes, value: Bytes, ttl_ms: Option<u64>) -> KvResult<()> {
        if value.len() > self.max_value_bytes {
            return Err(KvError::invalid_argument(format!(
                "value of {} bytes exceeds max_value_bytes ({})",
                value.len(),
                self.max_value_bytes
            )));
        }

        if let Some(ttl) = ttl_ms {
            if !self.enable_ttl {
                return Err(KvError::invalid_argument("ttl support is disabled"));
            }
            if ttl == 0 {
                return Err(KvError::invalid_argument(
                    "ttl must be a positive number of milliseconds",
                ));
            }
        }

        let now = self.clock.epoch_millis();
        let charge = charge_for(&key, &value);
        let shard = self.shards.shard_for(&key);

        let outcome = match ttl_ms {
            Some(ttl) => {
                let expire_at = now.saturating_add(ttl);
                let outcome = shard.set_with_ttl(key.clone(), value, now, expire_at);
                self.ttl_index.lock().upsert(key.clone(), expire_at);
                outcome
            }
            None => {
                let outcome = shard.set(key.clone(), value, now);
                self.ttl_index.lock().remove(&key);
                outcome
            }
        };

        // A shard that overflowed its capacity cap already dropped the
        // victim locally; propagate that to the global structures.
        if let Some(victim) = outcome.evicted {
            self.ttl_index.lock().remove(&victim);
            self.eviction.on_delete(&victim);
        }

        self.eviction.on_write(&key, charge);

        if self.eviction.is_over_limit() {
            self.process_evictions();
        }

        Ok(())
    }

    /// Retrieves the value for `key`, or `None` if absent or expired.
    ///
    /// An expired key is removed on access, so a miss here is
    /// indistinguishable from the key never having existed.
    pub fn get(&self, key: &Bytes) -> Option<Bytes> {
        let now = self.clock.epoch_millis();

        match self.shards.shard_for(key).get(key, now) {
            GetOutcome::Hit(value) => {
                self.eviction.on_read(key);
                Some(value)
            }
            GetOutcome::Miss => None,
            GetOutcome::Expired => {
                self.ttl_index.lock().remove(key);
                self.eviction.on_delete(key);
                None
            }
        }
    }

    /// Deletes `key`. Deleting an absent key is a no-op.
    pub fn delete(&self, key: &Bytes) {
        self.shards.shard_for(key).remove(key);
        self.ttl_index.lock().remove(key);
        self.eviction.on_delete(key);
    }

    /// Reclaims every key whose TTL deadline has passed, driven by the
    /// global index. Called by the background sweeper.
    ///
    /// Returns the number of keys swept. Keys already gone from their
    /// shard (raced by an explicit delete or a lazy expiry) are tolerated.
    pub fn process_expired(&self) -> usize {
        let now = self.clock.epoch_millis();
        let expired = self.ttl_index.lock().collect_expired(now);
        let count = expired.len();

        for key in expired {
            self.shards.shard_for(&key).remove(&key);
            self.eviction.on_delete(&key);
        }

        if count > 0 {
            debug!(expired = count, "ttl sweep reclaimed keys");
        }
        count
    }

    /// Deletes the keys the eviction manager selected to relieve memory
    /// pressure. Returns the number of victims processed.
    ///
    /// Runs inline on `set` when a write crosses the budget. Victim
    /// charges were already released as they were selected, so only the
    /// shard state and the global TTL index are touched here.
    pub fn process_evictions(&self) -> usize {
        let victims = self.eviction.collect_victims();
        let count = victims.len();

        for key in victims {
            self.shards.shard_for(&key).remove(&key);
            self.ttl_index.lock().remove(&key);
        }

        if count > 0 {
            debug!(evicted = count, "memory pressure eviction");
        }
        if self.eviction.is_over_limit() {
            warn!(
                used = self.eviction.memory_used(),
                limit = self.eviction.memory_limit(),
                "memory pressure persists after eviction"
            );
        }
        count
    }

    /// Runs a shard-local TTL sweep without consulting the global index,
    /// then reconciles the global index and the eviction ledger with the
    /// removed keys. Returns the number of keys reclaimed.
    ///
    /// The shard-local indexes make this O(expired) per shard; it is a
    /// maintenance operation for callers that want to reclaim garbage
    /// without funneling every deadline through the global mutex.
    pub fn cleanup_expired_local(&self) -> usize {
        let now = self.clock.epoch_millis();
        let removed = self.shards.cleanup_expired(now);
        let count = removed.len();

        for key in removed {
            self.ttl_index.lock().remove(&key);
            self.eviction.on_delete(&key);
        }
        count
    }

    /// Approximate number of stored keys.
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    /// Returns true if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Bytes currently reserved against the memory budget.
    pub fn memory_used(&self) -> usize {
        self.eviction.memory_used()
    }

    /// Configured memory budget in bytes.
    pub fn memory_limit(&self) -> usize {
        self.eviction.memory_limit()
    }

    /// How long this engine has been running.
    pub fn uptime(&self) -> std::time::Duration {
        self.clock.monotonic().duration_since(self.started)
    }
}
