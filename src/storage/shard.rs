//! Sharded Storage
//!
//! The keyspace is partitioned into independently locked shards so that
//! operations on different keys rarely contend. Each shard owns its
//! entries, a recency list, and a local TTL index, all guarded by one
//! mutex; within a shard operations are linearizable, across shards there
//! is no global order.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        ShardSet                          │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐      ┌─────────┐    │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ ...  │ Shard N │    │
//! │  │ Mutex   │ │ Mutex   │ │ Mutex   │      │ Mutex   │    │
//! │  │ entries │ │ entries │ │ entries │      │ entries │    │
//! │  │ recency │ │ recency │ │ recency │      │ recency │    │
//! │  │ ttl     │ │ ttl     │ │ ttl     │      │ ttl     │    │
//! │  └─────────┘ └─────────┘ └─────────┘      └─────────┘    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! A shard never reaches outside itself: overflow evictions and lazy
//! expiries are reported back to the caller through [`SetOutcome`] and
//! [`GetOutcome`] so the engine can keep the global TTL index and the
//! eviction ledger in step.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::Hasher;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::clock::EpochMillis;
use crate::storage::entry::Entry;
use crate::storage::recency::RecencyList;
use crate::storage::ttl_index::TtlIndex;

/// What a write did beyond installing the entry.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SetOutcome {
    /// Key evicted by the shard's capacity cap, if the write overflowed.
    pub evicted: Option<Bytes>,
}

/// What a read observed.
#[derive(Debug, PartialEq, Eq)]
pub enum GetOutcome {
    /// Live entry; the value is a cheap clone.
    Hit(Bytes),
    /// No entry for the key.
    Miss,
    /// The entry had expired and was removed on access. Observationally a
    /// miss, but the caller must release its accounting.
    Expired,
}

struct ShardInner {
    entries: HashMap<Bytes, Entry>,
    recency: RecencyList,
    ttl: TtlIndex,
}

/// One locked partition of the keyspace.
///
/// Invariants, maintained under the mutex:
/// - the recency list tracks exactly the keys in the entry map;
/// - every key in the local TTL index is present in the entry map;
/// - the entry map never exceeds the capacity cap after a write returns.
pub struct Shard {
    capacity: usize,
    inner: Mutex<ShardInner>,
}

impl Shard {
    /// Creates an empty shard holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "shard capacity must be greater than zero");
        Self {
            capacity,
            inner: Mutex::new(ShardInner {
                entries: HashMap::new(),
                recency: RecencyList::new(capacity),
                ttl: TtlIndex::new(),
            }),
        }
    }

    /// Inserts or overwrites `key` without a TTL.
    pub fn set(&self, key: Bytes, value: Bytes, now: EpochMillis) -> SetOutcome {
        let mut inner = self.inner.lock();

        inner.entries.insert(key.clone(), Entry::new(value, now));
        let overflow = inner.recency.touch(&key);
        // A plain write clears any TTL left by a previous write.
        inner.ttl.remove(&key);

        Self::finish_write(&mut inner, overflow)
    }

    /// Inserts or overwrites `key` with an absolute expiry deadline.
    pub fn set_with_ttl(
        &self,
        key: Bytes,
        value: Bytes,
        now: EpochMillis,
        expire_at: EpochMillis,
    ) -> SetOutcome {
        let mut inner = self.inner.lock();

        inner
            .entries
            .insert(key.clone(), Entry::with_deadline(value, now, expire_at));
        let overflow = inner.recency.touch(&key);
        inner.ttl.upsert(key, expire_at);

        Self::finish_write(&mut inner, overflow)
    }

    fn finish_write(inner: &mut ShardInner, overflow: bool) -> SetOutcome {
        if !overflow {
            return SetOutcome::default();
        }

        // Capacity exceeded: drop the least recently used key. The victim
        // is never the key just written, which sits at the front.
        let victim = inner.recency.pop_lru();
        if let Some(victim) = &victim {
            inner.entries.remove(victim);
            inner.ttl.remove(victim);
        }
        SetOutcome { evicted: victim }
    }

    /// Looks up `key`, expiring it lazily if its deadline has passed.
    pub fn get(&self, key: &Bytes, now: EpochMillis) -> GetOutcome {
        let mut inner = self.inner.lock();

        let Some(entry) = inner.entries.get(key) else {
            return GetOutcome::Miss;
        };

        if entry.is_expired(now) {
            inner.entries.remove(key);
            inner.recency.remove(key);
            inner.ttl.remove(key);
            return GetOutcome::Expired;
        }

        let value = entry.value().clone();
        inner.recency.touch(key);
        GetOutcome::Hit(value)
    }

    /// Removes `key`. Returns whether it was present.
    pub fn remove(&self, key: &Bytes) -> bool {
        let mut inner = self.inner.lock();

        let present = inner.entries.remove(key).is_some();
        inner.recency.remove(key);
        inner.ttl.remove(key);
        present
    }

    /// Removes every locally tracked key whose deadline is at or before
    /// `now` and returns them.
    pub fn cleanup_expired(&self, now: EpochMillis) -> Vec<Bytes> {
        let mut inner = self.inner.lock();

        let expired = inner.ttl.collect_expired(now);
        for key in &expired {
            inner.entries.remove(key);
            inner.recency.remove(key);
        }
        expired
    }

    /// Snapshot of the entry count.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Returns true if the shard holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn invariants_hold(&self) -> bool {
        let inner = self.inner.lock();
        inner.entries.len() <= self.capacity
            && inner.entries.len() == inner.recency.len()
            && inner.entries.keys().all(|k| inner.recency.contains(k))
            && inner.entries.len() >= inner.ttl.len()
    }
}

/// Hash-partitioned fan-out across the shards.
///
/// Routing masks a 64-bit hash of the key bytes, so the shard count must
/// be a power of two (validated by the configuration).
pub struct ShardSet {
    shards: Vec<Shard>,
    mask: u64,
}

impl ShardSet {
    /// Creates `shard_count` shards of `shard_capacity` entries each.
    pub fn new(shard_count: usize, shard_capacity: usize) -> Self {
        assert!(
            shard_count > 0 && shard_count.is_power_of_two(),
            "shard count must be a positive power of two"
        );

        let shards = (0..shard_count).map(|_| Shard::new(shard_capacity)).collect();
        Self {
            shards,
            mask: (shard_count - 1) as u64,
        }
    }

    /// The shard owning `key`.
    #[inline]
    pub fn shard_for(&self, key: &[u8]) -> &Shard {
        let mut hasher = DefaultHasher::new();
        hasher.write(key);
        let index = (hasher.finish() & self.mask) as usize;
        &self.shards[index]
    }

    /// Runs a local TTL sweep on every shard, in index order, and returns
    /// all removed keys.
    pub fn cleanup_expired(&self, now: EpochMillis) -> Vec<Bytes> {
        let mut removed = Vec::new();
        for shard in &self.shards {
            removed.extend(shard.cleanup_expired(now));
        }
        removed
    }

    /// Total entries across all shards. Each shard is snapshotted in turn,
    /// so the sum is approximate under concurrent writes.
    pub fn len(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }

    /// Returns true if no shard holds an entry.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(Shard::is_empty)
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Bytes {
        Bytes::from(s.to_string())
    }

    fn value(s: &str) -> Bytes {
        Bytes::from(s.to_string())
    }

    #[test]
    fn test_set_then_get() {
        let shard = Shard::new(16);
        shard.set(key("a"), value("hello"), 100);

        assert_eq!(shard.get(&key("a"), 100), GetOutcome::Hit(value("hello")));
        assert_eq!(shard.get(&key("zz"), 100), GetOutcome::Miss);
        assert!(shard.invariants_hold());
    }

    #[test]
    fn test_overwrite_replaces_value() {
        let shard = Shard::new(16);
        shard.set(key("a"), value("v1"), 100);
        shard.set(key("a"), value("v2"), 200);

        assert_eq!(shard.len(), 1);
        assert_eq!(shard.get(&key("a"), 200), GetOutcome::Hit(value("v2")));
    }

    #[test]
    fn test_get_expires_lazily() {
        let shard = Shard::new(16);
        shard.set_with_ttl(key("a"), value("v"), 100, 150);

        assert_eq!(shard.get(&key("a"), 149), GetOutcome::Hit(value("v")));
        assert_eq!(shard.get(&key("a"), 150), GetOutcome::Expired);
        // Once expired-and-removed, further reads are plain misses.
        assert_eq!(shard.get(&key("a"), 151), GetOutcome::Miss);
        assert!(shard.invariants_hold());
    }

    #[test]
    fn test_plain_set_clears_prior_ttl() {
        let shard = Shard::new(16);
        shard.set_with_ttl(key("a"), value("v1"), 100, 150);
        shard.set(key("a"), value("v2"), 120);

        // The deadline from the first write no longer applies.
        assert_eq!(shard.get(&key("a"), 1_000), GetOutcome::Hit(value("v2")));
        assert!(shard.cleanup_expired(1_000).is_empty());
    }

    #[test]
    fn test_capacity_overflow_evicts_lru() {
        let shard = Shard::new(2);
        assert_eq!(shard.set(key("a"), value("1"), 0), SetOutcome::default());
        assert_eq!(shard.set(key("b"), value("1"), 0), SetOutcome::default());

        // "a" is refreshed, so inserting "c" must evict "b".
        shard.get(&key("a"), 0);
        let outcome = shard.set(key("c"), value("1"), 0);
        assert_eq!(outcome.evicted, Some(key("b")));

        assert_eq!(shard.get(&key("b"), 0), GetOutcome::Miss);
        assert_eq!(shard.get(&key("a"), 0), GetOutcome::Hit(value("1")));
        assert_eq!(shard.get(&key("c"), 0), GetOutcome::Hit(value("1")));
        assert!(shard.invariants_hold());
    }

    #[test]
    fn test_overflow_victim_leaves_no_ttl_binding() {
        let shard = Shard::new(1);
        shard.set_with_ttl(key("a"), value("1"), 0, 100);
        let outcome = shard.set(key("b"), value("1"), 0);
        assert_eq!(outcome.evicted, Some(key("a")));

        // The victim's deadline must not resurface in a local sweep.
        assert!(shard.cleanup_expired(1_000).is_empty());
        assert!(shard.invariants_hold());
    }

    #[test]
    fn test_remove_reports_presence() {
        let shard = Shard::new(16);
        shard.set(key("a"), value("v"), 0);

        assert!(shard.remove(&key("a")));
        assert!(!shard.remove(&key("a")));
        assert_eq!(shard.get(&key("a"), 0), GetOutcome::Miss);
    }

    #[test]
    fn test_cleanup_expired_removes_due_keys_only() {
        let shard = Shard::new(16);
        shard.set_with_ttl(key("a"), value("1"), 0, 100);
        shard.set_with_ttl(key("b"), value("1"), 0, 200);
        shard.set(key("c"), value("1"), 0);

        let removed = shard.cleanup_expired(100);
        assert_eq!(removed, vec![key("a")]);
        assert_eq!(shard.len(), 2);
        assert!(shard.invariants_hold());
    }

    #[test]
    fn test_shard_set_routes_consistently() {
        let set = ShardSet::new(8, 16);
        for i in 0..100 {
            let k = Bytes::from(format!("key-{i}"));
            // The same key must land on the same shard every time.
            let first = set.shard_for(&k) as *const Shard;
            let second = set.shard_for(&k) as *const Shard;
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_shard_set_spreads_keys() {
        let set = ShardSet::new(8, 1024);
        for i in 0..1_000 {
            let k = Bytes::from(format!("key-{i}"));
            set.shard_for(&k).set(k.clone(), value("v"), 0);
        }

        assert_eq!(set.len(), 1_000);
        // With 1000 keys over 8 shards, every shard should see traffic.
        assert!(set.shards.iter().all(|s| !s.is_empty()));
    }

    #[test]
    fn test_shard_set_cleanup_covers_all_shards() {
        let set = ShardSet::new(4, 1024);
        for i in 0..100 {
            let k = Bytes::from(format!("key-{i}"));
            set.shard_for(&k).set_with_ttl(k.clone(), value("v"), 0, 50);
        }

        let removed = set.cleanup_expired(50);
        assert_eq!(removed.len(), 100);
        assert!(set.is_empty());
    }

    #[test]
    fn test_single_shard_set_behaves() {
        let set = ShardSet::new(1, 4);
        set.shard_for(b"a").set(key("a"), value("v"), 0);
        assert_eq!(set.shard_count(), 1);
        assert_eq!(set.len(), 1);
    }
}
