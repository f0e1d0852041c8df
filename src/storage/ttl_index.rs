//! TTL Index
//!
//! Time-ordered expiration tracking: a sorted bucket map from expiry
//! deadline to the keys due at that deadline, plus a reverse map from key
//! to its current deadline. The index holds key copies only; the shard (or
//! the engine) performs the actual deletions.
//!
//! Two instances exist per spirit: each shard owns a local index covering
//! its own keys, and the engine owns a global index covering the whole
//! keyspace. Neither is internally synchronized; the shard index lives
//! under the shard mutex and the global index under its own mutex.

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;

use crate::clock::EpochMillis;

/// Maps `expire_at -> keys` with a reverse `key -> expire_at`.
///
/// Both directions stay consistent after every mutation: a key is bound to
/// at most one deadline, and every bucket member has a matching reverse
/// entry.
#[derive(Debug, Default)]
pub struct TtlIndex {
    /// Deadline buckets in ascending order; keys keep insertion order
    /// within a bucket.
    buckets: BTreeMap<EpochMillis, Vec<Bytes>>,
    /// Reverse binding used for O(1) lookup on remove.
    deadlines: HashMap<Bytes, EpochMillis>,
}

impl TtlIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `key` to `expire_at`, replacing any prior binding.
    pub fn upsert(&mut self, key: Bytes, expire_at: EpochMillis) {
        self.remove(&key);

        self.buckets.entry(expire_at).or_default().push(key.clone());
        self.deadlines.insert(key, expire_at);
    }

    /// Drops the binding for `key`. No-op if absent.
    ///
    /// The bucket scan is linear; buckets are typically small because they
    /// only group keys sharing an exact millisecond deadline.
    pub fn remove(&mut self, key: &Bytes) {
        let Some(expire_at) = self.deadlines.remove(key) else {
            return;
        };

        if let Some(bucket) = self.buckets.get_mut(&expire_at) {
            if let Some(pos) = bucket.iter().position(|k| k == key) {
                bucket.remove(pos);
            }
            if bucket.is_empty() {
                self.buckets.remove(&expire_at);
            }
        }
    }

    /// Removes and returns every key whose deadline is at or before `now`,
    /// in ascending deadline order.
    pub fn collect_expired(&mut self, now: EpochMillis) -> Vec<Bytes> {
        let still_pending = self.buckets.split_off(&now.saturating_add(1));
        let due = std::mem::replace(&mut self.buckets, still_pending);

        let mut expired = Vec::new();
        for (_, bucket) in due {
            for key in bucket {
                self.deadlines.remove(&key);
                expired.push(key);
            }
        }
        expired
    }

    /// Number of keys with a TTL binding.
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    /// Returns true if no key has a TTL binding.
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Current deadline for `key`, if bound.
    pub fn deadline(&self, key: &Bytes) -> Option<EpochMillis> {
        self.deadlines.get(key).copied()
    }
}
