//! Stored Entry
//!
//! A single key-value record inside a shard. The entry does not store the
//! key; the key is owned by the shard's map. Entries are not internally
//! synchronized; the shard mutex covers them.

use bytes::Bytes;

use crate::clock::EpochMillis;

/// Fixed per-entry bookkeeping estimate added on top of key and value
/// bytes when charging the memory budget: map slot, recency node, TTL
/// bindings.
pub const ENTRY_OVERHEAD: usize = 64;

/// Bytes charged against the memory budget for one entry.
///
/// The same formula must be used at write and release time so the memory
/// counter stays balanced.
#[inline]
pub fn charge_for(key: &[u8], value: &[u8]) -> usize {
    key.len() + value.len() + ENTRY_OVERHEAD
}

/// A stored value with creation timestamp and optional expiry deadline.
///
/// `expire_at == 0` means the entry never expires; otherwise `expire_at`
/// is an absolute epoch-millisecond deadline and is never earlier than
/// `created_at`.
#[derive(Debug, Clone)]
pub struct Entry {
    value: Bytes,
    created_at: EpochMillis,
    expire_at: EpochMillis,
}

impl Entry {
    /// Creates a non-expiring entry.
    pub fn new(value: Bytes, created_at: EpochMillis) -> Self {
        Self {
            value,
            created_at,
            expire_at: 0,
        }
    }

    /// Creates an entry with an absolute expiry deadline.
    pub fn with_deadline(value: Bytes, created_at: EpochMillis, expire_at: EpochMillis) -> Self {
        debug_assert!(expire_at == 0 || expire_at >= created_at);
        Self {
            value,
            created_at,
            expire_at,
        }
    }

    /// The stored value.
    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Returns true if an expiry deadline is configured.
    pub fn has_ttl(&self) -> bool {
        self.expire_at != 0
    }

    /// The expiry deadline, or 0 when none is configured.
    pub fn expire_at(&self) -> EpochMillis {
        self.expire_at
    }

    /// When this entry was last written.
    pub fn created_at(&self) -> EpochMillis {
        self.created_at
    }

    /// Returns true if the deadline has passed at `now`.
    #[inline]
    pub fn is_expired(&self, now: EpochMillis) -> bool {
        self.expire_at != 0 && now >= self.expire_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_without_ttl_never_expires() {
        let entry = Entry::new(Bytes::from("v"), 1_000);
        assert!(!entry.has_ttl());
        assert!(!entry.is_expired(u64::MAX));
    }

    #[test]
    fn test_entry_expires_at_deadline() {
        let entry = Entry::with_deadline(Bytes::from("v"), 1_000, 1_500);
        assert!(entry.has_ttl());
        assert!(!entry.is_expired(1_499));
        assert!(entry.is_expired(1_500));
        assert!(entry.is_expired(2_000));
    }

    #[test]
    fn test_charge_is_key_plus_value_plus_overhead() {
        assert_eq!(charge_for(b"abc", b"hello"), 3 + 5 + ENTRY_OVERHEAD);
        assert_eq!(charge_for(b"", b""), ENTRY_OVERHEAD);
    }
}
