//! Recency Ordering
//!
//! Tracks keys in most-recently-used order with O(1) touch, remove, and
//! pop-LRU. This structure does not store values; it only orders keys.
//!
//! ## Design
//!
//! A doubly-linked list over nodes that live in a slot arena (a `Vec` with
//! a free list), linked by index instead of pointers. A `HashMap` maps each
//! key to its slot, so every operation is a map lookup plus a constant
//! number of link updates.
//!
//! ```text
//!   index: { "a" -> 2, "b" -> 0, "c" -> 1 }
//!
//!   head ──► [slot 2: a] ◄──► [slot 0: b] ◄──► [slot 1: c] ◄── tail
//!             (MRU)                             (LRU)
//! ```
//!
//! Not internally synchronized; the enclosing component (shard or eviction
//! manager) provides mutual exclusion.

use std::collections::HashMap;

use bytes::Bytes;

#[derive(Debug)]
struct Node {
    key: Bytes,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Recency list with MRU at the front and LRU at the back.
///
/// Each key appears at most once. `touch` reports overflow against the
/// configured capacity; callers that only want ordering (the eviction
/// policy) construct the list [`unbounded`](RecencyList::unbounded) and
/// ignore the flag.
#[derive(Debug)]
pub struct RecencyList {
    capacity: usize,
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    index: HashMap<Bytes, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl RecencyList {
    /// Creates a list that reports overflow once it tracks more than
    /// `capacity` keys. Capacity must be greater than zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "recency capacity must be greater than zero");
        Self {
            capacity,
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
        }
    }

    /// Creates a list that never reports overflow.
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true if `key` is currently tracked.
    pub fn contains(&self, key: &Bytes) -> bool {
        self.index.contains_key(key)
    }

    /// Marks `key` as most recently used.
    ///
    /// Moves an existing key to the front, or inserts a new key at the
    /// front. Returns true if the insertion pushed the tracked size past
    /// capacity, in which case the caller should evict via
    /// [`pop_lru`](RecencyList::pop_lru).
    pub fn touch(&mut self, key: &Bytes) -> bool {
        if let Some(&id) = self.index.get(key) {
            self.detach(id);
            self.attach_front(id);
            return false;
        }

        let id = self.alloc(Node {
            key: key.clone(),
            prev: None,
            next: None,
        });
        self.attach_front(id);
        self.index.insert(key.clone(), id);

        self.index.len() > self.capacity
    }

    /// Stops tracking `key`. No-op if absent.
    pub fn remove(&mut self, key: &Bytes) {
        if let Some(id) = self.index.remove(key) {
            self.detach(id);
            self.release(id);
        }
    }

    /// Removes and returns the least recently used key, or `None` if the
    /// list is empty.
    pub fn pop_lru(&mut self) -> Option<Bytes> {
        let id = self.tail?;
        self.detach(id);
        let node = self.release(id);
        self.index.remove(&node.key);
        Some(node.key)
    }

    fn alloc(&mut self, node: Node) -> usize {
        match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, id: usize) -> Node {
        let node = self.slots[id].take().expect("releasing a vacant slot");
        self.free.push(id);
        node
    }

    fn node(&self, id: usize) -> &Node {
        self.slots[id].as_ref().expect("accessing a vacant slot")
    }

    fn node_mut(&mut self, id: usize) -> &mut Node {
        self.slots[id].as_mut().expect("accessing a vacant slot")
    }

    /// Unlinks `id` from its neighbors and from head/tail.
    fn detach(&mut self, id: usize) {
        let (prev, next) = {
            let node = self.node(id);
            (node.prev, node.next)
        };

        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }

        let node = self.node_mut(id);
        node.prev = None;
        node.next = None;
    }

    /// Links `id` in as the new head.
    fn attach_front(&mut self, id: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(id);
            node.prev = None;
            node.next = old_head;
        }
        if let Some(h) = old_head {
            self.node_mut(h).prev = Some(id);
        }
        self.head = Some(id);
        if self.tail.is_none() {
            self.tail = Some(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Bytes {
        Bytes::from(s.to_string())
    }

    /// Drains the list from LRU to MRU.
    fn drain_lru_order(list: &mut RecencyList) -> Vec<Bytes> {
        let mut keys = Vec::new();
        while let Some(k) = list.pop_lru() {
            keys.push(k);
        }
        keys
    }

    #[test]
    fn test_touch_inserts_at_front() {
        let mut list = RecencyList::unbounded();
        assert!(!list.touch(&key("a")));
        assert!(!list.touch(&key("b")));
        assert!(!list.touch(&key("c")));

        assert_eq!(list.len(), 3);
        assert_eq!(drain_lru_order(&mut list), vec![key("a"), key("b"), key("c")]);
    }

    #[test]
    fn test_touch_moves_existing_to_front() {
        let mut list = RecencyList::unbounded();
        list.touch(&key("a"));
        list.touch(&key("b"));
        list.touch(&key("c"));

        // "a" becomes MRU, "b" becomes LRU.
        list.touch(&key("a"));

        assert_eq!(list.len(), 3);
        assert_eq!(drain_lru_order(&mut list), vec![key("b"), key("c"), key("a")]);
    }

    #[test]
    fn test_touch_reports_overflow_past_capacity() {
        let mut list = RecencyList::new(2);
        assert!(!list.touch(&key("a")));
        assert!(!list.touch(&key("b")));
        assert!(list.touch(&key("c")));

        // Re-touching an existing key never overflows.
        assert!(!list.touch(&key("b")));
    }

    #[test]
    fn test_remove_is_noop_for_absent_key() {
        let mut list = RecencyList::unbounded();
        list.touch(&key("a"));
        list.remove(&key("missing"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_remove_head_middle_tail() {
        let mut list = RecencyList::unbounded();
        for k in ["a", "b", "c", "d"] {
            list.touch(&key(k));
        }

        list.remove(&key("d")); // head
        list.remove(&key("b")); // middle
        list.remove(&key("a")); // tail

        assert_eq!(drain_lru_order(&mut list), vec![key("c")]);
        assert!(list.is_empty());
    }

    #[test]
    fn test_pop_lru_on_empty_returns_none() {
        let mut list = RecencyList::unbounded();
        assert_eq!(list.pop_lru(), None);
    }

    #[test]
    fn test_key_appears_at_most_once() {
        let mut list = RecencyList::unbounded();
        for _ in 0..5 {
            list.touch(&key("a"));
        }
        assert_eq!(list.len(), 1);
        assert_eq!(list.pop_lru(), Some(key("a")));
        assert_eq!(list.pop_lru(), None);
    }

    #[test]
    fn test_slots_are_reused_after_removal() {
        let mut list = RecencyList::unbounded();
        for i in 0..100 {
            list.touch(&Bytes::from(format!("k{i}")));
        }
        for i in 0..100 {
            list.remove(&Bytes::from(format!("k{i}")));
        }
        for i in 0..100 {
            list.touch(&Bytes::from(format!("r{i}")));
        }

        // All freed slots were recycled; the arena did not grow.
        assert_eq!(list.slots.len(), 100);
        assert_eq!(list.len(), 100);
    }
}
