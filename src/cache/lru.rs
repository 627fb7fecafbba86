//! LRU Table Module
//!
//! Fixed-capacity key-value table with least recently used eviction.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use crate::error::{CacheError, Result};

/// Index into the node arena.
type NodeIndex = usize;

/// Sentinel for a missing link.
const NIL: NodeIndex = usize::MAX;

// == LRU Node ==
/// Arena node threaded into the recency list.
#[derive(Debug, Clone)]
struct LruNode<K, V> {
    key: K,
    value: V,
    /// Next more recently used node
    prev: NodeIndex,
    /// Next less recently used node
    next: NodeIndex,
}

// == LRU Table ==
/// A bounded key-value table with O(1) get, put and delete.
///
/// Nodes live in a flat arena and link to each other by index:
/// - `head` = most recently used
/// - `tail` = least recently used
///
/// Slots freed by deletion or eviction go on a free list and are reused by
/// later insertions. Every key in `index` has exactly one live node in the
/// recency list, and every live node has exactly one key in `index`.
#[derive(Debug, Clone)]
pub struct LruTable<K, V> {
    /// Node storage; `None` marks a free slot
    slots: Vec<Option<LruNode<K, V>>>,
    /// Indices of free slots
    free: Vec<NodeIndex>,
    /// Key to node lookup
    index: HashMap<K, NodeIndex>,
    head: NodeIndex,
    tail: NodeIndex,
    capacity: usize,
    /// Number of entries dropped to make room
    evictions: u64,
}

impl<K, V> LruTable<K, V>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates an empty table holding at most `capacity` entries.
    ///
    /// Fails with `CapacityMisconfiguration` when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::CapacityMisconfiguration(capacity));
        }

        Ok(Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: NIL,
            tail: NIL,
            capacity,
            evictions: 0,
        })
    }

    // == Get ==
    /// Returns the value for `key` and marks it most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.promote(idx);
        self.slots[idx].as_ref().map(|node| &node.value)
    }

    // == Peek ==
    /// Returns the value for `key` without touching recency.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.slots[idx].as_ref().map(|node| &node.value)
    }

    // == Put ==
    /// Inserts or overwrites `key`, leaving it most recently used.
    ///
    /// When a new key arrives at capacity, the least recently used entry is
    /// evicted first and returned.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&idx) = self.index.get(&key) {
            if let Some(node) = self.slots[idx].as_mut() {
                node.value = value;
            }
            self.promote(idx);
            return None;
        }

        let evicted = if self.index.len() >= self.capacity {
            self.evict_lru()
        } else {
            None
        };

        let idx = self.alloc(LruNode {
            key: key.clone(),
            value,
            prev: NIL,
            next: NIL,
        });
        self.index.insert(key, idx);
        self.push_front(idx);

        evicted
    }

    // == Delete ==
    /// Removes `key`, returning its value. Absent keys are a no-op.
    pub fn delete<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.index.remove(key)?;
        self.unlink(idx);
        self.release(idx).map(|node| node.value)
    }

    // == Clear ==
    /// Drops every entry. The eviction counter is kept.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    /// Checks membership without touching recency.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total entries evicted since construction.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Keys ordered from most to least recently used. Walks the whole list.
    pub fn keys_by_recency(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.index.len());
        let mut idx = self.head;
        while idx != NIL {
            match self.slots[idx].as_ref() {
                Some(node) => {
                    keys.push(node.key.clone());
                    idx = node.next;
                }
                None => break,
            }
        }
        keys
    }

    // == Node Management ==
    fn alloc(&mut self, node: LruNode<K, V>) -> NodeIndex {
        if let Some(idx) = self.free.pop() {
            self.slots[idx] = Some(node);
            idx
        } else {
            self.slots.push(Some(node));
            self.slots.len() - 1
        }
    }

    fn release(&mut self, idx: NodeIndex) -> Option<LruNode<K, V>> {
        let node = self.slots[idx].take();
        if node.is_some() {
            self.free.push(idx);
        }
        node
    }

    fn evict_lru(&mut self) -> Option<(K, V)> {
        if self.tail == NIL {
            return None;
        }

        let idx = self.tail;
        self.unlink(idx);
        let node = self.release(idx)?;
        self.index.remove(&node.key);
        self.evictions += 1;

        Some((node.key, node.value))
    }

    // == Linked List Operations ==
    fn links(&self, idx: NodeIndex) -> (NodeIndex, NodeIndex) {
        self.slots[idx]
            .as_ref()
            .map_or((NIL, NIL), |node| (node.prev, node.next))
    }

    fn set_prev(&mut self, idx: NodeIndex, prev: NodeIndex) {
        if let Some(node) = self.slots[idx].as_mut() {
            node.prev = prev;
        }
    }

    fn set_next(&mut self, idx: NodeIndex, next: NodeIndex) {
        if let Some(node) = self.slots[idx].as_mut() {
            node.next = next;
        }
    }

    fn unlink(&mut self, idx: NodeIndex) {
        let (prev, next) = self.links(idx);

        if prev == NIL {
            self.head = next;
        } else {
            self.set_next(prev, next);
        }

        if next == NIL {
            self.tail = prev;
        } else {
            self.set_prev(next, prev);
        }

        self.set_prev(idx, NIL);
        self.set_next(idx, NIL);
    }

    fn push_front(&mut self, idx: NodeIndex) {
        let old_head = self.head;
        self.set_prev(idx, NIL);
        self.set_next(idx, old_head);

        if old_head == NIL {
            self.tail = idx;
        } else {
            self.set_prev(old_head, idx);
        }
        self.head = idx;
    }

    fn promote(&mut self, idx: NodeIndex) {
        if self.head != idx {
            self.unlink(idx);
            self.push_front(idx);
        }
    }

    /// Verifies that the key map and the recency list agree.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let mut forward = 0;
        let mut prev = NIL;
        let mut idx = self.head;
        while idx != NIL {
            let node = self.slots[idx].as_ref().expect("linked slot must be live");
            assert_eq!(node.prev, prev, "broken back link at slot {idx}");
            assert_eq!(self.index.get(&node.key), Some(&idx), "index disagrees with list");
            forward += 1;
            assert!(forward <= self.index.len(), "recency list has a cycle");
            prev = idx;
            idx = node.next;
        }

        assert_eq!(prev, self.tail, "tail does not end the list");
        assert_eq!(forward, self.index.len(), "list and index sizes differ");
        assert_eq!(
            self.free.len() + self.index.len(),
            self.slots.len(),
            "leaked arena slots"
        );
        assert!(self.index.len() <= self.capacity);
    }
}
