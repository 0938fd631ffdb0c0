//! Window cache: bounded LRU of transformed windows keyed by request.

use crate::types::{WindowData, WindowKey};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct LruNode {
    window: Arc<WindowData>,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Recency list over slab slots. `head` is the next window to evict, `tail`
/// the one read last. Vacated slots go on `free_indices` and are reused.
#[derive(Debug)]
struct LruCache {
    key_to_index: HashMap<WindowKey, usize>,
    nodes: Vec<Option<LruNode>>,
    free_indices: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    current_size_bytes: usize,
}

impl LruCache {
    fn new() -> Self {
        Self {
            key_to_index: HashMap::new(),
            nodes: Vec::new(),
            free_indices: Vec::new(),
            head: None,
            tail: None,
            current_size_bytes: 0,
        }
    }

    fn get(&mut self, key: &WindowKey) -> Option<Arc<WindowData>> {
        let &idx = self.key_to_index.get(key)?;
        let window = self.nodes[idx].as_ref()?.window.clone();
        self.move_to_tail(idx);
        Some(window)
    }

    fn contains(&self, key: &WindowKey) -> bool {
        self.key_to_index.contains_key(key)
    }

    fn remove(&mut self, key: &WindowKey) -> Option<Arc<WindowData>> {
        let idx = self.key_to_index.remove(key)?;
        self.remove_node(idx)
    }

    /// Caller removes any existing entry for the key first
    fn insert(&mut self, window: Arc<WindowData>) {
        let key = window.key.clone();
        self.current_size_bytes += window.size_bytes;

        let new_idx = self.allocate_node(LruNode {
            window,
            prev: None,
            next: None,
        });
        self.append_to_tail(new_idx);
        self.key_to_index.insert(key, new_idx);
    }

    fn evict_oldest(&mut self) -> Option<Arc<WindowData>> {
        let head_idx = self.head?;
        let key = self.nodes[head_idx].as_ref()?.window.key.clone();

        let window = self.remove_node(head_idx)?;
        self.key_to_index.remove(&key);
        Some(window)
    }

    fn len(&self) -> usize {
        self.key_to_index.len()
    }

    fn clear(&mut self) {
        self.key_to_index.clear();
        self.nodes.clear();
        self.free_indices.clear();
        self.head = None;
        self.tail = None;
        self.current_size_bytes = 0;
    }

    /// Keys from least to most recently used
    fn keys(&self) -> Vec<WindowKey> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            match self.nodes[idx].as_ref() {
                Some(node) => {
                    keys.push(node.window.key.clone());
                    cursor = node.next;
                }
                None => break,
            }
        }
        keys
    }

    fn allocate_node(&mut self, node: LruNode) -> usize {
        if let Some(idx) = self.free_indices.pop() {
            self.nodes[idx] = Some(node);
            idx
        } else {
            let idx = self.nodes.len();
            self.nodes.push(Some(node));
            idx
        }
    }

    fn remove_node(&mut self, idx: usize) -> Option<Arc<WindowData>> {
        self.unlink(idx);
        let node = self.nodes[idx].take()?;
        self.free_indices.push(idx);
        self.current_size_bytes = self
            .current_size_bytes
            .saturating_sub(node.window.size_bytes);
        Some(node.window)
    }

    fn move_to_tail(&mut self, idx: usize) {
        if self.tail != Some(idx) {
            self.unlink(idx);
            self.append_to_tail(idx);
        }
    }

    /// Detach a slot from its neighbours, leaving the node itself in place
    fn unlink(&mut self, idx: usize) {
        let Some((prev, next)) = self.nodes[idx].as_mut().map(|n| {
            let links = (n.prev, n.next);
            n.prev = None;
            n.next = None;
            links
        }) else {
            return;
        };

        match prev.and_then(|p| self.nodes[p].as_mut()) {
            Some(prev_node) => prev_node.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| self.nodes[n].as_mut()) {
            Some(next_node) => next_node.prev = prev,
            None => self.tail = prev,
        }
    }

    fn append_to_tail(&mut self, idx: usize) {
        if let Some(tail_idx) = self.tail {
            if let Some(ref mut tail_node) = self.nodes[tail_idx] {
                tail_node.next = Some(idx);
            }
            if let Some(ref mut node) = self.nodes[idx] {
                node.prev = Some(tail_idx);
                node.next = None;
            }
        } else {
            self.head = Some(idx);
        }
        self.tail = Some(idx);
    }
}

/// Thread-safe LRU cache for transformed windows.
///
/// Bounded by entry count and by summed sample bytes. A window larger than the
/// byte budget is still stored, alone.
#[derive(Debug)]
pub struct WindowCache {
    cache: RwLock<LruCache>,
    max_windows: usize,
    max_size_bytes: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl WindowCache {
    pub fn new(max_windows: usize, max_size_bytes: usize) -> Self {
        Self {
            cache: RwLock::new(LruCache::new()),
            max_windows: max_windows.max(1),
            max_size_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a window, marking it most recently used on a hit
    pub fn get(&self, key: &WindowKey) -> Option<Arc<WindowData>> {
        let found = self.cache.write().get(key);
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Store a window as most recently used, evicting the least recently used
    /// entries until both bounds hold. Replaces any entry with the same key.
    pub fn put(&self, window: WindowData) -> Arc<WindowData> {
        let window = Arc::new(window);
        let size = window.size_bytes;

        let mut cache = self.cache.write();
        cache.remove(&window.key);

        while cache.len() >= self.max_windows
            || (cache.len() > 0 && cache.current_size_bytes + size > self.max_size_bytes)
        {
            match cache.evict_oldest() {
                Some(evicted) => log::trace!(
                    "Evicted window start={} duration={} montage={}",
                    evicted.key.start_time,
                    evicted.key.duration,
                    evicted.key.montage
                ),
                None => break,
            }
        }

        cache.insert(window.clone());
        window
    }

    /// Membership test that does not touch recency
    pub fn contains(&self, key: &WindowKey) -> bool {
        self.cache.read().contains(key)
    }

    pub fn invalidate_all(&self) {
        self.cache.write().clear();
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached keys from least to most recently used
    pub fn keys(&self) -> Vec<WindowKey> {
        self.cache.read().keys()
    }

    pub fn stats(&self) -> CacheStats {
        let cache = self.cache.read();
        CacheStats {
            num_windows: cache.len(),
            total_size_bytes: cache.current_size_bytes,
            max_windows: self.max_windows,
            max_size_bytes: self.max_size_bytes,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub num_windows: usize,
    pub total_size_bytes: usize,
    pub max_windows: usize,
    pub max_size_bytes: usize,
    pub hits: u64,
    pub misses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FilterSpec, FilterStatus, SignalBlock};

    fn key(start: f64) -> WindowKey {
        WindowKey::new(start, 1.0, "AVERAGE", FilterSpec::none())
    }

    fn window(start: f64, samples: usize) -> WindowData {
        let block = SignalBlock::new(vec!["Fp1".to_string()], vec![vec![start; samples]]);
        WindowData::new(
            key(start),
            block,
            100.0,
            start,
            start + 1.0,
            FilterStatus::NotRequested,
        )
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let cache = WindowCache::new(3, usize::MAX);
        for start in [0.0, 1.0, 2.0] {
            cache.put(window(start, 10));
        }

        // Touch 0.0 so 1.0 becomes the oldest
        assert!(cache.get(&key(0.0)).is_some());
        cache.put(window(3.0, 10));

        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(&key(1.0)));
        assert_eq!(cache.keys(), vec![key(2.0), key(0.0), key(3.0)]);
    }

    #[test]
    fn test_reput_same_key_does_not_evict() {
        let cache = WindowCache::new(2, usize::MAX);
        cache.put(window(0.0, 10));
        cache.put(window(1.0, 10));
        cache.put(window(0.0, 10));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.keys(), vec![key(1.0), key(0.0)]);
    }

    #[test]
    fn test_byte_budget() {
        // Each window: 100 samples * 8 bytes
        let cache = WindowCache::new(10, 2000);
        cache.put(window(0.0, 100));
        cache.put(window(1.0, 100));
        cache.put(window(2.0, 100));

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&key(0.0)));
        assert_eq!(cache.stats().total_size_bytes, 1600);
    }

    #[test]
    fn test_oversized_window_is_kept_alone() {
        let cache = WindowCache::new(10, 100);
        cache.put(window(0.0, 5));
        cache.put(window(1.0, 1000));

        assert_eq!(cache.keys(), vec![key(1.0)]);
    }

    #[test]
    fn test_hit_miss_counters_and_invalidate() {
        let cache = WindowCache::new(5, usize::MAX);
        assert!(cache.get(&key(0.0)).is_none());
        cache.put(window(0.0, 10));
        assert!(cache.get(&key(0.0)).is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);

        cache.invalidate_all();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().total_size_bytes, 0);
    }

    #[test]
    fn test_replacing_middle_entry_relinks_neighbours() {
        let cache = WindowCache::new(4, usize::MAX);
        for start in [0.0, 1.0, 2.0] {
            cache.put(window(start, 10));
        }
        cache.put(window(1.0, 20));

        assert_eq!(cache.keys(), vec![key(0.0), key(2.0), key(1.0)]);
        assert_eq!(cache.stats().total_size_bytes, (10 + 10 + 20) * 8);
        assert!(cache.get(&key(0.0)).is_some());
        assert_eq!(cache.keys(), vec![key(2.0), key(1.0), key(0.0)]);
    }

    #[test]
    fn test_slot_reuse_keeps_list_consistent() {
        let cache = WindowCache::new(2, usize::MAX);
        for i in 0..20 {
            cache.put(window(i as f64, 4));
            if i % 3 == 0 {
                let _ = cache.get(&key(i as f64));
            }
        }
        assert_eq!(cache.keys(), vec![key(18.0), key(19.0)]);
    }
}
