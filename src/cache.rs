//! Local query-result cache.
//!
//! Stores raw server response bodies keyed by the query content hash, so a
//! repeated query can surface its previous result before the network round
//! trip completes. Entries are evicted least-recently-used first once the
//! capacity is reached.

use std::collections::{HashMap, VecDeque};

use serde_json::Value;

/// Cache options
pub struct CacheOptions {
    /// Namespace prepended to every key, typically the database id.
    pub prefix: String,
    pub capacity: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            prefix: "query".to_string(),
            capacity: 100,
        }
    }
}

/// In-memory LRU store of response bodies.
pub struct QueryCache {
    prefix: String,
    capacity: usize,
    map: HashMap<String, Value>,
    // least recently used at the front
    order: VecDeque<String>,
}

impl QueryCache {
    pub fn new(opts: Option<CacheOptions>) -> Self {
        let opts = opts.unwrap_or_default();
        Self {
            prefix: opts.prefix,
            capacity: opts.capacity.max(1),
            map: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key.to_string());
    }

    /// Look up a cached body, marking the entry as recently used.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let key = self.prefixed(key);
        let hit = self.map.get(&key).cloned();
        if hit.is_some() {
            self.touch(&key);
        }
        hit
    }

    /// Store a body, evicting the least-recently-used entries above
    /// capacity.
    pub fn set(&mut self, key: &str, body: Value) {
        let key = self.prefixed(key);
        self.map.insert(key.clone(), body);
        self.touch(&key);
        while self.map.len() > self.capacity {
            match self.order.pop_front() {
                Some(evicted) => {
                    self.map.remove(&evicted);
                }
                None => break,
            }
        }
    }

    /// Delete a key, returns true if the key existed.
    pub fn remove(&mut self, key: &str) -> bool {
        let key = self.prefixed(key);
        if let Some(pos) = self.order.iter().position(|k| k == &key) {
            self.order.remove(pos);
        }
        self.map.remove(&key).is_some()
    }

    /// Drop every entry.
    pub fn reset(&mut self) {
        self.map.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn small_cache() -> QueryCache {
        QueryCache::new(Some(CacheOptions {
            prefix: "_public".to_string(),
            capacity: 2,
        }))
    }

    #[test]
    fn test_get_returns_stored_body() {
        let mut cache = small_cache();
        cache.set("abc", json!({"result": [1]}));
        assert_eq!(cache.get("abc"), Some(json!({"result": [1]})));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_prefix_isolates_namespaces() {
        let mut public = small_cache();
        let mut private = QueryCache::new(Some(CacheOptions {
            prefix: "_private".to_string(),
            capacity: 2,
        }));
        public.set("abc", json!(1));
        assert_eq!(private.get("abc"), None);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = small_cache();
        cache.set("a", json!(1));
        cache.set("b", json!(2));
        // touch "a" so "b" is now the oldest
        cache.get("a");
        cache.set("c", json!(3));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(json!(1)));
        assert_eq!(cache.get("c"), Some(json!(3)));
    }

    #[test]
    fn test_overwrite_does_not_grow() {
        let mut cache = small_cache();
        cache.set("a", json!(1));
        cache.set("a", json!(2));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a"), Some(json!(2)));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut cache = small_cache();
        cache.set("a", json!(1));
        cache.reset();
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }
}
