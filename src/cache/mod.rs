//! Scenario-scoped key/value storage.
//!
//! Steps save generated values, extracted nodes and prepared requests under
//! free-form keys; later steps read them back or feed the whole store into
//! the template engine.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{ApiStepsError, Result};
use crate::http::{PreparedRequest, ResponseRecord};
use crate::types::Node;

/// Anything a step can park in the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum Cached {
    Value(Node),
    Request(PreparedRequest),
    Response(Arc<ResponseRecord>),
}

impl Cached {
    /// JSON view handed to the template engine.
    pub fn to_json(&self) -> Value {
        match self {
            Cached::Value(node) => node.to_json(),
            Cached::Request(request) => request.to_json(),
            Cached::Response(response) => response.to_json(),
        }
    }
}

impl From<Node> for Cached {
    fn from(node: Node) -> Self {
        Cached::Value(node)
    }
}

impl From<PreparedRequest> for Cached {
    fn from(request: PreparedRequest) -> Self {
        Cached::Request(request)
    }
}

pub trait Cache: Send + Sync + std::fmt::Debug {
    /// Upserts `value` under `key`; last write wins.
    fn save(&mut self, key: &str, value: Cached);

    /// Fails with `MissingKey` when `key` was never saved since the last reset.
    fn get_saved(&self, key: &str) -> Result<Cached>;

    /// Replaces the store with an empty one.
    fn reset(&mut self);

    /// Point-in-time copy of every entry.
    fn all(&self) -> HashMap<String, Cached>;

    fn get_json(&self, key: &str) -> Result<Value> {
        Ok(self.get_saved(key)?.to_json())
    }

    fn len(&self) -> usize {
        self.all().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache for a single scenario running on one thread.
#[derive(Debug, Default, Clone)]
pub struct LocalCache {
    entries: HashMap<String, Cached>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for LocalCache {
    fn save(&mut self, key: &str, value: Cached) {
        self.entries.insert(key.to_string(), value);
    }

    fn get_saved(&self, key: &str) -> Result<Cached> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| ApiStepsError::MissingKey(key.to_string()))
    }

    fn reset(&mut self) {
        self.entries = HashMap::new();
    }

    fn all(&self) -> HashMap<String, Cached> {
        self.entries.clone()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Cache shared between scenarios that run in parallel.
///
/// Clones share one store. Reset swaps the whole map under the write lock,
/// so a concurrent reader sees either the old entries or none of them.
#[derive(Debug, Default, Clone)]
pub struct ConcurrentCache {
    inner: Arc<RwLock<HashMap<String, Cached>>>,
}

impl ConcurrentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, key: &str, value: Cached) {
        self.inner.write().insert(key.to_string(), value);
    }

    pub fn load(&self, key: &str) -> Result<Cached> {
        self.inner
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| ApiStepsError::MissingKey(key.to_string()))
    }

    pub fn clear(&self) {
        let mut guard = self.inner.write();
        let dropped = std::mem::take(&mut *guard);
        tracing::debug!("Cache reset, dropped {} entries", dropped.len());
    }

    pub fn snapshot(&self) -> HashMap<String, Cached> {
        self.inner.read().clone()
    }
}

impl Cache for ConcurrentCache {
    fn save(&mut self, key: &str, value: Cached) {
        self.store(key, value);
    }

    fn get_saved(&self, key: &str) -> Result<Cached> {
        self.load(key)
    }

    fn reset(&mut self) {
        self.clear();
    }

    fn all(&self) -> HashMap<String, Cached> {
        self.snapshot()
    }

    fn len(&self) -> usize {
        self.inner.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(cache: &mut dyn Cache) {
        cache.save("NAME", Cached::Value(Node::from("xyz")));
        assert_eq!(cache.get_saved("NAME").unwrap(), Cached::Value(Node::from("xyz")));

        cache.save("NAME", Cached::Value(Node::Int(2)));
        assert_eq!(cache.get_saved("NAME").unwrap(), Cached::Value(Node::Int(2)));

        let err = cache.get_saved("OTHER").unwrap_err();
        assert!(matches!(err, ApiStepsError::MissingKey(k) if k == "OTHER"));
    }

    #[test]
    fn local_round_trip_and_missing_key() {
        exercise(&mut LocalCache::new());
    }

    #[test]
    fn concurrent_round_trip_and_missing_key() {
        exercise(&mut ConcurrentCache::new());
    }

    #[test]
    fn get_json_views_any_entry() {
        let mut cache = LocalCache::new();
        cache.save("N", Node::Int(3).into());
        assert_eq!(cache.get_json("N").unwrap(), serde_json::json!(3));
        assert!(cache.get_json("X").is_err());
    }

    #[test]
    fn null_value_is_not_a_missing_key() {
        let mut cache = LocalCache::new();
        cache.save("EMPTY", Cached::Value(Node::Null));
        assert_eq!(cache.get_saved("EMPTY").unwrap(), Cached::Value(Node::Null));
    }

    #[test]
    fn reset_clears_everything() {
        let mut local = LocalCache::new();
        let mut shared = ConcurrentCache::new();
        for cache in [&mut local as &mut dyn Cache, &mut shared as &mut dyn Cache] {
            cache.save("A", Node::Int(1).into());
            cache.save("B", Node::Bool(true).into());
            assert_eq!(cache.len(), 2);
            cache.reset();
            assert!(cache.all().is_empty());
            assert!(cache.get_saved("A").is_err());
        }
    }

    #[test]
    fn all_is_a_point_in_time_copy() {
        let mut cache = ConcurrentCache::new();
        cache.save("A", Node::Int(1).into());
        let snapshot = cache.all();
        cache.save("B", Node::Int(2).into());
        assert_eq!(snapshot.len(), 1);
        assert_eq!(cache.all().len(), 2);
    }

    #[test]
    fn concurrent_clones_share_state_across_threads() {
        let cache = ConcurrentCache::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let c = cache.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        c.store(&format!("k{}-{}", i, j), Node::Int(j).into());
                        assert!(c.load(&format!("k{}-{}", i, j)).is_ok());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.snapshot().len(), 400);
    }

    #[test]
    fn reset_racing_with_writers_leaves_no_torn_entries() {
        let cache = ConcurrentCache::new();
        let writer = {
            let c = cache.clone();
            std::thread::spawn(move || {
                for j in 0..200 {
                    c.store("K", Node::Int(j).into());
                }
            })
        };
        for _ in 0..50 {
            cache.clear();
        }
        writer.join().unwrap();
        match cache.load("K") {
            Ok(Cached::Value(Node::Int(v))) => assert!((0..200).contains(&v)),
            Ok(other) => panic!("unexpected entry {:?}", other),
            Err(e) => assert!(matches!(e, ApiStepsError::MissingKey(_))),
        }
    }
}
