//! A bounded cache for expensive external runtime handles.
//!
//! Detection-model sessions are costly to construct (model download, graph
//! compilation), so callers that process many images want to reuse them.
//! Rather than ambient module state, the cache is an explicit component with
//! injected capacity and lookup-or-create semantics; the engine itself never
//! holds one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::core::errors::FusionResult;

/// A thread-safe, capacity-bounded cache keyed by string (typically a
/// storage path or model identifier).
///
/// When the cache is full, the least recently used entry is evicted to make
/// room. Entries are shared via [`Arc`], so eviction never invalidates a
/// handle already held by a caller.
pub struct SessionCache<T> {
    capacity: usize,
    inner: Mutex<CacheInner<T>>,
}

struct CacheInner<T> {
    entries: HashMap<String, Arc<T>>,
    // Keys ordered from least to most recently used.
    order: Vec<String>,
}

impl<T> SessionCache<T> {
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// A capacity of zero is coerced to one; a cache that can hold nothing
    /// defeats lookup-or-create.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    /// Returns the cached entry for `key`, creating it with `init` if
    /// absent.
    ///
    /// `init` runs under the cache lock, so concurrent callers asking for
    /// the same key construct the session exactly once. If `init` fails the
    /// error is propagated and nothing is cached.
    pub fn get_or_create<F>(&self, key: &str, init: F) -> FusionResult<Arc<T>>
    where
        F: FnOnce() -> FusionResult<T>,
    {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(entry) = inner.entries.get(key).cloned() {
            inner.touch(key);
            return Ok(entry);
        }

        let created = Arc::new(init()?);
        if inner.entries.len() >= self.capacity
            && let Some(evicted) = inner.order.first().cloned()
        {
            debug!(key = %evicted, "evicting least recently used session");
            inner.entries.remove(&evicted);
            inner.order.remove(0);
        }
        inner.entries.insert(key.to_string(), created.clone());
        inner.order.push(key.to_string());
        Ok(created)
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every cached entry.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.clear();
        inner.order.clear();
    }
}

impl<T> CacheInner<T> {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            let k = self.order.remove(pos);
            self.order.push(k);
        }
    }
}
