// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded LRU cache for resolved classes and qualifier declarations.
//!
//! Entries are keyed by `(namespace, name)` and shared behind `Arc`. A
//! capacity of zero disables the cache: lookups miss and inserts are
//! dropped.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::model::{CimName, NamespaceName};

/// Cache hit/miss statistics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Counters of the repository's two object caches; `None` when a cache is
/// disabled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryCacheStats {
    pub classes: Option<CacheStats>,
    pub qualifiers: Option<CacheStats>,
}

struct Inner<V> {
    entries: LruCache<(NamespaceName, CimName), Arc<V>>,
    stats: CacheStats,
}

pub struct ObjectCache<V> {
    inner: Option<Mutex<Inner<V>>>,
}

impl<V> ObjectCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: NonZeroUsize::new(capacity).map(|cap| {
                Mutex::new(Inner {
                    entries: LruCache::new(cap),
                    stats: CacheStats::default(),
                })
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn get(&self, namespace: &NamespaceName, name: &CimName) -> Option<Arc<V>> {
        let mut inner = self.inner.as_ref()?.lock();
        let found = inner
            .entries
            .get(&(namespace.clone(), name.clone()))
            .cloned();
        match found {
            Some(_) => inner.stats.hits += 1,
            None => inner.stats.misses += 1,
        }
        found
    }

    pub fn put(&self, namespace: &NamespaceName, name: &CimName, value: Arc<V>) {
        if let Some(inner) = &self.inner {
            inner
                .lock()
                .entries
                .put((namespace.clone(), name.clone()), value);
        }
    }

    pub fn evict(&self, namespace: &NamespaceName, name: &CimName) {
        if let Some(inner) = &self.inner {
            inner.lock().entries.pop(&(namespace.clone(), name.clone()));
        }
    }

    pub fn clear(&self) {
        if let Some(inner) = &self.inner {
            inner.lock().entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, |inner| inner.lock().entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.inner
            .as_ref()
            .map_or_else(CacheStats::default, |inner| inner.lock().stats)
    }

    /// Stats of an enabled cache.
    pub fn enabled_stats(&self) -> Option<CacheStats> {
        self.is_enabled().then(|| self.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns() -> NamespaceName {
        NamespaceName::new("root/test").unwrap()
    }

    #[test]
    fn test_lru_eviction() {
        let cache: ObjectCache<u32> = ObjectCache::new(2);
        cache.put(&ns(), &CimName::new("A"), Arc::new(1));
        cache.put(&ns(), &CimName::new("B"), Arc::new(2));
        assert_eq!(cache.get(&ns(), &CimName::new("a")).as_deref(), Some(&1));

        cache.put(&ns(), &CimName::new("C"), Arc::new(3));
        assert!(cache.get(&ns(), &CimName::new("B")).is_none());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });

        cache.evict(&ns(), &CimName::new("A"));
        assert!(cache.get(&ns(), &CimName::new("A")).is_none());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_disables() {
        let cache: ObjectCache<u32> = ObjectCache::new(0);
        assert!(!cache.is_enabled());
        cache.put(&ns(), &CimName::new("A"), Arc::new(1));
        assert!(cache.get(&ns(), &CimName::new("A")).is_none());
        assert_eq!(cache.stats(), CacheStats::default());
        assert_eq!(cache.enabled_stats(), None);
    }
}
