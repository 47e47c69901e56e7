// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-namespace index from class name to the association records the
//! class takes part in.
//!
//! A cache starts inactive; the repository fills it from the class store
//! on first use and then marks it active. Every manager owns its caches,
//! so two managers never see each other's records.

use crate::association::ClassAssociation;
use crate::model::{CimName, NamespaceName};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct AssocClassCache {
    entries: HashMap<CimName, Vec<ClassAssociation>>,
    active: bool,
}

impl AssocClassCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Append `record` under `key`; enumeration follows insertion order.
    pub fn add_record(&mut self, key: CimName, record: ClassAssociation) {
        self.entries.entry(key).or_default().push(record);
    }

    /// Index an edge under both of its endpoint classes.
    pub fn add_association(&mut self, record: &ClassAssociation) {
        self.add_record(record.from_class_name.clone(), record.clone());
        self.add_record(record.to_class_name.clone(), record.reversed());
    }

    /// Records indexed under `class_name`, each oriented from that class.
    pub fn get_assoc_class_entry(&self, class_name: &CimName) -> Option<&[ClassAssociation]> {
        self.entries
            .get(class_name)
            .filter(|records| !records.is_empty())
            .map(|records| records.as_slice())
    }

    /// Remove the record of `assoc_class_name` under `class_name`.
    /// Returns false when there was none.
    pub fn remove_record(&mut self, class_name: &CimName, assoc_class_name: &CimName) -> bool {
        let Some(records) = self.entries.get_mut(class_name) else {
            return false;
        };
        let Some(idx) = records
            .iter()
            .position(|r| &r.assoc_class_name == assoc_class_name)
        else {
            return false;
        };
        records.remove(idx);
        if records.is_empty() {
            self.entries.remove(class_name);
        }
        true
    }

    /// Remove every record of an association class under every key.
    /// Returns true when at least one record existed.
    pub fn remove_assoc_class_records(&mut self, assoc_class_name: &CimName) -> bool {
        let mut removed = false;
        self.entries.retain(|_, records| {
            let before = records.len();
            records.retain(|r| &r.assoc_class_name != assoc_class_name);
            removed |= records.len() != before;
            !records.is_empty()
        });
        removed
    }

    /// Drop every record and mark the cache inactive.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.active = false;
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Owns one [`AssocClassCache`] per namespace.
#[derive(Debug, Default)]
pub struct AssocClassCacheManager {
    caches: HashMap<NamespaceName, AssocClassCache>,
}

impl AssocClassCacheManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache of `namespace`, created empty and inactive when absent.
    pub fn get_assoc_class_cache(&mut self, namespace: &NamespaceName) -> &mut AssocClassCache {
        self.caches.entry(namespace.clone()).or_default()
    }

    pub fn cache(&self, namespace: &NamespaceName) -> Option<&AssocClassCache> {
        self.caches.get(namespace)
    }

    /// Active cache of `namespace`; inactive caches are filled from the
    /// store on first use and need no incremental updates.
    pub fn active_cache_mut(&mut self, namespace: &NamespaceName) -> Option<&mut AssocClassCache> {
        self.caches.get_mut(namespace).filter(|cache| cache.is_active())
    }

    pub fn remove_cache(&mut self, namespace: &NamespaceName) {
        self.caches.remove(namespace);
    }

    pub fn rename_cache(&mut self, old: &NamespaceName, new: &NamespaceName) {
        if let Some(cache) = self.caches.remove(old) {
            self.caches.insert(new.clone(), cache);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(s: &str) -> CimName {
        CimName::new(s)
    }

    fn assoc1() -> ClassAssociation {
        ClassAssociation::new("Assoc1", "X", "prop1", "Y", "prop2")
    }

    #[test]
    fn test_both_endpoints_indexed() {
        let mut mgr = AssocClassCacheManager::new();
        let ns = NamespaceName::new("root/test").unwrap();
        let cache = mgr.get_assoc_class_cache(&ns);
        assert!(!cache.is_active());

        cache.add_association(&assoc1());
        cache.set_active(true);

        let from_x = cache.get_assoc_class_entry(&n("X")).unwrap();
        assert_eq!(from_x.len(), 1);
        assert_eq!(from_x[0].to_class_name, n("Y"));
        let from_y = cache.get_assoc_class_entry(&n("y")).unwrap();
        assert_eq!(from_y.len(), 1);
        assert_eq!(from_y[0].to_class_name, n("X"));
        assert_eq!(from_y[0].from_property_name, n("prop2"));

        assert!(cache.remove_assoc_class_records(&n("Assoc1")));
        assert!(cache.get_assoc_class_entry(&n("X")).is_none());
        assert!(cache.get_assoc_class_entry(&n("Y")).is_none());
        assert!(!cache.remove_assoc_class_records(&n("Assoc1")));
        assert!(cache.is_active());
    }

    #[test]
    fn test_records_keep_insertion_order() {
        let mut cache = AssocClassCache::new();
        cache.add_record(n("X"), ClassAssociation::new("A1", "X", "a", "Y", "b"));
        cache.add_record(n("X"), ClassAssociation::new("A2", "X", "c", "Z", "d"));
        cache.add_record(n("X"), ClassAssociation::new("A3", "X", "e", "W", "f"));

        let names: Vec<_> = cache
            .get_assoc_class_entry(&n("X"))
            .unwrap()
            .iter()
            .map(|r| r.assoc_class_name.clone())
            .collect();
        assert_eq!(names, vec![n("A1"), n("A2"), n("A3")]);
    }

    #[test]
    fn test_remove_record() {
        let mut cache = AssocClassCache::new();
        cache.add_association(&assoc1());

        assert!(!cache.remove_record(&n("X"), &n("Other")));
        assert!(!cache.remove_record(&n("Z"), &n("Assoc1")));
        assert!(cache.remove_record(&n("X"), &n("Assoc1")));
        assert!(cache.get_assoc_class_entry(&n("X")).is_none());
        assert!(cache.get_assoc_class_entry(&n("Y")).is_some());
    }

    #[test]
    fn test_managers_are_isolated() {
        let ns = NamespaceName::new("root/cimv2").unwrap();
        let mut first = AssocClassCacheManager::new();
        first.get_assoc_class_cache(&ns).add_association(&assoc1());

        let mut second = AssocClassCacheManager::new();
        let cache = second.get_assoc_class_cache(&ns);
        assert!(cache.get_assoc_class_entry(&n("X")).is_none());
        assert!(cache.is_empty());

        assert!(first
            .get_assoc_class_cache(&ns)
            .get_assoc_class_entry(&n("X"))
            .is_some());
    }

    #[test]
    fn test_rename_and_remove_cache() {
        let old = NamespaceName::new("old").unwrap();
        let new = NamespaceName::new("new").unwrap();
        let mut mgr = AssocClassCacheManager::new();
        mgr.get_assoc_class_cache(&old).add_association(&assoc1());

        mgr.rename_cache(&old, &new);
        assert!(mgr.cache(&old).is_none());
        assert!(mgr.cache(&new).is_some());

        mgr.remove_cache(&new);
        assert!(mgr.cache(&new).is_none());
    }
}
