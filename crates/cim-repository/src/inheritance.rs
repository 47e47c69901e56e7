// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-namespace class hierarchy.
//!
//! Edges may be inserted in any order (bulk load from storage); a forward
//! reference to a superclass that is not inserted yet is accepted and only
//! reported by [`InheritanceTree::check`].

use crate::error::{CimError, CimResult};
use crate::model::CimName;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

#[derive(Debug, Clone)]
struct Node {
    name: CimName,
    super_class: Option<CimName>,
}

/// Class name to superclass edges with an incrementally maintained
/// children index.
#[derive(Debug, Clone, Default)]
pub struct InheritanceTree {
    nodes: HashMap<CimName, Node>,
    // Keyed by superclass name, whether or not that class is inserted.
    children: HashMap<CimName, Vec<CimName>>,
}

impl InheritanceTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `class_name` under `super_class` (None for a root class).
    pub fn insert(&mut self, class_name: CimName, super_class: Option<CimName>) -> CimResult<()> {
        if self.nodes.contains_key(&class_name) {
            return Err(CimError::already_exists(format!("class {}", class_name)));
        }
        if let Some(sc) = &super_class {
            self.children
                .entry(sc.clone())
                .or_default()
                .push(class_name.clone());
        }
        self.nodes.insert(
            class_name.clone(),
            Node {
                name: class_name,
                super_class,
            },
        );
        Ok(())
    }

    /// Remove a class; fails while any class names it as superclass.
    pub fn remove(&mut self, class_name: &CimName) -> CimResult<()> {
        if !self.nodes.contains_key(class_name) {
            return Err(CimError::invalid_class(class_name));
        }
        if self.has_sub_classes(class_name) {
            return Err(CimError::class_has_children(class_name));
        }
        if let Some(node) = self.nodes.remove(class_name) {
            if let Some(sc) = node.super_class {
                self.unlink_child(&sc, class_name);
            }
        }
        self.children.remove(class_name);
        Ok(())
    }

    /// Move a class under a new superclass.
    ///
    /// Rejects a superclass that is the class itself or one of its
    /// descendants.
    pub fn reparent(&mut self, class_name: &CimName, super_class: Option<CimName>) -> CimResult<()> {
        let old = match self.nodes.get(class_name) {
            Some(node) => node.super_class.clone(),
            None => return Err(CimError::invalid_class(class_name)),
        };
        if let Some(sc) = &super_class {
            if sc == class_name || self.descendants(class_name).contains(sc) {
                return Err(CimError::invalid_superclass(format!(
                    "{} cannot derive from its own subclass {}",
                    class_name, sc
                )));
            }
        }
        if let Some(old) = old {
            self.unlink_child(&old, class_name);
        }
        if let Some(sc) = &super_class {
            self.children
                .entry(sc.clone())
                .or_default()
                .push(class_name.clone());
        }
        if let Some(node) = self.nodes.get_mut(class_name) {
            node.super_class = super_class;
        }
        Ok(())
    }

    fn unlink_child(&mut self, super_class: &CimName, class_name: &CimName) {
        if let Some(list) = self.children.get_mut(super_class) {
            list.retain(|c| c != class_name);
            if list.is_empty() {
                self.children.remove(super_class);
            }
        }
    }

    pub fn contains_class(&self, class_name: &CimName) -> bool {
        self.nodes.contains_key(class_name)
    }

    /// `None` when the class is unknown, `Some(None)` for a root class.
    pub fn get_super_class(&self, class_name: &CimName) -> Option<Option<&CimName>> {
        self.nodes.get(class_name).map(|n| n.super_class.as_ref())
    }

    /// Stored spelling of a class name.
    pub fn canonical_name(&self, class_name: &CimName) -> Option<&CimName> {
        self.nodes.get(class_name).map(|n| &n.name)
    }

    /// Immediate children, including ones whose superclass is not inserted.
    pub fn children_of(&self, class_name: &CimName) -> &[CimName] {
        self.children
            .get(class_name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_sub_classes(&self, class_name: &CimName) -> bool {
        !self.children_of(class_name).is_empty()
    }

    /// Subclass names, in no particular order.
    ///
    /// With `class_name` None: the root classes (shallow) or every class
    /// (deep). Otherwise the immediate children (shallow) or all
    /// descendants (deep). Returns None for an unknown class.
    pub fn get_sub_class_names(
        &self,
        class_name: Option<&CimName>,
        deep: bool,
    ) -> Option<Vec<CimName>> {
        match class_name {
            None if deep => Some(self.nodes.values().map(|n| n.name.clone()).collect()),
            None => Some(
                self.nodes
                    .values()
                    .filter(|n| n.super_class.is_none())
                    .map(|n| n.name.clone())
                    .collect(),
            ),
            Some(name) if !self.contains_class(name) => None,
            Some(name) if deep => Some(self.descendants(name)),
            Some(name) => Some(self.children_of(name).to_vec()),
        }
    }

    /// Ancestors from the direct superclass upward. Stops at a class
    /// missing from this tree; returns None for an unknown class.
    pub fn get_super_class_names(&self, class_name: &CimName) -> Option<Vec<CimName>> {
        let mut node = self.nodes.get(class_name)?;
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(node.name.clone());
        while let Some(sc) = &node.super_class {
            if !seen.insert(sc.clone()) {
                break;
            }
            match self.nodes.get(sc) {
                Some(parent) => {
                    out.push(parent.name.clone());
                    node = parent;
                }
                None => {
                    out.push(sc.clone());
                    break;
                }
            }
        }
        Some(out)
    }

    // Breadth-first; the visited set keeps it finite on a cyclic tree.
    fn descendants(&self, class_name: &CimName) -> Vec<CimName> {
        let mut out = Vec::new();
        let mut seen: HashSet<CimName> = HashSet::new();
        seen.insert(class_name.clone());
        let mut queue: VecDeque<&CimName> = VecDeque::new();
        queue.push_back(class_name);
        while let Some(current) = queue.pop_front() {
            for child in self.children_of(current) {
                if seen.insert(child.clone()) {
                    out.push(child.clone());
                    queue.push_back(child);
                }
            }
        }
        out
    }

    /// Validate that the edges form a forest.
    pub fn check(&self) -> CimResult<()> {
        self.check_with_parent(None)
    }

    /// Like [`check`](Self::check), but superclasses found in `parent` count
    /// as present. Used for namespaces deriving from a shared schema.
    pub fn check_with_parent(&self, parent: Option<&InheritanceTree>) -> CimResult<()> {
        for node in self.nodes.values() {
            if let Some(sc) = &node.super_class {
                let known = self.nodes.contains_key(sc)
                    || parent.map_or(false, |p| p.contains_class(sc));
                if !known {
                    return Err(CimError::InvalidInheritanceTree(format!(
                        "class {} names missing superclass {}",
                        node.name, sc
                    )));
                }
            }
        }

        // Walk up from every node; revisiting a class on one walk means a
        // cycle. Classes already proven to reach a root are skipped.
        let mut rooted: HashSet<CimName> = HashSet::new();
        for node in self.nodes.values() {
            let mut path: HashSet<CimName> = HashSet::new();
            let mut current = node;
            loop {
                if rooted.contains(&current.name) {
                    break;
                }
                if !path.insert(current.name.clone()) {
                    return Err(CimError::InvalidInheritanceTree(format!(
                        "cycle through class {}",
                        current.name
                    )));
                }
                match current.super_class.as_ref().and_then(|sc| self.nodes.get(sc)) {
                    Some(parent) => current = parent,
                    None => break,
                }
            }
            rooted.extend(path);
        }

        for (super_class, kids) in &self.children {
            for child in kids {
                let linked = self
                    .nodes
                    .get(child)
                    .and_then(|n| n.super_class.as_ref())
                    .map_or(false, |sc| sc == super_class);
                if !linked {
                    return Err(CimError::InvalidInheritanceTree(format!(
                        "stale child link {} -> {}",
                        child, super_class
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn class_names(&self) -> impl Iterator<Item = &CimName> {
        self.nodes.values().map(|n| &n.name)
    }
}

impl fmt::Display for InheritanceTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut nodes: Vec<&Node> = self.nodes.values().collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        for node in nodes {
            match &node.super_class {
                Some(sc) => writeln!(f, "{} : {}", node.name, sc)?,
                None => writeln!(f, "{}", node.name)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(s: &str) -> CimName {
        CimName::new(s)
    }

    fn sorted(mut v: Vec<CimName>) -> Vec<String> {
        v.sort();
        v.into_iter().map(|c| c.as_str().to_string()).collect()
    }

    // A <- B <- D, A <- B <- E, A <- C <- F, inserted leaves first.
    fn sample_tree() -> InheritanceTree {
        let mut tree = InheritanceTree::new();
        tree.insert(n("D"), Some(n("B"))).unwrap();
        tree.insert(n("E"), Some(n("B"))).unwrap();
        tree.insert(n("C"), Some(n("A"))).unwrap();
        tree.insert(n("F"), Some(n("C"))).unwrap();
        tree.insert(n("A"), None).unwrap();
        tree.insert(n("B"), Some(n("A"))).unwrap();
        tree
    }

    #[test]
    fn test_sub_class_names() {
        let tree = sample_tree();
        tree.check().unwrap();

        let deep = tree.get_sub_class_names(Some(&n("A")), true).unwrap();
        assert_eq!(sorted(deep), vec!["B", "C", "D", "E", "F"]);

        let shallow = tree.get_sub_class_names(Some(&n("A")), false).unwrap();
        assert_eq!(sorted(shallow), vec!["B", "C"]);

        let c = tree.get_sub_class_names(Some(&n("c")), true).unwrap();
        assert_eq!(sorted(c), vec!["F"]);
    }

    #[test]
    fn test_sub_class_names_without_class() {
        let tree = sample_tree();
        let roots = tree.get_sub_class_names(None, false).unwrap();
        assert_eq!(sorted(roots), vec!["A"]);
        let all = tree.get_sub_class_names(None, true).unwrap();
        assert_eq!(all.len(), 6);
        assert!(tree.get_sub_class_names(Some(&n("Z")), false).is_none());
    }

    #[test]
    fn test_deep_is_closure_of_shallow() {
        let tree = sample_tree();
        for class in tree.class_names() {
            let deep = tree.get_sub_class_names(Some(class), true).unwrap();
            let mut closure = Vec::new();
            let mut frontier = vec![class.clone()];
            while let Some(current) = frontier.pop() {
                for child in tree.get_sub_class_names(Some(&current), false).unwrap() {
                    closure.push(child.clone());
                    frontier.push(child);
                }
            }
            assert_eq!(sorted(deep), sorted(closure));
        }
    }

    #[test]
    fn test_invalid_tree_detected() {
        let mut tree = InheritanceTree::new();
        tree.insert(n("D"), Some(n("B"))).unwrap();
        tree.insert(n("E"), Some(n("B"))).unwrap();
        tree.insert(n("C"), Some(n("A"))).unwrap();
        tree.insert(n("F"), Some(n("C"))).unwrap();
        tree.insert(n("A"), None).unwrap();

        let err = tree.check().unwrap_err();
        assert!(matches!(err, CimError::InvalidInheritanceTree(_)));
    }

    #[test]
    fn test_cycle_detected_and_traversal_terminates() {
        let mut tree = InheritanceTree::new();
        tree.insert(n("X"), Some(n("Y"))).unwrap();
        tree.insert(n("Y"), Some(n("X"))).unwrap();
        assert!(matches!(
            tree.check().unwrap_err(),
            CimError::InvalidInheritanceTree(_)
        ));

        let deep = tree.get_sub_class_names(Some(&n("X")), true).unwrap();
        assert_eq!(sorted(deep), vec!["Y"]);
        assert_eq!(tree.get_super_class_names(&n("X")).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_requires_leaf() {
        let mut tree = sample_tree();
        let err = tree.remove(&n("B")).unwrap_err();
        assert!(err.is(crate::error::CimStatusCode::ClassHasChildren));

        tree.remove(&n("D")).unwrap();
        tree.remove(&n("E")).unwrap();
        tree.remove(&n("B")).unwrap();
        tree.check().unwrap();
        assert!(!tree.contains_class(&n("B")));
        assert_eq!(
            sorted(tree.get_sub_class_names(Some(&n("A")), false).unwrap()),
            vec!["C"]
        );
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut tree = sample_tree();
        let err = tree.insert(n("a"), None).unwrap_err();
        assert!(err.is(crate::error::CimStatusCode::AlreadyExists));
    }

    #[test]
    fn test_super_class_names() {
        let tree = sample_tree();
        let supers = tree.get_super_class_names(&n("F")).unwrap();
        assert_eq!(
            supers.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
            vec!["C", "A"]
        );
        assert_eq!(tree.get_super_class(&n("A")), Some(None));
        assert_eq!(tree.get_super_class(&n("F")), Some(Some(&n("C"))));
        assert_eq!(tree.get_super_class(&n("Q")), None);
    }

    #[test]
    fn test_reparent() {
        let mut tree = sample_tree();
        tree.reparent(&n("F"), Some(n("B"))).unwrap();
        tree.check().unwrap();
        assert!(!tree.has_sub_classes(&n("C")));
        assert_eq!(
            sorted(tree.get_sub_class_names(Some(&n("B")), false).unwrap()),
            vec!["D", "E", "F"]
        );

        let err = tree.reparent(&n("A"), Some(n("D"))).unwrap_err();
        assert!(err.is(crate::error::CimStatusCode::InvalidSuperclass));
    }

    #[test]
    fn test_check_with_parent_tree() {
        let mut parent = InheritanceTree::new();
        parent.insert(n("CIM_ManagedElement"), None).unwrap();

        let mut child = InheritanceTree::new();
        child
            .insert(n("TST_Local"), Some(n("CIM_ManagedElement")))
            .unwrap();
        assert!(child.check().is_err());
        child.check_with_parent(Some(&parent)).unwrap();
    }
}
