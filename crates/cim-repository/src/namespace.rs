// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Namespace registry and per-namespace class hierarchy.
//!
//! # Shared schemas
//!
//! A namespace may name a `parent`, which must be shareable:
//!
//! ```text
//! root/shared            (primary, shareable)
//! +-- root/shared/ro     updatesAllowed=false: classes and qualifiers come
//! |                      from the parent, only instances live here
//! +-- root/shared/rw     updatesAllowed=true: own classes, which may derive
//!                        from classes of the primary parent
//! ```
//!
//! An updatable dependent must hang directly off a primary namespace. Class
//! names are unique across a primary namespace and its updatable dependents.

use crate::error::{CimError, CimResult};
use crate::inheritance::InheritanceTree;
use crate::model::{CimName, NamespaceName};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::info;

/// Namespace attributes keyed by `shareable`, `updatesAllowed`, `parent`
/// and `remoteInfo` (names compared without case).
pub type NamespaceAttributes = BTreeMap<String, String>;

fn default_true() -> bool {
    true
}

fn parse_flag(key: &str, value: &str) -> CimResult<bool> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(CimError::invalid_parameter(format!(
            "namespace attribute {} must be true or false, got '{}'",
            key, value
        )))
    }
}

/// Persisted namespace attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceDefinition {
    pub name: NamespaceName,

    #[serde(default)]
    pub parent: Option<NamespaceName>,

    #[serde(default)]
    pub shareable: bool,

    #[serde(default = "default_true")]
    pub updates_allowed: bool,

    /// Location of a remote namespace; None for a local one.
    #[serde(default)]
    pub remote_info: Option<String>,
}

impl NamespaceDefinition {
    pub fn new(name: NamespaceName) -> Self {
        Self {
            name,
            parent: None,
            shareable: false,
            updates_allowed: true,
            remote_info: None,
        }
    }

    pub fn with_parent(mut self, parent: NamespaceName) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn shareable(mut self, shareable: bool) -> Self {
        self.shareable = shareable;
        self
    }

    pub fn updates_allowed(mut self, updates_allowed: bool) -> Self {
        self.updates_allowed = updates_allowed;
        self
    }

    pub fn remote_info(mut self, remote_info: impl Into<String>) -> Self {
        self.remote_info = Some(remote_info.into());
        self
    }

    /// Definition from creation attributes. Unknown keys are NOT_SUPPORTED.
    pub fn from_attributes(name: NamespaceName, attributes: &NamespaceAttributes) -> CimResult<Self> {
        let mut def = Self::new(name);
        for (key, value) in attributes {
            if key.eq_ignore_ascii_case("shareable") {
                def.shareable = parse_flag(key, value)?;
            } else if key.eq_ignore_ascii_case("updatesAllowed") {
                def.updates_allowed = parse_flag(key, value)?;
            } else if key.eq_ignore_ascii_case("parent") {
                def.parent = Some(NamespaceName::new(value)?);
            } else if key.eq_ignore_ascii_case("remoteInfo") {
                def.remote_info = Some(value.clone());
            } else {
                return Err(CimError::not_supported(format!(
                    "{} option not supported: {}",
                    def.name, key
                )));
            }
        }
        Ok(def)
    }

    /// Attribute view, including `name`.
    pub fn to_attributes(&self) -> NamespaceAttributes {
        let mut out = NamespaceAttributes::new();
        out.insert("name".to_string(), self.name.to_string());
        out.insert("shareable".to_string(), self.shareable.to_string());
        out.insert("updatesAllowed".to_string(), self.updates_allowed.to_string());
        if let Some(parent) = &self.parent {
            out.insert("parent".to_string(), parent.to_string());
        }
        if let Some(remote_info) = &self.remote_info {
            out.insert("remoteInfo".to_string(), remote_info.clone());
        }
        out
    }
}

/// Parse modification attributes into (shareable, updatesAllowed).
/// Only those two may change; anything else is NOT_SUPPORTED.
pub fn parse_modify_attributes(
    attributes: &NamespaceAttributes,
) -> CimResult<(Option<bool>, Option<bool>)> {
    let mut shareable = None;
    let mut updates_allowed = None;
    for (key, value) in attributes {
        if key.eq_ignore_ascii_case("shareable") {
            shareable = Some(parse_flag(key, value)?);
        } else if key.eq_ignore_ascii_case("updatesAllowed") {
            updates_allowed = Some(parse_flag(key, value)?);
        } else {
            return Err(CimError::not_supported(format!(
                "namespace attribute {} cannot be modified",
                key
            )));
        }
    }
    Ok((shareable, updates_allowed))
}

#[derive(Debug)]
struct NameSpace {
    def: NamespaceDefinition,
    tree: InheritanceTree,
}

/// Owns every namespace and its inheritance tree.
///
/// Not internally synchronized; the repository serializes writers.
#[derive(Debug, Default)]
pub struct NameSpaceManager {
    namespaces: HashMap<NamespaceName, NameSpace>,
}

impl NameSpaceManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn name_space(&self, ns: &NamespaceName) -> CimResult<&NameSpace> {
        self.namespaces
            .get(ns)
            .ok_or_else(|| CimError::invalid_namespace(ns))
    }

    fn name_space_mut(&mut self, ns: &NamespaceName) -> CimResult<&mut NameSpace> {
        self.namespaces
            .get_mut(ns)
            .ok_or_else(|| CimError::invalid_namespace(ns))
    }

    // -----------------------------------------------------------------------
    // Namespace lifecycle
    // -----------------------------------------------------------------------

    /// Register a new, empty namespace after checking the sharing rules.
    pub fn create_name_space(&mut self, def: NamespaceDefinition) -> CimResult<()> {
        if self.namespaces.contains_key(&def.name) {
            return Err(CimError::already_exists(format!("namespace {}", def.name)));
        }

        if let Some(parent) = &def.parent {
            let p = self.namespaces.get(parent).ok_or_else(|| {
                CimError::failed(format!(
                    "parent namespace {} of {} does not exist",
                    parent, def.name
                ))
            })?;
            if !p.def.shareable {
                return Err(CimError::failed(format!(
                    "parent namespace {} is not shareable",
                    parent
                )));
            }
            if def.updates_allowed && p.def.parent.is_some() {
                return Err(CimError::failed(format!(
                    "parent namespace {} of updatable namespace {} is not a primary namespace",
                    parent, def.name
                )));
            }
        }

        info!(
            "Namespace {} (shareable={}, updatesAllowed={}, parent={})",
            def.name,
            def.shareable,
            def.updates_allowed,
            def.parent
                .as_ref()
                .map(|p| p.as_str())
                .unwrap_or("none")
        );
        self.namespaces.insert(
            def.name.clone(),
            NameSpace {
                def,
                tree: InheritanceTree::new(),
            },
        );
        Ok(())
    }

    /// Rebuild a namespace from stored class edges and validate its tree.
    ///
    /// On an invalid tree the namespace is not registered.
    pub fn load_name_space(
        &mut self,
        def: NamespaceDefinition,
        classes: impl IntoIterator<Item = (CimName, Option<CimName>)>,
    ) -> CimResult<()> {
        let name = def.name.clone();
        self.create_name_space(def)?;

        let result = (|| {
            let namespace = self.name_space_mut(&name)?;
            for (class_name, super_class) in classes {
                namespace.tree.insert(class_name, super_class)?;
            }
            self.check_tree(&name)
        })();

        if result.is_err() {
            self.namespaces.remove(&name);
        }
        result
    }

    /// Validate the namespace's tree, resolving superclasses through the
    /// primary parent of an updatable dependent.
    pub fn check_tree(&self, ns: &NamespaceName) -> CimResult<()> {
        let namespace = self.name_space(ns)?;
        let parent_tree = match (&namespace.def.parent, namespace.def.updates_allowed) {
            (Some(parent), true) => Some(&self.name_space(parent)?.tree),
            _ => None,
        };
        namespace
            .tree
            .check_with_parent(parent_tree)
            .map_err(|e| match e {
                CimError::InvalidInheritanceTree(reason) => {
                    CimError::InvalidInheritanceTree(format!("namespace {}: {}", ns, reason))
                }
                other => other,
            })
    }

    /// Remove an empty namespace that no other namespace depends on.
    pub fn delete_name_space(&mut self, ns: &NamespaceName) -> CimResult<()> {
        let namespace = self.name_space(ns)?;
        if self.has_dependent_name_space(ns) {
            return Err(CimError::failed(format!(
                "namespace {} has dependent namespaces",
                ns
            )));
        }
        if !namespace.tree.is_empty() {
            return Err(CimError::namespace_not_empty(format!(
                "namespace {} still contains {} classes",
                ns,
                namespace.tree.len()
            )));
        }
        self.namespaces.remove(ns);
        info!("Deleted namespace {}", ns);
        Ok(())
    }

    pub fn get_name_space_names(&self) -> Vec<NamespaceName> {
        self.namespaces.keys().cloned().collect()
    }

    pub fn name_space_exists(&self, ns: &NamespaceName) -> bool {
        self.namespaces.contains_key(ns)
    }

    pub fn get_name_space(&self, ns: &NamespaceName) -> CimResult<&NamespaceDefinition> {
        Ok(&self.name_space(ns)?.def)
    }

    /// Change the sharing attributes of a namespace.
    pub fn modify_name_space(
        &mut self,
        ns: &NamespaceName,
        shareable: Option<bool>,
        updates_allowed: Option<bool>,
    ) -> CimResult<()> {
        let has_dependents = self.has_dependent_name_space(ns);
        let namespace = self.name_space(ns)?;
        let parent_is_primary = match &namespace.def.parent {
            Some(parent) => self.name_space(parent)?.def.parent.is_none(),
            None => true,
        };

        if shareable == Some(false) && has_dependents {
            return Err(CimError::failed(format!(
                "namespace {} has dependent namespaces and must stay shareable",
                ns
            )));
        }
        if updates_allowed == Some(true) && !parent_is_primary {
            return Err(CimError::failed(format!(
                "namespace {} cannot become updatable: its parent is not a primary namespace",
                ns
            )));
        }
        if updates_allowed == Some(false)
            && namespace.def.parent.is_some()
            && !namespace.tree.is_empty()
        {
            return Err(CimError::failed(format!(
                "namespace {} holds classes and cannot become a read-only dependent",
                ns
            )));
        }

        let namespace = self.name_space_mut(ns)?;
        if let Some(shareable) = shareable {
            namespace.def.shareable = shareable;
        }
        if let Some(updates_allowed) = updates_allowed {
            namespace.def.updates_allowed = updates_allowed;
        }
        Ok(())
    }

    /// Rename a namespace; dependents follow the new name.
    pub fn modify_name_space_name(
        &mut self,
        old: &NamespaceName,
        new: &NamespaceName,
    ) -> CimResult<()> {
        if self.namespaces.contains_key(new) {
            return Err(CimError::already_exists(format!("namespace {}", new)));
        }
        let mut namespace = self
            .namespaces
            .remove(old)
            .ok_or_else(|| CimError::invalid_namespace(old))?;
        namespace.def.name = new.clone();
        self.namespaces.insert(new.clone(), namespace);

        for other in self.namespaces.values_mut() {
            if other.def.parent.as_ref() == Some(old) {
                other.def.parent = Some(new.clone());
            }
        }
        info!("Renamed namespace {} to {}", old, new);
        Ok(())
    }

    /// Remote location of the namespace, if it is remote.
    pub fn is_remote_name_space(&self, ns: &NamespaceName) -> CimResult<Option<&str>> {
        Ok(self.name_space(ns)?.def.remote_info.as_deref())
    }

    pub fn has_dependent_name_space(&self, ns: &NamespaceName) -> bool {
        self.namespaces
            .values()
            .any(|n| n.def.parent.as_ref() == Some(ns))
    }

    /// Namespaces naming `ns` as their parent.
    pub fn dependent_name_space_names(&self, ns: &NamespaceName) -> Vec<NamespaceName> {
        self.namespaces
            .values()
            .filter(|n| n.def.parent.as_ref() == Some(ns))
            .map(|n| n.def.name.clone())
            .collect()
    }

    /// Namespace holding the schema used by `ns`: itself when updatable,
    /// otherwise the nearest updatable ancestor.
    pub fn rw_parent(&self, ns: &NamespaceName) -> CimResult<NamespaceName> {
        let mut current = self.name_space(ns)?;
        let mut hops = 0;
        while !current.def.updates_allowed && hops < self.namespaces.len() {
            match &current.def.parent {
                Some(parent) => current = self.name_space(parent)?,
                None => break,
            }
            hops += 1;
        }
        Ok(current.def.name.clone())
    }

    /// Topmost ancestor of `ns` (itself when it has no parent).
    pub fn primary_parent(&self, ns: &NamespaceName) -> CimResult<NamespaceName> {
        let mut current = self.name_space(ns)?;
        let mut hops = 0;
        while let Some(parent) = &current.def.parent {
            if hops >= self.namespaces.len() {
                break;
            }
            current = self.name_space(parent)?;
            hops += 1;
        }
        Ok(current.def.name.clone())
    }

    /// Namespaces searched for classes and qualifiers of `ns`, nearest first.
    pub fn schema_name_space_names(&self, ns: &NamespaceName) -> CimResult<Vec<NamespaceName>> {
        let rw = self.rw_parent(ns)?;
        let primary = self.primary_parent(&rw)?;
        let mut out = vec![rw.clone()];
        if primary != rw {
            out.push(primary);
        }
        Ok(out)
    }

    /// The schema namespace of `ns` plus every updatable namespace
    /// building on it.
    pub fn dependent_schema_name_space_names(
        &self,
        ns: &NamespaceName,
    ) -> CimResult<Vec<NamespaceName>> {
        let rw = self.rw_parent(ns)?;
        let mut out = vec![rw.clone()];
        for n in self.namespaces.values() {
            if n.def.updates_allowed
                && n.def.parent.is_some()
                && n.def.name != rw
                && self.primary_parent(&n.def.name)? == rw
            {
                out.push(n.def.name.clone());
            }
        }
        Ok(out)
    }

    /// Every namespace whose schema chain includes the schema of `ns`;
    /// these may hold instances of its classes.
    pub fn instance_name_space_names(&self, ns: &NamespaceName) -> CimResult<Vec<NamespaceName>> {
        let rw = self.rw_parent(ns)?;
        let mut out = Vec::new();
        for name in self.namespaces.keys() {
            if self.schema_name_space_names(name)?.contains(&rw) {
                out.push(name.clone());
            }
        }
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Classes
    // -----------------------------------------------------------------------

    /// Tree of one namespace (without its parent's classes).
    pub fn tree(&self, ns: &NamespaceName) -> CimResult<&InheritanceTree> {
        Ok(&self.name_space(ns)?.tree)
    }

    /// Namespace that owns `class_name` as seen from `ns`, and its superclass.
    pub fn locate_class(
        &self,
        ns: &NamespaceName,
        class_name: &CimName,
    ) -> CimResult<(NamespaceName, Option<CimName>)> {
        for schema_ns in self.schema_name_space_names(ns)? {
            if let Some(super_class) = self.tree(&schema_ns)?.get_super_class(class_name) {
                return Ok((schema_ns, super_class.cloned()));
            }
        }
        Err(CimError::not_found(format!(
            "class {} in namespace {}",
            class_name, ns
        )))
    }

    pub fn class_exists(&self, ns: &NamespaceName, class_name: &CimName) -> CimResult<bool> {
        for schema_ns in self.schema_name_space_names(ns)? {
            if self.tree(&schema_ns)?.contains_class(class_name) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Fails with INVALID_CLASS when the class is not visible from `ns`.
    pub fn validate_class(&self, ns: &NamespaceName, class_name: &CimName) -> CimResult<()> {
        if self.class_exists(ns, class_name)? {
            Ok(())
        } else {
            Err(CimError::invalid_class(class_name))
        }
    }

    /// Stored spelling of a class name.
    pub fn canonical_class_name(
        &self,
        ns: &NamespaceName,
        class_name: &CimName,
    ) -> CimResult<CimName> {
        let (owner, _) = self.locate_class(ns, class_name)?;
        Ok(self
            .tree(&owner)?
            .canonical_name(class_name)
            .cloned()
            .unwrap_or_else(|| class_name.clone()))
    }

    /// None for a root class; NOT_FOUND for an unknown class.
    pub fn get_super_class_name(
        &self,
        ns: &NamespaceName,
        class_name: &CimName,
    ) -> CimResult<Option<CimName>> {
        Ok(self.locate_class(ns, class_name)?.1)
    }

    /// All ancestors, nearest first.
    pub fn get_super_class_names(
        &self,
        ns: &NamespaceName,
        class_name: &CimName,
    ) -> CimResult<Vec<CimName>> {
        let mut next = self
            .locate_class(ns, class_name)
            .map_err(|_| CimError::invalid_class(class_name))?
            .1;
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(class_name.clone());
        while let Some(super_class) = next {
            if !seen.insert(super_class.clone()) {
                break;
            }
            next = match self.locate_class(ns, &super_class) {
                Ok((_, sc)) => sc,
                Err(_) => None,
            };
            out.push(super_class);
        }
        Ok(out)
    }

    /// Subclass names visible from `ns`, in no particular order.
    pub fn get_sub_class_names(
        &self,
        ns: &NamespaceName,
        class_name: Option<&CimName>,
        deep: bool,
    ) -> CimResult<Vec<CimName>> {
        let trees = self
            .schema_name_space_names(ns)?
            .iter()
            .map(|s| self.tree(s))
            .collect::<CimResult<Vec<_>>>()?;

        let class_name = match class_name {
            Some(name) => name,
            None => {
                let mut out = Vec::new();
                for tree in &trees {
                    if deep {
                        out.extend(tree.class_names().cloned());
                    } else {
                        out.extend(
                            tree.class_names()
                                .filter(|c| tree.get_super_class(c) == Some(None))
                                .cloned(),
                        );
                    }
                }
                return Ok(out);
            }
        };

        if !trees.iter().any(|t| t.contains_class(class_name)) {
            return Err(CimError::invalid_class(class_name));
        }

        let mut out = Vec::new();
        let mut seen: HashSet<CimName> = HashSet::new();
        seen.insert(class_name.clone());
        let mut queue = VecDeque::new();
        queue.push_back(class_name.clone());
        while let Some(current) = queue.pop_front() {
            for tree in &trees {
                for child in tree.children_of(&current) {
                    if seen.insert(child.clone()) {
                        out.push(child.clone());
                        if deep {
                            queue.push_back(child.clone());
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    /// Check that `class_name` may be created from `ns`; returns the
    /// namespace that will own it.
    pub fn check_create_class(
        &self,
        ns: &NamespaceName,
        class_name: &CimName,
        super_class: Option<&CimName>,
    ) -> CimResult<NamespaceName> {
        let target = self.rw_parent(ns)?;

        let mut scope = self.schema_name_space_names(&target)?;
        scope.extend(self.dependent_schema_name_space_names(&target)?);
        for n in &scope {
            if self.tree(n)?.contains_class(class_name) {
                return Err(CimError::already_exists(format!(
                    "class {} in namespace {}",
                    class_name, n
                )));
            }
        }

        if let Some(super_class) = super_class {
            if !self.class_exists(&target, super_class)? {
                return Err(CimError::invalid_superclass(format!(
                    "superclass {} of {} not found in namespace {}",
                    super_class, class_name, ns
                )));
            }
        }
        Ok(target)
    }

    /// Register a class edge after [`check_create_class`](Self::check_create_class).
    pub fn create_class(
        &mut self,
        ns: &NamespaceName,
        class_name: CimName,
        super_class: Option<CimName>,
    ) -> CimResult<NamespaceName> {
        let target = self.check_create_class(ns, &class_name, super_class.as_ref())?;
        self.name_space_mut(&target)?
            .tree
            .insert(class_name, super_class)?;
        Ok(target)
    }

    /// Check a class modification; returns the owning namespace and the
    /// current superclass.
    pub fn check_modify_class(
        &self,
        ns: &NamespaceName,
        class_name: &CimName,
        super_class: Option<&CimName>,
    ) -> CimResult<(NamespaceName, Option<CimName>)> {
        let (owner, old_super) = self.locate_class(ns, class_name)?;
        if let Some(sc) = super_class {
            if sc == class_name || !self.class_exists(&owner, sc)? {
                return Err(CimError::invalid_superclass(format!(
                    "superclass {} of {} not found",
                    sc, class_name
                )));
            }
            if self
                .get_sub_class_names(&owner, Some(class_name), true)?
                .contains(sc)
            {
                return Err(CimError::invalid_superclass(format!(
                    "{} cannot derive from its own subclass {}",
                    class_name, sc
                )));
            }
        }
        Ok((owner, old_super))
    }

    /// Apply a superclass change (no-op when unchanged).
    pub fn modify_class(
        &mut self,
        ns: &NamespaceName,
        class_name: &CimName,
        super_class: Option<CimName>,
    ) -> CimResult<NamespaceName> {
        let (owner, old_super) = self.check_modify_class(ns, class_name, super_class.as_ref())?;
        if old_super != super_class {
            self.name_space_mut(&owner)?
                .tree
                .reparent(class_name, super_class)?;
        }
        Ok(owner)
    }

    /// Remove a class edge.
    ///
    /// Fails with CLASS_HAS_CHILDREN while subclasses exist in the owning
    /// namespace or its updatable dependents, and with CLASS_HAS_INSTANCES
    /// when `has_instances` reports instances in any namespace using the
    /// class. Returns the owning namespace.
    pub fn delete_class(
        &mut self,
        ns: &NamespaceName,
        class_name: &CimName,
        mut has_instances: impl FnMut(&NamespaceName) -> CimResult<bool>,
    ) -> CimResult<NamespaceName> {
        let (owner, _) = self.locate_class(ns, class_name)?;

        for n in self.dependent_schema_name_space_names(&owner)? {
            if self.tree(&n)?.has_sub_classes(class_name) {
                return Err(CimError::class_has_children(class_name));
            }
        }
        for n in self.instance_name_space_names(&owner)? {
            if has_instances(&n)? {
                return Err(CimError::class_has_instances(format!(
                    "{} has instances in namespace {}",
                    class_name, n
                )));
            }
        }

        self.name_space_mut(&owner)?.tree.remove(class_name)?;
        Ok(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CimStatusCode;

    fn ns(s: &str) -> NamespaceName {
        NamespaceName::new(s).unwrap()
    }

    fn n(s: &str) -> CimName {
        CimName::new(s)
    }

    fn no_instances(_: &NamespaceName) -> CimResult<bool> {
        Ok(false)
    }

    #[test]
    fn test_create_and_delete_classes_in_order() {
        let mut mgr = NameSpaceManager::new();
        let aa = ns("aa/bb");
        mgr.create_name_space(NamespaceDefinition::new(aa.clone()))
            .unwrap();

        mgr.create_class(&aa, n("MySuperClass"), None).unwrap();
        mgr.create_class(&aa, n("MyClass"), Some(n("MySuperClass")))
            .unwrap();
        assert_eq!(
            mgr.get_super_class_name(&aa, &n("MyClass")).unwrap(),
            Some(n("MySuperClass"))
        );
        assert_eq!(mgr.get_super_class_name(&aa, &n("MySuperClass")).unwrap(), None);

        let err = mgr
            .delete_class(&aa, &n("MySuperClass"), no_instances)
            .unwrap_err();
        assert!(err.is(CimStatusCode::ClassHasChildren));

        mgr.delete_class(&aa, &n("MyClass"), no_instances).unwrap();
        mgr.delete_class(&aa, &n("MySuperClass"), no_instances)
            .unwrap();
        mgr.tree(&aa).unwrap().check().unwrap();
    }

    #[test]
    fn test_unknown_class_and_namespace() {
        let mut mgr = NameSpaceManager::new();
        let root = ns("root");
        mgr.create_name_space(NamespaceDefinition::new(root.clone()))
            .unwrap();

        let err = mgr.get_super_class_name(&root, &n("Nope")).unwrap_err();
        assert!(err.is(CimStatusCode::NotFound));
        let err = mgr.get_sub_class_names(&root, Some(&n("Nope")), true).unwrap_err();
        assert!(err.is(CimStatusCode::InvalidClass));
        let err = mgr.tree(&ns("missing")).unwrap_err();
        assert!(err.is(CimStatusCode::InvalidNamespace));
        let err = mgr.create_class(&root, n("X"), Some(n("Nope"))).unwrap_err();
        assert!(err.is(CimStatusCode::InvalidSuperclass));
    }

    #[test]
    fn test_delete_namespace_requires_empty() {
        let mut mgr = NameSpaceManager::new();
        let test = ns("test/empty");
        mgr.create_name_space(NamespaceDefinition::new(test.clone()))
            .unwrap();
        mgr.create_class(&test, n("A"), None).unwrap();

        let err = mgr.delete_name_space(&test).unwrap_err();
        assert!(err.is(CimStatusCode::NamespaceNotEmpty));

        mgr.delete_class(&test, &n("A"), no_instances).unwrap();
        mgr.delete_name_space(&test).unwrap();
        assert!(!mgr.get_name_space_names().contains(&test));
        assert!(!mgr.name_space_exists(&test));
    }

    #[test]
    fn test_duplicate_namespace() {
        let mut mgr = NameSpaceManager::new();
        mgr.create_name_space(NamespaceDefinition::new(ns("root")))
            .unwrap();
        let err = mgr
            .create_name_space(NamespaceDefinition::new(ns("ROOT")))
            .unwrap_err();
        assert!(err.is(CimStatusCode::AlreadyExists));
    }

    #[test]
    fn test_parent_rules() {
        let mut mgr = NameSpaceManager::new();
        let primary = ns("shared");
        let closed = ns("closed");
        mgr.create_name_space(NamespaceDefinition::new(primary.clone()).shareable(true))
            .unwrap();
        mgr.create_name_space(NamespaceDefinition::new(closed.clone()))
            .unwrap();

        let err = mgr
            .create_name_space(NamespaceDefinition::new(ns("x")).with_parent(closed))
            .unwrap_err();
        assert!(err.is(CimStatusCode::Failed));

        let err = mgr
            .create_name_space(NamespaceDefinition::new(ns("y")).with_parent(ns("absent")))
            .unwrap_err();
        assert!(err.is(CimStatusCode::Failed));

        let rw = ns("shared/rw");
        mgr.create_name_space(
            NamespaceDefinition::new(rw.clone())
                .with_parent(primary.clone())
                .shareable(true),
        )
        .unwrap();

        // Updatable grandchild is not allowed, read-only one is.
        let err = mgr
            .create_name_space(NamespaceDefinition::new(ns("shared/rw/rw2")).with_parent(rw.clone()))
            .unwrap_err();
        assert!(err.is(CimStatusCode::Failed));
        mgr.create_name_space(
            NamespaceDefinition::new(ns("shared/rw/ro"))
                .with_parent(rw.clone())
                .updates_allowed(false),
        )
        .unwrap();

        let err = mgr.delete_name_space(&primary).unwrap_err();
        assert!(err.is(CimStatusCode::Failed));
        let err = mgr.modify_name_space(&rw, Some(false), None).unwrap_err();
        assert!(err.is(CimStatusCode::Failed));
    }

    #[test]
    fn test_shared_schema_lookup() {
        let mut mgr = NameSpaceManager::new();
        let primary = ns("shared");
        let rw = ns("shared/rw");
        let ro = ns("shared/ro");
        mgr.create_name_space(NamespaceDefinition::new(primary.clone()).shareable(true))
            .unwrap();
        mgr.create_name_space(NamespaceDefinition::new(rw.clone()).with_parent(primary.clone()))
            .unwrap();
        mgr.create_name_space(
            NamespaceDefinition::new(ro.clone())
                .with_parent(primary.clone())
                .updates_allowed(false),
        )
        .unwrap();

        assert_eq!(mgr.rw_parent(&ro).unwrap(), primary);
        assert_eq!(mgr.rw_parent(&rw).unwrap(), rw);
        assert_eq!(
            mgr.schema_name_space_names(&rw).unwrap(),
            vec![rw.clone(), primary.clone()]
        );

        mgr.create_class(&primary, n("CIM_Base"), None).unwrap();
        mgr.create_class(&rw, n("TST_Local"), Some(n("CIM_Base")))
            .unwrap();

        // Visible through the parent chain.
        assert_eq!(mgr.locate_class(&ro, &n("CIM_Base")).unwrap().0, primary);
        assert_eq!(mgr.locate_class(&rw, &n("TST_Local")).unwrap().0, rw);
        assert!(mgr.locate_class(&primary, &n("TST_Local")).is_err());

        let subs = mgr
            .get_sub_class_names(&rw, Some(&n("CIM_Base")), true)
            .unwrap();
        assert_eq!(subs, vec![n("TST_Local")]);
        assert_eq!(
            mgr.get_super_class_names(&rw, &n("TST_Local")).unwrap(),
            vec![n("CIM_Base")]
        );

        // Names are unique across the primary and its updatable dependents.
        let err = mgr.create_class(&primary, n("TST_Local"), None).unwrap_err();
        assert!(err.is(CimStatusCode::AlreadyExists));
        let err = mgr.create_class(&rw, n("CIM_Base"), None).unwrap_err();
        assert!(err.is(CimStatusCode::AlreadyExists));

        // Subclass in a dependent blocks deletion in the primary.
        let err = mgr
            .delete_class(&primary, &n("CIM_Base"), no_instances)
            .unwrap_err();
        assert!(err.is(CimStatusCode::ClassHasChildren));

        let instance_namespaces = mgr.instance_name_space_names(&primary).unwrap();
        assert_eq!(instance_namespaces.len(), 3);

        mgr.check_tree(&rw).unwrap();
    }

    #[test]
    fn test_delete_class_blocked_by_instances() {
        let mut mgr = NameSpaceManager::new();
        let root = ns("root/test");
        mgr.create_name_space(NamespaceDefinition::new(root.clone()))
            .unwrap();
        mgr.create_class(&root, n("A"), None).unwrap();

        let err = mgr
            .delete_class(&root, &n("A"), |_| Ok(true))
            .unwrap_err();
        assert!(err.is(CimStatusCode::ClassHasInstances));
        assert!(mgr.class_exists(&root, &n("A")).unwrap());
    }

    #[test]
    fn test_load_rejects_invalid_tree() {
        let mut mgr = NameSpaceManager::new();
        let bad = ns("bad");
        let err = mgr
            .load_name_space(
                NamespaceDefinition::new(bad.clone()),
                vec![(n("D"), Some(n("B"))), (n("A"), None)],
            )
            .unwrap_err();
        assert!(matches!(err, CimError::InvalidInheritanceTree(_)));
        assert!(!mgr.name_space_exists(&bad));

        let good = ns("good");
        mgr.load_name_space(
            NamespaceDefinition::new(good.clone()),
            vec![(n("B"), Some(n("A"))), (n("A"), None)],
        )
        .unwrap();
        assert_eq!(mgr.tree(&good).unwrap().len(), 2);
    }

    #[test]
    fn test_rename_namespace() {
        let mut mgr = NameSpaceManager::new();
        let old = ns("old");
        let new = ns("new");
        mgr.create_name_space(NamespaceDefinition::new(old.clone()).shareable(true))
            .unwrap();
        mgr.create_name_space(NamespaceDefinition::new(ns("old/child")).with_parent(old.clone()))
            .unwrap();
        mgr.create_class(&old, n("A"), None).unwrap();

        mgr.modify_name_space_name(&old, &new).unwrap();
        assert!(!mgr.name_space_exists(&old));
        assert!(mgr.class_exists(&new, &n("A")).unwrap());
        assert_eq!(
            mgr.get_name_space(&ns("old/child")).unwrap().parent,
            Some(new.clone())
        );
    }

    #[test]
    fn test_modify_class_superclass() {
        let mut mgr = NameSpaceManager::new();
        let root = ns("root");
        mgr.create_name_space(NamespaceDefinition::new(root.clone()))
            .unwrap();
        mgr.create_class(&root, n("A"), None).unwrap();
        mgr.create_class(&root, n("B"), Some(n("A"))).unwrap();
        mgr.create_class(&root, n("C"), None).unwrap();

        mgr.modify_class(&root, &n("B"), Some(n("C"))).unwrap();
        assert_eq!(mgr.get_super_class_name(&root, &n("B")).unwrap(), Some(n("C")));

        let err = mgr.modify_class(&root, &n("C"), Some(n("B"))).unwrap_err();
        assert!(err.is(CimStatusCode::InvalidSuperclass));
    }

    #[test]
    fn test_attributes() {
        let mut attrs = NamespaceAttributes::new();
        attrs.insert("Shareable".into(), "TRUE".into());
        attrs.insert("updatesAllowed".into(), "false".into());
        attrs.insert("parent".into(), "root/shared".into());
        let def = NamespaceDefinition::from_attributes(ns("root/child"), &attrs).unwrap();
        assert!(def.shareable);
        assert!(!def.updates_allowed);
        assert_eq!(def.parent, Some(ns("root/shared")));

        let back = def.to_attributes();
        assert_eq!(back.get("name").map(String::as_str), Some("root/child"));
        assert_eq!(back.get("updatesAllowed").map(String::as_str), Some("false"));
        assert!(!back.contains_key("remoteInfo"));

        attrs.insert("color".into(), "blue".into());
        let err = NamespaceDefinition::from_attributes(ns("x"), &attrs).unwrap_err();
        assert!(err.is(CimStatusCode::NotSupported));

        let mut modify = NamespaceAttributes::new();
        modify.insert("shareable".into(), "false".into());
        assert_eq!(parse_modify_attributes(&modify).unwrap(), (Some(false), None));
        modify.insert("parent".into(), "root".into());
        assert!(parse_modify_attributes(&modify).unwrap_err().is(CimStatusCode::NotSupported));
        let mut bad = NamespaceAttributes::new();
        bad.insert("shareable".into(), "maybe".into());
        assert!(parse_modify_attributes(&bad).unwrap_err().is(CimStatusCode::InvalidParameter));
    }

    #[test]
    fn test_remote_info() {
        let mut mgr = NameSpaceManager::new();
        let remote = ns("remote");
        mgr.create_name_space(NamespaceDefinition::new(remote.clone()).remote_info("host:5989"))
            .unwrap();
        assert_eq!(mgr.is_remote_name_space(&remote).unwrap(), Some("host:5989"));
    }
}
