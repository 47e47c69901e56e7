// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Repository facade.
//!
//! [`CimRepository`] serializes writers behind one `parking_lot::RwLock`
//! around the namespace registry; readers share it. The association class
//! caches sit behind their own mutex, always taken after the registry lock.
//!
//! Classes are stored as local definitions and resolved on read unless
//! `store_complete_classes` is set, in which case the resolved form is
//! stored and superclass changes are refused.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::association::{build_class_associations, build_instance_associations, ClassAssociation};
use crate::assoc_cache::AssocClassCacheManager;
use crate::cache::{ObjectCache, RepositoryCacheStats};
use crate::config::{Backend, RepositoryConfig};
use crate::error::{CimError, CimResult, CimStatusCode};
use crate::model::{
    CimClass, CimInstance, CimName, CimObject, CimObjectPath, CimProperty, CimQualifierDecl,
    CimValue, NamespaceName,
};
use crate::namespace::{
    parse_modify_attributes, NameSpaceManager, NamespaceAttributes, NamespaceDefinition,
};
use crate::resolver::{resolve_class, resolve_instance, DeclContext};
use crate::store::{FileStore, PersistentStore, SqliteStore};

/// Name of the namespace created when a repository is empty.
pub const ROOT_NAMESPACE: &str = "root";

/// Filters for associator traversal.
///
/// `assoc_class` and `result_class` include their subclasses.
#[derive(Debug, Clone, Default)]
pub struct AssociatorFilter {
    pub assoc_class: Option<CimName>,
    pub result_class: Option<CimName>,
    pub role: Option<CimName>,
    pub result_role: Option<CimName>,
}

impl AssociatorFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assoc_class(mut self, name: impl Into<CimName>) -> Self {
        self.assoc_class = Some(name.into());
        self
    }

    pub fn result_class(mut self, name: impl Into<CimName>) -> Self {
        self.result_class = Some(name.into());
        self
    }

    pub fn role(mut self, role: impl Into<CimName>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn result_role(mut self, role: impl Into<CimName>) -> Self {
        self.result_role = Some(role.into());
        self
    }
}

/// Filters for reference traversal; `result_class` selects association
/// classes (with subclasses), `role` the source's property name.
#[derive(Debug, Clone, Default)]
pub struct ReferenceFilter {
    pub result_class: Option<CimName>,
    pub role: Option<CimName>,
}

impl ReferenceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn result_class(mut self, name: impl Into<CimName>) -> Self {
        self.result_class = Some(name.into());
        self
    }

    pub fn role(mut self, role: impl Into<CimName>) -> Self {
        self.role = Some(role.into());
        self
    }
}

/// Resolved form of an [`AssociatorFilter`]: class filters expanded to
/// include subclasses.
struct RecordFilter {
    assoc_classes: Option<Vec<CimName>>,
    result_classes: Option<Vec<CimName>>,
    role: Option<CimName>,
    result_role: Option<CimName>,
}

impl RecordFilter {
    fn matches(
        &self,
        assoc_class: &CimName,
        from_property: &CimName,
        to_class: &CimName,
        to_property: &CimName,
    ) -> bool {
        self.assoc_classes
            .as_ref()
            .map_or(true, |list| list.contains(assoc_class))
            && self
                .result_classes
                .as_ref()
                .map_or(true, |list| list.contains(to_class))
            && self.role.as_ref().map_or(true, |r| r == from_property)
            && self.result_role.as_ref().map_or(true, |r| r == to_property)
    }
}

pub struct CimRepository {
    config: RepositoryConfig,
    store: Box<dyn PersistentStore>,
    namespaces: RwLock<NameSpaceManager>,
    assoc_caches: Mutex<AssocClassCacheManager>,
    class_cache: ObjectCache<CimClass>,
    qualifier_cache: ObjectCache<CimQualifierDecl>,
}

/// Resolution context over the repository while a lock is held.
struct RepoContext<'a> {
    repo: &'a CimRepository,
    mgr: &'a NameSpaceManager,
}

impl DeclContext for RepoContext<'_> {
    fn lookup_qualifier_decl(
        &self,
        namespace: &NamespaceName,
        name: &CimName,
    ) -> CimResult<Option<CimQualifierDecl>> {
        Ok(self
            .repo
            .find_qualifier(self.mgr, namespace, name)?
            .map(|decl| (*decl).clone()))
    }

    fn lookup_class(
        &self,
        namespace: &NamespaceName,
        name: &CimName,
    ) -> CimResult<Option<CimClass>> {
        Ok(self
            .repo
            .resolved_class(self.mgr, namespace, name)?
            .map(|class| (*class).clone()))
    }
}

impl CimRepository {
    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Open the repository described by `config`, creating it if needed.
    pub fn open(config: RepositoryConfig) -> CimResult<Self> {
        config.validate()?;
        let store: Box<dyn PersistentStore> = match config.backend {
            Backend::File => Box::new(FileStore::new(&config.root, config.encoding)?),
            Backend::Sqlite => {
                std::fs::create_dir_all(&config.root)?;
                Box::new(SqliteStore::new(config.sqlite_path(), config.encoding)?)
            }
        };
        Self::with_store(config, store)
    }

    /// Volatile repository over an in-memory SQLite database.
    pub fn in_memory() -> CimResult<Self> {
        Self::with_store(
            RepositoryConfig::default(),
            Box::new(SqliteStore::new_in_memory()?),
        )
    }

    /// Build a repository over an already opened store and load its content.
    pub fn with_store(config: RepositoryConfig, store: Box<dyn PersistentStore>) -> CimResult<Self> {
        let mgr = load_namespaces(store.as_ref())?;
        let repo = Self {
            class_cache: ObjectCache::new(config.class_cache_size),
            qualifier_cache: ObjectCache::new(config.qualifier_cache_size),
            config,
            store,
            namespaces: RwLock::new(mgr),
            assoc_caches: Mutex::new(AssocClassCacheManager::new()),
        };

        let root = NamespaceName::new(ROOT_NAMESPACE)?;
        if !repo.namespace_exists(&root) {
            repo.create_namespace(NamespaceDefinition::new(root))?;
        }
        Ok(repo)
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Re-validate every inheritance tree.
    pub fn check(&self) -> CimResult<()> {
        let mgr = self.namespaces.read();
        for ns in mgr.get_name_space_names() {
            mgr.check_tree(&ns)?;
        }
        let stats = self.cache_stats();
        debug!(
            "Inheritance trees consistent (class cache {:?}, qualifier cache {:?})",
            stats.classes, stats.qualifiers
        );
        Ok(())
    }

    pub fn cache_stats(&self) -> RepositoryCacheStats {
        RepositoryCacheStats {
            classes: self.class_cache.enabled_stats(),
            qualifiers: self.qualifier_cache.enabled_stats(),
        }
    }

    // -----------------------------------------------------------------------
    // Namespaces
    // -----------------------------------------------------------------------

    pub fn create_namespace(&self, def: NamespaceDefinition) -> CimResult<()> {
        let mut mgr = self.namespaces.write();
        mgr.create_name_space(def.clone())?;
        if let Err(e) = self.store.create_namespace(&def) {
            if let Err(rollback) = mgr.delete_name_space(&def.name) {
                warn!(
                    "Namespace {} left registered after store failure: {}",
                    def.name, rollback
                );
            }
            return Err(e);
        }
        Ok(())
    }

    /// Create from attribute names (`shareable`, `updatesAllowed`, `parent`,
    /// `remoteInfo`).
    pub fn create_namespace_with_attributes(
        &self,
        name: &NamespaceName,
        attributes: &NamespaceAttributes,
    ) -> CimResult<()> {
        self.create_namespace(NamespaceDefinition::from_attributes(
            name.clone(),
            attributes,
        )?)
    }

    /// Change `shareable` and/or `updatesAllowed`.
    pub fn modify_namespace(
        &self,
        ns: &NamespaceName,
        attributes: &NamespaceAttributes,
    ) -> CimResult<()> {
        let (shareable, updates_allowed) = parse_modify_attributes(attributes)?;
        let mut mgr = self.namespaces.write();
        let previous = mgr.get_name_space(ns)?.clone();
        mgr.modify_name_space(ns, shareable, updates_allowed)?;

        let updated = mgr.get_name_space(ns)?.clone();
        if let Err(e) = self.store.update_namespace(&updated) {
            if let Err(rollback) = mgr.modify_name_space(
                ns,
                Some(previous.shareable),
                Some(previous.updates_allowed),
            ) {
                warn!("Namespace {} attributes not restored: {}", ns, rollback);
            }
            return Err(e);
        }
        info!(
            "Modified namespace {} (shareable={}, updatesAllowed={})",
            ns, updated.shareable, updated.updates_allowed
        );
        Ok(())
    }

    pub fn modify_namespace_name(&self, old: &NamespaceName, new: &NamespaceName) -> CimResult<()> {
        let mut mgr = self.namespaces.write();
        mgr.get_name_space(old)?;
        if mgr.name_space_exists(new) {
            return Err(CimError::already_exists(format!("namespace {}", new)));
        }

        self.store.rename_namespace(old, new)?;
        mgr.modify_name_space_name(old, new)?;
        for dependent in mgr.dependent_name_space_names(new) {
            self.store.update_namespace(mgr.get_name_space(&dependent)?)?;
        }

        self.assoc_caches.lock().rename_cache(old, new);
        self.invalidate_schema_caches();
        Ok(())
    }

    /// Delete an empty namespace without dependents.
    pub fn delete_namespace(&self, ns: &NamespaceName) -> CimResult<()> {
        let mut mgr = self.namespaces.write();
        mgr.get_name_space(ns)?;
        if mgr.has_dependent_name_space(ns) {
            return Err(CimError::failed(format!(
                "namespace {} has dependent namespaces",
                ns
            )));
        }
        if !self.store.is_namespace_empty(ns)? {
            return Err(CimError::namespace_not_empty(ns));
        }

        self.store.delete_namespace(ns)?;
        mgr.delete_name_space(ns)?;
        self.assoc_caches.lock().remove_cache(ns);
        self.invalidate_schema_caches();
        Ok(())
    }

    /// Namespace names in sorted order.
    pub fn enumerate_namespaces(&self) -> Vec<NamespaceName> {
        let mut names = self.namespaces.read().get_name_space_names();
        names.sort();
        names
    }

    pub fn namespace_exists(&self, ns: &NamespaceName) -> bool {
        self.namespaces.read().name_space_exists(ns)
    }

    pub fn get_namespace_attributes(&self, ns: &NamespaceName) -> CimResult<NamespaceAttributes> {
        Ok(self.namespaces.read().get_name_space(ns)?.to_attributes())
    }

    /// Remote location of a remote namespace.
    pub fn is_remote_namespace(&self, ns: &NamespaceName) -> CimResult<Option<String>> {
        Ok(self
            .namespaces
            .read()
            .is_remote_name_space(ns)?
            .map(str::to_string))
    }

    // -----------------------------------------------------------------------
    // Qualifier declarations
    // -----------------------------------------------------------------------

    pub fn set_qualifier(&self, ns: &NamespaceName, decl: &CimQualifierDecl) -> CimResult<()> {
        decl.name().check_legal("qualifier")?;
        let mgr = self.namespaces.write();
        check_schema_writable(&mgr, ns)?;
        self.store.set_qualifier(ns, decl)?;
        self.invalidate_qualifier(ns, decl.name());
        debug!("Set qualifier {} in {}", decl.name(), ns);
        Ok(())
    }

    /// Declaration visible from `ns`, searching its schema namespaces.
    pub fn get_qualifier(&self, ns: &NamespaceName, name: &CimName) -> CimResult<CimQualifierDecl> {
        let mgr = self.namespaces.read();
        self.find_qualifier(&mgr, ns, name)?
            .map(|decl| (*decl).clone())
            .ok_or_else(|| CimError::not_found(format!("qualifier {} in namespace {}", name, ns)))
    }

    pub fn delete_qualifier(&self, ns: &NamespaceName, name: &CimName) -> CimResult<()> {
        let mgr = self.namespaces.write();
        check_schema_writable(&mgr, ns)?;
        self.store.delete_qualifier(ns, name)?;
        self.invalidate_qualifier(ns, name);
        Ok(())
    }

    /// Declarations visible from `ns`; a nearer namespace hides a
    /// declaration of the same name in its parent.
    pub fn enumerate_qualifiers(&self, ns: &NamespaceName) -> CimResult<Vec<CimQualifierDecl>> {
        let mgr = self.namespaces.read();
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for schema_ns in mgr.schema_name_space_names(ns)? {
            for decl in self.store.enumerate_qualifiers(&schema_ns)? {
                if seen.insert(decl.name().clone()) {
                    out.push(decl);
                }
            }
        }
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Classes
    // -----------------------------------------------------------------------

    /// Resolved class with the GetClass result options applied.
    pub fn get_class(
        &self,
        ns: &NamespaceName,
        class_name: &CimName,
        local_only: bool,
        include_qualifiers: bool,
        include_class_origin: bool,
        property_list: Option<&[CimName]>,
    ) -> CimResult<CimClass> {
        let mgr = self.namespaces.read();
        self.get_class_locked(
            &mgr,
            ns,
            class_name,
            local_only,
            include_qualifiers,
            include_class_origin,
            property_list,
        )
    }

    pub fn enumerate_class_names(
        &self,
        ns: &NamespaceName,
        class_name: Option<&CimName>,
        deep_inheritance: bool,
    ) -> CimResult<Vec<CimName>> {
        self.namespaces
            .read()
            .get_sub_class_names(ns, class_name, deep_inheritance)
    }

    pub fn enumerate_classes(
        &self,
        ns: &NamespaceName,
        class_name: Option<&CimName>,
        deep_inheritance: bool,
        local_only: bool,
        include_qualifiers: bool,
        include_class_origin: bool,
    ) -> CimResult<Vec<CimClass>> {
        let mgr = self.namespaces.read();
        mgr.get_sub_class_names(ns, class_name, deep_inheritance)?
            .iter()
            .map(|name| {
                self.get_class_locked(
                    &mgr,
                    ns,
                    name,
                    local_only,
                    include_qualifiers,
                    include_class_origin,
                    None,
                )
            })
            .collect()
    }

    /// None for a root class; NOT_FOUND for an unknown class.
    pub fn get_super_class_name(
        &self,
        ns: &NamespaceName,
        class_name: &CimName,
    ) -> CimResult<Option<CimName>> {
        self.namespaces.read().get_super_class_name(ns, class_name)
    }

    pub fn get_super_class_names(
        &self,
        ns: &NamespaceName,
        class_name: &CimName,
    ) -> CimResult<Vec<CimName>> {
        self.namespaces.read().get_super_class_names(ns, class_name)
    }

    pub fn get_sub_class_names(
        &self,
        ns: &NamespaceName,
        class_name: Option<&CimName>,
        deep_inheritance: bool,
    ) -> CimResult<Vec<CimName>> {
        self.enumerate_class_names(ns, class_name, deep_inheritance)
    }

    pub fn create_class(&self, ns: &NamespaceName, class: &CimClass) -> CimResult<()> {
        class.check_names()?;
        let mut mgr = self.namespaces.write();
        check_schema_writable(&mgr, ns)?;

        let mut local = class.clone();
        local.strip_propagated();
        let target = mgr.check_create_class(ns, local.name(), local.super_class())?;

        let mut resolved = local.clone();
        resolve_class(&mut resolved, &RepoContext { repo: self, mgr: &mgr }, &target)?;
        let associations = build_class_associations(&resolved);

        let stored = if self.config.store_complete_classes {
            &resolved
        } else {
            &local
        };
        self.store.create_class(&target, stored, &associations)?;
        mgr.create_class(ns, local.name().clone(), local.super_class().cloned())?;

        self.update_assoc_cache(&target, local.name(), &associations);
        info!(
            "Created class {} in {}{}",
            local.name(),
            target,
            if associations.is_empty() { "" } else { " (association)" }
        );
        Ok(())
    }

    pub fn modify_class(&self, ns: &NamespaceName, class: &CimClass) -> CimResult<()> {
        class.check_names()?;
        let mut mgr = self.namespaces.write();
        check_schema_writable(&mgr, ns)?;

        let mut local = class.clone();
        local.strip_propagated();
        let (owner, old_super) =
            mgr.check_modify_class(ns, local.name(), local.super_class())?;
        check_owned(ns, &owner, local.name())?;

        if self.config.store_complete_classes {
            if old_super.as_ref() != local.super_class() {
                return Err(CimError::failed(format!(
                    "superclass of {} cannot be changed",
                    local.name()
                )));
            }
            if !mgr
                .get_sub_class_names(ns, Some(local.name()), false)?
                .is_empty()
            {
                return Err(CimError::class_has_children(local.name()));
            }
        }

        let mut resolved = local.clone();
        resolve_class(&mut resolved, &RepoContext { repo: self, mgr: &mgr }, &owner)?;
        let associations = build_class_associations(&resolved);

        let stored = if self.config.store_complete_classes {
            &resolved
        } else {
            &local
        };
        self.store.modify_class(&owner, stored, &associations)?;
        mgr.modify_class(ns, local.name(), local.super_class().cloned())?;

        self.evict_class_tree(&mgr, &owner, local.name());
        self.update_assoc_cache(&owner, local.name(), &associations);
        info!("Modified class {} in {}", local.name(), owner);
        Ok(())
    }

    /// Delete a class without subclasses or instances.
    pub fn delete_class(&self, ns: &NamespaceName, class_name: &CimName) -> CimResult<()> {
        let mut mgr = self.namespaces.write();
        check_schema_writable(&mgr, ns)?;
        let (owner, super_class) = mgr.locate_class(ns, class_name)?;
        check_owned(ns, &owner, class_name)?;
        let class_name = mgr.canonical_class_name(ns, class_name)?;

        let store = self.store.as_ref();
        mgr.delete_class(ns, &class_name, |n| store.class_has_instances(n, &class_name))?;
        if let Err(e) = store.delete_class(&owner, &class_name) {
            if let Err(rollback) = mgr.create_class(&owner, class_name.clone(), super_class) {
                warn!("Class {} not restored in {}: {}", class_name, owner, rollback);
            }
            return Err(e);
        }

        self.class_cache.evict(&owner, &class_name);
        if let Some(cache) = self.assoc_caches.lock().active_cache_mut(&owner) {
            cache.remove_assoc_class_records(&class_name);
        }
        info!("Deleted class {} from {}", class_name, owner);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Instances
    // -----------------------------------------------------------------------

    /// Store a new instance and return its path (without namespace).
    pub fn create_instance(
        &self,
        ns: &NamespaceName,
        instance: &CimInstance,
    ) -> CimResult<CimObjectPath> {
        let mgr = self.namespaces.write();
        mgr.get_name_space(ns)?;

        let mut resolved = instance.clone();
        let class = resolve_instance(
            &mut resolved,
            &RepoContext { repo: self, mgr: &mgr },
            ns,
            false,
        )?;
        if !class.has_keys() {
            return Err(CimError::failed(format!("class has no keys: {}", class.name())));
        }

        let path = class.build_path(&resolved)?;
        if self.instance_exists_in_hierarchy(&mgr, ns, &path)? {
            return Err(CimError::already_exists(format!("instance {}", path)));
        }
        resolved.set_path(Some(path.clone()));

        let associations = if class.is_association() {
            build_instance_associations(&resolved, &path)
        } else {
            Vec::new()
        };
        self.store.create_instance(ns, &resolved, &associations)?;
        debug!("Created instance {} in {}", path, ns);
        Ok(path)
    }

    pub fn get_instance(
        &self,
        ns: &NamespaceName,
        path: &CimObjectPath,
        include_qualifiers: bool,
        include_class_origin: bool,
        property_list: Option<&[CimName]>,
    ) -> CimResult<CimInstance> {
        let mgr = self.namespaces.read();
        self.get_instance_locked(
            &mgr,
            ns,
            path,
            include_qualifiers,
            include_class_origin,
            property_list,
        )
    }

    pub fn delete_instance(&self, ns: &NamespaceName, path: &CimObjectPath) -> CimResult<()> {
        let mgr = self.namespaces.write();
        mgr.get_name_space(ns)?;
        mgr.validate_class(ns, path.class_name())?;
        self.store.delete_instance(ns, &path.to_local())?;
        debug!("Deleted instance {} from {}", path, ns);
        Ok(())
    }

    /// Replace an instance, or only the properties named in `property_list`.
    ///
    /// Without `include_qualifiers` the stored qualifiers are kept. Key
    /// values cannot change.
    pub fn modify_instance(
        &self,
        ns: &NamespaceName,
        instance: &CimInstance,
        include_qualifiers: bool,
        property_list: Option<&[CimName]>,
    ) -> CimResult<()> {
        let mgr = self.namespaces.write();
        self.modify_instance_locked(&mgr, ns, instance, include_qualifiers, property_list)
    }

    pub fn enumerate_instances_for_class(
        &self,
        ns: &NamespaceName,
        class_name: &CimName,
        include_qualifiers: bool,
        include_class_origin: bool,
        property_list: Option<&[CimName]>,
    ) -> CimResult<Vec<CimInstance>> {
        let mgr = self.namespaces.read();
        mgr.get_name_space(ns)?;
        mgr.validate_class(ns, class_name)?;
        let ctx = RepoContext { repo: self, mgr: &mgr };
        self.store
            .enumerate_instances_for_class(ns, class_name)?
            .into_iter()
            .map(|mut instance| {
                if include_qualifiers {
                    with_instance_qualifiers(&mut instance, &ctx, ns)?;
                }
                instance.filter(include_qualifiers, include_class_origin, property_list);
                Ok(instance)
            })
            .collect()
    }

    /// Instances of `class_name` and all its subclasses.
    ///
    /// Without `deep_inheritance` only properties defined by `class_name`
    /// are returned.
    pub fn enumerate_instances_for_subtree(
        &self,
        ns: &NamespaceName,
        class_name: &CimName,
        deep_inheritance: bool,
        include_qualifiers: bool,
        include_class_origin: bool,
        property_list: Option<&[CimName]>,
    ) -> CimResult<Vec<CimInstance>> {
        let mgr = self.namespaces.read();
        mgr.get_name_space(ns)?;

        let property_list: Option<Vec<CimName>> = if deep_inheritance {
            property_list.map(|l| l.to_vec())
        } else {
            let class = self
                .resolved_class(&mgr, ns, class_name)?
                .ok_or_else(|| CimError::invalid_class(class_name))?;
            Some(
                class
                    .properties()
                    .iter()
                    .map(|p| p.name().clone())
                    .filter(|name| property_list.map_or(true, |l| l.contains(name)))
                    .collect(),
            )
        };

        let ctx = RepoContext { repo: self, mgr: &mgr };
        let mut out = Vec::new();
        for class in self.subtree(&mgr, ns, class_name)? {
            for mut instance in self.store.enumerate_instances_for_class(ns, &class)? {
                if include_qualifiers {
                    with_instance_qualifiers(&mut instance, &ctx, ns)?;
                }
                instance.filter(
                    include_qualifiers,
                    include_class_origin,
                    property_list.as_deref(),
                );
                out.push(instance);
            }
        }
        Ok(out)
    }

    pub fn enumerate_instance_names_for_class(
        &self,
        ns: &NamespaceName,
        class_name: &CimName,
    ) -> CimResult<Vec<CimObjectPath>> {
        let mgr = self.namespaces.read();
        mgr.get_name_space(ns)?;
        mgr.validate_class(ns, class_name)?;
        self.store.enumerate_instance_names_for_class(ns, class_name)
    }

    pub fn enumerate_instance_names_for_subtree(
        &self,
        ns: &NamespaceName,
        class_name: &CimName,
    ) -> CimResult<Vec<CimObjectPath>> {
        let mgr = self.namespaces.read();
        mgr.get_name_space(ns)?;
        let mut out = Vec::new();
        for class in self.subtree(&mgr, ns, class_name)? {
            out.extend(self.store.enumerate_instance_names_for_class(ns, &class)?);
        }
        Ok(out)
    }

    /// Value of one property; class defaults apply to unset properties.
    pub fn get_property(
        &self,
        ns: &NamespaceName,
        path: &CimObjectPath,
        property_name: &CimName,
    ) -> CimResult<CimValue> {
        let mgr = self.namespaces.read();
        let instance = self.get_instance_locked(&mgr, ns, path, false, false, None)?;
        instance
            .property(property_name)
            .map(|p| p.value().clone())
            .ok_or_else(|| {
                CimError::no_such_property(format!("{}.{}", path.class_name(), property_name))
            })
    }

    pub fn set_property(
        &self,
        ns: &NamespaceName,
        path: &CimObjectPath,
        property_name: &CimName,
        value: CimValue,
    ) -> CimResult<()> {
        let mgr = self.namespaces.write();
        let mut instance = CimInstance::new(path.class_name().clone())
            .with_property(CimProperty::new(property_name.clone(), value));
        instance.set_path(Some(path.to_local()));
        self.modify_instance_locked(
            &mgr,
            ns,
            &instance,
            false,
            Some(std::slice::from_ref(property_name)),
        )
    }

    // -----------------------------------------------------------------------
    // Associations
    // -----------------------------------------------------------------------

    /// Paths of the objects associated with `object_name`.
    ///
    /// A path without keys is treated as a class and answered from the
    /// association class cache of the class and its superclasses.
    pub fn associator_names(
        &self,
        ns: &NamespaceName,
        object_name: &CimObjectPath,
        filter: &AssociatorFilter,
    ) -> CimResult<Vec<CimObjectPath>> {
        let mgr = self.namespaces.read();
        self.associator_names_locked(&mgr, ns, object_name, filter)
    }

    pub fn associators(
        &self,
        ns: &NamespaceName,
        object_name: &CimObjectPath,
        filter: &AssociatorFilter,
        include_qualifiers: bool,
        include_class_origin: bool,
        property_list: Option<&[CimName]>,
    ) -> CimResult<Vec<CimObject>> {
        let mgr = self.namespaces.read();
        let names = self.associator_names_locked(&mgr, ns, object_name, filter)?;
        self.materialize(
            &mgr,
            ns,
            names,
            include_qualifiers,
            include_class_origin,
            property_list,
        )
    }

    /// Paths of the association classes or instances referring to
    /// `object_name`.
    pub fn reference_names(
        &self,
        ns: &NamespaceName,
        object_name: &CimObjectPath,
        filter: &ReferenceFilter,
    ) -> CimResult<Vec<CimObjectPath>> {
        let mgr = self.namespaces.read();
        self.reference_names_locked(&mgr, ns, object_name, filter)
    }

    pub fn references(
        &self,
        ns: &NamespaceName,
        object_name: &CimObjectPath,
        filter: &ReferenceFilter,
        include_qualifiers: bool,
        include_class_origin: bool,
        property_list: Option<&[CimName]>,
    ) -> CimResult<Vec<CimObject>> {
        let mgr = self.namespaces.read();
        let names = self.reference_names_locked(&mgr, ns, object_name, filter)?;
        self.materialize(
            &mgr,
            ns,
            names,
            include_qualifiers,
            include_class_origin,
            property_list,
        )
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn invalidate_schema_caches(&self) {
        self.class_cache.clear();
        self.qualifier_cache.clear();
    }

    /// Resolved classes embed declaration flavors, so they all go.
    fn invalidate_qualifier(&self, ns: &NamespaceName, name: &CimName) {
        self.qualifier_cache.evict(ns, name);
        self.class_cache.clear();
    }

    /// Drop `class_name` and every resolved subclass that inherits from it,
    /// in `owner` and in the namespaces building on `owner`.
    fn evict_class_tree(
        &self,
        mgr: &NameSpaceManager,
        owner: &NamespaceName,
        class_name: &CimName,
    ) {
        self.class_cache.evict(owner, class_name);
        let views = match mgr.dependent_schema_name_space_names(owner) {
            Ok(views) => views,
            Err(_) => return self.class_cache.clear(),
        };
        for view in views {
            let subclasses = match mgr.get_sub_class_names(&view, Some(class_name), true) {
                Ok(subclasses) => subclasses,
                Err(_) => return self.class_cache.clear(),
            };
            for sub in subclasses {
                match mgr.locate_class(&view, &sub) {
                    Ok((sub_owner, _)) => self.class_cache.evict(&sub_owner, &sub),
                    Err(_) => return self.class_cache.clear(),
                }
            }
        }
    }

    /// Keep an active association cache in step with a class change.
    fn update_assoc_cache(
        &self,
        owner: &NamespaceName,
        class_name: &CimName,
        associations: &[ClassAssociation],
    ) {
        let mut caches = self.assoc_caches.lock();
        if let Some(cache) = caches.active_cache_mut(owner) {
            cache.remove_assoc_class_records(class_name);
            for record in associations {
                cache.add_association(record);
            }
        }
    }

    fn find_qualifier(
        &self,
        mgr: &NameSpaceManager,
        ns: &NamespaceName,
        name: &CimName,
    ) -> CimResult<Option<Arc<CimQualifierDecl>>> {
        for schema_ns in mgr.schema_name_space_names(ns)? {
            if let Some(decl) = self.qualifier_cache.get(&schema_ns, name) {
                return Ok(Some(decl));
            }
            if let Some(decl) = self.store.get_qualifier(&schema_ns, name)? {
                let decl = Arc::new(decl);
                self.qualifier_cache.put(&schema_ns, name, decl.clone());
                return Ok(Some(decl));
            }
        }
        Ok(None)
    }

    /// Fully resolved class visible from `ns`; None when unknown.
    fn resolved_class(
        &self,
        mgr: &NameSpaceManager,
        ns: &NamespaceName,
        name: &CimName,
    ) -> CimResult<Option<Arc<CimClass>>> {
        let owner = match mgr.locate_class(ns, name) {
            Ok((owner, _)) => owner,
            Err(e) if e.is(CimStatusCode::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };
        if let Some(class) = self.class_cache.get(&owner, name) {
            return Ok(Some(class));
        }

        let mut class = self.store.get_class(&owner, name)?.ok_or_else(|| {
            CimError::Corrupt(format!(
                "class {} is registered in {} but has no stored definition",
                name, owner
            ))
        })?;
        if !self.config.store_complete_classes {
            resolve_class(&mut class, &RepoContext { repo: self, mgr }, &owner)?;
        }

        let class = Arc::new(class);
        self.class_cache.put(&owner, name, class.clone());
        Ok(Some(class))
    }

    #[allow(clippy::too_many_arguments)]
    fn get_class_locked(
        &self,
        mgr: &NameSpaceManager,
        ns: &NamespaceName,
        class_name: &CimName,
        local_only: bool,
        include_qualifiers: bool,
        include_class_origin: bool,
        property_list: Option<&[CimName]>,
    ) -> CimResult<CimClass> {
        mgr.get_name_space(ns)?;
        let mut class = self
            .resolved_class(mgr, ns, class_name)?
            .map(|c| (*c).clone())
            .ok_or_else(|| {
                CimError::not_found(format!("class {} in namespace {}", class_name, ns))
            })?;
        class.filter(
            local_only,
            include_qualifiers,
            include_class_origin,
            property_list,
        );
        Ok(class)
    }

    fn get_instance_locked(
        &self,
        mgr: &NameSpaceManager,
        ns: &NamespaceName,
        path: &CimObjectPath,
        include_qualifiers: bool,
        include_class_origin: bool,
        property_list: Option<&[CimName]>,
    ) -> CimResult<CimInstance> {
        mgr.get_name_space(ns)?;
        mgr.validate_class(ns, path.class_name())?;
        let mut instance = self
            .store
            .get_instance(ns, path)?
            .ok_or_else(|| CimError::not_found(format!("instance {}", path)))?;
        if include_qualifiers {
            with_instance_qualifiers(&mut instance, &RepoContext { repo: self, mgr }, ns)?;
        }
        instance.filter(include_qualifiers, include_class_origin, property_list);
        Ok(instance)
    }

    fn modify_instance_locked(
        &self,
        mgr: &NameSpaceManager,
        ns: &NamespaceName,
        instance: &CimInstance,
        include_qualifiers: bool,
        property_list: Option<&[CimName]>,
    ) -> CimResult<()> {
        mgr.get_name_space(ns)?;
        let path = instance
            .path()
            .map(|p| p.to_local())
            .ok_or_else(|| CimError::invalid_parameter("modified instance has no path"))?;
        mgr.validate_class(ns, path.class_name())?;
        let existing = self
            .store
            .get_instance(ns, &path)?
            .ok_or_else(|| CimError::not_found(format!("instance {}", path)))?;

        let mut merged = match property_list {
            None if include_qualifiers => instance.clone(),
            None => {
                let mut merged = CimInstance::new(path.class_name().clone());
                *merged.qualifiers_mut() = existing.qualifiers().clone();
                for given in instance.properties() {
                    let mut property = given.clone();
                    if let Some(old) = existing.property(given.name()) {
                        *property.qualifiers_mut() = old.qualifiers().clone();
                    } else {
                        property.qualifiers_mut().clear();
                    }
                    merged = merged.with_property(property);
                }
                merged
            }
            Some(list) => {
                let mut merged = existing.clone();
                let kept = merged
                    .take_properties()
                    .into_iter()
                    .filter(|p| !p.propagated())
                    .collect();
                merged.set_properties(kept);
                if include_qualifiers {
                    *merged.qualifiers_mut() = instance.qualifiers().clone();
                }
                for name in list {
                    match instance.property(name) {
                        Some(given) => {
                            let mut property = given.clone();
                            if !include_qualifiers {
                                if let Some(old) = existing.property(name) {
                                    *property.qualifiers_mut() = old.qualifiers().clone();
                                }
                            }
                            merged = merged.with_property(property);
                        }
                        None => {
                            merged.remove_property(name);
                        }
                    }
                }
                merged
            }
        };

        let class = resolve_instance(&mut merged, &RepoContext { repo: self, mgr }, ns, false)?;
        let new_path = class.build_path(&merged)?;
        if new_path.key() != path.key() {
            return Err(CimError::failed(format!(
                "key properties of {} cannot be modified",
                path
            )));
        }
        merged.set_path(Some(path.clone()));
        self.store.modify_instance(ns, &merged)?;
        debug!("Modified instance {} in {}", path, ns);
        Ok(())
    }

    /// `class_name` followed by all its subclasses.
    fn subtree(
        &self,
        mgr: &NameSpaceManager,
        ns: &NamespaceName,
        class_name: &CimName,
    ) -> CimResult<Vec<CimName>> {
        let mut classes = vec![mgr.canonical_class_name(ns, class_name).map_err(|e| {
            if e.is(CimStatusCode::NotFound) {
                CimError::invalid_class(class_name)
            } else {
                e
            }
        })?];
        classes.extend(mgr.get_sub_class_names(ns, Some(class_name), true)?);
        Ok(classes)
    }

    /// True when an instance with the same keys exists for the class, any
    /// ancestor or any descendant.
    fn instance_exists_in_hierarchy(
        &self,
        mgr: &NameSpaceManager,
        ns: &NamespaceName,
        path: &CimObjectPath,
    ) -> CimResult<bool> {
        let class_name = path.class_name();
        let mut classes = mgr.get_super_class_names(ns, class_name)?;
        classes.push(class_name.clone());
        classes.extend(mgr.get_sub_class_names(ns, Some(class_name), true)?);

        for class in classes {
            let mut candidate = path.clone();
            candidate.set_class_name(class);
            if self.store.instance_exists(ns, &candidate)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn with_subclasses(
        &self,
        mgr: &NameSpaceManager,
        ns: &NamespaceName,
        class_name: Option<&CimName>,
    ) -> CimResult<Option<Vec<CimName>>> {
        match class_name {
            Some(name) => {
                let mut list = mgr.get_sub_class_names(ns, Some(name), true)?;
                list.push(name.clone());
                Ok(Some(list))
            }
            None => Ok(None),
        }
    }

    /// Association class records for `class_name` and its superclasses,
    /// filling inactive caches from the store first.
    fn class_association_records(
        &self,
        mgr: &NameSpaceManager,
        ns: &NamespaceName,
        class_name: &CimName,
    ) -> CimResult<Vec<ClassAssociation>> {
        let mut class_list = mgr.get_super_class_names(ns, class_name)?;
        class_list.push(class_name.clone());

        let mut caches = self.assoc_caches.lock();
        let mut out = Vec::new();
        for schema_ns in mgr.schema_name_space_names(ns)? {
            let cache = caches.get_assoc_class_cache(&schema_ns);
            if !cache.is_active() {
                let records = self.store.enumerate_class_associations(&schema_ns)?;
                for record in &records {
                    cache.add_association(record);
                }
                cache.set_active(true);
                debug!(
                    "Populated association class cache for {} ({} records)",
                    schema_ns,
                    records.len()
                );
            }
            for class in &class_list {
                if let Some(records) = cache.get_assoc_class_entry(class) {
                    out.extend_from_slice(records);
                }
            }
        }
        Ok(out)
    }

    fn associator_names_locked(
        &self,
        mgr: &NameSpaceManager,
        ns: &NamespaceName,
        object_name: &CimObjectPath,
        filter: &AssociatorFilter,
    ) -> CimResult<Vec<CimObjectPath>> {
        mgr.get_name_space(ns)?;
        let filter = RecordFilter {
            assoc_classes: self.with_subclasses(mgr, ns, filter.assoc_class.as_ref())?,
            result_classes: self.with_subclasses(mgr, ns, filter.result_class.as_ref())?,
            role: filter.role.clone(),
            result_role: filter.result_role.clone(),
        };

        let mut out = PathSet::default();
        if object_name.is_class_path() {
            for r in self.class_association_records(mgr, ns, object_name.class_name())? {
                if filter.matches(
                    &r.assoc_class_name,
                    &r.from_property_name,
                    &r.to_class_name,
                    &r.to_property_name,
                ) {
                    out.push(CimObjectPath::new(r.to_class_name.clone()));
                }
            }
        } else {
            mgr.validate_class(ns, object_name.class_name())?;
            for r in self.store.get_instance_associations(ns, object_name)? {
                if filter.matches(
                    &r.assoc_class_name,
                    &r.from_property_name,
                    &r.to_class_name,
                    &r.to_property_name,
                ) {
                    out.push(r.to_instance.clone());
                }
            }
        }
        Ok(out.finish(ns, &self.config.host_name))
    }

    fn reference_names_locked(
        &self,
        mgr: &NameSpaceManager,
        ns: &NamespaceName,
        object_name: &CimObjectPath,
        filter: &ReferenceFilter,
    ) -> CimResult<Vec<CimObjectPath>> {
        mgr.get_name_space(ns)?;
        let filter = RecordFilter {
            assoc_classes: self.with_subclasses(mgr, ns, filter.result_class.as_ref())?,
            result_classes: None,
            role: filter.role.clone(),
            result_role: None,
        };

        let mut out = PathSet::default();
        if object_name.is_class_path() {
            for r in self.class_association_records(mgr, ns, object_name.class_name())? {
                if filter.matches(
                    &r.assoc_class_name,
                    &r.from_property_name,
                    &r.to_class_name,
                    &r.to_property_name,
                ) {
                    out.push(CimObjectPath::new(r.assoc_class_name.clone()));
                }
            }
        } else {
            mgr.validate_class(ns, object_name.class_name())?;
            for r in self.store.get_instance_associations(ns, object_name)? {
                if filter.matches(
                    &r.assoc_class_name,
                    &r.from_property_name,
                    &r.to_class_name,
                    &r.to_property_name,
                ) {
                    out.push(r.assoc_instance.clone());
                }
            }
        }
        Ok(out.finish(ns, &self.config.host_name))
    }

    fn materialize(
        &self,
        mgr: &NameSpaceManager,
        ns: &NamespaceName,
        names: Vec<CimObjectPath>,
        include_qualifiers: bool,
        include_class_origin: bool,
        property_list: Option<&[CimName]>,
    ) -> CimResult<Vec<CimObject>> {
        let mut out = Vec::with_capacity(names.len());
        for path in names {
            let target_ns = path.namespace().cloned().unwrap_or_else(|| ns.clone());
            let local = path.to_local();
            if local.is_class_path() {
                let class = self.get_class_locked(
                    mgr,
                    &target_ns,
                    local.class_name(),
                    false,
                    include_qualifiers,
                    include_class_origin,
                    property_list,
                )?;
                out.push(CimObject::Class { path, class });
            } else {
                let instance = self.get_instance_locked(
                    mgr,
                    &target_ns,
                    &local,
                    include_qualifiers,
                    include_class_origin,
                    property_list,
                )?;
                out.push(CimObject::Instance { path, instance });
            }
        }
        Ok(out)
    }
}

/// Result paths in first-seen order without duplicates.
#[derive(Default)]
struct PathSet {
    seen: HashSet<String>,
    paths: Vec<CimObjectPath>,
}

impl PathSet {
    fn push(&mut self, path: CimObjectPath) {
        let key = format!(
            "{}:{}",
            path.namespace().map(|n| n.to_key()).unwrap_or_default(),
            path.key()
        );
        if self.seen.insert(key) {
            self.paths.push(path);
        }
    }

    /// Fill in the namespace and the configured host where missing.
    fn finish(self, ns: &NamespaceName, host_name: &str) -> Vec<CimObjectPath> {
        self.paths
            .into_iter()
            .map(|mut path| {
                if path.namespace().is_none() {
                    path.set_namespace(Some(ns.clone()));
                }
                if path.host().is_none() && !host_name.is_empty() {
                    path.set_host(Some(host_name.to_string()));
                }
                path
            })
            .collect()
    }
}

/// Re-resolve a stored instance with class qualifiers propagated.
/// Properties filled from class defaults are dropped first so they come
/// back marked propagated.
fn with_instance_qualifiers(
    instance: &mut CimInstance,
    ctx: &dyn DeclContext,
    ns: &NamespaceName,
) -> CimResult<()> {
    let supplied = instance
        .take_properties()
        .into_iter()
        .filter(|p| !p.propagated())
        .collect();
    instance.set_properties(supplied);
    resolve_instance(instance, ctx, ns, true)?;
    Ok(())
}

fn check_schema_writable(mgr: &NameSpaceManager, ns: &NamespaceName) -> CimResult<()> {
    if mgr.get_name_space(ns)?.updates_allowed {
        Ok(())
    } else {
        Err(CimError::access_denied(format!(
            "namespace {} does not allow schema updates",
            ns
        )))
    }
}

/// Schema changes apply only to classes owned by the namespace itself.
fn check_owned(ns: &NamespaceName, owner: &NamespaceName, class_name: &CimName) -> CimResult<()> {
    if ns == owner {
        Ok(())
    } else {
        Err(CimError::access_denied(format!(
            "class {} belongs to namespace {}",
            class_name, owner
        )))
    }
}

/// Register stored namespaces parents first and rebuild their trees.
fn load_namespaces(store: &dyn PersistentStore) -> CimResult<NameSpaceManager> {
    let mut mgr = NameSpaceManager::new();
    let mut pending = store.enumerate_namespaces()?;

    while !pending.is_empty() {
        let before = pending.len();
        let mut deferred = Vec::new();
        for def in pending {
            let ready = def
                .parent
                .as_ref()
                .map_or(true, |parent| mgr.name_space_exists(parent));
            if !ready {
                deferred.push(def);
                continue;
            }

            let name = def.name.clone();
            let classes = store.enumerate_class_names(&name)?;
            let class_count = classes.len();
            match mgr.load_name_space(def, classes) {
                Ok(()) => debug!("Loaded namespace {} ({} classes)", name, class_count),
                Err(e @ CimError::InvalidInheritanceTree(_)) => {
                    error!("Namespace {} is unusable: {}", name, e)
                }
                Err(e) => warn!("Skipping namespace {}: {}", name, e),
            }
        }

        if deferred.len() == before {
            for def in &deferred {
                warn!(
                    "Skipping namespace {}: parent namespace {} not found",
                    def.name,
                    def.parent
                        .as_ref()
                        .map(|p| p.as_str())
                        .unwrap_or_default()
                );
            }
            break;
        }
        pending = deferred;
    }

    info!(
        "Loaded {} namespaces from {} store",
        mgr.get_name_space_names().len(),
        store.backend_name()
    );
    Ok(mgr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CimFlavor, CimKeyBinding, CimQualifier, CimScope, CimType, KeyKind};

    fn ns(s: &str) -> NamespaceName {
        NamespaceName::new(s).unwrap()
    }

    fn name(s: &str) -> CimName {
        CimName::new(s)
    }

    fn declare_qualifiers(repo: &CimRepository, target: &NamespaceName) {
        for decl in [
            CimQualifierDecl::new(
                "Association",
                false,
                CimScope::ASSOCIATION,
                CimFlavor::DISABLEOVERRIDE,
            ),
            CimQualifierDecl::new(
                "Key",
                false,
                CimScope::PROPERTY | CimScope::REFERENCE,
                CimFlavor::DISABLEOVERRIDE,
            ),
            CimQualifierDecl::new(
                "Description",
                CimValue::null(CimType::String),
                CimScope::ANY,
                CimFlavor::TRANSLATABLE,
            ),
        ] {
            repo.set_qualifier(target, &decl).unwrap();
        }
    }

    fn person_class() -> CimClass {
        CimClass::new("TST_Person")
            .with_qualifier(CimQualifier::new("Description", "a person"))
            .with_property(
                CimProperty::new("Name", CimValue::null(CimType::String))
                    .with_qualifier(CimQualifier::new("Key", true)),
            )
            .with_property(CimProperty::new("Age", CimValue::null(CimType::Uint32)))
    }

    fn employee_class() -> CimClass {
        CimClass::new("TST_Employee")
            .with_super_class("TST_Person")
            .with_property(CimProperty::new("Dept", "none"))
    }

    fn lineage_class() -> CimClass {
        CimClass::new("TST_Lineage")
            .with_qualifier(CimQualifier::new("Association", true))
            .with_property(
                CimProperty::reference("Parent", "TST_Person")
                    .with_qualifier(CimQualifier::new("Key", true)),
            )
            .with_property(
                CimProperty::reference("Child", "TST_Person")
                    .with_qualifier(CimQualifier::new("Key", true)),
            )
    }

    fn person(class: &str, person_name: &str) -> CimInstance {
        CimInstance::new(class).with_property(CimProperty::new("Name", person_name))
    }

    fn person_path(person_name: &str) -> CimObjectPath {
        CimObjectPath::new("TST_Person")
            .with_key(CimKeyBinding::new("Name", person_name, KeyKind::String))
    }

    /// In-memory repository with the person schema in `root/cimv2`.
    fn setup() -> (CimRepository, NamespaceName) {
        let repo = CimRepository::in_memory().unwrap();
        let cimv2 = ns("root/cimv2");
        repo.create_namespace(NamespaceDefinition::new(cimv2.clone()))
            .unwrap();
        declare_qualifiers(&repo, &cimv2);
        repo.create_class(&cimv2, &person_class()).unwrap();
        repo.create_class(&cimv2, &employee_class()).unwrap();
        repo.create_class(&cimv2, &lineage_class()).unwrap();
        (repo, cimv2)
    }

    fn lineage(repo: &CimRepository, target: &NamespaceName) -> CimObjectPath {
        let alice = repo.create_instance(target, &person("TST_Person", "alice")).unwrap();
        let bob = repo.create_instance(target, &person("TST_Person", "bob")).unwrap();
        let link = CimInstance::new("TST_Lineage")
            .with_property(CimProperty::new("Parent", alice))
            .with_property(CimProperty::new("Child", bob));
        repo.create_instance(target, &link).unwrap()
    }

    #[test]
    fn test_root_namespace_created() {
        let repo = CimRepository::in_memory().unwrap();
        assert_eq!(repo.enumerate_namespaces(), vec![ns(ROOT_NAMESPACE)]);
    }

    #[test]
    fn test_get_class_resolves_inheritance() {
        let (repo, cimv2) = setup();

        let full = repo
            .get_class(&cimv2, &name("tst_employee"), false, true, true, None)
            .unwrap();
        let names: Vec<_> = full.properties().iter().map(|p| p.name().as_str()).collect();
        assert_eq!(names, ["Name", "Age", "Dept"]);
        assert_eq!(
            full.property(&name("Name")).unwrap().class_origin(),
            Some(&name("TST_Person"))
        );

        let local = repo
            .get_class(&cimv2, &name("TST_Employee"), true, false, false, None)
            .unwrap();
        assert_eq!(local.properties().len(), 1);
        assert!(local.qualifiers().is_empty());

        let err = repo
            .get_class(&cimv2, &name("TST_Missing"), false, true, true, None)
            .unwrap_err();
        assert!(err.is(CimStatusCode::NotFound));
    }

    #[test]
    fn test_class_queries() {
        let (repo, cimv2) = setup();

        let mut roots = repo.enumerate_class_names(&cimv2, None, false).unwrap();
        roots.sort();
        assert_eq!(roots, vec![name("TST_Lineage"), name("TST_Person")]);
        assert_eq!(
            repo.get_super_class_names(&cimv2, &name("TST_Employee")).unwrap(),
            vec![name("TST_Person")]
        );
        assert_eq!(
            repo.get_super_class_name(&cimv2, &name("TST_Person")).unwrap(),
            None
        );
        assert_eq!(
            repo.get_sub_class_names(&cimv2, Some(&name("TST_Person")), true)
                .unwrap(),
            vec![name("TST_Employee")]
        );
        assert_eq!(
            repo.enumerate_classes(&cimv2, None, true, false, false, false)
                .unwrap()
                .len(),
            3
        );
    }

    #[test]
    fn test_instance_lifecycle() {
        let (repo, cimv2) = setup();
        let path = repo
            .create_instance(&cimv2, &person("TST_Employee", "carol"))
            .unwrap();
        assert_eq!(path.to_string(), "TST_Employee.Name=\"carol\"");

        let instance = repo.get_instance(&cimv2, &path, false, false, None).unwrap();
        assert_eq!(instance.value("Dept"), Some(&CimValue::from("none")));

        repo.set_property(&cimv2, &path, &name("Age"), CimValue::from(41u32))
            .unwrap();
        assert_eq!(
            repo.get_property(&cimv2, &path, &name("Age")).unwrap(),
            CimValue::from(41u32)
        );
        let err = repo
            .get_property(&cimv2, &path, &name("Salary"))
            .unwrap_err();
        assert!(err.is(CimStatusCode::NoSuchProperty));

        let mut renamed = person("TST_Employee", "dave");
        renamed.set_path(Some(path.clone()));
        let err = repo
            .modify_instance(&cimv2, &renamed, false, None)
            .unwrap_err();
        assert!(err.is(CimStatusCode::Failed));

        assert_eq!(
            repo.enumerate_instance_names_for_subtree(&cimv2, &name("TST_Person"))
                .unwrap(),
            vec![path.clone()]
        );
        assert!(repo
            .enumerate_instance_names_for_class(&cimv2, &name("TST_Person"))
            .unwrap()
            .is_empty());

        repo.delete_instance(&cimv2, &path).unwrap();
        let err = repo
            .get_instance(&cimv2, &path, false, false, None)
            .unwrap_err();
        assert!(err.is(CimStatusCode::NotFound));
    }

    #[test]
    fn test_duplicate_keys_across_hierarchy() {
        let (repo, cimv2) = setup();
        repo.create_instance(&cimv2, &person("TST_Employee", "erin"))
            .unwrap();

        let err = repo
            .create_instance(&cimv2, &person("TST_Person", "erin"))
            .unwrap_err();
        assert!(err.is(CimStatusCode::AlreadyExists));
    }

    #[test]
    fn test_keyless_class_rejected() {
        let (repo, cimv2) = setup();
        repo.create_class(
            &cimv2,
            &CimClass::new("TST_Setting").with_property(CimProperty::new("Value", 1u32)),
        )
        .unwrap();

        let err = repo
            .create_instance(&cimv2, &CimInstance::new("TST_Setting"))
            .unwrap_err();
        assert!(err.is(CimStatusCode::Failed));
    }

    #[test]
    fn test_partial_modify_keeps_other_properties() {
        let (repo, cimv2) = setup();
        let path = repo
            .create_instance(
                &cimv2,
                &person("TST_Employee", "frank").with_property(CimProperty::new("Age", 30u32)),
            )
            .unwrap();

        let mut update = person("TST_Employee", "frank").with_property(CimProperty::new("Dept", "ops"));
        update.set_path(Some(path.clone()));
        repo.modify_instance(&cimv2, &update, false, Some(&[name("Dept")]))
            .unwrap();

        let instance = repo.get_instance(&cimv2, &path, false, false, None).unwrap();
        assert_eq!(instance.value("Dept"), Some(&CimValue::from("ops")));
        assert_eq!(instance.value("Age"), Some(&CimValue::from(30u32)));
    }

    #[test]
    fn test_delete_class_rules() {
        let (repo, cimv2) = setup();
        let err = repo.delete_class(&cimv2, &name("TST_Person")).unwrap_err();
        assert!(err.is(CimStatusCode::ClassHasChildren));

        let path = repo
            .create_instance(&cimv2, &person("TST_Employee", "gina"))
            .unwrap();
        let err = repo.delete_class(&cimv2, &name("TST_Employee")).unwrap_err();
        assert!(err.is(CimStatusCode::ClassHasInstances));

        repo.delete_instance(&cimv2, &path).unwrap();
        repo.delete_class(&cimv2, &name("tst_employee")).unwrap();
        let err = repo
            .get_class(&cimv2, &name("TST_Employee"), false, true, true, None)
            .unwrap_err();
        assert!(err.is(CimStatusCode::NotFound));
    }

    #[test]
    fn test_class_level_associations() {
        let (repo, cimv2) = setup();
        let employee = CimObjectPath::new("TST_Employee");

        let names = repo
            .associator_names(&cimv2, &employee, &AssociatorFilter::new())
            .unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].class_name(), &name("TST_Person"));
        assert_eq!(names[0].namespace(), Some(&cimv2));

        let refs = repo
            .reference_names(&cimv2, &employee, &ReferenceFilter::new().role("Parent"))
            .unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].class_name(), &name("TST_Lineage"));

        let objects = repo
            .references(&cimv2, &employee, &ReferenceFilter::new(), true, false, None)
            .unwrap();
        assert_eq!(objects.len(), 1);
        assert!(objects[0].as_class().unwrap().is_association());
    }

    #[test]
    fn test_instance_level_associations() {
        let (repo, cimv2) = setup();
        let link = lineage(&repo, &cimv2);

        let children = repo
            .associator_names(
                &cimv2,
                &person_path("alice"),
                &AssociatorFilter::new().role("Parent").result_role("Child"),
            )
            .unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].to_local(), person_path("bob"));

        let none = repo
            .associator_names(
                &cimv2,
                &person_path("alice"),
                &AssociatorFilter::new().role("Child"),
            )
            .unwrap();
        assert!(none.is_empty());

        let objects = repo
            .references(&cimv2, &person_path("bob"), &ReferenceFilter::new(), false, false, None)
            .unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].path().to_local(), link);
        assert!(objects[0].as_instance().is_some());

        repo.delete_instance(&cimv2, &link).unwrap();
        assert!(repo
            .reference_names(&cimv2, &person_path("bob"), &ReferenceFilter::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_host_name_in_result_paths() {
        let config = RepositoryConfig::builder().host_name("mgmt01").build();
        let repo =
            CimRepository::with_store(config, Box::new(SqliteStore::new_in_memory().unwrap()))
                .unwrap();
        let cimv2 = ns("root/cimv2");
        repo.create_namespace(NamespaceDefinition::new(cimv2.clone()))
            .unwrap();
        declare_qualifiers(&repo, &cimv2);
        repo.create_class(&cimv2, &person_class()).unwrap();
        repo.create_class(&cimv2, &lineage_class()).unwrap();

        let refs = repo
            .reference_names(&cimv2, &CimObjectPath::new("TST_Person"), &ReferenceFilter::new())
            .unwrap();
        assert_eq!(refs[0].host(), Some("mgmt01"));
    }

    #[test]
    fn test_read_only_namespace_rejects_schema_writes() {
        let (repo, cimv2) = setup();
        let mut attrs = NamespaceAttributes::new();
        attrs.insert("updatesAllowed".into(), "false".into());
        repo.modify_namespace(&cimv2, &attrs).unwrap();

        let err = repo
            .create_class(&cimv2, &CimClass::new("TST_Other"))
            .unwrap_err();
        assert!(err.is(CimStatusCode::AccessDenied));

        // Instances are still accepted.
        repo.create_instance(&cimv2, &person("TST_Person", "hal"))
            .unwrap();
        assert_eq!(
            repo.get_namespace_attributes(&cimv2).unwrap()["updatesAllowed"],
            "false"
        );
    }

    #[test]
    fn test_delete_namespace_rules() {
        let (repo, cimv2) = setup();
        let err = repo.delete_namespace(&cimv2).unwrap_err();
        assert!(err.is(CimStatusCode::NamespaceNotEmpty));

        let empty = ns("root/empty");
        repo.create_namespace(NamespaceDefinition::new(empty.clone()))
            .unwrap();
        repo.delete_namespace(&empty).unwrap();
        assert!(!repo.namespace_exists(&empty));

        let err = repo.delete_namespace(&empty).unwrap_err();
        assert!(err.is(CimStatusCode::InvalidNamespace));
    }

    #[test]
    fn test_complete_classes_refuse_superclass_change() {
        let config = RepositoryConfig::builder().store_complete_classes(true).build();
        let repo =
            CimRepository::with_store(config, Box::new(SqliteStore::new_in_memory().unwrap()))
                .unwrap();
        let root = ns(ROOT_NAMESPACE);
        declare_qualifiers(&repo, &root);
        repo.create_class(&root, &person_class()).unwrap();
        repo.create_class(&root, &employee_class()).unwrap();
        repo.create_class(&root, &CimClass::new("TST_Other")).unwrap();

        let moved = employee_class().with_super_class("TST_Other");
        let err = repo.modify_class(&root, &moved).unwrap_err();
        assert!(err.is(CimStatusCode::Failed));

        let err = repo.modify_class(&root, &person_class()).unwrap_err();
        assert!(err.is(CimStatusCode::ClassHasChildren));

        let changed = employee_class().with_property(CimProperty::new("Level", 1u32));
        repo.modify_class(&root, &changed).unwrap();
        let class = repo
            .get_class(&root, &name("TST_Employee"), false, false, false, None)
            .unwrap();
        assert!(class.property(&name("Level")).is_some());
        assert!(class.property(&name("Name")).is_some());
    }

    #[test]
    fn test_lazy_classes_follow_superclass_changes() {
        let (repo, cimv2) = setup();
        let changed = person_class().with_property(CimProperty::new("Email", ""));
        repo.modify_class(&cimv2, &changed).unwrap();

        let employee = repo
            .get_class(&cimv2, &name("TST_Employee"), false, false, false, None)
            .unwrap();
        assert!(employee.property(&name("Email")).is_some());
    }

    #[test]
    fn test_modify_class_evicts_dependent_subclasses() {
        let repo = CimRepository::in_memory().unwrap();
        let schema = ns("tst/schema");
        let app = ns("tst/app");
        repo.create_namespace(NamespaceDefinition::new(schema.clone()).shareable(true))
            .unwrap();
        repo.create_namespace(NamespaceDefinition::new(app.clone()).with_parent(schema.clone()))
            .unwrap();
        declare_qualifiers(&repo, &schema);
        repo.create_class(&schema, &person_class()).unwrap();
        repo.create_class(&schema, &lineage_class()).unwrap();
        repo.create_class(&app, &employee_class()).unwrap();

        for _ in 0..2 {
            repo.get_class(&app, &name("TST_Employee"), false, true, false, None)
                .unwrap();
            repo.get_class(&schema, &name("TST_Lineage"), false, true, false, None)
                .unwrap();
        }
        let warm = repo.cache_stats().classes.unwrap();
        assert!(warm.hits >= 2);

        let changed = person_class().with_property(CimProperty::new("Email", ""));
        repo.modify_class(&schema, &changed).unwrap();

        let employee = repo
            .get_class(&app, &name("TST_Employee"), false, true, false, None)
            .unwrap();
        assert!(employee.property(&name("Email")).is_some());

        let before = repo.cache_stats().classes.unwrap();
        repo.get_class(&schema, &name("TST_Lineage"), false, true, false, None)
            .unwrap();
        assert!(repo.cache_stats().classes.unwrap().hits > before.hits);
    }

    #[test]
    fn test_cache_stats_when_disabled() {
        let config = RepositoryConfig::builder()
            .class_cache_size(0)
            .qualifier_cache_size(0)
            .build();
        let repo = CimRepository::with_store(
            config,
            Box::new(SqliteStore::new_in_memory().unwrap()),
        )
        .unwrap();
        assert_eq!(repo.cache_stats(), RepositoryCacheStats::default());
    }

    #[test]
    fn test_create_namespace_rolls_back_on_store_failure() {
        let dir = tempfile::tempdir().unwrap();
        let repo =
            CimRepository::open(RepositoryConfig::builder().root(dir.path()).build()).unwrap();
        std::fs::write(dir.path().join("blocked"), b"not a directory").unwrap();

        let err = repo
            .create_namespace(NamespaceDefinition::new(ns("blocked")))
            .unwrap_err();
        assert!(err.is(CimStatusCode::AlreadyExists));
        assert!(!repo.namespace_exists(&ns("blocked")));

        std::fs::remove_file(dir.path().join("blocked")).unwrap();
        repo.create_namespace(NamespaceDefinition::new(ns("blocked")))
            .unwrap();
        assert!(repo.namespace_exists(&ns("blocked")));
    }

    #[test]
    fn test_illegal_names_rejected() {
        let (repo, cimv2) = setup();
        let err = repo
            .create_class(&cimv2, &CimClass::new("../../escaped"))
            .unwrap_err();
        assert!(err.is(CimStatusCode::InvalidParameter));

        let renamed = person_class().with_property(CimProperty::new("bad name!", 1u8));
        let err = repo.modify_class(&cimv2, &renamed).unwrap_err();
        assert!(err.is(CimStatusCode::InvalidParameter));
        let person = repo
            .get_class(&cimv2, &name("TST_Person"), true, false, false, None)
            .unwrap();
        assert_eq!(person.properties().len(), 2);

        let decl = CimQualifierDecl::new("a/b", false, CimScope::CLASS, CimFlavor::empty());
        let err = repo.set_qualifier(&cimv2, &decl).unwrap_err();
        assert!(err.is(CimStatusCode::InvalidParameter));
    }
}
