// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Persistence store abstraction
//!
//! Backend-agnostic storage of namespaces, qualifier declarations, classes,
//! instances and association tables. Stores perform no schema validation;
//! the repository checks every operation before it reaches the store and
//! serializes writers.
//!
//! # Implementations
//!
//! - [`FileStore`] -- one directory per namespace
//! - [`SqliteStore`] -- single SQLite database

pub mod file;
pub mod sqlite;

pub use file::FileStore;
pub use sqlite::SqliteStore;

use crate::association::{ClassAssociation, InstanceAssociation};
use crate::error::CimResult;
use crate::model::{CimClass, CimInstance, CimName, CimObjectPath, CimQualifierDecl, NamespaceName};
use crate::namespace::NamespaceDefinition;

/// Storage backend trait
///
/// Instance paths are matched by [`CimObjectPath::key`], which ignores host,
/// namespace and name case.
pub trait PersistentStore: Send + Sync {
    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    // -- namespaces --------------------------------------------------------

    fn enumerate_namespaces(&self) -> CimResult<Vec<NamespaceDefinition>>;

    fn create_namespace(&self, def: &NamespaceDefinition) -> CimResult<()>;

    /// Rewrite the attributes of an existing namespace.
    fn update_namespace(&self, def: &NamespaceDefinition) -> CimResult<()>;

    /// Move a namespace and its content; parents naming `old` are updated
    /// by the caller through [`update_namespace`](Self::update_namespace).
    fn rename_namespace(&self, old: &NamespaceName, new: &NamespaceName) -> CimResult<()>;

    /// Remove a namespace with everything it still holds.
    fn delete_namespace(&self, ns: &NamespaceName) -> CimResult<()>;

    /// True when the namespace holds no classes and no instances.
    fn is_namespace_empty(&self, ns: &NamespaceName) -> CimResult<bool>;

    // -- qualifier declarations -------------------------------------------

    fn enumerate_qualifiers(&self, ns: &NamespaceName) -> CimResult<Vec<CimQualifierDecl>>;

    fn get_qualifier(
        &self,
        ns: &NamespaceName,
        name: &CimName,
    ) -> CimResult<Option<CimQualifierDecl>>;

    /// Create or replace.
    fn set_qualifier(&self, ns: &NamespaceName, decl: &CimQualifierDecl) -> CimResult<()>;

    /// NOT_FOUND when absent.
    fn delete_qualifier(&self, ns: &NamespaceName, name: &CimName) -> CimResult<()>;

    // -- classes ------------------------------------------------------------

    /// Every class with its superclass, for rebuilding the inheritance tree.
    fn enumerate_class_names(
        &self,
        ns: &NamespaceName,
    ) -> CimResult<Vec<(CimName, Option<CimName>)>>;

    fn get_class(&self, ns: &NamespaceName, name: &CimName) -> CimResult<Option<CimClass>>;

    /// Store a new class with the association records it defines.
    fn create_class(
        &self,
        ns: &NamespaceName,
        class: &CimClass,
        associations: &[ClassAssociation],
    ) -> CimResult<()>;

    /// Replace a class body and its association records.
    fn modify_class(
        &self,
        ns: &NamespaceName,
        class: &CimClass,
        associations: &[ClassAssociation],
    ) -> CimResult<()>;

    /// Remove a class body and its association records. NOT_FOUND when absent.
    fn delete_class(&self, ns: &NamespaceName, name: &CimName) -> CimResult<()>;

    fn enumerate_class_associations(&self, ns: &NamespaceName)
        -> CimResult<Vec<ClassAssociation>>;

    // -- instances ----------------------------------------------------------

    /// Instances of exactly `class_name`, in creation order.
    fn enumerate_instances_for_class(
        &self,
        ns: &NamespaceName,
        class_name: &CimName,
    ) -> CimResult<Vec<CimInstance>>;

    fn enumerate_instance_names_for_class(
        &self,
        ns: &NamespaceName,
        class_name: &CimName,
    ) -> CimResult<Vec<CimObjectPath>> {
        Ok(self
            .enumerate_instances_for_class(ns, class_name)?
            .into_iter()
            .filter_map(|i| i.path().cloned())
            .collect())
    }

    fn get_instance(
        &self,
        ns: &NamespaceName,
        path: &CimObjectPath,
    ) -> CimResult<Option<CimInstance>>;

    fn instance_exists(&self, ns: &NamespaceName, path: &CimObjectPath) -> CimResult<bool> {
        Ok(self.get_instance(ns, path)?.is_some())
    }

    fn class_has_instances(&self, ns: &NamespaceName, class_name: &CimName) -> CimResult<bool>;

    /// Store a new instance; its path must be set. ALREADY_EXISTS when the
    /// path is taken.
    fn create_instance(
        &self,
        ns: &NamespaceName,
        instance: &CimInstance,
        associations: &[InstanceAssociation],
    ) -> CimResult<()>;

    /// Replace an instance body. NOT_FOUND when absent.
    fn modify_instance(&self, ns: &NamespaceName, instance: &CimInstance) -> CimResult<()>;

    /// Remove an instance and the association records it defines.
    /// NOT_FOUND when absent.
    fn delete_instance(&self, ns: &NamespaceName, path: &CimObjectPath) -> CimResult<()>;

    /// Association records whose source is `from`.
    fn get_instance_associations(
        &self,
        ns: &NamespaceName,
        from: &CimObjectPath,
    ) -> CimResult<Vec<InstanceAssociation>>;
}

/// Path an instance is stored under.
pub(crate) fn instance_path(instance: &CimInstance) -> CimResult<CimObjectPath> {
    instance.path().map(|p| p.to_local()).ok_or_else(|| {
        crate::error::CimError::invalid_parameter(format!(
            "instance of {} has no object path",
            instance.class_name()
        ))
    })
}
