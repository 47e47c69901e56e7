// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CIM Repository
//!
//! Persistent store for CIM namespaces, qualifier declarations, classes,
//! instances and associations.
//!
//! # Features
//!
//! - **Shared schemas** -- Read-only and updatable namespaces layered on a shareable parent
//! - **Inheritance trees** -- Per-namespace class forest with cycle and orphan checks
//! - **Class resolution** -- Qualifier flavor propagation, inherited properties and methods
//! - **Associations** -- Class and instance level associator/reference traversal
//! - **File Backend** -- One directory per namespace, atomic writes
//! - **SQLite Backend** -- Single database file, transactional updates
//!
//! # Architecture
//!
//! ```text
//! CimRepository
//! +-- NameSpaceManager        (namespace registry + InheritanceTree per namespace)
//! +-- AssocClassCacheManager  (class association records, filled lazily)
//! +-- ObjectCache             (LRU of resolved classes and qualifier declarations)
//! +-- PersistentStore         (FileStore or SqliteStore, AutoStreamer bodies)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cim_repository::{
//!     Backend, CimName, CimRepository, NamespaceDefinition, NamespaceName, RepositoryConfig,
//! };
//!
//! let config = RepositoryConfig::builder()
//!     .root("/var/lib/cim")
//!     .backend(Backend::Sqlite)
//!     .build();
//!
//! let repo = CimRepository::open(config)?;
//! let ns = NamespaceName::new("root/cimv2")?;
//! repo.create_namespace(NamespaceDefinition::new(ns.clone()))?;
//! let class = repo.get_class(&ns, &CimName::new("CIM_System"), false, true, false, None)?;
//! ```

pub mod assoc_cache;
pub mod association;
pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod inheritance;
pub mod model;
pub mod namespace;
pub mod repository;
pub mod resolver;
pub mod store;
pub mod streamer;

pub use assoc_cache::{AssocClassCache, AssocClassCacheManager};
pub use association::{ClassAssociation, InstanceAssociation};
pub use cache::{CacheStats, RepositoryCacheStats};
pub use config::{Backend, RepositoryConfig, RepositoryConfigBuilder};
pub use document::{export_document, import_document, ImportSummary, SchemaDocument};
pub use error::{CimError, CimResult, CimStatusCode};
pub use inheritance::InheritanceTree;
pub use model::{
    CimClass, CimFlavor, CimInstance, CimKeyBinding, CimMethod, CimName, CimObject,
    CimObjectPath, CimParameter, CimProperty, CimQualifier, CimQualifierDecl, CimQualifierList,
    CimScope, CimType, CimValue, KeyKind, NamespaceName,
};
pub use namespace::{NameSpaceManager, NamespaceAttributes, NamespaceDefinition};
pub use repository::{AssociatorFilter, CimRepository, ReferenceFilter, ROOT_NAMESPACE};
pub use resolver::{DeclContext, SimpleDeclContext};
pub use store::{FileStore, PersistentStore, SqliteStore};
pub use streamer::{AutoStreamer, Encoding, ObjectStreamer};
