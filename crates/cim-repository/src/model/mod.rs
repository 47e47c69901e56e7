// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CIM object model.
//!
//! Plain value types: cloning is a structural copy, and the repository
//! shares resolved classes behind `Arc` where it caches them.

pub mod class;
pub mod flavor;
pub mod instance;
pub mod method;
pub mod name;
pub mod path;
pub mod property;
pub mod qualifier;
pub mod scope;
pub mod value;

pub use class::CimClass;
pub use flavor::CimFlavor;
pub use instance::CimInstance;
pub use method::{CimMethod, CimParameter};
pub use name::{CimName, NamespaceName};
pub use path::{CimKeyBinding, CimObjectPath, KeyKind};
pub use property::CimProperty;
pub use qualifier::{CimQualifier, CimQualifierDecl, CimQualifierList};
pub use scope::CimScope;
pub use value::{CimType, CimValue};

/// A class or an instance returned by association traversal.
#[derive(Debug, Clone, PartialEq)]
pub enum CimObject {
    Class {
        path: CimObjectPath,
        class: CimClass,
    },
    Instance {
        path: CimObjectPath,
        instance: CimInstance,
    },
}

impl CimObject {
    pub fn path(&self) -> &CimObjectPath {
        match self {
            CimObject::Class { path, .. } | CimObject::Instance { path, .. } => path,
        }
    }

    pub fn as_class(&self) -> Option<&CimClass> {
        match self {
            CimObject::Class { class, .. } => Some(class),
            CimObject::Instance { .. } => None,
        }
    }

    pub fn as_instance(&self) -> Option<&CimInstance> {
        match self {
            CimObject::Instance { instance, .. } => Some(instance),
            CimObject::Class { .. } => None,
        }
    }
}
