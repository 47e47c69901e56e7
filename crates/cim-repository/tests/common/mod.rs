// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared fixtures for repository integration tests.

#![allow(dead_code)]

use cim_repository::{
    Backend, CimClass, CimFlavor, CimInstance, CimKeyBinding, CimObjectPath, CimProperty,
    CimQualifier, CimQualifierDecl, CimRepository, CimScope, CimType, CimValue, Encoding,
    KeyKind, NamespaceName, RepositoryConfig,
};
use std::path::Path;

pub fn ns(name: &str) -> NamespaceName {
    NamespaceName::new(name).unwrap()
}

pub fn open(root: &Path, backend: Backend, encoding: Encoding) -> CimRepository {
    let config = RepositoryConfig::builder()
        .root(root)
        .backend(backend)
        .encoding(encoding)
        .build();
    CimRepository::open(config).unwrap()
}

pub fn qualifier_decls() -> Vec<CimQualifierDecl> {
    vec![
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
        CimQualifierDecl::new("Version", "", CimScope::CLASS, CimFlavor::TOINSTANCE),
        CimQualifierDecl::new("Internal", false, CimScope::CLASS, CimFlavor::RESTRICTED),
    ]
}

pub fn declare_qualifiers(repo: &CimRepository, target: &NamespaceName) {
    for decl in qualifier_decls() {
        repo.set_qualifier(target, &decl).unwrap();
    }
}

/// CIM_ManagedElement <- CIM_System <- CIM_ComputerSystem, plus CIM_Component.
pub fn system_schema() -> Vec<CimClass> {
    vec![
        CimClass::new("CIM_ManagedElement")
            .with_qualifier(CimQualifier::new("Description", "root of the schema"))
            .with_qualifier(CimQualifier::new("Version", "2.50"))
            .with_qualifier(CimQualifier::new("Internal", true))
            .with_property(CimProperty::new("Caption", CimValue::null(CimType::String))),
        CimClass::new("CIM_System")
            .with_super_class("CIM_ManagedElement")
            .with_property(
                CimProperty::new("Name", CimValue::null(CimType::String))
                    .with_qualifier(CimQualifier::new("Key", true)),
            )
            .with_property(CimProperty::new("Enabled", true)),
        CimClass::new("CIM_ComputerSystem")
            .with_super_class("CIM_System")
            .with_property(CimProperty::new("Cores", 1u16)),
        CimClass::new("CIM_Component")
            .with_qualifier(CimQualifier::new("Association", true))
            .with_property(
                CimProperty::reference("GroupComponent", "CIM_System")
                    .with_qualifier(CimQualifier::new("Key", true)),
            )
            .with_property(
                CimProperty::reference("PartComponent", "CIM_ManagedElement")
                    .with_qualifier(CimQualifier::new("Key", true)),
            ),
    ]
}

pub fn load_system_schema(repo: &CimRepository, target: &NamespaceName) {
    declare_qualifiers(repo, target);
    for class in system_schema() {
        repo.create_class(target, &class).unwrap();
    }
}

pub fn system(class: &str, name: &str) -> CimInstance {
    CimInstance::new(class).with_property(CimProperty::new("Name", name))
}

pub fn system_path(class: &str, name: &str) -> CimObjectPath {
    CimObjectPath::new(class).with_key(CimKeyBinding::new("Name", name, KeyKind::String))
}

pub fn component(group: &CimObjectPath, part: &CimObjectPath) -> CimInstance {
    CimInstance::new("CIM_Component")
        .with_property(CimProperty::new("GroupComponent", group.clone()))
        .with_property(CimProperty::new("PartComponent", part.clone()))
}

pub fn sorted<T: Ord>(mut v: Vec<T>) -> Vec<T> {
    v.sort();
    v
}
