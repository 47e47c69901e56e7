// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! JSON schema documents for bulk import and export.
//!
//! A document carries qualifier declarations, local class definitions and
//! instances for one namespace. Classes may appear in any order; import
//! creates each class once its superclass exists.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CimError, CimResult};
use crate::model::{CimClass, CimInstance, CimName, CimQualifierDecl, NamespaceName};
use crate::repository::CimRepository;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub qualifiers: Vec<CimQualifierDecl>,
    #[serde(default)]
    pub classes: Vec<CimClass>,
    #[serde(default)]
    pub instances: Vec<CimInstance>,
}

/// Object counts written by [`import_document`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub qualifiers: usize,
    pub classes: usize,
    pub instances: usize,
}

impl SchemaDocument {
    pub fn from_file<P: AsRef<Path>>(path: P) -> CimResult<Self> {
        let content = std::fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&content)?)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> CimResult<()> {
        std::fs::write(path.as_ref(), serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}

/// Load `doc` into `ns`: qualifiers, then classes parents first, then
/// instances.
pub fn import_document(
    repo: &CimRepository,
    ns: &NamespaceName,
    doc: &SchemaDocument,
) -> CimResult<ImportSummary> {
    let mut summary = ImportSummary::default();

    for decl in &doc.qualifiers {
        repo.set_qualifier(ns, decl)?;
        summary.qualifiers += 1;
    }

    let mut known: HashSet<CimName> = repo
        .enumerate_class_names(ns, None, true)?
        .into_iter()
        .collect();
    let mut pending: Vec<&CimClass> = doc.classes.iter().collect();
    while !pending.is_empty() {
        let before = pending.len();
        let mut deferred = Vec::new();
        for class in pending {
            let ready = class.super_class().map_or(true, |sc| known.contains(sc));
            if ready {
                repo.create_class(ns, class)?;
                known.insert(class.name().clone());
                summary.classes += 1;
            } else {
                deferred.push(class);
            }
        }
        if deferred.len() == before {
            let missing: Vec<String> = deferred
                .iter()
                .map(|c| {
                    format!(
                        "{} (superclass {})",
                        c.name(),
                        c.super_class().map(CimName::as_str).unwrap_or_default()
                    )
                })
                .collect();
            return Err(CimError::invalid_superclass(missing.join(", ")));
        }
        pending = deferred;
    }

    for instance in &doc.instances {
        repo.create_instance(ns, instance)?;
        summary.instances += 1;
    }

    info!(
        "Imported {} qualifiers, {} classes, {} instances into {}",
        summary.qualifiers, summary.classes, summary.instances, ns
    );
    Ok(summary)
}

/// Everything visible from `ns` as local definitions.
pub fn export_document(repo: &CimRepository, ns: &NamespaceName) -> CimResult<SchemaDocument> {
    let qualifiers = repo.enumerate_qualifiers(ns)?;

    let mut names = repo.enumerate_class_names(ns, None, true)?;
    names.sort();
    let mut classes = Vec::with_capacity(names.len());
    let mut instances = Vec::new();
    for name in &names {
        classes.push(repo.get_class(ns, name, true, true, false, None)?);
        for mut instance in repo.enumerate_instances_for_class(ns, name, false, false, None)? {
            let local = instance
                .take_properties()
                .into_iter()
                .filter(|p| !p.propagated())
                .collect();
            instance.set_properties(local);
            instance.set_path(None);
            instances.push(instance);
        }
    }

    Ok(SchemaDocument {
        qualifiers,
        classes,
        instances,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CimStatusCode;
    use crate::model::{CimFlavor, CimProperty, CimQualifier, CimScope, CimType, CimValue};

    fn sample() -> SchemaDocument {
        SchemaDocument {
            qualifiers: vec![CimQualifierDecl::new(
                "Key",
                false,
                CimScope::PROPERTY | CimScope::REFERENCE,
                CimFlavor::DISABLEOVERRIDE,
            )],
            // Subclass first: import must reorder.
            classes: vec![
                CimClass::new("TST_Disk")
                    .with_super_class("TST_Device")
                    .with_property(CimProperty::new("Size", 0u64)),
                CimClass::new("TST_Device").with_property(
                    CimProperty::new("Id", CimValue::null(CimType::String))
                        .with_qualifier(CimQualifier::new("Key", true)),
                ),
            ],
            instances: vec![CimInstance::new("TST_Disk")
                .with_property(CimProperty::new("Id", "sda"))
                .with_property(CimProperty::new("Size", 512u64))],
        }
    }

    #[test]
    fn test_import_orders_classes() {
        let repo = CimRepository::in_memory().unwrap();
        let ns = NamespaceName::new("root").unwrap();

        let summary = import_document(&repo, &ns, &sample()).unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                qualifiers: 1,
                classes: 2,
                instances: 1
            }
        );
        assert_eq!(
            repo.get_super_class_name(&ns, &CimName::new("TST_Disk")).unwrap(),
            Some(CimName::new("TST_Device"))
        );
    }

    #[test]
    fn test_import_missing_superclass() {
        let repo = CimRepository::in_memory().unwrap();
        let ns = NamespaceName::new("root").unwrap();
        let doc = SchemaDocument {
            classes: vec![CimClass::new("TST_Orphan").with_super_class("TST_Nowhere")],
            ..Default::default()
        };

        let err = import_document(&repo, &ns, &doc).unwrap_err();
        assert!(err.is(CimStatusCode::InvalidSuperclass));
    }

    #[test]
    fn test_export_then_import_elsewhere() {
        let dir = tempfile::tempdir().unwrap();
        let repo = CimRepository::in_memory().unwrap();
        let root = NamespaceName::new("root").unwrap();
        import_document(&repo, &root, &sample()).unwrap();

        let file = dir.path().join("root.json");
        export_document(&repo, &root).unwrap().to_file(&file).unwrap();
        let exported = SchemaDocument::from_file(&file).unwrap();
        assert_eq!(exported.classes.len(), 2);
        assert_eq!(exported.instances.len(), 1);
        assert!(exported.classes.iter().all(|c| c
            .properties()
            .iter()
            .all(|p| !p.propagated())));

        let copy = CimRepository::in_memory().unwrap();
        let summary = import_document(&copy, &root, &exported).unwrap();
        assert_eq!(summary.instances, 1);
        let disk = copy
            .enumerate_instances_for_class(&root, &CimName::new("TST_Disk"), false, false, None)
            .unwrap();
        assert_eq!(disk[0].value("Size"), Some(&CimValue::from(512u64)));
    }
}
