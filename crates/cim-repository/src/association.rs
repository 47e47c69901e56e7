// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Association records derived from association classes and instances.

use crate::model::{CimClass, CimInstance, CimName, CimObjectPath, CimValue};
use serde::{Deserialize, Serialize};

/// One role pair of an association class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassAssociation {
    pub assoc_class_name: CimName,
    pub from_class_name: CimName,
    pub from_property_name: CimName,
    pub to_class_name: CimName,
    pub to_property_name: CimName,
}

impl ClassAssociation {
    pub fn new(
        assoc_class_name: impl Into<CimName>,
        from_class_name: impl Into<CimName>,
        from_property_name: impl Into<CimName>,
        to_class_name: impl Into<CimName>,
        to_property_name: impl Into<CimName>,
    ) -> Self {
        Self {
            assoc_class_name: assoc_class_name.into(),
            from_class_name: from_class_name.into(),
            from_property_name: from_property_name.into(),
            to_class_name: to_class_name.into(),
            to_property_name: to_property_name.into(),
        }
    }

    /// Same edge seen from the other end.
    pub fn reversed(&self) -> Self {
        Self {
            assoc_class_name: self.assoc_class_name.clone(),
            from_class_name: self.to_class_name.clone(),
            from_property_name: self.to_property_name.clone(),
            to_class_name: self.from_class_name.clone(),
            to_property_name: self.from_property_name.clone(),
        }
    }
}

/// One directed edge of an association instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceAssociation {
    pub assoc_instance: CimObjectPath,
    pub assoc_class_name: CimName,
    pub from_instance: CimObjectPath,
    pub from_class_name: CimName,
    pub from_property_name: CimName,
    pub to_instance: CimObjectPath,
    pub to_class_name: CimName,
    pub to_property_name: CimName,
}

/// Records for a resolved association class, one per unordered pair of
/// reference properties. Returns nothing for ordinary classes.
pub fn build_class_associations(class: &CimClass) -> Vec<ClassAssociation> {
    if !class.is_association() {
        return Vec::new();
    }

    let refs: Vec<(&CimName, &CimName)> = class
        .reference_properties()
        .filter_map(|p| p.reference_class().map(|rc| (p.name(), rc)))
        .collect();

    let mut out = Vec::new();
    for (i, (from_prop, from_class)) in refs.iter().enumerate() {
        for (to_prop, to_class) in refs.iter().skip(i + 1) {
            out.push(ClassAssociation::new(
                class.name().clone(),
                (*from_class).clone(),
                (*from_prop).clone(),
                (*to_class).clone(),
                (*to_prop).clone(),
            ));
        }
    }
    out
}

/// Directed records for an association instance, one per ordered pair of
/// non-null reference values, so a lookup by either endpoint finds it.
pub fn build_instance_associations(
    instance: &CimInstance,
    assoc_path: &CimObjectPath,
) -> Vec<InstanceAssociation> {
    let refs: Vec<(&CimName, &CimObjectPath)> = instance
        .properties()
        .iter()
        .filter_map(|p| match p.value() {
            CimValue::Reference(path) => Some((p.name(), path)),
            _ => None,
        })
        .collect();

    let mut out = Vec::new();
    for (i, (from_prop, from_path)) in refs.iter().enumerate() {
        for (j, (to_prop, to_path)) in refs.iter().enumerate() {
            if i == j {
                continue;
            }
            out.push(InstanceAssociation {
                assoc_instance: assoc_path.to_local(),
                assoc_class_name: instance.class_name().clone(),
                from_instance: (*from_path).clone(),
                from_class_name: from_path.class_name().clone(),
                from_property_name: (*from_prop).clone(),
                to_instance: (*to_path).clone(),
                to_class_name: to_path.class_name().clone(),
                to_property_name: (*to_prop).clone(),
            });
        }
    }
    out
}
