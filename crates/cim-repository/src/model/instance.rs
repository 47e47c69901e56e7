// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::error::{CimError, CimResult};
use crate::model::name::CimName;
use crate::model::path::CimObjectPath;
use crate::model::property::CimProperty;
use crate::model::qualifier::{CimQualifier, CimQualifierList};
use crate::model::value::CimValue;
use serde::{Deserialize, Serialize};

/// An instance of a class with its property values and object path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CimInstance {
    class_name: CimName,
    qualifiers: CimQualifierList,
    properties: Vec<CimProperty>,
    path: Option<CimObjectPath>,
}

impl CimInstance {
    pub fn new(class_name: impl Into<CimName>) -> Self {
        Self {
            class_name: class_name.into(),
            qualifiers: CimQualifierList::new(),
            properties: Vec::new(),
            path: None,
        }
    }

    /// Builder form; replaces a property of the same name.
    pub fn with_property(mut self, property: CimProperty) -> Self {
        match self.find_property(property.name()) {
            Some(idx) => self.properties[idx] = property,
            None => self.properties.push(property),
        }
        self
    }

    pub fn with_qualifier(mut self, qualifier: CimQualifier) -> Self {
        self.qualifiers.set(qualifier);
        self
    }

    pub fn class_name(&self) -> &CimName {
        &self.class_name
    }

    pub fn qualifiers(&self) -> &CimQualifierList {
        &self.qualifiers
    }

    pub fn qualifiers_mut(&mut self) -> &mut CimQualifierList {
        &mut self.qualifiers
    }

    pub fn properties(&self) -> &[CimProperty] {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut [CimProperty] {
        &mut self.properties
    }

    pub(crate) fn take_properties(&mut self) -> Vec<CimProperty> {
        std::mem::take(&mut self.properties)
    }

    pub(crate) fn set_properties(&mut self, properties: Vec<CimProperty>) {
        self.properties = properties;
    }

    pub fn add_property(&mut self, property: CimProperty) -> CimResult<()> {
        if self.find_property(property.name()).is_some() {
            return Err(CimError::already_exists(format!(
                "property {} of instance of {}",
                property.name(),
                self.class_name
            )));
        }
        self.properties.push(property);
        Ok(())
    }

    pub fn find_property(&self, name: &CimName) -> Option<usize> {
        self.properties.iter().position(|p| p.name() == name)
    }

    pub fn property(&self, name: &CimName) -> Option<&CimProperty> {
        self.properties.iter().find(|p| p.name() == name)
    }

    pub fn property_mut(&mut self, name: &CimName) -> Option<&mut CimProperty> {
        self.properties.iter_mut().find(|p| p.name() == name)
    }

    pub fn remove_property(&mut self, name: &CimName) -> Option<CimProperty> {
        self.find_property(name)
            .map(|idx| self.properties.remove(idx))
    }

    /// Value of a property, if present.
    pub fn value(&self, name: &str) -> Option<&CimValue> {
        self.properties
            .iter()
            .find(|p| p.name().eq_str(name))
            .map(|p| p.value())
    }

    pub fn path(&self) -> Option<&CimObjectPath> {
        self.path.as_ref()
    }

    pub fn set_path(&mut self, path: Option<CimObjectPath>) {
        self.path = path;
    }

    /// Apply the GetInstance/EnumerateInstances result options.
    pub fn filter(
        &mut self,
        include_qualifiers: bool,
        include_class_origin: bool,
        property_list: Option<&[CimName]>,
    ) {
        if let Some(list) = property_list {
            self.properties.retain(|p| list.contains(p.name()));
        }
        if !include_qualifiers {
            self.qualifiers.clear();
            for property in &mut self.properties {
                property.qualifiers_mut().clear();
            }
        }
        if !include_class_origin {
            for property in &mut self.properties {
                property.set_class_origin(None);
            }
        }
    }

    pub fn identical(&self, other: &CimInstance) -> bool {
        self == other
    }
}
