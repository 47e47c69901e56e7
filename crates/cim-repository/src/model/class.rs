// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CIM class definitions.

use crate::error::{CimError, CimResult};
use crate::model::instance::CimInstance;
use crate::model::method::CimMethod;
use crate::model::name::{CimName, NamespaceName};
use crate::model::path::{CimKeyBinding, CimObjectPath};
use crate::model::property::CimProperty;
use crate::model::qualifier::{CimQualifier, CimQualifierList};
use serde::{Deserialize, Serialize};

/// A class: qualifiers, properties and methods in declaration order.
///
/// Before resolution only the local elements are present. A resolved class
/// also carries the elements inherited from its superclass chain, marked
/// propagated and annotated with their class of origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CimClass {
    name: CimName,
    super_class: Option<CimName>,
    qualifiers: CimQualifierList,
    properties: Vec<CimProperty>,
    methods: Vec<CimMethod>,
}

impl CimClass {
    pub fn new(name: impl Into<CimName>) -> Self {
        Self {
            name: name.into(),
            super_class: None,
            qualifiers: CimQualifierList::new(),
            properties: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn with_super_class(mut self, super_class: impl Into<CimName>) -> Self {
        self.super_class = Some(super_class.into());
        self
    }

    pub fn with_qualifier(mut self, qualifier: CimQualifier) -> Self {
        self.qualifiers.set(qualifier);
        self
    }

    /// Builder form; replaces a property of the same name.
    pub fn with_property(mut self, property: CimProperty) -> Self {
        match self.find_property(property.name()) {
            Some(idx) => self.properties[idx] = property,
            None => self.properties.push(property),
        }
        self
    }

    pub fn with_method(mut self, method: CimMethod) -> Self {
        match self.find_method(method.name()) {
            Some(idx) => self.methods[idx] = method,
            None => self.methods.push(method),
        }
        self
    }

    pub fn name(&self) -> &CimName {
        &self.name
    }

    /// Reject illegal class, superclass, property, method and parameter
    /// names.
    pub fn check_names(&self) -> CimResult<()> {
        self.name.check_legal("class")?;
        if let Some(super_class) = &self.super_class {
            super_class.check_legal("superclass")?;
        }
        for property in &self.properties {
            property.name().check_legal("property")?;
        }
        for method in &self.methods {
            method.name().check_legal("method")?;
            for parameter in method.parameters() {
                parameter.name().check_legal("parameter")?;
            }
        }
        Ok(())
    }

    pub fn super_class(&self) -> Option<&CimName> {
        self.super_class.as_ref()
    }

    pub fn set_super_class(&mut self, super_class: Option<CimName>) {
        self.super_class = super_class;
    }

    pub fn qualifiers(&self) -> &CimQualifierList {
        &self.qualifiers
    }

    pub fn qualifiers_mut(&mut self) -> &mut CimQualifierList {
        &mut self.qualifiers
    }

    pub fn add_qualifier(&mut self, qualifier: CimQualifier) -> CimResult<()> {
        self.qualifiers.add(qualifier)
    }

    pub fn properties(&self) -> &[CimProperty] {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut [CimProperty] {
        &mut self.properties
    }

    pub fn add_property(&mut self, property: CimProperty) -> CimResult<()> {
        if self.find_property(property.name()).is_some() {
            return Err(CimError::already_exists(format!(
                "property {}.{}",
                self.name,
                property.name()
            )));
        }
        self.properties.push(property);
        Ok(())
    }

    pub(crate) fn insert_property(&mut self, index: usize, property: CimProperty) {
        self.properties.insert(index, property);
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

    pub fn methods(&self) -> &[CimMethod] {
        &self.methods
    }

    pub fn methods_mut(&mut self) -> &mut [CimMethod] {
        &mut self.methods
    }

    pub fn add_method(&mut self, method: CimMethod) -> CimResult<()> {
        if self.find_method(method.name()).is_some() {
            return Err(CimError::already_exists(format!(
                "method {}.{}",
                self.name,
                method.name()
            )));
        }
        self.methods.push(method);
        Ok(())
    }

    pub(crate) fn insert_method(&mut self, index: usize, method: CimMethod) {
        self.methods.insert(index, method);
    }

    pub fn find_method(&self, name: &CimName) -> Option<usize> {
        self.methods.iter().position(|m| m.name() == name)
    }

    pub fn method(&self, name: &CimName) -> Option<&CimMethod> {
        self.methods.iter().find(|m| m.name() == name)
    }

    /// Carries a boolean `Association` qualifier set to true.
    pub fn is_association(&self) -> bool {
        self.qualifiers.is_true("Association")
    }

    pub fn is_abstract(&self) -> bool {
        self.qualifiers.is_true("Abstract")
    }

    /// Names of the properties qualified as keys, in declaration order.
    pub fn key_names(&self) -> Vec<CimName> {
        self.properties
            .iter()
            .filter(|p| p.is_key())
            .map(|p| p.name().clone())
            .collect()
    }

    pub fn has_keys(&self) -> bool {
        self.properties.iter().any(|p| p.is_key())
    }

    /// Reference properties, the roles of an association.
    pub fn reference_properties(&self) -> impl Iterator<Item = &CimProperty> {
        self.properties.iter().filter(|p| p.is_reference())
    }

    /// Instance path from the key property values of `instance`.
    pub fn build_path(&self, instance: &CimInstance) -> CimResult<CimObjectPath> {
        let mut path = CimObjectPath::new(self.name.clone());
        for key in self.key_names() {
            let property = instance.property(&key).ok_or_else(|| {
                CimError::invalid_parameter(format!(
                    "instance of {} lacks key property {}",
                    self.name, key
                ))
            })?;
            path.add_key_binding(CimKeyBinding::from_value(key, property.value())?);
        }
        Ok(path)
    }

    /// Class path in the given namespace.
    pub fn path(&self, namespace: &NamespaceName) -> CimObjectPath {
        CimObjectPath::new(self.name.clone()).with_namespace(namespace.clone())
    }

    /// Drop every inherited element, leaving the local definition.
    pub fn strip_propagated(&mut self) {
        self.qualifiers.retain(|q| !q.propagated());
        self.properties.retain(|p| !p.propagated());
        self.methods.retain(|m| !m.propagated());
        for property in &mut self.properties {
            property.qualifiers_mut().retain(|q| !q.propagated());
        }
        for method in &mut self.methods {
            method.qualifiers_mut().retain(|q| !q.propagated());
        }
    }

    /// Apply the GetClass/EnumerateClasses result options.
    ///
    /// A property list keeps only the named properties; names the class
    /// does not have are ignored and an empty list keeps none.
    pub fn filter(
        &mut self,
        local_only: bool,
        include_qualifiers: bool,
        include_class_origin: bool,
        property_list: Option<&[CimName]>,
    ) {
        if local_only {
            self.qualifiers.retain(|q| !q.propagated());
            self.properties.retain(|p| !p.propagated());
            self.methods.retain(|m| !m.propagated());
        }
        if let Some(list) = property_list {
            self.properties.retain(|p| list.contains(p.name()));
        }
        if !include_qualifiers {
            self.qualifiers.clear();
            for property in &mut self.properties {
                property.qualifiers_mut().clear();
            }
            for method in &mut self.methods {
                method.qualifiers_mut().clear();
                for parameter in method.parameters_mut() {
                    parameter.qualifiers_mut().clear();
                }
            }
        }
        if !include_class_origin {
            for property in &mut self.properties {
                property.set_class_origin(None);
            }
            for method in &mut self.methods {
                method.set_class_origin(None);
            }
        }
    }

    pub fn identical(&self, other: &CimClass) -> bool {
        self == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::value::CimValue;

    fn person() -> CimClass {
        CimClass::new("TST_Person")
            .with_qualifier(CimQualifier::new("Description", "a person"))
            .with_property(
                CimProperty::new("Name", CimValue::null(crate::model::CimType::String))
                    .with_qualifier(CimQualifier::new("Key", true)),
            )
            .with_property(CimProperty::new("Age", 0u32))
            .with_property(CimProperty::new("Inherited", 1u8).with_propagated(true))
    }

    #[test]
    fn test_key_names_and_path() {
        let class = person();
        assert_eq!(class.key_names(), vec![CimName::new("Name")]);
        assert!(class.has_keys());

        let instance = CimInstance::new("TST_Person").with_property(CimProperty::new("Name", "Ann"));
        let path = class.build_path(&instance).unwrap();
        assert_eq!(path.to_string(), "TST_Person.Name=\"Ann\"");

        let missing = CimInstance::new("TST_Person");
        assert!(class.build_path(&missing).is_err());
    }

    #[test]
    fn test_add_property_rejects_duplicate() {
        let mut class = person();
        let err = class.add_property(CimProperty::new("age", 1u32)).unwrap_err();
        assert!(err.is(crate::error::CimStatusCode::AlreadyExists));
    }

    #[test]
    fn test_filter_local_only() {
        let mut class = person();
        class.filter(true, true, true, None);
        assert!(class.property(&CimName::new("Inherited")).is_none());
        assert!(class.property(&CimName::new("Age")).is_some());
    }

    #[test]
    fn test_filter_property_list() {
        let mut class = person();
        let list = [CimName::new("age"), CimName::new("Unknown")];
        class.filter(false, true, true, Some(&list));
        assert_eq!(class.properties().len(), 1);

        let mut class = person();
        class.filter(false, true, true, Some(&[]));
        assert!(class.properties().is_empty());
    }

    #[test]
    fn test_filter_qualifiers_and_origin() {
        let mut class = person();
        class.properties_mut()[0].set_class_origin(Some(CimName::new("TST_Person")));
        class.filter(false, false, false, None);
        assert!(class.qualifiers().is_empty());
        assert!(class.properties()[0].qualifiers().is_empty());
        assert!(class.properties()[0].class_origin().is_none());
    }

    #[test]
    fn test_association_flag() {
        let assoc = CimClass::new("TST_Lineage").with_qualifier(CimQualifier::new("Association", true));
        assert!(assoc.is_association());
        assert!(!person().is_association());
    }

    #[test]
    fn test_check_names() {
        assert!(person().check_names().is_ok());

        let bad_property = person().with_property(CimProperty::new("bad name!", 1u8));
        assert!(bad_property.check_names().is_err());

        let bad_parameter = person().with_method(
            CimMethod::new("Reset", crate::model::CimType::Uint32).with_parameter(
                crate::model::CimParameter::new("../x", crate::model::CimType::String),
            ),
        );
        assert!(bad_parameter.check_names().is_err());

        assert!(CimClass::new("").check_names().is_err());
        assert!(CimClass::new("TST_A")
            .with_super_class("a/b")
            .check_names()
            .is_err());
    }
}
