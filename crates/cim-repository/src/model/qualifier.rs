// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Qualifiers, qualifier declarations and ordered qualifier lists.

use crate::error::{CimError, CimResult};
use crate::model::flavor::CimFlavor;
use crate::model::name::CimName;
use crate::model::scope::CimScope;
use crate::model::value::{CimType, CimValue};
use serde::{Deserialize, Serialize};

/// A qualifier value attached to a class, property, method or parameter.
///
/// An empty flavor means "not specified"; resolution replaces it with the
/// flavor inherited from the superclass element or the declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CimQualifier {
    name: CimName,
    value: CimValue,
    flavor: CimFlavor,
    propagated: bool,
}

impl CimQualifier {
    pub fn new(name: impl Into<CimName>, value: impl Into<CimValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            flavor: CimFlavor::NONE,
            propagated: false,
        }
    }

    pub fn with_flavor(mut self, flavor: CimFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn name(&self) -> &CimName {
        &self.name
    }

    pub fn value(&self) -> &CimValue {
        &self.value
    }

    pub fn set_value(&mut self, value: CimValue) {
        self.value = value;
    }

    pub fn flavor(&self) -> CimFlavor {
        self.flavor
    }

    pub fn set_flavor(&mut self, flavor: CimFlavor) {
        self.flavor = flavor;
    }

    pub fn propagated(&self) -> bool {
        self.propagated
    }

    pub fn set_propagated(&mut self, propagated: bool) {
        self.propagated = propagated;
    }

    /// Deep equality including flavor and propagation marker.
    pub fn identical(&self, other: &CimQualifier) -> bool {
        self == other
    }
}

/// Declaration of a qualifier within a namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CimQualifierDecl {
    name: CimName,
    value: CimValue,
    scope: CimScope,
    flavor: CimFlavor,
    array_size: Option<u32>,
}

impl CimQualifierDecl {
    /// The flavor is normalized from DEFAULTS (see [`CimFlavor::normalized`]).
    pub fn new(
        name: impl Into<CimName>,
        value: impl Into<CimValue>,
        scope: CimScope,
        flavor: CimFlavor,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            scope,
            flavor: flavor.normalized(),
            array_size: None,
        }
    }

    pub fn with_array_size(mut self, size: u32) -> Self {
        self.array_size = Some(size);
        self
    }

    pub fn name(&self) -> &CimName {
        &self.name
    }

    /// Default value; its type is the declared type.
    pub fn value(&self) -> &CimValue {
        &self.value
    }

    pub fn cim_type(&self) -> CimType {
        self.value.cim_type()
    }

    pub fn is_array(&self) -> bool {
        self.value.is_array()
    }

    pub fn scope(&self) -> CimScope {
        self.scope
    }

    pub fn flavor(&self) -> CimFlavor {
        self.flavor
    }

    pub fn array_size(&self) -> Option<u32> {
        self.array_size
    }

    pub fn identical(&self, other: &CimQualifierDecl) -> bool {
        self == other
    }
}

/// Ordered qualifier list with unique (case-insensitive) names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CimQualifierList {
    qualifiers: Vec<CimQualifier>,
}

impl CimQualifierList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a qualifier; duplicates are rejected.
    pub fn add(&mut self, qualifier: CimQualifier) -> CimResult<()> {
        if self.contains(qualifier.name()) {
            return Err(CimError::already_exists(format!(
                "qualifier {}",
                qualifier.name()
            )));
        }
        self.qualifiers.push(qualifier);
        Ok(())
    }

    /// Replace a qualifier of the same name, or append it.
    pub fn set(&mut self, qualifier: CimQualifier) {
        match self.find(qualifier.name()) {
            Some(idx) => self.qualifiers[idx] = qualifier,
            None => self.qualifiers.push(qualifier),
        }
    }

    pub(crate) fn insert(&mut self, index: usize, qualifier: CimQualifier) {
        self.qualifiers.insert(index, qualifier);
    }

    pub fn find(&self, name: &CimName) -> Option<usize> {
        self.qualifiers.iter().position(|q| q.name() == name)
    }

    pub fn contains(&self, name: &CimName) -> bool {
        self.find(name).is_some()
    }

    pub fn get(&self, name: &CimName) -> Option<&CimQualifier> {
        self.qualifiers.iter().find(|q| q.name() == name)
    }

    pub fn get_mut(&mut self, name: &CimName) -> Option<&mut CimQualifier> {
        self.qualifiers.iter_mut().find(|q| q.name() == name)
    }

    pub fn remove(&mut self, name: &CimName) -> Option<CimQualifier> {
        self.find(name).map(|idx| self.qualifiers.remove(idx))
    }

    /// True when the named qualifier is a boolean set to true.
    pub fn is_true(&self, name: &str) -> bool {
        self.qualifiers
            .iter()
            .find(|q| q.name().eq_str(name))
            .and_then(|q| q.value().as_bool())
            .unwrap_or(false)
    }

    pub fn retain<F: FnMut(&CimQualifier) -> bool>(&mut self, f: F) {
        self.qualifiers.retain(f);
    }

    pub fn clear(&mut self) {
        self.qualifiers.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CimQualifier> {
        self.qualifiers.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, CimQualifier> {
        self.qualifiers.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.qualifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.qualifiers.is_empty()
    }
}

impl<'a> IntoIterator for &'a CimQualifierList {
    type Item = &'a CimQualifier;
    type IntoIter = std::slice::Iter<'a, CimQualifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.qualifiers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_flavor_is_normalized() {
        let q4 = CimQualifierDecl::new("q4", 55u32, CimScope::CLASS, CimFlavor::RESTRICTED);
        assert!(!q4.flavor().has_flavor(CimFlavor::TOINSTANCE));
        assert!(!q4.flavor().has_flavor(CimFlavor::TOSUBCLASS));
        assert!(q4.flavor().has_flavor(CimFlavor::OVERRIDABLE));
        assert_eq!(q4.cim_type(), CimType::Uint32);

        let plain = CimQualifierDecl::new("q1", true, CimScope::ANY, CimFlavor::NONE);
        assert!(plain.flavor().equal(CimFlavor::DEFAULTS));
    }

    #[test]
    fn test_list_rejects_duplicates() {
        let mut list = CimQualifierList::new();
        list.add(CimQualifier::new("Key", true)).unwrap();
        let err = list.add(CimQualifier::new("KEY", true)).unwrap_err();
        assert!(err.is(crate::error::CimStatusCode::AlreadyExists));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_list_lookup_and_set() {
        let mut list = CimQualifierList::new();
        list.add(CimQualifier::new("Description", "first")).unwrap();
        list.add(CimQualifier::new("Abstract", true)).unwrap();
        assert!(list.is_true("abstract"));
        assert!(!list.is_true("Description"));

        list.set(CimQualifier::new("description", "second"));
        assert_eq!(list.len(), 2);
        assert_eq!(
            list.get(&CimName::new("Description")).unwrap().value(),
            &CimValue::from("second")
        );

        assert!(list.remove(&CimName::new("Abstract")).is_some());
        assert!(!list.is_true("Abstract"));
    }
}
