// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::model::name::CimName;
use crate::model::qualifier::{CimQualifier, CimQualifierList};
use crate::model::value::{CimType, CimValue};
use serde::{Deserialize, Serialize};

/// A class or instance property.
///
/// The declared type is the type of `value` (typed null when unset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CimProperty {
    name: CimName,
    value: CimValue,
    array_size: Option<u32>,
    reference_class: Option<CimName>,
    class_origin: Option<CimName>,
    propagated: bool,
    qualifiers: CimQualifierList,
}

impl CimProperty {
    pub fn new(name: impl Into<CimName>, value: impl Into<CimValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            array_size: None,
            reference_class: None,
            class_origin: None,
            propagated: false,
            qualifiers: CimQualifierList::new(),
        }
    }

    /// Reference property pointing at instances of `reference_class`.
    pub fn reference(name: impl Into<CimName>, reference_class: impl Into<CimName>) -> Self {
        let mut property = Self::new(name, CimValue::null(CimType::Reference));
        property.reference_class = Some(reference_class.into());
        property
    }

    /// Builder form; replaces a qualifier of the same name.
    pub fn with_qualifier(mut self, qualifier: CimQualifier) -> Self {
        self.qualifiers.set(qualifier);
        self
    }

    pub fn with_class_origin(mut self, origin: impl Into<CimName>) -> Self {
        self.class_origin = Some(origin.into());
        self
    }

    pub fn with_propagated(mut self, propagated: bool) -> Self {
        self.propagated = propagated;
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

    pub fn cim_type(&self) -> CimType {
        self.value.cim_type()
    }

    pub fn is_array(&self) -> bool {
        self.value.is_array()
    }

    pub fn array_size(&self) -> Option<u32> {
        self.array_size
    }

    pub fn set_array_size(&mut self, size: Option<u32>) {
        self.array_size = size;
    }

    pub fn reference_class(&self) -> Option<&CimName> {
        self.reference_class.as_ref()
    }

    pub fn set_reference_class(&mut self, class_name: Option<CimName>) {
        self.reference_class = class_name;
    }

    pub fn is_reference(&self) -> bool {
        self.value.cim_type() == CimType::Reference
    }

    pub fn class_origin(&self) -> Option<&CimName> {
        self.class_origin.as_ref()
    }

    pub fn set_class_origin(&mut self, origin: Option<CimName>) {
        self.class_origin = origin;
    }

    pub fn propagated(&self) -> bool {
        self.propagated
    }

    pub fn set_propagated(&mut self, propagated: bool) {
        self.propagated = propagated;
    }

    pub fn qualifiers(&self) -> &CimQualifierList {
        &self.qualifiers
    }

    pub fn qualifiers_mut(&mut self) -> &mut CimQualifierList {
        &mut self.qualifiers
    }

    /// Carries a `Key` qualifier set to true.
    pub fn is_key(&self) -> bool {
        self.qualifiers.is_true("Key")
    }

    pub fn identical(&self, other: &CimProperty) -> bool {
        self == other
    }
}
