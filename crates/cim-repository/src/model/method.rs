// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::model::name::CimName;
use crate::model::qualifier::{CimQualifier, CimQualifierList};
use crate::model::value::CimType;
use serde::{Deserialize, Serialize};

/// Method parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CimParameter {
    name: CimName,
    ty: CimType,
    is_array: bool,
    array_size: Option<u32>,
    reference_class: Option<CimName>,
    qualifiers: CimQualifierList,
}

impl CimParameter {
    pub fn new(name: impl Into<CimName>, ty: CimType) -> Self {
        Self {
            name: name.into(),
            ty,
            is_array: false,
            array_size: None,
            reference_class: None,
            qualifiers: CimQualifierList::new(),
        }
    }

    pub fn array(mut self, size: Option<u32>) -> Self {
        self.is_array = true;
        self.array_size = size;
        self
    }

    pub fn with_reference_class(mut self, class_name: impl Into<CimName>) -> Self {
        self.reference_class = Some(class_name.into());
        self
    }

    pub fn with_qualifier(mut self, qualifier: CimQualifier) -> Self {
        self.qualifiers.set(qualifier);
        self
    }

    pub fn name(&self) -> &CimName {
        &self.name
    }

    pub fn cim_type(&self) -> CimType {
        self.ty
    }

    pub fn is_array(&self) -> bool {
        self.is_array
    }

    pub fn array_size(&self) -> Option<u32> {
        self.array_size
    }

    pub fn reference_class(&self) -> Option<&CimName> {
        self.reference_class.as_ref()
    }

    pub fn qualifiers(&self) -> &CimQualifierList {
        &self.qualifiers
    }

    pub fn qualifiers_mut(&mut self) -> &mut CimQualifierList {
        &mut self.qualifiers
    }
}

/// Class method with ordered parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CimMethod {
    name: CimName,
    return_type: CimType,
    parameters: Vec<CimParameter>,
    qualifiers: CimQualifierList,
    class_origin: Option<CimName>,
    propagated: bool,
}

impl CimMethod {
    pub fn new(name: impl Into<CimName>, return_type: CimType) -> Self {
        Self {
            name: name.into(),
            return_type,
            parameters: Vec::new(),
            qualifiers: CimQualifierList::new(),
            class_origin: None,
            propagated: false,
        }
    }

    pub fn with_parameter(mut self, parameter: CimParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_qualifier(mut self, qualifier: CimQualifier) -> Self {
        self.qualifiers.set(qualifier);
        self
    }

    pub fn name(&self) -> &CimName {
        &self.name
    }

    pub fn return_type(&self) -> CimType {
        self.return_type
    }

    pub fn parameters(&self) -> &[CimParameter] {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut [CimParameter] {
        &mut self.parameters
    }

    pub fn parameter(&self, name: &CimName) -> Option<&CimParameter> {
        self.parameters.iter().find(|p| p.name() == name)
    }

    pub fn qualifiers(&self) -> &CimQualifierList {
        &self.qualifiers
    }

    pub fn qualifiers_mut(&mut self) -> &mut CimQualifierList {
        &mut self.qualifiers
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

    pub fn identical(&self, other: &CimMethod) -> bool {
        self == other
    }
}
