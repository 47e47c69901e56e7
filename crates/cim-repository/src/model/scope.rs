// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Qualifier scope bitmask.

use serde::{Deserialize, Serialize};
use std::ops::Add;

bitflags::bitflags! {
    /// Meta-elements a qualifier declaration may be attached to.
    #[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct CimScope: u32 {
        const CLASS = 1 << 0;
        const ASSOCIATION = 1 << 1;
        const INDICATION = 1 << 2;
        const PROPERTY = 1 << 3;
        const REFERENCE = 1 << 4;
        const METHOD = 1 << 5;
        const PARAMETER = 1 << 6;

        const ANY = Self::CLASS.bits()
            | Self::ASSOCIATION.bits()
            | Self::INDICATION.bits()
            | Self::PROPERTY.bits()
            | Self::REFERENCE.bits()
            | Self::METHOD.bits()
            | Self::PARAMETER.bits();
    }
}

impl CimScope {
    pub const NONE: CimScope = CimScope::empty();

    pub fn add_scope(&mut self, scope: CimScope) {
        self.insert(scope);
    }

    pub fn remove_scope(&mut self, scope: CimScope) {
        self.remove(scope);
    }

    /// True only if every requested bit is present.
    pub fn has_scope(&self, scope: CimScope) -> bool {
        self.contains(scope)
    }

    pub fn equal(&self, other: CimScope) -> bool {
        self.bits() == other.bits()
    }

    /// MOF keyword list, e.g. `class, property`.
    pub fn to_mof(&self) -> String {
        if self.contains(CimScope::ANY) {
            return "any".to_string();
        }
        let names = [
            (CimScope::CLASS, "class"),
            (CimScope::ASSOCIATION, "association"),
            (CimScope::INDICATION, "indication"),
            (CimScope::PROPERTY, "property"),
            (CimScope::REFERENCE, "reference"),
            (CimScope::METHOD, "method"),
            (CimScope::PARAMETER, "parameter"),
        ];
        names
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Add for CimScope {
    type Output = CimScope;

    fn add(self, rhs: CimScope) -> CimScope {
        self | rhs
    }
}
