// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Qualifier flavor bitmask.
//!
//! OVERRIDABLE/DISABLEOVERRIDE and TOSUBCLASS/RESTRICTED are complementary
//! pairs. Every bit combination is a legal value; [`CimFlavor::normalized`]
//! produces the canonical form used for declarations.

use serde::{Deserialize, Serialize};
use std::ops::Add;

bitflags::bitflags! {
    /// Propagation and override rules attached to a qualifier.
    #[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct CimFlavor: u32 {
        const OVERRIDABLE = 1 << 0;
        const TOSUBCLASS = 1 << 1;
        const TOINSTANCE = 1 << 2;
        const TRANSLATABLE = 1 << 3;
        const DISABLEOVERRIDE = 1 << 4;
        const RESTRICTED = 1 << 5;

        const DEFAULTS = Self::OVERRIDABLE.bits() | Self::TOSUBCLASS.bits();
        const TOSUBELEMENTS = Self::TOSUBCLASS.bits() | Self::TOINSTANCE.bits();
    }
}

impl CimFlavor {
    pub const NONE: CimFlavor = CimFlavor::empty();

    pub fn add_flavor(&mut self, flavor: CimFlavor) {
        self.insert(flavor);
    }

    pub fn remove_flavor(&mut self, flavor: CimFlavor) {
        self.remove(flavor);
    }

    /// True only if every requested bit is present.
    pub fn has_flavor(&self, flavor: CimFlavor) -> bool {
        self.contains(flavor)
    }

    /// Exact bit-pattern equality.
    pub fn equal(&self, other: CimFlavor) -> bool {
        self.bits() == other.bits()
    }

    /// Canonical declaration flavor.
    ///
    /// Starts from DEFAULTS; DISABLEOVERRIDE replaces OVERRIDABLE and
    /// RESTRICTED replaces TOSUBCLASS. TOINSTANCE and TRANSLATABLE are kept.
    pub fn normalized(self) -> CimFlavor {
        let mut flavor = CimFlavor::DEFAULTS;
        if self.contains(CimFlavor::DISABLEOVERRIDE) {
            flavor.remove(CimFlavor::OVERRIDABLE);
            flavor.insert(CimFlavor::DISABLEOVERRIDE);
        }
        if self.contains(CimFlavor::RESTRICTED) {
            flavor.remove(CimFlavor::TOSUBCLASS);
            flavor.insert(CimFlavor::RESTRICTED);
        }
        flavor | (self & (CimFlavor::TOINSTANCE | CimFlavor::TRANSLATABLE))
    }

    /// Whether a value inherited with this flavor may be changed.
    pub fn is_overridable(&self) -> bool {
        self.contains(CimFlavor::OVERRIDABLE) && !self.contains(CimFlavor::DISABLEOVERRIDE)
    }

    /// MOF keyword list, e.g. `EnableOverride, ToSubclass`.
    pub fn to_mof(&self) -> String {
        let mut parts = Vec::new();
        if self.contains(CimFlavor::DISABLEOVERRIDE) {
            parts.push("DisableOverride");
        } else if self.contains(CimFlavor::OVERRIDABLE) {
            parts.push("EnableOverride");
        }
        if self.contains(CimFlavor::RESTRICTED) {
            parts.push("Restricted");
        } else if self.contains(CimFlavor::TOSUBCLASS) {
            parts.push("ToSubclass");
        }
        if self.contains(CimFlavor::TOINSTANCE) {
            parts.push("ToInstance");
        }
        if self.contains(CimFlavor::TRANSLATABLE) {
            parts.push("Translatable");
        }
        parts.join(", ")
    }
}

impl Add for CimFlavor {
    type Output = CimFlavor;

    fn add(self, rhs: CimFlavor) -> CimFlavor {
        self | rhs
    }
}
