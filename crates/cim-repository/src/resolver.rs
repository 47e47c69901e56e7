// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Inheritance resolution.
//!
//! Flattens a class against its resolved superclass and an instance against
//! its class, applying the qualifier flavor and scope rules:
//!
//! - every qualifier must be declared in the namespace, with a matching type
//!   and a scope covering the element it is attached to;
//! - an inherited qualifier without OVERRIDABLE keeps its value;
//! - inherited qualifiers propagate to subclasses only with TOSUBCLASS and
//!   to instances only with TOINSTANCE.

use crate::error::{CimError, CimResult};
use crate::model::{
    CimClass, CimFlavor, CimInstance, CimName, CimQualifierDecl, CimQualifierList, CimScope,
    NamespaceName,
};
use std::collections::HashMap;
use tracing::debug;

/// Source of declarations consulted during resolution.
pub trait DeclContext {
    fn lookup_qualifier_decl(
        &self,
        namespace: &NamespaceName,
        name: &CimName,
    ) -> CimResult<Option<CimQualifierDecl>>;

    /// Fully resolved class.
    fn lookup_class(&self, namespace: &NamespaceName, name: &CimName)
        -> CimResult<Option<CimClass>>;
}

/// In-memory [`DeclContext`] for tools and tests.
#[derive(Debug, Default, Clone)]
pub struct SimpleDeclContext {
    qualifiers: HashMap<(NamespaceName, CimName), CimQualifierDecl>,
    classes: HashMap<(NamespaceName, CimName), CimClass>,
}

impl SimpleDeclContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_qualifier_decl(&mut self, namespace: &NamespaceName, decl: CimQualifierDecl) {
        self.qualifiers
            .insert((namespace.clone(), decl.name().clone()), decl);
    }

    pub fn add_class(&mut self, namespace: &NamespaceName, class: CimClass) {
        self.classes
            .insert((namespace.clone(), class.name().clone()), class);
    }
}

impl DeclContext for SimpleDeclContext {
    fn lookup_qualifier_decl(
        &self,
        namespace: &NamespaceName,
        name: &CimName,
    ) -> CimResult<Option<CimQualifierDecl>> {
        Ok(self
            .qualifiers
            .get(&(namespace.clone(), name.clone()))
            .cloned())
    }

    fn lookup_class(
        &self,
        namespace: &NamespaceName,
        name: &CimName,
    ) -> CimResult<Option<CimClass>> {
        Ok(self.classes.get(&(namespace.clone(), name.clone())).cloned())
    }
}

// ---------------------------------------------------------------------------
// Qualifiers
// ---------------------------------------------------------------------------

/// Flavor of a local qualifier given the flavor it inherits.
///
/// A DISABLEOVERRIDE base cannot be relaxed. Otherwise explicit local
/// bits win per complementary pair; TOINSTANCE and TRANSLATABLE accumulate.
pub(crate) fn effective_flavor(local: CimFlavor, base: CimFlavor) -> CimFlavor {
    let mut flavor = CimFlavor::NONE;

    if !base.is_overridable() || local.contains(CimFlavor::DISABLEOVERRIDE) {
        flavor |= CimFlavor::DISABLEOVERRIDE;
    } else {
        flavor |= CimFlavor::OVERRIDABLE;
    }

    if local.contains(CimFlavor::RESTRICTED) {
        flavor |= CimFlavor::RESTRICTED;
    } else if local.contains(CimFlavor::TOSUBCLASS) || base.contains(CimFlavor::TOSUBCLASS) {
        flavor |= CimFlavor::TOSUBCLASS;
    } else {
        flavor |= CimFlavor::RESTRICTED;
    }

    flavor | ((local | base) & (CimFlavor::TOINSTANCE | CimFlavor::TRANSLATABLE))
}

/// Validate `qualifiers` and merge in the inherited ones.
///
/// `mask` selects which inherited qualifiers reach this element
/// (TOSUBCLASS for subclasses, TOINSTANCE for instances). Inherited
/// qualifiers missing locally are copied only when `propagate` is set.
pub fn resolve_qualifiers(
    qualifiers: &mut CimQualifierList,
    ctx: &dyn DeclContext,
    namespace: &NamespaceName,
    scope: CimScope,
    inherited: Option<&CimQualifierList>,
    mask: CimFlavor,
    propagate: bool,
) -> CimResult<()> {
    for qualifier in qualifiers.iter_mut() {
        let decl = ctx
            .lookup_qualifier_decl(namespace, qualifier.name())?
            .ok_or_else(|| {
                CimError::invalid_parameter(format!(
                    "qualifier {} is not declared in namespace {}",
                    qualifier.name(),
                    namespace
                ))
            })?;

        if !decl.scope().has_scope(scope) {
            return Err(CimError::invalid_parameter(format!(
                "qualifier {} is not valid in scope {} (declared scope: {})",
                qualifier.name(),
                scope.to_mof(),
                decl.scope().to_mof()
            )));
        }

        if !qualifier.value().type_compatible(decl.value()) {
            return Err(CimError::invalid_parameter(format!(
                "qualifier {} must be of type {}{}",
                qualifier.name(),
                decl.cim_type(),
                if decl.is_array() { "[]" } else { "" }
            )));
        }

        let inherited_qualifier = inherited
            .and_then(|list| list.get(qualifier.name()))
            .filter(|q| q.flavor().has_flavor(mask));

        let base = match inherited_qualifier {
            Some(iq) => {
                if !iq.flavor().is_overridable() && iq.value() != qualifier.value() {
                    return Err(CimError::invalid_parameter(format!(
                        "qualifier {} has flavor DisableOverride and cannot be overridden",
                        qualifier.name()
                    )));
                }
                iq.flavor()
            }
            None => decl.flavor(),
        };

        let flavor = effective_flavor(qualifier.flavor(), base);
        qualifier.set_flavor(flavor);
        qualifier.set_propagated(false);
    }

    if let (Some(inherited), true) = (inherited, propagate) {
        let mut pos = 0;
        for iq in inherited.iter() {
            if !iq.flavor().has_flavor(mask) || qualifiers.contains(iq.name()) {
                continue;
            }
            let mut q = iq.clone();
            q.set_propagated(true);
            qualifiers.insert(pos, q);
            pos += 1;
        }
    }

    Ok(())
}

fn mark_inherited(qualifiers: &mut CimQualifierList, mask: CimFlavor) {
    qualifiers.retain(|q| q.flavor().has_flavor(mask));
    for q in qualifiers.iter_mut() {
        q.set_propagated(true);
    }
}

// ---------------------------------------------------------------------------
// Classes
// ---------------------------------------------------------------------------

/// Resolve `class` in place against its superclass.
pub fn resolve_class(
    class: &mut CimClass,
    ctx: &dyn DeclContext,
    namespace: &NamespaceName,
) -> CimResult<()> {
    let super_class = match class.super_class() {
        Some(name) => Some(ctx.lookup_class(namespace, name)?.ok_or_else(|| {
            CimError::invalid_superclass(format!(
                "superclass {} of {} not found",
                name,
                class.name()
            ))
        })?),
        None => None,
    };
    let class_name = class.name().clone();

    let is_association =
        class.is_association() || super_class.as_ref().map_or(false, |s| s.is_association());
    let class_scope = if is_association {
        CimScope::ASSOCIATION
    } else {
        CimScope::CLASS
    };

    resolve_qualifiers(
        class.qualifiers_mut(),
        ctx,
        namespace,
        class_scope,
        super_class.as_ref().map(|s| s.qualifiers()),
        CimFlavor::TOSUBCLASS,
        true,
    )?;

    for property in class.properties_mut() {
        if property.is_reference() && !is_association {
            return Err(CimError::invalid_parameter(format!(
                "class {} is not an association and cannot have reference property {}",
                class_name,
                property.name()
            )));
        }

        let inherited = super_class.as_ref().and_then(|s| s.property(property.name()));
        match inherited {
            Some(ip) => {
                if !property.value().type_compatible(ip.value()) {
                    return Err(CimError::type_mismatch(format!(
                        "property {}.{} overrides {} with type {}",
                        class_name,
                        property.name(),
                        ip.cim_type(),
                        property.cim_type()
                    )));
                }
                if property.reference_class().is_none() {
                    property.set_reference_class(ip.reference_class().cloned());
                }
                let origin = ip
                    .class_origin()
                    .cloned()
                    .unwrap_or_else(|| class_name.clone());
                property.set_class_origin(Some(origin));
            }
            None => property.set_class_origin(Some(class_name.clone())),
        }

        let scope = if property.is_reference() {
            CimScope::REFERENCE
        } else {
            CimScope::PROPERTY
        };
        resolve_qualifiers(
            property.qualifiers_mut(),
            ctx,
            namespace,
            scope,
            inherited.map(|p| p.qualifiers()),
            CimFlavor::TOSUBCLASS,
            true,
        )?;
        property.set_propagated(false);
    }

    for method in class.methods_mut() {
        let inherited = super_class.as_ref().and_then(|s| s.method(method.name()));
        match inherited {
            Some(im) => {
                if im.return_type() != method.return_type() {
                    return Err(CimError::type_mismatch(format!(
                        "method {}.{} overrides return type {} with {}",
                        class_name,
                        method.name(),
                        im.return_type(),
                        method.return_type()
                    )));
                }
                let origin = im
                    .class_origin()
                    .cloned()
                    .unwrap_or_else(|| class_name.clone());
                method.set_class_origin(Some(origin));
            }
            None => method.set_class_origin(Some(class_name.clone())),
        }

        resolve_qualifiers(
            method.qualifiers_mut(),
            ctx,
            namespace,
            CimScope::METHOD,
            inherited.map(|m| m.qualifiers()),
            CimFlavor::TOSUBCLASS,
            true,
        )?;

        for parameter in method.parameters_mut() {
            let inherited_parameter = inherited.and_then(|m| m.parameter(parameter.name()));
            resolve_qualifiers(
                parameter.qualifiers_mut(),
                ctx,
                namespace,
                CimScope::PARAMETER,
                inherited_parameter.map(|p| p.qualifiers()),
                CimFlavor::TOSUBCLASS,
                true,
            )?;
        }
        method.set_propagated(false);
    }

    if let Some(sc) = &super_class {
        let mut pos = 0;
        for sp in sc.properties() {
            if class.find_property(sp.name()).is_some() {
                continue;
            }
            let mut p = sp.clone();
            p.set_propagated(true);
            if p.class_origin().is_none() {
                p.set_class_origin(Some(sc.name().clone()));
            }
            mark_inherited(p.qualifiers_mut(), CimFlavor::TOSUBCLASS);
            class.insert_property(pos, p);
            pos += 1;
        }

        let mut pos = 0;
        for sm in sc.methods() {
            if class.find_method(sm.name()).is_some() {
                continue;
            }
            let mut m = sm.clone();
            m.set_propagated(true);
            if m.class_origin().is_none() {
                m.set_class_origin(Some(sc.name().clone()));
            }
            mark_inherited(m.qualifiers_mut(), CimFlavor::TOSUBCLASS);
            class.insert_method(pos, m);
            pos += 1;
        }
    }

    debug!(
        "resolved class {} in {} ({} properties, {} methods)",
        class_name,
        namespace,
        class.properties().len(),
        class.methods().len()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Instances
// ---------------------------------------------------------------------------

/// Resolve `instance` against its class and return that class.
///
/// Properties are reordered to the class order; class properties the
/// instance does not supply are added with the class default value and
/// marked propagated. Qualifiers flow from the class only when
/// `propagate_qualifiers` is set.
pub fn resolve_instance(
    instance: &mut CimInstance,
    ctx: &dyn DeclContext,
    namespace: &NamespaceName,
    propagate_qualifiers: bool,
) -> CimResult<CimClass> {
    let class = ctx
        .lookup_class(namespace, instance.class_name())?
        .ok_or_else(|| CimError::invalid_class(instance.class_name()))?;

    if class.is_abstract() {
        return Err(CimError::failed(format!(
            "cannot instantiate abstract class {}",
            class.name()
        )));
    }

    if let Some(extra) = instance
        .properties()
        .iter()
        .find(|p| class.property(p.name()).is_none())
    {
        return Err(CimError::no_such_property(format!(
            "{}.{}",
            class.name(),
            extra.name()
        )));
    }

    let class_scope = if class.is_association() {
        CimScope::ASSOCIATION
    } else {
        CimScope::CLASS
    };
    resolve_qualifiers(
        instance.qualifiers_mut(),
        ctx,
        namespace,
        class_scope,
        Some(class.qualifiers()),
        CimFlavor::TOINSTANCE,
        propagate_qualifiers,
    )?;

    let mut supplied = instance.take_properties();
    let mut resolved = Vec::with_capacity(class.properties().len());

    for cp in class.properties() {
        match supplied.iter().position(|p| p.name() == cp.name()) {
            Some(idx) => {
                let mut p = supplied.swap_remove(idx);
                if !p.value().type_compatible(cp.value()) {
                    return Err(CimError::type_mismatch(format!(
                        "property {}.{} is {}{}, got {}",
                        class.name(),
                        cp.name(),
                        cp.cim_type(),
                        if cp.is_array() { "[]" } else { "" },
                        p.cim_type()
                    )));
                }
                p.set_class_origin(cp.class_origin().cloned());
                if p.reference_class().is_none() {
                    p.set_reference_class(cp.reference_class().cloned());
                }
                p.set_propagated(false);
                let scope = if cp.is_reference() {
                    CimScope::REFERENCE
                } else {
                    CimScope::PROPERTY
                };
                resolve_qualifiers(
                    p.qualifiers_mut(),
                    ctx,
                    namespace,
                    scope,
                    Some(cp.qualifiers()),
                    CimFlavor::TOINSTANCE,
                    propagate_qualifiers,
                )?;
                resolved.push(p);
            }
            None => {
                let mut p = cp.clone();
                p.set_propagated(true);
                if propagate_qualifiers {
                    mark_inherited(p.qualifiers_mut(), CimFlavor::TOINSTANCE);
                } else {
                    p.qualifiers_mut().clear();
                }
                resolved.push(p);
            }
        }
    }

    instance.set_properties(resolved);
    Ok(class)
}
