// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object paths: `//host/namespace:Class.key1=value1,key2="value2"`.

use crate::error::{CimError, CimResult};
use crate::model::name::{CimName, NamespaceName};
use crate::model::value::CimValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a key binding value is spelled in a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyKind {
    Boolean,
    Numeric,
    String,
    Reference,
}

/// One `name=value` pair of an instance path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CimKeyBinding {
    name: CimName,
    value: String,
    kind: KeyKind,
}

impl CimKeyBinding {
    pub fn new(name: impl Into<CimName>, value: impl Into<String>, kind: KeyKind) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind,
        }
    }

    /// Binding for a key property value. Null and array values cannot be keys.
    pub fn from_value(name: impl Into<CimName>, value: &CimValue) -> CimResult<Self> {
        let name = name.into();
        let (kind, value) = value.to_key_binding().ok_or_else(|| {
            CimError::invalid_parameter(format!("key property {} has no scalar value", name))
        })?;
        Ok(Self { name, value, kind })
    }

    pub fn name(&self) -> &CimName {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    fn canonical_value(&self) -> String {
        match self.kind {
            KeyKind::Boolean => self.value.to_ascii_lowercase(),
            KeyKind::Numeric => {
                let raw = self.value.trim();
                if let Ok(v) = raw.parse::<i128>() {
                    v.to_string()
                } else if let Ok(v) = raw.parse::<f64>() {
                    v.to_string()
                } else {
                    raw.to_string()
                }
            }
            KeyKind::String => self.value.clone(),
            KeyKind::Reference => self
                .value
                .parse::<CimObjectPath>()
                .map(|p| p.key())
                .unwrap_or_else(|_| self.value.clone()),
        }
    }
}

impl PartialEq for CimKeyBinding {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && self.canonical_value() == other.canonical_value()
    }
}

fn push_quoted(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
}

// ---------------------------------------------------------------------------
// CimObjectPath
// ---------------------------------------------------------------------------

/// Location of a class (no key bindings) or an instance.
///
/// Key bindings are kept sorted by name so equal paths print identically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CimObjectPath {
    host: Option<String>,
    namespace: Option<NamespaceName>,
    class_name: CimName,
    key_bindings: Vec<CimKeyBinding>,
}

impl CimObjectPath {
    pub fn new(class_name: impl Into<CimName>) -> Self {
        Self {
            host: None,
            namespace: None,
            class_name: class_name.into(),
            key_bindings: Vec::new(),
        }
    }

    pub fn with_namespace(mut self, namespace: NamespaceName) -> Self {
        self.namespace = Some(namespace);
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_key(mut self, binding: CimKeyBinding) -> Self {
        self.add_key_binding(binding);
        self
    }

    /// Insert a binding, replacing any binding with the same name.
    pub fn add_key_binding(&mut self, binding: CimKeyBinding) {
        self.key_bindings.retain(|kb| kb.name != binding.name);
        let pos = self
            .key_bindings
            .binary_search_by(|kb| kb.name.cmp(&binding.name))
            .unwrap_or_else(|p| p);
        self.key_bindings.insert(pos, binding);
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn set_host(&mut self, host: Option<String>) {
        self.host = host;
    }

    pub fn namespace(&self) -> Option<&NamespaceName> {
        self.namespace.as_ref()
    }

    pub fn set_namespace(&mut self, namespace: Option<NamespaceName>) {
        self.namespace = namespace;
    }

    pub fn class_name(&self) -> &CimName {
        &self.class_name
    }

    pub fn set_class_name(&mut self, class_name: CimName) {
        self.class_name = class_name;
    }

    pub fn key_bindings(&self) -> &[CimKeyBinding] {
        &self.key_bindings
    }

    pub fn key_binding(&self, name: &CimName) -> Option<&CimKeyBinding> {
        self.key_bindings.iter().find(|kb| &kb.name == name)
    }

    /// A path without key bindings names a class.
    pub fn is_class_path(&self) -> bool {
        self.key_bindings.is_empty()
    }

    /// Copy without host and namespace.
    pub fn to_local(&self) -> CimObjectPath {
        CimObjectPath {
            host: None,
            namespace: None,
            class_name: self.class_name.clone(),
            key_bindings: self.key_bindings.clone(),
        }
    }

    /// Canonical identity string ignoring host, namespace and name case.
    pub fn key(&self) -> String {
        let mut out = self.class_name.to_key();
        for (i, kb) in self.key_bindings.iter().enumerate() {
            out.push(if i == 0 { '.' } else { ',' });
            out.push_str(&kb.name.to_key());
            out.push('=');
            push_quoted(&mut out, &kb.canonical_value());
        }
        out
    }
}

impl PartialEq for CimObjectPath {
    fn eq(&self, other: &Self) -> bool {
        let hosts_match = match (&self.host, &other.host) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            (None, None) => true,
            _ => false,
        };
        hosts_match
            && self.namespace == other.namespace
            && self.class_name == other.class_name
            && self.key_bindings == other.key_bindings
    }
}

impl fmt::Display for CimObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(host) = &self.host {
            write!(f, "//{}/", host)?;
        }
        if let Some(ns) = &self.namespace {
            write!(f, "{}:", ns)?;
        }
        write!(f, "{}", self.class_name)?;
        for (i, kb) in self.key_bindings.iter().enumerate() {
            f.write_str(if i == 0 { "." } else { "," })?;
            write!(f, "{}=", kb.name)?;
            match kb.kind {
                KeyKind::Boolean | KeyKind::Numeric => f.write_str(&kb.value)?,
                KeyKind::String | KeyKind::Reference => {
                    let mut quoted = String::new();
                    push_quoted(&mut quoted, &kb.value);
                    f.write_str(&quoted)?;
                }
            }
        }
        Ok(())
    }
}

fn malformed(path: &str) -> CimError {
    CimError::invalid_parameter(format!("malformed object path '{}'", path))
}

fn looks_like_reference(value: &str) -> bool {
    value.contains('=')
        && value
            .parse::<CimObjectPath>()
            .map(|p| !p.is_class_path())
            .unwrap_or(false)
}

fn parse_key_bindings(input: &str, whole: &str) -> CimResult<Vec<CimKeyBinding>> {
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut bindings = Vec::new();
    let mut i = 0;

    loop {
        let start = i;
        while i < len && chars[i] != '=' {
            i += 1;
        }
        if i == len {
            return Err(malformed(whole));
        }
        let name: String = chars[start..i].iter().collect();
        let name = CimName::parse(name.trim())?;
        i += 1;

        let binding = if i < len && chars[i] == '"' {
            i += 1;
            let mut value = String::new();
            let mut closed = false;
            while i < len {
                let c = chars[i];
                i += 1;
                match c {
                    '\\' => {
                        let escaped = *chars.get(i).ok_or_else(|| malformed(whole))?;
                        i += 1;
                        value.push(if escaped == 'n' { '\n' } else { escaped });
                    }
                    '"' => {
                        closed = true;
                        break;
                    }
                    _ => value.push(c),
                }
            }
            if !closed {
                return Err(malformed(whole));
            }
            let kind = if looks_like_reference(&value) {
                KeyKind::Reference
            } else {
                KeyKind::String
            };
            CimKeyBinding::new(name, value, kind)
        } else {
            let start = i;
            while i < len && chars[i] != ',' {
                i += 1;
            }
            let raw: String = chars[start..i].iter().collect();
            let raw = raw.trim();
            let kind = if raw.eq_ignore_ascii_case("true") || raw.eq_ignore_ascii_case("false") {
                KeyKind::Boolean
            } else if !raw.is_empty() && raw.parse::<f64>().is_ok() {
                KeyKind::Numeric
            } else {
                return Err(malformed(whole));
            };
            CimKeyBinding::new(name, raw, kind)
        };
        bindings.push(binding);

        if i >= len {
            break;
        }
        if chars[i] != ',' {
            return Err(malformed(whole));
        }
        i += 1;
    }

    Ok(bindings)
}

impl FromStr for CimObjectPath {
    type Err = CimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rest = s.trim();
        let mut host = None;

        if let Some(after) = rest.strip_prefix("//") {
            let slash = after.find('/').ok_or_else(|| malformed(s))?;
            host = Some(after[..slash].to_string());
            rest = &after[slash + 1..];
        }

        let mut namespace = None;
        if let Some(colon) = rest.find(':') {
            if rest.find('.').map_or(true, |dot| colon < dot) {
                namespace = Some(NamespaceName::new(&rest[..colon])?);
                rest = &rest[colon + 1..];
            }
        }

        let (class_part, keys_part) = match rest.find('.') {
            Some(dot) => (&rest[..dot], Some(&rest[dot + 1..])),
            None => (rest, None),
        };

        let mut path = CimObjectPath::new(CimName::parse(class_part)?);
        path.host = host;
        path.namespace = namespace;
        if let Some(keys) = keys_part {
            for binding in parse_key_bindings(keys, s)? {
                path.add_key_binding(binding);
            }
        }
        Ok(path)
    }
}
