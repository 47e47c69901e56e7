// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Case-insensitive CIM identifiers and namespace names.

use crate::error::{CimError, CimResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

fn hash_ignore_ascii_case<H: Hasher>(s: &str, state: &mut H) {
    for b in s.bytes() {
        state.write_u8(b.to_ascii_lowercase());
    }
    state.write_u8(0xff);
}

fn cmp_ignore_ascii_case(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|b| b.to_ascii_lowercase())
        .cmp(b.bytes().map(|b| b.to_ascii_lowercase()))
}

/// Legal CIM identifier: `[A-Za-z_][A-Za-z0-9_]*`, non-ASCII letters allowed.
fn is_legal_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

// ---------------------------------------------------------------------------
// CimName
// ---------------------------------------------------------------------------

/// Class, property, qualifier or method name.
///
/// Comparison and hashing ignore ASCII case; the original spelling is kept
/// for display.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CimName(String);

impl CimName {
    /// Wrap a name without syntax validation.
    pub fn new(name: impl Into<String>) -> Self {
        CimName(name.into())
    }

    /// Validate and wrap a name.
    pub fn parse(name: &str) -> CimResult<Self> {
        if !is_legal_identifier(name) {
            return Err(CimError::invalid_parameter(format!(
                "illegal CIM name '{}'",
                name
            )));
        }
        Ok(CimName(name.to_string()))
    }

    pub fn is_legal(&self) -> bool {
        is_legal_identifier(&self.0)
    }

    /// INVALID_PARAMETER naming `kind` unless the name is legal.
    pub fn check_legal(&self, kind: &str) -> CimResult<()> {
        if self.is_legal() {
            Ok(())
        } else {
            Err(CimError::invalid_parameter(format!(
                "illegal {} name '{}'",
                kind, self.0
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn eq_str(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }

    /// Lower-cased form used as a storage key.
    pub fn to_key(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl PartialEq for CimName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for CimName {}

impl PartialEq<str> for CimName {
    fn eq(&self, other: &str) -> bool {
        self.eq_str(other)
    }
}

impl PartialEq<&str> for CimName {
    fn eq(&self, other: &&str) -> bool {
        self.eq_str(other)
    }
}

impl Hash for CimName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_ignore_ascii_case(&self.0, state);
    }
}

impl PartialOrd for CimName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CimName {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_ignore_ascii_case(&self.0, &other.0)
    }
}

impl fmt::Display for CimName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for CimName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<&str> for CimName {
    fn from(s: &str) -> Self {
        CimName::new(s)
    }
}

impl From<String> for CimName {
    fn from(s: String) -> Self {
        CimName(s)
    }
}

impl From<&CimName> for CimName {
    fn from(n: &CimName) -> Self {
        n.clone()
    }
}

// ---------------------------------------------------------------------------
// NamespaceName
// ---------------------------------------------------------------------------

/// Hierarchical namespace name such as `root/cimv2`.
///
/// Leading and trailing `/` are stripped; every segment must be a legal
/// identifier. Hierarchy in the name is purely lexical: parent linkage
/// between namespaces is an explicit attribute.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NamespaceName(String);

impl NamespaceName {
    pub fn new(name: &str) -> CimResult<Self> {
        let trimmed = name.trim_matches('/');
        if trimmed.is_empty() {
            return Err(CimError::invalid_parameter("empty namespace name"));
        }
        if !trimmed.split('/').all(is_legal_identifier) {
            return Err(CimError::invalid_parameter(format!(
                "illegal namespace name '{}'",
                name
            )));
        }
        Ok(NamespaceName(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Directory-safe form: lower case, `/` replaced by `#`.
    pub fn to_file_name(&self) -> String {
        self.0.to_ascii_lowercase().replace('/', "#")
    }

    pub fn to_key(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl PartialEq for NamespaceName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for NamespaceName {}

impl Hash for NamespaceName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_ignore_ascii_case(&self.0, state);
    }
}

impl PartialOrd for NamespaceName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NamespaceName {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_ignore_ascii_case(&self.0, &other.0)
    }
}

impl fmt::Display for NamespaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for NamespaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl FromStr for NamespaceName {
    type Err = CimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NamespaceName::new(s)
    }
}

impl TryFrom<String> for NamespaceName {
    type Error = CimError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        NamespaceName::new(&s)
    }
}

impl TryFrom<&str> for NamespaceName {
    type Error = CimError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        NamespaceName::new(s)
    }
}

impl From<NamespaceName> for String {
    fn from(n: NamespaceName) -> Self {
        n.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_name_case_insensitive() {
        let a = CimName::new("CIM_ManagedElement");
        let b = CimName::new("cim_managedelement");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "CIM_ManagedElement");

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_name_parse_rejects_illegal() {
        assert!(CimName::parse("Good_Name1").is_ok());
        assert!(CimName::parse("_leading").is_ok());
        assert!(CimName::parse("1bad").is_err());
        assert!(CimName::parse("has space").is_err());
        assert!(CimName::parse("").is_err());
    }

    #[test]
    fn test_check_legal_names_kind() {
        assert!(CimName::new("TST_Disk").check_legal("class").is_ok());
        let err = CimName::new("../disk").check_legal("class").unwrap_err();
        assert!(err.is(crate::error::CimStatusCode::InvalidParameter));
        assert!(err.to_string().contains("illegal class name"));
    }

    #[test]
    fn test_name_ordering_ignores_case() {
        let mut names = vec![CimName::new("b"), CimName::new("A"), CimName::new("C")];
        names.sort();
        let sorted: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
        assert_eq!(sorted, vec!["A", "b", "C"]);
    }

    #[test]
    fn test_namespace_normalization() {
        let ns = NamespaceName::new("/root/cimv2/").unwrap();
        assert_eq!(ns.as_str(), "root/cimv2");
        assert_eq!(ns, NamespaceName::new("ROOT/CIMV2").unwrap());
        assert_eq!(ns.to_file_name(), "root#cimv2");
        assert_eq!(ns.segments().count(), 2);
    }

    #[test]
    fn test_namespace_rejects_empty_segments() {
        assert!(NamespaceName::new("").is_err());
        assert!(NamespaceName::new("/").is_err());
        assert!(NamespaceName::new("root//cimv2").is_err());
        assert!(NamespaceName::new("root/9lives").is_err());
    }
}
