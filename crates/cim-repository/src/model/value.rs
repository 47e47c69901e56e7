// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CIM data types and typed values.

use crate::error::{CimError, CimResult};
use crate::model::path::{CimObjectPath, KeyKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Intrinsic CIM data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CimType {
    Boolean,
    Uint8,
    Sint8,
    Uint16,
    Sint16,
    Uint32,
    Sint32,
    Uint64,
    Sint64,
    Real32,
    Real64,
    Char16,
    String,
    Datetime,
    Reference,
}

impl CimType {
    pub fn name(self) -> &'static str {
        match self {
            CimType::Boolean => "boolean",
            CimType::Uint8 => "uint8",
            CimType::Sint8 => "sint8",
            CimType::Uint16 => "uint16",
            CimType::Sint16 => "sint16",
            CimType::Uint32 => "uint32",
            CimType::Sint32 => "sint32",
            CimType::Uint64 => "uint64",
            CimType::Sint64 => "sint64",
            CimType::Real32 => "real32",
            CimType::Real64 => "real64",
            CimType::Char16 => "char16",
            CimType::String => "string",
            CimType::Datetime => "datetime",
            CimType::Reference => "reference",
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(
            self,
            CimType::Boolean
                | CimType::Char16
                | CimType::String
                | CimType::Datetime
                | CimType::Reference
        )
    }
}

impl fmt::Display for CimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed value, possibly null, possibly an array.
///
/// Arrays hold non-null scalars of a single type; use [`CimValue::array`]
/// to build one with that check applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CimValue {
    Null { ty: CimType, is_array: bool },
    Boolean(bool),
    Uint8(u8),
    Sint8(i8),
    Uint16(u16),
    Sint16(i16),
    Uint32(u32),
    Sint32(i32),
    Uint64(u64),
    Sint64(i64),
    Real32(f32),
    Real64(f64),
    Char16(char),
    String(String),
    Datetime(String),
    Reference(CimObjectPath),
    Array { ty: CimType, items: Vec<CimValue> },
}

impl CimValue {
    pub fn null(ty: CimType) -> Self {
        CimValue::Null {
            ty,
            is_array: false,
        }
    }

    pub fn null_array(ty: CimType) -> Self {
        CimValue::Null { ty, is_array: true }
    }

    /// Build an array value; every item must be a non-null scalar of `ty`.
    pub fn array(ty: CimType, items: Vec<CimValue>) -> CimResult<Self> {
        for item in &items {
            if item.is_null() || item.is_array() || item.cim_type() != ty {
                return Err(CimError::type_mismatch(format!(
                    "array of {} cannot hold {:?}",
                    ty, item
                )));
            }
        }
        Ok(CimValue::Array { ty, items })
    }

    pub fn cim_type(&self) -> CimType {
        match self {
            CimValue::Null { ty, .. } | CimValue::Array { ty, .. } => *ty,
            CimValue::Boolean(_) => CimType::Boolean,
            CimValue::Uint8(_) => CimType::Uint8,
            CimValue::Sint8(_) => CimType::Sint8,
            CimValue::Uint16(_) => CimType::Uint16,
            CimValue::Sint16(_) => CimType::Sint16,
            CimValue::Uint32(_) => CimType::Uint32,
            CimValue::Sint32(_) => CimType::Sint32,
            CimValue::Uint64(_) => CimType::Uint64,
            CimValue::Sint64(_) => CimType::Sint64,
            CimValue::Real32(_) => CimType::Real32,
            CimValue::Real64(_) => CimType::Real64,
            CimValue::Char16(_) => CimType::Char16,
            CimValue::String(_) => CimType::String,
            CimValue::Datetime(_) => CimType::Datetime,
            CimValue::Reference(_) => CimType::Reference,
        }
    }

    pub fn is_array(&self) -> bool {
        match self {
            CimValue::Null { is_array, .. } => *is_array,
            CimValue::Array { .. } => true,
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CimValue::Null { .. })
    }

    /// Same type and same arrayness; nullness is ignored.
    pub fn type_compatible(&self, other: &CimValue) -> bool {
        self.cim_type() == other.cim_type() && self.is_array() == other.is_array()
    }

    /// Typed null of the same shape.
    pub fn to_null(&self) -> CimValue {
        CimValue::Null {
            ty: self.cim_type(),
            is_array: self.is_array(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CimValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CimValue::String(s) | CimValue::Datetime(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&CimObjectPath> {
        match self {
            CimValue::Reference(p) => Some(p),
            _ => None,
        }
    }

    /// Key binding form of a scalar key value.
    pub(crate) fn to_key_binding(&self) -> Option<(KeyKind, String)> {
        let binding = match self {
            CimValue::Boolean(b) => (KeyKind::Boolean, b.to_string()),
            CimValue::Uint8(v) => (KeyKind::Numeric, v.to_string()),
            CimValue::Sint8(v) => (KeyKind::Numeric, v.to_string()),
            CimValue::Uint16(v) => (KeyKind::Numeric, v.to_string()),
            CimValue::Sint16(v) => (KeyKind::Numeric, v.to_string()),
            CimValue::Uint32(v) => (KeyKind::Numeric, v.to_string()),
            CimValue::Sint32(v) => (KeyKind::Numeric, v.to_string()),
            CimValue::Uint64(v) => (KeyKind::Numeric, v.to_string()),
            CimValue::Sint64(v) => (KeyKind::Numeric, v.to_string()),
            CimValue::Real32(v) => (KeyKind::Numeric, v.to_string()),
            CimValue::Real64(v) => (KeyKind::Numeric, v.to_string()),
            CimValue::Char16(c) => (KeyKind::String, c.to_string()),
            CimValue::String(s) | CimValue::Datetime(s) => (KeyKind::String, s.clone()),
            CimValue::Reference(p) => (KeyKind::Reference, p.to_string()),
            CimValue::Null { .. } | CimValue::Array { .. } => return None,
        };
        Some(binding)
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            _ => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for CimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CimValue::Null { .. } => f.write_str("NULL"),
            CimValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CimValue::Uint8(v) => write!(f, "{}", v),
            CimValue::Sint8(v) => write!(f, "{}", v),
            CimValue::Uint16(v) => write!(f, "{}", v),
            CimValue::Sint16(v) => write!(f, "{}", v),
            CimValue::Uint32(v) => write!(f, "{}", v),
            CimValue::Sint32(v) => write!(f, "{}", v),
            CimValue::Uint64(v) => write!(f, "{}", v),
            CimValue::Sint64(v) => write!(f, "{}", v),
            CimValue::Real32(v) => write!(f, "{}", v),
            CimValue::Real64(v) => write!(f, "{}", v),
            CimValue::Char16(c) => write!(f, "'{}'", c),
            CimValue::String(s) | CimValue::Datetime(s) => write_quoted(f, s),
            CimValue::Reference(p) => write_quoted(f, &p.to_string()),
            CimValue::Array { items, .. } => {
                f.write_str("{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("}")
            }
        }
    }
}

macro_rules! impl_from_scalar {
    ($($rust:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$rust> for CimValue {
                fn from(v: $rust) -> Self {
                    CimValue::$variant(v)
                }
            }
        )*
    };
}

impl_from_scalar! {
    bool => Boolean,
    u8 => Uint8,
    i8 => Sint8,
    u16 => Uint16,
    i16 => Sint16,
    u32 => Uint32,
    i32 => Sint32,
    u64 => Uint64,
    i64 => Sint64,
    f32 => Real32,
    f64 => Real64,
    char => Char16,
    String => String,
    CimObjectPath => Reference,
}

impl From<&str> for CimValue {
    fn from(s: &str) -> Self {
        CimValue::String(s.to_string())
    }
}
