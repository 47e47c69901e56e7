// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CIM status codes and the repository error type.
//!
//! Every logical failure is a [`CimError::Status`] carrying one of the
//! standard [`CimStatusCode`] values. Persistence faults keep their
//! original error and report [`CimStatusCode::Failed`] through
//! [`CimError::code`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard CIM operation status codes (DSP0200).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum CimStatusCode {
    Failed = 1,
    AccessDenied = 2,
    InvalidNamespace = 3,
    InvalidParameter = 4,
    InvalidClass = 5,
    NotFound = 6,
    NotSupported = 7,
    ClassHasChildren = 8,
    ClassHasInstances = 9,
    InvalidSuperclass = 10,
    AlreadyExists = 11,
    NoSuchProperty = 12,
    TypeMismatch = 13,
    NamespaceNotEmpty = 20,
}

impl CimStatusCode {
    /// Numeric wire value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Symbolic name, e.g. `CIM_ERR_NOT_FOUND`.
    pub fn name(self) -> &'static str {
        match self {
            CimStatusCode::Failed => "CIM_ERR_FAILED",
            CimStatusCode::AccessDenied => "CIM_ERR_ACCESS_DENIED",
            CimStatusCode::InvalidNamespace => "CIM_ERR_INVALID_NAMESPACE",
            CimStatusCode::InvalidParameter => "CIM_ERR_INVALID_PARAMETER",
            CimStatusCode::InvalidClass => "CIM_ERR_INVALID_CLASS",
            CimStatusCode::NotFound => "CIM_ERR_NOT_FOUND",
            CimStatusCode::NotSupported => "CIM_ERR_NOT_SUPPORTED",
            CimStatusCode::ClassHasChildren => "CIM_ERR_CLASS_HAS_CHILDREN",
            CimStatusCode::ClassHasInstances => "CIM_ERR_CLASS_HAS_INSTANCES",
            CimStatusCode::InvalidSuperclass => "CIM_ERR_INVALID_SUPERCLASS",
            CimStatusCode::AlreadyExists => "CIM_ERR_ALREADY_EXISTS",
            CimStatusCode::NoSuchProperty => "CIM_ERR_NO_SUCH_PROPERTY",
            CimStatusCode::TypeMismatch => "CIM_ERR_TYPE_MISMATCH",
            CimStatusCode::NamespaceNotEmpty => "CIM_ERR_NAMESPACE_NOT_EMPTY",
        }
    }
}

impl fmt::Display for CimStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Repository errors.
#[derive(Debug, Error)]
pub enum CimError {
    #[error("{code}: {message}")]
    Status {
        code: CimStatusCode,
        message: String,
    },

    #[error("invalid inheritance tree: {0}")]
    InvalidInheritanceTree(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binary encoding error: {0}")]
    Binary(#[from] bincode::Error),

    #[error("corrupt repository data: {0}")]
    Corrupt(String),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result alias used throughout the crate.
pub type CimResult<T> = Result<T, CimError>;

impl CimError {
    pub fn new(code: CimStatusCode, message: impl Into<String>) -> Self {
        CimError::Status {
            code,
            message: message.into(),
        }
    }

    /// Status code reported to the operation layer.
    pub fn code(&self) -> CimStatusCode {
        match self {
            CimError::Status { code, .. } => *code,
            CimError::Config(_) | CimError::Toml(_) => CimStatusCode::InvalidParameter,
            _ => CimStatusCode::Failed,
        }
    }

    /// True when this error carries the given status code.
    pub fn is(&self, code: CimStatusCode) -> bool {
        self.code() == code
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(CimStatusCode::Failed, message)
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(CimStatusCode::AccessDenied, message)
    }

    pub fn invalid_namespace(namespace: impl fmt::Display) -> Self {
        Self::new(CimStatusCode::InvalidNamespace, namespace.to_string())
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(CimStatusCode::InvalidParameter, message)
    }

    pub fn invalid_class(class_name: impl fmt::Display) -> Self {
        Self::new(CimStatusCode::InvalidClass, class_name.to_string())
    }

    pub fn not_found(what: impl fmt::Display) -> Self {
        Self::new(CimStatusCode::NotFound, what.to_string())
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new(CimStatusCode::NotSupported, message)
    }

    pub fn class_has_children(class_name: impl fmt::Display) -> Self {
        Self::new(CimStatusCode::ClassHasChildren, class_name.to_string())
    }

    pub fn class_has_instances(class_name: impl fmt::Display) -> Self {
        Self::new(CimStatusCode::ClassHasInstances, class_name.to_string())
    }

    pub fn invalid_superclass(class_name: impl fmt::Display) -> Self {
        Self::new(CimStatusCode::InvalidSuperclass, class_name.to_string())
    }

    pub fn already_exists(what: impl fmt::Display) -> Self {
        Self::new(CimStatusCode::AlreadyExists, what.to_string())
    }

    pub fn no_such_property(property_name: impl fmt::Display) -> Self {
        Self::new(CimStatusCode::NoSuchProperty, property_name.to_string())
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(CimStatusCode::TypeMismatch, message)
    }

    pub fn namespace_not_empty(namespace: impl fmt::Display) -> Self {
        Self::new(CimStatusCode::NamespaceNotEmpty, namespace.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_values() {
        assert_eq!(CimStatusCode::Failed.as_u32(), 1);
        assert_eq!(CimStatusCode::NotFound.as_u32(), 6);
        assert_eq!(CimStatusCode::ClassHasChildren.as_u32(), 8);
        assert_eq!(CimStatusCode::AlreadyExists.as_u32(), 11);
        assert_eq!(CimStatusCode::NamespaceNotEmpty.as_u32(), 20);
    }

    #[test]
    fn test_error_display_carries_code() {
        let err = CimError::class_has_children("CIM_ManagedElement");
        assert_eq!(err.code(), CimStatusCode::ClassHasChildren);
        assert_eq!(
            err.to_string(),
            "CIM_ERR_CLASS_HAS_CHILDREN: CIM_ManagedElement"
        );
    }

    #[test]
    fn test_io_errors_report_failed() {
        let err: CimError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert!(err.is(CimStatusCode::Failed));
        assert!(matches!(err, CimError::Io(_)));
    }

    #[test]
    fn test_inheritance_tree_error_is_failed() {
        let err = CimError::InvalidInheritanceTree("cycle at A".into());
        assert_eq!(err.code(), CimStatusCode::Failed);
        assert!(err.to_string().contains("cycle at A"));
    }
}
