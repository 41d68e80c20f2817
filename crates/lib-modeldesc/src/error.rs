//! Error types for building the model data model.

use crate::dependencies::DependencyError;
use lib_types::{BaseType, ValueReference};
use thiserror::Error;

/// Errors raised while reading a description or building the model from it.
///
/// All of these surface at construction time; none of them can occur once
/// a [`ModelDescription`](crate::ModelDescription) exists.
#[derive(Debug, Error)]
pub enum DescriptionError {
    /// I/O error reading the file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed document.
    #[error("Syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// Missing required element or attribute.
    #[error("Missing required {kind} '{name}' (line {line})")]
    Missing {
        kind: &'static str,
        name: String,
        line: usize,
    },

    /// Attribute present but its value is not acceptable.
    #[error("Invalid value for {field} at line {line}: {message}")]
    InvalidValue {
        field: String,
        line: usize,
        message: String,
    },

    /// The document targets a standard version this kernel cannot model.
    #[error("Unsupported FMI version: {version}")]
    UnsupportedVersion { version: String },

    /// Two variables share a name.
    #[error("Duplicate variable name '{name}'")]
    DuplicateName { name: String },

    /// A 1-based index pointing outside the variable table.
    #[error("{context} refers to variable index {index}, but the model has {count} variables")]
    InvalidIndex {
        context: String,
        index: usize,
        count: usize,
    },

    /// An alias group that has no usable base or more than one.
    #[error("Alias group {base_type:?} #{value_reference}: {message}")]
    AliasConflict {
        base_type: BaseType,
        value_reference: ValueReference,
        message: String,
    },

    /// Row-compressed dependency arrays are inconsistent.
    #[error("Dependency structure: {0}")]
    Dependency(#[from] DependencyError),
}

impl DescriptionError {
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }

    pub fn missing_element(name: impl Into<String>, line: usize) -> Self {
        Self::Missing {
            kind: "element",
            name: name.into(),
            line,
        }
    }

    pub fn missing_attribute(name: impl Into<String>, line: usize) -> Self {
        Self::Missing {
            kind: "attribute",
            name: name.into(),
            line,
        }
    }

    pub fn invalid_value(field: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            line,
            message: message.into(),
        }
    }

    pub fn alias_conflict(
        base_type: BaseType,
        value_reference: ValueReference,
        message: impl Into<String>,
    ) -> Self {
        Self::AliasConflict {
            base_type,
            value_reference,
            message: message.into(),
        }
    }
}

/// Result type for description operations.
pub type DescResult<T> = Result<T, DescriptionError>;
