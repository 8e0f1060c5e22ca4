//! Error taxonomy for schema generation.
//!
//! Every failure aborts the whole build; a failed generation never yields a
//! partial document.
use std::fmt;

use crate::descriptor::TypeKey;

/// One rule broken by an assembled document, located by JSON pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { path: path.into(), message: message.into() }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "#" } else { self.path.as_str() };
        write!(f, "{path}: {}", self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Scalar with no schema mapping and no string fallback.
    #[error("no schema mapping for type `{type_name}`")]
    Mapping { type_name: String },

    /// A named type reference that no provider could describe.
    #[error("unknown type `{0}`")]
    UnknownType(TypeKey),

    /// A `Ref` that points at no registered definition. Builder defect.
    #[error("reference to unregistered definition #{index}")]
    Structural { index: usize },

    /// A second definition registered for the same type identity.
    #[error("definition for `{0}` already registered")]
    DuplicateDefinition(TypeKey),

    /// The injected validator rejected the document.
    #[error("schema validation failed:\n{}", render_violations(.0))]
    Validation(Vec<Violation>),

    /// The injected transformer produced something that is not a root schema.
    #[error("schema transformer must return a root schema document: {0}")]
    Configuration(String),
}

pub type Result<T, E = SchemaError> = std::result::Result<T, E>;

fn render_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("  - {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_every_violation() {
        let err = SchemaError::Validation(vec![
            Violation::new("", "root must not be a $ref"),
            Violation::new("/properties/age", "`nullable` keyword is not allowed"),
        ]);
        let text = err.to_string();
        assert!(text.contains("#: root must not be a $ref"));
        assert!(text.contains("/properties/age: `nullable` keyword is not allowed"));
    }

    #[test]
    fn mapping_error_names_the_type() {
        let err = SchemaError::Mapping { type_name: "my::Opaque".into() };
        assert_eq!(err.to_string(), "no schema mapping for type `my::Opaque`");
    }
}
