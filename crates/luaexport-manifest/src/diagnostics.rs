//! Non-fatal analysis diagnostics
//!
//! Every recoverable problem met while walking a unit becomes one
//! `Diagnostic`. The analysis core only classifies and records them; the host
//! decides whether any of them should fail the run.

use crate::types::SourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a recorded analysis problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Export annotation with a kind outside the vocabulary
    UnknownAnnotation,
    /// Attribute payload that could not be fully parsed, or a kind applied to
    /// a declaration it cannot describe
    MalformedAttribute,
    /// Type that could only be rendered as a sanitized best-effort string
    UnresolvedType,
    /// Second declaration of an already exported container instantiation
    DuplicateContainer,
    /// Inherited member reached through more than one unannotated base
    DuplicateMember,
    /// Two different containers generating the same script name
    NameCollision,
    /// Record dropped because its identity could not be resolved
    InvalidRecord,
    /// Getter/setter pair disagreeing on the property value type
    PropertyMismatch,
    /// Enumerator or constant initializer that could not be evaluated
    EnumEvaluation,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::UnknownAnnotation => "unknown-annotation",
            DiagnosticKind::MalformedAttribute => "malformed-attribute",
            DiagnosticKind::UnresolvedType => "unresolved-type",
            DiagnosticKind::DuplicateContainer => "duplicate-container",
            DiagnosticKind::DuplicateMember => "duplicate-member",
            DiagnosticKind::NameCollision => "name-collision",
            DiagnosticKind::InvalidRecord => "invalid-record",
            DiagnosticKind::PropertyMismatch => "property-mismatch",
            DiagnosticKind::EnumEvaluation => "enum-evaluation",
        }
    }
}

/// A recorded, recovered analysis problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        message: impl Into<String>,
        location: Option<SourceLocation>,
    ) -> Self {
        Diagnostic {
            kind,
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: [{}] {}", location, self.kind.as_str(), self.message),
            None => write!(f, "[{}] {}", self.kind.as_str(), self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_location() {
        let diagnostic = Diagnostic::new(
            DiagnosticKind::UnknownAnnotation,
            "unknown export kind 'widget'",
            Some(SourceLocation::new("demo.h", 12, 5)),
        );
        assert_eq!(
            diagnostic.to_string(),
            "demo.h:12:5: [unknown-annotation] unknown export kind 'widget'"
        );
    }

    #[test]
    fn test_display_without_location() {
        let diagnostic = Diagnostic::new(DiagnosticKind::InvalidRecord, "empty name", None);
        assert_eq!(diagnostic.to_string(), "[invalid-record] empty name");
    }
}
