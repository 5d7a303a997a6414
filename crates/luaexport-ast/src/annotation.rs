//! Annotation parsing
//!
//! A declaration carries zero or more opaque annotation strings. Those that
//! start with the configured prefix belong to us and look like
//! `lua_export_class,alias=Hero,namespace=game`: an export kind followed by
//! comma-separated `key=value` attributes. They are parsed once here into a
//! typed `Annotation`; nothing downstream looks at the raw text again.

use crate::tree::DeclKind;
use luaexport_manifest::{AccessType, Attributes, DiagnosticKind};
use std::fmt;
use std::str::FromStr;

/// Marker kind excluding a member from auto-export and flattening
const IGNORE_KIND: &str = "ignore";

/// The fixed export vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    Class,
    Function,
    Enum,
    Constant,
    Variable,
    Namespace,
    Module,
    StaticClass,
    Singleton,
    AbstractClass,
    Operator,
    Callback,
    Property,
    Vector,
    Map,
}

impl AnnotationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::Class => "class",
            AnnotationKind::Function => "function",
            AnnotationKind::Enum => "enum",
            AnnotationKind::Constant => "constant",
            AnnotationKind::Variable => "variable",
            AnnotationKind::Namespace => "namespace",
            AnnotationKind::Module => "module",
            AnnotationKind::StaticClass => "static_class",
            AnnotationKind::Singleton => "singleton",
            AnnotationKind::AbstractClass => "abstract_class",
            AnnotationKind::Operator => "operator",
            AnnotationKind::Callback => "callback",
            AnnotationKind::Property => "property",
            AnnotationKind::Vector => "vector",
            AnnotationKind::Map => "map",
        }
    }

    /// Kinds describing an aggregate type
    pub fn is_class(&self) -> bool {
        matches!(
            self,
            AnnotationKind::Class
                | AnnotationKind::StaticClass
                | AnnotationKind::Singleton
                | AnnotationKind::AbstractClass
        )
    }

    /// Whether this kind can describe the given declaration
    pub fn applies_to(&self, decl: &DeclKind, name: &str) -> bool {
        let is_operator = name.starts_with("operator");
        match self {
            kind if kind.is_class() => matches!(decl, DeclKind::Record { .. }),
            AnnotationKind::Function => {
                matches!(decl, DeclKind::Function(_) | DeclKind::Method(_) | DeclKind::Constructor(_))
            }
            AnnotationKind::Operator => {
                is_operator && matches!(decl, DeclKind::Function(_) | DeclKind::Method(_))
            }
            AnnotationKind::Enum => matches!(decl, DeclKind::Enum { .. }),
            AnnotationKind::Constant => match decl {
                DeclKind::Variable { .. } => true,
                DeclKind::Field {
                    is_static, is_const, ..
                } => *is_static && *is_const,
                _ => false,
            },
            AnnotationKind::Variable => {
                matches!(decl, DeclKind::Variable { .. } | DeclKind::Field { .. })
            }
            AnnotationKind::Property => {
                matches!(decl, DeclKind::Method(_) | DeclKind::Field { .. })
            }
            AnnotationKind::Namespace | AnnotationKind::Module => {
                matches!(decl, DeclKind::Namespace { .. })
            }
            AnnotationKind::Callback | AnnotationKind::Vector | AnnotationKind::Map => {
                matches!(decl, DeclKind::TypeAlias { .. })
            }
            _ => false,
        }
    }
}

impl FromStr for AnnotationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "class" => Ok(AnnotationKind::Class),
            "function" => Ok(AnnotationKind::Function),
            "enum" => Ok(AnnotationKind::Enum),
            "constant" => Ok(AnnotationKind::Constant),
            "variable" => Ok(AnnotationKind::Variable),
            "namespace" => Ok(AnnotationKind::Namespace),
            "module" => Ok(AnnotationKind::Module),
            "static_class" => Ok(AnnotationKind::StaticClass),
            "singleton" => Ok(AnnotationKind::Singleton),
            "abstract_class" => Ok(AnnotationKind::AbstractClass),
            "operator" => Ok(AnnotationKind::Operator),
            "callback" => Ok(AnnotationKind::Callback),
            "property" => Ok(AnnotationKind::Property),
            "vector" => Ok(AnnotationKind::Vector),
            "map" => Ok(AnnotationKind::Map),
            other => Err(format!("unknown export kind '{}'", other)),
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed export annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub attributes: Attributes,
}

impl Annotation {
    pub fn new(kind: AnnotationKind) -> Self {
        Annotation {
            kind,
            attributes: Attributes::new(),
        }
    }

    pub fn alias(&self) -> Option<&str> {
        self.attribute("alias")
    }

    pub fn namespace(&self) -> Option<&str> {
        self.attribute("namespace")
    }

    /// Explicit property access; invalid values were already dropped while parsing
    pub fn access(&self) -> Option<AccessType> {
        self.attribute("access").and_then(AccessType::from_attribute)
    }

    fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// A recoverable problem found while parsing annotations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationIssue {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl AnnotationIssue {
    fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        AnnotationIssue {
            kind,
            message: message.into(),
        }
    }
}

/// Everything the annotations of a single declaration say
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedAnnotations {
    /// First valid export annotation
    pub annotation: Option<Annotation>,
    /// `ignore` marker present
    pub ignored: bool,
    pub issues: Vec<AnnotationIssue>,
}

impl ParsedAnnotations {
    /// Carries at least one annotation string with our prefix
    pub fn is_marked(&self) -> bool {
        self.annotation.is_some() || self.ignored || !self.issues.is_empty()
    }
}

/// Parser for annotation strings carrying a fixed prefix
#[derive(Debug, Clone)]
pub struct AnnotationParser {
    prefix: String,
}

impl AnnotationParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        AnnotationParser {
            prefix: prefix.into(),
        }
    }

    /// Parse every annotation string attached to one declaration
    ///
    /// Never fails: unknown kinds and malformed attributes become issues.
    pub fn parse_all(&self, raw: &[String]) -> ParsedAnnotations {
        let mut parsed = ParsedAnnotations::default();

        for text in raw {
            let Some(body) = text.trim().strip_prefix(self.prefix.as_str()) else {
                continue;
            };
            let (kind_text, payload) = match body.split_once(',') {
                Some((kind, rest)) => (kind.trim(), rest),
                None => (body.trim(), ""),
            };

            if kind_text == IGNORE_KIND {
                parsed.ignored = true;
                continue;
            }

            let kind = match kind_text.parse::<AnnotationKind>() {
                Ok(kind) => kind,
                Err(message) => {
                    parsed
                        .issues
                        .push(AnnotationIssue::new(DiagnosticKind::UnknownAnnotation, message));
                    continue;
                }
            };

            let mut annotation = Annotation::new(kind);
            parse_attributes(payload, &mut annotation.attributes, &mut parsed.issues);

            if let Some(existing) = &parsed.annotation {
                parsed.issues.push(AnnotationIssue::new(
                    DiagnosticKind::MalformedAttribute,
                    format!(
                        "additional export annotation '{}' ignored, '{}' already applies",
                        kind, existing.kind
                    ),
                ));
                continue;
            }
            parsed.annotation = Some(annotation);
        }

        parsed
    }
}

/// Parse `key=value` pairs without regex, honouring quotes and brackets
pub fn parse_attributes(payload: &str, attributes: &mut Attributes, issues: &mut Vec<AnnotationIssue>) {
    for segment in split_top_level(payload) {
        parse_single_attribute(&segment, attributes, issues);
    }
}

fn split_top_level(payload: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;

    for ch in payload.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(ch);
            }
            (Some(_), _) => current.push(ch),
            (None, '"' | '\'') => {
                quote = Some(ch);
                current.push(ch);
            }
            (None, '[' | '{' | '(' | '<') => {
                depth += 1;
                current.push(ch);
            }
            (None, ']' | '}' | ')' | '>') => {
                depth -= 1;
                current.push(ch);
            }
            (None, ',') if depth <= 0 => {
                segments.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    segments.push(current);

    // A trailing comma is harmless; empty segments elsewhere are not
    if segments.last().is_some_and(|s| s.trim().is_empty()) && segments.len() > 1 {
        segments.pop();
    }
    if segments.len() == 1 && segments[0].trim().is_empty() {
        segments.clear();
    }
    segments
}

fn parse_single_attribute(segment: &str, attributes: &mut Attributes, issues: &mut Vec<AnnotationIssue>) {
    let Some((key, value)) = segment.split_once('=') else {
        issues.push(AnnotationIssue::new(
            DiagnosticKind::MalformedAttribute,
            format!("attribute '{}' is not a key=value pair", segment.trim()),
        ));
        return;
    };

    let key = key.trim();
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        issues.push(AnnotationIssue::new(
            DiagnosticKind::MalformedAttribute,
            format!("attribute '{}' has an invalid key", segment.trim()),
        ));
        return;
    }

    let value = strip_quotes(value.trim());
    if key == "access" && AccessType::from_attribute(value).is_none() {
        issues.push(AnnotationIssue::new(
            DiagnosticKind::MalformedAttribute,
            format!(
                "access '{}' is not one of readonly, readwrite, writeonly",
                value
            ),
        ));
        return;
    }

    if attributes.contains_key(key) {
        issues.push(AnnotationIssue::new(
            DiagnosticKind::MalformedAttribute,
            format!("attribute '{}' repeated, first value kept", key),
        ));
        return;
    }
    attributes.insert(key.to_string(), value.to_string());
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Callable, TypeRef};

    fn parse(raw: &[&str]) -> ParsedAnnotations {
        let raw: Vec<String> = raw.iter().map(|s| (*s).to_string()).collect();
        AnnotationParser::new("lua_export_").parse_all(&raw)
    }

    #[test]
    fn test_bare_kind_has_no_attributes() {
        let parsed = parse(&["lua_export_class"]);
        let annotation = parsed.annotation.as_ref();
        assert_eq!(annotation.map(|a| a.kind), Some(AnnotationKind::Class));
        assert!(annotation.is_some_and(|a| a.attributes.is_empty()));
        assert!(parsed.issues.is_empty());
    }

    #[test]
    fn test_attributes_keep_order_and_strip_quotes() {
        let parsed = parse(&["lua_export_class, namespace=game ,alias=\"Hero\""]);
        let Some(annotation) = parsed.annotation else {
            panic!("expected annotation");
        };
        let keys: Vec<_> = annotation.attributes.keys().cloned().collect();
        assert_eq!(keys, vec!["namespace", "alias"]);
        assert_eq!(annotation.alias(), Some("Hero"));
        assert_eq!(annotation.namespace(), Some("game"));
    }

    #[test]
    fn test_foreign_annotations_are_ignored() {
        let parsed = parse(&["deprecated", "clang::annotate", "other_export_class"]);
        assert!(!parsed.is_marked());
    }

    #[test]
    fn test_unknown_kind_is_reported() {
        let parsed = parse(&["lua_export_widget,alias=W"]);
        assert!(parsed.annotation.is_none());
        assert_eq!(parsed.issues.len(), 1);
        assert_eq!(parsed.issues[0].kind, DiagnosticKind::UnknownAnnotation);
        assert!(parsed.is_marked());
    }

    #[test]
    fn test_malformed_attributes_degrade() {
        let parsed = parse(&["lua_export_function,alias=run,broken,=x,alias=again"]);
        let Some(annotation) = parsed.annotation else {
            panic!("expected annotation");
        };
        assert_eq!(annotation.alias(), Some("run"));
        assert_eq!(annotation.attributes.len(), 1);
        assert_eq!(parsed.issues.len(), 3);
        assert!(parsed
            .issues
            .iter()
            .all(|i| i.kind == DiagnosticKind::MalformedAttribute));
    }

    #[test]
    fn test_invalid_access_is_dropped() {
        let parsed = parse(&["lua_export_property,access=sometimes"]);
        assert!(parsed.annotation.as_ref().is_some_and(|a| a.access().is_none()));
        assert_eq!(parsed.issues.len(), 1);

        let parsed = parse(&["lua_export_property,access=readonly"]);
        assert_eq!(
            parsed.annotation.and_then(|a| a.access()),
            Some(AccessType::ReadOnly)
        );
    }

    #[test]
    fn test_split_honours_brackets_and_quotes() {
        let segments = split_top_level("type=std::map<int, int>,doc='a, b',");
        assert_eq!(segments, vec!["type=std::map<int, int>", "doc='a, b'"]);
        assert!(split_top_level("  ").is_empty());
    }

    #[test]
    fn test_ignore_marker_and_second_annotation() {
        let parsed = parse(&["lua_export_ignore"]);
        assert!(parsed.ignored);
        assert!(parsed.annotation.is_none());

        let parsed = parse(&["lua_export_function", "lua_export_property"]);
        assert_eq!(
            parsed.annotation.map(|a| a.kind),
            Some(AnnotationKind::Function)
        );
        assert_eq!(parsed.issues.len(), 1);
    }

    #[test]
    fn test_applies_to() {
        let function = DeclKind::Function(Callable::new(TypeRef::void(), Vec::new()));
        assert!(AnnotationKind::Function.applies_to(&function, "spawn"));
        assert!(!AnnotationKind::Enum.applies_to(&function, "spawn"));
        assert!(!AnnotationKind::Operator.applies_to(&function, "spawn"));
        assert!(AnnotationKind::Operator.applies_to(&function, "operator+"));

        let field = DeclKind::Field {
            ty: TypeRef::builtin("int"),
            is_static: false,
            is_const: false,
            init: None,
        };
        assert!(AnnotationKind::Variable.applies_to(&field, "hp"));
        assert!(!AnnotationKind::Constant.applies_to(&field, "hp"));
    }
}
