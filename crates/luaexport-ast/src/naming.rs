//! Naming utilities for script-side names
//!
//! This module derives the names the scripting side sees: default script
//! names, generated container aliases built from "friendly" type names, and
//! logical property names from accessor pairs.

use crate::options::ContainerRules;
use crate::tree::TypeRef;
use crate::types::{canonical, container_of};
use luaexport_manifest::ContainerKind;

/// Upper-case the first character
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lower-case the first character
pub fn lower_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Capitalized, punctuation-free rendering of a spelled type name
///
/// - std::string -> StdString
/// - demo::Player -> DemoPlayer
/// - unsigned int -> UnsignedInt
/// - shared_ptr -> SharedPtr
pub fn friendly_words(text: &str) -> String {
    let words: String = text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect();

    if words.is_empty() {
        return "Unknown".to_string();
    }
    // Script identifiers cannot start with a digit
    if words.starts_with(|c: char| c.is_ascii_digit()) {
        format!("T{}", words)
    } else {
        words
    }
}

/// Friendly name of a type, recursing through nested containers
pub fn friendly_name(ty: &TypeRef, rules: &ContainerRules) -> String {
    let ty = ty.unqualified();
    if let Some((kind @ (ContainerKind::Vector | ContainerKind::Map), elements)) = container_of(ty, rules) {
        return container_default_name(kind, elements, rules);
    }
    match ty {
        TypeRef::Pointer(inner) => format!("{}Ptr", friendly_name(inner, rules)),
        TypeRef::Template { name, args } => {
            let mut out = friendly_words(name);
            for arg in args {
                out.push_str(&friendly_name(arg, rules));
            }
            out
        }
        TypeRef::Function { ret, params } => {
            let mut out = friendly_name(ret, rules);
            for param in params {
                out.push_str(&friendly_name(param, rules));
            }
            out.push_str("Function");
            out
        }
        other => friendly_words(&canonical(other).text),
    }
}

/// Generated script name of a container instantiation
///
/// - vector<int> -> IntVector
/// - map<std::string, int> -> StdStringIntMap
/// - vector<vector<int>> -> IntVectorVector
pub fn container_default_name(kind: ContainerKind, elements: &[TypeRef], rules: &ContainerRules) -> String {
    let mut name: String = elements
        .iter()
        .map(|element| friendly_name(element, rules))
        .collect();
    name.push_str(kind.suffix());
    name
}

/// Role an accessor plays in a property pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorRole {
    Getter,
    Setter,
}

/// Split an accessor name into its role and logical property name
///
/// The prefix must be followed by an upper-case letter or `_`, so `getLevel`
/// and `is_alive` are accessors while `settle` and `island` are not.
pub fn accessor_role(name: &str) -> Option<(AccessorRole, String)> {
    for (prefix, role) in [
        ("get", AccessorRole::Getter),
        ("is", AccessorRole::Getter),
        ("set", AccessorRole::Setter),
    ] {
        let Some(rest) = name.strip_prefix(prefix) else {
            continue;
        };
        let Some(first) = rest.chars().next() else {
            continue;
        };
        if !(first.is_ascii_uppercase() || first == '_') {
            continue;
        }
        let rest = rest.trim_start_matches('_');
        if rest.is_empty() {
            continue;
        }
        return Some((role, lower_first(rest)));
    }
    None
}

/// Script name of a declaration: the alias when present, otherwise the simple name
pub fn script_name(name: &str, alias: Option<&str>) -> String {
    match alias {
        Some(alias) if !alias.trim().is_empty() => alias.trim().to_string(),
        _ => name.to_string(),
    }
}

/// Token of an operator declaration name (`operator+=` -> `+=`)
pub fn operator_token(name: &str) -> Option<&str> {
    name.strip_prefix("operator")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
