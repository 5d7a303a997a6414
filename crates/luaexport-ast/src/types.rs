//! Type and signature extraction
//!
//! Turns the front-end's semantic types into the canonical strings stored in
//! export records. Canonicalization is total: anything that cannot be
//! rendered faithfully degrades to a sanitized spelling and is flagged as
//! unresolved so the caller can report it.

use crate::options::ContainerRules;
use crate::tree::{Param, TypeRef};
use luaexport_manifest::ContainerKind;

/// Canonical spelling of a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonical {
    pub text: String,
    /// False when some part of the type had to be sanitized
    pub resolved: bool,
}

impl Canonical {
    fn resolved(text: String) -> Self {
        Canonical {
            text,
            resolved: true,
        }
    }

    fn unresolved(spelling: &str) -> Self {
        Canonical {
            text: sanitize(spelling),
            resolved: false,
        }
    }
}

/// Canonical string for a type
///
/// Namespaces stay fully qualified, reference and const qualifiers are
/// stripped at every level, pointers keep their `*`.
pub fn canonical(ty: &TypeRef) -> Canonical {
    match ty {
        TypeRef::Builtin(name) | TypeRef::Named(name) => {
            let spelling = canonicalize_spelling(name);
            if spelling.is_empty() {
                Canonical::unresolved(name)
            } else {
                Canonical::resolved(spelling)
            }
        }
        TypeRef::Const(inner) | TypeRef::LValueRef(inner) | TypeRef::RValueRef(inner) => {
            canonical(inner)
        }
        TypeRef::Pointer(inner) => {
            let inner = canonical(inner);
            Canonical {
                text: format!("{}*", inner.text),
                resolved: inner.resolved,
            }
        }
        TypeRef::Template { name, args } => {
            let template = canonicalize_spelling(name);
            let rendered = render_list(args);
            let resolved = rendered.resolved && !template.is_empty();
            let template = if template.is_empty() {
                sanitize(name)
            } else {
                template
            };
            Canonical {
                text: format!("{}<{}>", template, rendered.text),
                resolved,
            }
        }
        TypeRef::Function { ret, params } => {
            let ret = canonical(ret);
            let rendered = render_list(params);
            Canonical {
                text: format!("{}({})", ret.text, rendered.text),
                resolved: ret.resolved && rendered.resolved,
            }
        }
        TypeRef::Unresolved(spelling) => Canonical::unresolved(spelling),
    }
}

fn render_list(types: &[TypeRef]) -> Canonical {
    let parts: Vec<Canonical> = types.iter().map(canonical).collect();
    Canonical {
        text: parts
            .iter()
            .map(|part| part.text.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        resolved: parts.iter().all(|part| part.resolved),
    }
}

/// Normalize a spelled name: no leading `::`, single spaces, no `const`/`volatile`
pub fn canonicalize_spelling(name: &str) -> String {
    let words: Vec<&str> = name
        .split_whitespace()
        .filter(|word| *word != "const" && *word != "volatile")
        .collect();
    let joined = words.join(" ");
    let joined = joined.trim_start_matches("::");
    joined.replace(" ::", "::").replace(":: ", "::")
}

/// Replace punctuation with `_` and escape a leading digit
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_underscore = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_underscore = false;
        } else if !last_underscore {
            out.push('_');
            last_underscore = true;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        return "unknown".to_string();
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Container family and element types of a template instantiation
///
/// Extra template arguments such as allocators and comparators are not
/// element types. A known container without enough arguments is `Other`.
pub fn container_of<'t>(ty: &'t TypeRef, rules: &ContainerRules) -> Option<(ContainerKind, &'t [TypeRef])> {
    let TypeRef::Template { name, args } = ty.unqualified() else {
        return None;
    };
    match rules.classify(name) {
        Some(ContainerKind::Vector) if !args.is_empty() => Some((ContainerKind::Vector, &args[..1])),
        Some(ContainerKind::Map) if args.len() >= 2 => Some((ContainerKind::Map, &args[..2])),
        _ => Some((ContainerKind::Other, args.as_slice())),
    }
}

/// Return and parameter types of a function-like type
///
/// Accepts a function type, a pointer to one, or a `std::function<F>`.
pub fn function_signature(ty: &TypeRef) -> Option<(&TypeRef, &[TypeRef])> {
    match ty.unqualified() {
        TypeRef::Function { ret, params } => Some((ret.as_ref(), params.as_slice())),
        TypeRef::Pointer(inner) => function_signature(inner),
        TypeRef::Template { name, args } if args.len() == 1 => {
            let name = canonicalize_spelling(name);
            if name == "std::function" || name == "function" {
                function_signature(&args[0])
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Canonical parameter types and names, with placeholder names for unnamed parameters
pub fn parameter_lists(params: &[Param]) -> (Vec<Canonical>, Vec<String>) {
    let types = params.iter().map(|param| canonical(&param.ty)).collect();
    let names = params
        .iter()
        .enumerate()
        .map(|(idx, param)| {
            let name = param.name.trim();
            if name.is_empty() {
                format!("arg{}", idx)
            } else {
                name.to_string()
            }
        })
        .collect();
    (types, names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_strips_qualifiers() {
        let ty = TypeRef::const_ref(TypeRef::named("::std::string"));
        assert_eq!(canonical(&ty).text, "std::string");

        let ptr = TypeRef::pointer(TypeRef::Const(Box::new(TypeRef::builtin("char"))));
        assert_eq!(canonical(&ptr).text, "char*");
        assert_eq!(canonical(&TypeRef::builtin("unsigned   int")).text, "unsigned int");
    }

    #[test]
    fn test_canonical_templates_and_functions() {
        let map = TypeRef::template(
            "std::map",
            vec![TypeRef::named("std::string"), TypeRef::builtin("int")],
        );
        assert_eq!(canonical(&map).text, "std::map<std::string, int>");

        let callback = TypeRef::Function {
            ret: Box::new(TypeRef::void()),
            params: vec![TypeRef::const_ref(TypeRef::named("demo::Player")), TypeRef::builtin("float")],
        };
        let rendered = canonical(&callback);
        assert_eq!(rendered.text, "void(demo::Player, float)");
        assert!(rendered.resolved);
    }

    #[test]
    fn test_unresolved_types_are_sanitized() {
        let ty = TypeRef::template("std::vector", vec![TypeRef::Unresolved("<dependent type>".to_string())]);
        let rendered = canonical(&ty);
        assert_eq!(rendered.text, "std::vector<dependent_type>");
        assert!(!rendered.resolved);

        assert!(!canonical(&TypeRef::named("  ")).resolved);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("decltype(x)"), "decltype_x");
        assert_eq!(sanitize("3d::Vec"), "_3d_Vec");
        assert_eq!(sanitize("<<>>"), "unknown");
    }

    #[test]
    fn test_container_of() {
        let rules = ContainerRules::default();
        let vector = TypeRef::template(
            "std::vector",
            vec![TypeRef::builtin("int"), TypeRef::named("std::allocator<int>")],
        );
        let Some((kind, elements)) = container_of(&vector, &rules) else {
            panic!("expected a container");
        };
        assert_eq!(kind, ContainerKind::Vector);
        assert_eq!(elements.len(), 1);

        let deque = TypeRef::template("std::deque", vec![TypeRef::builtin("int")]);
        assert_eq!(container_of(&deque, &rules).map(|c| c.0), Some(ContainerKind::Other));
        assert!(container_of(&TypeRef::builtin("int"), &rules).is_none());
    }

    #[test]
    fn test_function_signature_through_std_function() {
        let inner = TypeRef::Function {
            ret: Box::new(TypeRef::builtin("bool")),
            params: vec![TypeRef::builtin("int")],
        };
        let wrapped = TypeRef::template("std::function", vec![inner]);
        let Some((ret, params)) = function_signature(&wrapped) else {
            panic!("expected a function signature");
        };
        assert_eq!(ret, &TypeRef::builtin("bool"));
        assert_eq!(params.len(), 1);
        assert!(function_signature(&TypeRef::builtin("int")).is_none());
    }

    #[test]
    fn test_parameter_lists_fill_missing_names() {
        let params = vec![
            Param::new("x", TypeRef::builtin("int")),
            Param::new("", TypeRef::builtin("int")),
        ];
        let (types, names) = parameter_lists(&params);
        assert_eq!(types.len(), 2);
        assert_eq!(names, vec!["x", "arg1"]);
    }
}
