//! Semantic declaration tree supplied by the compiler front-end
//!
//! The front-end dumps one `TranslationUnit` per analyzed file. The analysis
//! never re-parses source text: everything it knows about a declaration is in
//! these types. Declaration kinds form a closed set so every consumer matches
//! them exhaustively.

use crate::error::AnalysisError;
use luaexport_manifest::SourceLocation;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Semantic type as resolved by the front-end
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    /// Built-in scalar such as `int` or `unsigned long`
    Builtin(String),
    /// Class, enum or alias, spelled with its qualified name
    Named(String),
    Const(Box<TypeRef>),
    LValueRef(Box<TypeRef>),
    RValueRef(Box<TypeRef>),
    Pointer(Box<TypeRef>),
    /// Template instantiation such as `std::vector<int>`
    Template { name: String, args: Vec<TypeRef> },
    Function {
        ret: Box<TypeRef>,
        params: Vec<TypeRef>,
    },
    /// Spelling the front-end could not resolve
    Unresolved(String),
}

impl TypeRef {
    pub fn builtin(name: &str) -> Self {
        TypeRef::Builtin(name.to_string())
    }

    pub fn named(name: &str) -> Self {
        TypeRef::Named(name.to_string())
    }

    pub fn template(name: &str, args: Vec<TypeRef>) -> Self {
        TypeRef::Template {
            name: name.to_string(),
            args,
        }
    }

    pub fn const_ref(inner: TypeRef) -> Self {
        TypeRef::LValueRef(Box::new(TypeRef::Const(Box::new(inner))))
    }

    pub fn pointer(inner: TypeRef) -> Self {
        TypeRef::Pointer(Box::new(inner))
    }

    pub fn void() -> Self {
        TypeRef::builtin("void")
    }

    /// The type with top-level const and reference qualifiers removed
    pub fn unqualified(&self) -> &TypeRef {
        match self {
            TypeRef::Const(inner) | TypeRef::LValueRef(inner) | TypeRef::RValueRef(inner) => {
                inner.unqualified()
            }
            other => other,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.unqualified(), TypeRef::Builtin(name) if name.trim() == "void")
    }
}

impl Default for TypeRef {
    fn default() -> Self {
        TypeRef::void()
    }
}

/// C++ member access level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    #[default]
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    #[serde(default)]
    pub name: String,
    pub ty: TypeRef,
}

impl Param {
    pub fn new(name: &str, ty: TypeRef) -> Self {
        Param {
            name: name.to_string(),
            ty,
        }
    }
}

/// Signature and modifiers shared by every callable declaration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Callable {
    pub return_type: TypeRef,
    pub params: Vec<Param>,
    pub is_static: bool,
    pub is_const: bool,
    pub is_virtual: bool,
    pub is_pure: bool,
    pub is_deleted: bool,
}

impl Callable {
    pub fn new(return_type: TypeRef, params: Vec<Param>) -> Self {
        Callable {
            return_type,
            params,
            ..Default::default()
        }
    }
}

/// One entry of a record's base-specifier list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseSpec {
    pub name: String,
    #[serde(default)]
    pub access: Access,
    #[serde(default)]
    pub is_virtual: bool,
}

impl BaseSpec {
    pub fn public(name: &str) -> Self {
        BaseSpec {
            name: name.to_string(),
            access: Access::Public,
            is_virtual: false,
        }
    }
}

/// Enumerator with its initializer as written, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumConstant {
    pub name: String,
    #[serde(default)]
    pub init: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decl", rename_all = "snake_case")]
pub enum DeclKind {
    Namespace {
        #[serde(default)]
        decls: Vec<Decl>,
    },
    /// Class or struct
    Record {
        #[serde(default)]
        bases: Vec<BaseSpec>,
        #[serde(default)]
        members: Vec<Decl>,
        #[serde(default)]
        is_abstract: bool,
        /// Instantiated template specialization
        #[serde(default)]
        is_specialization: bool,
    },
    Method(Callable),
    Constructor(Callable),
    Destructor,
    Function(Callable),
    Field {
        ty: TypeRef,
        #[serde(default)]
        is_static: bool,
        #[serde(default)]
        is_const: bool,
        #[serde(default)]
        init: Option<String>,
    },
    Variable {
        ty: TypeRef,
        #[serde(default)]
        is_const: bool,
        #[serde(default)]
        init: Option<String>,
    },
    Enum {
        #[serde(default)]
        enumerators: Vec<EnumConstant>,
        #[serde(default)]
        is_scoped: bool,
    },
    TypeAlias {
        target: TypeRef,
    },
}

impl DeclKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclKind::Namespace { .. } => "namespace",
            DeclKind::Record { .. } => "record",
            DeclKind::Method(_) => "method",
            DeclKind::Constructor(_) => "constructor",
            DeclKind::Destructor => "destructor",
            DeclKind::Function(_) => "function",
            DeclKind::Field { .. } => "field",
            DeclKind::Variable { .. } => "variable",
            DeclKind::Enum { .. } => "enum",
            DeclKind::TypeAlias { .. } => "type alias",
        }
    }

    /// Kinds that only make sense as members of a record
    pub fn is_member_only(&self) -> bool {
        matches!(
            self,
            DeclKind::Method(_) | DeclKind::Constructor(_) | DeclKind::Destructor | DeclKind::Field { .. }
        )
    }
}

/// A single declaration with its raw annotations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decl {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: Option<SourceLocation>,
    #[serde(default)]
    pub annotations: Vec<String>,
    #[serde(default)]
    pub access: Access,
    /// Compiler-generated declaration
    #[serde(default)]
    pub implicit: bool,
    pub kind: DeclKind,
}

impl Decl {
    pub fn new(name: &str, kind: DeclKind) -> Self {
        Decl {
            name: name.to_string(),
            location: None,
            annotations: Vec::new(),
            access: Access::Public,
            implicit: false,
            kind,
        }
    }

    pub fn annotated(mut self, annotation: &str) -> Self {
        self.annotations.push(annotation.to_string());
        self
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn implicit(mut self) -> Self {
        self.implicit = true;
        self
    }

    /// Nested declarations of a namespace or record
    pub fn children(&self) -> &[Decl] {
        match &self.kind {
            DeclKind::Namespace { decls } => decls,
            DeclKind::Record { members, .. } => members,
            _ => &[],
        }
    }
}

/// Everything the front-end reports for one analyzed file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationUnit {
    pub file_path: String,
    #[serde(default)]
    pub decls: Vec<Decl>,
}

impl TranslationUnit {
    pub fn new(file_path: &str, decls: Vec<Decl>) -> Self {
        TranslationUnit {
            file_path: file_path.to_string(),
            decls,
        }
    }

    pub fn from_json(content: &str) -> Result<Self, AnalysisError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a front-end JSON dump from disk
    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unqualified_strips_const_and_refs() {
        let ty = TypeRef::const_ref(TypeRef::named("std::string"));
        assert_eq!(ty.unqualified(), &TypeRef::named("std::string"));

        let ptr = TypeRef::pointer(TypeRef::Const(Box::new(TypeRef::builtin("char"))));
        assert_eq!(ptr.unqualified(), &ptr);
        assert!(TypeRef::void().is_void());
    }

    #[test]
    fn test_unit_from_front_end_json() -> Result<(), AnalysisError> {
        let json = r#"{
            "file_path": "demo.h",
            "decls": [{
                "name": "Player",
                "annotations": ["lua_export_class"],
                "location": {"file": "demo.h", "line": 3},
                "kind": {
                    "decl": "record",
                    "bases": [{"name": "Entity"}],
                    "members": [{
                        "name": "getLevel",
                        "kind": {
                            "decl": "method",
                            "return_type": {"builtin": "int"},
                            "is_const": true
                        }
                    }, {
                        "name": "scores",
                        "access": "private",
                        "kind": {
                            "decl": "field",
                            "ty": {"template": {"name": "std::vector", "args": [{"builtin": "int"}]}}
                        }
                    }]
                }
            }]
        }"#;

        let unit = TranslationUnit::from_json(json)?;
        assert_eq!(unit.file_path, "demo.h");
        let player = &unit.decls[0];
        assert_eq!(player.location.as_ref().map(|l| l.line), Some(3));
        let DeclKind::Record { bases, members, .. } = &player.kind else {
            panic!("expected a record");
        };
        assert_eq!(bases[0], BaseSpec::public("Entity"));
        assert!(matches!(&members[0].kind, DeclKind::Method(c) if c.is_const && c.params.is_empty()));
        assert_eq!(members[1].access, Access::Private);
        Ok(())
    }

    #[test]
    fn test_load_dump_from_disk() -> Result<(), AnalysisError> {
        let temp_dir = tempfile::TempDir::new()?;
        let path = temp_dir.path().join("calc.json");
        std::fs::write(&path, r#"{"file_path": "calc.h"}"#)?;

        let unit = TranslationUnit::load(&path)?;
        assert_eq!(unit, TranslationUnit::new("calc.h", Vec::new()));
        assert!(matches!(
            TranslationUnit::load(&temp_dir.path().join("absent.json")),
            Err(AnalysisError::Io(_))
        ));
        Ok(())
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let result = TranslationUnit::from_json("{\"decls\": 3}");
        assert!(matches!(result, Err(AnalysisError::Parse(_))));
    }
}
