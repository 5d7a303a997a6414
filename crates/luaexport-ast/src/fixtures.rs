//! Tree builders shared by the driver tests

use crate::sequence::Sequence;
use crate::tree::{BaseSpec, Callable, Decl, DeclKind, EnumConstant, Param, TranslationUnit, TypeRef};
use luaexport_manifest::SourceLocation;

/// Builds declarations for one fake unit, numbering their source lines
pub(crate) struct TreeBuilder {
    file: String,
    lines: Sequence,
}

impl TreeBuilder {
    pub fn new(file: &str) -> Self {
        TreeBuilder {
            file: file.to_string(),
            lines: Sequence::default(),
        }
    }

    fn located(&mut self, name: &str, kind: DeclKind) -> Decl {
        let line = self.lines.next_value();
        Decl::new(name, kind).at(SourceLocation::new(self.file.as_str(), line, 1))
    }

    pub fn unit(&self, decls: Vec<Decl>) -> TranslationUnit {
        TranslationUnit::new(&self.file, decls)
    }

    pub fn namespace(&mut self, name: &str, decls: Vec<Decl>) -> Decl {
        self.located(name, DeclKind::Namespace { decls })
    }

    pub fn record(&mut self, name: &str, bases: &[&str], members: Vec<Decl>) -> Decl {
        self.located(
            name,
            DeclKind::Record {
                bases: bases.iter().map(|base| BaseSpec::public(base)).collect(),
                members,
                is_abstract: false,
                is_specialization: false,
            },
        )
    }

    pub fn method(&mut self, name: &str, callable: Callable) -> Decl {
        self.located(name, DeclKind::Method(callable))
    }

    pub fn constructor(&mut self, name: &str, params: &[(&str, TypeRef)]) -> Decl {
        self.located(name, DeclKind::Constructor(sig(TypeRef::void(), params)))
    }

    pub fn destructor(&mut self, name: &str) -> Decl {
        self.located(name, DeclKind::Destructor)
    }

    pub fn function(&mut self, name: &str, callable: Callable) -> Decl {
        self.located(name, DeclKind::Function(callable))
    }

    pub fn field(&mut self, name: &str, ty: TypeRef) -> Decl {
        self.located(
            name,
            DeclKind::Field {
                ty,
                is_static: false,
                is_const: false,
                init: None,
            },
        )
    }

    pub fn static_const(&mut self, name: &str, ty: TypeRef, init: &str) -> Decl {
        self.located(
            name,
            DeclKind::Field {
                ty,
                is_static: true,
                is_const: true,
                init: Some(init.to_string()),
            },
        )
    }

    pub fn variable(&mut self, name: &str, ty: TypeRef, is_const: bool, init: Option<&str>) -> Decl {
        self.located(
            name,
            DeclKind::Variable {
                ty,
                is_const,
                init: init.map(str::to_string),
            },
        )
    }

    pub fn enumeration(&mut self, name: &str, items: &[(&str, Option<&str>)]) -> Decl {
        let enumerators = items
            .iter()
            .map(|(name, init)| EnumConstant {
                name: (*name).to_string(),
                init: init.map(str::to_string),
            })
            .collect();
        self.located(
            name,
            DeclKind::Enum {
                enumerators,
                is_scoped: true,
            },
        )
    }

    pub fn alias(&mut self, name: &str, target: TypeRef) -> Decl {
        self.located(name, DeclKind::TypeAlias { target })
    }
}

/// Callable with named parameters
pub(crate) fn sig(ret: TypeRef, params: &[(&str, TypeRef)]) -> Callable {
    Callable::new(
        ret,
        params
            .iter()
            .map(|(name, ty)| Param::new(name, ty.clone()))
            .collect(),
    )
}

pub(crate) fn int() -> TypeRef {
    TypeRef::builtin("int")
}

pub(crate) fn void() -> TypeRef {
    TypeRef::void()
}
