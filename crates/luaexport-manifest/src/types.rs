//! Export record types handed to the registration code generator
//!
//! This module provides:
//! - `ExportRecord`, the single normalized unit of analysis output
//! - Closed enumerations for record kinds, property access and containers
//! - SmallVec for the short signature lists every callable carries

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Raw annotation attributes in the order they were written
pub type Attributes = IndexMap<String, String>;

// =============================================================================
// SOURCE LOCATION - Provenance only, never part of a record's identity
// =============================================================================

/// Position of a declaration in the analyzed source
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        SourceLocation {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

// =============================================================================
// KINDS
// =============================================================================

/// What a record exposes to the scripting side
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    #[default]
    Class,
    Method,
    StaticMethod,
    Constructor,
    Property,
    Function,
    Enum,
    Constant,
    Namespace,
    Module,
    Operator,
    TypeConverter,
    Inherit,
    Container,
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Class => "class",
            ExportKind::Method => "method",
            ExportKind::StaticMethod => "static_method",
            ExportKind::Constructor => "constructor",
            ExportKind::Property => "property",
            ExportKind::Function => "function",
            ExportKind::Enum => "enum",
            ExportKind::Constant => "constant",
            ExportKind::Namespace => "namespace",
            ExportKind::Module => "module",
            ExportKind::Operator => "operator",
            ExportKind::TypeConverter => "type_converter",
            ExportKind::Inherit => "inherit",
            ExportKind::Container => "container",
        }
    }

    /// Kinds whose records carry a call signature and may be overloaded
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            ExportKind::Method
                | ExportKind::StaticMethod
                | ExportKind::Constructor
                | ExportKind::Function
                | ExportKind::Operator
        )
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read/write capability of a property
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    #[default]
    None,
    ReadOnly,
    ReadWrite,
    WriteOnly,
}

impl AccessType {
    /// Parse the value of an `access=` attribute
    pub fn from_attribute(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "readonly" => Some(AccessType::ReadOnly),
            "readwrite" => Some(AccessType::ReadWrite),
            "writeonly" => Some(AccessType::WriteOnly),
            _ => None,
        }
    }

    pub fn is_readable(&self) -> bool {
        matches!(self, AccessType::ReadOnly | AccessType::ReadWrite)
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, AccessType::WriteOnly | AccessType::ReadWrite)
    }
}

/// Standard container families recognized for `Container` records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Vector,
    Map,
    Other,
}

impl ContainerKind {
    /// Suffix appended to generated container names
    pub fn suffix(&self) -> &'static str {
        match self {
            ContainerKind::Vector => "Vector",
            ContainerKind::Map => "Map",
            ContainerKind::Other => "Container",
        }
    }
}

/// Dispatch family of an `Operator` record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorClass {
    Index,
    Call,
    Comparison,
    Unary,
    Binary,
    Other,
}

/// One evaluated enumerator of an exported enum
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Enumerator {
    pub name: String,
    pub value: i64,
}

impl Enumerator {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Enumerator {
            name: name.into(),
            value,
        }
    }
}

// =============================================================================
// EXPORT RECORD
// =============================================================================

/// Normalized description of one scripting-exposed element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub kind: ExportKind,
    pub name: String,
    pub script_name: String,
    pub qualified_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_location: Option<SourceLocation>,
    #[serde(default)]
    pub file_path: String,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: Attributes,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub parameter_types: SmallVec<[String; 4]>,
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub parameter_names: SmallVec<[String; 4]>,

    #[serde(default)]
    pub access_type: AccessType,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_const: bool,
    #[serde(default)]
    pub is_virtual: bool,

    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub base_types: SmallVec<[String; 2]>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub owner_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub module_name: String,

    /// Accessor names and value type of a `Property`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub getter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enumerators: Vec<Enumerator>,

    /// Evaluated (or verbatim) initializer of a `Constant`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerKind>,
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub element_types: SmallVec<[String; 2]>,
}

/// Identity used to collapse redeclarations of the same element
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordIdentity {
    pub kind: ExportKind,
    pub qualified_name: String,
    pub parameter_types: Vec<String>,
    pub is_const: bool,
}

impl ExportRecord {
    /// Create a record whose script name defaults to its simple name
    pub fn new(kind: ExportKind, name: impl Into<String>, qualified_name: impl Into<String>) -> Self {
        let name = name.into();
        ExportRecord {
            kind,
            script_name: name.clone(),
            name,
            qualified_name: qualified_name.into(),
            ..Default::default()
        }
    }

    /// A record is only usable downstream with a resolved identity
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty() && !self.qualified_name.trim().is_empty()
    }

    pub fn identity(&self) -> RecordIdentity {
        RecordIdentity {
            kind: self.kind,
            qualified_name: self.qualified_name.clone(),
            parameter_types: self.parameter_types.to_vec(),
            is_const: self.is_const,
        }
    }

    /// Name plus signature, the key members are compared by when flattening
    /// inherited surfaces
    pub fn member_key(&self) -> String {
        let mut key = format!("{}({})", self.name, self.parameter_types.join(","));
        if self.is_const {
            key.push_str(" const");
        }
        key
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Classify an `Operator` record by its token and operand count
    ///
    /// Member operators receive the object as an implicit first operand.
    pub fn operator_class(&self) -> Option<OperatorClass> {
        if self.kind != ExportKind::Operator {
            return None;
        }
        let token = self.name.strip_prefix("operator").unwrap_or(&self.name).trim();
        let implicit = usize::from(!self.owner_type.is_empty() && !self.is_static);
        let operands = self.parameter_types.len() + implicit;

        let class = match token {
            "[]" => OperatorClass::Index,
            "()" => OperatorClass::Call,
            "==" | "!=" | "<" | "<=" | ">" | ">=" | "<=>" => OperatorClass::Comparison,
            "+" | "-" | "*" | "/" | "%" | "&" | "|" | "^" | "<<" | ">>" | "&&" | "||" => {
                match operands {
                    1 => OperatorClass::Unary,
                    2 => OperatorClass::Binary,
                    _ => OperatorClass::Other,
                }
            }
            "!" | "~" | "++" | "--" => OperatorClass::Unary,
            _ => OperatorClass::Other,
        };
        Some(class)
    }
}
