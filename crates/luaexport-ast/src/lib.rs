//! Annotation-driven export analysis
//!
//! This crate turns the semantic tree of one C++ translation unit into the
//! ordered `ExportRecord`s a Lua binding generator consumes:
//! 1. `Driver::new` validates the tree (missing path, members outside records,
//!    runaway nesting are the only fatal errors)
//! 2. a pre-pass indexes every record type and whether it is annotated
//! 3. one pre-order walk parses annotations and builds records, flattening
//!    the members of unannotated bases onto annotated classes
//!
//! Everything recoverable is recorded as a `Diagnostic` next to the records.
//! Units are independent, so hosts may analyze them in parallel and merge
//! the results in input order.
pub mod annotation;
pub mod driver;
pub mod error;
pub mod eval;
pub mod naming;
pub mod options;
pub mod sequence;
pub mod tree;
pub mod types;

#[cfg(test)]
mod fixtures;

pub use annotation::{Annotation, AnnotationKind, AnnotationParser, ParsedAnnotations};
pub use driver::{skip_reason, Driver, MAX_NESTING_DEPTH};
pub use error::AnalysisError;
pub use options::{AnalysisOptions, ContainerRules};
pub use sequence::Sequence;
pub use tree::{Access, BaseSpec, Callable, Decl, DeclKind, EnumConstant, Param, TranslationUnit, TypeRef};

use luaexport_manifest::UnitExports;

/// Analyze one unit with diagnostics logging disabled
pub fn analyze_unit(unit: &TranslationUnit, options: &AnalysisOptions) -> Result<UnitExports, AnalysisError> {
    Ok(Driver::new(unit, options)?.run())
}
