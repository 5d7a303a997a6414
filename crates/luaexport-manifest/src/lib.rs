//! luaexport manifest types
//!
//! This crate defines the output boundary of the analysis core: the
//! normalized `ExportRecord`, the diagnostics recorded next to it, and the
//! manifest that collects per-unit results for the external registration
//! code generator.
//!
//! Manifests are stored as JSON by default, or TOML when the path ends in
//! `.toml`.

pub mod diagnostics;
pub mod errors;
pub mod manifest;
pub mod types;

pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use errors::ManifestError;
pub use manifest::{group_overloads, ExportManifest, OverloadSet, UnitExports};
pub use types::{
    AccessType, Attributes, ContainerKind, Enumerator, ExportKind, ExportRecord, OperatorClass,
    RecordIdentity, SourceLocation,
};
