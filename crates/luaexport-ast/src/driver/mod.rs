//! Traversal driver
//!
//! One `Driver` analyzes one translation unit:
//! 1. `Driver::new` checks the structural preconditions (the only fatal errors)
//! 2. a pre-pass indexes every record type with its annotation presence
//! 3. a single pre-order walk dispatches each declaration to the record builders
//!
//! All state lives in a `Context` created for the run and handed back as
//! `UnitExports`. Nothing is shared between runs, so units can be analyzed on
//! separate threads and concatenated afterwards.

use crate::annotation::{Annotation, AnnotationIssue, AnnotationKind, AnnotationParser};
use crate::error::AnalysisError;
use crate::naming;
use crate::options::AnalysisOptions;
use crate::sequence::Sequence;
use crate::tree::{Access, Decl, DeclKind, TranslationUnit, TypeRef};
use crate::types::{canonical, canonicalize_spelling};
use ahash::{AHashMap, AHashSet};
use luaexport_logger::{DiagnosticsSink, NoopSink, TraversalEvent};
use luaexport_manifest::{
    AccessType, Diagnostic, DiagnosticKind, ExportKind, ExportRecord, RecordIdentity,
    SourceLocation, UnitExports,
};
use tracing::{debug, info};

mod callables;
mod containers;
mod enums;
mod properties;
mod resolver;


/// Deepest namespace/record nesting accepted by `Driver::new`
pub const MAX_NESTING_DEPTH: usize = 256;

const ANONYMOUS_SCOPE: &str = "(anonymous)";

// =============================================================================
// DRIVER
// =============================================================================

/// Analysis of a single translation unit
pub struct Driver<'u, S: DiagnosticsSink = NoopSink> {
    unit: &'u TranslationUnit,
    options: &'u AnalysisOptions,
    sink: S,
}

impl<'u> Driver<'u, NoopSink> {
    pub fn new(unit: &'u TranslationUnit, options: &'u AnalysisOptions) -> Result<Self, AnalysisError> {
        Driver::with_sink(unit, options, NoopSink)
    }
}

impl<'u, S: DiagnosticsSink> Driver<'u, S> {
    /// Create a driver reporting traversal events to `sink`
    ///
    /// The sink is not finished by the driver; its owner flushes it (or
    /// drops it) once every unit sharing it has been analyzed.
    pub fn with_sink(
        unit: &'u TranslationUnit,
        options: &'u AnalysisOptions,
        sink: S,
    ) -> Result<Self, AnalysisError> {
        if unit.file_path.trim().is_empty() {
            return Err(AnalysisError::MissingFilePath);
        }
        if options.annotation_prefix.trim().is_empty() {
            return Err(AnalysisError::EmptyAnnotationPrefix);
        }
        check_structure(&unit.decls, false, 0, &unit.file_path)?;

        Ok(Driver {
            unit,
            options,
            sink,
        })
    }

    /// Walk the unit once and return its ordered records and diagnostics
    pub fn run(self) -> UnitExports {
        let Driver {
            unit,
            options,
            sink,
        } = self;

        let mut walker = Walker {
            unit,
            options,
            parser: AnnotationParser::new(options.annotation_prefix.as_str()),
            sink,
            ctx: Context::default(),
            scopes: Vec::new(),
        };

        if S::ENABLED {
            walker.sink.event(&TraversalEvent::UnitStarted {
                file: &unit.file_path,
            });
        }
        debug!("Analyzing unit: {}", unit.file_path);

        walker.index_types(&unit.decls, &mut Vec::new());
        walker.walk(&unit.decls);
        walker.finish()
    }
}

fn check_structure(
    decls: &[Decl],
    in_record: bool,
    depth: usize,
    file: &str,
) -> Result<(), AnalysisError> {
    for decl in decls {
        if decl.kind.is_member_only() && !in_record {
            return Err(AnalysisError::MemberOutsideRecord {
                kind: decl.kind.as_str(),
                name: decl.name.clone(),
                file: file.to_string(),
            });
        }
        let (children, child_in_record) = match &decl.kind {
            DeclKind::Namespace { decls } => (decls, false),
            DeclKind::Record { members, .. } => (members, true),
            _ => continue,
        };
        if depth + 1 > MAX_NESTING_DEPTH {
            return Err(AnalysisError::NestingTooDeep {
                name: decl.name.clone(),
                limit: MAX_NESTING_DEPTH,
            });
        }
        check_structure(children, child_in_record, depth + 1, file)?;
    }
    Ok(())
}

/// Why a declaration is passed over before any record is built
///
/// Annotated declarations are never skipped.
pub fn skip_reason(
    decl: &Decl,
    annotated: bool,
    options: &AnalysisOptions,
    export_context: bool,
) -> Option<&'static str> {
    if annotated {
        return None;
    }
    if decl.implicit {
        return Some("implicit");
    }
    if matches!(
        decl.kind,
        DeclKind::Record {
            is_specialization: true,
            ..
        }
    ) && !options.allow_specializations
    {
        return Some("specialization");
    }
    if decl.name.trim().is_empty() && !export_context {
        return Some("anonymous");
    }
    if decl
        .location
        .as_ref()
        .is_some_and(|location| options.is_ignored_path(&location.file))
    {
        return Some("ignored-path");
    }
    None
}

// =============================================================================
// CONTEXT - Accumulated state of one run
// =============================================================================

/// A record type known in the unit
#[derive(Debug, Clone)]
pub(crate) struct TypeEntry<'u> {
    pub decl: &'u Decl,
    pub qualified: String,
    pub script_name: String,
    pub annotated: bool,
    /// Names of the enclosing scopes, outermost first
    pub scope: Vec<String>,
}

#[derive(Debug)]
pub(crate) struct Context<'u> {
    pub records: Vec<ExportRecord>,
    pub diagnostics: Vec<Diagnostic>,
    pub identities: AHashSet<RecordIdentity>,
    /// Canonical types of exported container instantiations
    pub containers: AHashSet<String>,
    /// Script names taken by containers
    pub container_names: AHashSet<String>,
    /// Qualified record name -> type entry, built before the walk
    pub types: AHashMap<String, TypeEntry<'u>>,
    /// Integer constants evaluated so far, by simple and qualified name
    pub constants: AHashMap<String, i64>,
    pub sequence: Sequence,
}

impl Default for Context<'_> {
    fn default() -> Self {
        Context {
            records: Vec::new(),
            diagnostics: Vec::new(),
            identities: AHashSet::new(),
            containers: AHashSet::new(),
            container_names: AHashSet::new(),
            types: AHashMap::new(),
            constants: AHashMap::new(),
            // Collision qualifiers start at 2: `IntVector`, `IntVector2`, ...
            sequence: Sequence::starting_at(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScopeKind {
    Namespace,
    Module,
    Record,
}

#[derive(Debug, Clone)]
pub(crate) struct Scope {
    pub name: String,
    pub qualified: String,
    pub kind: ScopeKind,
    /// Script name of an annotated namespace or module, or the explicit
    /// namespace of an exported class
    pub script_name: Option<String>,
    pub exported: bool,
}

// =============================================================================
// WALKER
// =============================================================================

pub(crate) struct Walker<'u, S> {
    pub(crate) unit: &'u TranslationUnit,
    pub(crate) options: &'u AnalysisOptions,
    pub(crate) parser: AnnotationParser,
    pub(crate) sink: S,
    pub(crate) ctx: Context<'u>,
    pub(crate) scopes: Vec<Scope>,
}

impl<'u, S: DiagnosticsSink> Walker<'u, S> {
    fn finish(mut self) -> UnitExports {
        info!(
            "Analyzed {}: {} records, {} diagnostics",
            self.unit.file_path,
            self.ctx.records.len(),
            self.ctx.diagnostics.len()
        );
        if S::ENABLED {
            self.sink.event(&TraversalEvent::UnitFinished {
                file: &self.unit.file_path,
                records: self.ctx.records.len(),
                diagnostics: self.ctx.diagnostics.len(),
            });
        }

        UnitExports {
            file_path: self.unit.file_path.clone(),
            records: self.ctx.records,
            diagnostics: self.ctx.diagnostics,
        }
    }

    // -------------------------------------------------------------------------
    // Type index
    // -------------------------------------------------------------------------

    fn index_types(&mut self, decls: &'u [Decl], scope: &mut Vec<String>) {
        for decl in decls {
            let children = match &decl.kind {
                DeclKind::Namespace { decls } => decls,
                DeclKind::Record { members, .. } => {
                    self.index_record(decl, scope);
                    members
                }
                _ => continue,
            };
            scope.push(scope_name(&decl.name).to_string());
            self.index_types(children, scope);
            scope.pop();
        }
    }

    fn index_record(&mut self, decl: &'u Decl, scope: &[String]) {
        if decl.name.trim().is_empty() {
            return;
        }
        let parsed = self.parser.parse_all(&decl.annotations);
        let annotation = parsed.annotation.filter(|a| a.kind.is_class());
        if parsed.ignored || skip_reason(decl, annotation.is_some(), self.options, true).is_some() {
            return;
        }

        let qualified = join_scope(scope, &decl.name);
        let entry = TypeEntry {
            decl,
            qualified: qualified.clone(),
            script_name: naming::script_name(&decl.name, annotation.as_ref().and_then(Annotation::alias)),
            annotated: annotation.is_some(),
            scope: scope.to_vec(),
        };

        match self.ctx.types.get_mut(&qualified) {
            // Forward declaration followed by the definition
            Some(existing) => {
                existing.annotated |= entry.annotated;
                if existing.decl.children().is_empty() && !decl.children().is_empty() {
                    existing.decl = decl;
                }
            }
            None => {
                self.ctx.types.insert(qualified, entry);
            }
        }
    }

    /// Resolve a spelled type name the way C++ name lookup would from `scope`
    ///
    /// Tries the name as written, then qualified by each enclosing scope from
    /// the innermost outwards, then a unique match on the simple name.
    pub(crate) fn lookup_type(&self, name: &str, scope: &[String]) -> Option<TypeEntry<'u>> {
        let name = canonicalize_spelling(name);
        if let Some(entry) = self.ctx.types.get(&name) {
            return Some(entry.clone());
        }
        for depth in (1..=scope.len()).rev() {
            let candidate = join_scope(&scope[..depth], &name);
            if let Some(entry) = self.ctx.types.get(&candidate) {
                return Some(entry.clone());
            }
        }

        let simple = name.rsplit("::").next().unwrap_or(name.as_str());
        let mut matches = self
            .ctx
            .types
            .values()
            .filter(|entry| entry.decl.name == simple);
        match (matches.next(), matches.next()) {
            (Some(entry), None) => Some(entry.clone()),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Walk
    // -------------------------------------------------------------------------

    pub(crate) fn walk(&mut self, decls: &'u [Decl]) {
        for decl in decls {
            self.visit(decl);
        }
    }

    fn visit(&mut self, decl: &'u Decl) {
        let parsed = self.parser.parse_all(&decl.annotations);
        if S::ENABLED {
            self.sink.event(&TraversalEvent::DeclarationVisited {
                kind: decl.kind.as_str(),
                name: &decl.name,
            });
        }
        self.report_issues(&parsed.issues, decl);

        if parsed.ignored && parsed.annotation.is_none() {
            self.skipped(decl, "ignored");
            return;
        }
        if let Some(reason) = skip_reason(
            decl,
            parsed.annotation.is_some(),
            self.options,
            self.in_export_context(),
        ) {
            self.skipped(decl, reason);
            // Annotated declarations inside a skipped scope are still exported
            match &decl.kind {
                DeclKind::Namespace { decls } => {
                    self.push_scope(&decl.name, ScopeKind::Namespace, None, false);
                    self.walk(decls);
                    self.pop_scope();
                }
                DeclKind::Record { .. } => self.visit_record(decl, None),
                _ => {}
            }
            return;
        }

        let annotation = self.applicable(parsed.annotation, decl);
        match &decl.kind {
            DeclKind::Namespace { decls } => self.visit_namespace(decl, annotation.as_ref(), decls),
            DeclKind::Record { .. } => self.visit_record(decl, annotation.as_ref()),
            DeclKind::Function(callable) => {
                if let Some(annotation) = &annotation {
                    self.export_function(decl, callable, annotation);
                }
            }
            DeclKind::Variable { ty, is_const, init } => {
                if let Some(annotation) = &annotation {
                    self.export_variable(decl, ty, *is_const, init.as_deref(), annotation);
                }
            }
            DeclKind::Enum { enumerators, is_scoped } => {
                if let Some(annotation) = &annotation {
                    self.export_enum(decl, enumerators, *is_scoped, annotation);
                }
            }
            DeclKind::TypeAlias { target } => {
                if let Some(annotation) = &annotation {
                    self.export_type_alias(decl, target, annotation);
                }
            }
            // Rejected by `Driver::new` outside records; members go through the resolver
            DeclKind::Method(_) | DeclKind::Constructor(_) | DeclKind::Destructor | DeclKind::Field { .. } => {
                debug!("Member '{}' reached the declaration walk", decl.name);
            }
        }
    }

    /// Visit nested type declarations of a record (members are handled by the resolver)
    pub(crate) fn visit_nested(&mut self, members: &'u [Decl]) {
        for member in members.iter().filter(|m| !m.kind.is_member_only()) {
            self.visit(member);
        }
    }

    fn visit_namespace(&mut self, decl: &'u Decl, annotation: Option<&Annotation>, decls: &'u [Decl]) {
        let mut kind = ScopeKind::Namespace;
        let mut script_name = None;

        if let Some(annotation) = annotation {
            let export_kind = if annotation.kind == AnnotationKind::Module {
                kind = ScopeKind::Module;
                ExportKind::Module
            } else {
                ExportKind::Namespace
            };
            let record = self.new_record(export_kind, decl, &decl.name, Some(annotation));
            script_name = Some(record.script_name.clone());
            self.emit(record);
        }

        self.push_scope(&decl.name, kind, script_name, annotation.is_some());
        self.walk(decls);
        self.pop_scope();
    }

    fn visit_record(&mut self, decl: &'u Decl, annotation: Option<&Annotation>) {
        match annotation {
            Some(annotation) => self.export_class(decl, annotation),
            None => self.export_explicit_members(decl),
        }
    }

    // -------------------------------------------------------------------------
    // Annotations and diagnostics
    // -------------------------------------------------------------------------

    /// Keep the annotation only if its kind can describe the declaration
    pub(crate) fn applicable(&mut self, annotation: Option<Annotation>, decl: &Decl) -> Option<Annotation> {
        let annotation = annotation?;
        if annotation.kind.applies_to(&decl.kind, &decl.name) {
            return Some(annotation);
        }
        self.report(
            DiagnosticKind::MalformedAttribute,
            format!(
                "export kind '{}' does not apply to {} '{}'",
                annotation.kind,
                decl.kind.as_str(),
                display_name(&decl.name)
            ),
            decl.location.as_ref(),
        );
        None
    }

    pub(crate) fn report_issues(&mut self, issues: &[AnnotationIssue], decl: &Decl) {
        for issue in issues {
            self.report(
                issue.kind,
                format!("{} on '{}'", issue.message, display_name(&decl.name)),
                decl.location.as_ref(),
            );
        }
    }

    pub(crate) fn report(&mut self, kind: DiagnosticKind, message: String, location: Option<&SourceLocation>) {
        debug!("[{}] {}", kind.as_str(), message);
        if S::ENABLED {
            self.sink.event(&TraversalEvent::DiagnosticRecorded {
                kind: kind.as_str(),
                message: &message,
            });
        }
        self.ctx
            .diagnostics
            .push(Diagnostic::new(kind, message, location.cloned()));
    }

    pub(crate) fn skipped(&mut self, decl: &Decl, reason: &str) {
        debug!("Skipping {} '{}': {}", decl.kind.as_str(), display_name(&decl.name), reason);
        if S::ENABLED {
            self.sink.event(&TraversalEvent::DeclarationSkipped {
                name: &decl.name,
                reason,
            });
        }
    }

    // -------------------------------------------------------------------------
    // Records
    // -------------------------------------------------------------------------

    /// Record placed in the current scope, with alias, attributes and namespace applied
    pub(crate) fn new_record(
        &self,
        kind: ExportKind,
        decl: &Decl,
        name: &str,
        annotation: Option<&Annotation>,
    ) -> ExportRecord {
        let mut record = ExportRecord::new(kind, name, self.qualified(name));
        record.script_name = naming::script_name(name, annotation.and_then(Annotation::alias));
        record.source_location = decl.location.clone();
        record.file_path = self.unit.file_path.clone();
        if let Some(annotation) = annotation {
            record.attributes = annotation.attributes.clone();
        }
        record.namespace_name = self.namespace_for(annotation);
        record.module_name = self.module_for();
        record.owner_type = self.owner().unwrap_or_default();
        record
    }

    /// Add a record to the result
    ///
    /// Invalid records are dropped with a diagnostic; a record whose identity
    /// was already emitted is a redeclaration and collapses silently.
    pub(crate) fn emit(&mut self, record: ExportRecord) -> bool {
        if !record.is_valid() {
            self.report(
                DiagnosticKind::InvalidRecord,
                format!(
                    "{} '{}' has no resolvable qualified name and was dropped",
                    record.kind,
                    display_name(&record.name)
                ),
                record.source_location.as_ref(),
            );
            return false;
        }
        if !self.ctx.identities.insert(record.identity()) {
            debug!(
                "Collapsing redeclaration of {} {}",
                record.kind, record.qualified_name
            );
            return false;
        }

        if S::ENABLED {
            self.sink.event(&TraversalEvent::RecordEmitted {
                kind: record.kind.as_str(),
                qualified_name: &record.qualified_name,
            });
        }
        debug!("Emitting {} {}", record.kind, record.qualified_name);
        self.ctx.records.push(record);
        true
    }

    /// Canonical text of a type, reporting it when it had to be sanitized
    pub(crate) fn type_text(&mut self, ty: &TypeRef, decl: &Decl) -> String {
        let rendered = canonical(ty);
        if !rendered.resolved {
            self.report(
                DiagnosticKind::UnresolvedType,
                format!(
                    "type used by '{}' could not be resolved, using '{}'",
                    display_name(&decl.name),
                    rendered.text
                ),
                decl.location.as_ref(),
            );
        }
        if S::ENABLED {
            self.sink.type_seen(&rendered.text);
        }
        rendered.text
    }

    pub(crate) fn variable_access(annotation: Option<&Annotation>, is_const: bool) -> AccessType {
        annotation
            .and_then(Annotation::access)
            .unwrap_or(if is_const {
                AccessType::ReadOnly
            } else {
                AccessType::ReadWrite
            })
    }

    // -------------------------------------------------------------------------
    // Scopes
    // -------------------------------------------------------------------------

    pub(crate) fn push_scope(&mut self, name: &str, kind: ScopeKind, script_name: Option<String>, exported: bool) {
        let name = scope_name(name).to_string();
        let qualified = match self.scopes.last() {
            Some(parent) => format!("{}::{}", parent.qualified, name),
            None => name.clone(),
        };
        self.scopes.push(Scope {
            name,
            qualified,
            kind,
            script_name,
            exported,
        });
    }

    pub(crate) fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Fully scoped name of a declaration in the current scope, empty when unnamed
    pub(crate) fn qualified(&self, name: &str) -> String {
        let name = name.trim();
        if name.is_empty() {
            return String::new();
        }
        match self.scopes.last() {
            Some(scope) => format!("{}::{}", scope.qualified, name),
            None => name.to_string(),
        }
    }

    pub(crate) fn scope_path(&self) -> Vec<String> {
        self.scopes.iter().map(|scope| scope.name.clone()).collect()
    }

    fn in_export_context(&self) -> bool {
        self.scopes.iter().any(|scope| scope.exported)
    }

    /// Qualified name of the innermost enclosing record
    fn owner(&self) -> Option<String> {
        self.scopes
            .iter()
            .rev()
            .find(|scope| scope.kind == ScopeKind::Record)
            .map(|scope| scope.qualified.clone())
    }

    /// Script namespace: explicit `namespace=`, else the nearest enclosing
    /// scope that places its contents (annotated namespace or module, or a
    /// class with `namespace=`), else global (empty)
    pub(crate) fn namespace_for(&self, annotation: Option<&Annotation>) -> String {
        if let Some(namespace) = annotation.and_then(Annotation::namespace) {
            return namespace.to_string();
        }
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.script_name.clone())
            .unwrap_or_default()
    }

    fn module_for(&self) -> String {
        self.scopes
            .iter()
            .rev()
            .filter(|scope| scope.kind == ScopeKind::Module)
            .find_map(|scope| scope.script_name.clone())
            .unwrap_or_default()
    }
}

/// Records only expose public bases
pub(crate) fn is_public(access: Access) -> bool {
    access == Access::Public
}

fn scope_name(name: &str) -> &str {
    let name = name.trim();
    if name.is_empty() {
        ANONYMOUS_SCOPE
    } else {
        name
    }
}

fn join_scope(scope: &[String], name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}::{}", scope.join("::"), name)
    }
}

pub(crate) fn display_name(name: &str) -> &str {
    if name.trim().is_empty() {
        ANONYMOUS_SCOPE
    } else {
        name
    }
}
