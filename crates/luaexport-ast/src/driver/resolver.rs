//! Class members and inheritance flattening
//!
//! An annotated record exports its own public members and then pulls in the
//! public members of every unannotated base, depth-first in base-list order,
//! with the derived type as owner. Annotated bases are bound by an `Inherit`
//! record instead and their members are never copied.

use super::properties::{MemberInfo, Slot};
use super::*;
use crate::tree::BaseSpec;

/// Attribute recording a class modifier on the `Class` record
const CLASS_KIND_ATTRIBUTE: &str = "class_kind";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ClassKind {
    Plain,
    Static,
    Singleton,
    Abstract,
}

impl ClassKind {
    fn of(kind: AnnotationKind, is_abstract: bool, members: &[Decl]) -> Self {
        let has_pure_method = members
            .iter()
            .any(|member| matches!(&member.kind, DeclKind::Method(callable) if callable.is_pure));
        match kind {
            AnnotationKind::StaticClass => ClassKind::Static,
            AnnotationKind::Singleton => ClassKind::Singleton,
            AnnotationKind::AbstractClass => ClassKind::Abstract,
            _ if is_abstract || has_pure_method => ClassKind::Abstract,
            _ => ClassKind::Plain,
        }
    }

    fn attribute(self) -> Option<&'static str> {
        match self {
            ClassKind::Plain => None,
            ClassKind::Static => Some("static_class"),
            ClassKind::Singleton => Some("singleton"),
            ClassKind::Abstract => Some("abstract_class"),
        }
    }

    fn allows_constructors(self) -> bool {
        self == ClassKind::Plain
    }
}

/// The record members are being exported onto
#[derive(Debug)]
pub(super) struct Owner {
    qualified: String,
    class_kind: ClassKind,
    /// Export public members without their own annotation
    auto: bool,
}

/// Where a member came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum MemberSource {
    Own,
    /// Declared on the unannotated base with this qualified name
    Inherited(String),
}

/// Member keys already emitted on an owner
type ExistingMembers = AHashMap<String, MemberSource>;

impl<'u, S: DiagnosticsSink> Walker<'u, S> {
    /// Annotated record: the `Class` record, its bindings and its members
    pub(super) fn export_class(&mut self, decl: &'u Decl, annotation: &Annotation) {
        let DeclKind::Record {
            bases,
            members,
            is_abstract,
            ..
        } = &decl.kind
        else {
            return;
        };

        // Base specifiers are looked up from the scope enclosing the record
        let scope = self.scope_path();
        let class_kind = ClassKind::of(annotation.kind, *is_abstract, members);

        let mut record = self.new_record(ExportKind::Class, decl, &decl.name, Some(annotation));
        for base in bases.iter().filter(|base| is_public(base.access)) {
            let name = match self.lookup_type(&base.name, &scope) {
                Some(entry) => entry.qualified,
                None => canonicalize_spelling(&base.name),
            };
            record.base_types.push(name);
        }
        if let Some(value) = class_kind.attribute() {
            record
                .attributes
                .entry(CLASS_KIND_ATTRIBUTE.to_string())
                .or_insert_with(|| value.to_string());
        }

        let valid = record.is_valid();
        let qualified = record.qualified_name.clone();
        // A redeclaration collapses here but still contributes its members
        self.emit(record);
        if !valid {
            return;
        }

        // Members and nested types follow an explicit class namespace
        let namespace = annotation.namespace().map(|ns| ns.to_string());
        self.push_scope(&decl.name, ScopeKind::Record, namespace, true);
        let owner = Owner {
            qualified: qualified.clone(),
            class_kind,
            auto: true,
        };

        let mut path = vec![qualified];
        self.export_inherits(&owner, decl, bases, &scope, &mut path);

        let mut existing = ExistingMembers::new();
        self.export_members(&owner, members, &MemberSource::Own, &mut existing);
        self.flatten_bases(&owner, bases, &scope, &mut path, &mut existing);

        self.visit_nested(members);
        self.pop_scope();
    }

    /// Unannotated record: only explicitly annotated members and nested types
    pub(super) fn export_explicit_members(&mut self, decl: &'u Decl) {
        let DeclKind::Record { members, .. } = &decl.kind else {
            return;
        };

        self.push_scope(&decl.name, ScopeKind::Record, None, false);
        let owner = Owner {
            qualified: self.owner().unwrap_or_default(),
            class_kind: ClassKind::Plain,
            auto: false,
        };
        let mut existing = ExistingMembers::new();
        self.export_members(&owner, members, &MemberSource::Own, &mut existing);
        self.visit_nested(members);
        self.pop_scope();
    }

    /// One `Inherit` record per annotated base, seen through unannotated ones
    fn export_inherits(
        &mut self,
        owner: &Owner,
        decl: &'u Decl,
        bases: &'u [BaseSpec],
        scope: &[String],
        path: &mut Vec<String>,
    ) {
        for base in bases.iter().filter(|base| is_public(base.access)) {
            let Some(entry) = self.lookup_type(&base.name, scope) else {
                debug!(
                    "Base '{}' of {} is not declared in this unit",
                    base.name, owner.qualified
                );
                continue;
            };
            if path.contains(&entry.qualified) {
                continue;
            }

            if entry.annotated {
                let mut record = self.new_record(ExportKind::Inherit, decl, &entry.qualified, None);
                record.script_name = entry.script_name.clone();
                record.qualified_name = format!("{} : {}", owner.qualified, entry.qualified);
                record.owner_type = owner.qualified.clone();
                record.base_types.push(entry.qualified.clone());
                self.emit(record);
            } else if let DeclKind::Record { bases: inner, .. } = &entry.decl.kind {
                path.push(entry.qualified.clone());
                self.export_inherits(owner, decl, inner, &entry.scope, path);
                path.pop();
            }
        }
    }

    /// Copy the members of unannotated bases onto the owner
    fn flatten_bases(
        &mut self,
        owner: &Owner,
        bases: &'u [BaseSpec],
        scope: &[String],
        path: &mut Vec<String>,
        existing: &mut ExistingMembers,
    ) {
        for base in bases.iter().filter(|base| is_public(base.access)) {
            let Some(entry) = self.lookup_type(&base.name, scope) else {
                continue;
            };
            if entry.annotated || path.contains(&entry.qualified) {
                continue;
            }
            let DeclKind::Record {
                bases: inner,
                members,
                ..
            } = &entry.decl.kind
            else {
                continue;
            };

            let source = MemberSource::Inherited(entry.qualified.clone());
            self.export_members(owner, members, &source, existing);

            path.push(entry.qualified.clone());
            self.flatten_bases(owner, inner, &entry.scope, path, existing);
            path.pop();
        }
    }

    fn export_members(
        &mut self,
        owner: &Owner,
        members: &'u [Decl],
        source: &MemberSource,
        existing: &mut ExistingMembers,
    ) {
        let own = *source == MemberSource::Own;

        let mut infos = Vec::with_capacity(members.len());
        for member in members {
            if !member.kind.is_member_only() {
                infos.push(MemberInfo::placeholder());
                continue;
            }
            let parsed = self.parser.parse_all(&member.annotations);
            let marked = parsed.is_marked() && !parsed.ignored;
            let annotation = if own {
                if S::ENABLED {
                    self.sink.event(&TraversalEvent::DeclarationVisited {
                        kind: member.kind.as_str(),
                        name: &member.name,
                    });
                }
                self.report_issues(&parsed.issues, member);
                self.applicable(parsed.annotation, member)
            } else {
                // Already reported when the base itself was walked
                parsed
                    .annotation
                    .filter(|a| a.kind.applies_to(&member.kind, &member.name))
            };
            infos.push(MemberInfo {
                ignored: parsed.ignored && annotation.is_none(),
                rejected: marked && annotation.is_none(),
                annotation,
            });
        }

        let slots = self.plan_properties(&owner.qualified, members, &infos, own);
        for ((member, info), slot) in members.iter().zip(&infos).zip(slots) {
            let record = match slot {
                Slot::Absorbed => continue,
                Slot::Property(spec) => Some(self.property_record(&spec)),
                Slot::Member if member.kind.is_member_only() => {
                    self.member_record(owner, member, info, source)
                }
                Slot::Member => continue,
            };
            if let Some(record) = record {
                self.add_member(owner, record, source, existing);
            }
        }
    }

    /// Record for a single member, or `None` when it is not exported
    fn member_record(
        &mut self,
        owner: &Owner,
        member: &'u Decl,
        info: &MemberInfo,
        source: &MemberSource,
    ) -> Option<ExportRecord> {
        if info.ignored {
            self.skipped(member, "ignored");
            return None;
        }
        if info.rejected {
            self.skipped(member, "rejected-annotation");
            return None;
        }
        let explicit = info.annotation.as_ref();
        if explicit.is_none() {
            if !owner.auto {
                return None;
            }
            if member.implicit {
                self.skipped(member, "implicit");
                return None;
            }
            if !is_public(member.access) {
                self.skipped(member, "non-public");
                return None;
            }
        }

        let static_only = owner.class_kind == ClassKind::Static && explicit.is_none();
        match &member.kind {
            DeclKind::Constructor(callable) => {
                let inherited = matches!(source, MemberSource::Inherited(_));
                if inherited || callable.is_deleted || !owner.class_kind.allows_constructors() {
                    self.skipped(member, "constructor");
                    return None;
                }
                Some(self.callable_record(ExportKind::Constructor, member, callable, explicit))
            }
            DeclKind::Method(callable) => {
                if callable.is_deleted {
                    self.skipped(member, "deleted");
                    return None;
                }
                if static_only && !callable.is_static {
                    self.skipped(member, "static-class");
                    return None;
                }
                let kind = Self::method_kind(member, callable);
                Some(self.callable_record(kind, member, callable, explicit))
            }
            DeclKind::Field {
                ty,
                is_static,
                is_const,
                init,
            } => {
                if static_only && !is_static {
                    self.skipped(member, "static-class");
                    return None;
                }
                Some(self.field_record(member, ty, *is_static, *is_const, init.as_deref(), explicit))
            }
            // Destructors are never exported
            _ => None,
        }
    }

    /// Emit a member unless the owner already has one with the same key
    ///
    /// Own members hide inherited ones, and a member of a more derived base
    /// hides the same member of a base further up. The same member reached
    /// twice, or from two unrelated bases, is reported.
    fn add_member(
        &mut self,
        owner: &Owner,
        record: ExportRecord,
        source: &MemberSource,
        existing: &mut ExistingMembers,
    ) {
        let key = if record.kind == ExportKind::Property {
            format!("property {}", record.name)
        } else {
            record.member_key()
        };

        let Some(previous) = existing.get(&key).cloned() else {
            if let MemberSource::Inherited(base) = source {
                if S::ENABLED {
                    self.sink.event(&TraversalEvent::MemberInherited {
                        owner: &owner.qualified,
                        base,
                        member: &record.name,
                    });
                }
            }
            existing.insert(key, source.clone());
            self.emit(record);
            return;
        };

        match (&previous, source) {
            (MemberSource::Own, MemberSource::Own) => {
                if record.kind == ExportKind::Property {
                    self.report(
                        DiagnosticKind::DuplicateMember,
                        format!(
                            "property '{}' of {} is declared more than once",
                            record.name, owner.qualified
                        ),
                        record.source_location.as_ref(),
                    );
                } else {
                    debug!("Collapsing redeclaration of {}", record.qualified_name);
                }
            }
            (MemberSource::Inherited(earlier), MemberSource::Inherited(base))
                if earlier == base || !self.derives_from(earlier, base) =>
            {
                self.report(
                    DiagnosticKind::DuplicateMember,
                    format!(
                        "'{}' reaches {} through more than one base ({} and {}), later copy dropped",
                        key, owner.qualified, earlier, base
                    ),
                    record.source_location.as_ref(),
                );
            }
            _ => debug!("'{}' on {} hides the inherited copy", key, owner.qualified),
        }
    }

    /// Whether `derived` has `base` among its transitive bases
    fn derives_from(&self, derived: &str, base: &str) -> bool {
        let mut pending = vec![derived.to_string()];
        let mut seen: AHashSet<String> = AHashSet::new();

        while let Some(current) = pending.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let Some(entry) = self.ctx.types.get(&current) else {
                continue;
            };
            let DeclKind::Record { bases, .. } = &entry.decl.kind else {
                continue;
            };
            for spec in bases {
                if let Some(parent) = self.lookup_type(&spec.name, &entry.scope) {
                    if parent.qualified == base {
                        return true;
                    }
                    pending.push(parent.qualified);
                }
            }
        }
        false
    }
}
