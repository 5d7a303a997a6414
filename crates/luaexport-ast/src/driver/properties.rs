use super::*;
use crate::naming::{accessor_role, AccessorRole};
use crate::tree::Callable;

/// What a member at a given position turns into
#[derive(Debug)]
pub(super) enum Slot<'u> {
    Member,
    /// Accessor folded into a property emitted elsewhere in the list
    Absorbed,
    Property(PropertySpec<'u>),
}

#[derive(Debug)]
pub(super) struct PropertySpec<'u> {
    pub name: String,
    /// First accessor in declaration order
    pub decl: &'u Decl,
    pub annotation: Annotation,
    pub getter: Option<&'u Decl>,
    pub setter: Option<&'u Decl>,
    pub access: AccessType,
    pub is_static: bool,
}

/// Annotation state of one member, parsed once per member list
#[derive(Debug)]
pub(super) struct MemberInfo {
    pub annotation: Option<Annotation>,
    pub ignored: bool,
    /// Marked, but with an annotation that was unknown or did not apply
    pub rejected: bool,
}

impl MemberInfo {
    pub fn placeholder() -> Self {
        Self {
            annotation: None,
            ignored: false,
            rejected: false,
        }
    }

    /// Never exported, not even through an auto-exporting owner
    pub fn excluded(&self) -> bool {
        self.ignored || self.rejected
    }
}

struct Shape {
    role: AccessorRole,
    logical: String,
    /// Names the opposite accessor may have
    partners: Vec<String>,
}

/// Role of a method from its name and signature
///
/// `getLevel()`/`isAlive()`/`setLevel(x)` use the prefix convention. A
/// method without a prefix (`level()`/`level(x)`) is classified by signature
/// alone and pairs with an overload of the same name.
fn accessor_shape(decl: &Decl, callable: &Callable) -> Option<Shape> {
    let by_signature = if callable.params.is_empty() && !callable.return_type.is_void() {
        AccessorRole::Getter
    } else if callable.params.len() == 1 {
        AccessorRole::Setter
    } else {
        return None;
    };

    match accessor_role(&decl.name) {
        Some((role, logical)) => {
            if role != by_signature {
                return None;
            }
            let prefix_len = if decl.name.starts_with("is") { 2 } else { 3 };
            let rest = &decl.name[prefix_len..];
            let partners = match role {
                AccessorRole::Getter => vec![format!("set{}", rest)],
                AccessorRole::Setter => vec![format!("get{}", rest), format!("is{}", rest)],
            };
            Some(Shape {
                role,
                logical,
                partners,
            })
        }
        None => Some(Shape {
            role: by_signature,
            logical: decl.name.clone(),
            partners: vec![decl.name.clone()],
        }),
    }
}

/// Type a property accessor reads or writes
fn accessor_value_type(decl: &Decl) -> Option<&TypeRef> {
    let DeclKind::Method(callable) = &decl.kind else {
        return None;
    };
    match callable.params.first() {
        Some(param) => Some(&param.ty),
        None => Some(&callable.return_type),
    }
}

impl<'u, S: DiagnosticsSink> Walker<'u, S> {
    /// Decide which members of a list form properties
    ///
    /// Only accessors annotated `property` start a property; the opposite
    /// accessor is looked up by exact name on the same member list and is
    /// absorbed whether or not it is annotated. An explicit `access=` is
    /// authoritative over what the pair would infer.
    pub(super) fn plan_properties(
        &mut self,
        owner: &str,
        members: &'u [Decl],
        infos: &[MemberInfo],
        report: bool,
    ) -> Vec<Slot<'u>> {
        let mut slots: Vec<Slot<'u>> = members.iter().map(|_| Slot::Member).collect();
        let mut formed: AHashSet<String> = AHashSet::new();
        let mut unpaired: AHashSet<usize> = AHashSet::new();

        for (idx, member) in members.iter().enumerate() {
            let info = &infos[idx];
            if info.excluded() || !matches!(slots[idx], Slot::Member) || unpaired.contains(&idx) {
                continue;
            }
            let Some(annotation) = info
                .annotation
                .as_ref()
                .filter(|a| a.kind == AnnotationKind::Property)
            else {
                continue;
            };
            let DeclKind::Method(callable) = &member.kind else {
                continue;
            };
            let Some(shape) = accessor_shape(member, callable) else {
                if report {
                    self.report(
                        DiagnosticKind::MalformedAttribute,
                        format!(
                            "'{}' is annotated as a property but is neither a getter nor a setter",
                            member.name
                        ),
                        member.location.as_ref(),
                    );
                }
                continue;
            };
            if !formed.insert(shape.logical.clone()) {
                if report {
                    self.report(
                        DiagnosticKind::DuplicateMember,
                        format!(
                            "property '{}' of {} is declared more than once, '{}' dropped",
                            shape.logical, owner, member.name
                        ),
                        member.location.as_ref(),
                    );
                }
                slots[idx] = Slot::Absorbed;
                continue;
            }

            let partner = find_partner(members, infos, &slots, idx, callable, &shape);

            let (mut getter, mut setter) = match shape.role {
                AccessorRole::Getter => (Some(member), None),
                AccessorRole::Setter => (None, Some(member)),
            };
            let mut first = idx;

            if let Some(partner_idx) = partner {
                let other = &members[partner_idx];
                let (getter_decl, setter_decl) = match shape.role {
                    AccessorRole::Getter => (member, other),
                    AccessorRole::Setter => (other, member),
                };
                let read = accessor_value_type(getter_decl).map(|ty| canonical(ty).text);
                let written = accessor_value_type(setter_decl).map(|ty| canonical(ty).text);

                if read == written {
                    getter = Some(getter_decl);
                    setter = Some(setter_decl);
                    slots[partner_idx] = Slot::Absorbed;
                    first = idx.min(partner_idx);
                } else {
                    if report {
                        self.report(
                            DiagnosticKind::PropertyMismatch,
                            format!(
                                "'{}' returns {} but '{}' takes {}, property '{}' of {} is not paired",
                                getter_decl.name,
                                read.unwrap_or_default(),
                                setter_decl.name,
                                written.unwrap_or_default(),
                                shape.logical,
                                owner
                            ),
                            member.location.as_ref(),
                        );
                    }
                    unpaired.insert(partner_idx);
                }
            }

            let access = annotation.access().unwrap_or(match (getter.is_some(), setter.is_some()) {
                (true, true) => AccessType::ReadWrite,
                (true, false) => AccessType::ReadOnly,
                _ => AccessType::WriteOnly,
            });
            let spec = PropertySpec {
                name: shape.logical,
                decl: &members[first],
                annotation: annotation.clone(),
                getter,
                setter,
                access,
                is_static: callable.is_static,
            };
            if first != idx {
                slots[idx] = Slot::Absorbed;
            }
            slots[first] = Slot::Property(spec);
        }

        slots
    }

    pub(super) fn property_record(&mut self, spec: &PropertySpec<'u>) -> ExportRecord {
        let mut record = self.new_record(ExportKind::Property, spec.decl, &spec.name, Some(&spec.annotation));
        // Accessors the access type excludes are absorbed but not exposed
        record.getter = spec
            .getter
            .filter(|_| spec.access.is_readable())
            .map(|decl| decl.name.clone());
        record.setter = spec
            .setter
            .filter(|_| spec.access.is_writable())
            .map(|decl| decl.name.clone());

        let value_type = spec
            .getter
            .or(spec.setter)
            .and_then(accessor_value_type);
        if let Some(ty) = value_type {
            record.value_type = Some(self.type_text(ty, spec.decl));
        }
        record.access_type = spec.access;
        record.is_static = spec.is_static;
        record
    }

    /// Data member exposed as a property, or as a constant when static const
    pub(super) fn field_record(
        &mut self,
        decl: &'u Decl,
        ty: &TypeRef,
        is_static: bool,
        is_const: bool,
        init: Option<&str>,
        annotation: Option<&Annotation>,
    ) -> ExportRecord {
        let as_constant = match annotation {
            Some(annotation) => annotation.kind == AnnotationKind::Constant,
            None => is_static && is_const,
        };
        if as_constant {
            let mut record = self.constant_record(decl, ty, init, annotation);
            record.is_static = is_static;
            return record;
        }

        let mut record = self.new_record(ExportKind::Property, decl, &decl.name, annotation);
        record.value_type = Some(self.type_text(ty, decl));
        record.access_type = Self::variable_access(annotation, is_const);
        record.is_static = is_static;
        record.is_const = is_const;
        record
    }
}

fn find_partner(
    members: &[Decl],
    infos: &[MemberInfo],
    slots: &[Slot<'_>],
    idx: usize,
    callable: &Callable,
    shape: &Shape,
) -> Option<usize> {
    members.iter().enumerate().find_map(|(candidate_idx, candidate)| {
        if candidate_idx == idx
            || infos[candidate_idx].excluded()
            || !matches!(slots[candidate_idx], Slot::Member)
            || !shape.partners.iter().any(|name| *name == candidate.name)
        {
            return None;
        }
        if !is_public(candidate.access) && infos[candidate_idx].annotation.is_none() {
            return None;
        }
        let DeclKind::Method(other) = &candidate.kind else {
            return None;
        };
        if other.is_deleted || other.is_static != callable.is_static {
            return None;
        }
        let other_shape = accessor_shape(candidate, other)?;
        (other_shape.role != shape.role).then_some(candidate_idx)
    })
}
