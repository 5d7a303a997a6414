use super::*;
use crate::types::{container_of, function_signature};
use luaexport_manifest::ContainerKind;

impl<'u, S: DiagnosticsSink> Walker<'u, S> {
    /// Type alias annotated as `callback`, `vector` or `map`
    pub(super) fn export_type_alias(&mut self, decl: &'u Decl, target: &TypeRef, annotation: &Annotation) {
        match annotation.kind {
            AnnotationKind::Callback => self.export_callback(decl, target, annotation),
            AnnotationKind::Vector => self.export_container(decl, target, annotation, ContainerKind::Vector),
            AnnotationKind::Map => self.export_container(decl, target, annotation, ContainerKind::Map),
            other => debug!("Export kind '{}' ignored on type alias '{}'", other, decl.name),
        }
    }

    fn export_callback(&mut self, decl: &'u Decl, target: &TypeRef, annotation: &Annotation) {
        let Some((ret, params)) = function_signature(target) else {
            self.report(
                DiagnosticKind::MalformedAttribute,
                format!(
                    "callback '{}' does not alias a function type",
                    display_name(&decl.name)
                ),
                decl.location.as_ref(),
            );
            return;
        };

        let mut record = self.new_record(ExportKind::TypeConverter, decl, &decl.name, Some(annotation));
        record.return_type = Some(self.type_text(ret, decl));
        for (idx, param) in params.iter().enumerate() {
            let ty = self.type_text(param, decl);
            record.parameter_types.push(ty);
            record.parameter_names.push(format!("arg{}", idx));
        }
        record.value_type = Some(self.type_text(target, decl));
        self.emit(record);
    }

    /// One `Container` record per distinct instantiation
    ///
    /// The alias is used verbatim when present. Otherwise the name is generated
    /// from the element types and a collision gets a numeric qualifier.
    /// An aliased container is a named view keyed by its alias declaration, so
    /// the same instantiation may be exported under several aliases.
    fn export_container(
        &mut self,
        decl: &'u Decl,
        target: &TypeRef,
        annotation: &Annotation,
        expected: ContainerKind,
    ) {
        let Some((detected, elements)) = container_of(target, &self.options.containers) else {
            self.report(
                DiagnosticKind::MalformedAttribute,
                format!(
                    "{} container '{}' does not alias a template instantiation",
                    annotation.kind,
                    display_name(&decl.name)
                ),
                decl.location.as_ref(),
            );
            return;
        };

        let (kind, elements) = match detected {
            ContainerKind::Other => trust_annotation(expected, elements),
            detected if detected != expected => {
                self.report(
                    DiagnosticKind::MalformedAttribute,
                    format!(
                        "'{}' is annotated as {} but aliases a {} container",
                        display_name(&decl.name),
                        annotation.kind,
                        detected.suffix().to_lowercase()
                    ),
                    decl.location.as_ref(),
                );
                (detected, elements)
            }
            detected => (detected, elements),
        };

        let instantiation = self.type_text(target, decl);
        let aliased = annotation.alias().is_some();
        if !aliased && self.ctx.containers.contains(&instantiation) {
            self.report(
                DiagnosticKind::DuplicateContainer,
                format!(
                    "container {} is already exported, '{}' dropped",
                    instantiation,
                    display_name(&decl.name)
                ),
                decl.location.as_ref(),
            );
            return;
        }

        let script_name = match annotation.alias() {
            Some(alias) => {
                let alias = alias.trim().to_string();
                if self.ctx.container_names.contains(&alias) {
                    self.report(
                        DiagnosticKind::NameCollision,
                        format!(
                            "container alias '{}' for {} is already taken, record dropped",
                            alias, instantiation
                        ),
                        decl.location.as_ref(),
                    );
                    return;
                }
                alias
            }
            None => {
                let generated = naming::container_default_name(kind, elements, &self.options.containers);
                self.unique_container_name(generated, &instantiation, decl)
            }
        };

        // Unaliased identity is the instantiation, not the alias declaration
        let mut record = self.new_record(ExportKind::Container, decl, &decl.name, Some(annotation));
        if !aliased {
            record.qualified_name = instantiation.clone();
        }
        record.script_name = script_name.clone();
        record.container = Some(kind);
        for element in elements {
            let ty = self.type_text(element, decl);
            record.element_types.push(ty);
        }

        if self.emit(record) {
            if !aliased {
                self.ctx.containers.insert(instantiation);
            }
            self.ctx.container_names.insert(script_name);
        }
    }

    fn unique_container_name(&mut self, generated: String, instantiation: &str, decl: &Decl) -> String {
        if !self.ctx.container_names.contains(&generated) {
            return generated;
        }
        let mut candidate = format!("{}{}", generated, self.ctx.sequence.next_value());
        while self.ctx.container_names.contains(&candidate) {
            candidate = format!("{}{}", generated, self.ctx.sequence.next_value());
        }
        self.report(
            DiagnosticKind::NameCollision,
            format!(
                "generated name '{}' for {} collides with another container, using '{}'",
                generated, instantiation, candidate
            ),
            decl.location.as_ref(),
        );
        candidate
    }
}

/// Element types of an unrecognized template, read the way the annotation says
fn trust_annotation(expected: ContainerKind, args: &[TypeRef]) -> (ContainerKind, &[TypeRef]) {
    match expected {
        ContainerKind::Vector if !args.is_empty() => (ContainerKind::Vector, &args[..1]),
        ContainerKind::Map if args.len() >= 2 => (ContainerKind::Map, &args[..2]),
        _ => (ContainerKind::Other, args),
    }
}
