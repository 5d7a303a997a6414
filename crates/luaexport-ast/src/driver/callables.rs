use super::*;
use crate::tree::Callable;

impl<'u, S: DiagnosticsSink> Walker<'u, S> {
    /// One record per callable; overloads stay separate records
    pub(super) fn callable_record(
        &mut self,
        kind: ExportKind,
        decl: &'u Decl,
        callable: &Callable,
        annotation: Option<&Annotation>,
    ) -> ExportRecord {
        let mut record = self.new_record(kind, decl, &decl.name, annotation);

        if kind != ExportKind::Constructor {
            record.return_type = Some(self.type_text(&callable.return_type, decl));
        }
        for (idx, param) in callable.params.iter().enumerate() {
            let ty = self.type_text(&param.ty, decl);
            record.parameter_types.push(ty);
            let name = param.name.trim();
            record.parameter_names.push(if name.is_empty() {
                format!("arg{}", idx)
            } else {
                name.to_string()
            });
        }

        record.is_static = callable.is_static;
        record.is_const = callable.is_const;
        record.is_virtual = callable.is_virtual || callable.is_pure;
        record
    }

    /// Record kind of a member function
    pub(super) fn method_kind(decl: &Decl, callable: &Callable) -> ExportKind {
        if naming::operator_token(&decl.name).is_some() {
            ExportKind::Operator
        } else if callable.is_static {
            ExportKind::StaticMethod
        } else {
            ExportKind::Method
        }
    }

    /// Freestanding function
    ///
    /// An `operator` annotation yields an `Operator` record with no owner;
    /// a `function` annotation on an operator overload yields a plain
    /// `Function`. Neither is merged into the operand type's member operators.
    pub(super) fn export_function(&mut self, decl: &'u Decl, callable: &Callable, annotation: &Annotation) {
        if callable.is_deleted {
            self.skipped(decl, "deleted");
            return;
        }
        let kind = if annotation.kind == AnnotationKind::Operator {
            ExportKind::Operator
        } else {
            ExportKind::Function
        };
        let record = self.callable_record(kind, decl, callable, Some(annotation));
        self.emit(record);
    }
}
