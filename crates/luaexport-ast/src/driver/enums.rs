use super::*;
use crate::eval::evaluate;
use crate::tree::EnumConstant;
use luaexport_manifest::Enumerator;

impl<'u, S: DiagnosticsSink> Walker<'u, S> {
    /// Enum record with every enumerator evaluated to a concrete value
    pub(super) fn export_enum(
        &mut self,
        decl: &'u Decl,
        enumerators: &[EnumConstant],
        is_scoped: bool,
        annotation: &Annotation,
    ) {
        let mut record = self.new_record(ExportKind::Enum, decl, &decl.name, Some(annotation));
        let mut values: AHashMap<String, i64> = AHashMap::new();
        let mut next: i64 = 0;

        for enumerator in enumerators {
            let expr = enumerator
                .init
                .as_deref()
                .map(str::trim)
                .filter(|expr| !expr.is_empty());

            let value = match expr {
                None => next,
                Some(expr) => {
                    let result = {
                        let constants = &self.ctx.constants;
                        evaluate(expr, |name| {
                            values
                                .get(name)
                                .or_else(|| constants.get(name))
                                .copied()
                        })
                    };
                    match result {
                        Ok(value) => value,
                        Err(err) => {
                            self.report(
                                DiagnosticKind::EnumEvaluation,
                                format!(
                                    "enumerator {}::{} = '{}' could not be evaluated ({}), using {}",
                                    display_name(&decl.name),
                                    enumerator.name,
                                    expr,
                                    err,
                                    next
                                ),
                                decl.location.as_ref(),
                            );
                            next
                        }
                    }
                }
            };

            values.insert(enumerator.name.clone(), value);
            next = value.saturating_add(1);
            record.enumerators.push(Enumerator::new(enumerator.name.as_str(), value));
        }

        // Unscoped enumerators are visible to later initializers in the enclosing scope
        let qualified_enum = record.qualified_name.clone();
        for item in &record.enumerators {
            self.ctx
                .constants
                .insert(format!("{}::{}", qualified_enum, item.name), item.value);
            if !is_scoped {
                self.ctx.constants.insert(item.name.clone(), item.value);
            }
        }

        self.emit(record);
    }

    /// Namespace-scope variable annotated as `constant` or `variable`
    pub(super) fn export_variable(
        &mut self,
        decl: &'u Decl,
        ty: &TypeRef,
        is_const: bool,
        init: Option<&str>,
        annotation: &Annotation,
    ) {
        let record = if annotation.kind == AnnotationKind::Constant {
            self.constant_record(decl, ty, init, Some(annotation))
        } else {
            let mut record = self.new_record(ExportKind::Property, decl, &decl.name, Some(annotation));
            record.value_type = Some(self.type_text(ty, decl));
            record.access_type = Self::variable_access(Some(annotation), is_const);
            record.is_const = is_const;
            record
        };
        self.emit(record);
    }

    /// Constant with its evaluated value, or the initializer verbatim when it
    /// is not an integer expression
    pub(super) fn constant_record(
        &mut self,
        decl: &'u Decl,
        ty: &TypeRef,
        init: Option<&str>,
        annotation: Option<&Annotation>,
    ) -> ExportRecord {
        let mut record = self.new_record(ExportKind::Constant, decl, &decl.name, annotation);
        record.value_type = Some(self.type_text(ty, decl));
        record.is_const = true;

        if let Some(init) = init.map(str::trim).filter(|init| !init.is_empty()) {
            let constants = &self.ctx.constants;
            match evaluate(init, |name| constants.get(name).copied()) {
                Ok(value) => {
                    record.value = Some(value.to_string());
                    self.ctx.constants.insert(decl.name.clone(), value);
                    self.ctx
                        .constants
                        .insert(record.qualified_name.clone(), value);
                }
                Err(_) => record.value = Some(init.to_string()),
            }
        }
        record
    }
}
