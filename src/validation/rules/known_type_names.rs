use crate::{
    ast::{Fragment, InlineFragment, VariableDefinition},
    parser::{SourcePosition, Spanning},
    validation::{ValidatorContext, Visitor},
};

pub struct KnownTypeNames;

pub fn factory() -> KnownTypeNames {
    KnownTypeNames
}

impl<'a> Visitor<'a> for KnownTypeNames {
    fn enter_inline_fragment(
        &mut self,
        ctx: &mut ValidatorContext<'a>,
        fragment: &'a Spanning<InlineFragment>,
    ) {
        if let Some(type_cond) = &fragment.item.type_condition {
            report_if_unknown(ctx, &type_cond.item, type_cond.span.start);
        }
    }

    fn enter_fragment_definition(
        &mut self,
        ctx: &mut ValidatorContext<'a>,
        fragment: &'a Spanning<Fragment>,
    ) {
        let type_cond = &fragment.item.type_condition;
        report_if_unknown(ctx, &type_cond.item, type_cond.span.start);
    }

    fn enter_variable_definition(
        &mut self,
        ctx: &mut ValidatorContext<'a>,
        (_, var_def): &'a (Spanning<String>, VariableDefinition),
    ) {
        // Wrappers carry exactly one name, however deep the nesting.
        report_if_unknown(
            ctx,
            var_def.var_type.item.innermost_name(),
            var_def.var_type.span.start,
        );
    }
}

fn report_if_unknown(ctx: &mut ValidatorContext<'_>, type_name: &str, location: SourcePosition) {
    if ctx.schema.concrete_type_by_name(type_name).is_none() {
        ctx.report_error(&error_message(type_name), &[location]);
    }
}

fn error_message(type_name: &str) -> String {
    format!(r#"Type "{type_name}" is not defined in the schema"#)
}
