use crate::{
    ast::VariableDefinition,
    parser::Spanning,
    validation::{ValidatorContext, Visitor},
};

pub struct VariablesAreInputTypes;

pub fn factory() -> VariablesAreInputTypes {
    VariablesAreInputTypes
}

impl<'a> Visitor<'a> for VariablesAreInputTypes {
    fn enter_variable_definition(
        &mut self,
        ctx: &mut ValidatorContext<'a>,
        (var_name, var_def): &'a (Spanning<String>, VariableDefinition),
    ) {
        // Unknown names are the known-type-names rule's to report.
        let Some(meta) = ctx
            .schema
            .concrete_type_by_name(var_def.var_type.item.innermost_name())
        else {
            return;
        };

        if !meta.is_input() {
            let declared = var_def.var_type.item.to_string();
            ctx.report_error(
                &error_message(&var_name.item, &declared),
                &[var_def.var_type.span.start],
            );
        }
    }
}

fn error_message(var_name: &str, var_type: &str) -> String {
    format!(r#"Variable "${var_name}" must be declared with an input type, not "{var_type}""#)
}
