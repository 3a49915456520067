use crate::{
    ast::Field,
    parser::Spanning,
    validation::{ValidatorContext, Visitor},
};

pub struct ScalarLeafs;

pub fn factory() -> ScalarLeafs {
    ScalarLeafs
}

impl<'a> Visitor<'a> for ScalarLeafs {
    fn enter_field(&mut self, ctx: &mut ValidatorContext<'a>, field: &'a Spanning<Field>) {
        let Some(field_type) = ctx.current_type() else {
            return;
        };
        let type_display = ctx
            .current_type_literal()
            .map_or_else(|| field_type.name().to_string(), ToString::to_string);

        let field_name = &field.item.name.item;
        let has_sub_selection = field.item.selection_set.is_some();

        if field_type.is_leaf() && has_sub_selection {
            ctx.report_error(
                &leaf_selection_message(field_name, &type_display),
                &[field.span.start],
            );
        } else if field_type.is_composite() && !has_sub_selection {
            ctx.report_error(
                &missing_selection_message(field_name, &type_display),
                &[field.span.start],
            );
        }
    }
}

fn leaf_selection_message(field_name: &str, type_name: &str) -> String {
    format!(r#"Field "{field_name}" of leaf type "{type_name}" cannot have a sub-selection"#)
}

fn missing_selection_message(field_name: &str, type_name: &str) -> String {
    format!(r#"Field "{field_name}" of composite type "{type_name}" must have a sub-selection"#)
}
