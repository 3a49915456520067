use crate::{
    ast::Field,
    parser::Spanning,
    validation::{ValidatorContext, Visitor},
};

pub struct FieldsOnCorrectType;

pub fn factory() -> FieldsOnCorrectType {
    FieldsOnCorrectType
}

impl<'a> Visitor<'a> for FieldsOnCorrectType {
    fn enter_field(&mut self, ctx: &mut ValidatorContext<'a>, field: &'a Spanning<Field>) {
        let Some(parent_type) = ctx.parent_type() else {
            return;
        };
        let field_name = &field.item.name;

        // `__typename` is selectable everywhere, unions included; it is
        // answered by the concrete object resolved at runtime.
        if field_name.item == "__typename"
            || parent_type.field_by_name(&field_name.item).is_some()
        {
            return;
        }

        ctx.report_error(
            &error_message(&field_name.item, parent_type.name()),
            &[field_name.span.start],
        );
    }
}

fn error_message(field: &str, type_name: &str) -> String {
    format!(r#"Field "{field}" does not exist on type "{type_name}""#)
}
