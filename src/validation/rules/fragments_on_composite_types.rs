use crate::{
    ast::{Fragment, InlineFragment},
    parser::Spanning,
    validation::{ValidatorContext, Visitor},
};

pub struct FragmentsOnCompositeTypes;

pub fn factory() -> FragmentsOnCompositeTypes {
    FragmentsOnCompositeTypes
}

impl<'a> Visitor<'a> for FragmentsOnCompositeTypes {
    fn enter_fragment_definition(
        &mut self,
        ctx: &mut ValidatorContext<'a>,
        f: &'a Spanning<Fragment>,
    ) {
        check_condition(ctx, Some(&f.item.name.item), &f.item.type_condition);
    }

    fn enter_inline_fragment(
        &mut self,
        ctx: &mut ValidatorContext<'a>,
        f: &'a Spanning<InlineFragment>,
    ) {
        if let Some(type_cond) = &f.item.type_condition {
            check_condition(ctx, None, type_cond);
        }
    }
}

/// Resolves the condition against the schema directly; conditions naming
/// unknown types are left for the known-type-names rule.
fn check_condition(
    ctx: &mut ValidatorContext<'_>,
    fragment_name: Option<&str>,
    type_cond: &Spanning<String>,
) {
    let Some(meta) = ctx.schema.concrete_type_by_name(&type_cond.item) else {
        return;
    };
    if !meta.is_composite() {
        let on_type = meta.name().to_string();
        ctx.report_error(
            &error_message(fragment_name, &on_type),
            &[type_cond.span.start],
        );
    }
}

fn error_message(fragment_name: Option<&str>, on_type: &str) -> String {
    match fragment_name {
        Some(name) => {
            format!(r#"Fragment "{name}" must condition on a composite type, not "{on_type}""#)
        }
        None => format!(r#"Inline fragments must condition on a composite type, not "{on_type}""#),
    }
}
