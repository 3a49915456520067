//! Definitions of rules for validation.

mod executable_definitions;
mod fields_on_correct_type;
mod fragments_on_composite_types;
mod known_fragment_names;
mod known_type_names;
mod lone_anonymous_operation;
mod scalar_leafs;
mod unique_fragment_names;
mod unique_operation_names;
mod variables_are_input_types;

use crate::{
    ast::Document,
    validation::{visit, MultiVisitorNil, ValidatorContext},
};

#[doc(hidden)]
pub fn visit_all_rules<'a>(ctx: &mut ValidatorContext<'a>, doc: &'a Document) {
    let mut mv = MultiVisitorNil
        .with(self::executable_definitions::factory())
        .with(self::fields_on_correct_type::factory())
        .with(self::fragments_on_composite_types::factory())
        .with(self::known_fragment_names::factory())
        .with(self::known_type_names::factory())
        .with(self::lone_anonymous_operation::factory())
        .with(self::scalar_leafs::factory())
        .with(self::unique_fragment_names::factory())
        .with(self::unique_operation_names::factory())
        .with(self::variables_are_input_types::factory());
    visit(&mut mv, ctx, doc);
}
