use crate::{
    ast::{Definition, Document, Operation},
    parser::Spanning,
    validation::{ValidatorContext, Visitor},
};

pub struct LoneAnonymousOperation {
    multiple_operations: bool,
}

pub fn factory() -> LoneAnonymousOperation {
    LoneAnonymousOperation {
        multiple_operations: false,
    }
}

impl<'a> Visitor<'a> for LoneAnonymousOperation {
    fn enter_document(&mut self, _: &mut ValidatorContext<'a>, doc: &'a Document) {
        self.multiple_operations = doc
            .iter()
            .filter(|d| matches!(d, Definition::Operation(_)))
            .nth(1)
            .is_some();
    }

    fn enter_operation_definition(
        &mut self,
        ctx: &mut ValidatorContext<'a>,
        op: &'a Spanning<Operation>,
    ) {
        if self.multiple_operations && op.item.name.is_none() {
            ctx.report_error(error_message(), &[op.span.start]);
        }
    }
}

fn error_message() -> &'static str {
    "An anonymous operation must be the only operation in the document"
}
