use std::collections::HashMap;

use crate::{
    ast::Operation,
    parser::{SourcePosition, Spanning},
    validation::{ValidatorContext, Visitor},
};

pub struct UniqueOperationNames {
    names: HashMap<String, SourcePosition>,
}

pub fn factory() -> UniqueOperationNames {
    UniqueOperationNames {
        names: HashMap::new(),
    }
}

impl<'a> Visitor<'a> for UniqueOperationNames {
    fn enter_operation_definition(
        &mut self,
        ctx: &mut ValidatorContext<'a>,
        op: &'a Spanning<Operation>,
    ) {
        let Some(op_name) = &op.item.name else {
            return;
        };

        // Each reuse is reported against the occurrence before it.
        if let Some(previous) = self.names.insert(op_name.item.clone(), op.span.start) {
            ctx.report_error(&error_message(&op_name.item), &[previous, op.span.start]);
        }
    }
}

fn error_message(op_name: &str) -> String {
    format!(r#"Operation name "{op_name}" is used more than once"#)
}
