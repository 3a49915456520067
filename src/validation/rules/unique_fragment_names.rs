use std::collections::HashMap;

use crate::{
    ast::Fragment,
    parser::{SourcePosition, Spanning},
    validation::{ValidatorContext, Visitor},
};

pub struct UniqueFragmentNames {
    names: HashMap<String, SourcePosition>,
}

pub fn factory() -> UniqueFragmentNames {
    UniqueFragmentNames {
        names: HashMap::new(),
    }
}

impl<'a> Visitor<'a> for UniqueFragmentNames {
    fn enter_fragment_definition(
        &mut self,
        ctx: &mut ValidatorContext<'a>,
        f: &'a Spanning<Fragment>,
    ) {
        let name = &f.item.name;

        // Each reuse is reported against the occurrence before it.
        if let Some(previous) = self.names.insert(name.item.clone(), name.span.start) {
            ctx.report_error(&error_message(&name.item), &[previous, name.span.start]);
        }
    }
}

fn error_message(frag_name: &str) -> String {
    format!(r#"Fragment name "{frag_name}" is used more than once"#)
}
