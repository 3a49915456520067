use crate::{
    ast::{Definition, Document},
    validation::{ValidatorContext, Visitor},
};

pub struct ExecutableDefinitions;

pub fn factory() -> ExecutableDefinitions {
    ExecutableDefinitions
}

impl<'a> Visitor<'a> for ExecutableDefinitions {
    fn enter_document(&mut self, ctx: &mut ValidatorContext<'a>, doc: &'a Document) {
        for def in doc {
            if let Definition::TypeSystem(ts) = def {
                let name = ts.item.name.as_ref().map(|n| n.item.as_str());
                ctx.report_error(
                    &error_message(&ts.item.keyword, name),
                    &[ts.span.start],
                );
            }
        }
    }
}

fn error_message(keyword: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!(r#"The "{name}" definition is not executable"#),
        None => format!(r#"The "{keyword}" definition is not executable"#),
    }
}
