use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::{
    ast::Type,
    executor::resolver_fn,
    extensions::{Extension, RequestNext, RequestOutcome, ResolveNext},
    schema::{
        meta::{Field, ObjectMeta},
        model::SchemaType,
    },
    FieldError, FieldResult, ResolvedValue,
};

use super::support::{json, root_node, run};

fn schema() -> SchemaType {
    let query = ObjectMeta::new(
        "Query",
        vec![
            Field::new("ok", Type::Named("Int".into()))
                .resolver(resolver_fn(|_| Ok(ResolvedValue::scalar(1)))),
            Field::new("bad", Type::Named("Int".into()))
                .resolver(resolver_fn(|_| Err(FieldError::from("secret details")))),
        ],
    );
    SchemaType::build(query).finish().expect("valid schema")
}

struct Redact;

impl Extension for Redact {
    fn map_exception(&self, error: FieldError) -> FieldError {
        error.map_message(|_| "internal error".into())
    }
}

#[tokio::test]
async fn map_exception_rewrites_recorded_errors() {
    let root = root_node(schema()).with_extension(Redact);
    let (data, errors) = run(&root, "{ bad }").await;

    assert_eq!(json(&data), json!({"bad": null}));
    assert_eq!(errors[0].error().message(), "internal error");
}

struct ConstantField;

#[async_trait]
impl Extension for ConstantField {
    async fn resolve_field<'a>(
        &'a self,
        field_name: &'a str,
        next: ResolveNext<'a>,
    ) -> FieldResult<ResolvedValue> {
        if field_name == "ok" {
            // Short-circuits the core resolver entirely.
            Ok(ResolvedValue::scalar(41))
        } else {
            next.run().await
        }
    }
}

#[tokio::test]
async fn resolve_field_hooks_can_short_circuit() {
    let root = root_node(schema()).with_extension(ConstantField);
    let (data, errors) = run(&root, "{ ok }").await;

    assert_eq!(json(&data), json!({"ok": 41}));
    assert_eq!(errors, vec![]);
}

struct Tracer {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Extension for Tracer {
    async fn execute_request<'a>(&'a self, next: RequestNext<'a>) -> RequestOutcome {
        self.log.lock().unwrap().push(format!("{}:before", self.name));
        let out = next.run().await;
        self.log.lock().unwrap().push(format!("{}:after", self.name));
        out
    }
}

#[tokio::test]
async fn extensions_compose_right_to_left() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let root = root_node(schema())
        .with_extension(Tracer {
            name: "outer",
            log: Arc::clone(&log),
        })
        .with_extension(Tracer {
            name: "inner",
            log: Arc::clone(&log),
        });

    run(&root, "{ ok }").await;

    assert_eq!(
        *log.lock().unwrap(),
        vec!["outer:before", "inner:before", "inner:after", "outer:after"],
    );
}
