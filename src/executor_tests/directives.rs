use pretty_assertions::assert_eq;
use serde_json::json;

use crate::{
    ast::{InputValue, Type},
    executor::resolver_fn,
    schema::{
        meta::{Field, ObjectMeta},
        model::SchemaType,
    },
    ResolvedValue, Variables,
};

use super::support::{json, root_node, run, run_with_vars};

fn schema() -> SchemaType {
    let query = ObjectMeta::new(
        "Query",
        vec![
            Field::new("f", Type::Named("Int".into()))
                .resolver(resolver_fn(|_| Ok(ResolvedValue::scalar(1)))),
            Field::new("g", Type::Named("Int".into()))
                .resolver(resolver_fn(|_| Ok(ResolvedValue::scalar(2)))),
        ],
    );
    SchemaType::build(query).finish().expect("valid schema")
}

#[tokio::test]
async fn skip_with_true_variable_omits_the_field() {
    let root = root_node(schema());
    let vars = Variables::from([("s".to_string(), InputValue::Boolean(true))]);
    let (data, errors) = run_with_vars(
        &root,
        "query Q($s: Boolean!) { f @skip(if: $s) g }",
        &vars,
    )
    .await;

    assert_eq!(json(&data), json!({"g": 2}));
    assert_eq!(errors, vec![]);
}

#[tokio::test]
async fn skip_with_false_variable_keeps_the_field() {
    let root = root_node(schema());
    let vars = Variables::from([("s".to_string(), InputValue::Boolean(false))]);
    let (data, _) = run_with_vars(
        &root,
        "query Q($s: Boolean!) { f @skip(if: $s) g }",
        &vars,
    )
    .await;

    assert_eq!(json(&data), json!({"f": 1, "g": 2}));
}

#[tokio::test]
async fn include_false_literal_omits_the_field() {
    let root = root_node(schema());
    let (data, _) = run(&root, "{ f @include(if: false) g }").await;

    assert_eq!(json(&data), json!({"g": 2}));
}

#[tokio::test]
async fn directives_filter_fragment_spreads_too() {
    let root = root_node(schema());
    let (data, _) = run(
        &root,
        "{ g ...Fs @skip(if: true) } fragment Fs on Query { f }",
    )
    .await;

    assert_eq!(json(&data), json!({"g": 2}));
}

#[tokio::test]
async fn directives_filter_inline_fragments() {
    let root = root_node(schema());
    let (data, _) = run(&root, "{ g ... on Query @include(if: false) { f } }").await;

    assert_eq!(json(&data), json!({"g": 2}));
}
