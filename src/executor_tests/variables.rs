use pretty_assertions::assert_eq;
use serde_json::json;

use crate::{
    ast::{InputValue, Type},
    executor::resolver_fn,
    schema::{
        meta::{Argument, Field, InputObjectMeta, ObjectMeta},
        model::SchemaType,
    },
    FieldError, GraphQLError, ResolvedValue, Variables,
};

use super::support::{json, root_node, run, run_err, run_with_vars};

fn schema() -> SchemaType {
    let query = ObjectMeta::new(
        "Query",
        vec![
            Field::new("echo", Type::Named("Int".into()))
                .argument(Argument::new("x", Type::Named("Int".into())))
                .resolver(resolver_fn(|ctx| {
                    Ok(ctx
                        .args
                        .get_int("x")
                        .map_or_else(ResolvedValue::null, ResolvedValue::scalar))
                })),
            Field::new("shift", Type::Named("Int".into()))
                .argument(Argument::new("p", Type::NonNullNamed("Point".into())))
                .resolver(resolver_fn(|ctx| {
                    let p = ctx
                        .args
                        .get("p")
                        .and_then(InputValue::to_object_value)
                        .ok_or_else(|| FieldError::from("missing point"))?;
                    let coord = |name: &str| {
                        p.iter()
                            .find(|(k, _)| *k == name)
                            .and_then(|(_, v)| v.as_int_value())
                            .unwrap_or(0)
                    };
                    Ok(ResolvedValue::scalar(coord("x") + coord("y")))
                })),
            Field::new("when", Type::Named("DateTime".into()))
                .argument(Argument::new("at", Type::Named("DateTime".into())))
                .resolver(resolver_fn(|ctx| {
                    Ok(ctx
                        .args
                        .get_string("at")
                        .map_or_else(ResolvedValue::null, ResolvedValue::scalar))
                })),
        ],
    );

    SchemaType::build(query)
        .register(
            InputObjectMeta::new(
                "Point",
                vec![
                    Argument::new("x", Type::NonNullNamed("Int".into())),
                    Argument::new("y", Type::Named("Int".into()))
                        .default_value(InputValue::Int(3)),
                ],
            )
            .into_meta(),
        )
        .finish()
        .expect("valid schema")
}

#[tokio::test]
async fn variable_default_applies_when_absent() {
    let root = root_node(schema());
    let (data, errors) = run(&root, "query Q($x: Int = 7) { echo(x: $x) }").await;

    assert_eq!(json(&data), json!({"echo": 7}));
    assert_eq!(errors, vec![]);
}

#[tokio::test]
async fn provided_variable_overrides_the_default() {
    let root = root_node(schema());
    let vars = Variables::from([("x".to_string(), InputValue::Int(11))]);
    let (data, _) = run_with_vars(&root, "query Q($x: Int = 7) { echo(x: $x) }", &vars).await;

    assert_eq!(json(&data), json!({"echo": 11}));
}

#[tokio::test]
async fn missing_non_null_variable_is_a_request_error() {
    let root = root_node(schema());
    let err = run_err(&root, "query Q($x: Int!) { echo(x: $x) }", &Variables::new()).await;

    let GraphQLError::ValidationError(errors) = err else {
        panic!("expected a validation error, got: {err}");
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message(),
        r#"Variable "$x" of required type "Int!" was not provided"#,
    );
}

#[tokio::test]
async fn mistyped_variable_value_is_a_request_error() {
    let root = root_node(schema());
    let vars = Variables::from([("x".to_string(), InputValue::String("nope".into()))]);
    let err = run_err(&root, "query Q($x: Int) { echo(x: $x) }", &vars).await;

    let GraphQLError::ValidationError(errors) = err else {
        panic!("expected a validation error, got: {err}");
    };
    assert!(errors[0].message().starts_with(r#"Variable "$x" got invalid value"#));
}

#[tokio::test]
async fn input_object_fields_fall_back_to_defaults() {
    let root = root_node(schema());
    let (data, errors) = run(&root, "{ shift(p: {x: 2}) }").await;

    assert_eq!(json(&data), json!({"shift": 5}));
    assert_eq!(errors, vec![]);
}

#[tokio::test]
async fn unknown_input_object_key_is_a_field_error() {
    let root = root_node(schema());
    let (data, errors) = run(&root, "{ shift(p: {x: 2, zz: 1}) }").await;

    assert_eq!(json(&data), json!({"shift": null}));
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].error().message(),
        r#"Unknown field "zz" for input object "Point""#,
    );
}

#[tokio::test]
async fn missing_required_input_object_field_is_a_field_error() {
    let root = root_node(schema());
    let (data, errors) = run(&root, "{ shift(p: {y: 1}) }").await;

    assert_eq!(json(&data), json!({"shift": null}));
    assert_eq!(
        errors[0].error().message(),
        r#"Missing field "x" for input object "Point""#,
    );
}

#[tokio::test]
async fn variables_substitute_inside_input_objects() {
    let root = root_node(schema());
    let vars = Variables::from([("px".to_string(), InputValue::Int(4))]);
    let (data, _) = run_with_vars(
        &root,
        "query Q($px: Int!) { shift(p: {x: $px}) }",
        &vars,
    )
    .await;

    assert_eq!(json(&data), json!({"shift": 7}));
}

#[tokio::test]
async fn date_time_variables_accept_epoch_millis() {
    let root = root_node(schema());
    let vars = Variables::from([("at".to_string(), InputValue::Int(1_000_000_000))]);
    let (data, _) = run_with_vars(&root, "query Q($at: DateTime) { when(at: $at) }", &vars).await;

    assert_eq!(json(&data), json!({"when": "1970-01-12T13:46:40Z"}));
}

#[tokio::test]
async fn missing_nullable_variable_coerces_to_missing_argument() {
    let root = root_node(schema());
    let (data, errors) = run(&root, "query Q($x: Int) { echo(x: $x) }").await;

    assert_eq!(json(&data), json!({"echo": null}));
    assert_eq!(errors, vec![]);
}
