use pretty_assertions::assert_eq;
use serde_json::json;

use crate::{
    ast::Type,
    executor::{resolver_fn, PathSegment},
    schema::{
        meta::{Field, ObjectMeta},
        model::SchemaType,
    },
    FieldError, ResolvedValue,
};

use super::support::{json, root_node, run};

fn error_schema() -> SchemaType {
    let query = ObjectMeta::new(
        "Query",
        vec![
            Field::new("name", Type::NonNullNamed("String".into()))
                .resolver(resolver_fn(|_| Err(FieldError::from("boom")))),
            Field::new("maybe", Type::Named("String".into()))
                .resolver(resolver_fn(|_| Err(FieldError::from("soft failure")))),
            Field::new("other", Type::Named("Int".into()))
                .resolver(resolver_fn(|_| Ok(ResolvedValue::scalar(7)))),
            Field::new("nest", Type::Named("Nest".into())).resolver(resolver_fn(|_| {
                Ok(ResolvedValue::object([("safe", ResolvedValue::scalar("ok"))]))
            })),
            Field::new(
                "items",
                Type::List(Box::new(Type::Named("Item".into()))),
            )
            .resolver(resolver_fn(|_| {
                Ok(ResolvedValue::list([
                    ResolvedValue::object([("v", ResolvedValue::scalar("first"))]),
                    ResolvedValue::object([("v", ResolvedValue::null())]),
                ]))
            })),
        ],
    );

    SchemaType::build(query)
        .register(
            ObjectMeta::new(
                "Nest",
                vec![
                    Field::new("value", Type::NonNullNamed("String".into()))
                        .resolver(resolver_fn(|_| Err(FieldError::from("inner boom")))),
                    Field::new("safe", Type::Named("String".into())),
                ],
            )
            .into_meta(),
        )
        .register(
            ObjectMeta::new(
                "Item",
                vec![Field::new("v", Type::NonNullNamed("String".into()))],
            )
            .into_meta(),
        )
        .finish()
        .expect("valid schema")
}

#[tokio::test]
async fn non_null_root_field_error_nulls_the_whole_data() {
    let root = root_node(error_schema());
    let (data, errors) = run(&root, "{ name }").await;

    assert_eq!(json(&data), json!(null));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error().message(), "boom");
    assert_eq!(errors[0].path(), [PathSegment::Key("name".into())]);
}

#[tokio::test]
async fn nullable_field_error_becomes_null_and_is_recorded() {
    let root = root_node(error_schema());
    let (data, errors) = run(&root, "{ maybe other }").await;

    assert_eq!(json(&data), json!({"maybe": null, "other": 7}));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error().message(), "soft failure");
    assert_eq!(errors[0].path(), [PathSegment::Key("maybe".into())]);
}

#[tokio::test]
async fn non_null_error_propagates_to_nearest_nullable_parent() {
    let root = root_node(error_schema());
    let (data, errors) = run(&root, "{ nest { value safe } other }").await;

    assert_eq!(json(&data), json!({"nest": null, "other": 7}));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error().message(), "inner boom");
    assert_eq!(
        errors[0].path(),
        [PathSegment::Key("nest".into()), PathSegment::Key("value".into())],
    );
}

#[tokio::test]
async fn null_in_non_null_list_element_nulls_the_element() {
    let root = root_node(error_schema());
    let (data, errors) = run(&root, "{ items { v } }").await;

    // The second element's non-null `v` is null, so that element becomes
    // null while the first survives.
    assert_eq!(json(&data), json!({"items": [{"v": "first"}, null]}));
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].path(),
        [
            PathSegment::Key("items".into()),
            PathSegment::Index(1),
            PathSegment::Key("v".into()),
        ],
    );
}

#[tokio::test]
async fn unknown_field_is_an_error_with_validation_off() {
    let root = root_node(error_schema()).disable_validation();
    let (data, errors) = run(&root, "{ other ghost }").await;

    // With validation off the unknown field is silently skipped.
    assert_eq!(json(&data), json!({"other": 7}));
    assert_eq!(errors, vec![]);
}
