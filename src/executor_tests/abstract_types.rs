use pretty_assertions::assert_eq;
use serde_json::json;

use crate::{
    ast::Type,
    executor::resolver_fn,
    schema::{
        meta::{Field, InterfaceMeta, ObjectMeta, UnionMeta},
        model::SchemaType,
    },
    ResolvedValue,
};

use super::support::{json, root_node, run};

fn menagerie_schema() -> SchemaType {
    let query = ObjectMeta::new(
        "Query",
        vec![
            Field::new("pet", Type::Named("Pet".into())).resolver(resolver_fn(|_| {
                Ok(ResolvedValue::object([
                    ("__typename", ResolvedValue::scalar("Dog")),
                    ("name", ResolvedValue::scalar("Rex")),
                ]))
            })),
            Field::new("sniffer", Type::Named("Pet".into())).resolver(resolver_fn(|_| {
                // No `__typename`: only the `barks` key gives it away.
                Ok(ResolvedValue::object([
                    ("name", ResolvedValue::scalar("Laika")),
                    ("barks", ResolvedValue::scalar(true)),
                ]))
            })),
            Field::new("stray", Type::Named("Pet".into())).resolver(resolver_fn(|_| {
                Ok(ResolvedValue::object([("mystery", ResolvedValue::scalar(1))]))
            })),
            Field::new("catOrDog", Type::Named("CatOrDog".into())).resolver(resolver_fn(|_| {
                Ok(ResolvedValue::object([
                    ("name", ResolvedValue::scalar("Tom")),
                    ("meows", ResolvedValue::scalar(true)),
                ]))
            })),
        ],
    );

    SchemaType::build(query)
        .register(
            InterfaceMeta::new(
                "Pet",
                vec![Field::new("name", Type::NonNullNamed("String".into()))],
            )
            .into_meta(),
        )
        .register(
            ObjectMeta::new(
                "Dog",
                vec![
                    Field::new("name", Type::NonNullNamed("String".into())),
                    Field::new("barks", Type::Named("Boolean".into())),
                ],
            )
            .interfaces(&["Pet"])
            .is_type_of(|v| v.lookup("barks").is_some())
            .into_meta(),
        )
        .register(
            ObjectMeta::new(
                "Cat",
                vec![
                    Field::new("name", Type::NonNullNamed("String".into())),
                    Field::new("meows", Type::Named("Boolean".into())),
                ],
            )
            .interfaces(&["Pet"])
            .is_type_of(|v| v.lookup("meows").is_some())
            .into_meta(),
        )
        .register(UnionMeta::new("CatOrDog", &["Cat", "Dog"]).into_meta())
        .finish()
        .expect("valid schema")
}

#[tokio::test]
async fn typename_entry_discriminates_interface_values() {
    let root = root_node(menagerie_schema());
    let (data, errors) = run(&root, "{ pet { name __typename } }").await;

    assert_eq!(
        json(&data),
        json!({"pet": {"name": "Rex", "__typename": "Dog"}}),
    );
    assert_eq!(errors, vec![]);
}

#[tokio::test]
async fn unique_is_type_of_match_wins() {
    let root = root_node(menagerie_schema());
    let (data, errors) = run(&root, "{ sniffer { name ... on Dog { barks } } }").await;

    assert_eq!(
        json(&data),
        json!({"sniffer": {"name": "Laika", "barks": true}}),
    );
    assert_eq!(errors, vec![]);
}

#[tokio::test]
async fn union_members_resolve_through_inline_fragments() {
    let root = root_node(menagerie_schema());
    let (data, errors) = run(
        &root,
        "{ catOrDog { __typename ... on Cat { meows } ... on Dog { barks } } }",
    )
    .await;

    assert_eq!(
        json(&data),
        json!({"catOrDog": {"__typename": "Cat", "meows": true}}),
    );
    assert_eq!(errors, vec![]);
}

#[tokio::test]
async fn unresolvable_abstract_value_is_a_field_error() {
    let root = root_node(menagerie_schema());
    let (data, errors) = run(&root, "{ stray { name } }").await;

    assert_eq!(json(&data), json!({"stray": null}));
    assert_eq!(errors.len(), 1);
    assert!(errors[0]
        .error()
        .message()
        .starts_with(r#"Could not resolve the concrete type of abstract type "Pet""#));
}

fn resolve_type_schema() -> SchemaType {
    let query = ObjectMeta::new(
        "Query",
        vec![Field::new("pet", Type::Named("Pet".into())).resolver(resolver_fn(|_| {
            Ok(ResolvedValue::object([("name", ResolvedValue::scalar("Tom"))]))
        }))],
    );

    SchemaType::build(query)
        .register(
            InterfaceMeta::new(
                "Pet",
                vec![Field::new("name", Type::NonNullNamed("String".into()))],
            )
            // Everything is a cat until proven otherwise.
            .resolve_type(|_, _| Some("Cat".into()))
            .into_meta(),
        )
        .register(
            ObjectMeta::new(
                "Cat",
                vec![Field::new("name", Type::NonNullNamed("String".into()))],
            )
            .interfaces(&["Pet"])
            .into_meta(),
        )
        .finish()
        .expect("valid schema")
}

#[tokio::test]
async fn resolve_type_callback_takes_precedence() {
    let root = root_node(resolve_type_schema());
    let (data, errors) = run(&root, "{ pet { __typename name } }").await;

    assert_eq!(
        json(&data),
        json!({"pet": {"__typename": "Cat", "name": "Tom"}}),
    );
    assert_eq!(errors, vec![]);
}
