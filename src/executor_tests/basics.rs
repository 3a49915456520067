use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use serde_json::json;

use crate::{
    ast::Type,
    executor::resolver_fn,
    schema::{
        meta::{Argument, EnumMeta, EnumValue, Field, ObjectMeta},
        model::SchemaType,
    },
    FieldError, ResolvedValue, Variables,
};

use super::support::{json, root_node, run, run_with_vars};

fn star_wars_schema() -> SchemaType {
    let query = ObjectMeta::new(
        "Query",
        vec![
            Field::new("hero", Type::Named("Human".into()))
                .argument(Argument::new("episode", Type::Named("Episode".into())))
                .resolver(resolver_fn(|ctx| {
                    Ok(match ctx.args.get_enum("episode") {
                        Some("EMPIRE") => ResolvedValue::object([
                            ("name", ResolvedValue::scalar("Luke")),
                            ("appearsIn", ResolvedValue::list([
                                ResolvedValue::scalar("NEWHOPE"),
                                ResolvedValue::scalar("EMPIRE"),
                            ])),
                        ]),
                        _ => ResolvedValue::null(),
                    })
                })),
            Field::new(
                "squad",
                Type::List(Box::new(Type::Named("Human".into()))),
            )
            .resolver(resolver_fn(|_| {
                Ok(ResolvedValue::list([
                    ResolvedValue::object([("name", ResolvedValue::scalar("Luke"))]),
                    ResolvedValue::object([("name", ResolvedValue::scalar("Leia"))]),
                ]))
            })),
            Field::new("slow", Type::Named("Int".into())).resolver(resolver_fn(|_| {
                Ok(ResolvedValue::defer(|| async {
                    Ok(ResolvedValue::scalar(42))
                }))
            })),
        ],
    );

    SchemaType::build(query)
        .register(
            ObjectMeta::new(
                "Human",
                vec![
                    Field::new("name", Type::Named("String".into())),
                    Field::new(
                        "appearsIn",
                        Type::List(Box::new(Type::Named("Episode".into()))),
                    ),
                ],
            )
            .into_meta(),
        )
        .register(
            EnumMeta::new(
                "Episode",
                vec![
                    EnumValue::new("NEWHOPE"),
                    EnumValue::new("EMPIRE"),
                    EnumValue::new("JEDI"),
                ],
            )
            .into_meta(),
        )
        .finish()
        .expect("valid schema")
}

#[tokio::test]
async fn typename_of_the_query_root() {
    let root = root_node(star_wars_schema());
    let (data, errors) = run(&root, "{ __typename }").await;

    assert_eq!(json(&data), json!({"__typename": "Query"}));
    assert_eq!(errors, vec![]);
}

#[tokio::test]
async fn field_with_enum_argument() {
    let root = root_node(star_wars_schema());
    let (data, errors) = run(&root, "{ hero(episode: EMPIRE) { name } }").await;

    assert_eq!(json(&data), json!({"hero": {"name": "Luke"}}));
    assert_eq!(errors, vec![]);
}

#[tokio::test]
async fn enum_values_serialize_by_member_name() {
    let root = root_node(star_wars_schema());
    let (data, errors) = run(&root, "{ hero(episode: EMPIRE) { appearsIn } }").await;

    assert_eq!(
        json(&data),
        json!({"hero": {"appearsIn": ["NEWHOPE", "EMPIRE"]}}),
    );
    assert_eq!(errors, vec![]);
}

#[tokio::test]
async fn response_keys_keep_collection_order() {
    let root = root_node(star_wars_schema());
    let (data, _) = run(
        &root,
        "{ b: hero(episode: EMPIRE) { name } a: __typename }",
    )
    .await;

    let keys: Vec<_> = data
        .as_object_value()
        .expect("object data")
        .iter()
        .map(|(k, _)| k.as_str())
        .collect();
    assert_eq!(keys, ["b", "a"]);
}

#[tokio::test]
async fn duplicated_response_keys_merge_their_selections() {
    let root = root_node(star_wars_schema());
    let (data, errors) = run(
        &root,
        "{ hero(episode: EMPIRE) { name } hero(episode: EMPIRE) { appearsIn } }",
    )
    .await;

    assert_eq!(
        json(&data),
        json!({"hero": {"name": "Luke", "appearsIn": ["NEWHOPE", "EMPIRE"]}}),
    );
    assert_eq!(errors, vec![]);
}

#[tokio::test]
async fn list_completion_preserves_input_order() {
    let root = root_node(star_wars_schema());
    let (data, errors) = run(&root, "{ squad { name } }").await;

    assert_eq!(
        json(&data),
        json!({"squad": [{"name": "Luke"}, {"name": "Leia"}]}),
    );
    assert_eq!(errors, vec![]);
}

#[tokio::test]
async fn deferred_values_unwrap_before_completion() {
    let root = root_node(star_wars_schema());
    let (data, errors) = run(&root, "{ slow }").await;

    assert_eq!(json(&data), json!({"slow": 42}));
    assert_eq!(errors, vec![]);
}

#[tokio::test]
async fn fragments_expand_against_the_object_type() {
    let root = root_node(star_wars_schema());
    let (data, errors) = run(
        &root,
        "{ hero(episode: EMPIRE) { ...HumanFields } } fragment HumanFields on Human { name }",
    )
    .await;

    assert_eq!(json(&data), json!({"hero": {"name": "Luke"}}));
    assert_eq!(errors, vec![]);
}

#[tokio::test]
async fn mapping_parents_feed_fields_without_resolvers() {
    let query = ObjectMeta::new(
        "Query",
        vec![Field::new("greeting", Type::Named("String".into()))],
    );
    let schema = SchemaType::build(query).finish().expect("valid schema");
    let root = root_node(schema);

    let (data, errors) = crate::execute(
        "{ greeting }",
        None,
        &root,
        &Variables::new(),
        &ResolvedValue::object([("greeting", ResolvedValue::scalar("hi"))]),
    )
    .await
    .expect("request succeeds");

    assert_eq!(json(&data), json!({"greeting": "hi"}));
    assert_eq!(errors, vec![]);
}

#[tokio::test]
async fn engine_default_resolver_is_the_last_fallback() {
    let query = ObjectMeta::new(
        "Query",
        vec![Field::new("anything", Type::Named("String".into()))],
    );
    let schema = SchemaType::build(query).finish().expect("valid schema");
    let root = root_node(schema).with_default_resolver(resolver_fn(|ctx| {
        Ok(ResolvedValue::scalar(format!("default:{}", ctx.field_name)))
    }));

    let (data, errors) = run(&root, "{ anything }").await;
    assert_eq!(json(&data), json!({"anything": "default:anything"}));
    assert_eq!(errors, vec![]);
}

fn mutation_schema(log: Arc<Mutex<Vec<i32>>>) -> SchemaType {
    let query = ObjectMeta::new(
        "Query",
        vec![Field::new("log", Type::List(Box::new(Type::Named("Int".into()))))],
    );
    let mutation = ObjectMeta::new(
        "Mutation",
        vec![Field::new("m", Type::Named("Int".into()))
            .argument(Argument::new("x", Type::NonNullNamed("Int".into())))
            .resolver(resolver_fn(move |ctx| {
                let x = ctx
                    .args
                    .get_int("x")
                    .ok_or_else(|| FieldError::from("missing x"))?;
                log.lock().unwrap().push(x);
                Ok(ResolvedValue::scalar(x))
            }))],
    );

    SchemaType::build(query)
        .mutation(mutation)
        .finish()
        .expect("valid schema")
}

#[tokio::test]
async fn mutation_root_fields_run_serially_in_selection_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let root = root_node(mutation_schema(Arc::clone(&log)));

    let (data, errors) = run(&root, "mutation { a: m(x: 1) b: m(x: 2) }").await;

    assert_eq!(json(&data), json!({"a": 1, "b": 2}));
    assert_eq!(errors, vec![]);
    assert_eq!(*log.lock().unwrap(), vec![1, 2]);
}

#[tokio::test]
async fn query_fields_run_concurrently_but_keys_stay_ordered() {
    let query = ObjectMeta::new(
        "Query",
        vec![
            Field::new("a", Type::Named("Int".into())).resolver(Arc::new(|_| {
                Box::pin(async {
                    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                    Ok(ResolvedValue::scalar(1))
                })
            })),
            Field::new("b", Type::Named("Int".into())).resolver(Arc::new(|_| {
                Box::pin(async { Ok(ResolvedValue::scalar(2)) })
            })),
        ],
    );
    let schema = SchemaType::build(query).finish().expect("valid schema");
    let root = root_node(schema);

    let (data, _) = run_with_vars(&root, "{ a b }", &Variables::new()).await;
    let keys: Vec<_> = data
        .as_object_value()
        .expect("object data")
        .iter()
        .map(|(k, _)| k.as_str())
        .collect();
    assert_eq!(keys, ["a", "b"]);
}
