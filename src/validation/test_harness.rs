use crate::{
    ast::Type,
    parser::testing,
    schema::{
        meta::{
            Argument, EnumMeta, EnumValue, Field, InputObjectMeta, InterfaceMeta, ObjectMeta,
            UnionMeta,
        },
        model::SchemaType,
    },
    validation::{visit, MultiVisitorNil, RuleError, ValidatorContext, Visitor},
};

fn named(name: &str) -> Type {
    Type::Named(name.into())
}

fn non_null(name: &str) -> Type {
    Type::NonNullNamed(name.into())
}

fn list_of(inner: Type) -> Type {
    Type::List(Box::new(inner))
}

fn test_schema() -> SchemaType {
    let query = ObjectMeta::new(
        "QueryRoot",
        vec![
            Field::new("dog", named("Dog")),
            Field::new("cat", named("Cat")),
            Field::new("pet", named("Pet")),
            Field::new("catOrDog", named("CatOrDog")),
            Field::new("human", named("Human")).argument(Argument::new("id", named("ID"))),
            Field::new("complicatedArgs", named("ComplicatedArgs")),
        ],
    );

    SchemaType::build(query)
        .register(
            InterfaceMeta::new("Pet", vec![Field::new("name", named("String"))]).into_meta(),
        )
        .register(
            ObjectMeta::new(
                "Dog",
                vec![
                    Field::new("name", named("String")),
                    Field::new("nickname", named("String")),
                    Field::new("barks", named("Boolean")),
                    Field::new("doesKnowCommand", named("Boolean"))
                        .argument(Argument::new("dogCommand", named("DogCommand"))),
                ],
            )
            .interfaces(&["Pet"])
            .into_meta(),
        )
        .register(
            ObjectMeta::new(
                "Cat",
                vec![
                    Field::new("name", named("String")),
                    Field::new("meows", named("Boolean")),
                    Field::new("furColor", named("FurColor")),
                ],
            )
            .interfaces(&["Pet"])
            .into_meta(),
        )
        .register(UnionMeta::new("CatOrDog", &["Cat", "Dog"]).into_meta())
        .register(
            EnumMeta::new(
                "DogCommand",
                vec![
                    EnumValue::new("SIT"),
                    EnumValue::new("HEEL"),
                    EnumValue::new("DOWN"),
                ],
            )
            .into_meta(),
        )
        .register(
            EnumMeta::new(
                "FurColor",
                vec![
                    EnumValue::new("BROWN"),
                    EnumValue::new("BLACK"),
                    EnumValue::new("TAN"),
                ],
            )
            .into_meta(),
        )
        .register(
            ObjectMeta::new(
                "Human",
                vec![
                    Field::new("name", named("String"))
                        .argument(Argument::new("surname", named("Boolean"))),
                    Field::new("pets", list_of(named("Pet"))),
                    Field::new("iq", named("Int")),
                ],
            )
            .into_meta(),
        )
        .register(
            ObjectMeta::new(
                "ComplicatedArgs",
                vec![
                    Field::new("intArgField", named("String"))
                        .argument(Argument::new("intArg", named("Int"))),
                    Field::new("nonNullIntArgField", named("String"))
                        .argument(Argument::new("nonNullIntArg", non_null("Int"))),
                    Field::new("stringArgField", named("String"))
                        .argument(Argument::new("stringArg", named("String"))),
                    Field::new("enumArgField", named("String"))
                        .argument(Argument::new("enumArg", named("FurColor"))),
                    Field::new("stringListArgField", named("String"))
                        .argument(Argument::new("stringListArg", list_of(named("String")))),
                    Field::new("complexArgField", named("String"))
                        .argument(Argument::new("complexArg", named("ComplexInput"))),
                ],
            )
            .into_meta(),
        )
        .register(
            InputObjectMeta::new(
                "ComplexInput",
                vec![
                    Argument::new("requiredField", non_null("Boolean")),
                    Argument::new("intField", named("Int")),
                    Argument::new("stringField", named("String")),
                    Argument::new("booleanField", named("Boolean")),
                    Argument::new("stringListField", list_of(named("String"))),
                ],
            )
            .into_meta(),
        )
        .finish()
        .expect("valid test schema")
}

pub(crate) fn validate_rule<V, F>(factory: F, q: &str) -> Vec<RuleError>
where
    V: for<'d> Visitor<'d> + 'static,
    F: Fn() -> V,
{
    let schema = test_schema();
    let doc = testing::parse_document(q)
        .unwrap_or_else(|e| panic!("Parse error on input {q:?}: {e}"));

    let mut ctx = ValidatorContext::new(&schema, &doc);
    let mut mv = MultiVisitorNil.with(factory());
    visit(&mut mv, &mut ctx, &doc);

    ctx.into_errors()
}

pub(crate) fn expect_passes_rule<V, F>(factory: F, q: &str)
where
    V: for<'d> Visitor<'d> + 'static,
    F: Fn() -> V,
{
    let errs = validate_rule(factory, q);
    if !errs.is_empty() {
        for err in errs {
            println!("Error: {err}");
        }
        panic!("Expected rule to pass, but errors found");
    }
}

pub(crate) fn expect_fails_rule<V, F>(factory: F, q: &str, expected_errors: &[RuleError])
where
    V: for<'d> Visitor<'d> + 'static,
    F: Fn() -> V,
{
    let errs = validate_rule(factory, q);
    if errs.is_empty() {
        panic!("Expected rule to fail, but no errors were found");
    }
    assert_eq!(errs, expected_errors);
}
