//! Reflective `__schema`/`__type` support.
//!
//! Schema assembly augments the query root with the `__schema` and
//! `__type(name:)` fields and registers the introspection meta types.
//! Introspected types travel through execution as host values wrapping an
//! owned type literal, so arbitrarily deep `ofType`/`fields` navigation
//! works without materializing the whole (cyclic) type graph.

use crate::{
    ast::{InputValue, Type},
    executor::{resolver_fn, FieldError, FieldResult, ResolvedValue, ResolverContext},
    schema::{
        meta::{
            Argument, EnumMeta, EnumValue, Field, MetaType, ObjectMeta, TypeKind,
        },
        model::{DirectiveType, SchemaType},
    },
};

fn type_ref(t: Type) -> ResolvedValue {
    ResolvedValue::host(t)
}

fn parent_type_ref(ctx: &ResolverContext) -> FieldResult<Type> {
    ctx.parent
        .downcast_host::<Type>()
        .cloned()
        .ok_or_else(|| internal("__Type"))
}

fn internal(meta_name: &str) -> FieldError {
    FieldError::from(format!(
        "Introspection value is not a \"{meta_name}\" handle",
    ))
}

fn named_meta<'s>(schema: &'s SchemaType, t: &Type) -> Option<&'s MetaType> {
    match t {
        Type::Named(n) => schema.concrete_type_by_name(n),
        _ => None,
    }
}

fn string_or_null(v: Option<&str>) -> ResolvedValue {
    v.map_or_else(ResolvedValue::null, ResolvedValue::scalar)
}

/// Adds the `__schema` and `__type(name:)` fields to the query root.
pub(crate) fn augment_query_root(query: ObjectMeta) -> ObjectMeta {
    query
        .field(
            Field::new("__schema", Type::NonNullNamed(arcstr::literal!("__Schema")))
                .resolver(resolver_fn(|_| {
                    Ok(ResolvedValue::object(Vec::<(String, ResolvedValue)>::new()))
                })),
        )
        .field(
            Field::new("__type", Type::Named(arcstr::literal!("__Type")))
                .argument(Argument::new(
                    "name",
                    Type::NonNullNamed(arcstr::literal!("String")),
                ))
                .resolver(resolver_fn(|ctx| {
                    let name = ctx
                        .args
                        .get_string("name")
                        .ok_or_else(|| FieldError::from("Missing \"name\" argument"))?;
                    Ok(match ctx.schema.concrete_type_by_name(name) {
                        Some(meta) => type_ref(Type::Named(meta.name().clone())),
                        None => ResolvedValue::null(),
                    })
                })),
        )
}

/// The meta types described by the GraphQL specification's introspection
/// section.
pub(crate) fn meta_types() -> Vec<MetaType> {
    vec![
        schema_meta(),
        type_meta(),
        field_meta(),
        input_value_meta(),
        enum_value_meta(),
        directive_meta(),
        type_kind_meta(),
        directive_location_meta(),
    ]
}

fn schema_meta() -> MetaType {
    ObjectMeta::new(
        "__Schema",
        vec![
            Field::new(
                "types",
                Type::NonNullList(Box::new(Type::NonNullNamed(arcstr::literal!("__Type")))),
            )
            .resolver(resolver_fn(|ctx| {
                Ok(ResolvedValue::list(
                    ctx.schema
                        .reachable_type_names()
                        .into_iter()
                        .map(|name| type_ref(Type::Named(name)))
                        .collect::<Vec<_>>(),
                ))
            })),
            Field::new("queryType", Type::NonNullNamed(arcstr::literal!("__Type"))).resolver(
                resolver_fn(|ctx| {
                    Ok(type_ref(Type::Named(
                        ctx.schema.concrete_query_type().name().clone(),
                    )))
                }),
            ),
            Field::new("mutationType", Type::Named(arcstr::literal!("__Type"))).resolver(
                resolver_fn(|ctx| {
                    Ok(ctx
                        .schema
                        .concrete_mutation_type()
                        .map_or_else(ResolvedValue::null, |t| {
                            type_ref(Type::Named(t.name().clone()))
                        }))
                }),
            ),
            Field::new("subscriptionType", Type::Named(arcstr::literal!("__Type"))).resolver(
                resolver_fn(|ctx| {
                    Ok(ctx
                        .schema
                        .concrete_subscription_type()
                        .map_or_else(ResolvedValue::null, |t| {
                            type_ref(Type::Named(t.name().clone()))
                        }))
                }),
            ),
            Field::new(
                "directives",
                Type::NonNullList(Box::new(Type::NonNullNamed(arcstr::literal!(
                    "__Directive"
                )))),
            )
            .resolver(resolver_fn(|ctx| {
                Ok(ResolvedValue::list(
                    ctx.schema
                        .directive_list()
                        .into_iter()
                        .map(|d| ResolvedValue::host(d.clone()))
                        .collect::<Vec<_>>(),
                ))
            })),
        ],
    )
    .into_meta()
}

fn type_meta() -> MetaType {
    let include_deprecated_arg = || {
        Argument::new("includeDeprecated", Type::Named(arcstr::literal!("Boolean")))
            .default_value(InputValue::Boolean(false))
    };

    ObjectMeta::new(
        "__Type",
        vec![
            Field::new("kind", Type::NonNullNamed(arcstr::literal!("__TypeKind"))).resolver(
                resolver_fn(|ctx| {
                    let t = parent_type_ref(&ctx)?;
                    let kind = match &t {
                        Type::NonNullNamed(_) | Type::NonNullList(_) => TypeKind::NonNull,
                        Type::List(_) => TypeKind::List,
                        Type::Named(n) => ctx
                            .schema
                            .concrete_type_by_name(n)
                            .ok_or_else(|| FieldError::from(format!(r#"Unknown type "{n}""#)))?
                            .type_kind(),
                    };
                    Ok(ResolvedValue::scalar(kind.to_string()))
                }),
            ),
            Field::new("name", Type::Named(arcstr::literal!("String"))).resolver(resolver_fn(
                |ctx| {
                    let t = parent_type_ref(&ctx)?;
                    Ok(match &t {
                        Type::Named(n) => ResolvedValue::scalar(n.to_string()),
                        _ => ResolvedValue::null(),
                    })
                },
            )),
            Field::new("description", Type::Named(arcstr::literal!("String"))).resolver(
                resolver_fn(|ctx| {
                    let t = parent_type_ref(&ctx)?;
                    Ok(string_or_null(
                        named_meta(&ctx.schema, &t)
                            .and_then(|m| m.description())
                            .map(|d| d.as_str()),
                    ))
                }),
            ),
            Field::new(
                "fields",
                Type::List(Box::new(Type::NonNullNamed(arcstr::literal!("__Field")))),
            )
            .argument(include_deprecated_arg())
            .resolver(resolver_fn(|ctx| {
                let t = parent_type_ref(&ctx)?;
                let include_deprecated = ctx.args.get_boolean("includeDeprecated").unwrap_or(false);
                let fields = match named_meta(&ctx.schema, &t) {
                    Some(MetaType::Object(o)) => &o.fields,
                    Some(MetaType::Interface(i)) => &i.fields,
                    _ => return Ok(ResolvedValue::null()),
                };
                Ok(ResolvedValue::list(
                    fields
                        .iter()
                        .filter(|f| !f.name.starts_with("__"))
                        .filter(|f| include_deprecated || !f.deprecation_status.is_deprecated())
                        .map(|f| ResolvedValue::host(f.clone()))
                        .collect::<Vec<_>>(),
                ))
            })),
            Field::new(
                "interfaces",
                Type::List(Box::new(Type::NonNullNamed(arcstr::literal!("__Type")))),
            )
            .resolver(resolver_fn(|ctx| {
                let t = parent_type_ref(&ctx)?;
                match named_meta(&ctx.schema, &t) {
                    Some(MetaType::Object(o)) => Ok(ResolvedValue::list(
                        o.interface_names
                            .iter()
                            .map(|n| type_ref(Type::Named(n.clone())))
                            .collect::<Vec<_>>(),
                    )),
                    _ => Ok(ResolvedValue::null()),
                }
            })),
            Field::new(
                "possibleTypes",
                Type::List(Box::new(Type::NonNullNamed(arcstr::literal!("__Type")))),
            )
            .resolver(resolver_fn(|ctx| {
                let t = parent_type_ref(&ctx)?;
                match named_meta(&ctx.schema, &t) {
                    Some(meta @ (MetaType::Interface(_) | MetaType::Union(_))) => {
                        Ok(ResolvedValue::list(
                            ctx.schema
                                .possible_types(meta)
                                .into_iter()
                                .map(|t| type_ref(Type::Named(t.name().clone())))
                                .collect::<Vec<_>>(),
                        ))
                    }
                    _ => Ok(ResolvedValue::null()),
                }
            })),
            Field::new(
                "enumValues",
                Type::List(Box::new(Type::NonNullNamed(arcstr::literal!(
                    "__EnumValue"
                )))),
            )
            .argument(include_deprecated_arg())
            .resolver(resolver_fn(|ctx| {
                let t = parent_type_ref(&ctx)?;
                let include_deprecated = ctx.args.get_boolean("includeDeprecated").unwrap_or(false);
                match named_meta(&ctx.schema, &t) {
                    Some(MetaType::Enum(e)) => Ok(ResolvedValue::list(
                        e.values
                            .iter()
                            .filter(|v| {
                                include_deprecated || !v.deprecation_status.is_deprecated()
                            })
                            .map(|v| ResolvedValue::host(v.clone()))
                            .collect::<Vec<_>>(),
                    )),
                    _ => Ok(ResolvedValue::null()),
                }
            })),
            Field::new(
                "inputFields",
                Type::List(Box::new(Type::NonNullNamed(arcstr::literal!(
                    "__InputValue"
                )))),
            )
            .resolver(resolver_fn(|ctx| {
                let t = parent_type_ref(&ctx)?;
                match named_meta(&ctx.schema, &t) {
                    Some(MetaType::InputObject(io)) => Ok(ResolvedValue::list(
                        io.input_fields
                            .iter()
                            .map(|f| ResolvedValue::host(f.clone()))
                            .collect::<Vec<_>>(),
                    )),
                    _ => Ok(ResolvedValue::null()),
                }
            })),
            Field::new("ofType", Type::Named(arcstr::literal!("__Type"))).resolver(resolver_fn(
                |ctx| {
                    let t = parent_type_ref(&ctx)?;
                    Ok(match t {
                        Type::NonNullNamed(n) => type_ref(Type::Named(n)),
                        Type::NonNullList(inner) => type_ref(Type::List(inner)),
                        Type::List(inner) => type_ref(*inner),
                        Type::Named(_) => ResolvedValue::null(),
                    })
                },
            )),
        ],
    )
    .into_meta()
}

fn field_meta() -> MetaType {
    ObjectMeta::new(
        "__Field",
        vec![
            Field::new("name", Type::NonNullNamed(arcstr::literal!("String"))).resolver(
                resolver_fn(|ctx| {
                    let f = ctx
                        .parent
                        .downcast_host::<Field>()
                        .ok_or_else(|| internal("__Field"))?;
                    Ok(ResolvedValue::scalar(f.name.to_string()))
                }),
            ),
            Field::new("description", Type::Named(arcstr::literal!("String"))).resolver(
                resolver_fn(|ctx| {
                    let f = ctx
                        .parent
                        .downcast_host::<Field>()
                        .ok_or_else(|| internal("__Field"))?;
                    Ok(string_or_null(f.description.as_deref()))
                }),
            ),
            Field::new(
                "args",
                Type::NonNullList(Box::new(Type::NonNullNamed(arcstr::literal!(
                    "__InputValue"
                )))),
            )
            .resolver(resolver_fn(|ctx| {
                let f = ctx
                    .parent
                    .downcast_host::<Field>()
                    .ok_or_else(|| internal("__Field"))?;
                Ok(ResolvedValue::list(
                    f.arguments
                        .iter()
                        .flatten()
                        .map(|a| ResolvedValue::host(a.clone()))
                        .collect::<Vec<_>>(),
                ))
            })),
            Field::new("type", Type::NonNullNamed(arcstr::literal!("__Type"))).resolver(
                resolver_fn(|ctx| {
                    let f = ctx
                        .parent
                        .downcast_host::<Field>()
                        .ok_or_else(|| internal("__Field"))?;
                    Ok(type_ref(f.field_type.clone()))
                }),
            ),
            Field::new(
                "isDeprecated",
                Type::NonNullNamed(arcstr::literal!("Boolean")),
            )
            .resolver(resolver_fn(|ctx| {
                let f = ctx
                    .parent
                    .downcast_host::<Field>()
                    .ok_or_else(|| internal("__Field"))?;
                Ok(ResolvedValue::scalar(
                    f.deprecation_status.is_deprecated(),
                ))
            })),
            Field::new("deprecationReason", Type::Named(arcstr::literal!("String"))).resolver(
                resolver_fn(|ctx| {
                    let f = ctx
                        .parent
                        .downcast_host::<Field>()
                        .ok_or_else(|| internal("__Field"))?;
                    Ok(string_or_null(f.deprecation_status.reason()))
                }),
            ),
        ],
    )
    .into_meta()
}

fn input_value_meta() -> MetaType {
    ObjectMeta::new(
        "__InputValue",
        vec![
            Field::new("name", Type::NonNullNamed(arcstr::literal!("String"))).resolver(
                resolver_fn(|ctx| {
                    let a = ctx
                        .parent
                        .downcast_host::<Argument>()
                        .ok_or_else(|| internal("__InputValue"))?;
                    Ok(ResolvedValue::scalar(a.name.to_string()))
                }),
            ),
            Field::new("description", Type::Named(arcstr::literal!("String"))).resolver(
                resolver_fn(|ctx| {
                    let a = ctx
                        .parent
                        .downcast_host::<Argument>()
                        .ok_or_else(|| internal("__InputValue"))?;
                    Ok(string_or_null(a.description.as_deref()))
                }),
            ),
            Field::new("type", Type::NonNullNamed(arcstr::literal!("__Type"))).resolver(
                resolver_fn(|ctx| {
                    let a = ctx
                        .parent
                        .downcast_host::<Argument>()
                        .ok_or_else(|| internal("__InputValue"))?;
                    Ok(type_ref(a.arg_type.clone()))
                }),
            ),
            Field::new("defaultValue", Type::Named(arcstr::literal!("String"))).resolver(
                resolver_fn(|ctx| {
                    let a = ctx
                        .parent
                        .downcast_host::<Argument>()
                        .ok_or_else(|| internal("__InputValue"))?;
                    Ok(a.default_value
                        .as_ref()
                        .map_or_else(ResolvedValue::null, |v| {
                            ResolvedValue::scalar(v.to_string())
                        }))
                }),
            ),
        ],
    )
    .into_meta()
}

fn enum_value_meta() -> MetaType {
    ObjectMeta::new(
        "__EnumValue",
        vec![
            Field::new("name", Type::NonNullNamed(arcstr::literal!("String"))).resolver(
                resolver_fn(|ctx| {
                    let v = ctx
                        .parent
                        .downcast_host::<EnumValue>()
                        .ok_or_else(|| internal("__EnumValue"))?;
                    Ok(ResolvedValue::scalar(v.name.to_string()))
                }),
            ),
            Field::new("description", Type::Named(arcstr::literal!("String"))).resolver(
                resolver_fn(|ctx| {
                    let v = ctx
                        .parent
                        .downcast_host::<EnumValue>()
                        .ok_or_else(|| internal("__EnumValue"))?;
                    Ok(string_or_null(v.description.as_deref()))
                }),
            ),
            Field::new(
                "isDeprecated",
                Type::NonNullNamed(arcstr::literal!("Boolean")),
            )
            .resolver(resolver_fn(|ctx| {
                let v = ctx
                    .parent
                    .downcast_host::<EnumValue>()
                    .ok_or_else(|| internal("__EnumValue"))?;
                Ok(ResolvedValue::scalar(
                    v.deprecation_status.is_deprecated(),
                ))
            })),
            Field::new("deprecationReason", Type::Named(arcstr::literal!("String"))).resolver(
                resolver_fn(|ctx| {
                    let v = ctx
                        .parent
                        .downcast_host::<EnumValue>()
                        .ok_or_else(|| internal("__EnumValue"))?;
                    Ok(string_or_null(v.deprecation_status.reason()))
                }),
            ),
        ],
    )
    .into_meta()
}

fn directive_meta() -> MetaType {
    ObjectMeta::new(
        "__Directive",
        vec![
            Field::new("name", Type::NonNullNamed(arcstr::literal!("String"))).resolver(
                resolver_fn(|ctx| {
                    let d = ctx
                        .parent
                        .downcast_host::<DirectiveType>()
                        .ok_or_else(|| internal("__Directive"))?;
                    Ok(ResolvedValue::scalar(d.name.to_string()))
                }),
            ),
            Field::new("description", Type::Named(arcstr::literal!("String"))).resolver(
                resolver_fn(|ctx| {
                    let d = ctx
                        .parent
                        .downcast_host::<DirectiveType>()
                        .ok_or_else(|| internal("__Directive"))?;
                    Ok(string_or_null(d.description.as_deref()))
                }),
            ),
            Field::new(
                "locations",
                Type::NonNullList(Box::new(Type::NonNullNamed(arcstr::literal!(
                    "__DirectiveLocation"
                )))),
            )
            .resolver(resolver_fn(|ctx| {
                let d = ctx
                    .parent
                    .downcast_host::<DirectiveType>()
                    .ok_or_else(|| internal("__Directive"))?;
                Ok(ResolvedValue::list(
                    d.locations
                        .iter()
                        .map(|l| ResolvedValue::scalar(l.to_string()))
                        .collect::<Vec<_>>(),
                ))
            })),
            Field::new(
                "args",
                Type::NonNullList(Box::new(Type::NonNullNamed(arcstr::literal!(
                    "__InputValue"
                )))),
            )
            .resolver(resolver_fn(|ctx| {
                let d = ctx
                    .parent
                    .downcast_host::<DirectiveType>()
                    .ok_or_else(|| internal("__Directive"))?;
                Ok(ResolvedValue::list(
                    d.arguments
                        .iter()
                        .map(|a| ResolvedValue::host(a.clone()))
                        .collect::<Vec<_>>(),
                ))
            })),
        ],
    )
    .into_meta()
}

fn type_kind_meta() -> MetaType {
    EnumMeta::new(
        "__TypeKind",
        [
            "SCALAR",
            "OBJECT",
            "INTERFACE",
            "UNION",
            "ENUM",
            "INPUT_OBJECT",
            "LIST",
            "NON_NULL",
        ]
        .into_iter()
        .map(EnumValue::new)
        .collect(),
    )
    .into_meta()
}

fn directive_location_meta() -> MetaType {
    EnumMeta::new(
        "__DirectiveLocation",
        [
            "QUERY",
            "MUTATION",
            "SUBSCRIPTION",
            "FIELD",
            "FRAGMENT_DEFINITION",
            "FRAGMENT_SPREAD",
            "INLINE_FRAGMENT",
        ]
        .into_iter()
        .map(EnumValue::new)
        .collect(),
    )
    .into_meta()
}
