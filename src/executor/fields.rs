//! Field collection, resolver dispatch and value completion.

use std::{collections::HashSet, sync::Arc};

use arcstr::ArcStr;
use futures::future::{self, BoxFuture};
use indexmap::IndexMap;

use crate::{
    ast::{self, Directive, InputValue, Selection, Type},
    coercion,
    extensions::{run_complete_chain, run_field_chain, run_resolve_chain},
    parser::{SourcePosition, Spanning},
    schema::meta::{self, MetaType},
    value::{Object, Value},
};

use super::{
    extract_resolved, Arguments, ExecutionContext, FieldError, FieldPath, FieldResult,
    PropagateNull, ResolvedValue,
};

type GroupedFieldSet<'e> = IndexMap<&'e str, Vec<&'e Spanning<ast::Field>>>;

/// Evaluates the `if:` argument of a `@skip`/`@include` directive.
fn directive_if_value(ctx: &ExecutionContext<'_>, directive: &Spanning<Directive>) -> Option<bool> {
    directive
        .item
        .arguments
        .as_ref()?
        .item
        .get("if")
        .and_then(|v| match &v.item {
            InputValue::Boolean(b) => Some(*b),
            InputValue::Variable(name) => ctx
                .variables
                .get(name)
                .and_then(InputValue::as_boolean_value),
            _ => None,
        })
}

/// Whether a selection survives its `@skip`/`@include` directives.
fn should_include(
    ctx: &ExecutionContext<'_>,
    directives: &Option<Vec<Spanning<Directive>>>,
) -> bool {
    for directive in directives.iter().flatten() {
        let name = directive.item.name.item.as_str();
        if name == "skip" && directive_if_value(ctx, directive) == Some(true) {
            return false;
        }
        if name == "include" && directive_if_value(ctx, directive) == Some(false) {
            return false;
        }
    }
    true
}

/// Whether a fragment with the given type condition applies to an object
/// type: an exact match, an interface the object implements, or a union
/// containing the object.
fn does_fragment_type_apply(
    ctx: &ExecutionContext<'_>,
    object_type: &MetaType,
    condition: &str,
) -> bool {
    if *object_type.name() == condition {
        return true;
    }
    match ctx.schema.concrete_type_by_name(condition) {
        Some(meta @ (MetaType::Interface(_) | MetaType::Union(_))) => {
            ctx.schema.is_possible_type(meta, object_type)
        }
        _ => false,
    }
}

/// Groups the fields of the given selection sets by response key, in
/// first-occurrence order.
///
/// Honors `@skip`/`@include`, expands fragments against the object type,
/// and keeps a visited-name set so fragment spreads can never cycle.
pub(crate) fn collect_fields<'e>(
    ctx: &ExecutionContext<'e>,
    object_type: &'e MetaType,
    selection_sets: &[&'e [Selection]],
    visited_fragments: &mut HashSet<&'e str>,
    grouped: &mut GroupedFieldSet<'e>,
) {
    for selection_set in selection_sets {
        for selection in *selection_set {
            match selection {
                Selection::Field(field) => {
                    if !should_include(ctx, &field.item.directives) {
                        continue;
                    }
                    grouped
                        .entry(field.item.response_key())
                        .or_default()
                        .push(field);
                }

                Selection::FragmentSpread(spread) => {
                    if !should_include(ctx, &spread.item.directives) {
                        continue;
                    }
                    let name = spread.item.name.item.as_str();
                    if !visited_fragments.insert(name) {
                        continue;
                    }
                    // An unknown fragment name is validation's to report.
                    let Some(fragment) = ctx.fragments.get(name).copied() else {
                        continue;
                    };
                    if does_fragment_type_apply(ctx, object_type, &fragment.type_condition.item) {
                        collect_fields(
                            ctx,
                            object_type,
                            &[&fragment.selection_set],
                            visited_fragments,
                            grouped,
                        );
                    }
                }

                Selection::InlineFragment(inline) => {
                    if !should_include(ctx, &inline.item.directives) {
                        continue;
                    }
                    let applies = inline
                        .item
                        .type_condition
                        .as_ref()
                        .map_or(true, |cond| {
                            does_fragment_type_apply(ctx, object_type, &cond.item)
                        });
                    if applies {
                        collect_fields(
                            ctx,
                            object_type,
                            &[&inline.item.selection_set],
                            visited_fragments,
                            grouped,
                        );
                    }
                }
            }
        }
    }
}

/// Executes a selection set against an object type and value.
///
/// With `serial` set, each field fully completes before the next starts
/// (mutation roots); otherwise all fields run concurrently and join.
/// Response keys appear in collection order either way.
pub(crate) fn execute_selection_set<'e>(
    ctx: &'e ExecutionContext<'e>,
    selection_sets: Vec<&'e [Selection]>,
    object_type: &'e MetaType,
    object_value: ResolvedValue,
    serial: bool,
    path: Arc<FieldPath<'e>>,
) -> BoxFuture<'e, Result<Value, PropagateNull>> {
    Box::pin(async move {
        let mut grouped = GroupedFieldSet::new();
        let mut visited = HashSet::new();
        collect_fields(ctx, object_type, &selection_sets, &mut visited, &mut grouped);

        if grouped.is_empty() && ctx.validation_enabled {
            ctx.push_error(
                FieldError::from(format!(
                    "Objects returned as \"{}\" must select some fields",
                    object_type.name(),
                )),
                *path.location(),
                &path,
            );
            return Err(PropagateNull);
        }

        let mut object = Object::with_capacity(grouped.len());
        if serial {
            for (response_key, nodes) in &grouped {
                match execute_field(ctx, object_type, &object_value, nodes, &path).await {
                    Ok(Some(value)) => {
                        object.add_field(*response_key, value);
                    }
                    Ok(None) => {}
                    Err(PropagateNull) => return Err(PropagateNull),
                }
            }
        } else {
            let field_futures = grouped.iter().map(|(response_key, nodes)| {
                let object_value = &object_value;
                let path = &path;
                async move {
                    (
                        *response_key,
                        execute_field(ctx, object_type, object_value, nodes, path).await,
                    )
                }
            });
            for (response_key, result) in future::join_all(field_futures).await {
                match result {
                    Ok(Some(value)) => {
                        object.add_field(response_key, value);
                    }
                    Ok(None) => {}
                    Err(PropagateNull) => return Err(PropagateNull),
                }
            }
        }

        Ok(Value::Object(object))
    })
}

/// Executes one grouped field: arguments, resolver dispatch, completion.
///
/// `Ok(None)` omits the response key (unknown field with validation off);
/// `Err` kills the enclosing object.
async fn execute_field<'e>(
    ctx: &'e ExecutionContext<'e>,
    object_type: &'e MetaType,
    object_value: &ResolvedValue,
    nodes: &Vec<&'e Spanning<ast::Field>>,
    path: &Arc<FieldPath<'e>>,
) -> Result<Option<Value>, PropagateNull> {
    let node = nodes[0];
    let field_name = node.item.name.item.as_str();
    let location = node.span.start;
    let field_path = Arc::new(FieldPath::Field(
        node.item.response_key(),
        location,
        Arc::clone(path),
    ));

    if field_name == "__typename" {
        return Ok(Some(Value::scalar(object_type.name().to_string())));
    }

    let Some(field_def) = object_type.field_by_name(field_name) else {
        if ctx.validation_enabled {
            ctx.push_error(
                FieldError::from(format!(
                    r#"Field "{field_name}" does not exist on type "{}""#,
                    object_type.name(),
                )),
                location,
                &field_path,
            );
        }
        return Ok(None);
    };

    let result = run_field_chain(
        ctx.extensions,
        field_name,
        Box::new(move || {
            Box::pin(async move {
                let args = match coerce_argument_values(ctx, field_def, node) {
                    Ok(args) => args,
                    Err((error, pos)) => {
                        ctx.push_error(error, pos, &field_path);
                        return failed_field(field_def);
                    }
                };

                let resolved = run_resolve_chain(
                    ctx.extensions,
                    field_name,
                    Box::new(move || {
                        Box::pin(dispatch_resolver(
                            ctx,
                            object_type,
                            field_def,
                            object_value,
                            args,
                            field_name,
                        ))
                    }),
                )
                .await;

                match resolved {
                    Err(error) => {
                        ctx.push_error(error, location, &field_path);
                        failed_field(field_def)
                    }
                    Ok(raw) => {
                        run_complete_chain(
                            ctx.extensions,
                            &field_def.field_type,
                            Box::new(move || {
                                complete_value(
                                    ctx,
                                    &field_def.field_type,
                                    nodes.clone(),
                                    raw,
                                    location,
                                    field_path,
                                )
                            }),
                        )
                        .await
                    }
                }
            })
        }),
    )
    .await;

    result.map(Some)
}

/// Field-error outcome at the field itself: nullable fields absorb into
/// `null`, non-null fields propagate.
fn failed_field(field_def: &meta::Field) -> Result<Value, PropagateNull> {
    if field_def.field_type.is_non_null() {
        Err(PropagateNull)
    } else {
        Ok(Value::Null)
    }
}

/// Coerces the declared arguments of a field from its AST node and the
/// request variables.
pub(crate) fn coerce_argument_values(
    ctx: &ExecutionContext<'_>,
    field_def: &meta::Field,
    node: &Spanning<ast::Field>,
) -> Result<Arguments, (FieldError, SourcePosition)> {
    let mut out = Arguments::default();
    let Some(arg_defs) = &field_def.arguments else {
        return Ok(out);
    };

    for def in arg_defs {
        let provided = node
            .item
            .arguments
            .as_ref()
            .and_then(|args| args.item.get(&def.name));

        match provided {
            Some(value_node) => {
                match coercion::coerce_input_literal(
                    ctx.schema,
                    &def.arg_type,
                    value_node,
                    &ctx.variables,
                ) {
                    Ok(Some(value)) => out.insert(def.name.to_string(), value),
                    // A referenced variable was absent: fall back to the
                    // argument default, then to the non-null check.
                    Ok(None) => match &def.default_value {
                        Some(default) => out.insert(def.name.to_string(), default.clone()),
                        None if def.arg_type.is_non_null() => {
                            return Err((
                                FieldError::from(format!(
                                    r#"Argument "{}" of required type "{}" was not provided"#,
                                    def.name, def.arg_type,
                                )),
                                value_node.span.start,
                            ));
                        }
                        None => {}
                    },
                    Err(rule_error) => {
                        let pos = rule_error
                            .locations()
                            .first()
                            .copied()
                            .unwrap_or(node.span.start);
                        return Err((FieldError::from(rule_error.message().to_string()), pos));
                    }
                }
            }
            None => match &def.default_value {
                Some(default) => out.insert(def.name.to_string(), default.clone()),
                None if def.arg_type.is_non_null() => {
                    return Err((
                        FieldError::from(format!(
                            r#"Argument "{}" of required type "{}" was not provided"#,
                            def.name, def.arg_type,
                        )),
                        node.span.start,
                    ));
                }
                None => {}
            },
        }
    }

    Ok(out)
}

/// Resolves the raw value of a field, trying in order: subscription-event
/// passthrough, the field's resolver, mapping-like lookup, lazy host
/// serialization, the engine default resolver, `null`.
async fn dispatch_resolver(
    ctx: &ExecutionContext<'_>,
    object_type: &MetaType,
    field_def: &meta::Field,
    object_value: &ResolvedValue,
    args: Arguments,
    field_name: &str,
) -> FieldResult<ResolvedValue> {
    if let ResolvedValue::SubscriptionEvent(inner) = object_value {
        if field_def.resolver.is_none() {
            return Ok((**inner).clone());
        }
    }

    if let Some(resolver) = &field_def.resolver {
        let parent = match object_value {
            ResolvedValue::SubscriptionEvent(inner) => (**inner).clone(),
            v => v.clone(),
        };
        return resolver(ctx.resolver_context(parent, args, field_name)).await;
    }

    if let Some(value) = object_value.lookup(field_name) {
        return Ok(value);
    }

    if let ResolvedValue::Host(host) = object_value {
        let serialized = ctx
            .schema
            .serde_registry()
            .serialize_host(object_type.name(), host.as_ref())
            .or_else(|| match object_type {
                MetaType::Object(o) => o
                    .host_serializer
                    .as_ref()
                    .and_then(|serialize| serialize(host.as_ref())),
                _ => None,
            });
        if let Some(value) = serialized {
            let field_value = value
                .as_object_value()
                .and_then(|o| o.get_field_value(field_name).cloned())
                .unwrap_or(Value::Null);
            return Ok(ResolvedValue::Value(field_value));
        }
    }

    if let Some(default) = &ctx.default_resolver {
        return default(ctx.resolver_context(object_value.clone(), args, field_name)).await;
    }

    Ok(ResolvedValue::null())
}

/// Completes a raw resolved value against the declared field type.
///
/// An `Err` means a field error was recorded and this position was
/// non-null, so the `null` keeps propagating; nullable positions absorb
/// child failures into `null`.
fn complete_value<'e>(
    ctx: &'e ExecutionContext<'e>,
    field_type: &'e Type,
    nodes: Vec<&'e Spanning<ast::Field>>,
    value: ResolvedValue,
    location: SourcePosition,
    path: Arc<FieldPath<'e>>,
) -> BoxFuture<'e, Result<Value, PropagateNull>> {
    Box::pin(async move {
        let value = match extract_resolved(value).await {
            Ok(value) => value,
            Err(error) => {
                ctx.push_error(error, location, &path);
                return if field_type.is_non_null() {
                    Err(PropagateNull)
                } else {
                    Ok(Value::Null)
                };
            }
        };

        match field_type {
            Type::Named(_) | Type::List(_) => {
                match complete_inner(ctx, field_type, nodes, value, location, &path).await {
                    Ok(completed) => Ok(completed),
                    // The error is recorded further down; this nullable
                    // position absorbs the propagating null.
                    Err(PropagateNull) => Ok(Value::Null),
                }
            }
            Type::NonNullNamed(_) | Type::NonNullList(_) => {
                let completed =
                    complete_inner(ctx, field_type, nodes.clone(), value, location, &path).await?;
                if completed.is_null() {
                    let field_name = nodes
                        .first()
                        .map(|n| n.item.name.item.as_str())
                        .unwrap_or_default();
                    ctx.push_error(
                        FieldError::from(format!(
                            r#"Cannot return null for non-nullable field "{field_name}""#,
                        )),
                        location,
                        &path,
                    );
                    Err(PropagateNull)
                } else {
                    Ok(completed)
                }
            }
        }
    })
}

/// Completes the unwrapped form of a type: a named type or a list.
async fn complete_inner<'e>(
    ctx: &'e ExecutionContext<'e>,
    field_type: &'e Type,
    nodes: Vec<&'e Spanning<ast::Field>>,
    value: ResolvedValue,
    location: SourcePosition,
    path: &Arc<FieldPath<'e>>,
) -> Result<Value, PropagateNull> {
    match field_type {
        Type::Named(name) | Type::NonNullNamed(name) => {
            complete_named(ctx, name, nodes, value, location, path).await
        }
        Type::List(inner) | Type::NonNullList(inner) => {
            complete_list(ctx, inner, nodes, value, location, path).await
        }
    }
}

async fn complete_named<'e>(
    ctx: &'e ExecutionContext<'e>,
    name: &'e ArcStr,
    nodes: Vec<&'e Spanning<ast::Field>>,
    value: ResolvedValue,
    location: SourcePosition,
    path: &Arc<FieldPath<'e>>,
) -> Result<Value, PropagateNull> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let Some(meta) = ctx.schema.concrete_type_by_name(name) else {
        ctx.push_error(
            FieldError::from(format!(r#"Unknown type "{name}""#)),
            location,
            path,
        );
        return Err(PropagateNull);
    };

    match meta {
        MetaType::Scalar(_) | MetaType::Enum(_) => {
            let raw = match value {
                ResolvedValue::Value(v) => v,
                other => {
                    ctx.push_error(
                        FieldError::from(format!(
                            r#"Resolved value for leaf type "{name}" is not serializable: {other:?}"#,
                        )),
                        location,
                        path,
                    );
                    return Err(PropagateNull);
                }
            };
            match meta.serialize_leaf(&raw) {
                Ok(serialized) => Ok(serialized),
                Err(error) => {
                    ctx.push_error(error, location, path);
                    Err(PropagateNull)
                }
            }
        }

        MetaType::Object(_) => {
            execute_selection_set(
                ctx,
                merged_selection_sets(&nodes),
                meta,
                value,
                false,
                Arc::clone(path),
            )
            .await
        }

        MetaType::Interface(_) | MetaType::Union(_) => {
            let concrete_name = match resolve_abstract_type(ctx, meta, &value) {
                Ok(concrete_name) => concrete_name,
                Err(error) => {
                    ctx.push_error(error, location, path);
                    return Err(PropagateNull);
                }
            };
            let concrete = ctx
                .schema
                .concrete_type_by_name(&concrete_name)
                .expect("resolved abstract type exists in schema");
            execute_selection_set(
                ctx,
                merged_selection_sets(&nodes),
                concrete,
                value,
                false,
                Arc::clone(path),
            )
            .await
        }

        MetaType::InputObject(_) => {
            ctx.push_error(
                FieldError::from(format!(
                    r#"Input object "{name}" cannot be used in output position"#,
                )),
                location,
                path,
            );
            Err(PropagateNull)
        }
    }
}

/// The merged sub-selections of every field node sharing a response key.
fn merged_selection_sets<'e>(nodes: &[&'e Spanning<ast::Field>]) -> Vec<&'e [Selection]> {
    nodes
        .iter()
        .filter_map(|node| node.item.selection_set.as_deref())
        .collect()
}

async fn complete_list<'e>(
    ctx: &'e ExecutionContext<'e>,
    inner_type: &'e Type,
    nodes: Vec<&'e Spanning<ast::Field>>,
    value: ResolvedValue,
    location: SourcePosition,
    path: &Arc<FieldPath<'e>>,
) -> Result<Value, PropagateNull> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let items: Vec<ResolvedValue> = match value {
        ResolvedValue::List(items) => items,
        ResolvedValue::Value(Value::List(values)) => {
            values.into_iter().map(ResolvedValue::Value).collect()
        }
        other => {
            ctx.push_error(
                FieldError::from(format!("Expected a list, found: {other:?}")),
                location,
                path,
            );
            return Err(PropagateNull);
        }
    };

    let item_futures = items.into_iter().enumerate().map(|(index, item)| {
        let item_path = Arc::new(FieldPath::Index(index, location, Arc::clone(path)));
        complete_value(ctx, inner_type, nodes.clone(), item, location, item_path)
    });

    let mut completed = Vec::new();
    for result in future::join_all(item_futures).await {
        completed.push(result?);
    }
    Ok(Value::List(completed))
}

/// Selects the concrete object type for a value of an abstract type.
///
/// Strategies in order, first match wins: the type's `resolve_type`
/// callback, a uniquely matching `is_type_of`, a `__typename` entry of a
/// mapping value, a uniquely matching structural check, the first
/// candidate whose serializer accepts the value.
fn resolve_abstract_type(
    ctx: &ExecutionContext<'_>,
    abstract_type: &MetaType,
    value: &ResolvedValue,
) -> FieldResult<ArcStr> {
    let possible = ctx.schema.possible_types(abstract_type);
    let mut attempts: Vec<String> = Vec::new();

    let resolve_type = match abstract_type {
        MetaType::Interface(i) => i.resolve_type.as_ref(),
        MetaType::Union(u) => u.resolve_type.as_ref(),
        _ => None,
    };
    if let Some(resolve_type) = resolve_type {
        match resolve_type(value, ctx.schema) {
            Some(name) if possible.iter().any(|t| *t.name() == name) => return Ok(name),
            Some(name) => {
                return Err(FieldError::from(format!(
                    r#"resolveType returned "{name}", which is not a possible type of "{}""#,
                    abstract_type.name(),
                )));
            }
            None => attempts.push("resolveType returned no type".into()),
        }
    }

    let is_type_of_matches: Vec<&ArcStr> = possible
        .iter()
        .filter_map(|t| match t {
            MetaType::Object(o) => o
                .is_type_of
                .as_ref()
                .filter(|is_type_of| is_type_of(value))
                .map(|_| &o.name),
            _ => None,
        })
        .collect();
    match is_type_of_matches.len() {
        1 => return Ok(is_type_of_matches[0].clone()),
        0 => attempts.push("no isTypeOf check matched".into()),
        n => attempts.push(format!("{n} isTypeOf checks matched")),
    }

    if let Some(ResolvedValue::Value(Value::Scalar(s))) = value.lookup("__typename") {
        if let Some(type_name) = s.as_str() {
            if let Some(t) = possible.iter().find(|t| *t.name() == type_name) {
                return Ok(t.name().clone());
            }
            attempts.push(format!(
                r#"value carries "__typename": "{type_name}", which is not a possible type"#,
            ));
        }
    } else {
        attempts.push("value carries no \"__typename\"".into());
    }

    let structural_matches: Vec<&ArcStr> = possible
        .iter()
        .filter_map(|t| match t {
            MetaType::Object(o) if fields_match_structurally(o, value) => Some(&o.name),
            _ => None,
        })
        .collect();
    match structural_matches.len() {
        1 => return Ok(structural_matches[0].clone()),
        0 => attempts.push("no structural check matched".into()),
        n => attempts.push(format!("{n} structural checks matched")),
    }

    if let ResolvedValue::Host(host) = value {
        for t in &possible {
            let serialized = ctx
                .schema
                .serde_registry()
                .serialize_host(t.name(), host.as_ref())
                .or_else(|| match t {
                    MetaType::Object(o) => o
                        .host_serializer
                        .as_ref()
                        .and_then(|serialize| serialize(host.as_ref())),
                    _ => None,
                });
            if serialized.is_some() {
                return Ok(t.name().clone());
            }
            attempts.push(format!(r#"serializer for "{}" rejected the value"#, t.name()));
        }
    }

    Err(FieldError::from(format!(
        r#"Could not resolve the concrete type of abstract type "{}": {}"#,
        abstract_type.name(),
        attempts.join("; "),
    )))
}

/// Structural check used as the generic nominal test for mapping values:
/// every non-null field of the candidate type appears as a key.
fn fields_match_structurally(object: &meta::ObjectMeta, value: &ResolvedValue) -> bool {
    let keys: Vec<&str> = match value {
        ResolvedValue::Object(map) => map.keys().map(String::as_str).collect(),
        ResolvedValue::Value(Value::Object(o)) => o.iter().map(|(k, _)| k.as_str()).collect(),
        _ => return false,
    };
    object
        .fields
        .iter()
        .filter(|f| f.field_type.is_non_null())
        .all(|f| keys.contains(&f.name.as_str()))
}
