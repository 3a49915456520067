//! Resolving subscription operations into response streams.

use std::{collections::HashSet, pin::Pin, sync::Arc};

use futures::{future, stream, Stream, StreamExt as _};
use indexmap::IndexMap;

use crate::{
    ast::{Document, Operation, OperationType},
    extensions::run_event_chain,
    parser::Spanning,
    scope::ScopedMap,
    validation::RuleError,
    value::Value,
    GraphQLError, RootNode,
};

use super::{
    execute_selection_set,
    fields::{coerce_argument_values, collect_fields},
    ExecutionContext, ExecutionError, FieldPath, PathSegment, ResolvedStream, ResolvedValue,
    Variables,
};

/// The response produced for one subscription source event.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionOutput {
    /// The response data of this event.
    pub data: Value,
    /// The field errors collected while executing this event.
    pub errors: Vec<ExecutionError>,
}

impl ExecutionOutput {
    /// Wraps pure data into an output with no errors.
    pub fn from_data(data: Value) -> Self {
        Self {
            data,
            errors: vec![],
        }
    }
}

/// A stream of per-event subscription responses.
///
/// Termination of the upstream source terminates this stream.
pub type ValuesStream<'a> = Pin<Box<dyn Stream<Item = ExecutionOutput> + Send + 'a>>;

/// Creates a new execution context and resolves a validated subscription
/// operation into a stream of responses, one per source event.
///
/// Returns [`GraphQLError::NotSubscription`] if a query or mutation is
/// passed.
pub async fn resolve_validated_subscription<'a>(
    document: &'a Document,
    operation: &'a Spanning<Operation>,
    root_node: &'a RootNode,
    variables: &Variables,
    root_value: &ResolvedValue,
    extension_payload: Arc<Value>,
) -> Result<ValuesStream<'a>, GraphQLError> {
    if operation.item.operation_type != OperationType::Subscription {
        return Err(GraphQLError::NotSubscription);
    }

    let coerced_variables = Arc::new(
        super::coerce_variable_values(&root_node.schema, operation, variables)
            .map_err(GraphQLError::ValidationError)?,
    );

    let Some(subscription_type) = root_node.schema.concrete_subscription_type() else {
        return Err(RuleError::new(
            "Schema is not configured for subscriptions",
            &[operation.span.start],
        )
        .into());
    };

    let request_scope = ScopedMap::root();
    let ctx = ExecutionContext::new(
        root_node,
        document,
        Arc::clone(&coerced_variables),
        Arc::clone(&request_scope),
        Arc::clone(&extension_payload),
    );

    // The subscription root must collect down to exactly one field.
    let mut grouped = IndexMap::new();
    let mut visited = HashSet::new();
    collect_fields(
        &ctx,
        subscription_type,
        &[&operation.item.selection_set],
        &mut visited,
        &mut grouped,
    );
    if grouped.len() != 1 {
        return Err(RuleError::new(
            "Subscription operations must select exactly one top-level field",
            &[operation.span.start],
        )
        .into());
    }
    let (response_key, nodes) = grouped.first().expect("one grouped field");
    let (response_key, node) = (*response_key, nodes[0]);
    let field_name = node.item.name.item.as_str();
    let location = node.span.start;

    let Some(field_def) = subscription_type.field_by_name(field_name) else {
        return Err(RuleError::new(
            &format!(
                r#"Field "{field_name}" does not exist on type "{}""#,
                subscription_type.name(),
            ),
            &[location],
        )
        .into());
    };

    let args = match coerce_argument_values(&ctx, field_def, node) {
        Ok(args) => args,
        Err((error, pos)) => return Err(RuleError::new(error.message(), &[pos]).into()),
    };

    let resolver_ctx = ctx.resolver_context(root_value.clone(), args, field_name);
    let source: ResolvedStream = if let Some(subscriber) = &field_def.subscriber {
        match subscriber(resolver_ctx).await {
            Ok(source) => source,
            Err(error) => {
                // Subscribing itself failed: a single error response, then
                // the stream ends.
                let output = ExecutionOutput {
                    data: Value::Null,
                    errors: vec![ExecutionError::new(
                        location,
                        vec![PathSegment::Key(response_key.into())],
                        error,
                    )],
                };
                return Ok(Box::pin(stream::once(future::ready(output))));
            }
        }
    } else if let Some(resolver) = &field_def.resolver {
        // A plain resolver acts as a single-event source.
        Box::pin(stream::once(resolver(resolver_ctx)))
    } else {
        return Err(RuleError::new(
            &format!(r#"Subscription field "{field_name}" defines no subscription source"#),
            &[location],
        )
        .into());
    };

    let stream = source.then(move |event| {
        let variables = Arc::clone(&coerced_variables);
        let payload = Arc::clone(&extension_payload);
        let event_scope = request_scope.child();
        async move {
            match event {
                Err(error) => ExecutionOutput {
                    data: Value::Null,
                    errors: vec![ExecutionError::new(
                        location,
                        vec![PathSegment::Key(response_key.into())],
                        error,
                    )],
                },
                Ok(value) => {
                    let ctx =
                        ExecutionContext::new(root_node, document, variables, event_scope, payload);
                    let event_value = ResolvedValue::SubscriptionEvent(Box::new(value));
                    run_event_chain(
                        ctx.extensions,
                        Box::new(|| {
                            Box::pin(async {
                                let path = Arc::new(FieldPath::Root(operation.span.start));
                                let data = execute_selection_set(
                                    &ctx,
                                    vec![&operation.item.selection_set],
                                    subscription_type,
                                    event_value,
                                    false,
                                    path,
                                )
                                .await
                                .unwrap_or(Value::Null);
                                let errors =
                                    std::mem::take(&mut *ctx.errors.write().unwrap());
                                ExecutionOutput { data, errors }
                            })
                        }),
                    )
                    .await
                }
            }
        }
    });

    Ok(Box::pin(stream))
}
