use crate::{
    executor::{ExecutionError, Variables},
    parser::testing,
    schema::model::SchemaType,
    value::Value,
    GraphQLError, ResolvedValue, RootNode,
};

pub(crate) fn root_node(schema: SchemaType) -> RootNode {
    RootNode::new(schema, testing::parse_document)
}

/// Runs a query against a `null` root value and unwraps pre-execution
/// failures.
pub(crate) async fn run(root_node: &RootNode, q: &str) -> (Value, Vec<ExecutionError>) {
    run_with_vars(root_node, q, &Variables::new()).await
}

pub(crate) async fn run_with_vars(
    root_node: &RootNode,
    q: &str,
    variables: &Variables,
) -> (Value, Vec<ExecutionError>) {
    crate::execute(q, None, root_node, variables, &ResolvedValue::null())
        .await
        .unwrap_or_else(|e| panic!("Request failed: {e}"))
}

pub(crate) async fn run_err(root_node: &RootNode, q: &str, variables: &Variables) -> GraphQLError {
    match crate::execute(q, None, root_node, variables, &ResolvedValue::null()).await {
        Ok((data, errors)) => panic!("Expected a request failure, got: {data} / {errors:?}"),
        Err(e) => e,
    }
}

/// The response data as JSON for shape assertions.
pub(crate) fn json(data: &Value) -> serde_json::Value {
    serde_json::to_value(data).expect("serializable response data")
}
