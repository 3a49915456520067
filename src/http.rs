//! Utilities for building HTTP endpoints in a library-agnostic manner

use serde::{
    ser::{self, SerializeMap},
    Deserialize, Serialize,
};

use crate::{
    ast::InputValue,
    executor::{ExecutionError, ResolvedValue, Variables},
    value::{Object, Value},
    GraphQLError, RootNode,
};

/// The expected structure of the decoded JSON document for either POST or
/// GET requests.
///
/// For POST, you can use Serde to deserialize the incoming JSON data
/// directly into this struct. For GET, you will need to parse the query
/// string and extract `query`, `operationName`, and `variables` manually.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GraphQLRequest {
    query: String,
    #[serde(rename = "operationName", default, skip_serializing_if = "Option::is_none")]
    operation_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    variables: Option<InputValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    extensions: Option<InputValue>,
    #[serde(rename = "sourceUrl", default, skip_serializing_if = "Option::is_none")]
    source_url: Option<String>,
}

impl GraphQLRequest {
    /// Constructs a new [`GraphQLRequest`] from parts.
    pub fn new(
        query: String,
        operation_name: Option<String>,
        variables: Option<InputValue>,
    ) -> Self {
        Self {
            query,
            operation_name,
            variables,
            extensions: None,
            source_url: None,
        }
    }

    /// The name of the operation to run, if the request picks one.
    pub fn operation_name(&self) -> Option<&str> {
        self.operation_name.as_deref()
    }

    /// The supplied variable values as a map.
    pub fn variables(&self) -> Variables {
        self.variables
            .as_ref()
            .and_then(|iv| {
                iv.to_object_value().map(|o| {
                    o.into_iter()
                        .map(|(k, v)| (k.to_owned(), v.clone()))
                        .collect()
                })
            })
            .unwrap_or_default()
    }

    /// The request's extension payload as response-shaped data.
    pub fn extension_payload(&self) -> Value {
        self.extensions.as_ref().map(json_shaped).unwrap_or(Value::Null)
    }

    /// The source URL supplied for diagnostics, if any.
    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    /// Executes this request against the provided schema.
    pub async fn execute(
        &self,
        root_node: &RootNode,
        root_value: &ResolvedValue,
    ) -> GraphQLResponse {
        GraphQLResponse(
            crate::execute_with_extension_payload(
                &self.query,
                self.operation_name(),
                root_node,
                &self.variables(),
                root_value,
                self.extension_payload(),
            )
            .await,
        )
    }
}

/// Converts a constant input value into its response-shaped form.
fn json_shaped(v: &InputValue) -> Value {
    match v {
        InputValue::Null | InputValue::Variable(_) => Value::Null,
        InputValue::Int(i) => Value::scalar(*i),
        InputValue::Float(f) => Value::scalar(*f),
        InputValue::Boolean(b) => Value::scalar(*b),
        InputValue::String(s) | InputValue::Enum(s) => Value::scalar(s.as_str()),
        InputValue::List(l) => Value::List(l.iter().map(|v| json_shaped(&v.item)).collect()),
        InputValue::Object(o) => Value::Object(
            o.iter()
                .map(|(k, v)| (k.item.clone(), json_shaped(&v.item)))
                .collect::<Object>(),
        ),
    }
}

/// Simple wrapper around the result of executing a GraphQL operation.
///
/// This struct implements [`Serialize`], so you can simply serialize it to
/// JSON and send it over the wire. Use the [`is_ok`](GraphQLResponse::is_ok)
/// method to determine whether to send a 200 or 400 HTTP status code.
#[derive(Debug)]
pub struct GraphQLResponse(Result<(Value, Vec<ExecutionError>), GraphQLError>);

impl GraphQLResponse {
    /// Constructs a response from the result of the execution pipeline.
    pub fn from_result(r: Result<(Value, Vec<ExecutionError>), GraphQLError>) -> Self {
        Self(r)
    }

    /// Constructs an error response outside the normal execution pipeline.
    pub fn error(error: GraphQLError) -> Self {
        Self(Err(error))
    }

    /// Was the request successful or not?
    ///
    /// There might still be errors in the response even though it is
    /// considered OK; that is by design in GraphQL.
    pub fn is_ok(&self) -> bool {
        self.0.is_ok()
    }
}

impl Serialize for GraphQLResponse {
    fn serialize<S: ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.0 {
            Ok((data, errors)) => {
                let mut map = serializer.serialize_map(None)?;

                map.serialize_entry("data", data)?;
                if !errors.is_empty() {
                    map.serialize_entry("errors", errors)?;
                }

                map.end()
            }
            Err(error) => {
                // The request failed before execution began.
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("data", &Value::Null)?;
                map.serialize_entry("errors", error)?;
                map.serialize_entry("didExecute", &false)?;
                map.end()
            }
        }
    }
}

/// Wraps [`GraphQLRequest`], allowing an array of requests to be handled
/// in one request.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GraphQLBatchRequest {
    /// A single operation request.
    Single(GraphQLRequest),
    /// Multiple operation requests handled at once.
    Batch(Vec<GraphQLRequest>),
}

impl GraphQLBatchRequest {
    /// Executes all contained requests.
    pub async fn execute(
        &self,
        root_node: &RootNode,
        root_value: &ResolvedValue,
    ) -> GraphQLBatchResponse {
        match self {
            Self::Single(request) => {
                GraphQLBatchResponse::Single(request.execute(root_node, root_value).await)
            }
            Self::Batch(requests) => {
                let mut responses = Vec::with_capacity(requests.len());
                for request in requests {
                    responses.push(request.execute(root_node, root_value).await);
                }
                GraphQLBatchResponse::Batch(responses)
            }
        }
    }
}

/// Wraps [`GraphQLResponse`] so that multiple responses can be returned
/// for a batched request.
#[derive(Debug)]
pub enum GraphQLBatchResponse {
    /// A single response.
    Single(GraphQLResponse),
    /// Multiple responses handled at once.
    Batch(Vec<GraphQLResponse>),
}

impl GraphQLBatchResponse {
    /// Whether all contained responses are ok.
    pub fn is_ok(&self) -> bool {
        match self {
            Self::Single(response) => response.is_ok(),
            Self::Batch(batch) => batch.iter().all(GraphQLResponse::is_ok),
        }
    }
}

impl Serialize for GraphQLBatchResponse {
    fn serialize<S: ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Single(response) => response.serialize(serializer),
            Self::Batch(batch) => batch.serialize(serializer),
        }
    }
}
