//! Dynamic GraphQL execution engine.
//!
//! Schemas are constructed at runtime as data: tagged meta types carrying
//! resolver closures, assembled through [`SchemaType::build`]. Documents
//! are supplied pre-parsed by a [`ParseDocument`] collaborator, validated
//! against the schema, and executed into the standard GraphQL response
//! shape.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use larch::{
//!     meta::{Field, ObjectMeta},
//!     ResolvedValue, RootNode, SchemaType, Type, Variables,
//! };
//!
//! # fn parse(_: &str) -> Result<larch::OwnedDocument, larch::Spanning<larch::ParseError>> {
//! #     unimplemented!()
//! # }
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let query = ObjectMeta::new(
//!     "Query",
//!     vec![Field::new("hello", Type::Named("String".into())).resolver(Arc::new(|_ctx| {
//!         Box::pin(async { Ok(ResolvedValue::scalar("world")) })
//!     }))],
//! );
//! let schema = SchemaType::build(query).finish()?;
//! let root_node = RootNode::new(schema, parse);
//!
//! let (data, errors) = larch::execute(
//!     "{ hello }",
//!     None,
//!     &root_node,
//!     &Variables::new(),
//!     &ResolvedValue::null(),
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod ast;
pub mod coercion;
pub mod executor;
pub mod extensions;
pub mod http;
mod integrations;
mod introspection;
pub mod parser;
pub mod schema;
pub mod scope;
mod types;
pub mod validation;
pub mod value;

#[cfg(test)]
mod executor_tests;

use std::sync::Arc;

use itertools::Itertools as _;

use crate::extensions::{run_parse_chain, run_request_chain, run_validate_chain};

pub use crate::schema::meta;
pub use crate::{
    ast::{
        Definition, Document, InputValue, Operation, OperationType, OwnedDocument, Selection, Type,
    },
    executor::{
        execute_validated_query, get_operation, resolve_validated_subscription, resolver_fn,
        Arguments, ExecutionError, ExecutionOutput, FieldError, FieldResult, PathSegment,
        PropagateNull, ResolvedStream, ResolvedValue, ResolverContext, ResolverFn, SubscriberFn,
        ValuesStream, Variables,
    },
    extensions::{Extension, RequestOutcome},
    http::{GraphQLBatchRequest, GraphQLBatchResponse, GraphQLRequest, GraphQLResponse},
    parser::{ParseDocument, ParseError, SourcePosition, Span, Spanning},
    schema::model::{
        DirectiveLocation, DirectiveType, SchemaBuilder, SchemaError, SchemaType, SerdeRegistry,
        TypeType,
    },
    scope::ScopedMap,
    validation::RuleError,
    value::{Object, ScalarValue, Value},
};

/// An error that prevented query execution
#[allow(missing_docs)]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GraphQLError {
    ParseError(Spanning<ParseError>),
    ValidationError(Vec<RuleError>),
    NoOperationProvided,
    MultipleOperationsProvided,
    UnknownOperationName,
    IsSubscription,
    NotSubscription,
}

impl std::fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseError(e) => write!(f, "{e}"),
            Self::ValidationError(errs) => write!(f, "{}", errs.iter().format("\n")),
            Self::NoOperationProvided => write!(f, "No operation provided"),
            Self::MultipleOperationsProvided => write!(f, "Multiple operations provided"),
            Self::UnknownOperationName => write!(f, "Unknown operation name"),
            Self::IsSubscription => write!(f, "Operation is a subscription"),
            Self::NotSubscription => write!(f, "Operation is not a subscription"),
        }
    }
}

impl std::error::Error for GraphQLError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ParseError(e) => Some(e),
            Self::ValidationError(errs) => Some(errs.first()?),
            Self::NoOperationProvided
            | Self::MultipleOperationsProvided
            | Self::UnknownOperationName
            | Self::IsSubscription
            | Self::NotSubscription => None,
        }
    }
}

impl From<Spanning<ParseError>> for GraphQLError {
    fn from(value: Spanning<ParseError>) -> Self {
        Self::ParseError(value)
    }
}

impl From<Vec<RuleError>> for GraphQLError {
    fn from(value: Vec<RuleError>) -> Self {
        Self::ValidationError(value)
    }
}

impl From<RuleError> for GraphQLError {
    fn from(value: RuleError) -> Self {
        vec![value].into()
    }
}

/// The schema, parser collaborator and engine options a request executes
/// against.
///
/// Constructed once and shared by all requests.
pub struct RootNode {
    /// The schema requests execute against.
    pub schema: Arc<SchemaType>,
    pub(crate) parser: Arc<dyn ParseDocument>,
    pub(crate) extensions: Vec<Arc<dyn Extension>>,
    pub(crate) default_resolver: Option<ResolverFn>,
    pub(crate) validation_enabled: bool,
}

impl RootNode {
    /// Bundles a schema with the parser collaborator turning request text
    /// into documents.
    pub fn new(schema: SchemaType, parser: impl ParseDocument + 'static) -> Self {
        Self {
            schema: Arc::new(schema),
            parser: Arc::new(parser),
            extensions: Vec::new(),
            default_resolver: None,
            validation_enabled: true,
        }
    }

    /// Appends an extension to the middleware chain.
    ///
    /// Extensions compose right-to-left: the first added is the outermost.
    #[must_use]
    pub fn with_extension(mut self, extension: impl Extension + 'static) -> Self {
        self.extensions.push(Arc::new(extension));
        self
    }

    /// Sets the engine-level fallback resolver, consulted when every other
    /// resolution strategy for a field comes up empty.
    #[must_use]
    pub fn with_default_resolver(mut self, resolver: ResolverFn) -> Self {
        self.default_resolver = Some(resolver);
        self
    }

    /// Turns off document validation and execution-time field checks.
    #[must_use]
    pub fn disable_validation(mut self) -> Self {
        self.validation_enabled = false;
        self
    }

    /// Parses `source` through the parser collaborator and any
    /// `parse_document` extension hooks.
    pub fn parse_document(&self, source: &str) -> Result<OwnedDocument, Spanning<ParseError>> {
        run_parse_chain(
            &self.extensions,
            source,
            Box::new(move || self.parser.parse_document(source)),
        )
    }

    fn validate_document(&self, document: &Document) -> Vec<RuleError> {
        run_validate_chain(
            &self.extensions,
            document,
            Box::new(move || {
                let mut ctx = validation::ValidatorContext::new(&self.schema, document);
                validation::visit_all_rules(&mut ctx, document);
                ctx.into_errors()
            }),
        )
    }
}

/// Executes a query or mutation in a provided schema.
pub async fn execute(
    document_source: &str,
    operation_name: Option<&str>,
    root_node: &RootNode,
    variables: &Variables,
    root_value: &ResolvedValue,
) -> Result<(Value, Vec<ExecutionError>), GraphQLError> {
    execute_with_extension_payload(
        document_source,
        operation_name,
        root_node,
        variables,
        root_value,
        Value::Null,
    )
    .await
}

/// Executes a query or mutation, making the request's extension payload
/// available to resolvers.
pub async fn execute_with_extension_payload(
    document_source: &str,
    operation_name: Option<&str>,
    root_node: &RootNode,
    variables: &Variables,
    root_value: &ResolvedValue,
    extension_payload: Value,
) -> Result<(Value, Vec<ExecutionError>), GraphQLError> {
    let payload = Arc::new(extension_payload);
    run_request_chain(
        &root_node.extensions,
        Box::new(move || {
            Box::pin(async move {
                let document = root_node.parse_document(document_source)?;

                if root_node.validation_enabled {
                    let errors = root_node.validate_document(&document);
                    if !errors.is_empty() {
                        return Err(errors.into());
                    }
                }

                let operation = get_operation(&document, operation_name)?;

                execute_validated_query(
                    &document,
                    operation,
                    root_node,
                    variables,
                    root_value,
                    payload,
                )
                .await
            })
        }),
    )
    .await
}

/// Resolves a subscription operation of an already-parsed document into a
/// stream of per-event responses.
///
/// The document is taken pre-parsed (see [`RootNode::parse_document`])
/// because the returned stream borrows it for as long as events flow.
pub async fn resolve_into_stream<'a>(
    document: &'a Document,
    operation_name: Option<&str>,
    root_node: &'a RootNode,
    variables: &Variables,
    root_value: &ResolvedValue,
) -> Result<ValuesStream<'a>, GraphQLError> {
    if root_node.validation_enabled {
        let errors = root_node.validate_document(document);
        if !errors.is_empty() {
            return Err(errors.into());
        }
    }

    let operation = get_operation(document, operation_name)?;

    resolve_validated_subscription(
        document,
        operation,
        root_node,
        variables,
        root_value,
        Arc::new(Value::Null),
    )
    .await
}
