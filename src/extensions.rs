//! Extensions wrapping the stages of request execution.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::{
    ast::{Document, OwnedDocument, Type},
    executor::{
        ExecutionError, ExecutionOutput, FieldError, FieldResult, PropagateNull, ResolvedValue,
    },
    parser::{ParseError, Spanning},
    validation::RuleError,
    value::Value,
    GraphQLError,
};

/// The outcome of a whole request: the response data and field errors, or
/// the failure that prevented execution.
pub type RequestOutcome = Result<(Value, Vec<ExecutionError>), GraphQLError>;

macro_rules! sync_next {
    ($(#[$doc:meta])* $name:ident -> $out:ty) => {
        $(#[$doc])*
        pub struct $name<'a>(pub(crate) Box<dyn FnOnce() -> $out + Send + 'a>);

        impl $name<'_> {
            /// Invokes the remaining chain, ending at the engine's own
            /// implementation of this stage.
            pub fn run(self) -> $out {
                (self.0)()
            }
        }
    };
}

macro_rules! async_next {
    ($(#[$doc:meta])* $name:ident -> $out:ty) => {
        $(#[$doc])*
        pub struct $name<'a>(pub(crate) Box<dyn FnOnce() -> BoxFuture<'a, $out> + Send + 'a>);

        impl $name<'_> {
            /// Invokes the remaining chain, ending at the engine's own
            /// implementation of this stage.
            pub async fn run(self) -> $out {
                (self.0)().await
            }
        }
    };
}

async_next! {
    /// Continuation of the request pipeline.
    RequestNext -> RequestOutcome
}
sync_next! {
    /// Continuation of document parsing.
    ParseNext -> Result<OwnedDocument, Spanning<ParseError>>
}
sync_next! {
    /// Continuation of document validation.
    ValidateNext -> Vec<RuleError>
}
async_next! {
    /// Continuation of a single field's execution.
    FieldNext -> Result<Value, PropagateNull>
}
async_next! {
    /// Continuation of a single field's resolver dispatch.
    ResolveNext -> FieldResult<ResolvedValue>
}
async_next! {
    /// Continuation of a resolved value's completion.
    CompleteNext -> Result<Value, PropagateNull>
}
async_next! {
    /// Continuation of a subscription event's execution.
    EventNext -> ExecutionOutput
}

/// A set of optional middleware hooks around the stages of request
/// execution.
///
/// Every hook receives the stage's arguments plus a `next` continuation;
/// the default implementations call straight through. Hooks compose
/// right-to-left: for extensions `[A, B, C]`, the engine calls
/// `A(next = B(next = C(next = core)))`. An empty extension list
/// short-circuits to the core.
#[async_trait]
pub trait Extension: Send + Sync {
    /// Wraps the whole request pipeline.
    async fn execute_request<'a>(&'a self, next: RequestNext<'a>) -> RequestOutcome {
        next.run().await
    }

    /// Wraps the parsing of the request's source text.
    fn parse_document<'a>(
        &self,
        source: &'a str,
        next: ParseNext<'a>,
    ) -> Result<OwnedDocument, Spanning<ParseError>> {
        let _ = source;
        next.run()
    }

    /// Wraps document validation.
    fn validate<'a>(&self, document: &'a Document, next: ValidateNext<'a>) -> Vec<RuleError> {
        let _ = document;
        next.run()
    }

    /// Wraps the execution of a single field, from argument coercion to
    /// the completed value.
    async fn execute_field<'a>(
        &'a self,
        field_name: &'a str,
        next: FieldNext<'a>,
    ) -> Result<Value, PropagateNull> {
        let _ = field_name;
        next.run().await
    }

    /// Wraps the resolver dispatch of a single field.
    async fn resolve_field<'a>(
        &'a self,
        field_name: &'a str,
        next: ResolveNext<'a>,
    ) -> FieldResult<ResolvedValue> {
        let _ = field_name;
        next.run().await
    }

    /// Wraps the completion of a resolved value against its declared type.
    async fn complete_value<'a>(
        &'a self,
        field_type: &'a Type,
        next: CompleteNext<'a>,
    ) -> Result<Value, PropagateNull> {
        let _ = field_type;
        next.run().await
    }

    /// Wraps the execution of one subscription source event.
    async fn execute_subscription_event<'a>(&'a self, next: EventNext<'a>) -> ExecutionOutput {
        next.run().await
    }

    /// Rewrites a field error before it enters the request error list.
    fn map_exception(&self, error: FieldError) -> FieldError {
        error
    }
}

pub(crate) fn run_request_chain<'a>(
    extensions: &'a [Arc<dyn Extension>],
    core: Box<dyn FnOnce() -> BoxFuture<'a, RequestOutcome> + Send + 'a>,
) -> BoxFuture<'a, RequestOutcome> {
    match extensions.split_first() {
        None => core(),
        Some((head, rest)) => {
            head.execute_request(RequestNext(Box::new(move || run_request_chain(rest, core))))
        }
    }
}

pub(crate) fn run_parse_chain<'a>(
    extensions: &'a [Arc<dyn Extension>],
    source: &'a str,
    core: Box<dyn FnOnce() -> Result<OwnedDocument, Spanning<ParseError>> + Send + 'a>,
) -> Result<OwnedDocument, Spanning<ParseError>> {
    match extensions.split_first() {
        None => core(),
        Some((head, rest)) => head.parse_document(
            source,
            ParseNext(Box::new(move || run_parse_chain(rest, source, core))),
        ),
    }
}

pub(crate) fn run_validate_chain<'a>(
    extensions: &'a [Arc<dyn Extension>],
    document: &'a Document,
    core: Box<dyn FnOnce() -> Vec<RuleError> + Send + 'a>,
) -> Vec<RuleError> {
    match extensions.split_first() {
        None => core(),
        Some((head, rest)) => head.validate(
            document,
            ValidateNext(Box::new(move || run_validate_chain(rest, document, core))),
        ),
    }
}

pub(crate) fn run_field_chain<'a>(
    extensions: &'a [Arc<dyn Extension>],
    field_name: &'a str,
    core: Box<dyn FnOnce() -> BoxFuture<'a, Result<Value, PropagateNull>> + Send + 'a>,
) -> BoxFuture<'a, Result<Value, PropagateNull>> {
    match extensions.split_first() {
        None => core(),
        Some((head, rest)) => head.execute_field(
            field_name,
            FieldNext(Box::new(move || run_field_chain(rest, field_name, core))),
        ),
    }
}

pub(crate) fn run_resolve_chain<'a>(
    extensions: &'a [Arc<dyn Extension>],
    field_name: &'a str,
    core: Box<dyn FnOnce() -> BoxFuture<'a, FieldResult<ResolvedValue>> + Send + 'a>,
) -> BoxFuture<'a, FieldResult<ResolvedValue>> {
    match extensions.split_first() {
        None => core(),
        Some((head, rest)) => head.resolve_field(
            field_name,
            ResolveNext(Box::new(move || run_resolve_chain(rest, field_name, core))),
        ),
    }
}

pub(crate) fn run_complete_chain<'a>(
    extensions: &'a [Arc<dyn Extension>],
    field_type: &'a Type,
    core: Box<dyn FnOnce() -> BoxFuture<'a, Result<Value, PropagateNull>> + Send + 'a>,
) -> BoxFuture<'a, Result<Value, PropagateNull>> {
    match extensions.split_first() {
        None => core(),
        Some((head, rest)) => head.complete_value(
            field_type,
            CompleteNext(Box::new(move || run_complete_chain(rest, field_type, core))),
        ),
    }
}

pub(crate) fn run_event_chain<'a>(
    extensions: &'a [Arc<dyn Extension>],
    core: Box<dyn FnOnce() -> BoxFuture<'a, ExecutionOutput> + Send + 'a>,
) -> BoxFuture<'a, ExecutionOutput> {
    match extensions.split_first() {
        None => core(),
        Some((head, rest)) => {
            head.execute_subscription_event(EventNext(Box::new(move || run_event_chain(rest, core))))
        }
    }
}
