//! Resolve the document to values

mod fields;
mod subscriptions;

use std::{
    any::Any,
    collections::HashMap,
    fmt::{self, Display},
    sync::{Arc, RwLock},
};

use arcstr::ArcStr;
use fnv::FnvHashMap;
use futures::{future::BoxFuture, stream::BoxStream};
use indexmap::IndexMap;

use crate::{
    ast::{Definition, Document, Fragment, InputValue, Operation, OperationType},
    extensions::Extension,
    parser::{SourcePosition, Spanning},
    schema::{
        meta::MetaType,
        model::{SchemaType, TypeType},
    },
    scope::ScopedMap,
    validation::RuleError,
    value::{ScalarValue, Value},
    GraphQLError, RootNode,
};

pub use self::subscriptions::{resolve_validated_subscription, ExecutionOutput, ValuesStream};

pub(crate) use self::fields::execute_selection_set;

/// The map of variables used for substitution during query execution
pub type Variables = HashMap<String, InputValue>;

/// Error type for errors that occur during field resolution
///
/// Field errors are represented by a human-readable error message and an
/// optional [`Value`] containing additional information.
///
/// They can be converted to from any type that implements
/// [`std::fmt::Display`], which makes error chaining with the `?` operator
/// a breeze:
///
/// ```rust
/// # use larch::FieldError;
/// fn get_string(data: Vec<u8>) -> Result<String, FieldError> {
///     let s = String::from_utf8(data)?;
///     Ok(s)
/// }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct FieldError {
    message: String,
    extensions: Value,
}

impl<T: Display> From<T> for FieldError {
    fn from(e: T) -> Self {
        Self {
            message: e.to_string(),
            extensions: Value::Null,
        }
    }
}

impl FieldError {
    /// Constructs a new [`FieldError`] with additional data.
    ///
    /// The `extensions` parameter is added to the `"extensions"` field of
    /// the error object in the response. If it is [`Value::Null`], no extra
    /// data is included.
    #[must_use]
    pub fn new<T: Display>(e: T, extensions: Value) -> Self {
        Self {
            message: e.to_string(),
            extensions,
        }
    }

    /// Returns the `"message"` field of this [`FieldError`].
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the `"extensions"` field of this [`FieldError`].
    ///
    /// If there is no `"extensions"`, then [`Value::Null`] will be
    /// returned.
    #[must_use]
    pub fn extensions(&self) -> &Value {
        &self.extensions
    }

    /// Maps the message of this [`FieldError`] with the given function.
    #[must_use]
    pub fn map_message(self, f: impl FnOnce(String) -> String) -> Self {
        Self {
            message: f(self.message),
            extensions: self.extensions,
        }
    }
}

/// The result of resolving the value of a field of type `T`
pub type FieldResult<T> = Result<T, FieldError>;

/// Marker signalling that a field error has already been recorded and the
/// resulting `null` is propagating towards the nearest nullable enclosing
/// position.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PropagateNull;

/// A single element of an error's response path: a response key or a list
/// index.
#[derive(Clone, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => f.write_str(k),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Error type for errors that occur during query execution
///
/// All execution errors contain the source position in the query of the
/// field that failed to resolve, as well as the field's response path.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionError {
    location: SourcePosition,
    path: Vec<PathSegment>,
    error: FieldError,
}

impl ExecutionError {
    #[doc(hidden)]
    pub fn new(location: SourcePosition, path: Vec<PathSegment>, error: FieldError) -> Self {
        Self {
            location,
            path,
            error,
        }
    }

    /// Constructs a new execution error occurring at the beginning of the
    /// query.
    pub fn at_origin(error: FieldError) -> Self {
        Self {
            location: SourcePosition::new_origin(),
            path: Vec::new(),
            error,
        }
    }

    /// The error that occurred.
    pub fn error(&self) -> &FieldError {
        &self.error
    }

    /// The source location _in the query_ of the field that failed to
    /// resolve.
    pub fn location(&self) -> &SourcePosition {
        &self.location
    }

    /// The path of response keys and list indices leading to the field that
    /// generated this error.
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }
}

/// A deferred value: invoked to produce the actual value when the executor
/// needs it.
pub type DeferredFn = Arc<dyn Fn() -> BoxFuture<'static, FieldResult<ResolvedValue>> + Send + Sync>;

/// A stream of source events produced by a subscription field.
pub type ResolvedStream = BoxStream<'static, FieldResult<ResolvedValue>>;

/// A field resolver: maps the parent value and the request context to a
/// raw resolved value.
pub type ResolverFn = Arc<dyn Fn(ResolverContext) -> BoxFuture<'static, FieldResult<ResolvedValue>> + Send + Sync>;

/// A subscription source: maps the root value and the request context to a
/// stream of source events.
pub type SubscriberFn = Arc<dyn Fn(ResolverContext) -> BoxFuture<'static, FieldResult<ResolvedStream>> + Send + Sync>;

/// Raw value produced by a resolver, before value completion.
///
/// Resolvers may return ready response data, mapping-like objects whose
/// entries feed child field lookups, opaque host values serialized on
/// demand, or deferred values unwrapped by the executor.
#[derive(Clone)]
pub enum ResolvedValue {
    /// Ready JSON-shaped response data.
    Value(Value),

    /// A mapping-like parent object: child fields without resolvers read
    /// their entries by field name.
    Object(IndexMap<String, ResolvedValue>),

    /// A list of raw values, completed element by element.
    List(Vec<ResolvedValue>),

    /// An opaque domain value, discriminated by `is_type_of` checks and
    /// serialized through the schema's serializer registry.
    Host(Arc<dyn Any + Send + Sync>),

    /// A deferred value; the executor unwraps these iteratively, one await
    /// per step.
    Defer(DeferredFn),

    /// A single value produced by a subscription's source stream, wrapped
    /// so the executor can treat it as the root object of the
    /// subscription's selection set.
    SubscriptionEvent(Box<ResolvedValue>),
}

impl ResolvedValue {
    /// Constructs a ready `null`.
    pub fn null() -> Self {
        Self::Value(Value::Null)
    }

    /// Does this value represent a ready `null`?
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Value(Value::Null))
    }

    /// Constructs a ready scalar value.
    pub fn scalar<T: Into<ScalarValue>>(s: T) -> Self {
        Self::Value(Value::scalar(s))
    }

    /// Constructs a mapping-like object from entries.
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Self)>) -> Self {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Constructs a list of raw values.
    pub fn list(items: impl IntoIterator<Item = Self>) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// Wraps an opaque host value.
    pub fn host<T: Any + Send + Sync>(value: T) -> Self {
        Self::Host(Arc::new(value))
    }

    /// Views the wrapped host value, if it is one of type `T`.
    pub fn downcast_host<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Host(h) => h.downcast_ref(),
            _ => None,
        }
    }

    /// Wraps a deferred computation producing the actual value on demand.
    pub fn defer<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = FieldResult<ResolvedValue>> + Send + 'static,
    {
        Self::Defer(Arc::new(move || Box::pin(f())))
    }

    /// Looks up an entry of a mapping-like value by field name.
    pub(crate) fn lookup(&self, field_name: &str) -> Option<ResolvedValue> {
        match self {
            Self::Object(map) => map.get(field_name).cloned(),
            Self::Value(Value::Object(o)) => {
                o.get_field_value(field_name).cloned().map(Self::Value)
            }
            Self::SubscriptionEvent(inner) => inner.lookup(field_name),
            _ => None,
        }
    }
}

impl From<Value> for ResolvedValue {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

impl fmt::Debug for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Object(o) => f.debug_tuple("Object").field(o).finish(),
            Self::List(l) => f.debug_tuple("List").field(l).finish(),
            Self::Host(_) => f.write_str("Host(..)"),
            Self::Defer(_) => f.write_str("Defer(..)"),
            Self::SubscriptionEvent(inner) => {
                f.debug_tuple("SubscriptionEvent").field(inner).finish()
            }
        }
    }
}

/// Adapts a synchronous function into a [`ResolverFn`].
///
/// Asynchronous resolvers are written directly as
/// `Arc::new(|ctx| Box::pin(async move { .. }))`.
pub fn resolver_fn<F>(f: F) -> ResolverFn
where
    F: Fn(ResolverContext) -> FieldResult<ResolvedValue> + Send + Sync + 'static,
{
    Arc::new(move |ctx| Box::pin(std::future::ready(f(ctx))))
}

/// Unwraps deferred values until a ready value surfaces.
///
/// Iterative with at most one await per step, so arbitrarily long deferral
/// chains cannot blow the stack.
pub(crate) async fn extract_resolved(mut value: ResolvedValue) -> FieldResult<ResolvedValue> {
    while let ResolvedValue::Defer(f) = value {
        value = f().await?;
    }
    Ok(value)
}

/// Coerced argument values handed to a field resolver.
#[derive(Clone, Debug, Default)]
pub struct Arguments {
    values: IndexMap<String, InputValue>,
}

impl Arguments {
    pub(crate) fn insert(&mut self, name: impl Into<String>, value: InputValue) {
        self.values.insert(name.into(), value);
    }

    /// Looks up an argument value by name.
    pub fn get(&self, name: &str) -> Option<&InputValue> {
        self.values.get(name)
    }

    /// Looks up a string argument by name.
    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(InputValue::as_string_value)
    }

    /// Looks up an int argument by name.
    pub fn get_int(&self, name: &str) -> Option<i32> {
        self.get(name).and_then(InputValue::as_int_value)
    }

    /// Looks up a boolean argument by name.
    pub fn get_boolean(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(InputValue::as_boolean_value)
    }

    /// Looks up an enum member argument by name.
    pub fn get_enum(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(InputValue::as_enum_value)
    }

    /// Iterates over all argument name/value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &InputValue)> {
        self.values.iter()
    }

    /// Whether no arguments were provided.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The request context a field resolver is invoked with.
pub struct ResolverContext {
    /// The parent object value this field is resolved on.
    pub parent: ResolvedValue,

    /// The coerced argument values of this field.
    pub args: Arguments,

    /// The name of the resolved field.
    pub field_name: ArcStr,

    /// The schema the request executes against.
    pub schema: Arc<SchemaType>,

    /// The request-scoped state map.
    pub scope: Arc<ScopedMap>,

    /// The coerced variable values of the operation.
    pub variables: Arc<Variables>,

    /// The extension payload supplied with the request.
    pub extension_payload: Arc<Value>,
}

/// Per-request execution state.
pub(crate) struct ExecutionContext<'a> {
    pub(crate) schema: &'a Arc<SchemaType>,
    pub(crate) fragments: FnvHashMap<&'a str, &'a Fragment>,
    pub(crate) variables: Arc<Variables>,
    pub(crate) extension_payload: Arc<Value>,
    pub(crate) extensions: &'a [Arc<dyn Extension>],
    pub(crate) scope: Arc<ScopedMap>,
    pub(crate) errors: RwLock<Vec<ExecutionError>>,
    pub(crate) default_resolver: Option<ResolverFn>,
    pub(crate) validation_enabled: bool,
}

impl<'a> ExecutionContext<'a> {
    pub(crate) fn new(
        root_node: &'a RootNode,
        document: &'a Document,
        variables: Arc<Variables>,
        scope: Arc<ScopedMap>,
        extension_payload: Arc<Value>,
    ) -> Self {
        let mut fragments = FnvHashMap::default();
        for def in document {
            if let Definition::Fragment(f) = def {
                fragments.insert(f.item.name.item.as_str(), &f.item);
            }
        }

        Self {
            schema: &root_node.schema,
            fragments,
            variables,
            extension_payload,
            extensions: &root_node.extensions,
            scope,
            errors: RwLock::new(Vec::new()),
            default_resolver: root_node.default_resolver.clone(),
            validation_enabled: root_node.validation_enabled,
        }
    }

    /// Records an `error` at the given `location` and response path.
    ///
    /// `map_exception` extension hooks run before the error enters the
    /// list.
    pub(crate) fn push_error(
        &self,
        error: FieldError,
        location: SourcePosition,
        path: &FieldPath<'_>,
    ) {
        let error = self
            .extensions
            .iter()
            .fold(error, |e, ext| ext.map_exception(e));

        let mut segments = Vec::new();
        path.construct_path(&mut segments);

        self.errors.write().unwrap().push(ExecutionError {
            location,
            path: segments,
            error,
        });
    }

    pub(crate) fn into_errors(self) -> Vec<ExecutionError> {
        self.errors.into_inner().unwrap()
    }

    /// Builds the owned context a resolver is invoked with.
    pub(crate) fn resolver_context(
        &self,
        parent: ResolvedValue,
        args: Arguments,
        field_name: &str,
    ) -> ResolverContext {
        ResolverContext {
            parent,
            args,
            field_name: field_name.into(),
            schema: Arc::clone(self.schema),
            scope: Arc::clone(&self.scope),
            variables: Arc::clone(&self.variables),
            extension_payload: Arc::clone(&self.extension_payload),
        }
    }
}

/// The response path and source location of the field currently executing.
#[derive(Clone)]
pub(crate) enum FieldPath<'a> {
    Root(SourcePosition),
    Field(&'a str, SourcePosition, Arc<FieldPath<'a>>),
    Index(usize, SourcePosition, Arc<FieldPath<'a>>),
}

impl FieldPath<'_> {
    pub(crate) fn construct_path(&self, acc: &mut Vec<PathSegment>) {
        match self {
            Self::Root(_) => (),
            Self::Field(name, _, parent) => {
                parent.construct_path(acc);
                acc.push(PathSegment::Key((*name).into()));
            }
            Self::Index(index, _, parent) => {
                parent.construct_path(acc);
                acc.push(PathSegment::Index(*index));
            }
        }
    }

    pub(crate) fn location(&self) -> &SourcePosition {
        match self {
            Self::Root(pos) | Self::Field(_, pos, _) | Self::Index(_, pos, _) => pos,
        }
    }
}

/// Selects the operation to execute from a document.
pub fn get_operation<'b>(
    document: &'b Document,
    operation_name: Option<&str>,
) -> Result<&'b Spanning<Operation>, GraphQLError> {
    let mut operation = None;
    let mut count = 0;
    for def in document {
        if let Definition::Operation(op) = def {
            count += 1;
            if operation_name.is_none() && operation.is_some() {
                return Err(GraphQLError::MultipleOperationsProvided);
            }

            let move_op = operation_name.is_none()
                || op.item.name.as_ref().map(|s| s.item.as_str()) == operation_name;

            if move_op {
                operation = Some(op);
            }
        }
    }
    if count == 0 {
        return Err(GraphQLError::NoOperationProvided);
    }
    operation.ok_or(GraphQLError::UnknownOperationName)
}

enum VariablePath<'a> {
    Root,
    ArrayElement(usize, &'a VariablePath<'a>),
    ObjectField(&'a str, &'a VariablePath<'a>),
}

impl fmt::Display for VariablePath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => Ok(()),
            Self::ArrayElement(i, prev) => write!(f, "{prev}[{i}]"),
            Self::ObjectField(name, prev) => write!(f, "{prev}.{name}"),
        }
    }
}

/// Coerces the provided variable values against the operation's variable
/// definitions.
///
/// Absent variables with a default get the coerced default; provided values
/// run `validate → deserialize`; a non-null variable must end up non-null.
pub(crate) fn coerce_variable_values(
    schema: &SchemaType,
    operation: &Spanning<Operation>,
    provided: &Variables,
) -> Result<Variables, Vec<RuleError>> {
    let mut coerced = Variables::new();
    let mut errors = Vec::new();

    let Some(var_defs) = &operation.item.variable_definitions else {
        return Ok(coerced);
    };

    for (name, def) in var_defs.item.iter() {
        let raw_type_name = def.var_type.item.innermost_name();
        match schema.concrete_type_by_name(raw_type_name) {
            Some(t) if t.is_input() => {}
            _ => {
                errors.push(RuleError::new(
                    &format!(
                        r#"Variable "${}" expected value of type "{}" which cannot be used as an input type"#,
                        name.item, def.var_type.item,
                    ),
                    &[def.var_type.span.start],
                ));
                continue;
            }
        }

        match provided.get(&name.item) {
            Some(value) => {
                let var_type = schema.make_type(&def.var_type.item);
                match unify_variable_value(schema, &var_type, value, &VariablePath::Root) {
                    Ok(v) => {
                        coerced.insert(name.item.clone(), v);
                    }
                    Err(detail) => errors.push(RuleError::new(
                        &format!(r#"Variable "${}" got invalid value: {detail}"#, name.item),
                        &[name.span.start],
                    )),
                }
            }
            None => {
                if let Some(default) = &def.default_value {
                    match crate::coercion::coerce_input_literal(
                        schema,
                        &def.var_type.item,
                        default,
                        &Variables::new(),
                    ) {
                        Ok(Some(v)) => {
                            coerced.insert(name.item.clone(), v);
                        }
                        Ok(None) => {}
                        Err(e) => errors.push(e),
                    }
                } else if def.var_type.item.is_non_null() {
                    errors.push(RuleError::new(
                        &format!(
                            r#"Variable "${}" of required type "{}" was not provided"#,
                            name.item, def.var_type.item,
                        ),
                        &[name.span.start],
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(coerced)
    } else {
        Err(errors)
    }
}

/// Structurally checks and deserializes one provided variable value against
/// its declared type.
fn unify_variable_value(
    schema: &SchemaType,
    meta_type: &TypeType<'_>,
    value: &InputValue,
    path: &VariablePath<'_>,
) -> Result<InputValue, String> {
    match meta_type {
        TypeType::NonNull(inner) => {
            if value.is_null() {
                Err(format!(r#"Expected "{meta_type}", found null at {path}"#))
            } else {
                unify_variable_value(schema, inner, value, path)
            }
        }

        TypeType::List(inner) => {
            if value.is_null() {
                return Ok(InputValue::Null);
            }
            match value.to_list_value() {
                Some(elements) => {
                    let mut out = Vec::with_capacity(elements.len());
                    for (i, element) in elements.into_iter().enumerate() {
                        let element = unify_variable_value(
                            schema,
                            inner,
                            element,
                            &VariablePath::ArrayElement(i, path),
                        )?;
                        out.push(Spanning::unlocated(element));
                    }
                    Ok(InputValue::List(out))
                }
                // A single value is promoted to a list of one.
                None => Ok(InputValue::list(vec![unify_variable_value(
                    schema, inner, value, path,
                )?])),
            }
        }

        TypeType::Concrete(mt) => {
            if value.is_null() {
                return Ok(InputValue::Null);
            }
            match mt {
                MetaType::InputObject(meta) => {
                    let obj = value.to_object_value().ok_or_else(|| {
                        format!(r#"Expected "{}", found not an object at {path}"#, meta.name)
                    })?;

                    for (key, _) in &obj {
                        if meta.input_fields.iter().all(|f| f.name != *key) {
                            return Err(format!(
                                r#"Unknown field "{key}" for input object "{}" at {path}"#,
                                meta.name,
                            ));
                        }
                    }

                    let mut out = Vec::new();
                    for input_field in &meta.input_fields {
                        let field_type = schema.make_type(&input_field.arg_type);
                        let provided = obj
                            .iter()
                            .find(|(key, _)| input_field.name == *key)
                            .map(|(_, v)| *v);
                        let field_path = VariablePath::ObjectField(&input_field.name, path);

                        let unified = match provided {
                            Some(v) => {
                                unify_variable_value(schema, &field_type, v, &field_path)?
                            }
                            None => match &input_field.default_value {
                                Some(default) => default.clone(),
                                None if input_field.arg_type.is_non_null() => {
                                    return Err(format!(
                                        r#"Missing field "{}" for input object "{}" at {path}"#,
                                        input_field.name, meta.name,
                                    ));
                                }
                                None => continue,
                            },
                        };
                        out.push((
                            Spanning::unlocated(input_field.name.to_string()),
                            Spanning::unlocated(unified),
                        ));
                    }
                    Ok(InputValue::Object(out))
                }
                leaf => {
                    leaf.validate_input(value)
                        .map_err(|e| format!("{} at {path}", e.message()))?;
                    leaf.deserialize_input(value)
                        .map_err(|e| format!("{} at {path}", e.message()))
                }
            }
        }
    }
}

/// Creates a new execution context and resolves a validated query or
/// mutation operation.
///
/// Returns [`GraphQLError::IsSubscription`] if a subscription is passed.
pub async fn execute_validated_query(
    document: &Document,
    operation: &Spanning<Operation>,
    root_node: &RootNode,
    variables: &Variables,
    root_value: &ResolvedValue,
    extension_payload: Arc<Value>,
) -> Result<(Value, Vec<ExecutionError>), GraphQLError> {
    if operation.item.operation_type == OperationType::Subscription {
        return Err(GraphQLError::IsSubscription);
    }

    let coerced_variables = coerce_variable_values(&root_node.schema, operation, variables)
        .map_err(GraphQLError::ValidationError)?;

    let root_type = match operation.item.operation_type {
        OperationType::Query => root_node.schema.concrete_query_type(),
        OperationType::Mutation => {
            root_node
                .schema
                .concrete_mutation_type()
                .ok_or_else(|| {
                    GraphQLError::from(RuleError::new(
                        "Schema is not configured for mutations",
                        &[operation.span.start],
                    ))
                })?
        }
        OperationType::Subscription => unreachable!(),
    };

    let ctx = ExecutionContext::new(
        root_node,
        document,
        Arc::new(coerced_variables),
        ScopedMap::root(),
        extension_payload,
    );
    let path = Arc::new(FieldPath::Root(operation.span.start));

    let value = execute_selection_set(
        &ctx,
        vec![&operation.item.selection_set],
        root_type,
        root_value.clone(),
        operation.item.operation_type == OperationType::Mutation,
        path,
    )
    .await
    .unwrap_or(Value::Null);

    Ok((value, ctx.into_errors()))
}
