//! Types used to describe a GraphQL schema.

use std::{any::Any, fmt, sync::Arc};

use arcstr::ArcStr;

use crate::{
    ast::{InputValue, Type},
    executor::{FieldError, ResolvedValue, ResolverFn, SubscriberFn},
    schema::model::SchemaType,
    value::Value,
};

/// Whether an item is deprecated, with context.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum DeprecationStatus {
    /// The field/variant is not deprecated.
    Current,
    /// The field/variant is deprecated, with an optional reason.
    Deprecated(Option<ArcStr>),
}

impl DeprecationStatus {
    /// If this deprecation status indicates the item is deprecated.
    pub fn is_deprecated(&self) -> bool {
        match self {
            Self::Current => false,
            Self::Deprecated(_) => true,
        }
    }

    /// An optional reason for the deprecation, or none if `Current`.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Current => None,
            Self::Deprecated(rsn) => rsn.as_deref(),
        }
    }
}

/// GraphQL type kind.
///
/// The GraphQL specification defines possible type kinds as the meta type
/// of every type in a schema, surfaced through introspection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
    List,
    NonNull,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Scalar => "SCALAR",
            Self::Object => "OBJECT",
            Self::Interface => "INTERFACE",
            Self::Union => "UNION",
            Self::Enum => "ENUM",
            Self::InputObject => "INPUT_OBJECT",
            Self::List => "LIST",
            Self::NonNull => "NON_NULL",
        })
    }
}

/// Shortcut for an input-side structural check of an [`InputValue`].
pub type InputValidateFn = fn(&InputValue) -> Result<(), FieldError>;

/// Shortcut for a function mapping incoming JSON-shaped input to its
/// internal form. Idempotent for well-formed values.
pub type InputDeserializeFn = fn(&InputValue) -> Result<InputValue, FieldError>;

/// Shortcut for a function serializing a resolved value to its response
/// form.
pub type OutputSerializeFn = fn(&Value) -> Result<Value, FieldError>;

/// Shortcut for a nominal/structural check used when discriminating
/// abstract types.
pub type IsValueFn = fn(&Value) -> bool;

/// Checks whether a resolved value belongs to an object type.
pub type IsTypeOfFn = Arc<dyn Fn(&ResolvedValue) -> bool + Send + Sync>;

/// Picks the concrete object type name for a value of an abstract type.
pub type ResolveTypeFn = Arc<dyn Fn(&ResolvedValue, &SchemaType) -> Option<ArcStr> + Send + Sync>;

/// Serializes an opaque host value into response data.
pub type HostSerializeFn = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Option<Value> + Send + Sync>;

/// Scalar type metadata
pub struct ScalarMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    pub(crate) validate_fn: InputValidateFn,
    pub(crate) deserialize_fn: InputDeserializeFn,
    pub(crate) serialize_fn: OutputSerializeFn,
    pub(crate) is_value_fn: IsValueFn,
}

impl ScalarMeta {
    /// Builds a new [`ScalarMeta`] type with the specified `name` and
    /// conversion functions.
    pub fn new(
        name: impl Into<ArcStr>,
        validate_fn: InputValidateFn,
        deserialize_fn: InputDeserializeFn,
        serialize_fn: OutputSerializeFn,
        is_value_fn: IsValueFn,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            validate_fn,
            deserialize_fn,
            serialize_fn,
            is_value_fn,
        }
    }

    /// Sets the `description` of this [`ScalarMeta`] type.
    ///
    /// Overwrites any previously set description.
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Wraps this [`ScalarMeta`] type into a generic [`MetaType`].
    pub fn into_meta(self) -> MetaType {
        MetaType::Scalar(self)
    }
}

/// Metadata for a single value in an enum
#[derive(Clone, Debug)]
pub struct EnumValue {
    /// The name of the enum value.
    ///
    /// This is the string literal representation of the member in responses.
    pub name: ArcStr,
    /// The optional description of this enum _value_.
    pub description: Option<ArcStr>,
    /// Whether the value is deprecated or not, with an optional reason.
    pub deprecation_status: DeprecationStatus,
}

impl EnumValue {
    /// Constructs a new [`EnumValue`] with the provided `name`.
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            description: None,
            deprecation_status: DeprecationStatus::Current,
        }
    }

    /// Sets the `description` of this [`EnumValue`].
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets this [`EnumValue`] as deprecated with an optional `reason`.
    #[must_use]
    pub fn deprecated(mut self, reason: Option<&str>) -> Self {
        self.deprecation_status = DeprecationStatus::Deprecated(reason.map(Into::into));
        self
    }
}

/// Enum type metadata
#[derive(Clone, Debug)]
pub struct EnumMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub values: Vec<EnumValue>,
}

impl EnumMeta {
    /// Builds a new [`EnumMeta`] type with the specified `name` and possible
    /// `values`.
    pub fn new(name: impl Into<ArcStr>, values: Vec<EnumValue>) -> Self {
        Self {
            name: name.into(),
            description: None,
            values,
        }
    }

    /// Sets the `description` of this [`EnumMeta`] type.
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Wraps this [`EnumMeta`] type into a generic [`MetaType`].
    pub fn into_meta(self) -> MetaType {
        MetaType::Enum(self)
    }

    pub(crate) fn has_value(&self, name: &str) -> bool {
        self.values.iter().any(|v| v.name == name)
    }

    pub(crate) fn validate(&self, v: &InputValue) -> Result<(), FieldError> {
        match v.as_enum_value() {
            Some(name) if self.has_value(name) => Ok(()),
            Some(name) => Err(FieldError::from(format!(
                "Invalid value \"{name}\" for enum \"{}\"",
                self.name,
            ))),
            None => Err(FieldError::from(format!(
                "Expected \"{}\", found not an enum value",
                self.name,
            ))),
        }
    }

    pub(crate) fn deserialize(&self, v: &InputValue) -> Result<InputValue, FieldError> {
        self.validate(v)?;
        Ok(InputValue::Enum(
            v.as_enum_value().unwrap_or_default().into(),
        ))
    }

    pub(crate) fn serialize(&self, v: &Value) -> Result<Value, FieldError> {
        match v.as_string_value() {
            Some(name) if self.has_value(name) => Ok(v.clone()),
            _ => Err(FieldError::from(format!(
                "Invalid value for enum \"{}\"",
                self.name,
            ))),
        }
    }

    pub(crate) fn is_value(&self, v: &Value) -> bool {
        v.as_string_value().is_some_and(|name| self.has_value(name))
    }
}

/// Metadata for an argument to a field, or for an input object field
#[derive(Clone, Debug)]
pub struct Argument {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub arg_type: Type,
    #[doc(hidden)]
    pub default_value: Option<InputValue>,
}

impl Argument {
    /// Builds a new [`Argument`] of the given [`Type`] with the given
    /// `name`.
    pub fn new(name: impl Into<ArcStr>, arg_type: Type) -> Self {
        Self {
            name: name.into(),
            description: None,
            arg_type,
            default_value: None,
        }
    }

    /// Sets the `description` of this [`Argument`].
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the default value of this [`Argument`].
    ///
    /// Overwrites any previously set default value.
    #[must_use]
    pub fn default_value(mut self, val: InputValue) -> Self {
        self.default_value = Some(val);
        self
    }
}

/// Metadata for a field
#[derive(Clone)]
pub struct Field {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub arguments: Option<Vec<Argument>>,
    #[doc(hidden)]
    pub field_type: Type,
    #[doc(hidden)]
    pub deprecation_status: DeprecationStatus,
    #[doc(hidden)]
    pub resolver: Option<ResolverFn>,
    #[doc(hidden)]
    pub subscriber: Option<SubscriberFn>,
}

impl Field {
    /// Builds a new [`Field`] of the given [`Type`] with the given `name`.
    pub fn new(name: impl Into<ArcStr>, field_type: Type) -> Self {
        Self {
            name: name.into(),
            description: None,
            arguments: None,
            field_type,
            deprecation_status: DeprecationStatus::Current,
            resolver: None,
            subscriber: None,
        }
    }

    /// Sets the `description` of this [`Field`].
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds an `argument` to this [`Field`].
    ///
    /// Arguments are unordered and can't contain duplicates by name.
    #[must_use]
    pub fn argument(mut self, argument: Argument) -> Self {
        self.arguments.get_or_insert_with(Vec::new).push(argument);
        self
    }

    /// Sets this [`Field`] as deprecated with an optional `reason`.
    #[must_use]
    pub fn deprecated(mut self, reason: Option<&str>) -> Self {
        self.deprecation_status = DeprecationStatus::Deprecated(reason.map(Into::into));
        self
    }

    /// Sets the resolver function of this [`Field`].
    #[must_use]
    pub fn resolver(mut self, resolver: ResolverFn) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Sets the subscription source function of this [`Field`].
    ///
    /// Only meaningful on fields of the subscription root type.
    #[must_use]
    pub fn subscriber(mut self, subscriber: SubscriberFn) -> Self {
        self.subscriber = Some(subscriber);
        self
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("arguments", &self.arguments)
            .field("deprecation_status", &self.deprecation_status)
            .finish_non_exhaustive()
    }
}

/// Object type metadata
#[derive(Clone)]
pub struct ObjectMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub fields: Vec<Field>,
    #[doc(hidden)]
    pub interface_names: Vec<ArcStr>,
    #[doc(hidden)]
    pub is_type_of: Option<IsTypeOfFn>,
    #[doc(hidden)]
    pub host_serializer: Option<HostSerializeFn>,
}

impl ObjectMeta {
    /// Builds a new [`ObjectMeta`] type with the specified `name` and
    /// `fields`.
    pub fn new(name: impl Into<ArcStr>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields,
            interface_names: vec![],
            is_type_of: None,
            host_serializer: None,
        }
    }

    /// Sets the `description` of this [`ObjectMeta`] type.
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends a `field` to this [`ObjectMeta`] type.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Sets the `interfaces` this [`ObjectMeta`] type implements.
    ///
    /// Overwrites any previously set list of interfaces.
    #[must_use]
    pub fn interfaces(mut self, interfaces: &[&str]) -> Self {
        self.interface_names = interfaces.iter().map(|n| (*n).into()).collect();
        self
    }

    /// Sets the nominal check deciding whether a resolved value belongs to
    /// this type. Consulted when discriminating abstract types.
    #[must_use]
    pub fn is_type_of(mut self, f: impl Fn(&ResolvedValue) -> bool + Send + Sync + 'static) -> Self {
        self.is_type_of = Some(Arc::new(f));
        self
    }

    /// Sets the fallback serializer turning opaque host values of this type
    /// into response data.
    #[must_use]
    pub fn host_serializer(mut self, f: HostSerializeFn) -> Self {
        self.host_serializer = Some(f);
        self
    }

    /// Wraps this [`ObjectMeta`] type into a generic [`MetaType`].
    pub fn into_meta(self) -> MetaType {
        MetaType::Object(self)
    }
}

impl fmt::Debug for ObjectMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectMeta")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("interface_names", &self.interface_names)
            .finish_non_exhaustive()
    }
}

/// Interface type metadata
#[derive(Clone)]
pub struct InterfaceMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub fields: Vec<Field>,
    #[doc(hidden)]
    pub resolve_type: Option<ResolveTypeFn>,
}

impl InterfaceMeta {
    /// Builds a new [`InterfaceMeta`] type with the specified `name` and
    /// `fields`.
    pub fn new(name: impl Into<ArcStr>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields,
            resolve_type: None,
        }
    }

    /// Sets the `description` of this [`InterfaceMeta`] type.
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the callback picking the concrete object type for a value of
    /// this interface.
    #[must_use]
    pub fn resolve_type(
        mut self,
        f: impl Fn(&ResolvedValue, &SchemaType) -> Option<ArcStr> + Send + Sync + 'static,
    ) -> Self {
        self.resolve_type = Some(Arc::new(f));
        self
    }

    /// Wraps this [`InterfaceMeta`] type into a generic [`MetaType`].
    pub fn into_meta(self) -> MetaType {
        MetaType::Interface(self)
    }
}

impl fmt::Debug for InterfaceMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceMeta")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Union type metadata
#[derive(Clone)]
pub struct UnionMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub of_type_names: Vec<ArcStr>,
    #[doc(hidden)]
    pub resolve_type: Option<ResolveTypeFn>,
}

impl UnionMeta {
    /// Builds a new [`UnionMeta`] type with the specified `name` and member
    /// type names.
    pub fn new(name: impl Into<ArcStr>, of_types: &[&str]) -> Self {
        Self {
            name: name.into(),
            description: None,
            of_type_names: of_types.iter().map(|n| (*n).into()).collect(),
            resolve_type: None,
        }
    }

    /// Sets the `description` of this [`UnionMeta`] type.
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the callback picking the concrete object type for a value of
    /// this union.
    #[must_use]
    pub fn resolve_type(
        mut self,
        f: impl Fn(&ResolvedValue, &SchemaType) -> Option<ArcStr> + Send + Sync + 'static,
    ) -> Self {
        self.resolve_type = Some(Arc::new(f));
        self
    }

    /// Wraps this [`UnionMeta`] type into a generic [`MetaType`].
    pub fn into_meta(self) -> MetaType {
        MetaType::Union(self)
    }
}

impl fmt::Debug for UnionMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnionMeta")
            .field("name", &self.name)
            .field("of_type_names", &self.of_type_names)
            .finish_non_exhaustive()
    }
}

/// Input object metadata
#[derive(Clone, Debug)]
pub struct InputObjectMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub input_fields: Vec<Argument>,
}

impl InputObjectMeta {
    /// Builds a new [`InputObjectMeta`] type with the specified `name` and
    /// `input_fields`.
    pub fn new(name: impl Into<ArcStr>, input_fields: Vec<Argument>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_fields,
        }
    }

    /// Sets the `description` of this [`InputObjectMeta`] type.
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Wraps this [`InputObjectMeta`] type into a generic [`MetaType`].
    pub fn into_meta(self) -> MetaType {
        MetaType::InputObject(self)
    }
}

/// Generic type metadata
#[derive(Debug)]
#[allow(missing_docs)]
pub enum MetaType {
    Scalar(ScalarMeta),
    Object(ObjectMeta),
    Enum(EnumMeta),
    Interface(InterfaceMeta),
    Union(UnionMeta),
    InputObject(InputObjectMeta),
}

impl MetaType {
    /// Accesses the name of the type.
    pub fn name(&self) -> &ArcStr {
        match self {
            Self::Scalar(ScalarMeta { name, .. })
            | Self::Object(ObjectMeta { name, .. })
            | Self::Enum(EnumMeta { name, .. })
            | Self::Interface(InterfaceMeta { name, .. })
            | Self::Union(UnionMeta { name, .. })
            | Self::InputObject(InputObjectMeta { name, .. }) => name,
        }
    }

    /// Accesses the description of the type, if any.
    pub fn description(&self) -> Option<&ArcStr> {
        match self {
            Self::Scalar(ScalarMeta { description, .. })
            | Self::Object(ObjectMeta { description, .. })
            | Self::Enum(EnumMeta { description, .. })
            | Self::Interface(InterfaceMeta { description, .. })
            | Self::Union(UnionMeta { description, .. })
            | Self::InputObject(InputObjectMeta { description, .. }) => description.as_ref(),
        }
    }

    /// Constructs the [`TypeKind`] of this type.
    pub fn type_kind(&self) -> TypeKind {
        match self {
            Self::Scalar(_) => TypeKind::Scalar,
            Self::Object(_) => TypeKind::Object,
            Self::Enum(_) => TypeKind::Enum,
            Self::Interface(_) => TypeKind::Interface,
            Self::Union(_) => TypeKind::Union,
            Self::InputObject(_) => TypeKind::InputObject,
        }
    }

    /// Accesses a field's metadata given its name.
    ///
    /// Only objects and interfaces have fields. This method always returns
    /// [`None`] for other types.
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        match self {
            Self::Object(ObjectMeta { fields, .. })
            | Self::Interface(InterfaceMeta { fields, .. }) => {
                fields.iter().find(|f| f.name == name)
            }
            _ => None,
        }
    }

    /// Accesses an input field's metadata given its name.
    ///
    /// Only input objects have input fields. This method always returns
    /// [`None`] for other types.
    pub fn input_field_by_name(&self, name: &str) -> Option<&Argument> {
        match self {
            Self::InputObject(InputObjectMeta { input_fields, .. }) => {
                input_fields.iter().find(|f| f.name == name)
            }
            _ => None,
        }
    }

    /// Returns true if the type is a composite type.
    ///
    /// Objects, interfaces, and unions are composite.
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Interface(_) | Self::Union(_))
    }

    /// Returns true if the type can occur in leaf positions in queries.
    ///
    /// Only enums and scalars are leaf types.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Enum(_) | Self::Scalar(_))
    }

    /// Returns true if the type is abstract.
    ///
    /// Only interfaces and unions are abstract types.
    pub fn is_abstract(&self) -> bool {
        matches!(self, Self::Interface(_) | Self::Union(_))
    }

    /// Returns true if the type can be used in input positions, e.g.
    /// arguments or variables.
    ///
    /// Only scalars, enums, and input objects are input types.
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Scalar(_) | Self::Enum(_) | Self::InputObject(_))
    }

    /// Returns true if the type is built into GraphQL or this engine.
    pub fn is_builtin(&self) -> bool {
        let name = self.name();
        name.starts_with("__")
            || matches!(
                name.as_str(),
                "Boolean" | "String" | "Int" | "Float" | "ID" | "Date" | "DateTime"
            )
    }

    /// Input-side structural check for scalar, enum, and input-object
    /// types.
    pub(crate) fn validate_input(&self, v: &InputValue) -> Result<(), FieldError> {
        match self {
            Self::Scalar(meta) => (meta.validate_fn)(v),
            Self::Enum(meta) => meta.validate(v),
            Self::InputObject(_) => Ok(()),
            _ => Err(FieldError::from(format!(
                "Type \"{}\" cannot be used as an input type",
                self.name(),
            ))),
        }
    }

    /// Maps incoming JSON-shaped input to internal form for scalar and enum
    /// types. Input objects recurse through the value coercer instead.
    pub(crate) fn deserialize_input(&self, v: &InputValue) -> Result<InputValue, FieldError> {
        match self {
            Self::Scalar(meta) => (meta.deserialize_fn)(v),
            Self::Enum(meta) => meta.deserialize(v),
            _ => Ok(v.clone()),
        }
    }

    /// Serializes a leaf value to its response form.
    pub(crate) fn serialize_leaf(&self, v: &Value) -> Result<Value, FieldError> {
        match self {
            Self::Scalar(meta) => (meta.serialize_fn)(v),
            Self::Enum(meta) => meta.serialize(v),
            _ => Err(FieldError::from(format!(
                "Type \"{}\" is not a leaf type",
                self.name(),
            ))),
        }
    }

    /// Nominal/structural check of a serialized value against this leaf
    /// type.
    pub(crate) fn is_leaf_value(&self, v: &Value) -> bool {
        match self {
            Self::Scalar(meta) => (meta.is_value_fn)(v),
            Self::Enum(meta) => meta.is_value(v),
            _ => false,
        }
    }
}

impl fmt::Debug for ScalarMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarMeta")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
