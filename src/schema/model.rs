use std::{any::Any, fmt};

use arcstr::ArcStr;
use derive_more::{Display, Error};
use fnv::FnvBuildHasher;
use indexmap::IndexMap;

use crate::{
    ast::Type,
    introspection,
    schema::meta::{
        Argument, HostSerializeFn, InterfaceMeta, MetaType, ObjectMeta, UnionMeta,
    },
    types::scalars,
    value::Value,
};

pub(crate) type FnvIndexMap<K, V> = IndexMap<K, V, FnvBuildHasher>;

/// Registry of serializers for opaque host values, keyed by GraphQL type
/// name.
///
/// Consulted when a resolver returns a host value for which the executor
/// has no resolver or mapping lookup to fall back on.
#[derive(Clone, Default)]
pub struct SerdeRegistry {
    serializers: FnvIndexMap<ArcStr, HostSerializeFn>,
}

impl SerdeRegistry {
    /// Registers a serializer for host values of the given GraphQL type.
    pub fn register(&mut self, type_name: impl Into<ArcStr>, serializer: HostSerializeFn) {
        self.serializers.insert(type_name.into(), serializer);
    }

    pub(crate) fn serialize_host(
        &self,
        type_name: &str,
        value: &(dyn Any + Send + Sync),
    ) -> Option<Value> {
        self.serializers.get(type_name).and_then(|f| f(value))
    }
}

/// Error raised when a schema fails to assemble.
#[derive(Debug, Display, Error)]
pub enum SchemaError {
    /// Two registered types share a name.
    #[display("duplicate type name \"{_0}\"")]
    DuplicateTypeName(#[error(not(source))] ArcStr),

    /// A field, argument, interface or union member references a type
    /// missing from the schema.
    #[display("type \"{owner}\" references unknown type \"{name}\"")]
    UnresolvedTypeReference {
        /// Name of the type holding the dangling reference.
        owner: ArcStr,
        /// The unknown referenced name.
        name: ArcStr,
    },
}

/// Metadata for a schema
pub struct SchemaType {
    types: FnvIndexMap<ArcStr, MetaType>,
    query_type_name: ArcStr,
    mutation_type_name: Option<ArcStr>,
    subscription_type_name: Option<ArcStr>,
    directives: FnvIndexMap<ArcStr, DirectiveType>,
    serde_registry: SerdeRegistry,
    extra_type_names: Vec<ArcStr>,
}

impl SchemaType {
    /// Starts assembling a schema around the given query root object.
    pub fn build(query: ObjectMeta) -> SchemaBuilder {
        SchemaBuilder {
            query,
            mutation: None,
            subscription: None,
            extra_types: Vec::new(),
            directives: Vec::new(),
            serde_registry: SerdeRegistry::default(),
        }
    }

    /// Resolves a named type into its view, if registered.
    pub fn type_by_name(&self, name: &str) -> Option<TypeType<'_>> {
        self.types.get(name).map(TypeType::Concrete)
    }

    /// Resolves a named type into its metadata, if registered.
    pub fn concrete_type_by_name(&self, name: &str) -> Option<&MetaType> {
        self.types.get(name)
    }

    /// The root query type.
    pub fn query_type(&self) -> TypeType<'_> {
        TypeType::Concrete(self.concrete_query_type())
    }

    /// The root query type's metadata.
    pub fn concrete_query_type(&self) -> &MetaType {
        self.types
            .get(&self.query_type_name)
            .expect("query type does not exist in schema")
    }

    /// The root mutation type, if this schema defines one.
    pub fn mutation_type(&self) -> Option<TypeType<'_>> {
        self.concrete_mutation_type().map(TypeType::Concrete)
    }

    /// The root mutation type's metadata, if this schema defines one.
    pub fn concrete_mutation_type(&self) -> Option<&MetaType> {
        self.mutation_type_name.as_ref().map(|name| {
            self.concrete_type_by_name(name)
                .expect("mutation type does not exist in schema")
        })
    }

    /// The root subscription type, if this schema defines one.
    pub fn subscription_type(&self) -> Option<TypeType<'_>> {
        self.concrete_subscription_type().map(TypeType::Concrete)
    }

    /// The root subscription type's metadata, if this schema defines one.
    pub fn concrete_subscription_type(&self) -> Option<&MetaType> {
        self.subscription_type_name.as_ref().map(|name| {
            self.concrete_type_by_name(name)
                .expect("subscription type does not exist in schema")
        })
    }

    /// The serializer registry for opaque host values.
    pub fn serde_registry(&self) -> &SerdeRegistry {
        &self.serde_registry
    }

    /// Resolves a [`Type`] literal into a view over this schema's types.
    ///
    /// # Panics
    ///
    /// If the literal's name is not registered. Schema assembly verifies
    /// every reachable reference, so this only fires on literals made up
    /// after construction.
    pub fn make_type(&self, t: &Type) -> TypeType<'_> {
        match t {
            Type::NonNullNamed(n) => TypeType::NonNull(Box::new(
                self.type_by_name(n).expect("type not found in schema"),
            )),
            Type::NonNullList(inner) => {
                TypeType::NonNull(Box::new(TypeType::List(Box::new(self.make_type(inner)))))
            }
            Type::Named(n) => self.type_by_name(n).expect("type not found in schema"),
            Type::List(inner) => TypeType::List(Box::new(self.make_type(inner))),
        }
    }

    /// Lists all registered directives.
    pub fn directive_list(&self) -> Vec<&DirectiveType> {
        self.directives.values().collect()
    }

    /// Looks up a directive by name.
    pub fn directive_by_name(&self, name: &str) -> Option<&DirectiveType> {
        self.directives.get(name)
    }

    /// The concrete object types a value of the given abstract type can
    /// turn out to be.
    ///
    /// # Panics
    ///
    /// If called for a non-abstract type.
    pub fn possible_types(&self, t: &MetaType) -> Vec<&MetaType> {
        match t {
            MetaType::Union(UnionMeta { of_type_names, .. }) => of_type_names
                .iter()
                .filter_map(|n| self.concrete_type_by_name(n))
                .collect(),
            MetaType::Interface(InterfaceMeta { name, .. }) => self
                .types
                .values()
                .filter(|t| match t {
                    MetaType::Object(ObjectMeta {
                        interface_names, ..
                    }) => interface_names.iter().any(|iname| iname == name),
                    _ => false,
                })
                .collect(),
            _ => panic!("can't retrieve possible types from non-abstract meta type"),
        }
    }

    /// Whether `possible_type` is one of the concrete types of
    /// `abstract_type`.
    pub fn is_possible_type(&self, abstract_type: &MetaType, possible_type: &MetaType) -> bool {
        self.possible_types(abstract_type)
            .into_iter()
            .any(|t| std::ptr::eq(t, possible_type))
    }

    /// The closure of types reachable from the root types and the extra
    /// types, in discovery order.
    ///
    /// Walks object fields, input-object fields, argument types, interface
    /// references, union members, and list/non-null inner types,
    /// terminating on revisit.
    pub fn reachable_type_names(&self) -> Vec<ArcStr> {
        let mut seen: Vec<ArcStr> = Vec::new();
        let mut queue: std::collections::VecDeque<ArcStr> = std::collections::VecDeque::new();

        queue.push_back(self.query_type_name.clone());
        queue.extend(self.mutation_type_name.clone());
        queue.extend(self.subscription_type_name.clone());
        queue.extend(self.extra_type_names.iter().cloned());

        while let Some(name) = queue.pop_front() {
            if seen.contains(&name) {
                continue;
            }
            let Some(meta) = self.types.get(&name) else {
                continue;
            };
            seen.push(name);

            match meta {
                MetaType::Object(o) => {
                    for f in &o.fields {
                        queue.push_back(ArcStr::from(f.field_type.innermost_name()));
                        for arg in f.arguments.iter().flatten() {
                            queue.push_back(ArcStr::from(arg.arg_type.innermost_name()));
                        }
                    }
                    queue.extend(o.interface_names.iter().cloned());
                }
                MetaType::Interface(i) => {
                    for f in &i.fields {
                        queue.push_back(ArcStr::from(f.field_type.innermost_name()));
                        for arg in f.arguments.iter().flatten() {
                            queue.push_back(ArcStr::from(arg.arg_type.innermost_name()));
                        }
                    }
                }
                MetaType::Union(u) => queue.extend(u.of_type_names.iter().cloned()),
                MetaType::InputObject(io) => {
                    for f in &io.input_fields {
                        queue.push_back(ArcStr::from(f.arg_type.innermost_name()));
                    }
                }
                MetaType::Scalar(_) | MetaType::Enum(_) => {}
            }
        }

        seen
    }
}

/// A [`Type`] literal resolved against a schema.
#[derive(Clone, Debug)]
#[allow(missing_docs)]
pub enum TypeType<'a> {
    Concrete(&'a MetaType),
    NonNull(Box<TypeType<'a>>),
    List(Box<TypeType<'a>>),
}

impl<'a> TypeType<'a> {
    /// The concrete metadata, if this view is not wrapped.
    pub fn to_concrete(&self) -> Option<&'a MetaType> {
        match self {
            Self::Concrete(t) => Some(t),
            _ => None,
        }
    }

    /// Unwraps all list/non-null wrappers down to the named type.
    pub fn innermost_concrete(&self) -> &'a MetaType {
        match self {
            Self::Concrete(t) => t,
            Self::NonNull(n) => n.innermost_concrete(),
            Self::List(l) => l.innermost_concrete(),
        }
    }

    /// Whether this view rejects `null`.
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }
}

impl fmt::Display for TypeType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Concrete(t) => f.write_str(t.name()),
            Self::List(i) => write!(f, "[{i}]"),
            Self::NonNull(i) => write!(f, "{i}!"),
        }
    }
}

/// Metadata for a directive declared on a schema.
#[derive(Clone, Debug)]
#[allow(missing_docs)]
pub struct DirectiveType {
    pub name: ArcStr,
    pub description: Option<ArcStr>,
    pub locations: Vec<DirectiveLocation>,
    pub arguments: Vec<Argument>,
}

impl DirectiveType {
    /// Constructs a new [`DirectiveType`] from parts.
    pub fn new(
        name: impl Into<ArcStr>,
        locations: &[DirectiveLocation],
        arguments: Vec<Argument>,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            locations: locations.to_vec(),
            arguments,
        }
    }

    /// Sets the `description` of this directive.
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn new_skip() -> Self {
        Self::new(
            "skip",
            &[
                DirectiveLocation::Field,
                DirectiveLocation::FragmentSpread,
                DirectiveLocation::InlineFragment,
            ],
            vec![Argument::new("if", Type::NonNullNamed(arcstr::literal!("Boolean")))],
        )
    }

    fn new_include() -> Self {
        Self::new(
            "include",
            &[
                DirectiveLocation::Field,
                DirectiveLocation::FragmentSpread,
                DirectiveLocation::InlineFragment,
            ],
            vec![Argument::new("if", Type::NonNullNamed(arcstr::literal!("Boolean")))],
        )
    }
}

/// Positions a directive may be declared for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum DirectiveLocation {
    Query,
    Mutation,
    Subscription,
    Field,
    FragmentDefinition,
    FragmentSpread,
    InlineFragment,
}

impl fmt::Display for DirectiveLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Query => "QUERY",
            Self::Mutation => "MUTATION",
            Self::Subscription => "SUBSCRIPTION",
            Self::Field => "FIELD",
            Self::FragmentDefinition => "FRAGMENT_DEFINITION",
            Self::FragmentSpread => "FRAGMENT_SPREAD",
            Self::InlineFragment => "INLINE_FRAGMENT",
        })
    }
}

/// Collects root types, extra types, directives and serializers, then
/// assembles them into a verified [`SchemaType`].
pub struct SchemaBuilder {
    query: ObjectMeta,
    mutation: Option<ObjectMeta>,
    subscription: Option<ObjectMeta>,
    extra_types: Vec<MetaType>,
    directives: Vec<DirectiveType>,
    serde_registry: SerdeRegistry,
}

impl SchemaBuilder {
    /// Sets the root mutation type.
    #[must_use]
    pub fn mutation(mut self, mutation: ObjectMeta) -> Self {
        self.mutation = Some(mutation);
        self
    }

    /// Sets the root subscription type.
    #[must_use]
    pub fn subscription(mut self, subscription: ObjectMeta) -> Self {
        self.subscription = Some(subscription);
        self
    }

    /// Registers an additional type.
    ///
    /// Anything referenced from the root types must be registered here;
    /// registered types also seed the reachability closure introspection
    /// reports.
    #[must_use]
    pub fn register(mut self, meta: MetaType) -> Self {
        self.extra_types.push(meta);
        self
    }

    /// Declares a custom directive.
    ///
    /// Custom directives surface through introspection but have no runtime
    /// semantics unless resolvers interpret them.
    #[must_use]
    pub fn directive(mut self, directive: DirectiveType) -> Self {
        self.directives.push(directive);
        self
    }

    /// Registers a serializer for opaque host values of a GraphQL type.
    #[must_use]
    pub fn serializer(mut self, type_name: impl Into<ArcStr>, f: HostSerializeFn) -> Self {
        self.serde_registry.register(type_name, f);
        self
    }

    /// Verifies and assembles the schema, augmenting the query root with
    /// the introspection fields.
    pub fn finish(self) -> Result<SchemaType, SchemaError> {
        let mut types: FnvIndexMap<ArcStr, MetaType> = FnvIndexMap::default();
        for scalar in scalars::builtin_scalars() {
            types.insert(scalar.name().clone(), scalar);
        }

        let query = introspection::augment_query_root(self.query);
        let query_type_name = query.name.clone();
        let mutation_type_name = self.mutation.as_ref().map(|m| m.name.clone());
        let subscription_type_name = self.subscription.as_ref().map(|s| s.name.clone());

        let roots = [Some(query), self.mutation, self.subscription]
            .into_iter()
            .flatten()
            .map(ObjectMeta::into_meta);
        for meta in roots {
            let name = meta.name().clone();
            if types.contains_key(&name) {
                return Err(SchemaError::DuplicateTypeName(name));
            }
            types.insert(name, meta);
        }

        let mut extra_type_names = Vec::with_capacity(self.extra_types.len());
        for meta in self.extra_types {
            let name = meta.name().clone();
            if types.contains_key(&name) {
                return Err(SchemaError::DuplicateTypeName(name));
            }
            extra_type_names.push(name.clone());
            types.insert(name, meta);
        }

        for meta in introspection::meta_types() {
            types.entry(meta.name().clone()).or_insert(meta);
        }

        verify_references(&types)?;

        let mut directives: FnvIndexMap<ArcStr, DirectiveType> = FnvIndexMap::default();
        for directive in [DirectiveType::new_skip(), DirectiveType::new_include()]
            .into_iter()
            .chain(self.directives)
        {
            directives.insert(directive.name.clone(), directive);
        }

        Ok(SchemaType {
            types,
            query_type_name,
            mutation_type_name,
            subscription_type_name,
            directives,
            serde_registry: self.serde_registry,
            extra_type_names,
        })
    }
}

fn verify_references(types: &FnvIndexMap<ArcStr, MetaType>) -> Result<(), SchemaError> {
    let check = |owner: &ArcStr, name: &str| {
        if types.contains_key(name) {
            Ok(())
        } else {
            Err(SchemaError::UnresolvedTypeReference {
                owner: owner.clone(),
                name: name.into(),
            })
        }
    };

    for meta in types.values() {
        let owner = meta.name();
        match meta {
            MetaType::Object(o) => {
                for f in &o.fields {
                    check(owner, f.field_type.innermost_name())?;
                    for arg in f.arguments.iter().flatten() {
                        check(owner, arg.arg_type.innermost_name())?;
                    }
                }
                for iface in &o.interface_names {
                    check(owner, iface)?;
                }
            }
            MetaType::Interface(i) => {
                for f in &i.fields {
                    check(owner, f.field_type.innermost_name())?;
                    for arg in f.arguments.iter().flatten() {
                        check(owner, arg.arg_type.innermost_name())?;
                    }
                }
            }
            MetaType::Union(u) => {
                for member in &u.of_type_names {
                    check(owner, member)?;
                }
            }
            MetaType::InputObject(io) => {
                for f in &io.input_fields {
                    check(owner, f.arg_type.innermost_name())?;
                }
            }
            MetaType::Scalar(_) | MetaType::Enum(_) => {}
        }
    }
    Ok(())
}
