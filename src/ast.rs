//! The executable document AST produced by the parser collaborator.

use std::{fmt, slice};

use arcstr::ArcStr;

use crate::{
    executor::Variables,
    parser::Spanning,
};

/// Type literal in a syntax tree.
///
/// Carries no semantic information and might refer to types that don't
/// exist. Also used by the schema to reference its own types.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Type {
    /// A nullable named type, e.g. `String`.
    Named(ArcStr),

    /// A nullable list type, e.g. `[String]`.
    ///
    /// The list itself is nullable, the containing type might be non-null.
    List(Box<Type>),

    /// A non-null named type, e.g. `String!`.
    NonNullNamed(ArcStr),

    /// A non-null list type, e.g. `[String]!`.
    ///
    /// The list itself is non-null, the containing type might be nullable.
    NonNullList(Box<Type>),
}

impl Type {
    /// Returns the name of this named [`Type`].
    ///
    /// Lists return [`None`].
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(n) | Self::NonNullNamed(n) => Some(n),
            Self::List(_) | Self::NonNullList(_) => None,
        }
    }

    /// Returns the innermost name of this [`Type`] by unpacking lists.
    ///
    /// All type literals contain exactly one name.
    pub fn innermost_name(&self) -> &str {
        match self {
            Self::Named(n) | Self::NonNullNamed(n) => n,
            Self::List(l) | Self::NonNullList(l) => l.innermost_name(),
        }
    }

    /// Indicates whether this [`Type`] can be `null`.
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNullNamed(_) | Self::NonNullList(_))
    }

    /// Strips one level of non-null, returning the nullable form of this
    /// [`Type`].
    pub fn into_nullable(self) -> Self {
        match self {
            Self::NonNullNamed(n) => Self::Named(n),
            Self::NonNullList(l) => Self::List(l),
            t => t,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(n) => write!(f, "{n}"),
            Self::NonNullNamed(n) => write!(f, "{n}!"),
            Self::List(t) => write!(f, "[{t}]"),
            Self::NonNullList(t) => write!(f, "[{t}]!"),
        }
    }
}

/// A JSON-like value that can be passed into the query execution, either
/// out-of-band, or in-band as default variable values. These are _not_
/// constant and might contain variables.
///
/// List and object variants are _spanned_: they carry the position of their
/// elements in the source file, if available.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum InputValue {
    Null,
    Int(i32),
    Float(f64),
    String(String),
    Boolean(bool),
    Enum(String),
    Variable(String),
    List(Vec<Spanning<InputValue>>),
    Object(Vec<(Spanning<String>, Spanning<InputValue>)>),
}

impl InputValue {
    /// Constructs a `null` value.
    pub fn null() -> Self {
        Self::Null
    }

    /// Constructs an enum value.
    pub fn enum_value(s: impl AsRef<str>) -> Self {
        Self::Enum(s.as_ref().into())
    }

    /// Constructs a variable reference.
    pub fn variable(v: impl AsRef<str>) -> Self {
        Self::Variable(v.as_ref().into())
    }

    /// Constructs a list of unlocated values.
    pub fn list(l: Vec<Self>) -> Self {
        Self::List(l.into_iter().map(Spanning::unlocated).collect())
    }

    /// Constructs an object of unlocated keys and values.
    pub fn object<K: Into<String>>(o: Vec<(K, Self)>) -> Self {
        Self::Object(
            o.into_iter()
                .map(|(k, v)| (Spanning::unlocated(k.into()), Spanning::unlocated(v)))
                .collect(),
        )
    }

    /// Does the value represent a `null`?
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Does the value represent a variable reference?
    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Variable(_))
    }

    /// Views the underlying enum member name, if present.
    ///
    /// JSON-shaped inputs carry enum members as plain strings, so those are
    /// accepted too.
    pub fn as_enum_value(&self) -> Option<&str> {
        match self {
            Self::Enum(e) | Self::String(e) => Some(e),
            _ => None,
        }
    }

    /// Views the underlying string value, if present.
    pub fn as_string_value(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Views the underlying int value, if present.
    pub fn as_int_value(&self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Views the underlying float value, if present.
    ///
    /// Ints widen to floats here.
    pub fn as_float_value(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(f64::from(*i)),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Views the underlying boolean value, if present.
    pub fn as_boolean_value(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Views this value as a list of its elements, if it is a list.
    pub fn to_list_value(&self) -> Option<Vec<&Self>> {
        match self {
            Self::List(l) => Some(l.iter().map(|s| &s.item).collect()),
            _ => None,
        }
    }

    /// Views this value as key/value pairs, if it is an object.
    pub fn to_object_value(&self) -> Option<Vec<(&str, &Self)>> {
        match self {
            Self::Object(o) => Some(
                o.iter()
                    .map(|(sk, sv)| (sk.item.as_str(), &sv.item))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Resolves all variables of this [`InputValue`] to their actual
    /// `values`.
    ///
    /// If a variable is not present in `values`:
    /// - returns [`None`] in case this is an [`InputValue::Variable`];
    /// - skips the field in case of an [`InputValue::Object`] field;
    /// - replaces with [`InputValue::Null`] in case of an
    ///   [`InputValue::List`] element.
    pub fn into_const(self, values: &Variables) -> Option<Self> {
        match self {
            Self::Variable(v) => values.get(&v).cloned(),
            Self::List(l) => Some(Self::List(
                l.into_iter()
                    .map(|s| s.map(|v| v.into_const(values).unwrap_or_else(Self::null)))
                    .collect(),
            )),
            Self::Object(o) => Some(Self::Object(
                o.into_iter()
                    .filter_map(|(sk, sv)| {
                        let span = sv.span;
                        sv.item
                            .into_const(values)
                            .map(|v| (sk, Spanning::new(span, v)))
                    })
                    .collect(),
            )),
            v => Some(v),
        }
    }

    /// Recursively finds all referenced variables.
    pub fn referenced_variables(&self) -> Vec<&str> {
        match self {
            Self::Variable(name) => vec![name.as_str()],
            Self::List(l) => l
                .iter()
                .flat_map(|v| v.item.referenced_variables())
                .collect(),
            Self::Object(o) => o
                .iter()
                .flat_map(|(_, v)| v.item.referenced_variables())
                .collect(),
            _ => vec![],
        }
    }

    /// Compares equality with another [`InputValue`] ignoring any source
    /// position information.
    pub fn unlocated_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Int(i1), Self::Int(i2)) => i1 == i2,
            (Self::Float(f1), Self::Float(f2)) => f1 == f2,
            (Self::Boolean(b1), Self::Boolean(b2)) => b1 == b2,
            (Self::String(s1), Self::String(s2))
            | (Self::Enum(s1), Self::Enum(s2))
            | (Self::Variable(s1), Self::Variable(s2)) => s1 == s2,
            (Self::List(l1), Self::List(l2)) => {
                l1.len() == l2.len()
                    && l1
                        .iter()
                        .zip(l2.iter())
                        .all(|(v1, v2)| v1.item.unlocated_eq(&v2.item))
            }
            (Self::Object(o1), Self::Object(o2)) => {
                o1.len() == o2.len()
                    && o1.iter().all(|(sk1, sv1)| {
                        o2.iter().any(|(sk2, sv2)| {
                            sk1.item == sk2.item && sv1.item.unlocated_eq(&sv2.item)
                        })
                    })
            }
            _ => false,
        }
    }
}

impl fmt::Display for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Enum(v) => write!(f, "{v}"),
            Self::Variable(v) => write!(f, "${v}"),
            Self::List(v) => {
                write!(f, "[")?;
                for (i, spanning) in v.iter().enumerate() {
                    spanning.item.fmt(f)?;
                    if i < v.len() - 1 {
                        write!(f, ", ")?;
                    }
                }
                write!(f, "]")
            }
            Self::Object(o) => {
                write!(f, "{{")?;
                for (i, (k, v)) in o.iter().enumerate() {
                    write!(f, "{}: ", k.item)?;
                    v.item.fmt(f)?;
                    if i < o.len() - 1 {
                        write!(f, ", ")?;
                    }
                }
                write!(f, "}}")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct VariableDefinition {
    pub var_type: Spanning<Type>,
    pub default_value: Option<Spanning<InputValue>>,
}

#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct VariableDefinitions {
    pub items: Vec<(Spanning<String>, VariableDefinition)>,
}

impl VariableDefinitions {
    #[allow(missing_docs)]
    pub fn iter(&self) -> slice::Iter<'_, (Spanning<String>, VariableDefinition)> {
        self.items.iter()
    }
}

#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct Arguments {
    pub items: Vec<(Spanning<String>, Spanning<InputValue>)>,
}

impl Arguments {
    #[allow(missing_docs)]
    pub fn iter(&self) -> slice::Iter<'_, (Spanning<String>, Spanning<InputValue>)> {
        self.items.iter()
    }

    #[allow(missing_docs)]
    pub fn get(&self, key: &str) -> Option<&Spanning<InputValue>> {
        self.items
            .iter()
            .find(|(k, _)| k.item == key)
            .map(|(_, v)| v)
    }
}

#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct Field {
    pub alias: Option<Spanning<String>>,
    pub name: Spanning<String>,
    pub arguments: Option<Spanning<Arguments>>,
    pub directives: Option<Vec<Spanning<Directive>>>,
    pub selection_set: Option<Vec<Selection>>,
}

impl Field {
    /// The key this field contributes to the response object: its alias if
    /// present, otherwise its name.
    pub fn response_key(&self) -> &str {
        self.alias
            .as_ref()
            .map_or(&self.name.item, |alias| &alias.item)
    }
}

#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct FragmentSpread {
    pub name: Spanning<String>,
    pub directives: Option<Vec<Spanning<Directive>>>,
}

#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct InlineFragment {
    pub type_condition: Option<Spanning<String>>,
    pub directives: Option<Vec<Spanning<Directive>>>,
    pub selection_set: Vec<Selection>,
}

/// Entry in a GraphQL selection set.
///
/// One of the three kinds of selection that exist in GraphQL: a field, a
/// fragment spread, or an inline fragment. Each variant references its
/// location in the query source.
///
/// ```text
/// {
///   field(withArg: 123) { subField }
///   ...fragmentSpread
///   ...on User {
///     inlineFragmentField
///   }
/// }
/// ```
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum Selection {
    Field(Spanning<Field>),
    FragmentSpread(Spanning<FragmentSpread>),
    InlineFragment(Spanning<InlineFragment>),
}

#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct Directive {
    pub name: Spanning<String>,
    pub arguments: Option<Spanning<Arguments>>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct Operation {
    pub operation_type: OperationType,
    pub name: Option<Spanning<String>>,
    pub variable_definitions: Option<Spanning<VariableDefinitions>>,
    pub directives: Option<Vec<Spanning<Directive>>>,
    pub selection_set: Vec<Selection>,
}

#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct Fragment {
    pub name: Spanning<String>,
    pub type_condition: Spanning<String>,
    pub directives: Option<Vec<Spanning<Directive>>>,
    pub selection_set: Vec<Selection>,
}

/// A type-system definition a parser may hand over alongside executable
/// definitions.
///
/// The engine never interprets these; validation rejects documents
/// containing them.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeSystemDefinition {
    /// The introducing keyword, e.g. `type` or `schema`.
    pub keyword: String,

    /// The defined name, if the definition kind carries one.
    pub name: Option<Spanning<String>>,
}

#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum Definition {
    Operation(Spanning<Operation>),
    Fragment(Spanning<Fragment>),
    TypeSystem(Spanning<TypeSystemDefinition>),
}

#[doc(hidden)]
pub type Document = [Definition];
#[doc(hidden)]
pub type OwnedDocument = Vec<Definition>;
