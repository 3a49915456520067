//! Wire-format (de)serialization of request and response types.

use std::fmt;

use serde::{
    de,
    ser::{SerializeMap, SerializeSeq},
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::{
    ast::InputValue,
    executor::{ExecutionError, ExecutionOutput, PathSegment},
    parser::{SourcePosition, Spanning},
    validation::RuleError,
    GraphQLError,
};

impl<'de> Deserialize<'de> for InputValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct InputValueVisitor;

        impl<'de> de::Visitor<'de> for InputValueVisitor {
            type Value = InputValue;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a valid input value")
            }

            fn visit_bool<E>(self, value: bool) -> Result<InputValue, E> {
                Ok(InputValue::Boolean(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<InputValue, E> {
                if value >= i64::from(i32::MIN) && value <= i64::from(i32::MAX) {
                    Ok(InputValue::Int(value as i32))
                } else {
                    // Numbers without a fractional part outside the 32-bit
                    // range still fit in a double.
                    Ok(InputValue::Float(value as f64))
                }
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<InputValue, E> {
                if value <= i32::MAX as u64 {
                    Ok(InputValue::Int(value as i32))
                } else {
                    Ok(InputValue::Float(value as f64))
                }
            }

            fn visit_f64<E>(self, value: f64) -> Result<InputValue, E> {
                Ok(InputValue::Float(value))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<InputValue, E> {
                self.visit_string(value.into())
            }

            fn visit_string<E>(self, value: String) -> Result<InputValue, E> {
                Ok(InputValue::String(value))
            }

            fn visit_none<E>(self) -> Result<InputValue, E> {
                Ok(InputValue::Null)
            }

            fn visit_unit<E>(self) -> Result<InputValue, E> {
                Ok(InputValue::Null)
            }

            fn visit_seq<V: de::SeqAccess<'de>>(self, mut visitor: V) -> Result<InputValue, V::Error> {
                let mut values = Vec::new();
                while let Some(el) = visitor.next_element()? {
                    values.push(Spanning::unlocated(el));
                }
                Ok(InputValue::List(values))
            }

            fn visit_map<V: de::MapAccess<'de>>(self, mut visitor: V) -> Result<InputValue, V::Error> {
                let mut fields = Vec::new();
                while let Some((key, value)) = visitor.next_entry::<String, InputValue>()? {
                    fields.push((Spanning::unlocated(key), Spanning::unlocated(value)));
                }
                Ok(InputValue::Object(fields))
            }
        }

        deserializer.deserialize_any(InputValueVisitor)
    }
}

impl Serialize for InputValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null | Self::Variable(_) => serializer.serialize_none(),
            Self::Int(i) => serializer.serialize_i32(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) | Self::Enum(s) => serializer.serialize_str(s),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::List(l) => {
                let mut seq = serializer.serialize_seq(Some(l.len()))?;
                for el in l {
                    seq.serialize_element(&el.item)?;
                }
                seq.end()
            }
            Self::Object(o) => {
                let mut map = serializer.serialize_map(Some(o.len()))?;
                for (k, v) in o {
                    map.serialize_entry(&k.item, &v.item)?;
                }
                map.end()
            }
        }
    }
}

/// The response shape of a source location: 1-based line and column.
struct SerializablePosition(SourcePosition);

impl Serialize for SerializablePosition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("line", &(self.0.line() + 1))?;
        map.serialize_entry("column", &(self.0.column() + 1))?;
        map.end()
    }
}

impl Serialize for PathSegment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Key(key) => serializer.serialize_str(key),
            Self::Index(index) => serializer.serialize_u64(*index as u64),
        }
    }
}

impl Serialize for ExecutionError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;

        map.serialize_entry("message", self.error().message())?;
        map.serialize_entry("locations", &[SerializablePosition(*self.location())])?;
        if !self.path().is_empty() {
            map.serialize_entry("path", self.path())?;
        }
        if !self.error().extensions().is_null() {
            map.serialize_entry("extensions", self.error().extensions())?;
        }

        map.end()
    }
}

impl Serialize for RuleError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;

        map.serialize_entry("message", self.message())?;
        let locations: Vec<_> = self
            .locations()
            .iter()
            .map(|p| SerializablePosition(*p))
            .collect();
        map.serialize_entry("locations", &locations)?;

        map.end()
    }
}

impl Serialize for GraphQLError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::ParseError(error) => {
                let mut seq = serializer.serialize_seq(Some(1))?;
                seq.serialize_element(&SerializableParseError(error))?;
                seq.end()
            }
            Self::ValidationError(errors) => errors.serialize(serializer),
            other => {
                let mut seq = serializer.serialize_seq(Some(1))?;
                seq.serialize_element(&SerializableMessage(&other.to_string()))?;
                seq.end()
            }
        }
    }
}

struct SerializableParseError<'a>(&'a Spanning<crate::parser::ParseError>);

impl Serialize for SerializableParseError<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("message", self.0.item.message())?;
        map.serialize_entry("locations", &[SerializablePosition(self.0.span.start)])?;
        map.end()
    }
}

struct SerializableMessage<'a>(&'a str);

impl Serialize for SerializableMessage<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("message", self.0)?;
        map.end()
    }
}

impl Serialize for ExecutionOutput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("data", &self.data)?;
        if !self.errors.is_empty() {
            map.serialize_entry("errors", &self.errors)?;
        }
        map.end()
    }
}
