//! The scalar types built into every schema.
//!
//! | Scalar     | Input                                | Output          |
//! |------------|--------------------------------------|-----------------|
//! | `Int`      | 32-bit signed integer                | integer         |
//! | `Float`    | IEEE-754 double (finite)             | finite double   |
//! | `String`   | UTF-8 string                         | string          |
//! | `Boolean`  | boolean                              | boolean         |
//! | `ID`       | string, or int coerced to string     | string          |
//! | `Date`     | ISO-8601 date string, or epoch millis| ISO-8601 date   |
//! | `DateTime` | RFC 3339 string, or epoch millis     | RFC 3339 string |

use chrono::{DateTime, NaiveDate, SecondsFormat};

use crate::{
    ast::InputValue,
    executor::FieldError,
    schema::meta::{MetaType, ScalarMeta},
    value::{ScalarValue, Value},
};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn builtin_scalars() -> Vec<MetaType> {
    vec![
        ScalarMeta::new("Int", int_validate, int_deserialize, int_serialize, int_is_value)
            .into_meta(),
        ScalarMeta::new(
            "Float",
            float_validate,
            float_deserialize,
            float_serialize,
            float_is_value,
        )
        .into_meta(),
        ScalarMeta::new(
            "String",
            string_validate,
            string_deserialize,
            string_serialize,
            string_is_value,
        )
        .into_meta(),
        ScalarMeta::new(
            "Boolean",
            boolean_validate,
            boolean_deserialize,
            boolean_serialize,
            boolean_is_value,
        )
        .into_meta(),
        ScalarMeta::new("ID", id_validate, id_deserialize, id_serialize, id_is_value).into_meta(),
        ScalarMeta::new("Date", date_validate, date_deserialize, date_serialize, date_is_value)
            .description("An ISO-8601 calendar date, without time zone information")
            .into_meta(),
        ScalarMeta::new(
            "DateTime",
            date_time_validate,
            date_time_deserialize,
            date_time_serialize,
            date_time_is_value,
        )
        .description("An RFC 3339 combined date and time")
        .into_meta(),
    ]
}

fn unexpected(type_name: &str, v: impl std::fmt::Display) -> FieldError {
    FieldError::from(format!("Expected \"{type_name}\", found: {v}"))
}

// `Int`

fn int_value(v: &InputValue) -> Option<i32> {
    match v {
        InputValue::Int(i) => Some(*i),
        // JSON carries every number as a double, so integral floats in
        // range are accepted; fractional values are not.
        InputValue::Float(f) if f.fract() == 0.0 && *f >= f64::from(i32::MIN) && *f <= f64::from(i32::MAX) => {
            Some(*f as i32)
        }
        _ => None,
    }
}

fn int_validate(v: &InputValue) -> Result<(), FieldError> {
    int_value(v).map(drop).ok_or_else(|| unexpected("Int", v))
}

fn int_deserialize(v: &InputValue) -> Result<InputValue, FieldError> {
    int_value(v)
        .map(InputValue::Int)
        .ok_or_else(|| unexpected("Int", v))
}

fn int_serialize(v: &Value) -> Result<Value, FieldError> {
    match v.as_scalar() {
        Some(ScalarValue::Int(i)) => Ok(Value::scalar(*i)),
        Some(ScalarValue::Float(f))
            if f.fract() == 0.0 && *f >= f64::from(i32::MIN) && *f <= f64::from(i32::MAX) =>
        {
            Ok(Value::scalar(*f as i32))
        }
        _ => Err(unexpected("Int", v)),
    }
}

fn int_is_value(v: &Value) -> bool {
    v.as_int_value().is_some()
}

// `Float`

fn float_validate(v: &InputValue) -> Result<(), FieldError> {
    v.as_float_value()
        .map(drop)
        .ok_or_else(|| unexpected("Float", v))
}

fn float_deserialize(v: &InputValue) -> Result<InputValue, FieldError> {
    v.as_float_value()
        .map(InputValue::Float)
        .ok_or_else(|| unexpected("Float", v))
}

fn float_serialize(v: &Value) -> Result<Value, FieldError> {
    match v.as_float_value() {
        Some(f) if f.is_finite() => Ok(Value::scalar(f)),
        Some(_) => Err(FieldError::from("\"Float\" cannot represent a non-finite number")),
        None => Err(unexpected("Float", v)),
    }
}

fn float_is_value(v: &Value) -> bool {
    v.as_float_value().is_some()
}

// `String`

fn string_validate(v: &InputValue) -> Result<(), FieldError> {
    v.as_string_value()
        .map(drop)
        .ok_or_else(|| unexpected("String", v))
}

fn string_deserialize(v: &InputValue) -> Result<InputValue, FieldError> {
    string_validate(v).map(|()| v.clone())
}

fn string_serialize(v: &Value) -> Result<Value, FieldError> {
    v.as_string_value()
        .map(Value::from)
        .ok_or_else(|| unexpected("String", v))
}

fn string_is_value(v: &Value) -> bool {
    v.as_string_value().is_some()
}

// `Boolean`

fn boolean_validate(v: &InputValue) -> Result<(), FieldError> {
    v.as_boolean_value()
        .map(drop)
        .ok_or_else(|| unexpected("Boolean", v))
}

fn boolean_deserialize(v: &InputValue) -> Result<InputValue, FieldError> {
    v.as_boolean_value()
        .map(InputValue::Boolean)
        .ok_or_else(|| unexpected("Boolean", v))
}

fn boolean_serialize(v: &Value) -> Result<Value, FieldError> {
    v.as_boolean_value()
        .map(Value::from)
        .ok_or_else(|| unexpected("Boolean", v))
}

fn boolean_is_value(v: &Value) -> bool {
    v.as_boolean_value().is_some()
}

// `ID`

fn id_validate(v: &InputValue) -> Result<(), FieldError> {
    match v {
        InputValue::String(_) | InputValue::Int(_) => Ok(()),
        _ => Err(unexpected("ID", v)),
    }
}

fn id_deserialize(v: &InputValue) -> Result<InputValue, FieldError> {
    match v {
        InputValue::String(s) => Ok(InputValue::String(s.clone())),
        InputValue::Int(i) => Ok(InputValue::String(i.to_string())),
        _ => Err(unexpected("ID", v)),
    }
}

fn id_serialize(v: &Value) -> Result<Value, FieldError> {
    match v.as_scalar() {
        Some(ScalarValue::String(s)) => Ok(Value::from(s.as_str())),
        Some(ScalarValue::Int(i)) => Ok(Value::from(i.to_string())),
        _ => Err(unexpected("ID", v)),
    }
}

fn id_is_value(v: &Value) -> bool {
    matches!(
        v.as_scalar(),
        Some(ScalarValue::String(_) | ScalarValue::Int(_))
    )
}

// `Date`

fn parse_date(v: &InputValue) -> Option<NaiveDate> {
    match v {
        InputValue::String(s) => NaiveDate::parse_from_str(s, DATE_FORMAT).ok(),
        InputValue::Int(millis) => {
            DateTime::from_timestamp_millis(i64::from(*millis)).map(|dt| dt.date_naive())
        }
        _ => None,
    }
}

fn date_validate(v: &InputValue) -> Result<(), FieldError> {
    parse_date(v).map(drop).ok_or_else(|| unexpected("Date", v))
}

fn date_deserialize(v: &InputValue) -> Result<InputValue, FieldError> {
    parse_date(v)
        .map(|d| InputValue::String(d.format(DATE_FORMAT).to_string()))
        .ok_or_else(|| unexpected("Date", v))
}

fn date_serialize(v: &Value) -> Result<Value, FieldError> {
    let date = match v.as_scalar() {
        Some(ScalarValue::String(s)) => NaiveDate::parse_from_str(s, DATE_FORMAT).ok(),
        Some(ScalarValue::Int(millis)) => {
            DateTime::from_timestamp_millis(i64::from(*millis)).map(|dt| dt.date_naive())
        }
        _ => None,
    };
    date.map(|d| Value::from(d.format(DATE_FORMAT).to_string()))
        .ok_or_else(|| unexpected("Date", v))
}

fn date_is_value(v: &Value) -> bool {
    v.as_string_value()
        .is_some_and(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).is_ok())
        || v.as_int_value().is_some()
}

// `DateTime`

fn parse_date_time(v: &InputValue) -> Option<DateTime<chrono::FixedOffset>> {
    match v {
        InputValue::String(s) => DateTime::parse_from_rfc3339(s).ok(),
        InputValue::Int(millis) => {
            DateTime::from_timestamp_millis(i64::from(*millis)).map(Into::into)
        }
        _ => None,
    }
}

fn date_time_validate(v: &InputValue) -> Result<(), FieldError> {
    parse_date_time(v)
        .map(drop)
        .ok_or_else(|| unexpected("DateTime", v))
}

fn date_time_deserialize(v: &InputValue) -> Result<InputValue, FieldError> {
    parse_date_time(v)
        .map(|dt| InputValue::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true)))
        .ok_or_else(|| unexpected("DateTime", v))
}

fn date_time_serialize(v: &Value) -> Result<Value, FieldError> {
    let dt = match v.as_scalar() {
        Some(ScalarValue::String(s)) => DateTime::parse_from_rfc3339(s).ok(),
        Some(ScalarValue::Int(millis)) => {
            DateTime::from_timestamp_millis(i64::from(*millis)).map(Into::into)
        }
        _ => None,
    };
    dt.map(|dt| Value::from(dt.to_rfc3339_opts(SecondsFormat::Secs, true)))
        .ok_or_else(|| unexpected("DateTime", v))
}

fn date_time_is_value(v: &Value) -> bool {
    v.as_string_value()
        .is_some_and(|s| DateTime::parse_from_rfc3339(s).is_ok())
        || v.as_int_value().is_some()
}
