//! Dynamic values bound as parameters and returned in records.
//!
//! [`Value`] is the single currency between descriptors, rendered queries and
//! materialized rows. Binding goes through [`ToSql`], which adapts the value to
//! whatever type the server inferred for the placeholder: an `Int` bound to an
//! `int4` column is sent as 4 bytes, not 8, and `Text("1")` against an integer
//! key is parsed and sent as an integer. A value that cannot be represented in
//! the placeholder's type is an error; bytes of another type are never sent.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use std::error::Error;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type};
use uuid::Uuid;

/// A dynamically typed SQL value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Json(serde_json::Value),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
    Bytes(Vec<u8>),
    #[cfg(feature = "rust_decimal")]
    Decimal(rust_decimal::Decimal),
    /// Bound as a single array parameter; never flattened into several placeholders.
    Array(Vec<Value>),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the text payload, if this is a [`Value::Text`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the variant, used in binding errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Json(_) => "json",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Timestamp(_) => "timestamp",
            Value::TimestampTz(_) => "timestamptz",
            Value::Uuid(_) => "uuid",
            Value::Bytes(_) => "bytes",
            #[cfg(feature = "rust_decimal")]
            Value::Decimal(_) => "decimal",
            Value::Array(_) => "array",
        }
    }

    /// Return the integer payload, if this is a [`Value::Int`].
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

type BoxError = Box<dyn Error + Sync + Send>;

fn wrong_type(value: &Value, ty: &Type) -> BoxError {
    format!("cannot bind {} to a parameter of type {}", value.type_name(), ty.name()).into()
}

/// Encode `v` only if its Rust type accepts `ty`; never write foreign bytes.
fn bind<T: ToSql>(v: &T, value: &Value, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if !T::accepts(ty) {
        return Err(wrong_type(value, ty));
    }
    v.to_sql(ty, out)
}

fn to_sql_int(v: i64, value: &Value, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::OID => u32::try_from(v)?.to_sql(ty, out),
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => (v as f64).to_sql(ty, out),
        #[cfg(feature = "rust_decimal")]
        Type::NUMERIC => rust_decimal::Decimal::from(v).to_sql(ty, out),
        _ => bind(&v, value, ty, out),
    }
}

fn to_sql_float(v: f64, value: &Value, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        #[cfg(feature = "rust_decimal")]
        Type::NUMERIC => rust_decimal::Decimal::try_from(v)?.to_sql(ty, out),
        _ => bind(&v, value, ty, out),
    }
}

fn parse_bool(s: &str) -> Result<bool, BoxError> {
    match s.to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Ok(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Ok(false),
        _ => Err(format!("invalid boolean '{s}'").into()),
    }
}

/// Text is sent as text when the server expects text, and parsed into the
/// target type otherwise (`"1"` against an integer key binds the integer 1).
fn to_sql_text(s: &str, value: &Value, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if <&str as ToSql>::accepts(ty) {
        return s.to_sql(ty, out);
    }
    if let Kind::Enum(_) = ty.kind() {
        out.extend_from_slice(s.as_bytes());
        return Ok(IsNull::No);
    }

    let raw = s.trim();
    match *ty {
        Type::BOOL => parse_bool(raw)?.to_sql(ty, out),
        Type::INT2 | Type::INT4 | Type::INT8 | Type::OID => {
            to_sql_int(raw.parse::<i64>()?, value, ty, out)
        }
        Type::FLOAT4 | Type::FLOAT8 => to_sql_float(raw.parse::<f64>()?, value, ty, out),
        #[cfg(feature = "rust_decimal")]
        Type::NUMERIC => raw.parse::<rust_decimal::Decimal>()?.to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out),
        Type::UUID => Uuid::parse_str(raw)?.to_sql(ty, out),
        Type::DATE => raw.parse::<NaiveDate>()?.to_sql(ty, out),
        Type::TIME => raw.parse::<NaiveTime>()?.to_sql(ty, out),
        Type::TIMESTAMP => raw
            .parse::<NaiveDateTime>()
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))?
            .to_sql(ty, out),
        Type::TIMESTAMPTZ => raw.parse::<DateTime<Utc>>()?.to_sql(ty, out),
        _ => Err(wrong_type(value, ty)),
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => bind(v, self, ty, out),
            Value::Int(v) => to_sql_int(*v, self, ty, out),
            Value::Float(v) => to_sql_float(*v, self, ty, out),
            Value::Text(v) => to_sql_text(v, self, ty, out),
            Value::Json(v) => bind(v, self, ty, out),
            Value::Date(v) => bind(v, self, ty, out),
            Value::Time(v) => bind(v, self, ty, out),
            Value::Timestamp(v) => bind(v, self, ty, out),
            Value::TimestampTz(v) => bind(v, self, ty, out),
            Value::Uuid(v) => bind(v, self, ty, out),
            Value::Bytes(v) => bind(v, self, ty, out),
            #[cfg(feature = "rust_decimal")]
            Value::Decimal(v) => bind(v, self, ty, out),
            // Elements are checked one by one against the member type.
            Value::Array(items) => match ty.kind() {
                Kind::Array(_) => items.to_sql(ty, out),
                _ => Err(wrong_type(self, ty)),
            },
        }
    }

    // Each variant checks the server type itself in `to_sql`, so that text can
    // be parsed into whatever the placeholder turned out to be.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    String => Text,
    &str => Text,
    serde_json::Value => Json,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
    Uuid => Uuid,
    Vec<u8> => Bytes,
}

#[cfg(feature = "rust_decimal")]
impl From<rust_decimal::Decimal> for Value {
    fn from(v: rust_decimal::Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> FromIterator<T> for Value {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Value::Array(iter.into_iter().map(Into::into).collect())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::Json(v) => write!(f, "{v}"),
            Value::Date(v) => write!(f, "{v}"),
            Value::Time(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "{v}"),
            Value::TimestampTz(v) => write!(f, "{v}"),
            Value::Uuid(v) => write!(f, "{v}"),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            #[cfg(feature = "rust_decimal")]
            Value::Decimal(v) => write!(f, "{v}"),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &Value, ty: &Type) -> Result<(IsNull, BytesMut), BoxError> {
        let mut out = BytesMut::new();
        let is_null = value.to_sql(ty, &mut out)?;
        Ok((is_null, out))
    }

    #[test]
    fn int_follows_server_width() {
        let (_, out) = encode(&Value::Int(7), &Type::INT4).unwrap();
        assert_eq!(out.len(), 4);

        let (_, out) = encode(&Value::Int(7), &Type::INT2).unwrap();
        assert_eq!(out.len(), 2);

        let (_, out) = encode(&Value::Int(7), &Type::INT8).unwrap();
        assert_eq!(out.len(), 8);
    }

    #[test]
    fn int_out_of_range_is_rejected() {
        assert!(encode(&Value::Int(i64::from(i32::MAX) + 1), &Type::INT4).is_err());
    }

    #[test]
    fn null_is_sent_as_null() {
        let (is_null, out) = encode(&Value::Null, &Type::TEXT).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
        assert!(out.is_empty());
    }

    #[test]
    fn array_needs_array_type() {
        let items = Value::Array(vec![Value::Int(1)]);
        assert!(encode(&items, &Type::INT8).is_err());
        assert!(encode(&items, &Type::INT8_ARRAY).is_ok());
    }

    #[test]
    fn text_is_parsed_into_integer_types() {
        let (_, out) = encode(&Value::from("1234"), &Type::INT4).unwrap();
        assert_eq!(&out[..], &1234_i32.to_be_bytes());

        let (_, out) = encode(&Value::from(" 7 "), &Type::INT8).unwrap();
        assert_eq!(&out[..], &7_i64.to_be_bytes());

        assert!(encode(&Value::from("12x"), &Type::INT4).is_err());
    }

    #[test]
    fn text_stays_text_for_text_types() {
        let (_, out) = encode(&Value::from("1234"), &Type::TEXT).unwrap();
        assert_eq!(&out[..], b"1234");

        let (_, out) = encode(&Value::from("1234"), &Type::VARCHAR).unwrap();
        assert_eq!(&out[..], b"1234");
    }

    #[test]
    fn text_is_parsed_into_other_scalars() {
        let (_, out) = encode(&Value::from("t"), &Type::BOOL).unwrap();
        assert_eq!(&out[..], &[1]);

        let id = Uuid::nil();
        let (_, out) = encode(&Value::from(id.to_string()), &Type::UUID).unwrap();
        assert_eq!(&out[..], id.as_bytes());

        assert!(encode(&Value::from("2024-03-01 09:00:00"), &Type::TIMESTAMP).is_ok());
        assert!(encode(&Value::from("2024-03-01"), &Type::DATE).is_ok());
        assert!(encode(&Value::from("not json"), &Type::JSONB).is_err());
    }

    #[test]
    fn mismatched_types_are_rejected() {
        assert!(encode(&Value::Float(1.5), &Type::INT8).is_err());
        assert!(encode(&Value::Bool(true), &Type::TEXT).is_err());
        assert!(encode(&Value::Int(1), &Type::TEXT).is_err());
        assert!(encode(&Value::Uuid(Uuid::nil()), &Type::BYTEA).is_err());

        let Err(err) = encode(&Value::Bool(true), &Type::TEXT) else {
            panic!("bool bound to text");
        };
        assert_eq!(err.to_string(), "cannot bind bool to a parameter of type text");
    }

    #[test]
    fn checked_encoding_rejects_mismatch() {
        let mut out = BytesMut::new();
        assert!(Value::Float(1.5).to_sql_checked(&Type::INT8, &mut out).is_err());
        assert!(out.is_empty());

        let (_, out) = encode(&Value::Float(1.5), &Type::FLOAT4).unwrap();
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn array_elements_are_checked() {
        let items = Value::Array(vec![Value::from("1"), Value::from("2")]);
        assert!(encode(&items, &Type::INT4_ARRAY).is_ok());

        let items = Value::Array(vec![Value::Bool(true)]);
        assert!(encode(&items, &Type::TEXT_ARRAY).is_err());
    }

    #[test]
    fn conversions() {
        assert_eq!(Value::from(5_i32), Value::Int(5));
        assert_eq!(Value::from("x"), Value::Text("x".to_string()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(
            vec![1_i64, 2].into_iter().collect::<Value>(),
            Value::Array(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn serializes_untagged() {
        let json = serde_json::to_string(&Value::Array(vec![
            Value::Int(1),
            Value::Null,
            Value::from("a"),
        ]))
        .unwrap();
        assert_eq!(json, r#"[1,null,"a"]"#);
    }
}
