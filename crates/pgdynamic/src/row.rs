//! Row materialization: driver rows into name → value records.

use crate::error::{PgdError, PgdResult};
use crate::value::Value;
use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::error::Error;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Kind, Type};

/// Hours added to every `timestamp`/`timestamptz` value read back.
pub const DEFAULT_TIMESTAMP_SHIFT_HOURS: i64 = 7;

/// An insertion-ordered mapping from column name to value.
///
/// Serializes as a JSON object with keys in column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing the value of an existing column in place.
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some(field) => field.1 = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Result of a select-many: `{"data": [...]}`.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct Rows {
    pub data: Vec<Record>,
}

/// Result of a count: `{"total_data": n}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct Count {
    pub total_data: i64,
}

/// Enum labels travel as UTF-8 text in the binary protocol.
struct EnumLabel(String);

impl<'a> FromSql<'a> for EnumLabel {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(EnumLabel(std::str::from_utf8(raw)?.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(ty.kind(), Kind::Enum(_))
    }
}

/// Wire bytes of a column type with no dedicated decoding.
struct RawValue(Vec<u8>);

impl<'a> FromSql<'a> for RawValue {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(RawValue(raw.to_vec()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Converts driver rows into [`Record`]s.
///
/// Column names come from the result metadata, so `*` resolves to the real
/// column list. Temporal values are shifted by `timestamp_shift` and stored as
/// their text form; everything else passes through. Column types without a
/// [`Value`] counterpart come back as their binary wire bytes in
/// [`Value::Bytes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowMaterializer {
    timestamp_shift: TimeDelta,
}

impl Default for RowMaterializer {
    fn default() -> Self {
        Self {
            timestamp_shift: TimeDelta::hours(DEFAULT_TIMESTAMP_SHIFT_HOURS),
        }
    }
}

impl RowMaterializer {
    pub fn new(timestamp_shift: TimeDelta) -> Self {
        Self { timestamp_shift }
    }

    pub fn timestamp_shift(&self) -> TimeDelta {
        self.timestamp_shift
    }

    pub fn record(&self, row: &Row) -> PgdResult<Record> {
        let mut record = Record::new();
        for (idx, column) in row.columns().iter().enumerate() {
            let value = self.decode(row, idx, column.name(), column.type_())?;
            record.insert(column.name(), value);
        }
        Ok(record)
    }

    pub fn records(&self, rows: &[Row]) -> PgdResult<Vec<Record>> {
        rows.iter().map(|row| self.record(row)).collect()
    }

    /// Shift a `timestamp` value and render it.
    pub fn shift_naive(&self, ts: NaiveDateTime) -> PgdResult<String> {
        ts.checked_add_signed(self.timestamp_shift)
            .map(|shifted| shifted.to_string())
            .ok_or_else(|| PgdError::decode("timestamp", format!("{ts} overflows when shifted")))
    }

    /// Shift a `timestamptz` value and render it with its UTC offset.
    pub fn shift_utc(&self, ts: DateTime<Utc>) -> PgdResult<String> {
        self.shift_naive(ts.naive_utc())
            .map(|shifted| format!("{shifted}+00:00"))
    }

    fn decode(&self, row: &Row, idx: usize, name: &str, ty: &Type) -> PgdResult<Value> {
        fn get<'a, T: FromSql<'a>>(row: &'a Row, idx: usize, name: &str) -> PgdResult<Option<T>> {
            row.try_get::<_, Option<T>>(idx)
                .map_err(|e| PgdError::decode(name, e.to_string()))
        }

        fn list<'a, T>(row: &'a Row, idx: usize, name: &str) -> PgdResult<Value>
        where
            T: FromSql<'a> + Into<Value>,
        {
            Ok(get::<Vec<Option<T>>>(row, idx, name)?
                .map_or(Value::Null, |items| items.into_iter().collect()))
        }

        let value = match *ty {
            Type::BOOL => get::<bool>(row, idx, name)?.into(),
            Type::INT2 => get::<i16>(row, idx, name)?.into(),
            Type::INT4 => get::<i32>(row, idx, name)?.into(),
            Type::INT8 => get::<i64>(row, idx, name)?.into(),
            Type::OID => get::<u32>(row, idx, name)?.into(),
            Type::FLOAT4 => get::<f32>(row, idx, name)?.into(),
            Type::FLOAT8 => get::<f64>(row, idx, name)?.into(),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
                get::<String>(row, idx, name)?.into()
            }
            Type::JSON | Type::JSONB => get::<serde_json::Value>(row, idx, name)?.into(),
            Type::UUID => get::<uuid::Uuid>(row, idx, name)?.into(),
            Type::BYTEA => get::<Vec<u8>>(row, idx, name)?.into(),
            Type::DATE => get::<chrono::NaiveDate>(row, idx, name)?.into(),
            Type::TIME => get::<NaiveTime>(row, idx, name)?.into(),
            Type::TIMESTAMP => match get::<NaiveDateTime>(row, idx, name)? {
                Some(ts) => Value::Text(self.shift_naive(ts)?),
                None => Value::Null,
            },
            Type::TIMESTAMPTZ => match get::<DateTime<Utc>>(row, idx, name)? {
                Some(ts) => Value::Text(self.shift_utc(ts)?),
                None => Value::Null,
            },
            #[cfg(feature = "rust_decimal")]
            Type::NUMERIC => get::<rust_decimal::Decimal>(row, idx, name)?.into(),
            Type::BOOL_ARRAY => list::<bool>(row, idx, name)?,
            Type::INT2_ARRAY => list::<i16>(row, idx, name)?,
            Type::INT4_ARRAY => list::<i32>(row, idx, name)?,
            Type::INT8_ARRAY => list::<i64>(row, idx, name)?,
            Type::FLOAT4_ARRAY => list::<f32>(row, idx, name)?,
            Type::FLOAT8_ARRAY => list::<f64>(row, idx, name)?,
            Type::TEXT_ARRAY | Type::VARCHAR_ARRAY | Type::BPCHAR_ARRAY => {
                list::<String>(row, idx, name)?
            }
            Type::DATE_ARRAY => list::<chrono::NaiveDate>(row, idx, name)?,
            Type::TIME_ARRAY => list::<NaiveTime>(row, idx, name)?,
            #[cfg(feature = "rust_decimal")]
            Type::NUMERIC_ARRAY => list::<rust_decimal::Decimal>(row, idx, name)?,
            Type::UUID_ARRAY => list::<uuid::Uuid>(row, idx, name)?,
            Type::JSONB_ARRAY | Type::JSON_ARRAY => list::<serde_json::Value>(row, idx, name)?,
            _ if matches!(ty.kind(), Kind::Enum(_)) => {
                get::<EnumLabel>(row, idx, name)?.map_or(Value::Null, |l| Value::Text(l.0))
            }
            // interval, inet, money, numeric without `rust_decimal`, ...
            _ => get::<RawValue>(row, idx, name)?.map_or(Value::Null, |raw| Value::Bytes(raw.0)),
        };
        Ok(value)
    }
}
