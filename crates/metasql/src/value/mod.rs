//! Dynamic SQL values and the declared-type coercion table.
//!
//! Caller data arrives untyped (JSON request bodies, parameter bags). Before
//! anything is bound it is coerced into a [`SqlValue`] matching the column's
//! declared [`SqlType`], so a `"5"` for an `int` column is bound as an
//! integer and never as a text literal.
//!
//! ```ignore
//! use metasql::value::{SqlType, coerce};
//!
//! let ty = SqlType::from_declared("numeric(10,2)");
//! let v = coerce(&serde_json::json!("12.50"), ty)?;
//! ```

mod coerce;
mod pg;

#[cfg(test)]
mod tests;

pub use coerce::{CoerceError, coerce, is_blank};
pub(crate) use pg::pg_sql_type;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Native value family selected by a declared SQL type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlType {
    Integer,
    Decimal,
    Float,
    Boolean,
    Text,
    Date,
    Timestamp,
    TimestampTz,
    Uuid,
    Json,
}

impl SqlType {
    /// Map a declared type name (as reported by schema introspection) to a
    /// coercion family.
    ///
    /// Length/precision suffixes are ignored (`varchar(50)`, `numeric(10,2)`).
    /// Unrecognised names fall back to [`SqlType::Text`].
    pub fn from_declared(declared: &str) -> Self {
        let lower = declared.trim().to_ascii_lowercase();
        let base = match lower.find('(') {
            Some(pos) => lower[..pos].trim_end(),
            None => lower.as_str(),
        };

        match base {
            "int" | "integer" | "int2" | "int4" | "int8" | "smallint" | "bigint" | "tinyint"
            | "serial" | "smallserial" | "bigserial" | "oid" => Self::Integer,
            "decimal" | "numeric" | "money" | "smallmoney" => Self::Decimal,
            "real" | "float" | "float4" | "float8" | "double" | "double precision" => Self::Float,
            "bool" | "boolean" | "bit" => Self::Boolean,
            "date" => Self::Date,
            "timestamp" | "timestamp without time zone" | "datetime" | "datetime2"
            | "smalldatetime" => Self::Timestamp,
            "timestamptz" | "timestamp with time zone" | "datetimeoffset" => Self::TimestampTz,
            "uuid" | "uniqueidentifier" => Self::Uuid,
            "json" | "jsonb" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Whether blank strings are meaningful values for this type.
    pub fn accepts_blank(self) -> bool {
        matches!(self, Self::Text | Self::Json)
    }
}

/// A dynamically typed SQL value, bindable as a `tokio-postgres` parameter
/// and decodable from any supported column.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The coercion family this value already belongs to (`None` for NULL).
    pub fn sql_type(&self) -> Option<SqlType> {
        Some(match self {
            Self::Null => return None,
            Self::Bool(_) => SqlType::Boolean,
            Self::Int(_) => SqlType::Integer,
            Self::Float(_) => SqlType::Float,
            Self::Decimal(_) => SqlType::Decimal,
            Self::Text(_) => SqlType::Text,
            Self::Date(_) => SqlType::Date,
            Self::Timestamp(_) => SqlType::Timestamp,
            Self::TimestampTz(_) => SqlType::TimestampTz,
            Self::Uuid(_) => SqlType::Uuid,
            Self::Json(_) => SqlType::Json,
        })
    }

    /// Infer a value from JSON without a declared type.
    ///
    /// Used for guard-rule parameters, where the server infers the
    /// placeholder type and the value is adapted at bind time.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map(Self::Float).unwrap_or(Self::Null),
            },
            serde_json::Value::String(s) => Self::Text(s.clone()),
            other => Self::Json(other.clone()),
        }
    }

    /// Render the value as JSON (e.g. for returning dynamic rows).
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(n) => Value::from(*n),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Decimal(d) => Value::String(d.to_string()),
            Self::Text(s) => Value::String(s.clone()),
            Self::Date(d) => Value::String(d.to_string()),
            Self::Timestamp(t) => Value::String(t.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            Self::TimestampTz(t) => Value::String(t.to_rfc3339()),
            Self::Uuid(u) => Value::String(u.to_string()),
            Self::Json(v) => v.clone(),
        }
    }

    /// Convert this value into the given family.
    ///
    /// Text is parsed, numbers are widened or narrowed when lossless, and
    /// date/time values move between naive, UTC, and date-only forms.
    pub fn convert(self, ty: SqlType) -> Result<SqlValue, CoerceError> {
        coerce::convert(self, ty)
    }
}

macro_rules! impl_from_for_sql_value {
    ($($ty:ty => $variant:ident $(as $cast:ty)?),* $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(v: $ty) -> Self {
                    SqlValue::$variant(v $(as $cast)?)
                }
            }
        )*
    };
}

impl_from_for_sql_value! {
    bool => Bool,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int,
    u32 => Int as i64,
    f32 => Float as f64,
    f64 => Float,
    Decimal => Decimal,
    String => Text,
    NaiveDate => Date,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
    Uuid => Uuid,
    serde_json::Value => Json,
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        SqlValue::Text(v.clone())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}
