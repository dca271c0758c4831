use super::{SqlType, SqlValue};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// A value could not be represented in the requested [`SqlType`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {found} to {target:?}")]
pub struct CoerceError {
    pub target: SqlType,
    pub found: String,
}

impl CoerceError {
    fn new(target: SqlType, found: impl std::fmt::Display) -> Self {
        Self {
            target,
            found: found.to_string(),
        }
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// Returns `true` for JSON strings that are empty or whitespace-only.
pub fn is_blank(value: &serde_json::Value) -> bool {
    matches!(value, serde_json::Value::String(s) if s.trim().is_empty())
}

/// Coerce an untyped caller value into the declared type.
pub fn coerce(value: &serde_json::Value, ty: SqlType) -> Result<SqlValue, CoerceError> {
    use serde_json::Value;
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::String(s) => parse_text(s, ty),
        Value::Bool(b) => convert(SqlValue::Bool(*b), ty),
        Value::Number(n) => {
            if ty == SqlType::Decimal {
                return parse_decimal(&n.to_string()).ok_or_else(|| CoerceError::new(ty, n));
            }
            match n.as_i64() {
                Some(i) => convert(SqlValue::Int(i), ty),
                None => match n.as_f64() {
                    Some(f) => convert(SqlValue::Float(f), ty),
                    None => Err(CoerceError::new(ty, n)),
                },
            }
        }
        Value::Array(_) | Value::Object(_) => match ty {
            SqlType::Json => Ok(SqlValue::Json(value.clone())),
            SqlType::Text => Ok(SqlValue::Text(value.to_string())),
            _ => Err(CoerceError::new(ty, "a JSON structure")),
        },
    }
}

pub(super) fn convert(value: SqlValue, ty: SqlType) -> Result<SqlValue, CoerceError> {
    if value.sql_type().is_none_or(|t| t == ty) {
        return Ok(value);
    }

    let out = match (value, ty) {
        (SqlValue::Text(s), _) => return parse_text(&s, ty),
        (SqlValue::Json(v), _) => return coerce(&v, ty),

        (SqlValue::Int(n), SqlType::Decimal) => SqlValue::Decimal(Decimal::from(n)),
        (SqlValue::Int(n), SqlType::Float) => SqlValue::Float(n as f64),
        (SqlValue::Int(n), SqlType::Boolean) => SqlValue::Bool(n != 0),
        (SqlValue::Int(n), SqlType::Text) => SqlValue::Text(n.to_string()),
        (SqlValue::Int(n), SqlType::Json) => SqlValue::Json(n.into()),

        (SqlValue::Float(f), SqlType::Integer) if f.fract() == 0.0 && f.abs() < 9.0e15 => {
            SqlValue::Int(f as i64)
        }
        (SqlValue::Float(f), SqlType::Decimal) => {
            SqlValue::Decimal(Decimal::try_from(f).map_err(|_| CoerceError::new(ty, f))?)
        }
        (SqlValue::Float(f), SqlType::Text) => SqlValue::Text(f.to_string()),
        (SqlValue::Float(f), SqlType::Json) => serde_json::Number::from_f64(f)
            .map(|n| SqlValue::Json(n.into()))
            .ok_or_else(|| CoerceError::new(ty, f))?,

        (SqlValue::Decimal(d), SqlType::Integer) if d.fract().is_zero() => {
            SqlValue::Int(d.to_i64().ok_or_else(|| CoerceError::new(ty, d))?)
        }
        (SqlValue::Decimal(d), SqlType::Float) => {
            SqlValue::Float(d.to_f64().ok_or_else(|| CoerceError::new(ty, d))?)
        }
        (SqlValue::Decimal(d), SqlType::Boolean) => SqlValue::Bool(!d.is_zero()),
        (SqlValue::Decimal(d), SqlType::Text) => SqlValue::Text(d.to_string()),

        (SqlValue::Bool(b), SqlType::Integer) => SqlValue::Int(i64::from(b)),
        (SqlValue::Bool(b), SqlType::Text) => SqlValue::Text(b.to_string()),
        (SqlValue::Bool(b), SqlType::Json) => SqlValue::Json(b.into()),

        (SqlValue::Date(d), SqlType::Timestamp) => SqlValue::Timestamp(midnight(d)),
        (SqlValue::Date(d), SqlType::TimestampTz) => SqlValue::TimestampTz(midnight(d).and_utc()),
        (SqlValue::Date(d), SqlType::Text) => SqlValue::Text(d.to_string()),

        (SqlValue::Timestamp(t), SqlType::Date) => SqlValue::Date(t.date()),
        (SqlValue::Timestamp(t), SqlType::TimestampTz) => SqlValue::TimestampTz(t.and_utc()),
        (SqlValue::Timestamp(t), SqlType::Text) => {
            SqlValue::Text(t.format("%Y-%m-%d %H:%M:%S%.f").to_string())
        }

        (SqlValue::TimestampTz(t), SqlType::Date) => SqlValue::Date(t.date_naive()),
        (SqlValue::TimestampTz(t), SqlType::Timestamp) => SqlValue::Timestamp(t.naive_utc()),
        (SqlValue::TimestampTz(t), SqlType::Text) => SqlValue::Text(t.to_rfc3339()),

        (SqlValue::Uuid(u), SqlType::Text) => SqlValue::Text(u.to_string()),

        (other, _) => return Err(CoerceError::new(ty, format!("{other:?}"))),
    };
    Ok(out)
}

fn parse_text(s: &str, ty: SqlType) -> Result<SqlValue, CoerceError> {
    let t = s.trim();
    let err = || CoerceError::new(ty, format!("{s:?}"));

    let value = match ty {
        SqlType::Text => SqlValue::Text(s.to_string()),
        SqlType::Integer => match t.parse::<i64>() {
            Ok(n) => SqlValue::Int(n),
            Err(_) => {
                let d = parse_decimal(t).ok_or_else(err)?;
                return convert(d, ty).map_err(|_| err());
            }
        },
        SqlType::Decimal => parse_decimal(t).ok_or_else(err)?,
        SqlType::Float => SqlValue::Float(t.parse::<f64>().map_err(|_| err())?),
        SqlType::Boolean => match t.to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" | "y" | "on" => SqlValue::Bool(true),
            "false" | "f" | "0" | "no" | "n" | "off" => SqlValue::Bool(false),
            _ => return Err(err()),
        },
        SqlType::Date => match parse_date(t) {
            Some(d) => SqlValue::Date(d),
            None => SqlValue::Date(parse_datetime(t).ok_or_else(err)?.date_naive()),
        },
        SqlType::Timestamp => SqlValue::Timestamp(parse_datetime(t).ok_or_else(err)?.naive_utc()),
        SqlType::TimestampTz => SqlValue::TimestampTz(parse_datetime(t).ok_or_else(err)?),
        SqlType::Uuid => SqlValue::Uuid(Uuid::parse_str(t).map_err(|_| err())?),
        SqlType::Json => match serde_json::from_str(t) {
            Ok(v) => SqlValue::Json(v),
            Err(_) => SqlValue::Json(serde_json::Value::String(s.to_string())),
        },
    };
    Ok(value)
}

fn parse_decimal(s: &str) -> Option<SqlValue> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
        .map(SqlValue::Decimal)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
}

/// Parse an instant; naive inputs are taken as UTC.
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(naive) = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
    {
        return Some(naive.and_utc());
    }
    parse_date(s).map(|d| midnight(d).and_utc())
}

fn midnight(d: NaiveDate) -> NaiveDateTime {
    d.and_time(chrono::NaiveTime::MIN)
}
