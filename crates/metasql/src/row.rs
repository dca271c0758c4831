//! Row mapping traits and utilities

use crate::error::{OrmError, OrmResult};
use crate::value::SqlValue;
use tokio_postgres::Row;

/// Trait for converting a database row into a Rust struct.
///
/// This trait should typically be derived using `#[derive(FromRow)]`, which
/// reads each field by its property name (the entity mapper aliases every
/// projected column to its property).
///
/// # Example
///
/// ```ignore
/// use metasql::FromRow;
///
/// #[derive(FromRow)]
/// struct Lot {
///     lot_no: String,
///     qty: i32,
///     remark: Option<String>,
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> OrmResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning OrmError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>;

    /// Index of a column matched case-insensitively.
    fn find_column_ignore_case(&self, column: &str) -> Option<usize>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| OrmError::decode(column, e.to_string()))
    }

    fn find_column_ignore_case(&self, column: &str) -> Option<usize> {
        self.columns()
            .iter()
            .position(|c| c.name().eq_ignore_ascii_case(column))
    }
}

/// A row of unknown shape, decoded column by column into [`SqlValue`]s.
///
/// Used for ad-hoc tables and table-valued functions whose output columns are
/// only known at runtime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicRow {
    columns: Vec<(String, SqlValue)>,
}

impl DynamicRow {
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    /// Value of a column, matched case-insensitively.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, v)| v)
    }

    pub fn columns(&self) -> &[(String, SqlValue)] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Render as a JSON object keyed by column name.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .columns
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

impl FromRow for DynamicRow {
    fn from_row(row: &Row) -> OrmResult<Self> {
        let columns = row
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                row.try_get::<_, SqlValue>(idx)
                    .map(|v| (col.name().to_string(), v))
                    .map_err(|e| OrmError::decode(col.name(), e.to_string()))
            })
            .collect::<OrmResult<Vec<_>>>()?;
        Ok(Self { columns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_row_lookup_ignores_case() {
        let row = DynamicRow::new(vec![
            ("LOT_NO".into(), SqlValue::Text("L-1".into())),
            ("qty".into(), SqlValue::Int(4)),
        ]);
        assert_eq!(row.get("lot_no"), Some(&SqlValue::Text("L-1".into())));
        assert_eq!(row.get("QTY"), Some(&SqlValue::Int(4)));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn dynamic_row_to_json() {
        let row = DynamicRow::new(vec![
            ("lot_no".into(), SqlValue::Text("L-1".into())),
            ("qty".into(), SqlValue::Int(4)),
            ("remark".into(), SqlValue::Null),
        ]);
        assert_eq!(
            row.to_json(),
            serde_json::json!({"lot_no": "L-1", "qty": 4, "remark": null})
        );
    }
}
