//! Runtime discovery of table layouts and function signatures.

use crate::cancel::CancelSignal;
use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::ident::SafeIdent;
use crate::row::RowExt;
use crate::value::{SqlType, SqlValue};
use serde::{Deserialize, Serialize};
use tokio_postgres::types::ToSql;

/// A column name with its declared SQL type name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
        }
    }

    pub fn sql_type(&self) -> SqlType {
        SqlType::from_declared(&self.declared_type)
    }
}

/// The known columns of a table (or of a function's result set).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableLayout {
    columns: Vec<ColumnInfo>,
}

impl TableLayout {
    pub fn new(columns: Vec<ColumnInfo>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column matched case-insensitively.
    pub fn find(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Keep only the named columns (case-insensitive), in layout order.
    pub fn restrict_to<S: AsRef<str>>(&self, names: &[S]) -> Self {
        let columns = self
            .columns
            .iter()
            .filter(|c| names.iter().any(|n| c.name.eq_ignore_ascii_case(n.as_ref())))
            .cloned()
            .collect();
        Self { columns }
    }
}

impl FromIterator<ColumnInfo> for TableLayout {
    fn from_iter<I: IntoIterator<Item = ColumnInfo>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Inputs and result columns of a table-valued function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: SafeIdent,
    /// Input parameters in declaration order.
    pub inputs: Vec<ColumnInfo>,
    /// Result columns; the only legal filter and order targets.
    pub outputs: TableLayout,
}

const TABLE_COLUMNS_SQL: &str = "SELECT column_name::text AS column_name, data_type::text AS data_type \
     FROM information_schema.columns \
     WHERE table_schema = COALESCE($1, current_schema()) AND table_name = $2 \
     ORDER BY ordinal_position";

const FUNCTION_PARAMETERS_SQL: &str = "SELECT r.specific_name::text AS specific_name, \
            p.parameter_name::text AS parameter_name, \
            p.data_type::text AS data_type, \
            p.parameter_mode::text AS parameter_mode \
     FROM information_schema.routines r \
     LEFT JOIN information_schema.parameters p \
       ON p.specific_schema = r.specific_schema AND p.specific_name = r.specific_name \
     WHERE r.routine_schema = COALESCE($1, current_schema()) AND r.routine_name = $2 \
     ORDER BY r.specific_name, p.ordinal_position";

/// Unquoted identifiers fold to lower case, and so does the catalog.
fn catalog_key(ident: &SafeIdent) -> (SqlValue, SqlValue) {
    let (schema, name) = ident.split_schema();
    (
        schema.map(str::to_ascii_lowercase).into(),
        SqlValue::Text(name.to_ascii_lowercase()),
    )
}

/// Read a table's columns from `information_schema.columns`.
pub async fn discover_table(
    conn: &impl GenericClient,
    table: &SafeIdent,
    cancel: &CancelSignal,
) -> OrmResult<TableLayout> {
    cancel.check()?;
    let (schema, name) = catalog_key(table);
    let params: [&(dyn ToSql + Sync); 2] = [&schema, &name];
    tracing::debug!(table = %table, "metasql discover table");
    let rows = conn.query(TABLE_COLUMNS_SQL, &params).await?;
    if rows.is_empty() {
        return Err(OrmError::not_found(format!("table '{table}'")));
    }

    rows.iter()
        .map(|row| {
            Ok::<_, OrmError>(ColumnInfo::new(
                row.try_get_column::<String>("column_name")?,
                row.try_get_column::<String>("data_type")?,
            ))
        })
        .collect()
}

/// Read a function's parameters from `information_schema.parameters`.
///
/// `IN` and `INOUT` parameters are inputs; `OUT`, `INOUT` and `RETURNS TABLE`
/// columns are outputs. For overloaded names the first overload (by specific
/// name) is used.
pub async fn discover_function(
    conn: &impl GenericClient,
    function: &SafeIdent,
    cancel: &CancelSignal,
) -> OrmResult<FunctionSignature> {
    cancel.check()?;
    let (schema, name) = catalog_key(function);
    let params: [&(dyn ToSql + Sync); 2] = [&schema, &name];
    tracing::debug!(function = %function, "metasql discover function");
    let rows = conn.query(FUNCTION_PARAMETERS_SQL, &params).await?;
    let Some(first) = rows.first() else {
        return Err(OrmError::not_found(format!("function '{function}'")));
    };
    let specific: String = first.try_get_column("specific_name")?;

    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    for row in &rows {
        if row.try_get_column::<String>("specific_name")? != specific {
            break;
        }
        let Some(mode) = row.try_get_column::<Option<String>>("parameter_mode")? else {
            continue;
        };
        let declared: String = row.try_get_column("data_type")?;
        let position = inputs.len() + 1;
        let param_name = row
            .try_get_column::<Option<String>>("parameter_name")?
            .unwrap_or_else(|| format!("${position}"));
        let info = ColumnInfo::new(param_name, declared);

        match mode.to_ascii_uppercase().as_str() {
            "IN" => inputs.push(info),
            "INOUT" => {
                inputs.push(info.clone());
                outputs.push(info);
            }
            "OUT" | "TABLE" => outputs.push(info),
            _ => {}
        }
    }

    Ok(FunctionSignature {
        name: function.clone(),
        inputs,
        outputs: TableLayout::new(outputs),
    })
}
