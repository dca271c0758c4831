//! Condition descriptors compiled against tables known only at runtime.
//!
//! Callers post a list of [`ConditionDescriptor`]s (usually as JSON) plus
//! optional ordering and paging. Each surviving condition becomes one
//! predicate with its value coerced to the column's declared type and bound.
//! Malformed input is dropped rather than rejected:
//!
//! - column names that fail validation, are blank, or are missing from the
//!   supplied [`TableLayout`] are skipped;
//! - `None` operators, missing/null operands, and blank strings for non-text
//!   columns are skipped.
//!
//! A non-blank value that cannot be coerced is an error
//! ([`OrmError::InvalidValue`]), never a silent drop.
//!
//! ```ignore
//! let req: FilterRequest = serde_json::from_value(json!({
//!     "conditions": [{"column": "QTY", "operator": "GreaterOrEqual", "value": "5", "declaredType": "int"}],
//!     "paging": {"page": 2, "pageSize": 10}
//! }))?;
//! let q = compile_select(&SafeIdent::qualified("mes.lot")?, &req, None)?;
//! // SELECT * FROM mes.lot WHERE QTY >= $1 ORDER BY (SELECT NULL) OFFSET $2 ROWS FETCH NEXT $3 ROWS ONLY
//! ```

use crate::error::{OrmError, OrmResult};
use crate::ident::SafeIdent;
use crate::schema::TableLayout;
use crate::sql::{CompiledQuery, Sql};
use crate::value::{SqlType, SqlValue, coerce, is_blank};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison requested by a [`ConditionDescriptor`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Equal,
    NotEqual,
    Like,
    Between,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    In,
    NotIn,
    #[default]
    None,
}

/// One caller-supplied filter condition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConditionDescriptor {
    pub column: String,
    pub operator: Operator,
    pub value: Option<Value>,
    /// Upper bound for `Between`.
    pub value2: Option<Value>,
    /// Elements for `In` / `NotIn`.
    pub values: Option<Vec<Value>>,
    /// Declared SQL type name, used when no layout is supplied.
    pub declared_type: Option<String>,
}

impl ConditionDescriptor {
    pub fn new(column: impl Into<String>, operator: Operator) -> Self {
        Self {
            column: column.into(),
            operator,
            ..Self::default()
        }
    }

    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn value2(mut self, value: impl Into<Value>) -> Self {
        self.value2 = Some(value.into());
        self
    }

    pub fn values<V: Into<Value>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn declared_type(mut self, declared: impl Into<String>) -> Self {
        self.declared_type = Some(declared.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(alias = "asc", alias = "ASC")]
    Asc,
    #[serde(alias = "desc", alias = "DESC")]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDescriptor {
    pub column: String,
    #[serde(default)]
    pub direction: Direction,
}

impl OrderDescriptor {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Desc,
        }
    }
}

/// Page request. Paging applies only when both fields are present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PagingRequest {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PagingRequest {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }

    /// `(offset, fetch)` with both values clamped to at least 1 page/row.
    pub fn window(&self) -> Option<(i64, i64)> {
        let (page, size) = (self.page?, self.page_size?);
        let page = page.max(1);
        let size = size.max(1);
        Some(((page - 1).saturating_mul(size), size))
    }
}

/// Everything a listing request can carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterRequest {
    pub conditions: Vec<ConditionDescriptor>,
    pub order: Vec<OrderDescriptor>,
    pub paging: Option<PagingRequest>,
}

impl FilterRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn condition(mut self, condition: ConditionDescriptor) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn order_by(mut self, order: OrderDescriptor) -> Self {
        self.order.push(order);
        self
    }

    pub fn page(mut self, page: i64, page_size: i64) -> Self {
        self.paging = Some(PagingRequest::new(page, page_size));
        self
    }
}

/// Which column names a request may reference.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ColumnScope<'a> {
    /// Any name that passes identifier validation.
    Any,
    /// Only columns of this layout; its declared types win.
    Layout(&'a TableLayout),
}

struct ResolvedColumn {
    ident: SafeIdent,
    declared: Option<SqlType>,
}

impl ColumnScope<'_> {
    fn resolve(&self, name: &str) -> Option<ResolvedColumn> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        match self {
            Self::Any => SafeIdent::column(name).ok().map(|ident| ResolvedColumn {
                ident,
                declared: None,
            }),
            Self::Layout(layout) => {
                let info = layout.find(name)?;
                SafeIdent::column(&info.name).ok().map(|ident| ResolvedColumn {
                    ident,
                    declared: Some(info.sql_type()),
                })
            }
        }
    }
}

/// Operand of a condition after the skip rules.
fn operand(raw: Option<&Value>, column: &SafeIdent, ty: SqlType) -> OrmResult<Option<SqlValue>> {
    let Some(raw) = raw else { return Ok(None) };
    if raw.is_null() || (is_blank(raw) && !ty.accepts_blank()) {
        return Ok(None);
    }
    coerce(raw, ty)
        .map(Some)
        .map_err(|e| OrmError::invalid_value(column.as_str(), e.to_string()))
}

fn like_text(raw: Option<&Value>) -> Option<String> {
    match raw? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn compile_condition(
    cond: &ConditionDescriptor,
    col: &SafeIdent,
    ty: SqlType,
) -> OrmResult<Option<Sql>> {
    let mut sql = Sql::empty();
    let comparison = match cond.operator {
        Operator::None => return Ok(None),
        Operator::Equal => " = ",
        Operator::NotEqual => " <> ",
        Operator::GreaterThan => " > ",
        Operator::GreaterOrEqual => " >= ",
        Operator::LessThan => " < ",
        Operator::LessOrEqual => " <= ",
        Operator::Like => {
            let Some(text) = like_text(cond.value.as_ref()) else {
                return Ok(None);
            };
            if ty == SqlType::Text {
                sql.push_ident(col);
            } else {
                sql.push("CAST(").push_ident(col).push(" AS TEXT)");
            }
            sql.push(" LIKE ").push_bind(format!("%{text}%"));
            return Ok(Some(sql));
        }
        Operator::Between => {
            let low = operand(cond.value.as_ref(), col, ty)?;
            let high = operand(cond.value2.as_ref(), col, ty)?;
            let (Some(low), Some(high)) = (low, high) else {
                return Ok(None);
            };
            sql.push_ident(col)
                .push(" BETWEEN ")
                .push_bind(low)
                .push(" AND ")
                .push_bind(high);
            return Ok(Some(sql));
        }
        Operator::In | Operator::NotIn => {
            let elements = match (&cond.values, &cond.value) {
                (Some(values), _) => values.as_slice(),
                (None, Some(Value::Array(values))) => values.as_slice(),
                _ => return Ok(None),
            };
            let mut bound = Vec::with_capacity(elements.len());
            for element in elements {
                if let Some(v) = operand(Some(element), col, ty)? {
                    bound.push(v);
                }
            }
            if bound.is_empty() {
                if cond.operator == Operator::In {
                    sql.push("1 = 0");
                    return Ok(Some(sql));
                }
                return Ok(None);
            }
            sql.push_ident(col).push(if cond.operator == Operator::In {
                " IN ("
            } else {
                " NOT IN ("
            });
            sql.push_bind_list(bound).push(")");
            return Ok(Some(sql));
        }
    };

    let Some(value) = operand(cond.value.as_ref(), col, ty)? else {
        return Ok(None);
    };
    sql.push_ident(col).push(comparison).push_bind(value);
    Ok(Some(sql))
}

/// Append ` WHERE ...` for the surviving conditions (nothing if none survive).
pub(crate) fn push_conditions(
    sql: &mut Sql,
    conditions: &[ConditionDescriptor],
    scope: ColumnScope<'_>,
) -> OrmResult<()> {
    let mut clauses = Vec::with_capacity(conditions.len());
    for cond in conditions {
        if cond.operator == Operator::None {
            continue;
        }
        let Some(resolved) = scope.resolve(&cond.column) else {
            tracing::debug!(column = %cond.column, "metasql filter: dropping unknown column");
            continue;
        };
        let ty = resolved
            .declared
            .or_else(|| cond.declared_type.as_deref().map(SqlType::from_declared))
            .unwrap_or(SqlType::Text);
        if let Some(clause) = compile_condition(cond, &resolved.ident, ty)? {
            clauses.push(clause);
        }
    }

    if !clauses.is_empty() {
        sql.push(" WHERE ").push_joined(clauses, " AND ");
    }
    Ok(())
}

/// Append ORDER BY and paging.
///
/// Ordering is emitted when requested, and always when paging is requested
/// (falling back to `ORDER BY (SELECT NULL)` if no order column survives).
pub(crate) fn push_order_and_paging(
    sql: &mut Sql,
    order: &[OrderDescriptor],
    paging: Option<&PagingRequest>,
    scope: ColumnScope<'_>,
) {
    let mut terms = Vec::with_capacity(order.len());
    for o in order {
        let Some(resolved) = scope.resolve(&o.column) else {
            tracing::debug!(column = %o.column, "metasql order: dropping unknown column");
            continue;
        };
        let mut term = Sql::empty();
        term.push_ident(&resolved.ident).push(match o.direction {
            Direction::Asc => " ASC",
            Direction::Desc => " DESC",
        });
        terms.push(term);
    }

    let window = paging.and_then(PagingRequest::window);
    if !terms.is_empty() {
        sql.push(" ORDER BY ").push_joined(terms, ", ");
    } else if window.is_some() {
        sql.push(" ORDER BY (SELECT NULL)");
    }

    if let Some((offset, fetch)) = window {
        sql.push_offset_fetch(offset, fetch);
    }
}

fn scope_of(layout: Option<&TableLayout>) -> ColumnScope<'_> {
    layout.map_or(ColumnScope::Any, ColumnScope::Layout)
}

/// `SELECT * FROM <table> [WHERE ...] [ORDER BY ...] [OFFSET ... FETCH ...]`.
///
/// With a `layout`, only its columns can be filtered or ordered on and their
/// declared types take precedence over the descriptors'.
pub fn compile_select(
    table: &SafeIdent,
    request: &FilterRequest,
    layout: Option<&TableLayout>,
) -> OrmResult<CompiledQuery> {
    let scope = scope_of(layout);
    let mut sql = Sql::new("SELECT * FROM ");
    sql.push_ident(table);
    push_conditions(&mut sql, &request.conditions, scope)?;
    push_order_and_paging(&mut sql, &request.order, request.paging.as_ref(), scope);
    let compiled = sql.build();
    tracing::debug!(sql = %compiled.sql(), params = compiled.params().len(), "metasql compiled select");
    Ok(compiled)
}

/// `SELECT COUNT(*) FROM <table> [WHERE ...]`, the total for a paged listing.
pub fn compile_count(
    table: &SafeIdent,
    conditions: &[ConditionDescriptor],
    layout: Option<&TableLayout>,
) -> OrmResult<CompiledQuery> {
    let mut sql = Sql::new("SELECT COUNT(*) FROM ");
    sql.push_ident(table);
    push_conditions(&mut sql, conditions, scope_of(layout))?;
    Ok(sql.build())
}
