//! Queries over table-valued functions.
//!
//! Inputs are bound positionally from a caller map, in the order the
//! function declares them. Filtering and ordering go through the same rules
//! as [`filter`](crate::filter) but only ever target the function's output
//! columns, so an input parameter name can never become a filter target.
//!
//! ```ignore
//! let sig = discover_function(&conn, &SafeIdent::qualified("mes.lot_report")?, &cancel).await?;
//! let rows = TableFunctionQuery::new(&sig)
//!     .args(ParameterBag::new().with("@p_line", "L1"))
//!     .filter(request)
//!     .fetch(&conn, &cancel)
//!     .await?;
//! ```

use crate::cancel::CancelSignal;
use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::filter::{ColumnScope, FilterRequest, push_conditions, push_order_and_paging};
use crate::params::ParameterBag;
use crate::row::DynamicRow;
use crate::schema::{ColumnInfo, FunctionSignature, TableLayout};
use crate::sql::{CompiledQuery, Sql};
use crate::value::{SqlValue, coerce, is_blank};

/// `SELECT * FROM fn($1, ...) [WHERE ...] [ORDER BY ...] [OFFSET ... FETCH ...]`.
#[derive(Debug, Clone)]
pub struct TableFunctionQuery<'a> {
    signature: &'a FunctionSignature,
    args: ParameterBag,
    request: FilterRequest,
    order_allow: Option<Vec<String>>,
}

impl<'a> TableFunctionQuery<'a> {
    pub fn new(signature: &'a FunctionSignature) -> Self {
        Self {
            signature,
            args: ParameterBag::new(),
            request: FilterRequest::default(),
            order_allow: None,
        }
    }

    /// Input values by parameter name (case-insensitive, `@` optional).
    pub fn args(mut self, args: ParameterBag) -> Self {
        self.args = args;
        self
    }

    pub fn filter(mut self, request: FilterRequest) -> Self {
        self.request = request;
        self
    }

    /// Output columns that may be ordered on. Defaults to all of them.
    pub fn allow_order_by<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.order_allow = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    fn input_value(&self, input: &ColumnInfo) -> OrmResult<SqlValue> {
        let ty = input.sql_type();
        match self.args.get(&input.name) {
            None => Ok(SqlValue::Null),
            Some(raw) if raw.is_null() || (is_blank(raw) && !ty.accepts_blank()) => Ok(SqlValue::Null),
            Some(raw) => coerce(raw, ty).map_err(|e| OrmError::invalid_value(&input.name, e.to_string())),
        }
    }

    fn source(&self, projection: &'static str) -> OrmResult<Sql> {
        let mut sql = Sql::new(projection);
        sql.push_ident(&self.signature.name).push("(");
        for (i, input) in self.signature.inputs.iter().enumerate() {
            if i > 0 {
                sql.push(", ");
            }
            sql.push_bind(self.input_value(input)?);
        }
        sql.push(")");
        push_conditions(
            &mut sql,
            &self.request.conditions,
            ColumnScope::Layout(&self.signature.outputs),
        )?;
        Ok(sql)
    }

    pub fn compile(&self) -> OrmResult<CompiledQuery> {
        let mut sql = self.source("SELECT * FROM ")?;
        let allowed: TableLayout = match &self.order_allow {
            Some(columns) => self.signature.outputs.restrict_to(columns.as_slice()),
            None => self.signature.outputs.clone(),
        };
        push_order_and_paging(
            &mut sql,
            &self.request.order,
            self.request.paging.as_ref(),
            ColumnScope::Layout(&allowed),
        );
        Ok(sql.build())
    }

    /// Total row count for the same inputs and filter.
    pub fn compile_count(&self) -> OrmResult<CompiledQuery> {
        Ok(self.source("SELECT COUNT(*) FROM ")?.build())
    }

    pub async fn fetch(&self, conn: &impl GenericClient, cancel: &CancelSignal) -> OrmResult<Vec<DynamicRow>> {
        cancel.check()?;
        self.compile()?.fetch_all_as(conn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{ConditionDescriptor, Operator, OrderDescriptor};
    use crate::ident::SafeIdent;
    use chrono::NaiveDate;

    fn signature() -> FunctionSignature {
        FunctionSignature {
            name: SafeIdent::qualified("mes.lot_report").unwrap(),
            inputs: vec![
                ColumnInfo::new("p_line", "varchar"),
                ColumnInfo::new("p_from", "date"),
                ColumnInfo::new("p_limit", "integer"),
            ],
            outputs: TableLayout::new(vec![
                ColumnInfo::new("lot_no", "varchar"),
                ColumnInfo::new("qty", "integer"),
                ColumnInfo::new("created_at", "timestamp"),
            ]),
        }
    }

    #[test]
    fn binds_inputs_in_declared_order_with_missing_as_null() {
        let sig = signature();
        let q = TableFunctionQuery::new(&sig)
            .args(ParameterBag::new().with("@P_FROM", "2024-03-01").with("p_line", "L1"))
            .compile()
            .unwrap();
        assert_eq!(q.sql(), "SELECT * FROM mes.lot_report($1, $2, $3)");
        assert_eq!(
            q.params(),
            &[
                SqlValue::Text("L1".into()),
                SqlValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
                SqlValue::Null
            ]
        );
    }

    #[test]
    fn uncoercible_input_is_an_error() {
        let sig = signature();
        let err = TableFunctionQuery::new(&sig)
            .args(ParameterBag::new().with("p_limit", "ten"))
            .compile()
            .unwrap_err();
        assert!(matches!(err, OrmError::InvalidValue { column, .. } if column == "p_limit"));
    }

    #[test]
    fn filters_only_output_columns() {
        let sig = signature();
        let request = FilterRequest::new()
            .condition(ConditionDescriptor::new("p_line", Operator::Equal).value("L2"))
            .condition(ConditionDescriptor::new("QTY", Operator::GreaterOrEqual).value("5"));
        let q = TableFunctionQuery::new(&sig).filter(request).compile().unwrap();
        assert_eq!(q.sql(), "SELECT * FROM mes.lot_report($1, $2, $3) WHERE qty >= $4");
        assert_eq!(q.params()[3], SqlValue::Int(5));
    }

    #[test]
    fn order_respects_allow_set_and_paging() {
        let sig = signature();
        let request = FilterRequest::new()
            .order_by(OrderDescriptor::desc("created_at"))
            .order_by(OrderDescriptor::asc("lot_no"))
            .page(3, 20);
        let q = TableFunctionQuery::new(&sig)
            .filter(request)
            .allow_order_by(["lot_no"])
            .compile()
            .unwrap();
        assert_eq!(
            q.sql(),
            "SELECT * FROM mes.lot_report($1, $2, $3) ORDER BY lot_no ASC OFFSET $4 ROWS FETCH NEXT $5 ROWS ONLY"
        );
        assert_eq!(q.params()[3], SqlValue::Int(40));
        assert_eq!(q.params()[4], SqlValue::Int(20));
    }

    #[test]
    fn paging_without_allowed_order_falls_back() {
        let sig = signature();
        let request = FilterRequest::new()
            .order_by(OrderDescriptor::asc("p_line"))
            .page(1, 10);
        let q = TableFunctionQuery::new(&sig).filter(request).compile().unwrap();
        assert!(q.sql().ends_with("ORDER BY (SELECT NULL) OFFSET $4 ROWS FETCH NEXT $5 ROWS ONLY"));
    }

    #[test]
    fn count_shares_inputs_and_filter() {
        let sig = signature();
        let request = FilterRequest::new()
            .condition(ConditionDescriptor::new("lot_no", Operator::Like).value("A"))
            .page(2, 10);
        let q = TableFunctionQuery::new(&sig).filter(request).compile_count().unwrap();
        assert_eq!(
            q.sql(),
            "SELECT COUNT(*) FROM mes.lot_report($1, $2, $3) WHERE lot_no LIKE $4"
        );
    }
}
