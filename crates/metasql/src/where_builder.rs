//! Typed WHERE clause builder over a declared entity shape.
//!
//! Fields are named by property (or column) and resolved through the entity's
//! descriptor, so only mapped columns ever reach the SQL text. Values are
//! always bound.
//!
//! ```ignore
//! let clause = WhereBuilder::<Lot>::new()
//!     .eq("lot_no", "L-001")
//!     .gte("qty", 5)
//!     .not_deleted()
//!     .build()?;
//! assert_eq!(clause.sql(), "WHERE lot_no = $1 AND qty >= $2 AND is_deleted = $3");
//! ```

use crate::entity::{Entity, EntityDescriptor};
use crate::error::{OrmError, OrmResult};
use crate::ident::SafeIdent;
use crate::sql::Sql;
use crate::value::SqlValue;
use std::marker::PhantomData;
use std::sync::Arc;

/// Fluent accumulator of AND-joined predicates for entity `T`.
#[must_use]
pub struct WhereBuilder<T: Entity> {
    descriptor: Option<Arc<EntityDescriptor>>,
    clauses: Vec<Sql>,
    /// First error recorded while building; reported by `build()`.
    build_error: Option<OrmError>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Default for WhereBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> WhereBuilder<T> {
    pub fn new() -> Self {
        let (descriptor, build_error) = match T::descriptor() {
            Ok(d) => (Some(d), None),
            Err(e) => (None, Some(e)),
        };
        Self {
            descriptor,
            clauses: Vec::new(),
            build_error,
            _entity: PhantomData,
        }
    }

    /// Check if any conditions have been added.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    fn record_error(&mut self, err: OrmError) {
        if self.build_error.is_none() {
            self.build_error = Some(err);
        }
    }

    fn column(&mut self, field: &str) -> Option<SafeIdent> {
        let descriptor = self.descriptor.as_ref()?;
        match descriptor.column_for(field) {
            Some(mapping) => Some(mapping.column.clone()),
            None => {
                let err = OrmError::invalid_identifier(format!(
                    "{} has no field '{}'",
                    descriptor.type_name(),
                    field
                ));
                self.record_error(err);
                None
            }
        }
    }

    fn compare(mut self, field: &str, op: &'static str, value: SqlValue) -> Self {
        if let Some(col) = self.column(field) {
            let mut clause = Sql::empty();
            clause.push_ident(&col).push(op).push_bind(value);
            self.clauses.push(clause);
        }
        self
    }

    /// `field = value`
    pub fn eq(self, field: &str, value: impl Into<SqlValue>) -> Self {
        self.compare(field, " = ", value.into())
    }

    /// `field <> value`
    pub fn ne(self, field: &str, value: impl Into<SqlValue>) -> Self {
        self.compare(field, " <> ", value.into())
    }

    pub fn gt(self, field: &str, value: impl Into<SqlValue>) -> Self {
        self.compare(field, " > ", value.into())
    }

    pub fn gte(self, field: &str, value: impl Into<SqlValue>) -> Self {
        self.compare(field, " >= ", value.into())
    }

    pub fn lt(self, field: &str, value: impl Into<SqlValue>) -> Self {
        self.compare(field, " < ", value.into())
    }

    pub fn lte(self, field: &str, value: impl Into<SqlValue>) -> Self {
        self.compare(field, " <= ", value.into())
    }

    /// Substring match: binds `%value%`.
    pub fn like(self, field: &str, value: impl AsRef<str>) -> Self {
        let pattern = format!("%{}%", value.as_ref());
        self.compare(field, " LIKE ", SqlValue::Text(pattern))
    }

    /// LIKE with a caller-supplied pattern, bound verbatim.
    pub fn like_pattern(self, field: &str, pattern: impl Into<String>) -> Self {
        self.compare(field, " LIKE ", SqlValue::Text(pattern.into()))
    }

    /// `field IN (...)`. An empty collection matches nothing (`1 = 0`).
    pub fn in_list<V: Into<SqlValue>>(mut self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        if let Some(col) = self.column(field) {
            let values: Vec<SqlValue> = values.into_iter().map(Into::into).collect();
            let mut clause = Sql::empty();
            if values.is_empty() {
                clause.push("1 = 0");
            } else {
                clause
                    .push_ident(&col)
                    .push(" IN (")
                    .push_bind_list(values)
                    .push(")");
            }
            self.clauses.push(clause);
        }
        self
    }

    /// `field NOT IN (...)`. An empty collection adds nothing.
    pub fn not_in<V: Into<SqlValue>>(mut self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        if let Some(col) = self.column(field) {
            let values: Vec<SqlValue> = values.into_iter().map(Into::into).collect();
            if !values.is_empty() {
                let mut clause = Sql::empty();
                clause
                    .push_ident(&col)
                    .push(" NOT IN (")
                    .push_bind_list(values)
                    .push(")");
                self.clauses.push(clause);
            }
        }
        self
    }

    pub fn between(
        mut self,
        field: &str,
        low: impl Into<SqlValue>,
        high: impl Into<SqlValue>,
    ) -> Self {
        if let Some(col) = self.column(field) {
            let mut clause = Sql::empty();
            clause
                .push_ident(&col)
                .push(" BETWEEN ")
                .push_bind(low)
                .push(" AND ")
                .push_bind(high);
            self.clauses.push(clause);
        }
        self
    }

    pub fn is_null(mut self, field: &str) -> Self {
        if let Some(col) = self.column(field) {
            let mut clause = Sql::empty();
            clause.push_ident(&col).push(" IS NULL");
            self.clauses.push(clause);
        }
        self
    }

    pub fn is_not_null(mut self, field: &str) -> Self {
        if let Some(col) = self.column(field) {
            let mut clause = Sql::empty();
            clause.push_ident(&col).push(" IS NOT NULL");
            self.clauses.push(clause);
        }
        self
    }

    /// Exclude soft-deleted rows. Requires the audit convention.
    pub fn not_deleted(mut self) -> Self {
        let Some(descriptor) = self.descriptor.clone() else {
            return self;
        };
        match descriptor.soft_delete_column() {
            Some(col) => {
                let mut clause = Sql::empty();
                clause.push_ident(col).push(" = ").push_bind(false);
                self.clauses.push(clause);
            }
            None => self.record_error(OrmError::validation(format!(
                "{} does not declare a soft-delete column",
                descriptor.type_name()
            ))),
        }
        self
    }

    // ==================== Optional variants ====================

    /// `eq` when `value` is `Some`, otherwise no-op.
    pub fn eq_opt<V: Into<SqlValue>>(self, field: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.eq(field, v),
            None => self,
        }
    }

    pub fn ne_opt<V: Into<SqlValue>>(self, field: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.ne(field, v),
            None => self,
        }
    }

    pub fn gte_opt<V: Into<SqlValue>>(self, field: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.gte(field, v),
            None => self,
        }
    }

    pub fn lte_opt<V: Into<SqlValue>>(self, field: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.lte(field, v),
            None => self,
        }
    }

    pub fn like_opt<S: AsRef<str>>(self, field: &str, value: Option<S>) -> Self {
        match value {
            Some(v) => self.like(field, v),
            None => self,
        }
    }

    /// Finish the predicate.
    ///
    /// Fails with the first recorded error, or [`OrmError::EmptyPredicate`]
    /// when no clause was added.
    pub fn build(self) -> OrmResult<WhereClause<T>> {
        if let Some(err) = self.build_error {
            return Err(err);
        }
        if self.clauses.is_empty() {
            return Err(OrmError::EmptyPredicate);
        }
        let mut sql = Sql::new("WHERE ");
        sql.push_joined(self.clauses, " AND ");
        Ok(WhereClause {
            sql,
            _entity: PhantomData,
        })
    }
}

/// A non-empty `WHERE ...` fragment with its bound parameters.
///
/// Tied to the entity it was built for, so it can only filter that entity.
///
/// ```compile_fail
/// use metasql::{Entity, EntityMapper, WhereBuilder};
///
/// #[derive(Entity)]
/// #[orm(table = "mes.lot")]
/// struct Lot {
///     #[orm(id)]
///     id: i64,
/// }
///
/// #[derive(Entity)]
/// #[orm(table = "mes.work_order")]
/// struct WorkOrder {
///     #[orm(id)]
///     id: i64,
/// }
///
/// let clause = WhereBuilder::<Lot>::new().eq("id", 1).build().unwrap();
/// let _ = EntityMapper::compile_select::<WorkOrder>(clause, false);
/// ```
pub struct WhereClause<T: Entity> {
    sql: Sql,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for WhereClause<T> {
    fn clone(&self) -> Self {
        Self {
            sql: self.sql.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> std::fmt::Debug for WhereClause<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhereClause").field("sql", &self.sql).finish()
    }
}

impl<T: Entity> WhereClause<T> {
    /// Rendered text, numbered from `$1`.
    pub fn sql(&self) -> String {
        self.sql.to_sql()
    }

    pub fn params(&self) -> &[SqlValue] {
        self.sql.params()
    }

    /// The underlying fragment, for appending to a larger statement.
    pub fn into_sql(self) -> Sql {
        self.sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityShape, FieldShape};

    struct Lot;

    impl Entity for Lot {
        fn shape() -> EntityShape {
            EntityShape {
                type_name: "Lot",
                table: "mes.lot",
                fields: vec![
                    FieldShape::new("id", "id").primary_key(),
                    FieldShape::new("lot_no", "LOT_NO"),
                    FieldShape::new("qty", "QTY"),
                ],
                audit: true,
            }
        }

        fn values(&self) -> Vec<SqlValue> {
            Vec::new()
        }
    }

    struct Plain;

    impl Entity for Plain {
        fn shape() -> EntityShape {
            EntityShape {
                type_name: "Plain",
                table: "plain",
                fields: vec![FieldShape::new("id", "id").primary_key()],
                audit: false,
            }
        }

        fn values(&self) -> Vec<SqlValue> {
            Vec::new()
        }
    }

    #[test]
    fn empty_builder_fails() {
        let err = WhereBuilder::<Lot>::new().build().unwrap_err();
        assert!(matches!(err, OrmError::EmptyPredicate));
    }

    #[test]
    fn numbers_placeholders_across_clauses() {
        let clause = WhereBuilder::<Lot>::new()
            .eq("lot_no", "L-1")
            .between("qty", 1, 10)
            .is_not_null("id")
            .build()
            .unwrap();
        assert_eq!(
            clause.sql(),
            "WHERE LOT_NO = $1 AND QTY BETWEEN $2 AND $3 AND id IS NOT NULL"
        );
        assert_eq!(clause.params().len(), 3);
    }

    #[test]
    fn like_wraps_value_and_pattern_does_not() {
        let clause = WhereBuilder::<Lot>::new()
            .like("lot_no", "A1")
            .like_pattern("lot_no", "A_%")
            .build()
            .unwrap();
        assert_eq!(
            clause.params(),
            &[SqlValue::Text("%A1%".into()), SqlValue::Text("A_%".into())]
        );
    }

    #[test]
    fn empty_in_matches_nothing_and_empty_not_in_is_dropped() {
        let clause = WhereBuilder::<Lot>::new()
            .in_list("qty", Vec::<i32>::new())
            .not_in("qty", Vec::<i32>::new())
            .build()
            .unwrap();
        assert_eq!(clause.sql(), "WHERE 1 = 0");
        assert!(clause.params().is_empty());
    }

    #[test]
    fn unknown_field_is_reported_by_build() {
        let err = WhereBuilder::<Lot>::new()
            .eq("qty; drop table x", 1)
            .eq("qty", 1)
            .build()
            .unwrap_err();
        assert!(matches!(err, OrmError::InvalidIdentifier(_)));
    }

    #[test]
    fn opt_variants_skip_none() {
        let clause = WhereBuilder::<Lot>::new()
            .eq_opt("lot_no", None::<&str>)
            .gte_opt("qty", Some(5))
            .like_opt("lot_no", None::<&str>)
            .build()
            .unwrap();
        assert_eq!(clause.sql(), "WHERE QTY >= $1");
    }

    #[test]
    fn not_deleted_uses_audit_flag() {
        let clause = WhereBuilder::<Lot>::new().not_deleted().build().unwrap();
        assert_eq!(clause.sql(), "WHERE is_deleted = $1");
        assert_eq!(clause.params(), &[SqlValue::Bool(false)]);

        let err = WhereBuilder::<Plain>::new().not_deleted().build().unwrap_err();
        assert!(matches!(err, OrmError::Validation(_)));
    }
}
