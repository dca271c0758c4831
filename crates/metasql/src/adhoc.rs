//! CRUD over tables with no declared entity shape.
//!
//! Column names come from [`FieldBag`] keys and are validated one by one; any
//! invalid key rejects the whole operation. Values are always bound.
//!
//! ```ignore
//! let lots = AdHocTable::new("mes.lot")?;
//! let keys = FieldBag::new().with("LOT_NO", "L-001");
//! let sets = FieldBag::new().with("QTY", 12).with("REMARK", "split");
//! lots.update(&conn, &sets, &keys, &cancel).await?;
//! ```

use crate::cancel::CancelSignal;
use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::ident::SafeIdent;
use crate::sql::{CompiledQuery, Sql};
use crate::value::SqlValue;

/// Insertion-ordered column → value map. Setting a column again (in any
/// letter case) replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldBag {
    fields: Vec<(String, SqlValue)>,
}

impl FieldBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> &mut Self {
        let column = column.into();
        let value = value.into();
        match self
            .fields
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(&column))
        {
            Some(slot) => slot.1 = value,
            None => self.fields.push((column, value)),
        }
        self
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.set(column, value);
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn validated(&self) -> OrmResult<Vec<(SafeIdent, SqlValue)>> {
        self.fields
            .iter()
            .map(|(name, value)| Ok::<_, OrmError>((SafeIdent::column(name)?, value.clone())))
            .collect()
    }
}

impl<K: Into<String>, V: Into<SqlValue>> FromIterator<(K, V)> for FieldBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = Self::new();
        for (k, v) in iter {
            bag.set(k, v);
        }
        bag
    }
}

/// `WHERE a = $n AND b IS NULL ...` from key columns.
fn push_key_predicate(sql: &mut Sql, keys: Vec<(SafeIdent, SqlValue)>) {
    let clauses = keys
        .into_iter()
        .map(|(col, value)| {
            let mut clause = Sql::empty();
            clause.push_ident(&col);
            if value.is_null() {
                clause.push(" IS NULL");
            } else {
                clause.push(" = ").push_bind(value);
            }
            clause
        })
        .collect();
    sql.push(" WHERE ").push_joined(clauses, " AND ");
}

/// A validated table name plus the ad-hoc operations on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdHocTable {
    table: SafeIdent,
}

impl AdHocTable {
    pub fn new(table: &str) -> OrmResult<Self> {
        Ok(Self {
            table: SafeIdent::qualified(table)?,
        })
    }

    pub fn from_ident(table: SafeIdent) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &SafeIdent {
        &self.table
    }

    fn insert_sql(&self, values: &FieldBag) -> OrmResult<Sql> {
        let fields = values.validated()?;
        let mut sql = Sql::new("INSERT INTO ");
        sql.push_ident(&self.table);
        if fields.is_empty() {
            sql.push(" DEFAULT VALUES");
            return Ok(sql);
        }
        let (columns, binds): (Vec<SafeIdent>, Vec<SqlValue>) = fields.into_iter().unzip();
        sql.push(" (")
            .push_ident_list(&columns)
            .push(") VALUES (")
            .push_bind_list(binds)
            .push(")");
        Ok(sql)
    }

    pub fn compile_insert(&self, values: &FieldBag) -> OrmResult<CompiledQuery> {
        Ok(self.insert_sql(values)?.build())
    }

    /// INSERT with `RETURNING <key_column>`.
    pub fn compile_insert_returning(&self, values: &FieldBag, key_column: &str) -> OrmResult<CompiledQuery> {
        let key = SafeIdent::column(key_column)?;
        let mut sql = self.insert_sql(values)?;
        sql.push(" RETURNING ").push_ident(&key);
        Ok(sql.build())
    }

    /// `UPDATE <table> SET ... WHERE <keys>`.
    pub fn compile_update(&self, sets: &FieldBag, keys: &FieldBag) -> OrmResult<CompiledQuery> {
        if keys.is_empty() {
            return Err(OrmError::EmptyPredicate);
        }
        if sets.is_empty() {
            return Err(OrmError::NoFieldsToUpdate);
        }
        let assignments = sets
            .validated()?
            .into_iter()
            .map(|(col, value)| {
                let mut s = Sql::empty();
                s.push_ident(&col).push(" = ").push_bind(value);
                s
            })
            .collect();
        let keys = keys.validated()?;

        let mut sql = Sql::new("UPDATE ");
        sql.push_ident(&self.table)
            .push(" SET ")
            .push_joined(assignments, ", ");
        push_key_predicate(&mut sql, keys);
        Ok(sql.build())
    }

    /// `DELETE FROM <table> WHERE <keys>`.
    pub fn compile_delete(&self, keys: &FieldBag) -> OrmResult<CompiledQuery> {
        if keys.is_empty() {
            return Err(OrmError::EmptyPredicate);
        }
        let keys = keys.validated()?;
        let mut sql = Sql::new("DELETE FROM ");
        sql.push_ident(&self.table);
        push_key_predicate(&mut sql, keys);
        Ok(sql.build())
    }

    /// `SELECT 1 FROM <table> [WHERE <keys>] LIMIT 1`.
    pub fn compile_exists(&self, keys: &FieldBag) -> OrmResult<CompiledQuery> {
        let keys = keys.validated()?;
        let mut sql = Sql::new("SELECT 1 FROM ");
        sql.push_ident(&self.table);
        if !keys.is_empty() {
            push_key_predicate(&mut sql, keys);
        }
        sql.push(" LIMIT 1");
        Ok(sql.build())
    }

    pub async fn insert(
        &self,
        conn: &impl GenericClient,
        values: &FieldBag,
        cancel: &CancelSignal,
    ) -> OrmResult<u64> {
        cancel.check()?;
        self.compile_insert(values)?.execute(conn).await
    }

    /// Insert and return the value of `key_column` for the new row.
    pub async fn insert_returning(
        &self,
        conn: &impl GenericClient,
        values: &FieldBag,
        key_column: &str,
        cancel: &CancelSignal,
    ) -> OrmResult<SqlValue> {
        cancel.check()?;
        let row = self
            .compile_insert_returning(values, key_column)?
            .fetch_one(conn)
            .await?;
        row.try_get::<_, SqlValue>(0)
            .map_err(|e| OrmError::decode(key_column, e.to_string()))
    }

    pub async fn update(
        &self,
        conn: &impl GenericClient,
        sets: &FieldBag,
        keys: &FieldBag,
        cancel: &CancelSignal,
    ) -> OrmResult<u64> {
        cancel.check()?;
        self.compile_update(sets, keys)?.execute(conn).await
    }

    pub async fn delete(
        &self,
        conn: &impl GenericClient,
        keys: &FieldBag,
        cancel: &CancelSignal,
    ) -> OrmResult<u64> {
        cancel.check()?;
        self.compile_delete(keys)?.execute(conn).await
    }

    /// Whether any row matches `keys`.
    pub async fn exists(
        &self,
        conn: &impl GenericClient,
        keys: &FieldBag,
        cancel: &CancelSignal,
    ) -> OrmResult<bool> {
        cancel.check()?;
        Ok(self.compile_exists(keys)?.fetch_opt(conn).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lot() -> AdHocTable {
        AdHocTable::new("mes.lot").unwrap()
    }

    #[test]
    fn bag_keeps_insertion_order_and_last_write() {
        let bag = FieldBag::new()
            .with("QTY", 1)
            .with("LOT_NO", "L-1")
            .with("qty", 2);
        let items: Vec<_> = bag.iter().collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], ("QTY", &SqlValue::Int(2)));
        assert_eq!(items[1].0, "LOT_NO");
    }

    #[test]
    fn insert_binds_every_value() {
        let q = lot()
            .compile_insert(&FieldBag::new().with("LOT_NO", "L-1").with("QTY", 3))
            .unwrap();
        assert_eq!(q.sql(), "INSERT INTO mes.lot (LOT_NO, QTY) VALUES ($1, $2)");
        assert_eq!(q.params().len(), 2);
    }

    #[test]
    fn insert_returning_key() {
        let q = lot()
            .compile_insert_returning(&FieldBag::new().with("LOT_NO", "L-1"), "id")
            .unwrap();
        assert_eq!(q.sql(), "INSERT INTO mes.lot (LOT_NO) VALUES ($1) RETURNING id");
    }

    #[test]
    fn invalid_key_rejects_operation() {
        let bad = FieldBag::new().with("LOT_NO", "x").with("QTY = 0 --", 1);
        assert!(matches!(
            lot().compile_insert(&bad),
            Err(OrmError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            lot().compile_delete(&bad),
            Err(OrmError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn update_and_delete_need_keys() {
        let sets = FieldBag::new().with("QTY", 1);
        assert!(matches!(
            lot().compile_update(&sets, &FieldBag::new()),
            Err(OrmError::EmptyPredicate)
        ));
        assert!(matches!(
            lot().compile_delete(&FieldBag::new()),
            Err(OrmError::EmptyPredicate)
        ));
        assert!(matches!(
            lot().compile_update(&FieldBag::new(), &FieldBag::new().with("id", 1)),
            Err(OrmError::NoFieldsToUpdate)
        ));
    }

    #[test]
    fn update_numbers_set_before_where() {
        let q = lot()
            .compile_update(
                &FieldBag::new().with("QTY", 5).with("REMARK", None::<String>),
                &FieldBag::new().with("LOT_NO", "L-1").with("PARENT", None::<String>),
            )
            .unwrap();
        assert_eq!(
            q.sql(),
            "UPDATE mes.lot SET QTY = $1, REMARK = $2 WHERE LOT_NO = $3 AND PARENT IS NULL"
        );
        assert_eq!(q.params().len(), 3);
    }

    #[test]
    fn exists_limits_to_one_row() {
        let q = lot()
            .compile_exists(&FieldBag::new().with("LOT_NO", "L-1"))
            .unwrap();
        assert_eq!(q.sql(), "SELECT 1 FROM mes.lot WHERE LOT_NO = $1 LIMIT 1");
        let all = lot().compile_exists(&FieldBag::new()).unwrap();
        assert_eq!(all.sql(), "SELECT 1 FROM mes.lot LIMIT 1");
    }

    #[test]
    fn table_name_is_validated() {
        assert!(AdHocTable::new("mes.lot; drop").is_err());
    }
}
