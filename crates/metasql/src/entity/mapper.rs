use super::audit::{AnonymousPrincipal, AuditStamp, PrincipalProvider, server_now};
use super::update::UpdateById;
use super::{Entity, EntityDescriptor};
use crate::cancel::CancelSignal;
use crate::client::GenericClient;
use crate::config::EngineConfig;
use crate::error::{OrmError, OrmResult};
use crate::ident::SafeIdent;
use crate::row::FromRow;
use crate::sql::{CompiledQuery, Sql};
use crate::value::SqlValue;
use crate::where_builder::WhereClause;
use std::sync::Arc;

/// Generates and runs statements for [`Entity`] types.
///
/// Holds the principal used for audit stamping; the connection is passed to
/// each call so the caller decides whether it runs inside a transaction.
#[derive(Clone)]
pub struct EntityMapper {
    principal: Arc<dyn PrincipalProvider>,
    anonymous_user: String,
}

impl Default for EntityMapper {
    fn default() -> Self {
        Self::new(AnonymousPrincipal)
    }
}

impl std::fmt::Debug for EntityMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityMapper")
            .field("anonymous_user", &self.anonymous_user)
            .finish_non_exhaustive()
    }
}

impl EntityMapper {
    pub fn new(principal: impl PrincipalProvider + 'static) -> Self {
        Self::with_config(&EngineConfig::default(), principal)
    }

    pub fn with_config(config: &EngineConfig, principal: impl PrincipalProvider + 'static) -> Self {
        Self {
            principal: Arc::new(principal),
            anonymous_user: config.anonymous_user.clone(),
        }
    }

    /// Current principal id, falling back to the configured anonymous id.
    pub fn user_id(&self) -> String {
        self.principal
            .current_user_id()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| self.anonymous_user.clone())
    }

    /// Principal plus a server clock read.
    pub async fn audit_stamp(&self, conn: &impl GenericClient) -> OrmResult<AuditStamp> {
        Ok(AuditStamp {
            user_id: self.user_id(),
            at: server_now(conn).await?,
        })
    }

    async fn stamp_for(
        &self,
        conn: &impl GenericClient,
        descriptor: &EntityDescriptor,
    ) -> OrmResult<Option<AuditStamp>> {
        if descriptor.audit().is_some() {
            Ok(Some(self.audit_stamp(conn).await?))
        } else {
            Ok(None)
        }
    }

    // ==================== Insert ====================

    /// Compile an INSERT for `entity`.
    ///
    /// The concurrency column and generated columns are left to the database.
    /// With a stamp and the audit convention, creator/editor id and time plus
    /// `is_deleted = false` are appended, replacing any mapped audit column.
    pub fn compile_insert<T: Entity>(entity: &T, stamp: Option<&AuditStamp>) -> OrmResult<CompiledQuery> {
        let descriptor = T::descriptor()?;
        Ok(insert_sql(&descriptor, entity.values(), stamp)?.build())
    }

    /// Like [`compile_insert`](Self::compile_insert) with `RETURNING <key>`.
    pub fn compile_insert_returning_key<T: Entity>(
        entity: &T,
        stamp: Option<&AuditStamp>,
    ) -> OrmResult<CompiledQuery> {
        let descriptor = T::descriptor()?;
        let mut sql = insert_sql(&descriptor, entity.values(), stamp)?;
        sql.push(" RETURNING ").push_ident(&descriptor.primary_key().column);
        Ok(sql.build())
    }

    /// Insert one entity, returning the affected row count.
    pub async fn insert<T: Entity>(
        &self,
        conn: &impl GenericClient,
        entity: &T,
        cancel: &CancelSignal,
    ) -> OrmResult<u64> {
        cancel.check()?;
        let descriptor = T::descriptor()?;
        let stamp = self.stamp_for(conn, &descriptor).await?;
        Self::compile_insert(entity, stamp.as_ref())?
            .execute(conn)
            .await
    }

    /// Insert one entity and return the database-assigned primary key.
    pub async fn insert_returning_key<T: Entity>(
        &self,
        conn: &impl GenericClient,
        entity: &T,
        cancel: &CancelSignal,
    ) -> OrmResult<SqlValue> {
        cancel.check()?;
        let descriptor = T::descriptor()?;
        let stamp = self.stamp_for(conn, &descriptor).await?;
        let row = Self::compile_insert_returning_key(entity, stamp.as_ref())?
            .fetch_one(conn)
            .await?;
        row.try_get::<_, SqlValue>(0)
            .map_err(|e| OrmError::decode(descriptor.primary_key().column.as_str(), e.to_string()))
    }

    // ==================== Update ====================

    /// Start a selective update of the row with primary key `id`.
    pub fn update_by_id<T: Entity>(&self, id: impl Into<SqlValue>) -> UpdateById<'_, T> {
        UpdateById::new(self, id.into())
    }

    // ==================== Select ====================

    /// Compile a SELECT of every mapped column, aliased to its property name.
    pub fn compile_select<T: Entity>(filter: WhereClause<T>, first_only: bool) -> OrmResult<CompiledQuery> {
        let descriptor = T::descriptor()?;
        let mut sql = Sql::new("SELECT ");
        for (i, mapping) in descriptor.columns().iter().enumerate() {
            if i > 0 {
                sql.push(", ");
            }
            let alias = SafeIdent::column(mapping.property)?;
            sql.push_ident(&mapping.column).push(" AS ").push_ident(&alias);
        }
        sql.push(" FROM ")
            .push_ident(descriptor.table())
            .push(" ")
            .push_sql(filter.into_sql());
        if first_only {
            sql.push(" LIMIT 1");
        }
        Ok(sql.build())
    }

    pub async fn select_where<T: Entity + FromRow>(
        &self,
        conn: &impl GenericClient,
        filter: WhereClause<T>,
        cancel: &CancelSignal,
    ) -> OrmResult<Vec<T>> {
        cancel.check()?;
        Self::compile_select::<T>(filter, false)?
            .fetch_all_as(conn)
            .await
    }

    /// First matching row, or `None`.
    pub async fn select_first_or_default<T: Entity + FromRow>(
        &self,
        conn: &impl GenericClient,
        filter: WhereClause<T>,
        cancel: &CancelSignal,
    ) -> OrmResult<Option<T>> {
        cancel.check()?;
        Self::compile_select::<T>(filter, true)?
            .fetch_opt_as(conn)
            .await
    }

    // ==================== Soft delete ====================

    /// Compile `UPDATE ... SET is_deleted = true, <editor id/time> WHERE ...`.
    pub fn compile_soft_delete<T: Entity>(filter: WhereClause<T>, stamp: &AuditStamp) -> OrmResult<CompiledQuery> {
        let descriptor = T::descriptor()?;
        let audit = descriptor.audit().ok_or_else(|| {
            OrmError::validation(format!(
                "{} does not declare a soft-delete column",
                descriptor.type_name()
            ))
        })?;

        let mut sql = Sql::new("UPDATE ");
        sql.push_ident(descriptor.table())
            .push(" SET ")
            .push_ident(&audit.deleted)
            .push(" = ")
            .push_bind(true)
            .push(", ")
            .push_ident(&audit.updated_by)
            .push(" = ")
            .push_bind(stamp.user_id.as_str())
            .push(", ")
            .push_ident(&audit.updated_at)
            .push(" = ")
            .push_bind(stamp.at)
            .push(" ")
            .push_sql(filter.into_sql());
        Ok(sql.build())
    }

    /// Flag matching rows as deleted, returning the affected row count.
    pub async fn soft_delete<T: Entity>(
        &self,
        conn: &impl GenericClient,
        filter: WhereClause<T>,
        cancel: &CancelSignal,
    ) -> OrmResult<u64> {
        cancel.check()?;
        let stamp = self.audit_stamp(conn).await?;
        Self::compile_soft_delete::<T>(filter, &stamp)?
            .execute(conn)
            .await
    }
}

fn insert_sql(
    descriptor: &EntityDescriptor,
    values: Vec<SqlValue>,
    stamp: Option<&AuditStamp>,
) -> OrmResult<Sql> {
    if values.len() != descriptor.columns().len() {
        return Err(OrmError::validation(format!(
            "{}: expected {} values, got {}",
            descriptor.type_name(),
            descriptor.columns().len(),
            values.len()
        )));
    }

    let audit = stamp.and(descriptor.audit());
    let mut columns: Vec<&SafeIdent> = Vec::new();
    let mut binds: Vec<SqlValue> = Vec::new();

    for (idx, (mapping, value)) in descriptor.columns().iter().zip(values).enumerate() {
        if mapping.generated || descriptor.is_concurrency_token(idx) {
            continue;
        }
        if audit.is_some_and(|a| a.contains(&mapping.column)) {
            continue;
        }
        columns.push(&mapping.column);
        binds.push(value);
    }

    if let (Some(audit), Some(stamp)) = (audit, stamp) {
        columns.extend([
            &audit.created_by,
            &audit.created_at,
            &audit.updated_by,
            &audit.updated_at,
            &audit.deleted,
        ]);
        binds.extend([
            SqlValue::from(stamp.user_id.as_str()),
            SqlValue::from(stamp.at),
            SqlValue::from(stamp.user_id.as_str()),
            SqlValue::from(stamp.at),
            SqlValue::Bool(false),
        ]);
    }

    let mut sql = Sql::new("INSERT INTO ");
    sql.push_ident(descriptor.table());
    if columns.is_empty() {
        sql.push(" DEFAULT VALUES");
    } else {
        sql.push(" (")
            .push_ident_list(columns)
            .push(") VALUES (")
            .push_bind_list(binds)
            .push(")");
    }
    Ok(sql)
}
