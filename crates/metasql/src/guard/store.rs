use super::engine::GuardEngine;
use super::rule::{GuardDecision, GuardRule};
use crate::cancel::CancelSignal;
use crate::client::GenericClient;
use crate::config::GuardConfig;
use crate::error::OrmResult;
use crate::ident::SafeIdent;
use crate::params::ParameterBag;
use crate::sql::{CompiledQuery, Sql};

/// Reads guard rules from the configured table.
///
/// Expected columns: `id`, `owner_entity_id`, `name`, `predicate_sql`,
/// `enabled`, `evaluation_order`, `is_deleted`.
#[derive(Debug, Clone)]
pub struct GuardRuleStore {
    table: SafeIdent,
}

impl GuardRuleStore {
    pub fn new(config: &GuardConfig) -> OrmResult<Self> {
        Ok(Self {
            table: SafeIdent::qualified(&config.rules_table)?,
        })
    }

    pub fn table(&self) -> &SafeIdent {
        &self.table
    }

    /// Enabled, non-deleted rules for `owner`, in evaluation order.
    pub fn compile_load(&self, owner: &str) -> CompiledQuery {
        let mut sql = Sql::new(
            "SELECT id::bigint AS id, owner_entity_id::text AS owner_entity_id, name::text AS name, \
             predicate_sql::text AS predicate_sql, enabled, evaluation_order::integer AS evaluation_order FROM ",
        );
        sql.push_ident(&self.table)
            .push(" WHERE owner_entity_id = ")
            .push_bind(owner)
            .push(" AND enabled = ")
            .push_bind(true)
            .push(" AND is_deleted = ")
            .push_bind(false)
            .push(" ORDER BY evaluation_order, id");
        sql.build()
    }

    pub async fn load(
        &self,
        conn: &impl GenericClient,
        owner: &str,
        cancel: &CancelSignal,
    ) -> OrmResult<Vec<GuardRule>> {
        cancel.check()?;
        self.compile_load(owner).fetch_all_as(conn).await
    }
}

/// Rule loading, evaluation and the gated delete on one connection.
#[derive(Debug, Clone)]
pub struct DeleteGuard {
    store: GuardRuleStore,
    engine: GuardEngine,
}

impl DeleteGuard {
    pub fn new(config: &GuardConfig) -> OrmResult<Self> {
        Ok(Self {
            store: GuardRuleStore::new(config)?,
            engine: GuardEngine::new(config),
        })
    }

    pub fn store(&self) -> &GuardRuleStore {
        &self.store
    }

    pub fn engine(&self) -> &GuardEngine {
        &self.engine
    }

    /// Load and evaluate `owner`'s rules.
    pub async fn check(
        &self,
        conn: &impl GenericClient,
        owner: &str,
        params: &ParameterBag,
        cancel: &CancelSignal,
    ) -> OrmResult<GuardDecision> {
        let rules = self.store.load(conn, owner, cancel).await?;
        self.engine.evaluate(conn, owner, &rules, params, cancel).await
    }

    /// Run `delete` only if every rule allows it.
    ///
    /// Pass a transaction as `conn` so the rules and the delete see the same
    /// data; committing or rolling back stays with the caller. A refusal is
    /// returned as [`GuardRuleBlocked`](crate::OrmError::GuardRuleBlocked) or
    /// [`GuardRuleInvalid`](crate::OrmError::GuardRuleInvalid).
    pub async fn guarded_delete(
        &self,
        conn: &impl GenericClient,
        owner: &str,
        params: &ParameterBag,
        delete: &CompiledQuery,
        cancel: &CancelSignal,
    ) -> OrmResult<u64> {
        self.check(conn, owner, params, cancel).await?.into_result()?;
        cancel.run(delete.execute(conn)).await
    }
}
