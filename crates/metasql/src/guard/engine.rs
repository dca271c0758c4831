use super::markers::{extract_parameter_names, rewrite_markers};
use super::rule::{GuardDecision, GuardRule};
use super::validate::validate_predicate;
use crate::cancel::CancelSignal;
use crate::client::GenericClient;
use crate::config::GuardConfig;
use crate::error::{OrmError, OrmResult};
use crate::params::ParameterBag;
use crate::row::RowExt;
use crate::value::{SqlType, SqlValue};
use std::future::Future;
use tokio_postgres::types::ToSql;

/// What a predicate returned for the can-delete column.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    NoRow,
    MissingColumn,
    Value(SqlValue),
}

/// Runs one rewritten predicate.
///
/// Implemented for every [`GenericClient`], so a transaction can be passed
/// straight through.
pub trait RuleProbe: Send + Sync {
    fn probe(
        &self,
        sql: &str,
        params: &[SqlValue],
        can_delete_column: &str,
    ) -> impl Future<Output = OrmResult<ProbeOutcome>> + Send;
}

impl<C: GenericClient> RuleProbe for C {
    async fn probe(
        &self,
        sql: &str,
        params: &[SqlValue],
        can_delete_column: &str,
    ) -> OrmResult<ProbeOutcome> {
        let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        let Some(row) = self.query_opt(sql, &refs).await? else {
            return Ok(ProbeOutcome::NoRow);
        };
        let Some(idx) = row.find_column_ignore_case(can_delete_column) else {
            return Ok(ProbeOutcome::MissingColumn);
        };
        let value = row
            .try_get::<_, SqlValue>(idx)
            .map_err(|e| OrmError::decode(can_delete_column, e.to_string()))?;
        Ok(ProbeOutcome::Value(value))
    }
}

enum RuleOutcome {
    Pass,
    Blocked,
    Invalid(String),
}

/// Sequential, fail-closed evaluator of guard rules.
#[derive(Debug, Clone)]
pub struct GuardEngine {
    can_delete_column: String,
}

impl Default for GuardEngine {
    fn default() -> Self {
        Self::new(&GuardConfig::default())
    }
}

impl GuardEngine {
    pub fn new(config: &GuardConfig) -> Self {
        Self {
            can_delete_column: config.can_delete_column.clone(),
        }
    }

    /// Evaluate `rules` for `owner` in priority order.
    ///
    /// Disabled rules are ignored. Stops at the first rule that blocks or is
    /// invalid; with no enabled rules the decision is [`GuardDecision::NoRules`].
    /// Execution errors are returned as `Err`, never as a decision.
    pub async fn evaluate(
        &self,
        probe: &impl RuleProbe,
        owner: &str,
        rules: &[GuardRule],
        params: &ParameterBag,
        cancel: &CancelSignal,
    ) -> OrmResult<GuardDecision> {
        cancel.check()?;

        let mut ordered: Vec<&GuardRule> = rules.iter().filter(|r| r.enabled).collect();
        ordered.sort_by_key(|r| (r.evaluation_order, r.id));

        if ordered.is_empty() {
            tracing::info!(owner, "metasql guard: no enabled rules, delete refused");
            return Ok(GuardDecision::NoRules);
        }

        for rule in ordered {
            cancel.check()?;
            match self.evaluate_rule(probe, rule, params, cancel).await? {
                RuleOutcome::Pass => {
                    tracing::debug!(owner, rule = %rule.name, "metasql guard: rule passed");
                }
                RuleOutcome::Blocked => {
                    tracing::info!(owner, rule = %rule.name, "metasql guard: blocked");
                    return Ok(GuardDecision::Blocked {
                        rule_name: rule.name.clone(),
                    });
                }
                RuleOutcome::Invalid(reason) => {
                    tracing::warn!(owner, rule = %rule.name, %reason, "metasql guard: invalid rule");
                    return Ok(GuardDecision::Invalid {
                        rule_name: rule.name.clone(),
                        reason,
                    });
                }
            }
        }

        tracing::info!(owner, "metasql guard: allowed");
        Ok(GuardDecision::Allowed)
    }

    async fn evaluate_rule(
        &self,
        probe: &impl RuleProbe,
        rule: &GuardRule,
        params: &ParameterBag,
        cancel: &CancelSignal,
    ) -> OrmResult<RuleOutcome> {
        if let Err(reason) = validate_predicate(&rule.predicate_sql) {
            return Ok(RuleOutcome::Invalid(reason));
        }

        let names = extract_parameter_names(&rule.predicate_sql);
        let missing: Vec<&str> = names
            .iter()
            .filter(|n| !params.contains(n))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Ok(RuleOutcome::Invalid(format!(
                "missing parameters: {}",
                missing.join(", ")
            )));
        }

        let values: Vec<SqlValue> = names
            .iter()
            .map(|n| params.get(n).map_or(SqlValue::Null, SqlValue::from_json))
            .collect();
        let sql = rewrite_markers(&rule.predicate_sql, &names);

        let outcome = cancel
            .run(probe.probe(&sql, &values, &self.can_delete_column))
            .await?;
        Ok(match outcome {
            ProbeOutcome::NoRow => RuleOutcome::Invalid("predicate returned no row".to_string()),
            ProbeOutcome::MissingColumn => RuleOutcome::Invalid(format!(
                "predicate did not return column '{}'",
                self.can_delete_column
            )),
            ProbeOutcome::Value(SqlValue::Null) => {
                RuleOutcome::Invalid(format!("'{}' is NULL", self.can_delete_column))
            }
            ProbeOutcome::Value(value) => match value.convert(SqlType::Boolean) {
                Ok(SqlValue::Bool(true)) => RuleOutcome::Pass,
                Ok(SqlValue::Bool(false)) => RuleOutcome::Blocked,
                _ => RuleOutcome::Invalid(format!(
                    "'{}' is not a boolean",
                    self.can_delete_column
                )),
            },
        })
    }
}
