use crate::error::{OrmError, OrmResult};
use crate::row::{FromRow, RowExt};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

/// A read-only predicate that must pass before an owner's rows are deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardRule {
    pub id: i64,
    pub owner_entity_id: String,
    pub name: String,
    /// A single SELECT returning the can-delete column; `@name` markers are
    /// bound from the caller's parameters.
    pub predicate_sql: String,
    pub enabled: bool,
    /// Lower runs first; ties run in id order.
    pub evaluation_order: i32,
}

impl FromRow for GuardRule {
    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(Self {
            id: row.try_get_column("id")?,
            owner_entity_id: row.try_get_column("owner_entity_id")?,
            name: row.try_get_column("name")?,
            predicate_sql: row.try_get_column("predicate_sql")?,
            enabled: row.try_get_column("enabled")?,
            evaluation_order: row.try_get_column("evaluation_order")?,
        })
    }
}

/// Name reported when an owner has no enabled rules.
pub const NO_RULES: &str = "<no enabled rules>";

/// Outcome of evaluating an owner's rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Every rule passed.
    Allowed,
    /// The owner has no enabled rules; deletion is never allowed.
    NoRules,
    /// A rule returned false.
    Blocked { rule_name: String },
    /// A rule could not be evaluated safely.
    Invalid { rule_name: String, reason: String },
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Name of the rule that stopped evaluation, if any.
    pub fn rule_name(&self) -> Option<&str> {
        match self {
            Self::Allowed => None,
            Self::NoRules => Some(NO_RULES),
            Self::Blocked { rule_name } | Self::Invalid { rule_name, .. } => Some(rule_name),
        }
    }

    /// `Ok(())` only for [`GuardDecision::Allowed`].
    pub fn into_result(self) -> OrmResult<()> {
        match self {
            Self::Allowed => Ok(()),
            Self::NoRules => Err(OrmError::GuardRuleBlocked {
                rule_name: NO_RULES.to_string(),
            }),
            Self::Blocked { rule_name } => Err(OrmError::GuardRuleBlocked { rule_name }),
            Self::Invalid { rule_name, reason } => Err(OrmError::GuardRuleInvalid {
                rule: rule_name,
                reason,
            }),
        }
    }
}
