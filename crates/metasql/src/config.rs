//! Engine configuration.
//!
//! Loading policy belongs to the host application; this module only defines
//! the shape and validates it. A TOML document looks like:
//!
//! ```toml
//! anonymous_user = "anonymous"
//!
//! [guard]
//! rules_table = "sys.delete_guard_rule"
//! can_delete_column = "CanDelete"
//! ```

use crate::error::{OrmError, OrmResult};
use crate::ident::SafeIdent;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Principal id stamped into audit columns when no caller is known.
    pub anonymous_user: String,
    pub guard: GuardConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            anonymous_user: "anonymous".to_string(),
            guard: GuardConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Table the delete-guard rules are read from.
    pub rules_table: String,
    /// Column each rule predicate must return.
    pub can_delete_column: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            rules_table: "delete_guard_rule".to_string(),
            can_delete_column: "CanDelete".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> OrmResult<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| OrmError::Config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> OrmResult<()> {
        if self.anonymous_user.trim().is_empty() {
            return Err(OrmError::Config("anonymous_user must not be empty".into()));
        }
        SafeIdent::qualified(&self.guard.rules_table)
            .map_err(|e| OrmError::Config(format!("guard.rules_table: {e}")))?;
        SafeIdent::column(&self.guard.can_delete_column)
            .map_err(|e| OrmError::Config(format!("guard.can_delete_column: {e}")))?;
        Ok(())
    }
}
