//! Delete guards.
//!
//! Before an owner's rows may be deleted, its enabled [`GuardRule`]s run in
//! `evaluation_order`. Each rule is a read-only SELECT returning a boolean
//! can-delete column; `@name` markers in the text are bound from the caller's
//! [`ParameterBag`](crate::ParameterBag). The first rule that returns false
//! blocks the delete, the first rule that cannot be evaluated safely makes it
//! invalid, and an owner without rules can never delete.
//!
//! ```ignore
//! let guard = DeleteGuard::new(&config.guard)?;
//! let tx = client.transaction().await?;
//! let params = ParameterBag::new().with("EQP_NO", "E-01");
//! let keys = FieldBag::new().with("EQP_NO", "E-01");
//! let delete = AdHocTable::new("mes.equipment")?.compile_delete(&keys)?;
//! guard.guarded_delete(&tx, "equipment", &params, &delete, &cancel).await?;
//! tx.commit().await?;
//! ```

mod engine;
mod markers;
mod rule;
mod store;
mod validate;


pub use engine::{GuardEngine, ProbeOutcome, RuleProbe};
pub use markers::extract_parameter_names;
pub use rule::{GuardDecision, GuardRule, NO_RULES};
pub use store::{DeleteGuard, GuardRuleStore};
pub use validate::validate_predicate;
