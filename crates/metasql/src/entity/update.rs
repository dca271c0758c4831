use super::audit::AuditStamp;
use super::mapper::EntityMapper;
use super::{Entity, EntityDescriptor};
use crate::cancel::CancelSignal;
use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::sql::{CompiledQuery, Sql};
use crate::value::SqlValue;
use std::marker::PhantomData;
use std::sync::Arc;

/// Selective `UPDATE ... WHERE <pk> = $n` builder.
///
/// Created by [`EntityMapper::update_by_id`]. Nulls are skipped unless
/// [`include_nulls`](Self::include_nulls) is called. If the entity declares a
/// concurrency token the caller must supply its current value; the statement
/// then bumps the token and matches on it, so a stale write affects zero rows.
#[must_use]
pub struct UpdateById<'m, T: Entity> {
    mapper: &'m EntityMapper,
    id: SqlValue,
    sets: Vec<(String, SqlValue)>,
    include_nulls: bool,
    audit: bool,
    token: Option<SqlValue>,
    _entity: PhantomData<fn() -> T>,
}

struct UpdatePlan {
    descriptor: Arc<EntityDescriptor>,
    assignments: Vec<(usize, SqlValue)>,
}

impl<'m, T: Entity> UpdateById<'m, T> {
    pub(super) fn new(mapper: &'m EntityMapper, id: SqlValue) -> Self {
        Self {
            mapper,
            id,
            sets: Vec::new(),
            include_nulls: false,
            audit: false,
            token: None,
            _entity: PhantomData,
        }
    }

    /// Assign `field`. Setting the same field again replaces the value.
    pub fn set(mut self, field: &str, value: impl Into<SqlValue>) -> Self {
        let value = value.into();
        match self
            .sets
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(field))
        {
            Some(slot) => slot.1 = value,
            None => self.sets.push((field.to_string(), value)),
        }
        self
    }

    /// Skip NULL assignments (the default).
    pub fn ignore_nulls(mut self) -> Self {
        self.include_nulls = false;
        self
    }

    /// Write NULL assignments as `col = NULL`.
    pub fn include_nulls(mut self) -> Self {
        self.include_nulls = true;
        self
    }

    /// Also stamp editor id and time.
    pub fn audit(mut self) -> Self {
        self.audit = true;
        self
    }

    /// Current value of the entity's concurrency token.
    pub fn with_concurrency_token(mut self, token: impl Into<SqlValue>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn plan(&self) -> OrmResult<UpdatePlan> {
        let descriptor = T::descriptor()?;

        let mut assignments: Vec<(usize, SqlValue)> = Vec::with_capacity(self.sets.len());
        for (field, value) in &self.sets {
            let idx = descriptor.position_of(field).ok_or_else(|| {
                OrmError::invalid_identifier(format!(
                    "{} has no field '{}'",
                    descriptor.type_name(),
                    field
                ))
            })?;
            if descriptor.is_primary_key(idx)
                || descriptor.is_concurrency_token(idx)
                || descriptor.columns()[idx].generated
            {
                return Err(OrmError::invalid_identifier(format!(
                    "{}.{} cannot be assigned",
                    descriptor.type_name(),
                    field
                )));
            }
            if value.is_null() && !self.include_nulls {
                continue;
            }
            // A property and its column name can both address the same slot.
            match assignments.iter_mut().find(|(i, _)| *i == idx) {
                Some(slot) => slot.1 = value.clone(),
                None => assignments.push((idx, value.clone())),
            }
        }

        if self.audit {
            let Some(audit) = descriptor.audit() else {
                return Err(OrmError::validation(format!(
                    "{} does not declare audit columns",
                    descriptor.type_name()
                )));
            };
            // The stamp owns the editor columns.
            assignments.retain(|(idx, _)| {
                let column = descriptor.columns()[*idx].column.as_str();
                !audit.updated_by.eq_ignore_case(column) && !audit.updated_at.eq_ignore_case(column)
            });
        }

        if assignments.is_empty() {
            return Err(OrmError::NoFieldsToUpdate);
        }

        match (descriptor.concurrency_token(), &self.token) {
            (Some(_), None) => {
                return Err(OrmError::MissingConcurrencyToken(descriptor.type_name().into()));
            }
            (None, Some(_)) => {
                return Err(OrmError::validation(format!(
                    "{} does not declare a concurrency token",
                    descriptor.type_name()
                )));
            }
            _ => {}
        }

        Ok(UpdatePlan {
            descriptor,
            assignments,
        })
    }

    fn render(&self, plan: UpdatePlan, stamp: Option<&AuditStamp>) -> OrmResult<CompiledQuery> {
        let d = &plan.descriptor;
        let mut sets: Vec<Sql> = Vec::new();

        for (idx, value) in plan.assignments {
            let mut s = Sql::empty();
            s.push_ident(&d.columns()[idx].column).push(" = ").push_bind(value);
            sets.push(s);
        }

        if self.audit {
            let (Some(audit), Some(stamp)) = (d.audit(), stamp) else {
                return Err(OrmError::validation("audit requested without an audit stamp"));
            };
            let mut by = Sql::empty();
            by.push_ident(&audit.updated_by)
                .push(" = ")
                .push_bind(stamp.user_id.as_str());
            let mut at = Sql::empty();
            at.push_ident(&audit.updated_at).push(" = ").push_bind(stamp.at);
            sets.push(by);
            sets.push(at);
        }

        if let Some(token) = d.concurrency_token() {
            let mut bump = Sql::empty();
            bump.push_ident(&token.column)
                .push(" = ")
                .push_ident(&token.column)
                .push(" + 1");
            sets.push(bump);
        }

        let mut sql = Sql::new("UPDATE ");
        sql.push_ident(d.table())
            .push(" SET ")
            .push_joined(sets, ", ")
            .push(" WHERE ")
            .push_ident(&d.primary_key().column)
            .push(" = ")
            .push_bind(self.id.clone());

        if let (Some(column), Some(token)) = (d.concurrency_token(), &self.token) {
            sql.push(" AND ")
                .push_ident(&column.column)
                .push(" = ")
                .push_bind(token.clone());
        }

        Ok(sql.build())
    }

    /// Compile without touching the database. `stamp` is required when
    /// [`audit`](Self::audit) was requested.
    pub fn compile(&self, stamp: Option<&AuditStamp>) -> OrmResult<CompiledQuery> {
        let plan = self.plan()?;
        self.render(plan, stamp)
    }

    /// Run the update, returning the affected row count.
    ///
    /// Zero rows with a concurrency token means the row changed underneath.
    pub async fn execute(self, conn: &impl GenericClient, cancel: &CancelSignal) -> OrmResult<u64> {
        cancel.check()?;
        let plan = self.plan()?;
        let stamp = if self.audit {
            Some(self.mapper.audit_stamp(conn).await?)
        } else {
            None
        };
        self.render(plan, stamp.as_ref())?.execute(conn).await
    }
}
