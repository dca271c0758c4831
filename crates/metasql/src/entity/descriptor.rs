use crate::error::{OrmError, OrmResult};
use crate::ident::SafeIdent;

/// Static declaration of an entity type, as generated by `#[derive(Entity)]`.
#[derive(Debug, Clone)]
pub struct EntityShape {
    /// Rust type name, used in error messages.
    pub type_name: &'static str,
    /// Table name, optionally schema-qualified.
    pub table: &'static str,
    /// Mapped fields in declaration order.
    pub fields: Vec<FieldShape>,
    /// Whether the table follows the five-column audit convention.
    pub audit: bool,
}

/// One mapped field of an [`EntityShape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldShape {
    pub property: &'static str,
    pub column: &'static str,
    pub primary_key: bool,
    pub concurrency_token: bool,
    /// Assigned by the database; never inserted or updated.
    pub generated: bool,
}

impl FieldShape {
    pub const fn new(property: &'static str, column: &'static str) -> Self {
        Self {
            property,
            column,
            primary_key: false,
            concurrency_token: false,
            generated: false,
        }
    }

    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub const fn concurrency_token(mut self) -> Self {
        self.concurrency_token = true;
        self
    }

    pub const fn generated(mut self) -> Self {
        self.generated = true;
        self
    }
}

/// Names of the audit convention columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditColumns {
    pub created_by: SafeIdent,
    pub created_at: SafeIdent,
    pub updated_by: SafeIdent,
    pub updated_at: SafeIdent,
    pub deleted: SafeIdent,
}

impl AuditColumns {
    pub const CREATED_BY: &'static str = "created_by";
    pub const CREATED_AT: &'static str = "created_at";
    pub const UPDATED_BY: &'static str = "updated_by";
    pub const UPDATED_AT: &'static str = "updated_at";
    pub const DELETED: &'static str = "is_deleted";

    /// The conventional column set.
    pub fn conventional() -> OrmResult<Self> {
        Ok(Self {
            created_by: SafeIdent::column(Self::CREATED_BY)?,
            created_at: SafeIdent::column(Self::CREATED_AT)?,
            updated_by: SafeIdent::column(Self::UPDATED_BY)?,
            updated_at: SafeIdent::column(Self::UPDATED_AT)?,
            deleted: SafeIdent::column(Self::DELETED)?,
        })
    }

    /// Whether `column` is one of the audit columns (case-insensitive).
    pub fn contains(&self, column: &SafeIdent) -> bool {
        [
            &self.created_by,
            &self.created_at,
            &self.updated_by,
            &self.updated_at,
            &self.deleted,
        ]
        .iter()
        .any(|c| c.eq_ignore_case(column.as_str()))
    }
}

/// A property mapped to a validated column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub property: &'static str,
    pub column: SafeIdent,
    pub generated: bool,
}

/// Validated, immutable metadata for one entity type.
///
/// Built once from the type's [`EntityShape`] and cached for the life of the
/// process (see [`Entity::descriptor`](super::Entity::descriptor)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    type_name: &'static str,
    table: SafeIdent,
    columns: Vec<ColumnMapping>,
    primary_key: usize,
    concurrency_token: Option<usize>,
    audit: Option<AuditColumns>,
}

impl EntityDescriptor {
    pub fn from_shape(shape: &EntityShape) -> OrmResult<Self> {
        let table = SafeIdent::qualified(shape.table)?;

        let mut columns: Vec<ColumnMapping> = Vec::with_capacity(shape.fields.len());
        let mut primary_key = None;
        let mut concurrency_token = None;

        for (idx, field) in shape.fields.iter().enumerate() {
            let column = SafeIdent::column(field.column)?;
            if columns.iter().any(|c| c.column.eq_ignore_case(column.as_str())) {
                return Err(OrmError::validation(format!(
                    "{}: column '{}' is mapped twice",
                    shape.type_name, column
                )));
            }

            if field.primary_key {
                if primary_key.is_some() {
                    return Err(OrmError::validation(format!(
                        "{}: composite primary keys are not supported",
                        shape.type_name
                    )));
                }
                primary_key = Some(idx);
            }
            if field.concurrency_token {
                if concurrency_token.is_some() {
                    return Err(OrmError::validation(format!(
                        "{}: only one concurrency token column is allowed",
                        shape.type_name
                    )));
                }
                concurrency_token = Some(idx);
            }

            columns.push(ColumnMapping {
                property: field.property,
                column,
                generated: field.generated,
            });
        }

        let primary_key =
            primary_key.ok_or_else(|| OrmError::MissingKeyDeclaration(shape.type_name.into()))?;
        let audit = if shape.audit {
            Some(AuditColumns::conventional()?)
        } else {
            None
        };

        Ok(Self {
            type_name: shape.type_name,
            table,
            columns,
            primary_key,
            concurrency_token,
            audit,
        })
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn table(&self) -> &SafeIdent {
        &self.table
    }

    /// All mapped columns, in declaration order.
    pub fn columns(&self) -> &[ColumnMapping] {
        &self.columns
    }

    pub fn primary_key(&self) -> &ColumnMapping {
        &self.columns[self.primary_key]
    }

    pub fn concurrency_token(&self) -> Option<&ColumnMapping> {
        self.concurrency_token.map(|idx| &self.columns[idx])
    }

    pub fn audit(&self) -> Option<&AuditColumns> {
        self.audit.as_ref()
    }

    pub fn soft_delete_column(&self) -> Option<&SafeIdent> {
        self.audit.as_ref().map(|a| &a.deleted)
    }

    /// Position of a field, looked up by property name first and then by
    /// column name (both case-insensitive).
    pub fn position_of(&self, field: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.property.eq_ignore_ascii_case(field))
            .or_else(|| {
                self.columns
                    .iter()
                    .position(|c| c.column.eq_ignore_case(field))
            })
    }

    pub fn column_for(&self, field: &str) -> Option<&ColumnMapping> {
        self.position_of(field).map(|idx| &self.columns[idx])
    }

    pub(crate) fn is_primary_key(&self, idx: usize) -> bool {
        idx == self.primary_key
    }

    pub(crate) fn is_concurrency_token(&self, idx: usize) -> bool {
        self.concurrency_token == Some(idx)
    }
}
