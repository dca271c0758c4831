//! Error types for metasql

use thiserror::Error;

/// Result type alias for metasql operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for compilation and execution.
#[derive(Debug, Error)]
pub enum OrmError {
    /// A table, column, or function name failed identifier validation
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A mutating statement was about to be built without any predicate
    #[error("Refusing to build an empty predicate")]
    EmptyPredicate,

    /// An UPDATE has nothing left to assign after null filtering
    #[error("No fields to update")]
    NoFieldsToUpdate,

    /// The entity declares a concurrency column but no token was supplied
    #[error("Entity '{0}' declares a concurrency token but none was supplied")]
    MissingConcurrencyToken(String),

    /// The entity shape has no primary key
    #[error("Entity '{0}' has no primary key declaration")]
    MissingKeyDeclaration(String),

    /// A guard rule is malformed, unsafe, or missing caller parameters
    #[error("Guard rule '{rule}' is invalid: {reason}")]
    GuardRuleInvalid { rule: String, reason: String },

    /// A guard rule vetoed the operation
    #[error("Blocked by guard rule '{rule_name}'")]
    GuardRuleBlocked { rule_name: String },

    /// A caller value could not be coerced to the column's declared type
    #[error("Invalid value for column '{column}': {message}")]
    InvalidValue { column: String, message: String },

    /// The operation was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Other errors
    #[error("{0}")]
    Other(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),
}

impl OrmError {
    /// Create an invalid identifier error
    pub fn invalid_identifier(ident: impl Into<String>) -> Self {
        Self::InvalidIdentifier(ident.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an invalid value error for a specific column
    pub fn invalid_value(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this error is a guard veto or guard failure
    pub fn is_guard_rejection(&self) -> bool {
        matches!(
            self,
            Self::GuardRuleBlocked { .. } | Self::GuardRuleInvalid { .. }
        )
    }

    /// Parse a tokio_postgres error into a more specific OrmError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
