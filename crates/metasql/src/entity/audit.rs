use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use chrono::{DateTime, Utc};

/// Supplies the id of the principal performing a write.
pub trait PrincipalProvider: Send + Sync {
    /// `None` means anonymous.
    fn current_user_id(&self) -> Option<String>;
}

/// A principal provider that always reports anonymous.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousPrincipal;

impl PrincipalProvider for AnonymousPrincipal {
    fn current_user_id(&self) -> Option<String> {
        None
    }
}

/// A fixed principal, handy for batch jobs and tests.
#[derive(Debug, Clone)]
pub struct StaticPrincipal(pub String);

impl PrincipalProvider for StaticPrincipal {
    fn current_user_id(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

impl<F> PrincipalProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn current_user_id(&self) -> Option<String> {
        self()
    }
}

/// Who and when, stamped into audit columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditStamp {
    pub user_id: String,
    pub at: DateTime<Utc>,
}

/// Read the database server's clock.
///
/// Audit times always come from here, never from the application host.
pub async fn server_now(conn: &impl GenericClient) -> OrmResult<DateTime<Utc>> {
    let row = conn.query_one("SELECT CURRENT_TIMESTAMP", &[]).await?;
    row.try_get::<_, DateTime<Utc>>(0)
        .map_err(|e| OrmError::decode("current_timestamp", e.to_string()))
}
