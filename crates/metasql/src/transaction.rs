//! Transaction macros.
//!
//! Guard evaluation and the gated delete only see one snapshot when they run
//! on the same transaction. Every engine operation takes a
//! [`GenericClient`](crate::GenericClient), so a `tokio_postgres::Transaction`
//! can be passed straight through.
//!
//! ```ignore
//! let deleted = metasql::transaction!(&mut client, tx, {
//!     guard.guarded_delete(&tx, "equipment", &params, &delete, &cancel).await
//! })?;
//! ```

/// Runs the block inside a transaction begun on `$client`.
///
/// On an open `tokio_postgres::Transaction` this nests as a savepoint.
///
/// Commits on `Ok(_)` and rolls back on `Err(_)`. The block must evaluate to
/// `metasql::OrmResult<T>`.
#[macro_export]
macro_rules! transaction {
    ($client:expr, $tx:ident, $body:block) => {{
        let $tx = ($client)
            .transaction()
            .await
            .map_err($crate::OrmError::from_db_error)?;

        let __metasql_tx_result = async { $body }.await;
        match __metasql_tx_result {
            Ok(value) => {
                $tx.commit()
                    .await
                    .map_err($crate::OrmError::from_db_error)?;
                Ok(value)
            }
            Err(error) => match $tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err($crate::OrmError::Other(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }};
}
