//! Transaction helper.
//!
//! Bound statements move into a transaction with `in_tx`; the [`transaction!`]
//! macro handles the commit/rollback around that.
//!
//! # Example
//!
//! ```ignore
//! use pgbind::{BindResult, named, prepare_bound};
//! use tokio_postgres::NoTls;
//!
//! # async fn demo(reader: &tokio_postgres::Client, transfer: Transfer) -> BindResult<()> {
//! let debit = prepare_bound::<Transfer, _, _>(
//!     reader,
//!     &named("UPDATE accounts SET balance = balance - :amount WHERE id = :from"),
//! )
//! .await?;
//!
//! // Beginning a transaction borrows its connection mutably, so it runs on
//! // a connection other than the one `debit` was prepared on.
//! let (mut writer, connection) = tokio_postgres::connect("postgres://...", NoTls).await?;
//! tokio::spawn(async move { let _ = connection.await; });
//!
//! pgbind::transaction!(&mut writer, tx, {
//!     debit.in_tx(&tx).await.exec(&transfer).await?;
//!     Ok(())
//! })?;
//! # Ok(()) }
//! ```

/// Runs the given block inside a database transaction.
///
/// - Begins a transaction via `$client.transaction().await`.
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`.
///
/// The block must evaluate to `pgbind::BindResult<T>`.
#[macro_export]
macro_rules! transaction {
    ($client:expr, $tx:ident, $body:block) => {{
        let $tx = ($client)
            .transaction()
            .await
            .map_err($crate::BindError::from)?;

        let __pgbind_tx_body_result = async { $body }.await;
        match __pgbind_tx_body_result {
            Ok(value) => {
                $tx.commit().await.map_err($crate::BindError::from)?;
                Ok(value)
            }
            Err(error) => match $tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err($crate::BindError::Other(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }};
}
