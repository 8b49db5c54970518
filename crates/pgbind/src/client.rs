//! The connection seam bound statements run through.
//!
//! [`GenericClient`] covers plain connections and transactions alike;
//! [`StreamingClient`] adds row-by-row delivery for [`cursor`](crate::BoundQueryStmt::cursor).

use crate::error::{BindError, BindResult};
use futures_core::Stream;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_postgres::Row;
use tokio_postgres::Statement;
use tokio_postgres::types::ToSql;

fn no_prepare_support() -> BindError {
    BindError::Other("prepared statements are not supported by this client".to_string())
}

fn first_row(rows: Vec<Row>) -> BindResult<Row> {
    rows.into_iter()
        .next()
        .ok_or_else(|| BindError::not_found("Expected one row, got none"))
}

/// Something statements can be prepared on and executed against.
///
/// Implemented for `tokio_postgres::Client`, `Transaction` and references to
/// either, which is what lets [`in_tx`](crate::BoundStmt::in_tx) move a
/// statement onto a transaction without changing its type parameters.
pub trait GenericClient: Send + Sync {
    /// Run `sql` and collect every row.
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = BindResult<Vec<Row>>> + Send;

    /// Run `sql`, returning how many rows it touched.
    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = BindResult<u64>> + Send;

    /// First row of `sql`. An empty result is [`BindError::NotFound`]; rows
    /// after the first are dropped.
    fn query_one(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = BindResult<Row>> + Send {
        async move { first_row(self.query(sql, params).await?) }
    }

    fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = BindResult<Option<Row>>> + Send {
        async move { Ok(self.query(sql, params).await?.into_iter().next()) }
    }

    /// Handle used to abort a statement that overran its timeout.
    /// `None` means timeouts can only drop the future.
    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        None
    }

    /// Prepare `sql` server-side. The statement belongs to this connection only.
    fn prepare_statement(&self, sql: &str) -> impl Future<Output = BindResult<Statement>> + Send {
        let _ = sql;
        async { Err(no_prepare_support()) }
    }

    fn query_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = BindResult<Vec<Row>>> + Send {
        let _ = (stmt, params);
        async { Err(no_prepare_support()) }
    }

    /// Prepared counterpart of [`GenericClient::query_one`].
    fn query_one_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = BindResult<Row>> + Send {
        async move { first_row(self.query_prepared(stmt, params).await?) }
    }

    fn query_opt_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = BindResult<Option<Row>>> + Send {
        async move { Ok(self.query_prepared(stmt, params).await?.into_iter().next()) }
    }

    fn execute_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = BindResult<u64>> + Send {
        let _ = (stmt, params);
        async { Err(no_prepare_support()) }
    }
}

impl GenericClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> BindResult<Vec<Row>> {
        Ok(tokio_postgres::Client::query(self, sql, params).await?)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> BindResult<u64> {
        Ok(tokio_postgres::Client::execute(self, sql, params).await?)
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        Some(tokio_postgres::Client::cancel_token(self))
    }

    async fn prepare_statement(&self, sql: &str) -> BindResult<Statement> {
        Ok(tokio_postgres::Client::prepare(self, sql).await?)
    }

    async fn query_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> BindResult<Vec<Row>> {
        Ok(tokio_postgres::Client::query(self, stmt, params).await?)
    }

    async fn execute_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> BindResult<u64> {
        Ok(tokio_postgres::Client::execute(self, stmt, params).await?)
    }
}

impl GenericClient for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> BindResult<Vec<Row>> {
        Ok(tokio_postgres::Transaction::query(self, sql, params).await?)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> BindResult<u64> {
        Ok(tokio_postgres::Transaction::execute(self, sql, params).await?)
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        Some(tokio_postgres::Transaction::cancel_token(self))
    }

    async fn prepare_statement(&self, sql: &str) -> BindResult<Statement> {
        Ok(tokio_postgres::Transaction::prepare(self, sql).await?)
    }

    async fn query_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> BindResult<Vec<Row>> {
        Ok(tokio_postgres::Transaction::query(self, stmt, params).await?)
    }

    async fn execute_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> BindResult<u64> {
        Ok(tokio_postgres::Transaction::execute(self, stmt, params).await?)
    }
}

impl<C: GenericClient> GenericClient for &C {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> BindResult<Vec<Row>> {
        (**self).query(sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> BindResult<u64> {
        (**self).execute(sql, params).await
    }

    fn query_one(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = BindResult<Row>> + Send {
        (**self).query_one(sql, params)
    }

    fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = BindResult<Option<Row>>> + Send {
        (**self).query_opt(sql, params)
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        (**self).cancel_token()
    }

    fn prepare_statement(&self, sql: &str) -> impl Future<Output = BindResult<Statement>> + Send {
        (**self).prepare_statement(sql)
    }

    fn query_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = BindResult<Vec<Row>>> + Send {
        (**self).query_prepared(stmt, params)
    }

    fn query_one_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = BindResult<Row>> + Send {
        (**self).query_one_prepared(stmt, params)
    }

    fn query_opt_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = BindResult<Option<Row>>> + Send {
        (**self).query_opt_prepared(stmt, params)
    }

    fn execute_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = BindResult<u64>> + Send {
        (**self).execute_prepared(stmt, params)
    }
}

/// Rows delivered one at a time, whatever client produced them.
#[must_use]
pub struct RowStream {
    rows: Pin<Box<dyn Stream<Item = BindResult<Row>> + Send>>,
}

impl RowStream {
    pub fn new<S>(rows: S) -> Self
    where
        S: Stream<Item = BindResult<Row>> + Send + 'static,
    {
        Self {
            rows: Box::pin(rows),
        }
    }
}

impl fmt::Debug for RowStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowStream").finish_non_exhaustive()
    }
}

impl Stream for RowStream {
    type Item = BindResult<Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rows.as_mut().poll_next(cx)
    }
}

/// Clients that can hand rows back before the whole result is read.
///
/// Kept apart from [`GenericClient`] so test doubles and wrappers that only
/// collect rows do not have to provide it.
pub trait StreamingClient: GenericClient {
    fn query_stream_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = BindResult<RowStream>> + Send;
}

/// Driver row stream with its errors lifted into [`BindError::Query`].
struct DriverRows<S> {
    rows: Pin<Box<S>>,
}

impl<S> Stream for DriverRows<S>
where
    S: Stream<Item = Result<Row, tokio_postgres::Error>> + Send + 'static,
{
    type Item = BindResult<Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rows
            .as_mut()
            .poll_next(cx)
            .map(|row| row.map(|r| r.map_err(BindError::Query)))
    }
}

fn driver_rows<S>(rows: S) -> RowStream
where
    S: Stream<Item = Result<Row, tokio_postgres::Error>> + Send + 'static,
{
    RowStream::new(DriverRows {
        rows: Box::pin(rows),
    })
}

impl StreamingClient for tokio_postgres::Client {
    async fn query_stream_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> BindResult<RowStream> {
        let rows = tokio_postgres::Client::query_raw(self, stmt, params.iter().copied()).await?;
        Ok(driver_rows(rows))
    }
}

impl StreamingClient for tokio_postgres::Transaction<'_> {
    async fn query_stream_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> BindResult<RowStream> {
        let rows =
            tokio_postgres::Transaction::query_raw(self, stmt, params.iter().copied()).await?;
        Ok(driver_rows(rows))
    }
}

impl<C: StreamingClient> StreamingClient for &C {
    fn query_stream_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = BindResult<RowStream>> + Send {
        (**self).query_stream_prepared(stmt, params)
    }
}
