//! Prepared statements bound to an argument type.
//!
//! A bound statement pairs a server-side prepared statement with a [`Binder`]
//! that knows which field of `A` feeds each placeholder. Callers hand over a
//! whole `A` per execution instead of a positional parameter slice:
//!
//! ```ignore
//! use pgbind::{BindArgs, FromRow, named, prepare_bound, prepare_bound_query};
//!
//! #[derive(BindArgs)]
//! pub struct Rename {
//!     pub id: i64,
//!     pub name: String,
//! }
//!
//! #[derive(BindArgs)]
//! pub struct ById {
//!     pub id: i64,
//! }
//!
//! #[derive(FromRow)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! let rename = prepare_bound::<Rename, _, _>(&client, &named("UPDATE users SET name = :name WHERE id = :id")).await?;
//! rename.exec(&Rename { id: 1, name: "alice".into() }).await?;
//!
//! let by_id = prepare_bound_query::<ById, User, _, _>(&client, &named("SELECT id, name FROM users WHERE id = :id")).await?;
//! let user = by_id.one(&ById { id: 1 }).await?;
//! ```
//!
//! Binding errors are raised while the statement is being built, before
//! anything is sent to the server.

use crate::binder::Binder;
use crate::client::{GenericClient, StreamingClient};
use crate::config::StmtConfig;
use crate::error::{BindError, BindResult};
use crate::mapping::{BindArgs, FieldCache};
use crate::render::Render;
use crate::row::FromRow;
use crate::sql::FromRowStream;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_postgres::Statement;
use tokio_postgres::types::ToSql;


/// State of the server-side statement behind a bound statement.
pub(crate) enum Handle {
    Live(Statement),
    /// Re-preparation failed; every operation reports the error.
    Failed(Arc<BindError>),
    Closed,
}

impl Handle {
    fn from_prepared(result: BindResult<Statement>) -> Self {
        match result {
            Ok(stmt) => Handle::Live(stmt),
            Err(e) => Handle::Failed(Arc::new(e)),
        }
    }

    fn statement(&self) -> BindResult<&Statement> {
        match self {
            Handle::Live(stmt) => Ok(stmt),
            Handle::Failed(cause) => Err(BindError::StatementUnavailable(cause.clone())),
            Handle::Closed => Err(BindError::Closed),
        }
    }

    fn state(&self) -> &'static str {
        match self {
            Handle::Live(_) => "live",
            Handle::Failed(_) => "failed",
            Handle::Closed => "closed",
        }
    }
}

struct Core<'c, C, A> {
    client: &'c C,
    sql: String,
    handle: Handle,
    binder: Binder<A>,
    config: StmtConfig,
}

impl<'c, C, A> Core<'c, C, A>
where
    C: GenericClient,
    A: BindArgs,
{
    /// Resolve the statement and extract parameters for one execution.
    fn bind<'s, 'a>(
        &'s self,
        op: &'static str,
        arg: &'a A,
    ) -> BindResult<(&'s Statement, Vec<&'a (dyn ToSql + Sync)>)> {
        let stmt = self.handle.statement()?;
        let params = self.binder.to_args(arg)?;
        tracing::debug!(
            target: "pgbind.sql",
            op,
            tag = ?self.config.tag,
            param_count = params.len(),
            sql = %self.config.log_sql(&self.sql),
            "executing bound statement"
        );
        Ok((stmt, params))
    }

    async fn rebind<'t, Tx: GenericClient>(&self, tx: &'t Tx) -> Core<'t, Tx, A> {
        let handle = match &self.handle {
            Handle::Live(_) => {
                Handle::from_prepared(self.config.run(tx, tx.prepare_statement(&self.sql)).await)
            }
            Handle::Failed(cause) => Handle::Failed(cause.clone()),
            Handle::Closed => Handle::Failed(Arc::new(BindError::Closed)),
        };

        match &handle {
            Handle::Failed(cause) => tracing::warn!(
                target: "pgbind.bind",
                tag = ?self.config.tag,
                error = %cause,
                sql = %self.config.log_sql(&self.sql),
                "statement unavailable in transaction"
            ),
            _ => tracing::debug!(
                target: "pgbind.bind",
                tag = ?self.config.tag,
                sql = %self.config.log_sql(&self.sql),
                "re-prepared statement in transaction"
            ),
        }

        Core {
            client: tx,
            sql: self.sql.clone(),
            handle,
            binder: self.binder.clone(),
            config: self.config.clone(),
        }
    }
}

impl<C, A> Core<'_, C, A> {
    fn close(&mut self) {
        if !matches!(self.handle, Handle::Closed) {
            tracing::debug!(
                target: "pgbind.sql",
                tag = ?self.config.tag,
                "closing bound statement"
            );
        }
        self.handle = Handle::Closed;
    }

    fn fmt_fields(&self, name: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(name)
            .field("sql", &self.sql)
            .field("state", &self.handle.state())
            .field("args", &self.binder.args())
            .field("config", &self.config)
            .finish()
    }
}

/// A prepared statement executed for its side effects.
pub struct BoundStmt<'c, C, A> {
    core: Core<'c, C, A>,
}

impl<C, A> fmt::Debug for BoundStmt<'_, C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.core.fmt_fields("BoundStmt", f)
    }
}

impl<'c, C, A> BoundStmt<'c, C, A> {
    pub(crate) fn from_parts(client: &'c C, sql: String, handle: Handle, binder: Binder<A>) -> Self {
        Self {
            core: Core {
                client,
                sql,
                handle,
                binder,
                config: StmtConfig::default(),
            },
        }
    }

    /// Replace the execution settings.
    pub fn with_config(mut self, config: StmtConfig) -> Self {
        self.core.config = config;
        self
    }

    pub fn config(&self) -> &StmtConfig {
        &self.core.config
    }

    /// The SQL that was prepared.
    pub fn sql(&self) -> &str {
        &self.core.sql
    }

    pub fn binder(&self) -> &Binder<A> {
        &self.core.binder
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.core.handle, Handle::Closed)
    }

    /// Release the prepared statement. Later operations fail with
    /// [`BindError::Closed`]; closing again does nothing.
    pub fn close(&mut self) {
        self.core.close();
    }
}

impl<'c, C, A> BoundStmt<'c, C, A>
where
    C: GenericClient,
    A: BindArgs,
{
    /// Execute once with the fields of `arg`, returning the affected row count.
    pub async fn exec(&self, arg: &A) -> BindResult<u64> {
        let core = &self.core;
        let (stmt, params) = core.bind("exec", arg)?;
        core.config
            .run(core.client, core.client.execute_prepared(stmt, &params))
            .await
    }

    /// The same statement, re-prepared on `tx`.
    ///
    /// `self` is left untouched. If re-preparing fails, or `self` is not
    /// usable, the returned statement reports that on first use as
    /// [`BindError::StatementUnavailable`] holding the original error.
    ///
    /// `self` keeps a shared borrow of its client, so `tx` has to live on a
    /// different connection: `Client::transaction` needs `&mut Client`.
    pub async fn in_tx<'t, Tx: GenericClient>(&self, tx: &'t Tx) -> BoundStmt<'t, Tx, A> {
        BoundStmt {
            core: self.core.rebind(tx).await,
        }
    }
}

/// A prepared statement whose rows map to `T`.
///
/// `Ts` is the collection returned by [`BoundQueryStmt::all`].
pub struct BoundQueryStmt<'c, C, A, T, Ts = Vec<T>> {
    core: Core<'c, C, A>,
    _rows: PhantomData<fn() -> (T, Ts)>,
}

impl<C, A, T, Ts> fmt::Debug for BoundQueryStmt<'_, C, A, T, Ts> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.core.fmt_fields("BoundQueryStmt", f)
    }
}

impl<'c, C, A, T, Ts> BoundQueryStmt<'c, C, A, T, Ts> {
    pub(crate) fn from_parts(client: &'c C, sql: String, handle: Handle, binder: Binder<A>) -> Self {
        Self {
            core: BoundStmt::from_parts(client, sql, handle, binder).core,
            _rows: PhantomData,
        }
    }

    /// Replace the execution settings.
    pub fn with_config(mut self, config: StmtConfig) -> Self {
        self.core.config = config;
        self
    }

    pub fn config(&self) -> &StmtConfig {
        &self.core.config
    }

    /// The SQL that was prepared.
    pub fn sql(&self) -> &str {
        &self.core.sql
    }

    pub fn binder(&self) -> &Binder<A> {
        &self.core.binder
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.core.handle, Handle::Closed)
    }

    /// Release the prepared statement. Later operations fail with
    /// [`BindError::Closed`]; closing again does nothing.
    pub fn close(&mut self) {
        self.core.close();
    }
}

impl<'c, C, A, T, Ts> BoundQueryStmt<'c, C, A, T, Ts>
where
    C: GenericClient,
    A: BindArgs,
    T: FromRow,
{
    /// Fetch the first row. No rows is [`BindError::NotFound`].
    pub async fn one(&self, arg: &A) -> BindResult<T> {
        let core = &self.core;
        let (stmt, params) = core.bind("one", arg)?;
        let row = core
            .config
            .run(core.client, core.client.query_one_prepared(stmt, &params))
            .await?;
        T::from_row(&row)
    }

    /// Fetch the first row, if any.
    pub async fn opt(&self, arg: &A) -> BindResult<Option<T>> {
        let core = &self.core;
        let (stmt, params) = core.bind("opt", arg)?;
        let row = core
            .config
            .run(core.client, core.client.query_opt_prepared(stmt, &params))
            .await?;
        row.as_ref().map(T::from_row).transpose()
    }

    /// Fetch every row into `Ts`.
    pub async fn all(&self, arg: &A) -> BindResult<Ts>
    where
        Ts: FromIterator<T>,
    {
        let core = &self.core;
        let (stmt, params) = core.bind("all", arg)?;
        let rows = core
            .config
            .run(core.client, core.client.query_prepared(stmt, &params))
            .await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Stream rows as they arrive.
    ///
    /// The timeout, if any, covers starting the query, not draining the stream.
    pub async fn cursor(&self, arg: &A) -> BindResult<FromRowStream<T>>
    where
        C: StreamingClient,
    {
        let core = &self.core;
        let (stmt, params) = core.bind("cursor", arg)?;
        let rows = core
            .config
            .run(core.client, core.client.query_stream_prepared(stmt, &params))
            .await?;
        Ok(FromRowStream::new(rows))
    }

    /// The same query, re-prepared on `tx`.
    ///
    /// Behaves like [`BoundStmt::in_tx`], including the requirement that `tx`
    /// runs on a different connection than the one `self` borrows.
    pub async fn in_tx<'t, Tx: GenericClient>(
        &self,
        tx: &'t Tx,
    ) -> BoundQueryStmt<'t, Tx, A, T, Ts> {
        BoundQueryStmt {
            core: self.core.rebind(tx).await,
            _rows: PhantomData,
        }
    }
}

/// Render `query`, bind its placeholders to `A`, then prepare it on `client`.
async fn prepare_parts<C, A, Q>(
    client: &C,
    query: &Q,
    cache: &FieldCache,
) -> BindResult<(String, Handle, Binder<A>)>
where
    C: GenericClient,
    A: BindArgs + 'static,
    Q: Render + ?Sized,
{
    let rendered = query.to_rendered()?;
    let binder = Binder::<A>::new(&rendered.placeholders, cache)?;
    let stmt = client.prepare_statement(&rendered.sql).await?;
    tracing::debug!(
        target: "pgbind.bind",
        args = ?binder.args(),
        sql = %rendered.sql,
        "prepared bound statement"
    );
    Ok((rendered.sql, Handle::Live(stmt), binder))
}

/// Prepare `query` on `client` for execution with arguments of type `A`.
pub async fn prepare_bound<'c, A, C, Q>(client: &'c C, query: &Q) -> BindResult<BoundStmt<'c, C, A>>
where
    A: BindArgs + 'static,
    C: GenericClient,
    Q: Render + ?Sized,
{
    prepare_bound_with(client, query, FieldCache::global()).await
}

/// [`prepare_bound`] with an explicit field cache.
pub async fn prepare_bound_with<'c, A, C, Q>(
    client: &'c C,
    query: &Q,
    cache: &FieldCache,
) -> BindResult<BoundStmt<'c, C, A>>
where
    A: BindArgs + 'static,
    C: GenericClient,
    Q: Render + ?Sized,
{
    let (sql, handle, binder) = prepare_parts(client, query, cache).await?;
    Ok(BoundStmt::from_parts(client, sql, handle, binder))
}

/// Prepare a row-returning `query` whose rows map to `T`, collected into `Vec<T>`.
pub async fn prepare_bound_query<'c, A, T, C, Q>(
    client: &'c C,
    query: &Q,
) -> BindResult<BoundQueryStmt<'c, C, A, T>>
where
    A: BindArgs + 'static,
    T: FromRow,
    C: GenericClient,
    Q: Render + ?Sized,
{
    prepare_bound_query_with(client, query, FieldCache::global()).await
}

/// [`prepare_bound_query`] collecting into `Ts` instead of `Vec<T>`.
pub async fn prepare_bound_query_as<'c, A, T, Ts, C, Q>(
    client: &'c C,
    query: &Q,
) -> BindResult<BoundQueryStmt<'c, C, A, T, Ts>>
where
    A: BindArgs + 'static,
    T: FromRow,
    Ts: FromIterator<T>,
    C: GenericClient,
    Q: Render + ?Sized,
{
    prepare_bound_query_with(client, query, FieldCache::global()).await
}

/// [`prepare_bound_query_as`] with an explicit field cache.
pub async fn prepare_bound_query_with<'c, A, T, Ts, C, Q>(
    client: &'c C,
    query: &Q,
    cache: &FieldCache,
) -> BindResult<BoundQueryStmt<'c, C, A, T, Ts>>
where
    A: BindArgs + 'static,
    T: FromRow,
    Ts: FromIterator<T>,
    C: GenericClient,
    Q: Render + ?Sized,
{
    let (sql, handle, binder) = prepare_parts(client, query, cache).await?;
    Ok(BoundQueryStmt::from_parts(client, sql, handle, binder))
}
