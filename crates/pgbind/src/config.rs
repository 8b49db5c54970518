//! Per-statement execution settings.

use crate::client::GenericClient;
use crate::error::{BindError, BindResult};
use std::borrow::Cow;
use std::future::Future;
use std::time::Duration;

/// Settings applied to every execution of a bound statement.
#[derive(Debug, Clone)]
pub struct StmtConfig {
    /// Label attached to tracing events.
    pub tag: Option<String>,
    /// Upper bound on each database call. `None` waits indefinitely.
    pub query_timeout: Option<Duration>,
    /// Truncate logged SQL (in bytes). `None` means no truncation.
    pub max_sql_log_length: Option<usize>,
}

impl Default for StmtConfig {
    fn default() -> Self {
        Self {
            tag: None,
            query_timeout: None,
            max_sql_log_length: Some(200),
        }
    }
}

impl StmtConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tracing tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Set the query timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Set maximum SQL length to log.
    pub fn max_sql_log_length(mut self, len: usize) -> Self {
        self.max_sql_log_length = Some(len);
        self
    }

    /// Disable SQL truncation in logs.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_log_length = None;
        self
    }

    pub(crate) fn log_sql<'s>(&self, sql: &'s str) -> Cow<'s, str> {
        match self.max_sql_log_length {
            Some(max) if sql.len() > max => {
                Cow::Owned(format!("{}...", truncate_sql_bytes(sql, max)))
            }
            _ => Cow::Borrowed(sql),
        }
    }

    /// Run `future` under the configured timeout.
    ///
    /// On expiry the in-flight query is cancelled through `client`'s cancel
    /// token, if it has one, and the call fails with [`BindError::Timeout`].
    pub(crate) async fn run<C, T, F>(&self, client: &C, future: F) -> BindResult<T>
    where
        C: GenericClient + ?Sized,
        F: Future<Output = BindResult<T>> + Send,
    {
        match self.query_timeout {
            Some(timeout) => tokio::time::timeout(timeout, future).await.map_err(|_| {
                if let Some(cancel_token) = client.cancel_token() {
                    tokio::spawn(async move {
                        let _ = cancel_token.cancel_query(tokio_postgres::NoTls).await;
                    });
                }
                BindError::Timeout(timeout)
            })?,
            None => future.await,
        }
    }
}

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
