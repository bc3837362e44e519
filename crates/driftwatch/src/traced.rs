//! Traced database connection wrapper.
//!
//! Wraps a single sqlx `MySqlConnection` and logs every query via tracing.
//! sqlx's own statement logging is disabled on connect, so these spans are the
//! only record of what was sent.

use sqlx::mysql::{MySqlConnection, MySqlRow};
use sqlx::{Connection, Error};
use tracing::Instrument;

/// A traced connection that owns the underlying connection.
///
/// Connections are never pooled or shared: one `TracedConn` per database,
/// held for the duration of one run.
pub struct TracedConn {
    inner: MySqlConnection,
}

impl TracedConn {
    /// Wrap an established connection.
    pub fn new(conn: MySqlConnection) -> Self {
        Self { inner: conn }
    }

    /// Execute a query with positional `?` parameters, returning all rows.
    pub async fn query<'q>(
        &mut self,
        sql: &'q str,
        params: &[&'q str],
    ) -> Result<Vec<MySqlRow>, Error> {
        let span = tracing::debug_span!(
            "db.query",
            sql = %sql,
            params = params.len(),
            rows = tracing::field::Empty,
        );
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(*param);
        }
        let rows = query
            .fetch_all(&mut self.inner)
            .instrument(span.clone())
            .await?;
        span.record("rows", rows.len());
        Ok(rows)
    }

    /// Execute a query, returning at most one row.
    pub async fn query_opt<'q>(
        &mut self,
        sql: &'q str,
        params: &[&'q str],
    ) -> Result<Option<MySqlRow>, Error> {
        let span = tracing::debug_span!(
            "db.query",
            sql = %sql,
            params = params.len(),
            rows = tracing::field::Empty,
        );
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(*param);
        }
        let row = query
            .fetch_optional(&mut self.inner)
            .instrument(span.clone())
            .await?;
        span.record("rows", if row.is_some() { 1u64 } else { 0u64 });
        Ok(row)
    }

    /// Close the connection gracefully.
    pub async fn close(self) -> Result<(), Error> {
        self.inner
            .close()
            .instrument(tracing::debug_span!("db.close"))
            .await
    }
}
