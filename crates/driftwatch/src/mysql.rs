//! MySQL catalog reader.
//!
//! Reads `information_schema` scoped to `DATABASE()`, so same-named tables in
//! other schemas on the same server never leak into a snapshot.
//!
//! String columns are `CAST(... AS CHAR)` in the queries: depending on the
//! server version, several `information_schema` columns come back as binary
//! strings, which would otherwise not decode as `String`.

use crate::catalog::{CatalogOperation, CatalogReader, Side};
use crate::traced::TracedConn;
use crate::{ColumnDescriptor, Error, IndexDescriptor, Result};
use driftwatch_config::DatabaseConfig;
use indexmap::IndexMap;
use sqlx::mysql::{MySqlConnectOptions, MySqlRow, MySqlSslMode};
use sqlx::{ConnectOptions, Row};
use tracing::{debug, info, warn};

const LIST_TABLES_SQL: &str = "SELECT CAST(TABLE_NAME AS CHAR) AS table_name
    FROM information_schema.TABLES
    WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE'
    ORDER BY TABLE_NAME";

const COLUMNS_SQL: &str = "SELECT CAST(COLUMN_NAME AS CHAR) AS column_name,
        CAST(COLUMN_TYPE AS CHAR) AS column_type,
        CAST(IS_NULLABLE AS CHAR) AS is_nullable,
        CAST(COLUMN_DEFAULT AS CHAR) AS column_default,
        CAST(EXTRA AS CHAR) AS extra,
        CAST(COLUMN_KEY AS CHAR) AS column_key,
        CAST(CHARACTER_MAXIMUM_LENGTH AS UNSIGNED) AS max_length,
        CAST(NUMERIC_PRECISION AS UNSIGNED) AS numeric_precision,
        CAST(NUMERIC_SCALE AS UNSIGNED) AS numeric_scale
    FROM information_schema.COLUMNS
    WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
    ORDER BY ORDINAL_POSITION";

// One row per (index, column) pair.
const INDEXES_SQL: &str = "SELECT CAST(INDEX_NAME AS CHAR) AS index_name,
        CAST(COLUMN_NAME AS CHAR) AS column_name,
        CAST(NON_UNIQUE AS SIGNED) AS non_unique
    FROM information_schema.STATISTICS
    WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND INDEX_NAME <> 'PRIMARY'
    ORDER BY INDEX_NAME, SEQ_IN_INDEX";

const PRIMARY_INDEX: &str = "PRIMARY";

/// Build connect options for one side.
///
/// TLS: `ssl = false` disables it, `ssl = true` requires it, and a supplied CA
/// additionally verifies the server certificate against that CA.
pub fn connect_options(config: &DatabaseConfig) -> MySqlConnectOptions {
    let options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database);

    let options = match (config.ssl, &config.ssl_ca) {
        (false, _) => options.ssl_mode(MySqlSslMode::Disabled),
        (true, None) => options.ssl_mode(MySqlSslMode::Required),
        (true, Some(ca)) => options
            .ssl_mode(MySqlSslMode::VerifyCa)
            .ssl_ca_from_pem(ca.as_bytes().to_vec()),
    };

    options.disable_statement_logging()
}

/// A [`CatalogReader`] over one exclusively-owned MySQL connection.
pub struct MySqlCatalog {
    side: Side,
    /// Redacted connection target, for errors
    target: String,
    conn: TracedConn,
}

impl MySqlCatalog {
    /// Open a session to one database.
    pub async fn connect(side: Side, config: &DatabaseConfig) -> Result<Self> {
        let target = config.to_string();
        info!(%side, %target, "Connecting");
        let conn = connect_options(config)
            .connect()
            .await
            .map_err(|source| Error::Connection {
                side,
                target: target.clone(),
                source,
            })?;
        debug!(%side, "Connected");

        Ok(Self {
            side,
            target,
            conn: TracedConn::new(conn),
        })
    }

    fn on_error(
        &self,
        operation: CatalogOperation,
    ) -> impl FnOnce(sqlx::Error) -> Error + use<> {
        query_error(self.side, self.target.clone(), operation)
    }

    /// Release the connection. Failures are logged, not returned.
    pub async fn close(self) {
        let side = self.side;
        match self.conn.close().await {
            Ok(()) => debug!(%side, "Connection closed"),
            Err(e) => warn!(%side, error = %e, "Failed to close connection cleanly"),
        }
    }
}

/// Classify a failed catalog read.
///
/// Transport failures mean the session is unusable and surface as
/// [`Error::Connection`]; everything else is a failed query.
pub fn catalog_error(
    side: Side,
    target: &str,
    operation: CatalogOperation,
    source: sqlx::Error,
) -> Error {
    match source {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => Error::Connection {
            side,
            target: target.to_string(),
            source,
        },
        source => Error::CatalogQuery {
            side,
            operation,
            source,
        },
    }
}

fn query_error(
    side: Side,
    target: String,
    operation: CatalogOperation,
) -> impl FnOnce(sqlx::Error) -> Error {
    move |source| catalog_error(side, &target, operation, source)
}

impl CatalogReader for MySqlCatalog {
    fn side(&self) -> Side {
        self.side
    }

    async fn list_tables(&mut self) -> Result<Vec<String>> {
        let on_error = self.on_error(CatalogOperation::ListTables);
        let rows = self
            .conn
            .query(LIST_TABLES_SQL, &[])
            .await
            .map_err(on_error)?;

        let on_error = self.on_error(CatalogOperation::ListTables);
        rows.iter()
            .map(|row| row.try_get::<String, _>("table_name"))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(on_error)
    }

    async fn create_statement(&mut self, table: &str) -> Result<String> {
        let operation = CatalogOperation::CreateStatement {
            table: table.to_string(),
        };
        let sql = format!("SHOW CREATE TABLE {}", crate::emit::Ident(table));

        let on_error = self.on_error(operation.clone());
        let row = self.conn.query_opt(&sql, &[]).await.map_err(on_error)?;

        let on_error = self.on_error(operation);
        match row {
            Some(row) => text_at(&row, 1).map_err(on_error),
            None => Err(on_error(sqlx::Error::RowNotFound)),
        }
    }

    async fn columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let operation = CatalogOperation::Columns {
            table: table.to_string(),
        };

        let on_error = self.on_error(operation.clone());
        let rows = self
            .conn
            .query(COLUMNS_SQL, &[table])
            .await
            .map_err(on_error)?;

        let on_error = self.on_error(operation);
        rows.iter()
            .map(decode_column)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(on_error)
    }

    async fn indexes(&mut self, table: &str) -> Result<Vec<IndexDescriptor>> {
        let operation = CatalogOperation::Indexes {
            table: table.to_string(),
        };

        let on_error = self.on_error(operation.clone());
        let rows = self
            .conn
            .query(INDEXES_SQL, &[table])
            .await
            .map_err(on_error)?;

        let on_error = self.on_error(operation);
        let rows = rows
            .iter()
            .map(decode_index_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(on_error)?;

        Ok(group_index_rows(table, rows))
    }
}

/// One row of `information_schema.STATISTICS`: one column of one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRow {
    pub index_name: String,
    /// `None` for functional key parts
    pub column_name: Option<String>,
    pub non_unique: bool,
}

impl IndexRow {
    pub fn new(index_name: &str, column_name: &str, non_unique: bool) -> Self {
        Self {
            index_name: index_name.to_string(),
            column_name: Some(column_name.to_string()),
            non_unique,
        }
    }
}

/// Group per-column statistics rows into one descriptor per index.
///
/// Indexes appear in the order their first row is encountered, and each
/// index's columns keep row order (the query sorts by key position).
/// `PRIMARY` rows are dropped regardless of what the query filtered.
pub fn group_index_rows(
    table: &str,
    rows: impl IntoIterator<Item = IndexRow>,
) -> Vec<IndexDescriptor> {
    let mut grouped: IndexMap<String, IndexDescriptor> = IndexMap::new();

    for row in rows {
        if row.index_name == PRIMARY_INDEX {
            continue;
        }

        let index = grouped
            .entry(row.index_name.clone())
            .or_insert_with(|| IndexDescriptor {
                name: row.index_name.clone(),
                table: table.to_string(),
                columns: Vec::new(),
                unique: !row.non_unique,
            });

        if let Some(column) = row.column_name {
            index.columns.push(column);
        }
    }

    grouped.into_values().collect()
}

fn decode_column(row: &MySqlRow) -> std::result::Result<ColumnDescriptor, sqlx::Error> {
    let nullable: String = row.try_get("is_nullable")?;

    Ok(ColumnDescriptor {
        name: row.try_get("column_name")?,
        column_type: row.try_get("column_type")?,
        nullable: nullable.eq_ignore_ascii_case("YES"),
        default_value: row.try_get("column_default")?,
        extra: row.try_get::<Option<String>, _>("extra")?.unwrap_or_default(),
        key_type: row
            .try_get::<Option<String>, _>("column_key")?
            .unwrap_or_default(),
        max_length: row.try_get("max_length")?,
        numeric_precision: row.try_get("numeric_precision")?,
        numeric_scale: row.try_get("numeric_scale")?,
    })
}

fn decode_index_row(row: &MySqlRow) -> std::result::Result<IndexRow, sqlx::Error> {
    let non_unique: i64 = row.try_get("non_unique")?;

    Ok(IndexRow {
        index_name: row.try_get("index_name")?,
        column_name: row.try_get("column_name")?,
        non_unique: non_unique != 0,
    })
}

/// Decode a text column that some servers report as a binary string.
fn text_at(row: &MySqlRow, index: usize) -> std::result::Result<String, sqlx::Error> {
    match row.try_get::<String, _>(index) {
        Ok(text) => Ok(text),
        Err(_) => {
            let bytes: Vec<u8> = row.try_get(index)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}
