//! Read-only structural introspection of one database.
//!
//! [`CatalogReader`] is the seam between the differ and the database: the
//! differ only ever talks to two readers, one per [`Side`]. The MySQL
//! implementation lives in [`crate::mysql`].

use crate::{ColumnDescriptor, IndexDescriptor, Result};
use std::fmt;

/// Which of the two databases something concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The source of truth
    Reference,
    /// The database checked for completeness
    Target,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Reference => "reference",
            Side::Target => "target",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog read, for error context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogOperation {
    ListTables,
    CreateStatement { table: String },
    Columns { table: String },
    Indexes { table: String },
}

impl fmt::Display for CatalogOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogOperation::ListTables => write!(f, "list tables"),
            CatalogOperation::CreateStatement { table } => {
                write!(f, "create statement of `{}`", table)
            }
            CatalogOperation::Columns { table } => write!(f, "columns of `{}`", table),
            CatalogOperation::Indexes { table } => write!(f, "indexes of `{}`", table),
        }
    }
}

/// Read-only access to one database's catalog.
///
/// Every call is an independent round-trip; implementations must not cache.
#[allow(async_fn_in_trait)]
pub trait CatalogReader {
    /// Which side this reader is attached to.
    fn side(&self) -> Side;

    /// Every base table (never views) in the current database, ascending by name.
    async fn list_tables(&mut self) -> Result<Vec<String>>;

    /// The engine's full `CREATE TABLE` text for one table.
    async fn create_statement(&mut self, table: &str) -> Result<String>;

    /// Columns of one table of the current database, in ordinal order.
    async fn columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>>;

    /// Non-primary indexes of one table, each with its columns in key order.
    async fn indexes(&mut self, table: &str) -> Result<Vec<IndexDescriptor>>;
}
