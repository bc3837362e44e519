//! Corrective SQL generation.
//!
//! Turns findings into advisory statements for a human to review. Nothing
//! here executes SQL.
//!
//! Default values and `extra` modifiers are interpolated exactly as the catalog
//! reported them (expressions included), without quoting.

use crate::catalog::CatalogReader;
use crate::{ColumnDescriptor, ComparisonResult, IndexDescriptor, Result};
use facet::Facet;
use std::fmt;

/// A MySQL identifier wrapper.
///
/// Display writes the value quoted with backticks, doubling embedded backticks.
///
/// # Example
/// ```
/// use driftwatch::Ident;
/// assert_eq!(format!("{}", Ident("user")), "`user`");
/// assert_eq!(format!("{}", Ident("we`ird")), "`we``ird`");
/// ```
pub struct Ident<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> fmt::Display for Ident<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`")?;
        for c in self.0.as_ref().chars() {
            if c == '`' {
                write!(f, "``")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "`")
    }
}

/// Column definition as used by `ADD COLUMN` / `MODIFY COLUMN`.
///
/// Produces `` `name` type [NOT NULL] [DEFAULT default] [extra] ``.
pub fn column_definition(column: &ColumnDescriptor) -> String {
    let mut def = format!("{} {}", Ident(&column.name), column.column_type);

    if !column.nullable {
        def.push_str(" NOT NULL");
    }

    if let Some(default) = &column.default_value {
        def.push_str(&format!(" DEFAULT {}", default));
    }

    if !column.extra.is_empty() {
        def.push_str(&format!(" {}", column.extra));
    }

    def
}

/// `ALTER TABLE ... ADD COLUMN ...;` for a column missing from the target.
pub fn add_column_sql(table: &str, column: &ColumnDescriptor) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {};",
        Ident(table),
        column_definition(column)
    )
}

/// `ALTER TABLE ... MODIFY COLUMN ...;` bringing a differing column in line with the reference.
pub fn modify_column_sql(table: &str, column: &ColumnDescriptor) -> String {
    format!(
        "ALTER TABLE {} MODIFY COLUMN {};",
        Ident(table),
        column_definition(column)
    )
}

/// `CREATE [UNIQUE] INDEX ... ON ... (...);` for an index missing from the target.
pub fn create_index_sql(index: &IndexDescriptor) -> String {
    let unique = if index.unique { "UNIQUE " } else { "" };
    let columns: Vec<String> = index.columns.iter().map(|c| Ident(c).to_string()).collect();
    format!(
        "CREATE {}INDEX {} ON {} ({});",
        unique,
        Ident(&index.name),
        Ident(&index.table),
        columns.join(", ")
    )
}

/// The reference's native DDL for a missing table, used verbatim.
pub fn create_table_sql(ddl: &str) -> String {
    let ddl = ddl.trim_end();
    if ddl.ends_with(';') {
        ddl.to_string()
    } else {
        format!("{};", ddl)
    }
}

/// One advisory statement and the finding it addresses.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Short description of the finding, e.g. `missing column users.email`
    pub finding: String,
    pub sql: String,
}

/// The full advisory script for one comparison.
#[derive(Facet, Debug, Clone, PartialEq, Eq, Default)]
pub struct CorrectiveSql {
    pub statements: Vec<Statement>,
}

impl CorrectiveSql {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Statements for everything except missing tables, which need the
    /// reference's DDL (see [`corrective_sql`]).
    pub fn from_result(result: &ComparisonResult) -> Self {
        let mut statements = Vec::new();

        for missing in &result.missing_columns {
            statements.push(Statement {
                finding: format!("missing column {}.{}", missing.table, missing.column.name),
                sql: add_column_sql(&missing.table, &missing.column),
            });
        }

        for different in &result.different_columns {
            statements.push(Statement {
                finding: format!(
                    "different column {}.{} ({})",
                    different.table,
                    different.column.name,
                    different.differences.join("; ")
                ),
                sql: modify_column_sql(&different.table, &different.column),
            });
        }

        for index in &result.missing_indexes {
            statements.push(Statement {
                finding: format!("missing index {}.{}", index.table, index.name),
                sql: create_index_sql(index),
            });
        }

        Self { statements }
    }
}

impl fmt::Display for CorrectiveSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, statement) in self.statements.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "-- {}", statement.finding)?;
            writeln!(f, "{}", statement.sql)?;
        }
        Ok(())
    }
}

/// Build the full advisory script: missing tables first (DDL fetched from the
/// reference), then missing columns, differing columns and missing indexes.
pub async fn corrective_sql<R: CatalogReader>(
    result: &ComparisonResult,
    reference: &mut R,
) -> Result<CorrectiveSql> {
    let mut statements = Vec::with_capacity(result.missing_tables.len());

    for table in &result.missing_tables {
        let ddl = reference.create_statement(table).await?;
        statements.push(Statement {
            finding: format!("missing table {}", table),
            sql: create_table_sql(&ddl),
        });
    }

    statements.extend(CorrectiveSql::from_result(result).statements);

    Ok(CorrectiveSql { statements })
}
