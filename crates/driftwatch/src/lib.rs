//! MySQL schema drift detection.
//!
//! driftwatch compares the schema of two MySQL databases, a *reference* (the
//! source of truth) and a *target*, and reports what the target is missing:
//!
//! - tables present in the reference but absent from the target
//! - columns absent from a same-named target table
//! - columns whose type, nullability, default or extra modifiers differ
//! - secondary indexes absent (by name) from a same-named target table
//!
//! The comparison is one-directional: anything that exists only in the target
//! is never reported. Findings come back as a [`ComparisonResult`] and can be
//! turned into advisory corrective SQL with [`corrective_sql`]. Nothing is ever
//! executed against either database.
//!
//! ```ignore
//! let config = driftwatch_config::Config::from_env()?;
//! let comparison = driftwatch::compare_databases(&config, &mut driftwatch::TracingSink).await?;
//!
//! print!("{}", comparison.result);
//! print!("{}", comparison.corrective_sql);
//! ```

pub mod catalog;
pub mod compare;
mod diff;
mod emit;
mod error;
pub mod event;
mod model;
pub mod mysql;
mod traced;

pub use catalog::{CatalogOperation, CatalogReader, Side};
pub use compare::{CompareOptions, compare_columns, normalize_type};
pub use diff::diff;
pub use emit::{
    CorrectiveSql, Ident, Statement, add_column_sql, column_definition, corrective_sql,
    create_index_sql, create_table_sql, modify_column_sql,
};
pub use error::Error;
pub use event::{DiffEvent, EventSink, NoopSink, Tee, TracingSink};
pub use model::{
    ColumnDescriptor, ComparisonResult, DifferentColumn, DriftCounts, IndexDescriptor,
    MissingColumn,
};
pub use mysql::MySqlCatalog;
pub use traced::TracedConn;

use driftwatch_config::Config;
use facet::Facet;
use tracing::info;

/// Result type for driftwatch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything one run produces.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub result: ComparisonResult,
    pub corrective_sql: CorrectiveSql,
}

/// Diff two already-open catalogs and build the corrective script.
pub async fn run<R, T, S>(
    reference: &mut R,
    target: &mut T,
    options: CompareOptions,
    sink: &mut S,
) -> Result<Comparison>
where
    R: CatalogReader,
    T: CatalogReader,
    S: EventSink + ?Sized,
{
    let result = diff(reference, target, options, sink).await?;
    let corrective_sql = corrective_sql(&result, reference).await?;
    Ok(Comparison {
        result,
        corrective_sql,
    })
}

/// Connect to both databases, compare them, and release both connections.
///
/// Connections are closed on every path, including when the target cannot be
/// reached or a catalog query fails midway.
pub async fn compare_databases<S>(config: &Config, sink: &mut S) -> Result<Comparison>
where
    S: EventSink + ?Sized,
{
    let options = CompareOptions {
        normalize_types: config.normalize_types,
    };

    let mut reference = MySqlCatalog::connect(Side::Reference, &config.reference).await?;
    let mut target = match MySqlCatalog::connect(Side::Target, &config.target).await {
        Ok(target) => target,
        Err(e) => {
            reference.close().await;
            return Err(e);
        }
    };

    let outcome = run(&mut reference, &mut target, options, sink).await;

    reference.close().await;
    target.close().await;

    if let Ok(comparison) = &outcome {
        info!(
            in_sync = comparison.result.is_in_sync,
            statements = comparison.corrective_sql.statements.len(),
            "Comparison complete"
        );
    }

    outcome
}
