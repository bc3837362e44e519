//! Schema diffing - check that the target has everything the reference has.
//!
//! This is a one-directional structural set difference, not a symmetric diff.
//! The reference is authoritative: tables, columns and indexes that exist only
//! in the target are never reported.
//!
//! ## Walk
//!
//! 1. List tables on both sides.
//! 2. For each reference table, in listing order:
//!    - absent from the target: record a missing table and move on. Its
//!      columns and indexes are implied, not enumerated.
//!    - present: fetch columns and indexes from both sides, then
//!      - look each reference column up *by name* in the target's columns;
//!        absent is a missing column, present runs the column comparator
//!      - look each reference index up *by name* in the target's indexes;
//!        absent is a missing index. Index definitions are not compared.
//! 3. The result is in sync iff all four lists are empty.
//!
//! The walk is sequential, one round-trip at a time, so that event order is
//! deterministic. Any catalog failure aborts the whole comparison.

use crate::catalog::CatalogReader;
use crate::compare::CompareOptions;
use crate::event::{DiffEvent, EventSink};
use crate::{
    ColumnDescriptor, ComparisonResult, DifferentColumn, IndexDescriptor, MissingColumn, Result,
};
use std::collections::{HashMap, HashSet};
use tracing::{Instrument, debug, info_span};

/// Compare `target` against `reference`.
///
/// # Example
///
/// ```ignore
/// let mut events = Vec::new();
/// let result = diff(&mut reference, &mut target, CompareOptions::default(), &mut events).await?;
///
/// if result.is_in_sync {
///     println!("Schemas match!");
/// } else {
///     print!("{}", result);
/// }
/// ```
pub async fn diff<R, T, S>(
    reference: &mut R,
    target: &mut T,
    options: CompareOptions,
    sink: &mut S,
) -> Result<ComparisonResult>
where
    R: CatalogReader,
    T: CatalogReader,
    S: EventSink + ?Sized,
{
    let mut result = ComparisonResult::default();

    let reference_tables = reference.list_tables().await?;
    sink.emit(DiffEvent::TablesListed {
        side: reference.side(),
        count: reference_tables.len(),
    });

    let target_tables = target.list_tables().await?;
    sink.emit(DiffEvent::TablesListed {
        side: target.side(),
        count: target_tables.len(),
    });

    let target_tables: HashSet<&str> = target_tables.iter().map(String::as_str).collect();

    for table in &reference_tables {
        if !target_tables.contains(table.as_str()) {
            debug!(%table, "Table missing from target");
            result.missing_tables.push(table.clone());
            sink.emit(DiffEvent::TableMissing {
                table: table.clone(),
            });
            continue;
        }

        let span = info_span!("diff_table", %table);
        let snapshot = async {
            Ok::<_, crate::Error>(TablePair {
                reference_columns: reference.columns(table).await?,
                target_columns: target.columns(table).await?,
                reference_indexes: reference.indexes(table).await?,
                target_indexes: target.indexes(table).await?,
            })
        }
        .instrument(span)
        .await?;

        let drift = snapshot.diff_into(table, options, &mut result, sink);

        sink.emit(DiffEvent::TableChecked {
            table: table.clone(),
            columns: snapshot.reference_columns.len(),
            indexes: snapshot.reference_indexes.len(),
            drift,
        });
    }

    result.update_sync_flag();
    sink.emit(DiffEvent::Finished {
        in_sync: result.is_in_sync,
        counts: result.counts(),
    });

    Ok(result)
}

/// Both sides of one table present in both databases.
struct TablePair {
    reference_columns: Vec<ColumnDescriptor>,
    target_columns: Vec<ColumnDescriptor>,
    reference_indexes: Vec<IndexDescriptor>,
    target_indexes: Vec<IndexDescriptor>,
}

impl TablePair {
    /// Append this table's findings to `result`, returning how many there were.
    fn diff_into<S: EventSink + ?Sized>(
        &self,
        table: &str,
        options: CompareOptions,
        result: &mut ComparisonResult,
        sink: &mut S,
    ) -> usize {
        let mut drift = 0;

        let target_columns: HashMap<&str, &ColumnDescriptor> = self
            .target_columns
            .iter()
            .map(|c| (c.name.as_str(), c))
            .collect();

        for column in &self.reference_columns {
            match target_columns.get(column.name.as_str()) {
                None => {
                    drift += 1;
                    result.missing_columns.push(MissingColumn {
                        table: table.to_string(),
                        column: column.clone(),
                    });
                    sink.emit(DiffEvent::ColumnMissing {
                        table: table.to_string(),
                        column: column.name.clone(),
                    });
                }
                Some(target_column) => {
                    let differences = options.compare(column, target_column);
                    if differences.is_empty() {
                        continue;
                    }
                    drift += 1;
                    sink.emit(DiffEvent::ColumnDiffers {
                        table: table.to_string(),
                        column: column.name.clone(),
                        differences: differences.clone(),
                    });
                    result.different_columns.push(DifferentColumn {
                        table: table.to_string(),
                        column: column.clone(),
                        differences,
                    });
                }
            }
        }

        let target_indexes: HashSet<&str> = self
            .target_indexes
            .iter()
            .map(|idx| idx.name.as_str())
            .collect();

        for index in &self.reference_indexes {
            if !target_indexes.contains(index.name.as_str()) {
                drift += 1;
                result.missing_indexes.push(index.clone());
                sink.emit(DiffEvent::IndexMissing {
                    table: table.to_string(),
                    index: index.name.clone(),
                });
            }
        }

        drift
    }
}
