//! Typed progress events emitted while the differ walks the catalogs.
//!
//! Renderers consume this ordered log directly; nothing scrapes console text.
//!
//! ```ignore
//! let mut events: Vec<DiffEvent> = Vec::new();
//! let result = diff(&mut reference, &mut target, CompareOptions::default(), &mut events).await?;
//! for event in &events {
//!     println!("{event}");
//! }
//! ```

use crate::DriftCounts;
use crate::catalog::Side;
use std::fmt;

/// One step of a comparison, in walk order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffEvent {
    /// A side's base tables were listed.
    TablesListed { side: Side, count: usize },
    /// A reference table is absent from the target; it is not descended into.
    TableMissing { table: String },
    /// A reference column is absent from the target's table.
    ColumnMissing { table: String, column: String },
    /// A column exists on both sides with differing definitions.
    ColumnDiffers {
        table: String,
        column: String,
        differences: Vec<String>,
    },
    /// A reference index name is absent from the target's table.
    IndexMissing { table: String, index: String },
    /// A table present on both sides has been fully compared.
    TableChecked {
        table: String,
        columns: usize,
        indexes: usize,
        drift: usize,
    },
    /// The walk completed.
    Finished { in_sync: bool, counts: DriftCounts },
}

impl fmt::Display for DiffEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffEvent::TablesListed { side, count } => {
                write!(f, "{} database has {} tables", side, count)
            }
            DiffEvent::TableMissing { table } => write!(f, "- table {}", table),
            DiffEvent::ColumnMissing { table, column } => {
                write!(f, "- column {}.{}", table, column)
            }
            DiffEvent::ColumnDiffers {
                table,
                column,
                differences,
            } => write!(f, "~ column {}.{}: {}", table, column, differences.join("; ")),
            DiffEvent::IndexMissing { table, index } => write!(f, "- index {}.{}", table, index),
            DiffEvent::TableChecked {
                table,
                columns,
                indexes,
                drift,
            } => write!(
                f,
                "checked {} ({} columns, {} indexes, {} differences)",
                table, columns, indexes, drift
            ),
            DiffEvent::Finished { in_sync, counts } => {
                if *in_sync {
                    write!(f, "in sync")
                } else {
                    write!(f, "drift: {}", counts)
                }
            }
        }
    }
}

/// Receives progress events.
pub trait EventSink {
    fn emit(&mut self, event: DiffEvent);
}

impl EventSink for Vec<DiffEvent> {
    fn emit(&mut self, event: DiffEvent) {
        self.push(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: DiffEvent) {
        (**self).emit(event);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&mut self, _event: DiffEvent) {}
}

/// Logs every event through `tracing`: findings at `warn`, progress at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: DiffEvent) {
        match &event {
            DiffEvent::TableMissing { .. }
            | DiffEvent::ColumnMissing { .. }
            | DiffEvent::ColumnDiffers { .. }
            | DiffEvent::IndexMissing { .. } => tracing::warn!("{}", event),
            DiffEvent::TableChecked { .. } => tracing::debug!("{}", event),
            DiffEvent::TablesListed { .. } | DiffEvent::Finished { .. } => {
                tracing::info!("{}", event)
            }
        }
    }
}

/// Forwards every event to two sinks.
pub struct Tee<A, B>(pub A, pub B);

impl<A: EventSink, B: EventSink> EventSink for Tee<A, B> {
    fn emit(&mut self, event: DiffEvent) {
        self.0.emit(event.clone());
        self.1.emit(event);
    }
}
