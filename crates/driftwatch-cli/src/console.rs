//! Coloured console report, written live from the differ's event log.

use driftwatch::{DiffEvent, EventSink};
use owo_colors::OwoColorize;
use std::io::Write;

#[derive(Debug, Clone, Copy)]
enum Tone {
    Dim,
    Good,
    Warn,
    Bad,
}

fn paint(text: &str, tone: Tone, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    match tone {
        Tone::Dim => text.dimmed().to_string(),
        Tone::Good => text.green().to_string(),
        Tone::Warn => text.yellow().to_string(),
        Tone::Bad => text.red().to_string(),
    }
}

/// One console line per event.
pub fn render_event(event: &DiffEvent, color: bool) -> String {
    match event {
        DiffEvent::TablesListed { side, count } => {
            paint(&format!("{side} database: {count} tables"), Tone::Dim, color)
        }
        DiffEvent::TableMissing { table } => paint(
            &format!("  ✗ table {table} is missing from target"),
            Tone::Bad,
            color,
        ),
        DiffEvent::ColumnMissing { table, column } => paint(
            &format!("  ✗ column {table}.{column} is missing from target"),
            Tone::Bad,
            color,
        ),
        DiffEvent::ColumnDiffers {
            table,
            column,
            differences,
        } => paint(
            &format!("  ~ column {table}.{column}: {}", differences.join("; ")),
            Tone::Warn,
            color,
        ),
        DiffEvent::IndexMissing { table, index } => paint(
            &format!("  ✗ index {table}.{index} is missing from target"),
            Tone::Bad,
            color,
        ),
        DiffEvent::TableChecked {
            table,
            columns,
            indexes,
            drift: 0,
        } => paint(
            &format!("  ✓ {table} ({columns} columns, {indexes} indexes)"),
            Tone::Good,
            color,
        ),
        DiffEvent::TableChecked { table, drift, .. } => paint(
            &format!("  ! {table}: {drift} differences"),
            Tone::Warn,
            color,
        ),
        DiffEvent::Finished { in_sync: true, .. } => {
            paint("Schemas are in sync.", Tone::Good, color)
        }
        DiffEvent::Finished { counts, .. } => {
            paint(&format!("Drift detected: {counts}"), Tone::Warn, color)
        }
    }
}

/// Writes each event to `out` as it arrives.
pub struct ConsoleSink<W> {
    out: W,
    color: bool,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }
}

impl<W: Write> EventSink for ConsoleSink<W> {
    fn emit(&mut self, event: DiffEvent) {
        // A closed stdout should not abort the comparison.
        let _ = writeln!(self.out, "{}", render_event(&event, self.color));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftwatch::{DriftCounts, Side};

    #[test]
    fn test_plain_lines() {
        let events = vec![
            DiffEvent::TablesListed {
                side: Side::Reference,
                count: 2,
            },
            DiffEvent::TableMissing {
                table: "orders".to_string(),
            },
            DiffEvent::ColumnDiffers {
                table: "users".to_string(),
                column: "age".to_string(),
                differences: vec!["type: 'int(10)' → 'int(11)'".to_string()],
            },
            DiffEvent::TableChecked {
                table: "users".to_string(),
                columns: 3,
                indexes: 1,
                drift: 1,
            },
            DiffEvent::TableChecked {
                table: "tags".to_string(),
                columns: 2,
                indexes: 0,
                drift: 0,
            },
        ];

        let mut out = Vec::new();
        let mut sink = ConsoleSink::new(&mut out, false);
        for event in events {
            sink.emit(event);
        }

        let text = String::from_utf8(out).unwrap();
        insta::assert_snapshot!(text, @r"
        reference database: 2 tables
          ✗ table orders is missing from target
          ~ column users.age: type: 'int(10)' → 'int(11)'
          ! users: 1 differences
          ✓ tags (2 columns, 0 indexes)
        ");
    }

    #[test]
    fn test_finished_line() {
        let counts = DriftCounts {
            missing_tables: 1,
            ..Default::default()
        };
        let line = render_event(
            &DiffEvent::Finished {
                in_sync: false,
                counts,
            },
            false,
        );
        assert!(line.starts_with("Drift detected: "));

        let line = render_event(
            &DiffEvent::Finished {
                in_sync: true,
                counts: DriftCounts::default(),
            },
            false,
        );
        assert_eq!(line, "Schemas are in sync.");
    }

    #[test]
    fn test_color_adds_escapes() {
        let event = DiffEvent::TableMissing {
            table: "orders".to_string(),
        };
        assert!(render_event(&event, true).contains('\u{1b}'));
        assert!(!render_event(&event, false).contains('\u{1b}'));
    }
}
