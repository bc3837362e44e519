//! Markdown documents for CI step summaries and pull-request comments.

use crate::CliError;
use driftwatch::{Comparison, ComparisonResult};
use driftwatch_config::Config;
use jiff::Timestamp;
use std::fmt;

/// First line of every comment body, so glue can find and update a previous comment.
pub const COMMENT_MARKER: &str = "<!-- driftwatch -->";

const TITLE: &str = "## Schema drift check";

/// Summary of a completed comparison.
pub fn summary(config: &Config, comparison: &Comparison, generated_at: Timestamp) -> String {
    Summary {
        config,
        comparison,
        generated_at,
    }
    .to_string()
}

/// Document written instead of [`summary`] when the comparison did not complete.
///
/// `config` is absent when the failure happened while loading it.
pub fn failure(config: Option<&Config>, error: &CliError, generated_at: Timestamp) -> String {
    Failure {
        config,
        error,
        generated_at,
    }
    .to_string()
}

/// Pull-request comment body wrapping a summary or failure document.
pub fn comment(document: &str) -> String {
    format!("{COMMENT_MARKER}\n{document}")
}

struct Summary<'a> {
    config: &'a Config,
    comparison: &'a Comparison,
    generated_at: Timestamp,
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = &self.comparison.result;
        let status = if result.is_in_sync {
            "in sync"
        } else {
            "drift detected"
        };

        writeln!(f, "{TITLE}")?;
        writeln!(f)?;
        writeln!(f, "**Status:** {status}")?;
        writeln!(f)?;
        write!(f, "{}", Targets(self.config))?;
        writeln!(f)?;

        if result.is_in_sync {
            writeln!(
                f,
                "The target has every table, column and index the reference has."
            )?;
        } else {
            write!(f, "{}", Counts(result))?;
            write!(f, "{}", Findings(result))?;

            let sql = &self.comparison.corrective_sql;
            if !sql.is_empty() {
                writeln!(f)?;
                writeln!(
                    f,
                    "<details><summary>Corrective SQL ({} statements, not executed)</summary>",
                    sql.statements.len()
                )?;
                writeln!(f)?;
                writeln!(f, "```sql")?;
                write!(f, "{sql}")?;
                writeln!(f, "```")?;
                writeln!(f)?;
                writeln!(f, "</details>")?;
            }
        }

        writeln!(f)?;
        writeln!(f, "_Generated at {}_", self.generated_at)
    }
}

struct Failure<'a> {
    config: Option<&'a Config>,
    error: &'a CliError,
    generated_at: Timestamp,
}

impl fmt::Display for Failure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{TITLE}")?;
        writeln!(f)?;
        writeln!(f, "**Status:** comparison failed")?;
        writeln!(f)?;
        if let Some(config) = self.config {
            write!(f, "{}", Targets(config))?;
            writeln!(f)?;
        }
        writeln!(
            f,
            "The comparison did not complete, so no drift result is available."
        )?;
        if let Some(side) = self.error.side() {
            writeln!(f, "The failure concerns the **{side}** database.")?;
        }
        writeln!(f)?;
        writeln!(f, "```text")?;
        writeln!(f, "{}", self.error)?;
        writeln!(f, "```")?;
        writeln!(f)?;
        writeln!(f, "_Generated at {}_", self.generated_at)
    }
}

/// Redacted connection targets.
struct Targets<'a>(&'a Config);

impl fmt::Display for Targets<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "- Reference: `{}`", self.0.reference)?;
        writeln!(f, "- Target: `{}`", self.0.target)
    }
}

struct Counts<'a>(&'a ComparisonResult);

impl fmt::Display for Counts<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = self.0.counts();
        writeln!(f, "| Finding | Count |")?;
        writeln!(f, "| --- | ---: |")?;
        writeln!(f, "| Missing tables | {} |", counts.missing_tables)?;
        writeln!(f, "| Missing columns | {} |", counts.missing_columns)?;
        writeln!(f, "| Different columns | {} |", counts.different_columns)?;
        writeln!(f, "| Missing indexes | {} |", counts.missing_indexes)
    }
}

/// One section per non-empty finding category.
struct Findings<'a>(&'a ComparisonResult);

impl Findings<'_> {
    fn heading(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "### {title}")?;
        writeln!(f)
    }
}

impl fmt::Display for Findings<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;

        if !result.missing_tables.is_empty() {
            Self::heading(f, "Missing tables")?;
            for table in &result.missing_tables {
                writeln!(f, "- `{table}`")?;
            }
        }

        if !result.missing_columns.is_empty() {
            Self::heading(f, "Missing columns")?;
            for missing in &result.missing_columns {
                writeln!(
                    f,
                    "- `{}.{}` (`{}`)",
                    missing.table, missing.column.name, missing.column.column_type
                )?;
            }
        }

        if !result.different_columns.is_empty() {
            Self::heading(f, "Different columns")?;
            for different in &result.different_columns {
                writeln!(
                    f,
                    "- `{}.{}`: {}",
                    different.table,
                    different.column.name,
                    different.differences.join("; ")
                )?;
            }
        }

        if !result.missing_indexes.is_empty() {
            Self::heading(f, "Missing indexes")?;
            for index in &result.missing_indexes {
                let unique = if index.unique { " unique" } else { "" };
                writeln!(
                    f,
                    "- `{}.{}` on ({}){}",
                    index.table,
                    index.name,
                    index.columns.join(", "),
                    unique
                )?;
            }
        }

        Ok(())
    }
}
