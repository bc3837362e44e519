//! GitHub Actions step outputs and file hand-offs.

use driftwatch::{ComparisonResult, DriftCounts};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Env var naming the file step outputs are appended to.
pub const GITHUB_OUTPUT: &str = "GITHUB_OUTPUT";

/// Env var naming the file the job summary markdown is appended to.
pub const GITHUB_STEP_SUMMARY: &str = "GITHUB_STEP_SUMMARY";

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    InSync,
    Drift,
    Failed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::InSync => "in-sync",
            Status::Drift => "drift",
            Status::Failed => "failed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named step outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outputs {
    pub status: Status,
    /// Absent when the comparison failed.
    pub counts: Option<DriftCounts>,
}

impl Outputs {
    pub fn from_result(result: &ComparisonResult) -> Self {
        Self {
            status: if result.is_in_sync {
                Status::InSync
            } else {
                Status::Drift
            },
            counts: Some(result.counts()),
        }
    }

    pub fn failed() -> Self {
        Self {
            status: Status::Failed,
            counts: None,
        }
    }
}

/// `key=value` lines in the `GITHUB_OUTPUT` format.
impl fmt::Display for Outputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "in_sync={}", self.status == Status::InSync)?;
        if let Some(counts) = &self.counts {
            writeln!(f, "missing_tables={}", counts.missing_tables)?;
            writeln!(f, "missing_columns={}", counts.missing_columns)?;
            writeln!(f, "different_columns={}", counts.different_columns)?;
            writeln!(f, "missing_indexes={}", counts.missing_indexes)?;
        }
        writeln!(f, "status={}", self.status)
    }
}

/// Append `contents` to `path`, creating it if needed.
pub fn append(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(contents.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftwatch::MissingColumn;

    #[test]
    fn test_in_sync_outputs() {
        let result = ComparisonResult {
            is_in_sync: true,
            ..Default::default()
        };
        insta::assert_snapshot!(Outputs::from_result(&result).to_string(), @r"
        in_sync=true
        missing_tables=0
        missing_columns=0
        different_columns=0
        missing_indexes=0
        status=in-sync
        ");
    }

    #[test]
    fn test_drift_outputs() {
        let result = ComparisonResult {
            is_in_sync: false,
            missing_tables: vec!["orders".to_string(), "tags".to_string()],
            missing_columns: vec![MissingColumn {
                table: "users".to_string(),
                column: driftwatch::ColumnDescriptor::new("age", "int"),
            }],
            ..Default::default()
        };
        insta::assert_snapshot!(Outputs::from_result(&result).to_string(), @r"
        in_sync=false
        missing_tables=2
        missing_columns=1
        different_columns=0
        missing_indexes=0
        status=drift
        ");
    }

    #[test]
    fn test_failed_outputs() {
        assert_eq!(
            Outputs::failed().to_string(),
            "in_sync=false\nstatus=failed\n"
        );
    }

    #[test]
    fn test_append_accumulates() {
        let path = std::env::temp_dir().join(format!(
            "driftwatch-outputs-{}-{}",
            std::process::id(),
            line!()
        ));
        let _ = std::fs::remove_file(&path);

        append(&path, "a=1\n").unwrap();
        append(&path, "b=2\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a=1\nb=2\n");

        std::fs::remove_file(&path).unwrap();
    }
}
