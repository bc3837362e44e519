//! Structural snapshots read from a catalog, and the result of comparing two of them.
//!
//! Everything here is a read-only snapshot built fresh on each run. Nothing is
//! persisted.

use facet::Facet;
use std::fmt;

/// One column of one table, as the catalog reports it.
#[derive(Facet, Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnDescriptor {
    /// Column name, unique within its table
    pub name: String,
    /// Canonical type signature including qualifiers, e.g. `varchar(255)`
    pub column_type: String,
    /// Whether NULL is permitted (`IS_NULLABLE = 'YES'`)
    pub nullable: bool,
    /// Default value; `None` means "no default", distinct from `Some("")`
    pub default_value: Option<String>,
    /// Engine-specific modifiers, e.g. `auto_increment`; empty means none
    pub extra: String,
    /// Key membership marker (`PRI`, `UNI`, `MUL`), informational only
    pub key_type: String,
    /// Informational, folded into `column_type`
    pub max_length: Option<u64>,
    /// Informational, folded into `column_type`
    pub numeric_precision: Option<u64>,
    /// Informational, folded into `column_type`
    pub numeric_scale: Option<u64>,
}

impl ColumnDescriptor {
    /// A nullable column with no default and no extra modifiers.
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            nullable: true,
            ..Default::default()
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default_value = Some(default.into());
        self
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = extra.into();
        self
    }

    /// The catalog's spelling of the nullability flag.
    pub fn nullable_flag(&self) -> &'static str {
        if self.nullable { "YES" } else { "NO" }
    }
}

/// A non-primary index.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct IndexDescriptor {
    /// Index name, unique within its table
    pub name: String,
    /// Owning table
    pub table: String,
    /// Participating columns in index-key order
    pub columns: Vec<String>,
    /// Whether the index enforces uniqueness
    pub unique: bool,
}

impl IndexDescriptor {
    pub fn new(
        table: impl Into<String>,
        name: impl Into<String>,
        columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// A reference column whose name is absent from the target's same-named table.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct MissingColumn {
    pub table: String,
    pub column: ColumnDescriptor,
}

/// A column present on both sides whose definitions differ.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct DifferentColumn {
    pub table: String,
    /// The reference side's descriptor
    pub column: ColumnDescriptor,
    /// Difference notes, in comparison order
    pub differences: Vec<String>,
}

/// What the target is missing relative to the reference.
///
/// All lists follow the walk order: reference tables in listing order, and
/// within a table, columns in ordinal order and indexes in catalog order.
#[derive(Facet, Debug, Clone, PartialEq, Eq, Default)]
pub struct ComparisonResult {
    /// True iff all four lists are empty
    pub is_in_sync: bool,
    pub missing_tables: Vec<String>,
    pub missing_columns: Vec<MissingColumn>,
    pub different_columns: Vec<DifferentColumn>,
    pub missing_indexes: Vec<IndexDescriptor>,
}

impl ComparisonResult {
    /// Number of findings in each category.
    pub fn counts(&self) -> DriftCounts {
        DriftCounts {
            missing_tables: self.missing_tables.len(),
            missing_columns: self.missing_columns.len(),
            different_columns: self.different_columns.len(),
            missing_indexes: self.missing_indexes.len(),
        }
    }

    pub(crate) fn update_sync_flag(&mut self) {
        self.is_in_sync = self.counts().total() == 0;
    }
}

/// Finding counts per category, exposed as CI outputs.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriftCounts {
    pub missing_tables: usize,
    pub missing_columns: usize,
    pub different_columns: usize,
    pub missing_indexes: usize,
}

impl DriftCounts {
    pub fn total(&self) -> usize {
        self.missing_tables + self.missing_columns + self.different_columns + self.missing_indexes
    }
}

impl fmt::Display for DriftCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} missing tables, {} missing columns, {} different columns, {} missing indexes",
            self.missing_tables, self.missing_columns, self.different_columns, self.missing_indexes
        )
    }
}

impl fmt::Display for ComparisonResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_in_sync {
            return writeln!(f, "Schemas are in sync.");
        }

        writeln!(f, "Drift detected: {}", self.counts())?;

        if !self.missing_tables.is_empty() {
            writeln!(f, "\nMissing tables:")?;
            for table in &self.missing_tables {
                writeln!(f, "  - {}", table)?;
            }
        }

        if !self.missing_columns.is_empty() {
            writeln!(f, "\nMissing columns:")?;
            for missing in &self.missing_columns {
                writeln!(
                    f,
                    "  - {}.{} {}",
                    missing.table, missing.column.name, missing.column.column_type
                )?;
            }
        }

        if !self.different_columns.is_empty() {
            writeln!(f, "\nDifferent columns:")?;
            for different in &self.different_columns {
                writeln!(f, "  ~ {}.{}", different.table, different.column.name)?;
                for note in &different.differences {
                    writeln!(f, "      {}", note)?;
                }
            }
        }

        if !self.missing_indexes.is_empty() {
            writeln!(f, "\nMissing indexes:")?;
            for index in &self.missing_indexes {
                let unique = if index.unique { "UNIQUE " } else { "" };
                writeln!(
                    f,
                    "  - {}.{} {}({})",
                    index.table,
                    index.name,
                    unique,
                    index.columns.join(", ")
                )?;
            }
        }

        Ok(())
    }
}
