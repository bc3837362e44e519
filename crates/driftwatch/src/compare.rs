//! Column comparison.
//!
//! Produces human-readable difference notes for two same-named columns. Each
//! dimension yields at most one note, always in this order:
//!
//! 1. type, e.g. `type: 'int(10)' → 'int(11)'`
//! 2. nullability, e.g. `nullable: YES → NO`
//! 3. default, e.g. `default: NULL → 0`
//! 4. extra, e.g. `extra: '' → 'auto_increment'`
//!
//! Notes read target → reference: they describe the change the target needs.

use crate::ColumnDescriptor;

/// Integer types whose display width is cosmetic.
const INTEGER_TYPES: &[&str] = &["tinyint", "smallint", "mediumint", "int", "bigint"];

/// Types whose parameter list holds case-sensitive members.
const MEMBER_LIST_TYPES: &[&str] = &["enum", "set"];

/// Comparison knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompareOptions {
    /// Compare types after [`normalize_type`] instead of textually.
    ///
    /// Off by default: over-reporting a cosmetic difference is preferred to
    /// hiding a real one.
    pub normalize_types: bool,
}

impl CompareOptions {
    /// Difference notes between two same-named columns, empty if equivalent.
    pub fn compare(&self, reference: &ColumnDescriptor, target: &ColumnDescriptor) -> Vec<String> {
        let mut notes = Vec::new();

        let types_differ = if self.normalize_types {
            normalize_type(&reference.column_type) != normalize_type(&target.column_type)
        } else {
            reference.column_type != target.column_type
        };
        if types_differ {
            notes.push(format!(
                "type: '{}' → '{}'",
                target.column_type, reference.column_type
            ));
        }

        if reference.nullable != target.nullable {
            notes.push(format!(
                "nullable: {} → {}",
                target.nullable_flag(),
                reference.nullable_flag()
            ));
        }

        // "No default" and a literal `NULL` default compare equal.
        let reference_default = reference.default_value.as_deref().unwrap_or("NULL");
        let target_default = target.default_value.as_deref().unwrap_or("NULL");
        if reference_default != target_default {
            notes.push(format!("default: {} → {}", target_default, reference_default));
        }

        if reference.extra != target.extra {
            notes.push(format!("extra: '{}' → '{}'", target.extra, reference.extra));
        }

        notes
    }
}

/// Compare two same-named columns with default options (textual type equality).
pub fn compare_columns(reference: &ColumnDescriptor, target: &ColumnDescriptor) -> Vec<String> {
    CompareOptions::default().compare(reference, target)
}

/// Normalize known-equivalent type spellings.
///
/// - the base type name is lowercased, `integer` becomes `int`, and
///   `bool`/`boolean` become `tinyint(1)`
/// - integer display widths are dropped (`int(11)` → `int`), except
///   `tinyint(1)`, which conventionally marks a boolean
/// - whitespace inside a length or precision list is removed
/// - trailing modifiers (`UNSIGNED`, `ZEROFILL`, ...) are lowercased and
///   single-spaced
///
/// `enum` and `set` member lists are kept verbatim, since members are
/// case-sensitive.
pub fn normalize_type(column_type: &str) -> String {
    let trimmed = column_type.trim();
    let split = trimmed
        .find(|c: char| c == '(' || c.is_whitespace())
        .unwrap_or(trimmed.len());
    let (base, rest) = trimmed.split_at(split);
    let (params, modifiers) = split_params(rest.trim_start());

    let lowered = base.to_ascii_lowercase();
    let (base, implied_width) = match lowered.as_str() {
        "integer" => ("int", None),
        "bool" | "boolean" => ("tinyint", Some("1")),
        other => (other, None),
    };

    let mut params = params
        .map(|p| {
            if MEMBER_LIST_TYPES.contains(&base) {
                p.to_string()
            } else {
                p.split_whitespace().collect::<String>()
            }
        })
        .or_else(|| implied_width.map(str::to_string));

    if INTEGER_TYPES.contains(&base) {
        let cosmetic = params.as_deref().is_some_and(|width| {
            width.chars().all(|c| c.is_ascii_digit()) && !(base == "tinyint" && width == "1")
        });
        if cosmetic {
            params = None;
        }
    }

    let mut normalized = base.to_string();
    if let Some(params) = params {
        normalized.push('(');
        normalized.push_str(&params);
        normalized.push(')');
    }
    for word in modifiers.split_whitespace() {
        normalized.push(' ');
        normalized.push_str(&word.to_ascii_lowercase());
    }
    normalized
}

/// Split a leading `(...)` list off `rest`, ignoring parentheses inside quotes.
fn split_params(rest: &str) -> (Option<&str>, &str) {
    let Some(inner) = rest.strip_prefix('(') else {
        return (None, rest);
    };

    let mut quoted = false;
    for (i, c) in inner.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            ')' if !quoted => return (Some(&inner[..i]), &inner[i + 1..]),
            _ => {}
        }
    }

    (None, rest)
}
