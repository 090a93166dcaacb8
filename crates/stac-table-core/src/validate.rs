//! Schema validation of item tables.
//!
//! The validator checks the reduced contract a STAC-like item table must
//! meet: the six required columns exist, every `assets` cell is a mapping of
//! key to `{href, type, ...}`, and every `links` cell is a sequence of
//! `{rel, href, ...}`. It is not a STAC JSON Schema validator.
//!
//! Structural problems are collected as [`Violation`] values rather than
//! raised as errors, and no check short-circuits another: a table missing a
//! column still has every row of the remaining columns inspected.
//!
//! Cells are first turned into JSON views ([`cell::cell_value`]), which makes
//! Arrow maps, structs, lists and JSON-encoded text columns look alike.
//! [`parse_assets`] and [`parse_links`] then lift those views into typed
//! [`AssetEntry`] / [`LinkEntry`] values or violations.

pub mod cell;

use std::fmt;

use serde_json::{Map, Value};

use crate::geoparquet::GeoTable;
use crate::geoparquet::schema::{
    ASSETS_COLUMN, BBOX_COLUMN, DATETIME_COLUMN, GEOMETRY_COLUMN, ID_COLUMN, LINKS_COLUMN,
};
use crate::item::{AssetEntry, LinkEntry};

/// Columns every item table must have, in reporting order.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    ID_COLUMN,
    DATETIME_COLUMN,
    GEOMETRY_COLUMN,
    BBOX_COLUMN,
    ASSETS_COLUMN,
    LINKS_COLUMN,
];

/// A single schema conformance failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A required column is absent.
    MissingColumn {
        /// Column name.
        column: String,
    },
    /// An `assets` cell is not a mapping.
    AssetsNotMapping {
        /// Zero-based row across the whole table.
        row: usize,
    },
    /// An asset entry is not a mapping, or lacks `href` or `type`.
    AssetMissingFields {
        /// Zero-based row across the whole table.
        row: usize,
        /// Asset key.
        key: String,
    },
    /// An asset entry has `href` or `type`, but not as a string.
    AssetFieldNotString {
        /// Zero-based row across the whole table.
        row: usize,
        /// Asset key.
        key: String,
        /// Offending field name.
        field: &'static str,
    },
    /// A `links` cell is not a sequence.
    LinksNotSequence {
        /// Zero-based row across the whole table.
        row: usize,
    },
    /// A link is not a mapping, or lacks `rel` or `href`.
    InvalidLink {
        /// Zero-based row across the whole table.
        row: usize,
        /// Position of the link in the row's sequence.
        index: usize,
    },
    /// A link has `rel` or `href`, but not as a string.
    LinkFieldNotString {
        /// Zero-based row across the whole table.
        row: usize,
        /// Position of the link in the row's sequence.
        index: usize,
        /// Offending field name.
        field: &'static str,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingColumn { column } => {
                write!(f, "Missing required column: {column}")
            }
            Violation::AssetsNotMapping { row } => {
                write!(f, "Row {row}: '{ASSETS_COLUMN}' is not a mapping")
            }
            Violation::AssetMissingFields { row, key } => {
                write!(f, "Row {row}: asset '{key}' missing href/type")
            }
            Violation::AssetFieldNotString { row, key, field } => {
                write!(f, "Row {row}: asset '{key}' field '{field}' is not a string")
            }
            Violation::LinksNotSequence { row } => {
                write!(f, "Row {row}: '{LINKS_COLUMN}' is not a list")
            }
            Violation::InvalidLink { row, index } => {
                write!(f, "Row {row}: invalid link structure at index {index}")
            }
            Violation::LinkFieldNotString { row, index, field } => {
                write!(
                    f,
                    "Row {row}: link at index {index} field '{field}' is not a string"
                )
            }
        }
    }
}

/// Outcome of validating one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Every violation found, in discovery order.
    pub violations: Vec<Violation>,
    /// Rows inspected.
    pub rows_checked: usize,
    /// Asset entries that parsed successfully.
    pub assets_checked: usize,
    /// Links that parsed successfully.
    pub links_checked: usize,
}

impl ValidationReport {
    /// True when no violation was found.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for violation in &self.violations {
            writeln!(f, "{violation}")?;
        }
        if self.is_valid() {
            write!(
                f,
                "Schema validation passed ({} rows, {} assets, {} links)",
                self.rows_checked, self.assets_checked, self.links_checked
            )
        } else {
            write!(
                f,
                "Schema validation failed: {} violation(s) in {} rows",
                self.violations.len(),
                self.rows_checked
            )
        }
    }
}

/// Typed entries parsed from one cell, plus the violations met on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    /// Entries that satisfied the contract.
    pub entries: Vec<T>,
    /// Problems found in this cell.
    pub violations: Vec<Violation>,
}

impl<T> Parsed<T> {
    fn empty() -> Self {
        Self {
            entries: Vec::new(),
            violations: Vec::new(),
        }
    }

    fn rejected(violation: Violation) -> Self {
        Self {
            entries: Vec::new(),
            violations: vec![violation],
        }
    }
}

/// Text cells holding JSON are decoded; anything else is returned as is.
fn decode_text(cell: &Value) -> Option<Value> {
    match cell {
        Value::String(text) => serde_json::from_str(text).ok(),
        other => Some(other.clone()),
    }
}

/// A `[key, value]` pair or a `{"key": .., "value": ..}` entry.
fn pair_entry(entry: &Value) -> Option<(String, Value)> {
    match entry {
        Value::Array(pair) if pair.len() == 2 => {
            Some((pair[0].as_str()?.to_string(), pair[1].clone()))
        }
        Value::Object(obj) => {
            let key = obj.get("key")?.as_str()?.to_string();
            Some((key, obj.get("value").cloned().unwrap_or(Value::Null)))
        }
        _ => None,
    }
}

fn as_mapping(cell: &Value) -> Option<Map<String, Value>> {
    match decode_text(cell)? {
        Value::Object(obj) => Some(obj),
        Value::Array(pairs) => pairs.iter().map(pair_entry).collect(),
        _ => None,
    }
}

fn as_sequence(cell: &Value) -> Option<Vec<Value>> {
    match decode_text(cell)? {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

fn string_field(obj: &Map<String, Value>, name: &str) -> Option<String> {
    obj.get(name).and_then(Value::as_str).map(str::to_string)
}

enum FieldProblem {
    Missing,
    NotString(&'static str),
}

/// A field that must be present and non-null; null counts as absent.
fn required_string(obj: &Map<String, Value>, name: &'static str) -> Result<String, FieldProblem> {
    match obj.get(name) {
        None | Some(Value::Null) => Err(FieldProblem::Missing),
        Some(Value::String(text)) => Ok(text.clone()),
        Some(_) => Err(FieldProblem::NotString(name)),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn asset_entry(value: &Value) -> Result<AssetEntry, FieldProblem> {
    let obj = value.as_object().ok_or(FieldProblem::Missing)?;
    Ok(AssetEntry {
        href: required_string(obj, "href")?,
        media_type: required_string(obj, "type")?,
        roles: string_list(obj.get("roles")),
    })
}

fn link_entry(value: &Value) -> Result<LinkEntry, FieldProblem> {
    let obj = value.as_object().ok_or(FieldProblem::Missing)?;
    Ok(LinkEntry {
        rel: required_string(obj, "rel")?,
        href: required_string(obj, "href")?,
        media_type: string_field(obj, "type"),
        asset_keys: string_list(obj.get("asset:keys")),
    })
}

/// Parse the `assets` cell of `row`.
///
/// The cell must be a mapping; each value must itself be a mapping with
/// non-null string `href` and `type`. A field that is present with another
/// JSON type is reported separately from one that is missing.
pub fn parse_assets(row: usize, cell: &Value) -> Parsed<(String, AssetEntry)> {
    let Some(mapping) = as_mapping(cell) else {
        return Parsed::rejected(Violation::AssetsNotMapping { row });
    };

    let mut parsed = Parsed::empty();
    for (key, value) in mapping {
        match asset_entry(&value) {
            Ok(entry) => parsed.entries.push((key, entry)),
            Err(FieldProblem::Missing) => parsed
                .violations
                .push(Violation::AssetMissingFields { row, key }),
            Err(FieldProblem::NotString(field)) => parsed
                .violations
                .push(Violation::AssetFieldNotString { row, key, field }),
        }
    }
    parsed
}

/// Parse the `links` cell of `row`.
///
/// The cell must be a sequence; each element must be a mapping with non-null
/// string `rel` and `href`.
pub fn parse_links(row: usize, cell: &Value) -> Parsed<LinkEntry> {
    let Some(links) = as_sequence(cell) else {
        return Parsed::rejected(Violation::LinksNotSequence { row });
    };

    let mut parsed = Parsed::empty();
    for (index, value) in links.iter().enumerate() {
        match link_entry(value) {
            Ok(link) => parsed.entries.push(link),
            Err(FieldProblem::Missing) => {
                parsed.violations.push(Violation::InvalidLink { row, index })
            }
            Err(FieldProblem::NotString(field)) => parsed
                .violations
                .push(Violation::LinkFieldNotString { row, index, field }),
        }
    }
    parsed
}

/// Check `table` against the item contract.
///
/// A missing `assets` or `links` column is reported once and otherwise
/// treated as empty for every row.
pub fn validate(table: &GeoTable) -> ValidationReport {
    let mut report = ValidationReport::default();

    for column in REQUIRED_COLUMNS {
        if !table.has_column(column) {
            report.violations.push(Violation::MissingColumn {
                column: column.to_string(),
            });
        }
    }

    let mut row = 0usize;
    for batch in &table.batches {
        let assets = batch.column_by_name(ASSETS_COLUMN);
        let links = batch.column_by_name(LINKS_COLUMN);

        for batch_row in 0..batch.num_rows() {
            if let Some(column) = assets {
                let parsed = parse_assets(row, &cell::cell_value(column.as_ref(), batch_row));
                report.assets_checked += parsed.entries.len();
                report.violations.extend(parsed.violations);
            }
            if let Some(column) = links {
                let parsed = parse_links(row, &cell::cell_value(column.as_ref(), batch_row));
                report.links_checked += parsed.entries.len();
                report.violations.extend(parsed.violations);
            }
            row += 1;
        }
    }
    report.rows_checked = row;

    if report.is_valid() {
        tracing::info!(rows = row, "schema validation passed");
    } else {
        tracing::info!(
            rows = row,
            violations = report.violations.len(),
            "schema validation failed"
        );
    }
    report
}
