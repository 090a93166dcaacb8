//! Loading input file lists into [`FileRecord`]s.
//!
//! Three sources are supported and all produce the same record sequence:
//! plain path lists, CSV with a `path` column (and optionally `date`), and a
//! JSON array of objects with a `path` key (and optionally `date`). Parsing
//! works on in-memory bytes; reading the file is the caller's concern.

use std::{io::Cursor, sync::Arc};

use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow_csv::ReaderBuilder;
use arrow_csv::reader::Format;
use serde_json::Value;
use snafu::prelude::*;

use crate::item::FileRecord;

/// Name of the required path column / key.
pub const PATH_FIELD: &str = "path";

/// Name of the optional explicit date column / key.
pub const DATE_FIELD: &str = "date";

/// Errors raised while turning input bytes into records.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RecordsError {
    /// The CSV could not be parsed.
    #[snafu(display("Failed to read CSV input: {source}"))]
    CsvRead {
        /// Underlying Arrow CSV error.
        source: ArrowError,
    },

    /// The CSV header has no `path` column.
    #[snafu(display("CSV input has no '{PATH_FIELD}' column (columns: {columns})"))]
    CsvMissingPathColumn {
        /// Comma-separated header names that were found.
        columns: String,
    },

    /// The JSON could not be parsed.
    #[snafu(display("Failed to parse JSON input: {source}"))]
    JsonParse {
        /// Underlying serde_json error.
        source: serde_json::Error,
    },

    /// The JSON document is not an array.
    #[snafu(display("JSON input must be an array of objects"))]
    JsonNotArray,

    /// An array element is not an object.
    #[snafu(display("JSON record {index} is not an object"))]
    JsonNotObject {
        /// Zero-based position in the array.
        index: usize,
    },

    /// A record has no usable path.
    #[snafu(display("Input record {index} has no '{PATH_FIELD}' value"))]
    MissingPath {
        /// Zero-based record position.
        index: usize,
    },
}

/// Result alias for record loading.
pub type RecordsResult<T> = Result<T, RecordsError>;

/// One record per path, without explicit dates.
pub fn records_from_paths<I, S>(paths: I) -> Vec<FileRecord>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    paths.into_iter().map(FileRecord::from_path).collect()
}

/// Parse CSV bytes with a header row.
///
/// Every column is read as text, so dates keep their original spelling. An
/// empty or left-out `date` cell means "no explicit date"; an empty `path`
/// is an error.
pub fn records_from_csv(bytes: &[u8]) -> RecordsResult<Vec<FileRecord>> {
    // Rows may stop short of the trailing optional columns; those read as null.
    let format = Format::default()
        .with_header(true)
        .with_truncated_rows(true);

    // Only the header names matter; column types are forced to Utf8 below.
    let (header, _) = format
        .infer_schema(Cursor::new(bytes), Some(0))
        .context(CsvReadSnafu)?;

    let schema = Arc::new(Schema::new(
        header
            .fields()
            .iter()
            .map(|f| Field::new(f.name(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ));

    let path_idx = match schema.index_of(PATH_FIELD) {
        Ok(idx) => idx,
        Err(_) => {
            let columns = schema
                .fields()
                .iter()
                .map(|f| f.name().as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return CsvMissingPathColumnSnafu { columns }.fail();
        }
    };
    let date_idx = schema.index_of(DATE_FIELD).ok();

    let reader = ReaderBuilder::new(schema)
        .with_format(format)
        .build(Cursor::new(bytes))
        .context(CsvReadSnafu)?;

    let mut records = Vec::new();
    for batch in reader {
        let batch = batch.context(CsvReadSnafu)?;
        let paths = batch.column(path_idx).as_string::<i32>();
        let dates = date_idx.map(|idx| batch.column(idx).as_string::<i32>());

        for row in 0..batch.num_rows() {
            let index = records.len();
            if paths.is_null(row) || paths.value(row).trim().is_empty() {
                return MissingPathSnafu { index }.fail();
            }

            let date = dates
                .filter(|d| !d.is_null(row))
                .map(|d| d.value(row).to_string())
                .filter(|d| !d.trim().is_empty());

            records.push(FileRecord {
                path: paths.value(row).to_string(),
                date,
            });
        }
    }

    Ok(records)
}

/// Parse a JSON array of `{"path": ..., "date": ...}` objects.
///
/// Extra keys are ignored. Non-string scalar dates (for example the number
/// `20200101`) are kept in their JSON text form.
pub fn records_from_json(bytes: &[u8]) -> RecordsResult<Vec<FileRecord>> {
    let value: Value = serde_json::from_slice(bytes).context(JsonParseSnafu)?;
    let Value::Array(rows) = value else {
        return JsonNotArraySnafu.fail();
    };

    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            let Value::Object(obj) = row else {
                return JsonNotObjectSnafu { index }.fail();
            };

            let path = obj
                .get(PATH_FIELD)
                .and_then(Value::as_str)
                .filter(|p| !p.trim().is_empty())
                .context(MissingPathSnafu { index })?
                .to_string();

            let date = match obj.get(DATE_FIELD) {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) if s.trim().is_empty() => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => Some(other.to_string()),
            };

            Ok(FileRecord { path, date })
        })
        .collect()
}
