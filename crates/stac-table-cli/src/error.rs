use stac_table_core::geoparquet::GeoParquetError;
use stac_table_core::records::RecordsError;
use stac_table_core::storage::StorageError;

use snafu::Snafu;

pub type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    #[snafu(display("Missing base URL: pass --base-url or set STACTABLE_BASE_URL"))]
    MissingBaseUrl,

    #[snafu(display("No input given: pass file paths, --csv FILE or --json FILE"))]
    MissingInput,

    #[snafu(display(
        "Conflicting inputs ({sources}). \
         Use exactly one of file paths, --csv or --json."
    ))]
    ConflictingInputs { sources: String },

    #[snafu(display("Invalid --bbox {values}: expected four finite numbers MINX MINY MAXX MAXY"))]
    InvalidBbox { values: String },

    #[snafu(display("Failed to read input file {path}: {source}"))]
    ReadInput { path: String, source: StorageError },

    #[snafu(display("Failed to parse input file {path}: {source}"))]
    ParseInput { path: String, source: RecordsError },

    #[snafu(display("Failed to write GeoParquet to {path}: {source}"))]
    WriteOutput {
        path: String,
        source: GeoParquetError,
    },

    #[snafu(display(
        "Failed to read table {path}. \
         Ensure it exists and is a Parquet file: {source}"
    ))]
    ReadTable {
        path: String,
        source: GeoParquetError,
    },
}
