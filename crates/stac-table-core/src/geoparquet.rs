//! GeoParquet encoding and decoding of item tables.
//!
//! Writing goes items → one Arrow record batch → Parquet bytes with the `geo`
//! key-value metadata attached → atomic write through [`crate::storage`].
//! Reading parses any Parquet payload into a [`GeoTable`]; it does not insist
//! on the item schema, so tables produced elsewhere can still be validated.

pub mod metadata;
pub mod schema;

use std::path::Path;

use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::errors::ParquetError;
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use snafu::prelude::*;

use crate::item::Item;
use crate::storage::{self, StorageError, StorageLocation};

pub use metadata::{GEO_METADATA_KEY, GeoColumnMetadata, GeoMetadata};
pub use schema::{item_schema, items_to_record_batch};

/// Errors encoding or decoding GeoParquet.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum GeoParquetError {
    /// Items could not be assembled into Arrow arrays.
    #[snafu(display("Failed to build item record batch: {source}"))]
    BuildBatch {
        /// Underlying Arrow error.
        source: ArrowError,
    },

    /// The `geo` metadata document could not be serialised.
    #[snafu(display("Failed to serialise GeoParquet metadata: {source}"))]
    EncodeGeoMetadata {
        /// Underlying serde_json error.
        source: serde_json::Error,
    },

    /// Parquet writing failed.
    #[snafu(display("Failed to write Parquet: {source}"))]
    ParquetWrite {
        /// Underlying Parquet error.
        source: ParquetError,
    },

    /// Parquet footer or schema could not be read.
    #[snafu(display("Failed to read Parquet: {source}"))]
    ParquetRead {
        /// Underlying Parquet error.
        source: ParquetError,
    },

    /// A record batch could not be decoded.
    #[snafu(display("Failed to decode record batch: {source}"))]
    ReadBatch {
        /// Underlying Arrow error.
        source: ArrowError,
    },

    /// Reading or writing the file failed.
    #[snafu(display("{source}"))]
    Storage {
        /// Underlying storage error.
        source: StorageError,
    },
}

/// Result alias for GeoParquet operations.
pub type GeoParquetResult<T> = Result<T, GeoParquetError>;

/// A table read back from Parquet.
#[derive(Debug, Clone)]
pub struct GeoTable {
    /// Arrow schema of the file.
    pub schema: SchemaRef,
    /// All record batches, in file order.
    pub batches: Vec<RecordBatch>,
    /// Parsed `geo` metadata, when present and well-formed.
    pub geo: Option<GeoMetadata>,
}

impl GeoTable {
    /// Table from in-memory batches without `geo` metadata.
    pub fn from_batches(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self {
            schema,
            batches,
            geo: None,
        }
    }

    /// Total rows across batches.
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// Whether the schema has a column named `name`.
    pub fn has_column(&self, name: &str) -> bool {
        self.schema.index_of(name).is_ok()
    }
}

/// Encode `items` as GeoParquet bytes.
///
/// Output depends only on `items`, so equal inputs give byte-identical files.
pub fn encode_items(items: &[Item]) -> GeoParquetResult<Vec<u8>> {
    let batch = items_to_record_batch(items).context(BuildBatchSnafu)?;
    let geo = serde_json::to_string(&GeoMetadata::for_items(items))
        .context(EncodeGeoMetadataSnafu)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_key_value_metadata(Some(vec![KeyValue::new(
            GEO_METADATA_KEY.to_string(),
            geo,
        )]))
        .build();

    let mut buf = Vec::new();
    let mut writer =
        ArrowWriter::try_new(&mut buf, batch.schema(), Some(props)).context(ParquetWriteSnafu)?;
    writer.write(&batch).context(ParquetWriteSnafu)?;
    writer.close().context(ParquetWriteSnafu)?;

    Ok(buf)
}

/// Encode `items` and atomically write them to `rel_path` under `location`.
///
/// Returns the number of bytes written.
pub async fn write_items(
    location: &StorageLocation,
    rel_path: &Path,
    items: &[Item],
) -> GeoParquetResult<usize> {
    let bytes = encode_items(items)?;
    storage::write_atomic(location, rel_path, &bytes)
        .await
        .context(StorageSnafu)?;

    tracing::info!(
        path = %rel_path.display(),
        rows = items.len(),
        bytes = bytes.len(),
        "wrote GeoParquet"
    );
    Ok(bytes.len())
}

fn parse_geo_metadata(kv: Option<&Vec<KeyValue>>) -> Option<GeoMetadata> {
    let raw = kv?
        .iter()
        .find(|entry| entry.key == GEO_METADATA_KEY)?
        .value
        .as_deref()?;

    match serde_json::from_str(raw) {
        Ok(meta) => Some(meta),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring malformed GeoParquet metadata");
            None
        }
    }
}

/// Decode a Parquet payload into a [`GeoTable`].
pub fn read_table(data: Bytes) -> GeoParquetResult<GeoTable> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(data).context(ParquetReadSnafu)?;

    let geo = parse_geo_metadata(builder.metadata().file_metadata().key_value_metadata());
    let schema = builder.schema().clone();
    let reader = builder.build().context(ParquetReadSnafu)?;

    let batches = reader
        .collect::<Result<Vec<_>, ArrowError>>()
        .context(ReadBatchSnafu)?;

    Ok(GeoTable {
        schema,
        batches,
        geo,
    })
}

/// Read and decode the Parquet file at `rel_path` under `location`.
pub async fn read_table_at(
    location: &StorageLocation,
    rel_path: &Path,
) -> GeoParquetResult<GeoTable> {
    let bytes = storage::read_all_bytes(location, rel_path)
        .await
        .context(StorageSnafu)?;
    read_table(Bytes::from(bytes))
}
