#![allow(dead_code)]

use std::{fs::File, path::Path, sync::Arc};

use arrow::array::{Array, ArrayRef, AsArray, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use assert_cmd::Command;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub fn cli() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("stactable"));
    cmd.env_remove("STACTABLE_BASE_URL").env_remove("RUST_LOG");
    cmd
}

/// Parquet with `id` and JSON-text `assets` columns only.
pub fn write_partial_table(path: &Path) -> TestResult {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("assets", DataType::Utf8, true),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(vec!["a", "b"])) as ArrayRef,
            Arc::new(StringArray::from(vec![
                Some(r#"{"asset_0": {"href": "https://x.test/a.tif", "type": "image/tiff"}}"#),
                Some("[1, 2, 3]"),
            ])),
        ],
    )?;

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

pub fn read_batches(path: &Path) -> TestResult<Vec<RecordBatch>> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?.build()?;
    Ok(reader.collect::<Result<Vec<_>, _>>()?)
}

pub fn string_column(batches: &[RecordBatch], name: &str) -> Vec<String> {
    batches
        .iter()
        .flat_map(|batch| {
            let column = batch.column_by_name(name).expect("column present");
            let values = column.as_string::<i32>();
            (0..values.len())
                .map(|i| values.value(i).to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// `href` of the first asset in every row.
pub fn asset_hrefs(batches: &[RecordBatch]) -> Vec<String> {
    let mut hrefs = Vec::new();
    for batch in batches {
        let assets = batch
            .column_by_name("assets")
            .expect("assets column")
            .as_map();
        for row in 0..assets.len() {
            let entries = assets.value(row);
            let values = entries.column(1).as_struct();
            let href = values
                .column_by_name("href")
                .expect("href field")
                .as_string::<i32>();
            hrefs.push(href.value(0).to_string());
        }
    }
    hrefs
}

pub fn geo_metadata(path: &Path) -> TestResult<Option<serde_json::Value>> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
    let raw = builder
        .metadata()
        .file_metadata()
        .key_value_metadata()
        .and_then(|kv| kv.iter().find(|e| e.key == "geo"))
        .and_then(|e| e.value.clone());
    Ok(match raw {
        Some(text) => Some(serde_json::from_str(&text)?),
        None => None,
    })
}
