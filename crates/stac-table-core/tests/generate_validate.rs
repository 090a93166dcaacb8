//! End-to-end tests: records → items → GeoParquet → validation.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, StringArray, StructArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use parquet::arrow::ArrowWriter;
use stac_table_core::{
    BuildOptions, DateExtractor, FixedClock, GeoTable, Item, Violation, build_items,
    encode_items, geoparquet::items_to_record_batch, read_table, read_table_at,
    records::{records_from_csv, records_from_paths},
    storage::StorageLocation,
    validate, write_items,
};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn fixed_extractor() -> DateExtractor<FixedClock> {
    DateExtractor::with_clock(FixedClock(
        Utc.with_ymd_and_hms(2001, 2, 3, 4, 5, 6).single().unwrap(),
    ))
}

fn sample_items() -> Vec<Item> {
    let mut options = BuildOptions::new("https://x.test/data");
    options.style_url = Some("https://x.test/style.json".to_string());
    build_items(
        &records_from_paths(["obs_20190702_1700.tif", "obs_20190703.tif"]),
        &options,
        &fixed_extractor(),
    )
}

fn parquet_bytes(batch: &RecordBatch) -> Result<Bytes, Box<dyn std::error::Error>> {
    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(Bytes::from(buf))
}

#[tokio::test]
async fn csv_to_geoparquet_validates() -> TestResult {
    let tmp = TempDir::new()?;
    let location = StorageLocation::local(tmp.path());

    let csv = b"path,date\n/raw/obs_20190702_1700.tif,\n/raw/scan.fgb,2020-03-04 05:06:07\n";
    let records = records_from_csv(csv)?;
    let items = build_items(
        &records,
        &BuildOptions::new("https://x.test/data/"),
        &fixed_extractor(),
    );
    assert_eq!(items[0].id, "2019-07-02T17:00:00Z");
    assert_eq!(items[1].id, "2020-03-04T05:06:07Z");

    write_items(&location, Path::new("items.parquet"), &items).await?;
    let table = read_table_at(&location, Path::new("items.parquet")).await?;

    let report = validate(&table);
    assert!(report.is_valid(), "{report}");
    assert_eq!(report.rows_checked, 2);
    assert_eq!(report.assets_checked, 2);
    assert_eq!(report.links_checked, 0);
    Ok(())
}

#[tokio::test]
async fn repeated_generation_is_byte_identical() -> TestResult {
    let tmp = TempDir::new()?;
    let location = StorageLocation::local(tmp.path());

    write_items(&location, Path::new("a.parquet"), &sample_items()).await?;
    write_items(&location, Path::new("b.parquet"), &sample_items()).await?;

    let a = std::fs::read(tmp.path().join("a.parquet"))?;
    let b = std::fs::read(tmp.path().join("b.parquet"))?;
    assert_eq!(a, b);
    Ok(())
}

#[test]
fn style_links_survive_round_trip() -> TestResult {
    let table = read_table(Bytes::from(encode_items(&sample_items())?))?;
    let report = validate(&table);
    assert!(report.is_valid(), "{report}");
    assert_eq!(report.links_checked, 2);
    Ok(())
}

#[test]
fn empty_table_is_valid() -> TestResult {
    let table = read_table(Bytes::from(encode_items(&[])?))?;
    let report = validate(&table);
    assert!(report.is_valid(), "{report}");
    assert_eq!(report.rows_checked, 0);
    Ok(())
}

#[test]
fn missing_links_column_is_one_violation() -> TestResult {
    let full = items_to_record_batch(&sample_items())?;
    let links_idx = full.schema().index_of("links")?;
    let keep: Vec<usize> = (0..full.num_columns()).filter(|&i| i != links_idx).collect();
    let without_links = full.project(&keep)?;

    let table = read_table(parquet_bytes(&without_links)?)?;
    let report = validate(&table);

    assert!(!report.is_valid());
    assert_eq!(
        report.violations,
        vec![Violation::MissingColumn {
            column: "links".to_string()
        }]
    );
    assert_eq!(report.rows_checked, 2);
    assert_eq!(report.assets_checked, 2);
    Ok(())
}

#[test]
fn json_text_columns_are_checked_row_by_row() -> TestResult {
    let schema = Arc::new(Schema::new(vec![
        Field::new("assets", DataType::Utf8, true),
        Field::new("links", DataType::Utf8, true),
    ]));
    let assets = StringArray::from(vec![
        Some(r#"{"asset_0": {"href": "https://x.test/a.tif", "type": "image/tiff"}}"#),
        Some("not json"),
        Some(r#"{"asset_0": {"href": "https://x.test/c.tif"}}"#),
        None,
    ]);
    let links = StringArray::from(vec![
        Some("[]"),
        Some(r#"[{"rel": "style", "href": "https://x.test/s.json"}]"#),
        Some("{}"),
        Some(r#"[{"rel": "style"}]"#),
    ]);
    let batch = RecordBatch::try_new(
        schema,
        vec![Arc::new(assets) as ArrayRef, Arc::new(links)],
    )?;

    let table = read_table(parquet_bytes(&batch)?)?;
    let report = validate(&table);

    let missing = |c: &str| Violation::MissingColumn {
        column: c.to_string(),
    };
    assert_eq!(
        report.violations,
        vec![
            missing("id"),
            missing("datetime"),
            missing("geometry"),
            missing("bbox"),
            Violation::AssetsNotMapping { row: 1 },
            Violation::AssetMissingFields {
                row: 2,
                key: "asset_0".to_string()
            },
            Violation::LinksNotSequence { row: 2 },
            Violation::AssetsNotMapping { row: 3 },
            Violation::InvalidLink { row: 3, index: 0 },
        ]
    );
    assert_eq!(report.rows_checked, 4);
    assert_eq!(report.assets_checked, 1);
    assert_eq!(report.links_checked, 1);
    Ok(())
}

#[test]
fn struct_assets_column_counts_as_mapping() -> TestResult {
    let asset = StructArray::from(vec![
        (
            Arc::new(Field::new("href", DataType::Utf8, true)),
            Arc::new(StringArray::from(vec![Some("https://x.test/a.tif"), None])) as ArrayRef,
        ),
        (
            Arc::new(Field::new("type", DataType::Utf8, true)),
            Arc::new(StringArray::from(vec!["image/tiff", "image/tiff"])) as ArrayRef,
        ),
    ]);
    let assets = StructArray::from(vec![(
        Arc::new(Field::new("asset_0", asset.data_type().clone(), true)),
        Arc::new(asset) as ArrayRef,
    )]);
    let schema = Arc::new(Schema::new(vec![Field::new(
        "assets",
        assets.data_type().clone(),
        true,
    )]));
    let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(assets) as ArrayRef])?;

    let report = validate(&GeoTable::from_batches(schema, vec![batch]));

    assert!(report.violations.contains(&Violation::AssetMissingFields {
        row: 1,
        key: "asset_0".to_string()
    }));
    assert!(!report.violations.contains(&Violation::AssetsNotMapping { row: 0 }));
    assert_eq!(report.assets_checked, 1);
    Ok(())
}
