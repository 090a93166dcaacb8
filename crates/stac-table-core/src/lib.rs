//! Core library for generating and validating STAC-like GeoParquet tables.
//!
//! This crate provides the pieces behind the `stactable` CLI:
//!
//! - Timestamp inference from asset filenames with an injectable clock
//!   fallback (`date_extract` module).
//! - Media type lookup from file extensions (`asset_type` module).
//! - Item construction from input records: id, rectangle footprint, bbox,
//!   assets and optional style link (`builder` and `item` modules).
//! - Input loading from path lists, CSV or JSON (`records` module).
//! - GeoParquet encoding with `geo` metadata and atomic writes, plus reading
//!   tables back (`geoparquet` and `storage` modules).
//! - A schema validator for the nested `assets` / `links` columns
//!   (`validate` module).
#![deny(missing_docs)]
pub mod asset_type;
pub mod builder;
pub mod date_extract;
pub mod geometry;
pub mod geoparquet;
pub mod item;
pub mod records;
pub mod storage;
pub mod validate;

pub use builder::{BuildOptions, build_item, build_items};
pub use date_extract::{Clock, DateExtractor, FixedClock, SystemClock};
pub use geoparquet::{GeoTable, encode_items, read_table, read_table_at, write_items};
pub use item::{AssetEntry, BoundingBox, FileRecord, Item, ItemIdFormat, LinkEntry};
pub use validate::{ValidationReport, Violation, validate};
