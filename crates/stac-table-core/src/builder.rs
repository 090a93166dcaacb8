//! Turning input file records into STAC-like items.
//!
//! Building is a single ordered pass with no state shared between records,
//! so the output row `i` always corresponds to input record `i`. Per-record
//! problems never abort the batch: an explicit date that does not parse is
//! treated as absent, and an unknown extension gets the generic media type.
//!
//! The builder does not validate its own output; that is the job of
//! [`crate::validate`], run against the persisted table.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::asset_type::resolve_asset_type;
use crate::date_extract::{Clock, DateExtractor, parse_explicit_date};
use crate::geometry::{bounds, rectangle};
use crate::item::{
    AssetEntry, BoundingBox, DATA_ROLE, FileRecord, Item, ItemIdFormat, LinkEntry,
    PRIMARY_ASSET_KEY, STYLE_MEDIA_TYPE, STYLE_REL,
};

/// Options shared by every item in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    /// Public URL prefix the asset files are served under.
    pub base_url: String,
    /// Style document to link from every item, if any.
    pub style_url: Option<String>,
    /// Footprint for every item; the whole world when `None`.
    pub bbox: Option<BoundingBox>,
    /// Media type forced onto every asset instead of extension lookup.
    pub asset_type_override: Option<String>,
    /// Rendering of item ids.
    pub id_format: ItemIdFormat,
}

impl BuildOptions {
    /// Options with only a base URL set.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            style_url: None,
            bbox: None,
            asset_type_override: None,
            id_format: ItemIdFormat::default(),
        }
    }

    fn href_for(&self, file_name: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), file_name)
    }

    fn style_url(&self) -> Option<&str> {
        self.style_url.as_deref().filter(|s| !s.is_empty())
    }

    fn asset_type_for(&self, path: &str) -> String {
        match self.asset_type_override.as_deref() {
            Some(forced) if !forced.is_empty() => forced.to_string(),
            _ => resolve_asset_type(path).to_string(),
        }
    }
}

fn resolve_datetime<C: Clock>(
    record: &FileRecord,
    file_name: &str,
    extractor: &DateExtractor<C>,
) -> DateTime<Utc> {
    if let Some(raw) = record.date.as_deref() {
        match parse_explicit_date(raw) {
            Some(ts) => return ts,
            None if !raw.trim().is_empty() => {
                tracing::debug!(path = %record.path, date = raw, "explicit date not parseable, inferring from filename");
            }
            None => {}
        }
    }

    extractor.extract(file_name)
}

/// Build the item for a single record.
pub fn build_item<C: Clock>(
    record: &FileRecord,
    options: &BuildOptions,
    extractor: &DateExtractor<C>,
) -> Item {
    let file_name = record.file_name();
    let datetime = resolve_datetime(record, file_name, extractor);
    let id = options.id_format.render(&datetime);

    let footprint = options.bbox.unwrap_or(BoundingBox::WORLD);
    let geometry = rectangle(&footprint);
    let bbox = bounds(&geometry).unwrap_or(footprint);

    let mut assets = BTreeMap::new();
    assets.insert(
        PRIMARY_ASSET_KEY.to_string(),
        AssetEntry {
            href: options.href_for(file_name),
            media_type: options.asset_type_for(&record.path),
            roles: vec![DATA_ROLE.to_string()],
        },
    );

    let links = match options.style_url() {
        Some(style) => vec![LinkEntry {
            rel: STYLE_REL.to_string(),
            href: style.to_string(),
            media_type: Some(STYLE_MEDIA_TYPE.to_string()),
            asset_keys: assets.keys().cloned().collect(),
        }],
        None => Vec::new(),
    };

    Item {
        id,
        datetime,
        geometry,
        bbox,
        assets,
        links,
    }
}

/// Build one item per record, preserving input order.
///
/// Ids are rendered from datetimes alone, so two records that resolve to the
/// same instant share an id. Such collisions are logged, not rewritten.
pub fn build_items<C: Clock>(
    records: &[FileRecord],
    options: &BuildOptions,
    extractor: &DateExtractor<C>,
) -> Vec<Item> {
    let items: Vec<Item> = records
        .iter()
        .map(|record| build_item(record, options, extractor))
        .collect();

    let mut seen: HashMap<&str, usize> = HashMap::with_capacity(items.len());
    for (row, item) in items.iter().enumerate() {
        if let Some(first) = seen.insert(item.id.as_str(), row) {
            tracing::warn!(id = %item.id, first_row = first, row, "duplicate item id");
        }
    }

    tracing::info!(items = items.len(), "built items");
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_extract::FixedClock;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s)
            .single()
            .expect("valid test timestamp")
    }

    fn extractor() -> DateExtractor<FixedClock> {
        DateExtractor::with_clock(FixedClock(utc(2001, 2, 3, 4, 5, 6)))
    }

    #[test]
    fn two_observation_files() {
        let records = vec![
            FileRecord::from_path("obs_20190702_1700.tif"),
            FileRecord::from_path("obs_20190703.tif"),
        ];
        let items = build_items(
            &records,
            &BuildOptions::new("https://x.test/data"),
            &extractor(),
        );

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].datetime, utc(2019, 7, 2, 17, 0, 0));
        assert_eq!(items[1].datetime, utc(2019, 7, 3, 0, 0, 0));
        assert_eq!(items[0].id, "2019-07-02T17:00:00Z");
        assert_eq!(items[1].id, "2019-07-03T00:00:00Z");

        for item in &items {
            assert_eq!(item.bbox, BoundingBox::WORLD);
            assert_eq!(item.geometry, rectangle(&BoundingBox::WORLD));
            assert_eq!(item.assets.len(), 1);
            let asset = &item.assets[PRIMARY_ASSET_KEY];
            assert_eq!(asset.media_type, "image/tiff");
            assert_eq!(asset.roles, vec!["data".to_string()]);
            assert!(item.links.is_empty());
        }
        assert_eq!(
            items[0].assets[PRIMARY_ASSET_KEY].href,
            "https://x.test/data/obs_20190702_1700.tif"
        );
    }

    #[test]
    fn href_uses_base_filename_and_trims_slash() {
        let item = build_item(
            &FileRecord::from_path("/mnt/raw/2024/20240101.fgb"),
            &BuildOptions::new("https://cdn.test/layers///"),
            &extractor(),
        );
        assert_eq!(
            item.assets[PRIMARY_ASSET_KEY].href,
            "https://cdn.test/layers/20240101.fgb"
        );
        assert_eq!(
            item.assets[PRIMARY_ASSET_KEY].media_type,
            "application/vnd.flatgeobuf"
        );
    }

    #[test]
    fn explicit_date_wins_and_bad_date_falls_back() {
        let opts = BuildOptions::new("https://x.test");
        let ex = extractor();

        let explicit = build_item(
            &FileRecord::with_date("obs_20190702_1700.tif", "2020-01-01T06:00:00+02:00"),
            &opts,
            &ex,
        );
        assert_eq!(explicit.datetime, utc(2020, 1, 1, 4, 0, 0));

        let garbage = build_item(
            &FileRecord::with_date("obs_20190702_1700.tif", "sometime"),
            &opts,
            &ex,
        );
        assert_eq!(garbage.datetime, utc(2019, 7, 2, 17, 0, 0));

        let blank = build_item(&FileRecord::with_date("report.tif", " "), &opts, &ex);
        assert_eq!(blank.datetime, utc(2001, 2, 3, 4, 5, 6));
    }

    #[test]
    fn date_only_ids() {
        let mut opts = BuildOptions::new("https://x.test");
        opts.id_format = ItemIdFormat::Date;
        let item = build_item(&FileRecord::from_path("obs_20190702_1700.tif"), &opts, &extractor());
        assert_eq!(item.id, "2019-07-02");
    }

    #[test]
    fn bbox_override_matches_geometry_bounds() {
        let mut opts = BuildOptions::new("https://x.test");
        for bbox in [
            BoundingBox::new(-10.5, 20.25, 30.125, 40.0),
            BoundingBox::new(7.0, -3.0, 7.0, 4.0),
            BoundingBox::new(0.1, 0.2, 0.1 + 0.2, 0.7),
        ] {
            opts.bbox = Some(bbox);
            let item = build_item(&FileRecord::from_path("a.tif"), &opts, &extractor());
            assert_eq!(Some(item.bbox), bounds(&item.geometry));
            assert_eq!(item.bbox, bbox);
        }
    }

    #[test]
    fn asset_type_override_and_style_link() {
        let mut opts = BuildOptions::new("https://x.test");
        opts.asset_type_override = Some("application/x-custom".to_string());
        opts.style_url = Some("https://x.test/style.json".to_string());

        let item = build_item(&FileRecord::from_path("a.tif"), &opts, &extractor());
        assert_eq!(
            item.assets[PRIMARY_ASSET_KEY].media_type,
            "application/x-custom"
        );
        assert_eq!(
            item.links,
            vec![LinkEntry {
                rel: "style".to_string(),
                href: "https://x.test/style.json".to_string(),
                media_type: Some("application/json".to_string()),
                asset_keys: vec!["asset_0".to_string()],
            }]
        );
    }

    #[test]
    fn empty_style_and_override_are_ignored() {
        let mut opts = BuildOptions::new("https://x.test");
        opts.asset_type_override = Some(String::new());
        opts.style_url = Some(String::new());

        let item = build_item(&FileRecord::from_path("a.geojson"), &opts, &extractor());
        assert_eq!(
            item.assets[PRIMARY_ASSET_KEY].media_type,
            "application/geo+json"
        );
        assert!(item.links.is_empty());
    }

    #[test]
    fn colliding_ids_are_kept() {
        let records = vec![
            FileRecord::from_path("a_20200101.tif"),
            FileRecord::from_path("b_20200101.tif"),
        ];
        let items = build_items(&records, &BuildOptions::new("https://x.test"), &extractor());
        assert_eq!(items[0].id, items[1].id);
        assert_ne!(
            items[0].assets[PRIMARY_ASSET_KEY].href,
            items[1].assets[PRIMARY_ASSET_KEY].href
        );
    }
}
