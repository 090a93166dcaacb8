//! STAC-like item data model.
//!
//! Items are produced once by [`crate::builder`] and never mutated; the
//! GeoParquet layer serialises them column-wise. [`AssetEntry`] and
//! [`LinkEntry`] are also what the validator lifts table cells into. Their
//! serde names follow the STAC keys (`type`, `asset:keys`).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use geo_types::Polygon;
use serde::{Deserialize, Serialize};

/// Value of the constant `type` column.
pub const ITEM_TYPE: &str = "Feature";

/// Value of the constant `stac_version` column.
pub const STAC_VERSION: &str = "1.0.0";

/// Key of the single asset each item carries.
pub const PRIMARY_ASSET_KEY: &str = "asset_0";

/// Role attached to the primary asset.
pub const DATA_ROLE: &str = "data";

/// Relation type of the optional style link.
pub const STYLE_REL: &str = "style";

/// Media type of the optional style link.
pub const STYLE_MEDIA_TYPE: &str = "application/json";

/// One input row: a file path plus an optional free-form date.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path (or name) of the asset file.
    pub path: String,
    /// Explicit acquisition date, if the input supplied one.
    #[serde(default)]
    pub date: Option<String>,
}

impl FileRecord {
    /// Record with only a path.
    pub fn from_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            date: None,
        }
    }

    /// Record with a path and an explicit date string.
    pub fn with_date(path: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            date: Some(date.into()),
        }
    }

    /// Final path component, accepting both `/` and `\` separators.
    pub fn file_name(&self) -> &str {
        self.path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.path.as_str())
    }
}

/// How an item id is rendered from its datetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemIdFormat {
    /// `2019-07-02`
    Date,
    /// `2019-07-02T17:00:00Z`
    #[default]
    DateTime,
}

impl ItemIdFormat {
    /// chrono pattern for this format.
    pub fn pattern(self) -> &'static str {
        match self {
            ItemIdFormat::Date => "%Y-%m-%d",
            ItemIdFormat::DateTime => "%Y-%m-%dT%H:%M:%SZ",
        }
    }

    /// Render `datetime` as an item id.
    pub fn render(self, datetime: &DateTime<Utc>) -> String {
        datetime.format(self.pattern()).to_string()
    }
}

/// Axis-aligned `(minx, miny, maxx, maxy)` rectangle in EPSG:4326 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum longitude.
    pub min_x: f64,
    /// Minimum latitude.
    pub min_y: f64,
    /// Maximum longitude.
    pub max_x: f64,
    /// Maximum latitude.
    pub max_y: f64,
}

impl BoundingBox {
    /// The whole world, `[-180, -90, 180, 90]`.
    pub const WORLD: BoundingBox = BoundingBox {
        min_x: -180.0,
        min_y: -90.0,
        max_x: 180.0,
        max_y: 90.0,
    };

    /// Build from corner values in `minx, miny, maxx, maxy` order.
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Values in `[minx, miny, maxx, maxy]` order.
    pub fn to_array(self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(self, other: BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(v: [f64; 4]) -> Self {
        BoundingBox::new(v[0], v[1], v[2], v[3])
    }
}

/// A downloadable file attached to an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    /// Public URL of the file.
    pub href: String,
    /// Media type.
    #[serde(rename = "type")]
    pub media_type: String,
    /// Role tags such as `data`.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// A relation from an item to another resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    /// Relation type, for example `style`.
    pub rel: String,
    /// Target URL.
    pub href: String,
    /// Media type of the target.
    #[serde(rename = "type", default)]
    pub media_type: Option<String>,
    /// Asset keys the link applies to.
    #[serde(rename = "asset:keys", default)]
    pub asset_keys: Vec<String>,
}

/// One STAC-like item.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Rendered from `datetime`; not guaranteed unique across a batch.
    pub id: String,
    /// Acquisition instant.
    pub datetime: DateTime<Utc>,
    /// Footprint rectangle.
    pub geometry: Polygon<f64>,
    /// Bounds of `geometry`.
    pub bbox: BoundingBox,
    /// Assets keyed by asset key.
    pub assets: BTreeMap<String, AssetEntry>,
    /// Relation links; empty when no style was supplied.
    pub links: Vec<LinkEntry>,
}
