//! The GeoParquet `geo` file metadata document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::schema::GEOMETRY_COLUMN;
use crate::item::{BoundingBox, Item};

/// Parquet key-value metadata key holding the document.
pub const GEO_METADATA_KEY: &str = "geo";

/// GeoParquet format version written.
pub const GEOPARQUET_VERSION: &str = "1.0.0";

/// Geometry encoding of the primary column.
pub const WKB_ENCODING: &str = "WKB";

/// Top-level `geo` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoMetadata {
    /// GeoParquet version.
    pub version: String,
    /// Name of the default geometry column.
    pub primary_column: String,
    /// Per geometry column metadata.
    pub columns: BTreeMap<String, GeoColumnMetadata>,
}

/// Metadata of one geometry column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoColumnMetadata {
    /// Encoding, always `WKB` here.
    pub encoding: String,
    /// Geometry types present in the column.
    #[serde(default)]
    pub geometry_types: Vec<String>,
    /// PROJJSON CRS; absent means OGC:CRS84.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<Value>,
    /// Bounds of all geometries in the column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,
}

/// PROJJSON for EPSG:4326 (WGS 84, latitude/longitude axis order).
pub fn epsg_4326_projjson() -> Value {
    json!({
        "$schema": "https://proj.org/schemas/v0.7/projjson.schema.json",
        "type": "GeographicCRS",
        "name": "WGS 84",
        "datum": {
            "type": "GeodeticReferenceFrame",
            "name": "World Geodetic System 1984",
            "ellipsoid": {
                "name": "WGS 84",
                "semi_major_axis": 6378137,
                "inverse_flattening": 298.257223563
            }
        },
        "coordinate_system": {
            "subtype": "ellipsoidal",
            "axis": [
                {
                    "name": "Geodetic latitude",
                    "abbreviation": "Lat",
                    "direction": "north",
                    "unit": "degree"
                },
                {
                    "name": "Geodetic longitude",
                    "abbreviation": "Lon",
                    "direction": "east",
                    "unit": "degree"
                }
            ]
        },
        "id": { "authority": "EPSG", "code": 4326 }
    })
}

impl GeoMetadata {
    /// Metadata describing a table of `items`: polygons in EPSG:4326 with the
    /// union of all item bboxes. The bbox is omitted for an empty table.
    pub fn for_items(items: &[Item]) -> Self {
        let bbox = items
            .iter()
            .map(|item| item.bbox)
            .reduce(BoundingBox::union)
            .map(|b| b.to_array().to_vec());

        let mut columns = BTreeMap::new();
        columns.insert(
            GEOMETRY_COLUMN.to_string(),
            GeoColumnMetadata {
                encoding: WKB_ENCODING.to_string(),
                geometry_types: vec!["Polygon".to_string()],
                crs: Some(epsg_4326_projjson()),
                bbox,
            },
        );

        Self {
            version: GEOPARQUET_VERSION.to_string(),
            primary_column: GEOMETRY_COLUMN.to_string(),
            columns,
        }
    }

    /// Metadata of the primary geometry column, if present.
    pub fn primary(&self) -> Option<&GeoColumnMetadata> {
        self.columns.get(&self.primary_column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::rectangle;
    use chrono::{TimeZone, Utc};

    fn item_with_bbox(bbox: BoundingBox) -> Item {
        Item {
            id: "x".to_string(),
            datetime: Utc
                .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
                .single()
                .expect("valid"),
            geometry: rectangle(&bbox),
            bbox,
            assets: BTreeMap::new(),
            links: Vec::new(),
        }
    }

    #[test]
    fn bbox_is_union_of_items() {
        let meta = GeoMetadata::for_items(&[
            item_with_bbox(BoundingBox::new(0.0, 0.0, 1.0, 1.0)),
            item_with_bbox(BoundingBox::new(-5.0, 0.5, 0.5, 3.0)),
        ]);
        let primary = meta.primary().expect("geometry column");
        assert_eq!(primary.bbox, Some(vec![-5.0, 0.0, 1.0, 3.0]));
        assert_eq!(primary.encoding, "WKB");
        assert_eq!(primary.geometry_types, vec!["Polygon".to_string()]);
    }

    #[test]
    fn serialised_shape() -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(GeoMetadata::for_items(&[]))?;
        assert_eq!(value["version"], "1.0.0");
        assert_eq!(value["primary_column"], "geometry");
        assert_eq!(value["columns"]["geometry"]["crs"]["id"]["code"], 4326);
        assert!(value["columns"]["geometry"].get("bbox").is_none());
        Ok(())
    }
}
