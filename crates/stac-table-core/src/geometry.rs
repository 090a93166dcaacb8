//! Rectangle footprints and their WKB encoding.
//!
//! Item footprints are always axis-aligned rectangles. They are stored in the
//! GeoParquet `geometry` column as ISO WKB (little-endian) polygons, the
//! encoding GeoParquet 1.0 requires.

use geo_types::{Coord, LineString, Polygon};

use crate::item::BoundingBox;

const WKB_LITTLE_ENDIAN: u8 = 1;
const WKB_POLYGON: u32 = 3;

/// Closed rectangle ring for `bbox`, counter-clockwise starting at
/// `(maxx, miny)`.
pub fn rectangle(bbox: &BoundingBox) -> Polygon<f64> {
    let BoundingBox {
        min_x,
        min_y,
        max_x,
        max_y,
    } = *bbox;

    let ring = LineString::from(vec![
        Coord { x: max_x, y: min_y },
        Coord { x: max_x, y: max_y },
        Coord { x: min_x, y: max_y },
        Coord { x: min_x, y: min_y },
        Coord { x: max_x, y: min_y },
    ]);
    Polygon::new(ring, vec![])
}

/// Bounds of the exterior ring, or `None` for an empty polygon.
pub fn bounds(polygon: &Polygon<f64>) -> Option<BoundingBox> {
    let mut coords = polygon.exterior().coords();
    let first = coords.next()?;
    let init = BoundingBox::new(first.x, first.y, first.x, first.y);

    Some(coords.fold(init, |acc, c| BoundingBox {
        min_x: acc.min_x.min(c.x),
        min_y: acc.min_y.min(c.y),
        max_x: acc.max_x.max(c.x),
        max_y: acc.max_y.max(c.y),
    }))
}

/// Encode `polygon` as little-endian ISO WKB.
pub fn to_wkb(polygon: &Polygon<f64>) -> Vec<u8> {
    let rings: Vec<&LineString<f64>> = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .filter(|ring| !ring.0.is_empty())
        .collect();

    let coord_count: usize = rings.iter().map(|r| r.0.len()).sum();
    let mut out = Vec::with_capacity(9 + rings.len() * 4 + coord_count * 16);

    out.push(WKB_LITTLE_ENDIAN);
    out.extend_from_slice(&WKB_POLYGON.to_le_bytes());
    out.extend_from_slice(&(rings.len() as u32).to_le_bytes());
    for ring in rings {
        out.extend_from_slice(&(ring.0.len() as u32).to_le_bytes());
        for c in &ring.0 {
            out.extend_from_slice(&c.x.to_le_bytes());
            out.extend_from_slice(&c.y.to_le_bytes());
        }
    }
    out
}
