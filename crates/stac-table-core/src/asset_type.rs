//! Media type lookup for asset files.

use std::path::Path;

/// Fallback for extensions not in [`ASSET_TYPES`].
pub const DEFAULT_ASSET_TYPE: &str = "application/octet-stream";

/// Lower-cased extension (without the dot) to media type.
pub const ASSET_TYPES: [(&str, &str); 6] = [
    ("fgb", "application/vnd.flatgeobuf"),
    ("geojson", "application/geo+json"),
    ("json", "application/geo+json"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("cog", "image/tiff"),
];

/// Media type for the file at `path`, keyed on its lower-cased extension.
pub fn resolve_asset_type(path: &str) -> &'static str {
    let Some(ext) = Path::new(path).extension() else {
        return DEFAULT_ASSET_TYPE;
    };
    let ext = ext.to_string_lossy().to_ascii_lowercase();

    ASSET_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, media_type)| *media_type)
        .unwrap_or(DEFAULT_ASSET_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions_case_insensitive() {
        assert_eq!(resolve_asset_type("a/b/roads.FGB"), "application/vnd.flatgeobuf");
        assert_eq!(resolve_asset_type("x.geojson"), "application/geo+json");
        assert_eq!(resolve_asset_type("x.Json"), "application/geo+json");
        assert_eq!(resolve_asset_type("dem.tif"), "image/tiff");
        assert_eq!(resolve_asset_type("dem.TIFF"), "image/tiff");
        assert_eq!(resolve_asset_type("dem.cog"), "image/tiff");
    }

    #[test]
    fn unknown_or_missing_extension_falls_back() {
        assert_eq!(resolve_asset_type("data.zip"), DEFAULT_ASSET_TYPE);
        assert_eq!(resolve_asset_type("README"), DEFAULT_ASSET_TYPE);
        assert_eq!(resolve_asset_type(""), DEFAULT_ASSET_TYPE);
    }
}
