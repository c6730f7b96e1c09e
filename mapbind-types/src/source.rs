use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};

/// Tile size used for elevation sources when none is given.
pub const DEFAULT_DEM_TILE_SIZE: u32 = 512;
/// Maximum zoom level of elevation sources when none is given.
pub const DEFAULT_DEM_MAX_ZOOM: u8 = 14;

/// Specification of a data source as the engine receives it.
///
/// Serialized with a `type` discriminant matching the engine style format: `geojson`, `vector`
/// and `raster-dem`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SourceSpec {
    /// Inline feature collection.
    Geojson {
        /// Features of the source.
        data: FeatureCollection,
    },
    /// Remote vector tiles.
    Vector {
        /// Tile set URL.
        url: String,
    },
    /// Remote elevation tiles.
    RasterDem {
        /// Tile set URL.
        url: String,
        /// Size of a tile in pixels.
        #[serde(rename = "tileSize")]
        tile_size: u32,
        /// Maximum zoom level tiles are available for.
        maxzoom: u8,
    },
}

impl SourceSpec {
    /// Name of the source type as used by the engine style format.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Geojson { .. } => "geojson",
            Self::Vector { .. } => "vector",
            Self::RasterDem { .. } => "raster-dem",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_dem_uses_style_field_names() {
        let spec = SourceSpec::RasterDem {
            url: "mapbox://mapbox.mapbox-terrain-dem-v1".into(),
            tile_size: DEFAULT_DEM_TILE_SIZE,
            maxzoom: DEFAULT_DEM_MAX_ZOOM,
        };

        let value = serde_json::to_value(&spec).expect("serialization failed");
        assert_eq!(value["type"], "raster-dem");
        assert_eq!(value["tileSize"], 512);
        assert_eq!(value["maxzoom"], 14);
    }

    #[test]
    fn geojson_source_parses() {
        let spec: SourceSpec = serde_json::from_str(
            r#"{"type": "geojson", "data": {"type": "FeatureCollection", "features": []}}"#,
        )
        .expect("parsing failed");

        assert_eq!(spec.type_name(), "geojson");
    }
}
