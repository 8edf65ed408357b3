//! Tile encoders for road segments.
//!
//! Two output formats are supported, selected by the file suffix of the
//! request path:
//!
//! - **GeoJSON** (`.geojson`): a `FeatureCollection` carrying the original
//!   segment tags and unprojected coordinates
//! - **Mapbox Vector Tile** (`.mvt`): a protobuf tile with a single
//!   `transportation` layer carrying classified attributes
//!
//! Both encoders are stateless and implement [`TileEncoder`].

pub mod classify;
pub mod geojson;
pub mod mvt;
pub mod vector_tile;

use bytes::Bytes;
use prost::Message;

use crate::error::TileError;
use crate::instance::SegmentSet;

pub use self::classify::{classify, road_class, ClassifiedAttributes, CLASS_KEY, HIGHWAY_KEY};
pub use self::geojson::{GeoJsonEncoder, GEOJSON_CONTENT_TYPE};
pub use self::mvt::{MvtEncoder, LAYER_NAME, MVT_CONTENT_TYPE, TILE_BUFFER, TILE_EXTENT};

/// Serializes the segments of one tile.
pub trait TileEncoder: Send + Sync {
    /// Media type of the encoded output.
    fn content_type(&self) -> &'static str;

    /// Encode a segment set.
    ///
    /// Either the whole set is encoded or an error is returned; no partial
    /// output is produced.
    fn encode(&self, segments: &SegmentSet<'_>) -> Result<Bytes, TileError>;
}

// =============================================================================
// Tile Format
// =============================================================================

/// Output format of a tile request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileFormat {
    GeoJson,
    Mvt,
}

impl TileFormat {
    /// File suffix selecting this format, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            TileFormat::GeoJson => "geojson",
            TileFormat::Mvt => "mvt",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            TileFormat::GeoJson => GEOJSON_CONTENT_TYPE,
            TileFormat::Mvt => MVT_CONTENT_TYPE,
        }
    }

    /// Look up a format by its file suffix.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "geojson" => Some(TileFormat::GeoJson),
            "mvt" => Some(TileFormat::Mvt),
            _ => None,
        }
    }

    /// Split a final path segment such as `5371.mvt` into its stem and format.
    pub fn split_filename(filename: &str) -> Option<(&str, Self)> {
        let (stem, extension) = filename.rsplit_once('.')?;
        Self::from_extension(extension).map(|format| (stem, format))
    }

    /// Encode a segment set in this format.
    pub fn encode(&self, segments: &SegmentSet<'_>) -> Result<EncodedTile, TileError> {
        match self {
            TileFormat::GeoJson => {
                let encoder = GeoJsonEncoder::new();
                let collection = encoder.build_collection(segments)?;
                Ok(EncodedTile {
                    feature_count: collection.features.len(),
                    data: encoder.serialize(&collection)?,
                })
            }
            TileFormat::Mvt => {
                let tile = MvtEncoder::new().build_tile(segments)?;
                Ok(EncodedTile {
                    feature_count: tile.layers.iter().map(|l| l.features.len()).sum(),
                    data: Bytes::from(tile.encode_to_vec()),
                })
            }
        }
    }
}

/// Output of [`TileFormat::encode`].
#[derive(Debug, Clone)]
pub struct EncodedTile {
    pub data: Bytes,
    /// Features written to `data`. For MVT this excludes segments dropped by
    /// clipping or quantization.
    pub feature_count: usize,
}

impl std::fmt::Display for TileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}
