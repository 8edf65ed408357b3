//! GeoJSON tile encoder.
//!
//! Emits a `FeatureCollection` with one `LineString` feature per segment.
//! Coordinates are written unprojected and unclipped, and properties carry the
//! original segment tags.

use bytes::Bytes;
use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::Number;

use crate::error::TileError;
use crate::instance::{Segment, SegmentSet};

use super::TileEncoder;

/// Media type of GeoJSON tiles.
pub const GEOJSON_CONTENT_TYPE: &str = "application/json";

/// Encodes segment sets as GeoJSON feature collections.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonEncoder;

impl GeoJsonEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Build the feature collection without serializing it.
    pub fn build_collection(&self, segments: &SegmentSet<'_>) -> Result<FeatureCollection, TileError> {
        let features = segments
            .iter()
            .map(segment_to_feature)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }

    /// Serialize a built collection.
    pub fn serialize(&self, collection: &FeatureCollection) -> Result<Bytes, TileError> {
        serde_json::to_vec(collection)
            .map(Bytes::from)
            .map_err(|e| TileError::EncodingFailure {
                message: e.to_string(),
            })
    }
}

impl TileEncoder for GeoJsonEncoder {
    fn content_type(&self) -> &'static str {
        GEOJSON_CONTENT_TYPE
    }

    fn encode(&self, segments: &SegmentSet<'_>) -> Result<Bytes, TileError> {
        let collection = self.build_collection(segments)?;
        self.serialize(&collection)
    }
}

fn segment_to_feature(segment: &Segment) -> Result<Feature, TileError> {
    let geometry = segment.geometry();
    if geometry.len() < 2 {
        return Err(TileError::EncodingFailure {
            message: format!(
                "segment {} has {} point(s), need at least 2",
                segment.id(),
                geometry.len()
            ),
        });
    }

    let mut line = Vec::with_capacity(geometry.len());
    for c in geometry {
        // serde_json has no representation for NaN or infinity
        if !c.lon.is_finite() || !c.lat.is_finite() {
            return Err(TileError::EncodingFailure {
                message: format!(
                    "segment {} has a non-finite coordinate ({}, {})",
                    segment.id(),
                    c.lon,
                    c.lat
                ),
            });
        }
        line.push(vec![c.lon, c.lat]);
    }

    let properties: JsonObject = segment
        .tags()
        .iter()
        .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
        .collect();

    Ok(Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::LineString(line))),
        id: Some(Id::Number(Number::from(segment.id()))),
        properties: Some(properties),
        foreign_members: None,
    })
}

// =============================================================================
// Tests
// =============================================================================
