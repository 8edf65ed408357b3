//! Mapbox Vector Tile encoder.
//!
//! Writes all segments of a tile into a single `transportation` layer.
//!
//! # Encoding
//!
//! - Geometry is projected to Web Mercator and quantized to a 4096-unit grid
//!   local to the tile, with the origin at the north-west corner.
//! - Lines are clipped to the tile plus a 256-unit buffer. A segment leaving
//!   and re-entering the buffer becomes a multi-part line.
//! - Consecutive vertices that quantize to the same grid point are collapsed;
//!   a segment left with a single point is omitted.
//! - Attributes come from [`classify`], never from the raw tags.

use std::collections::HashMap;

use bytes::Bytes;
use prost::Message;

use crate::error::TileError;
use crate::instance::{Segment, SegmentSet};
use crate::tile::{clip_edge, lon_lat_to_tile_fraction, ClipRect, TileCoordinate};

use super::classify::classify;
use super::vector_tile::{Feature, GeomType, Layer, Tile, Value};
use super::TileEncoder;

/// Name of the single layer in every tile.
pub const LAYER_NAME: &str = "transportation";

/// Grid resolution of a tile side.
pub const TILE_EXTENT: u32 = 4096;

/// Clip margin around the tile, in grid units.
pub const TILE_BUFFER: u32 = 256;

/// Vector tile specification version written to the layer.
pub const MVT_VERSION: u32 = 2;

/// Media type of encoded tiles.
pub const MVT_CONTENT_TYPE: &str = "application/x-protobuf";

const MOVE_TO: u32 = 1;
const LINE_TO: u32 = 2;

// =============================================================================
// Encoder
// =============================================================================

/// Encodes segment sets as classified, quantized vector tiles.
#[derive(Debug, Clone, Copy, Default)]
pub struct MvtEncoder;

impl MvtEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Build the tile message without serializing it.
    pub fn build_tile(&self, segments: &SegmentSet<'_>) -> Result<Tile, TileError> {
        let mut layer = LayerBuilder::new(LAYER_NAME);
        let tile = segments.tile();

        for segment in segments.iter() {
            let parts = project_segment(segment, &tile)?;
            if parts.is_empty() {
                continue;
            }

            let tags = classify(segment.tags())
                .into_iter()
                .flat_map(|(key, value)| {
                    let key = layer.key_index(key);
                    let value = layer.string_value_index(&value);
                    [key, value]
                })
                .collect();

            layer.features.push(Feature {
                id: Some(segment.id()),
                tags,
                r#type: Some(GeomType::Linestring as i32),
                geometry: encode_lines(&parts),
            });
        }

        Ok(Tile {
            layers: vec![layer.finish()],
        })
    }
}

impl TileEncoder for MvtEncoder {
    fn content_type(&self) -> &'static str {
        MVT_CONTENT_TYPE
    }

    fn encode(&self, segments: &SegmentSet<'_>) -> Result<Bytes, TileError> {
        let tile = self.build_tile(segments)?;
        Ok(Bytes::from(tile.encode_to_vec()))
    }
}

// =============================================================================
// Layer Builder
// =============================================================================

/// Accumulates features while deduplicating keys and values.
struct LayerBuilder {
    name: String,
    features: Vec<Feature>,
    keys: Vec<String>,
    key_lookup: HashMap<String, u32>,
    values: Vec<Value>,
    value_lookup: HashMap<String, u32>,
}

impl LayerBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            features: Vec::new(),
            keys: Vec::new(),
            key_lookup: HashMap::new(),
            values: Vec::new(),
            value_lookup: HashMap::new(),
        }
    }

    fn key_index(&mut self, key: &str) -> u32 {
        if let Some(&idx) = self.key_lookup.get(key) {
            return idx;
        }
        let idx = self.keys.len() as u32;
        self.keys.push(key.to_string());
        self.key_lookup.insert(key.to_string(), idx);
        idx
    }

    fn string_value_index(&mut self, value: &str) -> u32 {
        if let Some(&idx) = self.value_lookup.get(value) {
            return idx;
        }
        let idx = self.values.len() as u32;
        self.values.push(Value::string(value));
        self.value_lookup.insert(value.to_string(), idx);
        idx
    }

    fn finish(self) -> Layer {
        Layer {
            version: MVT_VERSION,
            name: self.name,
            features: self.features,
            keys: self.keys,
            values: self.values,
            extent: Some(TILE_EXTENT),
        }
    }
}

// =============================================================================
// Geometry
// =============================================================================

type GridPoint = (i32, i32);

/// Project, clip and quantize a segment into tile grid lines.
fn project_segment(segment: &Segment, tile: &TileCoordinate) -> Result<Vec<Vec<GridPoint>>, TileError> {
    let extent = f64::from(TILE_EXTENT);
    let origin_x = f64::from(tile.x());
    let origin_y = f64::from(tile.y());

    let mut points = Vec::with_capacity(segment.geometry().len());
    for c in segment.geometry() {
        let (fx, fy) = lon_lat_to_tile_fraction(c.lon, c.lat, tile.zoom());
        let x = (fx - origin_x) * extent;
        let y = (fy - origin_y) * extent;
        if !x.is_finite() || !y.is_finite() {
            return Err(TileError::EncodingFailure {
                message: format!(
                    "segment {} has a non-finite coordinate ({}, {})",
                    segment.id(),
                    c.lon,
                    c.lat
                ),
            });
        }
        points.push((x, y));
    }

    if points.len() < 2 {
        return Err(TileError::EncodingFailure {
            message: format!(
                "segment {} has {} point(s), need at least 2",
                segment.id(),
                points.len()
            ),
        });
    }

    let lines = clip_polyline(&points, tile_clip_rect())
        .into_iter()
        .filter_map(|line| quantize(&line))
        .collect();

    Ok(lines)
}

/// Round to grid points, dropping repeats. `None` if fewer than 2 remain.
fn quantize(line: &[(f64, f64)]) -> Option<Vec<GridPoint>> {
    let mut out: Vec<GridPoint> = Vec::with_capacity(line.len());
    for &(x, y) in line {
        let p = (x.round() as i32, y.round() as i32);
        if out.last() != Some(&p) {
            out.push(p);
        }
    }
    (out.len() >= 2).then_some(out)
}

fn tile_clip_rect() -> ClipRect {
    let buffer = f64::from(TILE_BUFFER);
    ClipRect::new(-buffer, f64::from(TILE_EXTENT) + buffer)
}

/// Clip a polyline to a square, splitting it where it leaves the square.
fn clip_polyline(points: &[(f64, f64)], rect: ClipRect) -> Vec<Vec<(f64, f64)>> {
    let mut lines = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();

    for pair in points.windows(2) {
        match clip_edge(pair[0], pair[1], rect) {
            Some((a, b, entered, exited)) => {
                if entered || current.is_empty() {
                    if current.len() >= 2 {
                        lines.push(std::mem::take(&mut current));
                    }
                    current.clear();
                    current.push(a);
                }
                current.push(b);
                if exited {
                    lines.push(std::mem::take(&mut current));
                }
            }
            None => {
                if current.len() >= 2 {
                    lines.push(std::mem::take(&mut current));
                }
                current.clear();
            }
        }
    }

    if current.len() >= 2 {
        lines.push(current);
    }
    lines
}

/// Encode lines as a MoveTo/LineTo command stream with zigzag deltas.
fn encode_lines(lines: &[Vec<GridPoint>]) -> Vec<u32> {
    let capacity = lines.iter().map(|l| l.len() * 2 + 2).sum();
    let mut out = Vec::with_capacity(capacity);
    let mut cursor: GridPoint = (0, 0);

    for line in lines {
        let (first, rest) = match line.split_first() {
            Some(split) => split,
            None => continue,
        };

        out.push(command(MOVE_TO, 1));
        push_delta(&mut out, &mut cursor, *first);

        out.push(command(LINE_TO, rest.len() as u32));
        for &point in rest {
            push_delta(&mut out, &mut cursor, point);
        }
    }

    out
}

fn push_delta(out: &mut Vec<u32>, cursor: &mut GridPoint, point: GridPoint) {
    out.push(zigzag(point.0 - cursor.0));
    out.push(zigzag(point.1 - cursor.1));
    *cursor = point;
}

fn command(id: u32, count: u32) -> u32 {
    (id & 0x7) | (count << 3)
}

fn zigzag(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

// =============================================================================
// Tests
// =============================================================================
