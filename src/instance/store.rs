//! Segment storage and tile resolution.
//!
//! A [`SegmentStore`] owns the road segments of one instance. Segments are
//! bucketed by the tiles they touch at [`INDEX_ZOOM`], so resolving a tile
//! only inspects the buckets under it rather than the whole store.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::StoreError;
use crate::tile::{
    clip_edge, lon_lat_to_tile_fraction, ClipRect, TileBounds, TileCoordinate, TileIdentity,
};

/// Zoom level of the bucket index.
pub const INDEX_ZOOM: u16 = 14;

/// Extra margin around a tile, in tile widths, when resolving segments.
///
/// One sixteenth of a tile is 256 units at the MVT extent of 4096.
pub const NEIGHBORHOOD_BUFFER: f64 = 1.0 / 16.0;

/// Segments touching more index tiles than this skip the bucket index and are
/// checked on every query instead.
const MAX_BUCKETS_PER_SEGMENT: u64 = 1024;

/// Descriptive attributes of a segment (e.g. `highway=primary`).
pub type Tags = BTreeMap<String, String>;

// =============================================================================
// Segment
// =============================================================================

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// A piece of road geometry with its tags.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    id: u64,
    geometry: Vec<Coordinate>,
    tags: Tags,
}

impl Segment {
    pub fn new(id: u64, geometry: Vec<Coordinate>, tags: Tags) -> Self {
        Self { id, geometry, tags }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Ordered vertices of the segment.
    pub fn geometry(&self) -> &[Coordinate] {
        &self.geometry
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Bounding rectangle of the geometry.
    ///
    /// Returns `None` for an empty geometry.
    pub fn bounds(&self) -> Option<TileBounds> {
        let first = self.geometry.first()?;
        let mut bounds = TileBounds {
            west: first.lon,
            south: first.lat,
            east: first.lon,
            north: first.lat,
        };
        for c in &self.geometry[1..] {
            bounds.west = bounds.west.min(c.lon);
            bounds.east = bounds.east.max(c.lon);
            bounds.south = bounds.south.min(c.lat);
            bounds.north = bounds.north.max(c.lat);
        }
        Some(bounds)
    }

    fn validate(&self) -> Result<TileBounds, StoreError> {
        let invalid = |reason: String| StoreError::InvalidSegment {
            id: self.id,
            reason,
        };

        if self.geometry.len() < 2 {
            return Err(invalid(format!(
                "geometry has {} point(s), need at least 2",
                self.geometry.len()
            )));
        }

        for (i, c) in self.geometry.iter().enumerate() {
            if !c.lon.is_finite() || !c.lat.is_finite() {
                return Err(invalid(format!("point {} is not finite", i)));
            }
            if !(-180.0..=180.0).contains(&c.lon) || !(-90.0..=90.0).contains(&c.lat) {
                return Err(invalid(format!(
                    "point {} ({}, {}) is outside lon/lat range",
                    i, c.lon, c.lat
                )));
            }
        }

        self.bounds()
            .ok_or_else(|| invalid("geometry is empty".to_string()))
    }
}

// =============================================================================
// Segment Set
// =============================================================================

/// The segments resolved for one tile.
///
/// Segments are borrowed from the store they were resolved against, so a set
/// cannot outlive the lock guard protecting that store.
#[derive(Debug, Clone)]
pub struct SegmentSet<'a> {
    tile: TileCoordinate,
    segments: Vec<&'a Segment>,
}

impl<'a> SegmentSet<'a> {
    pub fn new(tile: TileCoordinate, segments: Vec<&'a Segment>) -> Self {
        Self { tile, segments }
    }

    /// A set for a tile with no roads.
    pub fn empty(tile: TileCoordinate) -> Self {
        Self::new(tile, Vec::new())
    }

    pub fn tile(&self) -> TileCoordinate {
        self.tile
    }

    pub fn identity(&self) -> TileIdentity {
        self.tile.identity()
    }

    pub fn segments(&self) -> &[&'a Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Segment> + '_ {
        self.segments.iter().copied()
    }
}

// =============================================================================
// Segment Store
// =============================================================================

/// Inclusive range of index tiles.
#[derive(Debug, Clone, Copy)]
struct IndexRange {
    x_min: u32,
    x_max: u32,
    y_min: u32,
    y_max: u32,
}

impl IndexRange {
    fn covering(bounds: &TileBounds) -> Self {
        let max = (1u32 << INDEX_ZOOM) - 1;
        let clamp = |v: f64| (v.floor().max(0.0) as u32).min(max);

        let (x0, y0) = lon_lat_to_tile_fraction(bounds.west, bounds.north, INDEX_ZOOM);
        let (x1, y1) = lon_lat_to_tile_fraction(bounds.east, bounds.south, INDEX_ZOOM);

        Self {
            x_min: clamp(x0),
            x_max: clamp(x1),
            y_min: clamp(y0),
            y_max: clamp(y1),
        }
    }

    fn count(&self) -> u64 {
        u64::from(self.x_max - self.x_min + 1) * u64::from(self.y_max - self.y_min + 1)
    }

    fn contains(&self, x: u32, y: u32) -> bool {
        (self.x_min..=self.x_max).contains(&x) && (self.y_min..=self.y_max).contains(&y)
    }
}

/// One occupied index tile.
#[derive(Debug, Clone)]
struct Bucket {
    x: u32,
    y: u32,
    members: Vec<usize>,
}

/// In-memory store of road segments with a tile bucket index.
#[derive(Debug, Clone, Default)]
pub struct SegmentStore {
    segments: Vec<Segment>,
    bounds: Vec<TileBounds>,
    index: HashMap<TileIdentity, Bucket>,
    /// Segments too large for the bucket index
    oversized: Vec<usize>,
}

impl SegmentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from segments, failing on the first invalid one.
    pub fn from_segments(
        segments: impl IntoIterator<Item = Segment>,
    ) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for segment in segments {
            store.insert(segment)?;
        }
        Ok(store)
    }

    /// Validate and add a segment.
    pub fn insert(&mut self, segment: Segment) -> Result<(), StoreError> {
        let bounds = segment.validate()?;
        let idx = self.segments.len();

        let range = IndexRange::covering(&bounds);
        if range.count() > MAX_BUCKETS_PER_SEGMENT {
            self.oversized.push(idx);
        } else {
            for x in range.x_min..=range.x_max {
                for y in range.y_min..=range.y_max {
                    self.index
                        .entry(TileIdentity::new(INDEX_ZOOM, x, y))
                        .or_insert_with(|| Bucket {
                            x,
                            y,
                            members: Vec::new(),
                        })
                        .members
                        .push(idx);
                }
            }
        }

        self.segments.push(segment);
        self.bounds.push(bounds);
        Ok(())
    }

    /// Remove every segment.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.bounds.clear();
        self.index.clear();
        self.oversized.clear();
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// All segments in insertion order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Resolve the segments intersecting a tile and its neighborhood buffer.
    ///
    /// Results keep insertion order. An empty set means the tile has no roads.
    pub fn query(&self, tile: &TileCoordinate) -> SegmentSet<'_> {
        let area = tile.buffered_bounds(NEIGHBORHOOD_BUFFER);
        let range = IndexRange::covering(&area);

        let mut candidates: BTreeSet<usize> = self.oversized.iter().copied().collect();

        if range.count() <= self.index.len() as u64 {
            for x in range.x_min..=range.x_max {
                for y in range.y_min..=range.y_max {
                    if let Some(bucket) = self.index.get(&TileIdentity::new(INDEX_ZOOM, x, y)) {
                        candidates.extend(bucket.members.iter().copied());
                    }
                }
            }
        } else {
            for bucket in self.index.values() {
                if range.contains(bucket.x, bucket.y) {
                    candidates.extend(bucket.members.iter().copied());
                }
            }
        }

        let segments = candidates
            .into_iter()
            .filter(|&i| self.bounds[i].intersects(&area))
            .map(|i| &self.segments[i])
            .filter(|segment| crosses_neighborhood(segment, tile))
            .collect();

        SegmentSet::new(*tile, segments)
    }
}

/// Check whether any edge of a segment passes through the buffered tile.
///
/// Works in tile units at the tile's zoom, where the neighborhood is a square.
fn crosses_neighborhood(segment: &Segment, tile: &TileCoordinate) -> bool {
    let origin = (f64::from(tile.x()), f64::from(tile.y()));
    let rect = ClipRect::new(-NEIGHBORHOOD_BUFFER, 1.0 + NEIGHBORHOOD_BUFFER);

    let points: Vec<(f64, f64)> = segment
        .geometry()
        .iter()
        .map(|c| {
            let (fx, fy) = lon_lat_to_tile_fraction(c.lon, c.lat, tile.zoom());
            (fx - origin.0, fy - origin.1)
        })
        .collect();

    points
        .windows(2)
        .any(|edge| clip_edge(edge[0], edge[1], rect).is_some())
}

// =============================================================================
// Tests
// =============================================================================
