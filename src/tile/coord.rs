//! Tile addressing.
//!
//! Converts textual `z/x/y` path segments into a validated [`TileCoordinate`]
//! and derives the [`TileIdentity`] used as the lookup key into segment stores.
//! Also hosts the Web Mercator helpers shared by the store index and the MVT
//! reprojection.

use std::f64::consts::PI;
use std::fmt;

use crate::error::TileError;

/// Deepest zoom level accepted by the tile grid.
///
/// At zoom 30 the column/row count (2^30) still fits in an `i32` and the
/// identity numbering fits comfortably in a `u64`.
pub const MAX_ZOOM: u16 = 30;

/// Latitude limit of the Web Mercator projection, in degrees.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

// =============================================================================
// Tile Coordinate
// =============================================================================

/// A validated tile coordinate in the XYZ (slippy map) scheme.
///
/// `x` grows eastwards and `y` grows southwards from the north-west corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoordinate {
    zoom: u16,
    x: i32,
    y: i32,
}

impl TileCoordinate {
    /// Create a coordinate, checking that it lies on the tile grid.
    pub fn new(zoom: u16, x: i32, y: i32) -> Result<Self, TileError> {
        if zoom > MAX_ZOOM {
            return Err(TileError::InvalidCoordinate {
                reason: format!("zoom {} exceeds maximum of {}", zoom, MAX_ZOOM),
            });
        }

        let dim = 1i64 << zoom;
        if x < 0 || i64::from(x) >= dim || y < 0 || i64::from(y) >= dim {
            return Err(TileError::InvalidCoordinate {
                reason: format!(
                    "tile ({}, {}) outside grid 0..{} at zoom {}",
                    x, y, dim, zoom
                ),
            });
        }

        Ok(Self { zoom, x, y })
    }

    /// Parse a coordinate from its textual path segments.
    ///
    /// Zoom must parse as `u16`, `x` and `y` as `i32`. Any failure, including
    /// a coordinate off the grid, yields [`TileError::InvalidCoordinate`].
    pub fn parse(zoom: &str, x: &str, y: &str) -> Result<Self, TileError> {
        let zoom: u16 = zoom.parse().map_err(|_| TileError::InvalidCoordinate {
            reason: format!("zoom '{}' is not an unsigned 16-bit integer", zoom),
        })?;
        let x: i32 = x.parse().map_err(|_| TileError::InvalidCoordinate {
            reason: format!("x '{}' is not an integer", x),
        })?;
        let y: i32 = y.parse().map_err(|_| TileError::InvalidCoordinate {
            reason: format!("y '{}' is not an integer", y),
        })?;

        Self::new(zoom, x, y)
    }

    pub fn zoom(&self) -> u16 {
        self.zoom
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    /// Derive the lookup key for this tile.
    pub fn identity(&self) -> TileIdentity {
        TileIdentity::new(self.zoom, self.x as u32, self.y as u32)
    }

    /// Geographic bounds of the tile.
    pub fn bounds(&self) -> TileBounds {
        self.buffered_bounds(0.0)
    }

    /// Geographic bounds of the tile grown by `buffer` tile widths on each edge.
    pub fn buffered_bounds(&self, buffer: f64) -> TileBounds {
        let n = (1u64 << self.zoom) as f64;
        let x = f64::from(self.x);
        let y = f64::from(self.y);

        TileBounds {
            west: tile_x_to_lon(x - buffer, n),
            east: tile_x_to_lon(x + 1.0 + buffer, n),
            north: tile_y_to_lat(y - buffer, n),
            south: tile_y_to_lat(y + 1.0 + buffer, n),
        }
    }
}

impl fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

// =============================================================================
// Tile Identity
// =============================================================================

/// Canonical integer key of a tile.
///
/// Tiles are numbered zoom by zoom: all `(4^z - 1) / 3` tiles of lower zooms
/// come first, then row-major order within zoom `z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileIdentity(u64);

impl TileIdentity {
    pub(crate) fn new(zoom: u16, x: u32, y: u32) -> Self {
        let zoom = u32::from(zoom);
        let offset = ((1u64 << (2 * zoom)) - 1) / 3;
        let row = u64::from(y) << zoom;
        Self(offset + row + u64::from(x))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Geographic helpers
// =============================================================================

/// A longitude/latitude rectangle in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl TileBounds {
    /// Check whether two rectangles overlap (touching edges count).
    pub fn intersects(&self, other: &TileBounds) -> bool {
        self.west <= other.east
            && other.west <= self.east
            && self.south <= other.north
            && other.south <= self.north
    }
}

/// Project a lon/lat position to fractional tile coordinates at `zoom`.
///
/// Latitudes are clamped to the Mercator limit so the poles stay finite.
pub fn lon_lat_to_tile_fraction(lon: f64, lat: f64, zoom: u16) -> (f64, f64) {
    let n = (1u64 << zoom.min(MAX_ZOOM)) as f64;
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();

    let x = (lon + 180.0) / 360.0 * n;
    let y = (1.0 - lat.tan().asinh() / PI) / 2.0 * n;
    (x, y)
}

/// Square clip window in some planar coordinate space.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ClipRect {
    min: f64,
    max: f64,
}

impl ClipRect {
    pub(crate) fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Liang-Barsky clip of one edge.
///
/// Returns the clipped endpoints and whether the start and end were moved,
/// or `None` when the edge misses the window.
pub(crate) fn clip_edge(
    p0: (f64, f64),
    p1: (f64, f64),
    rect: ClipRect,
) -> Option<((f64, f64), (f64, f64), bool, bool)> {
    let dx = p1.0 - p0.0;
    let dy = p1.1 - p0.1;
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;

    let checks = [
        (-dx, p0.0 - rect.min),
        (dx, rect.max - p0.0),
        (-dy, p0.1 - rect.min),
        (dy, rect.max - p0.1),
    ];

    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }
    }

    let a = (p0.0 + t0 * dx, p0.1 + t0 * dy);
    let b = (p0.0 + t1 * dx, p0.1 + t1 * dy);
    Some((a, b, t0 > 0.0, t1 < 1.0))
}

fn tile_x_to_lon(x: f64, n: f64) -> f64 {
    x / n * 360.0 - 180.0
}

fn tile_y_to_lat(y: f64, n: f64) -> f64 {
    (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees()
}

// =============================================================================
// Tests
// =============================================================================
