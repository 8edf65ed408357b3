//! Tile addressing and the tile response pipeline.
//!
//! # Architecture
//!
//! The tile service sits between the HTTP layer and the instance registry:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │ TileRequest
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              Tile Service               │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ SegmentStore │  │   TileFormat    │  │
//! │  │  (query by   │  │  (GeoJSON or    │  │
//! │  │   tile)      │  │   MVT encoder)  │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            InstanceRegistry             │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileCoordinate`]: Validated zoom/x/y address in the XYZ scheme
//! - [`TileIdentity`]: Single integer key derived from a coordinate
//! - [`TileService`]: Main entry point for tile requests
//! - [`TileRequest`]: Parameters for a tile request
//! - [`TileResponse`]: Encoded tile and metadata
//! - [`MvtLockPolicy`]: Lock taken on an instance while rendering MVT tiles

mod coord;
mod service;

pub use coord::{
    lon_lat_to_tile_fraction, TileBounds, TileCoordinate, TileIdentity, MAX_LATITUDE, MAX_ZOOM,
};
pub(crate) use coord::{clip_edge, ClipRect};
pub use service::{MvtLockPolicy, TileRequest, TileResponse, TileService};
