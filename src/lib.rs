//! # Road Tile Server
//!
//! A tile server for routing data: road segments of named data instances are
//! served per map tile as GeoJSON or Mapbox Vector Tiles.
//!
//! ## Features
//!
//! - **Two formats**: GeoJSON with the original segment tags, and MVT with a
//!   single `transportation` layer of classified roads
//! - **Multiple instances**: every `*.geojson` file in the data directory is
//!   served under its own name
//! - **Tile index**: segments are bucketed at zoom 14 for fast lookups
//! - **Safe concurrent updates**: instance stores sit behind a read-write lock
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`instance`] - Data instances, segment store and registry
//! - [`mod@format`] - Road classification and tile encoders
//! - [`tile`] - Tile addressing and the tile service
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use roadtile_server::{create_router, load_instances, RouterConfig, TileService};
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = load_instances("./data").await.unwrap();
//!     let router = create_router(TileService::new(registry), RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod instance;
pub mod server;
pub mod tile;

// Re-export commonly used types
pub use config::{CheckConfig, Cli, Command, ServeConfig};
pub use error::{LoadError, StoreError, TileError};
pub use format::{classify, EncodedTile, GeoJsonEncoder, MvtEncoder, TileEncoder, TileFormat};
pub use instance::{
    load_instances, Coordinate, DataInstance, InstanceManager, InstanceRegistry, Segment,
    SegmentSet, SegmentStore, Tags,
};
pub use server::{
    create_router, health_handler, instances_handler, tile_handler, AppState, ErrorResponse,
    HealthResponse, RouterConfig, TilePathParams,
};
pub use tile::{
    MvtLockPolicy, TileCoordinate, TileIdentity, TileRequest, TileResponse, TileService,
};
