//! HTTP server layer for the road tile server.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │         GET /{instance}/tiles/{z}/{x}/{y}.{geojson,mvt}         │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │           routes            │  │
//! │  │ (requests, error mapping)│  │  (router config, CORS)      │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    health_handler, instances_handler, tile_handler, AppState, ErrorResponse, HandlerError,
    HealthResponse, InstanceSummary, InstancesResponse, TilePathParams,
};
pub use routes::{create_router, RouterConfig};
