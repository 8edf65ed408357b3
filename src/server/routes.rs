//! Router configuration for the road tile server.
//!
//! This module defines the HTTP routes and applies middleware for CORS and
//! request tracing.
//!
//! # Route Structure
//!
//! ```text
//! /health                                    - Health check
//! /instances                                 - List loaded instances
//! /{instance}/tiles/{z}/{x}/{y}.geojson      - GeoJSON tile
//! /{instance}/tiles/{z}/{x}/{y}.mvt          - Mapbox Vector Tile
//! ```
//!
//! # Example
//!
//! ```ignore
//! use roadtile_server::instance::load_instances;
//! use roadtile_server::server::{create_router, RouterConfig};
//! use roadtile_server::tile::TileService;
//!
//! // Create the tile service
//! let registry = load_instances("./data").await?;
//! let tile_service = TileService::new(registry);
//!
//! // Configure and create router
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(tile_service, config);
//!
//! // Run the server
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{routing::get, Router};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, instances_handler, tile_handler, AppState};
use crate::instance::InstanceRegistry;
use crate::tile::TileService;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,

    /// Answer GeoJSON requests for unknown instances with 404 instead of 204
    pub strict_not_found: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a new router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Tracing is enabled
    /// - GeoJSON requests for unknown instances get 204 No Content
    pub fn new() -> Self {
        Self {
            cors_origins: None, // Allow any origin by default
            enable_tracing: true,
            strict_not_found: false,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    /// Pass None (or don't call this method) to allow any origin.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Answer unknown instances with 404 for both formats.
    pub fn with_strict_not_found(mut self, strict: bool) -> Self {
        self.strict_not_found = strict;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// # Arguments
///
/// * `tile_service` - The tile service for handling tile requests
/// * `config` - Router configuration
///
/// # Returns
///
/// A configured Axum router ready to be served.
pub fn create_router<R>(tile_service: TileService<R>, config: RouterConfig) -> Router
where
    R: InstanceRegistry + 'static,
{
    let app_state = AppState::new(tile_service).with_strict_not_found(config.strict_not_found);

    let cors = build_cors_layer(&config);

    // Uses {filename} to capture "{y}.geojson" and "{y}.mvt"
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/instances", get(instances_handler::<R>))
        .route(
            "/{instance}/tiles/{z}/{x}/{filename}",
            get(tile_handler::<R>),
        )
        .with_state(app_state)
        .layer(cors);

    // Add tracing if enabled
    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => {
            // No origins allowed - this effectively disables CORS
            cors
        }
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
