//! HTTP request handlers for the road tile API.
//!
//! This module contains the Axum handlers for serving tiles, listing instances
//! and health checks.
//!
//! # Endpoints
//!
//! - `GET /{instance}/tiles/{z}/{x}/{y}.geojson` - Serve a GeoJSON tile
//! - `GET /{instance}/tiles/{z}/{x}/{y}.mvt` - Serve a Mapbox Vector Tile
//! - `GET /instances` - List loaded instances
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::TileError;
use crate::format::TileFormat;
use crate::instance::InstanceRegistry;
use crate::tile::{TileRequest, TileResponse, TileService};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the tile service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<R: InstanceRegistry> {
    /// The tile service for processing tile requests
    pub tile_service: Arc<TileService<R>>,

    /// Answer GeoJSON requests for unknown instances with 404 instead of an
    /// empty 204
    pub strict_not_found: bool,
}

impl<R: InstanceRegistry> AppState<R> {
    /// Create a new application state with the given tile service.
    pub fn new(tile_service: TileService<R>) -> Self {
        Self {
            tile_service: Arc::new(tile_service),
            strict_not_found: false,
        }
    }

    /// Set how GeoJSON requests for unknown instances are answered.
    pub fn with_strict_not_found(mut self, strict: bool) -> Self {
        self.strict_not_found = strict;
        self
    }
}

impl<R: InstanceRegistry> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            tile_service: Arc::clone(&self.tile_service),
            strict_not_found: self.strict_not_found,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for tile requests.
///
/// Extracted from: `/{instance}/tiles/{z}/{x}/{filename}`
/// where filename is `{y}.geojson` or `{y}.mvt`.
///
/// Numbers are kept as strings so malformed values are answered like any other
/// invalid coordinate.
#[derive(Debug, Deserialize)]
pub struct TilePathParams {
    /// Instance name
    pub instance: String,

    /// Zoom level
    pub z: String,

    /// Tile column
    pub x: String,

    /// Tile row with format suffix (e.g., "5371.mvt")
    pub filename: String,
}

impl TilePathParams {
    /// Validate the parameters into a tile request.
    pub fn to_request(&self) -> Result<TileRequest, TileError> {
        TileRequest::parse(&self.instance, &self.z, &self.x, &self.filename)
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_coordinate")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// Summary of one loaded instance.
#[derive(Debug, Serialize)]
pub struct InstanceSummary {
    /// Instance name, as used in tile paths
    pub name: String,

    /// Number of road segments
    pub segments: usize,

    /// Whether tiles are served for this instance
    pub active: bool,
}

/// Response from the instances list endpoint.
#[derive(Debug, Serialize)]
pub struct InstancesResponse {
    pub instances: Vec<InstanceSummary>,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert TileError to HTTP response.
///
/// 404s are logged at DEBUG level, other 4xx at WARN and 5xx at ERROR.
impl IntoResponse for TileError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            TileError::InvalidCoordinate { reason } => (
                StatusCode::NOT_FOUND,
                "invalid_coordinate",
                format!("Invalid tile coordinate: {}", reason),
            ),

            TileError::InstanceNotFound { instance } => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Instance not found: {}", instance),
            ),

            TileError::UnsupportedFormat { filename } => (
                StatusCode::NOT_FOUND,
                "unsupported_format",
                format!("Unsupported tile format: {}", filename),
            ),

            TileError::EncodingFailure { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "encoding_failure",
                format!("Failed to encode tile: {}", message),
            ),
        };

        // Log errors based on severity
        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else if status.is_client_error() {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);

        (status, Json(error_response)).into_response()
    }
}

/// Wrapper for handler errors to implement IntoResponse.
pub struct HandlerError(pub TileError);

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

impl From<TileError> for HandlerError {
    fn from(err: TileError) -> Self {
        HandlerError(err)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle tile requests.
///
/// # Endpoint
///
/// `GET /{instance}/tiles/{z}/{x}/{y}.geojson` or `.mvt`
///
/// # Response
///
/// - `200 OK`: Encoded tile with the format's `Content-Type`
/// - `204 No Content`: GeoJSON request for an unknown instance (unless strict)
/// - `404 Not Found`: Invalid coordinate, unknown format, or unknown instance
/// - `500 Internal Server Error`: Encoding failed
pub async fn tile_handler<R: InstanceRegistry + 'static>(
    State(state): State<AppState<R>>,
    Path(params): Path<TilePathParams>,
) -> Result<Response, HandlerError> {
    let request = params.to_request()?;

    match state.tile_service.get_tile(&request).await {
        Ok(response) => Ok(tile_response(response)),
        Err(TileError::InstanceNotFound { instance })
            if request.format == TileFormat::GeoJson && !state.strict_not_found =>
        {
            debug!(instance = %instance, "Unknown instance, answering GeoJSON with no content");
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        Err(err) => Err(err.into()),
    }
}

fn tile_response(response: TileResponse) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, response.content_type().to_string()),
            (
                header::HeaderName::from_static("x-tile-features"),
                response.feature_count.to_string(),
            ),
        ],
        response.data,
    )
        .into_response()
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle instance list requests.
///
/// # Endpoint
///
/// `GET /instances`
///
/// # Response
///
/// `200 OK` with JSON body, sorted by name:
/// ```json
/// {
///   "instances": [
///     {"name": "mytown", "segments": 1204, "active": true}
///   ]
/// }
/// ```
pub async fn instances_handler<R: InstanceRegistry + 'static>(
    State(state): State<AppState<R>>,
) -> Json<InstancesResponse> {
    let mut instances = Vec::new();
    for instance in state.tile_service.registry().list().await {
        instances.push(InstanceSummary {
            name: instance.name().to_string(),
            segments: instance.segment_count().await,
            active: instance.is_active(),
        });
    }

    Json(InstancesResponse { instances })
}

// =============================================================================
// Tests
// =============================================================================
