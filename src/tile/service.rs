//! Tile Service for orchestrating tile responses.
//!
//! The TileService is the main entry point for tile requests. It orchestrates:
//! - Instance lookup via the registry
//! - Locking of the instance store
//! - Segment resolution for the requested tile
//! - Encoding in the requested format
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         TileService                             │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                    get_tile()                           │    │
//! │  │  1. Look up instance   3. Resolve segments              │    │
//! │  │  2. Lock store         4. Classify & encode             │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │           │
//! │           ▼                    ▼                    ▼           │
//! │  ┌──────────────────┐  ┌──────────────┐  ┌──────────────────┐   │
//! │  │ InstanceRegistry │  │ SegmentStore │  │   TileFormat     │   │
//! │  └──────────────────┘  └──────────────┘  └──────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Locking
//!
//! GeoJSON tiles are rendered under a shared lock on the instance store. MVT
//! tiles are rendered under an exclusive lock held from resolution until the
//! encoded bytes exist, unless the service is configured with
//! [`MvtLockPolicy::Shared`].

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use clap::ValueEnum;
use tracing::debug;

use crate::error::TileError;
use crate::format::TileFormat;
use crate::instance::{DataInstance, InstanceRegistry, SegmentStore};

use super::TileCoordinate;

// =============================================================================
// Tile Request
// =============================================================================

/// A request for a tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRequest {
    /// Name of the data instance
    pub instance: String,

    /// Validated tile address
    pub coordinate: TileCoordinate,

    /// Requested output format
    pub format: TileFormat,
}

impl TileRequest {
    pub fn new(instance: impl Into<String>, coordinate: TileCoordinate, format: TileFormat) -> Self {
        Self {
            instance: instance.into(),
            coordinate,
            format,
        }
    }

    /// Build a request from raw path segments.
    ///
    /// `filename` is the last path segment, such as `5371.mvt`. The format is
    /// checked first, then the coordinate.
    ///
    /// # Errors
    ///
    /// - [`TileError::UnsupportedFormat`] if the suffix is not a known format
    /// - [`TileError::InvalidCoordinate`] if z, x or y is malformed or off the grid
    pub fn parse(instance: &str, zoom: &str, x: &str, filename: &str) -> Result<Self, TileError> {
        let (y, format) =
            TileFormat::split_filename(filename).ok_or_else(|| TileError::UnsupportedFormat {
                filename: filename.to_string(),
            })?;
        let coordinate = TileCoordinate::parse(zoom, x, y)?;
        Ok(Self::new(instance, coordinate, format))
    }
}

// =============================================================================
// Tile Response
// =============================================================================

/// Response from the tile service.
#[derive(Debug, Clone)]
pub struct TileResponse {
    /// The encoded tile
    pub data: Bytes,

    /// Format of `data`
    pub format: TileFormat,

    /// Number of features written to `data`
    pub feature_count: usize,
}

impl TileResponse {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

// =============================================================================
// Lock Policy
// =============================================================================

/// Lock taken on the instance store while rendering an MVT tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum MvtLockPolicy {
    /// Exclusive lock; MVT requests for one instance are serialized
    #[default]
    Exclusive,

    /// Shared lock, as for GeoJSON
    Shared,
}

impl fmt::Display for MvtLockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MvtLockPolicy::Exclusive => f.write_str("exclusive"),
            MvtLockPolicy::Shared => f.write_str("shared"),
        }
    }
}

// =============================================================================
// Tile Service
// =============================================================================

/// Service turning tile requests into encoded tiles.
///
/// # Type Parameters
///
/// * `R` - The instance registry (e.g., [`crate::instance::InstanceManager`])
///
/// # Example
///
/// ```ignore
/// use roadtile_server::instance::load_instances;
/// use roadtile_server::tile::{TileRequest, TileService};
///
/// let registry = load_instances("./data").await?;
/// let service = TileService::new(registry);
///
/// let request = TileRequest::parse("mytown", "14", "8300", "5371.mvt")?;
/// let response = service.get_tile(&request).await?;
///
/// println!("{} features, {} bytes", response.feature_count, response.data.len());
/// ```
pub struct TileService<R: InstanceRegistry> {
    /// The registry instances are looked up in
    registry: Arc<R>,

    /// Lock taken for MVT rendering
    mvt_lock: MvtLockPolicy,
}

impl<R: InstanceRegistry> TileService<R> {
    /// Create a new tile service with the default MVT lock policy.
    pub fn new(registry: R) -> Self {
        Self::with_shared_registry(Arc::new(registry))
    }

    /// Create a new tile service with a shared registry.
    ///
    /// This allows the registry to be updated while the service is running.
    pub fn with_shared_registry(registry: Arc<R>) -> Self {
        Self {
            registry,
            mvt_lock: MvtLockPolicy::default(),
        }
    }

    /// Set the lock taken while rendering MVT tiles.
    pub fn with_mvt_lock(mut self, policy: MvtLockPolicy) -> Self {
        self.mvt_lock = policy;
        self
    }

    pub fn mvt_lock(&self) -> MvtLockPolicy {
        self.mvt_lock
    }

    /// Get a reference to the underlying registry.
    pub fn registry(&self) -> &Arc<R> {
        &self.registry
    }

    /// Look up an active instance.
    pub async fn resolve(&self, name: &str) -> Result<Arc<DataInstance>, TileError> {
        self.registry
            .try_get(name)
            .await
            .ok_or_else(|| TileError::InstanceNotFound {
                instance: name.to_string(),
            })
    }

    /// Render a tile.
    ///
    /// # Errors
    ///
    /// - [`TileError::InstanceNotFound`] if no active instance has the name
    /// - [`TileError::EncodingFailure`] if a resolved segment cannot be encoded
    pub async fn get_tile(&self, request: &TileRequest) -> Result<TileResponse, TileError> {
        let instance = self.resolve(&request.instance).await?;

        let response = match (request.format, self.mvt_lock) {
            (TileFormat::Mvt, MvtLockPolicy::Exclusive) => {
                let store = instance.write().await;
                render(&store, request)?
            }
            _ => {
                let store = instance.read().await;
                render(&store, request)?
            }
        };

        debug!(
            instance = %request.instance,
            zoom = request.coordinate.zoom(),
            x = request.coordinate.x(),
            y = request.coordinate.y(),
            format = %request.format,
            features = response.feature_count,
            bytes = response.data.len(),
            "Rendered tile"
        );

        Ok(response)
    }
}

impl<R: InstanceRegistry> Clone for TileService<R> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            mvt_lock: self.mvt_lock,
        }
    }
}

/// Resolve and encode under a lock the caller already holds.
fn render(store: &SegmentStore, request: &TileRequest) -> Result<TileResponse, TileError> {
    let segments = store.query(&request.coordinate);
    let encoded = request.format.encode(&segments)?;
    Ok(TileResponse {
        data: encoded.data,
        format: request.format,
        feature_count: encoded.feature_count,
    })
}

// =============================================================================
// Tests
// =============================================================================
