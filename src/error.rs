use thiserror::Error;

/// Errors produced while serving a tile request
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// Zoom, x or y could not be parsed or lies outside the tile grid
    #[error("Invalid tile coordinate: {reason}")]
    InvalidCoordinate { reason: String },

    /// No active instance is registered under this name
    #[error("Instance not found: {instance}")]
    InstanceNotFound { instance: String },

    /// The requested file suffix is not a supported tile format
    #[error("Unsupported tile format: {filename}")]
    UnsupportedFormat { filename: String },

    /// Segment data could not be serialized
    #[error("Failed to encode tile: {message}")]
    EncodingFailure { message: String },
}

/// Errors raised when adding segments to a store
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Segment geometry is unusable (too few points, non-finite or out of range)
    #[error("Invalid segment {id}: {reason}")]
    InvalidSegment { id: u64, reason: String },
}

/// Errors that can occur while loading instances from disk
#[derive(Debug, Error)]
pub enum LoadError {
    /// Filesystem error
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file is not a GeoJSON document we can read
    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    /// The data directory does not exist or is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(String),
}
