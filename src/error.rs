//! Error taxonomy for footprint generation.

use thiserror::Error;

/// Errors that can occur while generating a footprint.
///
/// Every variant is handed back to the caller unchanged; the engine never
/// retries. Whether a failure is fatal for a batch is the caller's call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FootprintError {
    /// Coordinate arrays are mismatched or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A configuration value is out of range or missing.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Too few valid points survived filtering to fit a shape.
    #[error("insufficient data: {found} usable points, at least {required} required")]
    InsufficientData { found: usize, required: usize },

    /// The raster strategy found no coverage.
    #[error("no valid polygons found")]
    NoFootprintFound,

    /// Post-fit validity repair did not produce a valid geometry.
    #[error("geometry repair failed: {0}")]
    GeometryRepairFailed(String),

    /// Delaunay triangulation rejected the point set.
    #[error("triangulation failed: {0}")]
    Triangulation(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FootprintError>;
