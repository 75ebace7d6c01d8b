//! Error types for tile addressing.

use thiserror::Error;

/// Result type alias using TilingError.
pub type TilingResult<T> = Result<T, TilingError>;

/// Primary error type for tile addressing operations.
#[derive(Debug, Error)]
pub enum TilingError {
    // === Configuration Errors (construction time) ===
    #[error("Duplicate zoom identifier '{identifier}' in tile matrix set '{tile_matrix_set}'")]
    DuplicateZoom {
        tile_matrix_set: String,
        identifier: String,
    },

    #[error("Zoom '{identifier}' has non-square tiles ({width}x{height})")]
    NonSquareTile {
        identifier: String,
        width: u32,
        height: u32,
    },

    #[error("Zoom '{identifier}' tile size {found} does not match tile matrix set tile size {expected}")]
    TileSizeMismatch {
        identifier: String,
        expected: u32,
        found: u32,
    },

    #[error("Invalid CRS: {0}")]
    InvalidCrs(String),

    #[error("Invalid tile matrix set: {0}")]
    InvalidConfig(String),

    #[error("Unsupported tile matrix set shape: {0}")]
    UnsupportedShape(String),

    // === Addressing Errors (per call) ===
    #[error("Address out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid quadkey: {0}")]
    InvalidQuadKey(String),

    #[error("Invalid tile name: {0}")]
    InvalidTileName(String),

    // === Parsing Errors ===
    #[error("JSON error: {0}")]
    Json(String),
}

impl TilingError {
    /// Create an OutOfRange error.
    pub fn out_of_range(msg: impl Into<String>) -> Self {
        Self::OutOfRange(msg.into())
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether the error is a construction-time failure.
    ///
    /// Per-call failures (out of range addresses, bad input strings) are
    /// recoverable; configuration failures leave no usable instance.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TilingError::DuplicateZoom { .. }
                | TilingError::NonSquareTile { .. }
                | TilingError::TileSizeMismatch { .. }
                | TilingError::InvalidCrs(_)
                | TilingError::InvalidConfig(_)
                | TilingError::UnsupportedShape(_)
        )
    }
}

impl From<serde_json::Error> for TilingError {
    fn from(err: serde_json::Error) -> Self {
        TilingError::Json(err.to_string())
    }
}
