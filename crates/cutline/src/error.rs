//! Error types for cutline loading and filtering.

use thiserror::Error;
use tiling_common::TilingError;

/// Result type alias using CutlineError.
pub type CutlineResult<T> = Result<T, CutlineError>;

#[derive(Debug, Error)]
pub enum CutlineError {
    // === Load time ===
    #[error("Cutline geometry must be a MultiPolygon, found {0}")]
    NotMultiPolygon(String),

    #[error("Invalid cutline geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid cutline configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Per query ===
    #[error("No geometry indexed for source '{0}'")]
    UnknownSource(String),

    #[error(transparent)]
    Tiling(#[from] TilingError),
}
