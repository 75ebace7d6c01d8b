//! Cutline filtering of source rasters.
//!
//! Loads a cutline multi-polygon from GeoJSON and narrows, tile by tile, the
//! list of source files that need to be read and cropped.

pub mod cutline;
pub mod error;
pub mod geojson;
pub mod source;

pub use cutline::{Cutline, CutlineConfig, FilterOutcome};
pub use error::{CutlineError, CutlineResult};
pub use source::{SourceGeometry, SourceGeometryIndex};
