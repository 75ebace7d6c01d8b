//! Spatial addressing shared across the imagery tiling workspace.
//!
//! Bounds arithmetic, the quadkey codec and WMTS tile matrix sets whose zoom
//! progression need not be a power of two.

pub mod bounds;
pub mod crs;
pub mod error;
pub mod presets;
pub mod quadkey;
pub mod registry;
pub mod tile;

pub use bounds::{Point, Rect2D};
pub use crs::{AxisOrder, CrsCode};
pub use error::{TilingError, TilingResult};
pub use registry::TileMatrixSetRegistry;
pub use tile::{
    name_to_tile, tile_to_name, Tile, TileMatrixSet, TileMatrixSetDefinition, TileRange,
    ZoomLevel,
};
