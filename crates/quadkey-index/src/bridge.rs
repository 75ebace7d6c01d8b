//! Mapping between a tile matrix set's native tiles and quadkeys.
//!
//! A quadkey always starts from a single root tile. A tile matrix set whose
//! zoom 0 is an `m x n` grid is placed `z_offset` quadkey levels below that
//! notional root, so native zoom `z` is quadkey length `z + z_offset`. The
//! mapping only holds while each zoom is an exact power of two finer than
//! zoom 0; `z_max` is the first native zoom where that stops.

use std::sync::Arc;

use tiling_common::quadkey::{self, MAX_QUAD_KEY_LENGTH};
use tiling_common::{Tile, TileMatrixSet, TileRange, TilingError, TilingResult};
use tracing::debug;

/// Tolerance when checking that a scale ratio is a power of two.
pub const ZOOM_RATIO_TOLERANCE: f64 = 1e-6;

/// Adapts a tile matrix set onto the quadkey address space.
#[derive(Debug, Clone)]
pub struct QuadKeyBridge {
    tms: Arc<TileMatrixSet>,
    z_offset: u32,
    z_max: u32,
}

impl QuadKeyBridge {
    /// Derive `z_offset` and `z_max` for `tms`.
    ///
    /// Fails with [`TilingError::UnsupportedShape`] when the larger zoom 0
    /// dimension is not a power of two.
    pub fn new(tms: Arc<TileMatrixSet>) -> TilingResult<Self> {
        let root = tms.zoom(0).ok_or_else(|| {
            TilingError::UnsupportedShape(format!("'{}' has no zoom 0", tms.identifier()))
        })?;

        let root_dim = root.matrix_width.max(root.matrix_height);
        if !root_dim.is_power_of_two() {
            return Err(TilingError::UnsupportedShape(format!(
                "zoom 0 of '{}' is {}x{}, {} is not a power of two",
                tms.identifier(),
                root.matrix_width,
                root.matrix_height,
                root_dim
            )));
        }
        let z_offset = root_dim.trailing_zeros();

        let root_scale = root.scale_denominator;
        let mut z_max = tms
            .zooms()
            .iter()
            .position(|zoom| {
                let ratio = (root_scale / zoom.scale_denominator).log2();
                (ratio - ratio.round()).abs() > ZOOM_RATIO_TOLERANCE
            })
            .unwrap_or(tms.zooms().len()) as u32;

        // Quadkeys are capped at MAX_QUAD_KEY_LENGTH digits
        let addressable = (MAX_QUAD_KEY_LENGTH as u32 + 1).saturating_sub(z_offset);
        z_max = z_max.min(addressable);

        debug!(
            tile_matrix_set = %tms.identifier(),
            z_offset,
            z_max,
            "Created quadkey bridge"
        );

        Ok(Self {
            tms,
            z_offset,
            z_max,
        })
    }

    pub fn tile_matrix_set(&self) -> &Arc<TileMatrixSet> {
        &self.tms
    }

    /// Quadkey levels above native zoom 0.
    pub fn z_offset(&self) -> u32 {
        self.z_offset
    }

    /// First native zoom that cannot be encoded directly.
    pub fn z_max(&self) -> u32 {
        self.z_max
    }

    /// Whether native zoom `z` maps one to one onto quadkeys.
    pub fn is_regular_zoom(&self, z: u32) -> bool {
        z < self.z_max
    }

    /// Decode a quadkey into a native tile.
    pub fn to_tile(&self, quad_key: &str) -> TilingResult<Tile> {
        let tile = quadkey::to_tile(quad_key)?;
        if tile.z < self.z_offset {
            return Err(TilingError::out_of_range(format!(
                "quadkey '{}' is coarser than zoom 0 of '{}'",
                quad_key,
                self.tms.identifier()
            )));
        }

        let native = Tile::new(tile.x, tile.y, tile.z - self.z_offset);
        self.check_tile(&native)?;
        Ok(native)
    }

    /// Encode a native tile below `z_max` as a quadkey.
    pub fn from_tile(&self, tile: &Tile) -> TilingResult<String> {
        self.check_tile(tile)?;
        Ok(quadkey::from_tile(&Tile::new(
            tile.x,
            tile.y,
            tile.z + self.z_offset,
        )))
    }

    /// Quadkeys that best cover a tile.
    ///
    /// Below `z_max` this is the tile's own quadkey. From `z_max` on, the
    /// tile is projected into the pixel space of zoom `z_max - 1` and every
    /// tile of that zoom it overlaps is returned, which is one to four keys
    /// for a single irregular step. Keys come back in [`quadkey::compare_keys`]
    /// order.
    pub fn nearest_quad_keys(&self, tile: &Tile) -> TilingResult<Vec<String>> {
        if tile.z < self.z_max {
            return Ok(vec![self.from_tile(tile)?]);
        }

        let z = self.z_max - 1;
        let level = self.tms.zoom(z).ok_or_else(|| {
            TilingError::out_of_range(format!(
                "zoom {} is not part of '{}'",
                z,
                self.tms.identifier()
            ))
        })?;

        let bounds = self.tms.tile_to_source_bounds(tile)?;
        let top_left = self.tms.source_to_pixels(bounds.x, bounds.bottom(), z)?;
        let bottom_right = self.tms.source_to_pixels(bounds.right(), bounds.y, z)?;

        // Pixel offsets drift to values like .999999994, snap them first
        let tile_size = self.tms.tile_size() as f64;
        let (x_start, x_end) = pixel_span_to_tiles(
            top_left.x.round(),
            bottom_right.x.round(),
            tile_size,
            level.matrix_width,
        );
        let (y_start, y_end) = pixel_span_to_tiles(
            top_left.y.round(),
            bottom_right.y.round(),
            tile_size,
            level.matrix_height,
        );

        let mut keys = TileRange::new(z, x_start, x_end, y_start, y_end)
            .into_iter()
            .map(|covering| self.from_tile(&covering))
            .collect::<TilingResult<Vec<_>>>()?;
        keys.sort_by(|a, b| quadkey::compare_keys(a, b));
        Ok(keys)
    }

    /// Native zoom 0 tiles.
    pub fn top_level_tiles(&self) -> TileRange {
        self.tms.top_level_tiles()
    }

    /// Native tiles one zoom finer overlapping `tile`.
    pub fn cover_tile(&self, tile: Option<&Tile>) -> TileRange {
        self.tms.cover_tile(tile)
    }

    fn check_tile(&self, tile: &Tile) -> TilingResult<()> {
        if tile.z >= self.z_max {
            return Err(TilingError::out_of_range(format!(
                "tile {} is at or past zoom {} where '{}' stops following quadkeys",
                tile,
                self.z_max,
                self.tms.identifier()
            )));
        }

        let level = self.tms.zoom(tile.z).ok_or_else(|| {
            TilingError::out_of_range(format!(
                "zoom {} is not part of '{}'",
                tile.z,
                self.tms.identifier()
            ))
        })?;
        if tile.x >= level.matrix_width || tile.y >= level.matrix_height {
            return Err(TilingError::out_of_range(format!(
                "tile {} is outside the {}x{} grid of zoom {}",
                tile, level.matrix_width, level.matrix_height, tile.z
            )));
        }
        Ok(())
    }
}

/// Tile index range `[start, end)` covering pixels `[start_px, end_px)`.
///
/// Always at least one tile wide so sub-pixel spans still resolve.
fn pixel_span_to_tiles(start_px: f64, end_px: f64, tile_size: f64, dim: u32) -> (u32, u32) {
    let last = dim.saturating_sub(1) as f64;
    let start = (start_px / tile_size).floor().clamp(0.0, last);
    let end = (end_px / tile_size).ceil().clamp(start + 1.0, dim as f64);
    (start as u32, end as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiling_common::presets;

    fn nztm() -> QuadKeyBridge {
        QuadKeyBridge::new(Arc::new(presets::nztm2000_quad())).unwrap()
    }

    #[test]
    fn test_offsets() {
        let bridge = nztm();
        assert_eq!(bridge.z_offset(), 2);
        assert_eq!(bridge.z_max(), 8);
        assert!(bridge.is_regular_zoom(7));
        assert!(!bridge.is_regular_zoom(8));

        let mercator = QuadKeyBridge::new(Arc::new(presets::web_mercator_quad())).unwrap();
        assert_eq!(mercator.z_offset(), 0);
        assert_eq!(mercator.z_max(), 23);
    }

    #[test]
    fn test_pixel_span_to_tiles() {
        assert_eq!(pixel_span_to_tiles(205.0, 307.0, 256.0, 256), (0, 2));
        assert_eq!(pixel_span_to_tiles(410.0, 512.0, 256.0, 256), (1, 2));
        // Zero width span on a tile edge still yields a tile
        assert_eq!(pixel_span_to_tiles(512.0, 512.0, 256.0, 256), (2, 3));
        // Clamped to the grid
        assert_eq!(pixel_span_to_tiles(-10.0, 300.0, 256.0, 1), (0, 1));
    }

    #[test]
    fn test_to_tile() {
        let bridge = nztm();
        assert_eq!(bridge.to_tile("22").unwrap(), Tile::new(0, 3, 0));
        assert!(matches!(bridge.to_tile(""), Err(TilingError::OutOfRange(_))));
        assert!(matches!(bridge.to_tile("33"), Err(TilingError::OutOfRange(_))));
        assert!(matches!(
            bridge.to_tile("0000000000"),
            Err(TilingError::OutOfRange(_))
        ));
        assert!(matches!(
            bridge.to_tile("2x"),
            Err(TilingError::InvalidQuadKey(_))
        ));
    }

    #[test]
    fn test_from_tile() {
        let bridge = nztm();
        assert_eq!(bridge.from_tile(&Tile::new(0, 3, 0)).unwrap(), "22");
        assert_eq!(bridge.from_tile(&Tile::new(1, 0, 0)).unwrap(), "01");
        assert!(bridge.from_tile(&Tile::new(2, 0, 0)).is_err());
        assert!(bridge.from_tile(&Tile::new(0, 0, 8)).is_err());
    }

    #[test]
    fn test_nearest_quad_keys_irregular_zoom() {
        let bridge = nztm();
        assert_eq!(
            bridge.nearest_quad_keys(&Tile::new(2, 2, 8)).unwrap(),
            vec!["000000000", "000000001", "000000002", "000000003"]
        );
        assert_eq!(
            bridge.nearest_quad_keys(&Tile::new(4, 4, 8)).unwrap(),
            vec!["000000003"]
        );
    }

    #[test]
    fn test_nearest_quad_keys_regular_zoom() {
        let bridge = nztm();
        assert_eq!(
            bridge.nearest_quad_keys(&Tile::new(0, 3, 0)).unwrap(),
            vec!["22"]
        );
    }
}
