//! WMTS Tile Matrix and TileMatrixSet definitions.
//!
//! Implements OGC WMTS tile matrix concepts for tiled imagery. Zoom 0 is not
//! assumed to be a single tile and adjacent zooms are not assumed to differ
//! by a factor of two.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bounds::Point;
use crate::crs::CrsCode;
use crate::{Rect2D, TilingError, TilingResult};

/// OGC standardized rendering pixel size in meters (0.28mm).
pub const OGC_PIXEL_SIZE: f64 = 0.28e-3;

/// A tile coordinate (x/y at zoom z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
    /// Zoom level (index into the tile matrix set)
    pub z: u32,
}

impl Tile {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", tile_to_name(self))
    }
}

/// Tile name in `z-x-y` form.
pub fn tile_to_name(tile: &Tile) -> String {
    format!("{}-{}-{}", tile.z, tile.x, tile.y)
}

/// Parse a `z-x-y` tile name.
pub fn name_to_tile(name: &str) -> TilingResult<Tile> {
    let parts: Vec<&str> = name.split('-').collect();
    if parts.len() != 3 {
        return Err(TilingError::InvalidTileName(name.to_string()));
    }

    let parse = |s: &str| {
        s.parse::<u32>()
            .map_err(|_| TilingError::InvalidTileName(name.to_string()))
    };

    Ok(Tile {
        z: parse(parts[0])?,
        x: parse(parts[1])?,
        y: parse(parts[2])?,
    })
}

/// WGS84 `[west, south, east, north]` of a tile on the global mercator grid
/// (one root tile covers the globe, each zoom halves both axes).
pub fn tile_to_wgs84_bbox(tile: &Tile) -> [f64; 4] {
    let n = 2f64.powi(tile.z as i32);

    let lon_min = tile.x as f64 / n * 360.0 - 180.0;
    let lon_max = (tile.x as f64 + 1.0) / n * 360.0 - 180.0;

    let lat_max = (std::f64::consts::PI * (1.0 - 2.0 * tile.y as f64 / n))
        .sinh()
        .atan()
        .to_degrees();
    let lat_min = (std::f64::consts::PI * (1.0 - 2.0 * (tile.y as f64 + 1.0) / n))
        .sinh()
        .atan()
        .to_degrees();

    [lon_min, lat_min, lon_max, lat_max]
}

/// A single tile matrix (zoom level) definition.
///
/// Field names follow the OGC TileMatrixSet JSON encoding so capability
/// writers can emit the table verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomLevel {
    /// Identifier (usually zoom level as string)
    pub identifier: String,

    /// Scale denominator
    pub scale_denominator: f64,

    /// Top-left corner, in the axis order of the CRS
    pub top_left_corner: [f64; 2],

    /// Tile width in pixels
    pub tile_width: u32,

    /// Tile height in pixels
    pub tile_height: u32,

    /// Number of tile columns
    pub matrix_width: u32,

    /// Number of tile rows
    pub matrix_height: u32,
}

impl ZoomLevel {
    /// CRS units per pixel at this zoom.
    pub fn pixel_scale(&self) -> f64 {
        self.scale_denominator * OGC_PIXEL_SIZE
    }
}

/// Serialized form of a tile matrix set (OGC TileMatrixSet JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileMatrixSetDefinition {
    pub identifier: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(rename = "supportedCRS")]
    pub supported_crs: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub well_known_scale_set: Option<String>,

    pub tile_matrix: Vec<ZoomLevel>,
}

/// A rectangular, row-major range of tiles at one zoom.
///
/// Iterating is lazy and the range is `Copy`, so it can be walked any
/// number of times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub z: u32,
    pub x_start: u32,
    pub x_end: u32,
    pub y_start: u32,
    pub y_end: u32,
}

impl TileRange {
    pub fn new(z: u32, x_start: u32, x_end: u32, y_start: u32, y_end: u32) -> Self {
        Self {
            z,
            x_start,
            x_end,
            y_start,
            y_end,
        }
    }

    /// A range yielding nothing.
    pub fn empty(z: u32) -> Self {
        Self::new(z, 0, 0, 0, 0)
    }

    pub fn len(&self) -> usize {
        let width = self.x_end.saturating_sub(self.x_start) as usize;
        let height = self.y_end.saturating_sub(self.y_start) as usize;
        width * height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, tile: &Tile) -> bool {
        tile.z == self.z
            && (self.x_start..self.x_end).contains(&tile.x)
            && (self.y_start..self.y_end).contains(&tile.y)
    }
}

impl IntoIterator for TileRange {
    type Item = Tile;
    type IntoIter = TileRangeIter;

    fn into_iter(self) -> Self::IntoIter {
        TileRangeIter {
            x: self.x_start,
            y: self.y_start,
            range: self,
        }
    }
}

/// Iterator over a [`TileRange`].
#[derive(Debug, Clone)]
pub struct TileRangeIter {
    range: TileRange,
    x: u32,
    y: u32,
}

impl Iterator for TileRangeIter {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        if self.range.x_start >= self.range.x_end || self.y >= self.range.y_end {
            return None;
        }

        let tile = Tile::new(self.x, self.y, self.range.z);
        self.x += 1;
        if self.x >= self.range.x_end {
            self.x = self.range.x_start;
            self.y += 1;
        }
        Some(tile)
    }
}

/// A complete, validated tile matrix set.
///
/// Zoom levels are ordered by strictly decreasing scale denominator, share
/// one square tile size and one axis order derived from the CRS.
#[derive(Debug)]
pub struct TileMatrixSet {
    identifier: String,
    title: Option<String>,
    supported_crs: String,
    well_known_scale_set: Option<String>,
    crs: CrsCode,
    tile_size: u32,
    index_x: usize,
    index_y: usize,
    zooms: Vec<ZoomLevel>,
    /// Best zoom per requested scale denominator (keyed by f64 bits)
    zoom_cache: RwLock<HashMap<u64, u32>>,
}

impl Clone for TileMatrixSet {
    fn clone(&self) -> Self {
        Self {
            identifier: self.identifier.clone(),
            title: self.title.clone(),
            supported_crs: self.supported_crs.clone(),
            well_known_scale_set: self.well_known_scale_set.clone(),
            crs: self.crs,
            tile_size: self.tile_size,
            index_x: self.index_x,
            index_y: self.index_y,
            zooms: self.zooms.clone(),
            zoom_cache: RwLock::new(HashMap::new()),
        }
    }
}

impl TileMatrixSet {
    /// Validate a definition and build the tile matrix set.
    pub fn new(definition: TileMatrixSetDefinition) -> TilingResult<Self> {
        let crs = CrsCode::parse(&definition.supported_crs)?;
        let identifier = &definition.identifier;
        let zooms = &definition.tile_matrix;

        let first = zooms.first().ok_or_else(|| {
            TilingError::invalid_config(format!("'{}' has no zoom levels", identifier))
        })?;
        let tile_size = first.tile_width;

        let mut seen: HashSet<&str> = HashSet::new();
        for (z, zoom) in zooms.iter().enumerate() {
            if !seen.insert(zoom.identifier.as_str()) {
                return Err(TilingError::DuplicateZoom {
                    tile_matrix_set: identifier.clone(),
                    identifier: zoom.identifier.clone(),
                });
            }
            if zoom.tile_width != zoom.tile_height {
                return Err(TilingError::NonSquareTile {
                    identifier: zoom.identifier.clone(),
                    width: zoom.tile_width,
                    height: zoom.tile_height,
                });
            }
            if zoom.tile_width != tile_size {
                return Err(TilingError::TileSizeMismatch {
                    identifier: zoom.identifier.clone(),
                    expected: tile_size,
                    found: zoom.tile_width,
                });
            }
            if tile_size == 0 || zoom.matrix_width == 0 || zoom.matrix_height == 0 {
                return Err(TilingError::invalid_config(format!(
                    "zoom '{}' of '{}' has an empty grid",
                    zoom.identifier, identifier
                )));
            }
            if !(zoom.scale_denominator.is_finite() && zoom.scale_denominator > 0.0) {
                return Err(TilingError::invalid_config(format!(
                    "zoom '{}' of '{}' has invalid scale denominator {}",
                    zoom.identifier, identifier, zoom.scale_denominator
                )));
            }
            if z > 0 && zoom.scale_denominator >= zooms[z - 1].scale_denominator {
                return Err(TilingError::invalid_config(format!(
                    "zoom '{}' of '{}' is not finer than the zoom before it",
                    zoom.identifier, identifier
                )));
            }
        }
        drop(seen);

        let tms = Self::from_trusted(definition, crs);
        debug!(
            tile_matrix_set = %tms.identifier,
            crs = %tms.crs,
            zooms = tms.zooms.len(),
            tile_size = tms.tile_size,
            "Loaded tile matrix set"
        );
        Ok(tms)
    }

    /// Build from a definition already known to be valid (the presets).
    pub(crate) fn from_trusted(definition: TileMatrixSetDefinition, crs: CrsCode) -> Self {
        let (index_x, index_y) = crs.axis_order().indices();
        let tile_size = definition
            .tile_matrix
            .first()
            .map(|zoom| zoom.tile_width)
            .unwrap_or_default();

        Self {
            identifier: definition.identifier,
            title: definition.title,
            supported_crs: definition.supported_crs,
            well_known_scale_set: definition.well_known_scale_set,
            crs,
            tile_size,
            index_x,
            index_y,
            zooms: definition.tile_matrix,
            zoom_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Parse an OGC TileMatrixSet JSON document.
    pub fn from_json(json: &str) -> TilingResult<Self> {
        let definition: TileMatrixSetDefinition = serde_json::from_str(json)?;
        Self::new(definition)
    }

    /// The definition this set was built from, zooms in order.
    pub fn definition(&self) -> TileMatrixSetDefinition {
        TileMatrixSetDefinition {
            identifier: self.identifier.clone(),
            title: self.title.clone(),
            supported_crs: self.supported_crs.clone(),
            well_known_scale_set: self.well_known_scale_set.clone(),
            tile_matrix: self.zooms.clone(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn crs(&self) -> CrsCode {
        self.crs
    }

    /// Tile width and height in pixels.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Positions of x and y inside `topLeftCorner`.
    pub fn axis_indices(&self) -> (usize, usize) {
        (self.index_x, self.index_y)
    }

    /// Zoom levels in zoom order.
    pub fn zooms(&self) -> &[ZoomLevel] {
        &self.zooms
    }

    pub fn zoom(&self, z: u32) -> Option<&ZoomLevel> {
        self.zooms.get(z as usize)
    }

    /// Zoom index of a zoom identifier.
    pub fn zoom_index(&self, identifier: &str) -> Option<u32> {
        self.zooms
            .iter()
            .position(|zoom| zoom.identifier == identifier)
            .map(|z| z as u32)
    }

    pub fn max_zoom(&self) -> u32 {
        (self.zooms.len() - 1) as u32
    }

    fn level(&self, z: u32) -> TilingResult<&ZoomLevel> {
        self.zoom(z).ok_or_else(|| {
            TilingError::out_of_range(format!(
                "zoom {} is not part of '{}' (max {})",
                z,
                self.identifier,
                self.max_zoom()
            ))
        })
    }

    /// CRS units per pixel at zoom `z`.
    pub fn pixel_scale(&self, z: u32) -> TilingResult<f64> {
        Ok(self.level(z)?.pixel_scale())
    }

    /// Pixel position of a tile's top-left corner.
    pub fn tile_to_pixels(&self, x: u32, y: u32) -> Point {
        Point::new(
            x as f64 * self.tile_size as f64,
            y as f64 * self.tile_size as f64,
        )
    }

    /// Tile containing a pixel at zoom `z`.
    pub fn pixels_to_tile(&self, px: f64, py: f64, z: u32) -> TilingResult<Tile> {
        let level = self.level(z)?;
        let x = (px / self.tile_size as f64).floor();
        let y = (py / self.tile_size as f64).floor();

        if x < 0.0 || y < 0.0 || x >= level.matrix_width as f64 || y >= level.matrix_height as f64 {
            return Err(TilingError::out_of_range(format!(
                "pixel ({}, {}) is outside zoom {} of '{}'",
                px, py, z, self.identifier
            )));
        }

        Ok(Tile::new(x as u32, y as u32, z))
    }

    /// Convert a source (CRS) coordinate to a pixel at zoom `z`.
    pub fn source_to_pixels(&self, sx: f64, sy: f64, z: u32) -> TilingResult<Point> {
        let level = self.level(z)?;
        let scale = level.pixel_scale();
        Ok(Point::new(
            (sx - level.top_left_corner[self.index_x]) / scale,
            (level.top_left_corner[self.index_y] - sy) / scale,
        ))
    }

    /// Convert a pixel at zoom `z` back to a source (CRS) coordinate.
    pub fn pixels_to_source(&self, px: f64, py: f64, z: u32) -> TilingResult<Point> {
        let level = self.level(z)?;
        let scale = level.pixel_scale();
        Ok(Point::new(
            level.top_left_corner[self.index_x] + px * scale,
            level.top_left_corner[self.index_y] - py * scale,
        ))
    }

    /// Source coordinate of a tile's top-left corner.
    pub fn tile_to_source(&self, tile: &Tile) -> TilingResult<Point> {
        let pixels = self.tile_to_pixels(tile.x, tile.y);
        self.pixels_to_source(pixels.x, pixels.y, tile.z)
    }

    /// Source bounds of a tile; `y` is the bottom (minimum northing) edge.
    pub fn tile_to_source_bounds(&self, tile: &Tile) -> TilingResult<Rect2D> {
        let upper_left = self.tile_to_source(tile)?;
        let lower_right = self.tile_to_source(&Tile::new(tile.x + 1, tile.y + 1, tile.z))?;
        Ok(Rect2D::new(
            upper_left.x,
            lower_right.y,
            lower_right.x - upper_left.x,
            upper_left.y - lower_right.y,
        ))
    }

    /// Tile at zoom `z` containing a source coordinate.
    pub fn source_to_tile(&self, sx: f64, sy: f64, z: u32) -> TilingResult<Tile> {
        let pixels = self.source_to_pixels(sx, sy, z)?;
        self.pixels_to_tile(pixels.x, pixels.y, z)
    }

    /// Source bounds of the whole zoom 0 grid.
    pub fn extent(&self) -> Rect2D {
        let root = &self.zooms[0];
        let span = root.pixel_scale() * self.tile_size as f64;
        let min_x = root.top_left_corner[self.index_x];
        let max_y = root.top_left_corner[self.index_y];
        let height = span * root.matrix_height as f64;
        Rect2D::new(min_x, max_y - height, span * root.matrix_width as f64, height)
    }

    /// Every tile of zoom 0, which may be an `m x n` grid.
    pub fn top_level_tiles(&self) -> TileRange {
        let root = &self.zooms[0];
        TileRange::new(0, 0, root.matrix_width, 0, root.matrix_height)
    }

    /// Tiles of zoom `z + 1` overlapping `tile`; `None` yields the top level.
    ///
    /// The child range is `floor(c * child / parent)` to
    /// `ceil((c + 1) * child / parent)` per axis, so zoom steps that are not
    /// a power of two are covered exactly.
    pub fn cover_tile(&self, tile: Option<&Tile>) -> TileRange {
        let Some(tile) = tile else {
            return self.top_level_tiles();
        };

        let child_z = tile.z + 1;
        let (Some(parent), Some(child)) = (self.zoom(tile.z), self.zoom(child_z)) else {
            return TileRange::empty(child_z);
        };

        let (x_start, x_end) = cover_axis(tile.x, parent.matrix_width, child.matrix_width);
        let (y_start, y_end) = cover_axis(tile.y, parent.matrix_height, child.matrix_height);
        TileRange::new(child_z, x_start, x_end, y_start, y_end)
    }

    /// Zoom whose scale denominator is closest to `scale_denominator`.
    ///
    /// The first zoom at or finer than the target and its coarser neighbour
    /// are both candidates. Results are memoized per scale.
    pub fn find_best_zoom(&self, scale_denominator: f64) -> u32 {
        let key = scale_denominator.to_bits();
        if let Ok(cache) = self.zoom_cache.read() {
            if let Some(z) = cache.get(&key) {
                return *z;
            }
        }

        let best = self.search_best_zoom(scale_denominator);
        if let Ok(mut cache) = self.zoom_cache.write() {
            cache.insert(key, best);
        }
        best
    }

    fn search_best_zoom(&self, scale_denominator: f64) -> u32 {
        for (z, zoom) in self.zooms.iter().enumerate() {
            if zoom.scale_denominator > scale_denominator {
                continue;
            }
            if z == 0 {
                return 0;
            }

            let diff_here = (zoom.scale_denominator - scale_denominator).abs();
            let diff_coarser = (self.zooms[z - 1].scale_denominator - scale_denominator).abs();
            return if diff_here < diff_coarser {
                z as u32
            } else {
                z as u32 - 1
            };
        }
        self.max_zoom()
    }

    /// Convert a zoom of one tile matrix set to the closest zoom of another.
    ///
    /// With `map_min_max`, zoom 0 always maps to zoom 0 and the source's
    /// maximum zoom always maps to the target's maximum zoom.
    pub fn convert_zoom_level(
        z: u32,
        from: &TileMatrixSet,
        to: &TileMatrixSet,
        map_min_max: bool,
    ) -> TilingResult<u32> {
        if from.identifier == to.identifier {
            return Ok(z);
        }
        if map_min_max {
            if z == 0 {
                return Ok(0);
            }
            if z >= from.max_zoom() {
                return Ok(to.max_zoom());
            }
        }

        let scale = from.level(z)?.scale_denominator;
        Ok(to.find_best_zoom(scale))
    }
}

/// Child index range `[start, end)` overlapping parent index `index`.
fn cover_axis(index: u32, parent_dim: u32, child_dim: u32) -> (u32, u32) {
    let index = index as u64;
    let parent_dim = parent_dim as u64;
    let child_dim = child_dim as u64;

    let start = index * child_dim / parent_dim;
    let end = ((index + 1) * child_dim).div_ceil(parent_dim);
    (start.min(child_dim) as u32, end.min(child_dim) as u32)
}
