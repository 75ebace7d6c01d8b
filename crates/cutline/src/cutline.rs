//! Polygon bounded source selection.
//!
//! A [`Cutline`] holds the polygons that still need cropping. Every
//! [`Cutline::filter_sources`] call clips them to the queried tile and keeps
//! only the pieces that mattered, so the state shrinks as a caller descends
//! the tile pyramid. Queries must follow a top-down traversal where no area
//! is visited twice; walkers that branch clone the cutline per branch.

use std::sync::Arc;

use geo::{BooleanOps, Contains, Coord, Intersects, MapCoords, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use tiling_common::{Tile, TileMatrixSet};
use tracing::{debug, trace};

use crate::error::{CutlineError, CutlineResult};
use crate::geojson::parse_multi_polygon;
use crate::source::{rect_to_polygon, SourceGeometryIndex};

/// Cutline tuning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CutlineConfig {
    /// Factor the tile bounds are grown by, about their center, before any
    /// geometry test.
    pub padding: f64,
}

impl Default for CutlineConfig {
    fn default() -> Self {
        Self { padding: 1.25 }
    }
}

impl CutlineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("CUTLINE_PADDING") {
            if let Ok(padding) = val.parse() {
                config.padding = padding;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.padding.is_finite() || self.padding < 1.0 {
            return Err(format!("padding must be >= 1.0, got {}", self.padding));
        }
        Ok(())
    }
}

/// Result of filtering the sources of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Sources kept; the count is how many of them needed cropping.
    Crop(usize),
    /// The tile lies entirely outside the cutline and the candidate list
    /// has been emptied.
    Outside,
}

impl FilterOutcome {
    pub fn is_outside(&self) -> bool {
        matches!(self, FilterOutcome::Outside)
    }
}

/// Stateful polygon filter over the sources of successive tiles.
#[derive(Debug, Clone)]
pub struct Cutline {
    tms: Arc<TileMatrixSet>,
    config: CutlineConfig,
    polys: Vec<Polygon<f64>>,
}

impl Cutline {
    /// A cutline that accepts every source overlapping a tile.
    pub fn empty(tms: Arc<TileMatrixSet>) -> Self {
        Self::empty_with(tms, CutlineConfig::default())
    }

    /// An empty cutline whose overlap test uses `config`'s padding.
    pub fn empty_with(tms: Arc<TileMatrixSet>, config: CutlineConfig) -> Self {
        Self::new(tms, MultiPolygon::new(Vec::new()), config)
    }

    /// Start from the polygons of `multi`.
    pub fn new(tms: Arc<TileMatrixSet>, multi: MultiPolygon<f64>, config: CutlineConfig) -> Self {
        Self {
            tms,
            config,
            polys: multi.0,
        }
    }

    /// Load a cutline GeoJSON document already in the tile matrix set's CRS.
    pub fn from_geojson(
        tms: Arc<TileMatrixSet>,
        json: &str,
        config: CutlineConfig,
    ) -> CutlineResult<Self> {
        Self::from_geojson_with(tms, json, config, |coord| coord)
    }

    /// Load a cutline GeoJSON document, passing every coordinate through
    /// `transform` to reach the tile matrix set's CRS.
    pub fn from_geojson_with<F>(
        tms: Arc<TileMatrixSet>,
        json: &str,
        config: CutlineConfig,
        transform: F,
    ) -> CutlineResult<Self>
    where
        F: Fn(Coord<f64>) -> Coord<f64> + Copy,
    {
        config.validate().map_err(CutlineError::InvalidConfig)?;
        let multi = parse_multi_polygon(json)?.map_coords(transform);
        debug!(
            tile_matrix_set = %tms.identifier(),
            polygons = multi.0.len(),
            "Loaded cutline"
        );
        Ok(Self::new(tms, multi, config))
    }

    /// No polygons left, every overlapping source is accepted.
    pub fn is_empty(&self) -> bool {
        self.polys.is_empty()
    }

    /// Polygons still requiring cropping.
    pub fn polygons(&self) -> &[Polygon<f64>] {
        &self.polys
    }

    pub fn tile_matrix_set(&self) -> &Arc<TileMatrixSet> {
        &self.tms
    }

    /// Narrow `candidate_files` to the sources relevant to `tile`.
    ///
    /// Every candidate must be present in `index`. On
    /// [`FilterOutcome::Outside`] the candidate list is emptied and the
    /// cutline drops all polygons.
    pub fn filter_sources(
        &mut self,
        tile: &Tile,
        candidate_files: &mut Vec<String>,
        index: &SourceGeometryIndex,
    ) -> CutlineResult<FilterOutcome> {
        if let Some(missing) = candidate_files.iter().find(|name| index.get(name).is_none()) {
            return Err(CutlineError::UnknownSource(missing.clone()));
        }

        let tile_bounds = self.tms.tile_to_source_bounds(tile)?;
        let padded = tile_bounds.scale_from_center(self.config.padding, self.config.padding);
        let padded_poly = rect_to_polygon(&padded);

        let mut clipped: Vec<Polygon<f64>> = Vec::new();
        if !self.polys.is_empty() {
            let tile_poly = rect_to_polygon(&tile_bounds);
            if self.polys.iter().any(|poly| poly.contains(&tile_poly)) {
                debug!(tile = %tile, "Tile inside cutline, no cropping below it");
                self.polys.clear();
            } else {
                for poly in &self.polys {
                    if poly.intersects(&padded_poly) {
                        let piece: MultiPolygon<f64> = poly.intersection(&padded_poly);
                        clipped.extend(piece.0);
                    }
                }
                if clipped.is_empty() {
                    debug!(
                        tile = %tile,
                        dropped = candidate_files.len(),
                        "Tile outside cutline"
                    );
                    candidate_files.clear();
                    self.polys.clear();
                    return Ok(FilterOutcome::Outside);
                }
            }
        }

        let mut used = vec![false; clipped.len()];
        let mut crop_count = 0;
        candidate_files.retain(|name| {
            let Some(source) = index.get(name) else {
                return false;
            };
            if !source.bounds.intersects(&padded) {
                trace!(tile = %tile, source = %name, "Source outside tile");
                return false;
            }
            if clipped.is_empty() {
                return true;
            }

            let mut keep = false;
            for (i, poly) in clipped.iter().enumerate() {
                // Containment implies intersection
                if poly.intersects(&source.polygon) {
                    used[i] = true;
                    keep = true;
                }
            }
            if keep {
                crop_count += 1;
            } else {
                trace!(tile = %tile, source = %name, "Source outside cutline");
            }
            keep
        });

        if !clipped.is_empty() {
            self.polys = clipped
                .into_iter()
                .zip(used)
                .filter_map(|(poly, used)| used.then_some(poly))
                .collect();
            debug!(
                tile = %tile,
                polygons = self.polys.len(),
                sources = candidate_files.len(),
                crop_count,
                "Narrowed cutline"
            );
        }

        Ok(FilterOutcome::Crop(crop_count))
    }
}
