//! Footprints of the source rasters a tile can be built from.

use std::collections::HashMap;

use geo::{BoundingRect, Coord, Polygon, Rect};
use tiling_common::Rect2D;

/// Convert bounds into an axis aligned polygon.
pub fn rect_to_polygon(rect: &Rect2D) -> Polygon<f64> {
    Rect::new(
        Coord {
            x: rect.x,
            y: rect.y,
        },
        Coord {
            x: rect.right(),
            y: rect.bottom(),
        },
    )
    .to_polygon()
}

/// Footprint of one source file in the tile matrix set's CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceGeometry {
    pub bounds: Rect2D,
    pub polygon: Polygon<f64>,
}

impl SourceGeometry {
    /// A rectangular footprint.
    pub fn from_bounds(bounds: Rect2D) -> Self {
        Self {
            polygon: rect_to_polygon(&bounds),
            bounds,
        }
    }

    /// An arbitrary footprint; returns `None` for an empty polygon.
    pub fn from_polygon(polygon: Polygon<f64>) -> Option<Self> {
        let rect = polygon.bounding_rect()?;
        Some(Self {
            bounds: Rect2D::new(rect.min().x, rect.min().y, rect.width(), rect.height()),
            polygon,
        })
    }
}

/// Source footprints keyed by file name.
#[derive(Debug, Clone, Default)]
pub struct SourceGeometryIndex {
    sources: HashMap<String, SourceGeometry>,
}

impl SourceGeometryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a source footprint.
    pub fn insert(&mut self, name: impl Into<String>, geometry: SourceGeometry) {
        self.sources.insert(name.into(), geometry);
    }

    /// Add a rectangular source footprint.
    pub fn insert_bounds(&mut self, name: impl Into<String>, bounds: Rect2D) {
        self.insert(name, SourceGeometry::from_bounds(bounds));
    }

    pub fn get(&self, name: &str) -> Option<&SourceGeometry> {
        self.sources.get(name)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Indexed names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sources.keys().cloned().collect();
        names.sort();
        names
    }
}

impl<S: Into<String>> FromIterator<(S, Rect2D)> for SourceGeometryIndex {
    fn from_iter<I: IntoIterator<Item = (S, Rect2D)>>(iter: I) -> Self {
        let mut index = Self::new();
        for (name, bounds) in iter {
            index.insert_bounds(name, bounds);
        }
        index
    }
}
