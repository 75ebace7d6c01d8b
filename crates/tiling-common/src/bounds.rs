//! Axis-aligned rectangle types and operations.

use serde::{Deserialize, Serialize};

use crate::quadkey;
use crate::TilingResult;

/// A point in source (CRS) or pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle stored as origin plus size.
///
/// For geographic boxes `x`/`y` are the west/south edges in degrees; for
/// projected boxes they are in CRS units. `right()` and `bottom()` are the
/// far edges (`x + width`, `y + height`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect2D {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect2D {
    /// Create a new rectangle from origin and size.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a rectangle from a `[west, south, east, north]` box.
    ///
    /// An east edge numerically less than west means the box crosses the
    /// antimeridian; a full revolution is added to the width, the stored
    /// origin stays at `west`.
    pub fn from_bbox(bbox: [f64; 4]) -> Self {
        let [west, south, east, north] = bbox;
        let width = if east >= west {
            east - west
        } else {
            east - west + 360.0
        };
        Self {
            x: west,
            y: south,
            width,
            height: (north - south).abs(),
        }
    }

    /// WGS84 bounds of the region denoted by a quadkey.
    pub fn from_quad_key(quad_key: &str) -> TilingResult<Self> {
        Ok(Self::from_bbox(quadkey::to_bbox(quad_key)?))
    }

    /// Far x edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Far y edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Open-interval overlap on both axes; touching edges do not count.
    pub fn intersects(&self, other: &Rect2D) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Compute the overlapping rectangle, `None` if either side collapses.
    pub fn intersection(&self, other: &Rect2D) -> Option<Rect2D> {
        let min_x = self.x.max(other.x);
        let min_y = self.y.max(other.y);
        let max_x = self.right().min(other.right());
        let max_y = self.bottom().min(other.bottom());

        let width = max_x - min_x;
        let height = max_y - min_y;
        if width <= 0.0 || height <= 0.0 {
            return None;
        }

        Some(Rect2D::new(min_x, min_y, width, height))
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect2D) -> Rect2D {
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let max_x = self.right().max(other.right());
        let max_y = self.bottom().max(other.bottom());
        Rect2D::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Whether `other` lies entirely within this rectangle (edges inclusive).
    pub fn contains(&self, other: &Rect2D) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Multiply position and size.
    ///
    /// Re-expresses a pixel rectangle at another zoom level: each doubling
    /// of resolution doubles every pixel coordinate.
    pub fn scale(&self, sx: f64, sy: f64) -> Rect2D {
        Rect2D::new(self.x * sx, self.y * sy, self.width * sx, self.height * sy)
    }

    /// Grow or shrink the size while holding the center fixed.
    pub fn scale_from_center(&self, sx: f64, sy: f64) -> Rect2D {
        let width = self.width * sx;
        let height = self.height * sy;
        Rect2D::new(
            self.x - (width - self.width) / 2.0,
            self.y - (height - self.height) / 2.0,
            width,
            height,
        )
    }

    /// Translate by a point.
    pub fn add(&self, offset: Point) -> Rect2D {
        Rect2D::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }

    /// Translate by the negation of a point.
    pub fn subtract(&self, offset: Point) -> Rect2D {
        Rect2D::new(self.x - offset.x, self.y - offset.y, self.width, self.height)
    }

    /// Round every component to the nearest integer.
    pub fn round(&self) -> Rect2D {
        Rect2D::new(
            self.x.round(),
            self.y.round(),
            self.width.round(),
            self.height.round(),
        )
    }

    /// Convert back to `[west, south, east, north]`.
    ///
    /// Boxes wider than the antimeridian wrap keep their east edge past 180.
    pub fn to_bbox(&self) -> [f64; 4] {
        [self.x, self.y, self.right(), self.bottom()]
    }
}
