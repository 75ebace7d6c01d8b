//! Coordinate Reference System codes and axis order.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TilingError;

/// CRS codes a tile matrix set may be defined in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsCode {
    /// Web Mercator (meters)
    Epsg3857,
    /// WGS84 Geographic, authority axis order (lat, lon)
    Epsg4326,
    /// WGS84 Geographic, lon/lat axis order
    Crs84,
    /// New Zealand Transverse Mercator 2000 (northing, easting)
    Epsg2193,
}

impl CrsCode {
    /// Parse a CRS reference as found in tile matrix set documents.
    ///
    /// Accepts formats like:
    /// - "EPSG:2193"
    /// - "urn:ogc:def:crs:EPSG::3857"
    /// - "https://www.opengis.net/def/crs/EPSG/0/2193"
    /// - "http://www.opengis.net/def/crs/OGC/1.3/CRS84"
    /// - "CRS:84"
    pub fn parse(s: &str) -> Result<Self, TilingError> {
        let normalized = s.trim().to_uppercase();

        if normalized == "CRS:84" || normalized.ends_with("/CRS84") || normalized.ends_with(":CRS84")
        {
            return Ok(CrsCode::Crs84);
        }

        // Authority code is always the trailing numeric component
        let code = normalized
            .rsplit(|c| c == ':' || c == '/')
            .next()
            .unwrap_or_default();

        if !normalized.contains("EPSG") {
            return Err(TilingError::InvalidCrs(s.to_string()));
        }

        match code {
            "3857" | "900913" => Ok(CrsCode::Epsg3857),
            "4326" => Ok(CrsCode::Epsg4326),
            "2193" => Ok(CrsCode::Epsg2193),
            _ => Err(TilingError::InvalidCrs(s.to_string())),
        }
    }

    /// EPSG authority code.
    pub fn epsg(&self) -> u32 {
        match self {
            CrsCode::Epsg3857 => 3857,
            CrsCode::Epsg4326 | CrsCode::Crs84 => 4326,
            CrsCode::Epsg2193 => 2193,
        }
    }

    /// Axis order of coordinates written in this CRS.
    ///
    /// Some definitions list northing before easting, so a `topLeftCorner`
    /// must be read through this order.
    pub fn axis_order(&self) -> AxisOrder {
        match self {
            CrsCode::Epsg4326 | CrsCode::Epsg2193 => AxisOrder::YX,
            CrsCode::Epsg3857 | CrsCode::Crs84 => AxisOrder::XY,
        }
    }

    /// Check if this is a geographic (degree based) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsCode::Epsg4326 | CrsCode::Crs84)
    }

    /// OGC URI for this CRS.
    pub fn to_uri(&self) -> String {
        match self {
            CrsCode::Crs84 => "http://www.opengis.net/def/crs/OGC/1.3/CRS84".to_string(),
            other => format!("https://www.opengis.net/def/crs/EPSG/0/{}", other.epsg()),
        }
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrsCode::Crs84 => write!(f, "CRS:84"),
            other => write!(f, "EPSG:{}", other.epsg()),
        }
    }
}

/// Axis order for coordinate interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    /// X (longitude/easting), Y (latitude/northing)
    XY,
    /// Y (latitude/northing), X (longitude/easting)
    YX,
}

impl AxisOrder {
    /// Positions of the x and y values inside a coordinate pair.
    pub fn indices(&self) -> (usize, usize) {
        match self {
            AxisOrder::XY => (0, 1),
            AxisOrder::YX => (1, 0),
        }
    }
}
