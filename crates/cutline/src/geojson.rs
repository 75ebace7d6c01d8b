//! GeoJSON loading for cutline polygons.
//!
//! A cutline document is a bare `MultiPolygon` geometry, a `Feature` holding
//! one, or a `FeatureCollection` whose features all hold one. Their polygons
//! are concatenated in document order. Any other geometry is rejected.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;

use crate::error::{CutlineError, CutlineResult};

/// Positions are `[x, y]` with any further ordinates ignored.
type Position = Vec<f64>;
type Ring = Vec<Position>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJsonObject {
    FeatureCollection {
        features: Vec<GeoJsonObject>,
    },
    Feature {
        geometry: Option<Box<GeoJsonObject>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Ring>>,
    },
    Polygon {},
    Point {},
    MultiPoint {},
    LineString {},
    MultiLineString {},
    GeometryCollection {},
}

impl GeoJsonObject {
    fn kind(&self) -> &'static str {
        match self {
            GeoJsonObject::FeatureCollection { .. } => "FeatureCollection",
            GeoJsonObject::Feature { .. } => "Feature",
            GeoJsonObject::MultiPolygon { .. } => "MultiPolygon",
            GeoJsonObject::Polygon {} => "Polygon",
            GeoJsonObject::Point {} => "Point",
            GeoJsonObject::MultiPoint {} => "MultiPoint",
            GeoJsonObject::LineString {} => "LineString",
            GeoJsonObject::MultiLineString {} => "MultiLineString",
            GeoJsonObject::GeometryCollection {} => "GeometryCollection",
        }
    }

    fn collect_polygons(self, out: &mut Vec<Polygon<f64>>) -> CutlineResult<()> {
        match self {
            GeoJsonObject::FeatureCollection { features } => {
                for feature in features {
                    if !matches!(feature, GeoJsonObject::Feature { .. }) {
                        return Err(CutlineError::InvalidGeometry(format!(
                            "FeatureCollection member is a {}",
                            feature.kind()
                        )));
                    }
                    feature.collect_polygons(out)?;
                }
                Ok(())
            }
            GeoJsonObject::Feature { geometry } => match geometry {
                Some(geometry) if matches!(*geometry, GeoJsonObject::MultiPolygon { .. }) => {
                    (*geometry).collect_polygons(out)
                }
                Some(geometry) => Err(CutlineError::NotMultiPolygon(geometry.kind().to_string())),
                None => Err(CutlineError::NotMultiPolygon("null geometry".to_string())),
            },
            GeoJsonObject::MultiPolygon { coordinates } => {
                for polygon in coordinates {
                    out.push(to_polygon(polygon)?);
                }
                Ok(())
            }
            other => Err(CutlineError::NotMultiPolygon(other.kind().to_string())),
        }
    }
}

fn to_ring(ring: Ring) -> CutlineResult<LineString<f64>> {
    // A closed ring holds at least a triangle plus the repeated first position
    if ring.len() < 4 {
        return Err(CutlineError::InvalidGeometry(format!(
            "ring has {} positions, at least 4 are required",
            ring.len()
        )));
    }

    let coords = ring
        .into_iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
            _ => Err(CutlineError::InvalidGeometry(format!(
                "invalid position {:?}",
                position
            ))),
        })
        .collect::<CutlineResult<Vec<_>>>()?;
    Ok(LineString::new(coords))
}

fn to_polygon(rings: Vec<Ring>) -> CutlineResult<Polygon<f64>> {
    let mut rings = rings.into_iter();
    let exterior = rings
        .next()
        .ok_or_else(|| CutlineError::InvalidGeometry("polygon has no rings".to_string()))?;
    let exterior = to_ring(exterior)?;
    let interiors = rings.map(to_ring).collect::<CutlineResult<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Parse a cutline GeoJSON document into its polygons.
pub fn parse_multi_polygon(json: &str) -> CutlineResult<MultiPolygon<f64>> {
    let object: GeoJsonObject = serde_json::from_str(json)?;
    let mut polygons = Vec::new();
    object.collect_polygons(&mut polygons)?;
    Ok(MultiPolygon::new(polygons))
}
