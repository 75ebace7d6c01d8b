//! Well known tile matrix sets.

use crate::crs::CrsCode;
use crate::tile::{TileMatrixSet, TileMatrixSetDefinition, ZoomLevel};

/// Half the circumference of the WGS84 spheroid in Web Mercator meters.
pub const WEB_MERCATOR_MAX_EXTENT: f64 = 20037508.342789244;

/// Scale denominator of Web Mercator zoom 0 (one 256px tile for the globe).
pub const WEB_MERCATOR_ZOOM0_SCALE: f64 = 559082264.0287178;

/// Scale denominator of NZTM2000Quad zoom 0.
pub const NZTM2000_ZOOM0_SCALE: f64 = 279541132.0143589;

/// NZTM2000Quad top left corner as (northing, easting).
pub const NZTM2000_TOP_LEFT: [f64; 2] = [10438190.1652, -3260586.7284];

/// Last NZTM2000Quad zoom that keeps the power of two progression from zoom 0.
const NZTM2000_REGULAR_MAX: u32 = 7;

/// Scale jump between NZTM2000Quad zoom 7 and zoom 8 (2.5x, not 2x).
const NZTM2000_IRREGULAR_STEP: f64 = 2.5;

/// Standard Web Mercator (Google/OSM) tile matrix set.
pub fn web_mercator_quad() -> TileMatrixSet {
    let tile_matrix: Vec<ZoomLevel> = (0..=22)
        .map(|z| {
            let n = 2u32.pow(z);
            ZoomLevel {
                identifier: z.to_string(),
                scale_denominator: WEB_MERCATOR_ZOOM0_SCALE / n as f64,
                top_left_corner: [-WEB_MERCATOR_MAX_EXTENT, WEB_MERCATOR_MAX_EXTENT],
                tile_width: 256,
                tile_height: 256,
                matrix_width: n,
                matrix_height: n,
            }
        })
        .collect();

    TileMatrixSet::from_trusted(
        TileMatrixSetDefinition {
            identifier: "WebMercatorQuad".to_string(),
            title: Some("Google Maps Compatible for the World".to_string()),
            supported_crs: CrsCode::Epsg3857.to_uri(),
            well_known_scale_set: Some(
                "http://www.opengis.net/def/wkss/OGC/1.0/GoogleMapsCompatible".to_string(),
            ),
            tile_matrix,
        },
        CrsCode::Epsg3857,
    )
}

/// LINZ NZTM2000 map tile grid (EPSG:2193).
///
/// Zoom 0 is a 2x4 grid. Zooms 0-7 halve the scale each step; zoom 8 is
/// 2.5x finer than zoom 7, after which halving resumes up to zoom 22.
pub fn nztm2000_quad() -> TileMatrixSet {
    let tile_matrix: Vec<ZoomLevel> = (0..=22u32)
        .map(|z| {
            // Linear factor from zoom 0 on each axis
            let factor = if z <= NZTM2000_REGULAR_MAX {
                2f64.powi(z as i32)
            } else {
                2f64.powi(NZTM2000_REGULAR_MAX as i32)
                    * NZTM2000_IRREGULAR_STEP
                    * 2f64.powi((z - NZTM2000_REGULAR_MAX - 1) as i32)
            };

            ZoomLevel {
                identifier: z.to_string(),
                scale_denominator: NZTM2000_ZOOM0_SCALE / factor,
                top_left_corner: NZTM2000_TOP_LEFT,
                tile_width: 256,
                tile_height: 256,
                matrix_width: (2.0 * factor) as u32,
                matrix_height: (4.0 * factor) as u32,
            }
        })
        .collect();

    TileMatrixSet::from_trusted(
        TileMatrixSetDefinition {
            identifier: "NZTM2000Quad".to_string(),
            title: Some("LINZ NZTM2000 Map Tile Grid V2".to_string()),
            supported_crs: CrsCode::Epsg2193.to_uri(),
            well_known_scale_set: None,
            tile_matrix,
        },
        CrsCode::Epsg2193,
    )
}

/// All presets, coarsest CRS first.
pub fn all() -> Vec<TileMatrixSet> {
    vec![web_mercator_quad(), nztm2000_quad()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_pass_validation() {
        for tms in all() {
            let rebuilt = TileMatrixSet::new(tms.definition()).unwrap();
            assert_eq!(rebuilt.identifier(), tms.identifier());
            assert_eq!(rebuilt.zooms(), tms.zooms());
        }
    }

    #[test]
    fn test_nztm2000_table() {
        let tms = nztm2000_quad();
        assert_eq!(tms.max_zoom(), 22);
        assert_eq!(tms.axis_indices(), (1, 0));

        let z0 = tms.zoom(0).unwrap();
        assert_eq!((z0.matrix_width, z0.matrix_height), (2, 4));
        let z7 = tms.zoom(7).unwrap();
        assert_eq!((z7.matrix_width, z7.matrix_height), (256, 512));
        let z8 = tms.zoom(8).unwrap();
        assert_eq!((z8.matrix_width, z8.matrix_height), (640, 1280));
        assert!((z8.scale_denominator - 873566.0375448715).abs() < 1e-6);
        let z22 = tms.zoom(22).unwrap();
        assert_eq!((z22.matrix_width, z22.matrix_height), (10485760, 20971520));
        assert!((z22.scale_denominator - 53.31823959624459).abs() < 1e-6);
    }

    #[test]
    fn test_web_mercator_table() {
        let tms = web_mercator_quad();
        assert_eq!(tms.max_zoom(), 22);
        assert_eq!(tms.axis_indices(), (0, 1));
        assert_eq!(tms.zoom(10).unwrap().matrix_width, 1024);
    }
}
