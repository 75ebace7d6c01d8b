//! Common test fixtures for the imagery tiling tests.
//!
//! Footprints are in NZTM2000 (EPSG:2193) meters as
//! (min_easting, min_northing, max_easting, max_northing) unless stated
//! otherwise.

/// Common bounding box definitions in WGS84 degrees as (west, south, east, north).
pub mod bbox {
    /// Global bounding box (-180 to 180, -90 to 90)
    pub const GLOBAL: (f64, f64, f64, f64) = (-180.0, -90.0, 180.0, 90.0);

    /// Mainland New Zealand
    pub const NEW_ZEALAND: (f64, f64, f64, f64) = (166.0, -47.5, 178.8, -34.0);

    /// Single point (degenerate bbox)
    pub const POINT: (f64, f64, f64, f64) = (0.0, 0.0, 0.0, 0.0);

    /// Crosses antimeridian (Pacific-centric)
    pub const PACIFIC: (f64, f64, f64, f64) = (160.0, -50.0, -140.0, 50.0);

    /// Chatham Islands, east of the antimeridian
    pub const CHATHAMS: (f64, f64, f64, f64) = (176.0, -44.5, -176.0, -43.5);
}

/// Source imagery footprints in NZTM2000 meters.
pub mod footprints {
    /// One aerial photo block around central Auckland
    pub const AUCKLAND: (f64, f64, f64, f64) = (1_750_000.0, 5_910_000.0, 1_760_000.0, 5_925_000.0);

    /// Neighbouring block, sharing an edge with [`AUCKLAND`]
    pub const AUCKLAND_EAST: (f64, f64, f64, f64) =
        (1_760_000.0, 5_910_000.0, 1_770_000.0, 5_925_000.0);

    /// Central Wellington
    pub const WELLINGTON: (f64, f64, f64, f64) =
        (1_745_000.0, 5_420_000.0, 1_755_000.0, 5_435_000.0);

    /// Christchurch, well away from the other blocks
    pub const CHRISTCHURCH: (f64, f64, f64, f64) =
        (1_565_000.0, 5_175_000.0, 1_580_000.0, 5_190_000.0);

    /// Covers most of both main islands
    pub const NATIONAL: (f64, f64, f64, f64) =
        (1_000_000.0, 4_700_000.0, 2_100_000.0, 6_200_000.0);
}

/// Quadkeys used across trie and bridge tests.
pub mod quadkeys {
    /// Four siblings that merge into "31"
    pub const SIBLINGS_31: [&str; 4] = ["310", "311", "312", "313"];

    /// Mixed depth keys with one key ("0") covering another ("0123")
    pub const NESTED: [&str; 4] = ["0", "0123", "31", "3"];

    /// Keys sharing no prefix with each other
    pub const DISJOINT: [&str; 3] = ["01", "23", "32"];

    /// Longest key the codec accepts
    pub const DEEPEST: &str = "3333333333333333333333333333333";
}

/// Common CRS identifiers.
pub mod crs {
    /// WGS84 geographic
    pub const EPSG_4326: &str = "EPSG:4326";

    /// Web Mercator
    pub const EPSG_3857: &str = "EPSG:3857";

    /// New Zealand Transverse Mercator 2000
    pub const EPSG_2193: &str = "EPSG:2193";

    /// OGC CRS84, longitude first
    pub const CRS_84: &str = "CRS:84";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footprints_are_well_formed() {
        for (min_x, min_y, max_x, max_y) in [
            footprints::AUCKLAND,
            footprints::AUCKLAND_EAST,
            footprints::WELLINGTON,
            footprints::CHRISTCHURCH,
            footprints::NATIONAL,
        ] {
            assert!(min_x < max_x);
            assert!(min_y < max_y);
        }
    }

    #[test]
    fn test_quadkey_fixtures_use_quadkey_digits() {
        let all = quadkeys::SIBLINGS_31
            .iter()
            .chain(quadkeys::NESTED.iter())
            .chain(quadkeys::DISJOINT.iter())
            .chain(std::iter::once(&quadkeys::DEEPEST));
        for key in all {
            assert!(key.chars().all(|c| ('0'..='3').contains(&c)), "{}", key);
        }
        assert_eq!(quadkeys::DEEPEST.len(), 31);
    }
}
