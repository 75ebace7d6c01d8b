//! Test data generators for footprints, cutlines and quadkey sets.
//!
//! Everything here is deterministic so tests and benchmarks can assert on the
//! exact output.

/// Closed exterior ring for an axis aligned box.
///
/// Ring order is counter clockwise starting at the lower left corner.
pub fn box_ring(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<[f64; 2]> {
    vec![
        [min_x, min_y],
        [max_x, min_y],
        [max_x, max_y],
        [min_x, max_y],
        [min_x, min_y],
    ]
}

fn ring_json(ring: &[[f64; 2]]) -> String {
    let coords: Vec<String> = ring.iter().map(|[x, y]| format!("[{},{}]", x, y)).collect();
    format!("[{}]", coords.join(","))
}

/// MultiPolygon geometry (no Feature wrapper) with one box polygon per entry.
///
/// # Example
///
/// ```
/// use test_utils::box_multipolygon_geojson;
///
/// let json = box_multipolygon_geojson(&[(0.0, 0.0, 1.0, 1.0)]);
/// assert!(json.starts_with(r#"{"type":"MultiPolygon""#));
/// ```
pub fn box_multipolygon_geojson(boxes: &[(f64, f64, f64, f64)]) -> String {
    let polygons: Vec<String> = boxes
        .iter()
        .map(|&(min_x, min_y, max_x, max_y)| {
            format!("[{}]", ring_json(&box_ring(min_x, min_y, max_x, max_y)))
        })
        .collect();
    format!(
        r#"{{"type":"MultiPolygon","coordinates":[{}]}}"#,
        polygons.join(",")
    )
}

/// The same MultiPolygon wrapped in a single Feature inside a FeatureCollection.
pub fn box_feature_collection_geojson(boxes: &[(f64, f64, f64, f64)]) -> String {
    format!(
        r#"{{"type":"FeatureCollection","features":[{{"type":"Feature","properties":{{}},"geometry":{}}}]}}"#,
        box_multipolygon_geojson(boxes)
    )
}

/// Every quadkey of length `depth` below `prefix`, in lexicographic order.
///
/// # Example
///
/// ```
/// use test_utils::quad_keys_under;
///
/// assert_eq!(quad_keys_under("3", 2), vec!["30", "31", "32", "33"]);
/// ```
pub fn quad_keys_under(prefix: &str, depth: usize) -> Vec<String> {
    let mut keys = vec![prefix.to_string()];
    for _ in prefix.len()..depth {
        keys = keys
            .iter()
            .flat_map(|key| ['0', '1', '2', '3'].map(|digit| format!("{}{}", key, digit)))
            .collect();
    }
    keys
}

/// `count` pseudo random quadkeys of length `depth` from a fixed seed.
///
/// Uses a 64-bit xorshift, so the same seed always yields the same keys.
/// Duplicates are possible.
pub fn scattered_quad_keys(count: usize, depth: usize, seed: u64) -> Vec<String> {
    let mut state = seed.max(1);
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    (0..count)
        .map(|_| {
            (0..depth)
                .map(|_| char::from(b'0' + (next() % 4) as u8))
                .collect()
        })
        .collect()
}
