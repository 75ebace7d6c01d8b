//! Bridge behaviour across the preset tile matrix sets.

use std::sync::Arc;

use quadkey_index::{QuadKeyBridge, QuadKeyTrie};
use tiling_common::{presets, quadkey, Tile, TileMatrixSet, TilingError};

fn nztm_bridge() -> QuadKeyBridge {
    QuadKeyBridge::new(Arc::new(presets::nztm2000_quad())).unwrap()
}

fn grid_json(width: u32, height: u32) -> String {
    format!(
        r#"{{
            "identifier": "Odd",
            "supportedCRS": "EPSG:3857",
            "tileMatrix": [{{
                "identifier": "0",
                "scaleDenominator": 1000.0,
                "topLeftCorner": [0.0, 0.0],
                "tileWidth": 256,
                "tileHeight": 256,
                "matrixWidth": {},
                "matrixHeight": {}
            }}]
        }}"#,
        width, height
    )
}

#[test]
fn test_non_power_of_two_root_is_rejected() {
    let tms = TileMatrixSet::from_json(&grid_json(3, 2)).unwrap();
    let err = QuadKeyBridge::new(Arc::new(tms)).unwrap_err();
    assert!(matches!(err, TilingError::UnsupportedShape(_)));
    assert!(err.is_fatal());

    let tms = TileMatrixSet::from_json(&grid_json(4, 3)).unwrap();
    assert_eq!(QuadKeyBridge::new(Arc::new(tms)).unwrap().z_offset(), 2);
}

#[test]
fn test_round_trip_regular_zooms() {
    let bridge = nztm_bridge();
    let tms = bridge.tile_matrix_set().clone();
    for z in 0..bridge.z_max() {
        let level = tms.zoom(z).unwrap();
        for tile in [
            Tile::new(0, 0, z),
            Tile::new(level.matrix_width - 1, level.matrix_height - 1, z),
            Tile::new(level.matrix_width / 2, level.matrix_height / 3, z),
        ] {
            let key = bridge.from_tile(&tile).unwrap();
            assert_eq!(key.len() as u32, z + bridge.z_offset());
            assert_eq!(bridge.to_tile(&key).unwrap(), tile);
        }
    }
}

#[test]
fn test_web_mercator_matches_codec() {
    let bridge = QuadKeyBridge::new(Arc::new(presets::web_mercator_quad())).unwrap();
    let tile = Tile::new(3, 5, 4);
    assert_eq!(bridge.from_tile(&tile).unwrap(), quadkey::from_tile(&tile));
    assert_eq!(bridge.to_tile("").unwrap(), Tile::new(0, 0, 0));
}

#[test]
fn test_nearest_matches_direct_encoding_below_z_max() {
    let bridge = nztm_bridge();
    let tile = Tile::new(100, 200, 7);
    assert_eq!(
        bridge.nearest_quad_keys(&tile).unwrap(),
        vec![bridge.from_tile(&tile).unwrap()]
    );
}

#[test]
fn test_nearest_keys_cover_the_tile() {
    let bridge = nztm_bridge();
    let tms = bridge.tile_matrix_set().clone();

    // Every zoom 8 child of a zoom 7 tile maps back onto that tile
    let parent = Tile::new(10, 20, 7);
    let parent_key = bridge.from_tile(&parent).unwrap();
    for child in tms.cover_tile(Some(&parent)) {
        let keys = bridge.nearest_quad_keys(&child).unwrap();
        assert!(!keys.is_empty() && keys.len() <= 4, "{:?}", keys);
        assert!(keys.iter().all(|key| key.len() == parent_key.len()));
        assert!(keys.iter().any(|key| key == &parent_key));
    }
}

#[test]
fn test_nearest_keys_past_irregular_step() {
    let bridge = nztm_bridge();
    let keys = bridge.nearest_quad_keys(&Tile::new(6400, 12800, 13)).unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].len() as u32, bridge.z_max() - 1 + bridge.z_offset());
}

#[test]
fn test_nearest_keys_index_lookup() {
    let bridge = nztm_bridge();
    let mut index = QuadKeyTrie::new();
    index.add(&bridge.from_tile(&Tile::new(1, 1, 7)).unwrap()).unwrap();

    assert!(bridge
        .nearest_quad_keys(&Tile::new(4, 4, 8))
        .unwrap()
        .iter()
        .any(|key| index.intersects(key)));
    assert!(!bridge
        .nearest_quad_keys(&Tile::new(0, 0, 8))
        .unwrap()
        .iter()
        .any(|key| index.intersects(key)));
}
