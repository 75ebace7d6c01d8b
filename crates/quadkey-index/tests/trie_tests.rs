//! Scenario tests for the quadkey trie.

use quadkey_index::QuadKeyTrie;
use test_utils::fixtures::quadkeys;
use test_utils::{quad_keys_under, scattered_quad_keys};
use tiling_common::quadkey;

#[test]
fn test_nested_fixture_canonicalizes() {
    let trie = QuadKeyTrie::from_list(quadkeys::NESTED).unwrap();
    assert_eq!(trie.to_list(), vec!["0", "3"]);
    // "0123" and "31" are still marked underneath
    assert_eq!(trie.len(), 4);
}

#[test]
fn test_insertion_order_does_not_change_iteration() {
    let mut forward = QuadKeyTrie::new();
    let mut backward = QuadKeyTrie::new();
    forward.extend_keys(quadkeys::NESTED).unwrap();
    backward.extend_keys(quadkeys::NESTED.iter().rev()).unwrap();
    assert_eq!(forward.to_list(), backward.to_list());
}

#[test]
fn test_every_stored_key_intersects_itself_and_parents() {
    let keys = scattered_quad_keys(200, 10, 3);
    let trie = QuadKeyTrie::from_list(&keys).unwrap();
    for key in &keys {
        assert!(trie.intersects(key));
        assert!(trie.intersects(quadkey::parent(key)));
    }
}

#[test]
fn test_intersecting_quad_keys_agree_with_codec() {
    let keys = scattered_quad_keys(300, 8, 11);
    let trie = QuadKeyTrie::from_list(&keys).unwrap();

    for query in ["", "1", "23", "3012"] {
        let found: Vec<String> = trie.intersecting_quad_keys(query).collect();
        let expected: Vec<String> = trie
            .sorted()
            .into_iter()
            .filter(|key| quadkey::intersects(key, query))
            .collect();
        assert_eq!(found, expected, "query '{}'", query);
    }
}

#[test]
fn test_intersection_with_disjoint_trie_is_empty() {
    let a = QuadKeyTrie::from_list(quadkeys::DISJOINT).unwrap();
    let b = QuadKeyTrie::from_list(["00", "22", "33"]).unwrap();
    assert!(a.intersection(&b).is_empty());
}

#[test]
fn test_merge_dense_region() {
    // A fully populated "0" subtree plus one stray key elsewhere
    let mut keys = quad_keys_under("0", 4);
    keys.push("3210".to_string());
    let mut trie = QuadKeyTrie::from_list(&keys).unwrap();

    let waste = trie.merge_quad_keys(0.9, 1, 3).unwrap();
    assert_eq!(trie.to_list(), vec!["0", "3210"]);
    assert_eq!(waste, 0.0);
}

#[test]
fn test_merge_full_siblings_into_parent() {
    let mut trie = QuadKeyTrie::from_list(quadkeys::SIBLINGS_31).unwrap();
    let waste = trie.merge_quad_keys(1.0, 0, 31).unwrap();
    assert_eq!(trie.to_list(), vec!["31"]);
    assert_eq!(waste, 0.0);
}

#[test]
fn test_deepest_key() {
    let mut trie = QuadKeyTrie::new();
    assert!(trie.add(quadkeys::DEEPEST).unwrap());
    assert!(trie.has(quadkeys::DEEPEST));
    assert!(trie.intersects("3"));

    let too_deep = format!("{}3", quadkeys::DEEPEST);
    assert!(trie.add(&too_deep).is_err());

    // A coarser key absorbs it on iteration
    trie.add("33").unwrap();
    assert_eq!(trie.to_list(), vec!["33"]);
    assert_eq!(trie.len(), 2);
}

#[test]
fn test_merge_never_goes_above_min_z() {
    let mut trie = QuadKeyTrie::from_list(quad_keys_under("", 3)).unwrap();
    trie.merge_quad_keys(0.5, 2, 5).unwrap();
    assert!(trie.iter().all(|key| key.len() >= 2));
    assert_eq!(trie.to_list().len(), 16);
}

#[test]
fn test_merge_keeps_keys_shallower_than_min_z() {
    let mut trie = QuadKeyTrie::from_list(["0", "3210", "3211"]).unwrap();
    let waste = trie.merge_quad_keys(0.5, 3, 5).unwrap();
    assert_eq!(trie.to_list(), vec!["0", "321"]);
    assert!(waste > 0.0);
}

#[test]
fn test_merge_reports_waste() {
    // One of four grandchildren under each of "30".."33"
    let mut trie = QuadKeyTrie::from_list(["300", "310", "320", "330"]).unwrap();
    let waste = trie.merge_quad_keys(0.25, 1, 1).unwrap();
    assert_eq!(trie.to_list(), vec!["3"]);
    assert!((waste - 0.75).abs() < 1e-12);
}

#[test]
fn test_json_boundary() {
    let json = r#"["0123", "0", "31", "3"]"#;
    let trie: QuadKeyTrie = serde_json::from_str(json).unwrap();
    assert_eq!(serde_json::to_string(&trie).unwrap(), r#"["0","3"]"#);
}
