//! Quadkey trie spatial index.
//!
//! Each node of the trie is one quadkey digit. A node marked as a leaf
//! covers its whole subtree, so iteration stops descending at marked nodes
//! and yields the minimal covering list. Nodes live in an arena, children
//! always sit after their parent.
//!
//! `len()` counts marked nodes. Adding a coarse key after some of its
//! descendants does not unmark them, so `len()` may exceed the number of
//! keys yielded by [`QuadKeyTrie::iter`].

use std::collections::VecDeque;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tiling_common::quadkey;
use tiling_common::{TilingError, TilingResult};
use tracing::debug;

const ROOT: usize = 0;

#[derive(Debug, Clone, Default)]
struct Node {
    children: [Option<usize>; 4],
    parent: Option<usize>,
    leaf: bool,
}

fn digit_index(digit: u8) -> Option<usize> {
    match digit {
        b'0'..=b'3' => Some((digit - b'0') as usize),
        _ => None,
    }
}

fn push_digit(key: &mut String, index: usize) {
    key.push(char::from(b'0' + index as u8));
}

/// Relative area of a quadkey of `len` digits, root = 1.
fn key_area(len: usize) -> f64 {
    0.25f64.powi(len as i32)
}

/// A set of quadkeys where coarser keys absorb the keys they cover.
#[derive(Debug, Clone)]
pub struct QuadKeyTrie {
    nodes: Vec<Node>,
    marked: usize,
}

impl Default for QuadKeyTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl QuadKeyTrie {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            marked: 0,
        }
    }

    /// Build a trie by adding every key in turn.
    pub fn from_list<I, S>(keys: I) -> TilingResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut trie = Self::new();
        trie.extend_keys(keys)?;
        Ok(trie)
    }

    /// Add every key in turn, stopping at the first invalid one.
    pub fn extend_keys<I, S>(&mut self, keys: I) -> TilingResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for key in keys {
            self.add(key.as_ref())?;
        }
        Ok(())
    }

    /// Insert a quadkey. Returns `false` when the key was already marked.
    pub fn add(&mut self, quad_key: &str) -> TilingResult<bool> {
        if !quadkey::is_valid(quad_key) {
            return Err(TilingError::InvalidQuadKey(format!(
                "cannot index '{}'",
                quad_key
            )));
        }

        let mut node = ROOT;
        for digit in quad_key.bytes() {
            // Validated above
            let index = (digit - b'0') as usize;
            node = match self.nodes[node].children[index] {
                Some(child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(Node {
                        parent: Some(node),
                        ..Node::default()
                    });
                    self.nodes[node].children[index] = Some(child);
                    child
                }
            };
        }

        if self.nodes[node].leaf {
            return Ok(false);
        }
        self.nodes[node].leaf = true;
        self.marked += 1;
        Ok(true)
    }

    /// Number of marked keys, including ones a coarser key made redundant.
    pub fn len(&self) -> usize {
        self.marked
    }

    pub fn is_empty(&self) -> bool {
        self.marked == 0
    }

    /// Whether exactly `quad_key` is marked.
    pub fn has(&self, quad_key: &str) -> bool {
        self.find(quad_key)
            .is_some_and(|node| self.nodes[node].leaf)
    }

    /// Whether any stored key overlaps `quad_key`, either as an ancestor or
    /// as a descendant.
    pub fn intersects(&self, quad_key: &str) -> bool {
        if self.is_empty() {
            return false;
        }
        match self.walk(quad_key) {
            Walk::Covered(_) | Walk::Reached(_) => true,
            Walk::Missing => false,
        }
    }

    /// Stored keys overlapping `quad_key`, in [`quadkey::compare_keys`] order.
    ///
    /// When a stored key covers `quad_key` only that key is yielded.
    pub fn intersecting_quad_keys(&self, quad_key: &str) -> IntersectingKeys<'_> {
        let mut queue = VecDeque::new();
        if !self.is_empty() {
            match self.walk(quad_key) {
                Walk::Covered(node) => queue.push_back((node, self.key_of(node))),
                Walk::Reached(node) => queue.push_back((node, quad_key.to_string())),
                Walk::Missing => {}
            }
        }
        IntersectingKeys { trie: self, queue }
    }

    /// Keys of either trie that intersect the other trie, sorted and deduplicated.
    pub fn intersection(&self, other: &QuadKeyTrie) -> Vec<String> {
        let mut keys: Vec<String> = self
            .iter()
            .filter(|key| other.intersects(key))
            .chain(other.iter().filter(|key| self.intersects(key)))
            .collect();
        keys.sort_by(|a, b| quadkey::compare_keys(a, b));
        keys.dedup();
        keys
    }

    /// Canonical keys, depth first in digit order.
    pub fn iter(&self) -> Iter<'_> {
        let stack = if self.is_empty() {
            Vec::new()
        } else {
            vec![(ROOT, String::new())]
        };
        Iter { trie: self, stack }
    }

    /// Canonical keys collected into a list.
    pub fn to_list(&self) -> Vec<String> {
        self.iter().collect()
    }

    /// Canonical keys in [`quadkey::compare_keys`] order.
    pub fn sorted(&self) -> Vec<String> {
        let mut keys = self.to_list();
        keys.sort_by(|a, b| quadkey::compare_keys(a, b));
        keys
    }

    /// Generalize the trie by replacing well filled subtrees with their root.
    ///
    /// A node whose depth is in `min_z..=max_z` is collapsed when at least
    /// `fill_ratio` of its area is covered by stored keys. Shallower nodes are
    /// never collapsed into, but stored keys already shorter than `min_z`
    /// pass through unchanged. Keys deeper than `max_z` whose ancestors were
    /// not collapsed also stay as they are. The coarsest eligible ancestor
    /// wins.
    ///
    /// Returns the fraction of the resulting area that was not covered
    /// before the merge.
    pub fn merge_quad_keys(
        &mut self,
        fill_ratio: f64,
        min_z: usize,
        max_z: usize,
    ) -> TilingResult<f64> {
        if !(0.0..=1.0).contains(&fill_ratio) {
            return Err(TilingError::invalid_config(format!(
                "fill ratio {} is outside 0..=1",
                fill_ratio
            )));
        }
        if min_z > max_z {
            return Err(TilingError::invalid_config(format!(
                "merge zoom range {}..={} is empty",
                min_z, max_z
            )));
        }

        let before = self.to_list();
        let covered_area: f64 = before.iter().map(|key| key_area(key.len())).sum();
        let pass = MergePass {
            trie: &*self,
            coverage: self.coverage(),
            fill_ratio,
            min_z,
            max_z,
        };
        let mut merged = Vec::new();
        if !self.is_empty() {
            pass.collect(ROOT, &mut String::new(), &mut merged);
        }

        let merged_area: f64 = merged.iter().map(|key| key_area(key.len())).sum();
        let waste = if merged_area > 0.0 {
            ((merged_area - covered_area) / merged_area).max(0.0)
        } else {
            0.0
        };

        debug!(
            keys_before = before.len(),
            keys_after = merged.len(),
            fill_ratio,
            min_z,
            max_z,
            waste,
            "Merged quadkeys"
        );

        *self = Self::from_list(&merged)?;
        Ok(waste)
    }

    /// Covered fraction of every node, leaves being fully covered.
    fn coverage(&self) -> Vec<f64> {
        let mut coverage = vec![0.0; self.nodes.len()];
        for index in (0..self.nodes.len()).rev() {
            let node = &self.nodes[index];
            coverage[index] = if node.leaf {
                1.0
            } else {
                node.children
                    .iter()
                    .flatten()
                    .map(|child| coverage[*child])
                    .sum::<f64>()
                    / 4.0
            };
        }
        coverage
    }

    fn find(&self, quad_key: &str) -> Option<usize> {
        quad_key.bytes().try_fold(ROOT, |node, digit| {
            self.nodes[node].children[digit_index(digit)?]
        })
    }

    fn walk(&self, quad_key: &str) -> Walk {
        let mut node = ROOT;
        if self.nodes[node].leaf {
            return Walk::Covered(node);
        }
        for digit in quad_key.bytes() {
            let Some(child) = digit_index(digit).and_then(|index| self.nodes[node].children[index])
            else {
                return Walk::Missing;
            };
            node = child;
            if self.nodes[node].leaf {
                return Walk::Covered(node);
            }
        }
        Walk::Reached(node)
    }

    /// Quadkey of an arena node, rebuilt through parent links.
    fn key_of(&self, mut node: usize) -> String {
        let mut digits = Vec::new();
        while let Some(parent) = self.nodes[node].parent {
            let index = self.nodes[parent]
                .children
                .iter()
                .position(|child| *child == Some(node))
                .unwrap_or_default();
            digits.push(char::from(b'0' + index as u8));
            node = parent;
        }
        digits.iter().rev().collect()
    }
}

/// Outcome of following a quadkey down the trie.
enum Walk {
    /// A marked node on the key's path covers it.
    Covered(usize),
    /// The key's node exists but nothing above it is marked.
    Reached(usize),
    /// The path leaves the trie.
    Missing,
}

/// One top-down generalization walk over a trie.
struct MergePass<'a> {
    trie: &'a QuadKeyTrie,
    coverage: Vec<f64>,
    fill_ratio: f64,
    min_z: usize,
    max_z: usize,
}

impl MergePass<'_> {
    fn collect(&self, node: usize, key: &mut String, out: &mut Vec<String>) {
        let depth = key.len();
        let collapse =
            (self.min_z..=self.max_z).contains(&depth) && self.coverage[node] >= self.fill_ratio;
        if self.trie.nodes[node].leaf || collapse {
            out.push(key.clone());
            return;
        }

        for (index, child) in self.trie.nodes[node].children.iter().enumerate() {
            if let Some(child) = child {
                push_digit(key, index);
                self.collect(*child, key, out);
                key.pop();
            }
        }
    }
}

/// Depth first iterator over canonical keys.
pub struct Iter<'a> {
    trie: &'a QuadKeyTrie,
    stack: Vec<(usize, String)>,
}

impl Iterator for Iter<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while let Some((index, key)) = self.stack.pop() {
            let node = &self.trie.nodes[index];
            if node.leaf {
                return Some(key);
            }
            // Reverse so digit 0 is visited first
            for (digit, child) in node.children.iter().enumerate().rev() {
                if let Some(child) = child {
                    let mut child_key = key.clone();
                    push_digit(&mut child_key, digit);
                    self.stack.push((*child, child_key));
                }
            }
        }
        None
    }
}

/// Breadth first iterator over stored keys below a query key.
pub struct IntersectingKeys<'a> {
    trie: &'a QuadKeyTrie,
    queue: VecDeque<(usize, String)>,
}

impl Iterator for IntersectingKeys<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while let Some((index, key)) = self.queue.pop_front() {
            let node = &self.trie.nodes[index];
            if node.leaf {
                return Some(key);
            }
            for (digit, child) in node.children.iter().enumerate() {
                if let Some(child) = child {
                    let mut child_key = key.clone();
                    push_digit(&mut child_key, digit);
                    self.queue.push_back((*child, child_key));
                }
            }
        }
        None
    }
}

impl<'a> IntoIterator for &'a QuadKeyTrie {
    type Item = String;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for QuadKeyTrie {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for QuadKeyTrie {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let keys = Vec::<String>::deserialize(deserializer)?;
        QuadKeyTrie::from_list(keys).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trie(keys: &[&str]) -> QuadKeyTrie {
        QuadKeyTrie::from_list(keys).unwrap()
    }

    #[test]
    fn test_add_and_has() {
        let mut t = QuadKeyTrie::new();
        assert!(t.is_empty());
        assert!(t.add("31").unwrap());
        assert!(!t.add("31").unwrap());
        assert_eq!(t.len(), 1);
        assert!(t.has("31"));
        assert!(!t.has("3"));
        assert!(!t.has("310"));
        assert!(t.add("4").is_err());
    }

    #[test]
    fn test_key_and_children_canonicalize() {
        let mut keys = vec!["31".to_string()];
        keys.extend(quadkey::children("31"));
        let t = QuadKeyTrie::from_list(&keys).unwrap();
        assert_eq!(t.to_list(), vec!["31"]);
    }

    #[test]
    fn test_len_counts_redundant_descendants() {
        let t = trie(&["310", "311", "31"]);
        assert_eq!(t.len(), 3);
        assert_eq!(t.to_list(), vec!["31"]);
    }

    #[test]
    fn test_intersects_directionality() {
        let t = trie(&["33"]);
        assert!(!t.intersects("301"));
        assert!(t.intersects("333"));
        assert!(t.intersects("3"));
        assert!(t.intersects(""));

        let t = trie(&["331"]);
        assert!(t.intersects("3"));
        assert!(!t.intersects("333"));

        assert!(!QuadKeyTrie::new().intersects(""));
    }

    #[test]
    fn test_root_key_covers_everything() {
        let t = trie(&[""]);
        assert!(t.intersects("0123"));
        assert_eq!(t.to_list(), vec![""]);
        assert_eq!(t.intersecting_quad_keys("21").collect::<Vec<_>>(), vec![""]);
    }

    #[test]
    fn test_intersecting_quad_keys_order() {
        let t = trie(&["3300", "31", "302", "2"]);
        let keys: Vec<String> = t.intersecting_quad_keys("3").collect();
        assert_eq!(keys, vec!["31", "302", "3300"]);
        assert_eq!(
            t.intersecting_quad_keys("3102").collect::<Vec<_>>(),
            vec!["31"]
        );
        assert_eq!(t.intersecting_quad_keys("0").count(), 0);
    }

    #[test]
    fn test_intersection_is_symmetric() {
        let a = trie(&["0", "31", "22"]);
        let b = trie(&["01", "3", "11"]);
        assert_eq!(a.intersection(&b), vec!["0", "3", "01", "31"]);
        assert_eq!(b.intersection(&a), a.intersection(&b));
    }

    #[test]
    fn test_iter_is_depth_first() {
        let t = trie(&["2", "01", "0000", "33"]);
        assert_eq!(t.to_list(), vec!["0000", "01", "2", "33"]);
        assert_eq!(t.sorted(), vec!["2", "01", "33", "0000"]);
    }

    #[test]
    fn test_parent_links() {
        let t = trie(&["302"]);
        let leaf = t.find("302").unwrap();
        assert_eq!(t.key_of(leaf), "302");
        assert_eq!(t.key_of(ROOT), "");
    }

    #[test]
    fn test_merge_full_siblings() {
        let mut t = trie(&["310", "311", "312", "313"]);
        let waste = t.merge_quad_keys(1.0, 0, 31).unwrap();
        assert_eq!(t.to_list(), vec!["31"]);
        assert_eq!(waste, 0.0);
    }

    #[test]
    fn test_merge_partial_fill() {
        let mut t = trie(&["310", "311", "312"]);
        let waste = t.merge_quad_keys(0.7, 0, 31).unwrap();
        assert_eq!(t.to_list(), vec!["31"]);
        assert!((waste - 0.25).abs() < 1e-12);

        let mut t = trie(&["310", "311", "312"]);
        t.merge_quad_keys(0.8, 0, 31).unwrap();
        assert_eq!(t.to_list(), vec!["310", "311", "312"]);
    }

    #[test]
    fn test_merge_respects_min_z() {
        let mut t = trie(&["0", "1", "2", "3"]);
        t.merge_quad_keys(1.0, 1, 31).unwrap();
        assert_eq!(t.to_list(), vec!["0", "1", "2", "3"]);
    }

    #[test]
    fn test_merge_respects_max_z() {
        let mut t = trie(&["3100", "3101", "3102", "3103"]);
        t.merge_quad_keys(1.0, 0, 2).unwrap();
        assert_eq!(t.to_list(), vec!["3100", "3101", "3102", "3103"]);

        let mut t = trie(&["3100", "3101", "3102", "3103"]);
        t.merge_quad_keys(1.0, 0, 3).unwrap();
        assert_eq!(t.to_list(), vec!["310"]);
    }

    #[test]
    fn test_merge_rejects_bad_arguments() {
        let mut t = trie(&["0"]);
        assert!(t.merge_quad_keys(1.5, 0, 3).is_err());
        assert!(t.merge_quad_keys(0.5, 4, 3).is_err());
        assert_eq!(QuadKeyTrie::new().merge_quad_keys(0.5, 0, 3).unwrap(), 0.0);
    }

    #[test]
    fn test_serde_round_trip() {
        let t = trie(&["31", "310", "02"]);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#"["02","31"]"#);

        let back: QuadKeyTrie = serde_json::from_str(&json).unwrap();
        assert_eq!(back.to_list(), t.to_list());
        assert!(serde_json::from_str::<QuadKeyTrie>(r#"["05"]"#).is_err());
    }
}
