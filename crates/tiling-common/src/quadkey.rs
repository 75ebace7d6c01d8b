//! QuadKey codec.
//!
//! A quadkey is a string over `0..=3` where each digit interleaves one bit of
//! the tile column (low bit) and row (high bit), most significant first. Its
//! length is the zoom level and the empty string addresses the single root
//! tile. A quadkey denotes the full square covered by all of its
//! descendants, so two regions overlap exactly when one key is a prefix of
//! the other.

use std::cmp::Ordering;

use crate::tile::{tile_to_wgs84_bbox, Tile};
use crate::{Rect2D, TilingError, TilingResult};

/// Longest quadkey that still fits a `u32` tile column/row.
pub const MAX_QUAD_KEY_LENGTH: usize = 31;

const DIGITS: [char; 4] = ['0', '1', '2', '3'];

/// Whether `quad_key` only contains quadkey digits and fits a tile address.
pub fn is_valid(quad_key: &str) -> bool {
    quad_key.len() <= MAX_QUAD_KEY_LENGTH && quad_key.bytes().all(|b| (b'0'..=b'3').contains(&b))
}

/// Decode a quadkey into its tile address.
pub fn to_tile(quad_key: &str) -> TilingResult<Tile> {
    if quad_key.len() > MAX_QUAD_KEY_LENGTH {
        return Err(TilingError::InvalidQuadKey(format!(
            "'{}' is longer than {} digits",
            quad_key, MAX_QUAD_KEY_LENGTH
        )));
    }

    let z = quad_key.len() as u32;
    let mut x = 0u32;
    let mut y = 0u32;

    for (i, digit) in quad_key.bytes().enumerate() {
        let mask = 1u32 << (z - i as u32 - 1);
        match digit {
            b'0' => {}
            b'1' => x |= mask,
            b'2' => y |= mask,
            b'3' => {
                x |= mask;
                y |= mask;
            }
            other => {
                return Err(TilingError::InvalidQuadKey(format!(
                    "'{}' contains invalid digit '{}'",
                    quad_key, other as char
                )))
            }
        }
    }

    Ok(Tile { x, y, z })
}

/// Encode a tile address as a quadkey. Zoom 0 yields the empty string.
pub fn from_tile(tile: &Tile) -> String {
    let mut quad_key = String::with_capacity(tile.z as usize);
    for i in (1..=tile.z).rev() {
        let mask = 1u32 << (i - 1);
        let mut digit = 0;
        if tile.x & mask != 0 {
            digit += 1;
        }
        if tile.y & mask != 0 {
            digit += 2;
        }
        quad_key.push(DIGITS[digit]);
    }
    quad_key
}

/// The four keys one zoom finer, in digit order.
pub fn children(quad_key: &str) -> [String; 4] {
    DIGITS.map(|digit| {
        let mut child = String::with_capacity(quad_key.len() + 1);
        child.push_str(quad_key);
        child.push(digit);
        child
    })
}

/// The key one zoom coarser; the parent of the root is the root.
pub fn parent(quad_key: &str) -> &str {
    quad_key
        .char_indices()
        .next_back()
        .map_or(quad_key, |(last, _)| &quad_key[..last])
}

/// Whether the regions of two quadkeys overlap, i.e. one is a prefix of the other.
pub fn intersects(a: &str, b: &str) -> bool {
    let len = a.len().min(b.len());
    a.as_bytes()[..len] == b.as_bytes()[..len]
}

/// Longest shared leading run of two quadkeys.
pub fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let len = a
        .chars()
        .zip(b.chars())
        .take_while(|(left, right)| left == right)
        .map(|(left, _)| left.len_utf8())
        .sum::<usize>();
    &a[..len]
}

/// WGS84 `[west, south, east, north]` of a quadkey on the global mercator grid.
pub fn to_bbox(quad_key: &str) -> TilingResult<[f64; 4]> {
    Ok(tile_to_wgs84_bbox(&to_tile(quad_key)?))
}

/// WGS84 bounds of a quadkey.
pub fn to_bounds(quad_key: &str) -> TilingResult<Rect2D> {
    Rect2D::from_quad_key(quad_key)
}

/// Ordering for largest-coverage-first traversal.
///
/// Shorter keys cover more area and sort first; keys of equal length sort
/// lexicographically.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
