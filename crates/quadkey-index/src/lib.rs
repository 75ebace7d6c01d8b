//! Quadkey addressing on top of tile matrix sets.
//!
//! [`QuadKeyBridge`] carries native tiles of any power-of-two rooted tile
//! matrix set into the quadkey space and [`QuadKeyTrie`] indexes sets of
//! quadkeys for overlap queries and generalization.

pub mod bridge;
pub mod trie;

pub use bridge::QuadKeyBridge;
pub use trie::QuadKeyTrie;
