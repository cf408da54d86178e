pub mod matrix;
pub mod trie;

pub use matrix::HashMatrixNode;
pub use trie::{HashTrieIndex, ShardRef, TrieEntryIter};
