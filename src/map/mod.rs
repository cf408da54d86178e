pub mod cache;
pub mod disk_map;
pub mod factory;

pub use cache::MapInstanceCache;
pub use disk_map::{DiskMap, MapEntryIter, TRIE_THRESHOLD};
pub use factory::MapFactory;
