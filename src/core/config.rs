use std::path::PathBuf;
use std::time::Duration;

/// Backing medium for a store volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    File,
    MemoryMapped,
    InMemory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage_path: PathBuf,
    pub store_kind: StoreKind,

    // Index shape: 1-4 flat hash over one skip list, 5-10 full digit trie
    pub load_factor: u8,

    // Buffer pool
    pub pool_memory_limit: usize,

    // Instance cache
    pub instance_cache_capacity: usize,
    pub instance_idle_window: Duration,

    // WAL
    pub wal_rotation_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_path: PathBuf::from("./data"),
            store_kind: StoreKind::File,
            load_factor: 5,
            pool_memory_limit: 32 * 1024 * 1024,       // 32MB of pooled buffers
            instance_cache_capacity: 200,
            instance_idle_window: Duration::from_secs(60),
            wal_rotation_bytes: 20 * 1024 * 1024,      // 20MB per WAL file
        }
    }
}

impl Config {
    pub fn with_path(path: PathBuf) -> Self {
        Config {
            storage_path: path,
            ..Config::default()
        }
    }
}
