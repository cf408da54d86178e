pub mod file_store;
pub mod header;
pub mod layout;
pub mod memory_store;
pub mod mmap_store;
pub mod volume;

use std::path::Path;
use std::sync::Arc;

use crate::core::config::StoreKind;
use crate::core::error::Result;

pub use file_store::FileStore;
pub use header::Header;
pub use layout::DatabaseLayout;
pub use memory_store::MemoryStore;
pub use mmap_store::MmapStore;
pub use volume::{STORE_HEADER_SIZE, Store};

/// Open a volume of the configured kind at `path`.
pub fn open_store<P: AsRef<Path>>(kind: StoreKind, path: P) -> Result<Arc<dyn Store>> {
    Ok(match kind {
        StoreKind::File => Arc::new(FileStore::open(path)?),
        StoreKind::MemoryMapped => Arc::new(MmapStore::open(path)?),
        StoreKind::InMemory => Arc::new(MemoryStore::new()),
    })
}
