use std::sync::Arc;

use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::types::KeyKind;
use crate::map::cache::MapInstanceCache;
use crate::map::disk_map::DiskMap;
use crate::map::factory::MapFactory;
use crate::memory::buffer_pool::BufferPool;
use crate::store::layout::DatabaseLayout;
use crate::store::open_store;
use crate::wal::log::TransactionLog;

/// Top-level engine handle: one directory of volumes plus the shared
/// buffer pool, the factory instance cache, and the transaction log,
/// all sized from one `Config`.
pub struct Database {
    config: Config,
    layout: DatabaseLayout,
    pool: Arc<BufferPool>,
    instances: MapInstanceCache,
    log: TransactionLog,
}

impl Database {
    pub fn open(config: Config) -> Result<Database> {
        let layout = DatabaseLayout::new(config.storage_path.clone())?;
        let pool = Arc::new(BufferPool::new(config.pool_memory_limit));
        let instances = MapInstanceCache::new(
            config.instance_cache_capacity,
            config.instance_idle_window,
        );
        let log = TransactionLog::open(&layout.wal_dir, config.wal_rotation_bytes)?;

        Ok(Database {
            config,
            layout,
            pool,
            instances,
            log,
        })
    }

    /// Resolve the factory for one named volume, opening the volume and
    /// registering it in the instance cache on a miss.
    pub fn factory(&self, volume: &str) -> Result<Arc<MapFactory>> {
        if let Some(factory) = self.instances.get(volume)? {
            return Ok(factory);
        }
        let store = open_store(self.config.store_kind, self.layout.store_path(volume))?;
        let factory = Arc::new(MapFactory::new(store, Arc::clone(&self.pool))?);
        self.instances
            .put(volume.to_string(), Arc::clone(&factory))?;
        Ok(factory)
    }

    /// Resolve a named map in a volume, shaped by the configured load
    /// factor. Known names keep their recorded shape.
    pub fn map(&self, volume: &str, name: &str, key_kind: KeyKind) -> Result<Arc<DiskMap>> {
        self.factory(volume)?
            .get_map(name, self.config.load_factor, key_kind)
    }

    pub fn transaction_log(&self) -> &TransactionLog {
        &self.log
    }

    pub fn instances(&self) -> &MapInstanceCache {
        &self.instances
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self) -> &DatabaseLayout {
        &self.layout
    }
}
