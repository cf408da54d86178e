use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::codec::value::Value;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{KeyKind, MapKey};
use crate::map::disk_map::DiskMap;
use crate::memory::buffer_pool::BufferPool;
use crate::store::header::Header;
use crate::store::volume::{STORE_HEADER_SIZE, Store};

/// Hard-coded load factor for the registry itself: it must be
/// constructible before any configuration exists.
const REGISTRY_LOAD_FACTOR: u8 = 2;

/// Allocates and resolves named maps inside one store volume. The
/// name → metadata registry is itself a DiskMap, bootstrapped at a fixed
/// position (the first allocation after the store header) so the factory
/// can find it again on reopen. Explicit two-phase initialization, not
/// a cyclic dependency.
pub struct MapFactory {
    store: Arc<dyn Store>,
    pool: Arc<BufferPool>,
    registry: DiskMap,
    live: Mutex<HashMap<String, Arc<DiskMap>>>,
    next_partition: AtomicU32,
}

impl MapFactory {
    pub fn new(store: Arc<dyn Store>, pool: Arc<BufferPool>) -> Result<MapFactory> {
        // Phase one: root the registry at the first position after the
        // store header, allocating it on a fresh volume.
        let registry_header = if store.file_size() == STORE_HEADER_SIZE {
            Header::create(&*store)?
        } else {
            Header::get(&*store, STORE_HEADER_SIZE)?
        };
        let registry = DiskMap::with_header(
            Arc::clone(&store),
            Arc::clone(&pool),
            registry_header,
            KeyKind::Text,
            REGISTRY_LOAD_FACTOR,
            0,
            true,
        )?;

        // Phase two: partition ids continue after the highest handed out.
        let mut highest = 0u32;
        for entry in registry.entries()? {
            let (_, reference) = entry?;
            let meta = registry.get_with_record_id(reference.position)?;
            let partition = meta.field("partition").map(|v| v.as_ulong()).transpose()?;
            highest = highest.max(partition.unwrap_or(0) as u32);
        }

        Ok(MapFactory {
            store,
            pool,
            registry,
            live: Mutex::new(HashMap::new()),
            next_partition: AtomicU32::new(highest + 1),
        })
    }

    /// Resolve a named map, returning the cached live instance when one
    /// exists. A map seen for the first time gets a fresh header; a known
    /// name reopens with its recorded shape (the requested load factor
    /// and key kind only apply to brand-new maps).
    pub fn get_map(
        &self,
        name: &str,
        load_factor: u8,
        key_kind: KeyKind,
    ) -> Result<Arc<DiskMap>> {
        let mut live = self.live.lock();
        if let Some(map) = live.get(name) {
            return Ok(Arc::clone(map));
        }

        let map = match self.lookup_metadata(name)? {
            Some(meta) => self.open_from_metadata(&meta, true)?,
            None => {
                let header = Header::create(&*self.store)?;
                let partition = self.next_partition.fetch_add(1, Ordering::SeqCst);
                let map = DiskMap::with_header(
                    Arc::clone(&self.store),
                    Arc::clone(&self.pool),
                    header,
                    key_kind,
                    load_factor,
                    partition,
                    true,
                )?;
                let meta = Value::Object(vec![
                    ("header".to_string(), Value::ULong(header.position as u64)),
                    ("loadFactor".to_string(), Value::ULong(load_factor as u64)),
                    ("keyKind".to_string(), Value::ULong(key_kind.as_byte() as u64)),
                    ("partition".to_string(), Value::ULong(partition as u64)),
                ]);
                self.registry.put(MapKey::from(name), &meta)?;
                map
            }
        };

        let map = Arc::new(map);
        live.insert(name.to_string(), Arc::clone(&map));
        Ok(map)
    }

    /// An uncached, unsynchronized instance over an already-initialized
    /// map. Intended for single-threaded batch scans; concurrent use of
    /// two stateless instances over the same header corrupts data.
    pub fn new_stateless_map(&self, name: &str) -> Result<DiskMap> {
        let meta = self.lookup_metadata(name)?.ok_or_else(|| {
            Error::new(ErrorKind::NotFound, format!("no map named {}", name))
        })?;
        self.open_from_metadata(&meta, false)
    }

    /// Flush the volume; durable state includes every map in it.
    pub fn commit(&self) -> Result<()> {
        self.store.commit()
    }

    pub fn close(&self) -> Result<()> {
        self.live.lock().clear();
        self.store.close()
    }

    /// Remove the backing volume entirely.
    pub fn delete(&self) -> Result<()> {
        self.live.lock().clear();
        self.store.delete()
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    fn lookup_metadata(&self, name: &str) -> Result<Option<Value>> {
        self.registry.get(&MapKey::from(name))
    }

    fn open_from_metadata(&self, meta: &Value, synchronized: bool) -> Result<DiskMap> {
        let field = |name: &str| -> Result<u64> {
            meta.field(name)
                .ok_or_else(|| {
                    Error::new(
                        ErrorKind::Corrupt,
                        format!("registry entry missing {}", name),
                    )
                })?
                .as_ulong()
        };
        let header = Header::get(&*self.store, field("header")?)?;
        let load_factor = field("loadFactor")? as u8;
        let key_kind = KeyKind::from_byte(field("keyKind")? as u8)?;
        let partition = field("partition")? as u32;
        DiskMap::with_header(
            Arc::clone(&self.store),
            Arc::clone(&self.pool),
            header,
            key_kind,
            load_factor,
            partition,
            synchronized,
        )
    }
}
