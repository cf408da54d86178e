use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::codec::stream;
use crate::codec::value::Value;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{KeyKind, MapKey, PutResult, Reference};
use crate::hashindex::trie::{HashTrieIndex, TrieEntryIter};
use crate::memory::buffer_pool::BufferPool;
use crate::skiplist::list::{EntryIter, SkipList};
use crate::store::header::Header;
use crate::store::volume::Store;

/// Load factors below this use a flat single skip list; at or above it
/// the full digit trie fronts the shards.
pub const TRIE_THRESHOLD: u8 = 5;

enum MapIndex {
    Flat(SkipList),
    Trie {
        trie: HashTrieIndex,
        header: Mutex<Header>,
    },
}

/// The public map contract: a disk-resident key → value map rooted at
/// one Header inside a shared store volume.
///
/// Stateful instances synchronize through an internal RwLock. Stateless
/// instances skip locking entirely; two stateless instances over the
/// same header mutating concurrently will corrupt data, and keeping
/// them single-threaded is the caller's responsibility.
pub struct DiskMap {
    store: Arc<dyn Store>,
    pool: Arc<BufferPool>,
    index: MapIndex,
    key_kind: KeyKind,
    load_factor: u8,
    partition: u32,
    synchronized: bool,
    lock: RwLock<()>,
}

impl std::fmt::Debug for DiskMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskMap")
            .field("key_kind", &self.key_kind)
            .field("load_factor", &self.load_factor)
            .field("partition", &self.partition)
            .field("synchronized", &self.synchronized)
            .finish_non_exhaustive()
    }
}

impl DiskMap {
    /// Build a map over `header`. A header whose `first_node` is zero is
    /// initialized for the configured load factor; anything else is
    /// opened as-is.
    pub fn with_header(
        store: Arc<dyn Store>,
        pool: Arc<BufferPool>,
        header: Header,
        key_kind: KeyKind,
        load_factor: u8,
        partition: u32,
        synchronized: bool,
    ) -> Result<DiskMap> {
        if !(1..=10).contains(&load_factor) {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("load factor {} outside 1-10", load_factor),
            ));
        }

        let index = if load_factor < TRIE_THRESHOLD {
            MapIndex::Flat(SkipList::with_header(
                Arc::clone(&store),
                header,
                key_kind,
                load_factor,
                partition,
            )?)
        } else {
            let mut header = header;
            let trie = if header.first_node == 0 {
                let trie = HashTrieIndex::create(
                    Arc::clone(&store),
                    key_kind,
                    load_factor,
                    partition,
                )?;
                header.set_first_node(&*store, trie.root_position())?;
                trie
            } else {
                HashTrieIndex::open(
                    Arc::clone(&store),
                    header.first_node as u64,
                    key_kind,
                    load_factor,
                    partition,
                )?
            };
            MapIndex::Trie {
                trie,
                header: Mutex::new(header),
            }
        };

        Ok(DiskMap {
            store,
            pool,
            index,
            key_kind,
            load_factor,
            partition,
            synchronized,
            lock: RwLock::new(()),
        })
    }

    pub fn key_kind(&self) -> KeyKind {
        self.key_kind
    }

    pub fn load_factor(&self) -> u8 {
        self.load_factor
    }

    pub fn partition(&self) -> u32 {
        self.partition
    }

    /// Serialize `value` into the store and index it under `key`.
    pub fn put(&self, key: MapKey, value: &Value) -> Result<PutResult> {
        let _guard = self.write_guard();
        self.put_locked(key, value)
    }

    pub fn get(&self, key: &MapKey) -> Result<Option<Value>> {
        let _guard = self.read_guard();
        self.get_locked(key)
    }

    /// Remove the key, returning the removed value.
    pub fn remove(&self, key: &MapKey) -> Result<Option<Value>> {
        let _guard = self.write_guard();
        let removed = match &self.index {
            MapIndex::Flat(list) => list.delete(key)?,
            MapIndex::Trie { trie, header } => match trie.shard(key, false)? {
                Some(shard) => {
                    let removed = shard.delete(key)?;
                    if removed.is_some() {
                        let mut header = header.lock();
                        let count = header.record_count.saturating_sub(1);
                        header.set_record_count(&*self.store, count)?;
                    }
                    removed
                }
                None => None,
            },
        };
        match removed {
            Some(record) => Ok(Some(self.read_record(record)?)),
            None => Ok(None),
        }
    }

    /// Atomic read-modify-write; the map lock is held for the whole
    /// duration of `f`.
    pub fn compute_if_present(
        &self,
        key: &MapKey,
        f: impl FnOnce(Value) -> Value,
    ) -> Result<Option<Value>> {
        let _guard = self.write_guard();
        let Some(current) = self.get_locked(key)? else {
            return Ok(None);
        };
        let updated = f(current);
        self.put_locked(key.clone(), &updated)?;
        Ok(Some(updated))
    }

    /// References for all stored keys above `key`. Trie maps visit every
    /// shard; ordering is only guaranteed within one shard.
    pub fn above(&self, key: &MapKey, inclusive: bool) -> Result<Vec<Reference>> {
        let _guard = self.read_guard();
        self.range(|list| list.above(key, inclusive))
    }

    pub fn below(&self, key: &MapKey, inclusive: bool) -> Result<Vec<Reference>> {
        let _guard = self.read_guard();
        self.range(|list| list.below(key, inclusive))
    }

    pub fn between(
        &self,
        from: &MapKey,
        to: &MapKey,
        inclusive_from: bool,
        inclusive_to: bool,
    ) -> Result<Vec<Reference>> {
        let _guard = self.read_guard();
        self.range(|list| list.between(from, to, inclusive_from, inclusive_to))
    }

    /// Fetch one stored value by record position, without a key lookup.
    pub fn get_with_record_id(&self, position: u64) -> Result<Value> {
        let _guard = self.read_guard();
        self.read_record(position)
    }

    /// Decode a single attribute of a stored record, skipping the rest
    /// of the value graph.
    pub fn get_attribute_with_record_id(&self, field: &str, position: u64) -> Result<Value> {
        let _guard = self.read_guard();
        let len = self.record_len(position)?;
        let mut buf = self.pool.acquire(len);
        self.store.read_into(position + 4, &mut buf)?;
        stream::read_attribute(&buf, field)
    }

    pub fn long_size(&self) -> u64 {
        match &self.index {
            MapIndex::Flat(list) => list.record_count() as u64,
            MapIndex::Trie { header, .. } => header.lock().record_count as u64,
        }
    }

    /// Full enumeration of (key, reference) pairs.
    pub fn entries(&self) -> Result<MapEntryIter> {
        match &self.index {
            MapIndex::Flat(list) => Ok(MapEntryIter::Flat(list.entries()?)),
            MapIndex::Trie { trie, .. } => Ok(MapEntryIter::Trie(trie.entries()?)),
        }
    }

    fn put_locked(&self, key: MapKey, value: &Value) -> Result<PutResult> {
        let bytes = stream::to_buffer(value);
        let record = self.write_record(&bytes)?;
        match &self.index {
            MapIndex::Flat(list) => list.insert(&key, record),
            MapIndex::Trie { trie, header } => {
                let shard = trie
                    .shard(&key, true)?
                    .expect("shard is created on demand");
                let result = shard.insert(&key, record)?;
                if result.is_insert {
                    let mut header = header.lock();
                    let count = header.record_count + 1;
                    header.set_record_count(&*self.store, count)?;
                }
                Ok(result)
            }
        }
    }

    fn get_locked(&self, key: &MapKey) -> Result<Option<Value>> {
        let node = match &self.index {
            MapIndex::Flat(list) => list.search(key)?,
            MapIndex::Trie { trie, .. } => match trie.shard(key, false)? {
                Some(shard) => shard.search(key)?,
                None => None,
            },
        };
        match node {
            Some(node) => Ok(Some(self.read_record(node.record)?)),
            None => Ok(None),
        }
    }

    fn range(
        &self,
        op: impl Fn(&SkipList) -> Result<Vec<Reference>>,
    ) -> Result<Vec<Reference>> {
        match &self.index {
            MapIndex::Flat(list) => op(list),
            MapIndex::Trie { trie, .. } => {
                let mut refs = Vec::new();
                for shard in trie.shards()? {
                    let list = SkipList::open(
                        Arc::clone(&self.store),
                        shard.header_position,
                        self.key_kind,
                        self.load_factor,
                        self.partition,
                    )?;
                    refs.extend(op(&list)?);
                }
                Ok(refs)
            }
        }
    }

    /// Records are framed as [u32 length][codec payload].
    fn write_record(&self, payload: &[u8]) -> Result<u64> {
        let position = self.store.allocate(4 + payload.len())?;
        self.store.write_u32(payload.len() as u32, position)?;
        self.store.write(payload, position + 4)?;
        Ok(position)
    }

    // Record payloads stream through a pooled buffer scoped to the
    // decode; the buffer returns to the pool on every exit path.
    fn read_record(&self, position: u64) -> Result<Value> {
        let len = self.record_len(position)?;
        let mut buf = self.pool.acquire(len);
        self.store.read_into(position + 4, &mut buf)?;
        stream::from_buffer(&buf)
    }

    fn record_len(&self, position: u64) -> Result<usize> {
        if position == 0 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "record position 0 is the store header".to_string(),
            ));
        }
        Ok(self.store.read_u32(position)? as usize)
    }

    fn read_guard(&self) -> Option<RwLockReadGuard<'_, ()>> {
        self.synchronized.then(|| self.lock.read())
    }

    fn write_guard(&self) -> Option<RwLockWriteGuard<'_, ()>> {
        self.synchronized.then(|| self.lock.write())
    }
}

pub enum MapEntryIter {
    Flat(EntryIter),
    Trie(TrieEntryIter),
}

impl Iterator for MapEntryIter {
    type Item = Result<(MapKey, Reference)>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            MapEntryIter::Flat(iter) => iter.next(),
            MapEntryIter::Trie(iter) => iter.next(),
        }
    }
}
