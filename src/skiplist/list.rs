use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::Rng;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{KeyKind, MapKey, PutResult, Reference};
use crate::skiplist::node::{NO_RECORD, SkipNode};
use crate::store::header::Header;
use crate::store::volume::Store;

/// One ordered shard: a multi-level linked structure of fixed-size
/// on-disk nodes rooted at a 12-byte header. The header's `first_node`
/// points at the topmost head node; head nodes carry no key or record
/// and are never compared.
///
/// Callers needing map-level atomicity synchronize above this type; the
/// internal mutex only guards the header mirror.
pub struct SkipList {
    store: Arc<dyn Store>,
    header: Mutex<Header>,
    key_kind: KeyKind,
    max_level: u8,
    partition: u32,
}

impl SkipList {
    /// Root a list at an existing header, creating the level-0 head node
    /// if the header has never been used.
    pub fn with_header(
        store: Arc<dyn Store>,
        mut header: Header,
        key_kind: KeyKind,
        max_level: u8,
        partition: u32,
    ) -> Result<SkipList> {
        if header.first_node == 0 {
            let head = SkipNode::create(&*store, 0, NO_RECORD, 0, 0, 0, 0)?;
            header.set_first_node(&*store, head.position)?;
        }
        Ok(SkipList {
            store,
            header: Mutex::new(header),
            key_kind,
            max_level,
            partition,
        })
    }

    /// Allocate a fresh list: header plus a level-0 head node.
    pub fn create(
        store: Arc<dyn Store>,
        key_kind: KeyKind,
        max_level: u8,
        partition: u32,
    ) -> Result<SkipList> {
        let header = Header::create(&*store)?;
        SkipList::with_header(store, header, key_kind, max_level, partition)
    }

    /// Open an existing list over an already-initialized header.
    pub fn open(
        store: Arc<dyn Store>,
        header_position: u64,
        key_kind: KeyKind,
        max_level: u8,
        partition: u32,
    ) -> Result<SkipList> {
        let header = Header::get(&*store, header_position)?;
        SkipList::with_header(store, header, key_kind, max_level, partition)
    }

    pub fn header_position(&self) -> u64 {
        self.header.lock().position as u64
    }

    pub fn record_count(&self) -> u32 {
        self.header.lock().record_count
    }

    /// Exact-match lookup: descend from the top head, moving right while
    /// the neighbor's key stays below the target, then down; the level-0
    /// neighbor is the match or nothing is.
    pub fn search(&self, key: &MapKey) -> Result<Option<SkipNode>> {
        let path = self.find_path(key)?;
        let pred = path.last().expect("path always reaches level 0");
        if pred.right == 0 {
            return Ok(None);
        }
        let node = SkipNode::get(&*self.store, pred.right)?;
        if self.compare(node.key, key)? == CmpOrdering::Equal {
            Ok(Some(node))
        } else {
            Ok(None)
        }
    }

    /// Insert or update. An existing key has its level-0 record pointer
    /// swapped in place; a new key gets a coin-flipped height capped by
    /// the load factor and is linked into every level it occupies.
    pub fn insert(&self, key: &MapKey, record: u64) -> Result<PutResult> {
        let mut path = self.find_path(key)?;

        let level0_pred = *path.last().expect("path always reaches level 0");
        if level0_pred.right != 0 {
            let mut existing = SkipNode::get(&*self.store, level0_pred.right)?;
            if self.compare(existing.key, key)? == CmpOrdering::Equal {
                let previous = existing.record;
                existing.set_record(&*self.store, record)?;
                return Ok(PutResult {
                    key: key.clone(),
                    is_insert: false,
                    record_position: record,
                    previous_record: previous,
                });
            }
        }

        let level = self.random_level();
        let current_top = path[0].level;
        if level > current_top {
            let new_heads = self.grow_head(current_top, level)?;
            path.splice(0..0, new_heads);
        }

        let raw_key = self.store_key(key)?;
        let mut down = 0u64;
        for l in 0..=level {
            let pred_index = path.len() - 1 - l as usize;
            let mut pred = path[pred_index];
            let node = SkipNode::create(
                &*self.store,
                raw_key,
                if l == 0 { record } else { NO_RECORD },
                pred.position,
                pred.right,
                down,
                l,
            )?;
            pred.set_right(&*self.store, node.position)?;
            if node.right != 0 {
                SkipNode::get(&*self.store, node.right)?.set_left(&*self.store, node.position)?;
            }
            down = node.position;
        }

        {
            let mut header = self.header.lock();
            let count = header.record_count + 1;
            header.set_record_count(&*self.store, count)?;
        }

        Ok(PutResult {
            key: key.clone(),
            is_insert: true,
            record_position: record,
            previous_record: 0,
        })
    }

    /// Unlink the key from every level it occupies and tombstone the
    /// level-0 record. Freed node bytes are not reclaimed.
    pub fn delete(&self, key: &MapKey) -> Result<Option<u64>> {
        let path = self.find_path(key)?;
        let mut removed = None;

        for pred in path.iter() {
            if pred.right == 0 {
                continue;
            }
            let mut node = SkipNode::get(&*self.store, pred.right)?;
            if self.compare(node.key, key)? != CmpOrdering::Equal {
                continue;
            }
            let mut pred = *pred;
            pred.set_right(&*self.store, node.right)?;
            if node.right != 0 {
                SkipNode::get(&*self.store, node.right)?.set_left(&*self.store, pred.position)?;
            }
            if node.level == 0 {
                removed = Some(node.record);
                node.set_record(&*self.store, NO_RECORD)?;
            }
        }

        if removed.is_some() {
            let mut header = self.header.lock();
            let count = header.record_count.saturating_sub(1);
            header.set_record_count(&*self.store, count)?;
        }
        Ok(removed)
    }

    /// References for all stored keys above `key`. Values are never
    /// materialized; scans can span the whole shard.
    pub fn above(&self, key: &MapKey, inclusive: bool) -> Result<Vec<Reference>> {
        let path = self.find_path(key)?;
        let pred = path.last().expect("path always reaches level 0");
        let mut refs = Vec::new();
        let mut next = pred.right;
        while next != 0 {
            let node = SkipNode::get(&*self.store, next)?;
            let include = match self.compare(node.key, key)? {
                CmpOrdering::Greater => true,
                CmpOrdering::Equal => inclusive,
                CmpOrdering::Less => false,
            };
            if include && node.record != NO_RECORD {
                refs.push(Reference::new(self.partition, node.record));
            }
            next = node.right;
        }
        Ok(refs)
    }

    /// References for all stored keys below `key`.
    pub fn below(&self, key: &MapKey, inclusive: bool) -> Result<Vec<Reference>> {
        let mut refs = Vec::new();
        let head = self.level0_head()?;
        let mut next = head.right;
        while next != 0 {
            let node = SkipNode::get(&*self.store, next)?;
            match self.compare(node.key, key)? {
                CmpOrdering::Less => {
                    if node.record != NO_RECORD {
                        refs.push(Reference::new(self.partition, node.record));
                    }
                }
                CmpOrdering::Equal => {
                    if inclusive && node.record != NO_RECORD {
                        refs.push(Reference::new(self.partition, node.record));
                    }
                    break;
                }
                CmpOrdering::Greater => break,
            }
            next = node.right;
        }
        Ok(refs)
    }

    /// References for all stored keys between the two bounds.
    pub fn between(
        &self,
        from: &MapKey,
        to: &MapKey,
        inclusive_from: bool,
        inclusive_to: bool,
    ) -> Result<Vec<Reference>> {
        let path = self.find_path(from)?;
        let pred = path.last().expect("path always reaches level 0");
        let mut refs = Vec::new();
        let mut next = pred.right;
        while next != 0 {
            let node = SkipNode::get(&*self.store, next)?;
            let after_from = match self.compare(node.key, from)? {
                CmpOrdering::Greater => true,
                CmpOrdering::Equal => inclusive_from,
                CmpOrdering::Less => false,
            };
            match self.compare(node.key, to)? {
                CmpOrdering::Less => {
                    if after_from && node.record != NO_RECORD {
                        refs.push(Reference::new(self.partition, node.record));
                    }
                }
                CmpOrdering::Equal => {
                    if after_from && inclusive_to && node.record != NO_RECORD {
                        refs.push(Reference::new(self.partition, node.record));
                    }
                    break;
                }
                CmpOrdering::Greater => break,
            }
            next = node.right;
        }
        Ok(refs)
    }

    /// Ordered iteration over the data level.
    pub fn entries(&self) -> Result<EntryIter> {
        let head = self.level0_head()?;
        Ok(EntryIter {
            store: Arc::clone(&self.store),
            key_kind: self.key_kind,
            partition: self.partition,
            next: head.right,
        })
    }

    /// Per-level predecessors of `key`, top level first, level 0 last.
    fn find_path(&self, key: &MapKey) -> Result<Vec<SkipNode>> {
        let first_node = self.header.lock().first_node as u64;
        let mut node = SkipNode::get(&*self.store, first_node)?;
        let mut path = Vec::with_capacity(node.level as usize + 1);
        loop {
            while node.right != 0 {
                let right = SkipNode::get(&*self.store, node.right)?;
                if self.compare(right.key, key)? == CmpOrdering::Less {
                    node = right;
                } else {
                    break;
                }
            }
            path.push(node);
            if node.down == 0 {
                break;
            }
            node = SkipNode::get(&*self.store, node.down)?;
        }
        Ok(path)
    }

    /// Add head nodes for levels `current_top+1..=level`, returned top
    /// level first for splicing into a search path.
    fn grow_head(&self, current_top: u8, level: u8) -> Result<Vec<SkipNode>> {
        let mut header = self.header.lock();
        let mut top_position = header.first_node as u64;
        let mut new_heads = Vec::new();
        for l in (current_top + 1)..=level {
            let head = SkipNode::create(&*self.store, 0, NO_RECORD, 0, 0, top_position, l)?;
            top_position = head.position;
            new_heads.push(head);
        }
        header.set_first_node(&*self.store, top_position)?;
        new_heads.reverse();
        Ok(new_heads)
    }

    fn level0_head(&self) -> Result<SkipNode> {
        let first_node = self.header.lock().first_node as u64;
        let mut node = SkipNode::get(&*self.store, first_node)?;
        while node.down != 0 {
            node = SkipNode::get(&*self.store, node.down)?;
        }
        Ok(node)
    }

    /// Biased coin flip per extra level, capped by the load factor.
    fn random_level(&self) -> u8 {
        let mut level = 0u8;
        let mut rng = rand::thread_rng();
        while level + 1 < self.max_level && rng.gen_bool(0.5) {
            level += 1;
        }
        level
    }

    /// Raw key field for a new node: inline for scalars, an external
    /// length-prefixed record for text.
    fn store_key(&self, key: &MapKey) -> Result<u64> {
        if key.kind() != self.key_kind {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!(
                    "map is keyed by {:?}, got {:?}",
                    self.key_kind,
                    key.kind()
                ),
            ));
        }
        match key.inline_raw() {
            Some(raw) => Ok(raw),
            None => {
                let MapKey::Text(text) = key else {
                    unreachable!("only text keys lack an inline form")
                };
                write_external_key(&*self.store, text)
            }
        }
    }

    fn compare(&self, raw: u64, key: &MapKey) -> Result<CmpOrdering> {
        match self.key_kind {
            KeyKind::ULong | KeyKind::Long => {
                let target = key.inline_raw().ok_or_else(|| {
                    Error::new(
                        ErrorKind::InvalidArgument,
                        format!("map is keyed by {:?}, got {:?}", self.key_kind, key.kind()),
                    )
                })?;
                Ok(raw.cmp(&target))
            }
            KeyKind::Text => {
                let stored = read_external_key(&*self.store, raw)?;
                let MapKey::Text(target) = key else {
                    return Err(Error::new(
                        ErrorKind::InvalidArgument,
                        format!("map is keyed by Text, got {:?}", key.kind()),
                    ));
                };
                Ok(stored.cmp(target))
            }
        }
    }
}

fn write_external_key(store: &dyn Store, text: &str) -> Result<u64> {
    let bytes = text.as_bytes();
    let position = store.allocate(4 + bytes.len())?;
    store.write_u32(bytes.len() as u32, position)?;
    store.write(bytes, position + 4)?;
    Ok(position)
}

fn read_external_key(store: &dyn Store, position: u64) -> Result<String> {
    let len = store.read_u32(position)? as usize;
    let bytes = store.read(position + 4, len)?;
    String::from_utf8(bytes)
        .map_err(|e| Error::new(ErrorKind::Corrupt, format!("invalid key bytes: {}", e)))
}

pub fn load_key(store: &dyn Store, kind: KeyKind, raw: u64) -> Result<MapKey> {
    match kind {
        KeyKind::ULong | KeyKind::Long => MapKey::from_inline_raw(kind, raw),
        KeyKind::Text => Ok(MapKey::Text(read_external_key(store, raw)?)),
    }
}

/// Ordered (key, reference) walk of one shard's data level.
pub struct EntryIter {
    store: Arc<dyn Store>,
    key_kind: KeyKind,
    partition: u32,
    next: u64,
}

impl Iterator for EntryIter {
    type Item = Result<(MapKey, Reference)>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next != 0 {
            let node = match SkipNode::get(&*self.store, self.next) {
                Ok(node) => node,
                Err(e) => {
                    self.next = 0;
                    return Some(Err(e));
                }
            };
            self.next = node.right;
            if node.record == NO_RECORD {
                continue;
            }
            let key = match load_key(&*self.store, self.key_kind, node.key) {
                Ok(key) => key,
                Err(e) => {
                    self.next = 0;
                    return Some(Err(e));
                }
            };
            return Some(Ok((key, Reference::new(self.partition, node.record))));
        }
        None
    }
}
