use std::sync::Arc;

use crate::core::error::Result;
use crate::core::types::{KeyKind, MapKey};
use crate::hashindex::matrix::HashMatrixNode;
use crate::skiplist::list::{EntryIter, SkipList};
use crate::store::volume::Store;

/// Correlates one trie leaf slot with the skip list it shards to. Used
/// for iteration bookkeeping only, never persisted on its own.
#[derive(Debug, Clone, Copy)]
pub struct ShardRef {
    pub matrix_position: u64,
    pub digit: u8,
    pub header_position: u64,
}

/// Digit trie over the key hash, sharding the key space into independent
/// skip lists so no single list grows unbounded. The key's hash is
/// decomposed into `load_factor` base-10 digits; all but the last walk
/// matrix nodes, the last selects the shard.
pub struct HashTrieIndex {
    store: Arc<dyn Store>,
    root: u64,
    load_factor: u8,
    key_kind: KeyKind,
    partition: u32,
}

impl HashTrieIndex {
    pub fn create(
        store: Arc<dyn Store>,
        key_kind: KeyKind,
        load_factor: u8,
        partition: u32,
    ) -> Result<HashTrieIndex> {
        let root = HashMatrixNode::create(&*store)?.position;
        Ok(HashTrieIndex {
            store,
            root,
            load_factor,
            key_kind,
            partition,
        })
    }

    pub fn open(
        store: Arc<dyn Store>,
        root: u64,
        key_kind: KeyKind,
        load_factor: u8,
        partition: u32,
    ) -> Result<HashTrieIndex> {
        Ok(HashTrieIndex {
            store,
            root,
            load_factor,
            key_kind,
            partition,
        })
    }

    pub fn root_position(&self) -> u64 {
        self.root
    }

    /// Resolve the shard for `key`, creating trie nodes and the shard
    /// skip list on demand when `create` is set.
    pub fn shard(&self, key: &MapKey, create: bool) -> Result<Option<SkipList>> {
        let digits = hash_digits(key.hash64(), self.load_factor);
        let mut node = HashMatrixNode::get(&*self.store, self.root)?;

        for digit in &digits[..digits.len() - 1] {
            let child = node.slots[*digit as usize];
            node = if child == 0 {
                if !create {
                    return Ok(None);
                }
                let fresh = HashMatrixNode::create(&*self.store)?;
                node.set_slot(&*self.store, *digit as usize, fresh.position)?;
                fresh
            } else {
                HashMatrixNode::get(&*self.store, child)?
            };
        }

        let last = *digits.last().expect("load factor is at least 1") as usize;
        let slot = node.slots[last];
        if slot == 0 {
            if !create {
                return Ok(None);
            }
            let list = SkipList::create(
                Arc::clone(&self.store),
                self.key_kind,
                self.load_factor,
                self.partition,
            )?;
            node.set_slot(&*self.store, last, list.header_position())?;
            return Ok(Some(list));
        }
        Ok(Some(SkipList::open(
            Arc::clone(&self.store),
            slot,
            self.key_kind,
            self.load_factor,
            self.partition,
        )?))
    }

    /// Depth-first walk collecting every leaf shard in digit order.
    pub fn shards(&self) -> Result<Vec<ShardRef>> {
        let mut found = Vec::new();
        self.collect_shards(self.root, 0, &mut found)?;
        Ok(found)
    }

    fn collect_shards(&self, position: u64, depth: u8, found: &mut Vec<ShardRef>) -> Result<()> {
        let node = HashMatrixNode::get(&*self.store, position)?;
        let leaf_depth = self.load_factor - 1;
        for (digit, slot) in node.slots.iter().enumerate() {
            if *slot == 0 {
                continue;
            }
            if depth == leaf_depth {
                found.push(ShardRef {
                    matrix_position: position,
                    digit: digit as u8,
                    header_position: *slot,
                });
            } else {
                self.collect_shards(*slot, depth + 1, found)?;
            }
        }
        Ok(())
    }

    /// Full enumeration: each shard's ordered iterator, concatenated in
    /// digit order. Ordering holds within one shard only.
    pub fn entries(&self) -> Result<TrieEntryIter> {
        let shards = self.shards()?;
        Ok(TrieEntryIter {
            store: Arc::clone(&self.store),
            key_kind: self.key_kind,
            load_factor: self.load_factor,
            partition: self.partition,
            shards,
            shard_index: 0,
            current: None,
        })
    }
}

/// Hash decomposed into exactly `count` base-10 digits, most-significant
/// first, zero-padded.
fn hash_digits(hash: u64, count: u8) -> Vec<u8> {
    let modulus = 10u64.pow(count as u32);
    let mut remainder = hash % modulus;
    let mut digits = vec![0u8; count as usize];
    for slot in digits.iter_mut().rev() {
        *slot = (remainder % 10) as u8;
        remainder /= 10;
    }
    digits
}

pub struct TrieEntryIter {
    store: Arc<dyn Store>,
    key_kind: KeyKind,
    load_factor: u8,
    partition: u32,
    shards: Vec<ShardRef>,
    shard_index: usize,
    current: Option<EntryIter>,
}

impl Iterator for TrieEntryIter {
    type Item = <EntryIter as Iterator>::Item;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(iter) = &mut self.current {
                if let Some(item) = iter.next() {
                    return Some(item);
                }
                self.current = None;
            }
            let shard = self.shards.get(self.shard_index)?;
            self.shard_index += 1;
            let list = SkipList::open(
                Arc::clone(&self.store),
                shard.header_position,
                self.key_kind,
                self.load_factor,
                self.partition,
            );
            match list.and_then(|list| list.entries()) {
                Ok(iter) => self.current = Some(iter),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_are_padded_and_msb_first() {
        assert_eq!(hash_digits(42, 5), vec![0, 0, 0, 4, 2]);
        assert_eq!(hash_digits(987654321, 5), vec![5, 4, 3, 2, 1]);
    }
}
