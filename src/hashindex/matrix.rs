use crate::core::error::Result;
use crate::store::volume::Store;

/// Fixed fan-out trie node: own position followed by one child slot per
/// hash digit 0-9. Slots are written when a child is created and never
/// cleared afterwards; the trie only grows.
///
/// ```text
/// offset 0:       position   8 bytes
/// offset 8+d*8:   slot d     8 bytes, d in 0..10
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashMatrixNode {
    pub position: u64,
    pub slots: [u64; 10],
}

impl HashMatrixNode {
    pub const SIZE: usize = 88;

    pub fn create(store: &dyn Store) -> Result<HashMatrixNode> {
        let position = store.allocate(HashMatrixNode::SIZE)?;
        let node = HashMatrixNode {
            position,
            slots: [0; 10],
        };
        let mut bytes = [0u8; HashMatrixNode::SIZE];
        bytes[0..8].copy_from_slice(&position.to_le_bytes());
        store.write(&bytes, position)?;
        Ok(node)
    }

    pub fn get(store: &dyn Store, position: u64) -> Result<HashMatrixNode> {
        let bytes = store.read(position, HashMatrixNode::SIZE)?;
        let mut slots = [0u64; 10];
        for (i, slot) in slots.iter_mut().enumerate() {
            let start = 8 + i * 8;
            *slot = u64::from_le_bytes(bytes[start..start + 8].try_into().unwrap());
        }
        Ok(HashMatrixNode {
            position: u64::from_le_bytes(bytes[0..8].try_into().unwrap()),
            slots,
        })
    }

    /// Minimal positional write of one child slot.
    pub fn set_slot(&mut self, store: &dyn Store, digit: usize, value: u64) -> Result<()> {
        self.slots[digit] = value;
        store.write_u64(value, self.position + 8 + digit as u64 * 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory_store::MemoryStore;

    #[test]
    fn matrix_node_round_trips() {
        let store = MemoryStore::new();
        let mut node = HashMatrixNode::create(&store).unwrap();
        node.set_slot(&store, 3, 4242).unwrap();
        node.set_slot(&store, 9, 77).unwrap();

        let loaded = HashMatrixNode::get(&store, node.position).unwrap();
        assert_eq!(loaded, node);
        assert_eq!(loaded.slots[3], 4242);
        assert_eq!(loaded.slots[0], 0);
    }
}
