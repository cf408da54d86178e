use crate::core::error::Result;
use crate::store::volume::Store;

/// "No value" sentinel for the record field. Position 0 is store header
/// space, so no real record can live there.
pub const NO_RECORD: u64 = 0;

/// Fixed-size on-disk skip list node, 29 bytes:
///
/// ```text
/// offset 0:  left    5-byte compact int
/// offset 5:  right   5-byte compact int
/// offset 10: down    5-byte compact int
/// offset 15: record  5-byte compact int
/// offset 20: key     8-byte raw (inline scalar or external key position)
/// offset 28: level   1 byte, 0 = data level
/// ```
///
/// Pointer fields use 5-byte compact integers since volumes stay well
/// under the 2^40 range; field setters issue minimal positional writes
/// rather than rewriting the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipNode {
    pub position: u64,
    pub left: u64,
    pub right: u64,
    pub down: u64,
    pub record: u64,
    pub key: u64,
    pub level: u8,
}

impl SkipNode {
    pub const SIZE: usize = 29;

    const LEFT_OFFSET: u64 = 0;
    const RIGHT_OFFSET: u64 = 5;
    const DOWN_OFFSET: u64 = 10;
    const RECORD_OFFSET: u64 = 15;
    const KEY_OFFSET: u64 = 20;

    /// Allocate and persist a fully-populated node.
    pub fn create(
        store: &dyn Store,
        key: u64,
        record: u64,
        left: u64,
        right: u64,
        down: u64,
        level: u8,
    ) -> Result<SkipNode> {
        let position = store.allocate(SkipNode::SIZE)?;
        let node = SkipNode {
            position,
            left,
            right,
            down,
            record,
            key,
            level,
        };
        node.write(store)?;
        Ok(node)
    }

    pub fn get(store: &dyn Store, position: u64) -> Result<SkipNode> {
        let bytes = store.read(position, SkipNode::SIZE)?;
        Ok(SkipNode {
            position,
            left: read_compact_u64(&bytes[0..5]),
            right: read_compact_u64(&bytes[5..10]),
            down: read_compact_u64(&bytes[10..15]),
            record: read_compact_u64(&bytes[15..20]),
            key: u64::from_le_bytes(bytes[20..28].try_into().unwrap()),
            level: bytes[28],
        })
    }

    fn write(&self, store: &dyn Store) -> Result<()> {
        let mut bytes = [0u8; SkipNode::SIZE];
        write_compact_u64(self.left, &mut bytes[0..5]);
        write_compact_u64(self.right, &mut bytes[5..10]);
        write_compact_u64(self.down, &mut bytes[10..15]);
        write_compact_u64(self.record, &mut bytes[15..20]);
        bytes[20..28].copy_from_slice(&self.key.to_le_bytes());
        bytes[28] = self.level;
        store.write(&bytes, self.position)
    }

    pub fn set_left(&mut self, store: &dyn Store, left: u64) -> Result<()> {
        self.left = left;
        write_compact_field(store, self.position + SkipNode::LEFT_OFFSET, left)
    }

    pub fn set_right(&mut self, store: &dyn Store, right: u64) -> Result<()> {
        self.right = right;
        write_compact_field(store, self.position + SkipNode::RIGHT_OFFSET, right)
    }

    pub fn set_down(&mut self, store: &dyn Store, down: u64) -> Result<()> {
        self.down = down;
        write_compact_field(store, self.position + SkipNode::DOWN_OFFSET, down)
    }

    pub fn set_record(&mut self, store: &dyn Store, record: u64) -> Result<()> {
        self.record = record;
        write_compact_field(store, self.position + SkipNode::RECORD_OFFSET, record)
    }
}

fn write_compact_field(store: &dyn Store, position: u64, value: u64) -> Result<()> {
    let mut bytes = [0u8; 5];
    write_compact_u64(value, &mut bytes);
    store.write(&bytes, position)
}

/// A 5-byte compact integer is bytes 0..4 of the little-endian u64.
pub fn read_compact_u64(bytes: &[u8]) -> u64 {
    let mut full = [0u8; 8];
    full[0..5].copy_from_slice(&bytes[0..5]);
    u64::from_le_bytes(full)
}

pub fn write_compact_u64(value: u64, out: &mut [u8]) {
    out[0..5].copy_from_slice(&value.to_le_bytes()[0..5]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory_store::MemoryStore;

    #[test]
    fn compact_int_round_trip() {
        for value in [0u64, 1, 255, 65536, (1 << 40) - 1] {
            let mut bytes = [0u8; 5];
            write_compact_u64(value, &mut bytes);
            assert_eq!(read_compact_u64(&bytes), value);
        }
    }

    #[test]
    fn node_round_trips_through_store() {
        let store = MemoryStore::new();
        let node = SkipNode::create(&store, 1, 2, 3, 4, 5, 6).unwrap();
        let loaded = SkipNode::get(&store, node.position).unwrap();
        assert_eq!(loaded, node);
    }

    #[test]
    fn field_write_touches_only_its_field() {
        let store = MemoryStore::new();
        let mut node = SkipNode::create(&store, 1, 2, 3, 4, 5, 6).unwrap();
        node.set_left(&store, 9393).unwrap();

        let loaded = SkipNode::get(&store, node.position).unwrap();
        assert_eq!(loaded.left, 9393);
        assert_eq!(loaded.right, 4);
        assert_eq!(loaded.down, 5);
        assert_eq!(loaded.record, 2);
        assert_eq!(loaded.key, 1);
        assert_eq!(loaded.level, 6);
    }
}
