use crate::core::error::{Error, ErrorKind, Result};
use crate::store::volume::Store;

/// Root descriptor of one map: 3 native 32-bit integers on disk.
///
/// ```text
/// offset 0: first_node    entry point (top head node or trie root)
/// offset 4: record_count
/// offset 8: position      self-location
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub first_node: u32,
    pub record_count: u32,
    pub position: u32,
}

impl Header {
    pub const SIZE: usize = 12;

    const FIRST_NODE_OFFSET: u64 = 0;
    const RECORD_COUNT_OFFSET: u64 = 4;
    const POSITION_OFFSET: u64 = 8;

    /// Allocate and persist a fresh header.
    pub fn create(store: &dyn Store) -> Result<Header> {
        let position = narrow(store.allocate(Header::SIZE)?)?;
        let header = Header {
            first_node: 0,
            record_count: 0,
            position,
        };
        header.write(store)?;
        Ok(header)
    }

    pub fn get(store: &dyn Store, position: u64) -> Result<Header> {
        Ok(Header {
            first_node: store.read_u32(position + Header::FIRST_NODE_OFFSET)?,
            record_count: store.read_u32(position + Header::RECORD_COUNT_OFFSET)?,
            position: store.read_u32(position + Header::POSITION_OFFSET)?,
        })
    }

    pub fn write(&self, store: &dyn Store) -> Result<()> {
        let mut bytes = [0u8; Header::SIZE];
        bytes[0..4].copy_from_slice(&self.first_node.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.record_count.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.position.to_le_bytes());
        store.write(&bytes, self.position as u64)
    }

    /// Minimal positional write of the entry-point field.
    pub fn set_first_node(&mut self, store: &dyn Store, first_node: u64) -> Result<()> {
        let first_node = narrow(first_node)?;
        self.first_node = first_node;
        store.write_u32(first_node, self.position as u64 + Header::FIRST_NODE_OFFSET)
    }

    pub fn set_record_count(&mut self, store: &dyn Store, count: u32) -> Result<()> {
        self.record_count = count;
        store.write_u32(count, self.position as u64 + Header::RECORD_COUNT_OFFSET)
    }
}

/// Header fields are 32-bit on disk; a position past that range is a
/// hard error, never a wrapping cast.
fn narrow(position: u64) -> Result<u32> {
    u32::try_from(position).map_err(|_| {
        Error::new(
            ErrorKind::InvalidState,
            format!("position {} exceeds the 32-bit header range", position),
        )
    })
}
