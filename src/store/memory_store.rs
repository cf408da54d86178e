use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::core::error::{Error, ErrorKind, Result};
use crate::store::volume::{STORE_HEADER_SIZE, Store};

/// Pure in-memory volume. Same contract as the file-backed stores but
/// nothing survives the process; commit and close are no-ops beyond
/// header bookkeeping.
pub struct MemoryStore {
    data: RwLock<Vec<u8>>,
    size: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        let mut data = vec![0u8; STORE_HEADER_SIZE as usize];
        data[0..8].copy_from_slice(&STORE_HEADER_SIZE.to_le_bytes());
        MemoryStore {
            data: RwLock::new(data),
            size: AtomicU64::new(STORE_HEADER_SIZE),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl Store for MemoryStore {
    fn allocate(&self, size: usize) -> Result<u64> {
        let position = self.size.fetch_add(size as u64, Ordering::SeqCst);
        let required = (position + size as u64) as usize;
        let mut data = self.data.write();
        if data.len() < required {
            data.resize(required, 0);
        }
        Ok(position)
    }

    fn read_into(&self, position: u64, buf: &mut [u8]) -> Result<()> {
        let data = self.data.read();
        let start = position as usize;
        let end = start + buf.len();
        if end > data.len() {
            return Err(Error::new(
                ErrorKind::Io,
                format!("read of {} bytes at {} beyond volume", buf.len(), position),
            ));
        }
        buf.copy_from_slice(&data[start..end]);
        Ok(())
    }

    fn write(&self, bytes: &[u8], position: u64) -> Result<()> {
        let mut data = self.data.write();
        let end = position as usize + bytes.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[position as usize..end].copy_from_slice(bytes);
        Ok(())
    }

    fn file_size(&self) -> u64 {
        self.size.load(Ordering::SeqCst)
    }

    fn commit(&self) -> Result<()> {
        let size = self.size.load(Ordering::SeqCst);
        self.write(&size.to_le_bytes(), 0)
    }

    fn close(&self) -> Result<()> {
        self.commit()
    }

    fn reset(&self) -> Result<()> {
        let mut data = self.data.write();
        data.clear();
        data.resize(STORE_HEADER_SIZE as usize, 0);
        data[0..8].copy_from_slice(&STORE_HEADER_SIZE.to_le_bytes());
        self.size.store(STORE_HEADER_SIZE, Ordering::SeqCst);
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        self.reset()
    }
}
