use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use memmap2::{MmapMut, MmapOptions};
use parking_lot::RwLock;

use crate::core::error::{Error, ErrorKind, Result};
use crate::store::volume::{STORE_HEADER_SIZE, Store};

const INITIAL_CAPACITY: u64 = 1024 * 1024;

/// Memory-mapped volume. The mapping grows by remap under the write
/// lock, so no page references can outlive a grow.
pub struct MmapStore {
    pub path: PathBuf,
    file: File,
    mmap: RwLock<MmapMut>,
    capacity: AtomicU64,
    size: AtomicU64,
}

impl MmapStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let existing = file.metadata()?.len();
        let capacity = existing.max(INITIAL_CAPACITY);
        file.set_len(capacity)?;

        let mmap = unsafe { MmapOptions::new().len(capacity as usize).map_mut(&file)? };

        let size = if existing >= STORE_HEADER_SIZE {
            let mut header = [0u8; 8];
            header.copy_from_slice(&mmap[0..8]);
            u64::from_le_bytes(header).max(STORE_HEADER_SIZE)
        } else {
            STORE_HEADER_SIZE
        };

        let store = MmapStore {
            path,
            file,
            mmap: RwLock::new(mmap),
            capacity: AtomicU64::new(capacity),
            size: AtomicU64::new(size),
        };
        if existing < STORE_HEADER_SIZE {
            store.write(&STORE_HEADER_SIZE.to_le_bytes(), 0)?;
        }
        Ok(store)
    }

    /// Grow the mapping so `required` bytes are addressable.
    fn ensure_capacity(&self, required: u64) -> Result<()> {
        if required <= self.capacity.load(Ordering::SeqCst) {
            return Ok(());
        }
        let mut mmap = self.mmap.write();
        let current = self.capacity.load(Ordering::SeqCst);
        if required <= current {
            return Ok(());
        }
        let mut new_capacity = current;
        while new_capacity < required {
            new_capacity *= 2;
        }
        mmap.flush()?;
        self.file.set_len(new_capacity)?;
        *mmap = unsafe {
            MmapOptions::new()
                .len(new_capacity as usize)
                .map_mut(&self.file)?
        };
        self.capacity.store(new_capacity, Ordering::SeqCst);
        Ok(())
    }
}

impl Store for MmapStore {
    fn allocate(&self, size: usize) -> Result<u64> {
        let position = self.size.fetch_add(size as u64, Ordering::SeqCst);
        self.ensure_capacity(position + size as u64)?;
        Ok(position)
    }

    fn read_into(&self, position: u64, buf: &mut [u8]) -> Result<()> {
        let mmap = self.mmap.read();
        let start = position as usize;
        let end = start + buf.len();
        if end > mmap.len() {
            return Err(Error::new(
                ErrorKind::Io,
                format!("read of {} bytes at {} beyond mapping", buf.len(), position),
            ));
        }
        buf.copy_from_slice(&mmap[start..end]);
        Ok(())
    }

    fn write(&self, data: &[u8], position: u64) -> Result<()> {
        self.ensure_capacity(position + data.len() as u64)?;
        let mut mmap = self.mmap.write();
        let start = position as usize;
        mmap[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn file_size(&self) -> u64 {
        self.size.load(Ordering::SeqCst)
    }

    fn commit(&self) -> Result<()> {
        let size = self.size.load(Ordering::SeqCst);
        {
            let mut mmap = self.mmap.write();
            mmap[0..8].copy_from_slice(&size.to_le_bytes());
        }
        self.mmap.read().flush()?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.commit()
    }

    fn reset(&self) -> Result<()> {
        self.size.store(STORE_HEADER_SIZE, Ordering::SeqCst);
        let mut mmap = self.mmap.write();
        mmap[0..8].copy_from_slice(&STORE_HEADER_SIZE.to_le_bytes());
        mmap.flush()?;
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        fs::remove_file(&self.path)?;
        Ok(())
    }
}
