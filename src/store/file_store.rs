use std::fs::{self, File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::error::{Error, ErrorKind, Result};
use crate::store::volume::{STORE_HEADER_SIZE, Store};

/// File-channel volume using positional I/O, no shared cursor.
pub struct FileStore {
    pub path: PathBuf,
    file: File,
    size: AtomicU64,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let size = if file.metadata()?.len() >= STORE_HEADER_SIZE {
            let mut header = [0u8; 8];
            file.read_exact_at(&mut header, 0)?;
            let committed = u64::from_le_bytes(header);
            committed.max(STORE_HEADER_SIZE)
        } else {
            file.set_len(STORE_HEADER_SIZE)?;
            file.write_all_at(&STORE_HEADER_SIZE.to_le_bytes(), 0)?;
            STORE_HEADER_SIZE
        };

        Ok(FileStore {
            path,
            file,
            size: AtomicU64::new(size),
        })
    }
}

impl Store for FileStore {
    fn allocate(&self, size: usize) -> Result<u64> {
        Ok(self.size.fetch_add(size as u64, Ordering::SeqCst))
    }

    fn read_into(&self, position: u64, buf: &mut [u8]) -> Result<()> {
        self.file.read_exact_at(buf, position).map_err(|e| {
            Error::new(
                ErrorKind::Io,
                format!("read of {} bytes at {} failed: {}", buf.len(), position, e),
            )
        })
    }

    fn write(&self, data: &[u8], position: u64) -> Result<()> {
        self.file.write_all_at(data, position)?;
        Ok(())
    }

    fn file_size(&self) -> u64 {
        self.size.load(Ordering::SeqCst)
    }

    fn commit(&self) -> Result<()> {
        let size = self.size.load(Ordering::SeqCst);
        self.file.write_all_at(&size.to_le_bytes(), 0)?;
        self.file.sync_all()?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.commit()
    }

    fn reset(&self) -> Result<()> {
        self.size.store(STORE_HEADER_SIZE, Ordering::SeqCst);
        self.file.set_len(STORE_HEADER_SIZE)?;
        self.file.write_all_at(&STORE_HEADER_SIZE.to_le_bytes(), 0)?;
        self.file.sync_all()?;
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        fs::remove_file(&self.path)?;
        Ok(())
    }
}
