use std::fs;
use std::path::PathBuf;

use crate::core::error::Result;

/// Directory structure for one database root.
#[derive(Debug, Clone)]
pub struct DatabaseLayout {
    pub base_dir: PathBuf,
    pub store_dir: PathBuf, // volume files (.db)
    pub wal_dir: PathBuf,   // write-ahead log location
}

impl DatabaseLayout {
    pub fn new(base_dir: PathBuf) -> Result<Self> {
        let store_dir = base_dir.join("store");
        let wal_dir = base_dir.join("wal");

        fs::create_dir_all(&store_dir)?;
        fs::create_dir_all(&wal_dir)?;

        Ok(DatabaseLayout {
            base_dir,
            store_dir,
            wal_dir,
        })
    }

    pub fn store_path(&self, name: &str) -> PathBuf {
        self.store_dir.join(format!("{}.db", name))
    }

    /// Zero-padded so lexicographic listing equals chronological order.
    pub fn wal_path(&self, index: u64) -> PathBuf {
        self.wal_dir.join(format!("{:08}.wal", index))
    }
}
