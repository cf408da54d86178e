use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::codec::stream;
use crate::codec::value::Value;
use crate::core::error::{Error, ErrorKind, Result};

/// One logged mutation. Query payloads are opaque value graphs; their
/// semantics belong to the layer that replays them.
#[derive(Debug, Clone, PartialEq)]
pub enum LogOperation {
    Save(Value),
    Delete(Value),
    DeleteByQuery(Value),
    UpdateByQuery(Value),
}

impl LogOperation {
    pub fn type_tag(&self) -> u8 {
        match self {
            LogOperation::Save(_) => 1,
            LogOperation::Delete(_) => 2,
            LogOperation::DeleteByQuery(_) => 3,
            LogOperation::UpdateByQuery(_) => 4,
        }
    }

    pub fn payload(&self) -> &Value {
        match self {
            LogOperation::Save(v)
            | LogOperation::Delete(v)
            | LogOperation::DeleteByQuery(v)
            | LogOperation::UpdateByQuery(v) => v,
        }
    }

    pub fn from_parts(tag: u8, payload: Value) -> Result<LogOperation> {
        Ok(match tag {
            1 => LogOperation::Save(payload),
            2 => LogOperation::Delete(payload),
            3 => LogOperation::DeleteByQuery(payload),
            4 => LogOperation::UpdateByQuery(payload),
            other => {
                return Err(Error::new(
                    ErrorKind::Corrupt,
                    format!("unknown transaction type tag {}", other),
                ));
            }
        })
    }

    pub fn describe(&self) -> String {
        match self {
            LogOperation::Save(_) => "Save".to_string(),
            LogOperation::Delete(_) => "Delete".to_string(),
            LogOperation::DeleteByQuery(_) => "DeleteByQuery".to_string(),
            LogOperation::UpdateByQuery(_) => "UpdateByQuery".to_string(),
        }
    }
}

struct LogWriter {
    file: File,
    index: u64,
    written: u64,
}

/// Append-only durable log of mutating operations. Frames are
/// `[type:1][length:4 LE][payload]`; files rotate past the size cap,
/// named `<index>.wal` with a zero-padded monotonically increasing
/// index so lexicographic listing is chronological.
///
/// Appends serialize under one lock, so logged operations are totally
/// ordered with respect to each other. Ordering against the map
/// mutation an operation describes is the caller's critical section.
pub struct TransactionLog {
    wal_dir: PathBuf,
    rotation_bytes: u64,
    writer: Mutex<LogWriter>,
}

pub fn wal_file_path(wal_dir: &Path, index: u64) -> PathBuf {
    wal_dir.join(format!("{:08}.wal", index))
}

impl TransactionLog {
    /// Open the log directory, continuing at the highest existing index.
    pub fn open(wal_dir: &Path, rotation_bytes: u64) -> Result<TransactionLog> {
        std::fs::create_dir_all(wal_dir)?;
        let index = highest_index(wal_dir)?.unwrap_or(0);
        let path = wal_file_path(wal_dir, index);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();

        Ok(TransactionLog {
            wal_dir: wal_dir.to_path_buf(),
            rotation_bytes,
            writer: Mutex::new(LogWriter {
                file,
                index,
                written,
            }),
        })
    }

    pub fn write_save(&self, entity: &Value) -> Result<()> {
        self.append(1, entity)
    }

    pub fn write_delete(&self, entity: &Value) -> Result<()> {
        self.append(2, entity)
    }

    pub fn write_query_delete(&self, query: &Value) -> Result<()> {
        self.append(3, query)
    }

    pub fn write_query_update(&self, query: &Value) -> Result<()> {
        self.append(4, query)
    }

    pub fn write_operation(&self, operation: &LogOperation) -> Result<()> {
        self.append(operation.type_tag(), operation.payload())
    }

    pub fn sync(&self) -> Result<()> {
        self.writer.lock().file.sync_all()?;
        Ok(())
    }

    pub fn current_index(&self) -> u64 {
        self.writer.lock().index
    }

    fn append(&self, tag: u8, payload: &Value) -> Result<()> {
        let bytes = stream::to_buffer(payload);
        let mut writer = self.writer.lock();

        writer.file.write_all(&[tag])?;
        writer.file.write_all(&(bytes.len() as u32).to_le_bytes())?;
        writer.file.write_all(&bytes)?;
        writer.written += 5 + bytes.len() as u64;

        if writer.written > self.rotation_bytes {
            self.rotate(&mut writer)?;
        }
        Ok(())
    }

    fn rotate(&self, writer: &mut LogWriter) -> Result<()> {
        writer.file.sync_all()?;
        let index = writer.index + 1;
        let path = wal_file_path(&self.wal_dir, index);
        writer.file = OpenOptions::new().create(true).append(true).open(&path)?;
        writer.index = index;
        writer.written = 0;
        Ok(())
    }
}

/// Highest rotation index present in the directory, if any.
fn highest_index(wal_dir: &Path) -> Result<Option<u64>> {
    let mut highest = None;
    for entry in std::fs::read_dir(wal_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) != Some("wal") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            if let Ok(index) = stem.parse::<u64>() {
                highest = Some(highest.map_or(index, |h: u64| h.max(index)));
            }
        }
    }
    Ok(highest)
}
