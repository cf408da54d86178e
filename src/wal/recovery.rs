use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::codec::stream;
use crate::codec::value::Value;
use crate::core::error::{Error, ErrorKind, Result};
use crate::wal::log::LogOperation;

/// The live persistence manager transactions replay against. Entities
/// arrive as plain value graphs; implementations apply them with any
/// change listeners suppressed to avoid recursive side effects.
pub trait RecoveryHandler {
    fn apply_save(&mut self, entity: &Value) -> Result<()>;
    fn apply_delete(&mut self, entity: &Value) -> Result<()>;
    fn apply_delete_by_query(&mut self, query: &Value) -> Result<()>;
    fn apply_update_by_query(&mut self, query: &Value) -> Result<()>;
}

/// Replay every log file in the directory in name (hence chronological)
/// order. Returns the number of operations applied.
///
/// Recovery is fail-fast: the first undecodable frame or failed apply
/// aborts the remainder rather than skipping past it, since silently
/// losing history is worse than stopping.
pub fn recover_database(
    wal_dir: &Path,
    predicate: impl Fn(&LogOperation) -> bool,
    handler: &mut dyn RecoveryHandler,
) -> Result<usize> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(wal_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("wal") {
            files.push(path);
        }
    }
    files.sort();

    let mut applied = 0;
    for file in files {
        applied += apply_transaction_log(&file, &predicate, handler)?;
    }
    Ok(applied)
}

/// Stream one log file's frames through the predicate and handler.
/// Operations the predicate rejects are skipped entirely; this is how
/// known-bad operations are excluded during recovery.
pub fn apply_transaction_log(
    path: &Path,
    predicate: impl Fn(&LogOperation) -> bool,
    handler: &mut dyn RecoveryHandler,
) -> Result<usize> {
    let mut file = File::open(path)?;
    let mut applied = 0;
    let mut offset = 0u64;

    loop {
        let mut tag = [0u8; 1];
        match file.read_exact(&mut tag) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }

        let mut len_bytes = [0u8; 4];
        file.read_exact(&mut len_bytes)?;
        let len = u32::from_le_bytes(len_bytes) as usize;

        let mut payload = vec![0u8; len];
        file.read_exact(&mut payload)?;

        let operation = decode_frame(tag[0], &payload).map_err(|cause| {
            Error::recovery(
                &format!("frame at offset {} of {}", offset, path.display()),
                cause,
            )
        })?;
        offset += 5 + len as u64;

        if !predicate(&operation) {
            continue;
        }

        apply_operation(&operation, handler)
            .map_err(|cause| Error::recovery(&operation.describe(), cause))?;
        applied += 1;
    }
    Ok(applied)
}

fn decode_frame(tag: u8, payload: &[u8]) -> Result<LogOperation> {
    let value = stream::from_buffer(payload)?;
    LogOperation::from_parts(tag, value)
}

fn apply_operation(operation: &LogOperation, handler: &mut dyn RecoveryHandler) -> Result<()> {
    match operation {
        LogOperation::Save(entity) => handler.apply_save(entity),
        LogOperation::Delete(entity) => handler.apply_delete(entity),
        LogOperation::DeleteByQuery(query) => handler.apply_delete_by_query(query),
        LogOperation::UpdateByQuery(query) => handler.apply_update_by_query(query),
    }
}
