use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind, Result};

/// Key type a map is declared with. Persisted in the factory registry so
/// a reopened map interprets its node key fields the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyKind {
    ULong,
    Long,
    Text,
}

impl KeyKind {
    pub fn as_byte(&self) -> u8 {
        match self {
            KeyKind::ULong => 0,
            KeyKind::Long => 1,
            KeyKind::Text => 2,
        }
    }

    pub fn from_byte(b: u8) -> Result<KeyKind> {
        match b {
            0 => Ok(KeyKind::ULong),
            1 => Ok(KeyKind::Long),
            2 => Ok(KeyKind::Text),
            other => Err(Error::new(
                ErrorKind::Corrupt,
                format!("unknown key kind byte {}", other),
            )),
        }
    }
}

/// A map key. Scalar keys live inline in the node's 8-byte key field;
/// text keys are stored externally and the field holds their position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MapKey {
    ULong(u64),
    Long(i64),
    Text(String),
}

impl MapKey {
    pub fn kind(&self) -> KeyKind {
        match self {
            MapKey::ULong(_) => KeyKind::ULong,
            MapKey::Long(_) => KeyKind::Long,
            MapKey::Text(_) => KeyKind::Text,
        }
    }

    /// Inline raw encoding for scalar keys. Long keys flip the sign bit so
    /// unsigned comparison of the raw field preserves signed key order.
    pub fn inline_raw(&self) -> Option<u64> {
        match self {
            MapKey::ULong(v) => Some(*v),
            MapKey::Long(v) => Some((*v as u64) ^ (1u64 << 63)),
            MapKey::Text(_) => None,
        }
    }

    pub fn from_inline_raw(kind: KeyKind, raw: u64) -> Result<MapKey> {
        match kind {
            KeyKind::ULong => Ok(MapKey::ULong(raw)),
            KeyKind::Long => Ok(MapKey::Long((raw ^ (1u64 << 63)) as i64)),
            KeyKind::Text => Err(Error::new(
                ErrorKind::InvalidState,
                "text keys are not inline".to_string(),
            )),
        }
    }

    /// Canonical byte form used for the trie hash. Must be stable across
    /// restarts since digit paths are persisted.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        match self {
            MapKey::ULong(v) => v.to_le_bytes().to_vec(),
            MapKey::Long(v) => v.to_le_bytes().to_vec(),
            MapKey::Text(s) => s.as_bytes().to_vec(),
        }
    }

    pub fn hash64(&self) -> u64 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.canonical_bytes());
        hasher.finalize() as u64
    }
}

impl From<u64> for MapKey {
    fn from(v: u64) -> Self {
        MapKey::ULong(v)
    }
}

impl From<i64> for MapKey {
    fn from(v: i64) -> Self {
        MapKey::Long(v)
    }
}

impl From<&str> for MapKey {
    fn from(v: &str) -> Self {
        MapKey::Text(v.to_string())
    }
}

impl From<String> for MapKey {
    fn from(v: String) -> Self {
        MapKey::Text(v)
    }
}

/// Outcome of a map insert. Not persisted; callers (secondary indexes)
/// use it to decide between add and replace.
#[derive(Debug, Clone)]
pub struct PutResult {
    pub key: MapKey,
    pub is_insert: bool,
    pub record_position: u64,
    pub previous_record: u64,
}

/// A (partition, record-position) pair identifying one stored value
/// without deserializing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub partition: u32,
    pub position: u64,
}

impl Reference {
    pub fn new(partition: u32, position: u64) -> Self {
        Reference { partition, position }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_inline_encoding_preserves_order() {
        let keys = [i64::MIN, -5, -1, 0, 1, 42, i64::MAX];
        let raws: Vec<u64> = keys
            .iter()
            .map(|k| MapKey::Long(*k).inline_raw().unwrap())
            .collect();
        for pair in raws.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn inline_raw_round_trips() {
        for v in [i64::MIN, -1, 0, 7, i64::MAX] {
            let key = MapKey::Long(v);
            let raw = key.inline_raw().unwrap();
            assert_eq!(MapKey::from_inline_raw(KeyKind::Long, raw).unwrap(), key);
        }
        let key = MapKey::ULong(u64::MAX);
        let raw = key.inline_raw().unwrap();
        assert_eq!(MapKey::from_inline_raw(KeyKind::ULong, raw).unwrap(), key);
    }

    #[test]
    fn text_keys_have_no_inline_form() {
        assert!(MapKey::from("alpha").inline_raw().is_none());
    }
}
