use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::codec::value::{Streamable, Value};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{KeyKind, MapKey};
use crate::map::disk_map::DiskMap;
use crate::map::factory::MapFactory;

const SEQUENCE_KEY: &str = "sequence";

/// How an entity's identifier field is populated on save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierStrategy {
    /// Caller populates the identifier; a zero/empty one is rejected.
    Direct,
    /// Zero identifiers draw from a persisted counter; supplied ones
    /// above the counter advance it so skipped ids are never reused.
    Sequence,
    /// Empty string identifiers get a fresh v4 UUID.
    Uuid,
}

/// CRUD binding of a typed entity to a named map keyed by its
/// identifier field.
pub struct RecordInteractor<T: Streamable> {
    map: Arc<DiskMap>,
    metadata: Arc<DiskMap>,
    strategy: IdentifierStrategy,
    id_field: String,
    sequence_lock: Mutex<()>,
    _entity: PhantomData<T>,
}

impl<T: Streamable> RecordInteractor<T> {
    pub fn new(
        factory: &MapFactory,
        entity_name: &str,
        id_field: &str,
        strategy: IdentifierStrategy,
        load_factor: u8,
    ) -> Result<RecordInteractor<T>> {
        let key_kind = match strategy {
            IdentifierStrategy::Sequence => KeyKind::ULong,
            IdentifierStrategy::Uuid => KeyKind::Text,
            IdentifierStrategy::Direct => KeyKind::ULong,
        };
        let map = factory.get_map(entity_name, load_factor, key_kind)?;
        // Counters and other per-entity bookkeeping live beside the data
        // so they survive restarts.
        let metadata = factory.get_map(
            &format!("{}$metadata", entity_name),
            1,
            KeyKind::Text,
        )?;
        Ok(RecordInteractor {
            map,
            metadata,
            strategy,
            id_field: id_field.to_string(),
            sequence_lock: Mutex::new(()),
            _entity: PhantomData,
        })
    }

    /// Persist the entity, assigning its identifier per the strategy.
    /// Returns the previous record position (0 for a fresh insert) and
    /// the identifier, so callers detect update-vs-insert without a
    /// second lookup.
    pub fn save(&self, entity: &mut T) -> Result<(u64, MapKey)> {
        let mut record = entity.to_record()?;
        let supplied = record.field(&self.id_field).cloned().unwrap_or(Value::Null);

        let key = match self.strategy {
            IdentifierStrategy::Direct => self.direct_identifier(&supplied)?,
            IdentifierStrategy::Sequence => self.sequence_identifier(&supplied)?,
            IdentifierStrategy::Uuid => self.uuid_identifier(&supplied)?,
        };

        record.set_field(&self.id_field, key_to_value(&key))?;
        *entity = T::from_record(&record)?;

        let result = self.map.put(key.clone(), &record)?;
        Ok((result.previous_record, key))
    }

    pub fn find(&self, key: &MapKey) -> Result<Option<T>> {
        match self.map.get(key)? {
            Some(record) => Ok(Some(T::from_record(&record)?)),
            None => Ok(None),
        }
    }

    pub fn delete(&self, key: &MapKey) -> Result<bool> {
        Ok(self.map.remove(key)?.is_some())
    }

    pub fn count(&self) -> u64 {
        self.map.long_size()
    }

    pub fn map(&self) -> &Arc<DiskMap> {
        &self.map
    }

    fn direct_identifier(&self, supplied: &Value) -> Result<MapKey> {
        match identifier_as_u64(supplied) {
            Some(id) if id != 0 => Ok(MapKey::ULong(id)),
            _ => Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("direct identifier field {} must be populated", self.id_field),
            )),
        }
    }

    fn sequence_identifier(&self, supplied: &Value) -> Result<MapKey> {
        let _guard = self.sequence_lock.lock();
        let counter_key = MapKey::from(SEQUENCE_KEY);
        let counter = match self.metadata.get(&counter_key)? {
            Some(value) => value.as_ulong()?,
            None => 0,
        };

        let supplied = identifier_as_u64(supplied).unwrap_or(0);
        let assigned = if supplied == 0 { counter + 1 } else { supplied };

        if assigned > counter {
            self.metadata
                .put(counter_key, &Value::ULong(assigned))?;
        }
        Ok(MapKey::ULong(assigned))
    }

    fn uuid_identifier(&self, supplied: &Value) -> Result<MapKey> {
        match supplied {
            Value::String(s) if !s.is_empty() => Ok(MapKey::Text(s.clone())),
            Value::Null | Value::String(_) => {
                Ok(MapKey::Text(Uuid::new_v4().to_string()))
            }
            other => Err(Error::new(
                ErrorKind::InvalidArgument,
                format!(
                    "uuid identifier field {} must be a string, found {:?}",
                    self.id_field,
                    other.tag()
                ),
            )),
        }
    }
}

fn identifier_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::ULong(v) => Some(*v),
        Value::Long(v) if *v >= 0 => Some(*v as u64),
        Value::Int(v) if *v >= 0 => Some(*v as u64),
        _ => None,
    }
}

fn key_to_value(key: &MapKey) -> Value {
    match key {
        MapKey::ULong(v) => Value::ULong(*v),
        MapKey::Long(v) => Value::Long(*v),
        MapKey::Text(s) => Value::String(s.clone()),
    }
}
