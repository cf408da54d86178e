//! DiskMap behavior through the factory: flat and trie shapes, record-id
//! access, attribute projection, and reopening volumes from disk.

use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;

use stratadb::codec::Value;
use stratadb::core::config::StoreKind;
use stratadb::core::error::ErrorKind;
use stratadb::core::types::{KeyKind, MapKey};
use stratadb::map::MapFactory;
use stratadb::memory::BufferPool;
use stratadb::store::{DatabaseLayout, open_store};

fn open_factory(path: &Path) -> MapFactory {
    let store = open_store(StoreKind::File, path).unwrap();
    let pool = Arc::new(BufferPool::new(4 * 1024 * 1024));
    MapFactory::new(store, pool).unwrap()
}

fn entity(id: u64, name: &str) -> Value {
    Value::Object(vec![
        ("id".to_string(), Value::ULong(id)),
        ("name".to_string(), Value::String(name.to_string())),
        ("score".to_string(), Value::Double(id as f64 / 2.0)),
    ])
}

#[test]
fn flat_map_put_get_remove() {
    let dir = tempdir().unwrap();
    let factory = open_factory(&dir.path().join("flat.db"));
    let map = factory.get_map("users", 2, KeyKind::ULong).unwrap();

    for id in 1..=20u64 {
        map.put(MapKey::ULong(id), &entity(id, "user")).unwrap();
    }
    assert_eq!(map.long_size(), 20);

    let stored = map.get(&MapKey::ULong(7)).unwrap().unwrap();
    assert_eq!(stored.field("id").unwrap().as_ulong().unwrap(), 7);

    let removed = map.remove(&MapKey::ULong(7)).unwrap().unwrap();
    assert_eq!(removed.field("id").unwrap().as_ulong().unwrap(), 7);
    assert!(map.get(&MapKey::ULong(7)).unwrap().is_none());
    assert_eq!(map.long_size(), 19);
}

#[test]
fn trie_map_holds_every_key() {
    let dir = tempdir().unwrap();
    let factory = open_factory(&dir.path().join("trie.db"));
    let map = factory.get_map("events", 6, KeyKind::ULong).unwrap();

    for id in 1..=500u64 {
        map.put(MapKey::ULong(id), &entity(id, "event")).unwrap();
    }
    assert_eq!(map.long_size(), 500);

    for id in 1..=500u64 {
        let stored = map.get(&MapKey::ULong(id)).unwrap().unwrap();
        assert_eq!(stored.field("id").unwrap().as_ulong().unwrap(), id);
    }

    // Full enumeration covers every shard exactly once.
    let mut count = 0;
    for entry in map.entries().unwrap() {
        entry.unwrap();
        count += 1;
    }
    assert_eq!(count, 500);
}

#[test]
fn record_id_access_skips_the_key_lookup() {
    let dir = tempdir().unwrap();
    let factory = open_factory(&dir.path().join("records.db"));
    let map = factory.get_map("docs", 3, KeyKind::ULong).unwrap();

    let result = map.put(MapKey::ULong(42), &entity(42, "direct")).unwrap();
    assert!(result.is_insert);

    let by_id = map.get_with_record_id(result.record_position).unwrap();
    assert_eq!(by_id.field("name").unwrap().as_str().unwrap(), "direct");

    let name = map
        .get_attribute_with_record_id("name", result.record_position)
        .unwrap();
    assert_eq!(name.as_str().unwrap(), "direct");

    let err = map
        .get_attribute_with_record_id("absent", result.record_position)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[test]
fn updates_keep_the_previous_record_readable() {
    let dir = tempdir().unwrap();
    let factory = open_factory(&dir.path().join("versions.db"));
    let map = factory.get_map("docs", 2, KeyKind::ULong).unwrap();

    let first = map.put(MapKey::ULong(1), &entity(1, "old")).unwrap();
    let second = map.put(MapKey::ULong(1), &entity(1, "new")).unwrap();
    assert!(!second.is_insert);
    assert_eq!(second.previous_record, first.record_position);

    // Old record bytes stay addressable until the space is reclaimed.
    let old = map.get_with_record_id(second.previous_record).unwrap();
    assert_eq!(old.field("name").unwrap().as_str().unwrap(), "old");
    assert_eq!(map.long_size(), 1);
}

#[test]
fn compute_if_present_applies_atomically() {
    let dir = tempdir().unwrap();
    let factory = open_factory(&dir.path().join("compute.db"));
    let map = factory.get_map("counters", 2, KeyKind::Text).unwrap();

    assert!(
        map.compute_if_present(&MapKey::from("missing"), |v| v)
            .unwrap()
            .is_none()
    );

    map.put(MapKey::from("hits"), &Value::ULong(1)).unwrap();
    let updated = map
        .compute_if_present(&MapKey::from("hits"), |v| match v {
            Value::ULong(n) => Value::ULong(n + 1),
            other => other,
        })
        .unwrap()
        .unwrap();
    assert_eq!(updated, Value::ULong(2));
    assert_eq!(map.get(&MapKey::from("hits")).unwrap(), Some(Value::ULong(2)));
}

#[test]
fn ranges_resolve_through_references() {
    let dir = tempdir().unwrap();
    let factory = open_factory(&dir.path().join("ranges.db"));
    let map = factory.get_map("scores", 2, KeyKind::ULong).unwrap();

    for id in 1..=10u64 {
        map.put(MapKey::ULong(id), &entity(id, "s")).unwrap();
    }

    let refs = map.between(&MapKey::ULong(3), &MapKey::ULong(7), true, true).unwrap();
    let mut ids: Vec<u64> = refs
        .iter()
        .map(|r| {
            map.get_with_record_id(r.position)
                .unwrap()
                .field("id")
                .unwrap()
                .as_ulong()
                .unwrap()
        })
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![3, 4, 5, 6, 7]);

    assert_eq!(map.above(&MapKey::ULong(8), false).unwrap().len(), 2);
    assert_eq!(map.below(&MapKey::ULong(3), true).unwrap().len(), 3);
}

#[test]
fn maps_reopen_with_their_recorded_shape() {
    let dir = tempdir().unwrap();
    let layout = DatabaseLayout::new(dir.path().to_path_buf()).unwrap();
    let path = layout.store_path("reopen");

    {
        let factory = open_factory(&path);
        let flat = factory.get_map("flat", 2, KeyKind::ULong).unwrap();
        let trie = factory.get_map("trie", 6, KeyKind::Text).unwrap();
        flat.put(MapKey::ULong(11), &entity(11, "flat")).unwrap();
        trie.put(MapKey::from("k1"), &entity(1, "trie")).unwrap();
        factory.commit().unwrap();
    }

    let factory = open_factory(&path);
    // Requested shape is ignored for known names; the registry wins.
    let flat = factory.get_map("flat", 9, KeyKind::Text).unwrap();
    assert_eq!(flat.load_factor(), 2);
    assert_eq!(flat.key_kind(), KeyKind::ULong);
    let stored = flat.get(&MapKey::ULong(11)).unwrap().unwrap();
    assert_eq!(stored.field("name").unwrap().as_str().unwrap(), "flat");

    let trie = factory.get_map("trie", 2, KeyKind::ULong).unwrap();
    assert_eq!(trie.load_factor(), 6);
    assert!(trie.get(&MapKey::from("k1")).unwrap().is_some());

    // Distinct maps get distinct partitions.
    assert_ne!(flat.partition(), trie.partition());
}

#[test]
fn stateless_instances_read_the_same_data() {
    let dir = tempdir().unwrap();
    let factory = open_factory(&dir.path().join("stateless.db"));
    let map = factory.get_map("shared", 2, KeyKind::ULong).unwrap();
    map.put(MapKey::ULong(5), &entity(5, "shared")).unwrap();

    let stateless = factory.new_stateless_map("shared").unwrap();
    let stored = stateless.get(&MapKey::ULong(5)).unwrap().unwrap();
    assert_eq!(stored.field("name").unwrap().as_str().unwrap(), "shared");

    let err = factory.new_stateless_map("unknown").unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[test]
fn invalid_load_factor_is_rejected() {
    let dir = tempdir().unwrap();
    let factory = open_factory(&dir.path().join("invalid.db"));
    let err = factory.get_map("bad", 0, KeyKind::ULong).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);
    let err = factory.get_map("bad", 11, KeyKind::ULong).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);
}
