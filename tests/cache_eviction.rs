//! Instance cache eviction: idle windows, capacity overflow, and the
//! flush-on-evict guarantee that makes eviction invisible to readers.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::sleep;
use std::time::Duration;

use tempfile::tempdir;

use stratadb::codec::Value;
use stratadb::core::config::StoreKind;
use stratadb::core::types::{KeyKind, MapKey};
use stratadb::map::{MapFactory, MapInstanceCache};
use stratadb::memory::BufferPool;
use stratadb::store::open_store;

fn open_factory(path: &Path) -> Arc<MapFactory> {
    let store = open_store(StoreKind::File, path).unwrap();
    let pool = Arc::new(BufferPool::new(1024 * 1024));
    Arc::new(MapFactory::new(store, pool).unwrap())
}

#[test]
fn idle_entries_are_evicted_on_next_access() {
    let dir = tempdir().unwrap();
    let cache = MapInstanceCache::new(10, Duration::from_millis(50));

    let factory = open_factory(&dir.path().join("idle.db"));
    cache.put("idle".to_string(), factory).unwrap();
    assert_eq!(cache.len(), 1);

    sleep(Duration::from_millis(80));

    // The triggering access runs eviction synchronously.
    assert!(cache.get("idle").unwrap().is_none());
    assert!(cache.is_empty());
}

#[test]
fn eviction_is_invisible_after_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("durable.db");
    let cache = MapInstanceCache::new(10, Duration::from_millis(50));

    {
        let factory = open_factory(&path);
        let map = factory.get_map("items", 2, KeyKind::ULong).unwrap();
        map.put(MapKey::ULong(1), &Value::String("kept".to_string()))
            .unwrap();
        cache.put("durable".to_string(), factory).unwrap();
    }

    sleep(Duration::from_millis(80));
    assert!(cache.get("durable").unwrap().is_none());

    // Eviction flushed the volume, so a fresh factory sees the write.
    let factory = open_factory(&path);
    let map = factory.get_map("items", 2, KeyKind::ULong).unwrap();
    assert_eq!(
        map.get(&MapKey::ULong(1)).unwrap(),
        Some(Value::String("kept".to_string()))
    );
}

#[test]
fn capacity_overflow_evicts_the_least_recent() {
    let dir = tempdir().unwrap();
    let cache = MapInstanceCache::new(2, Duration::from_secs(60));

    for name in ["a", "b", "c"] {
        let factory = open_factory(&dir.path().join(format!("{}.db", name)));
        cache.put(name.to_string(), factory).unwrap();
    }

    assert_eq!(cache.len(), 2);
    assert!(cache.get("a").unwrap().is_none());
    assert!(cache.get("b").unwrap().is_some());
    assert!(cache.get("c").unwrap().is_some());
}

#[test]
fn recent_access_refreshes_eviction_order() {
    let dir = tempdir().unwrap();
    let cache = MapInstanceCache::new(2, Duration::from_secs(60));

    for name in ["a", "b"] {
        let factory = open_factory(&dir.path().join(format!("{}.db", name)));
        cache.put(name.to_string(), factory).unwrap();
    }
    // Touch "a" so "b" becomes the eviction candidate.
    assert!(cache.get("a").unwrap().is_some());

    let factory = open_factory(&dir.path().join("c.db"));
    cache.put("c".to_string(), factory).unwrap();

    assert!(cache.get("a").unwrap().is_some());
    assert!(cache.get("b").unwrap().is_none());
    assert!(cache.get("c").unwrap().is_some());
}

#[test]
fn remove_flushes_and_drops_the_entry() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("removed.db");
    let cache = MapInstanceCache::new(10, Duration::from_secs(60));

    {
        let factory = open_factory(&path);
        let map = factory.get_map("items", 2, KeyKind::ULong).unwrap();
        map.put(MapKey::ULong(9), &Value::Bool(true)).unwrap();
        cache.put("removed".to_string(), factory).unwrap();
    }

    cache.remove("removed").unwrap();
    assert!(cache.is_empty());

    let factory = open_factory(&path);
    let map = factory.get_map("items", 2, KeyKind::ULong).unwrap();
    assert_eq!(map.get(&MapKey::ULong(9)).unwrap(), Some(Value::Bool(true)));
}

#[test]
fn hit_and_miss_counters_track_accesses() {
    let dir = tempdir().unwrap();
    let cache = MapInstanceCache::new(10, Duration::from_secs(60));

    assert!(cache.get("nope").unwrap().is_none());
    let factory = open_factory(&dir.path().join("counted.db"));
    cache.put("counted".to_string(), factory).unwrap();
    assert!(cache.get("counted").unwrap().is_some());
    assert!(cache.get("counted").unwrap().is_some());

    assert_eq!(cache.hit_count.load(Ordering::Relaxed), 2);
    assert_eq!(cache.miss_count.load(Ordering::Relaxed), 1);
}
