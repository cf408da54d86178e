use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;
use tempfile::tempdir;

use stratadb::codec::Value;
use stratadb::core::config::StoreKind;
use stratadb::core::types::{KeyKind, MapKey};
use stratadb::map::{DiskMap, MapFactory};
use stratadb::memory::BufferPool;
use stratadb::store::open_store;

fn create_test_entity(id: u64, payload_size: usize) -> Value {
    Value::Object(vec![
        ("id".to_string(), Value::ULong(id)),
        ("name".to_string(), Value::String(format!("entity-{}", id))),
        ("score".to_string(), Value::Double(id as f64 * 0.5)),
        ("payload".to_string(), Value::Bytes(vec![0xAB; payload_size])),
    ])
}

fn open_map(dir: &tempfile::TempDir, load_factor: u8) -> Arc<DiskMap> {
    let store = open_store(StoreKind::File, dir.path().join("bench.db")).unwrap();
    let pool = Arc::new(BufferPool::new(32 * 1024 * 1024));
    let factory = MapFactory::new(store, pool).unwrap();
    factory.get_map("bench", load_factor, KeyKind::ULong).unwrap()
}

fn benchmark_single_put(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let map = open_map(&dir, 2);

    c.bench_function("flat_map_single_put", |b| {
        let mut id = 0u64;
        b.iter(|| {
            id += 1;
            let entity = create_test_entity(id, 256);
            map.put(black_box(MapKey::ULong(id)), black_box(&entity))
                .unwrap();
        })
    });

    let dir = tempdir().unwrap();
    let map = open_map(&dir, 6);

    c.bench_function("trie_map_single_put", |b| {
        let mut id = 0u64;
        b.iter(|| {
            id += 1;
            let entity = create_test_entity(id, 256);
            map.put(black_box(MapKey::ULong(id)), black_box(&entity))
                .unwrap();
        })
    });
}

fn benchmark_get(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let map = open_map(&dir, 6);
    for id in 1..=10_000u64 {
        map.put(MapKey::ULong(id), &create_test_entity(id, 256))
            .unwrap();
    }

    c.bench_function("trie_map_get", |b| {
        let mut id = 0u64;
        b.iter(|| {
            id = id % 10_000 + 1;
            black_box(map.get(black_box(&MapKey::ULong(id))).unwrap());
        })
    });
}

fn benchmark_batch_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_put");

    for batch_size in [10, 50, 100, 500, 1000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &batch_size,
            |b, &batch_size| {
                b.iter_with_setup(
                    || {
                        let dir = tempdir().unwrap();
                        let map = open_map(&dir, 6);
                        (dir, map)
                    },
                    |(_dir, map)| {
                        for id in 1..=batch_size as u64 {
                            map.put(MapKey::ULong(id), &create_test_entity(id, 256))
                                .unwrap();
                        }
                    },
                )
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_single_put,
    benchmark_get,
    benchmark_batch_put
);
criterion_main!(benches);
