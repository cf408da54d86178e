//! Skip list ordering, update-in-place, deletion, and range semantics
//! checked against an in-memory reference model.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;

use stratadb::core::error::ErrorKind;
use stratadb::core::types::{KeyKind, MapKey};
use stratadb::skiplist::SkipList;
use stratadb::store::memory_store::MemoryStore;
use stratadb::store::volume::Store;

fn new_list(kind: KeyKind) -> SkipList {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    SkipList::create(store, kind, 4, 1).unwrap()
}

#[test]
fn entries_are_sorted_after_shuffled_inserts() {
    let list = new_list(KeyKind::ULong);
    let mut keys: Vec<u64> = (1..=200).collect();
    keys.shuffle(&mut rand::thread_rng());

    for key in &keys {
        list.insert(&MapKey::ULong(*key), key + 1000).unwrap();
    }

    let mut seen = Vec::new();
    for entry in list.entries().unwrap() {
        let (key, reference) = entry.unwrap();
        let MapKey::ULong(k) = key else { panic!("ulong list") };
        assert_eq!(reference.position, k + 1000);
        seen.push(k);
    }
    assert_eq!(seen, (1..=200).collect::<Vec<u64>>());
    assert_eq!(list.record_count(), 200);
}

#[test]
fn duplicate_insert_updates_in_place() {
    let list = new_list(KeyKind::ULong);
    let key = MapKey::ULong(7);

    let first = list.insert(&key, 100).unwrap();
    assert!(first.is_insert);
    assert_eq!(first.previous_record, 0);

    let second = list.insert(&key, 200).unwrap();
    assert!(!second.is_insert);
    assert_eq!(second.previous_record, 100);
    assert_eq!(second.record_position, 200);

    assert_eq!(list.record_count(), 1);
    assert_eq!(list.search(&key).unwrap().unwrap().record, 200);
}

#[test]
fn delete_unlinks_and_reports_the_record() {
    let list = new_list(KeyKind::ULong);
    for key in [3u64, 1, 4, 1, 5, 9, 2, 6] {
        list.insert(&MapKey::ULong(key), key + 50).unwrap();
    }
    assert_eq!(list.record_count(), 7);

    assert_eq!(list.delete(&MapKey::ULong(4)).unwrap(), Some(54));
    assert_eq!(list.record_count(), 6);
    assert!(list.search(&MapKey::ULong(4)).unwrap().is_none());

    // Deleting an absent key is a no-op.
    assert_eq!(list.delete(&MapKey::ULong(4)).unwrap(), None);
    assert_eq!(list.record_count(), 6);

    let remaining: Vec<u64> = list
        .entries()
        .unwrap()
        .map(|e| match e.unwrap().0 {
            MapKey::ULong(k) => k,
            _ => panic!("ulong list"),
        })
        .collect();
    assert_eq!(remaining, vec![1, 2, 3, 5, 6, 9]);
}

#[test]
fn ranges_match_a_reference_model() {
    let list = new_list(KeyKind::ULong);
    let mut model = BTreeMap::new();
    let mut rng = rand::thread_rng();

    for _ in 0..300 {
        let key: u64 = rng.gen_range(1..1000);
        let record = key + 10_000;
        list.insert(&MapKey::ULong(key), record).unwrap();
        model.insert(key, record);
    }
    // A few deletions keep tombstoned nodes in the walk.
    for _ in 0..30 {
        let key: u64 = rng.gen_range(1..1000);
        assert_eq!(list.delete(&MapKey::ULong(key)).unwrap(), model.remove(&key));
    }

    for _ in 0..20 {
        let pivot: u64 = rng.gen_range(1..1000);
        for inclusive in [true, false] {
            let above: Vec<u64> = list
                .above(&MapKey::ULong(pivot), inclusive)
                .unwrap()
                .iter()
                .map(|r| r.position)
                .collect();
            let expected: Vec<u64> = model
                .range(pivot..)
                .filter(|(k, _)| inclusive || **k != pivot)
                .map(|(_, v)| *v)
                .collect();
            assert_eq!(above, expected);

            let below: Vec<u64> = list
                .below(&MapKey::ULong(pivot), inclusive)
                .unwrap()
                .iter()
                .map(|r| r.position)
                .collect();
            let expected: Vec<u64> = model
                .range(..=pivot)
                .filter(|(k, _)| inclusive || **k != pivot)
                .map(|(_, v)| *v)
                .collect();
            assert_eq!(below, expected);
        }

        let lo: u64 = rng.gen_range(1..500);
        let hi: u64 = rng.gen_range(500..1000);
        let between: Vec<u64> = list
            .between(&MapKey::ULong(lo), &MapKey::ULong(hi), true, false)
            .unwrap()
            .iter()
            .map(|r| r.position)
            .collect();
        let expected: Vec<u64> = model.range(lo..hi).map(|(_, v)| *v).collect();
        assert_eq!(between, expected);
    }
}

#[test]
fn long_keys_order_signed_values() {
    let list = new_list(KeyKind::Long);
    for key in [5i64, -3, 0, i64::MIN, 17, -1, i64::MAX] {
        list.insert(&MapKey::Long(key), 1).unwrap();
    }

    let keys: Vec<i64> = list
        .entries()
        .unwrap()
        .map(|e| match e.unwrap().0 {
            MapKey::Long(k) => k,
            _ => panic!("long list"),
        })
        .collect();
    assert_eq!(keys, vec![i64::MIN, -3, -1, 0, 5, 17, i64::MAX]);
}

#[test]
fn text_keys_order_lexicographically() {
    let list = new_list(KeyKind::Text);
    for key in ["pear", "apple", "fig", "banana", "apricot"] {
        list.insert(&MapKey::from(key), 1).unwrap();
    }

    let keys: Vec<String> = list
        .entries()
        .unwrap()
        .map(|e| match e.unwrap().0 {
            MapKey::Text(k) => k,
            _ => panic!("text list"),
        })
        .collect();
    assert_eq!(keys, vec!["apple", "apricot", "banana", "fig", "pear"]);

    assert!(list.search(&MapKey::from("fig")).unwrap().is_some());
    assert!(list.search(&MapKey::from("figment")).unwrap().is_none());
}

#[test]
fn mismatched_key_kind_is_rejected() {
    let list = new_list(KeyKind::ULong);
    let err = list.insert(&MapKey::from("text"), 1).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);
}
