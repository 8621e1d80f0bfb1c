use quadmap::{AbstractMap, AvlMap, ChainedHashMap, Config, MapKind, ProbingHashMap, RbMap};
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use test_log::test;

const ITEM_COUNT: u64 = 1_000;

fn shuffled_keys() -> Vec<u64> {
    let mut keys: Vec<u64> = (0..ITEM_COUNT).collect();
    keys.shuffle(&mut rand::rng());
    keys
}

#[test]
fn engines_agree_with_btreemap() {
    let keys = shuffled_keys();

    for kind in MapKind::ALL {
        let mut map = Config::new(kind).open::<u64, u64>();
        let mut reference: BTreeMap<u64, u64> = BTreeMap::new();

        for &key in &keys {
            *map.get_or_default(key).unwrap() += key;
            *reference.entry(key).or_insert(0) += key;
        }

        for &key in keys.iter().step_by(3) {
            map.remove(&key);
            reference.remove(&key);
        }

        assert_eq!(reference.len(), map.len(), "{kind:?}");

        let expected: Vec<(u64, u64)> = reference.into_iter().collect();
        assert_eq!(expected, map.entries(), "{kind:?}");
    }
}

#[test]
fn avl_stays_balanced_under_churn() {
    let keys = shuffled_keys();
    let mut map = AvlMap::new();

    for &key in &keys {
        map.add(key, key);
    }
    assert!(map.is_balanced());

    for &key in keys.iter().take(ITEM_COUNT as usize / 2) {
        map.remove(&key);
        assert!(map.is_balanced(), "unbalanced after removing {key}");
    }

    assert_eq!(ITEM_COUNT as usize / 2, map.len());
}

#[test]
fn rbt_keeps_properties_under_churn() {
    let keys = shuffled_keys();
    let mut map = RbMap::new();

    for &key in &keys {
        map.add(key, key);
    }
    assert!(map.check_invariants());

    for &key in keys.iter().take(ITEM_COUNT as usize / 2) {
        map.remove(&key);
        assert!(map.check_invariants(), "broken after removing {key}");
    }

    assert_eq!(ITEM_COUNT as usize / 2, map.len());
}

#[test]
fn chained_buckets_stay_consistent_under_churn() {
    let keys = shuffled_keys();
    let mut map = ChainedHashMap::with_capacity_and_load_factor(7, 1.0);

    for &key in &keys {
        map.add(key, key);
    }
    assert!(map.check_invariants());

    for &key in keys.iter().step_by(2) {
        map.remove(&key);
    }

    assert!(map.check_invariants());
    assert_eq!(ITEM_COUNT as usize / 2, map.len());
}

#[test]
fn probing_probe_sequences_survive_churn() {
    let keys = shuffled_keys();
    let mut map = ProbingHashMap::with_capacity_and_load_factor(ITEM_COUNT as usize * 2, 1.0);

    for &key in &keys {
        map.add(key, key);
    }

    for &key in keys.iter().step_by(2) {
        map.remove(&key);
    }
    assert!(map.check_invariants());

    // re-add over the tombstones
    for &key in keys.iter().step_by(2) {
        map.add(key, key);
    }

    assert!(map.check_invariants());
    assert_eq!(ITEM_COUNT as usize, map.len());
}
