// Copyright (c) 2025-present, quadmap
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::metrics::Metrics;
use crate::prime::next_prime;
use crate::{Error, Result};
use rustc_hash::FxBuildHasher;
use std::fmt::{Display, Write};
use std::hash::{BuildHasher, Hash};

/// Default number of slots requested by [`ProbingHashMap::new`].
const DEFAULT_CAPACITY: usize = 19;

#[derive(Clone)]
enum Slot<K, V> {
    /// Never held an entry since the last rehash; terminates probe walks.
    Empty,
    /// Tombstone of a removed entry; probe walks step over it.
    Deleted,
    /// Live entry.
    Active { key: K, value: V },
}

impl<K, V> Slot<K, V> {
    fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }
}

/// Hash table with double-hashed open addressing (closed hashing).
///
/// The slot count `m` is always a prime greater than 2, so the probe step
/// `h2 = 1 + (h mod (m - 1))` is coprime with `m` and the probe sequence
/// `(h1 + i * h2) mod m` permutes the whole table. Removal leaves a
/// tombstone so later probe walks still pass through the slot.
///
/// `add` overwrites the value of a present key, unlike the tree engines.
/// Every key comparison and collision is counted.
#[derive(Clone)]
pub struct ProbingHashMap<K, V, S: BuildHasher = FxBuildHasher> {
    slots: Vec<Slot<K, V>>,
    len: usize,
    max_load_factor: f32,
    hasher: S,
    metrics: Metrics,
}

impl<K, V> ProbingHashMap<K, V> {
    /// Creates a table with the default capacity and a maximum load factor
    /// of 1.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity_and_load_factor(DEFAULT_CAPACITY, 1.0)
    }

    /// Creates a table with at least `capacity` slots (rounded up to a
    /// prime). A non-positive `max_load_factor` falls back to 1.
    #[must_use]
    pub fn with_capacity_and_load_factor(capacity: usize, max_load_factor: f32) -> Self {
        Self::with_hasher(capacity, max_load_factor, FxBuildHasher)
    }
}

impl<K, V> Default for ProbingHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S: BuildHasher> ProbingHashMap<K, V, S> {
    /// Creates a table with at least `capacity` slots hashing through
    /// `hasher`. A non-positive `max_load_factor` falls back to 1.
    pub fn with_hasher(capacity: usize, max_load_factor: f32, hasher: S) -> Self {
        let slot_count = next_prime(capacity);

        Self {
            slots: (0..slot_count).map(|_| Slot::Empty).collect(),
            len: 0,
            max_load_factor: if max_load_factor <= 0.0 {
                1.0
            } else {
                max_load_factor
            },
            hasher,
            metrics: Metrics::default(),
        }
    }

    /// Number of live entries; tombstones do not count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the table holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots, whatever their state.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.slots.len()
    }

    /// Current ratio of live entries to slots.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn load_factor(&self) -> f32 {
        self.len as f32 / self.slots.len() as f32
    }

    /// Largest load factor [`ProbingHashMap::reserve`] accepts before
    /// growing.
    #[must_use]
    pub fn max_load_factor(&self) -> f32 {
        self.max_load_factor
    }

    /// Number of key comparisons performed since construction or the last
    /// [`ProbingHashMap::clear`].
    #[must_use]
    pub fn comparisons(&self) -> u64 {
        self.metrics.comparisons()
    }

    /// Number of collisions since construction or the last
    /// [`ProbingHashMap::clear`].
    #[must_use]
    pub fn collisions(&self) -> u64 {
        self.metrics.structural()
    }

    #[doc(hidden)]
    #[must_use]
    pub fn tombstones(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Deleted))
            .count()
    }

    /// Resets every slot to empty, keeping the current slot count, and
    /// resets both counters.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::Empty;
        }
        self.len = 0;
        self.metrics.reset();
    }

    /// Slot visited at probe index `i` for a key hashing to `hash`.
    #[allow(clippy::cast_possible_truncation)]
    fn probe(&self, hash: u64, i: u64) -> usize {
        let m = self.slots.len() as u64;
        let h1 = hash % m;
        let h2 = 1 + (hash % (m - 1));
        ((h1 + i * h2) % m) as usize
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> ProbingHashMap<K, V, S> {
    /// Walks `key`'s probe sequence and returns the index of the slot
    /// holding it. The walk ends at the first empty slot or after a full
    /// sweep of the table.
    fn find(&self, key: &K) -> Result<usize> {
        let hash = self.hasher.hash_one(key);

        for i in 0..self.slots.len() as u64 {
            let index = self.probe(hash, i);

            match &self.slots[index] {
                Slot::Active { key: existing, .. } if self.metrics.key_eq(existing, key) => {
                    return Ok(index);
                }
                Slot::Empty => return Err(Error::KeyNotFound),
                _ => {}
            }
        }

        Err(Error::KeyNotFound)
    }

    /// Inserts `(key, value)`, overwriting the value when the key is
    /// already present. Every occupied slot passed on the way counts as a
    /// collision. Returns `false` when the probe sequence yields no free
    /// slot.
    pub fn add(&mut self, key: K, value: V) -> bool {
        if let Ok(index) = self.find(&key) {
            if let Slot::Active { value: current, .. } = &mut self.slots[index] {
                *current = value;
            }
            return true;
        }

        let hash = self.hasher.hash_one(&key);

        for i in 0..self.slots.len() as u64 {
            let index = self.probe(hash, i);

            if self.slots[index].is_active() {
                self.metrics.collision();
            } else {
                self.slots[index] = Slot::Active { key, value };
                self.len += 1;
                return true;
            }
        }

        false
    }

    /// Replaces the value mapped to `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if the key is not present.
    pub fn update(&mut self, key: &K, value: V) -> Result<()> {
        let index = self.find(key)?;

        if let Slot::Active { value: current, .. } = &mut self.slots[index] {
            *current = value;
        }

        Ok(())
    }

    /// Returns `true` iff `key` is present.
    pub fn contains(&self, key: &K) -> bool {
        self.find(key).is_ok()
    }

    /// Returns a reference to the value mapped to `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if the key is not present.
    pub fn get(&self, key: &K) -> Result<&V> {
        let index = self.find(key)?;

        match &self.slots[index] {
            Slot::Active { value, .. } => Ok(value),
            _ => Err(Error::KeyNotFound),
        }
    }

    /// Returns a mutable reference to the value mapped to `key`, inserting a
    /// default value first when the key is absent. A full table is rehashed
    /// to twice its size and the insertion retried.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SlotsExhausted`] when the retried insertion still
    /// finds no free slot.
    pub fn get_or_default(&mut self, key: K) -> Result<&mut V>
    where
        K: Clone,
        V: Default,
    {
        if self.find(&key).is_err() && !self.add(key.clone(), V::default()) {
            self.rehash(2 * self.slots.len());
            if !self.add(key.clone(), V::default()) {
                return Err(Error::SlotsExhausted);
            }
        }

        let index = self.find(&key)?;

        match &mut self.slots[index] {
            Slot::Active { value, .. } => Ok(value),
            _ => Err(Error::KeyNotFound),
        }
    }

    /// Turns the entry for `key` into a tombstone. Returns whether a
    /// removal happened.
    pub fn remove(&mut self, key: &K) -> bool {
        match self.find(key) {
            Ok(index) => {
                self.slots[index] = Slot::Deleted;
                self.len -= 1;
                true
            }
            Err(_) => false,
        }
    }

    /// Resizes the table to the next prime `>= m` and re-inserts every live
    /// entry; tombstones are dropped on the way. A target not above the
    /// current slot count is a no-op.
    pub fn rehash(&mut self, m: usize) {
        let slot_count = next_prime(m);
        if slot_count <= self.slots.len() {
            return;
        }

        log::debug!(
            "rehashing open-addressing table: {} -> {slot_count} slots ({} entries, {} tombstones dropped)",
            self.slots.len(),
            self.len,
            self.tombstones(),
        );

        let old = std::mem::replace(
            &mut self.slots,
            (0..slot_count).map(|_| Slot::Empty).collect(),
        );
        self.len = 0;

        for slot in old {
            if let Slot::Active { key, value } = slot {
                self.add(key, value);
            }
        }
    }

    /// Grows the table so it can hold at least `n` entries without exceeding
    /// the maximum load factor; smaller `n` are a no-op.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn reserve(&mut self, n: usize) {
        if n as f32 > self.slots.len() as f32 * self.max_load_factor {
            self.rehash((n as f32 / self.max_load_factor).ceil() as usize);
        }
    }

    /// Changes the maximum load factor, growing the table right away if the
    /// current occupancy no longer fits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLoadFactor`] for non-positive values.
    pub fn set_max_load_factor(&mut self, max_load_factor: f32) -> Result<()> {
        if max_load_factor <= 0.0 {
            return Err(Error::InvalidLoadFactor(max_load_factor));
        }

        self.max_load_factor = max_load_factor;
        self.reserve(self.len);

        Ok(())
    }

    /// Checks that every live key can be found again before its probe walk
    /// reaches an empty slot.
    #[doc(hidden)]
    #[must_use]
    pub fn check_invariants(&self) -> bool {
        self.slots.iter().all(|slot| match slot {
            Slot::Active { key, .. } => self.find(key).is_ok(),
            _ => true,
        })
    }

    #[doc(hidden)]
    pub fn entries(&self) -> Vec<(K, V)>
    where
        K: Ord + Clone,
        V: Clone,
    {
        let mut out: Vec<(K, V)> = self
            .slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Active { key, value } => Some((key.clone(), value.clone())),
                _ => None,
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

impl<K: Hash + Eq + Ord + Display, V: Display, S: BuildHasher> ProbingHashMap<K, V, S> {
    /// Writes every live entry as a `(key, value)` line, key-ascending.
    ///
    /// # Errors
    ///
    /// Forwards errors of the sink.
    pub fn show<W: Write>(&self, out: &mut W) -> std::fmt::Result {
        let mut entries: Vec<(&K, &V)> = self
            .slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Active { key, value } => Some((key, value)),
                _ => None,
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        for (key, value) in entries {
            writeln!(out, "({key}, {value})")?;
        }

        Ok(())
    }
}

impl<K, V, S> crate::AbstractMap for ProbingHashMap<K, V, S>
where
    K: Hash + Eq + Ord + Clone + Display,
    V: Default + Display,
    S: BuildHasher,
{
    type Key = K;
    type Value = V;

    fn add(&mut self, key: K, value: V) {
        Self::add(self, key, value);
    }

    fn update(&mut self, key: &K, value: V) -> Result<()> {
        Self::update(self, key, value)
    }

    fn get(&self, key: &K) -> Result<&V> {
        Self::get(self, key)
    }

    fn get_or_default(&mut self, key: K) -> Result<&mut V> {
        Self::get_or_default(self, key)
    }

    fn contains(&self, key: &K) -> bool {
        Self::contains(self, key)
    }

    fn remove(&mut self, key: &K) {
        Self::remove(self, key);
    }

    fn len(&self) -> usize {
        Self::len(self)
    }

    fn clear(&mut self) {
        Self::clear(self);
    }

    fn comparisons(&self) -> u64 {
        Self::comparisons(self)
    }

    fn maintenance(&self) -> crate::Maintenance {
        crate::Maintenance::Collisions(self.collisions())
    }

    fn show(&self, mut out: &mut dyn Write) -> std::fmt::Result {
        Self::show(self, &mut out)
    }

    fn entries(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        Self::entries(self)
    }
}

#[cfg(test)]
mod tests {
    use super::ProbingHashMap;
    use crate::Error;
    use std::hash::{BuildHasher, Hasher};
    use test_log::test;

    /// Hashes a `u64` key to itself, making probe sequences predictable.
    #[derive(Clone, Default)]
    struct IdentityBuild;

    #[derive(Default)]
    struct IdentityHasher(u64);

    impl Hasher for IdentityHasher {
        fn finish(&self) -> u64 {
            self.0
        }

        fn write(&mut self, _bytes: &[u8]) {}

        fn write_u64(&mut self, n: u64) {
            self.0 = n;
        }
    }

    impl BuildHasher for IdentityBuild {
        type Hasher = IdentityHasher;

        fn build_hasher(&self) -> IdentityHasher {
            IdentityHasher::default()
        }
    }

    fn identity_map(capacity: usize) -> ProbingHashMap<u64, u64, IdentityBuild> {
        ProbingHashMap::with_hasher(capacity, 1.0, IdentityBuild)
    }

    #[test]
    fn probing_add_overwrites_existing_key() {
        let mut map = ProbingHashMap::new();

        assert!(map.add("cat".to_string(), 1));
        assert!(map.add("cat".to_string(), 2));

        assert_eq!(&2, map.get(&"cat".to_string()).unwrap());
        assert_eq!(1, map.len());
    }

    #[test]
    fn probing_double_hash_resolves_collisions() {
        // all three keys start probing at slot 0 of the 7-slot table
        let mut map = identity_map(7);

        assert!(map.add(0, 100)); // h1 = 0, lands in slot 0
        assert!(map.add(7, 700)); // h1 = 0, h2 = 2, lands in slot 2
        assert!(map.add(14, 1400)); // h1 = 0, h2 = 3, lands in slot 3

        assert_eq!(3, map.len());
        assert!(map.collisions() > 0);
        assert_eq!(&700, map.get(&7).unwrap());
        assert!(map.check_invariants());
    }

    #[test]
    fn probing_lookup_steps_over_tombstone() {
        let mut map = identity_map(7);

        for key in [0, 7, 1, 8, 2, 9] {
            assert!(map.add(key, key * 10));
        }
        assert_eq!(6, map.len());

        // 7 probed slot 0 first, so removing 0 leaves a tombstone on 7's
        // probe path
        assert!(map.remove(&0));
        assert_eq!(&70, map.get(&7).unwrap());

        // a 7th key probing across the tombstone is still found afterwards
        assert!(map.add(14, 140));
        assert_eq!(&140, map.get(&14).unwrap());
        assert_eq!(6, map.len());
        assert!(map.check_invariants());
    }

    #[test]
    fn probing_full_table_add_fails() {
        let mut map = identity_map(3);

        for key in 0..3 {
            assert!(map.add(key, key));
        }
        assert!(!map.add(100, 100));
        assert_eq!(3, map.len());
    }

    #[test]
    fn probing_get_or_default_grows_full_table() {
        let mut map = identity_map(3);

        for key in 0..3 {
            assert!(map.add(key, key));
        }

        *map.get_or_default(100).unwrap() += 1;

        assert!(map.bucket_count() > 3);
        assert_eq!(&1, map.get(&100).unwrap());
        assert_eq!(4, map.len());
    }

    #[test]
    fn probing_rehash_purges_tombstones() {
        let mut map = identity_map(7);

        for key in 0..6 {
            map.add(key, key);
        }
        for key in 0..3 {
            map.remove(&key);
        }
        assert_eq!(3, map.tombstones());

        let before = map.entries();
        map.rehash(17);

        assert_eq!(0, map.tombstones());
        assert_eq!(17, map.bucket_count());
        assert_eq!(before, map.entries());
        assert!(map.check_invariants());
    }

    #[test]
    fn probing_update() {
        let mut map = ProbingHashMap::new();
        map.add(1, 1);

        map.update(&1, 10).unwrap();
        assert_eq!(&10, map.get(&1).unwrap());

        assert!(matches!(map.update(&2, 20), Err(Error::KeyNotFound)));
    }

    #[test]
    fn probing_remove_is_idempotent() {
        let mut map = ProbingHashMap::new();
        map.add(1, 1);

        assert!(map.remove(&1));
        assert!(!map.remove(&1));
        assert!(!map.contains(&1));
        assert!(map.is_empty());
    }

    #[test]
    fn probing_set_max_load_factor() {
        let mut map = ProbingHashMap::new();
        for key in 0..19 {
            map.add(key, key);
        }

        assert!(matches!(
            map.set_max_load_factor(-1.0),
            Err(Error::InvalidLoadFactor(_))
        ));

        map.set_max_load_factor(0.5).unwrap();
        assert!(map.load_factor() <= 0.5);
    }

    #[test]
    fn probing_clone_is_independent() {
        let mut map = ProbingHashMap::new();
        map.add(1, 1);

        let mut copy = map.clone();
        copy.add(2, 2);
        copy.update(&1, 100).unwrap();

        assert_eq!(1, map.len());
        assert_eq!(&1, map.get(&1).unwrap());
        assert_eq!(2, copy.len());
    }

    #[test]
    fn probing_clear_resets_counters() {
        let mut map = identity_map(7);
        for key in [0, 7, 14] {
            map.add(key, key);
        }
        assert!(map.collisions() > 0);

        map.clear();

        assert!(map.is_empty());
        assert_eq!(7, map.bucket_count());
        assert_eq!(0, map.comparisons());
        assert_eq!(0, map.collisions());
    }

    #[test]
    fn probing_show_sorts_by_key() {
        let mut map = ProbingHashMap::new();
        for key in [3, 1, 2] {
            map.add(key, key * 10);
        }

        let mut out = String::new();
        map.show(&mut out).unwrap();

        assert_eq!("(1, 10)\n(2, 20)\n(3, 30)\n", out);
    }
}
