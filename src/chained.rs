// Copyright (c) 2025-present, quadmap
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::metrics::Metrics;
use crate::prime::next_prime;
use crate::{Error, Result};
use rustc_hash::FxBuildHasher;
use std::fmt::{Display, Write};
use std::hash::{BuildHasher, Hash};

/// Default number of buckets requested by [`ChainedHashMap::new`].
const DEFAULT_CAPACITY: usize = 19;

/// Hash table with one collision chain per bucket (open hashing).
///
/// The bucket count is always a prime greater than 2. `add` keeps present
/// keys untouched, mirroring the tree engines; the value of an existing key
/// is changed through [`ChainedHashMap::update`] or
/// [`ChainedHashMap::get_or_default`]. Every key comparison and collision is
/// counted.
#[derive(Clone)]
pub struct ChainedHashMap<K, V, S: BuildHasher = FxBuildHasher> {
    buckets: Vec<Vec<(K, V)>>,
    len: usize,
    max_load_factor: f32,
    hasher: S,
    metrics: Metrics,
}

impl<K, V> ChainedHashMap<K, V> {
    /// Creates a table with the default capacity and a maximum load factor
    /// of 1.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity_and_load_factor(DEFAULT_CAPACITY, 1.0)
    }

    /// Creates a table with at least `capacity` buckets (rounded up to a
    /// prime). A non-positive `max_load_factor` falls back to 1.
    #[must_use]
    pub fn with_capacity_and_load_factor(capacity: usize, max_load_factor: f32) -> Self {
        Self::with_hasher(capacity, max_load_factor, FxBuildHasher)
    }
}

impl<K, V> Default for ChainedHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S: BuildHasher> ChainedHashMap<K, V, S> {
    /// Creates a table with at least `capacity` buckets hashing through
    /// `hasher`. A non-positive `max_load_factor` falls back to 1.
    pub fn with_hasher(capacity: usize, max_load_factor: f32, hasher: S) -> Self {
        let bucket_count = next_prime(capacity);

        Self {
            buckets: (0..bucket_count).map(|_| Vec::new()).collect(),
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

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the table holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of buckets, occupied or not.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of entries chained in bucket `n`; 0 past the bucket count.
    #[must_use]
    pub fn bucket_size(&self, n: usize) -> usize {
        self.buckets.get(n).map_or(0, Vec::len)
    }

    /// Current ratio of entries to buckets.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn load_factor(&self) -> f32 {
        self.len as f32 / self.buckets.len() as f32
    }

    /// Largest load factor the table accepts before growing.
    #[must_use]
    pub fn max_load_factor(&self) -> f32 {
        self.max_load_factor
    }

    /// Number of key comparisons performed since construction or the last
    /// [`ChainedHashMap::clear`].
    #[must_use]
    pub fn comparisons(&self) -> u64 {
        self.metrics.comparisons()
    }

    /// Number of collisions since construction or the last
    /// [`ChainedHashMap::clear`].
    #[must_use]
    pub fn collisions(&self) -> u64 {
        self.metrics.structural()
    }

    /// Empties every bucket, keeping the current bucket count, and resets
    /// both counters.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.len = 0;
        self.metrics.reset();
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> ChainedHashMap<K, V, S> {
    /// Inserts `(key, value)` if the key is absent, growing the table first
    /// when the load factor has reached its maximum. A key that is already
    /// present is left untouched. Returns whether an insertion happened.
    pub fn add(&mut self, key: K, value: V) -> bool {
        if self.load_factor() >= self.max_load_factor {
            self.grow();
        }

        let slot = self.bucket(&key);

        if !self.buckets[slot].is_empty() {
            self.metrics.collision();
        }

        if self.buckets[slot]
            .iter()
            .any(|(existing, _)| self.metrics.key_eq(existing, &key))
        {
            return false;
        }

        self.buckets[slot].push((key, value));
        self.len += 1;
        true
    }

    /// Replaces the value mapped to `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if the key is not present.
    pub fn update(&mut self, key: &K, value: V) -> Result<()> {
        let slot = self.bucket(key);
        let metrics = &self.metrics;

        match self.buckets[slot]
            .iter_mut()
            .find(|(existing, _)| metrics.key_eq(existing, key))
        {
            Some((_, slot_value)) => {
                *slot_value = value;
                Ok(())
            }
            None => Err(Error::KeyNotFound),
        }
    }

    /// Returns `true` iff `key` is present.
    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_ok()
    }

    /// Returns a reference to the value mapped to `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if the key is not present.
    pub fn get(&self, key: &K) -> Result<&V> {
        let slot = self.bucket(key);

        self.buckets[slot]
            .iter()
            .find(|(existing, _)| self.metrics.key_eq(existing, key))
            .map(|(_, value)| value)
            .ok_or(Error::KeyNotFound)
    }

    /// Returns a mutable reference to the value mapped to `key`, inserting a
    /// default value first when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if the freshly inserted key cannot be
    /// found again; this indicates a broken table and cannot happen through
    /// the public API.
    pub fn get_or_default(&mut self, key: K) -> Result<&mut V>
    where
        K: Clone,
        V: Default,
    {
        if !self.contains(&key) {
            self.add(key.clone(), V::default());
        }

        let slot = self.bucket(&key);
        let metrics = &self.metrics;

        self.buckets[slot]
            .iter_mut()
            .find(|(existing, _)| metrics.key_eq(existing, &key))
            .map(|(_, value)| value)
            .ok_or(Error::KeyNotFound)
    }

    /// Removes the entry for `key`. Returns whether a removal happened.
    pub fn remove(&mut self, key: &K) -> bool {
        let slot = self.bucket(key);
        let metrics = &self.metrics;

        let position = self.buckets[slot]
            .iter()
            .position(|(existing, _)| metrics.key_eq(existing, key));

        match position {
            Some(index) => {
                self.buckets[slot].remove(index);
                self.len -= 1;
                true
            }
            None => false,
        }
    }

    /// Bucket index for `key`: `hash(key) mod bucket_count`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn bucket(&self, key: &K) -> usize {
        (self.hasher.hash_one(key) % self.buckets.len() as u64) as usize
    }

    /// Resizes the table to the next prime `>= m` and redistributes every
    /// entry. A target not above the current bucket count is a no-op.
    pub fn rehash(&mut self, m: usize) {
        let bucket_count = next_prime(m);
        if bucket_count <= self.buckets.len() {
            return;
        }

        log::debug!(
            "rehashing chained table: {} -> {bucket_count} buckets ({} entries)",
            self.buckets.len(),
            self.len,
        );

        let old = std::mem::replace(
            &mut self.buckets,
            (0..bucket_count).map(|_| Vec::new()).collect(),
        );
        self.len = 0;

        for bucket in old {
            for (key, value) in bucket {
                self.add(key, value);
            }
        }
    }

    /// Grows the table so it can hold at least `n` entries without exceeding
    /// the maximum load factor; smaller `n` are a no-op.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn reserve(&mut self, n: usize) {
        if n as f32 > self.buckets.len() as f32 * self.max_load_factor {
            self.rehash((n as f32 / self.max_load_factor).ceil() as usize);
        }
    }

    /// Changes the maximum load factor, shrinking the accepted occupancy and
    /// growing the table right away if needed.
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

    /// Doubling growth, clamped from below so that the next table always
    /// fits one more entry under the maximum load factor.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn grow(&mut self) {
        let wanted = usize::max(
            2 * self.buckets.len(),
            ((self.len + 1) as f32 / self.max_load_factor).ceil() as usize,
        );
        self.rehash(wanted);
    }

    /// Checks that every key sits in the bucket its hash selects, appears
    /// only once, and that the entry count matches.
    #[doc(hidden)]
    #[must_use]
    pub fn check_invariants(&self) -> bool {
        let mut counted = 0;

        for (index, bucket) in self.buckets.iter().enumerate() {
            for (position, (key, _)) in bucket.iter().enumerate() {
                if self.bucket(key) != index {
                    return false;
                }
                if bucket
                    .iter()
                    .skip(position + 1)
                    .any(|(other, _)| other == key)
                {
                    return false;
                }
                counted += 1;
            }
        }

        counted == self.len
    }

    #[doc(hidden)]
    pub fn entries(&self) -> Vec<(K, V)>
    where
        K: Ord + Clone,
        V: Clone,
    {
        let mut out: Vec<(K, V)> = self
            .buckets
            .iter()
            .flatten()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

impl<K: Hash + Eq + Ord + Display, V: Display, S: BuildHasher> ChainedHashMap<K, V, S> {
    /// Writes every entry as a `(key, value)` line, key-ascending.
    ///
    /// # Errors
    ///
    /// Forwards errors of the sink.
    pub fn show<W: Write>(&self, out: &mut W) -> std::fmt::Result {
        let mut entries: Vec<(&K, &V)> = self
            .buckets
            .iter()
            .flatten()
            .map(|(key, value)| (key, value))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        for (key, value) in entries {
            writeln!(out, "({key}, {value})")?;
        }

        Ok(())
    }
}

impl<K, V, S> crate::AbstractMap for ChainedHashMap<K, V, S>
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
