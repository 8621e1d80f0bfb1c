// Copyright (c) 2025-present, quadmap
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{AnyMap, AvlMap, ChainedHashMap, ProbingHashMap, RbMap};
use std::fmt::Display;
use std::hash::Hash;

/// Engine family selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKind {
    /// Height-balanced BST
    Avl,

    /// Red-black tree with a sentinel leaf
    RedBlack,

    /// Hash table with per-bucket chains
    ChainedHash,

    /// Hash table with double-hashed open addressing
    OpenAddressing,
}

impl MapKind {
    /// All four engine families, in their canonical order.
    pub const ALL: [Self; 4] = [
        Self::Avl,
        Self::RedBlack,
        Self::ChainedHash,
        Self::OpenAddressing,
    ];
}

/// Map configuration, used to build an [`AnyMap`]
///
/// The capacity and load-factor knobs only matter for the hash engines; the
/// trees ignore them.
///
/// # Examples
///
/// ```
/// use quadmap::{AbstractMap, Config, MapKind};
///
/// let mut map = Config::new(MapKind::ChainedHash)
///     .initial_capacity(101)
///     .open::<String, u64>();
///
/// map.add("word".to_string(), 1);
/// assert_eq!(1, map.len());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Config {
    kind: MapKind,
    initial_capacity: usize,
    max_load_factor: f32,
}

impl Config {
    /// Starts a configuration for the given engine family.
    #[must_use]
    pub fn new(kind: MapKind) -> Self {
        Self {
            kind,
            initial_capacity: 19,
            max_load_factor: 1.0,
        }
    }

    /// Sets the requested slot or bucket count; it is rounded up to a prime
    /// at construction.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Sets the maximum load factor; non-positive values fall back to 1.
    #[must_use]
    pub fn max_load_factor(mut self, max_load_factor: f32) -> Self {
        self.max_load_factor = max_load_factor;
        self
    }

    /// Builds an empty engine of the configured family.
    #[must_use]
    pub fn open<K, V>(self) -> AnyMap<K, V>
    where
        K: Ord + Hash + Clone + Default + Display,
        V: Default + Display,
    {
        match self.kind {
            MapKind::Avl => AnyMap::Avl(AvlMap::new()),
            MapKind::RedBlack => AnyMap::RedBlack(RbMap::new()),
            MapKind::ChainedHash => AnyMap::Chained(ChainedHashMap::with_capacity_and_load_factor(
                self.initial_capacity,
                self.max_load_factor,
            )),
            MapKind::OpenAddressing => {
                AnyMap::Probing(ProbingHashMap::with_capacity_and_load_factor(
                    self.initial_capacity,
                    self.max_load_factor,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, MapKind};
    use crate::{AbstractMap, AnyMap, Maintenance};
    use test_log::test;

    #[test]
    fn config_opens_every_family() {
        for kind in MapKind::ALL {
            let mut map = Config::new(kind).open::<String, u64>();
            map.add("a".to_string(), 1);
            assert_eq!(1, map.len(), "{kind:?}");
        }
    }

    #[test]
    fn config_passes_capacity_to_hash_engines() {
        let map = Config::new(MapKind::ChainedHash)
            .initial_capacity(100)
            .open::<String, u64>();

        match map {
            AnyMap::Chained(inner) => assert_eq!(101, inner.bucket_count()),
            _ => panic!("expected the chained engine"),
        }
    }

    #[test]
    fn maintenance_kind_follows_family() {
        let trees = Config::new(MapKind::Avl).open::<String, u64>();
        assert!(matches!(trees.maintenance(), Maintenance::Rotations(0)));

        let hashes = Config::new(MapKind::OpenAddressing).open::<String, u64>();
        assert!(matches!(hashes.maintenance(), Maintenance::Collisions(0)));
    }
}
