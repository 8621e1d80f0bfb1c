// Copyright (c) 2025-present, quadmap
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    AbstractMap, AvlMap, ChainedHashMap, Maintenance, ProbingHashMap, RbMap, Result,
};
use rustc_hash::FxBuildHasher;
use std::fmt::Display;
use std::hash::{BuildHasher, Hash};

/// May be any of the four engines, dispatched behind one type.
///
/// The trait object route is closed by the associated types of
/// [`AbstractMap`], so this is a plain tagged enum with hand-written
/// forwarding.
#[derive(Clone)]
pub enum AnyMap<K, V, S: BuildHasher = FxBuildHasher> {
    /// Height-balanced BST, see [`AvlMap`]
    Avl(AvlMap<K, V>),

    /// Red-black tree, see [`RbMap`]
    RedBlack(RbMap<K, V>),

    /// Hash table with per-bucket chains, see [`ChainedHashMap`]
    Chained(ChainedHashMap<K, V, S>),

    /// Hash table with double-hashed open addressing, see [`ProbingHashMap`]
    Probing(ProbingHashMap<K, V, S>),
}

macro_rules! dispatch {
    ($self:expr, |$map:ident| $body:expr) => {
        match $self {
            Self::Avl($map) => $body,
            Self::RedBlack($map) => $body,
            Self::Chained($map) => $body,
            Self::Probing($map) => $body,
        }
    };
}

impl<K, V, S> AbstractMap for AnyMap<K, V, S>
where
    K: Ord + Hash + Clone + Default + Display,
    V: Default + Display,
    S: BuildHasher,
{
    type Key = K;
    type Value = V;

    fn add(&mut self, key: K, value: V) {
        // the hash engines report a bool; the uniform surface drops it
        dispatch!(self, |map| {
            map.add(key, value);
        })
    }

    fn update(&mut self, key: &K, value: V) -> Result<()> {
        dispatch!(self, |map| map.update(key, value))
    }

    fn get(&self, key: &K) -> Result<&V> {
        dispatch!(self, |map| map.get(key))
    }

    fn get_or_default(&mut self, key: K) -> Result<&mut V> {
        dispatch!(self, |map| map.get_or_default(key))
    }

    fn contains(&self, key: &K) -> bool {
        dispatch!(self, |map| map.contains(key))
    }

    fn remove(&mut self, key: &K) {
        dispatch!(self, |map| {
            map.remove(key);
        })
    }

    fn len(&self) -> usize {
        dispatch!(self, |map| map.len())
    }

    fn clear(&mut self) {
        dispatch!(self, |map| map.clear())
    }

    fn comparisons(&self) -> u64 {
        dispatch!(self, |map| map.comparisons())
    }

    fn maintenance(&self) -> Maintenance {
        dispatch!(self, |map| map.maintenance())
    }

    fn show(&self, mut out: &mut dyn std::fmt::Write) -> std::fmt::Result {
        dispatch!(self, |map| map.show(&mut out))
    }

    fn entries(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        dispatch!(self, |map| map.entries())
    }
}
