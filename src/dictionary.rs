// Copyright (c) 2025-present, quadmap
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{AbstractMap, Maintenance, Result};
use std::time::Instant;

/// Instrumented dictionary façade over any map engine.
///
/// Remembers the instant it was constructed (or last cleared) and, on
/// [`Dictionary::show`], prefixes the engine enumeration with the element
/// count, both engine counters and the elapsed construction time.
pub struct Dictionary<M> {
    map: M,
    start: Instant,
}

impl<M: AbstractMap> Dictionary<M> {
    /// Wraps an engine and starts the construction clock.
    pub fn new(map: M) -> Self {
        Self {
            map,
            start: Instant::now(),
        }
    }

    /// Wraps an engine and loads it with `(key, value)` pairs through the
    /// engine's `add`.
    pub fn from_entries<I>(map: M, entries: I) -> Self
    where
        I: IntoIterator<Item = (M::Key, M::Value)>,
    {
        let mut dictionary = Self::new(map);
        for (key, value) in entries {
            dictionary.map.add(key, value);
        }
        dictionary
    }

    /// Inserts `(key, value)` with the engine's `add` semantics.
    pub fn insert(&mut self, key: M::Key, value: M::Value) {
        self.map.add(key, value);
    }

    /// Replaces the value of a present key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::KeyNotFound`] if the key is not present.
    pub fn update(&mut self, key: &M::Key, value: M::Value) -> Result<()> {
        self.map.update(key, value)
    }

    /// Returns a reference to the value mapped to `key`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::KeyNotFound`] if the key is not present.
    pub fn get(&self, key: &M::Key) -> Result<&M::Value> {
        self.map.get(key)
    }

    /// Returns a mutable reference to the value mapped to `key`, inserting a
    /// default value first when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SlotsExhausted`] when an open-addressing
    /// engine runs out of slots even after growing.
    pub fn entry_or_default(&mut self, key: M::Key) -> Result<&mut M::Value> {
        self.map.get_or_default(key)
    }

    /// Removes the entry for `key` if present; absent keys are a no-op.
    pub fn remove(&mut self, key: &M::Key) {
        self.map.remove(key);
    }

    /// Returns `true` iff `key` is present.
    pub fn contains(&self, key: &M::Key) -> bool {
        self.map.contains(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the dictionary holds no entries.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Milliseconds elapsed since construction or the last
    /// [`Dictionary::clear`].
    pub fn duration(&self) -> u128 {
        self.start.elapsed().as_millis()
    }

    /// Empties the engine, resets its counters and restarts the clock.
    pub fn clear(&mut self) {
        self.map.clear();
        self.start = Instant::now();
    }

    /// Writes the statistics header followed by the engine's key-ascending
    /// enumeration.
    ///
    /// # Errors
    ///
    /// Forwards errors of the sink.
    pub fn show(&self, out: &mut dyn std::fmt::Write) -> std::fmt::Result {
        writeln!(out, "Quantidade de elementos: {}", self.map.len())?;
        writeln!(
            out,
            "Comparações entre chaves realizadas(durante a construção do dicionário): {}",
            self.map.comparisons(),
        )?;

        match self.map.maintenance() {
            Maintenance::Rotations(count) => writeln!(
                out,
                "Rotações ocorridas(durante a construção do dicionário): {count}",
            )?,
            Maintenance::Collisions(count) => writeln!(
                out,
                "Colisões ocorridas(durante a construção do dicionário): {count}",
            )?,
        }

        writeln!(
            out,
            "Tempo de construção do dicionário(até o momento): {}ms",
            self.duration(),
        )?;
        writeln!(out)?;

        self.map.show(out)
    }

    /// Borrows the wrapped engine.
    pub fn engine(&self) -> &M {
        &self.map
    }
}

#[cfg(test)]
mod tests {
    use super::Dictionary;
    use crate::{AvlMap, ChainedHashMap, Config, MapKind};
    use test_log::test;

    #[test]
    fn dictionary_forwards_to_engine() {
        let mut dictionary = Dictionary::new(AvlMap::<String, u64>::new());

        dictionary.insert("cat".to_string(), 1);
        *dictionary.entry_or_default("dog".to_string()).unwrap() += 3;

        assert_eq!(2, dictionary.len());
        assert!(dictionary.contains(&"cat".to_string()));
        assert_eq!(&3, dictionary.get(&"dog".to_string()).unwrap());

        dictionary.remove(&"cat".to_string());
        assert!(!dictionary.contains(&"cat".to_string()));
    }

    #[test]
    fn dictionary_from_entries() {
        let dictionary = Dictionary::from_entries(
            ChainedHashMap::<String, u64>::new(),
            [("a".to_string(), 1), ("b".to_string(), 2)],
        );

        assert_eq!(2, dictionary.len());
        assert_eq!(&2, dictionary.get(&"b".to_string()).unwrap());
    }

    #[test]
    fn dictionary_show_prefixes_tree_stats() {
        let mut dictionary = Dictionary::new(Config::new(MapKind::Avl).open::<String, u64>());
        dictionary.insert("b".to_string(), 2);
        dictionary.insert("a".to_string(), 1);

        let mut out = String::new();
        dictionary.show(&mut out).unwrap();

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!("Quantidade de elementos: 2", lines[0]);
        assert!(lines[1].starts_with("Comparações entre chaves realizadas("));
        assert!(lines[2].starts_with("Rotações ocorridas("));
        assert!(lines[3].starts_with("Tempo de construção do dicionário("));
        assert!(lines[3].ends_with("ms"));
        assert_eq!("", lines[4]);
        assert_eq!("AVL: (a, 1), (b, 2)", lines[5]);
    }

    #[test]
    fn dictionary_show_prefixes_hash_stats() {
        let mut dictionary =
            Dictionary::new(Config::new(MapKind::ChainedHash).open::<String, u64>());
        dictionary.insert("a".to_string(), 1);

        let mut out = String::new();
        dictionary.show(&mut out).unwrap();

        assert!(out.contains("Colisões ocorridas("));
        assert!(out.contains("(a, 1)"));
    }

    #[test]
    fn dictionary_clear_restarts_clock_and_counters() {
        let mut dictionary = Dictionary::new(Config::new(MapKind::RedBlack).open::<String, u64>());
        for word in ["a", "b", "c"] {
            dictionary.insert(word.to_string(), 1);
        }

        dictionary.clear();

        assert!(dictionary.is_empty());
        let mut out = String::new();
        dictionary.show(&mut out).unwrap();
        assert!(out.contains("Quantidade de elementos: 0"));
        assert!(out.contains("realizadas(durante a construção do dicionário): 0"));
    }
}
