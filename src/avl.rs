// Copyright (c) 2025-present, quadmap
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::metrics::Metrics;
use crate::{Error, Result};
use std::cmp::Ordering;
use std::fmt::{Display, Write};

type Link<K, V> = Option<Box<Node<K, V>>>;

#[derive(Clone)]
struct Node<K, V> {
    key: K,
    value: V,

    /// 1 for a leaf; absent children count as height 0.
    height: i32,

    left: Link<K, V>,
    right: Link<K, V>,
}

impl<K, V> Node<K, V> {
    fn new(key: K, value: V) -> Box<Self> {
        Box::new(Self {
            key,
            value,
            height: 1,
            left: None,
            right: None,
        })
    }
}

/// Height-balanced binary search tree.
///
/// Keys are kept in strict order and, for every node, the heights of the two
/// subtrees differ by at most one. `add` ignores keys that are already
/// present; every key comparison and rotation is counted.
#[derive(Clone)]
pub struct AvlMap<K, V> {
    root: Link<K, V>,
    metrics: Metrics,
}

impl<K, V> Default for AvlMap<K, V> {
    fn default() -> Self {
        Self {
            root: None,
            metrics: Metrics::default(),
        }
    }
}

impl<K: Ord + Clone, V> AvlMap<K, V> {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: None,
            metrics: Metrics::default(),
        }
    }

    /// Inserts `(key, value)` at its ordered position, rebalancing on the way
    /// back up. A key that is already present is left untouched.
    pub fn add(&mut self, key: K, value: V) {
        let root = self.root.take();
        self.root = Self::add_node(root, key, value, &self.metrics);
    }

    fn add_node(node: Link<K, V>, key: K, value: V, metrics: &Metrics) -> Link<K, V> {
        let Some(mut node) = node else {
            return Some(Node::new(key, value));
        };

        match metrics.compare(&key, &node.key) {
            Ordering::Equal => Some(node),
            Ordering::Less => {
                node.left = Self::add_node(node.left.take(), key.clone(), value, metrics);
                Some(Self::rebalance_insert(node, &key, metrics))
            }
            Ordering::Greater => {
                node.right = Self::add_node(node.right.take(), key.clone(), value, metrics);
                Some(Self::rebalance_insert(node, &key, metrics))
            }
        }
    }

    /// Single or double rotation at an ancestor of a freshly inserted key,
    /// chosen by the ancestor's balance factor and the side the key went to.
    fn rebalance_insert(mut node: Box<Node<K, V>>, key: &K, metrics: &Metrics) -> Box<Node<K, V>> {
        let balance = Self::balance(&node);

        if balance == -2 {
            if let Some(left) = node.left.take() {
                return match metrics.compare(key, &left.key) {
                    Ordering::Less => {
                        node.left = Some(left);
                        Self::rotate_right(node, metrics)
                    }
                    _ => {
                        node.left = Some(Self::rotate_left(left, metrics));
                        Self::rotate_right(node, metrics)
                    }
                };
            }
        } else if balance == 2 {
            if let Some(right) = node.right.take() {
                return match metrics.compare(key, &right.key) {
                    Ordering::Greater => {
                        node.right = Some(right);
                        Self::rotate_left(node, metrics)
                    }
                    _ => {
                        node.right = Some(Self::rotate_right(right, metrics));
                        Self::rotate_left(node, metrics)
                    }
                };
            }
        }

        node.height = 1 + i32::max(Self::height_of(&node.left), Self::height_of(&node.right));
        node
    }

    /// Removes the entry for `key` if present; otherwise does nothing.
    pub fn remove(&mut self, key: &K) {
        let root = self.root.take();
        self.root = Self::remove_node(root, key, &self.metrics);
    }

    fn remove_node(node: Link<K, V>, key: &K, metrics: &Metrics) -> Link<K, V> {
        let mut node = node?;

        match metrics.compare(key, &node.key) {
            Ordering::Less => node.left = Self::remove_node(node.left.take(), key, metrics),
            Ordering::Greater => node.right = Self::remove_node(node.right.take(), key, metrics),
            Ordering::Equal => match node.right.take() {
                None => return node.left.take(),
                Some(right) => {
                    // Replace the entry with its in-order successor, then
                    // splice the successor out of the right subtree.
                    let (rest, successor_key, successor_value) = Self::detach_min(right, metrics);
                    node.key = successor_key;
                    node.value = successor_value;
                    node.right = rest;
                }
            },
        }

        Some(Self::rebalance_removal(node, metrics))
    }

    fn detach_min(mut node: Box<Node<K, V>>, metrics: &Metrics) -> (Link<K, V>, K, V) {
        match node.left.take() {
            None => {
                let Node {
                    key, value, right, ..
                } = *node;
                (right, key, value)
            }
            Some(left) => {
                let (rest, key, value) = Self::detach_min(left, metrics);
                node.left = rest;
                (Some(Self::rebalance_removal(node, metrics)), key, value)
            }
        }
    }

    /// Post-removal fixup; the taller child's balance sign decides between a
    /// single and a double rotation.
    fn rebalance_removal(mut node: Box<Node<K, V>>, metrics: &Metrics) -> Box<Node<K, V>> {
        let balance = Self::balance(&node);

        if balance == 2 {
            if let Some(right) = node.right.take() {
                return if Self::balance(&right) >= 0 {
                    node.right = Some(right);
                    Self::rotate_left(node, metrics)
                } else {
                    node.right = Some(Self::rotate_right(right, metrics));
                    Self::rotate_left(node, metrics)
                };
            }
        } else if balance == -2 {
            if let Some(left) = node.left.take() {
                return if Self::balance(&left) <= 0 {
                    node.left = Some(left);
                    Self::rotate_right(node, metrics)
                } else {
                    node.left = Some(Self::rotate_left(left, metrics));
                    Self::rotate_right(node, metrics)
                };
            }
        }

        node.height = 1 + i32::max(Self::height_of(&node.left), Self::height_of(&node.right));
        node
    }

    /// Replaces the value mapped to `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if the key is not present.
    pub fn update(&mut self, key: &K, value: V) -> Result<()> {
        let metrics = &self.metrics;
        let mut cursor = &mut self.root;

        while let Some(node) = cursor {
            match metrics.compare(key, &node.key) {
                Ordering::Less => cursor = &mut node.left,
                Ordering::Greater => cursor = &mut node.right,
                Ordering::Equal => {
                    node.value = value;
                    return Ok(());
                }
            }
        }

        Err(Error::KeyNotFound)
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
        let mut cursor = &self.root;

        while let Some(node) = cursor {
            match self.metrics.compare(key, &node.key) {
                Ordering::Less => cursor = &node.left,
                Ordering::Greater => cursor = &node.right,
                Ordering::Equal => return Ok(&node.value),
            }
        }

        Err(Error::KeyNotFound)
    }

    /// Returns a mutable reference to the value mapped to `key`, inserting a
    /// default value first when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if the freshly inserted key cannot be
    /// found again; this indicates a broken tree and cannot happen through
    /// the public API.
    pub fn get_or_default(&mut self, key: K) -> Result<&mut V>
    where
        V: Default,
    {
        if !self.contains(&key) {
            self.add(key.clone(), V::default());
        }

        let metrics = &self.metrics;
        let mut cursor = &mut self.root;

        while let Some(node) = cursor {
            match metrics.compare(&key, &node.key) {
                Ordering::Less => cursor = &mut node.left,
                Ordering::Greater => cursor = &mut node.right,
                Ordering::Equal => return Ok(&mut node.value),
            }
        }

        Err(Error::KeyNotFound)
    }

    /// Number of entries, counted by an iterative traversal.
    #[must_use]
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&Node<K, V>> = Vec::new();

        if let Some(root) = self.root.as_deref() {
            stack.push(root);
        }

        while let Some(node) = stack.pop() {
            count += 1;

            if let Some(right) = node.right.as_deref() {
                stack.push(right);
            }
            if let Some(left) = node.left.as_deref() {
                stack.push(left);
            }
        }

        count
    }

    /// Returns `true` if the tree holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Height of the tree; 0 when empty.
    #[must_use]
    pub fn height(&self) -> i32 {
        Self::height_of(&self.root)
    }

    /// Removes every entry and resets both counters.
    pub fn clear(&mut self) {
        self.metrics.reset();
        self.root = None;
    }

    /// Number of key comparisons performed since construction or the last
    /// [`AvlMap::clear`].
    #[must_use]
    pub fn comparisons(&self) -> u64 {
        self.metrics.comparisons()
    }

    /// Number of rotations performed since construction or the last
    /// [`AvlMap::clear`].
    #[must_use]
    pub fn rotations(&self) -> u64 {
        self.metrics.structural()
    }

    fn height_of(link: &Link<K, V>) -> i32 {
        link.as_deref().map_or(0, |node| node.height)
    }

    fn balance(node: &Node<K, V>) -> i32 {
        Self::height_of(&node.right) - Self::height_of(&node.left)
    }

    // Rotations detach the pivot's child, so both guards below are trivially
    // satisfied whenever the balance factor demanded the rotation.

    fn rotate_left(mut node: Box<Node<K, V>>, metrics: &Metrics) -> Box<Node<K, V>> {
        let Some(mut child) = node.right.take() else {
            return node;
        };

        node.right = child.left.take();
        node.height = 1 + i32::max(Self::height_of(&node.left), Self::height_of(&node.right));
        child.left = Some(node);
        child.height = 1 + i32::max(Self::height_of(&child.left), Self::height_of(&child.right));

        metrics.rotation();

        child
    }

    fn rotate_right(mut node: Box<Node<K, V>>, metrics: &Metrics) -> Box<Node<K, V>> {
        let Some(mut child) = node.left.take() else {
            return node;
        };

        node.left = child.right.take();
        node.height = 1 + i32::max(Self::height_of(&node.left), Self::height_of(&node.right));
        child.right = Some(node);
        child.height = 1 + i32::max(Self::height_of(&child.left), Self::height_of(&child.right));

        metrics.rotation();

        child
    }

    #[doc(hidden)]
    pub fn entries(&self) -> Vec<(K, V)>
    where
        V: Clone,
    {
        let mut out = Vec::new();
        Self::in_order(self.root.as_deref(), &mut |node| {
            out.push((node.key.clone(), node.value.clone()));
        });
        out
    }

    /// Verifies the balance invariant and the stored heights of every node.
    #[doc(hidden)]
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        Self::checked_height(self.root.as_deref()).is_some()
    }

    fn checked_height(node: Option<&Node<K, V>>) -> Option<i32> {
        let Some(node) = node else {
            return Some(0);
        };

        let left = Self::checked_height(node.left.as_deref())?;
        let right = Self::checked_height(node.right.as_deref())?;

        if (right - left).abs() > 1 || node.height != 1 + i32::max(left, right) {
            return None;
        }

        Some(node.height)
    }

    fn in_order(root: Option<&Node<K, V>>, visit: &mut impl FnMut(&Node<K, V>)) {
        let mut stack: Vec<&Node<K, V>> = Vec::new();
        let mut cursor = root;

        while cursor.is_some() || !stack.is_empty() {
            while let Some(node) = cursor {
                stack.push(node);
                cursor = node.left.as_deref();
            }

            if let Some(node) = stack.pop() {
                visit(node);
                cursor = node.right.as_deref();
            }
        }
    }
}

impl<K: Ord + Clone + Display, V: Display> AvlMap<K, V> {
    /// Writes the in-order enumeration as `AVL: (k1, v1), (k2, v2), ...`.
    ///
    /// # Errors
    ///
    /// Forwards errors of the sink.
    pub fn show<W: Write>(&self, out: &mut W) -> std::fmt::Result {
        write!(out, "AVL: ")?;

        let mut stack: Vec<&Node<K, V>> = Vec::new();
        let mut cursor = self.root.as_deref();
        let mut first = true;

        while cursor.is_some() || !stack.is_empty() {
            while let Some(node) = cursor {
                stack.push(node);
                cursor = node.left.as_deref();
            }

            if let Some(node) = stack.pop() {
                if !first {
                    write!(out, ", ")?;
                }
                first = false;

                write!(out, "({}, {})", node.key, node.value)?;
                cursor = node.right.as_deref();
            }
        }

        writeln!(out)
    }

    /// Writes a structural dump of the tree, one node per line, right
    /// subtree on top.
    ///
    /// # Errors
    ///
    /// Forwards errors of the sink.
    pub fn show_tree<W: Write>(&self, out: &mut W) -> std::fmt::Result {
        Self::show_tree_node(self.root.as_deref(), "", out)
    }

    fn show_tree_node<W: Write>(
        node: Option<&Node<K, V>>,
        lineage: &str,
        out: &mut W,
    ) -> std::fmt::Result {
        if let Some(inner) = node {
            if inner.left.is_some() || inner.right.is_some() {
                Self::show_tree_node(inner.right.as_deref(), &format!("{lineage}r"), out)?;
            }
        }

        let marks = lineage.as_bytes();
        for pair in marks.windows(2) {
            out.write_str(if pair[0] == pair[1] { "    " } else { "│   " })?;
        }
        if let Some(last) = marks.last() {
            out.write_str(if *last == b'r' { "┌───" } else { "└───" })?;
        }

        let Some(inner) = node else {
            return writeln!(out, "#");
        };

        writeln!(out, "{}, {}", inner.key, inner.value)?;

        if inner.left.is_some() || inner.right.is_some() {
            Self::show_tree_node(inner.left.as_deref(), &format!("{lineage}l"), out)?;
        }

        Ok(())
    }
}

impl<K, V> crate::AbstractMap for AvlMap<K, V>
where
    K: Ord + Clone + Display,
    V: Default + Display,
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
        crate::Maintenance::Rotations(self.rotations())
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
    use super::AvlMap;
    use crate::Error;
    use test_log::test;

    fn keys(map: &AvlMap<i32, i32>) -> Vec<i32> {
        map.entries().into_iter().map(|(k, _)| k).collect()
    }

    #[test]
    fn avl_ascending_insert_stays_balanced() {
        let mut map = AvlMap::new();

        for key in 1..=10 {
            map.add(key, key * 10);
            assert!(map.is_balanced(), "unbalanced after inserting {key}");
        }

        assert_eq!(4, map.height());
        assert_eq!((1..=10).collect::<Vec<_>>(), keys(&map));
        assert!(map.rotations() > 0);
    }

    #[test]
    fn avl_duplicate_add_is_ignored() {
        let mut map = AvlMap::new();
        map.add(5, 50);
        map.add(5, 999);

        assert_eq!(1, map.len());
        assert_eq!(&50, map.get(&5).unwrap());
    }

    #[test]
    fn avl_update() {
        let mut map = AvlMap::new();
        map.add(1, 10);

        map.update(&1, 11).unwrap();
        assert_eq!(&11, map.get(&1).unwrap());

        assert!(matches!(map.update(&2, 20), Err(Error::KeyNotFound)));
    }

    #[test]
    fn avl_remove_keeps_balance() {
        let mut map = AvlMap::new();

        for key in [50, 25, 75, 12, 37, 62, 87, 6, 18, 31, 43] {
            map.add(key, key);
        }

        // leaf, one child, two children
        for key in [6, 12, 50] {
            map.remove(&key);
            assert!(map.is_balanced(), "unbalanced after removing {key}");
            assert!(!map.contains(&key));
        }

        // absent key is a no-op
        let before = map.len();
        map.remove(&999);
        assert_eq!(before, map.len());
    }

    #[test]
    fn avl_removal_needs_rotations() {
        let mut map = AvlMap::new();

        for key in 1..=32 {
            map.add(key, key);
        }
        for key in 17..=32 {
            map.remove(&key);
            assert!(map.is_balanced(), "unbalanced after removing {key}");
        }

        assert_eq!((1..=16).collect::<Vec<_>>(), keys(&map));
    }

    #[test]
    fn avl_get_or_default_inserts() {
        let mut map: AvlMap<i32, i32> = AvlMap::new();

        *map.get_or_default(7).unwrap() += 1;
        *map.get_or_default(7).unwrap() += 1;

        assert_eq!(&2, map.get(&7).unwrap());
        assert_eq!(1, map.len());
    }

    #[test]
    fn avl_clone_is_independent() {
        let mut map = AvlMap::new();
        map.add(1, 1);
        map.add(2, 2);

        let mut copy = map.clone();
        copy.add(3, 3);
        copy.update(&1, 100).unwrap();

        assert_eq!(2, map.len());
        assert_eq!(&1, map.get(&1).unwrap());
        assert_eq!(3, copy.len());
    }

    #[test]
    fn avl_clear_resets_counters() {
        let mut map = AvlMap::new();
        for key in 1..=8 {
            map.add(key, key);
        }
        assert!(map.comparisons() > 0);

        map.clear();

        assert!(map.is_empty());
        assert_eq!(0, map.comparisons());
        assert_eq!(0, map.rotations());
    }

    #[test]
    fn avl_show_formats_in_order() {
        let mut map = AvlMap::new();
        for key in [2, 1, 3] {
            map.add(key, key * 10);
        }

        let mut out = String::new();
        map.show(&mut out).unwrap();

        assert_eq!("AVL: (1, 10), (2, 20), (3, 30)\n", out);
    }
}
