// Copyright (c) 2025-present, quadmap
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::metrics::Metrics;
use crate::{Error, Result};
use std::cmp::Ordering;
use std::fmt::{Display, Write};

/// Arena id of the shared sentinel leaf.
const NIL: usize = 0;

/// Node color of a red-black tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    /// Red node; never has a red child.
    Red,
    /// Black node; the sentinel and the root are always black.
    Black,
}

#[derive(Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    color: Color,
    left: usize,
    right: usize,
    parent: usize,
}

/// Red-black tree over an index arena.
///
/// Arena slot 0 is the `NIL` sentinel standing in for every absent child and
/// for the parent of the root, which removes the null checks inside rotations
/// and fixup. Its `parent` link is written transiently while a black node is
/// being spliced out, which is why the sentinel is an ordinary arena slot and
/// not a plain `Option`. Freed slots are kept on a free list and reused.
///
/// `add` ignores keys that are already present; every key comparison and
/// rotation is counted.
#[derive(Clone)]
pub struct RbMap<K, V> {
    nodes: Vec<Node<K, V>>,
    free: Vec<usize>,
    root: usize,
    len: usize,
    metrics: Metrics,
}

impl<K: Default, V: Default> Default for RbMap<K, V> {
    fn default() -> Self {
        Self {
            nodes: vec![Node {
                key: K::default(),
                value: V::default(),
                color: Color::Black,
                left: NIL,
                right: NIL,
                parent: NIL,
            }],
            free: Vec::new(),
            root: NIL,
            len: 0,
            metrics: Metrics::default(),
        }
    }
}

impl<K: Ord + Clone + Default, V: Default> RbMap<K, V> {
    /// Creates an empty tree holding only the sentinel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a red `(key, value)` node at its ordered position, then
    /// restores the red-black properties. A key that is already present is
    /// left untouched.
    pub fn add(&mut self, key: K, value: V) {
        let mut parent = NIL;
        let mut cursor = self.root;

        while cursor != NIL {
            parent = cursor;
            match self.metrics.compare(&key, &self.nodes[cursor].key) {
                Ordering::Less => cursor = self.nodes[cursor].left,
                Ordering::Greater => cursor = self.nodes[cursor].right,
                Ordering::Equal => return,
            }
        }

        let id = self.alloc(key, value);
        self.nodes[id].parent = parent;

        if parent == NIL {
            self.root = id;
        } else if self.metrics.compare(&self.nodes[id].key, &self.nodes[parent].key)
            == Ordering::Less
        {
            self.nodes[parent].left = id;
        } else {
            self.nodes[parent].right = id;
        }

        self.len += 1;
        self.fixup_insert(id);
    }

    /// Removes the entry for `key` if present; otherwise does nothing.
    pub fn remove(&mut self, key: &K) {
        let mut cursor = self.root;

        while cursor != NIL {
            match self.metrics.compare(key, &self.nodes[cursor].key) {
                Ordering::Less => cursor = self.nodes[cursor].left,
                Ordering::Greater => cursor = self.nodes[cursor].right,
                Ordering::Equal => break,
            }
        }

        if cursor != NIL {
            self.delete_node(cursor);
        }
    }

    /// Replaces the value mapped to `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if the key is not present.
    pub fn update(&mut self, key: &K, value: V) -> Result<()> {
        let mut cursor = self.root;

        while cursor != NIL {
            match self.metrics.compare(key, &self.nodes[cursor].key) {
                Ordering::Less => cursor = self.nodes[cursor].left,
                Ordering::Greater => cursor = self.nodes[cursor].right,
                Ordering::Equal => {
                    self.nodes[cursor].value = value;
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
        let mut cursor = self.root;

        while cursor != NIL {
            match self.metrics.compare(key, &self.nodes[cursor].key) {
                Ordering::Less => cursor = self.nodes[cursor].left,
                Ordering::Greater => cursor = self.nodes[cursor].right,
                Ordering::Equal => return Ok(&self.nodes[cursor].value),
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
    pub fn get_or_default(&mut self, key: K) -> Result<&mut V> {
        if !self.contains(&key) {
            self.add(key.clone(), V::default());
        }

        let mut cursor = self.root;

        while cursor != NIL {
            match self.metrics.compare(&key, &self.nodes[cursor].key) {
                Ordering::Less => cursor = self.nodes[cursor].left,
                Ordering::Greater => cursor = self.nodes[cursor].right,
                Ordering::Equal => return Ok(&mut self.nodes[cursor].value),
            }
        }

        Err(Error::KeyNotFound)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the tree holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root == NIL
    }

    /// Removes every entry and resets both counters. Only the sentinel
    /// survives.
    pub fn clear(&mut self) {
        self.metrics.reset();
        self.nodes.truncate(1);
        self.nodes[NIL].left = NIL;
        self.nodes[NIL].right = NIL;
        self.nodes[NIL].parent = NIL;
        self.free.clear();
        self.root = NIL;
        self.len = 0;
    }

    /// Number of key comparisons performed since construction or the last
    /// [`RbMap::clear`].
    #[must_use]
    pub fn comparisons(&self) -> u64 {
        self.metrics.comparisons()
    }

    /// Number of rotations performed since construction or the last
    /// [`RbMap::clear`].
    #[must_use]
    pub fn rotations(&self) -> u64 {
        self.metrics.structural()
    }

    fn alloc(&mut self, key: K, value: V) -> usize {
        let node = Node {
            key,
            value,
            color: Color::Red,
            left: NIL,
            right: NIL,
            parent: NIL,
        };

        if let Some(id) = self.free.pop() {
            self.nodes[id] = node;
            id
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    fn rotate_left(&mut self, node: usize) {
        let pivot = self.nodes[node].right;
        let inner = self.nodes[pivot].left;

        self.nodes[node].right = inner;
        if inner != NIL {
            self.nodes[inner].parent = node;
        }

        let parent = self.nodes[node].parent;
        self.nodes[pivot].parent = parent;

        if parent == NIL {
            self.root = pivot;
        } else if node == self.nodes[parent].left {
            self.nodes[parent].left = pivot;
        } else {
            self.nodes[parent].right = pivot;
        }

        self.nodes[pivot].left = node;
        self.nodes[node].parent = pivot;

        self.metrics.rotation();
    }

    fn rotate_right(&mut self, node: usize) {
        let pivot = self.nodes[node].left;
        let inner = self.nodes[pivot].right;

        self.nodes[node].left = inner;
        if inner != NIL {
            self.nodes[inner].parent = node;
        }

        let parent = self.nodes[node].parent;
        self.nodes[pivot].parent = parent;

        if parent == NIL {
            self.root = pivot;
        } else if node == self.nodes[parent].right {
            self.nodes[parent].right = pivot;
        } else {
            self.nodes[parent].left = pivot;
        }

        self.nodes[pivot].right = node;
        self.nodes[node].parent = pivot;

        self.metrics.rotation();
    }

    /// Climbs red parent chains, recoloring past red uncles and rotating
    /// around the grandparent otherwise.
    fn fixup_insert(&mut self, mut node: usize) {
        while self.nodes[self.nodes[node].parent].color == Color::Red {
            let parent = self.nodes[node].parent;
            let grandparent = self.nodes[parent].parent;

            if parent == self.nodes[grandparent].left {
                let uncle = self.nodes[grandparent].right;

                if self.nodes[uncle].color == Color::Red {
                    self.nodes[parent].color = Color::Black;
                    self.nodes[uncle].color = Color::Black;
                    self.nodes[grandparent].color = Color::Red;
                    node = grandparent;
                } else {
                    if node == self.nodes[parent].right {
                        node = parent;
                        self.rotate_left(node);
                    }
                    let parent = self.nodes[node].parent;
                    let grandparent = self.nodes[parent].parent;
                    self.nodes[parent].color = Color::Black;
                    self.nodes[grandparent].color = Color::Red;
                    self.rotate_right(grandparent);
                }
            } else {
                let uncle = self.nodes[grandparent].left;

                if self.nodes[uncle].color == Color::Red {
                    self.nodes[parent].color = Color::Black;
                    self.nodes[uncle].color = Color::Black;
                    self.nodes[grandparent].color = Color::Red;
                    node = grandparent;
                } else {
                    if node == self.nodes[parent].left {
                        node = parent;
                        self.rotate_right(node);
                    }
                    let parent = self.nodes[node].parent;
                    let grandparent = self.nodes[parent].parent;
                    self.nodes[parent].color = Color::Black;
                    self.nodes[grandparent].color = Color::Red;
                    self.rotate_left(grandparent);
                }
            }
        }

        let root = self.root;
        self.nodes[root].color = Color::Black;
    }

    /// Splices `node` out, replacing it by its in-order successor's entry
    /// when both children are present, then repairs the black height.
    fn delete_node(&mut self, node: usize) {
        let spliced = if self.nodes[node].left == NIL || self.nodes[node].right == NIL {
            node
        } else {
            self.minimum(self.nodes[node].right)
        };

        let child = if self.nodes[spliced].left != NIL {
            self.nodes[spliced].left
        } else {
            self.nodes[spliced].right
        };

        // `child` may be the sentinel; the fixup below still needs to walk
        // upward from it, hence the transient parent write.
        let spliced_parent = self.nodes[spliced].parent;
        self.nodes[child].parent = spliced_parent;

        if spliced_parent == NIL {
            self.root = child;
        } else if spliced == self.nodes[spliced_parent].left {
            self.nodes[spliced_parent].left = child;
        } else {
            self.nodes[spliced_parent].right = child;
        }

        if spliced != node {
            // The spliced slot is recycled below, so its entry can be taken.
            let key = std::mem::take(&mut self.nodes[spliced].key);
            let value = std::mem::take(&mut self.nodes[spliced].value);
            self.nodes[node].key = key;
            self.nodes[node].value = value;
        }

        if self.nodes[spliced].color == Color::Black {
            self.fixup_delete(child);
        }

        self.free.push(spliced);
        self.len -= 1;
    }

    /// Pushes the doubled black up the tree, casing on the sibling's colors.
    fn fixup_delete(&mut self, mut node: usize) {
        while node != self.root && self.nodes[node].color == Color::Black {
            let parent = self.nodes[node].parent;

            if node == self.nodes[parent].left {
                let mut sibling = self.nodes[parent].right;

                if self.nodes[sibling].color == Color::Red {
                    self.nodes[sibling].color = Color::Black;
                    self.nodes[parent].color = Color::Red;
                    self.rotate_left(parent);
                    sibling = self.nodes[parent].right;
                }

                if self.nodes[self.nodes[sibling].left].color == Color::Black
                    && self.nodes[self.nodes[sibling].right].color == Color::Black
                {
                    self.nodes[sibling].color = Color::Red;
                    node = parent;
                } else {
                    if self.nodes[self.nodes[sibling].right].color == Color::Black {
                        let near = self.nodes[sibling].left;
                        self.nodes[near].color = Color::Black;
                        self.nodes[sibling].color = Color::Red;
                        self.rotate_right(sibling);
                        sibling = self.nodes[parent].right;
                    }

                    self.nodes[sibling].color = self.nodes[parent].color;
                    self.nodes[parent].color = Color::Black;
                    let far = self.nodes[sibling].right;
                    self.nodes[far].color = Color::Black;
                    self.rotate_left(parent);
                    node = self.root;
                }
            } else {
                let mut sibling = self.nodes[parent].left;

                if self.nodes[sibling].color == Color::Red {
                    self.nodes[sibling].color = Color::Black;
                    self.nodes[parent].color = Color::Red;
                    self.rotate_right(parent);
                    sibling = self.nodes[parent].left;
                }

                if self.nodes[self.nodes[sibling].left].color == Color::Black
                    && self.nodes[self.nodes[sibling].right].color == Color::Black
                {
                    self.nodes[sibling].color = Color::Red;
                    node = parent;
                } else {
                    if self.nodes[self.nodes[sibling].left].color == Color::Black {
                        let near = self.nodes[sibling].right;
                        self.nodes[near].color = Color::Black;
                        self.nodes[sibling].color = Color::Red;
                        self.rotate_left(sibling);
                        sibling = self.nodes[parent].left;
                    }

                    self.nodes[sibling].color = self.nodes[parent].color;
                    self.nodes[parent].color = Color::Black;
                    let far = self.nodes[sibling].left;
                    self.nodes[far].color = Color::Black;
                    self.rotate_right(parent);
                    node = self.root;
                }
            }
        }

        self.nodes[node].color = Color::Black;
    }

    fn minimum(&self, mut node: usize) -> usize {
        while self.nodes[node].left != NIL {
            node = self.nodes[node].left;
        }
        node
    }

    #[doc(hidden)]
    pub fn entries(&self) -> Vec<(K, V)>
    where
        V: Clone,
    {
        self.in_order()
            .into_iter()
            .map(|id| (self.nodes[id].key.clone(), self.nodes[id].value.clone()))
            .collect()
    }

    #[doc(hidden)]
    pub fn colored_entries(&self) -> Vec<(K, Color)> {
        self.in_order()
            .into_iter()
            .map(|id| (self.nodes[id].key.clone(), self.nodes[id].color))
            .collect()
    }

    /// Verifies the red-black properties: black root, no red node with a red
    /// child, equal black height on every root-to-sentinel path, and ordered
    /// keys.
    #[doc(hidden)]
    #[must_use]
    pub fn check_invariants(&self) -> bool {
        if self.nodes[self.root].color != Color::Black {
            return false;
        }

        if self.black_height(self.root).is_none() {
            return false;
        }

        let keys: Vec<&K> = self
            .in_order()
            .into_iter()
            .map(|id| &self.nodes[id].key)
            .collect();
        keys.windows(2).all(|pair| pair[0] < pair[1])
    }

    fn black_height(&self, node: usize) -> Option<usize> {
        if node == NIL {
            return Some(1);
        }

        let inner = &self.nodes[node];

        if inner.color == Color::Red
            && (self.nodes[inner.left].color == Color::Red
                || self.nodes[inner.right].color == Color::Red)
        {
            return None;
        }

        let left = self.black_height(inner.left)?;
        let right = self.black_height(inner.right)?;

        if left != right {
            return None;
        }

        Some(left + usize::from(inner.color == Color::Black))
    }

    /// In-order arena ids, gathered iteratively with an explicit stack.
    fn in_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.len);
        let mut stack: Vec<usize> = Vec::new();
        let mut cursor = self.root;

        while cursor != NIL || !stack.is_empty() {
            while cursor != NIL {
                stack.push(cursor);
                cursor = self.nodes[cursor].left;
            }

            if let Some(id) = stack.pop() {
                order.push(id);
                cursor = self.nodes[id].right;
            }
        }

        order
    }
}

impl<K: Ord + Clone + Default + Display, V: Default + Display> RbMap<K, V> {
    /// Writes the in-order enumeration as `RBT: (k1, v1), ...`, coloring
    /// each pair with the ANSI marker of its node color.
    ///
    /// # Errors
    ///
    /// Forwards errors of the sink.
    pub fn show<W: Write>(&self, out: &mut W) -> std::fmt::Result {
        write!(out, "RBT: ")?;

        let order = self.in_order();
        let mut first = true;

        for id in order {
            if !first {
                write!(out, ", ")?;
            }
            first = false;

            let node = &self.nodes[id];
            write!(
                out,
                "{}({}, {})\x1b[0m",
                color_marker(node.color),
                node.key,
                node.value
            )?;
        }

        writeln!(out)
    }

    /// Writes a structural dump of the tree, one node per line, right
    /// subtree on top, with ANSI color markers.
    ///
    /// # Errors
    ///
    /// Forwards errors of the sink.
    pub fn show_tree<W: Write>(&self, out: &mut W) -> std::fmt::Result {
        self.show_tree_node(self.root, "", out)
    }

    fn show_tree_node<W: Write>(&self, node: usize, lineage: &str, out: &mut W) -> std::fmt::Result {
        let has_children =
            node != NIL && (self.nodes[node].left != NIL || self.nodes[node].right != NIL);

        if has_children {
            self.show_tree_node(self.nodes[node].right, &format!("{lineage}r"), out)?;
        }

        let marks = lineage.as_bytes();
        for pair in marks.windows(2) {
            out.write_str(if pair[0] == pair[1] { "    " } else { "│   " })?;
        }
        if let Some(last) = marks.last() {
            out.write_str(if *last == b'r' { "┌───" } else { "└───" })?;
        }

        if node == NIL {
            return writeln!(out, "#");
        }

        let inner = &self.nodes[node];
        writeln!(
            out,
            "{}{}, {}\x1b[0m",
            color_marker(inner.color),
            inner.key,
            inner.value
        )?;

        if has_children {
            self.show_tree_node(self.nodes[node].left, &format!("{lineage}l"), out)?;
        }

        Ok(())
    }
}

const fn color_marker(color: Color) -> &'static str {
    match color {
        Color::Red => "\x1b[31m",
        Color::Black => "\x1b[30m",
    }
}

impl<K, V> crate::AbstractMap for RbMap<K, V>
where
    K: Ord + Clone + Default + Display,
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
    use super::{Color, RbMap};
    use crate::Error;
    use test_log::test;

    fn keys(map: &RbMap<i32, i32>) -> Vec<i32> {
        map.entries().into_iter().map(|(k, _)| k).collect()
    }

    #[test]
    fn rbt_ascending_insert_recolors_and_rotates() {
        let mut map = RbMap::new();

        for key in [10, 20, 30, 40, 50] {
            map.add(key, key);
            assert!(map.check_invariants(), "broken after inserting {key}");
        }

        assert!(map.rotations() >= 1);
        assert_eq!(vec![10, 20, 30, 40, 50], keys(&map));

        // 40 was recolored black by the red-uncle case, 30/50 stay red
        assert_eq!(
            vec![
                (10, Color::Black),
                (20, Color::Black),
                (30, Color::Red),
                (40, Color::Black),
                (50, Color::Red),
            ],
            map.colored_entries()
        );
    }

    #[test]
    fn rbt_duplicate_add_is_ignored() {
        let mut map = RbMap::new();
        map.add(5, 50);
        map.add(5, 999);

        assert_eq!(1, map.len());
        assert_eq!(&50, map.get(&5).unwrap());
    }

    #[test]
    fn rbt_update() {
        let mut map = RbMap::new();
        map.add(1, 10);

        map.update(&1, 11).unwrap();
        assert_eq!(&11, map.get(&1).unwrap());

        assert!(matches!(map.update(&2, 20), Err(Error::KeyNotFound)));
    }

    #[test]
    fn rbt_removal_keeps_properties() {
        let mut map = RbMap::new();

        for key in 1..=32 {
            map.add(key, key);
        }

        // leaves, internal nodes, the root path, then everything
        for key in [1, 16, 8, 24, 32, 2, 3, 4] {
            map.remove(&key);
            assert!(map.check_invariants(), "broken after removing {key}");
            assert!(!map.contains(&key));
        }

        let before = map.len();
        map.remove(&999);
        assert_eq!(before, map.len());

        for key in 1..=32 {
            map.remove(&key);
            assert!(map.check_invariants(), "broken after removing {key}");
        }
        assert!(map.is_empty());
        assert_eq!(0, map.len());
    }

    #[test]
    fn rbt_freed_slots_are_reused() {
        let mut map = RbMap::new();

        for key in 1..=8 {
            map.add(key, key);
        }
        for key in 1..=4 {
            map.remove(&key);
        }
        for key in 101..=104 {
            map.add(key, key);
        }

        assert_eq!(8, map.len());
        assert!(map.check_invariants());
    }

    #[test]
    fn rbt_get_or_default_inserts() {
        let mut map: RbMap<i32, i32> = RbMap::new();

        *map.get_or_default(7).unwrap() += 1;
        *map.get_or_default(7).unwrap() += 1;

        assert_eq!(&2, map.get(&7).unwrap());
        assert_eq!(1, map.len());
    }

    #[test]
    fn rbt_clone_is_independent() {
        let mut map = RbMap::new();
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
    fn rbt_clear_resets_counters() {
        let mut map = RbMap::new();
        for key in 1..=8 {
            map.add(key, key);
        }
        assert!(map.comparisons() > 0);

        map.clear();

        assert!(map.is_empty());
        assert_eq!(0, map.comparisons());
        assert_eq!(0, map.rotations());

        // still usable after the arena reset
        map.add(1, 1);
        assert!(map.contains(&1));
    }

    #[test]
    fn rbt_show_colors_pairs() {
        let mut map = RbMap::new();
        map.add(2, 20);
        map.add(1, 10);
        map.add(3, 30);

        let mut out = String::new();
        map.show(&mut out).unwrap();

        assert_eq!(
            "RBT: \x1b[31m(1, 10)\x1b[0m, \x1b[30m(2, 20)\x1b[0m, \x1b[31m(3, 30)\x1b[0m\n",
            out
        );
    }
}
