// Copyright (c) 2025-present, quadmap
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Four ordered/associative map engines behind one instrumented contract.
//!
//! ##### About
//!
//! This crate implements the same dictionary four times, each over a
//! different engine, to compare how the structures behave on the same
//! workload:
//!
//! - [`AvlMap`]: height-balanced binary search tree
//! - [`RbMap`]: red-black tree over a node arena with a sentinel leaf
//! - [`ChainedHashMap`]: hash table with one collision chain per bucket
//! - [`ProbingHashMap`]: double-hashed open addressing with tombstones
//!
//! Every engine counts the key comparisons and the rotations or collisions
//! it performs, exposes the same [`AbstractMap`] surface, and enumerates its
//! entries key-ascending. [`Dictionary`] wraps any engine and stamps the
//! statistics (element count, counters, construction time) on top of the
//! enumeration; [`Config`] picks an engine family at runtime.
//!
//! The `wordfreq` binary (feature `tool`) drives all of this over books:
//! it tokenizes a text file into lowercased Unicode words and builds
//! `word -> count` dictionaries with whichever engines were requested.
//!
//! # Example usage
//!
//! ```
//! use quadmap::{Config, Dictionary, MapKind, words::words};
//!
//! let mut dictionary = Dictionary::new(Config::new(MapKind::RedBlack).open::<String, u64>());
//!
//! for word in words("the cat and the dog") {
//!     *dictionary.entry_or_default(word)? += 1;
//! }
//!
//! assert_eq!(4, dictionary.len());
//! assert_eq!(&2, dictionary.get(&"the".to_string())?);
//! #
//! # Ok::<(), quadmap::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all, missing_docs)]
#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]

mod any_map;

mod r#abstract;

mod avl;
mod chained;
mod config;
mod dictionary;
mod error;
mod metrics;

#[doc(hidden)]
pub mod prime;

mod probing;
mod rbt;

pub mod words;

pub use {
    any_map::AnyMap,
    avl::AvlMap,
    chained::ChainedHashMap,
    config::{Config, MapKind},
    dictionary::Dictionary,
    error::{Error, Result},
    probing::ProbingHashMap,
    r#abstract::{AbstractMap, Maintenance},
    rbt::{Color, RbMap},
};
