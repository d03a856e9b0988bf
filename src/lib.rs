// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Immutable, read-optimized cuckoo hash table files.
//!
//! ##### About
//!
//! A cuckoo table stores fixed-length keys and values in a flat array of
//! buckets. Every key has a small number of candidate locations (one block of
//! consecutive buckets per hash function), and the builder moves keys around
//! until every key sits in one of its candidate blocks.
//!
//! Point reads therefore need at most `num_hash_funcs` block reads, without any
//! index or filter blocks. There are no range scans.
//!
//! Building is more expensive: if the keys cannot be placed with a given number
//! of hash functions, placement is retried with one more hash function.
//!
//! Tables are meant to be written once, typically for the last level of an
//! LSM-tree, and read many times.
//!
//! # Example usage
//!
//! ```
//! use cuckoo_table::{coding::Encode, Builder, Config, InternalKey, Reader, ValueType, Xxh3HashStrategy};
//!
//! let folder = tempfile::tempdir()?;
//! let path = folder.path().join("table");
//!
//! // 8 byte user keys + 8 byte trailer, 5 byte values
//! let config = Config::new(16, 5);
//!
//! let mut builder = Builder::create(&path, config, Xxh3HashStrategy::default())?;
//!
//! for i in 0..100u64 {
//!     let key = InternalKey::new(i.to_be_bytes(), i, ValueType::Value);
//!     builder.add(&key.encode_into_vec(), b"hello")?;
//! }
//!
//! let checksum = builder.finish()?;
//! builder.close()?;
//!
//! let reader = Reader::open_path(&path, Xxh3HashStrategy::default())?;
//! reader.verify_checksum(checksum)?;
//!
//! let key = InternalKey::new(42u64.to_be_bytes(), 0, ValueType::Value);
//! let item = reader.get(&key.encode_into_vec())?.expect("should exist");
//! assert_eq!(42, item.key.seqno);
//! assert_eq!(b"hello", &*item.value);
//!
//! let key = InternalKey::new(1_000u64.to_be_bytes(), 0, ValueType::Value);
//! assert!(reader.get(&key.encode_into_vec())?.is_none());
//! #
//! # Ok::<(), cuckoo_table::Error>(())
//! ```

#![deny(clippy::all, missing_docs, clippy::cargo)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::indexing_slicing)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![warn(clippy::multiple_crate_versions)]
#![allow(clippy::option_if_let_else)]
#![warn(clippy::redundant_feature_names)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub(crate) type HashSet<K> = std::collections::HashSet<K, rustc_hash::FxBuildHasher>;

mod checksum;

#[doc(hidden)]
pub mod coding;

mod config;

mod error;
mod file;
mod hash;
mod key;
mod slice;
mod table;
mod time;
mod value;
mod value_type;

pub use {
    checksum::Checksum,
    config::Config,
    error::{BuildFailure, Error, Result},
    file::ReadAt,
    hash::{HashStrategy, Xxh3HashStrategy},
    key::InternalKey,
    slice::Slice,
    table::{Builder, Reader, TableProperties},
    value::{InternalValue, SeqNo, UserKey, UserValue},
    value_type::ValueType,
};

#[doc(hidden)]
#[must_use]
#[allow(missing_docs, clippy::missing_errors_doc, clippy::unwrap_used)]
pub fn get_tmp_folder() -> tempfile::TempDir {
    if let Ok(p) = std::env::var("CUCKOO_TMP_FOLDER") {
        tempfile::tempdir_in(p)
    } else {
        tempfile::tempdir()
    }
    .unwrap()
}
