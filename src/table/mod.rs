// Copyright (c) 2025-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Cuckoo hash table files
//!
//! ```text
//! ----------------------------
//! | bucket 0                 |
//! | ...                      |
//! | bucket num_buckets - 1   |
//! | overflow buckets         | <- cuckoo block size - 1
//! |--------------------------|
//! | properties               |
//! |--------------------------|
//! | footer                   |
//! ----------------------------
//! ```
//!
//! Every bucket is `key_length + value_length` bytes. Empty buckets contain the
//! table's unused key, which differs from every stored key.

pub(crate) mod builder;
pub(crate) mod footer;
pub(crate) mod format;
pub(crate) mod properties;
pub(crate) mod reader;

#[cfg(test)]
mod tests;

pub use builder::Builder;
pub use properties::TableProperties;
pub use reader::Reader;
