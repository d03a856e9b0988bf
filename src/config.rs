// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::key::TRAILER_LEN;

/// Table builder configuration
///
/// # Examples
///
/// ```
/// use cuckoo_table::Config;
///
/// // 16 byte internal keys (8 bytes user key), 4 byte values
/// let config = Config::new(16, 4)
///     .hash_table_ratio(0.75)
///     .cuckoo_block_size(3)
///     .last_level(true);
///
/// assert_eq!(8, config.stored_key_length());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Length of every internal key passed to the builder
    #[doc(hidden)]
    pub key_length: usize,

    /// Length of every value passed to the builder
    #[doc(hidden)]
    pub value_length: usize,

    /// Target load factor of the bucket array
    #[doc(hidden)]
    pub hash_table_ratio: f64,

    /// Upper bound for the table file size in bytes
    #[doc(hidden)]
    pub max_file_size: u64,

    /// Highest number of hash functions the builder may try
    #[doc(hidden)]
    pub max_num_hash_funcs: u32,

    /// Number of consecutive buckets examined per hash function
    #[doc(hidden)]
    pub cuckoo_block_size: u32,

    /// Longest eviction chain before a placement attempt is abandoned
    #[doc(hidden)]
    pub max_search_depth: u32,

    /// Whether sequence numbers and value types are stripped from stored keys
    #[doc(hidden)]
    pub is_last_level: bool,
}

impl Config {
    /// Initializes a new config for fixed-length keys and values.
    ///
    /// `key_length` is the length of the *internal* key, i.e. the user key plus
    /// the 8-byte sequence number & value type trailer.
    #[must_use]
    pub fn new(key_length: usize, value_length: usize) -> Self {
        Self {
            key_length,
            value_length,
            hash_table_ratio: 0.9,
            max_file_size: u64::MAX,
            max_num_hash_funcs: 64,
            cuckoo_block_size: 5,
            max_search_depth: 100,
            is_last_level: false,
        }
    }

    /// Sets the target load factor.
    ///
    /// Must be in (0.0, 1.0]. Lower ratios build faster and use more hash
    /// functions less often, at the cost of a bigger file.
    ///
    /// Default = 0.9
    #[must_use]
    pub fn hash_table_ratio(mut self, ratio: f64) -> Self {
        self.hash_table_ratio = ratio;
        self
    }

    /// Sets the maximum size of the table file.
    ///
    /// The bound covers the bucket array, the properties block and the footer.
    ///
    /// Default = unlimited
    #[must_use]
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Sets the maximum number of hash functions.
    ///
    /// Every lookup may probe up to that many blocks.
    ///
    /// Default = 64
    #[must_use]
    pub fn max_num_hash_funcs(mut self, n: u32) -> Self {
        self.max_num_hash_funcs = n;
        self
    }

    /// Sets the cuckoo block size.
    ///
    /// Default = 5
    #[must_use]
    pub fn cuckoo_block_size(mut self, n: u32) -> Self {
        self.cuckoo_block_size = n;
        self
    }

    /// Sets the maximum eviction chain length.
    ///
    /// Default = 100
    #[must_use]
    pub fn max_search_depth(mut self, depth: u32) -> Self {
        self.max_search_depth = depth;
        self
    }

    /// Marks the table as belonging to the last level.
    ///
    /// Last-level tables only store user keys.
    ///
    /// Default = false
    #[must_use]
    pub fn last_level(mut self, is_last_level: bool) -> Self {
        self.is_last_level = is_last_level;
        self
    }

    /// Returns the length of a key as it is stored in a bucket.
    #[must_use]
    pub fn stored_key_length(&self) -> usize {
        if self.is_last_level {
            self.key_length.saturating_sub(TRAILER_LEN)
        } else {
            self.key_length
        }
    }

    pub(crate) fn validate(&self) -> crate::Result<()> {
        use crate::Error::InvalidArgument;

        if self.key_length < TRAILER_LEN {
            return Err(InvalidArgument("key length is too short for an internal key"));
        }

        if self.key_length.saturating_add(self.value_length) > u32::MAX as usize {
            return Err(InvalidArgument("bucket size does not fit into u32"));
        }

        if self.stored_key_length() + self.value_length == 0 {
            return Err(InvalidArgument("buckets may not be empty"));
        }

        if !(self.hash_table_ratio > 0.0 && self.hash_table_ratio <= 1.0) {
            return Err(InvalidArgument("hash table ratio must be in (0.0, 1.0]"));
        }

        if self.max_num_hash_funcs == 0 {
            return Err(InvalidArgument("need at least one hash function"));
        }

        if self.cuckoo_block_size == 0 {
            return Err(InvalidArgument("cuckoo block size may not be 0"));
        }

        if self.max_search_depth == 0 {
            return Err(InvalidArgument("max search depth may not be 0"));
        }

        Ok(())
    }
}
