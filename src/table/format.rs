// Copyright (c) 2025-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::HashStrategy;

/// Geometry of the bucket array
///
/// ```text
/// | slot 0 | slot 1 | ... | slot num_buckets - 1 | overflow slots (block size - 1) |
/// ```
///
/// A hash function maps a key to a bucket in `0..num_buckets`; the cuckoo block
/// starting at that bucket spans `cuckoo_block_size` consecutive slots. The
/// overflow slots at the end make sure no block ever wraps around.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BucketLayout {
    /// Number of addressable buckets (the hash table size)
    pub num_buckets: u64,

    /// Number of consecutive slots per block
    pub cuckoo_block_size: u32,

    /// Length of a key as stored in a slot
    pub key_length: usize,

    /// Length of a value
    pub value_length: usize,
}

impl BucketLayout {
    /// Sizes the bucket array for `item_count` entries at the given load factor.
    ///
    /// The bucket count is rounded up to a multiple of the block size.
    pub fn for_item_count(
        item_count: usize,
        hash_table_ratio: f64,
        cuckoo_block_size: u32,
        key_length: usize,
        value_length: usize,
    ) -> Self {
        debug_assert!(hash_table_ratio > 0.0 && hash_table_ratio <= 1.0);
        debug_assert!(cuckoo_block_size > 0);

        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss,
            reason = "bucket count is positive and far below 2^52"
        )]
        let num_buckets = ((item_count as f64) / hash_table_ratio).ceil() as u64;

        let block = u64::from(cuckoo_block_size);
        let num_buckets = num_buckets.max(1).div_ceil(block) * block;

        Self {
            num_buckets,
            cuckoo_block_size,
            key_length,
            value_length,
        }
    }

    /// Returns the size of a single slot in bytes.
    pub fn slot_len(&self) -> usize {
        self.key_length + self.value_length
    }

    /// Returns the number of physical slots, including the overflow slots.
    pub fn slot_count(&self) -> u64 {
        self.num_buckets
            .saturating_add(u64::from(self.cuckoo_block_size) - 1)
    }

    /// Returns the size of the bucket array in bytes, if it fits into a `u64`.
    pub fn data_size(&self) -> Option<u64> {
        self.slot_count().checked_mul(self.slot_len() as u64)
    }

    /// Returns the file offset of a slot.
    pub fn slot_offset(&self, slot: u64) -> u64 {
        slot * self.slot_len() as u64
    }

    /// Returns the size of a cuckoo block in bytes.
    pub fn block_len(&self) -> usize {
        self.cuckoo_block_size as usize * self.slot_len()
    }

    /// Returns the first slot of the block the `probe`-th hash function maps the key to.
    pub fn block_start<H: HashStrategy + ?Sized>(
        &self,
        hasher: &H,
        user_key: &[u8],
        probe: u32,
    ) -> u64 {
        hasher.hash(user_key, probe, self.num_buckets) % self.num_buckets
    }
}
