// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Maps a user key to its candidate bucket for a given probe
///
/// Builder and reader of a table have to use the same strategy (and seed),
/// otherwise lookups will silently miss. Which strategy was used is *not*
/// stored in the table file.
///
/// The returned value is reduced modulo `num_buckets` by the table, so an
/// implementation may return any `u64`.
///
/// Any `Fn(&[u8], u32, u64) -> u64` is a hash strategy, which makes it easy
/// to force a specific bucket layout in tests.
pub trait HashStrategy {
    /// Returns the bucket for the `probe`-th hash function.
    ///
    /// Has to be deterministic: the same inputs always produce the same bucket.
    fn hash(&self, user_key: &[u8], probe: u32, num_buckets: u64) -> u64;
}

impl<F> HashStrategy for F
where
    F: Fn(&[u8], u32, u64) -> u64,
{
    fn hash(&self, user_key: &[u8], probe: u32, num_buckets: u64) -> u64 {
        self(user_key, probe, num_buckets)
    }
}

/// Default hash strategy, based on seeded XXH3
///
/// Each probe uses a different seed, derived from the base seed.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Xxh3HashStrategy {
    seed: u64,
}

impl Xxh3HashStrategy {
    /// Creates a strategy with a custom base seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }
}

impl HashStrategy for Xxh3HashStrategy {
    fn hash(&self, user_key: &[u8], probe: u32, num_buckets: u64) -> u64 {
        debug_assert!(num_buckets > 0, "bucket count may not be 0");

        let seed = self
            .seed
            .wrapping_add(u64::from(probe).wrapping_mul(0x9E37_79B9_7F4A_7C15));

        xxhash_rust::xxh3::xxh3_64_with_seed(user_key, seed) % num_buckets.max(1)
    }
}
