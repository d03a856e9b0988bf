// Copyright (c) 2025-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{table::format::BucketLayout, BuildFailure, HashSet, HashStrategy};

/// Index of a buffered entry
pub type EntryIdx = u32;

/// Result of a successful placement
#[derive(Debug)]
pub struct Placement {
    /// Entry stored in every physical slot, `None` if the slot stays empty
    pub slots: Vec<Option<EntryIdx>>,

    /// Number of hash functions needed to place every entry
    pub num_hash_funcs: u32,
}

/// Node of the breadth-first eviction search
#[derive(Copy, Clone, Debug)]
struct Node {
    slot: usize,
    parent: Option<usize>,
    depth: u32,
}

/// Assigns every key to a slot, so that each key sits in one of the blocks
/// of its first `num_hash_funcs` hash functions.
///
/// Placement upholds the invariant the reader relies on: if a key sits in the
/// block of hash function `i`, the blocks of functions `0..i` are completely
/// full, and so are the slots in front of it in its own block.
pub struct Placer<'a, H: HashStrategy + ?Sized> {
    layout: BucketLayout,
    hasher: &'a H,
    keys: &'a [&'a [u8]],
    max_search_depth: u32,

    /// Block start of every (probe, key), probe-major
    starts: Vec<usize>,
}

impl<'a, H: HashStrategy + ?Sized> Placer<'a, H> {
    pub fn new(
        layout: BucketLayout,
        hasher: &'a H,
        keys: &'a [&'a [u8]],
        max_search_depth: u32,
    ) -> Self {
        Self {
            layout,
            hasher,
            keys,
            max_search_depth,
            starts: Vec::new(),
        }
    }

    fn computed_probes(&self) -> usize {
        self.starts.len().checked_div(self.keys.len()).unwrap_or_default()
    }

    /// Hashes every key for the probes that have not been computed yet.
    fn extend_starts(&mut self, num_hash_funcs: u32) {
        for probe in self.computed_probes()..num_hash_funcs as usize {
            #[expect(clippy::cast_possible_truncation, reason = "probe < num_hash_funcs")]
            let probe = probe as u32;

            for key in self.keys {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "block start < num_buckets, which fits into the slot vector"
                )]
                let start = self.layout.block_start(self.hasher, key, probe) as usize;

                self.starts.push(start);
            }
        }
    }

    /// Returns the candidate slots of an entry, in probing order.
    fn candidates(&self, entry: EntryIdx, num_hash_funcs: u32) -> impl Iterator<Item = usize> + '_ {
        let n = self.keys.len();
        let block_size = self.layout.cuckoo_block_size as usize;

        (0..num_hash_funcs as usize)
            .filter_map(move |probe| self.starts.get(probe * n + entry as usize).copied())
            .flat_map(move |start| start..start + block_size)
    }

    /// Tries to place every key, starting with `min_hash_funcs` hash functions
    /// and using one more after every failed attempt.
    pub fn run(
        &mut self,
        min_hash_funcs: u32,
        max_hash_funcs: u32,
    ) -> Result<Placement, BuildFailure> {
        let slot_count = usize::try_from(self.layout.slot_count()).map_err(|_| {
            BuildFailure::TableTooLarge {
                required: self.layout.data_size().unwrap_or(u64::MAX),
                max: usize::MAX as u64,
            }
        })?;

        let min_hash_funcs = min_hash_funcs.clamp(1, max_hash_funcs.max(1));

        for num_hash_funcs in min_hash_funcs..=max_hash_funcs {
            self.extend_starts(num_hash_funcs);

            if let Some(slots) = self.attempt(slot_count, num_hash_funcs) {
                log::trace!(
                    "Placed {} entries into {slot_count} slots using {num_hash_funcs} hash function(s)",
                    self.keys.len(),
                );

                return Ok(Placement {
                    slots,
                    num_hash_funcs,
                });
            }

            log::trace!("Placement with {num_hash_funcs} hash function(s) failed, retrying");
        }

        log::warn!(
            "Could not place {} entries using up to {max_hash_funcs} hash function(s)",
            self.keys.len(),
        );

        Err(BuildFailure::PlacementFailed {
            num_hash_funcs: max_hash_funcs,
        })
    }

    /// Runs one full placement with a fixed number of hash functions.
    fn attempt(&self, slot_count: usize, num_hash_funcs: u32) -> Option<Vec<Option<EntryIdx>>> {
        let mut slots = vec![None; slot_count];

        for entry in 0..self.keys.len() {
            #[expect(clippy::cast_possible_truncation, reason = "entry count fits into u32")]
            let entry = entry as EntryIdx;

            let empty = self
                .candidates(entry, num_hash_funcs)
                .find(|&slot| matches!(slots.get(slot), Some(None)));

            if let Some(slot) = empty {
                if let Some(dst) = slots.get_mut(slot) {
                    *dst = Some(entry);
                }
                continue;
            }

            if !self.make_space(&mut slots, entry, num_hash_funcs) {
                return None;
            }
        }

        Some(slots)
    }

    /// Searches for the shortest eviction chain that frees one of the
    /// candidate slots of `entry`, and places `entry` there.
    ///
    /// Every candidate slot of `entry` is occupied when this is called.
    #[expect(
        clippy::indexing_slicing,
        reason = "nodes only reference slots yielded by candidates(), which are in bounds"
    )]
    fn make_space(
        &self,
        slots: &mut [Option<EntryIdx>],
        entry: EntryIdx,
        num_hash_funcs: u32,
    ) -> bool {
        let mut visited = HashSet::default();
        let mut nodes = Vec::new();

        for slot in self.candidates(entry, num_hash_funcs) {
            if visited.insert(slot) {
                nodes.push(Node {
                    slot,
                    parent: None,
                    depth: 0,
                });
            }
        }

        let mut cursor = 0;
        let mut found = None;

        'search: while let Some(&node) = nodes.get(cursor) {
            let parent = cursor;
            cursor += 1;

            if node.depth >= self.max_search_depth {
                continue;
            }

            let Some(occupant) = slots[node.slot] else {
                debug_assert!(false, "visited slots should be occupied");
                continue;
            };

            for slot in self.candidates(occupant, num_hash_funcs) {
                if !visited.insert(slot) {
                    continue;
                }

                nodes.push(Node {
                    slot,
                    parent: Some(parent),
                    depth: node.depth + 1,
                });

                if slots[slot].is_none() {
                    found = Some(nodes.len() - 1);
                    break 'search;
                }
            }
        }

        let Some(mut idx) = found else {
            log::trace!(
                "No eviction chain found for entry #{entry} after visiting {} slot(s)",
                visited.len(),
            );
            return false;
        };

        // Shift every occupant along the chain one step towards the free slot
        while let Some(parent) = nodes[idx].parent {
            slots[nodes[idx].slot] = slots[nodes[parent].slot];
            idx = parent;
        }

        slots[nodes[idx].slot] = Some(entry);

        true
    }
}
