// Copyright (c) 2025-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Increments a fixed-length big-endian byte string.
///
/// Returns `false` on overflow (all bytes were 0xFF).
fn increment(key: &mut [u8]) -> bool {
    for byte in key.iter_mut().rev() {
        if *byte == u8::MAX {
            *byte = 0;
        } else {
            *byte += 1;
            return true;
        }
    }

    false
}

/// Returns the smallest byte string of length `len` that is not contained in `keys`.
///
/// Walks the sorted keys, bumping the candidate past every key it collides with,
/// so this only fails if every possible key of that length is in use.
pub fn find_unused_key<'a>(keys: impl IntoIterator<Item = &'a [u8]>, len: usize) -> Option<Vec<u8>> {
    let mut keys = keys.into_iter().collect::<Vec<_>>();
    keys.sort_unstable();
    keys.dedup();

    let mut candidate = vec![0; len];

    for key in keys {
        debug_assert_eq!(len, key.len(), "keys should have fixed length");

        match key.cmp(&candidate) {
            std::cmp::Ordering::Less => {}
            std::cmp::Ordering::Equal => {
                if !increment(&mut candidate) {
                    return None;
                }
            }
            std::cmp::Ordering::Greater => break,
        }
    }

    Some(candidate)
}
