// Copyright (c) 2025-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::{
    footer::{Footer, FOOTER_SIZE},
    format::BucketLayout,
    properties::{PropertiesBlock, TableProperties},
};
use crate::{
    coding::Decode,
    file::ReadAt,
    key::{InternalKeyRef, TRAILER_LEN},
    Checksum, HashStrategy, InternalKey, InternalValue, ValueType,
};
use std::{fs::File, path::Path};

/// Reads `buf.len()` bytes at `offset`, treating a short read as corruption.
fn read_at<R: ReadAt>(file: &R, buf: &mut [u8], offset: u64) -> crate::Result<()> {
    file.read_exact_at(buf, offset).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            log::error!("Unexpected end of cuckoo table file at offset {offset}");
            crate::Error::Corruption("file is shorter than expected")
        } else {
            e.into()
        }
    })
}

/// Point-read access to a cuckoo table
///
/// A reader only exists if the file passed validation in [`Reader::open`].
/// Lookups do not mutate any state, so a reader can be shared between threads.
pub struct Reader<R: ReadAt, H: HashStrategy> {
    file: R,
    file_size: u64,
    hasher: H,

    properties: TableProperties,
    layout: BucketLayout,
}

impl<R: ReadAt, H: HashStrategy> std::fmt::Debug for Reader<R, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CuckooTable({} bytes, {} items)",
            self.file_size, self.properties.item_count,
        )
    }
}

impl<H: HashStrategy> Reader<File, H> {
    /// Opens a table file from disk.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs, or the file is corrupted.
    pub fn open_path<P: AsRef<Path>>(path: P, hasher: H) -> crate::Result<Self> {
        let path = path.as_ref();

        log::debug!("Opening cuckoo table at {}", path.display());

        let file = File::open(path)?;
        let file_size = file.metadata()?.len();

        Self::open(file, file_size, hasher)
    }
}

impl<R: ReadAt, H: HashStrategy> Reader<R, H> {
    /// Opens a table, validating its footer and properties.
    ///
    /// `hasher` has to be the hash strategy the table was built with.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs, or the file is corrupted.
    pub fn open(file: R, file_size: u64, hasher: H) -> crate::Result<Self> {
        use crate::Error::Corruption;

        let Some(footer_offset) = file_size.checked_sub(FOOTER_SIZE as u64) else {
            log::error!("Cuckoo table of {file_size} bytes is too small to hold a footer");
            return Err(Corruption("file is too small"));
        };

        let mut footer = [0; FOOTER_SIZE];
        read_at(&file, &mut footer, footer_offset)?;
        let footer = Footer::decode_from(&mut &footer[..])?;

        log::trace!("Read cuckoo table footer: {footer:?}");

        if footer.expected_file_size() != Some(file_size) {
            log::error!(
                "Cuckoo table footer {footer:?} does not match file size of {file_size} bytes",
            );
            return Err(Corruption("footer does not match file size"));
        }

        let mut properties = vec![0; footer.properties_len as usize];
        read_at(&file, &mut properties, footer.properties_offset)?;

        Checksum::from_raw(u128::from(xxhash_rust::xxh3::xxh3_64(&properties))).check(
            Checksum::from_raw(u128::from(footer.properties_checksum)),
        )?;

        let mut reader = &properties[..];
        let block = PropertiesBlock::decode_from(&mut reader)?;

        if !reader.is_empty() {
            return Err(Corruption("trailing bytes after properties"));
        }

        let properties = TableProperties::from_block(&block)?;
        let layout = properties.layout();

        if layout.data_size() != Some(footer.properties_offset) {
            log::error!(
                "Cuckoo table bucket array should be {:?} bytes, but properties start at {}",
                layout.data_size(),
                footer.properties_offset,
            );
            return Err(Corruption("bucket array size does not match properties"));
        }

        log::trace!("Opened cuckoo table: {properties:?}");

        Ok(Self {
            file,
            file_size,
            hasher,
            properties,
            layout,
        })
    }

    /// Returns the table properties.
    #[must_use]
    pub fn properties(&self) -> &TableProperties {
        &self.properties
    }

    /// Returns the size of the table file.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Length of a user key in this table
    fn user_key_length(&self) -> usize {
        if self.properties.is_last_level {
            self.layout.key_length
        } else {
            self.layout.key_length - TRAILER_LEN
        }
    }

    /// Looks up a key.
    ///
    /// `key` is an encoded internal key, only its user key is used for the lookup.
    /// For last-level tables, `key` is the bare user key, and the returned item
    /// always has sequence number 0 and type [`ValueType::Value`].
    ///
    /// Passing an encoded internal key to a last-level table does not fail:
    /// the key length does not match, so the lookup returns `None`. Check
    /// [`TableProperties::is_last_level`] before querying tables of mixed kinds.
    ///
    /// # Errors
    ///
    /// Will return `Err` if `key` is not a valid internal key, the table is
    /// corrupted, or an IO error occurs.
    pub fn get(&self, key: &[u8]) -> crate::Result<Option<InternalValue>> {
        let user_key = if self.properties.is_last_level {
            key
        } else {
            InternalKeyRef::decode(key)?.user_key
        };

        if user_key.len() != self.user_key_length() {
            return Ok(None);
        }

        let key_length = self.layout.key_length;
        let unused_key = &self.properties.unused_key;

        let mut block = vec![0; self.layout.block_len()];

        for probe in 0..self.properties.num_hash_funcs {
            let start = self.layout.block_start(&self.hasher, user_key, probe);
            read_at(&self.file, &mut block, self.layout.slot_offset(start))?;

            for slot in block.chunks_exact(self.layout.slot_len()) {
                let (stored_key, value) = slot.split_at(key_length);

                // Placement fills blocks front to back and hash functions in order,
                // so an empty slot means the key cannot be in any later slot either
                if stored_key == unused_key.as_slice() {
                    return Ok(None);
                }

                if self.properties.is_last_level {
                    if stored_key == user_key {
                        return Ok(Some(InternalValue::from_components(
                            user_key,
                            value,
                            0,
                            ValueType::Value,
                        )));
                    }
                } else if crate::key::extract_user_key(stored_key) == user_key {
                    let key = InternalKey::decode(stored_key)?;
                    return Ok(Some(InternalValue::new(key, value)));
                }
            }
        }

        Ok(None)
    }

    /// Calculates the checksum of the whole file.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn checksum(&self) -> crate::Result<Checksum> {
        const CHUNK_SIZE: u64 = 64 * 1_024;

        let mut hasher = xxhash_rust::xxh3::Xxh3Default::new();
        let mut buf = vec![0; CHUNK_SIZE as usize];
        let mut offset = 0;

        while offset < self.file_size {
            let len = CHUNK_SIZE.min(self.file_size - offset);

            #[expect(clippy::indexing_slicing, reason = "len <= CHUNK_SIZE")]
            #[expect(clippy::cast_possible_truncation, reason = "len <= CHUNK_SIZE")]
            let chunk = &mut buf[..len as usize];

            read_at(&self.file, chunk, offset)?;
            hasher.update(chunk);

            offset += len;
        }

        Ok(Checksum::from_raw(hasher.digest128()))
    }

    /// Checks the file against a checksum returned by the builder.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the checksum does not match, or an IO error occurs.
    pub fn verify_checksum(&self, expected: Checksum) -> crate::Result<()> {
        let got = self.checksum()?;

        if let Err(e) = got.check(expected) {
            log::error!("Cuckoo table checksum mismatch: got {got}, expected {expected}");
            return Err(e);
        }

        Ok(())
    }
}
