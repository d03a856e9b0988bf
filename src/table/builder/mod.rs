// Copyright (c) 2025-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

mod placement;
mod unused_key;

use super::{
    footer::{Footer, FOOTER_SIZE},
    format::BucketLayout,
    properties::TableProperties,
};
use crate::{
    checksum::ChecksummedWriter,
    coding::Encode,
    file::fsync_directory,
    key::{extract_user_key, InternalKeyRef, TRAILER_LEN},
    time::unix_timestamp,
    BuildFailure, Checksum, Config, HashSet, HashStrategy, InternalKey, ValueType,
};
use placement::Placer;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use unused_key::find_unused_key;

/// Outcome of a successful build
struct Built {
    checksum: Checksum,
    file_size: u64,
    num_hash_funcs: u32,
}

/// Builds an immutable cuckoo table
///
/// Entries are buffered in memory and may be added in any order. The whole
/// table is placed and written in [`Builder::finish`].
///
/// The first error of any call is recorded; afterwards every call returns that
/// error without doing anything (see [`Builder::status`]).
///
/// # Examples
///
/// ```
/// use cuckoo_table::{Builder, Config, InternalKey, ValueType, Xxh3HashStrategy};
/// use cuckoo_table::coding::Encode;
///
/// let mut builder = Builder::new(Vec::new(), Config::new(12, 1), Xxh3HashStrategy::default());
///
/// for (idx, key) in ["abcd", "efgh"].into_iter().enumerate() {
///     let key = InternalKey::new(key, idx as u64, ValueType::Value).encode_into_vec();
///     builder.add(&key, b"v")?;
/// }
///
/// builder.finish()?;
/// assert!(builder.file_size().is_some());
/// #
/// # Ok::<(), cuckoo_table::Error>(())
/// ```
pub struct Builder<W: Write, H: HashStrategy> {
    writer: W,
    config: Config,
    hasher: H,

    /// Set if the builder writes to a file created by [`Builder::create`]
    path: Option<PathBuf>,

    /// Buffered entries, every entry is `key_length + value_length` bytes
    entries: Vec<u8>,
    num_entries: usize,

    status: crate::Result<()>,
    finished: bool,

    file_size: Option<u64>,
    num_hash_funcs_used: Option<u32>,
}

impl<H: HashStrategy> Builder<BufWriter<File>, H> {
    /// Creates a new table file and a builder writing into it.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the file already exists, or an IO error occurs.
    pub fn create<P: AsRef<Path>>(path: P, config: Config, hasher: H) -> crate::Result<Self> {
        let path = path.as_ref();
        let file = File::create_new(path)?;

        log::debug!("Creating cuckoo table at {}", path.display());

        let mut builder = Self::new(
            BufWriter::with_capacity(u16::MAX.into(), file),
            config,
            hasher,
        );
        builder.path = Some(path.to_path_buf());

        Ok(builder)
    }

    /// Syncs a finished table file and its parent folder to disk.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the table was not finished successfully, or an IO error occurs.
    pub fn close(self) -> crate::Result<()> {
        self.status.clone()?;

        if self.file_size.is_none() {
            return Err(crate::Error::InvalidArgument("table is not finished"));
        }

        let file = self.writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;

        if let Some(folder) = self.path.as_deref().and_then(Path::parent) {
            fsync_directory(folder)?;
        }

        Ok(())
    }
}

impl<W: Write, H: HashStrategy> Builder<W, H> {
    /// Creates a builder that writes the table into `writer`.
    ///
    /// An invalid config is recorded in the builder status.
    pub fn new(writer: W, config: Config, hasher: H) -> Self {
        let status = config.validate();

        if let Err(e) = &status {
            log::error!("Invalid cuckoo table config {config:?}: {e}");
        }

        Self {
            writer,
            config,
            hasher,
            path: None,
            entries: Vec::new(),
            num_entries: 0,
            status,
            finished: false,
            file_size: None,
            num_hash_funcs_used: None,
        }
    }

    /// Returns the first error that occurred, if any.
    ///
    /// # Errors
    ///
    /// Returns the recorded error.
    pub fn status(&self) -> crate::Result<()> {
        self.status.clone()
    }

    /// Returns the number of buffered entries.
    #[must_use]
    pub fn num_entries(&self) -> usize {
        self.num_entries
    }

    /// Returns the size of the written table, once [`Builder::finish`] succeeded.
    #[must_use]
    pub fn file_size(&self) -> Option<u64> {
        self.file_size
    }

    /// Returns the number of hash functions the finished table uses.
    #[must_use]
    pub fn num_hash_funcs_used(&self) -> Option<u32> {
        self.num_hash_funcs_used
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn record<T>(&mut self, result: crate::Result<T>) -> crate::Result<T> {
        if let Err(e) = &result {
            if self.status.is_ok() {
                self.status = Err(e.clone());
            }
        }
        result
    }

    fn check_entry(&self, key: &[u8], value: &[u8]) -> crate::Result<()> {
        use crate::Error::InvalidArgument;

        if self.finished {
            return Err(InvalidArgument("builder is already finished"));
        }

        if key.len() != self.config.key_length {
            return Err(InvalidArgument("key length does not match table key length"));
        }

        if value.len() != self.config.value_length {
            return Err(InvalidArgument("value length does not match table value length"));
        }

        let parsed = InternalKeyRef::decode(key)
            .map_err(|_| InvalidArgument("key is not a valid internal key"))?;

        if self.config.is_last_level && parsed.value_type != ValueType::Value {
            return Err(InvalidArgument("last-level tables can only store values"));
        }

        if self.num_entries >= u32::MAX as usize {
            return Err(InvalidArgument("too many entries"));
        }

        Ok(())
    }

    /// Buffers an entry.
    ///
    /// `key` is an encoded internal key.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the key or value length differs from the config,
    /// the key is not a valid internal key, the builder is already finished,
    /// or a previous call failed.
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> crate::Result<()> {
        self.status.clone()?;

        let result = self.check_entry(key, value);
        self.record(result)?;

        self.entries.extend_from_slice(key);
        self.entries.extend_from_slice(value);
        self.num_entries += 1;

        Ok(())
    }

    /// Places all entries and writes the table.
    ///
    /// Returns the checksum of the whole written file.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the entries cannot be placed, two entries share a
    /// user key, the builder is already finished, a previous call failed, or an
    /// IO error occurs.
    pub fn finish(&mut self) -> crate::Result<Checksum> {
        self.status.clone()?;

        if self.finished {
            return self.record(Err(crate::Error::InvalidArgument(
                "builder is already finished",
            )));
        }
        self.finished = true;

        let result = write_table(
            &mut self.writer,
            &self.config,
            &self.hasher,
            &self.entries,
        );

        // Entries are not needed anymore, whatever the outcome
        self.entries = Vec::new();

        let built = self.record(result)?;

        self.file_size = Some(built.file_size);
        self.num_hash_funcs_used = Some(built.num_hash_funcs);

        Ok(built.checksum)
    }
}

#[expect(
    clippy::indexing_slicing,
    reason = "entries are validated to be exactly key_length + value_length long"
)]
fn write_table<W: Write, H: HashStrategy>(
    writer: &mut W,
    config: &Config,
    hasher: &H,
    entries: &[u8],
) -> crate::Result<Built> {
    let key_length = config.key_length;
    let entry_len = key_length + config.value_length;
    let stored_key_length = config.stored_key_length();

    let entries = entries.chunks_exact(entry_len).collect::<Vec<_>>();

    let layout = BucketLayout::for_item_count(
        entries.len(),
        config.hash_table_ratio,
        config.cuckoo_block_size,
        stored_key_length,
        config.value_length,
    );

    let user_keys = entries
        .iter()
        .map(|entry| extract_user_key(&entry[..key_length]))
        .collect::<Vec<_>>();

    {
        let mut seen = HashSet::default();
        seen.reserve(user_keys.len());

        if !user_keys.iter().all(|key| seen.insert(*key)) {
            return Err(crate::Error::InvalidArgument("duplicate user key"));
        }
    }

    let unused_user_key = find_unused_key(user_keys.iter().copied(), key_length - TRAILER_LEN)
        .ok_or(BuildFailure::KeyspaceExhausted)?;

    let unused_key = if config.is_last_level {
        unused_user_key
    } else {
        InternalKey::new(unused_user_key, 0, ValueType::Value).encode_into_vec()
    };
    debug_assert_eq!(stored_key_length, unused_key.len());

    // All properties are fixed width, so the block can be sized before placement
    #[expect(clippy::cast_possible_truncation, reason = "validated by config")]
    let mut properties = TableProperties {
        num_buckets: layout.num_buckets,
        num_hash_funcs: config.max_num_hash_funcs,
        hash_table_ratio: config.hash_table_ratio,
        cuckoo_block_size: config.cuckoo_block_size,
        is_last_level: config.is_last_level,
        unused_key,
        key_length: stored_key_length as u32,
        value_length: config.value_length as u32,
        item_count: entries.len() as u64,
        created_at: unix_timestamp().as_nanos(),
    };
    let properties_len = properties.to_block().encode_into_vec().len();

    let required = layout
        .data_size()
        .and_then(|size| size.checked_add((properties_len + FOOTER_SIZE) as u64))
        .unwrap_or(u64::MAX);

    if required > config.max_file_size {
        log::warn!(
            "Cuckoo table with {} entries needs {required} bytes, but is limited to {}",
            entries.len(),
            config.max_file_size,
        );

        return Err(BuildFailure::TableTooLarge {
            required,
            max: config.max_file_size,
        }
        .into());
    }

    let placement = Placer::new(layout, hasher, &user_keys, config.max_search_depth)
        .run(config.max_num_hash_funcs.min(2), config.max_num_hash_funcs)?;

    let mut writer = ChecksummedWriter::new(writer);
    let empty_value = vec![0; config.value_length];

    for slot in &placement.slots {
        match slot {
            Some(idx) => {
                let entry = entries[*idx as usize];
                let (key, value) = entry.split_at(key_length);

                writer.write_all(&key[..stored_key_length])?;
                writer.write_all(value)?;
            }
            None => {
                writer.write_all(&properties.unused_key)?;
                writer.write_all(&empty_value)?;
            }
        }
    }

    let properties_offset = writer.position();
    debug_assert_eq!(layout.data_size(), Some(properties_offset));

    properties.num_hash_funcs = placement.num_hash_funcs;
    let properties = properties.to_block().encode_into_vec();
    debug_assert_eq!(properties_len, properties.len());

    let footer = Footer {
        properties_offset,
        properties_len: u32::try_from(properties.len())
            .map_err(|_| crate::Error::InvalidArgument("properties block too large"))?,
        properties_checksum: xxhash_rust::xxh3::xxh3_64(&properties),
    };

    writer.write_all(&properties)?;
    footer.encode_into(&mut writer)?;
    writer.flush()?;

    let file_size = writer.position();
    let checksum = writer.checksum();

    log::debug!(
        "Built cuckoo table with {} entries in {} buckets using {} hash function(s), {file_size} bytes, checksum {checksum}",
        entries.len(),
        layout.num_buckets,
        placement.num_hash_funcs,
    );

    Ok(Built {
        checksum,
        file_size,
        num_hash_funcs: placement.num_hash_funcs,
    })
}
