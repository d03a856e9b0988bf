// Copyright (c) 2025-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::format::BucketLayout;
use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::{
    collections::BTreeMap,
    io::{Read, Write},
};

/// Current table format version
pub const FORMAT_VERSION: u8 = 1;

/// Generic name -> bytes map, serialized sorted by name
///
/// ## Format
///
/// \[count: u32\] { \[name_len: u16\] \[name\] \[value_len: u32\] \[value\] }*
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PropertiesBlock(BTreeMap<String, Vec<u8>>);

impl PropertiesBlock {
    pub fn insert(&mut self, name: &str, value: impl Into<Vec<u8>>) {
        self.0.insert(name.to_owned(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.0.get(name).map(Vec::as_slice)
    }

    fn require(&self, name: &'static str) -> crate::Result<&[u8]> {
        self.get(name).ok_or_else(|| {
            log::error!("Table property {name:?} is missing");
            crate::Error::Corruption("missing table property")
        })
    }

    fn require_fixed<const N: usize>(&self, name: &'static str) -> crate::Result<[u8; N]> {
        self.require(name)?.try_into().map_err(|_| {
            log::error!("Table property {name:?} should be {N} bytes long");
            crate::Error::Corruption("table property has invalid length")
        })
    }

    fn read_u8(&self, name: &'static str) -> crate::Result<u8> {
        self.require_fixed::<1>(name).map(u8::from_le_bytes)
    }

    fn read_u32(&self, name: &'static str) -> crate::Result<u32> {
        self.require_fixed::<4>(name).map(u32::from_le_bytes)
    }

    fn read_u64(&self, name: &'static str) -> crate::Result<u64> {
        self.require_fixed::<8>(name).map(u64::from_le_bytes)
    }

    fn read_f64(&self, name: &'static str) -> crate::Result<f64> {
        self.require_fixed::<8>(name).map(f64::from_le_bytes)
    }
}

impl Encode for PropertiesBlock {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        let count =
            u32::try_from(self.0.len()).map_err(|_| EncodeError::TooLong("property count"))?;

        writer.write_u32::<LittleEndian>(count)?;

        for (name, value) in &self.0 {
            let name_len =
                u16::try_from(name.len()).map_err(|_| EncodeError::TooLong("property name"))?;
            let value_len =
                u32::try_from(value.len()).map_err(|_| EncodeError::TooLong("property value"))?;

            writer.write_u16::<LittleEndian>(name_len)?;
            writer.write_all(name.as_bytes())?;
            writer.write_u32::<LittleEndian>(value_len)?;
            writer.write_all(value)?;
        }

        Ok(())
    }
}

impl Decode for PropertiesBlock {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let count = reader.read_u32::<LittleEndian>()?;

        let mut map = BTreeMap::new();

        for _ in 0..count {
            let name_len = reader.read_u16::<LittleEndian>()?;
            let mut name = vec![0; name_len.into()];
            reader.read_exact(&mut name)?;
            let name = std::str::from_utf8(&name)?.to_owned();

            let value_len = reader.read_u32::<LittleEndian>()?;
            let mut value = Vec::new();
            (&mut *reader)
                .take(u64::from(value_len))
                .read_to_end(&mut value)?;

            if value.len() != value_len as usize {
                return Err(DecodeError::Truncated("PropertiesBlock"));
            }

            map.insert(name, value);
        }

        Ok(Self(map))
    }
}

/// Metadata needed to reopen a cuckoo table
#[derive(Clone, Debug, PartialEq)]
pub struct TableProperties {
    /// Number of addressable buckets
    pub num_buckets: u64,

    /// Number of hash functions the builder ended up using
    pub num_hash_funcs: u32,

    /// Target load factor the table was built with
    pub hash_table_ratio: f64,

    /// Number of consecutive buckets probed per hash function
    pub cuckoo_block_size: u32,

    /// Whether stored keys are bare user keys
    pub is_last_level: bool,

    /// Byte pattern that marks empty buckets
    pub unused_key: Vec<u8>,

    /// Length of a key as stored in a bucket
    pub key_length: u32,

    /// Length of a value
    pub value_length: u32,

    /// Number of stored entries
    pub item_count: u64,

    /// Creation time in nanoseconds since the Unix epoch
    pub created_at: u128,
}

impl TableProperties {
    pub(crate) fn layout(&self) -> BucketLayout {
        BucketLayout {
            num_buckets: self.num_buckets,
            cuckoo_block_size: self.cuckoo_block_size,
            key_length: self.key_length as usize,
            value_length: self.value_length as usize,
        }
    }

    pub(crate) fn to_block(&self) -> PropertiesBlock {
        let mut block = PropertiesBlock::default();

        block.insert("crate_version", env!("CARGO_PKG_VERSION").as_bytes());
        block.insert("created_at", self.created_at.to_le_bytes());
        block.insert("cuckoo_block_size", self.cuckoo_block_size.to_le_bytes());
        block.insert("format_version", [FORMAT_VERSION]);
        block.insert("hash_table_ratio", self.hash_table_ratio.to_le_bytes());
        block.insert("is_last_level", [u8::from(self.is_last_level)]);
        block.insert("item_count", self.item_count.to_le_bytes());
        block.insert("key_length", self.key_length.to_le_bytes());
        block.insert("num_buckets", self.num_buckets.to_le_bytes());
        block.insert("num_hash_funcs", self.num_hash_funcs.to_le_bytes());
        block.insert("unused_key", self.unused_key.clone());
        block.insert("value_length", self.value_length.to_le_bytes());

        block
    }

    /// Parses and validates the properties of a table.
    pub(crate) fn from_block(block: &PropertiesBlock) -> crate::Result<Self> {
        use crate::Error::Corruption;

        let format_version = block.read_u8("format_version")?;
        if format_version != FORMAT_VERSION {
            log::error!("Unsupported cuckoo table format version {format_version}");
            return Err(crate::Error::Decode(DecodeError::InvalidVersion));
        }

        let is_last_level = match block.read_u8("is_last_level")? {
            0 => false,
            1 => true,
            x => return Err(crate::Error::Decode(DecodeError::InvalidTag(("is_last_level", x)))),
        };

        let created_at = block
            .get("created_at")
            .and_then(|bytes| <[u8; 16]>::try_from(bytes).ok())
            .map(u128::from_le_bytes)
            .unwrap_or_default();

        let props = Self {
            num_buckets: block.read_u64("num_buckets")?,
            num_hash_funcs: block.read_u32("num_hash_funcs")?,
            hash_table_ratio: block.read_f64("hash_table_ratio")?,
            cuckoo_block_size: block.read_u32("cuckoo_block_size")?,
            is_last_level,
            unused_key: block.require("unused_key")?.to_vec(),
            key_length: block.read_u32("key_length")?,
            value_length: block.read_u32("value_length")?,
            item_count: block.read_u64("item_count")?,
            created_at,
        };

        if props.num_buckets == 0 {
            return Err(Corruption("bucket count is 0"));
        }

        if props.num_hash_funcs == 0 {
            return Err(Corruption("hash function count is 0"));
        }

        if props.cuckoo_block_size == 0 {
            return Err(Corruption("cuckoo block size is 0"));
        }

        if !(props.hash_table_ratio > 0.0 && props.hash_table_ratio <= 1.0) {
            return Err(Corruption("hash table ratio out of range"));
        }

        if props.unused_key.len() != props.key_length as usize {
            return Err(Corruption("unused key length does not match key length"));
        }

        if !props.is_last_level && (props.key_length as usize) < crate::key::TRAILER_LEN {
            return Err(Corruption("key length too short for internal keys"));
        }

        if props.layout().slot_len() == 0 {
            return Err(Corruption("bucket size is 0"));
        }

        if props.item_count > props.layout().slot_count() {
            return Err(Corruption("more items than buckets"));
        }

        Ok(props)
    }
}
