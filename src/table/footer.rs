// Copyright (c) 2025-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    coding::{Decode, DecodeError, Encode, EncodeError},
    file::MAGIC_BYTES,
};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Size of the footer in bytes: 8 (offset) + 4 (len) + 8 (checksum) + 8 (magic)
pub const FOOTER_SIZE: usize = 28;

/// Fixed-size footer at the end of a cuckoo table file
///
/// ```text
/// ----------------
/// |   buckets    | <- implicitly start at 0
/// |--------------|
/// |  properties  |
/// |--------------|
/// |    footer    | <- fixed size
/// ----------------
/// ```
///
/// ## Format
///
/// \[properties_offset: u64\] \[properties_len: u32\] \[properties_checksum: u64\] \[magic\]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Footer {
    /// File offset of the properties block, which is also the size of the bucket array
    pub properties_offset: u64,

    /// Size of the properties block
    pub properties_len: u32,

    /// XXH3 hash of the encoded properties block
    pub properties_checksum: u64,
}

impl Footer {
    /// Returns the file size this footer implies.
    pub fn expected_file_size(&self) -> Option<u64> {
        self.properties_offset
            .checked_add(u64::from(self.properties_len))?
            .checked_add(FOOTER_SIZE as u64)
    }
}

impl Encode for Footer {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_u64::<LittleEndian>(self.properties_offset)?;
        writer.write_u32::<LittleEndian>(self.properties_len)?;
        writer.write_u64::<LittleEndian>(self.properties_checksum)?;
        writer.write_all(&MAGIC_BYTES)?;
        Ok(())
    }
}

impl Decode for Footer {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let properties_offset = reader.read_u64::<LittleEndian>()?;
        let properties_len = reader.read_u32::<LittleEndian>()?;
        let properties_checksum = reader.read_u64::<LittleEndian>()?;

        // Check trailer magic
        let mut magic = [0u8; MAGIC_BYTES.len()];
        reader.read_exact(&mut magic)?;

        if magic != MAGIC_BYTES {
            return Err(DecodeError::InvalidTrailer);
        }

        Ok(Self {
            properties_offset,
            properties_len,
            properties_checksum,
        })
    }
}
