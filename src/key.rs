// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    coding::{DecodeError, Encode, EncodeError},
    SeqNo, UserKey, ValueType,
};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Write;

/// Size of the packed `(seqno, value type)` suffix of an encoded internal key
pub const TRAILER_LEN: usize = std::mem::size_of::<u64>();

/// Highest sequence number that fits into the key trailer (56 bits)
pub const MAX_SEQNO: SeqNo = (1 << 56) - 1;

fn pack_trailer(seqno: SeqNo, value_type: ValueType) -> u64 {
    (seqno << 8) | u64::from(u8::from(value_type))
}

/// A user key together with its version information
///
/// ## Format
///
/// \[user_key\] \[u64 LE: seqno << 8 | value_type\]
#[derive(Clone, Eq, PartialEq)]
pub struct InternalKey {
    /// User-defined key
    pub user_key: UserKey,

    /// Sequence number
    pub seqno: SeqNo,

    /// Operation type
    pub value_type: ValueType,
}

#[cfg_attr(coverage_nightly, coverage(off))]
impl std::fmt::Debug for InternalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?}:{}:{}",
            self.user_key,
            self.seqno,
            match self.value_type {
                ValueType::Value => "V",
                ValueType::Tombstone => "T",
                ValueType::WeakTombstone => "W",
            },
        )
    }
}

impl InternalKey {
    /// Creates a new internal key.
    ///
    /// # Panics
    ///
    /// Panics if the sequence number does not fit into 56 bits.
    pub fn new<K: Into<UserKey>>(user_key: K, seqno: SeqNo, value_type: ValueType) -> Self {
        assert!(seqno <= MAX_SEQNO, "seqno must fit into 56 bits");

        Self {
            user_key: user_key.into(),
            seqno,
            value_type,
        }
    }

    /// Returns the encoded length.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.user_key.len() + TRAILER_LEN
    }

    /// Parses an encoded internal key.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is too short, or carries an unknown value type.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let parsed = InternalKeyRef::decode(bytes)?;

        Ok(Self {
            user_key: parsed.user_key.into(),
            seqno: parsed.seqno,
            value_type: parsed.value_type,
        })
    }
}

impl Encode for InternalKey {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_all(&self.user_key)?;
        writer.write_u64::<LittleEndian>(pack_trailer(self.seqno, self.value_type))?;
        Ok(())
    }
}

/// Borrowed view of an encoded internal key, without heap allocation
#[derive(Debug, Eq, PartialEq)]
pub struct InternalKeyRef<'a> {
    pub user_key: &'a [u8],
    pub seqno: SeqNo,
    pub value_type: ValueType,
}

impl<'a> InternalKeyRef<'a> {
    /// Splits an encoded internal key into its components.
    pub fn decode(bytes: &'a [u8]) -> Result<Self, DecodeError> {
        let Some(split) = bytes.len().checked_sub(TRAILER_LEN) else {
            return Err(DecodeError::Truncated("InternalKey"));
        };

        let (user_key, mut trailer) = bytes.split_at(split);
        let packed = trailer.read_u64::<LittleEndian>()?;

        #[expect(clippy::cast_possible_truncation, reason = "masked to the lowest byte")]
        let tag = (packed & 0xFF) as u8;

        let value_type =
            ValueType::try_from(tag).map_err(|()| DecodeError::InvalidTag(("ValueType", tag)))?;

        Ok(Self {
            user_key,
            seqno: packed >> 8,
            value_type,
        })
    }
}

/// Returns the user key part of an encoded internal key.
///
/// Does not validate the trailer.
pub(crate) fn extract_user_key(bytes: &[u8]) -> &[u8] {
    bytes
        .get(..bytes.len().saturating_sub(TRAILER_LEN))
        .unwrap_or_default()
}
