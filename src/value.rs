// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{key::InternalKey, Slice, ValueType};

/// User defined key
pub type UserKey = Slice;

/// User defined data (blob of bytes)
#[allow(clippy::module_name_repetitions)]
pub type UserValue = Slice;

/// Sequence number - a monotonically increasing counter
///
/// A value with a higher sequence number shadows an item with the
/// same key and lower sequence number.
///
/// Last-level tables do not store sequence numbers; entries read
/// from them always report a sequence number of 0.
pub type SeqNo = u64;

/// A key-value pair as returned by a table lookup
#[allow(clippy::module_name_repetitions)]
#[derive(Clone, Eq, PartialEq)]
pub struct InternalValue {
    /// Internal key
    pub key: InternalKey,

    /// User-defined value - an arbitrary byte array
    pub value: UserValue,
}

impl InternalValue {
    /// Creates a new [`InternalValue`].
    pub fn new<V: Into<UserValue>>(key: InternalKey, value: V) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    /// Creates a new [`InternalValue`].
    pub fn from_components<K: Into<crate::UserKey>, V: Into<UserValue>>(
        user_key: K,
        value: V,
        seqno: SeqNo,
        value_type: ValueType,
    ) -> Self {
        let key = InternalKey::new(user_key, seqno, value_type);
        Self::new(key, value)
    }

    /// Returns `true` if the item is a tombstone marker.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.key.value_type.is_tombstone()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
impl std::fmt::Debug for InternalValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?} => {:?}",
            self.key,
            if self.value.len() >= 64 {
                format!("[ ... {} bytes ]", self.value.len())
            } else {
                format!("{:?}", self.value)
            }
        )
    }
}
