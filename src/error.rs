// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    coding::{DecodeError, EncodeError},
    Checksum,
};
use std::sync::Arc;

/// Reasons for a table build to give up
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BuildFailure {
    /// The smallest possible bucket array does not fit into the file size limit
    TableTooLarge {
        /// Bytes the bucket array would need
        required: u64,

        /// Configured maximum file size
        max: u64,
    },

    /// Not every entry could be placed, even with the maximum number of hash functions
    PlacementFailed {
        /// Number of hash functions used in the last attempt
        num_hash_funcs: u32,
    },

    /// Every possible key is in use, so there is no byte pattern left to mark empty buckets
    KeyspaceExhausted,
}

impl std::fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TableTooLarge { required, max } => {
                write!(f, "table needs {required} bytes, but is limited to {max} bytes")
            }
            Self::PlacementFailed { num_hash_funcs } => {
                write!(
                    f,
                    "could not place all entries using {num_hash_funcs} hash functions",
                )
            }
            Self::KeyspaceExhausted => write!(f, "no unused key available"),
        }
    }
}

/// Represents errors that can occur when building or reading a cuckoo table
#[derive(Clone, Debug)]
pub enum Error {
    /// I/O error
    Io(Arc<std::io::Error>),

    /// Serialization failed
    Encode(EncodeError),

    /// Deserialization failed
    Decode(DecodeError),

    /// Invalid input passed by the caller
    InvalidArgument(&'static str),

    /// The file content is malformed or inconsistent
    Corruption(&'static str),

    /// Invalid checksum value
    ChecksumMismatch {
        /// Checksum of the data that was read
        got: Checksum,

        /// Checksum that was expected
        expected: Checksum,
    },

    /// Placement could not converge
    Build(BuildFailure),
}

impl Error {
    /// Returns `true` if the error signals malformed data,
    /// as opposed to misuse or I/O problems.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::Corruption(_) | Self::Decode(_) | Self::ChecksumMismatch { .. }
        )
    }

    /// Returns `true` if the error was caused by invalid caller input.
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Build(e) => write!(f, "CuckooTableError: build failed: {e}"),
            e => write!(f, "CuckooTableError: {e:?}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(&**e),
            Self::Encode(e) => Some(e),
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<EncodeError> for Error {
    fn from(value: EncodeError) -> Self {
        Self::Encode(value)
    }
}

impl From<DecodeError> for Error {
    fn from(value: DecodeError) -> Self {
        Self::Decode(value)
    }
}

impl From<BuildFailure> for Error {
    fn from(value: BuildFailure) -> Self {
        Self::Build(value)
    }
}

/// Cuckoo table result
pub type Result<T> = std::result::Result<T, Error>;
