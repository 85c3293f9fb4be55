/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Traits for pluggable block storage persistence.
//!
//! The block store only requires an ordered key-value space, partitioned into a handful of independent
//! [`Space`]s, that supports point reads, point writes, point deletes, and a bidirectional cursor.
//! No batching and no cross-key atomicity are required: every [`KVStore::put`] and [`KVStore::remove`]
//! is expected to be durable on return, and nothing more.

use std::fmt::{self, Display, Formatter};

/// Independent key spaces of the block store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Space {
    /// Single values: the block tree leaves and the last finalized block.
    Default,
    /// Block hash -> encoded block header.
    Header,
    /// Block hash -> encoded block body.
    Body,
    /// Block hash -> encoded justification.
    Justification,
    /// Big-endian slot -> encoded list of block hashes at that slot.
    SlotToHashes,
}

/// All space variants.
pub const ALL_SPACES: [Space; 5] = [
    Space::Default,
    Space::Header,
    Space::Body,
    Space::Justification,
    Space::SlotToHashes,
];

impl Display for Space {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Space::Default => write!(f, "Default"),
            Space::Header => write!(f, "Header"),
            Space::Body => write!(f, "Body"),
            Space::Justification => write!(f, "Justification"),
            Space::SlotToHashes => write!(f, "SlotToHashes"),
        }
    }
}

pub trait KVStore: KVGet + Clone + Send + 'static {
    type Cursor<'a>: KVCursor
    where
        Self: 'a;

    fn put(&mut self, space: Space, key: &[u8], value: &[u8]) -> Result<(), KVError>;
    fn remove(&mut self, space: Space, key: &[u8]) -> Result<(), KVError>;

    /// Create an unpositioned cursor over `space`. Call [`KVCursor::seek_last`] to position it.
    fn cursor(&self, space: Space) -> Self::Cursor<'_>;
}

pub trait KVGet {
    /// Get the value stored at `key` in `space`, or `None` if there is none.
    fn get(&self, space: Space, key: &[u8]) -> Result<Option<Vec<u8>>, KVError>;

    fn contains(&self, space: Space, key: &[u8]) -> Result<bool, KVError> {
        Ok(self.get(space, key)?.is_some())
    }
}

/// Ordered cursor over the keys of one [`Space`].
///
/// A cursor visits only keys that are present, in byte order. Moving past either end makes it invalid,
/// and an invalid cursor stays invalid until it is re-positioned with `seek_last`.
pub trait KVCursor {
    fn seek_last(&mut self) -> Result<(), KVError>;
    fn next(&mut self) -> Result<(), KVError>;
    fn prev(&mut self) -> Result<(), KVError>;
    fn is_valid(&self) -> bool;

    /// The key the cursor is positioned at, or `None` if the cursor is invalid.
    fn key(&self) -> Option<&[u8]>;

    /// The value the cursor is positioned at, or `None` if the cursor is invalid.
    fn value(&self) -> Option<&[u8]>;
}

/// Failure reported by the key-value engine itself, as opposed to a problem with the data it returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KVError {
    pub space: Space,
    pub reason: String,
}

impl KVError {
    pub fn new(space: Space, reason: impl Into<String>) -> Self {
        KVError {
            space,
            reason: reason.into(),
        }
    }
}

impl Display for KVError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "key-value engine error in space {}: {}", self.space, self.reason)
    }
}

impl std::error::Error for KVError {}
