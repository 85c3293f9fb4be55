/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Bidirectional iteration over occupied slots.

use borsh::BorshDeserialize;

use crate::types::basic::{CryptoHash, Slot};

use super::{
    accessors::{BlockStoreError, Key},
    pluggables::KVCursor,
    variables::slot_from_key,
};

/// Cursor over the slot index that visits occupied slots only.
///
/// Created positioned at the highest occupied slot by
/// [`BlockStore::seek_last_slot`](super::accessors::BlockStore::seek_last_slot). Unoccupied slots are
/// skipped by the engine's ordered cursor, so [`next`](Self::next) and [`prev`](Self::prev) always land
/// on an occupied slot or make the iterator invalid.
///
/// While the iterator is valid, [`slot`](Self::slot) and [`hashes`](Self::hashes) return `Some`, and
/// `hashes` is never empty. While it is invalid, both return `None`.
pub struct SlotIterator<C: KVCursor> {
    cursor: C,
    current: Option<(Slot, Vec<CryptoHash>)>,
}

impl<C: KVCursor> SlotIterator<C> {
    pub(crate) fn seek_last(mut cursor: C) -> Result<Self, BlockStoreError> {
        cursor.seek_last()?;
        let mut iterator = SlotIterator {
            cursor,
            current: None,
        };
        iterator.load()?;
        Ok(iterator)
    }

    pub fn is_valid(&self) -> bool {
        self.current.is_some()
    }

    pub fn slot(&self) -> Option<Slot> {
        self.current.as_ref().map(|(slot, _)| *slot)
    }

    pub fn hashes(&self) -> Option<&[CryptoHash]> {
        self.current.as_ref().map(|(_, hashes)| hashes.as_slice())
    }

    /// Move to the lowest occupied slot above the current one. Does nothing if the iterator is invalid.
    pub fn next(&mut self) -> Result<(), BlockStoreError> {
        if !self.is_valid() {
            return Ok(());
        }
        self.cursor.next()?;
        self.load()
    }

    /// Move to the highest occupied slot below the current one. Does nothing if the iterator is invalid.
    pub fn prev(&mut self) -> Result<(), BlockStoreError> {
        if !self.is_valid() {
            return Ok(());
        }
        self.cursor.prev()?;
        self.load()
    }

    fn load(&mut self) -> Result<(), BlockStoreError> {
        self.current = None;

        let (Some(key), Some(value)) = (self.cursor.key(), self.cursor.value()) else {
            return Ok(());
        };

        let slot = slot_from_key(key)
            .ok_or_else(|| BlockStoreError::MalformedSlotKey { key: key.to_vec() })?;

        let hashes = Vec::<CryptoHash>::try_from_slice(value).map_err(|source| {
            BlockStoreError::DeserializeValueError {
                key: Key::SlotToHashes { slot },
                source,
            }
        })?;

        if hashes.is_empty() {
            return Err(BlockStoreError::EmptySlotEntry { slot });
        }

        self.current = Some((slot, hashes));
        Ok(())
    }
}
