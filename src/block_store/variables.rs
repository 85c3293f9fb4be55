/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Keys that specify where each block store variable is stored in the user-provided key-value store.
//!
//! # List of variables
//!
//! |Variable|Space|Key|Value|
//! |---|---|---|---|
//! |Block Tree Leaves|[`Default`](super::pluggables::Space::Default)|[`BLOCK_TREE_LEAVES`]|Sorted `Vec<CryptoHash>`|
//! |Last Finalized|[`Default`](super::pluggables::Space::Default)|[`LAST_FINALIZED`]|[`BlockIndex`](crate::types::basic::BlockIndex)|
//! |Headers|[`Header`](super::pluggables::Space::Header)|Block hash|[`BlockHeader`](crate::types::block::BlockHeader) encoding|
//! |Bodies|[`Body`](super::pluggables::Space::Body)|Block hash|[`BlockBody`](crate::types::block::BlockBody)|
//! |Justifications|[`Justification`](super::pluggables::Space::Justification)|Block hash|[`Justification`](crate::types::block::Justification)|
//! |Slot to Hashes|[`SlotToHashes`](super::pluggables::Space::SlotToHashes)|[`slot_key`]|Non-empty `Vec<CryptoHash>`|
//!
//! All values are Borsh-serialized.
//!
//! # Slot keys
//!
//! Slot keys are the big-endian encoding of the slot. This makes the byte order of keys in the
//! `SlotToHashes` space equal to the numeric order of slots, which is what lets a
//! [`SlotIterator`](super::slot_iterator::SlotIterator) walk occupied slots in order using nothing but
//! the engine's cursor.

use crate::types::basic::{CryptoHash, Slot};

pub const BLOCK_TREE_LEAVES: &[u8] = b":lean:block_tree_leaves";
pub const LAST_FINALIZED: &[u8] = b":lean:last_finalized";

/// Key of the slot index entry for `slot`.
pub fn slot_key(slot: Slot) -> [u8; 8] {
    slot.to_be_bytes()
}

/// Inverse of [`slot_key`]. Returns `None` if `key` is not exactly 8 bytes long.
pub fn slot_from_key(key: &[u8]) -> Option<Slot> {
    let bytes: [u8; 8] = key.try_into().ok()?;
    Some(Slot::from_be_bytes(bytes))
}

/// Key of every per-block variable (header, body, justification) of the block with hash `block`.
pub fn block_key(block: &CryptoHash) -> [u8; 32] {
    block.bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_key_roundtrips_and_rejects_bad_lengths() {
        assert_eq!(slot_from_key(&slot_key(Slot::new(42))), Some(Slot::new(42)));
        assert_eq!(slot_from_key(&[0u8; 7]), None);
        assert_eq!(slot_from_key(&[0u8; 9]), None);
    }
}
