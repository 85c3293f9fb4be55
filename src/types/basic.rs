/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! "Inert" types that are stored and inspected, but have no active behavior.
//!
//! These types follow the newtype pattern and the API for using them is defined in this module.

use borsh::{BorshDeserialize, BorshSerialize};
use std::{
    fmt::{self, Debug, Display, Formatter},
    hash::Hash,
};

/// Discrete unit of time in which at most one canonical block is expected to be proposed.
///
/// Starts at 0 for the genesis block. Unlike a block height, consecutive blocks of a chain need not
/// have consecutive slots: a slot in which no block was proposed is simply skipped.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct Slot(u64);

impl Slot {
    pub const MIN: Slot = Slot(u64::MIN);
    pub const MAX: Slot = Slot(u64::MAX);

    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    pub const fn int(&self) -> u64 {
        self.0
    }

    /// Get the big-endian representation of the inner `u64` value of this `Slot`.
    ///
    /// Slot index keys use this representation so that the byte order of keys in the key-value store
    /// matches the numeric order of slots.
    pub fn to_be_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }
}

impl Display for Slot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Index of the validator that proposed a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct ProposerIndex(u64);

impl ProposerIndex {
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    pub const fn int(&self) -> u64 {
        self.0
    }
}

/// 32-byte cryptographic hash.
///
/// Block hashes are always SHA256 hashes of the encoded [`BlockHeader`](super::block::BlockHeader).
/// State roots and body roots may come from any 32-byte hash function.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct CryptoHash([u8; 32]);

impl CryptoHash {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The all-zero hash, used as the `parent_root` of a genesis block.
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl Display for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0[..4] {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, "…")?;
        for byte in &self.0[28..] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Debug for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// A block identified by both its slot and its hash.
///
/// `BlockIndex` is ordered primarily by slot and then by hash (the derived ordering follows field
/// declaration order), so every non-empty set of `BlockIndex` values has a deterministic maximum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize)]
pub struct BlockIndex {
    pub slot: Slot,
    pub hash: CryptoHash,
}

impl BlockIndex {
    pub const fn new(slot: Slot, hash: CryptoHash) -> Self {
        Self { slot, hash }
    }
}

impl Display for BlockIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.hash, self.slot)
    }
}

/// A `(root, slot)` pair used to mark justified and finalized points in the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct Checkpoint {
    pub root: CryptoHash,
    pub slot: Slot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_index_orders_by_slot_then_hash() {
        let low_hash = CryptoHash::new([1u8; 32]);
        let high_hash = CryptoHash::new([2u8; 32]);

        assert!(BlockIndex::new(Slot::new(1), high_hash) < BlockIndex::new(Slot::new(2), low_hash));
        assert!(BlockIndex::new(Slot::new(2), low_hash) < BlockIndex::new(Slot::new(2), high_hash));
    }

    #[test]
    fn slot_be_bytes_preserve_numeric_order() {
        let slots = [0u64, 1, 255, 256, 65_536, u64::MAX];
        for pair in slots.windows(2) {
            assert!(Slot::new(pair[0]).to_be_bytes() < Slot::new(pair[1]).to_be_bytes());
        }
    }
}
