/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Read-and-write handle into the block store.
//!
//! # Initializing the block store
//!
//! A fresh key-value store contains no blocks at all, which block tree recovery treats as a fatal
//! condition. Before the first start of a node, call [`BlockStore::initialize`] with the genesis header.
//! This sets:
//!
//! |Variable|Initial value|
//! |---|---|
//! |Headers|The genesis header.|
//! |Slot to Hashes|Slot 0 -> `[genesis hash]`.|
//! |Block Tree Leaves|`[genesis hash]`.|
//! |Last Finalized|The genesis block's index.|
//!
//! `initialize` is idempotent, so it is safe to call on every start.
//!
//! # Consistency
//!
//! None of the compound operations here (e.g., [`put_block`](BlockStore::put_block), which writes a
//! header and then assigns it to its slot) are atomic. A crash between two of their constituent writes
//! leaves the variables above mutually inconsistent. This is tolerated: the inconsistencies that can
//! arise this way are exactly the ones that [block tree recovery](crate::block_tree::recovery) repairs
//! on the next start.

use std::fmt::{self, Display, Formatter};

use borsh::{BorshDeserialize, BorshSerialize};

use crate::types::{
    basic::{BlockIndex, CryptoHash, Slot},
    block::{BlockBody, BlockData, BlockHeader, Justification},
};

use super::{
    pluggables::{KVError, KVGet, KVStore, Space},
    slot_iterator::SlotIterator,
    variables::{self, block_key, slot_key},
};

/// Durable, content-addressed storage of block headers, bodies, justifications, the block tree leaves,
/// the last finalized block, and the slot index.
///
/// ## Categories of methods
///
/// Methods are grouped into separate `impl` blocks:
/// 1. [Lifecycle methods](#impl-BlockStore<K>).
/// 2. [Leaves and last finalized block](#impl-BlockStore<K>-1).
/// 3. [Slot index](#impl-BlockStore<K>-2).
/// 4. [Headers](#impl-BlockStore<K>-3).
/// 5. [Bodies and justifications](#impl-BlockStore<K>-4).
/// 6. [Combined blocks](#impl-BlockStore<K>-5).
pub struct BlockStore<K: KVStore> {
    kv_store: K,
}

/// Lifecycle methods.
impl<K: KVStore> BlockStore<K> {
    pub fn new(kv_store: K) -> Self {
        BlockStore { kv_store }
    }

    /// Get a reference to the underlying key-value store.
    pub fn kv_store(&self) -> &K {
        &self.kv_store
    }

    /// Store `genesis` as the only block, leaf, and finalized block, unless its header is already
    /// stored, in which case nothing is written.
    pub fn initialize(&mut self, genesis: &BlockHeader) -> Result<(), BlockStoreError> {
        let genesis_index = genesis.index();

        if self.has_block_header(&genesis_index.hash)? {
            log::debug!("Genesis block {} already stored", genesis_index);
            return Ok(());
        }

        self.put_block(&BlockData::new(genesis.clone()))?;
        self.set_leaves(vec![genesis_index.hash])?;
        self.set_last_finalized(&genesis_index)?;

        log::info!(
            "Genesis block {}, state {}",
            genesis_index,
            genesis.state_root()
        );

        Ok(())
    }
}

/// Leaves and last finalized block.
impl<K: KVStore> BlockStore<K> {
    /// Get the persisted block tree leaves.
    ///
    /// The leaves are advisory: they may refer to blocks that no longer exist, or miss blocks that do.
    /// Absence of the record is reported as [`BlockStoreError::LeavesNotFound`] and never as any other
    /// error.
    pub fn get_leaves(&self) -> Result<Vec<CryptoHash>, BlockStoreError> {
        self.get_value(Space::Default, variables::BLOCK_TREE_LEAVES, Key::BlockTreeLeaves)?
            .ok_or(BlockStoreError::LeavesNotFound)
    }

    /// Overwrite the persisted block tree leaves. `leaves` is stored sorted and deduplicated.
    pub fn set_leaves(&mut self, mut leaves: Vec<CryptoHash>) -> Result<(), BlockStoreError> {
        leaves.sort();
        leaves.dedup();
        self.put_value(
            Space::Default,
            variables::BLOCK_TREE_LEAVES,
            &leaves,
            Key::BlockTreeLeaves,
        )
    }

    pub fn get_last_finalized(&self) -> Result<BlockIndex, BlockStoreError> {
        self.get_value(Space::Default, variables::LAST_FINALIZED, Key::LastFinalized)?
            .ok_or(BlockStoreError::FinalizedBlockNotFound)
    }

    pub fn set_last_finalized(&mut self, block: &BlockIndex) -> Result<(), BlockStoreError> {
        self.put_value(
            Space::Default,
            variables::LAST_FINALIZED,
            block,
            Key::LastFinalized,
        )
    }
}

/// Slot index.
impl<K: KVStore> BlockStore<K> {
    /// Record `block.hash` among the hashes at `block.slot`. Does nothing if it is already recorded.
    ///
    /// Must be called whenever a header is stored. It is not atomic with the header write.
    pub fn assign_hash_to_slot(&mut self, block: &BlockIndex) -> Result<(), BlockStoreError> {
        log::debug!("Add slot-to-hash for {}", block);
        let mut hashes = self.get_block_hashes(block.slot)?;
        if !hashes.contains(&block.hash) {
            hashes.push(block.hash);
            self.put_value(
                Space::SlotToHashes,
                &slot_key(block.slot),
                &hashes,
                Key::SlotToHashes { slot: block.slot },
            )?;
        }
        Ok(())
    }

    /// Remove `block.hash` from the hashes at `block.slot`, removing the slot's entry altogether once
    /// no hashes remain, so that an occupied slot never maps to an empty list.
    pub fn deassign_hash_to_slot(&mut self, block: &BlockIndex) -> Result<(), BlockStoreError> {
        log::debug!("Remove slot-to-hash for {}", block);
        let mut hashes = self.get_block_hashes(block.slot)?;
        let len_before = hashes.len();
        hashes.retain(|hash| hash != &block.hash);
        if hashes.len() == len_before {
            return Ok(());
        }

        let key = slot_key(block.slot);
        if hashes.is_empty() {
            self.kv_store.remove(Space::SlotToHashes, &key)?;
            Ok(())
        } else {
            self.put_value(
                Space::SlotToHashes,
                &key,
                &hashes,
                Key::SlotToHashes { slot: block.slot },
            )
        }
    }

    /// Get the hashes of every block recorded at `slot`. The result is empty if the slot is unoccupied,
    /// and may hold more than one hash if the slot has forks.
    pub fn get_block_hashes(&self, slot: Slot) -> Result<Vec<CryptoHash>, BlockStoreError> {
        Ok(self
            .get_value(
                Space::SlotToHashes,
                &slot_key(slot),
                Key::SlotToHashes { slot },
            )?
            .unwrap_or_default())
    }

    /// Create a [`SlotIterator`] positioned at the highest occupied slot. The iterator is invalid if no
    /// slot is occupied.
    pub fn seek_last_slot(&self) -> Result<SlotIterator<K::Cursor<'_>>, BlockStoreError> {
        SlotIterator::seek_last(self.kv_store.cursor(Space::SlotToHashes))
    }
}

/// Headers.
impl<K: KVStore> BlockStore<K> {
    pub fn has_block_header(&self, block: &CryptoHash) -> Result<bool, BlockStoreError> {
        Ok(self.kv_store.contains(Space::Header, &block_key(block))?)
    }

    /// Store `header` under its hash, and return that hash.
    ///
    /// This does not assign the header to its slot; see [`assign_hash_to_slot`](Self::assign_hash_to_slot).
    pub fn put_block_header(&mut self, header: &BlockHeader) -> Result<CryptoHash, BlockStoreError> {
        let hash = header.hash();
        let bytes = header
            .encode()
            .map_err(|source| BlockStoreError::SerializeValueError {
                key: Key::BlockHeader { block: hash },
                source,
            })?;
        self.kv_store.put(Space::Header, &block_key(&hash), &bytes)?;
        Ok(hash)
    }

    /// Get the header of `block`, failing with [`BlockStoreError::HeaderNotFound`] if it is not stored.
    pub fn get_block_header(&self, block: &CryptoHash) -> Result<BlockHeader, BlockStoreError> {
        self.try_get_block_header(block)?
            .ok_or(BlockStoreError::HeaderNotFound { block: *block })
    }

    /// Get the header of `block`, or `None` if it is not stored.
    pub fn try_get_block_header(
        &self,
        block: &CryptoHash,
    ) -> Result<Option<BlockHeader>, BlockStoreError> {
        let Some(bytes) = self.kv_store.get(Space::Header, &block_key(block))? else {
            return Ok(None);
        };

        let header = BlockHeader::decode(&bytes).map_err(|source| {
            BlockStoreError::DeserializeValueError {
                key: Key::BlockHeader { block: *block },
                source,
            }
        })?;

        if header.hash() != *block {
            return Err(BlockStoreError::HeaderHashMismatch {
                key: *block,
                computed: header.hash(),
            });
        }

        Ok(Some(header))
    }
}

/// Bodies and justifications.
impl<K: KVStore> BlockStore<K> {
    pub fn put_block_body(
        &mut self,
        block: &CryptoHash,
        body: &BlockBody,
    ) -> Result<(), BlockStoreError> {
        self.put_value(
            Space::Body,
            &block_key(block),
            body,
            Key::BlockBody { block: *block },
        )
    }

    pub fn get_block_body(&self, block: &CryptoHash) -> Result<Option<BlockBody>, BlockStoreError> {
        self.get_value(
            Space::Body,
            &block_key(block),
            Key::BlockBody { block: *block },
        )
    }

    pub fn remove_block_body(&mut self, block: &CryptoHash) -> Result<(), BlockStoreError> {
        Ok(self.kv_store.remove(Space::Body, &block_key(block))?)
    }

    /// Store the `justification` of `block`. Empty justifications are rejected.
    pub fn put_justification(
        &mut self,
        justification: &Justification,
        block: &CryptoHash,
    ) -> Result<(), BlockStoreError> {
        if justification.is_empty() {
            return Err(BlockStoreError::JustificationEmpty { block: *block });
        }
        self.put_value(
            Space::Justification,
            &block_key(block),
            justification,
            Key::Justification { block: *block },
        )
    }

    pub fn get_justification(
        &self,
        block: &CryptoHash,
    ) -> Result<Option<Justification>, BlockStoreError> {
        self.get_value(
            Space::Justification,
            &block_key(block),
            Key::Justification { block: *block },
        )
    }

    pub fn remove_justification(&mut self, block: &CryptoHash) -> Result<(), BlockStoreError> {
        Ok(self.kv_store.remove(Space::Justification, &block_key(block))?)
    }
}

/// Combined blocks.
impl<K: KVStore> BlockStore<K> {
    /// Store every part of `block` that is present and assign it to its slot, returning its hash.
    ///
    /// The parts are written one after another in this order: header, body, justification, slot index.
    pub fn put_block(&mut self, block: &BlockData) -> Result<CryptoHash, BlockStoreError> {
        let hash = self.put_block_header(&block.header)?;

        if let Some(body) = &block.body {
            self.put_block_body(&hash, body)?;
        }

        if let Some(justification) = &block.justification {
            self.put_justification(justification, &hash)?;
        }

        let index = block.header.index();
        self.assign_hash_to_slot(&index)?;

        log::info!(
            "Added block {} as child of {}",
            index,
            block.header.parent_root()
        );

        Ok(hash)
    }

    /// Get every stored part of `block`, or `None` if its header is not stored.
    pub fn get_block(&self, block: &CryptoHash) -> Result<Option<BlockData>, BlockStoreError> {
        let Some(header) = self.try_get_block_header(block)? else {
            return Ok(None);
        };

        Ok(Some(BlockData {
            header,
            body: self.get_block_body(block)?,
            justification: self.get_justification(block)?,
        }))
    }

    /// Remove every part of `block` from storage and deassign it from its slot. Does nothing if the
    /// header of `block` is not stored.
    ///
    /// The header is removed last, so that a block interrupted halfway through removal is still found
    /// (and removed again) by whoever finds its header.
    pub fn remove_block(&mut self, block: &CryptoHash) -> Result<(), BlockStoreError> {
        let Some(header) = self.try_get_block_header(block)? else {
            return Ok(());
        };
        let index = header.index();

        log::trace!("Removing block {}", index);

        if let Err(err) = self.deassign_hash_to_slot(&index) {
            log::error!(
                "Could not remove slot-to-hash of {} from the storage: {}",
                index,
                err
            );
            return Err(err);
        }

        if let Err(err) = self.remove_block_body(block) {
            log::error!(
                "Could not remove body of block {} from the storage: {}",
                index,
                err
            );
            return Err(err);
        }

        if let Err(err) = self.remove_justification(block) {
            log::error!(
                "Could not remove justification of block {} from the storage: {}",
                index,
                err
            );
            return Err(err);
        }

        if let Err(err) = self.kv_store.remove(Space::Header, &block_key(block)) {
            log::error!(
                "Could not remove header of block {} from the storage: {}",
                index,
                err
            );
            return Err(err.into());
        }

        log::info!("Removed block {}", index);

        Ok(())
    }
}

/// Helpers shared by the getters and setters above.
impl<K: KVStore> BlockStore<K> {
    fn get_value<T: BorshDeserialize>(
        &self,
        space: Space,
        key: &[u8],
        variable: Key,
    ) -> Result<Option<T>, BlockStoreError> {
        match self.kv_store.get(space, key)? {
            None => Ok(None),
            Some(bytes) => T::try_from_slice(&bytes)
                .map(Some)
                .map_err(|source| BlockStoreError::DeserializeValueError {
                    key: variable,
                    source,
                }),
        }
    }

    fn put_value<T: BorshSerialize>(
        &mut self,
        space: Space,
        key: &[u8],
        value: &T,
        variable: Key,
    ) -> Result<(), BlockStoreError> {
        let bytes = value
            .try_to_vec()
            .map_err(|source| BlockStoreError::SerializeValueError {
                key: variable,
                source,
            })?;
        Ok(self.kv_store.put(space, key, &bytes)?)
    }
}

/// Errors that may be encountered when reading from or writing to the [`BlockStore`].
#[derive(Debug)]
pub enum BlockStoreError {
    /// The underlying [key value store][KVStore] failed.
    KVError(KVError),

    /// A value could not be serialized.
    SerializeValueError { key: Key, source: std::io::Error },

    /// A stored value could not be deserialized into its expected type.
    DeserializeValueError { key: Key, source: std::io::Error },

    /// The block tree leaves have never been persisted, or were lost.
    LeavesNotFound,

    /// The last finalized block has never been persisted: the store was never initialized.
    FinalizedBlockNotFound,

    /// No header is stored for `block`.
    HeaderNotFound { block: CryptoHash },

    /// The header stored under `key` hashes to `computed`.
    HeaderHashMismatch { key: CryptoHash, computed: CryptoHash },

    /// A key in the slot index is not a valid slot key.
    MalformedSlotKey { key: Vec<u8> },

    /// The slot index records an empty list of hashes for `slot`.
    EmptySlotEntry { slot: Slot },

    /// An empty justification was given for `block`.
    JustificationEmpty { block: CryptoHash },
}

impl BlockStoreError {
    /// Whether this error means that stored data is corrupted, as opposed to the engine failing or a
    /// value simply being absent.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            BlockStoreError::DeserializeValueError { .. }
                | BlockStoreError::HeaderHashMismatch { .. }
                | BlockStoreError::MalformedSlotKey { .. }
                | BlockStoreError::EmptySlotEntry { .. }
        )
    }
}

impl From<KVError> for BlockStoreError {
    fn from(value: KVError) -> Self {
        BlockStoreError::KVError(value)
    }
}

impl Display for BlockStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BlockStoreError::KVError(err) => write!(f, "{}", err),
            BlockStoreError::SerializeValueError { key, source } => {
                write!(f, "cannot serialize {}: {}", key, source)
            }
            BlockStoreError::DeserializeValueError { key, source } => {
                write!(f, "cannot deserialize {}: {}", key, source)
            }
            BlockStoreError::LeavesNotFound => write!(f, "block tree leaves not found"),
            BlockStoreError::FinalizedBlockNotFound => write!(f, "last finalized block not found"),
            BlockStoreError::HeaderNotFound { block } => {
                write!(f, "header of block {} not found", block)
            }
            BlockStoreError::HeaderHashMismatch { key, computed } => write!(
                f,
                "header stored under {} has hash {}",
                key, computed
            ),
            BlockStoreError::MalformedSlotKey { key } => {
                write!(f, "malformed slot index key {:?}", key)
            }
            BlockStoreError::EmptySlotEntry { slot } => {
                write!(f, "slot index records no hashes at slot {}", slot)
            }
            BlockStoreError::JustificationEmpty { block } => {
                write!(f, "empty justification for block {}", block)
            }
        }
    }
}

impl std::error::Error for BlockStoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BlockStoreError::KVError(err) => Some(err),
            BlockStoreError::SerializeValueError { source, .. }
            | BlockStoreError::DeserializeValueError { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// The block store variable that a value error concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    BlockTreeLeaves,
    LastFinalized,
    BlockHeader { block: CryptoHash },
    BlockBody { block: CryptoHash },
    Justification { block: CryptoHash },
    SlotToHashes { slot: Slot },
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Key::BlockTreeLeaves => write!(f, "Block Tree Leaves"),
            Key::LastFinalized => write!(f, "Last Finalized"),
            Key::BlockHeader { block } => write!(f, "Block Header for block {}", block),
            Key::BlockBody { block } => write!(f, "Block Body for block {}", block),
            Key::Justification { block } => write!(f, "Justification for block {}", block),
            Key::SlotToHashes { slot } => write!(f, "Slot to Hashes for slot {}", slot),
        }
    }
}
