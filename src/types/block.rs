/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the block header, block body, and the types stored alongside them.

use borsh::{BorshDeserialize, BorshSerialize};
pub use sha2::Sha256 as CryptoHasher;
use sha2::Digest;

use crate::types::basic::*;

/// The fields of a [`BlockHeader`] that are encoded and hashed.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
struct HeaderFields {
    slot: Slot,
    proposer_index: ProposerIndex,
    parent_root: CryptoHash,
    state_root: CryptoHash,
    body_root: CryptoHash,
}

/// A lighter version of a block, used for referencing and verification.
///
/// ## Content addressing
///
/// The hash of a header is the SHA256 hash of its Borsh encoding. It is computed exactly once, when the
/// header is constructed or decoded, and cached in the value. Headers have no mutators, so the cached
/// hash can never go stale. The cached hash is not itself part of the encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    fields: HeaderFields,
    hash: CryptoHash,
}

impl BlockHeader {
    pub fn new(
        slot: Slot,
        proposer_index: ProposerIndex,
        parent_root: CryptoHash,
        state_root: CryptoHash,
        body_root: CryptoHash,
    ) -> BlockHeader {
        Self::from_fields(HeaderFields {
            slot,
            proposer_index,
            parent_root,
            state_root,
            body_root,
        })
    }

    /// Create the header of a genesis block: slot 0, proposer 0, and an all-zero parent root.
    pub fn genesis(state_root: CryptoHash, body_root: CryptoHash) -> BlockHeader {
        Self::new(
            Slot::new(0),
            ProposerIndex::new(0),
            CryptoHash::zero(),
            state_root,
            body_root,
        )
    }

    fn from_fields(fields: HeaderFields) -> BlockHeader {
        let hash = Self::hash_of(&fields);
        BlockHeader { fields, hash }
    }

    fn hash_of(fields: &HeaderFields) -> CryptoHash {
        let mut hasher = CryptoHasher::new();
        // Serializing plain integers and byte arrays into a `Vec` cannot fail.
        hasher.update(&fields.try_to_vec().unwrap());
        CryptoHash::new(hasher.finalize().into())
    }

    /// Get the Borsh encoding of this header. This is exactly the byte sequence that `hash` is computed
    /// over.
    pub fn encode(&self) -> std::io::Result<Vec<u8>> {
        self.fields.try_to_vec()
    }

    /// Decode a header from its Borsh encoding, computing (and caching) its hash.
    pub fn decode(bytes: &[u8]) -> std::io::Result<BlockHeader> {
        HeaderFields::try_from_slice(bytes).map(Self::from_fields)
    }

    pub const fn slot(&self) -> Slot {
        self.fields.slot
    }

    pub const fn proposer_index(&self) -> ProposerIndex {
        self.fields.proposer_index
    }

    pub const fn parent_root(&self) -> CryptoHash {
        self.fields.parent_root
    }

    pub const fn state_root(&self) -> CryptoHash {
        self.fields.state_root
    }

    pub const fn body_root(&self) -> CryptoHash {
        self.fields.body_root
    }

    pub const fn hash(&self) -> CryptoHash {
        self.hash
    }

    pub const fn index(&self) -> BlockIndex {
        BlockIndex::new(self.fields.slot, self.hash)
    }
}

/// A vote cast by a validator for a `head`, together with the `source` and `target` checkpoints it
/// justifies. Votes are opaque to block storage.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Vote {
    pub validator_id: u64,
    pub slot: Slot,
    pub head: Checkpoint,
    pub target: Checkpoint,
    pub source: Checkpoint,
}

/// The operations carried by a block.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BlockBody {
    pub attestations: Vec<Vote>,
}

impl BlockBody {
    pub fn new(attestations: Vec<Vote>) -> Self {
        Self { attestations }
    }

    /// Get the SHA256 hash of the Borsh encoding of this body. This is the value that a header's
    /// `body_root` commits to.
    pub fn root(&self) -> CryptoHash {
        let mut hasher = CryptoHasher::new();
        hasher.update(&self.try_to_vec().unwrap());
        CryptoHash::new(hasher.finalize().into())
    }
}

/// Opaque proof of the finality of a block. A stored justification is never empty.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Justification(Vec<u8>);

impl Justification {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A header together with the optional parts that are stored next to it, keyed by the header's hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockData {
    pub header: BlockHeader,
    pub body: Option<BlockBody>,
    pub justification: Option<Justification>,
}

impl BlockData {
    pub fn new(header: BlockHeader) -> Self {
        Self {
            header,
            body: None,
            justification: None,
        }
    }

    pub fn with_body(mut self, body: BlockBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_justification(mut self, justification: Justification) -> Self {
        self.justification = Some(justification);
        self
    }

    pub fn hash(&self) -> CryptoHash {
        self.header.hash()
    }
}
