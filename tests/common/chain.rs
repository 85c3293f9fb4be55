//! Helpers for building chains of blocks directly into a [`BlockStore`].
//!
//! Blocks built here have an empty body and a one-byte justification. Blocks at the same slot with the
//! same parent are told apart by their proposer.

use lean_blockchain::{
    block_store::{accessors::BlockStore, in_memory::MemDB, pluggables::KVStore},
    types::{
        basic::{CryptoHash, ProposerIndex, Slot},
        block::{BlockBody, BlockData, BlockHeader, Justification},
    },
};

pub(crate) fn genesis() -> BlockHeader {
    BlockHeader::genesis(CryptoHash::zero(), BlockBody::default().root())
}

/// Create a `MemDB`-backed block store initialized with [`genesis`]. The returned `MemDB` shares its
/// data with the store.
pub(crate) fn initialized_store() -> (MemDB, BlockStore<MemDB>, BlockHeader) {
    let db = MemDB::new();
    let mut store = BlockStore::new(db.clone());
    let genesis = genesis();
    store.initialize(&genesis).unwrap();
    (db, store, genesis)
}

/// Store a child of `parent` at `slot` proposed by validator 0, and return its header.
pub(crate) fn extend<K: KVStore>(
    store: &mut BlockStore<K>,
    parent: &BlockHeader,
    slot: u64,
) -> BlockHeader {
    extend_by(store, parent, slot, 0)
}

pub(crate) fn extend_by<K: KVStore>(
    store: &mut BlockStore<K>,
    parent: &BlockHeader,
    slot: u64,
    proposer: u64,
) -> BlockHeader {
    let body = BlockBody::default();
    let header = BlockHeader::new(
        Slot::new(slot),
        ProposerIndex::new(proposer),
        parent.hash(),
        CryptoHash::new([slot as u8; 32]),
        body.root(),
    );
    let block = BlockData::new(header.clone())
        .with_body(body)
        .with_justification(Justification::new(vec![proposer as u8 + 1]));
    store.put_block(&block).unwrap();
    header
}

/// Store a chain of children of `parent`, one at each of `slots`, and return their headers in order.
pub(crate) fn extend_chain<K: KVStore>(
    store: &mut BlockStore<K>,
    parent: &BlockHeader,
    slots: impl IntoIterator<Item = u64>,
    proposer: u64,
) -> Vec<BlockHeader> {
    let mut chain: Vec<BlockHeader> = Vec::new();
    for slot in slots {
        let tip = chain.last().unwrap_or(parent).clone();
        chain.push(extend_by(store, &tip, slot, proposer));
    }
    chain
}

pub(crate) fn set_leaves<K: KVStore>(store: &mut BlockStore<K>, leaves: &[&BlockHeader]) {
    store
        .set_leaves(leaves.iter().map(|leaf| leaf.hash()).collect())
        .unwrap();
}

pub(crate) fn finalize<K: KVStore>(store: &mut BlockStore<K>, block: &BlockHeader) {
    store.set_last_finalized(&block.index()).unwrap();
}
