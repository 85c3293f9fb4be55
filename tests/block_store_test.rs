//! Tests of the block store's reads, writes and removals against a `MemDB`.

use lean_blockchain::{
    block_store::{
        accessors::{BlockStore, BlockStoreError},
        in_memory::MemDB,
        pluggables::{KVGet, KVStore, Space, ALL_SPACES},
        variables::{self, block_key, slot_key},
    },
    types::{
        basic::{CryptoHash, ProposerIndex, Slot},
        block::{BlockBody, BlockData, BlockHeader, Justification},
    },
};
use log::LevelFilter;

mod common;

use common::{
    chain::{extend, extend_by, genesis, initialized_store},
    logging::setup_logger,
};

#[test]
fn initialize_is_idempotent() {
    setup_logger(LevelFilter::Trace);

    let (db, mut store, genesis) = initialized_store();
    assert_eq!(store.get_leaves().unwrap(), vec![genesis.hash()]);
    assert_eq!(store.get_last_finalized().unwrap(), genesis.index());
    assert_eq!(store.get_block_hashes(Slot::new(0)).unwrap(), vec![genesis.hash()]);

    // A second initialize must not reset leaves that have moved on.
    let child = extend(&mut store, &genesis, 1);
    store.set_leaves(vec![child.hash()]).unwrap();
    store.initialize(&genesis).unwrap();

    assert_eq!(store.get_leaves().unwrap(), vec![child.hash()]);
    assert_eq!(db.keys(Space::Header).unwrap().len(), 2);
}

#[test]
fn empty_store_reports_distinct_absences() {
    let store = BlockStore::new(MemDB::new());

    assert!(matches!(
        store.get_leaves(),
        Err(BlockStoreError::LeavesNotFound)
    ));
    assert!(matches!(
        store.get_last_finalized(),
        Err(BlockStoreError::FinalizedBlockNotFound)
    ));

    let hash = genesis().hash();
    assert!(store.try_get_block_header(&hash).unwrap().is_none());
    assert!(matches!(
        store.get_block_header(&hash),
        Err(BlockStoreError::HeaderNotFound { block }) if block == hash
    ));
    assert!(store.get_block(&hash).unwrap().is_none());
    assert!(store.get_block_hashes(Slot::new(0)).unwrap().is_empty());
    assert!(!store.seek_last_slot().unwrap().is_valid());
}

#[test]
fn leaves_are_stored_sorted_and_deduplicated() {
    let mut store = BlockStore::new(MemDB::new());
    let (a, b) = (CryptoHash::new([2; 32]), CryptoHash::new([1; 32]));

    store.set_leaves(vec![a, b, a]).unwrap();
    assert_eq!(store.get_leaves().unwrap(), vec![b, a]);
}

#[test]
fn put_block_stores_every_part() {
    let (_, mut store, genesis) = initialized_store();
    let body = BlockBody::default();
    let header = BlockHeader::new(
        Slot::new(1),
        ProposerIndex::new(7),
        genesis.hash(),
        CryptoHash::zero(),
        body.root(),
    );
    let justification = Justification::new(vec![1, 2, 3]);
    let block = BlockData::new(header.clone())
        .with_body(body.clone())
        .with_justification(justification.clone());

    let hash = store.put_block(&block).unwrap();

    assert_eq!(hash, header.hash());
    assert_eq!(store.get_block(&hash).unwrap(), Some(block));
    assert_eq!(store.get_block_body(&hash).unwrap(), Some(body));
    assert_eq!(store.get_justification(&hash).unwrap(), Some(justification));
    assert_eq!(store.get_block_hashes(Slot::new(1)).unwrap(), vec![hash]);
}

#[test]
fn empty_justification_is_rejected() {
    let (_, mut store, genesis) = initialized_store();

    let result = store.put_justification(&Justification::new(Vec::new()), &genesis.hash());

    assert!(matches!(
        result,
        Err(BlockStoreError::JustificationEmpty { block }) if block == genesis.hash()
    ));
    assert!(store.get_justification(&genesis.hash()).unwrap().is_none());
}

#[test]
fn slot_index_keeps_forks_and_drops_empty_entries() {
    let (db, mut store, genesis) = initialized_store();
    let a = extend_by(&mut store, &genesis, 1, 0);
    let b = extend_by(&mut store, &genesis, 1, 1);

    // Assigning twice records the hash once.
    store.assign_hash_to_slot(&a.index()).unwrap();
    assert_eq!(
        store.get_block_hashes(Slot::new(1)).unwrap(),
        vec![a.hash(), b.hash()]
    );

    store.deassign_hash_to_slot(&a.index()).unwrap();
    assert_eq!(store.get_block_hashes(Slot::new(1)).unwrap(), vec![b.hash()]);

    store.deassign_hash_to_slot(&b.index()).unwrap();
    assert!(store.get_block_hashes(Slot::new(1)).unwrap().is_empty());
    assert!(!db
        .keys(Space::SlotToHashes)
        .unwrap()
        .contains(&slot_key(Slot::new(1)).to_vec()));
}

#[test]
fn remove_block_cleans_every_space() {
    let (db, mut store, genesis) = initialized_store();
    let child = extend(&mut store, &genesis, 1);

    store.remove_block(&child.hash()).unwrap();

    let key = block_key(&child.hash()).to_vec();
    for space in [Space::Header, Space::Body, Space::Justification] {
        assert!(!db.keys(space).unwrap().contains(&key), "{} still has the block", space);
    }
    assert!(store.get_block_hashes(Slot::new(1)).unwrap().is_empty());

    // Removing again is a no-op.
    store.remove_block(&child.hash()).unwrap();
    assert!(store.has_block_header(&genesis.hash()).unwrap());
}

#[test]
fn header_stored_under_wrong_key_is_corruption() {
    let (db, store, genesis) = initialized_store();
    let wrong_key = CryptoHash::new([9; 32]);
    let mut kv = db.clone();
    kv.put(
        Space::Header,
        &block_key(&wrong_key),
        &genesis.encode().unwrap(),
    )
    .unwrap();

    let err = store.try_get_block_header(&wrong_key).unwrap_err();

    assert!(err.is_corruption());
    assert!(matches!(
        err,
        BlockStoreError::HeaderHashMismatch { key, computed } if key == wrong_key && computed == genesis.hash()
    ));
}

#[test]
fn undecodable_values_are_corruption() {
    let (db, store, _) = initialized_store();
    let mut kv = db.clone();
    kv.put(Space::Default, variables::BLOCK_TREE_LEAVES, &[1, 2, 3])
        .unwrap();

    let err = store.get_leaves().unwrap_err();

    assert!(err.is_corruption());
    assert!(!matches!(err, BlockStoreError::LeavesNotFound));
}

#[test]
fn every_space_is_independent() {
    let mut db = MemDB::new();
    for space in ALL_SPACES {
        db.put(space, b"key", space.to_string().as_bytes()).unwrap();
    }
    for space in ALL_SPACES {
        assert_eq!(db.keys(space).unwrap(), vec![b"key".to_vec()]);
        assert_eq!(
            db.get(space, b"key").unwrap(),
            Some(space.to_string().into_bytes())
        );
    }
}
