//! Tests of slot index iteration.

use lean_blockchain::{
    block_store::{
        accessors::{BlockStore, BlockStoreError},
        in_memory::MemDB,
        pluggables::{KVStore, Space},
        variables::slot_key,
    },
    types::basic::Slot,
};

mod common;

use common::chain::{extend, extend_by, extend_chain, initialized_store};

#[test]
fn seeks_last_and_steps_over_gaps() {
    let (_, mut store, genesis) = initialized_store();
    let chain = extend_chain(&mut store, &genesis, [1, 2, 5, 9], 0);
    let fork = extend_by(&mut store, &chain[1], 5, 1);

    let mut slots = store.seek_last_slot().unwrap();
    assert!(slots.is_valid());
    assert_eq!(slots.slot(), Some(Slot::new(9)));
    assert_eq!(slots.hashes(), Some([chain[3].hash()].as_slice()));

    slots.prev().unwrap();
    assert_eq!(slots.slot(), Some(Slot::new(5)));
    assert_eq!(
        slots.hashes(),
        Some([chain[2].hash(), fork.hash()].as_slice())
    );

    slots.prev().unwrap();
    assert_eq!(slots.slot(), Some(Slot::new(2)));

    slots.next().unwrap();
    assert_eq!(slots.slot(), Some(Slot::new(5)));
}

#[test]
fn is_invalid_past_either_end() {
    let (_, mut store, genesis) = initialized_store();
    extend(&mut store, &genesis, 1);

    let mut slots = store.seek_last_slot().unwrap();
    slots.next().unwrap();
    assert!(!slots.is_valid());
    assert_eq!(slots.slot(), None);
    assert_eq!(slots.hashes(), None);

    // Stepping an invalid iterator keeps it invalid.
    slots.prev().unwrap();
    assert!(!slots.is_valid());

    let mut slots = store.seek_last_slot().unwrap();
    slots.prev().unwrap();
    assert_eq!(slots.slot(), Some(Slot::new(0)));
    slots.prev().unwrap();
    assert!(!slots.is_valid());
}

#[test]
fn high_slots_sort_after_low_slots() {
    let (_, mut store, genesis) = initialized_store();
    extend(&mut store, &genesis, 256);
    extend(&mut store, &genesis, 1);

    let mut slots = store.seek_last_slot().unwrap();
    assert_eq!(slots.slot(), Some(Slot::new(256)));
    slots.prev().unwrap();
    assert_eq!(slots.slot(), Some(Slot::new(1)));
}

#[test]
fn malformed_entries_are_corruption() {
    let mut db = MemDB::new();
    db.put(Space::SlotToHashes, b"short", &[0, 0, 0, 0]).unwrap();
    let store = BlockStore::new(db.clone());
    assert!(matches!(
        store.seek_last_slot(),
        Err(BlockStoreError::MalformedSlotKey { .. })
    ));

    let mut db = MemDB::new();
    db.put(Space::SlotToHashes, &slot_key(Slot::new(3)), &[0, 0, 0, 0])
        .unwrap();
    let store = BlockStore::new(db.clone());
    let err = store.seek_last_slot().err().unwrap();
    assert!(err.is_corruption());
    assert!(matches!(
        err,
        BlockStoreError::EmptySlotEntry { slot } if slot == Slot::new(3)
    ));
}
