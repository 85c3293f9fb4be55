/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The persistent block storage of a node.
//!
//! # What is stored
//!
//! The block store keeps, for every block that has been received or produced and not yet pruned, its
//! [header](crate::types::block::BlockHeader), and optionally its
//! [body](crate::types::block::BlockBody) and [justification](crate::types::block::Justification), all
//! keyed by the header's hash. Besides these, it keeps three pieces of bookkeeping:
//! 1. **Block tree leaves**: the hashes of blocks that have no known child. This is a cache that lets a
//!    node find its chain tips in a single read, but it may be stale or missing after a crash.
//! 2. **Slot to hashes**: the hashes of the blocks at each occupied slot. This is the source of truth
//!    for "is there any block at slot S".
//! 3. **Last finalized**: the index of the last finalized block.
//!
//! The documentation for the [`variables`] submodule specifies where each of these is stored.
//!
//! # Pluggable persistence
//!
//! - The block store is kept in persistent storage, most probably in the host's filesystem.
//! - Library users get to choose how exactly this is done, by implementing the traits in
//!   [`pluggables`] for their storage engine of choice.
//! - These traits require only an ordered key-value space with point reads, point writes, point deletes
//!   and a cursor. An in-memory implementation, [`in_memory::MemDB`], is provided.
//!
//! # Accessing the block store
//!
//! Implementations of the pluggable persistence traits get wrapped inside a
//! [`BlockStore`](accessors::BlockStore), which puts every variable in the right place in the key-value
//! store and provides typed methods for reading and writing them.

pub mod accessors;

pub mod in_memory;

pub mod pluggables;

pub mod slot_iterator;

pub mod variables;
