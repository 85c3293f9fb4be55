/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The block tree, as recovered from the block store when a node starts.
//!
//! # The Block Tree
//!
//! A block tree is a tree of blocks rooted at the genesis block. Every block below the last finalized
//! block has exactly one child on the canonical chain, so the block tree can be understood as a linked
//! list with a tree attached to it at the last finalized block. In this understanding, there are **two
//! kinds of blocks** in a block tree:
//! 1. **Finalized blocks**: blocks in the linked list. These are permanently part of the block tree.
//! 2. **Non-finalized blocks**: blocks in the tree above the last finalized block.
//!
//! A block that is neither, i.e., one that descends from a block at or below the finalized slot that is
//! not on the canonical chain, is **dead**, and can never become part of the block tree.
//!
//! # Recovery
//!
//! After a crash, the [block store](crate::block_store) may be inconsistent in the ways described in
//! [`accessors`](crate::block_store::accessors#consistency). The [`recovery`] submodule rebuilds the
//! block tree from whatever was stored, removing dead blocks on the way. The properties its output
//! satisfies are checked by the predicates in [`invariants`].

pub mod invariants;

pub mod recovery;
