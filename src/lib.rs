/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Block storage and crash-tolerant block tree recovery for a lean proof-of-stake chain client.
//!
//! A node persists every block it receives or produces into a [`BlockStore`](block_store::accessors::BlockStore).
//! When the node starts, [`recover_block_tree`](block_tree::recovery::recover_block_tree) reads the
//! store back, however it was left, and produces the last finalized block and the live non-finalized
//! blocks above it, deleting dead forks on the way.

pub mod block_store;

pub mod block_tree;

pub mod config;

pub mod events;

pub(crate) mod logging;

pub mod types;
