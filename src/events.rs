/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of block tree recovery events for logging.
//! Note: an event for a given action indicates that the action has been completed.

use std::time::SystemTime;

use crate::{
    config::LeafRepairStrategy,
    types::basic::{BlockIndex, Slot},
};

/// The persisted block tree leaves were read and resolved to headers.
pub struct LoadLeavesEvent {
    pub timestamp: SystemTime,
    /// Number of persisted leaf hashes.
    pub persisted: usize,
    /// Number of those whose header was found.
    pub resolved: usize,
}

/// The block tree leaves were rebuilt from the slot index because none of the persisted ones could be
/// used.
pub struct RepairLeavesEvent {
    pub timestamp: SystemTime,
    pub strategy: LeafRepairStrategy,
    /// The slot the recovered leaves are at.
    pub slot: Slot,
    pub leaves: usize,
}

/// Dead blocks were excluded from the block tree (and deleted from storage, if enabled).
pub struct PruneBlocksEvent {
    pub timestamp: SystemTime,
    pub blocks: Vec<BlockIndex>,
    /// Number of dead blocks left in storage after a failed deletion.
    pub failures: usize,
}

/// Block tree recovery completed.
pub struct RecoverBlockTreeEvent {
    pub timestamp: SystemTime,
    pub last_known: BlockIndex,
    pub last_finalized: BlockIndex,
    pub non_finalized: usize,
}
