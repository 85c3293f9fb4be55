/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! User-defined parameters of block tree recovery.

use typed_builder::TypedBuilder;

/// How block tree recovery finds the chain tip when the persisted leaves are missing or unresolvable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LeafRepairStrategy {
    /// Binary search over the whole slot space for the highest slot that has blocks.
    ///
    /// This assumes that slot occupancy is a contiguous prefix of the slot space, i.e., that every slot
    /// up to the tip has at least one block. If a slot below the tip is empty (e.g., because of a missed
    /// proposal), the search may settle on a slot below the real tip. Recovery logs a warning when the
    /// result of the search disagrees with the highest slot seen by the slot index cursor.
    #[default]
    Bisection,

    /// Take the highest occupied slot from the slot index cursor, stepping back past slots whose blocks
    /// have no stored header. Tolerates empty slots anywhere below the tip.
    LastOccupiedSlot,
}

/// Stores the user-defined parameters of [block tree recovery](crate::block_tree::recovery), that is:
/// 1. The [leaf repair strategy](LeafRepairStrategy).
/// 2. The "Prune Dead Blocks" flag. If set to "false", dead blocks are still excluded from the recovered
///    tree but are left in storage.
/// 3. The "Log Events" flag. If set to "true", recovery events are printed.
///
/// ## Log Events
///
/// Recovery logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages printed
/// onto a terminal or to a file, set up a
/// [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [RecoveryConfiguration]. Every field is optional:
    - `.leaf_repair(...)` (default: [`LeafRepairStrategy::Bisection`])
    - `.prune_dead_blocks(...)` (default: `true`)
    - `.log_events(...)` (default: `true`)
"))]
pub struct RecoveryConfiguration {
    #[builder(
        default,
        setter(doc = "Set how the chain tip is found when the persisted leaves are unusable. Optional.")
    )]
    pub leaf_repair: LeafRepairStrategy,
    #[builder(
        default = true,
        setter(doc = "Delete dead blocks from storage? Optional.")
    )]
    pub prune_dead_blocks: bool,
    #[builder(default = true, setter(doc = "Enable logging of recovery events? Optional."))]
    pub log_events: bool,
}

impl Default for RecoveryConfiguration {
    fn default() -> Self {
        RecoveryConfiguration::builder().build()
    }
}
