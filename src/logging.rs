/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the recovery
//! [configuration](crate::config::RecoveryConfiguration).
//!
//! This crate logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how a [RecoverBlockTree](crate::events::RecoverBlockTreeEvent) is printed:
//!
//! ```text
//! RecoverBlockTree, 1701329264, fNGCJyk, 12, Id5u7f6, 8, 4
//! ```
//!
//! In the snippet:
//! - The third and fourth values are the first seven characters of the Base64 encoding of the hash of
//!   the last known block, and its slot.
//! - The fifth and sixth values are the same for the last finalized block.
//! - The seventh value is the number of non-finalized blocks recovered.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use std::time::SystemTime;

use crate::events::*;

// Names of each event in PascalCase for printing:
pub const LOAD_LEAVES: &str = "LoadLeaves";
pub const REPAIR_LEAVES: &str = "RepairLeaves";
pub const PRUNE_BLOCKS: &str = "PruneBlocks";
pub const RECOVER_BLOCK_TREE: &str = "RecoverBlockTree";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

/// Log `event` with its default logging handler if `log_events` is set.
pub(crate) fn log_event<E: Logger>(log_events: bool, event: &E) {
    if log_events {
        (E::get_logger())(event)
    }
}

impl Logger for LoadLeavesEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |load_leaves_event: &LoadLeavesEvent| {
            log::info!(
                "{}, {}, {}, {}",
                LOAD_LEAVES,
                secs_since_unix_epoch(load_leaves_event.timestamp),
                load_leaves_event.persisted,
                load_leaves_event.resolved
            )
        };
        Box::new(logger)
    }
}

impl Logger for RepairLeavesEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |repair_leaves_event: &RepairLeavesEvent| {
            log::warn!(
                "{}, {}, {:?}, {}, {}",
                REPAIR_LEAVES,
                secs_since_unix_epoch(repair_leaves_event.timestamp),
                repair_leaves_event.strategy,
                repair_leaves_event.slot,
                repair_leaves_event.leaves
            )
        };
        Box::new(logger)
    }
}

impl Logger for PruneBlocksEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |prune_blocks_event: &PruneBlocksEvent| {
            let blocks: Vec<String> = prune_blocks_event
                .blocks
                .iter()
                .map(|block| {
                    format!(
                        "{}@{}",
                        first_seven_base64_chars(&block.hash.bytes()),
                        block.slot
                    )
                })
                .collect();
            log::warn!(
                "{}, {}, {}, {}, [{}]",
                PRUNE_BLOCKS,
                secs_since_unix_epoch(prune_blocks_event.timestamp),
                prune_blocks_event.blocks.len(),
                prune_blocks_event.failures,
                blocks.join(" ")
            )
        };
        Box::new(logger)
    }
}

impl Logger for RecoverBlockTreeEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |recover_block_tree_event: &RecoverBlockTreeEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}, {}",
                RECOVER_BLOCK_TREE,
                secs_since_unix_epoch(recover_block_tree_event.timestamp),
                first_seven_base64_chars(&recover_block_tree_event.last_known.hash.bytes()),
                recover_block_tree_event.last_known.slot,
                first_seven_base64_chars(&recover_block_tree_event.last_finalized.hash.bytes()),
                recover_block_tree_event.last_finalized.slot,
                recover_block_tree_event.non_finalized
            )
        };
        Box::new(logger)
    }
}

// Get a more readable representation of a bytesequence by base64-encoding it and taking the first 7 characters.
fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

// Timestamps before the Unix Epoch are printed as 0.
fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_hash_is_at_most_seven_chars() {
        assert_eq!(first_seven_base64_chars(&[0u8; 32]), "AAAAAAA");
        assert_eq!(first_seven_base64_chars(&[0u8; 3]), "AAAA");
    }
}
