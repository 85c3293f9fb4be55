/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Startup reconstruction of the block tree from the block store.
//!
//! [`recover_block_tree`] runs once, synchronously, before the live block tree is constructed. It
//! reads a [`BlockStore`] that may have been interrupted at any point of any write, and produces the
//! last finalized block and the subtree of non-finalized blocks that descend from it.
//!
//! # Steps
//!
//! 1. **Load or repair leaves**. The persisted leaves are resolved to headers. Leaves without a header
//!    are dropped. If none survive, the leaves are rebuilt from the slot index using the configured
//!    [`LeafRepairStrategy`] and persisted again.
//! 2. **Load the finalized block**.
//! 3. **Walk every leaf** towards the finalized block, in ascending [`BlockIndex`] order. A walk
//!    succeeds when it reaches the finalized block or a block collected by an earlier walk. A walk that
//!    runs into a block at the finalized slot that is not the finalized block has found a fork: every
//!    block on it is dead, and so is every block on the fork below the finalized slot that is not on
//!    the canonical chain. A walk that runs into a dead block is dead too.
//! 4. **Prune** dead blocks out of the recovered tree, and optionally out of storage. Dead blocks are
//!    added to the leaves record before they are deleted and leave it once deleted, so a prune that
//!    fails or is disabled is completed by a later start.
//!
//! # Failures
//!
//! Conditions that a crash can cause are tolerated: missing or stale leaves, leaves that only reach
//! below the finalized block, and failing to persist repaired leaves or to delete dead blocks (these are
//! logged at error level). Everything else is returned as a [`RecoveryError`].

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashSet},
    fmt::{self, Display, Formatter},
    time::SystemTime,
};

use crate::{
    block_store::{
        accessors::{BlockStore, BlockStoreError},
        pluggables::KVStore,
    },
    config::{LeafRepairStrategy, RecoveryConfiguration},
    events::{LoadLeavesEvent, PruneBlocksEvent, RecoverBlockTreeEvent, RepairLeavesEvent},
    logging::log_event,
    types::{
        basic::{BlockIndex, CryptoHash, Slot},
        block::BlockHeader,
    },
};

use super::invariants;

/// Rebuild the block tree from `store`.
///
/// On success, if `config.prune_dead_blocks` is set and every delete succeeded, `store` holds no dead
/// blocks. Dead blocks that are left in storage, whether because a delete failed or because pruning is
/// disabled, stay in the leaves record so that the next recovery finds them again.
///
/// Failing to persist repaired leaves does not abort recovery: it is logged, and the next start
/// repairs the leaves again from the slot index.
pub fn recover_block_tree<K: KVStore>(
    store: &mut BlockStore<K>,
    config: &RecoveryConfiguration,
) -> Result<RecoveredBlockTree, RecoveryError> {
    // Step 1.
    let (mut recorded_leaves, mut leaves) = load_leaves(store)?;
    log_event(
        config.log_events,
        &LoadLeavesEvent {
            timestamp: SystemTime::now(),
            persisted: recorded_leaves.len(),
            resolved: leaves.len(),
        },
    );

    let leaves_loaded = leaves.len();
    let mut repaired_at = None;
    if leaves.is_empty() {
        let (slot, repaired) = repair_leaves(store, config.leaf_repair)?;
        log_event(
            config.log_events,
            &RepairLeavesEvent {
                timestamp: SystemTime::now(),
                strategy: config.leaf_repair,
                slot,
                leaves: repaired.len(),
            },
        );

        recorded_leaves = repaired.iter().map(|leaf| leaf.hash).collect();
        if let Err(err) = store.set_leaves(recorded_leaves.clone()) {
            log::error!("Could not persist repaired block tree leaves: {}", err);
        }

        repaired_at = Some(slot);
        leaves = repaired;
    }
    leaves.sort();
    leaves.dedup();

    // Step 2.
    let finalized = load_finalized(store)?;
    if let Some(last_known) = leaves.last() {
        log::info!(
            "Last known block {}, Last finalized {}",
            last_known,
            finalized.index()
        );
    }

    // Step 3.
    let mut walk = WalkState::default();
    let mut walks = Vec::with_capacity(leaves.len());
    for leaf in &leaves {
        let outcome = walk.walk_leaf(store, *leaf, &finalized)?;
        log::debug!("Walked leaf {}: {:?}", leaf, outcome);
        walks.push((*leaf, outcome));
    }

    // Step 4.
    let WalkState {
        dead, mut collected, ..
    } = walk;
    let mut pruned: Vec<BlockIndex> = dead.into_iter().collect();
    pruned.sort_by(|a, b| b.cmp(a));

    for block in &pruned {
        collected.remove(block);
    }

    let prune_failures = if config.prune_dead_blocks && !pruned.is_empty() {
        prune_dead_blocks(store, &pruned, &recorded_leaves, &finalized)
    } else {
        0
    };

    if !pruned.is_empty() {
        log_event(
            config.log_events,
            &PruneBlocksEvent {
                timestamp: SystemTime::now(),
                blocks: pruned.clone(),
                failures: prune_failures,
            },
        );
    }

    // Step 5.
    let recovered = RecoveredBlockTree {
        finalized,
        non_finalized: collected,
        report: RecoveryReport {
            leaves_loaded,
            repaired_at,
            walks,
            pruned,
            prune_failures,
        },
    };

    debug_assert!(
        invariants::check_recovered_tree(&recovered.finalized(), recovered.non_finalized()).is_ok()
    );

    log_event(
        config.log_events,
        &RecoverBlockTreeEvent {
            timestamp: SystemTime::now(),
            last_known: recovered.last_known(),
            last_finalized: recovered.finalized(),
            non_finalized: recovered.non_finalized().len(),
        },
    );

    Ok(recovered)
}

/// The block tree recovered from storage: the last finalized block and every live block above it.
#[derive(Clone, Debug)]
pub struct RecoveredBlockTree {
    finalized: BlockHeader,
    non_finalized: BTreeMap<BlockIndex, BlockHeader>,
    report: RecoveryReport,
}

impl RecoveredBlockTree {
    pub fn finalized(&self) -> BlockIndex {
        self.finalized.index()
    }

    pub fn finalized_header(&self) -> &BlockHeader {
        &self.finalized
    }

    /// Every live block strictly above the finalized block. The parent of every entry is either the
    /// finalized block or another entry.
    pub fn non_finalized(&self) -> &BTreeMap<BlockIndex, BlockHeader> {
        &self.non_finalized
    }

    /// The highest block in the recovered tree, which is the finalized block if no block is above it.
    pub fn last_known(&self) -> BlockIndex {
        self.non_finalized
            .keys()
            .next_back()
            .copied()
            .unwrap_or_else(|| self.finalized())
    }

    pub fn report(&self) -> &RecoveryReport {
        &self.report
    }

    /// Hand the recovered tree over to its consumer.
    pub fn into_parts(self) -> (BlockIndex, BTreeMap<BlockIndex, BlockHeader>) {
        (self.finalized.index(), self.non_finalized)
    }
}

/// What recovery found and did, for diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Number of persisted leaves whose header was found.
    pub leaves_loaded: usize,
    /// The slot leaves were repaired at, if they were repaired.
    pub repaired_at: Option<Slot>,
    /// How the walk from each leaf ended, in walk order.
    pub walks: Vec<(BlockIndex, LeafOutcome)>,
    /// Dead blocks, in descending order. These are excluded from the recovered tree whether or not they
    /// were deleted from storage.
    pub pruned: Vec<BlockIndex>,
    /// Number of dead blocks left in storage because a deletion failed. These are found and deleted
    /// again by the next recovery.
    pub prune_failures: usize,
}

/// How the walk from a leaf towards the finalized block ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeafOutcome {
    /// Reached the finalized block. Every block on the walk is live.
    ReachedFinalized,
    /// Reached a block kept by an earlier walk. Every block on the walk is live.
    JoinedObserved,
    /// Reached a dead block. Every block on the walk is dead.
    JoinedDead,
    /// Reached a block at the finalized slot other than the finalized block. Every block on the walk is
    /// dead.
    ForkedAtFinalizedSlot,
    /// Reached a block below the finalized slot without meeting the finalized block. Nothing on the walk
    /// is kept or pruned.
    BelowFinalized,
}

#[derive(Default)]
struct WalkState {
    /// Hashes of blocks kept by completed walks.
    observed: HashSet<CryptoHash>,
    dead: HashSet<BlockIndex>,
    collected: BTreeMap<BlockIndex, BlockHeader>,
}

impl WalkState {
    fn walk_leaf<K: KVStore>(
        &mut self,
        store: &BlockStore<K>,
        leaf: BlockIndex,
        finalized: &BlockHeader,
    ) -> Result<LeafOutcome, RecoveryError> {
        let mut subchain: Vec<(BlockIndex, BlockHeader)> = Vec::new();
        let mut current = leaf.hash;

        let outcome = loop {
            if current == finalized.hash() {
                break LeafOutcome::ReachedFinalized;
            }

            if self.observed.contains(&current) {
                break LeafOutcome::JoinedObserved;
            }

            let child = subchain.last().map(|(index, _)| *index);
            let header = match store.try_get_block_header(&current) {
                Ok(Some(header)) => header,
                Ok(None) => {
                    return Err(RecoveryError::SubchainHeaderMissing {
                        block: current,
                        child,
                        source: None,
                    })
                }
                Err(source) => {
                    return Err(RecoveryError::SubchainHeaderMissing {
                        block: current,
                        child,
                        source: Some(source),
                    })
                }
            };
            let index = header.index();

            if let Some(child) = child {
                if index.slot >= child.slot {
                    return Err(RecoveryError::NonDecreasingSlot {
                        child,
                        parent: index,
                    });
                }
            }

            if self.dead.contains(&index) {
                self.mark_dead(&subchain);
                break LeafOutcome::JoinedDead;
            }

            match index.slot.cmp(&finalized.slot()) {
                Ordering::Equal => {
                    log::warn!(
                        "Block {} is at the finalized slot but is not the finalized block {}",
                        index,
                        finalized.index()
                    );
                    self.mark_dead(&subchain);
                    self.walk_fork(store, header, finalized);
                    break LeafOutcome::ForkedAtFinalizedSlot;
                }
                Ordering::Less => {
                    log::warn!(
                        "Walk from leaf {} went below the finalized slot at block {}",
                        leaf,
                        index
                    );
                    return Ok(LeafOutcome::BelowFinalized);
                }
                Ordering::Greater => {
                    current = header.parent_root();
                    subchain.push((index, header));
                }
            }
        };

        if matches!(
            outcome,
            LeafOutcome::ReachedFinalized | LeafOutcome::JoinedObserved
        ) {
            for (index, header) in subchain {
                self.observed.insert(index.hash);
                self.collected.insert(index, header);
            }
        }

        Ok(outcome)
    }

    fn mark_dead(&mut self, subchain: &[(BlockIndex, BlockHeader)]) {
        self.dead.extend(subchain.iter().map(|(index, _)| *index));
    }

    /// Walk `fork` and the canonical chain from `finalized` down in lock-step, marking every fork block
    /// that is not on the canonical chain as dead.
    fn walk_fork<K: KVStore>(
        &mut self,
        store: &BlockStore<K>,
        fork: BlockHeader,
        finalized: &BlockHeader,
    ) {
        let mut fork = fork;
        let mut main = finalized.clone();

        while fork.hash() != main.hash() {
            let (step_fork, step_main) = match fork.slot().cmp(&main.slot()) {
                Ordering::Equal => {
                    self.dead.insert(fork.index());
                    if fork.parent_root() == main.parent_root() {
                        break;
                    }
                    (true, true)
                }
                Ordering::Greater => {
                    log::warn!(
                        "Fork block {} has no canonical counterpart at its slot",
                        fork.index()
                    );
                    self.dead.insert(fork.index());
                    (true, false)
                }
                Ordering::Less => (false, true),
            };

            if step_fork {
                match parent_of(store, &fork) {
                    Some(parent) => fork = parent,
                    None => break,
                }
            }
            if step_main {
                match parent_of(store, &main) {
                    Some(parent) => main = parent,
                    None => break,
                }
            }
        }
    }
}

fn parent_of<K: KVStore>(store: &BlockStore<K>, child: &BlockHeader) -> Option<BlockHeader> {
    match store.try_get_block_header(&child.parent_root()) {
        Ok(Some(parent)) if parent.slot() < child.slot() => Some(parent),
        Ok(Some(parent)) => {
            log::debug!(
                "Parent {} of {} is not below it, stopping fork walk",
                parent.index(),
                child.index()
            );
            None
        }
        Ok(None) => {
            log::debug!(
                "Parent {} of {} not found, stopping fork walk",
                child.parent_root(),
                child.index()
            );
            None
        }
        Err(err) => {
            log::debug!(
                "Could not read parent of {}, stopping fork walk: {}",
                child.index(),
                err
            );
            None
        }
    }
}

/// Delete the `dead` blocks from storage, returning how many of them are left in storage.
///
/// Every dead block is added to the leaves record before any is deleted, and a block only leaves the
/// record once it is deleted. Deletion stops at the first failure. Together with the order given by
/// [`deletion_order`], this keeps every dead block that is left behind reachable by the next recovery.
fn prune_dead_blocks<K: KVStore>(
    store: &mut BlockStore<K>,
    dead: &[BlockIndex],
    recorded_leaves: &[CryptoHash],
    finalized: &BlockHeader,
) -> usize {
    let mut leaves = recorded_leaves.to_vec();
    leaves.extend(dead.iter().map(|block| block.hash));
    if let Err(err) = store.set_leaves(leaves.clone()) {
        log::error!(
            "Could not record dead blocks in block tree leaves, leaving them in storage: {}",
            err
        );
        return dead.len();
    }

    let mut deleted = HashSet::with_capacity(dead.len());
    for block in deletion_order(dead, finalized.slot()) {
        if let Err(err) = store.remove_block(&block.hash) {
            log::error!(
                "Could not remove dead block {}, {} dead blocks left for the next start: {}",
                block,
                dead.len() - deleted.len(),
                err
            );
            break;
        }
        deleted.insert(block.hash);
    }

    leaves.retain(|leaf| !deleted.contains(leaf));
    if leaves.is_empty() {
        leaves.push(finalized.hash());
    }
    if let Err(err) = store.set_leaves(leaves) {
        log::error!("Could not remove dead blocks from block tree leaves: {}", err);
    }

    dead.len() - deleted.len()
}

/// Order dead blocks for deletion so that any prefix of the order can be deleted without cutting a
/// remaining dead block off from the walk that finds it:
/// 1. Blocks above `finalized_slot`, children before parents.
/// 2. Blocks below `finalized_slot`, parents before children, so that what remains of a fork below the
///    finalized slot still hangs off its block at the finalized slot.
/// 3. Blocks at `finalized_slot`.
fn deletion_order(dead: &[BlockIndex], finalized_slot: Slot) -> Vec<BlockIndex> {
    let mut above: Vec<BlockIndex> = dead
        .iter()
        .filter(|block| block.slot > finalized_slot)
        .copied()
        .collect();
    above.sort_by(|a, b| b.cmp(a));

    let mut below: Vec<BlockIndex> = dead
        .iter()
        .filter(|block| block.slot < finalized_slot)
        .copied()
        .collect();
    below.sort();

    let at = dead.iter().filter(|block| block.slot == finalized_slot).copied();

    above.into_iter().chain(below).chain(at).collect()
}

/// Read the persisted leaves and resolve them to headers, returning both. Leaves without a header are
/// dropped.
fn load_leaves<K: KVStore>(
    store: &BlockStore<K>,
) -> Result<(Vec<CryptoHash>, Vec<BlockIndex>), RecoveryError> {
    let persisted = match store.get_leaves() {
        Ok(leaves) => leaves,
        Err(BlockStoreError::LeavesNotFound) => {
            log::warn!("Block tree leaves not found");
            Vec::new()
        }
        Err(source) => return Err(RecoveryError::LeavesUnreadable(source)),
    };

    let mut leaves = Vec::with_capacity(persisted.len());
    for hash in &persisted {
        match store.try_get_block_header(hash) {
            Ok(Some(header)) => leaves.push(header.index()),
            Ok(None) => log::trace!("Leaf {} has no header, dropping it", hash),
            Err(source) => {
                return Err(RecoveryError::LeafCorrupted {
                    leaf: *hash,
                    source,
                })
            }
        }
    }

    Ok((persisted, leaves))
}

/// Find the highest slot whose blocks have headers, and return it along with those blocks.
fn repair_leaves<K: KVStore>(
    store: &BlockStore<K>,
    strategy: LeafRepairStrategy,
) -> Result<(Slot, Vec<BlockIndex>), RecoveryError> {
    let mut slots = store
        .seek_last_slot()
        .map_err(RecoveryError::SlotSearchFailed)?;
    let Some(last_occupied) = slots.slot() else {
        return Err(RecoveryError::NoBlocksFound);
    };

    match strategy {
        LeafRepairStrategy::Bisection => {
            let slot = bisect_last_slot(store)?;
            if slot != last_occupied {
                log::warn!(
                    "Slot search found slot {} but the highest occupied slot is {}, slot occupancy has gaps",
                    slot,
                    last_occupied
                );
            }

            let hashes = store
                .get_block_hashes(slot)
                .map_err(RecoveryError::SlotSearchFailed)?;
            let leaves = resolve_slot(store, slot, &hashes)?;
            if leaves.is_empty() {
                return Err(RecoveryError::NoBlocksFound);
            }
            Ok((slot, leaves))
        }

        LeafRepairStrategy::LastOccupiedSlot => {
            loop {
                let (slot, leaves) = match (slots.slot(), slots.hashes()) {
                    (Some(slot), Some(hashes)) => (slot, resolve_slot(store, slot, hashes)?),
                    _ => break,
                };
                if !leaves.is_empty() {
                    return Ok((slot, leaves));
                }
                log::warn!("No block at slot {} has a header", slot);
                slots.prev().map_err(RecoveryError::SlotSearchFailed)?;
            }
            Err(RecoveryError::NoBlocksFound)
        }
    }
}

/// Binary search for the highest slot that has blocks, assuming that the occupied slots form a prefix
/// of the slot space.
fn bisect_last_slot<K: KVStore>(store: &BlockStore<K>) -> Result<Slot, RecoveryError> {
    let mut lower = Slot::MIN.int();
    let mut upper = Slot::MAX.int();

    while lower < upper {
        let middle = lower + (upper - lower) / 2 + 1;
        let occupied = !store
            .get_block_hashes(Slot::new(middle))
            .map_err(RecoveryError::SlotSearchFailed)?
            .is_empty();
        if occupied {
            lower = middle;
        } else {
            upper = middle - 1;
        }
    }

    Ok(Slot::new(lower))
}

/// Resolve the blocks recorded at `slot` to their indices, skipping those without a header.
fn resolve_slot<K: KVStore>(
    store: &BlockStore<K>,
    slot: Slot,
    hashes: &[CryptoHash],
) -> Result<Vec<BlockIndex>, RecoveryError> {
    let mut leaves = Vec::with_capacity(hashes.len());
    for hash in hashes {
        match store.try_get_block_header(hash) {
            Ok(Some(header)) if header.slot() == slot => leaves.push(header.index()),
            Ok(Some(header)) => {
                return Err(RecoveryError::InconsistentSlotIndex {
                    slot,
                    block: *hash,
                    header_slot: header.slot(),
                })
            }
            Ok(None) => log::warn!(
                "Block {} is recorded at slot {} but has no header",
                hash,
                slot
            ),
            Err(source) => {
                return Err(RecoveryError::LeafCorrupted {
                    leaf: *hash,
                    source,
                })
            }
        }
    }
    Ok(leaves)
}

fn load_finalized<K: KVStore>(store: &BlockStore<K>) -> Result<BlockHeader, RecoveryError> {
    let finalized = store
        .get_last_finalized()
        .map_err(RecoveryError::FinalizedBlockNotFound)?;

    let header = store
        .get_block_header(&finalized.hash)
        .map_err(|source| RecoveryError::FinalizedHeaderUnavailable { finalized, source })?;

    if header.slot() != finalized.slot {
        log::warn!(
            "Last finalized block recorded as {} but its header is at slot {}",
            finalized,
            header.slot()
        );
    }

    Ok(header)
}

/// Errors that abort block tree recovery.
#[derive(Debug)]
pub enum RecoveryError {
    /// The slot index records no block whose header exists.
    NoBlocksFound,

    /// The last finalized block could not be read.
    FinalizedBlockNotFound(BlockStoreError),

    /// The header of the last finalized block could not be read.
    FinalizedHeaderUnavailable {
        finalized: BlockIndex,
        source: BlockStoreError,
    },

    /// The block tree leaves record exists but could not be read.
    LeavesUnreadable(BlockStoreError),

    /// The header of a leaf (or of a block recorded in the slot index) could not be read.
    LeafCorrupted {
        leaf: CryptoHash,
        source: BlockStoreError,
    },

    /// The slot index could not be read while searching for the chain tip.
    SlotSearchFailed(BlockStoreError),

    /// The slot index records `block` at `slot`, but its header says it is at `header_slot`.
    InconsistentSlotIndex {
        slot: Slot,
        block: CryptoHash,
        header_slot: Slot,
    },

    /// The header of `block`, which is on the path from a leaf to the finalized block, is missing
    /// (`source` is `None`) or could not be read. `child` is the block whose parent it is, if any.
    SubchainHeaderMissing {
        block: CryptoHash,
        child: Option<BlockIndex>,
        source: Option<BlockStoreError>,
    },

    /// `parent` is the parent of `child` but is not at a lower slot.
    NonDecreasingSlot {
        child: BlockIndex,
        parent: BlockIndex,
    },
}

/// Broad classes of [`RecoveryError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryErrorKind {
    /// Stored data contradicts itself or cannot be decoded.
    Corrupted,
    /// The storage lacks something every initialized store has.
    StructurallyImpossible,
    /// The storage engine failed.
    Storage,
}

impl RecoveryError {
    pub fn kind(&self) -> RecoveryErrorKind {
        use RecoveryErrorKind::*;

        match self {
            RecoveryError::NoBlocksFound => StructurallyImpossible,
            RecoveryError::FinalizedBlockNotFound(source)
            | RecoveryError::FinalizedHeaderUnavailable { source, .. } => {
                classify(source, StructurallyImpossible)
            }
            RecoveryError::LeavesUnreadable(source)
            | RecoveryError::LeafCorrupted { source, .. }
            | RecoveryError::SlotSearchFailed(source) => classify(source, Corrupted),
            RecoveryError::SubchainHeaderMissing { source, .. } => match source {
                Some(source) => classify(source, Corrupted),
                None => StructurallyImpossible,
            },
            RecoveryError::InconsistentSlotIndex { .. } | RecoveryError::NonDecreasingSlot { .. } => {
                Corrupted
            }
        }
    }
}

fn classify(source: &BlockStoreError, otherwise: RecoveryErrorKind) -> RecoveryErrorKind {
    if source.is_corruption() {
        RecoveryErrorKind::Corrupted
    } else if let BlockStoreError::KVError(_) = source {
        RecoveryErrorKind::Storage
    } else {
        otherwise
    }
}

impl Display for RecoveryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryError::NoBlocksFound => write!(f, "block store contains no blocks"),
            RecoveryError::FinalizedBlockNotFound(source) => {
                write!(f, "cannot read last finalized block: {}", source)
            }
            RecoveryError::FinalizedHeaderUnavailable { finalized, source } => write!(
                f,
                "cannot read header of last finalized block {}: {}",
                finalized, source
            ),
            RecoveryError::LeavesUnreadable(source) => {
                write!(f, "cannot read block tree leaves: {}", source)
            }
            RecoveryError::LeafCorrupted { leaf, source } => {
                write!(f, "cannot read header of leaf {}: {}", leaf, source)
            }
            RecoveryError::SlotSearchFailed(source) => {
                write!(f, "cannot search the slot index: {}", source)
            }
            RecoveryError::InconsistentSlotIndex {
                slot,
                block,
                header_slot,
            } => write!(
                f,
                "slot index records block {} at slot {} but its header is at slot {}",
                block, slot, header_slot
            ),
            RecoveryError::SubchainHeaderMissing {
                block,
                child,
                source,
            } => {
                write!(f, "header of block {} not found", block)?;
                if let Some(child) = child {
                    write!(f, " (parent of {})", child)?;
                }
                if let Some(source) = source {
                    write!(f, ": {}", source)?;
                }
                Ok(())
            }
            RecoveryError::NonDecreasingSlot { child, parent } => write!(
                f,
                "block {} has parent {} at a slot that is not lower",
                child, parent
            ),
        }
    }
}

impl std::error::Error for RecoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecoveryError::FinalizedBlockNotFound(source)
            | RecoveryError::FinalizedHeaderUnavailable { source, .. }
            | RecoveryError::LeavesUnreadable(source)
            | RecoveryError::LeafCorrupted { source, .. }
            | RecoveryError::SlotSearchFailed(source) => Some(source),
            RecoveryError::SubchainHeaderMissing {
                source: Some(source),
                ..
            } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::block_store::pluggables::{KVError, Space};

    use super::*;

    #[test]
    fn error_kinds_follow_their_source() {
        let engine_failure = RecoveryError::FinalizedBlockNotFound(BlockStoreError::KVError(
            KVError::new(Space::Default, "disk unplugged"),
        ));
        assert_eq!(engine_failure.kind(), RecoveryErrorKind::Storage);

        let never_initialized =
            RecoveryError::FinalizedBlockNotFound(BlockStoreError::FinalizedBlockNotFound);
        assert_eq!(
            never_initialized.kind(),
            RecoveryErrorKind::StructurallyImpossible
        );

        let corrupted = RecoveryError::LeafCorrupted {
            leaf: CryptoHash::zero(),
            source: BlockStoreError::HeaderHashMismatch {
                key: CryptoHash::zero(),
                computed: CryptoHash::new([1; 32]),
            },
        };
        assert_eq!(corrupted.kind(), RecoveryErrorKind::Corrupted);

        let dangling = RecoveryError::SubchainHeaderMissing {
            block: CryptoHash::zero(),
            child: None,
            source: None,
        };
        assert_eq!(dangling.kind(), RecoveryErrorKind::StructurallyImpossible);
        assert_eq!(RecoveryError::NoBlocksFound.kind(), RecoveryErrorKind::StructurallyImpossible);
    }
}
