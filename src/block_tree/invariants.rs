/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Structural properties that every recovered block tree satisfies.
//!
//! A recovered tree is a finalized block plus a map of non-finalized blocks. It is well-formed when:
//! 1. **No dangling parent**: the parent of every non-finalized block is either the finalized block or
//!    another non-finalized block. See [`no_dangling_parent`].
//! 2. **Finalized excluded**: the finalized block is not among the non-finalized blocks, and every
//!    non-finalized block is at a higher slot than it. See [`finalized_excluded`].
//!
//! [Recovery](super::recovery) debug-asserts [`check_recovered_tree`] on its output.

use std::{
    collections::{BTreeMap, HashSet},
    fmt::{self, Display, Formatter},
};

use crate::types::{
    basic::{BlockIndex, CryptoHash},
    block::BlockHeader,
};

/// Check every property listed in the [module-level docs](self), returning the first violation found.
pub fn check_recovered_tree(
    finalized: &BlockIndex,
    subtree: &BTreeMap<BlockIndex, BlockHeader>,
) -> Result<(), InvariantViolation> {
    finalized_excluded(finalized, subtree)?;
    no_dangling_parent(finalized, subtree)
}

pub fn no_dangling_parent(
    finalized: &BlockIndex,
    subtree: &BTreeMap<BlockIndex, BlockHeader>,
) -> Result<(), InvariantViolation> {
    let hashes: HashSet<CryptoHash> = subtree.keys().map(|index| index.hash).collect();

    for (index, header) in subtree {
        let parent = header.parent_root();
        if parent != finalized.hash && !hashes.contains(&parent) {
            return Err(InvariantViolation::DanglingParent {
                block: *index,
                parent,
            });
        }
    }

    Ok(())
}

pub fn finalized_excluded(
    finalized: &BlockIndex,
    subtree: &BTreeMap<BlockIndex, BlockHeader>,
) -> Result<(), InvariantViolation> {
    match subtree.keys().find(|index| index.slot <= finalized.slot) {
        Some(index) if index.hash == finalized.hash => Err(InvariantViolation::FinalizedIncluded {
            finalized: *finalized,
        }),
        Some(index) => Err(InvariantViolation::NotAboveFinalized {
            block: *index,
            finalized: *finalized,
        }),
        None => Ok(()),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The parent of `block` is neither the finalized block nor in the subtree.
    DanglingParent { block: BlockIndex, parent: CryptoHash },

    /// The finalized block is in the subtree.
    FinalizedIncluded { finalized: BlockIndex },

    /// `block` is in the subtree but not above the finalized slot.
    NotAboveFinalized {
        block: BlockIndex,
        finalized: BlockIndex,
    },
}

impl Display for InvariantViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::DanglingParent { block, parent } => {
                write!(f, "parent {} of block {} is not in the tree", parent, block)
            }
            InvariantViolation::FinalizedIncluded { finalized } => {
                write!(f, "finalized block {} is in the non-finalized subtree", finalized)
            }
            InvariantViolation::NotAboveFinalized { block, finalized } => write!(
                f,
                "block {} is not above finalized block {}",
                block, finalized
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::types::basic::{ProposerIndex, Slot};

    use super::*;

    fn child(parent: &BlockHeader, slot: u64) -> BlockHeader {
        BlockHeader::new(
            Slot::new(slot),
            ProposerIndex::new(0),
            parent.hash(),
            CryptoHash::zero(),
            CryptoHash::zero(),
        )
    }

    #[test]
    fn chain_above_finalized_is_well_formed() {
        let genesis = BlockHeader::genesis(CryptoHash::zero(), CryptoHash::zero());
        let one = child(&genesis, 1);
        let two = child(&one, 2);

        let subtree = BTreeMap::from([(one.index(), one.clone()), (two.index(), two)]);
        assert_eq!(check_recovered_tree(&genesis.index(), &subtree), Ok(()));
    }

    #[test]
    fn violations_are_detected() {
        let genesis = BlockHeader::genesis(CryptoHash::zero(), CryptoHash::zero());
        let one = child(&genesis, 1);
        let two = child(&one, 2);

        let dangling = BTreeMap::from([(two.index(), two.clone())]);
        assert_eq!(
            no_dangling_parent(&genesis.index(), &dangling),
            Err(InvariantViolation::DanglingParent {
                block: two.index(),
                parent: one.hash(),
            })
        );

        let including_finalized = BTreeMap::from([(one.index(), one.clone())]);
        assert_eq!(
            finalized_excluded(&one.index(), &including_finalized),
            Err(InvariantViolation::FinalizedIncluded {
                finalized: one.index()
            })
        );

        let below = BTreeMap::from([(one.index(), one.clone())]);
        assert_eq!(
            finalized_excluded(&two.index(), &below),
            Err(InvariantViolation::NotAboveFinalized {
                block: one.index(),
                finalized: two.index()
            })
        );
    }
}
