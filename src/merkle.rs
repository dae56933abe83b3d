//! Merkle inclusion-proof replay
//!
//! Walks the ordered sibling path from a transaction hash up to a block's
//! Merkle root. Guards run before any hashing: the depth cap and the
//! adjacent-duplicate-sibling rejection that closes the duplicated-hash
//! tree-mutation hole (CVE-2012-2459).

use crate::constants::MAX_PROOF_DEPTH;
use crate::error::{Result, SpvError};
use crate::hashes::{ct_eq, hash256};
use crate::types::Hash;

/// Which side of the concatenation the sibling occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// A proof step's sibling: either a literal hash or the duplicate marker
/// (`"*"` in the envelope), which folds the running hash with itself on
/// odd rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sibling {
    Duplicate,
    Hash(Hash),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofStep {
    pub sibling: Sibling,
    pub side: Side,
}

/// Pre-replay guards: depth cap and adjacent identical sibling hashes.
/// Duplicate markers are exempt — consecutive `"*"` steps occur on every
/// path through the trailing node of an odd row.
pub fn check_guards(steps: &[ProofStep]) -> Result<()> {
    if steps.len() > MAX_PROOF_DEPTH {
        return Err(SpvError::ProofTooDeep(steps.len()));
    }
    for (index, pair) in steps.windows(2).enumerate() {
        if let (Sibling::Hash(a), Sibling::Hash(b)) = (&pair[0].sibling, &pair[1].sibling) {
            if ct_eq(a, b) {
                return Err(SpvError::DuplicateSibling(index));
            }
        }
    }
    Ok(())
}

/// Replay the path from a leaf (internal byte order) to the root it
/// produces, without comparing against anything.
pub fn replay(leaf: &Hash, steps: &[ProofStep]) -> Hash {
    let mut current = *leaf;
    for step in steps {
        let sibling = match step.sibling {
            Sibling::Duplicate => current,
            Sibling::Hash(hash) => hash,
        };
        let mut concat = [0u8; 64];
        match step.side {
            Side::Left => {
                concat[..32].copy_from_slice(&sibling);
                concat[32..].copy_from_slice(&current);
            }
            Side::Right => {
                concat[..32].copy_from_slice(&current);
                concat[32..].copy_from_slice(&sibling);
            }
        }
        current = hash256(&concat);
    }
    current
}

/// Full inclusion check: guards, replay, constant-time root comparison.
/// `txid` and `merkle_root` are both in internal byte order.
pub fn verify_inclusion(txid: &Hash, steps: &[ProofStep], merkle_root: &Hash) -> Result<()> {
    check_guards(steps)?;
    let root = replay(txid, steps);
    if !ct_eq(&root, merkle_root) {
        return Err(SpvError::MerkleMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent(left: &Hash, right: &Hash) -> Hash {
        let mut concat = [0u8; 64];
        concat[..32].copy_from_slice(left);
        concat[32..].copy_from_slice(right);
        hash256(&concat)
    }

    /// Four-leaf tree; returns (leaves, root, proof for leaf 0).
    fn depth_two_tree() -> ([Hash; 4], Hash, Vec<ProofStep>) {
        let leaves = [
            hash256(b"tx-0"),
            hash256(b"tx-1"),
            hash256(b"tx-2"),
            hash256(b"tx-3"),
        ];
        let row1 = [parent(&leaves[0], &leaves[1]), parent(&leaves[2], &leaves[3])];
        let root = parent(&row1[0], &row1[1]);
        let proof = vec![
            ProofStep {
                sibling: Sibling::Hash(leaves[1]),
                side: Side::Right,
            },
            ProofStep {
                sibling: Sibling::Hash(row1[1]),
                side: Side::Right,
            },
        ];
        (leaves, root, proof)
    }

    #[test]
    fn depth_three_replay_reaches_root() {
        // Eight leaves, proving leaf 5: one Left then Right then Left step.
        let leaves: Vec<Hash> = (0u8..8).map(|i| hash256(&[i])).collect();
        let row1: Vec<Hash> = leaves.chunks(2).map(|p| parent(&p[0], &p[1])).collect();
        let row2: Vec<Hash> = row1.chunks(2).map(|p| parent(&p[0], &p[1])).collect();
        let root = parent(&row2[0], &row2[1]);

        let proof = vec![
            ProofStep {
                sibling: Sibling::Hash(leaves[4]),
                side: Side::Left,
            },
            ProofStep {
                sibling: Sibling::Hash(row1[3]),
                side: Side::Right,
            },
            ProofStep {
                sibling: Sibling::Hash(row2[0]),
                side: Side::Left,
            },
        ];
        assert!(verify_inclusion(&leaves[5], &proof, &root).is_ok());
    }

    #[test]
    fn single_byte_mutation_is_rejected() {
        let (leaves, root, proof) = depth_two_tree();
        for step_index in 0..proof.len() {
            let mut mutated = proof.clone();
            if let Sibling::Hash(ref mut hash) = mutated[step_index].sibling {
                hash[7] ^= 0x01;
            }
            assert_eq!(
                verify_inclusion(&leaves[0], &mutated, &root),
                Err(SpvError::MerkleMismatch),
                "mutation at step {step_index} must be rejected"
            );
        }
    }

    #[test]
    fn wrong_side_is_rejected() {
        let (leaves, root, mut proof) = depth_two_tree();
        proof[0].side = Side::Left;
        assert_eq!(
            verify_inclusion(&leaves[0], &proof, &root),
            Err(SpvError::MerkleMismatch)
        );
    }

    #[test]
    fn duplicate_marker_folds_odd_row() {
        // Three leaves: last one pairs with itself.
        let leaves = [hash256(b"a"), hash256(b"b"), hash256(b"c")];
        let row1 = [parent(&leaves[0], &leaves[1]), parent(&leaves[2], &leaves[2])];
        let root = parent(&row1[0], &row1[1]);
        let proof = vec![
            ProofStep {
                sibling: Sibling::Duplicate,
                side: Side::Right,
            },
            ProofStep {
                sibling: Sibling::Hash(row1[0]),
                side: Side::Left,
            },
        ];
        assert!(verify_inclusion(&leaves[2], &proof, &root).is_ok());
    }

    #[test]
    fn adjacent_identical_siblings_rejected_before_replay() {
        let repeated = hash256(b"same sibling");
        let proof = vec![
            ProofStep {
                sibling: Sibling::Hash(repeated),
                side: Side::Right,
            },
            ProofStep {
                sibling: Sibling::Hash(repeated),
                side: Side::Right,
            },
        ];
        assert_eq!(
            check_guards(&proof),
            Err(SpvError::DuplicateSibling(0))
        );
        // Even against a root the mutated replay would produce.
        let leaf = hash256(b"leaf");
        let would_be_root = replay(&leaf, &proof);
        assert_eq!(
            verify_inclusion(&leaf, &proof, &would_be_root),
            Err(SpvError::DuplicateSibling(0))
        );
    }

    #[test]
    fn adjacent_duplicate_markers_are_allowed() {
        // Five leaves: the last one folds with itself twice in a row.
        let leaves: Vec<Hash> = (0u8..5).map(|i| hash256(&[i])).collect();
        let row1 = [
            parent(&leaves[0], &leaves[1]),
            parent(&leaves[2], &leaves[3]),
            parent(&leaves[4], &leaves[4]),
        ];
        let row2 = [parent(&row1[0], &row1[1]), parent(&row1[2], &row1[2])];
        let root = parent(&row2[0], &row2[1]);
        let proof = vec![
            ProofStep {
                sibling: Sibling::Duplicate,
                side: Side::Right,
            },
            ProofStep {
                sibling: Sibling::Duplicate,
                side: Side::Right,
            },
            ProofStep {
                sibling: Sibling::Hash(row2[0]),
                side: Side::Left,
            },
        ];
        assert!(verify_inclusion(&leaves[4], &proof, &root).is_ok());
    }

    #[test]
    fn depth_cap_is_enforced() {
        let step = ProofStep {
            sibling: Sibling::Duplicate,
            side: Side::Right,
        };
        let at_cap = vec![step; MAX_PROOF_DEPTH];
        assert!(check_guards(&at_cap).is_ok());
        let over_cap = vec![step; MAX_PROOF_DEPTH + 1];
        assert_eq!(
            check_guards(&over_cap),
            Err(SpvError::ProofTooDeep(MAX_PROOF_DEPTH + 1))
        );
    }

    #[test]
    fn empty_proof_binds_leaf_to_root() {
        let leaf = hash256(b"only transaction");
        assert!(verify_inclusion(&leaf, &[], &leaf).is_ok());
        assert!(verify_inclusion(&leaf, &[], &hash256(b"other")).is_err());
    }
}
