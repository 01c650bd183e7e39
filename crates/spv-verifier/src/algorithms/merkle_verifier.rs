//! # Merkle Proof Verification
//!
//! SPV Merkle root reconstruction for Bitcoin-family chains.

use sha2::{Digest, Sha256};

use crate::domain::{invariant_position_within_depth, Hash256, SpvError, SpvResult};

/// SHA-256 applied twice, the chain's canonical transaction hash.
pub fn double_sha256(data: &[u8]) -> Hash256 {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut output = [0u8; 32];
    output.copy_from_slice(&second);
    Hash256::from_bytes(output)
}

/// Hash two nodes together.
fn hash_concat(left: &Hash256, right: &Hash256) -> Hash256 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left.as_bytes());
    buf[32..].copy_from_slice(right.as_bytes());
    double_sha256(&buf)
}

/// Reconstruct the Merkle root from a leaf and its proof path.
///
/// # Algorithm
///
/// 1. Start with the leaf as current hash
/// 2. For each step `i` in the path:
///    - bit `i` of `position` set: current = H(sibling || current)
///    - bit `i` clear: current = H(current || sibling)
/// 3. The final hash is the root
///
/// # Errors
/// - `InvalidProof` if `position` has bits beyond the path depth or the
///   path is deeper than a 64-bit position can address
pub fn reconstruct_root(leaf: &Hash256, path: &[Hash256], position: u64) -> SpvResult<Hash256> {
    invariant_position_within_depth(path.len(), position)?;

    let mut current = *leaf;
    for (i, sibling) in path.iter().enumerate() {
        current = if (position >> i) & 1 == 1 {
            hash_concat(sibling, &current)
        } else {
            hash_concat(&current, sibling)
        };
    }

    Ok(current)
}

/// Check a proof against an expected root.
pub fn verify_merkle_proof(
    leaf: &Hash256,
    path: &[Hash256],
    position: u64,
    expected_root: &Hash256,
) -> bool {
    matches!(reconstruct_root(leaf, path, position), Ok(root) if root == *expected_root)
}

/// Build the Merkle root of a list of transaction hashes.
///
/// Odd levels pair the last node with itself.
pub fn compute_merkle_root(tx_hashes: &[Hash256]) -> Hash256 {
    if tx_hashes.is_empty() {
        return Hash256::default();
    }

    let mut level: Vec<Hash256> = tx_hashes.to_vec();
    while level.len() > 1 {
        level = next_level(&level);
    }

    level[0]
}

/// Build the proof path and position for the transaction at `tx_index`.
pub fn build_merkle_proof(
    tx_hashes: &[Hash256],
    tx_index: usize,
) -> SpvResult<(Vec<Hash256>, u64)> {
    if tx_index >= tx_hashes.len() {
        return Err(SpvError::InvalidProof(format!(
            "leaf index {} out of range for {} leaves",
            tx_index,
            tx_hashes.len()
        )));
    }

    let mut path = Vec::new();
    let mut level: Vec<Hash256> = tx_hashes.to_vec();
    let mut index = tx_index;

    while level.len() > 1 {
        let sibling_index = index ^ 1;
        // Last node of an odd level is its own sibling
        let sibling = level.get(sibling_index).unwrap_or(&level[index]);
        path.push(*sibling);

        level = next_level(&level);
        index /= 2;
    }

    Ok((path, tx_index as u64))
}

fn next_level(level: &[Hash256]) -> Vec<Hash256> {
    level
        .chunks(2)
        .map(|pair| {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            hash_concat(left, right)
        })
        .collect()
}
