//! # Domain Invariants
//!
//! Rules that must hold for a proof to be accepted and a request to be issued.

use super::errors::{SpvError, SpvResult};
use super::value_objects::{Hash256, TxHash};

/// Serialized Bitcoin-family header length.
pub const HEADER_LEN: usize = 80;

/// Equihash header length up to, but excluding, the solution.
pub const EQUIHASH_PREFIX_LEN: usize = 140;

/// Headers per chunk fetched in classic mode.
pub const DEFAULT_CHUNK_LEN: u64 = 2016;

/// Deepest proof a 64-bit position can address.
pub const MAX_PROOF_DEPTH: usize = 64;

/// Invariant: the position must address a leaf of a tree exactly as deep as
/// the proof path.
///
/// Bits of `position` at or above `path_len` would never be consulted, which
/// means the server and the client disagree about the tree shape.
pub fn invariant_position_within_depth(path_len: usize, position: u64) -> SpvResult<()> {
    if path_len > MAX_PROOF_DEPTH {
        return Err(SpvError::InvalidProof(format!(
            "path of {} siblings exceeds maximum depth {}",
            path_len, MAX_PROOF_DEPTH
        )));
    }

    let leftover = position.checked_shr(path_len as u32).unwrap_or(0);
    if leftover != 0 {
        return Err(SpvError::InvalidProof(format!(
            "position {} does not fit a tree of depth {}",
            position, path_len
        )));
    }

    Ok(())
}

/// Invariant: a proof is accepted only if the reconstructed root equals the
/// header's Merkle root.
pub fn invariant_root_matches(
    tx_hash: &TxHash,
    expected: &Hash256,
    computed: &Hash256,
) -> SpvResult<()> {
    if expected != computed {
        return Err(SpvError::RootMismatch {
            tx_hash: *tx_hash,
            expected: *expected,
            computed: *computed,
        });
    }
    Ok(())
}

/// Invariant: only confirmed transactions the local chain has reached are
/// checked against local headers.
pub fn invariant_height_reachable(height: u64, local_height: u64) -> bool {
    height > 0 && height <= local_height
}

/// Invariant: a chunk is only fetched if a checkpoint covers it.
pub fn invariant_chunk_within_checkpoints(chunk_index: u64, checkpoint_count: usize) -> bool {
    chunk_index < checkpoint_count as u64
}
