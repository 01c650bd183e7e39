//! # Domain Entities
//!
//! Core entities for SPV verification.

use serde::{Deserialize, Serialize};

use super::errors::SpvError;
use super::value_objects::{Hash256, TxHash};

/// Block header (Bitcoin-family, 80 bytes serialized).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block version.
    pub version: i32,
    /// Hash of parent block.
    pub prev_block_hash: Hash256,
    /// Merkle root of transactions.
    pub merkle_root: Hash256,
    /// Unix timestamp.
    pub timestamp: u32,
    /// Compact difficulty target.
    pub bits: u32,
    /// Nonce.
    pub nonce: u32,
    /// Block height.
    pub height: u64,
    /// Hash of this block.
    pub hash: Hash256,
}

/// Merkle branch as returned by `blockchain.transaction.get_merkle`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleBranch {
    /// Sibling hashes from leaf level to root.
    pub siblings: Vec<Hash256>,
    /// Leaf index; bit `i` set means the sibling at step `i` is on the left.
    pub position: u64,
    /// Height of the block the server claims contains the transaction.
    pub block_height: u64,
}

/// Last failed proof attempt for a transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct VerificationFailure {
    /// Transaction the attempt was for.
    pub tx_hash: TxHash,
    /// What went wrong.
    pub error: SpvError,
    /// Pass number the failure was observed in.
    pub tick: u64,
}

impl VerificationFailure {
    /// Stable reason label.
    pub fn reason(&self) -> &'static str {
        self.error.reason()
    }
}
