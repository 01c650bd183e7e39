//! # Domain Errors
//!
//! Error types for SPV verification.
//!
//! None of these are fatal to the verifier. They are logged, counted and
//! recorded against the transaction; the only externally visible effect is
//! that the transaction stays unverified.

use super::value_objects::{Hash256, TxHash};
use thiserror::Error;

/// SPV verifier error types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpvError {
    /// Header not available when a proof needed verifying.
    #[error("Missing header at height {height} for tx {tx_hash}")]
    MissingHeader {
        /// Transaction whose proof could not be checked
        tx_hash: TxHash,
        /// Block height reported by the proof
        height: u64,
    },

    /// Remote endpoint reported an error for a request.
    #[error("Server error for {method}: {message}")]
    ServerError {
        /// RPC method that failed
        method: String,
        /// Error payload as reported by the server
        message: String,
    },

    /// Reconstructed root disagrees with the header's Merkle root.
    #[error("Merkle root mismatch for tx {tx_hash}: header has {expected}, proof gives {computed}")]
    RootMismatch {
        /// Transaction being verified
        tx_hash: TxHash,
        /// Root recorded in the header
        expected: Hash256,
        /// Root reconstructed from the proof
        computed: Hash256,
    },

    /// Malformed proof structure.
    #[error("Invalid Merkle proof: {0}")]
    InvalidProof(String),

    /// Response arrived after the verifier was torn down.
    #[error("Stale callback discarded")]
    StaleCallback,

    /// Header bytes could not be decoded.
    #[error("Invalid block header: {0}")]
    InvalidHeader(String),

    /// Response did not have the expected shape.
    #[error("Invalid server response: {0}")]
    InvalidResponse(String),

    /// Hex decoding failed.
    #[error("Hex decoding failed: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl SpvError {
    /// Stable label for metrics and the failure ledger.
    pub fn reason(&self) -> &'static str {
        match self {
            SpvError::MissingHeader { .. } => "missing_header",
            SpvError::ServerError { .. } => "server_error",
            SpvError::RootMismatch { .. } => "root_mismatch",
            SpvError::InvalidProof(_) => "invalid_proof",
            SpvError::StaleCallback => "stale_callback",
            SpvError::InvalidHeader(_) => "invalid_header",
            SpvError::InvalidResponse(_) => "invalid_response",
            SpvError::Hex(_) => "hex",
            SpvError::Config(_) => "config",
        }
    }
}

/// Result type for SPV operations.
pub type SpvResult<T> = Result<T, SpvError>;
