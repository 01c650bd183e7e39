//! # Algorithms Module
//!
//! Pure SPV algorithms: Merkle root reconstruction and header decoding.

pub mod header_codec;
pub mod merkle_verifier;

pub use header_codec::{deserialize_header, header_from_hex, serialize_header};
pub use merkle_verifier::{
    build_merkle_proof, compute_merkle_root, double_sha256, reconstruct_root, verify_merkle_proof,
};
