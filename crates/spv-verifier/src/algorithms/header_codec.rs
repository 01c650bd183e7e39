//! # Header Codec
//!
//! Decoding of serialized Bitcoin-family block headers.
//!
//! ```text
//! offset  size  field
//! 0       4     version       (i32 LE)
//! 4       32    prev block    (internal order)
//! 36      32    merkle root   (internal order)
//! 68      4     timestamp     (u32 LE)
//! 72      4     bits          (u32 LE)
//! 76      4     nonce         (u32 LE)
//! ```
//!
//! Equihash chains (Zcash, Komodo) serve longer headers. The first 68 bytes
//! match; after them come a 32-byte reserved root, the timestamp and bits,
//! a 32-byte nonce and the solution:
//!
//! ```text
//! 68      32    reserved      (skipped)
//! 100     4     timestamp     (u32 LE)
//! 104     4     bits          (u32 LE)
//! 108     32    nonce         (low 4 bytes kept)
//! 140     ..    solution      (skipped)
//! ```
//!
//! The block hash always covers every byte received.

use super::merkle_verifier::double_sha256;
use crate::domain::{
    BlockHeader, Hash256, SpvError, SpvResult, EQUIHASH_PREFIX_LEN, HEADER_LEN,
};

/// Decode a header and compute its block hash.
///
/// Exactly [`HEADER_LEN`] bytes is the Bitcoin layout; anything of at least
/// [`EQUIHASH_PREFIX_LEN`] bytes is the Equihash layout. Other lengths are
/// rejected.
pub fn deserialize_header(bytes: &[u8], height: u64) -> SpvResult<BlockHeader> {
    let tail = match bytes.len() {
        HEADER_LEN => 68,
        len if len >= EQUIHASH_PREFIX_LEN => 100,
        len => {
            return Err(SpvError::InvalidHeader(format!(
                "expected {} or at least {} bytes, got {}",
                HEADER_LEN, EQUIHASH_PREFIX_LEN, len
            )))
        }
    };

    Ok(BlockHeader {
        version: i32::from_le_bytes(le_word(bytes, 0)),
        prev_block_hash: Hash256::from_slice(&bytes[4..36])?,
        merkle_root: Hash256::from_slice(&bytes[36..68])?,
        timestamp: u32::from_le_bytes(le_word(bytes, tail)),
        bits: u32::from_le_bytes(le_word(bytes, tail + 4)),
        nonce: u32::from_le_bytes(le_word(bytes, tail + 8)),
        height,
        hash: double_sha256(bytes),
    })
}

/// Decode a hex-encoded header as returned by `blockchain.block.header`.
pub fn header_from_hex(raw: &str, height: u64) -> SpvResult<BlockHeader> {
    let bytes = hex::decode(raw.trim())?;
    deserialize_header(&bytes, height)
}

/// Serialize a header to the 80-byte Bitcoin layout.
///
/// Headers decoded from the Equihash layout do not round-trip: the reserved
/// root, the upper nonce bytes and the solution are not kept.
pub fn serialize_header(header: &BlockHeader) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN);
    out.extend_from_slice(&header.version.to_le_bytes());
    out.extend_from_slice(header.prev_block_hash.as_bytes());
    out.extend_from_slice(header.merkle_root.as_bytes());
    out.extend_from_slice(&header.timestamp.to_le_bytes());
    out.extend_from_slice(&header.bits.to_le_bytes());
    out.extend_from_slice(&header.nonce.to_le_bytes());
    out
}

fn le_word(bytes: &[u8], offset: usize) -> [u8; 4] {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    word
}
