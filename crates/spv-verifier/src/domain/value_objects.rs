//! # Domain Value Objects
//!
//! Immutable value types for SPV verification.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::errors::{SpvError, SpvResult};

/// Length of a hash in bytes.
pub const HASH_LEN: usize = 32;

/// 32-byte double-SHA-256 digest in internal (serialization) byte order.
///
/// Servers and block explorers show these hashes byte-reversed; that form is
/// called the *display* form here and is what `Display`, `Serialize` and
/// [`Hash256::from_display_hex`] use.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash256([u8; HASH_LEN]);

impl Hash256 {
    /// Wrap raw bytes in internal order.
    pub const fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Build from a slice in internal order.
    pub fn from_slice(bytes: &[u8]) -> SpvResult<Self> {
        let array: [u8; HASH_LEN] = bytes.try_into().map_err(|_| {
            SpvError::InvalidResponse(format!(
                "expected {} hash bytes, got {}",
                HASH_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    /// Parse the byte-reversed hex form used on the wire.
    pub fn from_display_hex(s: &str) -> SpvResult<Self> {
        let mut bytes = hex::decode(s)?;
        bytes.reverse();
        Self::from_slice(&bytes)
    }

    /// Byte-reversed hex form used on the wire.
    pub fn to_display_hex(&self) -> String {
        let mut bytes = self.0;
        bytes.reverse();
        hex::encode(bytes)
    }

    /// Raw bytes in internal order.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_hex())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self.to_display_hex())
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_display_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash256::from_display_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Transaction identifier.
pub type TxHash = Hash256;

/// Opaque handle to the chain currently considered best.
///
/// A change of handle between two passes is the reorg signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainRef(pub u64);

impl fmt::Display for ChainRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chain#{}", self.0)
    }
}

/// Key into the header state.
///
/// Each verification mode uses exactly one key family; they never mix within
/// one verifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HeaderKey {
    /// Header fetched by the hash of a transaction it contains.
    TxHash(TxHash),
    /// Header fetched by block height.
    Height(u64),
    /// Bulk chunk of headers, by chunk index.
    Chunk(u64),
}

impl fmt::Display for HeaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderKey::TxHash(hash) => write!(f, "tx:{}", hash),
            HeaderKey::Height(height) => write!(f, "height:{}", height),
            HeaderKey::Chunk(index) => write!(f, "chunk:{}", index),
        }
    }
}

/// Trusted checkpoint held by the chain.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Checkpoint {
    /// Block height of this checkpoint.
    pub height: u64,
    /// Block hash at this height.
    pub hash: Hash256,
}

impl Checkpoint {
    /// Create a new checkpoint.
    pub fn new(height: u64, hash: Hash256) -> Self {
        Self { height, hash }
    }
}

/// Server connection the verifier is currently talking to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceInfo {
    /// Server identifier (host:port).
    pub server: String,
    /// Chain tip height reported by the server.
    pub tip: u64,
}

impl InterfaceInfo {
    /// Create interface info.
    pub fn new(server: impl Into<String>, tip: u64) -> Self {
        Self {
            server: server.into(),
            tip,
        }
    }
}

/// Details handed to the wallet when a transaction is proven.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedTx {
    /// Height of the including block.
    pub height: u64,
    /// Timestamp of the including block.
    pub timestamp: u32,
    /// Position of the transaction within the block.
    pub pos: u64,
}

/// Observable verification state of a single transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxVerificationStatus {
    /// Nothing requested yet.
    NotTracked,
    /// Header (or chunk) requested, awaiting response.
    HeaderPending,
    /// Header available, proof not yet requested.
    HeaderReady,
    /// Proof requested, or a proof attempt failed.
    ProofPending,
    /// Proof accepted.
    Verified,
}
