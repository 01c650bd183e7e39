//! # RPC Shapes
//!
//! Request and response shapes of the two remote methods the verifier uses.
//!
//! | Method | Params | Result |
//! |--------|--------|--------|
//! | `blockchain.block.header` | `[tx_hash]` or `[height]` | hex serialized header |
//! | `blockchain.transaction.get_merkle` | `[tx_hash, height]` | `{merkle, block_height, pos}` |

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::domain::{Hash256, HeaderKey, MerkleBranch, SpvError, SpvResult, TxHash};

/// Remote methods the verifier issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RpcMethod {
    /// Header by tx hash or height.
    #[serde(rename = "blockchain.block.header")]
    BlockHeader,
    /// Merkle branch for a transaction.
    #[serde(rename = "blockchain.transaction.get_merkle")]
    GetMerkle,
}

impl RpcMethod {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcMethod::BlockHeader => "blockchain.block.header",
            RpcMethod::GetMerkle => "blockchain.transaction.get_merkle",
        }
    }

    /// Label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            RpcMethod::BlockHeader => "header",
            RpcMethod::GetMerkle => "proof",
        }
    }
}

/// Outbound request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RpcRequest {
    /// Correlation ID.
    pub id: Uuid,
    /// Method to call.
    pub method: RpcMethod,
    /// Positional parameters.
    pub params: Vec<Value>,
}

impl RpcRequest {
    /// Header request for a key. Chunk keys have no single-header request.
    pub fn header(key: &HeaderKey) -> SpvResult<Self> {
        let param = match key {
            HeaderKey::TxHash(tx_hash) => json!(tx_hash.to_display_hex()),
            HeaderKey::Height(height) => json!(height),
            HeaderKey::Chunk(index) => {
                return Err(SpvError::InvalidResponse(format!(
                    "chunk {} is fetched through the chain, not by header request",
                    index
                )))
            }
        };
        Ok(Self {
            id: Uuid::new_v4(),
            method: RpcMethod::BlockHeader,
            params: vec![param],
        })
    }

    /// Merkle branch request.
    pub fn merkle(tx_hash: &TxHash, height: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            method: RpcMethod::GetMerkle,
            params: vec![json!(tx_hash.to_display_hex()), json!(height)],
        }
    }
}

/// Inbound response, as delivered by the network layer.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct RpcResponse {
    /// Echoed request parameters.
    #[serde(default)]
    pub params: Vec<Value>,
    /// Method result.
    #[serde(default)]
    pub result: Option<Value>,
    /// Server-reported error.
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Deserialize)]
struct MerkleResult {
    merkle: Vec<String>,
    block_height: u64,
    pos: u64,
}

impl RpcResponse {
    /// Successful response carrying `result`.
    pub fn success(params: Vec<Value>, result: Value) -> Self {
        Self {
            params,
            result: Some(result),
            error: None,
        }
    }

    /// Error response.
    pub fn failure(params: Vec<Value>, error: Value) -> Self {
        Self {
            params,
            result: None,
            error: Some(error),
        }
    }

    /// Parse a raw JSON response object.
    pub fn from_json(value: Value) -> SpvResult<Self> {
        serde_json::from_value(value).map_err(|e| SpvError::InvalidResponse(e.to_string()))
    }

    /// Server error for `method`, if the response carries one.
    pub fn server_error(&self, method: RpcMethod) -> Option<SpvError> {
        match &self.error {
            None | Some(Value::Null) => None,
            Some(error) => Some(SpvError::ServerError {
                method: method.as_str().to_string(),
                message: error.to_string(),
            }),
        }
    }

    /// Hex header from a `blockchain.block.header` result.
    pub fn header_hex(&self) -> SpvResult<&str> {
        match &self.result {
            Some(Value::String(raw)) => Ok(raw.as_str()),
            // Some servers wrap the header: {"hex": "..."}
            Some(Value::Object(map)) => map
                .get("hex")
                .and_then(Value::as_str)
                .ok_or_else(|| SpvError::InvalidResponse("header object without hex".to_string())),
            other => Err(SpvError::InvalidResponse(format!(
                "expected header hex, got {:?}",
                other
            ))),
        }
    }

    /// Merkle branch from a `blockchain.transaction.get_merkle` result.
    pub fn merkle_branch(&self) -> SpvResult<MerkleBranch> {
        let result = self.result.clone().ok_or_else(|| {
            SpvError::InvalidResponse("merkle response without result".to_string())
        })?;
        let parsed: MerkleResult = serde_json::from_value(result)
            .map_err(|e| SpvError::InvalidResponse(e.to_string()))?;

        let siblings = parsed
            .merkle
            .iter()
            .enumerate()
            .map(|(i, item)| {
                Hash256::from_display_hex(item)
                    .map_err(|e| SpvError::InvalidProof(format!("sibling {}: {}", i, e)))
            })
            .collect::<SpvResult<Vec<_>>>()?;

        Ok(MerkleBranch {
            siblings,
            position: parsed.pos,
            block_height: parsed.block_height,
        })
    }
}
