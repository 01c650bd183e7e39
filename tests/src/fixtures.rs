//! # Fixtures
//!
//! Real mainnet data and pre-wired collaborator doubles.

use serde_json::json;
use std::sync::Arc;

use spv_verifier::{
    build_merkle_proof, compute_merkle_root, BlockHeader, ChainRef, Hash256, MockChain,
    MockNetwork, MockWallet, RpcRequest, RpcResponse, TxHash, VerificationJob, VerifierConfig,
};

/// Bitcoin genesis block header.
pub const GENESIS_HEADER_HEX: &str = concat!(
    "0100000000000000000000000000000000000000000000000000000000000000",
    "000000003ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa",
    "4b1e5e4a29ab5f49ffff001d1dac2b7c",
);

/// First Bitcoin transfer, position 1 in block 170.
pub const BLOCK_170_TX: &str = "f4184fc596403b9d638783cf57adfe4c75c605f6356fbc91338530e9831e9e16";

/// Coinbase of block 170, the only sibling of [`BLOCK_170_TX`].
pub const BLOCK_170_COINBASE: &str =
    "b1fea52486ce0c62bb442b530a3f0132b826c74e473d1f2c220bfa78111c5082";

/// Merkle root of block 170.
pub const BLOCK_170_ROOT: &str = "7dac2c5666815c17a3b36427de37bb9d2e2c5ccec3f8633eb91a4205cb4c10ff";

/// Parse a display-form hash constant.
pub fn display_hash(hex: &str) -> Hash256 {
    Hash256::from_display_hex(hex).expect("fixture hash")
}

/// Header of block 170 with its real Merkle root.
pub fn block_170_header() -> BlockHeader {
    BlockHeader {
        version: 1,
        prev_block_hash: Hash256::default(),
        merkle_root: display_hash(BLOCK_170_ROOT),
        timestamp: 1_231_731_025,
        bits: 0x1d00_ffff,
        nonce: 1_889_418_792,
        height: 170,
        hash: Hash256::default(),
    }
}

/// `blockchain.transaction.get_merkle` result for the block 170 transfer.
pub fn block_170_proof_response() -> RpcResponse {
    RpcResponse::from_json(json!({
        "params": [BLOCK_170_TX, 170],
        "result": {
            "merkle": [BLOCK_170_COINBASE],
            "block_height": 170,
            "pos": 1
        }
    }))
    .expect("fixture response")
}

/// Deterministic transaction hash.
pub fn tx(id: u32) -> TxHash {
    let mut bytes = [0u8; 32];
    bytes[..4].copy_from_slice(&id.to_le_bytes());
    bytes[31] = 0xA5;
    Hash256::from_bytes(bytes)
}

/// Block of `count` synthetic transactions starting at id `first`.
pub fn synthetic_block(height: u64, first: u32, count: u32) -> (Vec<TxHash>, BlockHeader) {
    let txs: Vec<TxHash> = (first..first + count).map(tx).collect();
    let header = BlockHeader {
        version: 0x2000_0000,
        prev_block_hash: Hash256::from_bytes([0x11; 32]),
        merkle_root: compute_merkle_root(&txs),
        timestamp: 1_700_000_000 + height as u32,
        bits: 0x1703_a30c,
        nonce: 0,
        height,
        hash: Hash256::from_bytes([height as u8; 32]),
    };
    (txs, header)
}

/// Merkle branch response for `txs[index]`, as a server would send it.
pub fn proof_response(txs: &[TxHash], index: usize, height: u64) -> RpcResponse {
    let (path, pos) = build_merkle_proof(txs, index).expect("index in range");
    RpcResponse::success(
        vec![json!(txs[index].to_display_hex()), json!(height)],
        json!({
            "merkle": path.iter().map(Hash256::to_display_hex).collect::<Vec<_>>(),
            "block_height": height,
            "pos": pos,
        }),
    )
}

/// Wallet, chain and network doubles sharing one chain.
pub struct Wiring {
    /// Wallet double.
    pub wallet: Arc<MockWallet>,
    /// Chain double.
    pub chain: Arc<MockChain>,
    /// Network double, connected to `chain`.
    pub network: Arc<MockNetwork>,
}

impl Wiring {
    /// Connected network at `local_height` on chain 1.
    pub fn connected(local_height: u64) -> Self {
        let wallet = Arc::new(MockWallet::new());
        let chain = Arc::new(MockChain::new(ChainRef(1)));
        let network = Arc::new(MockNetwork::connected(chain.clone(), local_height));
        Self {
            wallet,
            chain,
            network,
        }
    }

    /// Job over these doubles.
    pub fn job(&self, config: VerifierConfig) -> VerificationJob {
        VerificationJob::new(config, self.wallet.clone(), self.network.clone())
            .expect("valid config")
    }

    /// Answer every captured request with `respond`.
    pub fn answer_all(&self, mut respond: impl FnMut(&RpcRequest) -> RpcResponse) -> usize {
        let sent = self.network.take_sent();
        let count = sent.len();
        for request in sent {
            let response = respond(&request.request);
            request.respond(response);
        }
        count
    }
}
