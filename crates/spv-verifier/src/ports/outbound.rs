//! # Outbound Ports
//!
//! Collaborators the verifier depends on: the wallet that owns transaction
//! history, the local header chain, and the network layer.
//!
//! All calls are synchronous. Network requests are fire-and-forget; their
//! responses come back through the [`CompletionSink`] handed over with each
//! request.

use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::application::completion::CompletionSink;
use crate::domain::{BlockHeader, ChainRef, Checkpoint, InterfaceInfo, TxHash, VerifiedTx};
use crate::ports::rpc::{RpcMethod, RpcRequest, RpcResponse};

/// Wallet owning the transaction history.
pub trait WalletPort: Send + Sync {
    /// Snapshot of transactions awaiting verification, with their heights.
    fn unverified_txs(&self) -> HashMap<TxHash, u64>;

    /// Roll back verifications above `checkpoint_height` on `chain`.
    ///
    /// Returns the transactions whose verification was undone.
    fn undo_verifications(&self, chain: ChainRef, checkpoint_height: u64) -> HashSet<TxHash>;

    /// Record a successfully verified transaction.
    fn add_verified_tx(&self, tx_hash: TxHash, info: VerifiedTx);
}

/// Locally synchronized header chain.
pub trait ChainPort: Send + Sync {
    /// Handle identifying this chain.
    fn chain_ref(&self) -> ChainRef;

    /// Header at `height`, if synchronized.
    fn read_header(&self, height: u64) -> Option<BlockHeader>;

    /// Trusted checkpoints.
    fn checkpoints(&self) -> Vec<Checkpoint>;

    /// Height of the latest checkpoint this chain agrees with.
    fn checkpoint_height(&self) -> u64;
}

/// Network layer.
pub trait NetworkPort: Send + Sync {
    /// Current server connection, if any.
    fn interface(&self) -> Option<InterfaceInfo>;

    /// Chain currently considered best, if any.
    fn blockchain(&self) -> Option<Arc<dyn ChainPort>>;

    /// Height of the local chain.
    fn local_height(&self) -> u64;

    /// Send a request. The response must be delivered through `sink`.
    fn send(&self, request: RpcRequest, sink: CompletionSink);

    /// Ask for a bulk chunk of headers. Completion is observed through the
    /// chain.
    fn request_chunk(&self, interface: &InterfaceInfo, chunk_index: u64);
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// In-memory wallet.
#[derive(Default)]
pub struct MockWallet {
    unverified: Mutex<HashMap<TxHash, u64>>,
    verified: Mutex<HashMap<TxHash, VerifiedTx>>,
    undo_calls: Mutex<Vec<(ChainRef, u64)>>,
}

impl MockWallet {
    /// Create an empty wallet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transaction awaiting verification.
    pub fn add_unverified(&self, tx_hash: TxHash, height: u64) {
        self.unverified.lock().insert(tx_hash, height);
    }

    /// Verification details recorded for `tx_hash`.
    pub fn verified(&self, tx_hash: &TxHash) -> Option<VerifiedTx> {
        self.verified.lock().get(tx_hash).copied()
    }

    /// Number of verified transactions.
    pub fn verified_count(&self) -> usize {
        self.verified.lock().len()
    }

    /// Every `undo_verifications` call so far.
    pub fn undo_calls(&self) -> Vec<(ChainRef, u64)> {
        self.undo_calls.lock().clone()
    }
}

impl WalletPort for MockWallet {
    fn unverified_txs(&self) -> HashMap<TxHash, u64> {
        self.unverified.lock().clone()
    }

    fn undo_verifications(&self, chain: ChainRef, checkpoint_height: u64) -> HashSet<TxHash> {
        self.undo_calls.lock().push((chain, checkpoint_height));

        let mut verified = self.verified.lock();
        let undone: HashSet<TxHash> = verified
            .iter()
            .filter(|(_, info)| info.height >= checkpoint_height)
            .map(|(tx_hash, _)| *tx_hash)
            .collect();

        let mut unverified = self.unverified.lock();
        for tx_hash in &undone {
            if let Some(info) = verified.remove(tx_hash) {
                unverified.insert(*tx_hash, info.height);
            }
        }
        undone
    }

    fn add_verified_tx(&self, tx_hash: TxHash, info: VerifiedTx) {
        self.unverified.lock().remove(&tx_hash);
        self.verified.lock().insert(tx_hash, info);
    }
}

/// In-memory header chain.
pub struct MockChain {
    chain_ref: RwLock<ChainRef>,
    headers: RwLock<HashMap<u64, BlockHeader>>,
    checkpoints: RwLock<Vec<Checkpoint>>,
    checkpoint_height: RwLock<u64>,
}

impl MockChain {
    /// Create an empty chain.
    pub fn new(chain_ref: ChainRef) -> Self {
        Self {
            chain_ref: RwLock::new(chain_ref),
            headers: RwLock::new(HashMap::new()),
            checkpoints: RwLock::new(Vec::new()),
            checkpoint_height: RwLock::new(0),
        }
    }

    /// Store a header at its height.
    pub fn insert_header(&self, header: BlockHeader) {
        self.headers.write().insert(header.height, header);
    }

    /// Replace the checkpoint list.
    pub fn set_checkpoints(&self, checkpoints: Vec<Checkpoint>) {
        *self.checkpoints.write() = checkpoints;
    }

    /// Set the height returned by [`ChainPort::checkpoint_height`].
    pub fn set_checkpoint_height(&self, height: u64) {
        *self.checkpoint_height.write() = height;
    }

    /// Switch the chain handle, as a reorg would.
    pub fn set_chain_ref(&self, chain_ref: ChainRef) {
        *self.chain_ref.write() = chain_ref;
    }
}

impl ChainPort for MockChain {
    fn chain_ref(&self) -> ChainRef {
        *self.chain_ref.read()
    }

    fn read_header(&self, height: u64) -> Option<BlockHeader> {
        self.headers.read().get(&height).cloned()
    }

    fn checkpoints(&self) -> Vec<Checkpoint> {
        self.checkpoints.read().clone()
    }

    fn checkpoint_height(&self) -> u64 {
        *self.checkpoint_height.read()
    }
}

/// A request captured by [`MockNetwork`].
#[derive(Debug)]
pub struct SentRequest {
    /// The request as sent.
    pub request: RpcRequest,
    /// Sink for its response.
    pub sink: CompletionSink,
}

impl SentRequest {
    /// Deliver a response through the captured sink.
    pub fn respond(self, response: RpcResponse) -> bool {
        self.sink.deliver(response)
    }
}

/// Network that records requests instead of sending them.
#[derive(Default)]
pub struct MockNetwork {
    interface: RwLock<Option<InterfaceInfo>>,
    chain: RwLock<Option<Arc<dyn ChainPort>>>,
    local_height: RwLock<u64>,
    sent: Mutex<Vec<SentRequest>>,
    chunk_requests: Mutex<Vec<u64>>,
}

impl MockNetwork {
    /// Disconnected network with no chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connected network on `chain` at `local_height`.
    pub fn connected(chain: Arc<dyn ChainPort>, local_height: u64) -> Self {
        let network = Self::new();
        network.set_interface(Some(InterfaceInfo::new("mock:50001", local_height)));
        network.set_chain(Some(chain));
        network.set_local_height(local_height);
        network
    }

    /// Replace the server connection.
    pub fn set_interface(&self, interface: Option<InterfaceInfo>) {
        *self.interface.write() = interface;
    }

    /// Replace the best chain.
    pub fn set_chain(&self, chain: Option<Arc<dyn ChainPort>>) {
        *self.chain.write() = chain;
    }

    /// Set the local chain height.
    pub fn set_local_height(&self, height: u64) {
        *self.local_height.write() = height;
    }

    /// Take every captured request.
    pub fn take_sent(&self) -> Vec<SentRequest> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Number of captured requests not yet taken.
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Number of captured requests for `method`.
    pub fn sent_count_for(&self, method: RpcMethod) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|sent| sent.request.method == method)
            .count()
    }

    /// Chunk indices requested so far.
    pub fn chunk_requests(&self) -> Vec<u64> {
        self.chunk_requests.lock().clone()
    }
}

impl NetworkPort for MockNetwork {
    fn interface(&self) -> Option<InterfaceInfo> {
        self.interface.read().clone()
    }

    fn blockchain(&self) -> Option<Arc<dyn ChainPort>> {
        self.chain.read().clone()
    }

    fn local_height(&self) -> u64 {
        *self.local_height.read()
    }

    fn send(&self, request: RpcRequest, sink: CompletionSink) {
        self.sent.lock().push(SentRequest { request, sink });
    }

    fn request_chunk(&self, _interface: &InterfaceInfo, chunk_index: u64) {
        self.chunk_requests.lock().push(chunk_index);
    }
}
