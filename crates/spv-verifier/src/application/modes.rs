//! # Verification Modes
//!
//! Where headers come from, and when a proof may be requested.
//!
//! | Mode | Header source | Key family | Reorg check |
//! |------|---------------|------------|-------------|
//! | [`Classic`] | local chain, chunk fetch when missing | `Chunk` | yes |
//! | [`DirectFetch`] | `blockchain.block.header` per transaction | `TxHash` or `Height` | no |
//!
//! A mode is chosen once when the job is built and never changes.
//!
//! Header entries are dropped by [`VerificationMode::prune`] at the end of a
//! pass once no unverified transaction still needs them.

use std::collections::HashSet;
use tracing::{debug, warn};

use super::completion::{CompletionKind, CompletionQueue};
use super::tracker::PendingRequestTracker;
use crate::config::{HeaderKeying, ModeSelector, VerifierConfig};
use crate::domain::{
    invariant_chunk_within_checkpoints, invariant_height_reachable, BlockHeader, HeaderKey,
    InterfaceInfo, TxHash, TxVerificationStatus,
};
use crate::metrics;
use crate::ports::rpc::RpcRequest;
use crate::ports::{ChainPort, NetworkPort};

/// Everything a mode may touch while visiting one transaction.
pub struct PassContext<'a> {
    /// Network to send requests through.
    pub network: &'a dyn NetworkPort,
    /// Connected server.
    pub interface: &'a InterfaceInfo,
    /// Current best chain.
    pub chain: &'a dyn ChainPort,
    /// Height of the local chain.
    pub local_height: u64,
    /// Queue that hands out response sinks.
    pub queue: &'a CompletionQueue,
    /// Request state.
    pub tracker: &'a mut PendingRequestTracker,
}

/// Verification strategy.
pub trait VerificationMode: Send + Sync {
    /// Name for logs.
    fn name(&self) -> &'static str;

    /// True if a header request for this transaction would be issued now.
    fn needs_header_request(&self, ctx: &PassContext<'_>, tx_hash: &TxHash, height: u64) -> bool;

    /// Issue the header (or chunk) request for this transaction.
    ///
    /// Returns the number of requests sent.
    fn issue_header_request(
        &self,
        ctx: &mut PassContext<'_>,
        tx_hash: &TxHash,
        height: u64,
    ) -> usize;

    /// Issue the proof request if the header is available and no proof
    /// request is outstanding. Returns true if a request was sent.
    fn issue_proof_request_if_ready(
        &self,
        ctx: &mut PassContext<'_>,
        tx_hash: &TxHash,
        height: u64,
    ) -> bool;

    /// Header a proof for `tx_hash` must match.
    fn expected_header(
        &self,
        tracker: &PendingRequestTracker,
        chain: Option<&dyn ChainPort>,
        tx_hash: &TxHash,
        block_height: u64,
    ) -> Option<BlockHeader>;

    /// Header progress for a transaction with no proof entry.
    fn header_status(
        &self,
        tracker: &PendingRequestTracker,
        chain: Option<&dyn ChainPort>,
        tx_hash: &TxHash,
        height: u64,
    ) -> TxVerificationStatus;

    /// Whether chain switches must be checked on each pass.
    fn detects_reorgs(&self) -> bool;

    /// Drop header entries no transaction in `unverified` still waits on.
    /// Returns how many were dropped.
    fn prune(&self, ctx: &mut PassContext<'_>, unverified: &[(TxHash, u64)]) -> usize;

    /// Visit one unverified transaction. Returns the number of requests sent.
    fn process(&self, ctx: &mut PassContext<'_>, tx_hash: &TxHash, height: u64) -> usize {
        let mut issued = 0;
        if self.needs_header_request(ctx, tx_hash, height) {
            issued += self.issue_header_request(ctx, tx_hash, height);
        }
        if self.issue_proof_request_if_ready(ctx, tx_hash, height) {
            issued += 1;
        }
        issued
    }
}

/// Build the mode selected by `config`.
pub fn mode_for(config: &VerifierConfig) -> Box<dyn VerificationMode> {
    match config.mode {
        ModeSelector::Classic => Box::new(Classic::new(config.chunk_len)),
        ModeSelector::DirectFetch => Box::new(DirectFetch::new(config.header_keying)),
    }
}

/// Send a proof request unless one is already outstanding.
fn send_proof_request(ctx: &mut PassContext<'_>, tx_hash: &TxHash, height: u64) -> bool {
    if !ctx.tracker.needs_proof_request(tx_hash) {
        return false;
    }

    let request = RpcRequest::merkle(tx_hash, height);
    let sink = ctx.queue.sink(
        request.id,
        CompletionKind::Proof {
            tx_hash: *tx_hash,
            height,
        },
    );

    ctx.tracker.mark_proof_pending(*tx_hash, request.id);
    ctx.network.send(request, sink);
    metrics::record_request_issued("proof");
    debug!(tx_hash = %tx_hash, height, "[spv] Requested merkle branch");
    true
}

// =============================================================================
// Direct fetch
// =============================================================================

/// Headers are fetched from the server, one per transaction.
#[derive(Clone, Copy, Debug)]
pub struct DirectFetch {
    keying: HeaderKeying,
}

impl DirectFetch {
    /// Create a direct-fetch mode using `keying` for header requests.
    pub fn new(keying: HeaderKeying) -> Self {
        Self { keying }
    }

    fn key(&self, tx_hash: &TxHash, height: u64) -> HeaderKey {
        match self.keying {
            HeaderKeying::TxHash => HeaderKey::TxHash(*tx_hash),
            HeaderKeying::Height => HeaderKey::Height(height),
        }
    }
}

impl VerificationMode for DirectFetch {
    fn name(&self) -> &'static str {
        "direct-fetch"
    }

    fn needs_header_request(&self, ctx: &PassContext<'_>, tx_hash: &TxHash, height: u64) -> bool {
        // Unconfirmed transactions have no block to prove against.
        height > 0 && ctx.tracker.needs_header_request(&self.key(tx_hash, height))
    }

    fn issue_header_request(
        &self,
        ctx: &mut PassContext<'_>,
        tx_hash: &TxHash,
        height: u64,
    ) -> usize {
        let key = self.key(tx_hash, height);
        let request = match RpcRequest::header(&key) {
            Ok(request) => request,
            Err(e) => {
                warn!("[spv] Cannot build header request for {}: {}", key, e);
                return 0;
            }
        };
        let sink = ctx.queue.sink(request.id, CompletionKind::Header { key, height });

        ctx.tracker.mark_header_pending(key);
        ctx.network.send(request, sink);
        metrics::record_request_issued("header");
        debug!(tx_hash = %tx_hash, height, "[spv] Requested header {}", key);
        1
    }

    fn issue_proof_request_if_ready(
        &self,
        ctx: &mut PassContext<'_>,
        tx_hash: &TxHash,
        height: u64,
    ) -> bool {
        if height == 0 || ctx.tracker.header(&self.key(tx_hash, height)).is_none() {
            return false;
        }
        send_proof_request(ctx, tx_hash, height)
    }

    fn expected_header(
        &self,
        tracker: &PendingRequestTracker,
        _chain: Option<&dyn ChainPort>,
        tx_hash: &TxHash,
        block_height: u64,
    ) -> Option<BlockHeader> {
        tracker.header(&self.key(tx_hash, block_height)).cloned()
    }

    fn header_status(
        &self,
        tracker: &PendingRequestTracker,
        _chain: Option<&dyn ChainPort>,
        tx_hash: &TxHash,
        height: u64,
    ) -> TxVerificationStatus {
        let key = self.key(tx_hash, height);
        if tracker.header(&key).is_some() {
            TxVerificationStatus::HeaderReady
        } else if tracker.is_header_pending(&key) {
            TxVerificationStatus::HeaderPending
        } else {
            TxVerificationStatus::NotTracked
        }
    }

    fn detects_reorgs(&self) -> bool {
        false
    }

    fn prune(&self, ctx: &mut PassContext<'_>, unverified: &[(TxHash, u64)]) -> usize {
        let live: HashSet<HeaderKey> = unverified
            .iter()
            .filter(|(_, height)| *height > 0)
            .map(|(tx_hash, height)| self.key(tx_hash, *height))
            .collect();

        // Pending entries stay until answered or released as stale.
        ctx.tracker.retain_headers(|key, slot| slot.is_pending() || live.contains(key))
    }
}

// =============================================================================
// Classic
// =============================================================================

/// Headers come from the locally synchronized chain.
#[derive(Clone, Copy, Debug)]
pub struct Classic {
    chunk_len: u64,
}

impl Classic {
    /// Create a classic mode with `chunk_len` headers per chunk.
    pub fn new(chunk_len: u64) -> Self {
        Self {
            chunk_len: chunk_len.max(1),
        }
    }

    fn chunk_index(&self, height: u64) -> u64 {
        height / self.chunk_len
    }
}

impl VerificationMode for Classic {
    fn name(&self) -> &'static str {
        "classic"
    }

    fn needs_header_request(&self, ctx: &PassContext<'_>, _tx_hash: &TxHash, height: u64) -> bool {
        if !invariant_height_reachable(height, ctx.local_height) {
            return false;
        }
        if ctx.chain.read_header(height).is_some() {
            return false;
        }

        let index = self.chunk_index(height);
        invariant_chunk_within_checkpoints(index, ctx.chain.checkpoints().len())
            && ctx.tracker.needs_header_request(&HeaderKey::Chunk(index))
    }

    fn issue_header_request(
        &self,
        ctx: &mut PassContext<'_>,
        tx_hash: &TxHash,
        height: u64,
    ) -> usize {
        let index = self.chunk_index(height);

        ctx.tracker.mark_header_pending(HeaderKey::Chunk(index));
        ctx.network.request_chunk(ctx.interface, index);
        metrics::record_request_issued("chunk");
        debug!(tx_hash = %tx_hash, height, "[spv] Requested chunk {}", index);
        1
    }

    fn issue_proof_request_if_ready(
        &self,
        ctx: &mut PassContext<'_>,
        tx_hash: &TxHash,
        height: u64,
    ) -> bool {
        if !invariant_height_reachable(height, ctx.local_height) {
            return false;
        }
        if ctx.chain.read_header(height).is_none() {
            return false;
        }
        send_proof_request(ctx, tx_hash, height)
    }

    fn expected_header(
        &self,
        _tracker: &PendingRequestTracker,
        chain: Option<&dyn ChainPort>,
        _tx_hash: &TxHash,
        block_height: u64,
    ) -> Option<BlockHeader> {
        chain.and_then(|chain| chain.read_header(block_height))
    }

    fn header_status(
        &self,
        tracker: &PendingRequestTracker,
        chain: Option<&dyn ChainPort>,
        _tx_hash: &TxHash,
        height: u64,
    ) -> TxVerificationStatus {
        if chain.and_then(|chain| chain.read_header(height)).is_some() {
            TxVerificationStatus::HeaderReady
        } else if tracker.is_header_pending(&HeaderKey::Chunk(self.chunk_index(height))) {
            TxVerificationStatus::HeaderPending
        } else {
            TxVerificationStatus::NotTracked
        }
    }

    fn detects_reorgs(&self) -> bool {
        true
    }

    fn prune(&self, ctx: &mut PassContext<'_>, unverified: &[(TxHash, u64)]) -> usize {
        // Chunks some reachable transaction is still missing a header from.
        let waiting: HashSet<u64> = unverified
            .iter()
            .filter(|(_, height)| invariant_height_reachable(*height, ctx.local_height))
            .filter(|(_, height)| ctx.chain.read_header(*height).is_none())
            .map(|(_, height)| self.chunk_index(*height))
            .collect();

        ctx.tracker.retain_headers(|key, _| match key {
            HeaderKey::Chunk(index) => waiting.contains(index),
            _ => true,
        })
    }
}
