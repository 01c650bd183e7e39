//! # Verification Job
//!
//! One pass per scheduler tick:
//!
//! 1. Skip if torn down or if independent verification is disabled.
//! 2. Release stale entries (when configured) and apply queued responses.
//! 3. Skip if there is no server connection or no chain.
//! 4. Update the sync percentage.
//! 5. Classic mode only: roll back verifications if the chain switched.
//! 6. Hand each unverified transaction to the verification mode, then drop
//!    header entries nothing waits on.
//!
//! Nothing in a pass returns an error. Failures are logged, counted and
//! recorded against the transaction, which simply stays unverified.

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::completion::{CompletionKind, CompletionQueue, DisposalToken};
use super::modes::{mode_for, PassContext, VerificationMode};
use super::reorg::{ReorgHandler, ReorgOutcome};
use super::tracker::PendingRequestTracker;
use crate::algorithms::{header_from_hex, reconstruct_root};
use crate::config::VerifierConfig;
use crate::domain::{
    invariant_root_matches, Hash256, HeaderKey, SpvError, SpvResult, TxHash,
    TxVerificationStatus, VerificationFailure, VerifiedTx,
};
use crate::metrics;
use crate::ports::rpc::{RpcMethod, RpcResponse};
use crate::ports::{NetworkPort, WalletPort};

/// Why a pass did no work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The job was torn down.
    Disposed,
    /// Independent verification is turned off.
    VerificationDisabled,
    /// No server connection.
    NoInterface,
    /// No best chain.
    NoChain,
}

/// Summary of one pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Pass number (0 when skipped before counting).
    pub tick: u64,
    /// Set when the pass stopped early.
    pub skipped: Option<SkipReason>,
    /// Responses drained from the queue.
    pub completions_applied: usize,
    /// Header, chunk and proof requests issued.
    pub requests_issued: usize,
    /// Stale entries released.
    pub released: usize,
    /// Chain switch handled before the transactions were visited.
    pub reorg: Option<ReorgOutcome>,
    /// Header entries dropped after the transactions were visited.
    pub pruned: usize,
}

/// SPV verification job for one wallet.
pub struct VerificationJob {
    config: VerifierConfig,
    mode: Box<dyn VerificationMode>,
    wallet: Arc<dyn WalletPort>,
    network: Arc<dyn NetworkPort>,
    tracker: PendingRequestTracker,
    reorg: ReorgHandler,
    queue: CompletionQueue,
    sync_percentage: Option<u64>,
}

impl VerificationJob {
    /// Build a job. The mode is fixed here for the job's lifetime.
    pub fn new(
        config: VerifierConfig,
        wallet: Arc<dyn WalletPort>,
        network: Arc<dyn NetworkPort>,
    ) -> SpvResult<Self> {
        config.validate()?;

        let mode = mode_for(&config);
        let reorg = ReorgHandler::with_chain(network.blockchain().map(|chain| chain.chain_ref()));
        info!(
            "[spv] Verification job created (mode: {}, independent: {})",
            mode.name(),
            config.independent_verification
        );

        Ok(Self {
            config,
            mode,
            wallet,
            network,
            tracker: PendingRequestTracker::new(),
            reorg,
            queue: CompletionQueue::new(DisposalToken::new()),
            sync_percentage: None,
        })
    }

    /// Run one pass.
    pub fn run(&mut self) -> PassReport {
        let mut report = PassReport::default();

        if self.is_disposed() {
            report.skipped = Some(SkipReason::Disposed);
            return report;
        }
        if !self.config.independent_verification {
            report.skipped = Some(SkipReason::VerificationDisabled);
            return report;
        }

        report.tick = self.tracker.advance_tick();
        if let Some(max_ticks) = self.config.max_pending_ticks {
            report.released = self.tracker.release_stale(max_ticks);
            if report.released > 0 {
                debug!(
                    "[spv] Released {} requests pending for {} passes",
                    report.released, max_ticks
                );
            }
        }
        report.completions_applied = self.apply_completions();

        let Some(interface) = self.network.interface() else {
            report.skipped = Some(SkipReason::NoInterface);
            return report;
        };
        let Some(chain) = self.network.blockchain() else {
            report.skipped = Some(SkipReason::NoChain);
            return report;
        };

        let local_height = self.network.local_height();
        if local_height > 0 && interface.tip > 0 {
            let percentage = local_height * 100 / interface.tip;
            self.sync_percentage = Some(percentage);
            metrics::set_sync_percentage(percentage);
        }

        if self.mode.detects_reorgs() {
            report.reorg = self
                .reorg
                .observe(chain.as_ref(), self.wallet.as_ref(), &mut self.tracker);
        }

        let mut unverified: Vec<(TxHash, u64)> =
            self.wallet.unverified_txs().into_iter().collect();
        unverified.sort();

        let mut ctx = PassContext {
            network: self.network.as_ref(),
            interface: &interface,
            chain: chain.as_ref(),
            local_height,
            queue: &self.queue,
            tracker: &mut self.tracker,
        };
        for (tx_hash, height) in &unverified {
            report.requests_issued += self.mode.process(&mut ctx, tx_hash, *height);
        }
        report.pruned = self.mode.prune(&mut ctx, &unverified);

        report
    }

    fn apply_completions(&mut self) -> usize {
        let completions = self.queue.drain();
        let applied = completions.len();

        for completion in completions {
            debug!(
                "[spv] Applying {} response {}",
                completion.kind.method().label(),
                completion.request_id
            );
            match completion.kind {
                CompletionKind::Header { key, height } => {
                    self.on_header_response(key, height, &completion.response);
                }
                CompletionKind::Proof { tx_hash, .. } => {
                    // Failures are already logged and recorded.
                    let _ = self.on_proof_response(
                        completion.request_id,
                        tx_hash,
                        &completion.response,
                    );
                }
            }
        }

        applied
    }

    /// Store a header response. No proof request is issued here; the next
    /// pass does that. Returns true if the header was stored.
    pub fn on_header_response(
        &mut self,
        key: HeaderKey,
        height: u64,
        response: &RpcResponse,
    ) -> bool {
        if self.is_disposed() {
            debug!("[spv] Ignoring header {} after teardown", key);
            return false;
        }

        if let Some(error) = response.server_error(RpcMethod::BlockHeader) {
            warn!("[spv] Header request {} failed: {}", key, error);
            metrics::record_verification_failure(error.reason());
            return false;
        }

        let header_height = match key {
            HeaderKey::Height(h) => h,
            _ => height,
        };
        match response
            .header_hex()
            .and_then(|raw| header_from_hex(raw, header_height))
        {
            Ok(header) => self.tracker.record_header_result(key, header),
            Err(error) => {
                warn!("[spv] Unusable header for {}: {}", key, error);
                metrics::record_verification_failure(error.reason());
                false
            }
        }
    }

    /// Check a Merkle branch response against the expected header.
    ///
    /// On success the root is stored and the wallet is told. On failure the
    /// proof entry stays pending and the error is recorded. A response to
    /// anything but the outstanding request for `tx_hash` is a
    /// [`SpvError::StaleCallback`] and changes nothing.
    pub fn on_proof_response(
        &mut self,
        request_id: Uuid,
        tx_hash: TxHash,
        response: &RpcResponse,
    ) -> SpvResult<Hash256> {
        if self.is_disposed() {
            debug!(tx_hash = %tx_hash, "[spv] Ignoring proof after teardown");
            return Err(SpvError::StaleCallback);
        }
        if !self.tracker.is_current_proof(&tx_hash, &request_id) {
            debug!(
                tx_hash = %tx_hash,
                "[spv] Ignoring proof for superseded request {}",
                request_id
            );
            return Err(SpvError::StaleCallback);
        }

        match self.check_proof(&tx_hash, response) {
            Ok((root, verified)) => {
                if !self.tracker.record_proof_result(tx_hash, request_id, Ok(root)) {
                    return Err(SpvError::StaleCallback);
                }
                self.wallet.add_verified_tx(tx_hash, verified);
                metrics::record_proof_verified();
                info!(tx_hash = %tx_hash, height = verified.height, "[spv] Verified transaction");
                Ok(root)
            }
            Err(error) => {
                warn!(
                    tx_hash = %tx_hash,
                    reason = error.reason(),
                    "[spv] Merkle verification failed: {}",
                    error
                );
                metrics::record_verification_failure(error.reason());
                self.tracker
                    .record_proof_result(tx_hash, request_id, Err(error.clone()));
                Err(error)
            }
        }
    }

    fn check_proof(
        &self,
        tx_hash: &TxHash,
        response: &RpcResponse,
    ) -> SpvResult<(Hash256, VerifiedTx)> {
        if let Some(error) = response.server_error(RpcMethod::GetMerkle) {
            return Err(error);
        }

        let branch = response.merkle_branch()?;
        let computed = reconstruct_root(tx_hash, &branch.siblings, branch.position)?;

        let chain = self.network.blockchain();
        let header = self
            .mode
            .expected_header(&self.tracker, chain.as_deref(), tx_hash, branch.block_height)
            .ok_or(SpvError::MissingHeader {
                tx_hash: *tx_hash,
                height: branch.block_height,
            })?;

        invariant_root_matches(tx_hash, &header.merkle_root, &computed)?;

        Ok((
            computed,
            VerifiedTx {
                height: branch.block_height,
                timestamp: header.timestamp,
                pos: branch.position,
            },
        ))
    }

    /// Verification state of `tx_hash` as of the last pass.
    ///
    /// A chain switch is only acted on by the next pass, so a transaction
    /// can still read as `Verified` until then.
    pub fn status(&self, tx_hash: &TxHash) -> TxVerificationStatus {
        if self.tracker.verified_root(tx_hash).is_some() {
            return TxVerificationStatus::Verified;
        }
        if !self.tracker.needs_proof_request(tx_hash) {
            return TxVerificationStatus::ProofPending;
        }

        match self.wallet.unverified_txs().get(tx_hash) {
            Some(height) => self.mode.header_status(
                &self.tracker,
                self.network.blockchain().as_deref(),
                tx_hash,
                *height,
            ),
            None => TxVerificationStatus::NotTracked,
        }
    }

    /// Tear the job down. Responses still in flight are discarded.
    pub fn shutdown(&self) {
        if !self.is_disposed() {
            self.queue.token().dispose();
            info!("[spv] Verification job shut down");
        }
    }

    /// Has the job been torn down?
    pub fn is_disposed(&self) -> bool {
        self.queue.token().is_disposed()
    }

    /// Token shared with in-flight response sinks.
    pub fn disposal_token(&self) -> DisposalToken {
        self.queue.token().clone()
    }

    /// Root accepted for `tx_hash`.
    pub fn verified_root(&self, tx_hash: &TxHash) -> Option<Hash256> {
        self.tracker.verified_root(tx_hash)
    }

    /// Most recent failed attempt for `tx_hash`.
    pub fn last_failure(&self, tx_hash: &TxHash) -> Option<&VerificationFailure> {
        self.tracker.last_failure(tx_hash)
    }

    /// Transactions with an outstanding proof request.
    pub fn pending_proofs(&self) -> Vec<TxHash> {
        self.tracker.pending_proofs()
    }

    /// `local_height * 100 / remote_tip` from the last pass that saw both.
    pub fn sync_percentage(&self) -> Option<u64> {
        self.sync_percentage
    }

    /// Name of the active mode.
    pub fn mode_name(&self) -> &'static str {
        self.mode.name()
    }

    /// Active configuration.
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Request state.
    pub fn tracker(&self) -> &PendingRequestTracker {
        &self.tracker
    }
}
