//! # Reorg Handler
//!
//! Watches the best-chain handle between passes. When it changes, every
//! verification at or above the new chain's checkpoint is rolled back in the
//! wallet and the matching proof entries are dropped, so the next pass
//! requests them again.

use tracing::{info, warn};

use super::tracker::PendingRequestTracker;
use crate::domain::{ChainRef, TxHash};
use crate::metrics;
use crate::ports::{ChainPort, WalletPort};

/// Result of handling a chain switch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReorgOutcome {
    /// Handle before the switch.
    pub previous: ChainRef,
    /// Handle after the switch.
    pub current: ChainRef,
    /// Checkpoint height used for the rollback.
    pub checkpoint: u64,
    /// Transactions whose proof entries were dropped.
    pub purged: Vec<TxHash>,
}

/// Tracks the chain handle seen by the last pass.
#[derive(Debug, Default)]
pub struct ReorgHandler {
    recorded: Option<ChainRef>,
}

impl ReorgHandler {
    /// Handler that has not seen a chain yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler that starts from a known chain.
    pub fn with_chain(chain_ref: Option<ChainRef>) -> Self {
        Self { recorded: chain_ref }
    }

    /// Handle last observed.
    pub fn recorded(&self) -> Option<ChainRef> {
        self.recorded
    }

    /// Compare `chain` against the recorded handle and roll back on change.
    pub fn observe(
        &mut self,
        chain: &dyn ChainPort,
        wallet: &dyn WalletPort,
        tracker: &mut PendingRequestTracker,
    ) -> Option<ReorgOutcome> {
        let current = chain.chain_ref();
        let previous = match self.recorded {
            None => {
                self.recorded = Some(current);
                return None;
            }
            Some(previous) if previous == current => return None,
            Some(previous) => previous,
        };

        let checkpoint = chain.checkpoint_height();
        warn!(
            "[spv] Chain switched {} -> {}, undoing verifications from height {}",
            previous, current, checkpoint
        );

        let mut purged: Vec<TxHash> = wallet
            .undo_verifications(current, checkpoint)
            .into_iter()
            .collect();
        purged.sort();

        for tx_hash in &purged {
            info!(tx_hash = %tx_hash, "[spv] Redoing verification");
            tracker.purge_proof(tx_hash);
        }
        tracker.purge_chunks();

        self.recorded = Some(current);
        metrics::record_reorg_purge(purged.len());

        Some(ReorgOutcome {
            previous,
            current,
            checkpoint,
            purged,
        })
    }
}
