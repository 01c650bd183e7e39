//! # Pending Request Tracker
//!
//! Per-key request state. Presence of an entry is the "already requested"
//! marker: a key with any entry, pending or ready, is never requested again
//! until the entry is released or purged.
//!
//! A proof entry also remembers the id of the request that created it, so a
//! response to an older request for the same transaction is never applied.

use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{BlockHeader, Hash256, HeaderKey, SpvError, TxHash, VerificationFailure};

/// State of one tracked request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Slot<T> {
    /// Requested at `since_tick`, no usable response yet.
    Pending {
        /// Pass the request was issued in.
        since_tick: u64,
    },
    /// Response accepted.
    Ready(T),
}

impl<T> Slot<T> {
    /// Is the slot still waiting?
    pub fn is_pending(&self) -> bool {
        matches!(self, Slot::Pending { .. })
    }

    /// Accepted value, if any.
    pub fn ready(&self) -> Option<&T> {
        match self {
            Slot::Ready(value) => Some(value),
            Slot::Pending { .. } => None,
        }
    }
}

/// Header and proof request state owned by one verification job.
#[derive(Debug, Default)]
pub struct PendingRequestTracker {
    headers: HashMap<HeaderKey, Slot<BlockHeader>>,
    proofs: HashMap<TxHash, Slot<Hash256>>,
    proof_requests: HashMap<TxHash, Uuid>,
    failures: HashMap<TxHash, VerificationFailure>,
    tick: u64,
}

impl PendingRequestTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current pass number.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Start a new pass.
    pub fn advance_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    // -------------------------------------------------------------------------
    // Headers
    // -------------------------------------------------------------------------

    /// True if no request for `key` has been made.
    pub fn needs_header_request(&self, key: &HeaderKey) -> bool {
        !self.headers.contains_key(key)
    }

    /// Record that a request for `key` was issued.
    pub fn mark_header_pending(&mut self, key: HeaderKey) {
        let since_tick = self.tick;
        self.headers.insert(key, Slot::Pending { since_tick });
    }

    /// True if `key` was requested and has not been answered.
    pub fn is_header_pending(&self, key: &HeaderKey) -> bool {
        self.headers.get(key).is_some_and(Slot::is_pending)
    }

    /// Header stored under `key`.
    pub fn header(&self, key: &HeaderKey) -> Option<&BlockHeader> {
        self.headers.get(key).and_then(Slot::ready)
    }

    /// Store a header response. Ignored when `key` is no longer tracked.
    pub fn record_header_result(&mut self, key: HeaderKey, header: BlockHeader) -> bool {
        match self.headers.get_mut(&key) {
            Some(slot) => {
                *slot = Slot::Ready(header);
                true
            }
            None => {
                debug!("[spv] Ignoring header for untracked key {}", key);
                false
            }
        }
    }

    /// Keep only the header entries `keep` accepts. Returns how many were
    /// dropped.
    pub fn retain_headers<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&HeaderKey, &Slot<BlockHeader>) -> bool,
    {
        let before = self.headers.len();
        self.headers.retain(|key, slot| keep(key, slot));
        before - self.headers.len()
    }

    /// Forget every chunk entry.
    pub fn purge_chunks(&mut self) -> usize {
        self.retain_headers(|key, _| !matches!(key, HeaderKey::Chunk(_)))
    }

    /// Number of header entries, pending or ready.
    pub fn header_count(&self) -> usize {
        self.headers.len()
    }

    // -------------------------------------------------------------------------
    // Proofs
    // -------------------------------------------------------------------------

    /// True if no proof request for `tx_hash` has been made.
    pub fn needs_proof_request(&self, tx_hash: &TxHash) -> bool {
        !self.proofs.contains_key(tx_hash)
    }

    /// Record that proof request `request_id` was issued.
    pub fn mark_proof_pending(&mut self, tx_hash: TxHash, request_id: Uuid) {
        let since_tick = self.tick;
        self.proofs.insert(tx_hash, Slot::Pending { since_tick });
        self.proof_requests.insert(tx_hash, request_id);
    }

    /// True if `request_id` is the outstanding proof request for `tx_hash`.
    pub fn is_current_proof(&self, tx_hash: &TxHash, request_id: &Uuid) -> bool {
        self.proof_requests.get(tx_hash) == Some(request_id)
    }

    /// True if a proof was requested and not yet accepted.
    pub fn is_proof_pending(&self, tx_hash: &TxHash) -> bool {
        self.proofs.get(tx_hash).is_some_and(Slot::is_pending)
    }

    /// Apply the outcome of a proof attempt.
    ///
    /// A verified root replaces the pending marker. A failure leaves the
    /// marker in place and is recorded in the failure ledger. Results for
    /// transactions that are no longer tracked, or that answer a request
    /// other than the outstanding one, are ignored.
    pub fn record_proof_result(
        &mut self,
        tx_hash: TxHash,
        request_id: Uuid,
        result: Result<Hash256, SpvError>,
    ) -> bool {
        if !self.is_current_proof(&tx_hash, &request_id) {
            debug!("[spv] Ignoring proof result {} for tx {}", request_id, tx_hash);
            return false;
        }
        let Some(slot) = self.proofs.get_mut(&tx_hash) else {
            debug!("[spv] Ignoring proof result for untracked tx {}", tx_hash);
            return false;
        };

        match result {
            Ok(root) => {
                *slot = Slot::Ready(root);
                self.proof_requests.remove(&tx_hash);
                self.failures.remove(&tx_hash);
                true
            }
            Err(error) => {
                self.failures.insert(
                    tx_hash,
                    VerificationFailure {
                        tx_hash,
                        error,
                        tick: self.tick,
                    },
                );
                false
            }
        }
    }

    /// Root accepted for `tx_hash`.
    pub fn verified_root(&self, tx_hash: &TxHash) -> Option<Hash256> {
        self.proofs.get(tx_hash).and_then(Slot::ready).copied()
    }

    /// Forget the proof entry and failure record for `tx_hash`.
    pub fn purge_proof(&mut self, tx_hash: &TxHash) -> bool {
        self.failures.remove(tx_hash);
        self.proof_requests.remove(tx_hash);
        self.proofs.remove(tx_hash).is_some()
    }

    /// Most recent failure for `tx_hash`.
    pub fn last_failure(&self, tx_hash: &TxHash) -> Option<&VerificationFailure> {
        self.failures.get(tx_hash)
    }

    /// Transactions with an outstanding proof request.
    pub fn pending_proofs(&self) -> Vec<TxHash> {
        self.proofs
            .iter()
            .filter(|(_, slot)| slot.is_pending())
            .map(|(tx_hash, _)| *tx_hash)
            .collect()
    }

    // -------------------------------------------------------------------------
    // Expiry
    // -------------------------------------------------------------------------

    /// Release header and proof entries pending for at least `max_ticks`
    /// passes. Returns how many entries were released.
    pub fn release_stale(&mut self, max_ticks: u64) -> usize {
        let now = self.tick;
        let stale = |slot_tick: u64| now.saturating_sub(slot_tick) >= max_ticks;

        let before = self.headers.len() + self.proofs.len();
        self.headers.retain(|_, slot| match slot {
            Slot::Pending { since_tick } => !stale(*since_tick),
            Slot::Ready(_) => true,
        });

        let mut released_proofs = Vec::new();
        self.proofs.retain(|tx_hash, slot| match slot {
            Slot::Pending { since_tick } if stale(*since_tick) => {
                released_proofs.push(*tx_hash);
                false
            }
            _ => true,
        });
        for tx_hash in &released_proofs {
            self.failures.remove(tx_hash);
            self.proof_requests.remove(tx_hash);
        }

        before - (self.headers.len() + self.proofs.len())
    }
}
