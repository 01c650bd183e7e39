//! # Inbound Ports
//!
//! What a host process can ask of the verifier.

use crate::application::{PassReport, VerificationJob};
use crate::domain::{Hash256, TxHash, TxVerificationStatus};

/// SPV verifier API - inbound port.
pub trait SpvVerifierApi: Send {
    /// Run one verification pass.
    fn run_pass(&mut self) -> PassReport;

    /// Verification state of a transaction.
    fn status(&self, tx_hash: &TxHash) -> TxVerificationStatus;

    /// Merkle root accepted for a transaction.
    fn verified_root(&self, tx_hash: &TxHash) -> Option<Hash256>;

    /// Local height as a percentage of the server tip.
    fn sync_percentage(&self) -> Option<u64>;

    /// Tear the verifier down.
    fn shutdown(&self);

    /// Has the verifier been torn down?
    fn is_disposed(&self) -> bool;
}

impl SpvVerifierApi for VerificationJob {
    fn run_pass(&mut self) -> PassReport {
        self.run()
    }

    fn status(&self, tx_hash: &TxHash) -> TxVerificationStatus {
        VerificationJob::status(self, tx_hash)
    }

    fn verified_root(&self, tx_hash: &TxHash) -> Option<Hash256> {
        VerificationJob::verified_root(self, tx_hash)
    }

    fn sync_percentage(&self) -> Option<u64> {
        VerificationJob::sync_percentage(self)
    }

    fn shutdown(&self) {
        VerificationJob::shutdown(self)
    }

    fn is_disposed(&self) -> bool {
        VerificationJob::is_disposed(self)
    }
}
