//! # Verifier Metrics
//!
//! Prometheus metrics for the verification job.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! spv-verifier = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `spv_requests_issued_total` - Counter of requests sent (by kind: header, chunk, proof)
//! - `spv_proofs_verified_total` - Counter of accepted Merkle proofs
//! - `spv_verification_failures_total` - Counter of failed attempts (by reason)
//! - `spv_reorg_purges_total` - Counter of proof entries dropped by chain switches
//! - `spv_sync_percent` - Gauge of local height relative to the server tip

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_gauge, register_int_counter, register_int_counter_vec, Gauge, IntCounter,
    IntCounterVec,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Requests sent, labeled by kind
    pub static ref REQUESTS_ISSUED: IntCounterVec = register_int_counter_vec!(
        "spv_requests_issued_total",
        "Total number of header, chunk and proof requests sent",
        &["kind"]
    )
    .expect("Failed to create REQUESTS_ISSUED metric");

    /// Accepted proofs
    pub static ref PROOFS_VERIFIED: IntCounter = register_int_counter!(
        "spv_proofs_verified_total",
        "Total number of transactions verified"
    )
    .expect("Failed to create PROOFS_VERIFIED metric");

    /// Failed attempts, labeled by reason
    pub static ref VERIFICATION_FAILURES: IntCounterVec = register_int_counter_vec!(
        "spv_verification_failures_total",
        "Total number of failed header or proof attempts",
        &["reason"]
    )
    .expect("Failed to create VERIFICATION_FAILURES metric");

    /// Proof entries purged by chain switches
    pub static ref REORG_PURGES: IntCounter = register_int_counter!(
        "spv_reorg_purges_total",
        "Total number of verifications undone by chain switches"
    )
    .expect("Failed to create REORG_PURGES metric");

    /// Sync percentage
    pub static ref SYNC_PERCENT: Gauge = register_gauge!(
        "spv_sync_percent",
        "Local chain height as a percentage of the server tip"
    )
    .expect("Failed to create SYNC_PERCENT metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record a request sent
#[cfg(feature = "metrics")]
pub fn record_request_issued(kind: &str) {
    REQUESTS_ISSUED.with_label_values(&[kind]).inc();
}

/// Record an accepted proof
#[cfg(feature = "metrics")]
pub fn record_proof_verified() {
    PROOFS_VERIFIED.inc();
}

/// Record a failed attempt with reason
#[cfg(feature = "metrics")]
pub fn record_verification_failure(reason: &str) {
    VERIFICATION_FAILURES.with_label_values(&[reason]).inc();
}

/// Record verifications undone by a chain switch
#[cfg(feature = "metrics")]
pub fn record_reorg_purge(count: usize) {
    REORG_PURGES.inc_by(count as u64);
}

/// Update sync percentage gauge
#[cfg(feature = "metrics")]
pub fn set_sync_percentage(percent: u64) {
    SYNC_PERCENT.set(percent as f64);
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

/// Record a request sent
#[cfg(not(feature = "metrics"))]
pub fn record_request_issued(_kind: &str) {}

/// Record an accepted proof
#[cfg(not(feature = "metrics"))]
pub fn record_proof_verified() {}

/// Record a failed attempt with reason
#[cfg(not(feature = "metrics"))]
pub fn record_verification_failure(_reason: &str) {}

/// Record verifications undone by a chain switch
#[cfg(not(feature = "metrics"))]
pub fn record_reorg_purge(_count: usize) {}

/// Update sync percentage gauge
#[cfg(not(feature = "metrics"))]
pub fn set_sync_percentage(_percent: u64) {}
