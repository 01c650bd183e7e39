//! # SPV Verifier
//!
//! Simplified Payment Verification for a light wallet: proves that each of
//! the wallet's confirmed transactions is included in a block, using the
//! block header and a Merkle branch from the server.
//!
//! ## Flow
//!
//! ```text
//! tick ─→ VerificationJob::run
//!           ├─ drain responses ─→ header store / proof check
//!           ├─ per unverified tx ─→ VerificationMode
//!           │     ├─ Classic:     local header, else chunk fetch
//!           │     └─ DirectFetch: blockchain.block.header
//!           │   then blockchain.transaction.get_merkle
//!           └─ chain switched? ─→ ReorgHandler
//! ```
//!
//! ## Guarantees
//!
//! | Property | Where |
//! |----------|-------|
//! | Root recomputed from leaf, path and position only | `algorithms::merkle_verifier` |
//! | Proof accepted only on exact root match | `domain::invariants` |
//! | At most one outstanding request per key | `application::tracker` |
//! | Responses after teardown have no effect | `application::completion` |
//! | Chain switch drops proofs above the checkpoint | `application::reorg` |
//!
//! ## Module Structure
//!
//! ```text
//! spv-verifier/
//! ├── domain/          # Hashes, headers, keys, errors, invariants
//! ├── algorithms/      # Merkle reconstruction, header codec
//! ├── ports/           # Wallet/chain/network traits, RPC shapes, mocks
//! ├── application/     # Tracker, modes, reorg handler, job
//! ├── adapters/        # Interval scheduler
//! ├── telemetry/       # Log subscriber setup
//! ├── metrics.rs       # Prometheus counters (feature = "metrics")
//! └── config.rs        # VerifierConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod telemetry;

// Re-exports
pub use adapters::{SchedulerHandle, VerifierScheduler};
pub use algorithms::{
    build_merkle_proof, compute_merkle_root, deserialize_header, double_sha256, header_from_hex,
    reconstruct_root, serialize_header, verify_merkle_proof,
};
pub use application::{
    Classic, DirectFetch, DisposalToken, PassReport, PendingRequestTracker, ReorgHandler,
    ReorgOutcome, SkipReason, VerificationJob, VerificationMode,
};
pub use config::{HeaderKeying, ModeSelector, VerifierConfig};
pub use domain::{
    BlockHeader, ChainRef, Checkpoint, Hash256, HeaderKey, InterfaceInfo, MerkleBranch, SpvError,
    SpvResult, TxHash, TxVerificationStatus, VerificationFailure, VerifiedTx, DEFAULT_CHUNK_LEN,
    EQUIHASH_PREFIX_LEN, HEADER_LEN, MAX_PROOF_DEPTH,
};
pub use ports::{
    ChainPort, MockChain, MockNetwork, MockWallet, NetworkPort, RpcMethod, RpcRequest,
    RpcResponse, SentRequest, SpvVerifierApi, WalletPort,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
