//! # Application Module
//!
//! The verification job and the request bookkeeping it drives.

pub mod completion;
pub mod job;
pub mod modes;
pub mod reorg;
pub mod tracker;

pub use completion::{Completion, CompletionKind, CompletionQueue, CompletionSink, DisposalToken};
pub use job::{PassReport, SkipReason, VerificationJob};
pub use modes::{mode_for, Classic, DirectFetch, PassContext, VerificationMode};
pub use reorg::{ReorgHandler, ReorgOutcome};
pub use tracker::{PendingRequestTracker, Slot};
