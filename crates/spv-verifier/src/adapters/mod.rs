//! # Adapters
//!
//! Runtime glue around the verification job.

pub mod scheduler;

pub use scheduler::{SchedulerHandle, VerifierScheduler};
