//! # Telemetry
//!
//! Log subscriber setup for processes embedding the verifier.
//!
//! The verifier itself only emits `tracing` events; nothing here is required
//! for it to run. Call [`init_logging`] once at startup:
//!
//! ```no_run
//! use spv_verifier::telemetry::{init_logging, TelemetryConfig};
//!
//! init_logging(&TelemetryConfig::from_env()).expect("logging");
//! ```

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{init_logging, init_test_logging};

use thiserror::Error;

/// Telemetry setup errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber is already installed.
    #[error("Global log subscriber already initialized: {0}")]
    AlreadyInitialized(String),

    /// The log level filter could not be parsed.
    #[error("Invalid log filter: {0}")]
    Filter(String),
}
