//! # Verifier Configuration
//!
//! Configuration for the SPV verification job.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SPV_MODE` | `classic` | `classic` or `direct-fetch` |
//! | `SPV_HEADER_KEYING` | `tx-hash` | Direct-fetch header key: `tx-hash` or `height` |
//! | `SPV_INDEPENDENT_VERIFICATION` | `true` | `false` trusts a single provider and skips proofs |
//! | `SPV_CHUNK_LEN` | `2016` | Headers per chunk in classic mode |
//! | `SPV_TICK_INTERVAL_MS` | `100` | Scheduler period |
//! | `SPV_MAX_PENDING_TICKS` | unset | Release requests pending this many passes |

use serde::{Deserialize, Serialize};
use std::env;

use crate::domain::{SpvError, SpvResult, DEFAULT_CHUNK_LEN};

/// Which verification strategy the job runs.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ModeSelector {
    /// Headers come from the locally synchronized chain.
    Classic,
    /// Headers are fetched from the server per transaction.
    DirectFetch,
}

/// Key used for direct-fetch header requests.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum HeaderKeying {
    /// `blockchain.block.header [tx_hash]`.
    TxHash,
    /// `blockchain.block.header [height]`.
    Height,
}

/// SPV verifier configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Verification strategy.
    pub mode: ModeSelector,

    /// Header key family for direct-fetch mode.
    pub header_keying: HeaderKeying,

    /// When false the client trusts a single provider and never
    /// issues proof requests.
    pub independent_verification: bool,

    /// Headers per chunk (classic mode).
    pub chunk_len: u64,

    /// Scheduler tick interval in milliseconds.
    pub tick_interval_ms: u64,

    /// Release header/proof entries that stayed pending for this many
    /// passes. `None` keeps them pending until a reorg purge.
    pub max_pending_ticks: Option<u64>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            mode: ModeSelector::Classic,
            header_keying: HeaderKeying::TxHash,
            independent_verification: true,
            chunk_len: DEFAULT_CHUNK_LEN,
            tick_interval_ms: 100,
            max_pending_ticks: None,
        }
    }
}

impl VerifierConfig {
    /// Create a config for testing (small chunks, fast ticks).
    pub fn for_testing() -> Self {
        Self {
            mode: ModeSelector::Classic,
            header_keying: HeaderKeying::TxHash,
            independent_verification: true,
            chunk_len: 10,
            tick_interval_ms: 10,
            max_pending_ticks: None,
        }
    }

    /// Direct-fetch variant of [`VerifierConfig::for_testing`].
    pub fn direct_fetch_for_testing(header_keying: HeaderKeying) -> Self {
        Self {
            mode: ModeSelector::DirectFetch,
            header_keying,
            ..Self::for_testing()
        }
    }

    /// Create configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            mode: match env::var("SPV_MODE").map(|v| v.to_lowercase()).as_deref() {
                Ok("direct-fetch") | Ok("direct_fetch") | Ok("fast") => ModeSelector::DirectFetch,
                Ok("classic") => ModeSelector::Classic,
                _ => defaults.mode,
            },

            header_keying: match env::var("SPV_HEADER_KEYING")
                .map(|v| v.to_lowercase())
                .as_deref()
            {
                Ok("height") => HeaderKeying::Height,
                Ok("tx-hash") | Ok("tx_hash") => HeaderKeying::TxHash,
                _ => defaults.header_keying,
            },

            independent_verification: env::var("SPV_INDEPENDENT_VERIFICATION")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(defaults.independent_verification),

            chunk_len: env::var("SPV_CHUNK_LEN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.chunk_len),

            tick_interval_ms: env::var("SPV_TICK_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.tick_interval_ms),

            max_pending_ticks: env::var("SPV_MAX_PENDING_TICKS")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }

    /// Reject values the job cannot run with.
    pub fn validate(&self) -> SpvResult<()> {
        if self.chunk_len == 0 {
            return Err(SpvError::Config("chunk_len must be positive".to_string()));
        }
        if self.tick_interval_ms == 0 {
            return Err(SpvError::Config(
                "tick_interval_ms must be positive".to_string(),
            ));
        }
        if self.max_pending_ticks == Some(0) {
            return Err(SpvError::Config(
                "max_pending_ticks must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}
