//! # Completion Queue
//!
//! Responses arrive on the network's I/O context at arbitrary times. They are
//! not applied there: each request carries a [`CompletionSink`] that pushes
//! the raw response onto a channel, and the job drains that channel at the
//! start of its next pass. The job is therefore the only writer of request
//! state.
//!
//! ```text
//! network I/O ──deliver()──→ [mpsc] ──drain()──→ VerificationJob::run
//! ```

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{HeaderKey, SpvResult, TxHash};
use crate::ports::rpc::{RpcMethod, RpcResponse};

/// Liveness flag shared between a job and every sink it hands out.
#[derive(Clone, Debug, Default)]
pub struct DisposalToken {
    disposed: Arc<AtomicBool>,
}

impl DisposalToken {
    /// Create a live token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the owner as torn down.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    /// Has the owner been torn down?
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

/// What a response is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionKind {
    /// Header request.
    Header {
        /// Key the header was requested under.
        key: HeaderKey,
        /// Wallet height of the transaction that triggered the request.
        height: u64,
    },
    /// Merkle branch request.
    Proof {
        /// Transaction the proof is for.
        tx_hash: TxHash,
        /// Height sent with the request.
        height: u64,
    },
}

impl CompletionKind {
    /// Remote method the response answers.
    pub fn method(&self) -> RpcMethod {
        match self {
            CompletionKind::Header { .. } => RpcMethod::BlockHeader,
            CompletionKind::Proof { .. } => RpcMethod::GetMerkle,
        }
    }
}

/// A response waiting to be applied.
#[derive(Clone, Debug)]
pub struct Completion {
    /// Correlation ID of the originating request.
    pub request_id: Uuid,
    /// What the response is for.
    pub kind: CompletionKind,
    /// Raw response.
    pub response: RpcResponse,
}

/// Handed to the network with each request; consumed by the response.
#[derive(Clone, Debug)]
pub struct CompletionSink {
    request_id: Uuid,
    kind: CompletionKind,
    sender: mpsc::UnboundedSender<Completion>,
    token: DisposalToken,
}

impl CompletionSink {
    /// What the pending response is for.
    pub fn kind(&self) -> &CompletionKind {
        &self.kind
    }

    /// Correlation ID of the request.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Queue a response for the next pass.
    ///
    /// Returns false when the owning job has been torn down, in which case
    /// the response is dropped.
    pub fn deliver(self, response: RpcResponse) -> bool {
        if self.token.is_disposed() {
            debug!(
                "[spv] Discarding stale {} response {}",
                self.kind.method().label(),
                self.request_id
            );
            return false;
        }

        self.sender
            .send(Completion {
                request_id: self.request_id,
                kind: self.kind,
                response,
            })
            .is_ok()
    }

    /// Parse a raw JSON response object and queue it.
    pub fn deliver_json(self, value: Value) -> SpvResult<bool> {
        let response = RpcResponse::from_json(value)?;
        Ok(self.deliver(response))
    }
}

/// Receiving end owned by the job.
#[derive(Debug)]
pub struct CompletionQueue {
    sender: mpsc::UnboundedSender<Completion>,
    receiver: mpsc::UnboundedReceiver<Completion>,
    token: DisposalToken,
}

impl CompletionQueue {
    /// Create a queue bound to a disposal token.
    pub fn new(token: DisposalToken) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver,
            token,
        }
    }

    /// Create a sink for one request.
    pub fn sink(&self, request_id: Uuid, kind: CompletionKind) -> CompletionSink {
        CompletionSink {
            request_id,
            kind,
            sender: self.sender.clone(),
            token: self.token.clone(),
        }
    }

    /// Take every queued response. Empty once the token is disposed.
    pub fn drain(&mut self) -> Vec<Completion> {
        let mut completions = Vec::new();
        while let Ok(completion) = self.receiver.try_recv() {
            completions.push(completion);
        }

        if self.token.is_disposed() && !completions.is_empty() {
            debug!(
                "[spv] Discarding {} responses queued before teardown",
                completions.len()
            );
            completions.clear();
        }

        completions
    }

    /// Token shared with the sinks.
    pub fn token(&self) -> &DisposalToken {
        &self.token
    }
}
