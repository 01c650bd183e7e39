//! # Verifier Scheduler
//!
//! Drives [`VerificationJob::run`] on a fixed interval from a tokio task.
//!
//! - Passes never overlap: the job is owned by the task.
//! - A panicking pass is logged and the next tick runs as usual.
//! - [`SchedulerHandle::stop`] signals shutdown, disposes the job and hands
//!   it back.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::application::{DisposalToken, VerificationJob};

/// Spawns verification jobs onto the tokio runtime.
pub struct VerifierScheduler;

impl VerifierScheduler {
    /// Run `job` every `period` until stopped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(job: VerificationJob, period: Duration) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let token = job.disposal_token();
        let task = tokio::spawn(drive(job, period, shutdown_rx));

        SchedulerHandle {
            shutdown_tx,
            task,
            token,
        }
    }

    /// Run `job` at its configured tick interval.
    pub fn spawn_configured(job: VerificationJob) -> SchedulerHandle {
        let period = Duration::from_millis(job.config().tick_interval_ms);
        Self::spawn(job, period)
    }
}

/// Handle to a running scheduler.
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<VerificationJob>,
    token: DisposalToken,
}

impl SchedulerHandle {
    /// Stop the scheduler and return the disposed job.
    ///
    /// Returns `None` only if the task was aborted by the runtime.
    pub async fn stop(self) -> Option<VerificationJob> {
        // Receiver gone means the task already exited.
        let _ = self.shutdown_tx.send(true);
        match self.task.await {
            Ok(job) => Some(job),
            Err(e) => {
                error!("[spv] Scheduler task did not finish cleanly: {}", e);
                None
            }
        }
    }

    /// Token of the job being driven.
    pub fn disposal_token(&self) -> &DisposalToken {
        &self.token
    }

    /// Has the scheduler task exited?
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn drive(
    mut job: VerificationJob,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> VerificationJob {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(
        "[spv] Scheduler started (mode: {}, every {:?})",
        job.mode_name(),
        period
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match catch_unwind(AssertUnwindSafe(|| job.run())) {
                    Ok(report) => {
                        if report.requests_issued > 0 || report.completions_applied > 0 {
                            debug!(
                                tick = report.tick,
                                requests = report.requests_issued,
                                completions = report.completions_applied,
                                pruned = report.pruned,
                                "[spv] Pass complete"
                            );
                        }
                    }
                    Err(payload) => {
                        error!(
                            "[spv] Verification pass panicked: {}",
                            panic_message(payload.as_ref())
                        );
                    }
                }
                if job.is_disposed() {
                    info!("[spv] Job disposed, scheduler exiting");
                    break;
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("[spv] Shutdown signal received");
                    break;
                }
            }
        }
    }

    job.shutdown();
    job
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
