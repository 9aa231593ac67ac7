//! The per-job poll loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::backend::PublishBackend;
use crate::job::{JobStatus, PublishJob};

/// Timing of a poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between status requests.
    pub interval: Duration,
    /// Hard limit on how long a loop runs.
    pub ceiling: Duration,
    /// Consecutive failed polls after which the job is failed.
    pub max_consecutive_errors: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            ceiling: Duration::from_secs(300),
            max_consecutive_errors: 5,
        }
    }
}

impl PollConfig {
    /// Create a poll configuration with the default error budget.
    #[must_use]
    pub fn new(interval: Duration, ceiling: Duration) -> Self {
        Self {
            interval,
            ceiling,
            ..Self::default()
        }
    }

    /// Set the consecutive error budget (at least one).
    #[must_use]
    pub fn with_max_consecutive_errors(mut self, max: u32) -> Self {
        self.max_consecutive_errors = max.max(1);
        self
    }
}

/// Why a poll loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    /// The backend reported completion.
    Completed,
    /// The backend reported failure.
    Failed,
    /// Polling kept failing and the job was failed locally.
    PersistentErrors,
    /// The ceiling elapsed first; the job is flagged `timedOut`.
    TimedOut,
    /// Cancelled through [`PollHandle::cancel`] or by dropping the handle.
    Cancelled,
}

/// Handle to a running poll loop.
///
/// Dropping the handle stops the loop at its next suspension point.
#[derive(Debug)]
pub struct PollHandle {
    job_id: String,
    task: JoinHandle<PollExit>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl PollHandle {
    /// Job the loop is polling.
    #[must_use]
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// True once the loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// True once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_tx.is_none()
    }

    /// Ask the loop to stop. Returns false when it was already asked or
    /// has already stopped.
    pub fn cancel(&mut self) -> bool {
        match self.cancel_tx.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Wait for the loop to exit.
    pub async fn join(self) -> PollExit {
        let Self {
            task, cancel_tx, ..
        } = self;
        // Keep the sender alive so waiting does not itself cancel.
        let exit = task.await.unwrap_or(PollExit::Cancelled);
        drop(cancel_tx);
        exit
    }
}

/// Spawn the poll loop for the job held in `state`.
///
/// The loop is the only writer of `state`. Every tick it fetches the job
/// status and applies it; it exits on a terminal report, after
/// `max_consecutive_errors` failed polls in a row, at the ceiling, or on
/// cancellation.
pub fn spawn_poll(
    backend: Arc<dyn PublishBackend>,
    state: watch::Sender<PublishJob>,
    config: PollConfig,
) -> PollHandle {
    let job_id = state.borrow().job_id.clone();
    let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
    let loop_job_id = job_id.clone();

    let task = tokio::spawn(async move {
        let job_id = loop_job_id;
        let ceiling = tokio::time::sleep_until(Instant::now() + config.ceiling);
        tokio::pin!(ceiling);

        let mut ticker = tokio::time::interval_at(Instant::now() + config.interval, config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut consecutive_errors: u32 = 0;

        debug!("Polling job {} every {:?}", job_id, config.interval);
        loop {
            tokio::select! {
                _ = &mut cancel_rx => {
                    debug!("Poll loop for job {} cancelled", job_id);
                    return PollExit::Cancelled;
                }

                () = &mut ceiling => {
                    state.send_if_modified(PublishJob::mark_timed_out);
                    warn!("Job {} still publishing after {:?}, giving up", job_id, config.ceiling);
                    return PollExit::TimedOut;
                }

                _ = ticker.tick() => {
                    let result = tokio::select! {
                        _ = &mut cancel_rx => {
                            debug!("Poll loop for job {} cancelled mid-request", job_id);
                            return PollExit::Cancelled;
                        }
                        () = &mut ceiling => {
                            state.send_if_modified(PublishJob::mark_timed_out);
                            warn!(
                                "Job {} still publishing after {:?}, abandoning status request",
                                job_id, config.ceiling
                            );
                            return PollExit::TimedOut;
                        }
                        result = backend.job_status(&job_id) => result,
                    };

                    match result {
                        Ok(report) => {
                            consecutive_errors = 0;
                            state.send_if_modified(|job| job.apply(&report));
                            let job = state.borrow().clone();
                            match job.status {
                                JobStatus::Completed => {
                                    info!(
                                        "Job {} for {} completed: {}",
                                        job_id,
                                        job.website_id,
                                        job.deployment_url.as_deref().unwrap_or("no deployment URL")
                                    );
                                    return PollExit::Completed;
                                }
                                JobStatus::Failed => {
                                    info!(
                                        "Job {} for {} failed: {}",
                                        job_id,
                                        job.website_id,
                                        job.error.as_deref().unwrap_or("unknown error")
                                    );
                                    return PollExit::Failed;
                                }
                                JobStatus::Idle | JobStatus::Publishing => {
                                    debug!("Job {} at {}%: {}", job_id, job.progress, job.message);
                                }
                            }
                        }
                        Err(error) => {
                            consecutive_errors = consecutive_errors.saturating_add(1);
                            warn!(
                                "Polling job {} failed ({}/{}): {}",
                                job_id, consecutive_errors, config.max_consecutive_errors, error
                            );
                            if consecutive_errors >= config.max_consecutive_errors {
                                state.send_if_modified(|job| {
                                    job.fail(format!("Status unavailable: {error}"))
                                });
                                info!("Job {} failed after {} poll errors", job_id, consecutive_errors);
                                return PollExit::PersistentErrors;
                            }
                        }
                    }
                }
            }
        }
    });

    PollHandle {
        job_id,
        task,
        cancel_tx: Some(cancel_tx),
    }
}
