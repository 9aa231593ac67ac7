//! Site-level publish coordination.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use site_core::ElementTree;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::backend::{PublishBackend, PublishRequest};
use crate::error::{PublishError, PublishResult};
use crate::job::{JobStatus, PublishJob};
use crate::poller::{spawn_poll, PollConfig, PollHandle};

/// The latest job of one site.
struct Tracked {
    state: watch::Receiver<PublishJob>,
    handle: PollHandle,
    spawned: Instant,
}

/// Starts publish jobs and tracks the latest one per site.
///
/// Cloning is cheap; clones share the same jobs.
#[derive(Clone)]
pub struct Publisher {
    backend: Arc<dyn PublishBackend>,
    config: PollConfig,
    sites: Arc<Mutex<HashMap<String, Tracked>>>,
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("config", &self.config)
            .field("sites", &self.lock().len())
            .finish_non_exhaustive()
    }
}

impl Publisher {
    /// Create a publisher over a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn PublishBackend>, config: PollConfig) -> Self {
        Self {
            backend,
            config,
            sites: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Poll configuration used for new jobs.
    #[must_use]
    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Tracked>> {
        self.sites.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Submit a snapshot of `tree` and start tracking the resulting job.
    ///
    /// Any loop still polling an earlier job of the same site is cancelled;
    /// that job is forgotten.
    ///
    /// # Errors
    ///
    /// Returns the backend error when the request is rejected or the backend
    /// is unreachable. No job is created and nothing is polled.
    pub async fn publish(
        &self,
        website_id: &str,
        tree: &ElementTree,
        custom_domain: Option<String>,
    ) -> PublishResult<PublishJob> {
        let request = PublishRequest {
            website_id: website_id.to_string(),
            tree: tree.root().clone(),
            custom_domain,
        };
        let accepted = match self.backend.request_publish(&request).await {
            Ok(accepted) => accepted,
            Err(error) => {
                warn!("Publish of {} rejected: {}", website_id, error);
                return Err(error);
            }
        };

        let job = PublishJob::accepted(accepted.job_id, website_id, accepted.deployment_url);
        let (tx, rx) = watch::channel(job.clone());
        let handle = spawn_poll(Arc::clone(&self.backend), tx, self.config.clone());
        let tracked = Tracked {
            state: rx,
            handle,
            spawned: Instant::now(),
        };

        let previous = self.lock().insert(website_id.to_string(), tracked);
        if let Some(mut previous) = previous {
            if previous.handle.cancel() {
                debug!(
                    "Job {} of {} superseded by {}",
                    previous.handle.job_id(),
                    website_id,
                    job.job_id
                );
            }
        }
        info!("Publishing {} as job {}", website_id, job.job_id);
        Ok(job)
    }

    /// Latest job of a site.
    #[must_use]
    pub fn status(&self, website_id: &str) -> Option<PublishJob> {
        self.lock()
            .get(website_id)
            .map(|tracked| tracked.state.borrow().clone())
    }

    /// State of a site's latest job, `Idle` when there is none.
    #[must_use]
    pub fn site_status(&self, website_id: &str) -> JobStatus {
        self.status(website_id)
            .map_or(JobStatus::Idle, |job| job.status)
    }

    /// Look a job up by id.
    #[must_use]
    pub fn job(&self, job_id: &str) -> Option<PublishJob> {
        self.lock().values().find_map(|tracked| {
            let job = tracked.state.borrow();
            (job.job_id == job_id).then(|| job.clone())
        })
    }

    /// Receiver of every change to a site's latest job.
    ///
    /// The channel closes when the job's poll loop ends.
    #[must_use]
    pub fn subscribe(&self, website_id: &str) -> Option<watch::Receiver<PublishJob>> {
        self.lock()
            .get(website_id)
            .map(|tracked| tracked.state.clone())
    }

    /// Forget a job whose outcome has been observed.
    ///
    /// Settled jobs and jobs whose polling was cancelled or has stopped can
    /// be forgotten. Returns `Ok(false)` and keeps the job while it is still
    /// being polled.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::UnknownJob`] when no tracked job has this id.
    pub fn acknowledge(&self, job_id: &str) -> PublishResult<bool> {
        let mut sites = self.lock();
        let website_id = sites
            .iter()
            .find(|(_, tracked)| tracked.handle.job_id() == job_id)
            .map(|(website_id, _)| website_id.clone())
            .ok_or_else(|| PublishError::UnknownJob(job_id.to_string()))?;

        let done = sites.get(&website_id).is_some_and(|tracked| {
            tracked.state.borrow().is_settled()
                || tracked.handle.is_cancelled()
                || tracked.handle.is_finished()
        });
        if done {
            sites.remove(&website_id);
            debug!("Job {} of {} acknowledged", job_id, website_id);
        }
        Ok(done)
    }

    /// Stop polling a site's latest job. The job stays visible.
    ///
    /// Returns whether a running loop was stopped.
    pub fn cancel(&self, website_id: &str) -> bool {
        let cancelled = self
            .lock()
            .get_mut(website_id)
            .is_some_and(|tracked| tracked.handle.cancel());
        if cancelled {
            info!("Publish polling for {} cancelled", website_id);
        }
        cancelled
    }

    /// Forget jobs whose loop has ended and that are older than the poll
    /// ceiling. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let ceiling = self.config.ceiling;
        let mut sites = self.lock();
        let before = sites.len();
        sites.retain(|_, tracked| {
            !(tracked.handle.is_finished() && tracked.spawned.elapsed() >= ceiling)
        });
        let removed = before - sites.len();
        if removed > 0 {
            debug!("Pruned {} publish jobs", removed);
        }
        removed
    }

    /// Number of poll loops still running.
    #[must_use]
    pub fn active_polls(&self) -> usize {
        self.lock()
            .values()
            .filter(|tracked| !tracked.handle.is_finished())
            .count()
    }
}
