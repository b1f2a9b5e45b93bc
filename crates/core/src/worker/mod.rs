//! Queue consumer that runs download jobs with a bounded slot count.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::metrics;
use crate::orchestrator::{DownloadOrchestrator, OrchestratorError};
use crate::queue::{Job, JobQueue, RetryPolicy};
use crate::video::VideoStore;

/// Pulls jobs off the queue and runs up to `max_jobs` of them at once.
#[derive(Clone)]
pub struct Worker {
    queue: Arc<dyn JobQueue>,
    store: Arc<dyn VideoStore>,
    orchestrator: Arc<DownloadOrchestrator>,
    policy: RetryPolicy,
    max_jobs: usize,
    dequeue_timeout: Duration,
}

impl Worker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        store: Arc<dyn VideoStore>,
        orchestrator: Arc<DownloadOrchestrator>,
        policy: RetryPolicy,
        max_jobs: usize,
        dequeue_timeout: Duration,
    ) -> Self {
        Self {
            queue,
            store,
            orchestrator,
            policy,
            max_jobs: max_jobs.max(1),
            dequeue_timeout,
        }
    }

    /// Consume jobs until `shutdown` fires, then wait for running jobs.
    ///
    /// Shutdown is only observed between dequeue calls, so a job popped from
    /// the queue is always started.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        let slots = Arc::new(Semaphore::new(self.max_jobs));
        info!(max_jobs = self.max_jobs, "Worker started");

        loop {
            if shutdown_requested(&mut shutdown) {
                break;
            }

            let permit = tokio::select! {
                _ = shutdown.recv() => break,
                permit = Arc::clone(&slots).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            match self.queue.dequeue(self.dequeue_timeout).await {
                Ok(Some(job)) => {
                    let worker = self.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        worker.process(job).await;
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "Dequeue failed");
                    drop(permit);
                    tokio::select! {
                        _ = shutdown.recv() => break,
                        _ = tokio::time::sleep(self.dequeue_timeout) => {}
                    }
                }
            }
        }

        info!("Worker stopping; waiting for running jobs");
        let _ = slots.acquire_many(self.max_jobs as u32).await;
        info!("Worker stopped");
    }

    /// Run one job and apply the retry policy to its failure.
    pub async fn process(&self, job: Job) {
        info!(
            job_id = %job.job_id,
            video_id = %job.video_id,
            attempt = job.attempt,
            "Processing job"
        );

        if let Err(e) = self.queue.mark_started(&job).await {
            warn!(job_id = %job.job_id, error = %e, "Failed to mark job started");
        }
        let result = self.orchestrator.run(&job.video_id, &job.source_url).await;
        if let Err(e) = self.queue.mark_finished(&job).await {
            warn!(job_id = %job.job_id, error = %e, "Failed to mark job finished");
        }

        match result {
            Ok(outcome) => {
                info!(job_id = %job.job_id, video_id = %job.video_id, outcome = outcome.as_str(), "Job finished");
            }
            Err(e) => self.handle_failure(job, e).await,
        }
    }

    /// Apply the retry policy to a failed attempt.
    ///
    /// Re-queueing is the queue substrate's retry: it re-arms the record
    /// through the explicit `failed -> pending` edge (`VideoStore::retry`),
    /// the same transition a user-initiated retry takes.
    async fn handle_failure(&self, job: Job, err: OrchestratorError) {
        if !err.is_retryable() {
            warn!(job_id = %job.job_id, video_id = %job.video_id, error = %err, "Job not retried");
            return;
        }
        if !self.policy.should_retry(job.attempt) {
            error!(
                job_id = %job.job_id,
                video_id = %job.video_id,
                attempts = job.attempt,
                error = %err,
                "Job failed permanently"
            );
            return;
        }

        if let Err(e) = self.store.retry(&job.video_id) {
            warn!(video_id = %job.video_id, error = %e, "Cannot re-arm video for retry");
            return;
        }

        let next = job.next_attempt();
        match self.queue.requeue(next.clone()).await {
            Ok(()) => {
                metrics::JOB_RETRIES.inc();
                info!(
                    job_id = %next.job_id,
                    video_id = %next.video_id,
                    attempt = next.attempt,
                    "Job re-queued"
                );
            }
            Err(e) => {
                error!(job_id = %next.job_id, video_id = %next.video_id, error = %e, "Failed to re-queue job");
            }
        }
    }
}

fn shutdown_requested(shutdown: &mut broadcast::Receiver<()>) -> bool {
    match shutdown.try_recv() {
        Err(TryRecvError::Empty) => false,
        Ok(()) | Err(TryRecvError::Closed) | Err(TryRecvError::Lagged(_)) => {
            debug!("Shutdown observed by worker loop");
            true
        }
    }
}
