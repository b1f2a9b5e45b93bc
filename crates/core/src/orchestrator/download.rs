//! Download orchestrator implementation.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::extractor::{
    truncate_chars, AbortReason, DownloadRequest, ExtractedInfo, Extractor, ExtractorError,
    ProgressTick, VideoMetadata,
};
use crate::media::MediaLayout;
use crate::metrics;
use crate::progress::{ProgressChannel, ProgressEvent};
use crate::signal::CancelSignals;
use crate::thumbnail::ThumbnailProcessor;
use crate::video::{VideoError, VideoStore};

use super::cancel_gate::CancelGate;
use super::config::OrchestratorConfig;
use super::types::{OrchestratorError, Outcome};

/// Message stored on a cancelled record.
pub const CANCELLED_MESSAGE: &str = "Download cancelled by user";

/// Longest failure message stored on a record, in characters.
pub const FAILURE_MESSAGE_MAX_CHARS: usize = 500;

enum Transfer {
    Finished(ExtractedInfo),
    Cancelled,
}

/// Drives a single download job through the video state machine.
///
/// Cancellation is cooperative: the signal is consumed at three checkpoints
/// (before start, at rate-limited progress ticks, and after the transfer) and
/// never interrupts a read already in flight.
pub struct DownloadOrchestrator {
    config: OrchestratorConfig,
    store: Arc<dyn VideoStore>,
    signals: Arc<dyn CancelSignals>,
    progress: Arc<dyn ProgressChannel>,
    extractor: Arc<dyn Extractor>,
    thumbnails: Arc<dyn ThumbnailProcessor>,
    layout: MediaLayout,
}

impl DownloadOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        store: Arc<dyn VideoStore>,
        signals: Arc<dyn CancelSignals>,
        progress: Arc<dyn ProgressChannel>,
        extractor: Arc<dyn Extractor>,
        thumbnails: Arc<dyn ThumbnailProcessor>,
        layout: MediaLayout,
    ) -> Self {
        Self {
            config,
            store,
            signals,
            progress,
            extractor,
            thumbnails,
            layout,
        }
    }

    /// Run one job.
    ///
    /// Failures are recorded on the video before being returned, except
    /// [`OrchestratorError::NotStartable`].
    pub async fn run(&self, video_id: &str, source_url: &str) -> Result<Outcome, OrchestratorError> {
        let started = Instant::now();
        let result = self.execute(video_id, source_url).await;

        let label = match &result {
            Ok(outcome) => outcome.as_str(),
            Err(e) => e.outcome_label(),
        };
        metrics::JOB_OUTCOMES.with_label_values(&[label]).inc();
        metrics::JOB_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());

        result
    }

    async fn execute(&self, video_id: &str, source_url: &str) -> Result<Outcome, OrchestratorError> {
        if self.take_cancel_request(video_id, "pre-start").await {
            return self.finish_cancelled(video_id);
        }

        let purged = self.layout.purge_partials(video_id);
        if purged > 0 {
            debug!(video_id = %video_id, purged, "Purged partial artifacts from a previous attempt");
        }

        self.store
            .begin_download(video_id)
            .map_err(OrchestratorError::NotStartable)?;
        info!(video_id = %video_id, "Download started");

        let info = match self.transfer(video_id, source_url).await {
            Ok(Transfer::Finished(info)) => info,
            Ok(Transfer::Cancelled) => return self.finish_cancelled(video_id),
            Err(e) => return self.finish_failed(video_id, e),
        };

        if self.take_cancel_request(video_id, "post-download").await {
            return self.finish_cancelled(video_id);
        }

        match self.commit(video_id, &info) {
            Ok(size) => {
                info!(video_id = %video_id, file_size_bytes = size, "Download complete");
                Ok(Outcome::Completed)
            }
            Err(e) => self.finish_failed(video_id, e),
        }
    }

    /// Consume a pending cancellation request. Signal store errors are logged
    /// and treated as "not requested".
    async fn take_cancel_request(&self, video_id: &str, checkpoint: &str) -> bool {
        match self.signals.consume(video_id).await {
            Ok(true) => {
                info!(video_id = %video_id, checkpoint, "Cancellation requested");
                true
            }
            Ok(false) => false,
            Err(e) => {
                warn!(video_id = %video_id, checkpoint, error = %e, "Cancellation check failed");
                false
            }
        }
    }

    async fn transfer(&self, video_id: &str, source_url: &str) -> Result<Transfer, OrchestratorError> {
        let deadline = Instant::now() + self.config.job_timeout;
        let request = DownloadRequest {
            video_id: video_id.to_string(),
            source_url: source_url.to_string(),
            output_path: self.layout.video_path(video_id),
            deadline: Some(deadline),
        };

        // Ticks arrive on the blocking thread; publishing happens here.
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let relay = tokio::spawn(relay_progress(Arc::clone(&self.progress), events_rx));

        let extractor = Arc::clone(&self.extractor);
        let signals = Arc::clone(&self.signals);
        let handle = Handle::current();
        let mut gate = CancelGate::new(self.config.cancel_check_interval);

        let joined = tokio::task::spawn_blocking(move || {
            let video_id = request.video_id.clone();
            let mut on_progress = |tick: ProgressTick| -> ControlFlow<AbortReason> {
                let event =
                    ProgressEvent::from_tick(&video_id, tick.downloaded_bytes, tick.total_bytes);
                let _ = events_tx.send(event);

                let now = Instant::now();
                if now >= deadline {
                    return ControlFlow::Break(AbortReason::TimedOut);
                }
                if gate.should_check(now) {
                    match handle.block_on(signals.consume(&video_id)) {
                        Ok(true) => return ControlFlow::Break(AbortReason::Cancelled),
                        Ok(false) => {}
                        Err(e) => {
                            warn!(video_id = %video_id, error = %e, "Cancellation check failed");
                        }
                    }
                }
                ControlFlow::Continue(())
            };
            extractor.download(&request, &mut on_progress)
        })
        .await;

        // The sender went away with the blocking task, so the relay drains and ends.
        if let Err(e) = relay.await {
            warn!(video_id = %video_id, error = %e, "Progress relay task failed");
        }

        match joined {
            Ok(Ok(info)) => Ok(Transfer::Finished(info)),
            Ok(Err(ExtractorError::Aborted(AbortReason::Cancelled))) => Ok(Transfer::Cancelled),
            Ok(Err(ExtractorError::Aborted(AbortReason::TimedOut))) => Err(
                OrchestratorError::TimedOut(self.config.job_timeout.as_secs()),
            ),
            Ok(Err(e)) => Err(e.into()),
            Err(e) => Err(OrchestratorError::Task(e.to_string())),
        }
    }

    /// Normalize the thumbnail, stat the file, and write `complete`.
    fn commit(&self, video_id: &str, info: &ExtractedInfo) -> Result<u64, OrchestratorError> {
        match self.thumbnails.normalize(video_id) {
            Ok(Some(path)) => debug!(video_id = %video_id, path = %path.display(), "Thumbnail ready"),
            Ok(None) => debug!(video_id = %video_id, "No thumbnail produced"),
            Err(e) => warn!(video_id = %video_id, error = %e, "Thumbnail processing failed"),
        }

        let size = std::fs::metadata(self.layout.video_path(video_id))
            .map_err(OrchestratorError::Media)?
            .len();

        let completed = VideoMetadata::from_info(info).into_completed(size);
        self.store.complete(video_id, completed)?;
        Ok(size)
    }

    fn finish_cancelled(&self, video_id: &str) -> Result<Outcome, OrchestratorError> {
        match self.store.cancel(video_id, CANCELLED_MESSAGE) {
            Ok(changed) => {
                let removed = self.layout.discard(video_id);
                if changed {
                    info!(video_id = %video_id, removed, "Download cancelled");
                } else {
                    debug!(video_id = %video_id, removed, "Video was already cancelled");
                }
            }
            Err(VideoError::InvalidTransition { from, .. }) => {
                // Stale signal for a record in a state that cannot be cancelled.
                self.layout.purge_partials(video_id);
                warn!(video_id = %video_id, status = %from, "Ignoring cancellation for non-cancellable video");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(Outcome::Cancelled)
    }

    fn finish_failed(
        &self,
        video_id: &str,
        err: OrchestratorError,
    ) -> Result<Outcome, OrchestratorError> {
        let removed = self.layout.discard(video_id);
        let message = err.to_string();
        error!(video_id = %video_id, error = %message, removed, "Download failed");

        if let Err(e) = self
            .store
            .fail(video_id, truncate_chars(&message, FAILURE_MESSAGE_MAX_CHARS))
        {
            error!(video_id = %video_id, error = %e, "Failed to record download failure");
        }
        Err(err)
    }
}

async fn relay_progress(
    progress: Arc<dyn ProgressChannel>,
    mut events: mpsc::UnboundedReceiver<ProgressEvent>,
) {
    while let Some(event) = events.recv().await {
        match progress.publish(&event).await {
            Ok(()) => metrics::PROGRESS_EVENTS_PUBLISHED.inc(),
            Err(e) => {
                metrics::PROGRESS_PUBLISH_FAILURES.inc();
                debug!(video_id = %event.video_id, error = %e, "Failed to publish progress event");
            }
        }
    }
}
