//! Scripted extractor for testing.

use std::collections::VecDeque;
use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::extractor::{
    AbortReason, DownloadRequest, ExtractedInfo, Extractor, ExtractorError, ProgressCallback,
    ProgressTick,
};

use super::fixtures;

/// How one scripted download ends, after all ticks have been reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedOutcome {
    /// Write the media file (and a thumbnail next to it) and return info.
    Succeed,
    /// Return [`ExtractorError::Failed`] with this message.
    Fail(String),
}

/// Callback run after the last tick, before the outcome is applied.
pub struct AfterTicks(Box<dyn Fn(&DownloadRequest) + Send + Sync>);

impl fmt::Debug for AfterTicks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AfterTicks(..)")
    }
}

/// Mock implementation of the [`Extractor`] trait.
///
/// Provides controllable behavior for testing:
/// - Report a fixed sequence of progress ticks, optionally spaced out
/// - Leave a `.part` file behind while "downloading", plus per-format stream
///   partials when asked
/// - Succeed or fail per call, in script order
/// - Record every request for assertions
///
/// # Example
///
/// ```rust,ignore
/// let extractor = MockExtractor::new()
///     .then(ScriptedOutcome::Fail("HTTP Error 403".into()))
///     .then(ScriptedOutcome::Succeed);
/// ```
#[derive(Debug)]
pub struct MockExtractor {
    ticks: Vec<ProgressTick>,
    tick_delay: Duration,
    media_bytes: Vec<u8>,
    write_thumbnail: bool,
    format_streams: Vec<String>,
    after_ticks: Option<AfterTicks>,
    info: Option<ExtractedInfo>,
    script: Mutex<VecDeque<ScriptedOutcome>>,
    default_outcome: ScriptedOutcome,
    requests: Mutex<Vec<DownloadRequest>>,
    probe_error: Mutex<Option<String>>,
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExtractor {
    /// Three ticks up to 4096 bytes, then success.
    pub fn new() -> Self {
        Self {
            ticks: fixtures::ticks(3, 4096),
            tick_delay: Duration::ZERO,
            media_bytes: vec![0u8; 4096],
            write_thumbnail: true,
            format_streams: Vec::new(),
            after_ticks: None,
            info: None,
            script: Mutex::new(VecDeque::new()),
            default_outcome: ScriptedOutcome::Succeed,
            requests: Mutex::new(Vec::new()),
            probe_error: Mutex::new(None),
        }
    }

    pub fn with_ticks(mut self, ticks: Vec<ProgressTick>) -> Self {
        self.ticks = ticks;
        self
    }

    /// Sleep this long before each tick.
    pub fn with_tick_delay(mut self, delay: Duration) -> Self {
        self.tick_delay = delay;
        self
    }

    /// Contents of the media file written on success.
    pub fn with_media(mut self, bytes: Vec<u8>) -> Self {
        self.media_bytes = bytes;
        self
    }

    pub fn without_thumbnail(mut self) -> Self {
        self.write_thumbnail = false;
        self
    }

    /// Info document returned on success. Defaults to [`fixtures::extracted_info`].
    pub fn with_info(mut self, info: ExtractedInfo) -> Self {
        self.info = Some(info);
        self
    }

    /// Append an outcome for the next unscripted call.
    pub fn then(self, outcome: ScriptedOutcome) -> Self {
        self.script.lock().unwrap().push_back(outcome);
        self
    }

    /// Also download separate streams, e.g. `["f137.mp4", "f140.m4a"]`, as
    /// `{id}.{stream}.part` files that are merged away only on success.
    pub fn with_format_streams(mut self, streams: &[&str]) -> Self {
        self.format_streams = streams.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Run `hook` once every tick has been reported.
    pub fn with_after_ticks(
        mut self,
        hook: impl Fn(&DownloadRequest) + Send + Sync + 'static,
    ) -> Self {
        self.after_ticks = Some(AfterTicks(Box::new(hook)));
        self
    }

    /// Outcome once the script runs out.
    pub fn always(mut self, outcome: ScriptedOutcome) -> Self {
        self.default_outcome = outcome;
        self
    }

    /// Make [`Extractor::probe`] fail with this message.
    pub fn set_probe_error(&self, message: impl Into<String>) {
        *self.probe_error.lock().unwrap() = Some(message.into());
    }

    /// Every download request received, in order.
    pub fn requests(&self) -> Vec<DownloadRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn download_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn next_outcome(&self) -> ScriptedOutcome {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_outcome.clone())
    }

    fn info_for(&self, video_id: &str) -> ExtractedInfo {
        self.info
            .clone()
            .unwrap_or_else(|| fixtures::extracted_info(video_id))
    }
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn stream_partial_path(output: &Path, video_id: &str, stream: &str) -> PathBuf {
    output.with_file_name(format!("{}.{}.part", video_id, stream))
}

fn io_failure(e: std::io::Error) -> ExtractorError {
    ExtractorError::Failed(format!("mock extractor I/O error: {}", e))
}

impl Extractor for MockExtractor {
    fn download(
        &self,
        request: &DownloadRequest,
        on_progress: &mut ProgressCallback<'_>,
    ) -> Result<ExtractedInfo, ExtractorError> {
        self.requests.lock().unwrap().push(request.clone());
        let outcome = self.next_outcome();

        let partial = partial_path(&request.output_path);
        fs::write(&partial, b"partial").map_err(io_failure)?;
        let streams: Vec<PathBuf> = self
            .format_streams
            .iter()
            .map(|stream| stream_partial_path(&request.output_path, &request.video_id, stream))
            .collect();
        for path in &streams {
            fs::write(path, b"stream").map_err(io_failure)?;
        }

        for tick in &self.ticks {
            if !self.tick_delay.is_zero() {
                std::thread::sleep(self.tick_delay);
            }
            if request.deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(ExtractorError::Aborted(AbortReason::TimedOut));
            }
            if let ControlFlow::Break(reason) = on_progress(*tick) {
                return Err(ExtractorError::Aborted(reason));
            }
        }

        if let Some(AfterTicks(hook)) = &self.after_ticks {
            hook(request);
        }

        match outcome {
            ScriptedOutcome::Succeed => {
                fs::remove_file(&partial).map_err(io_failure)?;
                for path in &streams {
                    fs::remove_file(path).map_err(io_failure)?;
                }
                fs::write(&request.output_path, &self.media_bytes).map_err(io_failure)?;
                if self.write_thumbnail {
                    let thumb = request.output_path.with_extension("jpg");
                    fs::write(thumb, b"\xFF\xD8\xFFthumb").map_err(io_failure)?;
                }
                Ok(self.info_for(&request.video_id))
            }
            ScriptedOutcome::Fail(message) => Err(ExtractorError::Failed(message)),
        }
    }

    fn probe(&self, source_url: &str) -> Result<ExtractedInfo, ExtractorError> {
        if let Some(message) = self.probe_error.lock().unwrap().clone() {
            return Err(ExtractorError::Failed(message));
        }
        let id = source_url.rsplit(['/', '=']).next().unwrap_or(source_url);
        Ok(self.info_for(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request(dir: &Path) -> DownloadRequest {
        DownloadRequest {
            video_id: "abc".to_string(),
            source_url: "https://youtu.be/abc".to_string(),
            output_path: dir.join("abc.mp4"),
            deadline: None,
        }
    }

    #[test]
    fn test_success_writes_media_and_reports_ticks() {
        let dir = TempDir::new().unwrap();
        let extractor = MockExtractor::new();
        let mut seen = Vec::new();
        let info = extractor
            .download(&request(dir.path()), &mut |tick| {
                seen.push(tick.downloaded_bytes);
                ControlFlow::Continue(())
            })
            .unwrap();

        assert_eq!(seen.len(), 3);
        assert_eq!(info.id.as_deref(), Some("abc"));
        assert_eq!(fs::metadata(dir.path().join("abc.mp4")).unwrap().len(), 4096);
        assert!(dir.path().join("abc.jpg").exists());
        assert!(!dir.path().join("abc.mp4.part").exists());
    }

    #[test]
    fn test_break_leaves_partial() {
        let dir = TempDir::new().unwrap();
        let extractor = MockExtractor::new();
        let err = extractor
            .download(&request(dir.path()), &mut |_| {
                ControlFlow::Break(AbortReason::Cancelled)
            })
            .unwrap_err();

        assert!(matches!(err, ExtractorError::Aborted(AbortReason::Cancelled)));
        assert!(dir.path().join("abc.mp4.part").exists());
        assert!(!dir.path().join("abc.mp4").exists());
    }

    #[test]
    fn test_script_then_default() {
        let dir = TempDir::new().unwrap();
        let extractor = MockExtractor::new().then(ScriptedOutcome::Fail("boom".into()));
        let mut noop = |_: ProgressTick| -> ControlFlow<AbortReason> { ControlFlow::Continue(()) };

        assert!(extractor.download(&request(dir.path()), &mut noop).is_err());
        assert!(extractor.download(&request(dir.path()), &mut noop).is_ok());
        assert_eq!(extractor.download_calls(), 2);
    }
}
