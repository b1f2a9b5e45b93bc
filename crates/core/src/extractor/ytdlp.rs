use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{
    AbortReason, DownloadRequest, ExtractedInfo, Extractor, ExtractorError, ProgressCallback,
    ProgressTick,
};
use crate::config::ExtractorConfig;

/// Format selection; `{max_height}` is substituted from config.
pub const FORMAT_TEMPLATE: &str =
    "bestvideo[vcodec^=avc1][height<={max_height}]+bestaudio[acodec^=mp4a]/best[ext=mp4]";

/// Prefix of the progress lines requested through `--progress-template`.
pub const PROGRESS_MARKER: &str = "vidkeep-progress";

const STDERR_TAIL_LINES: usize = 50;
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Extractor backed by the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    binary: PathBuf,
    max_video_height: u32,
}

enum OutputLine {
    Stdout(String),
    Stderr(String),
}

impl YtDlpExtractor {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            max_video_height: config.max_video_height,
        }
    }

    fn format(&self) -> String {
        FORMAT_TEMPLATE.replace("{max_height}", &self.max_video_height.to_string())
    }

    fn download_args(&self, request: &DownloadRequest) -> Vec<String> {
        vec![
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--progress-template".to_string(),
            format!(
                "download:{} %(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s",
                PROGRESS_MARKER
            ),
            "--format".to_string(),
            self.format(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "--output".to_string(),
            request.output_path.to_string_lossy().into_owned(),
            "--write-thumbnail".to_string(),
            "--convert-thumbnails".to_string(),
            "jpg".to_string(),
            "--dump-json".to_string(),
            "--no-simulate".to_string(),
            "--".to_string(),
            request.source_url.clone(),
        ]
    }

    fn spawn(&self, args: &[String]) -> Result<Child, ExtractorError> {
        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExtractorError::Spawn(format!("{}: {}", self.binary.display(), e)))
    }
}

impl Extractor for YtDlpExtractor {
    fn download(
        &self,
        request: &DownloadRequest,
        on_progress: &mut ProgressCallback<'_>,
    ) -> Result<ExtractedInfo, ExtractorError> {
        let mut child = self.spawn(&self.download_args(request))?;
        debug!(video_id = %request.video_id, "yt-dlp started");

        let (tx, rx) = mpsc::channel();
        let readers = [
            child.stdout.take().map(|s| forward_lines(s, tx.clone(), OutputLine::Stdout)),
            child.stderr.take().map(|s| forward_lines(s, tx.clone(), OutputLine::Stderr)),
        ];
        drop(tx);

        let mut info_json: Option<String> = None;
        let mut stderr_tail: VecDeque<String> = VecDeque::new();

        let aborted = loop {
            if request.deadline.is_some_and(|d| Instant::now() >= d) {
                break Some(AbortReason::TimedOut);
            }

            let line = match rx.recv_timeout(POLL_INTERVAL) {
                Ok(line) => line,
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => break None,
            };

            let text = match line {
                OutputLine::Stdout(text) => {
                    if text.trim_start().starts_with('{') {
                        info_json = Some(text);
                        continue;
                    }
                    text
                }
                OutputLine::Stderr(text) => {
                    if parse_progress_line(&text).is_none() {
                        stderr_tail.push_back(text.clone());
                        if stderr_tail.len() > STDERR_TAIL_LINES {
                            stderr_tail.pop_front();
                        }
                    }
                    text
                }
            };

            if let Some(tick) = parse_progress_line(&text) {
                if let ControlFlow::Break(reason) = on_progress(tick) {
                    break Some(reason);
                }
            }
        };

        if let Some(reason) = aborted {
            debug!(video_id = %request.video_id, reason = %reason, "Killing yt-dlp");
            if let Err(e) = child.kill() {
                warn!(video_id = %request.video_id, error = %e, "Failed to kill yt-dlp");
            }
            let _ = child.wait();
            return Err(ExtractorError::Aborted(reason));
        }

        let status = child
            .wait()
            .map_err(|e| ExtractorError::Failed(format!("waiting for yt-dlp: {}", e)))?;
        for reader in readers.into_iter().flatten() {
            let _ = reader.join();
        }

        if !status.success() {
            return Err(ExtractorError::Failed(failure_message(&stderr_tail, status.code())));
        }

        let json = info_json
            .ok_or_else(|| ExtractorError::InvalidOutput("no info document on stdout".to_string()))?;
        serde_json::from_str(&json).map_err(|e| ExtractorError::InvalidOutput(e.to_string()))
    }

    fn probe(&self, source_url: &str) -> Result<ExtractedInfo, ExtractorError> {
        let args = [
            "--no-playlist",
            "--no-warnings",
            "--skip-download",
            "--dump-json",
            "--",
            source_url,
        ]
        .map(String::from);
        let output = self.spawn(&args)?.wait_with_output().map_err(|e| {
            ExtractorError::Failed(format!("waiting for yt-dlp: {}", e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: VecDeque<String> = stderr.lines().map(String::from).collect();
            return Err(ExtractorError::Failed(failure_message(&tail, output.status.code())));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ExtractorError::InvalidOutput(e.to_string()))
    }
}

fn forward_lines<R, F>(stream: R, tx: mpsc::Sender<OutputLine>, wrap: F) -> thread::JoinHandle<()>
where
    R: Read + Send + 'static,
    F: Fn(String) -> OutputLine + Send + 'static,
{
    thread::spawn(move || {
        for line in BufReader::new(stream).lines() {
            let Ok(line) = line else { break };
            if tx.send(wrap(line)).is_err() {
                break;
            }
        }
    })
}

/// Prefer yt-dlp's own `ERROR:` lines over the raw stderr tail.
fn failure_message(stderr_tail: &VecDeque<String>, code: Option<i32>) -> String {
    let errors: Vec<&str> = stderr_tail
        .iter()
        .filter_map(|l| l.strip_prefix("ERROR:"))
        .map(str::trim)
        .collect();
    if !errors.is_empty() {
        return errors.join("\n");
    }
    let tail: Vec<&str> = stderr_tail.iter().map(String::as_str).collect();
    if tail.is_empty() {
        return format!("yt-dlp exited with status {}", code.unwrap_or(-1));
    }
    tail.join("\n")
}

/// Parse a `vidkeep-progress DOWNLOADED TOTAL ESTIMATE` line.
///
/// Fields yt-dlp cannot fill are printed as `NA`; the exact total is
/// preferred, then the estimate.
pub fn parse_progress_line(line: &str) -> Option<ProgressTick> {
    let mut fields = line.trim().strip_prefix(PROGRESS_MARKER)?.split_whitespace();
    let downloaded = parse_count(fields.next()?)?;
    let total = fields.next().and_then(parse_count);
    let estimate = fields.next().and_then(parse_count);
    Some(ProgressTick {
        downloaded_bytes: downloaded,
        total_bytes: total.or(estimate),
    })
}

fn parse_count(field: &str) -> Option<u64> {
    let value: f64 = field.parse().ok()?;
    (value.is_finite() && value >= 0.0).then(|| value as u64)
}
