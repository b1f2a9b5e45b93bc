use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, Take};
use tokio_util::io::ReaderStream;
use tracing::debug;

use super::{parse_range, RangeError, RangeWindow, StreamError};
use crate::media::MediaLayout;
use crate::video::{VideoStatus, VideoStore};

/// Read size for response bodies.
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// A stored media file resolved for a video.
#[derive(Debug)]
pub struct ResolvedMedia {
    pub path: PathBuf,
    pub file: File,
    pub size: u64,
}

/// A positioned, length-limited body ready to send.
pub struct MediaStream {
    pub window: RangeWindow,
    pub body: ReaderStream<Take<File>>,
}

/// Resolves video ids to files and serves byte windows of them.
pub struct StreamingEngine {
    store: Arc<dyn VideoStore>,
    layout: MediaLayout,
}

impl StreamingEngine {
    pub fn new(store: Arc<dyn VideoStore>, layout: MediaLayout) -> Self {
        Self { store, layout }
    }

    /// Open the media file of a completed video.
    pub async fn resolve(&self, video_id: &str) -> Result<ResolvedMedia, StreamError> {
        let record = self
            .store
            .get(video_id)?
            .ok_or_else(|| StreamError::VideoNotFound(video_id.to_string()))?;
        if record.status != VideoStatus::Complete {
            return Err(StreamError::NotComplete {
                video_id: video_id.to_string(),
                status: record.status,
            });
        }

        let path = self.layout.video_path(video_id);
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StreamError::FileMissing(video_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata().await?.len();
        Ok(ResolvedMedia { path, file, size })
    }

    /// Resolve `video_id` and position a body for the requested range.
    ///
    /// The body yields at most [`CHUNK_SIZE`] bytes per item and stops after
    /// exactly `window.len()` bytes.
    pub async fn open(
        &self,
        video_id: &str,
        range_header: Option<&str>,
    ) -> Result<MediaStream, StreamError> {
        let ResolvedMedia { mut file, size, .. } = self.resolve(video_id).await?;

        let window = parse_range(range_header, size).map_err(|e| {
            debug!(video_id = %video_id, error = %e, "Rejecting range");
            match e {
                RangeError::Malformed(_) | RangeError::EmptyFile => {
                    StreamError::RangeNotSatisfiable { size }
                }
            }
        })?;

        if window.start > 0 {
            file.seek(SeekFrom::Start(window.start)).await?;
        }
        let body = ReaderStream::with_capacity(file.take(window.len()), CHUNK_SIZE);
        Ok(MediaStream { window, body })
    }
}
