//! Thumbnail normalization after a download.
//!
//! The extractor writes its thumbnail next to the media file. Normalizing
//! moves it to the canonical `{thumbnails}/{id}.jpg`. Transcoding other image
//! formats is not done here; those stay where the extractor left them and are
//! still found by [`MediaLayout::find_thumbnail`].

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::media::MediaLayout;

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("failed to move thumbnail for {video_id}: {source}")]
    Io {
        video_id: String,
        #[source]
        source: io::Error,
    },
}

/// Puts a downloaded thumbnail in its canonical place.
pub trait ThumbnailProcessor: Send + Sync {
    /// Returns the canonical path, or `None` if no usable thumbnail exists.
    fn normalize(&self, video_id: &str) -> Result<Option<PathBuf>, ThumbnailError>;
}

/// Filesystem implementation over a [`MediaLayout`].
#[derive(Debug, Clone)]
pub struct FsThumbnailProcessor {
    layout: MediaLayout,
}

impl FsThumbnailProcessor {
    pub fn new(layout: MediaLayout) -> Self {
        Self { layout }
    }
}

impl ThumbnailProcessor for FsThumbnailProcessor {
    fn normalize(&self, video_id: &str) -> Result<Option<PathBuf>, ThumbnailError> {
        let target = self.layout.thumbnail_path(video_id);
        if target.is_file() {
            return Ok(Some(target));
        }

        let source = ["jpg", "jpeg"]
            .iter()
            .map(|ext| self.layout.videos_dir.join(format!("{}.{}", video_id, ext)))
            .find(|p| p.is_file());
        let Some(source) = source else {
            return Ok(None);
        };

        let io_err = |source| ThumbnailError::Io {
            video_id: video_id.to_string(),
            source,
        };
        fs::create_dir_all(&self.layout.thumbnails_dir).map_err(io_err)?;
        if fs::rename(&source, &target).is_err() {
            // Different filesystems; fall back to copy + remove.
            fs::copy(&source, &target).map_err(io_err)?;
            fs::remove_file(&source).map_err(io_err)?;
        }
        debug!(video_id = %video_id, path = %target.display(), "Thumbnail normalized");
        Ok(Some(target))
    }
}
