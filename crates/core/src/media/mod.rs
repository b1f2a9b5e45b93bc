//! On-disk layout of downloaded media and cleanup of partial artifacts.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Image extensions accepted when looking up a thumbnail, in lookup order.
pub const THUMBNAIL_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "webp", "png"];

/// MIME type for a thumbnail file, by extension.
pub fn image_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("webp") => "image/webp",
        Some("png") => "image/png",
        _ => "image/jpeg",
    }
}

/// Where videos and thumbnails live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaLayout {
    pub videos_dir: PathBuf,
    pub thumbnails_dir: PathBuf,
}

impl MediaLayout {
    /// Layout rooted at `data_path`, with `videos/` and `thumbnails/` below it.
    pub fn new(data_path: &Path) -> Self {
        Self {
            videos_dir: data_path.join("videos"),
            thumbnails_dir: data_path.join("thumbnails"),
        }
    }

    pub fn ensure_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(&self.videos_dir)?;
        fs::create_dir_all(&self.thumbnails_dir)?;
        Ok(())
    }

    /// Canonical media file.
    pub fn video_path(&self, video_id: &str) -> PathBuf {
        self.videos_dir.join(format!("{}.mp4", video_id))
    }

    /// Canonical thumbnail file.
    pub fn thumbnail_path(&self, video_id: &str) -> PathBuf {
        self.thumbnails_dir.join(format!("{}.jpg", video_id))
    }

    /// First existing thumbnail for `video_id`.
    ///
    /// The thumbnails directory wins; the videos directory is the fallback for
    /// images the extractor left next to the media in a format that was not
    /// normalized.
    pub fn find_thumbnail(&self, video_id: &str) -> Option<PathBuf> {
        [&self.thumbnails_dir, &self.videos_dir]
            .into_iter()
            .flat_map(|dir| {
                THUMBNAIL_EXTENSIONS
                    .iter()
                    .map(move |ext| dir.join(format!("{}.{}", video_id, ext)))
            })
            .find(|path| path.is_file())
    }

    /// Remove leftover fragment, temp and partial files for `video_id`.
    ///
    /// Returns how many files were removed. Failing to remove a single file is
    /// logged and skipped. The final `{id}.mp4` is never touched.
    pub fn purge_partials(&self, video_id: &str) -> usize {
        let entries = match fs::read_dir(&self.videos_dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(video_id = %video_id, error = %e, "Cannot scan videos directory");
                }
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !is_partial_artifact(video_id, name) {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    debug!(video_id = %video_id, file = %name, "Removed partial artifact");
                    removed += 1;
                }
                Err(e) => {
                    debug!(video_id = %video_id, file = %name, error = %e, "Could not remove partial artifact");
                }
            }
        }
        removed
    }

    /// Remove everything a failed or cancelled attempt may have left in the
    /// videos directory: partials, the final media file and any thumbnail the
    /// extractor wrote next to it. The thumbnails directory is left alone.
    pub fn discard(&self, video_id: &str) -> usize {
        let mut removed = self.purge_partials(video_id);
        let leftovers = std::iter::once(self.video_path(video_id)).chain(
            THUMBNAIL_EXTENSIONS
                .iter()
                .map(|ext| self.videos_dir.join(format!("{}.{}", video_id, ext))),
        );
        for path in leftovers {
            if fs::remove_file(&path).is_ok() {
                debug!(video_id = %video_id, file = %path.display(), "Removed leftover file");
                removed += 1;
            }
        }
        removed
    }
}

/// Whether `name` is one of the transient files yt-dlp leaves behind.
///
/// Matches `{id}.*.part` and `{id}.*.part-*` (merged and per-format streams
/// such as `{id}.f137.mp4.part`), `{id}.f*.mp4`, `{id}.f*.m4a`, `{id}.f*.webm`,
/// `{id}.*.ytdl` and `{id}.temp.*`.
pub fn is_partial_artifact(video_id: &str, name: &str) -> bool {
    let Some(rest) = name
        .strip_prefix(video_id)
        .and_then(|rest| rest.strip_prefix('.'))
    else {
        return false;
    };

    rest.ends_with(".part")
        || rest.contains(".part-")
        || wrapped(rest, "f", ".mp4")
        || wrapped(rest, "f", ".m4a")
        || wrapped(rest, "f", ".webm")
        || wrapped(rest, "", ".ytdl")
        || rest.starts_with("temp.")
}

/// `s` is `prefix`, then anything (possibly empty), then `suffix`.
fn wrapped(s: &str, prefix: &str, suffix: &str) -> bool {
    s.len() >= prefix.len() + suffix.len() && s.starts_with(prefix) && s.ends_with(suffix)
}
