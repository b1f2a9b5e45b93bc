use chrono::NaiveDate;

use super::ExtractedInfo;
use crate::video::{CompletedVideo, NewVideo};

/// Longest description kept, in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 5000;

/// Extractor metadata normalized for storage.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub title: String,
    pub channel_name: String,
    pub channel_id: Option<String>,
    pub duration_seconds: Option<i64>,
    pub upload_date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl VideoMetadata {
    pub fn from_info(info: &ExtractedInfo) -> Self {
        let title = non_empty(info.title.as_deref())
            .unwrap_or("Untitled")
            .to_string();
        let channel_name = non_empty(info.channel.as_deref())
            .or_else(|| non_empty(info.uploader.as_deref()))
            .unwrap_or("Unknown")
            .to_string();

        Self {
            title,
            channel_name,
            channel_id: info.channel_id.clone(),
            duration_seconds: info
                .duration
                .filter(|d| d.is_finite() && *d >= 0.0)
                .map(|d| d.round() as i64),
            upload_date: info.upload_date.as_deref().and_then(parse_upload_date),
            description: info
                .description
                .as_deref()
                .map(|d| truncate_chars(d, DESCRIPTION_MAX_CHARS).to_string()),
        }
    }

    pub fn to_new_video(&self, video_id: &str) -> NewVideo {
        NewVideo {
            video_id: video_id.to_string(),
            title: self.title.clone(),
            channel_name: self.channel_name.clone(),
            channel_id: self.channel_id.clone(),
            duration_seconds: self.duration_seconds,
        }
    }

    pub fn into_completed(self, file_size_bytes: u64) -> CompletedVideo {
        CompletedVideo {
            title: self.title,
            channel_name: self.channel_name,
            channel_id: self.channel_id,
            duration_seconds: self.duration_seconds,
            upload_date: self.upload_date,
            description: self.description,
            file_size_bytes,
        }
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

/// Parse an 8-digit `YYYYMMDD` date. Anything else, or an impossible
/// calendar date, yields `None`.
pub fn parse_upload_date(raw: &str) -> Option<NaiveDate> {
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = raw[..4].parse().ok()?;
    let month = raw[4..6].parse().ok()?;
    let day = raw[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// First `max_chars` characters of `text`; shorter text is returned unchanged.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_upload_date() {
        assert_eq!(
            parse_upload_date("20091025"),
            NaiveDate::from_ymd_opt(2009, 10, 25)
        );
        assert_eq!(parse_upload_date("2009102"), None);
        assert_eq!(parse_upload_date("200910255"), None);
        assert_eq!(parse_upload_date("20091325"), None);
        assert_eq!(parse_upload_date("20230230"), None);
        assert_eq!(parse_upload_date("2009-10-"), None);
        assert_eq!(parse_upload_date(""), None);
    }

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
    }

    #[test]
    fn test_from_info_fallbacks() {
        let meta = VideoMetadata::from_info(&ExtractedInfo::default());
        assert_eq!(meta.title, "Untitled");
        assert_eq!(meta.channel_name, "Unknown");
        assert!(meta.upload_date.is_none());
        assert!(meta.description.is_none());

        let meta = VideoMetadata::from_info(&ExtractedInfo {
            uploader: Some("Uploader".to_string()),
            ..Default::default()
        });
        assert_eq!(meta.channel_name, "Uploader");
    }

    #[test]
    fn test_from_info_full() {
        let info = ExtractedInfo {
            id: Some("dQw4w9WgXcQ".to_string()),
            title: Some("Never Gonna Give You Up".to_string()),
            channel: Some("Rick Astley".to_string()),
            uploader: Some("RickAstleyVEVO".to_string()),
            channel_id: Some("UCuAXFkgsw1L7xaCfnd5JJOw".to_string()),
            duration: Some(212.4),
            upload_date: Some("20091025".to_string()),
            description: Some("x".repeat(6000)),
        };
        let meta = VideoMetadata::from_info(&info);
        assert_eq!(meta.channel_name, "Rick Astley");
        assert_eq!(meta.duration_seconds, Some(212));
        assert_eq!(meta.upload_date, NaiveDate::from_ymd_opt(2009, 10, 25));
        assert_eq!(meta.description.as_ref().map(|d| d.len()), Some(5000));

        let done = meta.into_completed(1234);
        assert_eq!(done.file_size_bytes, 1234);
        assert_eq!(done.title, "Never Gonna Give You Up");
    }
}
