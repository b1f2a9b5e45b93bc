use thiserror::Error;

/// Inclusive byte interval to serve, clamped to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeWindow {
    pub start: u64,
    pub end: u64,
    pub size: u64,
    /// A `Range` header was present, so the response is 206.
    pub partial: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("malformed range header: {0}")]
    Malformed(String),

    #[error("range requested on an empty file")]
    EmptyFile,
}

impl RangeWindow {
    /// Whole file, full 200 response.
    pub fn full(size: u64) -> Self {
        Self {
            start: 0,
            end: size.saturating_sub(1),
            size,
            partial: false,
        }
    }

    /// Bytes to send.
    pub fn len(&self) -> u64 {
        if self.size == 0 {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `Content-Range` value for partial responses.
    pub fn content_range(&self) -> Option<String> {
        self.partial
            .then(|| format!("bytes {}-{}/{}", self.start, self.end, self.size))
    }

    /// `Content-Range` value for a 416 on a file of `size` bytes.
    pub fn unsatisfied_content_range(size: u64) -> String {
        format!("bytes */{}", size)
    }
}

/// Resolve an optional `Range` header against a file of `size` bytes.
///
/// Accepts `bytes=A-B`, `bytes=A-` and `bytes=-N`, then clamps
/// `start` into `[0, S-1]` and `end` into `[start, S-1]`. Multiple ranges and
/// other units are rejected as malformed.
pub fn parse_range(header: Option<&str>, size: u64) -> Result<RangeWindow, RangeError> {
    let Some(header) = header else {
        return Ok(RangeWindow::full(size));
    };

    let malformed = || RangeError::Malformed(header.to_string());
    let spec = header
        .trim()
        .strip_prefix("bytes=")
        .ok_or_else(malformed)?
        .trim();
    if spec.contains(',') {
        return Err(malformed());
    }
    let (start_str, end_str) = spec.split_once('-').ok_or_else(malformed)?;
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    let parse = |s: &str| s.parse::<u64>().map_err(|_| malformed());

    let (start, end) = match (start_str.is_empty(), end_str.is_empty()) {
        (true, true) => return Err(malformed()),
        (true, false) => {
            let suffix = parse(end_str)?;
            (size.saturating_sub(suffix), size.saturating_sub(1))
        }
        (false, true) => (parse(start_str)?, size.saturating_sub(1)),
        (false, false) => (parse(start_str)?, parse(end_str)?),
    };

    if size == 0 {
        return Err(RangeError::EmptyFile);
    }

    let last = size - 1;
    let start = start.min(last);
    let end = end.clamp(start, last);
    Ok(RangeWindow {
        start,
        end,
        size,
        partial: true,
    })
}
