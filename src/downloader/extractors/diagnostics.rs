// Diagnostics - skipped-record reporting and failure classification
//
// Two concerns live here:
// - Parsers never abort on a single bad record or link; they return the
//   value together with a list of what was skipped and why.
// - Per-item failures are classified into a BlockingReason so the failure
//   line can carry a hint.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::downloader::errors::DownloadError;

/// Why one record (stream entry or playlist link) was left out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Required field absent from a stream record
    MissingField(&'static str),
    /// Field present but empty
    EmptyField(&'static str),
    /// `quality` is not a tier we know
    UnknownQuality(String),
    /// `type` lacks the `type/subtype` shape
    BadMimeFormat(String),
    /// Link element without an href
    MissingHref,
    /// Href from which no video id could be extracted
    BadLink { href: String, reason: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "Missing field: {}", field),
            Self::EmptyField(field) => write!(f, "Empty field: {}", field),
            Self::UnknownQuality(name) => write!(f, "Unknown quality: {}", name),
            Self::BadMimeFormat(mime) => write!(f, "Malformed type: {}", mime),
            Self::MissingHref => write!(f, "Link has no href"),
            Self::BadLink { href, reason } => write!(f, "Error parsing {}: {}", href, reason),
        }
    }
}

/// One skipped record, by position in the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub index: usize,
    pub reason: SkipReason,
}

/// Parse result plus whatever had to be skipped to get it
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    pub value: T,
    pub skipped: Vec<Skipped>,
}

impl<T> Parsed<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            skipped: Vec::new(),
        }
    }

    pub fn skip(&mut self, index: usize, reason: SkipReason) {
        tracing::warn!(index, reason = %reason, "Skipping malformed record");
        self.skipped.push(Skipped { index, reason });
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Reasons the provider may refuse an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingReason {
    /// HTTP 403 Forbidden - general access denied
    Http403Forbidden,

    /// Age-restricted content requiring login
    AgeRestricted,

    /// Geographic restriction
    GeoBlocked,

    /// Network timeout (soft IP block)
    NetworkTimeout,

    /// Rate limiting (429 or similar)
    RateLimited,

    /// Bot detection triggered
    BotDetection,

    /// Private video requiring authorization
    PrivateVideo,

    /// Video deleted or unavailable
    VideoUnavailable,

    /// Provider refused without a recognizable reason
    Unknown,
}

impl BlockingReason {
    /// Check if proxy might help
    pub fn proxy_might_help(&self) -> bool {
        matches!(
            self,
            Self::Http403Forbidden
                | Self::GeoBlocked
                | Self::NetworkTimeout
                | Self::RateLimited
                | Self::BotDetection
        )
    }

    /// Check if this is a permanent restriction (no workaround)
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::VideoUnavailable | Self::PrivateVideo)
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Http403Forbidden => "Access denied (HTTP 403)",
            Self::AgeRestricted => "Age-restricted content",
            Self::GeoBlocked => "Geographic restriction",
            Self::NetworkTimeout => "Network timeout (possible IP throttling)",
            Self::RateLimited => "Rate limited by provider",
            Self::BotDetection => "Bot detection triggered",
            Self::PrivateVideo => "Private video",
            Self::VideoUnavailable => "Video unavailable",
            Self::Unknown => "Unknown blocking reason",
        }
    }
}

impl fmt::Display for BlockingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Classify a pipeline failure. Local errors (selection, I/O, config) get no hint.
pub fn diagnose(error: &DownloadError) -> Option<BlockingReason> {
    match error {
        DownloadError::HttpStatus(403) => Some(BlockingReason::Http403Forbidden),
        DownloadError::HttpStatus(429) => Some(BlockingReason::RateLimited),
        DownloadError::HttpStatus(404 | 410) => Some(BlockingReason::VideoUnavailable),
        DownloadError::Provider { reason } => {
            Some(diagnose_text(reason.as_deref().unwrap_or("")).unwrap_or(BlockingReason::Unknown))
        }
        DownloadError::Transport(message) => diagnose_text(message),
        _ => None,
    }
}

/// Analyze a provider or transport message
pub fn diagnose_text(message: &str) -> Option<BlockingReason> {
    let lower = message.to_lowercase();

    // Age restriction
    if lower.contains("age-restricted")
        || lower.contains("sign in to confirm your age")
        || lower.contains("age_verification")
    {
        return Some(BlockingReason::AgeRestricted);
    }

    // Private video
    if lower.contains("private video") || lower.contains("video is private") {
        return Some(BlockingReason::PrivateVideo);
    }

    // Video unavailable
    if lower.contains("video unavailable")
        || lower.contains("video has been removed")
        || lower.contains("no longer available")
        || lower.contains("video is unavailable")
    {
        return Some(BlockingReason::VideoUnavailable);
    }

    // Geographic restriction
    if lower.contains("not available in your country")
        || lower.contains("blocked in your country")
        || lower.contains("geographic restriction")
    {
        return Some(BlockingReason::GeoBlocked);
    }

    // Rate limiting
    if lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests") {
        return Some(BlockingReason::RateLimited);
    }

    // Bot detection
    if lower.contains("captcha") || lower.contains("unusual traffic") || lower.contains("automated") {
        return Some(BlockingReason::BotDetection);
    }

    // HTTP 403 (general)
    if lower.contains("403") || lower.contains("forbidden") {
        return Some(BlockingReason::Http403Forbidden);
    }

    // Network timeout
    if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection refused")
        || lower.contains("network unreachable")
    {
        return Some(BlockingReason::NetworkTimeout);
    }

    None
}
