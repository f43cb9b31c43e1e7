// Error types for the resolve -> select -> download pipeline

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::quality::Quality;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// Input could not be parsed as an absolute or relative URL
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// URL parsed but carries no `v` query parameter
    #[error("Missing video parameter in URL: {0}")]
    MissingVideoParam(String),

    /// Connection-level failure while talking to the provider
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider answered with a non-2xx status
    #[error("Got response code: {0}")]
    HttpStatus(u16),

    /// Provider answered but reported a non-ok status in its payload
    #[error(
        "Error requesting video info. Reason: {}",
        .reason.as_deref().unwrap_or("none given")
    )]
    Provider { reason: Option<String> },

    /// Stream set had nothing to choose from
    #[error("Empty stream set")]
    EmptySet,

    /// Requested quality name is not part of the quality ladder
    #[error("{0} quality isn't a defined quality")]
    UnknownQuality(String),

    /// Quality is known but no variant carries it
    #[error("No matching stream for {0} quality")]
    NoMatch(Quality),

    /// Local filesystem failure
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Run was cancelled before this item finished
    #[error("Cancelled")]
    Cancelled,

    /// Options rejected before the run started
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DownloadError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Short machine-friendly name, used in logs and JSON reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl { .. } => "invalid_url",
            Self::MissingVideoParam(_) => "missing_video_param",
            Self::Transport(_) => "transport",
            Self::HttpStatus(_) => "http_status",
            Self::Provider { .. } => "provider",
            Self::EmptySet => "empty_set",
            Self::UnknownQuality(_) => "unknown_quality",
            Self::NoMatch(_) => "no_match",
            Self::Io { .. } => "io",
            Self::Cancelled => "cancelled",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}
