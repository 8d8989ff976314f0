//! YouTube Transcriber - caption text for YouTube videos over HTTP or from the command line
//!
//! This library turns a YouTube URL (or bare video id) into a plain-text transcript by
//! discovering the available caption tracks, picking one by language preference, fetching
//! a decodable encoding and flattening it into text. Rate-limited attempts are retried with
//! exponential backoff.

use once_cell::sync::Lazy;
use regex::Regex;

pub mod api;
pub mod captions;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod extractors;
pub mod output;
pub mod transcribe;
pub mod utils;

pub use captions::{CaptionEncoding, CaptionTrack, CaptionTrackSet, Cue, TrackKind, Transcript, VideoId};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use extractors::TrackSource;
pub use transcribe::{RetryPolicy, TranscribeOptions, TranscriptionPipeline};

/// Result type used at the application edge
pub type Result<T> = anyhow::Result<T>;

/// Guidance attached to a rate-limit failure once retries are exhausted
pub const RATE_LIMIT_SUGGESTION: &str =
    "YouTube is rate limiting requests from this server. Please wait a few minutes and try again.";

/// Classified failure of a caption extraction
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Invalid YouTube URL: {0}")]
    InvalidUrl(String),

    #[error("No captions available: {0}")]
    NoCaptionsAvailable(String),

    #[error("Unsupported caption encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Rate limited by YouTube: {message}")]
    RateLimited {
        message: String,
        suggestion: Option<String>,
    },

    #[error("Transient network failure: {0}")]
    TransientFailure(String),

    #[error("{0}")]
    Unknown(String),
}

/// Machine-readable kind of an [`ExtractionError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidUrl,
    NoCaptionsAvailable,
    UnsupportedEncoding,
    RateLimited,
    TransientFailure,
    Unknown,
    Cancelled,
}

impl ExtractionError {
    pub fn rate_limited(message: impl Into<String>) -> Self {
        ExtractionError::RateLimited {
            message: message.into(),
            suggestion: None,
        }
    }

    /// Classify an upstream HTTP status. Only 429 is treated as rate limiting.
    pub fn from_status(status: u16, context: &str) -> Self {
        if status == 429 {
            Self::rate_limited(format!("{}: HTTP 429 Too Many Requests", context))
        } else {
            ExtractionError::Unknown(format!("{}: HTTP {}", context, status))
        }
    }

    /// Classify a failure from its message alone, for collaborators that expose no status.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if mentions_rate_limit(&message) {
            Self::rate_limited(message)
        } else {
            ExtractionError::Unknown(message)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractionError::InvalidUrl(_) => ErrorKind::InvalidUrl,
            ExtractionError::NoCaptionsAvailable(_) => ErrorKind::NoCaptionsAvailable,
            ExtractionError::UnsupportedEncoding(_) => ErrorKind::UnsupportedEncoding,
            ExtractionError::RateLimited { .. } => ErrorKind::RateLimited,
            ExtractionError::TransientFailure(_) => ErrorKind::TransientFailure,
            ExtractionError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ExtractionError::RateLimited { .. })
    }

    pub fn suggestion(&self) -> Option<&str> {
        match self {
            ExtractionError::RateLimited { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }
}

/// Outcome of a pipeline run that did not produce a transcript
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscribeError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Transcription was cancelled")]
    Cancelled,
}

impl TranscribeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranscribeError::Extraction(err) => err.kind(),
            TranscribeError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

static RATE_LIMIT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b429\b|too many requests").expect("rate limit pattern is valid"));

fn mentions_rate_limit(message: &str) -> bool {
    RATE_LIMIT_PATTERN.is_match(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_429_is_rate_limited() {
        let err = ExtractionError::from_status(429, "player request");
        assert!(err.is_rate_limited());
        assert_eq!(err.kind(), ErrorKind::RateLimited);
    }

    #[test]
    fn test_other_status_is_unknown() {
        let err = ExtractionError::from_status(503, "player request");
        assert_eq!(err, ExtractionError::Unknown("player request: HTTP 503".to_string()));
    }

    #[test]
    fn test_message_fallback_detects_rate_limit() {
        let err = ExtractionError::from_message("ERROR: [youtube] abc: HTTP Error 429: Too Many Requests");
        assert!(err.is_rate_limited());

        let err = ExtractionError::from_message("upstream said: too many requests, slow down");
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_message_fallback_preserves_unknown_message() {
        let err = ExtractionError::from_message("ERROR: [youtube] ab429cdEFgh: Video unavailable");
        assert!(!err.is_rate_limited());

        let err = ExtractionError::from_message("connection reset by peer");
        assert_eq!(err, ExtractionError::Unknown("connection reset by peer".to_string()));
        assert_eq!(err.to_string(), "connection reset by peer");
    }

    #[test]
    fn test_cancelled_kind() {
        assert_eq!(TranscribeError::Cancelled.kind(), ErrorKind::Cancelled);
        let wrapped: TranscribeError = ExtractionError::InvalidUrl("x".into()).into();
        assert_eq!(wrapped.kind(), ErrorKind::InvalidUrl);
    }
}
