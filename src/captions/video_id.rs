use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ExtractionError;

/// `v=` query parameter or a path segment after a short-host / embed marker
static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[?&#]v=|youtu\.be/|/embed/|/shorts/|/live/|/v/)([0-9A-Za-z_-]{11})(?:[^0-9A-Za-z_-]|$)")
        .expect("video id pattern is valid")
});

static BARE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Za-z_-]{11}$").expect("bare id pattern is valid"));

/// Canonical 11-character YouTube video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoId(String);

/// Deserialization only accepts a bare id
impl TryFrom<String> for VideoId {
    type Error = ExtractionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if BARE_ID.is_match(&value) {
            Ok(VideoId(value))
        } else {
            Err(ExtractionError::InvalidUrl(value))
        }
    }
}

impl From<VideoId> for String {
    fn from(id: VideoId) -> Self {
        id.0
    }
}

impl VideoId {
    /// Extract a video id from a YouTube URL, or accept the input verbatim if it is a bare id.
    pub fn parse(input: &str) -> Result<Self, ExtractionError> {
        let input = input.trim();

        if let Some(captures) = URL_PATTERN.captures(input) {
            return Ok(VideoId(captures[1].to_string()));
        }

        if BARE_ID.is_match(input) {
            return Ok(VideoId(input.to_string()));
        }

        Err(ExtractionError::InvalidUrl(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
