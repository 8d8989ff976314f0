use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod decoder;
pub mod locator;
pub mod selector;
pub mod video_id;

pub use decoder::{decode, transcript_text};
pub use locator::locate;
pub use selector::{select, SelectionOrder};
pub use video_id::VideoId;

/// Caption format the pipeline decodes by default (YouTube structured JSON timed text)
pub const JSON3: &str = "json3";

/// WebVTT caption format
pub const VTT: &str = "vtt";

/// One downloadable serialization of a caption track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionEncoding {
    /// Format name as reported by YouTube (json3, srv3, vtt, ...)
    pub format: String,

    /// URL the encoding can be fetched from
    pub locator: String,
}

impl CaptionEncoding {
    pub fn new(format: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            locator: locator.into(),
        }
    }
}

/// Whether a track was authored by a person or generated by speech recognition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Manual,
    AutoGenerated,
}

impl TrackKind {
    pub fn is_generated(&self) -> bool {
        matches!(self, TrackKind::AutoGenerated)
    }
}

/// Caption tracks available for one video, keyed by language code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionTrackSet {
    pub manual: HashMap<String, Vec<CaptionEncoding>>,
    pub auto_generated: HashMap<String, Vec<CaptionEncoding>>,
}

impl CaptionTrackSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: TrackKind, language: impl Into<String>, encoding: CaptionEncoding) {
        let tracks = match kind {
            TrackKind::Manual => &mut self.manual,
            TrackKind::AutoGenerated => &mut self.auto_generated,
        };
        tracks.entry(language.into()).or_default().push(encoding);
    }

    pub fn is_empty(&self) -> bool {
        self.manual.is_empty() && self.auto_generated.is_empty()
    }

    /// Look up one track, cloning its encodings
    pub fn track(&self, kind: TrackKind, language: &str) -> Option<CaptionTrack> {
        let tracks = match kind {
            TrackKind::Manual => &self.manual,
            TrackKind::AutoGenerated => &self.auto_generated,
        };
        tracks.get(language).map(|encodings| CaptionTrack {
            language: language.to_string(),
            kind,
            encodings: encodings.clone(),
        })
    }

    /// Languages that have any track, sorted, for diagnostics
    pub fn languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = self
            .manual
            .keys()
            .chain(self.auto_generated.keys())
            .cloned()
            .collect();
        languages.sort();
        languages.dedup();
        languages
    }
}

/// A single selected caption track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    pub language: String,
    pub kind: TrackKind,
    pub encodings: Vec<CaptionEncoding>,
}

/// One timed caption line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cue {
    /// Start offset in milliseconds
    pub start_ms: Option<u64>,

    /// Display duration in milliseconds
    pub duration_ms: Option<u64>,

    /// Text exactly as it appears in the payload
    pub text: String,
}

/// Final pipeline output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub video_id: VideoId,

    /// Language code of the track that was used
    pub language_used: String,

    pub kind: TrackKind,

    /// Encoding the text was decoded from
    pub format: String,

    /// Concatenated caption text, trimmed
    pub text: String,

    pub cues: Vec<Cue>,

    pub fetched_at: chrono::DateTime<chrono::Utc>,
}

impl Transcript {
    /// First `count` cues that carry visible text
    pub fn preview(&self, count: usize) -> Vec<&Cue> {
        self.cues
            .iter()
            .filter(|cue| !cue.text.trim().is_empty())
            .take(count)
            .collect()
    }
}
