use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::captions::{self, SelectionOrder, Transcript, VideoId};
use crate::config::{Config, YoutubeConfig};
use crate::extractors::{self, TrackSource};
use crate::TranscribeError;

pub mod fetcher;
pub mod retry;

pub use fetcher::{CaptionFetch, HeaderPolicy, HttpCaptionFetcher, RequestPacing};
pub use retry::RetryPolicy;

/// Per-request caption preferences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscribeOptions {
    /// Language codes in order of preference
    pub preferred_languages: Vec<String>,

    /// Caption formats the decoder accepts, in order of preference
    pub supported_formats: Vec<String>,

    pub selection_order: SelectionOrder,
}

impl TranscribeOptions {
    pub fn from_config(config: &YoutubeConfig) -> Self {
        Self {
            preferred_languages: config.preferred_languages.clone(),
            supported_formats: config.supported_formats.clone(),
            selection_order: config.selection_order,
        }
    }

    /// Same options restricted to a single requested language
    pub fn with_language(&self, language: impl Into<String>) -> Self {
        Self {
            preferred_languages: vec![language.into()],
            ..self.clone()
        }
    }
}

impl Default for TranscribeOptions {
    fn default() -> Self {
        Self::from_config(&YoutubeConfig::default())
    }
}

/// Main caption retrieval pipeline
pub struct TranscriptionPipeline {
    source: Arc<dyn TrackSource>,
    fetcher: Arc<dyn CaptionFetch>,
    retry: RetryPolicy,
}

impl TranscriptionPipeline {
    pub fn new(source: Arc<dyn TrackSource>, fetcher: Arc<dyn CaptionFetch>, retry: RetryPolicy) -> Self {
        Self {
            source,
            fetcher,
            retry,
        }
    }

    /// Wire the configured track source, caption fetcher and retry policy together
    pub fn from_config(config: &Config, client: Client, cookies: Option<PathBuf>) -> Self {
        let headers = HeaderPolicy::from_config(&config.fetch);
        let source = extractors::build_source(&config.youtube, client.clone(), headers.clone(), cookies);
        let fetcher = Arc::new(HttpCaptionFetcher::new(
            client,
            headers,
            RequestPacing::from_config(&config.fetch),
        ));

        Self::new(source, fetcher, RetryPolicy::from_config(&config.retry))
    }

    /// Transcribe the captions of the video referenced by `raw_url`
    pub async fn transcribe(
        &self,
        raw_url: &str,
        options: &TranscribeOptions,
        cancel: &CancellationToken,
    ) -> Result<Transcript, TranscribeError> {
        // A malformed URL is never worth retrying
        let video_id = VideoId::parse(raw_url)?;
        tracing::info!(video_id = %video_id, "Extracting captions");

        let transcript = self
            .retry
            .run(cancel, || self.attempt(&video_id, options, cancel))
            .await?;

        tracing::info!(
            video_id = %video_id,
            language = %transcript.language_used,
            "Transcript ready ({} characters)",
            transcript.text.len()
        );

        Ok(transcript)
    }

    /// One pass from track discovery to decoded text
    async fn attempt(
        &self,
        video_id: &VideoId,
        options: &TranscribeOptions,
        cancel: &CancellationToken,
    ) -> Result<Transcript, TranscribeError> {
        if cancel.is_cancelled() {
            return Err(TranscribeError::Cancelled);
        }
        let tracks = self.source.list_caption_tracks(video_id).await?;

        let track = captions::select(&tracks, &options.preferred_languages, options.selection_order)?;
        let encoding = captions::locate(&track.encodings, &options.supported_formats)?;
        tracing::debug!(
            "Selected {:?} track '{}' as {}",
            track.kind,
            track.language,
            encoding.format
        );

        if cancel.is_cancelled() {
            return Err(TranscribeError::Cancelled);
        }
        let payload = self.fetcher.fetch(&encoding.locator).await?;

        let cues = captions::decode(&payload, &encoding.format)?;
        let text = captions::transcript_text(&cues);

        Ok(Transcript {
            video_id: video_id.clone(),
            language_used: track.language,
            kind: track.kind,
            format: encoding.format,
            text,
            cues,
            fetched_at: chrono::Utc::now(),
        })
    }
}
