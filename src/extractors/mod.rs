use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;

pub mod innertube;
pub mod ytdlp;

use crate::captions::{CaptionTrackSet, VideoId};
use crate::config::{Backend, YoutubeConfig};
use crate::transcribe::HeaderPolicy;
use crate::ExtractionError;

/// Trait for discovering the caption tracks of a video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackSource: Send + Sync {
    /// Enumerate manual and auto-generated caption tracks
    async fn list_caption_tracks(&self, video_id: &VideoId) -> Result<CaptionTrackSet, ExtractionError>;

    /// Get the name of this backend
    fn platform_name(&self) -> &'static str;
}

/// Create the track source selected in the configuration
pub fn build_source(
    config: &YoutubeConfig,
    client: Client,
    headers: HeaderPolicy,
    cookies: Option<PathBuf>,
) -> Arc<dyn TrackSource> {
    let source: Arc<dyn TrackSource> = match config.backend {
        Backend::YtDlp => Arc::new(ytdlp::YtDlpSource::new(&config.yt_dlp_path).with_cookies(cookies)),
        Backend::InnerTube => Arc::new(innertube::InnerTubeSource::new(client, headers)),
    };

    tracing::debug!("Using {} caption track source", source.platform_name());
    source
}
