use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

use super::TrackSource;
use crate::captions::{CaptionEncoding, CaptionTrackSet, TrackKind, VideoId};
use crate::ExtractionError;

/// Subset of `yt-dlp --dump-json` output that describes caption tracks
#[derive(Debug, Deserialize)]
struct VideoInfo {
    #[serde(default)]
    subtitles: Option<HashMap<String, Vec<SubtitleEntry>>>,
    #[serde(default)]
    automatic_captions: Option<HashMap<String, Vec<SubtitleEntry>>>,
}

#[derive(Debug, Deserialize)]
struct SubtitleEntry {
    ext: String,
    url: Option<String>,
}

/// Caption track discovery using yt-dlp
pub struct YtDlpSource {
    yt_dlp_path: String,
    cookies_path: Option<PathBuf>,
}

impl YtDlpSource {
    pub fn new(yt_dlp_path: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
            cookies_path: None,
        }
    }

    /// Pass a Netscape cookie file to yt-dlp
    pub fn with_cookies(mut self, cookies_path: Option<PathBuf>) -> Self {
        self.cookies_path = cookies_path;
        self
    }

    fn build_args(&self, video_id: &VideoId) -> Vec<String> {
        let mut args: Vec<String> = ["--dump-json", "--skip-download", "--no-playlist", "--no-warnings"]
            .iter()
            .map(|arg| arg.to_string())
            .collect();

        if let Some(cookies) = &self.cookies_path {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().into_owned());
        }

        args.push(video_id.watch_url());
        args
    }

    /// Get video information using yt-dlp
    async fn get_video_info(&self, video_id: &VideoId) -> Result<Vec<u8>, ExtractionError> {
        tracing::debug!("Extracting caption metadata for: {}", video_id);

        let output = Command::new(&self.yt_dlp_path)
            .args(self.build_args(video_id))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ExtractionError::Unknown(format!(
                        "yt-dlp is not available at '{}'. Please install it: https://github.com/yt-dlp/yt-dlp",
                        self.yt_dlp_path
                    ))
                } else {
                    ExtractionError::Unknown(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_stderr(&stderr));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl TrackSource for YtDlpSource {
    async fn list_caption_tracks(&self, video_id: &VideoId) -> Result<CaptionTrackSet, ExtractionError> {
        let info = self.get_video_info(video_id).await?;
        parse_video_info(&info)
    }

    fn platform_name(&self) -> &'static str {
        "yt-dlp"
    }
}

impl Default for YtDlpSource {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

/// Map `subtitles` to manual tracks and `automatic_captions` to auto-generated ones
pub fn parse_video_info(json: &[u8]) -> Result<CaptionTrackSet, ExtractionError> {
    let info: VideoInfo = serde_json::from_slice(json)
        .map_err(|e| ExtractionError::Unknown(format!("Failed to parse yt-dlp output: {}", e)))?;

    let mut tracks = CaptionTrackSet::new();
    for (kind, entries) in [
        (TrackKind::Manual, info.subtitles),
        (TrackKind::AutoGenerated, info.automatic_captions),
    ] {
        for (language, formats) in entries.unwrap_or_default() {
            for entry in formats {
                if let Some(url) = entry.url {
                    tracks.add(kind, language.clone(), CaptionEncoding::new(entry.ext, url));
                }
            }
        }
    }

    Ok(tracks)
}

fn classify_stderr(stderr: &str) -> ExtractionError {
    let message = stderr.trim();
    let err = ExtractionError::from_message(message);
    if err.is_rate_limited() {
        return err;
    }

    let unavailable = ["Video unavailable", "Private video", "This video has been removed"];
    if unavailable.iter().any(|marker| message.contains(marker)) {
        return ExtractionError::NoCaptionsAvailable(format!("video is unavailable: {}", message));
    }

    ExtractionError::Unknown(format!("yt-dlp failed: {}", message))
}
