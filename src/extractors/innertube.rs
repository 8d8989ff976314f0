use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::ACCEPT_LANGUAGE;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::TrackSource;
use crate::captions::{CaptionEncoding, CaptionTrackSet, TrackKind, VideoId};
use crate::transcribe::fetcher::classify_request_error;
use crate::transcribe::HeaderPolicy;
use crate::ExtractionError;

const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";
const CLIENT_VERSION: &str = "2.20241126.01.00";

/// Encodings offered for every timed-text track
pub const TIMEDTEXT_FORMATS: [&str; 3] = ["json3", "srv3", "vtt"];

static API_KEY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("api key pattern is valid")
});

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<RawCaptionTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCaptionTrack {
    base_url: String,
    language_code: String,
    kind: Option<String>,
}

/// Caption track discovery through YouTube's InnerTube player API
pub struct InnerTubeSource {
    client: Client,
    headers: HeaderPolicy,
    base_url: String,
}

impl InnerTubeSource {
    pub fn new(client: Client, headers: HeaderPolicy) -> Self {
        Self {
            client,
            headers,
            base_url: YOUTUBE_BASE_URL.to_string(),
        }
    }

    /// Point the source at another host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch_watch_page(&self, video_id: &VideoId) -> Result<String, ExtractionError> {
        let url = format!("{}/watch?v={}", self.base_url, video_id);
        tracing::debug!("Fetching watch page: {}", url);

        let response = self
            .headers
            .apply(self.client.get(&url))
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::from_status(status.as_u16(), "watch page"));
        }

        let html = response.text().await.map_err(classify_request_error)?;
        if html.contains("class=\"g-recaptcha\"") {
            return Err(ExtractionError::rate_limited(
                "YouTube is asking this server to solve a CAPTCHA (too many requests)",
            ));
        }

        Ok(html)
    }

    async fn fetch_player(&self, video_id: &VideoId, api_key: &str) -> Result<PlayerResponse, ExtractionError> {
        let url = format!("{}/youtubei/v1/player?key={}&prettyPrint=false", self.base_url, api_key);
        let body = serde_json::json!({
            "context": {
                "client": {
                    "hl": "en",
                    "gl": "US",
                    "clientName": "WEB",
                    "clientVersion": CLIENT_VERSION
                }
            },
            "videoId": video_id.as_str()
        });

        let response = self
            .headers
            .apply(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::from_status(status.as_u16(), "player request"));
        }

        response
            .json::<PlayerResponse>()
            .await
            .map_err(|e| ExtractionError::Unknown(format!("Failed to parse player response: {}", e)))
    }
}

#[async_trait]
impl TrackSource for InnerTubeSource {
    async fn list_caption_tracks(&self, video_id: &VideoId) -> Result<CaptionTrackSet, ExtractionError> {
        let html = self.fetch_watch_page(video_id).await?;
        let api_key = extract_api_key(&html)
            .ok_or_else(|| ExtractionError::Unknown("Could not find INNERTUBE_API_KEY in watch page".to_string()))?;

        let player = self.fetch_player(video_id, &api_key).await?;
        player_tracks(player)
    }

    fn platform_name(&self) -> &'static str {
        "YouTube InnerTube"
    }
}

fn extract_api_key(html: &str) -> Option<String> {
    API_KEY_PATTERN
        .captures(html)
        .map(|captures| captures[1].to_string())
}

fn player_tracks(player: PlayerResponse) -> Result<CaptionTrackSet, ExtractionError> {
    if let Some(playability) = &player.playability_status {
        let reason = playability.reason.as_deref().unwrap_or("no reason given");
        match playability.status.as_deref() {
            Some("OK") | None => {}
            Some("ERROR") => {
                return Err(ExtractionError::NoCaptionsAvailable(format!("video is unavailable: {}", reason)))
            }
            Some(other) => {
                return Err(ExtractionError::from_message(format!("video is not playable ({}): {}", other, reason)))
            }
        }
    }

    let raw_tracks = player
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .map(|r| r.caption_tracks)
        .unwrap_or_default();

    if raw_tracks.is_empty() {
        return Err(ExtractionError::NoCaptionsAvailable(
            "Transcripts are disabled for this video".to_string(),
        ));
    }

    let mut tracks = CaptionTrackSet::new();
    for raw in raw_tracks {
        let kind = match raw.kind.as_deref() {
            Some("asr") => TrackKind::AutoGenerated,
            _ => TrackKind::Manual,
        };
        for format in TIMEDTEXT_FORMATS {
            tracks.add(
                kind,
                raw.language_code.clone(),
                CaptionEncoding::new(format, caption_locator(&raw.base_url, format)),
            );
        }
    }

    Ok(tracks)
}

/// Rewrite the `fmt` query parameter of a timed-text URL
fn caption_locator(base_url: &str, format: &str) -> String {
    let base_url = base_url.replace("\\u0026", "&");
    match Url::parse(&base_url) {
        Ok(mut url) => {
            let pairs: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(key, _)| key != "fmt")
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect();
            url.query_pairs_mut().clear().extend_pairs(pairs).append_pair("fmt", format);
            url.to_string()
        }
        Err(_) => format!("{}&fmt={}", base_url, format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    const WATCH_PAGE: &str = r#"<html><script>ytcfg.set({"INNERTUBE_API_KEY": "AIzaTestKey_123","INNERTUBE_CONTEXT_CLIENT_NAME":1});</script></html>"#;

    fn player_json() -> serde_json::Value {
        serde_json::json!({
            "playabilityStatus": {"status": "OK"},
            "captions": {
                "playerCaptionsTracklistRenderer": {
                    "captionTracks": [
                        {"baseUrl": "https://www.youtube.com/api/timedtext?v=dQw4w9WgXcQ&lang=he", "languageCode": "he", "name": {"simpleText": "Hebrew"}},
                        {"baseUrl": "https://www.youtube.com/api/timedtext?v=dQw4w9WgXcQ&lang=en&kind=asr&fmt=srv3", "languageCode": "en", "kind": "asr"}
                    ]
                }
            }
        })
    }

    async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_extract_api_key() {
        assert_eq!(extract_api_key(WATCH_PAGE).as_deref(), Some("AIzaTestKey_123"));
        assert_eq!(extract_api_key("<html></html>"), None);
    }

    #[test]
    fn test_caption_locator_replaces_format() {
        assert_eq!(
            caption_locator("https://www.youtube.com/api/timedtext?v=abc&lang=en&fmt=srv3", "json3"),
            "https://www.youtube.com/api/timedtext?v=abc&lang=en&fmt=json3"
        );
        assert_eq!(
            caption_locator("https://www.youtube.com/api/timedtext?v=abc\\u0026lang=he", "vtt"),
            "https://www.youtube.com/api/timedtext?v=abc&lang=he&fmt=vtt"
        );
    }

    #[test]
    fn test_player_tracks_partitions_by_kind() {
        let player: PlayerResponse = serde_json::from_value(player_json()).unwrap();
        let tracks = player_tracks(player).unwrap();

        let he = tracks.track(TrackKind::Manual, "he").unwrap();
        assert_eq!(he.encodings.len(), 3);
        assert_eq!(he.encodings[0].format, "json3");
        assert!(he.encodings[0].locator.ends_with("lang=he&fmt=json3"));

        let en = tracks.track(TrackKind::AutoGenerated, "en").unwrap();
        assert!(en.encodings[0].locator.contains("kind=asr"));
        assert!(tracks.track(TrackKind::Manual, "en").is_none());
    }

    #[test]
    fn test_player_without_captions() {
        let player: PlayerResponse =
            serde_json::from_value(serde_json::json!({"playabilityStatus": {"status": "OK"}})).unwrap();
        assert_eq!(
            player_tracks(player).unwrap_err(),
            ExtractionError::NoCaptionsAvailable("Transcripts are disabled for this video".to_string())
        );

        let player: PlayerResponse = serde_json::from_value(serde_json::json!({
            "playabilityStatus": {"status": "ERROR", "reason": "Video unavailable"}
        }))
        .unwrap();
        assert!(matches!(player_tracks(player), Err(ExtractionError::NoCaptionsAvailable(_))));

        let player: PlayerResponse = serde_json::from_value(serde_json::json!({
            "playabilityStatus": {"status": "LOGIN_REQUIRED", "reason": "Sign in to confirm you're not a bot"}
        }))
        .unwrap();
        assert!(matches!(player_tracks(player), Err(ExtractionError::Unknown(_))));
    }

    #[tokio::test]
    async fn test_lists_tracks_from_server() {
        let app = Router::new()
            .route("/watch", get(|| async { WATCH_PAGE }))
            .route(
                "/youtubei/v1/player",
                post(|Json(body): Json<serde_json::Value>| async move {
                    assert_eq!(body["videoId"], "dQw4w9WgXcQ");
                    Json(player_json())
                }),
            );
        let base = spawn_server(app).await;

        let source = InnerTubeSource::new(Client::new(), HeaderPolicy::Disabled).with_base_url(base);
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        let tracks = source.list_caption_tracks(&id).await.unwrap();
        assert_eq!(tracks.languages(), vec!["en".to_string(), "he".to_string()]);
    }

    #[tokio::test]
    async fn test_rate_limited_watch_page() {
        let app = Router::new().route(
            "/watch",
            get(|| async { (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests") }),
        );
        let base = spawn_server(app).await;

        let source = InnerTubeSource::new(Client::new(), HeaderPolicy::Disabled).with_base_url(base);
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        let err = source.list_caption_tracks(&id).await.unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn test_captcha_page_is_rate_limited() {
        let app = Router::new().route(
            "/watch",
            get(|| async { r#"<form><div class="g-recaptcha" data-sitekey="x"></div></form>"# }),
        );
        let base = spawn_server(app).await;

        let source = InnerTubeSource::new(Client::new(), HeaderPolicy::Disabled).with_base_url(base);
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        assert!(source.list_caption_tracks(&id).await.unwrap_err().is_rate_limited());
    }
}
