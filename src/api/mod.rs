//! JSON HTTP surface over the transcription pipeline

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::captions::{Cue, Transcript, VideoId};
use crate::transcribe::{TranscribeOptions, TranscriptionPipeline};
use crate::utils::normalize_language_code;
use crate::{ErrorKind, ExtractionError, TranscribeError};

/// Number of cues returned by `/transcribe`
pub const PREVIEW_CUES: usize = 3;

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<TranscriptionPipeline>,
    defaults: Arc<TranscribeOptions>,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(pipeline: TranscriptionPipeline, defaults: TranscribeOptions, shutdown: CancellationToken) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            defaults: Arc::new(defaults),
            shutdown,
        }
    }

    /// Token cancelled when the server shuts down
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/transcribe", post(transcribe))
        .route("/get-transcript", post(get_transcript))
        .with_state(state)
}

/// Serve until the shutdown token is cancelled
pub async fn serve(state: AppState, bind_address: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    let shutdown = state.shutdown_token();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct TranscribeRequest {
    pub youtube_url: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub message: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub video_id: String,
    pub status: String,
    pub message: String,
    pub language: String,
    pub transcript_preview: Vec<Cue>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub video_id: String,
    pub language: String,
    pub is_generated: bool,
    pub transcript: Vec<Cue>,
    pub full_text: String,
    pub status: String,
}

async fn home() -> Json<HomeResponse> {
    Json(HomeResponse {
        message: "YouTube Transcriber API is running".to_string(),
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}

async fn transcribe(
    State(state): State<AppState>,
    body: Result<Json<TranscribeRequest>, JsonRejection>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let transcript = run_request(&state, "/transcribe", body).await?;

    Ok(Json(PreviewResponse {
        video_id: transcript.video_id.to_string(),
        status: "success".to_string(),
        message: "Subtitles found".to_string(),
        language: transcript.language_used.clone(),
        transcript_preview: transcript.preview(PREVIEW_CUES).into_iter().cloned().collect(),
    }))
}

async fn get_transcript(
    State(state): State<AppState>,
    body: Result<Json<TranscribeRequest>, JsonRejection>,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let transcript = run_request(&state, "/get-transcript", body).await?;

    Ok(Json(TranscriptResponse {
        video_id: transcript.video_id.to_string(),
        language: transcript.language_used,
        is_generated: transcript.kind.is_generated(),
        transcript: transcript.cues,
        full_text: transcript.text,
        status: "success".to_string(),
    }))
}

async fn run_request(
    state: &AppState,
    route: &'static str,
    body: Result<Json<TranscribeRequest>, JsonRejection>,
) -> Result<Transcript, ApiError> {
    // An unreadable body carries no URL either
    let request = body.map(|Json(request)| request).unwrap_or_default();

    let url = request
        .youtube_url
        .filter(|url| !url.trim().is_empty())
        .ok_or(ApiError::MissingUrl)?;

    let options = match request.language.as_deref().map(str::trim) {
        Some(language) if !language.is_empty() => state.defaults.with_language(normalize_language_code(language)),
        _ => state.defaults.as_ref().clone(),
    };

    let span = request_span(route, &url);
    let cancel = state.shutdown.child_token();

    async {
        tracing::debug!("Transcribing {}", url);
        state
            .pipeline
            .transcribe(&url, &options, &cancel)
            .await
            .map_err(ApiError::from)
    }
    .instrument(span)
    .await
}

/// Span for one request; `video_id` stays empty when the URL does not parse
fn request_span(route: &'static str, url: &str) -> tracing::Span {
    let span = tracing::info_span!(
        "request",
        request_id = %Uuid::new_v4(),
        route,
        video_id = tracing::field::Empty
    );
    if let Ok(video_id) = VideoId::parse(url) {
        span.record("video_id", video_id.as_str());
    }
    span
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Missing 'youtube_url' in request")]
    MissingUrl,

    #[error(transparent)]
    Transcribe(#[from] TranscribeError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingUrl => StatusCode::BAD_REQUEST,
            ApiError::Transcribe(err) => match err.kind() {
                ErrorKind::InvalidUrl => StatusCode::BAD_REQUEST,
                ErrorKind::NoCaptionsAvailable | ErrorKind::UnsupportedEncoding => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::MissingUrl => ErrorBody {
                error: self.to_string(),
                kind: ErrorKind::InvalidUrl,
                suggestion: None,
            },
            ApiError::Transcribe(err) => ErrorBody {
                error: err.to_string(),
                kind: err.kind(),
                suggestion: match err {
                    TranscribeError::Extraction(ExtractionError::RateLimited { suggestion, .. }) => suggestion.clone(),
                    _ => None,
                },
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        (status, Json(self.body())).into_response()
    }
}
