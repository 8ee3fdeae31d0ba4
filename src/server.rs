use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::auth::{ApiKeyGate, require_api_key};
use crate::config::Config;
use crate::error::RenderError;
use crate::ffmpeg::FfmpegToolchain;
use crate::job::{CleanupStream, RenderJob};
use crate::render::RenderService;
use crate::upload::receive_render_upload;

pub const OUTPUT_FILENAME: &str = "video.mp4";

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<ApiKeyGate>,
    pub renderer: Arc<RenderService>,
    pub work_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(config: &Config, renderer: RenderService) -> Self {
        Self {
            gate: Arc::new(ApiKeyGate::new(&config.api_secret)),
            renderer: Arc::new(renderer),
            work_dir: config.work_dir.clone(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    /// State backed by the real ffmpeg/ffprobe binaries.
    pub fn from_config(config: &Config) -> Self {
        let tools = Arc::new(FfmpegToolchain::new(
            config.ffmpeg_bin.clone(),
            config.ffprobe_bin.clone(),
            config.tool_timeout(),
        ));
        let renderer = RenderService::new(tools.clone(), tools, config.encode_settings());
        Self::new(config, renderer)
    }
}

pub fn build_router(state: AppState) -> Router {
    let limit = state.max_upload_bytes;

    Router::new()
        .route("/render", post(render_video))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn render_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, RenderError> {
    let mut job = RenderJob::new(&state.work_dir);
    let upload = receive_render_upload(multipart, &mut job).await?;
    let inputs = upload.into_inputs()?;

    let output = state.renderer.render(&inputs, &mut job).await?;

    let file = tokio::fs::File::open(&output)
        .await
        .map_err(RenderError::Stream)?;
    let length = file.metadata().await.ok().map(|m| m.len());
    let body = Body::from_stream(CleanupStream::new(ReaderStream::new(file), job));

    let mut response = (
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{OUTPUT_FILENAME}\""),
            ),
        ],
        body,
    )
        .into_response();
    if let Some(length) = length {
        response
            .headers_mut()
            .insert(header::CONTENT_LENGTH, header::HeaderValue::from(length));
    }
    Ok(response)
}
