use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::header,
    response::{Html, IntoResponse, Response},
};
use bytes::Bytes;
use mime_guess::mime::Mime;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use super::pages;
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::stream::MJPEG_CONTENT_TYPE;

const RECORDING_CONTENT_TYPE: &str = "video/mp4";

/// Landing page
pub async fn index() -> Html<String> {
    Html(pages::home_page())
}

/// Recordings catalog, newest first
pub async fn list_recordings(State(state): State<Arc<AppState>>) -> Result<Html<String>> {
    let catalog = state.catalog.clone();
    let entries = tokio::task::spawn_blocking(move || catalog.list())
        .await
        .map_err(|e| AppError::Internal(format!("catalog task failed: {}", e)))??;

    Ok(Html(pages::recordings_page(&entries)))
}

/// Download or play back one recording
pub async fn serve_recording(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    request: Request,
) -> Result<Response> {
    let path = state.catalog.resolve(&filename)?;
    let mime: Mime = RECORDING_CONTENT_TYPE
        .parse()
        .map_err(|e| AppError::Internal(format!("invalid mime type: {}", e)))?;

    let response = ServeFile::new_with_mime(&path, &mime)
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});

    Ok(response.into_response())
}

/// Page embedding the live feed
pub async fn live_page() -> Html<String> {
    Html(pages::live_page())
}

/// MJPEG stream endpoint
pub async fn video_feed(State(state): State<Arc<AppState>>) -> Response {
    let client_id = uuid::Uuid::new_v4().to_string();
    let mut rx = state.preview.start(client_id);

    let body_stream = async_stream::stream! {
        while let Some(part) = rx.recv().await {
            yield Ok::<Bytes, std::io::Error>(part);
        }
    };

    (
        [
            (header::CONTENT_TYPE, MJPEG_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        Body::from_stream(body_stream),
    )
        .into_response()
}
