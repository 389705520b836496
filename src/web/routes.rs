use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::state::AppState;

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/recordings", get(handlers::list_recordings))
        .route("/recordings/:filename", get(handlers::serve_recording))
        .route("/live", get(handlers::live_page))
        .route("/video_feed", get(handlers::video_feed))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::video::capture::testing::{ScriptedSource, Step};

    struct TestApp {
        dir: tempfile::TempDir,
        source: Arc<ScriptedSource>,
        router: Router,
    }

    fn app(script: Vec<Step>) -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.recording.dir = dir.path().to_path_buf();
        let source = Arc::new(ScriptedSource::new(script));
        let router = create_router(AppState::new(&config, source.clone()));
        TestApp {
            dir,
            source,
            router,
        }
    }

    async fn get(router: &Router, uri: &str) -> axum::response::Response {
        router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[tokio::test]
    async fn test_index() {
        let app = app(Vec::new());
        let response = get(&app.router, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("View Recordings"));
        assert!(html.contains("View Live Stream"));
    }

    #[tokio::test]
    async fn test_recordings_listed_newest_first() {
        let app = app(Vec::new());
        for name in [
            "recording_20240101_080000.mp4",
            "recording_20240315_120000.mp4",
            "recording_20231231_235959.mp4",
        ] {
            std::fs::write(app.dir.path().join(name), b"x").unwrap();
        }

        let response = get(&app.router, "/recordings").await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;

        let positions: Vec<usize> = [
            "Recording from March 15, 2024 at 12:00 PM",
            "Recording from January 01, 2024 at 08:00 AM",
            "Recording from December 31, 2023 at 11:59 PM",
        ]
        .iter()
        .map(|label| html.find(label).unwrap())
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_recordings_page_without_directory() {
        let app = app(Vec::new());
        let missing = app.dir.path().join("missing");
        let mut config = AppConfig::default();
        config.recording.dir = missing;
        let router = create_router(AppState::new(&config, app.source.clone()));

        let response = get(&router, "/recordings").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("No recordings yet"));
    }

    #[tokio::test]
    async fn test_serve_recording() {
        let app = app(Vec::new());
        std::fs::write(
            app.dir.path().join("recording_20240315_120000.mp4"),
            b"fake mp4 bytes",
        )
        .unwrap();

        let response = get(&app.router, "/recordings/recording_20240315_120000.mp4").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(body_text(response).await, "fake mp4 bytes");
    }

    #[tokio::test]
    async fn test_missing_recording_is_404() {
        let app = app(Vec::new());
        let response = get(&app.router, "/recordings/nope.mp4").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = get(&app.router, "/recordings/..%2Fsecret.mp4").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_live_page() {
        let app = app(Vec::new());
        let response = get(&app.router, "/live").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains(r#"src="/video_feed""#));
    }

    #[tokio::test]
    async fn test_video_feed() {
        let app = app(vec![Step::Frame, Step::Frame, Step::Frame, Step::End]);
        let response = get(&app.router, "/video_feed").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "multipart/x-mixed-replace; boundary=frame"
        );
        assert_eq!(response.headers()[header::PRAGMA], "no-cache");

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parts = bytes
            .windows(b"--frame\r\n".len())
            .filter(|w| *w == b"--frame\r\n")
            .count();
        assert_eq!(parts, 3);
        assert_eq!(app.source.closed(), 1);
    }

    #[tokio::test]
    async fn test_video_feed_without_camera() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.recording.dir = dir.path().to_path_buf();
        let router = create_router(AppState::new(
            &config,
            Arc::new(ScriptedSource::unavailable()),
        ));

        let response = get(&router, "/video_feed").await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }
}
