//! Axum router exposing the extractor over HTTP.
//!
//! Every handler follows the same three steps: validate the path parameter
//! into a typed identifier, wrap it in an [`Operation`], and hand it to
//! [`run_operation`]. Validation failures short-circuit with a 400 before the
//! launcher is touched.

use std::{any::Any, path::PathBuf, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path as AxumPath, State},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::command::Operation;
use crate::error::{ApiError, ApiResult, SuccessEnvelope};
use crate::extract::run_operation;
use crate::identifier::{ChannelId, PlaylistId, VideoId};
use crate::process::Launcher;

const WELCOME_MESSAGE: &str = "YouTube Scraper API using yt-dlp. Use endpoints like /video/:id, /playlist/:id, /channel/:id/playlists";

/// Shared state injected into every handler. Nothing in here is mutable.
#[derive(Clone)]
pub struct AppState {
    launcher: Arc<dyn Launcher>,
    extractor: Arc<PathBuf>,
}

impl AppState {
    pub fn new(launcher: Arc<dyn Launcher>, extractor: PathBuf) -> Self {
        Self {
            launcher,
            extractor: Arc::new(extractor),
        }
    }

    async fn extract(&self, operation: Operation) -> ApiResult<Json<SuccessEnvelope>> {
        let data = run_operation(self.launcher.as_ref(), &self.extractor, &operation).await?;
        Ok(Json(SuccessEnvelope::new(data)))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/video/{video_id}", get(video_detail))
        .route("/comments/{video_id}", get(video_comments))
        .route("/playlist/{playlist_id}", get(playlist))
        .route("/channel/{channel_id}/playlists", get(channel_playlists))
        .route("/channel/{channel_id}/info", get(channel_info))
        .fallback(endpoint_not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn index() -> Json<Value> {
    Json(json!({ "message": WELCOME_MESSAGE }))
}

async fn video_detail(
    State(state): State<AppState>,
    AxumPath(video_id): AxumPath<String>,
) -> ApiResult<Json<SuccessEnvelope>> {
    let id = VideoId::parse(&video_id)?;
    state.extract(Operation::VideoDetail(id)).await
}

/// Same document as `/video`, with a larger comment budget. Callers read the
/// `comments` field themselves.
async fn video_comments(
    State(state): State<AppState>,
    AxumPath(video_id): AxumPath<String>,
) -> ApiResult<Json<SuccessEnvelope>> {
    let id = VideoId::parse(&video_id)?;
    state.extract(Operation::Comments(id)).await
}

async fn playlist(
    State(state): State<AppState>,
    AxumPath(playlist_id): AxumPath<String>,
) -> ApiResult<Json<SuccessEnvelope>> {
    let id = PlaylistId::parse(&playlist_id)?;
    state.extract(Operation::Playlist(id)).await
}

async fn channel_playlists(
    State(state): State<AppState>,
    AxumPath(channel_id): AxumPath<String>,
) -> ApiResult<Json<SuccessEnvelope>> {
    let id = ChannelId::parse(&channel_id)?;
    state.extract(Operation::ChannelPlaylists(id)).await
}

async fn channel_info(
    State(state): State<AppState>,
    AxumPath(channel_id): AxumPath<String>,
) -> ApiResult<Json<SuccessEnvelope>> {
    let id = ChannelId::parse(&channel_id)?;
    state.extract(Operation::ChannelInfo(id)).await
}

async fn endpoint_not_found() -> ApiError {
    ApiError::not_found("Endpoint not found.")
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_default();
    tracing::error!(panic = %message, "request handler panicked");
    ApiError::internal("Internal server error.").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Invocation;
    use crate::process::{LaunchError, ProcessResult};
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use std::{io, sync::Mutex};
    use tower::ServiceExt;

    enum Reply {
        Exit(ProcessResult),
        Missing,
        Panic,
    }

    /// Records every invocation and answers with a fixed reply.
    struct SpyLauncher {
        reply: Reply,
        calls: Mutex<Vec<Invocation>>,
    }

    impl SpyLauncher {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn exiting(code: i32, stdout: &str, stderr: &str) -> Arc<Self> {
            Self::new(Reply::Exit(ProcessResult {
                exit_code: Some(code),
                stdout: stdout.as_bytes().to_vec(),
                stderr: stderr.as_bytes().to_vec(),
                killed: false,
            }))
        }

        fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Launcher for SpyLauncher {
        async fn launch(&self, invocation: &Invocation) -> Result<ProcessResult, LaunchError> {
            self.calls.lock().unwrap().push(invocation.clone());
            match &self.reply {
                Reply::Exit(result) => Ok(result.clone()),
                Reply::Missing => Err(LaunchError::Spawn {
                    program: invocation.program.display().to_string(),
                    source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
                }),
                Reply::Panic => panic!("launcher exploded"),
            }
        }
    }

    async fn get(launcher: Arc<SpyLauncher>, uri: &str) -> (StatusCode, Value) {
        let app = router(AppState::new(launcher, PathBuf::from("/opt/yt-dlp")));
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn index_describes_the_api() {
        let spy = SpyLauncher::exiting(0, "{}", "");
        let (status, body) = get(spy.clone(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].as_str().unwrap().contains("/video/:id"));
        assert!(spy.calls().is_empty());
    }

    #[tokio::test]
    async fn video_success_wraps_payload() {
        let spy = SpyLauncher::exiting(0, r#"{"id":"dQw4w9WgXcQ","title":"Test"}"#, "");
        let (status, body) = get(spy.clone(), "/video/dQw4w9WgXcQ").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"success": true, "data": {"id": "dQw4w9WgXcQ", "title": "Test"}})
        );
        let calls = spy.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, PathBuf::from("/opt/yt-dlp"));
        assert_eq!(
            calls[0].args.last().map(String::as_str),
            Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
        );
    }

    #[tokio::test]
    async fn invalid_video_id_never_spawns() {
        let spy = SpyLauncher::exiting(0, "{}", "");
        let (status, body) = get(spy.clone(), "/video/short").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"success": false, "error": "Invalid YouTube Video ID format."})
        );
        assert!(spy.calls().is_empty());
    }

    #[tokio::test]
    async fn invalid_identifiers_are_rejected_per_category() {
        let cases = [
            ("/comments/abc", "Invalid YouTube Video ID format."),
            ("/comments/dQw4w9WgXcQ-extra", "Invalid YouTube Video ID format."),
            ("/playlist/%21%21%21", "Invalid YouTube Playlist ID format."),
            ("/playlist/PL%3Fx", "Invalid YouTube Playlist ID format."),
            ("/channel/%24%28%29/playlists", "Channel ID or name is required."),
            ("/channel/%20%3B/info", "Channel ID or name is required."),
        ];
        for (uri, message) in cases {
            let spy = SpyLauncher::exiting(0, "{}", "");
            let (status, body) = get(spy.clone(), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"], message, "{uri}");
            assert!(spy.calls().is_empty(), "{uri}");
        }
    }

    #[tokio::test]
    async fn comments_use_larger_budget() {
        let spy = SpyLauncher::exiting(0, r#"{"comments":[]}"#, "");
        let (status, _) = get(spy.clone(), "/comments/dQw4w9WgXcQ").await;
        assert_eq!(status, StatusCode::OK);
        assert!(
            spy.calls()[0]
                .args
                .contains(&"youtube:max_comments=200,all;player_client=web".to_string())
        );
    }

    #[tokio::test]
    async fn playlist_lines_become_entries() {
        let spy = SpyLauncher::exiting(0, "{\"id\":\"a\"}\n{\"id\":\"b\"}\n", "");
        let (status, body) = get(spy.clone(), "/playlist/PLabc_123").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"success": true, "data": {"entries": [{"id": "a"}, {"id": "b"}]}})
        );
        assert!(spy.calls()[0].args.contains(&"--flat-playlist".to_string()));
    }

    #[tokio::test]
    async fn channel_routes_build_channel_urls() {
        let spy = SpyLauncher::exiting(0, r#"{"channel":"x"}"#, "");
        let (status, _) = get(spy.clone(), "/channel/UC_x5XG1OV2P6uZZ5FSM9Ttw/playlists").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = get(spy.clone(), "/channel/UC_x5XG1OV2P6uZZ5FSM9Ttw/info").await;
        assert_eq!(status, StatusCode::OK);
        let calls = spy.calls();
        assert_eq!(
            calls[0].args.last().map(String::as_str),
            Some("https://www.youtube.com/channel/UC_x5XG1OV2P6uZZ5FSM9Ttw/playlists")
        );
        assert_eq!(
            calls[1].args.last().map(String::as_str),
            Some("https://www.youtube.com/channel/UC_x5XG1OV2P6uZZ5FSM9Ttw")
        );
        assert!(calls[1].args.contains(&"--playlist-items".to_string()));
    }

    #[tokio::test]
    async fn unavailable_video_is_not_found() {
        let spy = SpyLauncher::exiting(1, "", "ERROR: Video unavailable");
        let (status, body) = get(spy, "/video/dQw4w9WgXcQ").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(
            body["error"],
            "Video, Playlist, or Channel not found or unavailable."
        );
        assert_eq!(body["details"], "ERROR: Video unavailable");
    }

    #[tokio::test]
    async fn not_found_takes_priority_over_invalid_url() {
        let spy = SpyLauncher::exiting(1, "", "ERROR: Invalid URL; Video unavailable");
        let (status, _) = get(spy, "/video/dQw4w9WgXcQ").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_url_is_bad_request() {
        let spy = SpyLauncher::exiting(1, "", "ERROR: Invalid URL");
        let (status, body) = get(spy, "/channel/whatever/info").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid URL provided to yt-dlp.");
    }

    #[tokio::test]
    async fn missing_extractor_is_reported_with_path() {
        let spy = SpyLauncher::new(Reply::Missing);
        let (status, body) = get(spy, "/video/dQw4w9WgXcQ").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["error"],
            "Command not found: '/opt/yt-dlp'. Ensure yt-dlp is installed and accessible."
        );
    }

    #[tokio::test]
    async fn unparseable_output_surfaces_stderr() {
        let spy = SpyLauncher::exiting(0, "not json at all", "WARNING: rate limited");
        let (status, body) = get(spy, "/video/dQw4w9WgXcQ").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "yt-dlp produced non-JSON output.");
        assert_eq!(body["details"], "WARNING: rate limited");
    }

    #[tokio::test]
    async fn unparseable_output_without_stderr_includes_preview() {
        let spy = SpyLauncher::exiting(0, "not json at all", "");
        let (status, body) = get(spy, "/video/dQw4w9WgXcQ").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to parse yt-dlp output as JSON.");
        assert_eq!(body["raw_output_preview"], "not json at all");
        assert!(body["details"].as_str().is_some());
    }

    #[tokio::test]
    async fn unknown_routes_return_json_404() {
        let spy = SpyLauncher::exiting(0, "{}", "");
        let (status, body) = get(spy.clone(), "/videos").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({"success": false, "error": "Endpoint not found."})
        );
        assert!(spy.calls().is_empty());
    }

    #[tokio::test]
    async fn handler_panics_become_500() {
        let spy = SpyLauncher::new(Reply::Panic);
        let (status, body) = get(spy, "/video/dQw4w9WgXcQ").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error.");
    }

    #[tokio::test]
    async fn cors_headers_are_present() {
        let spy = SpyLauncher::exiting(0, "{}", "");
        let app = router(AppState::new(spy, PathBuf::from("yt-dlp")));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("origin", "https://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(
            response
                .headers()
                .contains_key("access-control-allow-origin")
        );
    }
}
