//! UI port routes — `saveConfig` / `loadConfig` requests and the inbound
//! event stream.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::state::AppState;
use portfwd_bridge::UiRequest;

type SseStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;
type ApiError = (StatusCode, Json<serde_json::Value>);

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ports/saveConfig", post(save_config))
        .route("/ports/loadConfig", post(load_config))
        .route("/ports/events", get(events))
}

/// Either a bare JSON string or `{"config": "..."}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SaveConfigBody {
    Raw(String),
    Wrapped { config: String },
}

impl SaveConfigBody {
    fn into_config(self) -> String {
        match self {
            Self::Raw(config) | Self::Wrapped { config } => config,
        }
    }
}

fn enqueue(state: &AppState, request: UiRequest) -> Result<StatusCode, ApiError> {
    state.requests.send(request).map_err(|_| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"error": "Bridge is not running"})),
        )
    })?;
    Ok(StatusCode::ACCEPTED)
}

async fn save_config(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SaveConfigBody>,
) -> Result<StatusCode, ApiError> {
    enqueue(&state, UiRequest::SaveConfig(body.into_config()))
}

async fn load_config(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    enqueue(&state, UiRequest::LoadConfig)
}

async fn events(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut rx = state.ui.subscribe();

    let stream: SseStream = Box::pin(async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    let port = message.port();
                    match serde_json::to_string(&message) {
                        Ok(data) => yield Ok::<_, Infallible>(Event::default().event(port).data(data)),
                        Err(e) => warn!("Failed to encode {} message: {}", port, e),
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!("Event stream lagged, {} port messages dropped", missed);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::start_background_tasks;
    use crate::routes::build_router;
    use axum::body::Body;
    use axum::http::Request;
    use portfwd_bridge::UiMessage;
    use portfwd_core::PortfwdConfig;
    use portfwd_store::MemoryStorage;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_state() -> (Arc<AppState>, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = PortfwdConfig::from_env(dir.path()).unwrap();
        let state = Arc::new(AppState::new(config, Arc::new(MemoryStorage::new())));
        (state, dir)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn next_message(rx: &mut tokio::sync::broadcast::Receiver<UiMessage>) -> UiMessage {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for port message")
            .unwrap()
    }

    #[tokio::test]
    async fn test_save_then_load_over_http() {
        let (state, _dir) = test_state();
        let mut ui = state.ui.subscribe();
        start_background_tasks(state.clone());

        let resp = build_router(state.clone())
            .oneshot(post_json("/api/ports/saveConfig", "\"dark-mode=true\""))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);

        let resp = build_router(state.clone())
            .oneshot(post_json("/api/ports/loadConfig", ""))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);

        assert_eq!(
            next_message(&mut ui).await,
            UiMessage::LoadedConfig("dark-mode=true".into())
        );
    }

    #[tokio::test]
    async fn test_load_without_save_is_empty_string() {
        let (state, _dir) = test_state();
        let mut ui = state.ui.subscribe();
        start_background_tasks(state.clone());

        build_router(state.clone())
            .oneshot(post_json("/api/ports/loadConfig", ""))
            .await
            .unwrap();

        assert_eq!(next_message(&mut ui).await, UiMessage::LoadedConfig(String::new()));
    }

    #[tokio::test]
    async fn test_save_accepts_wrapped_body() {
        let (state, _dir) = test_state();
        let mut ui = state.ui.subscribe();
        start_background_tasks(state.clone());

        let resp = build_router(state.clone())
            .oneshot(post_json("/api/ports/saveConfig", r#"{"config": "a=1"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);

        build_router(state.clone())
            .oneshot(post_json("/api/ports/loadConfig", ""))
            .await
            .unwrap();
        assert_eq!(next_message(&mut ui).await, UiMessage::LoadedConfig("a=1".into()));
    }

    #[tokio::test]
    async fn test_save_rejects_non_string() {
        let (state, _dir) = test_state();

        let resp = build_router(state)
            .oneshot(post_json("/api/ports/saveConfig", "42"))
            .await
            .unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn test_bridge_not_running() {
        let (state, _dir) = test_state();
        // the bridge takes the receivers; dropping them closes the queue
        drop(state.take_bridge_queues());

        let resp = build_router(state)
            .oneshot(post_json("/api/ports/loadConfig", ""))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_events_is_sse() {
        let (state, _dir) = test_state();

        let resp = build_router(state)
            .oneshot(
                Request::builder()
                    .uri("/api/ports/events")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "text/event-stream"
        );
    }

    #[tokio::test]
    async fn test_events_carry_port_frames() {
        use futures::StreamExt;

        let (state, _dir) = test_state();

        let resp = build_router(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/ports/events")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        state.ui.send(UiMessage::LoadedConfig(String::new())).unwrap();

        let mut body = resp.into_body().into_data_stream();
        let mut frame = String::new();
        while !frame.contains("\n\n") {
            let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
                .await
                .expect("timed out waiting for SSE frame")
                .expect("event stream ended")
                .unwrap();
            frame.push_str(std::str::from_utf8(&chunk).unwrap());
        }

        assert!(frame.contains("event: loadedConfig\n"));
        assert!(frame.contains("data: {\"port\":\"loadedConfig\",\"value\":\"\"}\n"));
    }

    #[tokio::test]
    async fn test_status_route() {
        let (state, _dir) = test_state();

        let resp = build_router(state)
            .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["generation"], 0);
        assert_eq!(json["listeners"], 0);
        assert!(json["connections"].is_number());
        assert!(json["uiSubscribers"].is_number());
        assert!(json["dataDir"].is_string());
    }
}
