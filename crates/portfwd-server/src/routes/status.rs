//! Forwarder status route.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;
use portfwd_forward::ForwarderStatus;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(get_status))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    #[serde(flatten)]
    forwarder: ForwarderStatus,
    ui_subscribers: usize,
    data_dir: String,
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        forwarder: state.forwarder.status().await,
        ui_subscribers: state.ui.receiver_count(),
        data_dir: state.config.data_paths.root.display().to_string(),
    })
}
