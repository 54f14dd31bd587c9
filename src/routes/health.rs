//! Liveness endpoint.
//!
//! Answers without calling any upstream. Alongside `status` it reports which
//! optional backends are wired and whether realtime pushes have arrived, so a
//! probe can tell "up on fixtures" apart from "fully connected".

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    realtime_store: bool,
    live_entries: usize,
    chat: bool,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    // ---
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        realtime_store: state.store.is_configured(),
        live_entries: state.board.snapshot_len().await,
        chat: state.chat.is_configured(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
