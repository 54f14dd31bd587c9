//! Station AQI endpoints: the acquired list, its network average, and the
//! realtime-merged live list.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};

use super::{failure, store_failure, AppState, RefreshQuery};

// ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/aqi", get(stations))
        .route("/api/aqi/summary", get(summary))
        .route("/api/stations/live", get(live))
        .route("/api/stations/{id}", put(write_station))
}

/// `GET /api/aqi`
async fn stations(
    Query(params): Query<RefreshQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    // ---
    let acquired = state.acquirer.acquire_stations(params.forced()).await;
    tracing::debug!(
        "GET /api/aqi: {} stations from {}",
        acquired.payload.len(),
        acquired.source
    );
    Json(json!({
        "success": true,
        "count": acquired.payload.len(),
        "lastUpdated": acquired.fetched_at,
        "source": acquired.source,
        "synthetic": acquired.synthetic,
        "stations": acquired.payload,
    }))
}

/// `GET /api/aqi/summary`
async fn summary(
    Query(params): Query<RefreshQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let summary = state.acquirer.network_summary(params.forced()).await;
    Json(json!({ "success": true, "summary": summary }))
}

/// `GET /api/stations/live`
async fn live(
    Query(params): Query<RefreshQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    // ---
    let acquired = state.acquirer.acquire_stations(params.forced()).await;
    state.board.rebase(&acquired).await;
    let stations = state.board.stations().await;

    Json(json!({
        "success": true,
        "count": stations.len(),
        "lastUpdated": acquired.fetched_at,
        "source": acquired.source,
        "realtime": state.board.snapshot_len().await > 0,
        "stations": stations,
    }))
}

/// `PUT /api/stations/{id}`: replace a station node in the realtime store.
/// The watcher picks the change up on its next poll.
async fn write_station(
    Path(id): Path<String>,
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    // ---
    let Ok(Json(Value::Object(fields))) = body else {
        return failure(StatusCode::BAD_REQUEST, "Station body must be a JSON object");
    };

    match state.store.update_station(&id, fields).await {
        Ok(data) => Json(json!({ "success": true, "id": id, "data": data })).into_response(),
        Err(err) => store_failure(err),
    }
}
