use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::{is_truthy, AppState, RefreshQuery};
use crate::acquire::count_buses;

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/api/buses", get(buses))
}

#[derive(Debug, Deserialize)]
struct BusQuery {
    #[serde(flatten)]
    refresh: RefreshQuery,
    routes: Option<String>,
}

/// `GET /api/buses[?routes=true]`
async fn buses(Query(params): Query<BusQuery>, State(state): State<AppState>) -> impl IntoResponse {
    // ---
    let acquired = state.acquirer.acquire_buses(params.refresh.forced()).await;

    let mut body = json!({
        "success": true,
        "count": acquired.payload.len(),
        "lastUpdated": acquired.fetched_at,
        "source": acquired.source,
        "simulated": acquired.synthetic,
        "positions": acquired.payload,
    });
    if params.routes.as_deref().is_some_and(is_truthy) {
        body["routes"] = json!(count_buses(&acquired.payload));
    }
    Json(body)
}
