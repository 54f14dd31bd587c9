use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::{failure, AppState};
use crate::aqi::classify;
use crate::fixtures::{health_advisory, top_diseases};

/// Diseases listed in the short summary.
const TOP_DISEASES: usize = 3;

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/api/advisory", get(advisory))
}

#[derive(Debug, Deserialize)]
struct AdvisoryQuery {
    aqi: Option<String>,
}

/// `GET /api/advisory[?aqi=]`. Without `aqi`, the network average is used.
async fn advisory(Query(params): Query<AdvisoryQuery>, State(state): State<AppState>) -> Response {
    // ---
    let aqi = match params.aqi.as_deref().map(str::trim) {
        Some(raw) => match raw.parse::<i32>() {
            Ok(aqi) if aqi >= 0 => aqi,
            _ => return failure(StatusCode::BAD_REQUEST, format!("Invalid aqi '{raw}'")),
        },
        None => state.acquirer.network_summary(false).await.aqi,
    };
    let status = classify(aqi);

    Json(json!({
        "success": true,
        "aqi": aqi,
        "status": status,
        "label": status.label(),
        "color": status.color(),
        "recommendation": status.health_recommendation(),
        "topDiseases": top_diseases(aqi, TOP_DISEASES),
        "advisory": health_advisory(aqi),
    }))
    .into_response()
}
