//! Static catalogue endpoints: device products and traffic hot-spots.

use axum::{response::IntoResponse, routing::get, Json, Router};
use serde_json::json;

use super::AppState;
use crate::fixtures::{DEVICE_KINDS, TRAFFIC_ZONES};

// ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/devices", get(devices))
        .route("/api/traffic-zones", get(traffic_zones))
}

async fn devices() -> impl IntoResponse {
    Json(json!({ "success": true, "count": DEVICE_KINDS.len(), "devices": DEVICE_KINDS }))
}

async fn traffic_zones() -> impl IntoResponse {
    Json(json!({ "success": true, "count": TRAFFIC_ZONES.len(), "zones": TRAFFIC_ZONES }))
}
