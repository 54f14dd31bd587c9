use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;

use super::{AppState, RefreshQuery};
use crate::models::WeatherSource;

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/api/weather", get(weather))
}

/// `GET /api/weather`: telemetry API, then the scraped page, then defaults.
async fn weather(
    Query(params): Query<RefreshQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    // ---
    let acquired = state.acquirer.acquire_weather(params.forced()).await;
    let reading = &acquired.payload;

    let mut body = json!({
        "success": true,
        "source": WeatherSource::from_source_id(acquired.source),
        "temperature": reading.temperature,
        "humidity": reading.humidity,
        "windSpeed": reading.wind_speed,
        "lastUpdated": acquired.fetched_at,
    });
    if let Some(pressure) = reading.pressure {
        body["pressure"] = json!(pressure);
    }
    if let Some(direction) = &reading.wind_direction {
        body["windDirection"] = json!(direction);
    }
    if let Some(condition) = &reading.condition {
        body["condition"] = json!(condition);
    }
    Json(body)
}
