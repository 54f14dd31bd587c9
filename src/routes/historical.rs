//! Historical series endpoints.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::{failure, AppState, RefreshQuery};
use crate::acquire::{find_station, heatmap, HistoricalStation, HISTORICAL_STATIONS};
use crate::fixtures;
use crate::models::TimeRange;

const DEFAULT_STATION: &str = "delhi-main";

// ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/historical", get(historical))
        .route("/api/historical/heatmap", get(heatmap_grid))
        .route("/api/historical/sample", get(sample))
}

#[derive(Debug, Deserialize)]
struct HistoricalQuery {
    range: Option<String>,
    station: Option<String>,
    #[serde(flatten)]
    refresh: RefreshQuery,
}

fn invalid_station() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "success": false,
            "error": "Invalid station",
            "validStations": HISTORICAL_STATIONS,
        })),
    )
        .into_response()
}

fn station_param(station: Option<&str>) -> Result<&'static HistoricalStation, Response> {
    find_station(station.unwrap_or(DEFAULT_STATION)).ok_or_else(invalid_station)
}

/// `GET /api/historical?range=24h|7d|30d&station=`
async fn historical(Query(params): Query<HistoricalQuery>, State(state): State<AppState>) -> Response {
    // ---
    let range = match params.range.as_deref().unwrap_or("24h").parse::<TimeRange>() {
        Ok(range) => range,
        Err(msg) => return failure(StatusCode::BAD_REQUEST, msg),
    };
    let station = match station_param(params.station.as_deref()) {
        Ok(station) => station,
        Err(resp) => return resp,
    };

    let report = state
        .acquirer
        .acquire_historical(station, range, params.refresh.forced())
        .await;
    tracing::debug!("GET /api/historical {} {range}: {} points", station.id, report.data.len());

    let mut body = json!({ "success": true });
    if let (Some(envelope), Ok(serde_json::Value::Object(fields))) =
        (body.as_object_mut(), serde_json::to_value(&*report))
    {
        envelope.extend(fields);
    }
    (
        [(header::CACHE_CONTROL, "public, s-maxage=60, stale-while-revalidate=300")],
        Json(body),
    )
        .into_response()
}

/// `GET /api/historical/heatmap?station=`: weekday × hour grid.
async fn heatmap_grid(Query(params): Query<HistoricalQuery>, State(state): State<AppState>) -> Response {
    // ---
    let station = match station_param(params.station.as_deref()) {
        Ok(station) => station,
        Err(resp) => return resp,
    };
    let current = state.acquirer.current_aqi(station).await;
    let cells = heatmap(current, &mut rand::thread_rng());

    Json(json!({
        "success": true,
        "station": station.name,
        "currentAqi": current,
        "cells": cells,
    }))
    .into_response()
}

/// `GET /api/historical/sample`: the static sample series.
async fn sample() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "hourly": fixtures::hourly_series(),
        "weekly": fixtures::weekly_series(),
    }))
}
