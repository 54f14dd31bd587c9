//! Purifier proxy endpoints.
//!
//! Control endpoints read the stored record, run the requested transition
//! through [`PurifierState`], PATCH the resulting update, then re-read the
//! store so the response reflects what was actually persisted. A rejected
//! transition writes nothing and reports `applied: false`.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{failure, store_failure, AppState};
use crate::purifier::{
    mark_maintenance, PurifierState, PurifierUpdate, PurifierView, DEFAULT_PURIFIER_ID,
};

// ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/purifiers", get(list))
        .route("/api/purifiers/state", get(read_state))
        .route("/api/purifiers/apply", post(apply))
        .route("/api/purifiers/{id}/power", post(power))
        .route("/api/purifiers/{id}/efficient", post(efficient))
        .route("/api/purifiers/{id}/speed", post(speed))
        .route("/api/purifiers/{id}/maintenance", post(maintenance))
}

fn bad_body(rejection: JsonRejection) -> Response {
    tracing::debug!("rejected purifier request body: {rejection}");
    failure(StatusCode::BAD_REQUEST, "Invalid payload")
}

fn view_body(view: &PurifierView) -> Value {
    serde_json::to_value(view).unwrap_or(Value::Null)
}

/// `GET /api/purifiers`
async fn list(State(state): State<AppState>) -> Response {
    // ---
    let records = match state.store.list_purifiers().await {
        Ok(records) => records,
        Err(err) => return store_failure(err),
    };
    let purifiers: Vec<PurifierView> = records
        .into_iter()
        .map(|(id, record)| PurifierView::new(id, record))
        .collect();

    Json(json!({
        "success": true,
        "count": purifiers.len(),
        "purifiers": purifiers,
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
struct StateQuery {
    id: Option<String>,
}

/// `GET /api/purifiers/state[?id=]`
async fn read_state(Query(params): Query<StateQuery>, State(state): State<AppState>) -> Response {
    // ---
    let id = params
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PURIFIER_ID.to_string());

    match state.store.read_purifier(&id).await {
        Ok(record) => {
            let view = PurifierView::new(&id, record);
            Json(json!({
                "success": true,
                "id": id,
                "data": view.record,
                "mode": view.mode,
                "effectiveSpeed": view.effective_speed,
                "sliderEnabled": view.slider_enabled,
            }))
            .into_response()
        }
        Err(err) => store_failure(err),
    }
}

#[derive(Debug, Deserialize)]
struct ApplyBody {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    updates: Option<Value>,
}

/// `POST /api/purifiers/apply {id, updates}`: raw field PATCH.
async fn apply(State(state): State<AppState>, body: Result<Json<ApplyBody>, JsonRejection>) -> Response {
    // ---
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };
    let (Some(id), Some(Value::Object(updates))) = (body.id, body.updates) else {
        return failure(StatusCode::BAD_REQUEST, "Invalid payload");
    };
    if id.trim().is_empty() {
        return failure(StatusCode::BAD_REQUEST, "Invalid payload");
    }

    match state.store.patch_purifier_raw(&id, &updates).await {
        Ok(data) => Json(json!({ "success": true, "id": id, "data": data })).into_response(),
        Err(err) => store_failure(err),
    }
}

/// Read, transition, PATCH, re-read.
async fn control<F>(state: &AppState, id: &str, transition: F) -> Response
where
    F: FnOnce(&mut PurifierState) -> Option<PurifierUpdate>,
{
    // ---
    let record = match state.store.read_purifier(id).await {
        Ok(record) => record,
        Err(err) => return store_failure(err),
    };
    let mut machine = PurifierState::from_record(&record);

    let Some(update) = transition(&mut machine) else {
        tracing::info!("purifier {id}: transition rejected in mode {:?}", machine.mode());
        let mut body = view_body(&PurifierView::new(id, record));
        body["success"] = json!(true);
        body["applied"] = json!(false);
        return Json(body).into_response();
    };

    if let Err(err) = state.store.patch_purifier(id, &update).await {
        return store_failure(err);
    }

    // Confirm against the store, else report the optimistic copy
    let confirmed = match state.store.read_purifier(id).await {
        Ok(record) => record,
        Err(err) => {
            tracing::warn!(class = err.class(), "purifier {id}: confirmation read failed: {err}");
            let mut optimistic = record;
            update.apply_to(&mut optimistic);
            optimistic
        }
    };

    let mut body = view_body(&PurifierView::new(id, confirmed));
    body["success"] = json!(true);
    body["applied"] = json!(update);
    Json(body).into_response()
}

#[derive(Debug, Deserialize)]
struct PowerBody {
    on: bool,
}

async fn power(
    Path(id): Path<String>,
    State(state): State<AppState>,
    body: Result<Json<PowerBody>, JsonRejection>,
) -> Response {
    // ---
    let Json(PowerBody { on }) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };
    control(&state, &id, |machine| {
        if on {
            machine.turn_on()
        } else {
            machine.turn_off()
        }
    })
    .await
}

#[derive(Debug, Deserialize)]
struct EfficientBody {
    enabled: bool,
}

async fn efficient(
    Path(id): Path<String>,
    State(state): State<AppState>,
    body: Result<Json<EfficientBody>, JsonRejection>,
) -> Response {
    // ---
    let Json(EfficientBody { enabled }) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };
    control(&state, &id, |machine| machine.set_efficient(enabled)).await
}

#[derive(Debug, Deserialize)]
struct SpeedBody {
    speed: f64,
}

async fn speed(
    Path(id): Path<String>,
    State(state): State<AppState>,
    body: Result<Json<SpeedBody>, JsonRejection>,
) -> Response {
    // ---
    let Json(SpeedBody { speed }) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };
    if !speed.is_finite() {
        return failure(StatusCode::BAD_REQUEST, "Invalid speed");
    }
    control(&state, &id, |machine| machine.set_speed(speed)).await
}

#[derive(Debug, Default, Deserialize)]
struct MaintenanceBody {
    #[serde(default)]
    date: Option<String>,
}

/// Body is optional; an empty POST stamps the current time.
async fn maintenance(Path(id): Path<String>, State(state): State<AppState>, body: String) -> Response {
    // ---
    let parsed = if body.trim().is_empty() {
        MaintenanceBody::default()
    } else {
        match serde_json::from_str::<MaintenanceBody>(&body) {
            Ok(parsed) => parsed,
            Err(_) => return failure(StatusCode::BAD_REQUEST, "Invalid payload"),
        }
    };
    control(&state, &id, |_| Some(mark_maintenance(parsed.date))).await
}
