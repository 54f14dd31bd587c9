//! End-to-end over real sockets: the API server talks to a fake realtime
//! store, and the test drives it with an HTTP client.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use pranamesh_dashboard::realtime::watcher;
use pranamesh_dashboard::routes;

// --- fake realtime store

type Tree = Arc<Mutex<Value>>;

fn node_id(file: &str) -> String {
    file.trim_end_matches(".json").to_string()
}

async fn read_stations(State(tree): State<Tree>) -> Json<Value> {
    Json(tree.lock().await["stations"].clone())
}

async fn read_purifiers(State(tree): State<Tree>) -> Json<Value> {
    Json(tree.lock().await["purifiers"].clone())
}

async fn read_purifier(Path(file): Path<String>, State(tree): State<Tree>) -> Json<Value> {
    Json(tree.lock().await["purifiers"][node_id(&file)].clone())
}

/// Whole-node replace, echoing the body back.
async fn put_station(
    Path(file): Path<String>,
    State(tree): State<Tree>,
    Json(body): Json<Value>,
) -> Json<Value> {
    tree.lock().await["stations"][node_id(&file)] = body.clone();
    Json(body)
}

/// Field-level merge, echoing the patch back.
async fn patch_purifier(
    Path(file): Path<String>,
    State(tree): State<Tree>,
    Json(patch): Json<Value>,
) -> Json<Value> {
    // ---
    let mut tree = tree.lock().await;
    let node = &mut tree["purifiers"][node_id(&file)];
    if !node.is_object() {
        *node = json!({});
    }
    if let (Some(node), Some(fields)) = (node.as_object_mut(), patch.as_object()) {
        for (key, value) in fields {
            node.insert(key.clone(), value.clone());
        }
    }
    Json(patch)
}

async fn serve(app: Router) -> Result<SocketAddr> {
    // ---
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(addr)
}

/// Fake store plus the API wired to it. Returns the API base URL.
async fn start() -> Result<String> {
    // ---
    let tree: Tree = Arc::new(Mutex::new(json!({
        "stations": {
            "DEV_42": { "aqi": 180, "deviceId": "DEV_42", "lat": 28.61, "lng": 77.21, "pm2_5": 92 }
        },
        "purifiers": {}
    })));
    let store_app = Router::new()
        .route("/stations.json", get(read_stations))
        .route("/stations/{file}", put(put_station))
        .route("/purifiers.json", get(read_purifiers))
        .route("/purifiers/{file}", get(read_purifier).patch(patch_purifier))
        .with_state(tree);
    let store_addr = serve(store_app).await?;

    let state = common::offline_state(Some(format!("http://{store_addr}")));
    watcher::spawn(
        state.store.clone(),
        state.board.clone(),
        None,
        Duration::from_millis(50),
    );
    let api_addr = serve(routes::router(state)).await?;
    Ok(format!("http://{api_addr}"))
}

async fn post(client: &Client, url: String, body: Value) -> Result<Value> {
    Ok(client.post(url).json(&body).send().await?.json().await?)
}

#[tokio::test]
async fn purifier_control_round_trip() -> Result<()> {
    // ---
    let base = start().await?;
    let client = Client::new();
    let control = |action: &str| format!("{base}/api/purifiers/MHXY_001/{action}");

    let body = post(&client, control("power"), json!({ "on": true })).await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["applied"], json!({ "status": true, "fanSpeed": 1426 }));
    assert_eq!(body["mode"], "on-manual");
    assert_eq!(body["sliderEnabled"], true);

    let body = post(&client, control("speed"), json!({ "speed": 1600 })).await?;
    assert_eq!(body["effectiveSpeed"], 1550);

    let body = post(&client, control("efficient"), json!({ "enabled": true })).await?;
    assert_eq!(body["mode"], "on-efficient");
    assert_eq!(body["effectiveSpeed"], 1500);

    // Manual speed is inert while efficient
    let body = post(&client, control("speed"), json!({ "speed": 1440 })).await?;
    assert_eq!(body["applied"], false);
    assert_eq!(body["effectiveSpeed"], 1500);

    let body = post(&client, control("efficient"), json!({ "enabled": false })).await?;
    assert_eq!(body["mode"], "on-manual");
    assert_eq!(body["effectiveSpeed"], 1550);

    let body = post(&client, control("power"), json!({ "on": false })).await?;
    assert_eq!(body["mode"], "off");
    assert_eq!(body["effectiveSpeed"], 1425);

    let body = post(&client, control("efficient"), json!({ "enabled": true })).await?;
    assert_eq!(body["applied"], false);
    assert_eq!(body["mode"], "off");

    let body = post(&client, control("maintenance"), json!({ "date": "2025-11-02T09:30:00Z" })).await?;
    assert_eq!(body["record"]["lastMaintenance"], "2025-11-02T09:30:00Z");

    Ok(())
}

#[tokio::test]
async fn purifier_raw_apply_and_listing() -> Result<()> {
    // ---
    let base = start().await?;
    let client = Client::new();

    let body = post(
        &client,
        format!("{base}/api/purifiers/apply"),
        json!({ "id": "MHXY_002", "updates": { "airFiltered": 12.5, "status": true } }),
    )
    .await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["airFiltered"], 12.5);

    let state: Value = client
        .get(format!("{base}/api/purifiers/state?id=MHXY_002"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(state["data"]["airFiltered"], 12.5);
    assert_eq!(state["mode"], "on-manual");

    let state: Value = client
        .get(format!("{base}/api/purifiers/state"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(state["id"], "MHXY_001");
    assert_eq!(state["mode"], "off");

    let list: Value = client.get(format!("{base}/api/purifiers")).send().await?.json().await?;
    assert_eq!(list["count"], 1);
    assert_eq!(list["purifiers"][0]["id"], "MHXY_002");
    Ok(())
}

#[tokio::test]
async fn realtime_push_reaches_live_stations() -> Result<()> {
    // ---
    let base = start().await?;
    let client = Client::new();

    let mut live = Value::Null;
    for _ in 0..60 {
        live = client
            .get(format!("{base}/api/stations/live"))
            .send()
            .await?
            .json()
            .await?;
        if live["realtime"] == true {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(live["realtime"], true, "watcher never delivered a snapshot");

    let stations = live["stations"].as_array().unwrap();
    let device = stations.iter().find(|s| s["id"] == "DEV_42").unwrap();
    assert_eq!(device["aqi"], 180);
    assert_eq!(device["type"], "pranamesh-device");
    assert_eq!(device["pollutants"]["pm25"], 92.0);

    // An admin write lands in the store and comes back through the watcher
    let written: Value = client
        .put(format!("{base}/api/stations/DEV_42"))
        .json(&json!({ "aqi": 260, "deviceId": "DEV_42", "lat": 28.61, "lng": 77.21 }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(written["success"], true);
    assert!(written["data"]["lastUpdated"].is_string());

    let mut aqi = Value::Null;
    for _ in 0..60 {
        let live: Value = client
            .get(format!("{base}/api/stations/live"))
            .send()
            .await?
            .json()
            .await?;
        aqi = live["stations"]
            .as_array()
            .and_then(|all| all.iter().find(|s| s["id"] == "DEV_42"))
            .map(|s| s["aqi"].clone())
            .unwrap_or(Value::Null);
        if aqi == 260 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(aqi, 260);

    let resp = client
        .put(format!("{base}/api/stations/DEV_42"))
        .json(&json!([1, 2, 3]))
        .send()
        .await?;
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    Ok(())
}
