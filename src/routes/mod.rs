//! HTTP gateway for the dashboard API.
//!
//! Each sibling module owns one slice of the surface and exports a
//! subrouter; this gateway merges them, attaches [`AppState`], and wraps the
//! whole tree in CORS and request tracing so `main.rs` never needs to know
//! individual endpoints.
//!
//! Every JSON response carries a boolean `success`. Failures use
//! `{ "success": false, "error": "..." }`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::acquire::{Acquirer, KeyedTtlCache};
use crate::error::SourceError;
use crate::realtime::{LiveBoard, RealtimeStore};
use crate::sources::ChatClient;
use crate::Config;

mod advisory;
mod aqi;
mod buses;
mod catalog;
mod chat;
mod health;
mod historical;
mod purifiers;
mod reports;
mod weather;

pub use reports::{fallback_insight, Coords, InsightSummary, LatestReadings};

/// Lifetime of a generated report insight.
const INSIGHT_TTL: Duration = Duration::from_secs(90);

// ---

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub acquirer: Arc<Acquirer>,
    pub board: Arc<LiveBoard>,
    pub store: RealtimeStore,
    pub chat: Arc<ChatClient>,
    insights: Arc<KeyedTtlCache<String, reports::CachedInsight>>,
}

impl AppState {
    pub fn new(acquirer: Acquirer, store: RealtimeStore, chat: ChatClient) -> Self {
        Self {
            acquirer: Arc::new(acquirer),
            board: Arc::new(LiveBoard::new()),
            store,
            chat: Arc::new(chat),
            insights: Arc::new(KeyedTtlCache::new(INSIGHT_TTL)),
        }
    }

    /// Wire every client from configuration. Upstream adapters and the store
    /// share one connection pool; the chat proxy gets its own, with a longer
    /// request timeout.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        // ---
        let client = http_client(cfg.adapter_timeout)?;
        let chat_client = http_client(cfg.chat_timeout)?;

        let acquirer = Acquirer::from_config(cfg, &client);
        let store = RealtimeStore::new(
            client.clone(),
            cfg.firebase_db_url.clone(),
            cfg.firebase_auth.clone(),
        );
        let chat = ChatClient::new(
            chat_client,
            &cfg.gemini_base_url,
            cfg.gemini_api_key.clone(),
            &cfg.gemini_model,
            &cfg.gemini_fallback_model,
        );
        Ok(Self::new(acquirer, store, chat))
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("pranamesh-dashboard/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?)
}

/// Build the full API router.
pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(aqi::router())
        .merge(weather::router())
        .merge(buses::router())
        .merge(historical::router())
        .merge(advisory::router())
        .merge(catalog::router())
        .merge(purifiers::router())
        .merge(chat::router())
        .merge(reports::router())
        .merge(health::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// --- shared handler helpers

/// `?force=true` or the older `?refresh=true`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RefreshQuery {
    force: Option<String>,
    refresh: Option<String>,
}

impl RefreshQuery {
    pub(crate) fn forced(&self) -> bool {
        [&self.force, &self.refresh]
            .into_iter()
            .flatten()
            .any(|v| is_truthy(v))
    }
}

pub(crate) fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

/// Error envelope.
pub(crate) fn failure(status: StatusCode, error: impl Into<String>) -> Response {
    let error = error.into();
    (status, Json(json!({ "success": false, "error": error }))).into_response()
}

/// Map a realtime-store failure: unconfigured is 503, anything else 502.
pub(crate) fn store_failure(err: SourceError) -> Response {
    // ---
    match err {
        SourceError::Unconfigured(_) => {
            failure(StatusCode::SERVICE_UNAVAILABLE, "Realtime store not configured")
        }
        other => {
            tracing::error!(class = other.class(), "realtime store request failed: {other}");
            failure(StatusCode::BAD_GATEWAY, "Realtime store request failed")
        }
    }
}
