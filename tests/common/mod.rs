//! Shared builders for the HTTP tests. Every upstream is offline, so each
//! domain lands on its last-resort tier.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use pranamesh_dashboard::acquire::{Acquirer, Sources};
use pranamesh_dashboard::config::CacheTtls;
use pranamesh_dashboard::error::SourceError;
use pranamesh_dashboard::realtime::RealtimeStore;
use pranamesh_dashboard::routes::AppState;
use pranamesh_dashboard::sources::{Adapter, ChatClient};

/// An upstream that always refuses.
pub struct Down(pub &'static str);

#[async_trait]
impl<T: Send + 'static> Adapter<T> for Down {
    fn source_id(&self) -> &'static str {
        self.0
    }

    async fn fetch(&self) -> Result<T, SourceError> {
        Err(SourceError::unavailable(self.0, "offline"))
    }
}

pub fn offline_sources() -> Sources {
    Sources {
        waqi: Arc::new(Down("waqi")),
        scraper: Arc::new(Down("scraper")),
        cpcb: Arc::new(Down("cpcb")),
        transit: Arc::new(Down("transit")),
    }
}

/// App state with every upstream down and, optionally, a realtime store.
pub fn offline_state(store_url: Option<String>) -> AppState {
    offline_state_with(store_url, None, None)
}

/// As [`offline_state`], with credentials for the store and the chat proxy.
pub fn offline_state_with(
    store_url: Option<String>,
    store_auth: Option<&str>,
    chat_key: Option<&str>,
) -> AppState {
    // ---
    let client = reqwest::Client::new();
    let acquirer = Acquirer::new(offline_sources(), CacheTtls::default(), Duration::from_millis(500));
    let store = RealtimeStore::new(client.clone(), store_url, store_auth.map(String::from));
    let chat = ChatClient::new(
        client,
        "http://127.0.0.1:9",
        chat_key.map(String::from),
        "models/test-model",
        "models/test-fallback",
    );
    AppState::new(acquirer, store, chat)
}
