//! Upstream adapters.
//!
//! Every external data source sits behind [`Adapter`]: a `fetch` that either
//! yields a normalized value or a [`SourceError`]. Wire schemas stay private
//! to each adapter module; callers only ever see canonical records. The
//! acquisition layer decides ordering and fallback, adapters never call each
//! other.

mod cpcb;
mod gemini;
mod scraper;
mod transit;
mod waqi;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::acquire::TtlCache;
use crate::error::SourceError;

pub use cpcb::{normalize_records, CpcbAdapter};
pub use gemini::{ChatClient, ChatMessage, FALLBACK_REPLY};
pub use scraper::{parse_page, ScrapedCity, ScrapedReport, ScraperAdapter};
pub use transit::{decode_feed, simulate_positions, TransitAdapter};
pub use waqi::{WaqiAdapter, WaqiReport, WaqiStation, DELHI_FEEDS};

// ---

/// A single upstream data source.
#[async_trait]
pub trait Adapter<T>: Send + Sync {
    /// Stable identifier used in logs and acquisition metadata.
    fn source_id(&self) -> &'static str;

    async fn fetch(&self) -> Result<T, SourceError>;
}

/// Short-lived cache wrapped around an adapter.
///
/// Several domains read the same upstream (weather and stations both come
/// from the telemetry API), so the adapter's own slot keeps them from issuing
/// duplicate requests inside one TTL window.
pub struct CachedAdapter<T> {
    inner: Arc<dyn Adapter<T>>,
    cache: TtlCache<T>,
}

impl<T> CachedAdapter<T> {
    pub fn new(inner: Arc<dyn Adapter<T>>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: TtlCache::new(ttl),
        }
    }
}

#[async_trait]
impl<T> Adapter<T> for CachedAdapter<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn source_id(&self) -> &'static str {
        self.inner.source_id()
    }

    async fn fetch(&self) -> Result<T, SourceError> {
        let inner = Arc::clone(&self.inner);
        let payload = self
            .cache
            .get_or_try_refresh(false, || async move { inner.fetch().await })
            .await?;
        Ok(T::clone(&payload))
    }
}

/// GET `url` and decode a JSON body, mapping every failure onto [`SourceError`].
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    source_id: &'static str,
    url: &str,
) -> Result<T, SourceError> {
    // ---
    let resp = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| SourceError::from_reqwest(source_id, e))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(SourceError::unavailable(source_id, format!("HTTP {status}")));
    }

    resp.json::<T>()
        .await
        .map_err(|e| SourceError::from_reqwest(source_id, e))
}

/// Read a JSON number that may have been sent as a string.
pub(crate) fn loose_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}
