//! REST client for the realtime store.
//!
//! Paths follow the store's JSON tree: `stations/{id}` for sensor pushes,
//! `purifiers/{id}` for purifier state. Writes are whole-field PATCHes with
//! no conditional check; the last write per field wins.

use std::collections::BTreeMap;

use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::merge::{snapshot_from_value, Snapshot};
use crate::error::SourceError;
use crate::purifier::{PurifierRecord, PurifierUpdate};

const SOURCE_ID: &str = "realtime-store";

// ---

#[derive(Debug, Clone)]
pub struct RealtimeStore {
    client: reqwest::Client,
    db_url: Option<String>,
    auth: Option<String>,
}

impl RealtimeStore {
    pub fn new(client: reqwest::Client, db_url: Option<String>, auth: Option<String>) -> Self {
        Self {
            client,
            db_url: db_url.map(|url| url.trim_end_matches('/').to_string()),
            auth,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.db_url.is_some()
    }

    /// `{db}/{segments...}.json`, each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, SourceError> {
        // ---
        let base = self.db_url.as_deref().ok_or(SourceError::Unconfigured(SOURCE_ID))?;
        let mut url = Url::parse(base).map_err(|e| SourceError::unavailable(SOURCE_ID, e))?;

        let last = segments.len().saturating_sub(1);
        let mut parts: Vec<String> = segments.iter().map(|s| s.to_string()).collect();
        if let Some(tail) = parts.get_mut(last) {
            tail.push_str(".json");
        }

        url.path_segments_mut()
            .map_err(|_| SourceError::unavailable(SOURCE_ID, "database URL cannot be a base"))?
            .pop_if_empty()
            .extend(parts.iter().map(String::as_str));

        if let Some(auth) = &self.auth {
            url.query_pairs_mut().append_pair("auth", auth);
        }
        Ok(url)
    }

    async fn send<T, B>(&self, method: Method, segments: &[&str], body: Option<&B>) -> Result<T, SourceError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        // ---
        let url = self.url(segments)?;
        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(SOURCE_ID, e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            tracing::warn!("realtime store {method} {} -> {status}", segments.join("/"));
            return Err(SourceError::unavailable(
                SOURCE_ID,
                format!("HTTP {status} {}", text.trim()),
            ));
        }

        resp.json::<T>()
            .await
            .map_err(|e| SourceError::from_reqwest(SOURCE_ID, e))
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, SourceError> {
        self.send::<T, Value>(Method::GET, segments, None).await
    }

    /// Current `stations` node, normalized. An empty node is an empty snapshot.
    pub async fn stations_snapshot(&self) -> Result<Snapshot, SourceError> {
        let raw: Value = self.get(&["stations"]).await?;
        Ok(snapshot_from_value(raw))
    }

    /// The stored record for `id`; a missing node reads as all-default.
    pub async fn read_purifier(&self, id: &str) -> Result<PurifierRecord, SourceError> {
        // ---
        let raw: Value = self.get(&["purifiers", id]).await?;
        if raw.is_null() {
            return Ok(PurifierRecord::default());
        }
        serde_json::from_value(raw).map_err(|e| SourceError::malformed(SOURCE_ID, e))
    }

    pub async fn list_purifiers(&self) -> Result<BTreeMap<String, PurifierRecord>, SourceError> {
        // ---
        let raw: Value = self.get(&["purifiers"]).await?;
        let Value::Object(entries) = raw else {
            return Ok(BTreeMap::new());
        };
        Ok(entries
            .into_iter()
            .filter_map(|(id, value)| match serde_json::from_value(value) {
                Ok(record) => Some((id, record)),
                Err(err) => {
                    tracing::debug!("purifier {id} skipped: {err}");
                    None
                }
            })
            .collect())
    }

    /// PATCH `purifiers/{id}` with a state-machine update.
    pub async fn patch_purifier(&self, id: &str, update: &PurifierUpdate) -> Result<Value, SourceError> {
        self.patch_purifier_raw(id, update).await
    }

    /// PATCH `purifiers/{id}` with arbitrary fields. Returns what the store echoed.
    pub async fn patch_purifier_raw<B>(&self, id: &str, fields: &B) -> Result<Value, SourceError>
    where
        B: Serialize + ?Sized,
    {
        tracing::info!("patching purifier {id}");
        self.send(Method::PATCH, &["purifiers", id], Some(fields)).await
    }

    /// Replace `stations/{id}` with `fields`, stamping `lastUpdated` with now.
    pub async fn update_station(
        &self,
        id: &str,
        mut fields: serde_json::Map<String, Value>,
    ) -> Result<Value, SourceError> {
        // ---
        fields.insert(
            "lastUpdated".to_string(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );
        tracing::info!("updating station {id} in realtime store");
        self.send(Method::PUT, &["stations", id], Some(&fields)).await
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_unconfigured_store_fails_before_io() {
        // ---
        let store = RealtimeStore::new(reqwest::Client::new(), None, None);
        assert!(!store.is_configured());
        let err = store.url(&["stations"]).unwrap_err();
        assert_eq!(err.class(), "unconfigured");
    }

    #[tokio::test]
    async fn test_unconfigured_reads_return_unconfigured() {
        // ---
        let store = RealtimeStore::new(reqwest::Client::new(), None, None);
        let err = store.read_purifier("MHXY_001").await.unwrap_err();
        assert!(matches!(err, SourceError::Unconfigured(_)));
    }

    #[test]
    fn test_url_encodes_ids_and_auth() {
        // ---
        let store = RealtimeStore::new(
            reqwest::Client::new(),
            Some("https://demo-rtdb.example.com/".to_string()),
            Some("s3cret".to_string()),
        );
        let url = store.url(&["purifiers", "MHXY 001/x"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://demo-rtdb.example.com/purifiers/MHXY%20001%2Fx.json?auth=s3cret"
        );

        let bare = RealtimeStore::new(
            reqwest::Client::new(),
            Some("https://demo-rtdb.example.com".to_string()),
            None,
        );
        assert_eq!(
            bare.url(&["stations"]).unwrap().as_str(),
            "https://demo-rtdb.example.com/stations.json"
        );
    }
}
