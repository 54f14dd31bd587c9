//! Primary telemetry API (`api.waqi.info` city feeds).

use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;

use super::{get_json, loose_number, Adapter};
use crate::error::SourceError;
use crate::models::{Pollutants, Station, StationType};

const SOURCE_ID: &str = "waqi";

/// Feed id, display name and fallback coordinates. The first entry is the
/// aggregate city feed; the adapter fails when it is unavailable.
pub const DELHI_FEEDS: &[(&str, &str, f64, f64)] = &[
    ("@7030", "Delhi", 28.6139, 77.2090),
    ("@7031", "Anand Vihar, Delhi", 28.6469, 77.3164),
    ("@11354", "Punjabi Bagh, Delhi", 28.6683, 77.1231),
    ("@11348", "RK Puram, Delhi", 28.5651, 77.1752),
    ("@11349", "Mandir Marg, Delhi", 28.6369, 77.2010),
];

// --- wire schema

#[derive(Debug, Deserialize)]
struct FeedEnvelope {
    status: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct Feed {
    /// A number, or `"-"` when the station has no current reading.
    aqi: serde_json::Value,
    #[serde(default)]
    city: FeedCity,
    #[serde(default)]
    iaqi: HashMap<String, FeedValue>,
    #[serde(default)]
    time: FeedTime,
}

#[derive(Debug, Default, Deserialize)]
struct FeedCity {
    #[serde(default)]
    name: String,
    #[serde(default)]
    geo: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct FeedValue {
    v: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct FeedTime {
    #[serde(default)]
    iso: Option<String>,
}

impl Feed {
    fn reading(&self, key: &str) -> Option<f64> {
        self.iaqi.get(key).and_then(|value| loose_number(&value.v))
    }
}

// --- canonical output

/// One per-station reading from a feed.
#[derive(Debug, Clone, PartialEq)]
pub struct WaqiStation {
    pub name: String,
    pub aqi: i32,
    pub pollutants: Pollutants,
    pub lat: f64,
    pub lng: f64,
}

/// Aggregate city reading plus whatever individual feeds answered.
#[derive(Debug, Clone, PartialEq)]
pub struct WaqiReport {
    pub aqi: i32,
    pub pm25: f64,
    pub pm10: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub pressure: f64,
    pub city_name: String,
    pub last_updated: String,
    pub stations: Vec<WaqiStation>,
}

impl WaqiReport {
    /// Canonical station records, ids `waqi-{n}` in feed order.
    pub fn to_stations(&self) -> Vec<Station> {
        // ---
        self.stations
            .iter()
            .enumerate()
            .map(|(index, reading)| {
                Station::new(format!("waqi-{index}"), reading.aqi, StationType::CommunityApi)
                    .named(reading.name.clone(), "Delhi, India")
                    .at(reading.lat, reading.lng)
                    .with_pollutants(reading.pollutants.clone())
                    .updated_at(self.last_updated.clone())
            })
            .collect()
    }
}

fn estimated_pm25(aqi: i32) -> f64 {
    (f64::from(aqi) * 0.7).round()
}

fn estimated_pm10(aqi: i32) -> f64 {
    (f64::from(aqi) * 1.1).round()
}

/// Decode one feed response body. `None` when the feed reported an error or
/// carries no numeric AQI.
fn normalize_feed(envelope: FeedEnvelope, fallback: (&str, f64, f64)) -> Option<(Feed, WaqiStation)> {
    // ---
    if envelope.status != "ok" {
        tracing::debug!("waqi feed {} returned status {}", fallback.0, envelope.status);
        return None;
    }
    let feed: Feed = serde_json::from_value(envelope.data).ok()?;
    let aqi = loose_number(&feed.aqi)?.round() as i32;

    let (name, lat, lng) = fallback;
    let pollutants = Pollutants {
        pm25: Some(feed.reading("pm25").unwrap_or_else(|| estimated_pm25(aqi))),
        pm10: Some(feed.reading("pm10").unwrap_or_else(|| estimated_pm10(aqi))),
        co: Some(feed.reading("co").unwrap_or(1.5)),
        no2: Some(feed.reading("no2").unwrap_or(45.0)),
        so2: Some(feed.reading("so2").unwrap_or(15.0)),
        o3: Some(feed.reading("o3").unwrap_or(30.0)),
        ..Pollutants::default()
    };
    let station = WaqiStation {
        name: if feed.city.name.is_empty() {
            name.to_string()
        } else {
            feed.city.name.clone()
        },
        aqi,
        pollutants,
        lat: feed.city.geo.first().copied().filter(|v| *v != 0.0).unwrap_or(lat),
        lng: feed.city.geo.get(1).copied().filter(|v| *v != 0.0).unwrap_or(lng),
    };
    Some((feed, station))
}

// --- adapter

pub struct WaqiAdapter {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl WaqiAdapter {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    async fn feed(&self, token: &str, feed_id: &str) -> Result<FeedEnvelope, SourceError> {
        let url = format!("{}/feed/{}/?token={}", self.base_url, feed_id, token);
        get_json(&self.client, SOURCE_ID, &url).await
    }
}

#[async_trait]
impl Adapter<WaqiReport> for WaqiAdapter {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    async fn fetch(&self) -> Result<WaqiReport, SourceError> {
        // ---
        let token = self.token.as_deref().ok_or(SourceError::Unconfigured(SOURCE_ID))?;

        let (primary_id, primary_name, lat, lng) = DELHI_FEEDS[0];
        let envelope = self.feed(token, primary_id).await?;
        let (feed, primary) = normalize_feed(envelope, (primary_name, lat, lng))
            .ok_or(SourceError::EmptyPayload(SOURCE_ID))?;

        let additional = join_all(
            DELHI_FEEDS[1..]
                .iter()
                .map(|(feed_id, _, _, _)| self.feed(token, feed_id)),
        )
        .await;

        let mut stations = vec![primary.clone()];
        for (result, (feed_id, name, lat, lng)) in additional.into_iter().zip(&DELHI_FEEDS[1..]) {
            match result {
                Ok(envelope) => {
                    if let Some((_, station)) = normalize_feed(envelope, (name, *lat, *lng)) {
                        stations.push(station);
                    }
                }
                Err(err) => tracing::debug!("waqi feed {feed_id} skipped: {err}"),
            }
        }

        let report = WaqiReport {
            aqi: primary.aqi,
            pm25: primary.pollutants.pm25.unwrap_or_else(|| estimated_pm25(primary.aqi)),
            pm10: primary.pollutants.pm10.unwrap_or_else(|| estimated_pm10(primary.aqi)),
            temperature: feed.reading("t").unwrap_or(20.0),
            humidity: feed.reading("h").unwrap_or(50.0),
            wind_speed: feed.reading("w").unwrap_or(5.0),
            pressure: feed.reading("p").unwrap_or(1013.0),
            city_name: primary.name.clone(),
            last_updated: feed
                .time
                .iso
                .clone()
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
            stations,
        };
        tracing::info!(
            "waqi: Delhi AQI = {}, PM2.5 = {}, PM10 = {} ({} feeds)",
            report.aqi,
            report.pm25,
            report.pm10,
            report.stations.len()
        );
        Ok(report)
    }
}
