//! Government open-data API (`data.gov.in` real-time AQI resource).

use std::collections::HashSet;

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;

use super::{get_json, loose_number, Adapter};
use crate::error::SourceError;
use crate::models::{Pollutants, Station, StationType};

const SOURCE_ID: &str = "cpcb";
const RESOURCE: &str = "3b01bcb8-0b14-4abf-b6f2-c1bfd384ba69";

// --- wire schema

#[derive(Debug, Deserialize)]
struct RecordsEnvelope {
    #[serde(default)]
    records: Vec<Record>,
}

/// One pollutant row. The API sends numbers as strings, and "NA" for gaps.
#[derive(Debug, Clone, Deserialize)]
pub struct Record {
    #[serde(default)]
    station: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    pollutant_avg: serde_json::Value,
    #[serde(default)]
    last_update: Option<String>,
    #[serde(default)]
    latitude: serde_json::Value,
    #[serde(default)]
    longitude: serde_json::Value,
}

/// Canonical stations from open-data records.
///
/// Records without coordinates are dropped, and only the first row per station
/// name is kept (the resource has one row per pollutant). A record without an
/// average gets an index drawn from 150–300 and is tagged `synthetic`.
pub fn normalize_records(records: &[Record], rng: &mut impl Rng) -> Vec<Station> {
    // ---
    let mut seen = HashSet::new();
    let mut stations = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let (Some(lat), Some(lng)) = (loose_number(&record.latitude), loose_number(&record.longitude))
        else {
            continue;
        };
        if lat == 0.0 || lng == 0.0 || !seen.insert(record.station.to_lowercase()) {
            continue;
        }

        let measured = loose_number(&record.pollutant_avg).filter(|v| *v > 0.0);
        let aqi = match measured {
            Some(avg) => avg.round() as i32,
            None => rng.gen_range(150..=300),
        };

        let mut station = Station::new(format!("cpcb-{index}"), aqi, StationType::Government)
            .named(record.station.clone(), format!("{}, {}", record.city, record.state))
            .at(lat, lng)
            .with_pollutants(Pollutants::estimated_from_particulates(
                (f64::from(aqi) * 0.6).round(),
                (f64::from(aqi) * 1.1).round(),
            ))
            .updated_at(
                record
                    .last_update
                    .clone()
                    .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
            );
        station.synthetic = measured.is_none();
        stations.push(station);
    }
    stations
}

// --- adapter

pub struct CpcbAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl CpcbAdapter {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl Adapter<Vec<Station>> for CpcbAdapter {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    async fn fetch(&self) -> Result<Vec<Station>, SourceError> {
        // ---
        let api_key = self.api_key.as_deref().ok_or(SourceError::Unconfigured(SOURCE_ID))?;
        let url = format!(
            "{}/resource/{RESOURCE}?api-key={api_key}&format=json&filters[state]=Delhi&limit=50",
            self.base_url
        );

        let envelope: RecordsEnvelope = get_json(&self.client, SOURCE_ID, &url).await?;
        let stations = normalize_records(&envelope.records, &mut rand::thread_rng());
        if stations.is_empty() {
            return Err(SourceError::EmptyPayload(SOURCE_ID));
        }

        tracing::info!(
            "cpcb: {} stations from {} records",
            stations.len(),
            envelope.records.len()
        );
        Ok(stations)
    }
}
