//! Postgres mirror of realtime station pushes.
//!
//! Every accepted push upserts the station's latest row and appends one
//! reading. Pushes whose `lastUpdated` matches the last one archived for
//! that station are skipped.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::realtime::{Snapshot, StationPatch};

// ---

/// Remembers the last archived `lastUpdated` per station.
#[derive(Debug, Default)]
pub struct DedupFilter {
    seen: HashMap<String, String>,
}

impl DedupFilter {
    /// A push without a timestamp is never considered a duplicate.
    pub fn is_duplicate(&self, station_id: &str, last_updated: Option<&str>) -> bool {
        match (self.seen.get(station_id), last_updated) {
            (Some(seen), Some(ts)) => seen == ts,
            _ => false,
        }
    }

    pub fn mark(&mut self, station_id: &str, last_updated: Option<&str>) {
        if let Some(ts) = last_updated.filter(|ts| !ts.is_empty()) {
            self.seen.insert(station_id.to_string(), ts.to_string());
        }
    }
}

/// When the reading was taken: the pushed timestamp, or now if absent or unparseable.
fn data_timestamp(patch: &StationPatch) -> DateTime<Utc> {
    patch
        .last_updated
        .as_deref()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

pub struct Archive {
    pool: PgPool,
    dedup: Mutex<DedupFilter>,
}

impl Archive {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            dedup: Mutex::new(DedupFilter::default()),
        }
    }

    /// Archive every new entry of `snapshot`. Returns how many were written.
    ///
    /// A failing station is logged and the rest of the batch continues.
    pub async fn record_snapshot(&self, snapshot: &Snapshot) -> usize {
        // ---
        let mut dedup = self.dedup.lock().await;
        let mut written = 0;

        for (station_id, patch) in snapshot {
            let ts = patch.last_updated.as_deref();
            if dedup.is_duplicate(station_id, ts) {
                continue;
            }
            match self.store_station(station_id, patch).await {
                Ok(()) => {
                    dedup.mark(station_id, ts);
                    written += 1;
                }
                Err(e) => tracing::error!("archive failed for station {station_id}: {e}"),
            }
        }

        if written > 0 {
            tracing::debug!("archived {written} of {} realtime entries", snapshot.len());
        }
        written
    }

    async fn store_station(&self, station_id: &str, patch: &StationPatch) -> Result<(), sqlx::Error> {
        // ---
        let name = patch
            .name
            .clone()
            .or_else(|| patch.device_id.clone())
            .unwrap_or_else(|| station_id.to_string());
        let taken_at = data_timestamp(patch);
        let p = &patch.pollutants;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO stations (
                station_id, name, location, lat, lng, device_id, device_model,
                battery, latest_aqi, latest_pm25, latest_pm10, latest_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (station_id) DO UPDATE SET
                name         = EXCLUDED.name,
                location     = COALESCE(NULLIF(EXCLUDED.location, ''), stations.location),
                lat          = COALESCE(EXCLUDED.lat, stations.lat),
                lng          = COALESCE(EXCLUDED.lng, stations.lng),
                device_id    = COALESCE(EXCLUDED.device_id, stations.device_id),
                device_model = COALESCE(EXCLUDED.device_model, stations.device_model),
                battery      = COALESCE(EXCLUDED.battery, stations.battery),
                latest_aqi   = EXCLUDED.latest_aqi,
                latest_pm25  = EXCLUDED.latest_pm25,
                latest_pm10  = EXCLUDED.latest_pm10,
                latest_at    = EXCLUDED.latest_at,
                updated_at   = now()
            "#,
        )
        .bind(station_id)
        .bind(&name)
        .bind(patch.location.as_deref().unwrap_or(""))
        .bind(patch.lat)
        .bind(patch.lng)
        .bind(&patch.device_id)
        .bind(&patch.device_model)
        .bind(patch.battery)
        .bind(patch.aqi)
        .bind(p.pm25)
        .bind(p.pm10)
        .bind(taken_at)
        .execute(&mut *tx)
        .await?;

        let sensor_readings = (!patch.sensor_readings.is_empty())
            .then(|| serde_json::to_string(&patch.sensor_readings).ok())
            .flatten();

        sqlx::query(
            r#"
            INSERT INTO station_readings (
                id, station_id, aqi, pm25, pm10, co, no2, so2, o3,
                eco2_ppm, tvoc_ppb, lat, lng, battery, device_id, device_model,
                sensor_readings, data_timestamp
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(station_id)
        .bind(patch.aqi)
        .bind(p.pm25)
        .bind(p.pm10)
        .bind(p.co)
        .bind(p.no2)
        .bind(p.so2)
        .bind(p.o3)
        .bind(p.eco2_ppm)
        .bind(p.tvoc_ppb)
        .bind(patch.lat)
        .bind(patch.lng)
        .bind(patch.battery)
        .bind(&patch.device_id)
        .bind(&patch.device_model)
        .bind(sensor_readings)
        .bind(taken_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }
}
