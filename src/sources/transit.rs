//! City bus vehicle positions, plus the simulator used when the live feed
//! is unavailable.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rand::Rng;
use serde::Deserialize;

use super::{loose_number, Adapter};
use crate::error::SourceError;
use crate::models::{BusPosition, BusRoute, BusType};

const SOURCE_ID: &str = "transit";

// --- wire schema (GTFS-realtime FeedMessage, JSON encoding)

#[derive(Debug, Deserialize)]
struct FeedMessage {
    #[serde(default)]
    entity: Vec<FeedEntity>,
}

#[derive(Debug, Deserialize)]
struct FeedEntity {
    #[serde(default)]
    id: String,
    vehicle: Option<VehiclePosition>,
}

#[derive(Debug, Deserialize)]
struct VehiclePosition {
    #[serde(default)]
    trip: Option<TripDescriptor>,
    position: Option<Position>,
    #[serde(default)]
    timestamp: serde_json::Value,
    #[serde(default)]
    vehicle: Option<VehicleDescriptor>,
}

#[derive(Debug, Deserialize)]
struct TripDescriptor {
    #[serde(default, alias = "routeId")]
    route_id: String,
}

#[derive(Debug, Deserialize)]
struct Position {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    bearing: Option<f64>,
    /// metres per second
    #[serde(default)]
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct VehicleDescriptor {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    label: Option<String>,
}

fn unix_to_iso(value: &serde_json::Value) -> Option<String> {
    let secs = loose_number(value)? as i64;
    Utc.timestamp_opt(secs, 0).single().map(|ts| ts.to_rfc3339())
}

/// Decode a JSON-encoded GTFS-realtime feed into canonical positions.
///
/// Bus type comes from the matching fixture route; unknown routes are
/// reported as non-electric.
pub fn decode_feed(body: &[u8], routes: &[BusRoute]) -> Result<Vec<BusPosition>, SourceError> {
    // ---
    let feed: FeedMessage =
        serde_json::from_slice(body).map_err(|e| SourceError::malformed(SOURCE_ID, e))?;
    let now = Utc::now().to_rfc3339();

    let positions = feed
        .entity
        .into_iter()
        .filter_map(|entity| {
            let vehicle = entity.vehicle?;
            let position = vehicle.position?;
            let route_id = vehicle.trip.map(|t| t.route_id).unwrap_or_default();
            let route = routes
                .iter()
                .find(|r| r.id == route_id || r.route_number == route_id);
            let vehicle_id = vehicle
                .vehicle
                .and_then(|v| v.label.or(v.id))
                .unwrap_or_else(|| entity.id.clone());

            Some(BusPosition {
                id: entity.id,
                vehicle_id,
                route_id: route.map(|r| r.id.clone()).unwrap_or_else(|| route_id.clone()),
                route_number: route.map(|r| r.route_number.clone()).unwrap_or(route_id),
                lat: position.latitude,
                lng: position.longitude,
                bearing: position.bearing.unwrap_or(0.0).rem_euclid(360.0),
                speed: position.speed.map(|mps| mps * 3.6).unwrap_or(0.0),
                timestamp: unix_to_iso(&vehicle.timestamp).unwrap_or_else(|| now.clone()),
                kind: route.map(|r| r.kind).unwrap_or(BusType::NonElectric),
            })
        })
        .collect();
    Ok(positions)
}

/// Two to four buses per route, placed on a random point of a random segment
/// and heading along it.
pub fn simulate_positions(routes: &[BusRoute], rng: &mut impl Rng) -> Vec<BusPosition> {
    // ---
    let timestamp = Utc::now().to_rfc3339();
    let mut positions = Vec::new();

    for route in routes.iter().filter(|r| !r.coordinates.is_empty()) {
        let bus_count = rng.gen_range(2..=4);
        let segments = route.coordinates.len().saturating_sub(1).max(1);

        for i in 0..bus_count {
            let segment = rng.gen_range(0..segments);
            let progress: f64 = rng.gen();

            let [lat1, lng1] = route.coordinates[segment];
            let [lat2, lng2] = route
                .coordinates
                .get(segment + 1)
                .copied()
                .unwrap_or(route.coordinates[segment]);

            let bearing = (lng2 - lng1).atan2(lat2 - lat1).to_degrees();

            positions.push(BusPosition {
                id: format!("{}-bus-{i}", route.id),
                vehicle_id: format!("DL{}", rng.gen_range(1000..=9999)),
                route_id: route.id.clone(),
                route_number: route.route_number.clone(),
                lat: lat1 + (lat2 - lat1) * progress,
                lng: lng1 + (lng2 - lng1) * progress,
                bearing: (bearing + 360.0) % 360.0,
                speed: rng.gen_range(15.0..40.0),
                timestamp: timestamp.clone(),
                kind: route.kind,
            });
        }
    }
    positions
}

// --- adapter

pub struct TransitAdapter {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    routes: Vec<BusRoute>,
}

impl TransitAdapter {
    pub fn new(
        client: reqwest::Client,
        url: impl Into<String>,
        api_key: Option<String>,
        routes: Vec<BusRoute>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            api_key,
            routes,
        }
    }
}

#[async_trait]
impl Adapter<Vec<BusPosition>> for TransitAdapter {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    async fn fetch(&self) -> Result<Vec<BusPosition>, SourceError> {
        // ---
        let api_key = self.api_key.as_deref().ok_or(SourceError::Unconfigured(SOURCE_ID))?;

        let resp = self
            .client
            .get(&self.url)
            .query(&[("key", api_key)])
            .header(reqwest::header::ACCEPT, "application/json, application/x-protobuf")
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(SOURCE_ID, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::unavailable(SOURCE_ID, format!("HTTP {status}")));
        }

        let is_json = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("json"));
        if !is_json {
            return Err(SourceError::malformed(
                SOURCE_ID,
                "binary protobuf feed; only the JSON encoding is decoded",
            ));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| SourceError::from_reqwest(SOURCE_ID, e))?;
        let positions = decode_feed(&body, &self.routes)?;
        if positions.is_empty() {
            return Err(SourceError::EmptyPayload(SOURCE_ID));
        }
        tracing::info!("transit: {} vehicle positions", positions.len());
        Ok(positions)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::fixtures;

    #[test]
    fn test_simulated_buses_stay_on_their_route() {
        // ---
        let routes = fixtures::bus_routes();
        let positions = simulate_positions(&routes, &mut StdRng::seed_from_u64(42));

        for route in &routes {
            let on_route: Vec<_> = positions.iter().filter(|p| p.route_id == route.id).collect();
            assert!((2..=4).contains(&on_route.len()), "{} has {}", route.id, on_route.len());

            let (min_lat, max_lat) = route
                .coordinates
                .iter()
                .fold((f64::MAX, f64::MIN), |(lo, hi), c| (lo.min(c[0]), hi.max(c[0])));
            for bus in on_route {
                assert!(bus.lat >= min_lat - 1e-9 && bus.lat <= max_lat + 1e-9);
                assert!((0.0..360.0).contains(&bus.bearing));
                assert!((15.0..40.0).contains(&bus.speed));
                assert!(bus.vehicle_id.starts_with("DL"));
                assert_eq!(bus.kind, route.kind);
            }
        }
    }

    #[test]
    fn test_decode_json_feed() {
        // ---
        let routes = fixtures::bus_routes();
        let body = br#"{
            "header": { "gtfsRealtimeVersion": "2.0" },
            "entity": [
                { "id": "v1", "vehicle": {
                    "trip": { "routeId": "E-1" },
                    "position": { "latitude": 28.55, "longitude": 77.21, "bearing": -90, "speed": 10 },
                    "timestamp": "1765128600",
                    "vehicle": { "id": "9001", "label": "DL1PC5566" } } },
                { "id": "v2", "vehicle": {
                    "trip": { "route_id": "999" },
                    "position": { "latitude": 28.6, "longitude": 77.1 } } },
                { "id": "alert-only" }
            ]
        }"#;
        let positions = decode_feed(body, &routes).unwrap();

        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].route_id, "dtc-e1");
        assert_eq!(positions[0].vehicle_id, "DL1PC5566");
        assert_eq!(positions[0].kind, BusType::Electric);
        assert_eq!(positions[0].bearing, 270.0);
        assert_eq!(positions[0].speed, 36.0);
        assert!(positions[0].timestamp.starts_with("2025-12-07"));

        assert_eq!(positions[1].route_id, "999");
        assert_eq!(positions[1].vehicle_id, "v2");
        assert_eq!(positions[1].kind, BusType::NonElectric);
    }

    #[test]
    fn test_decode_rejects_non_json() {
        // ---
        let err = decode_feed(&[0x0a, 0x0d, 0x12], &[]).unwrap_err();
        assert_eq!(err.class(), "malformed-payload");
    }
}
