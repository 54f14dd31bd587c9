//! Merging realtime store snapshots into a station list.
//!
//! Raw store payloads are normalized once into a [`StationPatch`] (alias
//! keys resolved through [`PATCH_ALIASES`]); [`merge`] then applies patches
//! field by field. Existing stations keep their order, unknown ids are
//! appended in snapshot order.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

use crate::models::{DeviceInfo, Pollutants, Station, StationType};
use crate::sources::loose_number;

// ---

/// Device field names and the canonical field each one feeds.
///
/// The canonical name wins when a payload carries both.
pub const PATCH_ALIASES: &[(&str, &str)] = &[
    ("pm2_5", "pm25"),
    ("sgp_eco2_ppm", "eco2_ppm"),
    ("sgp_tvoc_ppb", "tvoc_ppb"),
];

/// Raw sensor channels copied verbatim into `device.sensor_readings`.
pub const SENSOR_KEYS: &[&str] = &[
    "eco2_ppm",
    "tvoc_ppb",
    "mq135_raw",
    "mq135_voltage",
    "mq2_ppm",
    "mq2_raw",
    "mq2_voltage",
    "mq7_ppm",
    "mq7_raw",
    "mq7_voltage",
    "sgp_eco2_ppm",
    "sgp_tvoc_ppb",
];

/// A partial station as pushed by the realtime store. `None` leaves the
/// existing field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationPatch {
    pub aqi: Option<i32>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub last_updated: Option<String>,
    pub pollutants: Pollutants,
    pub device_id: Option<String>,
    pub device_model: Option<String>,
    pub battery: Option<f64>,
    pub sensor_readings: BTreeMap<String, Value>,
}

/// Station id → patch, in the store's key order.
pub type Snapshot = BTreeMap<String, StationPatch>;

fn text(raw: &Map<String, Value>, key: &str) -> Option<String> {
    match raw.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Canonical-or-alias numeric lookup.
fn reading(raw: &Map<String, Value>, canonical: &str) -> Option<f64> {
    raw.get(canonical).and_then(loose_number).or_else(|| {
        PATCH_ALIASES
            .iter()
            .filter(|(_, target)| *target == canonical)
            .find_map(|(alias, _)| raw.get(*alias).and_then(loose_number))
    })
}

impl StationPatch {
    /// Normalize one raw store payload.
    pub fn from_raw(raw: &Map<String, Value>) -> Self {
        // ---
        let pollutants = Pollutants {
            pm25: reading(raw, "pm25"),
            pm10: reading(raw, "pm10"),
            co: reading(raw, "co"),
            no2: reading(raw, "no2"),
            so2: reading(raw, "so2"),
            o3: reading(raw, "o3"),
            voc: reading(raw, "voc"),
            eco2_ppm: reading(raw, "eco2_ppm"),
            tvoc_ppb: reading(raw, "tvoc_ppb"),
        };

        let sensor_readings = SENSOR_KEYS
            .iter()
            .filter_map(|key| {
                raw.get(*key)
                    .filter(|v| !v.is_null())
                    .map(|v| (key.to_string(), v.clone()))
            })
            .collect();

        Self {
            aqi: raw.get("aqi").and_then(loose_number).map(|n| n.round() as i32),
            name: text(raw, "name"),
            location: text(raw, "location"),
            lat: raw.get("lat").and_then(loose_number),
            lng: raw.get("lng").and_then(loose_number),
            last_updated: text(raw, "lastUpdated"),
            pollutants,
            device_id: text(raw, "deviceId"),
            device_model: text(raw, "deviceModel"),
            battery: raw.get("battery").and_then(loose_number),
            sensor_readings,
        }
    }

    fn has_device_fields(&self) -> bool {
        self.device_id.is_some()
            || self.device_model.is_some()
            || self.battery.is_some()
            || !self.sensor_readings.is_empty()
    }
}

/// Normalize a whole `stations` node. Entries that are not objects are skipped.
pub fn snapshot_from_value(value: Value) -> Snapshot {
    // ---
    let Value::Object(entries) = value else {
        return Snapshot::new();
    };
    entries
        .into_iter()
        .filter_map(|(id, raw)| match raw {
            Value::Object(raw) => Some((id, StationPatch::from_raw(&raw))),
            _ => {
                tracing::debug!("realtime entry {id} is not an object, skipped");
                None
            }
        })
        .collect()
}

fn overlay(target: &mut Option<f64>, incoming: Option<f64>) {
    if incoming.is_some() {
        *target = incoming;
    }
}

fn overlay_pollutants(target: &mut Pollutants, incoming: &Pollutants) {
    overlay(&mut target.pm25, incoming.pm25);
    overlay(&mut target.pm10, incoming.pm10);
    overlay(&mut target.co, incoming.co);
    overlay(&mut target.no2, incoming.no2);
    overlay(&mut target.so2, incoming.so2);
    overlay(&mut target.o3, incoming.o3);
    overlay(&mut target.voc, incoming.voc);
    overlay(&mut target.eco2_ppm, incoming.eco2_ppm);
    overlay(&mut target.tvoc_ppb, incoming.tvoc_ppb);
}

fn overlay_device(target: &mut Option<DeviceInfo>, patch: &StationPatch) {
    // ---
    if !patch.has_device_fields() {
        return;
    }
    let device = target.get_or_insert_with(DeviceInfo::default);
    if let Some(id) = &patch.device_id {
        device.device_id = Some(id.clone());
    }
    if let Some(model) = &patch.device_model {
        device.device_model = Some(model.clone());
    }
    if patch.battery.is_some() {
        device.battery = patch.battery;
    }
    device
        .sensor_readings
        .extend(patch.sensor_readings.iter().map(|(k, v)| (k.clone(), v.clone())));
}

/// Apply `patch` on top of `station`, field by field.
pub fn apply_patch(station: &mut Station, patch: &StationPatch) {
    // ---
    if let (Some(incoming), false) = (&patch.last_updated, station.last_updated.is_empty()) {
        // ISO-8601 strings in one zone order lexicographically
        if incoming.as_str() < station.last_updated.as_str() {
            tracing::warn!(
                "station {}: applying snapshot older than held data ({incoming} < {})",
                station.id,
                station.last_updated
            );
        }
    }

    if let Some(aqi) = patch.aqi {
        station.set_aqi(aqi);
    }
    if let Some(name) = &patch.name {
        station.name = name.clone();
    }
    if let Some(location) = &patch.location {
        station.location = location.clone();
    }
    if let Some(lat) = patch.lat {
        station.lat = lat;
    }
    if let Some(lng) = patch.lng {
        station.lng = lng;
    }
    if let Some(ts) = &patch.last_updated {
        station.last_updated = ts.clone();
    }
    overlay_pollutants(&mut station.pollutants, &patch.pollutants);
    overlay_device(&mut station.device, patch);
}

/// A station known only from the realtime store.
fn new_station(id: &str, patch: &StationPatch) -> Station {
    // ---
    let name = patch
        .name
        .clone()
        .or_else(|| patch.device_id.clone())
        .unwrap_or_else(|| format!("Device {id}"));

    let zero = |v: Option<f64>| Some(v.unwrap_or(0.0));
    let p = &patch.pollutants;
    let pollutants = Pollutants {
        pm25: zero(p.pm25),
        pm10: zero(p.pm10),
        co: zero(p.co),
        no2: zero(p.no2),
        so2: zero(p.so2),
        o3: zero(p.o3),
        ..p.clone()
    };

    let mut station = Station::new(id, patch.aqi.unwrap_or(0), StationType::PranameshDevice)
        .named(name, patch.location.clone().unwrap_or_default())
        .at(patch.lat.unwrap_or(0.0), patch.lng.unwrap_or(0.0))
        .with_pollutants(pollutants)
        .updated_at(
            patch
                .last_updated
                .clone()
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
        );
    station.device = Some(DeviceInfo {
        device_id: patch.device_id.clone(),
        device_model: patch.device_model.clone(),
        battery: patch.battery,
        sensor_readings: patch.sensor_readings.clone(),
    });
    station
}

/// Merge a realtime snapshot into `current`.
///
/// Every id in `current` keeps its position; ids only the snapshot knows
/// are appended in snapshot order. Status always follows the merged AQI.
pub fn merge(current: &[Station], snapshot: &Snapshot) -> Vec<Station> {
    // ---
    let mut merged = current.to_vec();
    let index: HashMap<&str, usize> = current
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();

    for (id, patch) in snapshot {
        match index.get(id.as_str()) {
            Some(&i) => apply_patch(&mut merged[i], patch),
            None => merged.push(new_station(id, patch)),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    // ---
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::aqi::classify;

    fn station(id: &str, aqi: i32) -> Station {
        Station::new(id, aqi, StationType::Government)
            .named(id.to_uppercase(), "Delhi")
            .at(28.6, 77.2)
            .with_pollutants(Pollutants::core(50.0, 80.0, 1.0, 40.0, 10.0, 30.0))
            .updated_at("2025-12-07T22:00:00Z")
    }

    fn patch(value: Value) -> StationPatch {
        match value {
            Value::Object(raw) => StationPatch::from_raw(&raw),
            _ => unreachable!(),
        }
    }

    fn snapshot(entries: &[(&str, Value)]) -> Snapshot {
        entries
            .iter()
            .map(|(id, raw)| (id.to_string(), patch(raw.clone())))
            .collect()
    }

    #[test]
    fn test_merge_preserves_order() {
        // ---
        let current = vec![station("a", 40), station("b", 120), station("c", 250)];
        let merged = merge(&current, &snapshot(&[("b", json!({ "aqi": 77 }))]));

        let ids: Vec<_> = merged.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(merged[1].aqi(), 77);
        assert_eq!(merged[1].status(), classify(77));

        let mut expected = current[1].clone();
        expected.set_aqi(77);
        assert_eq!(merged[1], expected);
        assert_eq!(merged[0], current[0]);
        assert_eq!(merged[2], current[2]);
    }

    #[test]
    fn test_merge_appends_unknown_ids() {
        // ---
        let current = vec![station("a", 40)];
        let merged = merge(&current, &snapshot(&[("z", json!({ "aqi": 10 }))]));

        assert_eq!(merged.len(), 2);
        let z = &merged[1];
        assert_eq!(z.id, "z");
        assert_eq!(z.status(), classify(10));
        assert_eq!(z.name, "Device z");
        assert_eq!((z.lat, z.lng), (0.0, 0.0));
        assert_eq!(z.pollutants.pm25, Some(0.0));
        assert_eq!(z.pollutants.eco2_ppm, None);
        assert_eq!(z.kind, StationType::PranameshDevice);
        assert!(!z.last_updated.is_empty());
    }

    #[test]
    fn test_field_level_override() {
        // ---
        let mut a = Station::new("a", 100, StationType::Government);
        a.pollutants = Pollutants {
            pm25: Some(50.0),
            pm10: Some(80.0),
            ..Pollutants::default()
        };
        let merged = merge(&[a], &snapshot(&[("a", json!({ "pm25": 60 }))]));

        assert_eq!(merged[0].pollutants.pm25, Some(60.0));
        assert_eq!(merged[0].pollutants.pm10, Some(80.0));
        assert_eq!(merged[0].aqi(), 100);
        assert!(merged[0].device.is_none());
    }

    #[test]
    fn test_alias_resolution() {
        // ---
        let p = patch(json!({
            "pm2_5": 41.5,
            "sgp_eco2_ppm": 620,
            "eco2_ppm": 640,
            "sgp_tvoc_ppb": "118"
        }));
        assert_eq!(p.pollutants.pm25, Some(41.5));
        assert_eq!(p.pollutants.eco2_ppm, Some(640.0));
        assert_eq!(p.pollutants.tvoc_ppb, Some(118.0));

        let explicit = patch(json!({ "pm25": 12, "pm2_5": 99 }));
        assert_eq!(explicit.pollutants.pm25, Some(12.0));
    }

    #[test]
    fn test_device_fields_and_sensor_readings() {
        // ---
        let current = vec![station("dev-1", 90)];
        let merged = merge(
            &current,
            &snapshot(&[(
                "dev-1",
                json!({
                    "deviceId": "MHXY_001",
                    "battery": 81,
                    "mq7_ppm": 3.2,
                    "mq135_raw": 412,
                    "humidity": 40
                }),
            )]),
        );

        let device = merged[0].device.as_ref().unwrap();
        assert_eq!(device.device_id.as_deref(), Some("MHXY_001"));
        assert_eq!(device.battery, Some(81.0));
        assert_eq!(device.sensor_readings.len(), 2);
        assert_eq!(device.sensor_readings["mq7_ppm"], json!(3.2));
        assert_eq!(merged[0].name, "DEV-1");
    }

    #[test]
    fn test_new_station_named_after_device() {
        // ---
        let merged = merge(
            &[],
            &snapshot(&[
                ("n2", json!({ "aqi": 180, "deviceId": "MHXY_002" })),
                ("n1", json!({ "aqi": 60, "name": "Lab Bench", "lastUpdated": "2025-12-07T23:10:00Z" })),
            ]),
        );
        // Store key order
        assert_eq!(merged[0].id, "n1");
        assert_eq!(merged[0].name, "Lab Bench");
        assert_eq!(merged[0].last_updated, "2025-12-07T23:10:00Z");
        assert_eq!(merged[1].name, "MHXY_002");
    }

    #[test]
    fn test_stale_snapshot_still_applies() {
        // ---
        let current = vec![station("a", 40)];
        let merged = merge(
            &current,
            &snapshot(&[("a", json!({ "aqi": 300, "lastUpdated": "2025-12-07T20:00:00Z" }))]),
        );
        assert_eq!(merged[0].aqi(), 300);
        assert_eq!(merged[0].last_updated, "2025-12-07T20:00:00Z");
    }

    #[test]
    fn test_snapshot_from_value_skips_non_objects() {
        // ---
        let snap = snapshot_from_value(json!({ "a": { "aqi": 5 }, "b": 7, "c": null }));
        assert_eq!(snap.len(), 1);
        assert!(snapshot_from_value(Value::Null).is_empty());
    }
}
