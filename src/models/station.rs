//! Station records: the canonical monitoring-point entity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aqi::{classify, AqiStatus};

// ---

/// Provenance tag for a station. Informs marker rendering only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StationType {
    Government,
    PranameshDevice,
    Industrial,
    CommunityApi,
}

/// Pollutant readings. `None` means "unknown", never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pollutants {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pm25: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pm10: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub so2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub o3: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voc: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eco2_ppm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvoc_ppb: Option<f64>,
}

impl Pollutants {
    /// The six core readings, all known.
    pub fn core(pm25: f64, pm10: f64, co: f64, no2: f64, so2: f64, o3: f64) -> Self {
        Self {
            pm25: Some(pm25),
            pm10: Some(pm10),
            co: Some(co),
            no2: Some(no2),
            so2: Some(so2),
            o3: Some(o3),
            ..Self::default()
        }
    }

    /// Default gas readings used when an upstream only reports particulates.
    pub fn estimated_from_particulates(pm25: f64, pm10: f64) -> Self {
        Self::core(pm25, pm10, 1.5, 45.0, 15.0, 30.0)
    }
}

/// Metadata for stations that are physical sensor nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sensor_readings: BTreeMap<String, serde_json::Value>,
}

/// A monitoring station.
///
/// `aqi` and `status` are private: the only way to change the index is
/// [`Station::set_aqi`], which re-derives the status through [`classify`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: String,
    pub name: String,
    pub location: String,
    pub lat: f64,
    pub lng: f64,
    aqi: i32,
    status: AqiStatus,
    pub pollutants: Pollutants,
    pub last_updated: String,
    #[serde(rename = "type")]
    pub kind: StationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceInfo>,
    /// Set on values synthesized around an aggregate reading rather than measured.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub synthetic: bool,
}

impl Station {
    /// Bare station at the origin with no readings.
    pub fn new(id: impl Into<String>, aqi: i32, kind: StationType) -> Self {
        // ---
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            location: String::new(),
            lat: 0.0,
            lng: 0.0,
            aqi,
            status: classify(aqi),
            pollutants: Pollutants::default(),
            last_updated: String::new(),
            kind,
            device: None,
            synthetic: false,
        }
    }

    pub fn named(mut self, name: impl Into<String>, location: impl Into<String>) -> Self {
        self.name = name.into();
        self.location = location.into();
        self
    }

    pub fn at(mut self, lat: f64, lng: f64) -> Self {
        self.lat = lat;
        self.lng = lng;
        self
    }

    pub fn with_pollutants(mut self, pollutants: Pollutants) -> Self {
        self.pollutants = pollutants;
        self
    }

    pub fn updated_at(mut self, last_updated: impl Into<String>) -> Self {
        self.last_updated = last_updated.into();
        self
    }

    pub fn aqi(&self) -> i32 {
        self.aqi
    }

    pub fn status(&self) -> AqiStatus {
        self.status
    }

    pub fn set_aqi(&mut self, aqi: i32) {
        self.aqi = aqi;
        self.status = classify(aqi);
    }
}
