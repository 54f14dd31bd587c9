//! AQI classification for the dashboard backend.
//!
//! [`classify`] is the only place the six breakpoints live. Everything that
//! needs a status (station records, merges, advisories, summaries) goes
//! through it so that `status == classify(aqi)` holds across the service.

use serde::{Deserialize, Serialize};

// ---

/// Severity band derived from an AQI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AqiStatus {
    Good,
    Moderate,
    Poor,
    Unhealthy,
    Severe,
    Hazardous,
}

/// Map an AQI value onto its status band.
///
/// Breakpoints: 0–50 good, 51–100 moderate, 101–150 poor, 151–200 unhealthy,
/// 201–300 severe, 301+ hazardous. Negative values fall into `Good`.
pub fn classify(aqi: i32) -> AqiStatus {
    // ---
    match aqi {
        i32::MIN..=50 => AqiStatus::Good,
        51..=100 => AqiStatus::Moderate,
        101..=150 => AqiStatus::Poor,
        151..=200 => AqiStatus::Unhealthy,
        201..=300 => AqiStatus::Severe,
        _ => AqiStatus::Hazardous,
    }
}

impl AqiStatus {
    pub const ALL: [AqiStatus; 6] = [
        AqiStatus::Good,
        AqiStatus::Moderate,
        AqiStatus::Poor,
        AqiStatus::Unhealthy,
        AqiStatus::Severe,
        AqiStatus::Hazardous,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AqiStatus::Good => "Good",
            AqiStatus::Moderate => "Moderate",
            AqiStatus::Poor => "Poor",
            AqiStatus::Unhealthy => "Unhealthy",
            AqiStatus::Severe => "Severe",
            AqiStatus::Hazardous => "Hazardous",
        }
    }

    /// Marker/legend colour as a hex string.
    pub fn color(self) -> &'static str {
        match self {
            AqiStatus::Good => "#00e400",
            AqiStatus::Moderate => "#ffff00",
            AqiStatus::Poor => "#ff7e00",
            AqiStatus::Unhealthy => "#ff0000",
            AqiStatus::Severe => "#8f3f97",
            AqiStatus::Hazardous => "#7e0023",
        }
    }

    pub fn health_recommendation(self) -> &'static str {
        match self {
            AqiStatus::Good => "Air quality is satisfactory. Enjoy outdoor activities!",
            AqiStatus::Moderate => "Sensitive individuals should limit prolonged outdoor exertion.",
            AqiStatus::Poor => {
                "Everyone may experience mild respiratory symptoms. Limit outdoor activities."
            }
            AqiStatus::Unhealthy => {
                "Health alert! Avoid prolonged outdoor activities. Use air purifiers indoors."
            }
            AqiStatus::Severe => {
                "Health warnings of emergency conditions. Stay indoors with air filtration."
            }
            AqiStatus::Hazardous => {
                "Hazardous conditions! Avoid all outdoor activities. Seek clean air shelter."
            }
        }
    }
}

/// Rounded mean of a set of AQI values, `0` for an empty set.
pub fn average_aqi(values: &[i32]) -> i32 {
    // ---
    if values.is_empty() {
        return 0;
    }
    let total: i64 = values.iter().map(|v| i64::from(*v)).sum();
    (total as f64 / values.len() as f64).round() as i32
}

/// Display unit for a pollutant key.
pub fn pollutant_unit(pollutant: &str) -> &'static str {
    if pollutant == "co" {
        "mg/m³"
    } else {
        "μg/m³"
    }
}

/// Display name for a pollutant key; unknown keys are upper-cased.
pub fn pollutant_name(pollutant: &str) -> String {
    match pollutant {
        "pm25" => "PM2.5".to_string(),
        "pm10" => "PM10".to_string(),
        "co" => "CO".to_string(),
        "no2" => "NO₂".to_string(),
        "so2" => "SO₂".to_string(),
        "o3" => "O₃".to_string(),
        "voc" => "VOC".to_string(),
        other => other.to_uppercase(),
    }
}
