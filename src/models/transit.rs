//! Bus routes and live vehicle positions.

use serde::{Deserialize, Serialize};

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusType {
    Electric,
    NonElectric,
    Municipal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusRoute {
    pub id: String,
    pub route_number: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: BusType,
    /// Polyline as `[lat, lng]` pairs.
    pub coordinates: Vec<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_aqi: Option<i32>,
    pub device_installed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusPosition {
    pub id: String,
    pub vehicle_id: String,
    pub route_id: String,
    pub route_number: String,
    pub lat: f64,
    pub lng: f64,
    /// Degrees clockwise from north, in `[0, 360)`.
    pub bearing: f64,
    /// km/h
    pub speed: f64,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: BusType,
}

/// A fixture route annotated with the number of buses currently on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteWithBuses {
    #[serde(flatten)]
    pub route: BusRoute,
    pub active_buses: usize,
}
