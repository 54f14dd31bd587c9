//! Bus routes, device catalogue and traffic zones.

use serde::Serialize;

use crate::models::{BusRoute, BusType, WeatherReading};

// ---

type RouteRow = (
    &'static str,
    &'static str,
    &'static str,
    BusType,
    &'static [[f64; 2]],
    i32,
    bool,
);

#[rustfmt::skip]
const ROUTES: &[RouteRow] = &[
    ("dtc-e1", "E-1", "Mehrauli - ISBT Kashmere Gate", BusType::Electric,
        &[[28.5245, 77.1855], [28.5503, 77.2155], [28.5918, 77.2273], [28.6362, 77.2010], [28.6670, 77.2285]], 189, true),
    ("dtc-e2", "E-2", "Dwarka Sec 21 - Old Delhi Railway Station", BusType::Electric,
        &[[28.5523, 77.0582], [28.5744, 77.0658], [28.6289, 77.2405], [28.6558, 77.2289]], 234, true),
    ("dtc-501", "501", "Badarpur - Old Delhi", BusType::NonElectric,
        &[[28.5062, 77.3033], [28.5306, 77.2711], [28.5829, 77.2332], [28.6362, 77.2010], [28.6558, 77.2289]], 267, false),
    ("dtc-729", "729", "Rohini Sec 3 - Connaught Place", BusType::NonElectric,
        &[[28.7495, 77.0565], [28.7256, 77.1668], [28.6953, 77.1818], [28.6519, 77.1473], [28.6310, 77.2190]], 245, false),
    ("mun-m1", "M-1", "Narela - ISBT Anand Vihar", BusType::Municipal,
        &[[28.8526, 77.0931], [28.7943, 77.1528], [28.7256, 77.1668], [28.6877, 77.2100], [28.6469, 77.3164]], 356, true),
    ("mun-m2", "M-2", "Mundka - Nehru Place", BusType::Municipal,
        &[[28.6814, 77.0324], [28.6683, 77.1167], [28.6519, 77.1473], [28.5918, 77.2273], [28.5503, 77.2155]], 289, false),
];

pub fn bus_routes() -> Vec<BusRoute> {
    // ---
    ROUTES
        .iter()
        .map(|&(id, number, name, kind, coords, aqi, installed)| BusRoute {
            id: id.to_string(),
            route_number: number.to_string(),
            name: name.to_string(),
            kind,
            coordinates: coords.to_vec(),
            current_aqi: Some(aqi),
            device_installed: installed,
        })
        .collect()
}

/// A purifier/sensor product in the device catalogue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceKind {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(rename = "type")]
    pub model: &'static str,
    pub description: &'static str,
    pub features: &'static [&'static str],
    pub status: &'static str,
}

pub const DEVICE_KINDS: &[DeviceKind] = &[
    DeviceKind {
        id: "pg-001",
        name: "P-Gate Alpha",
        model: "P-Gate",
        description: "Vertical air pillar for bus stops & school gates.",
        features: &["Directional Plume Sensing", "Solar Powered", "LoRa Mesh", "BioLung Filter"],
        status: "active",
    },
    DeviceKind {
        id: "pp-001",
        name: "P-Park Beta",
        model: "P-Park",
        description: "Smart air bench for parks & public spaces.",
        features: &["UV-C Sterilization", "Moss Bio-filter", "Weather Resistant"],
        status: "active",
    },
    DeviceKind {
        id: "pm-001",
        name: "P-Move Gamma",
        model: "P-Move",
        description: "Mobile air quality monitor & purifier for buses.",
        features: &["Vehicle Mount", "GPS Tracking", "24h Battery", "Route Mapping"],
        status: "active",
    },
    DeviceKind {
        id: "pmi-001",
        name: "P-Micro Delta",
        model: "P-Micro",
        description: "Compact indoor unit for classrooms & offices.",
        features: &["Whisper Quiet", "HEPA H13", "VOC Removal", "Smart Scheduling"],
        status: "maintenance",
    },
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficZone {
    pub id: &'static str,
    pub name: &'static str,
    pub area: &'static str,
    pub traffic_density: &'static str,
    pub avg_aqi: i32,
    pub peak_hours: &'static str,
    pub recommended_devices: u32,
}

#[rustfmt::skip]
pub const TRAFFIC_ZONES: &[TrafficZone] = &[
    TrafficZone { id: "tz-1", name: "ITO Junction", area: "Central Delhi", traffic_density: "very-high", avg_aqi: 312, peak_hours: "8AM-11AM, 5PM-9PM", recommended_devices: 4 },
    TrafficZone { id: "tz-2", name: "Anand Vihar ISBT", area: "East Delhi", traffic_density: "very-high", avg_aqi: 389, peak_hours: "6AM-10AM, 4PM-10PM", recommended_devices: 5 },
    TrafficZone { id: "tz-3", name: "Punjabi Bagh Chowk", area: "West Delhi", traffic_density: "high", avg_aqi: 278, peak_hours: "9AM-12PM, 6PM-9PM", recommended_devices: 3 },
    TrafficZone { id: "tz-4", name: "Rohini Sector 3", area: "North Delhi", traffic_density: "high", avg_aqi: 245, peak_hours: "8AM-11AM, 5PM-8PM", recommended_devices: 3 },
    TrafficZone { id: "tz-5", name: "Munirka", area: "South Delhi", traffic_density: "high", avg_aqi: 198, peak_hours: "9AM-11AM, 6PM-8PM", recommended_devices: 2 },
    TrafficZone { id: "tz-6", name: "Kashmere Gate ISBT", area: "North Delhi", traffic_density: "very-high", avg_aqi: 298, peak_hours: "7AM-11AM, 4PM-9PM", recommended_devices: 4 },
    TrafficZone { id: "tz-7", name: "Connaught Place", area: "Central Delhi", traffic_density: "high", avg_aqi: 189, peak_hours: "10AM-8PM", recommended_devices: 3 },
    TrafficZone { id: "tz-8", name: "Nehru Place", area: "South Delhi", traffic_density: "high", avg_aqi: 212, peak_hours: "9AM-7PM", recommended_devices: 2 },
];

/// Weather served when every weather source fails.
pub fn default_weather() -> WeatherReading {
    WeatherReading {
        temperature: 20.0,
        humidity: 50.0,
        wind_speed: 5.0,
        pressure: None,
        wind_direction: Some("NW".to_string()),
        condition: Some("Hazy".to_string()),
    }
}
