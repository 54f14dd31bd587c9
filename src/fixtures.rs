//! Static fixture set: stations, routes, devices and health tables.
//!
//! Pure data. The station list is the guaranteed terminal fallback for
//! acquisition, so it must always be non-empty and internally consistent.

mod health;
mod history;
mod stations;
mod transit;

pub use health::{advisory_for, health_advisory, top_diseases, Disease, HealthAdvisory, RiskFactor};
pub use history::{hourly_series, weekly_series};
pub use stations::stations;
pub use transit::{bus_routes, default_weather, DeviceKind, TrafficZone, DEVICE_KINDS, TRAFFIC_ZONES};
