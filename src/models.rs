//! Canonical data models for the dashboard backend.
//!
//! Adapters normalize their upstream shapes into these types; the merge
//! engine, orchestrator and routes only ever see canonical records.

mod historical;
mod station;
mod transit;
mod weather;

pub use historical::{HistoricalPoint, HistoricalReport, TimeRange};
pub use station::{DeviceInfo, Pollutants, Station, StationType};
pub use transit::{BusPosition, BusRoute, BusType, RouteWithBuses};
pub use weather::{WeatherReading, WeatherSource};
