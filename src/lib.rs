//! Backend for the Delhi-NCR air-quality dashboard.
//!
//! Module map:
//! - [`acquire`]: multi-source acquisition with fallback and TTL caches
//! - [`sources`]: one adapter per upstream (telemetry API, scraped page,
//!   government feed, transit feed, generative chat)
//! - [`realtime`]: realtime-store client, snapshot merge, and the live board
//! - [`purifier`]: purifier control state machine
//! - [`archive`] / [`schema`]: optional Postgres history of device pushes
//! - [`routes`]: the axum HTTP surface

pub mod acquire;
pub mod aqi;
pub mod archive;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod models;
pub mod purifier;
pub mod realtime;
pub mod routes;
pub mod schema;
pub mod sources;

pub use config::Config;
