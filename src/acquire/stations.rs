//! Station-list assembly: combining tiers and synthesizing missing coverage.

use std::collections::HashSet;

use rand::Rng;
use serde::Serialize;

use crate::aqi::{average_aqi, classify, AqiStatus};
use crate::models::{Pollutants, Station, StationType};
use crate::sources::ScrapedReport;

/// Synthesized indices stay inside this band.
const SYNTH_MIN: f64 = 50.0;
const SYNTH_MAX: f64 = 500.0;

const DELHI_CENTRE: (f64, f64) = (28.6139, 77.2090);

// ---

/// Copy of a fixture station re-centred on a live aggregate.
///
/// The index is drawn uniformly from `aggregate ± spread`, clamped to
/// [50, 500]; particulates are re-estimated from it. The result is tagged
/// `synthetic`.
pub fn perturb(
    station: &Station,
    aggregate: i32,
    spread: f64,
    now: &str,
    rng: &mut impl Rng,
) -> Station {
    // ---
    let variance = rng.gen_range(-spread..=spread);
    let adjusted = (f64::from(aggregate) + variance).clamp(SYNTH_MIN, SYNTH_MAX);

    let mut synthesized = station.clone();
    synthesized.set_aqi(adjusted.round() as i32);
    synthesized.pollutants.pm25 = Some((adjusted * 0.7).round());
    synthesized.pollutants.pm10 = Some((adjusted * 1.1).round());
    synthesized.last_updated = now.to_string();
    synthesized.synthetic = true;
    synthesized
}

fn names(stations: &[Station]) -> HashSet<String> {
    stations.iter().map(|s| s.name.to_lowercase()).collect()
}

/// Append every fixture station not already present by name, perturbed
/// around `aggregate`.
pub fn supplement(
    mut measured: Vec<Station>,
    fixture: &[Station],
    aggregate: i32,
    spread: f64,
    rng: &mut impl Rng,
) -> Vec<Station> {
    // ---
    let known = names(&measured);
    let now = chrono::Utc::now().to_rfc3339();
    let synthesized: Vec<Station> = fixture
        .iter()
        .filter(|s| !known.contains(&s.name.to_lowercase()))
        .map(|s| perturb(s, aggregate, spread, &now, rng))
        .collect();

    tracing::debug!(
        "{} measured stations, {} synthesized around AQI {aggregate}",
        measured.len(),
        synthesized.len()
    );
    measured.extend(synthesized);
    measured
}

/// Append stations whose name is not yet in `stations`.
pub fn extend_unique(stations: &mut Vec<Station>, extra: impl IntoIterator<Item = Station>) {
    let mut known = names(stations);
    for station in extra {
        if known.insert(station.name.to_lowercase()) {
            stations.push(station);
        }
    }
}

/// Stations from a scraped page: the city average plus one per linked area.
///
/// Areas matching a fixture station by name take its coordinates; the rest
/// are scattered around the city centre.
pub fn from_scraped(report: &ScrapedReport, fixture: &[Station], rng: &mut impl Rng) -> Vec<Station> {
    // ---
    let mut stations = vec![Station::new("scraped-delhi", report.delhi_aqi, StationType::Government)
        .named("Delhi Average", "New Delhi, India")
        .at(DELHI_CENTRE.0, DELHI_CENTRE.1)
        .with_pollutants(Pollutants::estimated_from_particulates(report.pm25, report.pm10))
        .updated_at(report.last_updated.clone())];

    for (index, city) in report.cities.iter().enumerate().filter(|(_, c)| c.aqi > 0) {
        let needle = city.name.to_lowercase();
        let (lat, lng) = fixture
            .iter()
            .find(|s| s.name.to_lowercase() == needle)
            .map(|s| (s.lat, s.lng))
            .unwrap_or_else(|| {
                (
                    28.6 + rng.gen_range(-0.15..=0.15),
                    77.2 + rng.gen_range(-0.15..=0.15),
                )
            });
        let aqi = f64::from(city.aqi);

        stations.push(
            Station::new(format!("scraped-{index}"), city.aqi, StationType::Government)
                .named(city.name.clone(), format!("{}, Delhi NCR", city.name))
                .at(lat, lng)
                .with_pollutants(Pollutants::estimated_from_particulates(
                    (aqi * 0.7).round(),
                    (aqi * 1.1).round(),
                ))
                .updated_at(report.last_updated.clone()),
        );
    }
    stations
}

/// Network-wide average over a station list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSummary {
    pub aqi: i32,
    pub pm25: i32,
    pub pm10: i32,
    /// `None` for an empty network.
    pub status: Option<AqiStatus>,
    pub station_count: usize,
}

pub fn summarize(stations: &[Station]) -> NetworkSummary {
    // ---
    if stations.is_empty() {
        return NetworkSummary {
            aqi: 0,
            pm25: 0,
            pm10: 0,
            status: None,
            station_count: 0,
        };
    }
    let n = stations.len() as f64;
    let mean = |f: fn(&Pollutants) -> Option<f64>| {
        (stations.iter().map(|s| f(&s.pollutants).unwrap_or(0.0)).sum::<f64>() / n).round() as i32
    };
    let aqi = average_aqi(&stations.iter().map(Station::aqi).collect::<Vec<_>>());

    NetworkSummary {
        aqi,
        pm25: mean(|p| p.pm25),
        pm10: mean(|p| p.pm10),
        status: Some(classify(aqi)),
        station_count: stations.len(),
    }
}
