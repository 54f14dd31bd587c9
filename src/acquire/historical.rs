//! Historical series synthesized around a station's current reading.
//!
//! The telemetry API only serves current values, so history is generated
//! from Delhi's typical hourly and weekday shape scaled to the live index.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Offset, TimeZone, Timelike, Utc, Weekday};
use rand::Rng;
use serde::Serialize;

use crate::models::{HistoricalPoint, TimeRange};

// ---

/// A station the historical endpoint knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoricalStation {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(skip)]
    pub feed_id: &'static str,
}

pub const HISTORICAL_STATIONS: &[HistoricalStation] = &[
    HistoricalStation { id: "delhi-main", name: "Delhi", feed_id: "@7030" },
    HistoricalStation { id: "anand-vihar", name: "Anand Vihar", feed_id: "@7031" },
    HistoricalStation { id: "punjabi-bagh", name: "Punjabi Bagh", feed_id: "@11354" },
    HistoricalStation { id: "rk-puram", name: "RK Puram", feed_id: "@11348" },
    HistoricalStation { id: "mandir-marg", name: "Mandir Marg", feed_id: "@11349" },
];

/// Base index used when no live reading is available.
pub const DEFAULT_BASE_AQI: i32 = 200;

/// Night lows, rush-hour peaks. Index is the local hour.
#[rustfmt::skip]
const HOURLY_PATTERN: [f64; 24] = [
    0.75, 0.70, 0.65, 0.63, 0.68, 0.78,
    0.88, 1.05, 1.18, 1.22, 1.15, 1.05,
    0.95, 0.90, 0.88, 0.92, 1.00, 1.15,
    1.25, 1.20, 1.10, 0.98, 0.88, 0.80,
];

/// Weekends run cleaner.
fn daily_multiplier(day: Weekday) -> f64 {
    match day {
        Weekday::Sun => 0.85,
        Weekday::Mon => 1.05,
        Weekday::Tue => 1.08,
        Weekday::Wed => 1.02,
        Weekday::Thu => 1.05,
        Weekday::Fri => 1.12,
        Weekday::Sat => 0.90,
    }
}

pub fn find_station(id: &str) -> Option<&'static HistoricalStation> {
    HISTORICAL_STATIONS.iter().find(|s| s.id == id)
}

/// India Standard Time, UTC+05:30.
pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap_or_else(|| Utc.fix())
}

pub fn now_ist() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&ist())
}

fn vary(base: f64, max_variation: f64, rng: &mut impl Rng) -> i32 {
    let variation = rng.gen_range(-max_variation..=max_variation);
    ((base + variation).round() as i32).max(20)
}

/// Approximate particulate concentrations for an index (inverse of the
/// Indian AQI sub-index curve). PM10 runs 1.5–2x PM2.5.
pub fn particulates_from_aqi(aqi: i32, rng: &mut impl Rng) -> (i32, i32) {
    // ---
    let aqi = f64::from(aqi);
    let pm25 = if aqi <= 50.0 {
        aqi * 0.6
    } else if aqi <= 100.0 {
        30.0 + (aqi - 50.0) * 0.6
    } else if aqi <= 200.0 {
        60.0 + (aqi - 100.0) * 0.6
    } else if aqi <= 300.0 {
        120.0 + (aqi - 200.0) * 1.1
    } else {
        230.0 + (aqi - 300.0) * 1.3
    };
    let pm10 = pm25 * rng.gen_range(1.5..=2.0);
    (pm25.round() as i32, pm10.round() as i32)
}

fn point(timestamp: DateTime<FixedOffset>, aqi: i32, rng: &mut impl Rng) -> HistoricalPoint {
    let (pm25, pm10) = particulates_from_aqi(aqi, rng);
    HistoricalPoint {
        timestamp: timestamp.to_rfc3339(),
        aqi,
        pm25,
        pm10,
    }
}

fn at_hour(day: DateTime<FixedOffset>, hour: u32) -> DateTime<FixedOffset> {
    day.timezone()
        .with_ymd_and_hms(day.year(), day.month(), day.day(), hour, 0, 0)
        .single()
        .unwrap_or(day)
}

/// Oldest-first series for `range`, ending at `now`.
pub fn generate_series(
    range: TimeRange,
    current_aqi: i32,
    now: DateTime<FixedOffset>,
    rng: &mut impl Rng,
) -> Vec<HistoricalPoint> {
    // ---
    let current = f64::from(current_aqi);
    match range {
        TimeRange::Day => {
            let top_of_hour = at_hour(now, now.hour());
            (0..24)
                .rev()
                .map(|i| {
                    let ts = top_of_hour - Duration::hours(i);
                    let base = current * HOURLY_PATTERN[ts.hour() as usize];
                    let aqi = vary(base, 20.0, rng);
                    point(ts, aqi, rng)
                })
                .collect()
        }
        TimeRange::Week => (0..7)
            .rev()
            .map(|i| {
                let ts = at_hour(now - Duration::days(i), 12);
                let base = current * daily_multiplier(ts.weekday());
                let aqi = vary(base, 25.0, rng);
                point(ts, aqi, rng)
            })
            .collect(),
        TimeRange::Month => (0..30)
            .rev()
            .map(|i| {
                let ts = at_hour(now - Duration::days(i), 12);
                let week_trend = rng.gen_range(0.9..=1.1);
                let base = current * daily_multiplier(ts.weekday()) * week_trend;
                let aqi = vary(base, 30.0, rng);
                point(ts, aqi, rng)
            })
            .collect(),
    }
}

/// One cell of the weekday × hour heatmap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapCell {
    pub hour: u32,
    pub day: &'static str,
    pub value: i32,
}

/// 7 × 24 grid of expected indices, Sunday first.
pub fn heatmap(current_aqi: i32, rng: &mut impl Rng) -> Vec<HeatmapCell> {
    // ---
    const DAYS: [(Weekday, &str); 7] = [
        (Weekday::Sun, "Sun"),
        (Weekday::Mon, "Mon"),
        (Weekday::Tue, "Tue"),
        (Weekday::Wed, "Wed"),
        (Weekday::Thu, "Thu"),
        (Weekday::Fri, "Fri"),
        (Weekday::Sat, "Sat"),
    ];
    let current = f64::from(current_aqi);

    DAYS.iter()
        .flat_map(|&(weekday, day)| (0u32..24).map(move |hour| (weekday, day, hour)))
        .map(|(weekday, day, hour)| HeatmapCell {
            hour,
            day,
            value: vary(
                current * daily_multiplier(weekday) * HOURLY_PATTERN[hour as usize],
                15.0,
                rng,
            ),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    // ---
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn fixed_now() -> DateTime<FixedOffset> {
        // Sunday 7 December 2025, 23:40 IST
        ist().with_ymd_and_hms(2025, 12, 7, 23, 40, 0).unwrap()
    }

    #[test]
    fn test_day_series_is_hourly_and_ordered() {
        // ---
        let mut rng = StdRng::seed_from_u64(3);
        let series = generate_series(TimeRange::Day, 250, fixed_now(), &mut rng);

        assert_eq!(series.len(), 24);
        assert_eq!(series[0].timestamp, "2025-12-07T00:00:00+05:30");
        assert_eq!(series[23].timestamp, "2025-12-07T23:00:00+05:30");
        assert!(series.windows(2).all(|w| w[0].timestamp < w[1].timestamp));

        // 03:00 runs at 0.63 of current, 18:00 at 1.25
        assert!((137..=178).contains(&series[3].aqi), "{}", series[3].aqi);
        assert!((292..=333).contains(&series[18].aqi), "{}", series[18].aqi);
    }

    #[test]
    fn test_week_and_month_lengths() {
        // ---
        let mut rng = StdRng::seed_from_u64(9);
        let week = generate_series(TimeRange::Week, 200, fixed_now(), &mut rng);
        let month = generate_series(TimeRange::Month, 200, fixed_now(), &mut rng);

        assert_eq!(week.len(), 7);
        assert_eq!(week[6].timestamp, "2025-12-07T12:00:00+05:30");
        assert_eq!(week[0].timestamp, "2025-12-01T12:00:00+05:30");
        assert_eq!(month.len(), 30);
        assert!(month.iter().all(|p| p.aqi >= 20));
    }

    #[test]
    fn test_series_floor() {
        // ---
        let mut rng = StdRng::seed_from_u64(1);
        let series = generate_series(TimeRange::Day, 0, fixed_now(), &mut rng);
        assert!(series.iter().all(|p| p.aqi == 20));
    }

    #[test]
    fn test_particulates_curve() {
        // ---
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(particulates_from_aqi(50, &mut rng).0, 30);
        assert_eq!(particulates_from_aqi(100, &mut rng).0, 60);
        assert_eq!(particulates_from_aqi(300, &mut rng).0, 230);
        let (pm25, pm10) = particulates_from_aqi(400, &mut rng);
        assert_eq!(pm25, 360);
        assert!((540..=720).contains(&pm10));
    }

    #[test]
    fn test_heatmap_grid() {
        // ---
        let cells = heatmap(200, &mut StdRng::seed_from_u64(2));
        assert_eq!(cells.len(), 7 * 24);
        assert_eq!(cells[0].day, "Sun");
        assert_eq!(cells[24].day, "Mon");
        assert_eq!(cells[47].hour, 23);
    }

    #[test]
    fn test_station_lookup() {
        assert_eq!(find_station("rk-puram").map(|s| s.name), Some("RK Puram"));
        assert!(find_station("ito").is_none());
    }
}
