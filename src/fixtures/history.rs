//! Pre-computed series served before any live reading is available.

use crate::models::HistoricalPoint;

// ---

#[rustfmt::skip]
const HOURLY: &[(&str, i32, i32, i32)] = &[
    ("2025-12-07T00:00:00", 145, 89, 167), ("2025-12-07T01:00:00", 138, 85, 158),
    ("2025-12-07T02:00:00", 132, 81, 151), ("2025-12-07T03:00:00", 128, 78, 146),
    ("2025-12-07T04:00:00", 135, 83, 154), ("2025-12-07T05:00:00", 156, 96, 178),
    ("2025-12-07T06:00:00", 178, 109, 202), ("2025-12-07T07:00:00", 198, 121, 225),
    ("2025-12-07T08:00:00", 234, 143, 266), ("2025-12-07T09:00:00", 256, 157, 291),
    ("2025-12-07T10:00:00", 267, 163, 303), ("2025-12-07T11:00:00", 245, 150, 278),
    ("2025-12-07T12:00:00", 223, 136, 253), ("2025-12-07T13:00:00", 212, 130, 241),
    ("2025-12-07T14:00:00", 198, 121, 225), ("2025-12-07T15:00:00", 189, 116, 215),
    ("2025-12-07T16:00:00", 201, 123, 228), ("2025-12-07T17:00:00", 234, 143, 266),
    ("2025-12-07T18:00:00", 267, 163, 303), ("2025-12-07T19:00:00", 289, 177, 328),
    ("2025-12-07T20:00:00", 278, 170, 316), ("2025-12-07T21:00:00", 256, 157, 291),
    ("2025-12-07T22:00:00", 223, 136, 253), ("2025-12-07T23:00:00", 189, 116, 215),
];

#[rustfmt::skip]
const WEEKLY: &[(&str, i32, i32, i32)] = &[
    ("2025-12-01T12:00:00", 234, 143, 266), ("2025-12-02T12:00:00", 267, 163, 303),
    ("2025-12-03T12:00:00", 198, 121, 225), ("2025-12-04T12:00:00", 289, 177, 328),
    ("2025-12-05T12:00:00", 245, 150, 278), ("2025-12-06T12:00:00", 212, 130, 241),
    ("2025-12-07T12:00:00", 223, 136, 253),
];

fn points(rows: &[(&str, i32, i32, i32)]) -> Vec<HistoricalPoint> {
    rows.iter()
        .map(|&(timestamp, aqi, pm25, pm10)| HistoricalPoint {
            timestamp: timestamp.to_string(),
            aqi,
            pm25,
            pm10,
        })
        .collect()
}

pub fn hourly_series() -> Vec<HistoricalPoint> {
    points(HOURLY)
}

pub fn weekly_series() -> Vec<HistoricalPoint> {
    points(WEEKLY)
}
