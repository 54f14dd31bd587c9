//! Report insights: a short advisory generated from a station's summary
//! statistics, with a rule-based fallback when generation is unavailable.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::purifier::DEFAULT_PURIFIER_ID;

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/api/reports/insights", post(insights))
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Coords {
    pub lat: f64,
    pub lng: f64,
}

/// Latest pollutant readings. Keys follow the sensor payload names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LatestReadings {
    pub co: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub tvoc_ppb: Option<f64>,
    pub eco2_ppm: Option<f64>,
}

/// Range statistics the dashboard computed for one station.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InsightSummary {
    pub avg: f64,
    pub peak: f64,
    pub pm25_avg: f64,
    pub pm10_avg: f64,
    pub coords: Option<Coords>,
    pub latest: Option<LatestReadings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct InsightRequest {
    station_id: Option<String>,
    range: Option<String>,
    summary: InsightSummary,
    force: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct CachedInsight {
    text: String,
    model: String,
}

/// Rule-based advisory, one sentence per triggered threshold.
pub fn fallback_insight(summary: &InsightSummary, range: &str) -> String {
    // ---
    let mut lines = vec![format!(
        "For {range}, avg AQI {}, peak {}.",
        summary.avg.round(),
        summary.peak.round()
    )];
    if summary.pm25_avg > 60.0 {
        lines.push("PM2.5 elevated: use purifiers indoors and reduce ventilation during peaks.".into());
    }
    if summary.pm10_avg > 100.0 {
        lines.push("PM10 high: avoid dusty routes; limit outdoor workouts.".into());
    }
    if summary.peak > 200.0 {
        lines.push("Unhealthy spikes: prefer masks in peak hours and commute off-peak.".into());
    }
    if summary.avg <= 100.0 {
        lines.push("Conditions generally moderate: outdoor activities are okay in mornings/evenings.".into());
    }
    lines.push("Tip: enable nearby purifiers during local peaks to improve indoor air.".into());
    lines.join("\n")
}

fn or_na(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

fn insight_prompt(station: &str, range: &str, summary: &InsightSummary) -> String {
    // ---
    let location = summary
        .coords
        .map_or_else(|| "unknown".to_string(), |c| format!("{}, {}", c.lat, c.lng));
    let latest = summary.latest.clone().unwrap_or_default();

    format!(
        "You are an expert air-quality advisor for Delhi-NCR.\n\
         User location: {location}\n\
         Nearest station: {station}\n\
         Time range: {range}\n\
         Stats: avg AQI {}, peak AQI {}, PM2.5 avg {}, PM10 avg {}.\n\
         Latest pollutants (optional): CO {}, NO2 {}, O3 {}, VOC {} ppb, eCO2 {} ppm.\n\
         Provide clear, actionable recommendations for outdoor activities, indoor ventilation \
         and purifier settings, mask usage, and commuting choices. Include short, prioritized \
         bullets and cite key numbers when relevant.",
        summary.avg,
        summary.peak,
        summary.pm25_avg,
        summary.pm10_avg,
        or_na(latest.co),
        or_na(latest.no2),
        or_na(latest.o3),
        or_na(latest.tvoc_ppb),
        or_na(latest.eco2_ppm),
    )
}

/// Station, range and the rounded averages.
fn cache_key(station: &str, range: &str, summary: &InsightSummary) -> String {
    format!(
        "{station}:{range}:{}:{}:{}",
        summary.avg.round() as i64,
        summary.pm25_avg.round() as i64,
        summary.pm10_avg.round() as i64
    )
}

/// `POST /api/reports/insights`. Always answers `success: true`.
async fn insights(
    State(state): State<AppState>,
    body: Result<Json<InsightRequest>, JsonRejection>,
) -> Response {
    // ---
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!("insight request body unreadable, using defaults: {rejection}");
            InsightRequest::default()
        }
    };
    let station = request.station_id.as_deref().unwrap_or(DEFAULT_PURIFIER_ID);
    let range = request.range.as_deref().unwrap_or("24h");
    let summary = &request.summary;
    let key = cache_key(station, range, summary);

    if !request.force {
        if let Some(hit) = state.insights.fresh(&key).await {
            return Json(json!({
                "success": true,
                "insight": hit.text,
                "cached": true,
                "model": hit.model,
            }))
            .into_response();
        }
    }

    if !state.chat.is_configured() {
        return Json(json!({
            "success": true,
            "insight": fallback_insight(summary, range),
            "cached": false,
        }))
        .into_response();
    }

    match state.chat.insight(&insight_prompt(station, range, summary)).await {
        Ok(text) => {
            let model = state.chat.model().to_string();
            state
                .insights
                .insert(key, CachedInsight { text: text.clone(), model: model.clone() })
                .await;
            Json(json!({ "success": true, "insight": text, "cached": false, "model": model }))
                .into_response()
        }
        Err(err) => {
            tracing::warn!(class = err.class(), "insight generation failed: {err}");
            Json(json!({
                "success": true,
                "insight": fallback_insight(summary, range),
                "cached": false,
                "error": format!("AI insight unavailable ({})", err.class()),
            }))
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use pretty_assertions::assert_eq;

    use super::*;

    fn summary(avg: f64, peak: f64, pm25_avg: f64, pm10_avg: f64) -> InsightSummary {
        InsightSummary {
            avg,
            peak,
            pm25_avg,
            pm10_avg,
            ..Default::default()
        }
    }

    #[test]
    fn test_fallback_insight_severe() {
        // ---
        let text = fallback_insight(&summary(245.4, 312.0, 140.0, 210.0), "7d");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "For 7d, avg AQI 245, peak 312.");
        assert!(lines[1].starts_with("PM2.5 elevated"));
        assert!(lines[2].starts_with("PM10 high"));
        assert!(lines[3].starts_with("Unhealthy spikes"));
        assert!(lines[4].starts_with("Tip:"));
    }

    #[test]
    fn test_fallback_insight_moderate() {
        // ---
        let text = fallback_insight(&summary(80.0, 120.0, 30.0, 60.0), "24h");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "For 24h, avg AQI 80, peak 120.");
        assert!(lines[1].starts_with("Conditions generally moderate"));
    }

    #[test]
    fn test_cache_key_rounds_averages() {
        // ---
        let a = cache_key("anand-vihar", "24h", &summary(301.4, 350.0, 150.6, 220.2));
        let b = cache_key("anand-vihar", "24h", &summary(300.6, 400.0, 151.4, 219.8));
        assert_eq!(a, "anand-vihar:24h:301:151:220");
        assert_eq!(a, b);
    }

    #[test]
    fn test_prompt_marks_missing_readings() {
        // ---
        let mut s = summary(200.0, 260.0, 90.0, 150.0);
        s.latest = Some(LatestReadings {
            no2: Some(41.5),
            ..Default::default()
        });
        let prompt = insight_prompt("rk-puram", "30d", &s);
        assert!(prompt.contains("User location: unknown"));
        assert!(prompt.contains("Nearest station: rk-puram"));
        assert!(prompt.contains("CO n/a, NO2 41.5, O3 n/a"));
        assert!(prompt.contains("avg AQI 200, peak AQI 260"));
    }

    #[test]
    fn test_summary_wire_names() {
        // ---
        let s: InsightSummary = serde_json::from_value(json!({
            "avg": 180, "peak": 240, "pm25Avg": 88.5, "pm10Avg": 140,
            "coords": { "lat": 28.61, "lng": 77.2 },
            "latest": { "tvoc_ppb": 220, "eco2_ppm": 640 }
        }))
        .unwrap();
        assert_eq!(s.pm25_avg, 88.5);
        assert_eq!(s.latest.and_then(|l| l.eco2_ppm), Some(640.0));
        assert!(s.coords.is_some());
    }
}
