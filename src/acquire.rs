//! Multi-source acquisition with ordered fallback.
//!
//! For each domain the [`Acquirer`] walks its adapters in priority order,
//! takes the first usable answer, and caches it in that domain's
//! [`TtlCache`]. Adapter failures are logged and skipped. When every tier
//! fails the static fixture is returned and held for [`OUTAGE_HOLD`]; that
//! path never errors.

mod cache;
mod historical;
mod stations;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::{CacheTtls, Config};
use crate::error::SourceError;
use crate::fixtures;
use crate::models::{
    BusPosition, HistoricalReport, RouteWithBuses, Station, TimeRange, WeatherReading, WeatherSource,
};
use crate::sources::{
    Adapter, CachedAdapter, CpcbAdapter, ScrapedReport, ScraperAdapter, TransitAdapter, WaqiAdapter,
    WaqiReport,
};

pub use cache::{KeyedTtlCache, TtlCache};
pub use historical::{
    find_station, generate_series, heatmap, now_ist, particulates_from_aqi, HeatmapCell,
    HistoricalStation, DEFAULT_BASE_AQI, HISTORICAL_STATIONS,
};
pub use stations::{extend_unique, from_scraped, perturb, summarize, supplement, NetworkSummary};

/// Spread of synthesized indices around a telemetry aggregate.
const WAQI_SPREAD: f64 = 40.0;
/// Spread around a scraped aggregate (the page is coarser).
const SCRAPER_SPREAD: f64 = 50.0;

/// Per-adapter cache lifetimes, separate from the per-domain cells.
const WAQI_ADAPTER_TTL: Duration = Duration::from_secs(60);
const SCRAPER_ADAPTER_TTL: Duration = Duration::from_secs(300);
const CPCB_ADAPTER_TTL: Duration = Duration::from_secs(300);

/// How long a fixture answer is held after every tier failed. Requests queued
/// on the domain cache during an outage are served from it.
pub const OUTAGE_HOLD: Duration = Duration::from_secs(15);

// ---

/// An acquired payload plus where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Acquisition<T> {
    pub payload: T,
    /// Id of the winning adapter, or `fixture`/`simulated`.
    pub source: &'static str,
    pub fetched_at: String,
    /// True when any part of the payload was synthesized rather than measured.
    pub synthetic: bool,
}

impl<T> Acquisition<T> {
    pub fn new(payload: T, source: &'static str) -> Self {
        Self {
            payload,
            source,
            fetched_at: chrono::Utc::now().to_rfc3339(),
            synthetic: false,
        }
    }

    pub fn synthetic(mut self, synthetic: bool) -> Self {
        self.synthetic = synthetic;
        self
    }

    pub fn is_fixture(&self) -> bool {
        self.source == FIXTURE_SOURCE
    }
}

pub const FIXTURE_SOURCE: &str = "fixture";
pub const SIMULATED_SOURCE: &str = "simulated";

impl WeatherSource {
    pub fn from_source_id(source: &str) -> Self {
        match source {
            "waqi" => WeatherSource::Waqi,
            "scraper" => WeatherSource::Scraped,
            _ => WeatherSource::Fallback,
        }
    }
}

/// Every tier of a chain failed; the caller serves the fixture.
#[derive(Debug)]
struct Exhausted;

/// Adapters in priority order.
pub struct Sources {
    pub waqi: Arc<dyn Adapter<WaqiReport>>,
    pub scraper: Arc<dyn Adapter<ScrapedReport>>,
    pub cpcb: Arc<dyn Adapter<Vec<Station>>>,
    pub transit: Arc<dyn Adapter<Vec<BusPosition>>>,
}

impl Sources {
    /// Live adapters, each behind its own short cache so that domains sharing
    /// an upstream do not duplicate requests.
    pub fn from_config(cfg: &Config, client: &reqwest::Client) -> Self {
        // ---
        let waqi = WaqiAdapter::new(client.clone(), &cfg.waqi_base_url, cfg.waqi_token.clone());
        let scraper = ScraperAdapter::new(client.clone(), &cfg.scraper_url);
        let cpcb = CpcbAdapter::new(client.clone(), &cfg.cpcb_base_url, cfg.cpcb_api_key.clone());
        let transit = TransitAdapter::new(
            client.clone(),
            &cfg.transit_url,
            cfg.transit_api_key.clone(),
            fixtures::bus_routes(),
        );

        Self {
            waqi: Arc::new(CachedAdapter::new(Arc::new(waqi), WAQI_ADAPTER_TTL)),
            scraper: Arc::new(CachedAdapter::new(Arc::new(scraper), SCRAPER_ADAPTER_TTL)),
            cpcb: Arc::new(CachedAdapter::new(Arc::new(cpcb), CPCB_ADAPTER_TTL)),
            transit: Arc::new(transit),
        }
    }
}

/// Run one adapter under a deadline. Failures are logged and become `None`.
async fn attempt<T>(adapter: &dyn Adapter<T>, timeout: Duration) -> Option<T> {
    // ---
    let source_id = adapter.source_id();
    let result = match tokio::time::timeout(timeout, adapter.fetch()).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout {
            source_id,
            after: timeout,
        }),
    };

    match result {
        Ok(payload) => Some(payload),
        Err(err) => {
            tracing::warn!(
                source = source_id,
                class = err.class(),
                "{err}; trying next tier"
            );
            None
        }
    }
}

pub struct Acquirer {
    sources: Sources,
    timeout: Duration,
    stations: TtlCache<Acquisition<Vec<Station>>>,
    weather: TtlCache<Acquisition<WeatherReading>>,
    buses: TtlCache<Acquisition<Vec<BusPosition>>>,
    historical: KeyedTtlCache<(&'static str, TimeRange), HistoricalReport>,
}

impl Acquirer {
    pub fn new(sources: Sources, ttls: CacheTtls, timeout: Duration) -> Self {
        Self {
            sources,
            timeout,
            stations: TtlCache::new(ttls.aqi),
            weather: TtlCache::new(ttls.weather),
            buses: TtlCache::new(ttls.buses),
            historical: KeyedTtlCache::new(ttls.historical),
        }
    }

    pub fn from_config(cfg: &Config, client: &reqwest::Client) -> Self {
        Self::new(Sources::from_config(cfg, client), cfg.ttls, cfg.adapter_timeout)
    }

    // --- stations

    /// Telemetry API → scraped page (plus open-data stations) → open-data API
    /// → fixture.
    pub async fn acquire_stations(&self, force: bool) -> Arc<Acquisition<Vec<Station>>> {
        // ---
        self.stations
            .get_or_refresh_or_hold(force, OUTAGE_HOLD, || self.station_chain(), |Exhausted| {
                tracing::warn!("every station source failed, serving fixture stations");
                Acquisition::new(fixtures::stations(), FIXTURE_SOURCE)
            })
            .await
    }

    async fn station_chain(&self) -> Result<Acquisition<Vec<Station>>, Exhausted> {
        // ---
        let fixture = fixtures::stations();

        if let Some(report) = attempt(&*self.sources.waqi, self.timeout)
            .await
            .filter(|r| r.aqi > 0)
        {
            let stations = supplement(
                report.to_stations(),
                &fixture,
                report.aqi,
                WAQI_SPREAD,
                &mut rand::thread_rng(),
            );
            tracing::info!("stations: {} via waqi", stations.len());
            let synthetic = stations.iter().any(|s| s.synthetic);
            return Ok(Acquisition::new(stations, "waqi").synthetic(synthetic));
        }

        let scraped = attempt(&*self.sources.scraper, self.timeout)
            .await
            .filter(|r| r.delhi_aqi > 0);
        let cpcb = attempt(&*self.sources.cpcb, self.timeout)
            .await
            .unwrap_or_default();

        let mut combined = match &scraped {
            Some(report) => from_scraped(report, &fixture, &mut rand::thread_rng()),
            None => Vec::new(),
        };
        extend_unique(&mut combined, cpcb);
        if combined.is_empty() {
            return Err(Exhausted);
        }

        let (stations, source) = match &scraped {
            Some(report) => (
                supplement(
                    combined,
                    &fixture,
                    report.delhi_aqi,
                    SCRAPER_SPREAD,
                    &mut rand::thread_rng(),
                ),
                "scraper",
            ),
            None => {
                extend_unique(&mut combined, fixture);
                (combined, "cpcb")
            }
        };
        tracing::info!("stations: {} via {source}", stations.len());
        let synthetic = stations.iter().any(|s| s.synthetic);
        Ok(Acquisition::new(stations, source).synthetic(synthetic))
    }

    pub async fn network_summary(&self, force: bool) -> NetworkSummary {
        summarize(&self.acquire_stations(force).await.payload)
    }

    // --- weather

    /// Telemetry API → scraped page → static default.
    pub async fn acquire_weather(&self, force: bool) -> Arc<Acquisition<WeatherReading>> {
        // ---
        self.weather
            .get_or_refresh_or_hold(force, OUTAGE_HOLD, || self.weather_chain(), |Exhausted| {
                tracing::warn!("every weather source failed, serving default weather");
                Acquisition::new(fixtures::default_weather(), FIXTURE_SOURCE)
            })
            .await
    }

    async fn weather_chain(&self) -> Result<Acquisition<WeatherReading>, Exhausted> {
        // ---
        if let Some(report) = attempt(&*self.sources.waqi, self.timeout).await {
            let reading = WeatherReading {
                temperature: report.temperature,
                humidity: report.humidity,
                wind_speed: report.wind_speed,
                pressure: Some(report.pressure),
                wind_direction: None,
                condition: None,
            };
            let mut acquired = Acquisition::new(reading, "waqi");
            acquired.fetched_at = report.last_updated;
            return Ok(acquired);
        }

        let report = attempt(&*self.sources.scraper, self.timeout)
            .await
            .ok_or(Exhausted)?;
        let temperature = report.temperature.ok_or(Exhausted)?;
        let defaults = fixtures::default_weather();
        let reading = WeatherReading {
            temperature,
            humidity: report.humidity.unwrap_or(defaults.humidity),
            wind_speed: report.wind_speed.unwrap_or(defaults.wind_speed),
            pressure: None,
            wind_direction: None,
            condition: None,
        };
        let mut acquired = Acquisition::new(reading, "scraper");
        acquired.fetched_at = report.last_updated;
        Ok(acquired)
    }

    // --- buses

    /// Live vehicle feed → simulated positions along the fixture routes.
    pub async fn acquire_buses(&self, force: bool) -> Arc<Acquisition<Vec<BusPosition>>> {
        // ---
        self.buses
            .get_or_refresh(force, || async {
                if let Some(positions) = attempt(&*self.sources.transit, self.timeout).await {
                    return Acquisition::new(positions, "transit");
                }
                tracing::info!("transit feed unavailable, simulating bus positions");
                let routes = fixtures::bus_routes();
                let positions = crate::sources::simulate_positions(&routes, &mut rand::thread_rng());
                Acquisition::new(positions, SIMULATED_SOURCE).synthetic(true)
            })
            .await
    }

    /// Fixture routes annotated with how many acquired buses are on each.
    pub async fn routes_with_buses(&self, force: bool) -> Vec<RouteWithBuses> {
        let buses = self.acquire_buses(force).await;
        count_buses(&buses.payload)
    }

    // --- historical

    /// Series for `station` over `range`, cached per `(station, range)`.
    ///
    /// Generated around the station's live index when the telemetry API
    /// answers; otherwise around [`DEFAULT_BASE_AQI`] and left uncached.
    pub async fn acquire_historical(
        &self,
        station: &'static HistoricalStation,
        range: TimeRange,
        force: bool,
    ) -> Arc<HistoricalReport> {
        // ---
        let key = (station.id, range);
        if !force {
            if let Some(cached) = self.historical.fresh(&key).await {
                return cached;
            }
        }

        let Some(report) = attempt(&*self.sources.waqi, self.timeout).await else {
            let data = generate_series(range, DEFAULT_BASE_AQI, now_ist(), &mut rand::thread_rng());
            return Arc::new(HistoricalReport {
                station: station.name.to_string(),
                range,
                current_aqi: DEFAULT_BASE_AQI,
                last_updated: chrono::Utc::now().to_rfc3339(),
                data,
            });
        };

        let current_aqi = current_aqi_for(station, &report);
        let data = generate_series(range, current_aqi, now_ist(), &mut rand::thread_rng());
        self.historical
            .insert(
                key,
                HistoricalReport {
                    station: station.name.to_string(),
                    range,
                    current_aqi,
                    last_updated: report.last_updated.clone(),
                    data,
                },
            )
            .await
    }

    /// Current index for `station`, the same base the series use.
    pub async fn current_aqi(&self, station: &HistoricalStation) -> i32 {
        match attempt(&*self.sources.waqi, self.timeout).await {
            Some(report) => current_aqi_for(station, &report),
            None => DEFAULT_BASE_AQI,
        }
    }
}

/// The feed whose name mentions the station, else the city aggregate.
fn current_aqi_for(station: &HistoricalStation, report: &WaqiReport) -> i32 {
    let needle = station.id.replace('-', " ");
    report
        .stations
        .iter()
        .find(|s| s.name.to_lowercase().contains(&needle))
        .map(|s| s.aqi)
        .filter(|aqi| *aqi > 0)
        .unwrap_or(report.aqi)
}

pub fn count_buses(positions: &[BusPosition]) -> Vec<RouteWithBuses> {
    fixtures::bus_routes()
        .into_iter()
        .map(|route| {
            let active_buses = positions.iter().filter(|p| p.route_id == route.id).count();
            RouteWithBuses {
                route,
                active_buses,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    // ---
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::models::{Pollutants, StationType};
    use crate::sources::WaqiStation;

    /// Adapter returning a fixed result and counting calls.
    struct Scripted<T> {
        id: &'static str,
        result: Box<dyn Fn() -> Result<T, SourceError> + Send + Sync>,
        calls: AtomicUsize,
    }

    impl<T> Scripted<T> {
        fn ok(id: &'static str, value: T) -> Arc<Self>
        where
            T: Clone + Send + Sync + 'static,
        {
            Arc::new(Self {
                id,
                result: Box::new(move || Ok(value.clone())),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(id: &'static str) -> Arc<Self> {
            Arc::new(Self {
                id,
                result: Box::new(move || Err(SourceError::unavailable(id, "HTTP 503"))),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl<T: Send + Sync> Adapter<T> for Scripted<T> {
        fn source_id(&self) -> &'static str {
            self.id
        }

        async fn fetch(&self) -> Result<T, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    /// Never answers; exercises the per-adapter deadline.
    struct Hanging {
        id: &'static str,
        calls: AtomicUsize,
    }

    impl Hanging {
        fn new(id: &'static str) -> Arc<Self> {
            Arc::new(Self {
                id,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl<T: Send + 'static> Adapter<T> for Hanging {
        fn source_id(&self) -> &'static str {
            self.id
        }

        async fn fetch(&self) -> Result<T, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    fn waqi_report(aqi: i32) -> WaqiReport {
        WaqiReport {
            aqi,
            pm25: 200.0,
            pm10: 300.0,
            temperature: 14.0,
            humidity: 71.0,
            wind_speed: 3.0,
            pressure: 1016.0,
            city_name: "Delhi".to_string(),
            last_updated: "2025-12-07T23:00:00+05:30".to_string(),
            stations: vec![
                WaqiStation {
                    name: "Delhi".to_string(),
                    aqi,
                    pollutants: Pollutants::estimated_from_particulates(200.0, 300.0),
                    lat: 28.61,
                    lng: 77.20,
                },
                WaqiStation {
                    name: "Anand Vihar, Delhi".to_string(),
                    aqi: 402,
                    pollutants: Pollutants::default(),
                    lat: 28.64,
                    lng: 77.31,
                },
            ],
        }
    }

    fn all_failing() -> Sources {
        Sources {
            waqi: Scripted::<WaqiReport>::failing("waqi"),
            scraper: Scripted::<ScrapedReport>::failing("scraper"),
            cpcb: Scripted::<Vec<Station>>::failing("cpcb"),
            transit: Scripted::<Vec<BusPosition>>::failing("transit"),
        }
    }

    fn acquirer(sources: Sources) -> Acquirer {
        Acquirer::new(sources, CacheTtls::default(), Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_all_tiers_failing_serves_fixture_unchanged() {
        // ---
        let acquirer = acquirer(all_failing());
        let acquired = acquirer.acquire_stations(false).await;

        assert!(acquired.is_fixture());
        assert!(!acquired.synthetic);
        assert_eq!(acquired.payload, fixtures::stations());

        let weather = acquirer.acquire_weather(false).await;
        assert_eq!(weather.payload, fixtures::default_weather());
        assert_eq!(WeatherSource::from_source_id(weather.source), WeatherSource::Fallback);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_short_circuits_adapters() {
        // ---
        let waqi = Scripted::ok("waqi", waqi_report(287));
        let sources = Sources {
            waqi: waqi.clone(),
            ..all_failing()
        };
        let acquirer = acquirer(sources);

        let first = acquirer.acquire_stations(false).await;
        let second = acquirer.acquire_stations(false).await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(waqi.calls(), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        let third = acquirer.acquire_stations(false).await;
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(waqi.calls(), 2);

        acquirer.acquire_stations(true).await;
        assert_eq!(waqi.calls(), 3);
    }

    #[tokio::test]
    async fn test_waqi_tier_synthesizes_missing_stations() {
        // ---
        let sources = Sources {
            waqi: Scripted::ok("waqi", waqi_report(287)),
            ..all_failing()
        };
        let acquired = acquirer(sources).acquire_stations(false).await;

        assert_eq!(acquired.source, "waqi");
        assert!(acquired.synthetic);
        let stations = &acquired.payload;
        assert_eq!(stations[0].id, "waqi-0");
        assert_eq!(stations[1].aqi(), 402);
        assert!(!stations[0].synthetic && !stations[1].synthetic);
        for synthesized in &stations[2..] {
            assert!(synthesized.synthetic);
            assert!((247..=327).contains(&synthesized.aqi()));
        }
    }

    #[tokio::test]
    async fn test_open_data_tier_when_telemetry_and_scrape_fail() {
        // ---
        let cpcb = vec![Station::new("cpcb-0", 150, StationType::Government).named("Okhla Phase 2", "")];
        let sources = Sources {
            cpcb: Scripted::ok("cpcb", cpcb),
            ..all_failing()
        };
        let acquired = acquirer(sources).acquire_stations(false).await;

        assert_eq!(acquired.source, "cpcb");
        assert_eq!(acquired.payload[0].id, "cpcb-0");
        // The fixture "Okhla Phase 2" is shadowed by the live record
        assert_eq!(acquired.payload.len(), fixtures::stations().len());
        assert!(!acquired.synthetic);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_adapter_times_out_to_next_tier() {
        // ---
        let sources = Sources {
            waqi: Hanging::new("waqi"),
            ..all_failing()
        };
        let acquirer = Acquirer::new(sources, CacheTtls::default(), Duration::from_secs(2));
        let acquired = acquirer.acquire_stations(false).await;
        assert!(acquired.is_fixture());
    }

    #[tokio::test(start_paused = true)]
    async fn test_outage_runs_the_chain_once_for_concurrent_callers() {
        // ---
        let (waqi, scraper, cpcb) = (Hanging::new("waqi"), Hanging::new("scraper"), Hanging::new("cpcb"));
        let sources = Sources {
            waqi: waqi.clone(),
            scraper: scraper.clone(),
            cpcb: cpcb.clone(),
            ..all_failing()
        };
        let acquirer = Acquirer::new(sources, CacheTtls::default(), Duration::from_millis(200));

        let started = tokio::time::Instant::now();
        let answers = futures::future::join_all((0..5).map(|_| acquirer.acquire_stations(false))).await;
        let elapsed = started.elapsed();

        assert!(answers.iter().all(|a| a.is_fixture()));
        assert!(answers.iter().all(|a| Arc::ptr_eq(a, &answers[0])));
        assert_eq!((waqi.calls(), scraper.calls(), cpcb.calls()), (1, 1, 1));
        // One pass over three tiers, not one per caller
        assert!(elapsed < Duration::from_millis(700), "took {elapsed:?}");

        // The stand-in expires quickly so live sources are retried
        tokio::time::advance(OUTAGE_HOLD + Duration::from_secs(1)).await;
        acquirer.acquire_stations(false).await;
        assert_eq!(waqi.calls(), 2);
    }

    #[tokio::test]
    async fn test_weather_from_telemetry() {
        // ---
        let sources = Sources {
            waqi: Scripted::ok("waqi", waqi_report(287)),
            ..all_failing()
        };
        let weather = acquirer(sources).acquire_weather(false).await;
        assert_eq!(weather.source, "waqi");
        assert_eq!(weather.payload.temperature, 14.0);
        assert_eq!(weather.payload.pressure, Some(1016.0));
        assert_eq!(weather.fetched_at, "2025-12-07T23:00:00+05:30");
    }

    #[tokio::test]
    async fn test_buses_fall_back_to_simulation() {
        // ---
        let acquirer = acquirer(all_failing());
        let buses = acquirer.acquire_buses(false).await;
        assert_eq!(buses.source, SIMULATED_SOURCE);
        assert!(buses.synthetic);
        assert!(!buses.payload.is_empty());

        let routes = acquirer.routes_with_buses(false).await;
        assert_eq!(routes.len(), 6);
        assert_eq!(
            routes.iter().map(|r| r.active_buses).sum::<usize>(),
            buses.payload.len()
        );
    }

    #[tokio::test]
    async fn test_historical_uses_station_feed_and_caches() {
        // ---
        let waqi = Scripted::ok("waqi", waqi_report(287));
        let sources = Sources {
            waqi: waqi.clone(),
            ..all_failing()
        };
        let acquirer = acquirer(sources);
        let station = find_station("anand-vihar").unwrap();

        let first = acquirer.acquire_historical(station, TimeRange::Day, false).await;
        assert_eq!(first.current_aqi, 402);
        assert_eq!(first.data.len(), 24);
        assert_eq!(first.station, "Anand Vihar");

        let second = acquirer.acquire_historical(station, TimeRange::Day, false).await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(waqi.calls(), 1);

        let main = acquirer
            .acquire_historical(find_station("delhi-main").unwrap(), TimeRange::Week, false)
            .await;
        assert_eq!(main.current_aqi, 287);
    }

    #[tokio::test]
    async fn test_historical_without_telemetry_uses_default_base() {
        // ---
        let acquirer = acquirer(all_failing());
        let report = acquirer
            .acquire_historical(find_station("rk-puram").unwrap(), TimeRange::Month, false)
            .await;
        assert_eq!(report.current_aqi, DEFAULT_BASE_AQI);
        assert_eq!(report.data.len(), 30);
    }
}
