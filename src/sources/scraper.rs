//! Fallback HTML scrape of the public AQI dashboard page.
//!
//! Regex extraction over the served markup. The page has no stable schema, so
//! every field except the headline AQI is optional.

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;

use super::Adapter;
use crate::error::SourceError;

const SOURCE_ID: &str = "scraper";

/// Browser-like UA; the page serves a challenge to obvious bots.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Compiled extraction patterns, built once.
struct Patterns {
    script_style: Regex,
    tag: Regex,
    aqi_element: Regex,
    city_link: Regex,
    number: Regex,
    city_aqi: Regex,
    city_name: Regex,
    pm25: Regex,
    pm10: Regex,
    temperature: Regex,
    humidity: Regex,
    wind: Regex,
}

static PATTERNS: OnceCell<Patterns> = OnceCell::new();

fn patterns() -> Result<&'static Patterns, SourceError> {
    // ---
    PATTERNS
        .get_or_try_init(|| {
            Ok::<_, regex::Error>(Patterns {
                script_style: Regex::new(r"(?is)<(?:script|style)\b[^>]*>.*?</(?:script|style)>")?,
                tag: Regex::new(r"<[^>]+>")?,
                aqi_element: Regex::new(r#"(?i)<[a-z0-9]+[^>]*class="[^"]*aqi[^"]*"[^>]*>([^<]*)"#)?,
                city_link: Regex::new(r#"(?is)<a\b[^>]*href="[^"]*/dashboard/india/[^"]*"[^>]*>(.*?)</a>"#)?,
                number: Regex::new(r"\d+")?,
                city_aqi: Regex::new(r"(\d{2,3})")?,
                city_name: Regex::new(r"^([A-Za-z\s]+)")?,
                pm25: Regex::new(r"(?i)PM2\.?5\s*[:=]?\s*(\d+)")?,
                pm10: Regex::new(r"(?i)PM10\s*[:=]?\s*(\d+)")?,
                temperature: Regex::new(r"(\d+)\s*°C")?,
                humidity: Regex::new(r"(?i)Humidity\s*(\d+)|(\d+)\s*%\s*Humidity")?,
                wind: Regex::new(r"(?i)(\d+)\s*km/h")?,
            })
        })
        .map_err(|e| SourceError::malformed(SOURCE_ID, e))
}

// ---

#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedCity {
    pub name: String,
    pub aqi: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedReport {
    pub delhi_aqi: i32,
    pub pm25: f64,
    pub pm10: f64,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub last_updated: String,
    pub cities: Vec<ScrapedCity>,
}

fn visible_text(p: &Patterns, html: &str) -> String {
    // ---
    let without_code = p.script_style.replace_all(html, " ");
    let text = p.tag.replace_all(&without_code, " ");
    text.replace("&deg;", "°")
        .replace("&#176;", "°")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn first_capture(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)?
        .iter()
        .skip(1)
        .flatten()
        .find_map(|m| m.as_str().parse::<f64>().ok())
}

/// Largest plausible index found in an element whose class mentions "aqi".
fn headline_aqi(p: &Patterns, html: &str) -> Option<i32> {
    p.aqi_element
        .captures_iter(html)
        .filter_map(|caps| p.number.find(&caps[1])?.as_str().parse::<i32>().ok())
        .filter(|n| *n > 50 && *n < 600)
        .max()
}

fn cities(p: &Patterns, html: &str) -> Vec<ScrapedCity> {
    // ---
    p.city_link
        .captures_iter(html)
        .filter_map(|caps| {
            let text = p.tag.replace_all(&caps[1], " ");
            let text = text.trim();
            let aqi = p.city_aqi.captures(text)?[1].parse::<i32>().ok()?;
            let name = p.city_name.captures(text)?[1].trim().to_string();
            (aqi > 0 && aqi < 600 && name.len() > 2).then_some(ScrapedCity { name, aqi })
        })
        .collect()
}

/// Extract a report from the page markup. A page without a headline AQI is
/// [`SourceError::EmptyPayload`].
pub fn parse_page(html: &str) -> Result<ScrapedReport, SourceError> {
    // ---
    let p = patterns()?;
    let delhi_aqi = headline_aqi(p, html).ok_or(SourceError::EmptyPayload(SOURCE_ID))?;
    let text = visible_text(p, html);

    Ok(ScrapedReport {
        delhi_aqi,
        pm25: first_capture(&p.pm25, &text).unwrap_or_else(|| (f64::from(delhi_aqi) * 0.7).round()),
        pm10: first_capture(&p.pm10, &text).unwrap_or_else(|| (f64::from(delhi_aqi) * 1.1).round()),
        temperature: first_capture(&p.temperature, &text),
        humidity: first_capture(&p.humidity, &text),
        wind_speed: first_capture(&p.wind, &text),
        last_updated: chrono::Utc::now().to_rfc3339(),
        cities: cities(p, html),
    })
}

fn is_challenge(html: &str) -> bool {
    html.contains("Checking your browser") || html.contains("Just a moment")
}

// --- adapter

pub struct ScraperAdapter {
    client: reqwest::Client,
    url: String,
}

impl ScraperAdapter {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Adapter<ScrapedReport> for ScraperAdapter {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    async fn fetch(&self) -> Result<ScrapedReport, SourceError> {
        // ---
        if self.url.is_empty() {
            return Err(SourceError::Unconfigured(SOURCE_ID));
        }
        tracing::debug!("scraping {}", self.url);

        let resp = self
            .client
            .get(&self.url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9,hi;q=0.8")
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(SOURCE_ID, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::unavailable(SOURCE_ID, format!("HTTP {status}")));
        }
        let html = resp
            .text()
            .await
            .map_err(|e| SourceError::from_reqwest(SOURCE_ID, e))?;

        if is_challenge(&html) {
            return Err(SourceError::unavailable(SOURCE_ID, "bot challenge page served"));
        }

        let report = parse_page(&html)?;
        tracing::info!(
            "scraper: Delhi AQI = {}, {} cities",
            report.delhi_aqi,
            report.cities.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use pretty_assertions::assert_eq;

    use super::*;

    const PAGE: &str = r#"
        <html><head><style>.aqi-big { font-size: 40px }</style>
        <script>var aqi = 999;</script></head>
        <body>
          <div class="aqi-value">312</div>
          <span class="AqiBadge small">AQI 45</span>
          <p>PM2.5 : 189 µg/m³</p><p>PM10 = 276</p>
          <div>14&deg;C</div><div>Humidity 71</div><div>Wind 9 km/h</div>
          <a href="/dashboard/india/delhi/anand-vihar"><span>Anand Vihar</span> <b>402</b></a>
          <a href="/dashboard/india/delhi/lodhi-road">Lodhi Road 188</a>
          <a href="/dashboard/india/delhi/x">X 120</a>
          <a href="/about">About 100</a>
        </body></html>
    "#;

    #[test]
    fn test_parse_page_extracts_readings() {
        // ---
        let report = parse_page(PAGE).unwrap();

        assert_eq!(report.delhi_aqi, 312);
        assert_eq!(report.pm25, 189.0);
        assert_eq!(report.pm10, 276.0);
        assert_eq!(report.temperature, Some(14.0));
        assert_eq!(report.humidity, Some(71.0));
        assert_eq!(report.wind_speed, Some(9.0));
        assert_eq!(
            report.cities,
            vec![
                ScrapedCity { name: "Anand Vihar".to_string(), aqi: 402 },
                ScrapedCity { name: "Lodhi Road".to_string(), aqi: 188 },
            ]
        );
    }

    #[test]
    fn test_page_without_headline_is_empty() {
        // ---
        assert!(matches!(
            parse_page("<html><body>PM2.5 : 40</body></html>"),
            Err(SourceError::EmptyPayload(_))
        ));
    }

    #[test]
    fn test_missing_particulates_are_estimated() {
        // ---
        let report = parse_page(r#"<div class="aqi">200</div>"#).unwrap();
        assert_eq!(report.pm25, 140.0);
        assert_eq!(report.pm10, 220.0);
        assert_eq!(report.temperature, None);
        assert!(report.cities.is_empty());
    }

    #[test]
    fn test_humidity_alternate_form() {
        // ---
        let report = parse_page(r#"<div class="aqi">180</div><p>64 % Humidity</p>"#).unwrap();
        assert_eq!(report.humidity, Some(64.0));
    }

    #[test]
    fn test_challenge_detection() {
        assert!(is_challenge("<title>Just a moment...</title>"));
        assert!(!is_challenge(PAGE));
    }
}
