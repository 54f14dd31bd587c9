//! Generative-AI chat proxy (`generateContent` REST endpoint).
//!
//! Never fails toward the HTTP layer: [`ChatClient::reply`] always produces
//! text, falling back to [`FALLBACK_REPLY`] when the key is missing or both
//! models fail.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::SourceError;

const SOURCE_ID: &str = "gemini";

pub const FALLBACK_REPLY: &str = "I am having trouble connecting to the AI service. Please ensure \
your GEMINI_API_KEY is set in .env.local. Meanwhile, here is typical guidance: when AQI > 200 keep \
outdoor activities light; use N95 masks in peak hours; run HEPA purifiers indoors.";

const CONTINUE_PROMPT: &str = "Please continue and finish the previous response, do not repeat prior text.";

/// One turn of the conversation as the dashboard sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `user` or `model`
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy)]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    /// Replies shorter than this are never treated as truncated.
    min_truncation_len: usize,
}

const CHAT: GenerationConfig = GenerationConfig {
    temperature: 0.7,
    max_output_tokens: 2048,
    min_truncation_len: 40,
};

const INSIGHT: GenerationConfig = GenerationConfig {
    temperature: 0.65,
    max_output_tokens: 5000,
    min_truncation_len: 60,
};

// --- wire schema

#[derive(Debug, Clone, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl Content {
    fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part { text: text.into() }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

impl GenerateResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect::<String>())
            .unwrap_or_default()
    }
}

enum CallError {
    /// 4xx: retrying will not help.
    Rejected(SourceError),
    Transient(SourceError),
}

/// A reply that runs on past a sentence without terminal punctuation.
fn looks_truncated(text: &str, min_len: usize) -> bool {
    // ---
    let trimmed = text.trim();
    if trimmed.chars().count() < min_len {
        return false;
    }
    match trimmed.chars().last() {
        Some('.' | '!' | '?' | '"' | '\'' | '`') => false,
        Some(c) => c.is_ascii_alphanumeric(),
        None => false,
    }
}

fn backoff(base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(base_ms * 2u64.pow(attempt))
}

/// System preamble built from the optional dashboard context.
fn preamble(context: Option<&serde_json::Value>) -> String {
    // ---
    let empty = serde_json::Value::Null;
    let context = context.unwrap_or(&empty);
    let text = |v: &serde_json::Value| match v {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    };

    let station = text(&context["stationId"]).unwrap_or_else(|| "MHXY_001".to_string());
    let range = text(&context["range"]).unwrap_or_else(|| "1h".to_string());

    let weather = &context["weather"];
    let weather_summary: Vec<String> = [
        ("Condition", "condition", ""),
        ("Temp", "temperature", "°C"),
        ("Humidity", "humidity", "%"),
        ("Wind", "wind", " km/h"),
        ("Pressure", "pressure", " hPa"),
    ]
    .iter()
    .filter_map(|(label, key, unit)| text(&weather[*key]).map(|v| format!("{label}: {v}{unit}")))
    .collect();

    let latest = &context["latest"];
    let readings: Vec<String> = [
        ("AQI", "aqi", ""),
        ("PM2.5", "pm25", " µg/m³"),
        ("PM10", "pm10", " µg/m³"),
        ("CO", "co", " ppm"),
        ("NO₂", "no2", " ppb"),
        ("O₃", "o3", " ppb"),
    ]
    .iter()
    .filter_map(|(label, key, unit)| text(&latest[*key]).map(|v| format!("{label}: {v}{unit}")))
    .collect();

    let mut lines = vec![
        "You are an expert air-quality assistant for Delhi-NCR.".to_string(),
        "Give personalized, actionable health advice from the current AQI, pollutants and weather."
            .to_string(),
        format!("Station: {station}; Range: {range}."),
    ];
    if !weather_summary.is_empty() {
        lines.push(format!("Current Weather: {}.", weather_summary.join(", ")));
    }
    if !readings.is_empty() {
        lines.push(format!("Latest Readings: {}.", readings.join(", ")));
    }
    lines.push(
        "AQI bands: 0-50 good, 51-100 moderate, 101-150 poor, 151-200 unhealthy, \
         201-300 severe, 301+ hazardous."
            .to_string(),
    );
    lines.push("Be concise (2-3 sentences) and reference specific numbers.".to_string());
    lines.join(" ")
}

// ---

pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    fallback_model: String,
}

impl ChatClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        fallback_model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            fallback_model: fallback_model.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn call_once(
        &self,
        api_key: &str,
        model: &str,
        contents: &[Content],
        config: GenerationConfig,
    ) -> Result<String, CallError> {
        // ---
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url,
            model.trim_start_matches("models/")
        );
        let body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": config.temperature,
                "maxOutputTokens": config.max_output_tokens,
            },
        });

        let resp = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| CallError::Transient(SourceError::from_reqwest(SOURCE_ID, e)))?;

        let status = resp.status();
        if status.is_client_error() {
            return Err(CallError::Rejected(SourceError::unavailable(
                SOURCE_ID,
                format!("HTTP {status}"),
            )));
        }
        if !status.is_success() {
            return Err(CallError::Transient(SourceError::unavailable(
                SOURCE_ID,
                format!("HTTP {status}"),
            )));
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| CallError::Transient(SourceError::from_reqwest(SOURCE_ID, e)))?;
        Ok(parsed.text())
    }

    /// Up to `max_attempts` calls with exponential backoff; 4xx is final.
    /// A first reply that looks cut off gets one continuation request.
    async fn generate(
        &self,
        model: &str,
        contents: &[Content],
        max_attempts: u32,
        config: GenerationConfig,
    ) -> Result<String, SourceError> {
        // ---
        let api_key = self.api_key.as_deref().ok_or(SourceError::Unconfigured(SOURCE_ID))?;

        for attempt in 1..=max_attempts {
            match self.call_once(api_key, model, contents, config).await {
                Ok(text) if !text.trim().is_empty() => {
                    if attempt == 1 && looks_truncated(&text, config.min_truncation_len) {
                        let mut extended = contents.to_vec();
                        extended.push(Content::user(CONTINUE_PROMPT));
                        match self.call_once(api_key, model, &extended, config).await {
                            Ok(more) if !more.trim().is_empty() => {
                                return Ok(format!("{text} {more}").trim().to_string());
                            }
                            Ok(_) => {}
                            Err(CallError::Rejected(e) | CallError::Transient(e)) => {
                                tracing::warn!("gemini continuation failed: {e}");
                            }
                        }
                    }
                    return Ok(text);
                }
                Ok(_) => {
                    tracing::warn!("gemini attempt {attempt} on {model}: empty response");
                    if attempt == max_attempts {
                        return Err(SourceError::EmptyPayload(SOURCE_ID));
                    }
                    tokio::time::sleep(backoff(200, attempt)).await;
                }
                Err(CallError::Rejected(e)) => {
                    tracing::warn!("gemini attempt {attempt} on {model} rejected: {e}");
                    return Err(e);
                }
                Err(CallError::Transient(e)) => {
                    tracing::warn!("gemini attempt {attempt} on {model} failed: {e}");
                    if attempt == max_attempts {
                        return Err(e);
                    }
                    tokio::time::sleep(backoff(300, attempt)).await;
                }
            }
        }
        Err(SourceError::EmptyPayload(SOURCE_ID))
    }

    /// Answer a chat turn: primary model once, then the fallback model twice.
    pub async fn reply(&self, messages: &[ChatMessage], context: Option<&serde_json::Value>) -> String {
        // ---
        if !self.is_configured() {
            tracing::warn!("GEMINI_API_KEY not configured, serving fallback reply");
            return FALLBACK_REPLY.to_string();
        }

        let mut contents = vec![Content::user(format!("[System Prompt]\n{}", preamble(context)))];
        contents.extend(messages.iter().map(|m| Content {
            role: m.role.clone(),
            parts: vec![Part {
                text: m.content.clone(),
            }],
        }));

        tracing::info!("chat: trying primary model {}", self.model);
        let result = match self.generate(&self.model, &contents, 1, CHAT).await {
            Ok(text) => Ok(text),
            Err(err) => {
                tracing::info!("chat: primary failed ({err}), retrying with {}", self.fallback_model);
                self.generate(&self.fallback_model, &contents, 2, CHAT).await
            }
        };

        result.unwrap_or_else(|err| {
            tracing::error!("chat: both models failed: {err}");
            FALLBACK_REPLY.to_string()
        })
    }

    /// One-shot report insight from a prepared prompt.
    pub async fn insight(&self, prompt: &str) -> Result<String, SourceError> {
        let contents = [Content::user(format!("[System Prompt]\n{prompt}"))];
        self.generate(&self.model, &contents, 2, INSIGHT).await
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_truncation_heuristic() {
        // ---
        assert!(!looks_truncated("Short reply without stop", 40));
        assert!(!looks_truncated(
            "Keep outdoor activities light today and wear an N95 mask.",
            40
        ));
        assert!(looks_truncated(
            "Keep outdoor activities light today and wear an N95 mask when PM2",
            40
        ));
        assert!(!looks_truncated(
            "Keep outdoor activities light today and wear an N95 mask -",
            40
        ));
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff(300, 1), Duration::from_millis(600));
        assert_eq!(backoff(300, 2), Duration::from_millis(1200));
    }

    #[test]
    fn test_preamble_includes_context() {
        // ---
        let context = json!({
            "stationId": "ITO",
            "weather": { "temperature": 14, "condition": "Smog" },
            "latest": { "aqi": 312, "pm25": 189.5 }
        });
        let text = preamble(Some(&context));

        assert!(text.contains("Station: ITO; Range: 1h."));
        assert!(text.contains("Condition: Smog, Temp: 14°C"));
        assert!(text.contains("AQI: 312, PM2.5: 189.5 µg/m³"));

        let bare = preamble(None);
        assert!(bare.contains("Station: MHXY_001"));
        assert!(!bare.contains("Current Weather"));
    }

    #[test]
    fn test_response_text_joins_parts() {
        // ---
        let resp: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Wear " }, { "text": "a mask." }] } }]
        }))
        .unwrap();
        assert_eq!(resp.text(), "Wear a mask.");

        let empty: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.text(), "");
    }

    #[tokio::test]
    async fn test_unconfigured_client_serves_fallback() {
        // ---
        let chat = ChatClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            None,
            "gemini-2.5-pro",
            "gemini-2.5-flash",
        );
        let messages = vec![ChatMessage {
            role: "user".to_string(),
            content: "Can I jog today?".to_string(),
        }];
        assert_eq!(chat.reply(&messages, None).await, FALLBACK_REPLY);
        assert_eq!(chat.insight("x").await.unwrap_err().class(), "unconfigured");
    }
}
