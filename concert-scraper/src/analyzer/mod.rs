pub mod gemini_client;

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use concert_core::{PipelineError, RawConcertData, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{instrument, warn};

pub use gemini_client::GeminiClient;

const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Abstraction over the LLM backend. `GeminiClient` is the production
/// implementation; tests substitute a fake that returns canned JSON without
/// making a network call.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Test-only fake that returns a fixed response regardless of prompt, so
/// pipeline/batch tests can exercise a non-empty refined path without a real
/// `GeminiClient`.
#[cfg(test)]
pub(crate) struct FakeLlmClient {
    pub response: String,
}

#[cfg(test)]
#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok(self.response.clone())
    }
}

/// One refined concert as returned by the model, plus the verbatim JSON it
/// was parsed from (persisted as `raw_response`).
#[derive(Debug, Clone)]
pub struct RefinedConcert {
    pub concert_title: Option<String>,
    pub venue: Option<String>,
    pub concert_date: Option<String>,
    pub concert_time: Option<String>,
    pub ticket_price: Option<String>,
    pub booking_date: Option<String>,
    pub booking_url: Option<String>,
    pub source: Option<String>,
    pub confidence: Option<f64>,
    pub data_sources: Option<String>,
    pub is_verified: Option<bool>,
    pub raw_json: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct RefinedItemFields {
    concert_title: Option<String>,
    venue: Option<String>,
    concert_date: Option<String>,
    concert_time: Option<String>,
    ticket_price: Option<String>,
    booking_date: Option<String>,
    booking_url: Option<String>,
    source: Option<String>,
    confidence: Option<f64>,
    data_sources: Option<String>,
    is_verified: Option<bool>,
}

/// Transforms crawl output into refined concert records. Mode A (crawl-driven)
/// when `raw` is non-empty; Mode B (direct web search) otherwise.
#[instrument(skip(client, raw))]
pub async fn analyze(client: &dyn LlmClient, artist_name: &str, raw: &[RawConcertData]) -> Result<Vec<RefinedConcert>> {
    let prompt = if raw.is_empty() {
        fallback_prompt(artist_name)
    } else {
        refine_prompt(artist_name, raw)
    };

    let text = match call_with_retry(client, &prompt).await {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, artist_name, "LLM call failed after retries");
            return Err(e);
        }
    };

    let items = match parse_response(&text) {
        Some(items) => items,
        None => {
            warn!(artist_name, "LLM response was not valid JSON, treating as empty");
            return Ok(Vec::new());
        }
    };

    if raw.is_empty() {
        Ok(items)
    } else {
        Ok(enforce_crawl_bound(items, raw))
    }
}

fn refine_prompt(artist_name: &str, raw: &[RawConcertData]) -> String {
    let payload = serde_json::to_string(raw).unwrap_or_else(|_| "[]".to_string());
    format!(
        "You are refining concert listings crawled from Korean ticketing sites for the \
         artist \"{artist_name}\". Crawled items (JSON array):\n{payload}\n\n\
         Return a JSON array with exactly one refined object per crawl item (never merge \
         items across sites, never invent items absent from the list). For each item: \
         normalize concert_date to YYYY-MM-DD and concert_time to HH:MM; if the same show \
         appears under multiple sites, set is_verified=true on all corresponding items and \
         list every contributing site in data_sources as a comma-separated list; otherwise \
         is_verified=false and data_sources names the single site. Use web search to fill in \
         missing concert_time, ticket_price, or booking_date. Format ticket_price using \
         Korean-won tiers: a single price tier as \"전석 X원\", multiple tiers as \"VIP X원 / \
         R석 Y원 / S석 Z원\" (never collapse distinctly named tiers such as 지정석 and 스탠딩석 \
         into 전석). Each object must have: concert_title, venue, concert_date, concert_time, \
         ticket_price, booking_date, booking_url, source, confidence, data_sources, \
         is_verified. Respond with only the JSON array."
    )
}

fn fallback_prompt(artist_name: &str) -> String {
    format!(
        "Search the web for upcoming Korean concerts for the artist \"{artist_name}\". \
         Exclude any concert whose date has already passed. Return a JSON array of objects \
         with: concert_title, venue, concert_date (YYYY-MM-DD), concert_time (HH:MM), \
         ticket_price, booking_date, booking_url, source=\"ai_search\", confidence=0.3, \
         data_sources=\"ai_only\", is_verified=false. Respond with only the JSON array."
    )
}

static RETRY_HINT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)retry\D{0,10}(\d+)").unwrap());

async fn call_with_retry(client: &dyn LlmClient, prompt: &str) -> Result<String> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match client.generate(prompt).await {
            Ok(text) => return Ok(text),
            Err(e) if is_rate_limited(&e) && attempt < MAX_RETRY_ATTEMPTS => {
                let wait = retry_wait(&e.to_string());
                warn!(attempt, wait_secs = wait.as_secs(), "LLM rate-limited, backing off");
                tokio::time::sleep(wait).await;
            }
            Err(e) => return Err(e),
        }
    }
}

fn is_rate_limited(e: &PipelineError) -> bool {
    e.to_string().contains("429")
}

fn retry_wait(message: &str) -> Duration {
    match RETRY_HINT_RE.captures(message).and_then(|c| c[1].parse::<u64>().ok()) {
        Some(hint) => Duration::from_secs(hint + 5),
        None => Duration::from_secs(25),
    }
}

fn parse_response(text: &str) -> Option<Vec<RefinedConcert>> {
    let stripped = strip_json_fence(text);
    let value: serde_json::Value = serde_json::from_str(stripped).ok()?;
    let array = match value {
        serde_json::Value::Array(items) => items,
        obj @ serde_json::Value::Object(_) => vec![obj],
        _ => return None,
    };

    let items = array
        .into_iter()
        .map(|raw_json| {
            let fields: RefinedItemFields = serde_json::from_value(raw_json.clone()).unwrap_or_default();
            RefinedConcert {
                concert_title: fields.concert_title,
                venue: fields.venue,
                concert_date: fields.concert_date,
                concert_time: fields.concert_time,
                ticket_price: fields.ticket_price,
                booking_date: fields.booking_date,
                booking_url: fields.booking_url,
                source: fields.source,
                confidence: fields.confidence,
                data_sources: fields.data_sources,
                is_verified: fields.is_verified,
                raw_json,
            }
        })
        .collect();
    Some(items)
}

fn strip_json_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let without_prefix = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_prefix.strip_suffix("```").unwrap_or(without_prefix).trim()
}

/// Enforces |refined| <= |raw|: if the model over-produced, keep only items
/// whose booking_url matches a crawled item; if none match, truncate.
fn enforce_crawl_bound(items: Vec<RefinedConcert>, raw: &[RawConcertData]) -> Vec<RefinedConcert> {
    if items.len() <= raw.len() {
        return items;
    }

    let raw_urls: HashSet<&str> = raw.iter().filter_map(|r| r.booking_url.as_deref()).collect();
    let matched: Vec<_> = items
        .iter()
        .filter(|item| item.booking_url.as_deref().map(|u| raw_urls.contains(u)).unwrap_or(false))
        .cloned()
        .collect();

    if matched.is_empty() {
        items.into_iter().take(raw.len()).collect()
    } else {
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_item(url: &str) -> RawConcertData {
        RawConcertData {
            booking_url: Some(url.to_string()),
            ..Default::default()
        }
    }

    fn refined(url: Option<&str>) -> RefinedConcert {
        RefinedConcert {
            concert_title: None,
            venue: None,
            concert_date: None,
            concert_time: None,
            ticket_price: None,
            booking_date: None,
            booking_url: url.map(str::to_string),
            source: None,
            confidence: None,
            data_sources: None,
            is_verified: None,
            raw_json: serde_json::json!({}),
        }
    }

    #[test]
    fn strips_json_code_fence() {
        assert_eq!(strip_json_fence("```json\n[1,2]\n```"), "[1,2]");
        assert_eq!(strip_json_fence("```\n[1,2]\n```"), "[1,2]");
        assert_eq!(strip_json_fence("[1,2]"), "[1,2]");
    }

    #[test]
    fn wraps_single_object_into_one_element_array() {
        let items = parse_response(r#"{"concert_title": "아이유 콘서트"}"#).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].concert_title.as_deref(), Some("아이유 콘서트"));
    }

    #[test]
    fn invalid_json_yields_none() {
        assert!(parse_response("not json at all").is_none());
    }

    #[test]
    fn under_or_equal_bound_passes_through() {
        let raw = vec![raw_item("https://a"), raw_item("https://b")];
        let items = vec![refined(Some("https://a"))];
        let result = enforce_crawl_bound(items.clone(), &raw);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn over_bound_keeps_only_url_matches() {
        let raw = vec![raw_item("https://a"), raw_item("https://b")];
        let items = vec![
            refined(Some("https://a")),
            refined(Some("https://b")),
            refined(Some("https://c")),
            refined(Some("https://d")),
        ];
        let result = enforce_crawl_bound(items, &raw);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|r| ["https://a", "https://b"].contains(&r.booking_url.as_deref().unwrap())));
    }

    #[test]
    fn over_bound_with_no_matches_truncates_to_raw_count() {
        let raw = vec![raw_item("https://a")];
        let items = vec![refined(Some("https://x")), refined(Some("https://y")), refined(None)];
        let result = enforce_crawl_bound(items, &raw);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn parses_retry_hint_from_message() {
        assert_eq!(retry_wait("rate limited, please retry after 10 seconds"), Duration::from_secs(15));
        assert_eq!(retry_wait("429 too many requests"), Duration::from_secs(25));
    }
}
