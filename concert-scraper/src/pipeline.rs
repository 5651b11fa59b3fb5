use std::sync::Arc;

use chrono::Utc;
use concert_core::{Artist, ConcertRepository, ConcertSearchResult, CrawledData};
use tracing::{info, instrument, warn};

use crate::analyzer::{self, LlmClient, RefinedConcert};
use crate::crawlers::SiteCrawler;
use crate::filter;
use crate::orchestrator;

/// Runs the four-stage per-artist sync: crawl, persist raw, refine, persist
/// refined. Returns the number of refined rows persisted for this artist.
#[instrument(skip(repo, crawlers, llm, artist))]
pub async fn sync_one(
    repo: &dyn ConcertRepository,
    crawlers: &[Arc<dyn SiteCrawler>],
    llm: Option<&dyn LlmClient>,
    artist: &Artist,
) -> concert_core::Result<i64> {
    let raw = orchestrator::crawl_all(crawlers, &artist.name).await;

    let crawled_at = Utc::now();
    let crawled_rows: Vec<CrawledData> = raw
        .iter()
        .map(|item| CrawledData::from_raw(artist.id, item, crawled_at))
        .collect();
    repo.insert_crawled_batch(&crawled_rows).await?;

    let analyzed = match llm {
        None => Vec::new(),
        Some(client) => match analyzer::analyze(client, &artist.name, &raw).await {
            Ok(items) => items,
            Err(e) => {
                warn!(artist_name = %artist.name, error = %e, "LLM analysis failed, treating as no refined results");
                Vec::new()
            }
        },
    };

    let refined = post_filter(analyzed, !raw.is_empty());

    let rows: Vec<ConcertSearchResult> = refined
        .into_iter()
        .map(|item| to_search_result(artist, item, crawled_at))
        .collect();
    repo.insert_refined_batch(&rows).await?;

    info!(artist_name = %artist.name, refined = rows.len(), "sync_one complete");
    Ok(rows.len() as i64)
}

/// Drops pure-AI items when crawl evidence existed, and drops past-dated
/// items using the same last-matched-date rule the crawl filter uses.
fn post_filter(items: Vec<RefinedConcert>, had_crawl_evidence: bool) -> Vec<RefinedConcert> {
    let today = Utc::now().date_naive();
    items
        .into_iter()
        .filter(|item| {
            if had_crawl_evidence {
                let is_ai_only = item.source.as_deref() == Some("ai_search")
                    || item.data_sources.as_deref() == Some("ai_only");
                if is_ai_only {
                    return false;
                }
            }
            !filter::is_past_concert_date(item.concert_date.as_deref(), today)
        })
        .collect()
}

fn to_search_result(artist: &Artist, item: RefinedConcert, synced_at: chrono::DateTime<Utc>) -> ConcertSearchResult {
    ConcertSearchResult {
        id: None,
        artist_keyword_id: artist.id,
        artist_name: artist.name.clone(),
        concert_title: item.concert_title,
        venue: item.venue,
        concert_date: item.concert_date,
        concert_time: item.concert_time,
        ticket_price: item.ticket_price,
        booking_date: item.booking_date,
        booking_url: item.booking_url,
        source: Some(item.source.unwrap_or_else(|| "crawl+ai".to_string())),
        confidence: item.confidence.unwrap_or(0.0),
        data_sources: item.data_sources.unwrap_or_default(),
        is_verified: item.is_verified.unwrap_or(false),
        raw_response: item.raw_json.to_string(),
        synced_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concert_core::InMemoryRepository;

    struct Empty;

    #[async_trait::async_trait]
    impl SiteCrawler for Empty {
        fn source_name(&self) -> &'static str {
            "empty"
        }

        async fn search(&self, _artist_name: &str) -> Vec<concert_core::RawConcertData> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn empty_crawl_and_no_llm_persists_nothing() {
        let artist = Artist { id: 1, name: "NoSuchArtist".to_string() };
        let repo = InMemoryRepository::new(vec![artist.clone()]);
        let crawlers: Vec<Arc<dyn SiteCrawler>> = vec![Arc::new(Empty)];

        let count = sync_one(&repo, &crawlers, None, &artist).await.unwrap();
        assert_eq!(count, 0);
        assert!(repo.crawled_snapshot().is_empty());
        assert!(repo.refined_snapshot().is_empty());
    }

    #[test]
    fn post_filter_drops_ai_only_items_when_crawl_evidence_exists() {
        let items = vec![RefinedConcert {
            concert_title: Some("x".to_string()),
            venue: None,
            concert_date: Some("2099-01-01".to_string()),
            concert_time: None,
            ticket_price: None,
            booking_date: None,
            booking_url: None,
            source: Some("ai_search".to_string()),
            confidence: Some(0.3),
            data_sources: Some("ai_only".to_string()),
            is_verified: Some(false),
            raw_json: serde_json::json!({}),
        }];
        assert!(post_filter(items, true).is_empty());
    }

    #[test]
    fn post_filter_drops_past_dated_items() {
        let items = vec![RefinedConcert {
            concert_title: Some("x".to_string()),
            venue: None,
            concert_date: Some("2020-01-01".to_string()),
            concert_time: None,
            ticket_price: None,
            booking_date: None,
            booking_url: None,
            source: Some("crawl+ai".to_string()),
            confidence: Some(0.9),
            data_sources: Some("interpark".to_string()),
            is_verified: Some(false),
            raw_json: serde_json::json!({}),
        }];
        assert!(post_filter(items, false).is_empty());
    }
}
