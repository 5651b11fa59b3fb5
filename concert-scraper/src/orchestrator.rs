use std::sync::Arc;

use chrono::Utc;
use concert_core::RawConcertData;
use futures::future::join_all;
use tracing::{instrument, warn};

use crate::crawlers::SiteCrawler;
use crate::filter;

/// Fans out every registered crawler's `search` concurrently in its own
/// task, joins before returning, and concatenates in registration order. A
/// crawler whose task panics is isolated by the join — it contributes the
/// empty list and the others are unaffected.
#[instrument(skip(crawlers))]
pub async fn crawl_all(crawlers: &[Arc<dyn SiteCrawler>], artist_name: &str) -> Vec<RawConcertData> {
    let tasks = crawlers.iter().cloned().map(|crawler| {
        let name = artist_name.to_string();
        tokio::spawn(async move { crawler.search(&name).await })
    });

    let results = join_all(tasks).await;
    let mut raw = Vec::new();
    for result in results {
        match result {
            Ok(items) => raw.extend(items),
            Err(e) => warn!(error = %e, "crawler task panicked, contributing no items"),
        }
    }
    filter::apply(raw, Utc::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct AlwaysPanics;

    #[async_trait]
    impl SiteCrawler for AlwaysPanics {
        fn source_name(&self) -> &'static str {
            "panicking"
        }

        async fn search(&self, _artist_name: &str) -> Vec<RawConcertData> {
            panic!("simulated site outage")
        }
    }

    struct ReturnsOne;

    #[async_trait]
    impl SiteCrawler for ReturnsOne {
        fn source_name(&self) -> &'static str {
            "reliable"
        }

        async fn search(&self, artist_name: &str) -> Vec<RawConcertData> {
            vec![RawConcertData {
                title: "콘서트".to_string(),
                artist_name: artist_name.to_string(),
                source_site: "reliable".to_string(),
                date: Some("2099.01.01".to_string()),
                ..Default::default()
            }]
        }
    }

    #[tokio::test]
    async fn one_panicking_crawler_does_not_lose_the_others_results() {
        let crawlers: Vec<Arc<dyn SiteCrawler>> = vec![Arc::new(AlwaysPanics), Arc::new(ReturnsOne)];
        let result = crawl_all(&crawlers, "아이유").await;
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].source_site, "reliable");
    }
}
