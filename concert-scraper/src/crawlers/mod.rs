pub mod http;
pub mod interpark;
pub mod melon;
pub mod ticketlink;
pub mod yes24;

use std::sync::Arc;

use async_trait::async_trait;
use concert_core::RawConcertData;

/// One ticketing site. Stateless, independent, and never allowed to fail the
/// caller — errors are swallowed and logged inside `search`.
#[async_trait]
pub trait SiteCrawler: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn search(&self, artist_name: &str) -> Vec<RawConcertData>;
}

/// Crawlers in registration order; `crawl_all` in the orchestrator
/// concatenates results in this order. `Arc` (rather than `Box`) so each
/// crawler can be moved into its own spawned task for panic isolation.
pub fn registry() -> Vec<Arc<dyn SiteCrawler>> {
    vec![
        Arc::new(interpark::InterparkCrawler::new()),
        Arc::new(melon::MelonCrawler::new()),
        Arc::new(ticketlink::TicketLinkCrawler::new()),
        Arc::new(yes24::Yes24Crawler::new()),
    ]
}
