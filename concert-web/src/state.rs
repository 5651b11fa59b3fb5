use std::sync::Arc;

use concert_core::ConcertRepository;
use concert_scraper::analyzer::LlmClient;
use concert_scraper::crawlers::SiteCrawler;
use concert_scraper::SyncLock;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn ConcertRepository>,
    pub crawlers: Arc<Vec<Arc<dyn SiteCrawler>>>,
    pub llm: Option<Arc<dyn LlmClient>>,
    pub lock: SyncLock,
}
