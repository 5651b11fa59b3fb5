use std::sync::Arc;

use concert_core::{ConcertRepository, Settings};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::analyzer::LlmClient;
use crate::batch::{self, SyncLock};
use crate::crawlers::SiteCrawler;

/// Spawns the background scheduler when `settings.scheduler_ready()` holds:
/// runs `sync_all(force=false)` immediately, then every `sync_interval_secs`.
/// Returns `None` (and logs why) when any prerequisite is missing — the
/// manual-trigger path remains available either way.
pub fn start(
    settings: &Settings,
    repo: Arc<dyn ConcertRepository>,
    crawlers: Vec<Arc<dyn SiteCrawler>>,
    llm: Option<Arc<dyn LlmClient>>,
    lock: SyncLock,
) -> Option<JoinHandle<()>> {
    if !settings.scheduler_ready() {
        info!("scheduler prerequisites not met, skipping background sync");
        return None;
    }

    let interval_secs = settings.sync_interval_secs;

    Some(tokio::spawn(async move {
        run_loop(repo, crawlers, llm, lock, interval_secs).await;
    }))
}

async fn run_loop(
    repo: Arc<dyn ConcertRepository>,
    crawlers: Vec<Arc<dyn SiteCrawler>>,
    llm: Option<Arc<dyn LlmClient>>,
    lock: SyncLock,
    interval_secs: u64,
) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
    loop {
        interval.tick().await;
        info!("scheduler: running sync_all(force=false)");
        let llm_ref = llm.as_deref();
        match batch::sync_all(repo.as_ref(), &crawlers, llm_ref, &lock, false).await {
            Ok(response) => info!(
                synced = response.synced,
                skipped = response.skipped,
                concerts_found = response.concerts_found,
                "scheduled sync complete"
            ),
            Err(e) => error!(error = %e, "scheduled sync failed"),
        }
    }
}
