mod handlers;
mod models;
mod routes;
mod state;

use std::sync::Arc;

use concert_core::{db, ConcertRepository, Settings};
use concert_scraper::analyzer::{GeminiClient, LlmClient};
use concert_scraper::{batch, crawlers, scheduler};
use tracing::info;

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let settings = Settings::from_env()?;
    let pools = db::DbPools::connect(&settings.source_database_url, &settings.target_database_url).await?;

    let target_kind =
        db::DbKind::from_normalized_url(&concert_core::config::normalize_database_url(&settings.target_database_url)?)?;
    db::ensure_target_schema(&pools.target, target_kind).await?;

    let repo: Arc<dyn ConcertRepository> = Arc::new(db::SqlxConcertRepository::new(pools));
    let crawler_list = Arc::new(crawlers::registry());
    let llm: Option<Arc<dyn LlmClient>> = settings
        .google_api_key
        .as_deref()
        .map(|key| Arc::new(GeminiClient::new(key, &settings.ai_model)) as Arc<dyn LlmClient>);
    let lock = batch::new_lock();

    let scheduler_handle = scheduler::start(
        &settings,
        repo.clone(),
        crawler_list.as_ref().clone(),
        llm.clone(),
        lock.clone(),
    );
    if scheduler_handle.is_some() {
        info!("background scheduler running");
    }

    let state = AppState {
        repo,
        crawlers: crawler_list,
        llm,
        lock,
    };

    let app = routes::app_router(state);
    let port: u16 = std::env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "concert-web listening");
    axum::serve(listener, app).await?;

    Ok(())
}
