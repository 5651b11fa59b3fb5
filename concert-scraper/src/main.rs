use std::sync::Arc;

use clap::{Parser, Subcommand};
use concert_core::{db, ConcertRepository, Settings};
use concert_scraper::analyzer::{GeminiClient, LlmClient};
use concert_scraper::{batch, crawlers, observability, scheduler};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "concert-sync")]
#[command(about = "Korean concert discovery sync pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync every artist from the source DB.
    SyncAll {
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Sync a single artist by exact name.
    SyncArtist {
        artist_name: String,
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Run the background scheduler in the foreground (blocks until killed).
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::logging::init_logging();
    let cli = Cli::parse();

    let settings = Settings::from_env()?;
    let pools = db::DbPools::connect(&settings.source_database_url, &settings.target_database_url).await?;

    let target_kind = db::DbKind::from_normalized_url(&concert_core::config::normalize_database_url(
        &settings.target_database_url,
    )?)?;
    db::ensure_target_schema(&pools.target, target_kind).await?;

    let repo: Arc<dyn ConcertRepository> = Arc::new(db::SqlxConcertRepository::new(pools));
    let crawler_list = crawlers::registry();
    let llm: Option<Arc<dyn LlmClient>> = settings
        .google_api_key
        .as_deref()
        .map(|key| Arc::new(GeminiClient::new(key, &settings.ai_model)) as Arc<dyn LlmClient>);
    let lock = batch::new_lock();

    match cli.command {
        Commands::SyncAll { force } => {
            let response = batch::sync_all(repo.as_ref(), &crawler_list, llm.as_deref(), &lock, force).await?;
            info!(?response, "sync-all finished");
            println!(
                "total_artists={} synced={} skipped={} concerts_found={}",
                response.total_artists, response.synced, response.skipped, response.concerts_found
            );
        }
        Commands::SyncArtist { artist_name, force } => {
            match batch::sync_by_artist_name(repo.as_ref(), &crawler_list, llm.as_deref(), &lock, &artist_name, force)
                .await?
            {
                batch::ArtistSyncOutcome::NotFound => {
                    error!(artist_name, "artist not found in source database");
                    println!("artist not found: {artist_name}");
                }
                batch::ArtistSyncOutcome::Synced { concerts_found, skipped } => {
                    println!("artist_name={artist_name} concerts_found={concerts_found} skipped={skipped}");
                }
            }
        }
        Commands::Serve => {
            let handle = scheduler::start(&settings, repo.clone(), crawler_list, llm, lock);
            match handle {
                Some(handle) => {
                    info!("scheduler started, blocking until terminated");
                    handle.await?;
                }
                None => {
                    info!("scheduler not started (missing prerequisites); idling");
                    std::future::pending::<()>().await;
                }
            }
        }
    }

    Ok(())
}
