pub mod config;
pub mod db;
pub mod domain;
pub mod error;

pub use config::Settings;
pub use db::{ConcertRepository, DbPools, InMemoryRepository, SqlxConcertRepository};
pub use domain::{Artist, ArtistSyncResponse, ConcertSearchResult, CrawledData, RawConcertData, SyncResponse};
pub use error::{PipelineError, Result};
