use crate::config::normalize_database_url;
use crate::error::Result;
use sqlx::any::{AnyPool, AnyPoolOptions};

/// Two distinct connection pools: `source` (read-only artist lookups) and
/// `target` (raw + refined concert data). They may point at the same
/// physical database or two different ones. `test_before_acquire` is the
/// pool-pre-ping equivalent so long-idle scheduler workers recover from
/// server-side idle disconnects.
pub struct DbPools {
    pub source: AnyPool,
    pub target: AnyPool,
}

async fn connect(raw_url: &str) -> Result<AnyPool> {
    let url = normalize_database_url(raw_url)?;
    let pool = AnyPoolOptions::new()
        .max_connections(10)
        .test_before_acquire(true)
        .connect(&url)
        .await?;
    Ok(pool)
}

impl DbPools {
    /// Connects source and target pools. If both configured URLs normalize
    /// to the same string, the same underlying pool is still opened twice —
    /// each side keeps its own connection budget since source usage is
    /// read-only and target usage is read/write.
    pub async fn connect(source_url: &str, target_url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();
        let source = connect(source_url).await?;
        let target = connect(target_url).await?;
        Ok(Self { source, target })
    }
}
