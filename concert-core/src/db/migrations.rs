use crate::error::{PipelineError, Result};
use sqlx::any::AnyPool;
use tracing::info;

const POSTGRES_SCHEMA: &str = include_str!("../../migrations/postgres/001_target_schema.sql");
const MYSQL_SCHEMA: &str = include_str!("../../migrations/mysql/001_target_schema.sql");

/// Which relational backend a normalized connection string targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    Postgres,
    Mysql,
}

impl DbKind {
    pub fn from_normalized_url(url: &str) -> Result<Self> {
        if url.starts_with("postgres://") {
            Ok(Self::Postgres)
        } else if url.starts_with("mysql://") {
            Ok(Self::Mysql)
        } else {
            Err(PipelineError::Config {
                message: format!("cannot determine database kind for url: {url}"),
            })
        }
    }

    fn schema(self) -> &'static str {
        match self {
            DbKind::Postgres => POSTGRES_SCHEMA,
            DbKind::Mysql => MYSQL_SCHEMA,
        }
    }
}

/// Applies the target-DB schema. This system owns schema creation only for
/// its own tables; it never touches the source DB's `artist_keyword` table.
pub async fn ensure_target_schema(pool: &AnyPool, kind: DbKind) -> Result<()> {
    info!("applying target schema ({:?})", kind);
    for statement in split_statements(kind.schema()) {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

fn split_statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';').map(str::trim).filter(|s| !s.is_empty())
}
