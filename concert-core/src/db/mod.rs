pub mod migrations;
pub mod pool;
pub mod repository;

pub use migrations::{ensure_target_schema, DbKind};
pub use pool::DbPools;
pub use repository::{ConcertRepository, InMemoryRepository, SqlxConcertRepository};
