use crate::domain::{Artist, ConcertSearchResult, CrawledData};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Mutex;

/// Persistence boundary for the sync pipeline. A single trait backs both the
/// sqlx-backed production implementation and an in-memory test double.
#[async_trait]
pub trait ConcertRepository: Send + Sync {
    /// All artists from the source DB, in their natural (insertion) order.
    async fn fetch_artists(&self) -> Result<Vec<Artist>>;

    /// Exact-name lookup in the source DB.
    async fn find_artist_by_name(&self, name: &str) -> Result<Option<Artist>>;

    /// Distinct `artist_keyword_id` values already present in
    /// `concert_search_results` (target DB).
    async fn already_synced_ids(&self) -> Result<HashSet<i64>>;

    /// Inserts all rows in one transaction, committing once after the batch.
    /// A no-op (no transaction opened) when `rows` is empty.
    async fn insert_crawled_batch(&self, rows: &[CrawledData]) -> Result<()>;

    /// Inserts all rows in one transaction, committing once after the batch.
    async fn insert_refined_batch(&self, rows: &[ConcertSearchResult]) -> Result<()>;

    /// Deletes prior `concert_search_results` and `crawled_data` rows for an
    /// artist, in one transaction. Used by force-mode re-ingestion.
    async fn delete_artist_rows(&self, artist_keyword_id: i64) -> Result<()>;

    async fn get_results(&self, artist_name: Option<&str>) -> Result<Vec<ConcertSearchResult>>;

    async fn get_results_by_keyword_id(&self, artist_keyword_id: i64) -> Result<Vec<ConcertSearchResult>>;

    async fn get_crawled_data(&self, artist_name: Option<&str>) -> Result<Vec<CrawledData>>;
}

pub struct SqlxConcertRepository {
    pools: crate::db::pool::DbPools,
}

impl SqlxConcertRepository {
    pub fn new(pools: crate::db::pool::DbPools) -> Self {
        Self { pools }
    }
}

#[async_trait]
impl ConcertRepository for SqlxConcertRepository {
    async fn fetch_artists(&self) -> Result<Vec<Artist>> {
        let rows = sqlx::query_as::<_, (i64, String)>("SELECT id, name FROM artist_keyword ORDER BY id")
            .fetch_all(&self.pools.source)
            .await?;
        Ok(rows.into_iter().map(|(id, name)| Artist { id, name }).collect())
    }

    async fn find_artist_by_name(&self, name: &str) -> Result<Option<Artist>> {
        let row = sqlx::query_as::<_, (i64, String)>(
            "SELECT id, name FROM artist_keyword WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pools.source)
        .await?;
        Ok(row.map(|(id, name)| Artist { id, name }))
    }

    async fn already_synced_ids(&self) -> Result<HashSet<i64>> {
        let rows = sqlx::query_as::<_, (i64,)>(
            "SELECT DISTINCT artist_keyword_id FROM concert_search_results",
        )
        .fetch_all(&self.pools.target)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn insert_crawled_batch(&self, rows: &[CrawledData]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut tx = self.pools.target.begin().await?;
        for row in rows {
            sqlx::query(
                "INSERT INTO crawled_data
                 (artist_keyword_id, artist_name, source_site, title, venue, date, time, price, booking_url, crawled_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(row.artist_keyword_id)
            .bind(&row.artist_name)
            .bind(&row.source_site)
            .bind(&row.title)
            .bind(&row.venue)
            .bind(&row.date)
            .bind(&row.time)
            .bind(&row.price)
            .bind(&row.booking_url)
            .bind(row.crawled_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn insert_refined_batch(&self, rows: &[ConcertSearchResult]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut tx = self.pools.target.begin().await?;
        for row in rows {
            sqlx::query(
                "INSERT INTO concert_search_results
                 (artist_keyword_id, artist_name, concert_title, venue, concert_date, concert_time,
                  ticket_price, booking_date, booking_url, source, raw_response, confidence,
                  data_sources, is_verified, synced_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(row.artist_keyword_id)
            .bind(&row.artist_name)
            .bind(&row.concert_title)
            .bind(&row.venue)
            .bind(&row.concert_date)
            .bind(&row.concert_time)
            .bind(&row.ticket_price)
            .bind(&row.booking_date)
            .bind(&row.booking_url)
            .bind(&row.source)
            .bind(&row.raw_response)
            .bind(row.confidence)
            .bind(&row.data_sources)
            .bind(row.is_verified)
            .bind(row.synced_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_artist_rows(&self, artist_keyword_id: i64) -> Result<()> {
        let mut tx = self.pools.target.begin().await?;
        sqlx::query("DELETE FROM concert_search_results WHERE artist_keyword_id = ?")
            .bind(artist_keyword_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM crawled_data WHERE artist_keyword_id = ?")
            .bind(artist_keyword_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_results(&self, artist_name: Option<&str>) -> Result<Vec<ConcertSearchResult>> {
        const SELECT: &str = "SELECT id, artist_keyword_id, artist_name, concert_title, venue, concert_date,
                    concert_time, ticket_price, booking_date, booking_url, source, raw_response,
                    confidence, data_sources, is_verified, synced_at
             FROM concert_search_results";
        let rows = match artist_name {
            Some(name) => {
                sqlx::query_as::<_, ConcertSearchResultRow>(&format!(
                    "{SELECT} WHERE artist_name LIKE ? ORDER BY synced_at DESC"
                ))
                .bind(format!("%{name}%"))
                .fetch_all(&self.pools.target)
                .await?
            }
            None => {
                sqlx::query_as::<_, ConcertSearchResultRow>(&format!("{SELECT} ORDER BY synced_at DESC"))
                    .fetch_all(&self.pools.target)
                    .await?
            }
        };
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_results_by_keyword_id(&self, artist_keyword_id: i64) -> Result<Vec<ConcertSearchResult>> {
        let rows = sqlx::query_as::<_, ConcertSearchResultRow>(
            "SELECT id, artist_keyword_id, artist_name, concert_title, venue, concert_date,
                    concert_time, ticket_price, booking_date, booking_url, source, raw_response,
                    confidence, data_sources, is_verified, synced_at
             FROM concert_search_results
             WHERE artist_keyword_id = ?
             ORDER BY synced_at DESC",
        )
        .bind(artist_keyword_id)
        .fetch_all(&self.pools.target)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_crawled_data(&self, artist_name: Option<&str>) -> Result<Vec<CrawledData>> {
        const SELECT: &str = "SELECT id, artist_keyword_id, artist_name, source_site, title, venue, date, time,
                    price, booking_url, crawled_at
             FROM crawled_data";
        let rows = match artist_name {
            Some(name) => {
                sqlx::query_as::<_, CrawledDataRow>(&format!("{SELECT} WHERE artist_name LIKE ? ORDER BY crawled_at DESC"))
                    .bind(format!("%{name}%"))
                    .fetch_all(&self.pools.target)
                    .await?
            }
            None => {
                sqlx::query_as::<_, CrawledDataRow>(&format!("{SELECT} ORDER BY crawled_at DESC"))
                    .fetch_all(&self.pools.target)
                    .await?
            }
        };
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(sqlx::FromRow)]
struct ConcertSearchResultRow {
    id: i64,
    artist_keyword_id: i64,
    artist_name: String,
    concert_title: Option<String>,
    venue: Option<String>,
    concert_date: Option<String>,
    concert_time: Option<String>,
    ticket_price: Option<String>,
    booking_date: Option<String>,
    booking_url: Option<String>,
    source: Option<String>,
    raw_response: String,
    confidence: f64,
    data_sources: String,
    is_verified: bool,
    synced_at: DateTime<Utc>,
}

impl From<ConcertSearchResultRow> for ConcertSearchResult {
    fn from(r: ConcertSearchResultRow) -> Self {
        ConcertSearchResult {
            id: Some(r.id),
            artist_keyword_id: r.artist_keyword_id,
            artist_name: r.artist_name,
            concert_title: r.concert_title,
            venue: r.venue,
            concert_date: r.concert_date,
            concert_time: r.concert_time,
            ticket_price: r.ticket_price,
            booking_date: r.booking_date,
            booking_url: r.booking_url,
            source: r.source,
            confidence: r.confidence,
            data_sources: r.data_sources,
            is_verified: r.is_verified,
            raw_response: r.raw_response,
            synced_at: r.synced_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CrawledDataRow {
    id: i64,
    artist_keyword_id: i64,
    artist_name: String,
    source_site: String,
    title: String,
    venue: Option<String>,
    date: Option<String>,
    time: Option<String>,
    price: Option<String>,
    booking_url: Option<String>,
    crawled_at: DateTime<Utc>,
}

impl From<CrawledDataRow> for CrawledData {
    fn from(r: CrawledDataRow) -> Self {
        CrawledData {
            id: Some(r.id),
            artist_keyword_id: r.artist_keyword_id,
            artist_name: r.artist_name,
            source_site: r.source_site,
            title: r.title,
            venue: r.venue,
            date: r.date,
            time: r.time,
            price: r.price,
            booking_url: r.booking_url,
            crawled_at: r.crawled_at,
        }
    }
}

/// In-memory `ConcertRepository` used by pipeline/batch-sync tests so the
/// sync invariants and idempotency rules can be exercised without a live
/// database.
pub struct InMemoryRepository {
    artists: Vec<Artist>,
    crawled: Mutex<Vec<CrawledData>>,
    refined: Mutex<Vec<ConcertSearchResult>>,
    next_crawled_id: Mutex<i64>,
    next_refined_id: Mutex<i64>,
}

impl InMemoryRepository {
    pub fn new(artists: Vec<Artist>) -> Self {
        Self {
            artists,
            crawled: Mutex::new(Vec::new()),
            refined: Mutex::new(Vec::new()),
            next_crawled_id: Mutex::new(1),
            next_refined_id: Mutex::new(1),
        }
    }

    pub fn crawled_snapshot(&self) -> Vec<CrawledData> {
        self.crawled.lock().unwrap().clone()
    }

    pub fn refined_snapshot(&self) -> Vec<ConcertSearchResult> {
        self.refined.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConcertRepository for InMemoryRepository {
    async fn fetch_artists(&self) -> Result<Vec<Artist>> {
        Ok(self.artists.clone())
    }

    async fn find_artist_by_name(&self, name: &str) -> Result<Option<Artist>> {
        Ok(self.artists.iter().find(|a| a.name == name).cloned())
    }

    async fn already_synced_ids(&self) -> Result<HashSet<i64>> {
        Ok(self
            .refined
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.artist_keyword_id)
            .collect())
    }

    async fn insert_crawled_batch(&self, rows: &[CrawledData]) -> Result<()> {
        let mut store = self.crawled.lock().unwrap();
        let mut next_id = self.next_crawled_id.lock().unwrap();
        for row in rows {
            let mut row = row.clone();
            row.id = Some(*next_id);
            *next_id += 1;
            store.push(row);
        }
        Ok(())
    }

    async fn insert_refined_batch(&self, rows: &[ConcertSearchResult]) -> Result<()> {
        let mut store = self.refined.lock().unwrap();
        let mut next_id = self.next_refined_id.lock().unwrap();
        for row in rows {
            let mut row = row.clone();
            row.id = Some(*next_id);
            *next_id += 1;
            store.push(row);
        }
        Ok(())
    }

    async fn delete_artist_rows(&self, artist_keyword_id: i64) -> Result<()> {
        self.refined
            .lock()
            .unwrap()
            .retain(|r| r.artist_keyword_id != artist_keyword_id);
        self.crawled
            .lock()
            .unwrap()
            .retain(|r| r.artist_keyword_id != artist_keyword_id);
        Ok(())
    }

    async fn get_results(&self, artist_name: Option<&str>) -> Result<Vec<ConcertSearchResult>> {
        let store = self.refined.lock().unwrap();
        Ok(match artist_name {
            Some(name) => store.iter().filter(|r| r.artist_name.contains(name)).cloned().collect(),
            None => store.clone(),
        })
    }

    async fn get_results_by_keyword_id(&self, artist_keyword_id: i64) -> Result<Vec<ConcertSearchResult>> {
        Ok(self
            .refined
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.artist_keyword_id == artist_keyword_id)
            .cloned()
            .collect())
    }

    async fn get_crawled_data(&self, artist_name: Option<&str>) -> Result<Vec<CrawledData>> {
        let store = self.crawled.lock().unwrap();
        Ok(match artist_name {
            Some(name) => store.iter().filter(|r| r.artist_name.contains(name)).cloned().collect(),
            None => store.clone(),
        })
    }
}
