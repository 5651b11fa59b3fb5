use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row read from the source database. Identity lives in `id`; the system
/// never writes to this table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub id: i64,
    pub name: String,
}

/// One per-site observation produced by a crawler, before persistence.
/// Identity is implicit: (`source_site`, `booking_url`) when the URL is
/// present, otherwise there is no stable identity.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawConcertData {
    pub title: String,
    pub artist_name: String,
    pub source_site: String,
    pub venue: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub price: Option<String>,
    pub booking_url: Option<String>,
}

/// Append-only row in the target DB: one raw observation that survived the
/// filter. Never updated after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawledData {
    pub id: Option<i64>,
    pub artist_keyword_id: i64,
    pub artist_name: String,
    pub source_site: String,
    pub title: String,
    pub venue: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub price: Option<String>,
    pub booking_url: Option<String>,
    pub crawled_at: DateTime<Utc>,
}

impl CrawledData {
    pub fn from_raw(artist_keyword_id: i64, item: &RawConcertData, crawled_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            artist_keyword_id,
            artist_name: item.artist_name.clone(),
            source_site: item.source_site.clone(),
            title: item.title.clone(),
            venue: item.venue.clone(),
            date: item.date.clone(),
            time: item.time.clone(),
            price: item.price.clone(),
            booking_url: item.booking_url.clone(),
            crawled_at,
        }
    }
}

/// Append-only refined concert record produced by the LLM analyzer and
/// persisted per sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcertSearchResult {
    pub id: Option<i64>,
    pub artist_keyword_id: i64,
    pub artist_name: String,
    pub concert_title: Option<String>,
    pub venue: Option<String>,
    pub concert_date: Option<String>,
    pub concert_time: Option<String>,
    pub ticket_price: Option<String>,
    pub booking_date: Option<String>,
    pub booking_url: Option<String>,
    pub source: Option<String>,
    pub confidence: f64,
    pub data_sources: String,
    pub is_verified: bool,
    pub raw_response: String,
    pub synced_at: DateTime<Utc>,
}

/// Aggregate outcome of a `sync_all`/`sync_by_artist_name` call.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SyncResponse {
    pub total_artists: i64,
    pub synced: i64,
    pub skipped: i64,
    pub concerts_found: i64,
}

/// Outcome of a single-artist manual trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistSyncResponse {
    pub artist_name: String,
    pub concerts_found: i64,
    pub skipped: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crawled_data_from_raw_copies_fields() {
        let raw = RawConcertData {
            title: "IU Concert".into(),
            artist_name: "아이유".into(),
            source_site: "interpark".into(),
            venue: Some("KSPO DOME".into()),
            date: Some("2026.05.01".into()),
            time: None,
            price: None,
            booking_url: Some("https://tickets.interpark.com/goods/999".into()),
        };
        let now = Utc::now();
        let row = CrawledData::from_raw(7, &raw, now);
        assert_eq!(row.artist_keyword_id, 7);
        assert_eq!(row.title, raw.title);
        assert_eq!(row.booking_url, raw.booking_url);
        assert!(row.id.is_none());
    }
}
