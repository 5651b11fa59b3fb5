use chrono::NaiveDate;
use concert_core::RawConcertData;
use once_cell::sync::Lazy;
use regex::Regex;

const EXCLUDED_KEYWORDS: &[&str] = &[
    "연극", "뮤지컬", "전시", "오페라", "발레", "클래식", "국악", "아동", "어린이", "키즈",
];

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})[.\-/](\d{1,2})[.\-/](\d{1,2})").unwrap());

/// Applies date-range expansion, non-concert exclusion, and past-event
/// exclusion, in that order, to one crawl result list. Applied uniformly at
/// the orchestrator boundary for every site.
pub fn apply(items: Vec<RawConcertData>, today: NaiveDate) -> Vec<RawConcertData> {
    let expanded = expand_date_ranges(items);
    let kept_concerts: Vec<_> = expanded.into_iter().filter(|item| !is_excluded_category(item)).collect();
    kept_concerts.into_iter().filter(|item| !is_past(item, today)).collect()
}

fn expand_date_ranges(items: Vec<RawConcertData>) -> Vec<RawConcertData> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let Some(date) = item.date.as_deref() else {
            out.push(item);
            continue;
        };
        let matches: Vec<_> = DATE_RE.captures_iter(date).collect();
        if matches.len() <= 1 {
            out.push(item);
            continue;
        }
        for m in matches {
            let mut copy = item.clone();
            copy.date = Some(format_date(&m));
            out.push(copy);
        }
    }
    out
}

fn format_date(captures: &regex::Captures) -> String {
    let year = &captures[1];
    let month: u32 = captures[2].parse().unwrap_or(1);
    let day: u32 = captures[3].parse().unwrap_or(1);
    format!("{year}.{month:02}.{day:02}")
}

fn is_excluded_category(item: &RawConcertData) -> bool {
    EXCLUDED_KEYWORDS.iter().any(|kw| item.title.contains(kw))
}

fn is_past(item: &RawConcertData, today: NaiveDate) -> bool {
    is_past_concert_date(item.date.as_deref(), today)
}

/// Same last-matched-date rule as the crawl filter, exposed for the
/// pipeline's post-filter step which applies it to the LLM's normalized
/// `concert_date` rather than a raw crawl `date` string.
pub fn is_past_concert_date(date: Option<&str>, today: NaiveDate) -> bool {
    let Some(date) = date else {
        return false;
    };
    let Some(last) = DATE_RE.captures_iter(date).last() else {
        return false;
    };
    let Some(parsed) = parse_captures(&last) else {
        return false;
    };
    parsed < today
}

fn parse_captures(captures: &regex::Captures) -> Option<NaiveDate> {
    let year: i32 = captures[1].parse().ok()?;
    let month: u32 = captures[2].parse().ok()?;
    let day: u32 = captures[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, date: Option<&str>) -> RawConcertData {
        RawConcertData {
            title: title.to_string(),
            artist_name: "아이유".to_string(),
            source_site: "interpark".to_string(),
            date: date.map(str::to_string),
            ..Default::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 30).unwrap()
    }

    #[test]
    fn expands_multi_date_ranges_one_per_match() {
        let items = vec![item("아이유 콘서트", Some("2026.05.01~2026.05.03"))];
        let result = apply(items, today());
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].date.as_deref(), Some("2026.05.01"));
        assert_eq!(result[1].date.as_deref(), Some("2026.05.03"));
    }

    #[test]
    fn single_date_passes_through_unchanged() {
        let items = vec![item("아이유 콘서트", Some("2026.05.01"))];
        let result = apply(items, today());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].date.as_deref(), Some("2026.05.01"));
    }

    #[test]
    fn drops_non_concert_category_titles() {
        let items = vec![item("뮤지컬 프랑켄슈타인", Some("2026.09.01"))];
        assert!(apply(items, today()).is_empty());
    }

    #[test]
    fn drops_past_events_by_last_matched_date() {
        let items = vec![item("지난 공연", Some("2020.01.01"))];
        assert!(apply(items, today()).is_empty());
    }

    #[test]
    fn missing_or_unparseable_date_is_kept() {
        let items = vec![item("공연", None), item("공연2", Some("미정"))];
        assert_eq!(apply(items, today()).len(), 2);
    }

    #[test]
    fn range_expansion_preserves_other_fields() {
        let mut i = item("아이유 콘서트", Some("2026.05.01~2026.05.02"));
        i.venue = Some("KSPO DOME".to_string());
        i.booking_url = Some("https://tickets.interpark.com/goods/999".to_string());
        let result = apply(vec![i], today());
        assert_eq!(result.len(), 2);
        for r in &result {
            assert_eq!(r.venue.as_deref(), Some("KSPO DOME"));
            assert_eq!(r.booking_url.as_deref(), Some("https://tickets.interpark.com/goods/999"));
        }
    }
}
