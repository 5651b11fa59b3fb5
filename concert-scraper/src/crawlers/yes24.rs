use async_trait::async_trait;
use concert_core::RawConcertData;
use once_cell_date_regex::DATE_RE;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::instrument;

use super::http::fetch_html;
use super::SiteCrawler;

const SOURCE_NAME: &str = "yes24";

pub struct Yes24Crawler {
    client: Client,
}

impl Yes24Crawler {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }
}

#[async_trait]
impl SiteCrawler for Yes24Crawler {
    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }

    #[instrument(skip(self))]
    async fn search(&self, artist_name: &str) -> Vec<RawConcertData> {
        let url = format!(
            "http://ticket.yes24.com/Pages/Sch/Search.aspx?query={}",
            urlencoding::encode(artist_name)
        );
        let Some(html) = fetch_html(&self.client, &url).await else {
            return Vec::new();
        };
        parse(&html, artist_name)
    }
}

fn is_hidden(el: &ElementRef) -> bool {
    el.value()
        .attr("style")
        .map(|s| s.chars().filter(|c| !c.is_whitespace()).collect::<String>().contains("display:none"))
        .unwrap_or(false)
}

/// Direct `div` children of `el` that themselves have no element children —
/// the markup puts date/venue text directly in these, with no further
/// wrapping element.
fn text_only_div_children<'a>(el: &ElementRef<'a>) -> Vec<String> {
    el.children()
        .filter_map(scraper::ElementRef::wrap)
        .filter(|child| child.value().name() == "div")
        .filter(|child| child.children().all(|c| c.value().as_element().is_none()))
        .map(|child| child.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse(html: &str, artist_name: &str) -> Vec<RawConcertData> {
    let document = Html::parse_document(html);
    let item_sel = Selector::parse(".srch-list-item").unwrap();
    let title_sel = Selector::parse(".item-tit a").unwrap();

    let mut items = Vec::new();
    for el in document.select(&item_sel) {
        if is_hidden(&el) {
            continue;
        }
        let Some(title_el) = el.select(&title_sel).next() else {
            continue;
        };
        let title = title_el.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            continue;
        }
        let booking_url = title_el.value().attr("href").map(str::to_string);

        let mut date = None;
        let mut venue = None;
        for text in text_only_div_children(&el) {
            if DATE_RE.is_match(&text) {
                date = Some(text);
            } else {
                venue = Some(text);
            }
        }

        items.push(RawConcertData {
            title,
            artist_name: artist_name.to_string(),
            source_site: SOURCE_NAME.to_string(),
            venue,
            date,
            time: None,
            price: None,
            booking_url,
        });
    }
    items
}

/// Bundled here rather than in the shared filter module: yes24's own parser
/// needs a bare date-match check, independent of the filter's expansion
/// logic.
mod once_cell_date_regex {
    use once_cell::sync::Lazy;
    use regex::Regex;

    pub static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}\.\d{2}\.\d{2}").unwrap());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_hidden_template_rows() {
        let html = r#"
            <div class="srch-list-item" style="display:none;">
                <div class="item-tit"><a href="https://ticket.yes24.com/1">숨김 공연</a></div>
            </div>
        "#;
        assert!(parse(html, "아이유").is_empty());
    }

    #[test]
    fn splits_date_and_venue_from_text_only_divs() {
        let html = r#"
            <div class="srch-list-item">
                <div class="item-tit"><a href="https://ticket.yes24.com/2">아이유 콘서트</a></div>
                <div>2026.05.01</div>
                <div>KSPO DOME</div>
            </div>
        "#;
        let items = parse(html, "아이유");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].date.as_deref(), Some("2026.05.01"));
        assert_eq!(items[0].venue.as_deref(), Some("KSPO DOME"));
    }

    #[test]
    fn divs_with_element_children_are_not_treated_as_text_fields() {
        let html = r#"
            <div class="srch-list-item">
                <div class="item-tit"><a href="https://ticket.yes24.com/3">백예린</a></div>
                <div><span>2026.05.01</span></div>
            </div>
        "#;
        let items = parse(html, "백예린");
        assert_eq!(items.len(), 1);
        assert!(items[0].date.is_none());
    }

    #[test]
    fn later_date_and_venue_divs_win_over_earlier_ones() {
        let html = r#"
            <div class="srch-list-item">
                <div class="item-tit"><a href="https://ticket.yes24.com/4">아이유 콘서트</a></div>
                <div>2026.05.01</div>
                <div>KSPO DOME</div>
                <div>2026.06.01</div>
                <div>올림픽공원</div>
            </div>
        "#;
        let items = parse(html, "아이유");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].date.as_deref(), Some("2026.06.01"));
        assert_eq!(items[0].venue.as_deref(), Some("올림픽공원"));
    }
}
