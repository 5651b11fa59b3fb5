use async_trait::async_trait;
use concert_core::RawConcertData;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::instrument;

use super::http::fetch_html;
use super::SiteCrawler;

const SOURCE_NAME: &str = "melon";
const BASE_URL: &str = "https://ticket.melon.com";

pub struct MelonCrawler {
    client: Client,
}

impl MelonCrawler {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }
}

#[async_trait]
impl SiteCrawler for MelonCrawler {
    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }

    #[instrument(skip(self))]
    async fn search(&self, artist_name: &str) -> Vec<RawConcertData> {
        let url = format!(
            "https://ticket.melon.com/search/index.htm?kwd={}",
            urlencoding::encode(artist_name)
        );
        let Some(html) = fetch_html(&self.client, &url).await else {
            return Vec::new();
        };
        parse(&html, artist_name)
    }
}

fn first_text(el: &ElementRef, selectors: &[&str]) -> Option<String> {
    for sel in selectors {
        if let Ok(selector) = Selector::parse(sel) {
            if let Some(found) = el.select(&selector).next() {
                let text = found.text().collect::<String>().trim().to_string();
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }
    None
}

fn first_href(el: &ElementRef, selectors: &[&str]) -> Option<String> {
    for sel in selectors {
        if let Ok(selector) = Selector::parse(sel) {
            if let Some(found) = el.select(&selector).next() {
                if let Some(href) = found.value().attr("href") {
                    return Some(normalize_url(href));
                }
            }
        }
    }
    None
}

fn normalize_url(href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{BASE_URL}{href}")
    } else {
        format!("{BASE_URL}/{href}")
    }
}

fn parse(html: &str, artist_name: &str) -> Vec<RawConcertData> {
    let document = Html::parse_document(html);
    let item_selectors = [
        ".list_ticket li",
        ".search_list li",
        ".result_list li",
        r#"[class*="concert"]"#,
        r#"[class*="ticket"]"#,
        r#"[class*="product"]"#,
    ];

    let mut items = Vec::new();
    for sel_str in item_selectors {
        let Ok(selector) = Selector::parse(sel_str) else { continue };
        let found: Vec<_> = document.select(&selector).collect();
        if found.is_empty() {
            continue;
        }
        for el in found {
            let Some(title) = first_text(&el, &[".tit a", ".title a", "h4 a"]) else {
                continue;
            };
            let venue = first_text(&el, &[".venue", ".place"]);
            let date = first_text(&el, &[".date", ".period"]);
            let price = first_text(&el, &[".price"]);
            let booking_url = first_href(&el, &[".tit a", ".title a", "h4 a"]);

            items.push(RawConcertData {
                title,
                artist_name: artist_name.to_string(),
                source_site: SOURCE_NAME.to_string(),
                venue,
                date,
                time: None,
                price,
                booking_url,
            });
        }
        // Primary selector family produced results; don't fall through to
        // the broader heuristic ones too.
        break;
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_list_ticket_items() {
        let html = r#"
            <ul class="list_ticket">
                <li>
                    <div class="tit"><a href="/perf/111">아이유 콘서트</a></div>
                    <div class="venue">KSPO DOME</div>
                    <div class="date">2026.05.01</div>
                </li>
            </ul>
        "#;
        let items = parse(html, "아이유");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "아이유 콘서트");
        assert_eq!(items[0].booking_url.as_deref(), Some("https://ticket.melon.com/perf/111"));
        assert_eq!(items[0].venue.as_deref(), Some("KSPO DOME"));
    }

    #[test]
    fn absolute_urls_pass_through_unmodified() {
        let html = r#"
            <ul class="search_list">
                <li><div class="title"><a href="https://ticket.melon.com/perf/222">백예린</a></div></li>
            </ul>
        "#;
        let items = parse(html, "백예린");
        assert_eq!(items[0].booking_url.as_deref(), Some("https://ticket.melon.com/perf/222"));
    }
}
