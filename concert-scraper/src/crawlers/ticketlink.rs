use async_trait::async_trait;
use concert_core::RawConcertData;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::instrument;

use super::http::fetch_html;
use super::SiteCrawler;

const SOURCE_NAME: &str = "ticketlink";
const BASE_URL: &str = "https://www.ticketlink.co.kr";

pub struct TicketLinkCrawler {
    client: Client,
}

impl TicketLinkCrawler {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }
}

#[async_trait]
impl SiteCrawler for TicketLinkCrawler {
    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }

    #[instrument(skip(self))]
    async fn search(&self, artist_name: &str) -> Vec<RawConcertData> {
        let url = format!(
            "https://www.ticketlink.co.kr/search?query={}",
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
        ".search_result li",
        ".list_ticket li",
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
        break;
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_search_result_items() {
        let html = r#"
            <ul class="search_result">
                <li>
                    <div class="tit"><a href="/product/333">아이유 콘서트</a></div>
                    <div class="venue">올림픽공원</div>
                    <div class="date">2026.06.10</div>
                </li>
            </ul>
        "#;
        let items = parse(html, "아이유");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].booking_url.as_deref(), Some("https://www.ticketlink.co.kr/product/333"));
        assert_eq!(items[0].source_site, SOURCE_NAME);
    }
}
