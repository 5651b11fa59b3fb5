use async_trait::async_trait;
use concert_core::RawConcertData;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::instrument;

use super::http::fetch_html;
use super::SiteCrawler;

const SOURCE_NAME: &str = "interpark";

pub struct InterparkCrawler {
    client: Client,
}

impl InterparkCrawler {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }
}

#[async_trait]
impl SiteCrawler for InterparkCrawler {
    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }

    #[instrument(skip(self))]
    async fn search(&self, artist_name: &str) -> Vec<RawConcertData> {
        let url = format!(
            "https://tickets.interpark.com/search?q={}",
            urlencoding::encode(artist_name)
        );
        let Some(html) = fetch_html(&self.client, &url).await else {
            return Vec::new();
        };
        parse(&html, artist_name)
    }
}

fn parse(html: &str, artist_name: &str) -> Vec<RawConcertData> {
    let document = Html::parse_document(html);
    let item_sel = Selector::parse(r#"a[class*="TicketItem_ticketItem"]"#).unwrap();
    let name_sel = Selector::parse(r#"[class*="TicketItem_goodsName"]"#).unwrap();
    let place_sel = Selector::parse(r#"[class*="TicketItem_placeName"]"#).unwrap();
    let date_sel = Selector::parse(r#"[class*="TicketItem_playDate"]"#).unwrap();

    let mut items = Vec::new();
    for el in document.select(&item_sel) {
        let title = el
            .value()
            .attr("data-prd-name")
            .map(str::to_string)
            .or_else(|| el.select(&name_sel).next().map(|e| e.text().collect::<String>().trim().to_string()));
        let Some(title) = title.filter(|t| !t.is_empty()) else {
            continue;
        };

        let booking_url = el
            .value()
            .attr("data-prd-no")
            .map(|no| format!("https://tickets.interpark.com/goods/{no}"));

        let venue = el
            .select(&place_sel)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty());

        let date = el
            .select(&date_sel)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty());

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ticket_item_anchor() {
        let html = r#"
            <div>
                <a class="TicketItem_ticketItem__abc" data-prd-name="아이유 콘서트 2026" data-prd-no="999">
                    <span class="TicketItem_placeName__x">KSPO DOME</span>
                    <span class="TicketItem_playDate__y">2026.05.01~2026.05.03</span>
                </a>
            </div>
        "#;
        let items = parse(html, "아이유");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "아이유 콘서트 2026");
        assert_eq!(items[0].booking_url.as_deref(), Some("https://tickets.interpark.com/goods/999"));
        assert_eq!(items[0].venue.as_deref(), Some("KSPO DOME"));
        assert_eq!(items[0].source_site, SOURCE_NAME);
    }

    #[test]
    fn falls_back_to_goods_name_descendant_when_attr_missing() {
        let html = r#"
            <a class="TicketItem_ticketItem__abc" data-prd-no="1">
                <span class="TicketItem_goodsName__z">백예린 단독 콘서트</span>
            </a>
        "#;
        let items = parse(html, "백예린");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "백예린 단독 콘서트");
    }

    #[test]
    fn empty_document_yields_no_items() {
        assert!(parse("<html></html>", "아이유").is_empty());
    }
}
