//! olx.pl: offer table rows, "next" link inside `span.next`

use super::{
    element_text, next_page_url, offer_url, push_offer, required_attr, selector, Extraction, Page,
    SiteAdapter,
};
use crate::model::OfferSet;
use crate::{CrawlError, CrawlResult};
use scraper::Html;
use url::Url;

const BASE_URL: &str = "https://www.olx.pl";

#[derive(Debug, Clone)]
pub struct OlxAdapter {
    base: Url,
}

impl OlxAdapter {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    /// The base relative links on olx.pl resolve against
    pub fn base() -> Result<Url, url::ParseError> {
        Url::parse(BASE_URL)
    }
}

impl SiteAdapter for OlxAdapter {
    fn name(&self) -> &'static str {
        "olx"
    }

    fn extract(&self, page: &Page) -> CrawlResult<Extraction> {
        let document = Html::parse_document(&page.body);
        let rows = selector(page, "td.offer")?;
        let link = selector(page, "a.link")?;
        let title = selector(page, "strong")?;
        let next = selector(page, "span.next a")?;

        let mut offers = OfferSet::new();
        for row in document.select(&rows) {
            let anchor = row
                .select(&link)
                .next()
                .ok_or_else(|| CrawlError::extraction(&page.url, "offer row without a.link"))?;
            let heading = row
                .select(&title)
                .next()
                .ok_or_else(|| CrawlError::extraction(&page.url, "offer row without title"))?;

            let url = offer_url(page, &self.base, required_attr(page, &anchor, "href")?)?;
            push_offer(page, &mut offers, element_text(&heading), url)?;
        }

        // `span.next` only wraps a link while there are pages left
        let next = match document
            .select(&next)
            .next()
            .and_then(|anchor| anchor.value().attr("href"))
        {
            Some(href) => Some(next_page_url(page, href)?),
            None => None,
        };

        Ok(Extraction { offers, next })
    }
}
