//! morizon.pl: property rows with interleaved finance ads, "następna strona"
//! link that loses its href on the last page

use super::{
    element_text, next_page_url, offer_url, push_offer, required_attr, selector, Extraction, Page,
    SiteAdapter,
};
use crate::model::OfferSet;
use crate::{CrawlError, CrawlResult};
use scraper::Html;
use url::Url;

const BASE_URL: &str = "https://www.morizon.pl";

/// Class morizon puts on sponsored rows
const AD_CLASS: &str = "finances";

#[derive(Debug, Clone)]
pub struct MorizonAdapter {
    base: Url,
}

impl MorizonAdapter {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    /// The base relative links on morizon.pl resolve against
    pub fn base() -> Result<Url, url::ParseError> {
        Url::parse(BASE_URL)
    }
}

impl SiteAdapter for MorizonAdapter {
    fn name(&self) -> &'static str {
        "morizon"
    }

    fn extract(&self, page: &Page) -> CrawlResult<Extraction> {
        let document = Html::parse_document(&page.body);
        let rows = selector(page, "div.row-property")?;
        let heading = selector(page, "h2")?;
        let link = selector(page, "a.property-url")?;
        let next = selector(page, r#"a[title="następna strona"]"#)?;

        let mut offers = OfferSet::new();
        for row in document.select(&rows) {
            if row.value().classes().any(|class| class == AD_CLASS) {
                continue;
            }

            let title = row
                .select(&heading)
                .next()
                .ok_or_else(|| CrawlError::extraction(&page.url, "property row without h2"))?;
            let anchor = row.select(&link).next().ok_or_else(|| {
                CrawlError::extraction(&page.url, "property row without a.property-url")
            })?;

            let url = offer_url(page, &self.base, required_attr(page, &anchor, "href")?)?;
            push_offer(page, &mut offers, element_text(&title), url)?;
        }

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
