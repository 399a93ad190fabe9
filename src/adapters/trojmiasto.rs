//! ogloszenia.trojmiasto.pl: titled offer anchors, relative "następna" button

use super::{
    next_page_url, offer_url, push_offer, required_attr, selector, Extraction, Page, SiteAdapter,
};
use crate::model::OfferSet;
use crate::CrawlResult;
use scraper::Html;
use url::Url;

const BASE_URL: &str = "https://ogloszenia.trojmiasto.pl";

#[derive(Debug, Clone)]
pub struct TrojmiastoAdapter {
    base: Url,
}

impl TrojmiastoAdapter {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    /// The base the relative pagination links resolve against
    pub fn base() -> Result<Url, url::ParseError> {
        Url::parse(BASE_URL)
    }
}

impl SiteAdapter for TrojmiastoAdapter {
    fn name(&self) -> &'static str {
        "trojmiasto"
    }

    fn extract(&self, page: &Page) -> CrawlResult<Extraction> {
        let document = Html::parse_document(&page.body);
        let listings = selector(page, "a.list__item__content__title__name")?;
        let next = selector(page, r#"a[title="następna"]"#)?;

        let mut offers = OfferSet::new();
        for anchor in document.select(&listings) {
            let title = required_attr(page, &anchor, "title")?.trim().to_string();
            let url = offer_url(page, &self.base, required_attr(page, &anchor, "href")?)?;
            push_offer(page, &mut offers, title, url)?;
        }

        let next = match document
            .select(&next)
            .next()
            .and_then(|button| button.value().attr("href"))
        {
            Some(href) => Some(next_page_url(page, href)?),
            None => None,
        };

        Ok(Extraction { offers, next })
    }
}
