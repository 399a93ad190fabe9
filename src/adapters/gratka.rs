//! gratka.pl: teaser links, next page advertised by `<link rel="next">`

use super::{
    element_text, next_page_url, offer_url, push_offer, required_attr, selector, Extraction, Page,
    SiteAdapter,
};
use crate::model::OfferSet;
use crate::CrawlResult;
use scraper::Html;
use url::Url;

const BASE_URL: &str = "https://gratka.pl";

#[derive(Debug, Clone)]
pub struct GratkaAdapter {
    base: Url,
}

impl GratkaAdapter {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    /// The base relative links on gratka.pl resolve against
    pub fn base() -> Result<Url, url::ParseError> {
        Url::parse(BASE_URL)
    }
}

impl SiteAdapter for GratkaAdapter {
    fn name(&self) -> &'static str {
        "gratka"
    }

    fn extract(&self, page: &Page) -> CrawlResult<Extraction> {
        let document = Html::parse_document(&page.body);
        let teasers = selector(page, "a.teaserLink")?;
        let next = selector(page, r#"link[rel="next"]"#)?;

        let mut offers = OfferSet::new();
        for anchor in document.select(&teasers) {
            let title = match anchor.value().attr("title") {
                Some(title) => title.trim().to_string(),
                None => element_text(&anchor),
            };
            let url = offer_url(page, &self.base, required_attr(page, &anchor, "href")?)?;
            push_offer(page, &mut offers, title, url)?;
        }

        let next = match document
            .select(&next)
            .next()
            .and_then(|link| link.value().attr("href"))
        {
            Some(href) => Some(next_page_url(page, href)?),
            None => None,
        };

        Ok(Extraction { offers, next })
    }
}
