//! otodom.pl: listing links in the markup, pagination counters in the
//! embedded `__NEXT_DATA__` JSON

use super::{
    element_text, offer_url, push_offer, required_attr, selector, Extraction, Page, SiteAdapter,
};
use crate::model::OfferSet;
use crate::{CrawlError, CrawlResult};
use scraper::Html;
use serde::Deserialize;
use url::Url;

const BASE_URL: &str = "https://www.otodom.pl";

/// Query parameter carrying the 1-based page number
const PAGE_PARAM: &str = "page";

#[derive(Debug, Deserialize)]
struct NextData {
    props: Props,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Props {
    page_props: PageProps,
}

#[derive(Debug, Deserialize)]
struct PageProps {
    data: Option<SearchData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchData {
    search_ads: Option<SearchAds>,
}

#[derive(Debug, Deserialize)]
struct SearchAds {
    pagination: Pagination,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    page: u32,
    total_pages: u32,
}

#[derive(Debug, Clone)]
pub struct OtodomAdapter {
    base: Url,
}

impl OtodomAdapter {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    /// The base the relative listing links resolve against
    pub fn base() -> Result<Url, url::ParseError> {
        Url::parse(BASE_URL)
    }

    /// Reads the pagination counters, `None` when the search carries none
    fn pagination(&self, page: &Page, document: &Html) -> CrawlResult<Option<Pagination>> {
        let script = selector(page, "script#__NEXT_DATA__")?;
        let raw = document
            .select(&script)
            .next()
            .map(|element| element.text().collect::<String>())
            .ok_or_else(|| CrawlError::extraction(&page.url, "missing __NEXT_DATA__ script"))?;

        let data: NextData = serde_json::from_str(&raw).map_err(|e| {
            CrawlError::extraction(&page.url, format!("malformed __NEXT_DATA__: {}", e))
        })?;

        Ok(data
            .props
            .page_props
            .data
            .and_then(|data| data.search_ads)
            .map(|ads| ads.pagination))
    }
}

/// `current` with its page parameter set to `page`, all other parameters kept
fn with_page(current: &Url, page: u32) -> Url {
    let pairs: Vec<(String, String)> = current
        .query_pairs()
        .filter(|(key, _)| key != PAGE_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut next = current.clone();
    next.set_fragment(None);
    next.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair(PAGE_PARAM, &page.to_string());
    next
}

impl SiteAdapter for OtodomAdapter {
    fn name(&self) -> &'static str {
        "otodom"
    }

    fn extract(&self, page: &Page) -> CrawlResult<Extraction> {
        let document = Html::parse_document(&page.body);
        let listings = selector(page, r#"a[data-cy="listing-item-link"]"#)?;
        let heading = selector(page, "h3")?;

        let mut offers = OfferSet::new();
        for anchor in document.select(&listings) {
            let title = anchor
                .select(&heading)
                .next()
                .ok_or_else(|| CrawlError::extraction(&page.url, "listing link without h3"))?;
            let url = offer_url(page, &self.base, required_attr(page, &anchor, "href")?)?;
            push_offer(page, &mut offers, element_text(&title), url)?;
        }

        let next = match self.pagination(page, &document)? {
            Some(pagination) if pagination.page < pagination.total_pages => {
                Some(with_page(&page.url, pagination.page + 1))
            }
            _ => None,
        };

        Ok(Extraction { offers, next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ListingUrl, Offer};

    fn adapter() -> OtodomAdapter {
        OtodomAdapter::new(OtodomAdapter::base().unwrap())
    }

    fn page(body: String) -> Page {
        Page::new(
            Url::parse(
                "https://www.otodom.pl/pl/oferty/wynajem/mieszkanie/gdansk?limit=36&page=1&roomsNumber=%5BONE%5D",
            )
            .unwrap(),
            body,
        )
    }

    fn html_with(pagination: &str) -> String {
        format!(
            r#"<html><body>
              <a data-cy="listing-item-link" href="/pl/oferta/kawalerka-wrzeszcz-ID4abc">
                <h3>Kawalerka Wrzeszcz</h3>
              </a>
              <script id="__NEXT_DATA__" type="application/json">{}</script>
            </body></html>"#,
            pagination
        )
    }

    #[test]
    fn test_extracts_relative_listing() {
        let body = html_with(
            r#"{"props":{"pageProps":{"data":{"searchAds":{"pagination":{"page":1,"totalPages":1}}}}}}"#,
        );
        let extraction = adapter().extract(&page(body)).unwrap();

        assert_eq!(extraction.offers.len(), 1);
        assert!(extraction.offers.contains(&Offer::new(
            "Kawalerka Wrzeszcz",
            ListingUrl::parse("https://www.otodom.pl/pl/oferta/kawalerka-wrzeszcz-ID4abc").unwrap()
        )));
        assert!(extraction.next.is_none());
    }

    #[test]
    fn test_next_page_from_counters() {
        let body = html_with(
            r#"{"props":{"pageProps":{"data":{"searchAds":{"pagination":{"page":1,"totalPages":3}}}}}}"#,
        );
        let next = adapter().extract(&page(body)).unwrap().next.unwrap();

        let pairs: Vec<(String, String)> = next
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("page".to_string(), "2".to_string())));
        assert!(pairs.contains(&("limit".to_string(), "36".to_string())));
        assert!(pairs.contains(&("roomsNumber".to_string(), "[ONE]".to_string())));
        assert_eq!(pairs.iter().filter(|(k, _)| k == "page").count(), 1);
    }

    #[test]
    fn test_page_past_total_ends_pagination() {
        let body = html_with(
            r#"{"props":{"pageProps":{"data":{"searchAds":{"pagination":{"page":4,"totalPages":3}}}}}}"#,
        );
        assert!(adapter().extract(&page(body)).unwrap().next.is_none());
    }

    #[test]
    fn test_null_search_ads_ends_pagination() {
        let body = html_with(r#"{"props":{"pageProps":{"data":{"searchAds":null}}}}"#);
        assert!(adapter().extract(&page(body)).unwrap().next.is_none());
    }

    #[test]
    fn test_malformed_metadata_is_structural_failure() {
        let body = html_with(r#"{"props": {"pageProps": "#);
        let err = adapter().extract(&page(body)).unwrap_err();
        assert!(matches!(err, CrawlError::Extraction { .. }));
    }

    #[test]
    fn test_missing_metadata_is_structural_failure() {
        let body = "<html><body></body></html>".to_string();
        let err = adapter().extract(&page(body)).unwrap_err();
        assert!(matches!(err, CrawlError::Extraction { .. }));
    }
}
