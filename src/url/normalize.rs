use crate::UrlError;
use url::{ParseError, Url};

/// Scheme assumed for listing URLs written without one
const DEFAULT_SCHEME: &str = "https";

/// Normalizes a listing URL into its durable identity form
///
/// # Normalization Steps
///
/// 1. Parse the URL; a missing scheme (`www.olx.pl/a`, `//www.olx.pl/a`)
///    defaults to `https`
/// 2. Reject anything that is not HTTP(S) or has no host
/// 3. Remove the fragment (everything after #)
///
/// Scheme, host, path and query are otherwise kept as the `url` crate
/// serializes them, so normalizing an already normalized URL is a no-op.
///
/// # Examples
///
/// ```
/// use listing_spy::url::normalize_url;
///
/// let url = normalize_url("www.olx.pl/d/oferta/flat-CID3.html#gallery").unwrap();
/// assert_eq!(url.as_str(), "https://www.olx.pl/d/oferta/flat-CID3.html");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url_str = url_str.trim();

    let mut url = match Url::parse(url_str) {
        Ok(url) => url,
        Err(ParseError::RelativeUrlWithoutBase) => {
            let with_scheme = if url_str.starts_with("//") {
                format!("{}:{}", DEFAULT_SCHEME, url_str)
            } else {
                format!("{}://{}", DEFAULT_SCHEME, url_str)
            };
            Url::parse(&with_scheme).map_err(|e| UrlError::Parse(e.to_string()))?
        }
        Err(e) => return Err(UrlError::Parse(e.to_string())),
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    Ok(url)
}

/// Resolves `href` against `base` and normalizes the result
///
/// Absolute hrefs are kept as they are; relative ones are resolved the way a
/// browser would resolve them on a page served from `base`.
pub fn resolve_url(base: &Url, href: &str) -> Result<Url, UrlError> {
    let joined = base
        .join(href.trim())
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;
    normalize_url(joined.as_str())
}
