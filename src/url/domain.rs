use url::Url;

/// Extracts the key an adapter is registered under for this URL
///
/// The key is the lowercase host, followed by `:port` when the URL carries an
/// explicit non-default port.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use listing_spy::url::host_key;
///
/// let url = Url::parse("https://www.OLX.pl/nieruchomosci/").unwrap();
/// assert_eq!(host_key(&url), Some("www.olx.pl".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/search").unwrap();
/// assert_eq!(host_key(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}
