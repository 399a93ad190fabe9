//! Integration tests for Listing-Spy
//!
//! These tests use wiremock to stand in for listing sites and the
//! Pushbullet API and drive full scrape cycles end-to-end.

mod crawl_tests;
mod notification_tests;

use listing_spy::adapters::{AdapterRegistry, OlxAdapter};
use listing_spy::config::{NotificationsConfig, ScraperConfig, UserAgentConfig};
use listing_spy::crawler::{build_http_client, Crawler, HttpFetcher, RetryPolicy};
use listing_spy::notify::ChannelFactory;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::MockServer;

pub fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

/// A crawler that treats the mock server as an olx.pl mirror
pub fn olx_crawler(server: &MockServer) -> Crawler {
    let base = Url::parse(&server.uri()).expect("Failed to parse mock server URL");
    let host = listing_spy::url::host_key(&base).expect("Mock server URL has no host");
    let registry = AdapterRegistry::new().register(host, Arc::new(OlxAdapter::new(base)));
    let client = build_http_client(&user_agent(), &ScraperConfig::default())
        .expect("Failed to build HTTP client");

    Crawler::new(registry, Arc::new(HttpFetcher::new(client)), 10)
}

pub fn quick_policy() -> RetryPolicy {
    RetryPolicy::new(5, Duration::ZERO, Duration::ZERO)
}

/// Notifier factory pushing to the mock server
pub fn channel_factory(server: &MockServer) -> ChannelFactory {
    let client = build_http_client(&user_agent(), &ScraperConfig::default())
        .expect("Failed to build HTTP client");
    ChannelFactory::new(
        client,
        NotificationsConfig {
            pushbullet_url: format!("{}/v2/pushes", server.uri()),
        },
    )
}

/// Renders an olx.pl result page
pub fn olx_page(offers: &[(&str, &str)], next: Option<&str>) -> String {
    let mut html = String::from("<html><body><table>");
    for (title, url) in offers {
        html.push_str(&format!(
            r#"<tr><td class="offer"><a class="link" href="{}"><strong>{}</strong></a></td></tr>"#,
            url, title
        ));
    }
    html.push_str("</table>");
    if let Some(next) = next {
        html.push_str(&format!(
            r#"<span class="next"><a href="{}">next</a></span>"#,
            next
        ));
    }
    html.push_str("</body></html>");
    html
}
