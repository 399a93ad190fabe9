use serde::Deserialize;

/// Main configuration structure for Listing-Spy
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Crawl and retry behavior
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScraperConfig {
    /// Total attempts per source and cycle, the first one included
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Upper bound on pages followed for a single source
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// First retry delay (milliseconds), doubled on every retry
    #[serde(rename = "retry-min-delay-ms", default = "default_retry_min_delay")]
    pub retry_min_delay_ms: u64,

    /// Retry delay ceiling (milliseconds)
    #[serde(rename = "retry-max-delay-ms", default = "default_retry_max_delay")]
    pub retry_max_delay_ms: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_pages: default_max_pages(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            retry_min_delay_ms: default_retry_min_delay(),
            retry_max_delay_ms: default_retry_max_delay(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Listing store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Notification channel endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Pushbullet push endpoint
    #[serde(rename = "pushbullet-url", default = "default_pushbullet_url")]
    pub pushbullet_url: String,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            pushbullet_url: default_pushbullet_url(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_max_pages() -> u32 {
    50
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_retry_min_delay() -> u64 {
    500
}

fn default_retry_max_delay() -> u64 {
    10_000
}

fn default_database_path() -> String {
    "listings.sqlite".to_string()
}

fn default_pushbullet_url() -> String {
    "https://api.pushbullet.com/v2/pushes".to_string()
}
