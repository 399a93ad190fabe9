//! Bounded retry and failure containment around whole-source crawls

use crate::config::ScraperConfig;
use crate::crawler::Crawler;
use crate::model::{BrokenReason, OfferSet, Source};
use crate::storage::{ListingGateway, StorageError};
use crate::{CrawlError, FailureKind};
use backon::{ExponentialBuilder, Retryable};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::sleep;

/// How one source fared during a scrape
#[derive(Debug)]
pub enum SourceOutcome {
    /// An attempt succeeded; retrying stopped there
    Crawled { offers: OfferSet, attempts: u32 },
    /// Every attempt failed with a transient error
    Exhausted { attempts: u32, error: CrawlError },
    /// The page structure did not match its adapter; not retried
    Structural { error: CrawlError },
    /// No adapter handles the source. `host` holds the raw URL when it
    /// could not be parsed at all.
    Unsupported { host: String },
}

impl SourceOutcome {
    fn from_error(error: CrawlError, attempts: u32) -> Self {
        match error.failure_kind() {
            FailureKind::Transient => Self::Exhausted { attempts, error },
            FailureKind::Structural => Self::Structural { error },
            FailureKind::Unsupported => match error {
                CrawlError::UnsupportedSource { host } => Self::Unsupported { host },
                CrawlError::InvalidUrl { url, .. } => Self::Unsupported { host: url },
                other => Self::Unsupported {
                    host: other.to_string(),
                },
            },
        }
    }

    pub fn offers(&self) -> Option<&OfferSet> {
        match self {
            Self::Crawled { offers, .. } => Some(offers),
            _ => None,
        }
    }

    /// Reason to flag the source as broken, `None` on success
    pub fn broken_reason(&self) -> Option<BrokenReason> {
        match self {
            Self::Crawled { .. } => None,
            Self::Exhausted { .. } => Some(BrokenReason::RetriesExhausted),
            Self::Structural { .. } => Some(BrokenReason::NeedsAdapterUpdate),
            Self::Unsupported { .. } => Some(BrokenReason::Unsupported),
        }
    }

    /// Human readable description of the failure
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Crawled { .. } => None,
            Self::Exhausted { attempts, error } => {
                Some(format!("{} attempts failed, last error: {}", attempts, error))
            }
            Self::Structural { error } => Some(error.to_string()),
            Self::Unsupported { host } => Some(format!("no adapter registered for {}", host)),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Crawled { .. })
    }
}

/// Per-source result of [`RetryPolicy::scrape_sources`]
#[derive(Debug)]
pub struct SourceReport {
    pub source: Source,
    pub outcome: SourceOutcome,
    /// Set when a failing source could not be marked broken
    pub mark_error: Option<StorageError>,
}

/// Combined result of crawling a list of sources
#[derive(Debug, Default)]
pub struct ScrapeResults {
    /// Union of the offers of every successful source
    pub offers: OfferSet,
    pub reports: Vec<SourceReport>,
}

impl ScrapeResults {
    pub fn failed_sources(&self) -> usize {
        self.reports
            .iter()
            .filter(|report| !report.outcome.is_success())
            .count()
    }
}

/// Retry settings for whole-source crawls
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    min_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy
    ///
    /// # Arguments
    ///
    /// * `max_attempts` - Total attempts per source, the first included
    ///   (at least one)
    /// * `min_delay` - Delay before the first retry
    /// * `max_delay` - Ceiling for the exponentially growing delay
    pub fn new(max_attempts: u32, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            min_delay,
            max_delay: max_delay.max(min_delay),
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.retry_min_delay_ms),
            Duration::from_millis(config.retry_max_delay_ms),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
            .with_jitter()
    }

    /// Crawls one source, retrying transient failures with backoff
    ///
    /// Structural and unsupported failures are returned after the first
    /// attempt; retrying them cannot help.
    pub async fn crawl_source(&self, crawler: &Crawler, source: &Source) -> SourceOutcome {
        let counter = AtomicU32::new(0);
        let attempts = &counter;
        let url = source.url.as_str();
        let label = source.label();

        let attempt = move || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            crawler.gather_offers(url).await
        };

        let result = attempt
            .retry(self.backoff())
            .sleep(sleep)
            .when(CrawlError::is_transient)
            .notify(|err: &CrawlError, delay: Duration| {
                tracing::warn!(
                    source = label,
                    attempt = attempts.load(Ordering::SeqCst),
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Crawl attempt failed, retrying"
                );
            })
            .await;

        let attempts = counter.load(Ordering::SeqCst);
        match result {
            Ok(offers) => SourceOutcome::Crawled { offers, attempts },
            Err(error) => SourceOutcome::from_error(error, attempts),
        }
    }

    /// Crawls every source in turn, containing failures per source
    ///
    /// A failing source with a storage key is marked broken with the
    /// failure reason; one without a key is only logged. Either way the
    /// remaining sources are still crawled and the failing one contributes
    /// no offers. A storage error while marking is logged and kept in the
    /// source's report; it never stops the remaining sources.
    pub async fn scrape_sources(
        &self,
        crawler: &Crawler,
        gateway: &mut dyn ListingGateway,
        sources: &[Source],
    ) -> ScrapeResults {
        let mut results = ScrapeResults::default();

        for source in sources {
            let outcome = self.crawl_source(crawler, source).await;

            if let Some(offers) = outcome.offers() {
                results.offers.extend(offers.iter().cloned());
            }

            let mut mark_error = None;
            if let (Some(reason), Some(detail)) = (outcome.broken_reason(), outcome.detail()) {
                match &source.key {
                    Some(key) => {
                        tracing::error!(
                            source = source.label(),
                            reason = reason.to_db_string(),
                            "Marking source as broken: {}",
                            detail
                        );
                        if let Err(e) = gateway.mark_broken_source(key, reason, &detail) {
                            tracing::error!(
                                source = source.label(),
                                "Could not mark source as broken: {}",
                                e
                            );
                            mark_error = Some(e);
                        }
                    }
                    None => {
                        tracing::warn!(
                            source = source.label(),
                            reason = reason.to_db_string(),
                            "Unsaved source failed: {}",
                            detail
                        );
                    }
                }
            }

            results.reports.push(SourceReport {
                source: source.clone(),
                outcome,
                mark_error,
            });
        }

        results
    }
}
