//! High level operations: the scrape cycle and source/handler registration
//!
//! Everything here sequences the lower layers; no crawling, storage or
//! delivery logic lives in this module.

use crate::crawler::{Crawler, RetryPolicy, SourceReport};
use crate::model::{NotificationHandlerConfig, Offer, Source};
use crate::notify::{dispatch, ChannelKind, DispatchReport, NotifierFactory};
use crate::storage::{ListingGateway, RunStatus, RunSummary};
use crate::url::{host_key, normalize_url};
use crate::{CrawlResult, Result};

/// Body of the notification sent when a handler is registered
pub const TEST_MESSAGE: &str = "You will now receive listing notifications.";

/// Title of the notification sent when a handler is registered
pub const TEST_TITLE: &str = "Listing notifications";

/// Options for a single scrape cycle
#[derive(Debug, Clone, Default)]
pub struct CycleOptions {
    /// Log the notifications that would go out instead of sending them.
    /// New listings are still recorded.
    pub dry_run: bool,
    /// Hash of the configuration the cycle runs with
    pub config_hash: String,
}

/// What a scrape cycle did
#[derive(Debug)]
pub struct CycleReport {
    pub run_id: i64,
    pub status: RunStatus,
    pub offers_seen: usize,
    /// Listings not seen in any earlier cycle, sorted by URL
    pub new_listings: Vec<Offer>,
    pub sources: Vec<SourceReport>,
    pub dispatch: DispatchReport,
}

impl CycleReport {
    pub fn failed_sources(&self) -> usize {
        self.sources
            .iter()
            .filter(|report| !report.outcome.is_success())
            .count()
    }
}

/// One pass of sources -> crawl -> save -> notify
pub struct ScrapeCycle<'a> {
    crawler: &'a Crawler,
    policy: RetryPolicy,
    notifiers: &'a dyn NotifierFactory,
}

impl<'a> ScrapeCycle<'a> {
    pub fn new(crawler: &'a Crawler, policy: RetryPolicy, notifiers: &'a dyn NotifierFactory) -> Self {
        Self {
            crawler,
            policy,
            notifiers,
        }
    }

    /// Runs a full cycle and records it as a scrape run
    ///
    /// Safe to run repeatedly: listings already stored are never reported
    /// again. The run is marked `degraded` when a source or a notification
    /// failed and `failed` when the cycle itself could not finish.
    pub async fn run(
        &self,
        gateway: &mut dyn ListingGateway,
        options: &CycleOptions,
    ) -> Result<CycleReport> {
        let run_id = gateway.begin_run(&options.config_hash)?;

        match self.run_steps(gateway, options, run_id).await {
            Ok(report) => {
                gateway.finish_run(
                    run_id,
                    &RunSummary {
                        status: report.status,
                        offers_seen: report.offers_seen as u64,
                        new_listings: report.new_listings.len() as u64,
                        failed_sources: report.failed_sources() as u64,
                        failed_notifications: report.dispatch.failures.len() as u64,
                    },
                )?;
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Scrape cycle failed: {}", e);
                let summary = RunSummary {
                    status: RunStatus::Failed,
                    offers_seen: 0,
                    new_listings: 0,
                    failed_sources: 0,
                    failed_notifications: 0,
                };
                if let Err(record_error) = gateway.finish_run(run_id, &summary) {
                    tracing::warn!("Could not record failed run: {}", record_error);
                }
                Err(e)
            }
        }
    }

    async fn run_steps(
        &self,
        gateway: &mut dyn ListingGateway,
        options: &CycleOptions,
        run_id: i64,
    ) -> Result<CycleReport> {
        let sources = gateway.get_sources()?;
        tracing::info!(run_id, sources = sources.len(), "Starting scrape cycle");

        let results = self
            .policy
            .scrape_sources(self.crawler, gateway, &sources)
            .await;
        let new_listings = gateway.save_new_listings(&results.offers)?;

        if !new_listings.is_empty() {
            tracing::info!("Found ({}) new listings", new_listings.len());
            for listing in &new_listings {
                tracing::info!("{}", listing.url);
            }
        }

        let dispatch_report = if options.dry_run {
            for listing in &new_listings {
                tracing::info!("Would notify: {}", listing.url);
            }
            DispatchReport::default()
        } else {
            let handlers = gateway.get_notification_handlers()?;
            dispatch(self.notifiers, &handlers, &new_listings).await
        };

        let status = if results.failed_sources() > 0 || !dispatch_report.is_clean() {
            RunStatus::Degraded
        } else {
            RunStatus::Completed
        };

        Ok(CycleReport {
            run_id,
            status,
            offers_seen: results.offers.len(),
            new_listings,
            sources: results.reports,
            dispatch: dispatch_report,
        })
    }
}

/// Crawls a candidate source once so its listings can be previewed
///
/// No retries and nothing is stored; failures go straight to the caller.
pub async fn preview_source(crawler: &Crawler, url: &str) -> CrawlResult<Vec<Offer>> {
    let offers = crawler.gather_offers(url).await?;

    let mut offers: Vec<Offer> = offers.into_iter().collect();
    offers.sort_by(|a, b| a.url.cmp(&b.url).then_with(|| a.title.cmp(&b.title)));
    Ok(offers)
}

/// A newly stored source
#[derive(Debug)]
pub struct RegisteredSource {
    pub key: String,
    pub url: String,
    pub name: String,
    /// Listings recorded as already seen while registering
    pub primed: usize,
}

/// Stores a new source after recording its current listings as seen
///
/// The current listings are saved first so the next cycle only reports
/// listings that appear after registration. A failing crawl is logged and
/// the source is stored anyway. Without a `name` the URL host is used.
pub async fn register_source(
    crawler: &Crawler,
    policy: &RetryPolicy,
    gateway: &mut dyn ListingGateway,
    url: &str,
    name: Option<&str>,
) -> Result<RegisteredSource> {
    let normalized = normalize_url(url)?;
    let name = match name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => host_key(&normalized).unwrap_or_default(),
    };
    let url = normalized.to_string();

    let results = policy
        .scrape_sources(crawler, gateway, &[Source::unsaved(url.as_str(), name.as_str())])
        .await;
    let primed = gateway.save_new_listings(&results.offers)?.len();

    let key = gateway.add_source(&url, &name)?;
    tracing::info!(key = key.as_str(), primed, "Registered source {}", url);

    Ok(RegisteredSource {
        key,
        url,
        name,
        primed,
    })
}

/// Stores a notification handler once a test notification went through
///
/// # Errors
///
/// Fails without storing anything when the type is unknown or the test
/// notification could not be delivered.
pub async fn register_notification(
    gateway: &mut dyn ListingGateway,
    factory: &dyn NotifierFactory,
    kind: &str,
    api_key: &str,
    name: &str,
) -> Result<i64> {
    let kind: ChannelKind = kind.parse()?;
    let candidate = NotificationHandlerConfig {
        id: 0,
        kind: kind.as_str().to_string(),
        api_key: api_key.to_string(),
        name: name.to_string(),
    };

    let notifier = factory.build(&candidate)?;
    notifier.send(TEST_MESSAGE, TEST_TITLE, None).await?;

    let id = gateway.add_notification_handler(kind.as_str(), api_key, name)?;
    tracing::info!(id, kind = kind.as_str(), "Registered notification handler {}", name);
    Ok(id)
}
