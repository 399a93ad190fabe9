//! Test doubles shared by unit tests

use crate::crawler::PageFetcher;
use crate::model::{BrokenReason, NotificationHandlerConfig, Offer, OfferSet, Source};
use crate::notify::{Notifier, NotifierFactory, NotifyError, NotifyResult};
use crate::storage::{
    ListingGateway, RunRecord, RunSummary, SqliteStorage, StorageError, StorageResult,
};
use crate::url::normalize_url;
use crate::{CrawlError, CrawlResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

fn page_key(url: &str) -> String {
    normalize_url(url).unwrap().to_string()
}

/// Serves canned page bodies by URL
///
/// Unknown URLs answer with a 404, which the crawler treats as transient.
#[derive(Default)]
pub(crate) struct StaticFetcher {
    pages: HashMap<String, String>,
    failures: Mutex<HashMap<String, u32>>,
    requests: AtomicUsize,
}

impl StaticFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(page_key(url), body.into());
        self
    }

    /// Makes the first `times` requests for `url` time out
    pub(crate) fn failing(self, url: &str, times: u32) -> Self {
        self.failures.lock().unwrap().insert(page_key(url), times);
        self
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &Url) -> CrawlResult<String> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let key = url.to_string();

        if let Some(remaining) = self.failures.lock().unwrap().get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(CrawlError::Timeout { url: key });
            }
        }

        self.pages
            .get(&key)
            .cloned()
            .ok_or(CrawlError::HttpStatus {
                url: key,
                status: 404,
            })
    }
}

/// Renders an olx.pl style result page
pub(crate) fn olx_page(offers: &[(&str, &str)], next: Option<&str>) -> String {
    let rows: String = offers
        .iter()
        .map(|(title, url)| {
            format!(
                r#"<tr><td class="offer"><a class="link" href="{}"><strong>{}</strong></a></td></tr>"#,
                url, title
            )
        })
        .collect();

    let next = next
        .map(|url| format!(r#"<span class="next"><a href="{}">next</a></span>"#, url))
        .unwrap_or_default();

    format!(
        "<html><body><table>{}</table>{}</body></html>",
        rows, next
    )
}

pub(crate) fn handler(id: i64, name: &str) -> NotificationHandlerConfig {
    NotificationHandlerConfig {
        id,
        kind: "pushbullet".to_string(),
        api_key: format!("key-{}", id),
        name: name.to_string(),
    }
}

/// A send as seen by [`RecordingFactory`]
#[derive(Debug, Clone)]
pub(crate) struct SentNotification {
    pub handler: String,
    pub message: String,
    pub title: String,
    pub url: Option<String>,
    pub delivered: bool,
}

/// Builds notifiers that record every send instead of delivering it
#[derive(Default)]
pub(crate) struct RecordingFactory {
    log: Arc<Mutex<Vec<SentNotification>>>,
    failing: HashSet<(String, String)>,
    unbuildable: HashSet<String>,
}

impl RecordingFactory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Makes handler `name` fail whenever it sends `message`
    pub(crate) fn failing_for(mut self, name: &str, message: &str) -> Self {
        self.failing.insert((name.to_string(), message.to_string()));
        self
    }

    /// Makes building handler `name` fail
    pub(crate) fn unbuildable(mut self, name: &str) -> Self {
        self.unbuildable.insert(name.to_string());
        self
    }

    pub(crate) fn attempts(&self) -> Vec<SentNotification> {
        self.log.lock().unwrap().clone()
    }

    pub(crate) fn sent(&self) -> Vec<SentNotification> {
        self.attempts().into_iter().filter(|s| s.delivered).collect()
    }

    pub(crate) fn attempted_pairs(&self) -> Vec<(String, String)> {
        self.attempts()
            .into_iter()
            .map(|s| (s.handler, s.message))
            .collect()
    }

    pub(crate) fn sent_pairs(&self) -> Vec<(String, String)> {
        self.sent()
            .into_iter()
            .map(|s| (s.handler, s.message))
            .collect()
    }
}

impl NotifierFactory for RecordingFactory {
    fn build(&self, config: &NotificationHandlerConfig) -> NotifyResult<Box<dyn Notifier>> {
        if self.unbuildable.contains(&config.name) {
            return Err(NotifyError::UnknownChannel(config.kind.clone()));
        }

        let failing = self
            .failing
            .iter()
            .filter(|(name, _)| *name == config.name)
            .map(|(_, message)| message.clone())
            .collect();

        Ok(Box::new(RecordingNotifier {
            name: config.name.clone(),
            log: Arc::clone(&self.log),
            failing,
        }))
    }
}

struct RecordingNotifier {
    name: String,
    log: Arc<Mutex<Vec<SentNotification>>>,
    failing: HashSet<String>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str, title: &str, url: Option<&str>) -> NotifyResult<()> {
        let delivered = !self.failing.contains(message);
        self.log.lock().unwrap().push(SentNotification {
            handler: self.name.clone(),
            message: message.to_string(),
            title: title.to_string(),
            url: url.map(str::to_string),
            delivered,
        });

        if delivered {
            Ok(())
        } else {
            Err(NotifyError::Rejected {
                status: 500,
                body: "recording failure".to_string(),
            })
        }
    }
}

/// In-memory storage whose sources vanish as soon as they would be marked
/// broken, like a source removed by another process mid-scrape
pub(crate) struct VanishingSourcesGateway {
    pub inner: SqliteStorage,
}

impl VanishingSourcesGateway {
    pub(crate) fn new() -> Self {
        Self {
            inner: SqliteStorage::new_in_memory().unwrap(),
        }
    }
}

impl ListingGateway for VanishingSourcesGateway {
    fn get_sources(&self) -> StorageResult<Vec<Source>> {
        self.inner.get_sources()
    }

    fn add_source(&mut self, url: &str, name: &str) -> StorageResult<String> {
        self.inner.add_source(url, name)
    }

    fn delete_source(&mut self, key: &str) -> StorageResult<()> {
        self.inner.delete_source(key)
    }

    fn mark_broken_source(
        &mut self,
        key: &str,
        _reason: BrokenReason,
        _detail: &str,
    ) -> StorageResult<()> {
        Err(StorageError::SourceNotFound(key.to_string()))
    }

    fn clear_broken_source(&mut self, key: &str) -> StorageResult<()> {
        self.inner.clear_broken_source(key)
    }

    fn save_new_listings(&mut self, offers: &OfferSet) -> StorageResult<Vec<Offer>> {
        self.inner.save_new_listings(offers)
    }

    fn count_listings(&self) -> StorageResult<u64> {
        self.inner.count_listings()
    }

    fn get_notification_handlers(&self) -> StorageResult<Vec<NotificationHandlerConfig>> {
        self.inner.get_notification_handlers()
    }

    fn add_notification_handler(
        &mut self,
        kind: &str,
        api_key: &str,
        name: &str,
    ) -> StorageResult<i64> {
        self.inner.add_notification_handler(kind, api_key, name)
    }

    fn delete_notification_handler(&mut self, id: i64) -> StorageResult<()> {
        self.inner.delete_notification_handler(id)
    }

    fn begin_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        self.inner.begin_run(config_hash)
    }

    fn finish_run(&mut self, run_id: i64, summary: &RunSummary) -> StorageResult<()> {
        self.inner.finish_run(run_id, summary)
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        self.inner.get_latest_run()
    }
}
