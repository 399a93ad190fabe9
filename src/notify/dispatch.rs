//! Fan-out of new listings to every configured handler

use super::{NotifierFactory, NotifyError};
use crate::model::{ListingUrl, NotificationHandlerConfig, Offer};

/// Title of every new-listing notification
pub const NEW_LISTING_TITLE: &str = "New listing";

/// One notification that could not be delivered
#[derive(Debug)]
pub struct DispatchFailure {
    pub handler_id: i64,
    pub handler_name: String,
    /// `None` when the handler itself could not be built
    pub listing: Option<ListingUrl>,
    pub error: NotifyError,
}

/// Outcome of a dispatch
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub sent: usize,
    pub failures: Vec<DispatchFailure>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sends every listing through every handler
///
/// Handlers form the outer loop and listings the inner one, so handlers
/// `[H1, H2]` and listings `[A, B]` produce `H1(A), H1(B), H2(A), H2(B)`.
/// A failed send is recorded and the next pair is attempted; a handler
/// whose channel cannot be built is recorded once and skipped.
pub async fn dispatch(
    factory: &dyn NotifierFactory,
    handlers: &[NotificationHandlerConfig],
    listings: &[Offer],
) -> DispatchReport {
    let mut report = DispatchReport::default();
    if listings.is_empty() {
        return report;
    }

    for handler in handlers {
        let notifier = match factory.build(handler) {
            Ok(notifier) => notifier,
            Err(error) => {
                tracing::warn!(
                    handler = handler.name.as_str(),
                    kind = handler.kind.as_str(),
                    "Skipping notification handler: {}",
                    error
                );
                report.failures.push(DispatchFailure {
                    handler_id: handler.id,
                    handler_name: handler.name.clone(),
                    listing: None,
                    error,
                });
                continue;
            }
        };

        for listing in listings {
            match notifier
                .send(&listing.title, NEW_LISTING_TITLE, Some(listing.url.as_str()))
                .await
            {
                Ok(()) => report.sent += 1,
                Err(error) => {
                    tracing::warn!(
                        handler = handler.name.as_str(),
                        listing = listing.url.as_str(),
                        "Failed to send notification: {}",
                        error
                    );
                    report.failures.push(DispatchFailure {
                        handler_id: handler.id,
                        handler_name: handler.name.clone(),
                        listing: Some(listing.url.clone()),
                        error,
                    });
                }
            }
        }
    }

    report
}
