//! Notification channels and dispatch
//!
//! This module handles pushing new listings out to subscribers, including:
//! - The `Notifier` capability every channel implements
//! - The closed set of supported channel types
//! - Fan-out of new listings with per-send failure isolation

mod dispatch;
mod pushbullet;

pub use dispatch::{dispatch, DispatchFailure, DispatchReport, NEW_LISTING_TITLE};
pub use pushbullet::PushbulletChannel;

use crate::config::NotificationsConfig;
use crate::model::NotificationHandlerConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while sending notifications
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Unknown notification type: {0}")]
    UnknownChannel(String),

    #[error("Notification request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Notification rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Result type for notification operations
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Something that can deliver a message to a subscriber
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one notification
    ///
    /// # Arguments
    ///
    /// * `message` - Notification body
    /// * `title` - Notification title
    /// * `url` - Optional link attached to the notification
    async fn send(&self, message: &str, title: &str, url: Option<&str>) -> NotifyResult<()>;
}

/// Supported channel types, by their stored `type` name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Pushbullet,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pushbullet => "pushbullet",
        }
    }

    /// Every supported type, for help texts
    pub fn all() -> &'static [ChannelKind] {
        &[Self::Pushbullet]
    }
}

impl FromStr for ChannelKind {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pushbullet" => Ok(Self::Pushbullet),
            _ => Err(NotifyError::UnknownChannel(s.to_string())),
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured, ready to use notification channel
#[derive(Debug, Clone)]
pub enum NotificationChannel {
    Pushbullet(PushbulletChannel),
}

impl NotificationChannel {
    /// Builds the channel described by a stored handler
    ///
    /// # Errors
    ///
    /// [`NotifyError::UnknownChannel`] when the handler type is not supported
    pub fn from_config(
        config: &NotificationHandlerConfig,
        client: &Client,
        settings: &NotificationsConfig,
    ) -> NotifyResult<Self> {
        match config.kind.parse::<ChannelKind>()? {
            ChannelKind::Pushbullet => Ok(Self::Pushbullet(PushbulletChannel::new(
                client.clone(),
                &settings.pushbullet_url,
                &config.api_key,
            ))),
        }
    }
}

#[async_trait]
impl Notifier for NotificationChannel {
    async fn send(&self, message: &str, title: &str, url: Option<&str>) -> NotifyResult<()> {
        match self {
            Self::Pushbullet(channel) => channel.send(message, title, url).await,
        }
    }
}

/// Builds notifiers from stored handler configs
pub trait NotifierFactory: Send + Sync {
    fn build(&self, config: &NotificationHandlerConfig) -> NotifyResult<Box<dyn Notifier>>;
}

/// Factory for the real channels, sharing one HTTP client
pub struct ChannelFactory {
    client: Client,
    settings: NotificationsConfig,
}

impl ChannelFactory {
    pub fn new(client: Client, settings: NotificationsConfig) -> Self {
        Self { client, settings }
    }
}

impl NotifierFactory for ChannelFactory {
    fn build(&self, config: &NotificationHandlerConfig) -> NotifyResult<Box<dyn Notifier>> {
        let channel = NotificationChannel::from_config(config, &self.client, &self.settings)?;
        Ok(Box::new(channel))
    }
}
