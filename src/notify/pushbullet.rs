//! Pushbullet link pushes

use super::{Notifier, NotifyError, NotifyResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Serialize)]
struct Push<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    title: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
}

/// Sends link pushes through the Pushbullet API
#[derive(Clone)]
pub struct PushbulletChannel {
    client: Client,
    endpoint: String,
    token: String,
}

impl PushbulletChannel {
    pub fn new(client: Client, endpoint: &str, token: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            token: token.to_string(),
        }
    }
}

impl fmt::Debug for PushbulletChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushbulletChannel")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Notifier for PushbulletChannel {
    async fn send(&self, message: &str, title: &str, url: Option<&str>) -> NotifyResult<()> {
        let push = Push {
            kind: "link",
            title,
            body: message,
            url,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Access-Token", &self.token)
            .json(&push)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(title, "Pushbullet push sent");
        Ok(())
    }
}
