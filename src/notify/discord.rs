use crate::core::error::DeliveryError;
use crate::notify::notifier::Notifier;
use crate::report::discord::render;
use crate::report::formatter::Report;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;

/// Longest response body kept in a rejection error
const MAX_ERROR_BODY: usize = 256;

/// Posts reports to a Discord webhook
pub struct DiscordWebhook {
    client: reqwest::Client,
    url: String,
    username: Option<String>,
    timeout: Duration,
}

impl DiscordWebhook {
    pub fn new(url: String, username: Option<String>, timeout: Duration) -> Result<Self> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!("Webhook URL must start with http:// or https://");
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url,
            username,
            timeout,
        })
    }
}

#[async_trait]
impl Notifier for DiscordWebhook {
    async fn deliver(&self, report: &Report) -> Result<(), DeliveryError> {
        let payload = render(report, self.username.as_deref(), Utc::now());

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout(self.timeout.as_secs())
                } else {
                    DeliveryError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        Ok(())
    }
}
