//! Transactional email through the Resend HTTP API.

use std::time::Duration;

use async_trait::async_trait;

use aquamine_core::message::AlertMessage;

use super::{ChannelKind, DeliveryError, NotificationChannel};

const DEFAULT_BASE_URL: &str = "https://api.resend.com";

/// Default sender when `RESEND_FROM_EMAIL` is not set.
const DEFAULT_FROM_EMAIL: &str = "AquaMine AI <alerts@aquamine.id>";

#[derive(Debug, Clone)]
pub struct ResendConfig {
    pub api_key: String,
    pub from_email: String,
    pub base_url: String,
}

impl ResendConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `RESEND_API_KEY` is not set.
    ///
    /// | Variable            | Required | Default                              |
    /// |---------------------|----------|--------------------------------------|
    /// | `RESEND_API_KEY`    | yes      | -                                     |
    /// | `RESEND_FROM_EMAIL` | no       | `AquaMine AI <alerts@aquamine.id>`   |
    /// | `RESEND_BASE_URL`   | no       | `https://api.resend.com`             |
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("RESEND_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())?;
        Some(Self {
            api_key,
            from_email: std::env::var("RESEND_FROM_EMAIL")
                .unwrap_or_else(|_| DEFAULT_FROM_EMAIL.to_string()),
            base_url: std::env::var("RESEND_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        })
    }
}

pub struct ResendEmailDelivery {
    config: ResendConfig,
    client: reqwest::Client,
}

impl ResendEmailDelivery {
    pub fn new(config: ResendConfig, request_timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl NotificationChannel for ResendEmailDelivery {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(&self, address: &str, message: &AlertMessage) -> Result<(), DeliveryError> {
        let url = format!("{}/emails", self.config.base_url.trim_end_matches('/'));
        let payload = serde_json::json!({
            "from": self.config.from_email,
            "to": [address],
            "subject": message.subject,
            "html": message.html,
            "text": message.text,
        });

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(to = address, subject = %message.subject, "Notification email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
