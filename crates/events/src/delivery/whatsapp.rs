//! WhatsApp delivery through the Fonnte HTTP API.
//!
//! Fonnte takes a form-encoded `target` and `message`, authenticates with the
//! raw token in the `Authorization` header, and reports logical failures with
//! HTTP 200 and `{"status": false, "reason": ...}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use aquamine_core::message::AlertMessage;

use super::{ChannelKind, DeliveryError, NotificationChannel};

const DEFAULT_BASE_URL: &str = "https://api.fonnte.com";

#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub api_token: String,
    /// Overridable for tests.
    pub base_url: String,
}

impl WhatsAppConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `FONNTE_API_TOKEN` is not set.
    ///
    /// | Variable           | Required | Default                   |
    /// |--------------------|----------|---------------------------|
    /// | `FONNTE_API_TOKEN` | yes      | -                          |
    /// | `FONNTE_BASE_URL`  | no       | `https://api.fonnte.com`  |
    pub fn from_env() -> Option<Self> {
        let api_token = std::env::var("FONNTE_API_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())?;
        Some(Self {
            api_token,
            base_url: std::env::var("FONNTE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct FonnteResponse {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    reason: Option<String>,
}

pub struct WhatsAppDelivery {
    config: WhatsAppConfig,
    client: reqwest::Client,
}

impl WhatsAppDelivery {
    pub fn new(config: WhatsAppConfig, request_timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl NotificationChannel for WhatsAppDelivery {
    fn kind(&self) -> ChannelKind {
        ChannelKind::WhatsApp
    }

    async fn send(&self, address: &str, message: &AlertMessage) -> Result<(), DeliveryError> {
        let url = format!("{}/send", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, &self.config.api_token)
            .form(&[("target", address), ("message", message.text.as_str())])
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

        let body: FonnteResponse = response.json().await?;
        if !body.status {
            return Err(DeliveryError::Rejected(
                body.reason.unwrap_or_else(|| "unknown reason".to_string()),
            ));
        }

        tracing::info!(to = address, "WhatsApp notification sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
