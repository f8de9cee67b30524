//! Outbound notification channels.
//!
//! Every channel implements [`NotificationChannel`]. A channel that is not
//! configured is still registered as [`Unconfigured`], so each attempt on it
//! fails with a descriptive error instead of being skipped silently.

pub mod resend;
pub mod smtp;
pub mod whatsapp;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use aquamine_core::alert::NotificationRecipient;
use aquamine_core::message::AlertMessage;

pub use resend::{ResendConfig, ResendEmailDelivery};
pub use smtp::{SmtpConfig, SmtpEmailDelivery};
pub use whatsapp::{WhatsAppConfig, WhatsAppDelivery};

/// Delivery medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    WhatsApp,
    Email,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::WhatsApp => "whatsapp",
            ChannelKind::Email => "email",
        }
    }

    /// The recipient address this channel delivers to, if any.
    pub fn address(self, recipient: &NotificationRecipient) -> Option<&str> {
        let addr = match self {
            ChannelKind::WhatsApp => recipient.phone.as_deref(),
            ChannelKind::Email => recipient.email.as_deref(),
        };
        addr.filter(|a| !a.trim().is_empty())
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single delivery attempt.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("{channel} channel not configured: {reason}")]
    NotConfigured {
        channel: ChannelKind,
        reason: String,
    },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provider returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Provider rejected the message: {0}")]
    Rejected(String),

    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(String),
}

/// One outbound delivery medium.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    fn is_configured(&self) -> bool {
        true
    }

    /// Deliver `message` to `address` (a phone number or email address,
    /// depending on [`kind`](Self::kind)).
    async fn send(&self, address: &str, message: &AlertMessage) -> Result<(), DeliveryError>;
}

/// A channel with missing credentials. Every attempt fails.
pub struct Unconfigured {
    kind: ChannelKind,
    reason: String,
}

impl Unconfigured {
    pub fn new(kind: ChannelKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl NotificationChannel for Unconfigured {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn is_configured(&self) -> bool {
        false
    }

    async fn send(&self, _address: &str, _message: &AlertMessage) -> Result<(), DeliveryError> {
        Err(DeliveryError::NotConfigured {
            channel: self.kind,
            reason: self.reason.clone(),
        })
    }
}

/// Build the WhatsApp and email channels from environment variables.
///
/// Email uses Resend when `RESEND_API_KEY` is set, otherwise SMTP when
/// `SMTP_HOST` is set.
pub fn channels_from_env(
    request_timeout: Duration,
) -> Result<Vec<Arc<dyn NotificationChannel>>, DeliveryError> {
    let whatsapp: Arc<dyn NotificationChannel> = match WhatsAppConfig::from_env() {
        Some(config) => Arc::new(WhatsAppDelivery::new(config, request_timeout)?),
        None => Arc::new(Unconfigured::new(
            ChannelKind::WhatsApp,
            "FONNTE_API_TOKEN is not set",
        )),
    };

    let email: Arc<dyn NotificationChannel> = if let Some(config) = ResendConfig::from_env() {
        Arc::new(ResendEmailDelivery::new(config, request_timeout)?)
    } else if let Some(config) = SmtpConfig::from_env() {
        Arc::new(SmtpEmailDelivery::new(config, request_timeout)?)
    } else {
        Arc::new(Unconfigured::new(
            ChannelKind::Email,
            "neither RESEND_API_KEY nor SMTP_HOST is set",
        ))
    };

    tracing::info!(
        whatsapp = whatsapp.is_configured(),
        email = email.is_configured(),
        "Notification channels loaded"
    );
    Ok(vec![whatsapp, email])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
