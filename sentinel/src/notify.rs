//! Posts alerts to a chat webhook.
//!
//! The body is `{"content": "..."}`, which Discord and most Slack-style
//! incoming webhooks accept as-is.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Serialize;

use crate::alert::Alert;
use crate::config::AlertConfig;
use crate::domain::NotifyError;

/// The run loop blocks on each post, so keep this well under a tick
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    content: &'a str,
}

#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    /// # Errors
    /// If the HTTP client cannot be built (TLS backend setup).
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, url: url.into() })
    }

    /// Notifier for the active webhook, `None` when none is configured or
    /// the client fails to build (logged).
    pub fn from_config(alerts: &AlertConfig) -> Option<Self> {
        let url = alerts.active_webhook_url()?;
        match Self::new(url) {
            Ok(notifier) => {
                log::info!("Posting alerts to webhook '{}'", alerts.active_webhook);
                Some(notifier)
            }
            Err(e) => {
                log::warn!("Webhook '{}' disabled: {e}", alerts.active_webhook);
                None
            }
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// # Errors
    /// Transport failure or a non-2xx answer.
    pub fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let content = format!("⚠ {alert}");
        let response = self.client.post(&self.url).json(&WebhookMessage { content: &content }).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status));
        }
        log::debug!("Webhook accepted alert for pid {}", alert.pid.0);
        Ok(())
    }
}
