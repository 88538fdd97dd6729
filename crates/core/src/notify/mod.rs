//! Notification webhook.
//!
//! Fire-and-forget POSTs of `{title, body}` payloads to a configured
//! URL (apprise-compatible). Delivery failures are logged and never
//! surfaced to the caller.

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::NotificationConfig;

#[derive(Debug, Serialize)]
struct Payload<'a> {
    title: &'a str,
    body: &'a str,
}

/// Webhook notifier. A no-op when no URL is configured.
#[derive(Clone)]
pub struct Notifier {
    client: Client,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(config: Option<&NotificationConfig>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            webhook_url: config.map(|c| c.webhook_url.clone()),
        }
    }

    /// Disabled notifier for tests and unconfigured deployments.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Send a notification without waiting for delivery.
    pub fn notify(&self, title: &str, body: &str) {
        let Some(ref url) = self.webhook_url else {
            return;
        };

        let url = url.clone();
        let client = self.client.clone();
        let payload = serde_json::json!({ "title": title, "body": body });

        tokio::spawn(async move {
            match client.post(&url).json(&payload).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("Notification delivered");
                }
                Ok(response) => {
                    warn!("Notification webhook answered HTTP {}", response.status());
                }
                Err(e) => {
                    warn!("Notification webhook failed: {}", e);
                }
            }
        });
    }
}
