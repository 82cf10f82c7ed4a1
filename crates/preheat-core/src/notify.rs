//! Notification emitter - milestone/warning/completion/pause/failure events
//!
//! Fire-and-forget: a notifier must never let its own failure escalate into
//! the caller's failure path.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use preheat_common::config::NotifyConfig;
use preheat_common::types::{AccountId, UserId};
use reqwest::Client;
use serde::Serialize;
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// Notification category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Milestone,
    Warning,
    Completion,
    Paused,
    Failed,
}

/// A user-facing event raised by the warmup controller
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            data,
        }
    }
}

/// Notification contract
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: UserId, account_id: AccountId, notification: Notification);
}

/// Notifier that drops everything; used when no webhook is configured
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _user_id: UserId, _account_id: AccountId, notification: Notification) {
        debug!(title = %notification.title, "Notification dropped (no emitter configured)");
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    user_id: UserId,
    account_id: AccountId,
    #[serde(flatten)]
    notification: &'a Notification,
}

/// Notifier that POSTs signed JSON to a configured webhook
pub struct WebhookNotifier {
    client: Client,
    url: String,
    secret: Option<String>,
}

impl WebhookNotifier {
    /// Create a webhook notifier, or `None` when no URL is configured
    pub fn from_config(config: &NotifyConfig) -> Option<Self> {
        let url = config.webhook_url.clone()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .ok()?;

        Some(Self {
            client,
            url,
            secret: config.secret.clone(),
        })
    }

    fn sign(&self, body: &[u8]) -> Option<String> {
        let secret = self.secret.as_ref()?;
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
        mac.update(body);
        Some(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, user_id: UserId, account_id: AccountId, notification: Notification) {
        let payload = WebhookPayload {
            user_id,
            account_id,
            notification: &notification,
        };

        let body = match serde_json::to_vec(&payload) {
            Ok(b) => b,
            Err(e) => {
                warn!("Failed to serialize notification: {}", e);
                return;
            }
        };

        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .body(body.clone());

        if let Some(signature) = self.sign(&body) {
            request = request.header("X-Preheat-Signature", signature);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                debug!(title = %notification.title, "Notification delivered");
            }
            Ok(response) => {
                warn!(
                    status = %response.status(),
                    title = %notification.title,
                    "Notification webhook rejected the event"
                );
            }
            Err(e) => {
                warn!(title = %notification.title, "Failed to deliver notification: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_notification() -> Notification {
        Notification::new(
            NotificationKind::Milestone,
            "Warmup milestone",
            "Advanced to week 2",
            serde_json::json!({ "week": 2 }),
        )
    }

    #[tokio::test]
    async fn test_webhook_posts_signed_payload() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/hooks/warmup"))
            .and(header_exists("X-Preheat-Signature"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = NotifyConfig {
            webhook_url: Some(format!("{}/hooks/warmup", server.uri())),
            secret: Some("topsecret".to_string()),
            timeout_secs: 5,
        };

        let notifier = WebhookNotifier::from_config(&config).unwrap();
        notifier
            .notify(Uuid::new_v4(), Uuid::new_v4(), test_notification())
            .await;
    }

    #[tokio::test]
    async fn test_webhook_failure_does_not_panic() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = NotifyConfig {
            webhook_url: Some(server.uri()),
            secret: None,
            timeout_secs: 5,
        };

        let notifier = WebhookNotifier::from_config(&config).unwrap();
        // A rejected webhook only logs; the call itself must succeed.
        notifier
            .notify(Uuid::new_v4(), Uuid::new_v4(), test_notification())
            .await;
    }

    #[test]
    fn test_from_config_requires_url() {
        assert!(WebhookNotifier::from_config(&NotifyConfig::default()).is_none());
    }
}
