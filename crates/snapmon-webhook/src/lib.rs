// # Webhook Notifier
//
// This crate provides an HTTP webhook notifier for the snapshot monitor.
//
// ## Behavior
//
// - Makes exactly one HTTP POST per `publish` call
// - Full error propagation to the engine (no retry, no backoff)
// - HTTP timeout configured (30 seconds)
// - Specific error messages for HTTP status codes (401/403, 404, 413, 429, 5xx)
//
// ## Trust Level: Untrusted (Notifier)
//
// Notifiers must not:
// - Spawn tasks or threads
// - Retry failed deliveries (the next scheduled run re-detects the changes)
// - Access the state store
//
// ## Security Requirements
//
// - Bearer token NEVER appears in logs or `Debug` output
// - Token is provided via environment variables only
//
// ## Request Format
//
// ```http
// POST <url>
// Authorization: Bearer <token>   (optional)
// Content-Type: application/json
//
// {"topic": "...", "text": "RDS Snapshot Status Update Summary (1 changes)\n\n..."}
// ```

use async_trait::async_trait;
use serde::Serialize;
use snapmon_core::config::NotifierConfig;
use snapmon_core::registry::BackendRegistry;
use snapmon_core::traits::{Notifier, NotifierFactory};
use snapmon_core::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// Default HTTP timeout for webhook requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON body sent to the webhook
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    topic: &'a str,
    text: &'a str,
}

/// Webhook notifier
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the auth token.
pub struct WebhookNotifier {
    /// Target URL
    url: String,

    /// Optional bearer token
    /// ⚠️ NEVER log this value
    auth_token: Option<String>,

    /// HTTP client for deliveries
    client: reqwest::Client,
}

// Custom Debug implementation that hides the auth token
impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookNotifier")
            .field("url", &self.url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl WebhookNotifier {
    /// Create a new webhook notifier
    ///
    /// # Parameters
    ///
    /// - `url`: HTTP(S) endpoint the digest is POSTed to
    /// - `auth_token`: Optional bearer token; an empty token counts as none
    pub fn new(url: impl Into<String>, auth_token: Option<String>) -> Result<Self> {
        let url = url.into();
        if url.is_empty() {
            return Err(Error::config("Webhook URL cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url,
            auth_token: auth_token.filter(|t| !t.is_empty()),
            client,
        })
    }

    /// Target URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Map a non-success HTTP status to a descriptive error
fn status_error(status: reqwest::StatusCode, body: &str) -> Error {
    let message = match status.as_u16() {
        401 | 403 => format!(
            "Authentication failed: invalid or missing token. Status: {}",
            status
        ),
        404 => format!("Webhook endpoint not found. Status: {}", status),
        413 => format!("Digest rejected as too large. Status: {}", status),
        429 => format!("Rate limit exceeded. Status: {}", status),
        500..=599 => format!("Webhook server error (transient): {} - {}", status, body),
        _ => format!("Webhook delivery failed: {} - {}", status, body),
    };
    Error::backend("webhook", message)
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn publish(&self, topic: &str, text: &str) -> Result<()> {
        let payload = WebhookPayload { topic, text };

        let mut request = self.client.post(&self.url).json(&payload);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::http(format!("Webhook request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status, &error_text));
        }

        tracing::debug!("Webhook accepted digest ({} bytes), status {}", text.len(), status);
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "webhook"
    }
}

/// Factory for webhook notifiers
pub struct WebhookNotifierFactory;

#[async_trait]
impl NotifierFactory for WebhookNotifierFactory {
    async fn create(&self, config: &NotifierConfig) -> Result<Arc<dyn Notifier>> {
        match config {
            NotifierConfig::Webhook { url, auth_token } => {
                config.validate()?;
                Ok(Arc::new(WebhookNotifier::new(url.clone(), auth_token.clone())?))
            }
            _ => Err(Error::config("Invalid config for webhook notifier")),
        }
    }
}

/// Register the webhook notifier with a registry
///
/// # Example
///
/// ```rust
/// use snapmon_core::BackendRegistry;
///
/// let registry = BackendRegistry::new();
/// snapmon_webhook::register(&registry);
/// assert!(registry.has_notifier("webhook"));
/// ```
pub fn register(registry: &BackendRegistry) {
    registry.register_notifier("webhook", Arc::new(WebhookNotifierFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_factory_creation() {
        let config = NotifierConfig::Webhook {
            url: "https://hooks.example.com/snapshots".to_string(),
            auth_token: Some("token".to_string()),
        };

        let notifier = WebhookNotifierFactory.create(&config).await.unwrap();
        assert_eq!(notifier.notifier_name(), "webhook");
    }

    #[tokio::test]
    async fn test_factory_rejects_bad_scheme() {
        let config = NotifierConfig::Webhook {
            url: "ftp://hooks.example.com".to_string(),
            auth_token: None,
        };

        assert!(WebhookNotifierFactory.create(&config).await.is_err());
        assert!(WebhookNotifierFactory.create(&NotifierConfig::Log).await.is_err());
    }

    #[test]
    fn test_empty_url_rejected() {
        assert!(WebhookNotifier::new("", None).is_err());
    }

    #[test]
    fn test_empty_token_is_no_token() {
        let notifier = WebhookNotifier::new("https://example.com", Some(String::new())).unwrap();
        assert!(notifier.auth_token.is_none());
    }

    #[test]
    fn test_auth_token_not_exposed_in_debug() {
        let notifier =
            WebhookNotifier::new("https://example.com", Some("secret_token_12345".to_string()))
                .unwrap();

        let debug_str = format!("{:?}", notifier);
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("<REDACTED>"));
        assert!(debug_str.contains("WebhookNotifier"));
    }

    #[test]
    fn test_payload_shape() {
        let payload = WebhookPayload {
            topic: "ops",
            text: "RDS Snapshot Status Update Summary (0 changes)\n\n",
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["topic"], "ops");
        assert!(json["text"].as_str().unwrap().starts_with("RDS Snapshot"));
    }

    #[test]
    fn test_status_mapping() {
        let err = status_error(reqwest::StatusCode::FORBIDDEN, "");
        assert!(err.to_string().contains("Authentication failed"));

        let err = status_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "");
        assert!(err.to_string().contains("Rate limit"));

        let err = status_error(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert!(err.to_string().contains("transient"));
        assert!(err.to_string().contains("upstream down"));
    }

    #[test]
    fn test_register() {
        let registry = BackendRegistry::new();
        register(&registry);
        assert!(registry.has_notifier("webhook"));
    }
}
