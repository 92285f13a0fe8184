//! SNS notifier

use async_trait::async_trait;
use aws_sdk_sns::Client;
use snapmon_core::config::NotifierConfig;
use snapmon_core::traits::{Notifier, NotifierFactory};
use snapmon_core::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info};

use crate::load_sdk_config;

/// Publishes the digest as the message body of one SNS `Publish` call
pub struct SnsNotifier {
    client: Client,
}

impl SnsNotifier {
    /// Create a notifier using the default region chain
    pub async fn new(endpoint_url: Option<&str>) -> Self {
        let config = load_sdk_config(None, endpoint_url).await;
        info!(endpoint = ?endpoint_url, "Connected to SNS");
        Self {
            client: Client::new(&config),
        }
    }

    /// Build a notifier over an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for SnsNotifier {
    async fn publish(&self, topic: &str, text: &str) -> Result<()> {
        if topic.is_empty() {
            return Err(Error::config("SNS topic ARN cannot be empty"));
        }

        let output = self
            .client
            .publish()
            .topic_arn(topic)
            .message(text)
            .send()
            .await
            .map_err(|e| Error::backend("sns", format!("Publish to {} failed: {}", topic, e)))?;

        debug!(
            topic_arn = %topic,
            message_id = output.message_id().unwrap_or("<none>"),
            "Published digest"
        );
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "sns"
    }
}

/// Factory for SNS notifiers
pub struct SnsNotifierFactory;

#[async_trait]
impl NotifierFactory for SnsNotifierFactory {
    async fn create(&self, config: &NotifierConfig) -> Result<Arc<dyn Notifier>> {
        match config {
            NotifierConfig::Sns { endpoint_url } => {
                Ok(Arc::new(SnsNotifier::new(endpoint_url.as_deref()).await))
            }
            _ => Err(Error::config("Invalid config for SNS notifier")),
        }
    }
}
