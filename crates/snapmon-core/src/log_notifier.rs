// # Log Notifier
//
// Writes the digest to the tracing log instead of delivering it.
//
// Used for dry runs and local testing: the pipeline behaves exactly as with a
// real notifier (state is written after a successful "publish"), but nothing
// leaves the host.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::Error;
use crate::config::NotifierConfig;
use crate::traits::{Notifier, NotifierFactory};

/// Notifier that logs every digest at INFO level
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn publish(&self, topic: &str, text: &str) -> Result<(), Error> {
        info!(topic = %topic, "Digest (not delivered):\n{}", text);
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "log"
    }
}

/// Factory for [`LogNotifier`]
pub struct LogNotifierFactory;

#[async_trait]
impl NotifierFactory for LogNotifierFactory {
    async fn create(&self, config: &NotifierConfig) -> Result<Arc<dyn Notifier>, Error> {
        match config {
            NotifierConfig::Log => Ok(Arc::new(LogNotifier::new())),
            _ => Err(Error::config("Invalid config for log notifier")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_notifier_accepts_digest() {
        let notifier = LogNotifier::new();
        assert!(notifier.publish("topic", "digest").await.is_ok());
        assert_eq!(notifier.notifier_name(), "log");
    }

    #[tokio::test]
    async fn test_factory_only_accepts_log_config() {
        assert!(LogNotifierFactory.create(&NotifierConfig::Log).await.is_ok());
        assert!(
            LogNotifierFactory
                .create(&NotifierConfig::Sns { endpoint_url: None })
                .await
                .is_err()
        );
    }
}
