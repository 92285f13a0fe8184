// # Notifier Trait
//
// Defines the interface for delivering the aggregated digest.
//
// ## Implementations
//
// - Log (dry run): `snapmon_core::log_notifier`
// - SNS: `snapmon-aws` crate
// - Webhook: `snapmon-webhook` crate

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::NotifierConfig;

/// Trait for notifier implementations
///
/// The engine calls [`Notifier::publish`] at most once per region per run,
/// and only when the change set is non-empty.
///
/// # Trust Level: Untrusted
///
/// Notifiers must not retry. A failed publish aborts the region run before
/// any state is written, so the next scheduled run detects the same changes
/// and publishes again.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text` to `topic`
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The digest was accepted by the delivery service
    /// - `Err(Error)`: Delivery failed
    async fn publish(&self, topic: &str, text: &str) -> Result<(), crate::Error>;

    /// Get the notifier name (for logging/debugging)
    fn notifier_name(&self) -> &'static str;
}

/// Helper trait for constructing notifiers from configuration
#[async_trait]
pub trait NotifierFactory: Send + Sync {
    /// Create a Notifier instance from configuration
    async fn create(&self, config: &NotifierConfig) -> Result<Arc<dyn Notifier>, crate::Error>;
}
