//! Configuration types for the snapshot monitor
//!
//! This module defines all configuration structures used throughout the crate.
//! A [`MonitorConfig`] is loaded once per invocation and never mutated
//! afterwards.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Main monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Regions to monitor, processed in this order
    pub regions: Vec<String>,

    /// Statuses that produce alerts
    #[serde(default = "default_statuses_to_monitor")]
    pub statuses_to_monitor: Vec<String>,

    /// Only snapshots created within this many days are considered
    #[serde(default = "default_snapshot_age_days")]
    pub snapshot_age_days: u32,

    /// How long persisted state lives, in days (defaults to `snapshot_age_days`)
    #[serde(default)]
    pub retention_days: Option<u32>,

    /// Notification target passed to the notifier (e.g. an SNS topic ARN)
    pub notification_topic: String,

    /// Notifier backend
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// State store backend
    #[serde(default)]
    pub state_store: StateStoreConfig,

    /// Name of the registered snapshot lister backend
    #[serde(default = "default_lister")]
    pub lister: String,

    /// Schedule expression, consumed by the daemon's scheduler only
    #[serde(default = "default_schedule_expression")]
    pub schedule_expression: String,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl MonitorConfig {
    /// Create a configuration with defaults for everything but the targets
    pub fn new(regions: Vec<String>, notification_topic: impl Into<String>) -> Self {
        Self {
            regions,
            statuses_to_monitor: default_statuses_to_monitor(),
            snapshot_age_days: default_snapshot_age_days(),
            retention_days: None,
            notification_topic: notification_topic.into(),
            notifier: NotifierConfig::default(),
            state_store: StateStoreConfig::default(),
            lister: default_lister(),
            schedule_expression: default_schedule_expression(),
            engine: EngineConfig::default(),
        }
    }

    /// Set the statuses to monitor
    pub fn with_statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statuses_to_monitor = statuses.into_iter().map(Into::into).collect();
        self
    }

    /// Set the snapshot age cutoff in days
    pub fn with_snapshot_age_days(mut self, days: u32) -> Self {
        self.snapshot_age_days = days;
        self
    }

    /// Set the state store backend
    pub fn with_state_store(mut self, state_store: StateStoreConfig) -> Self {
        self.state_store = state_store;
        self
    }

    /// Set the notifier backend
    pub fn with_notifier(mut self, notifier: NotifierConfig) -> Self {
        self.notifier = notifier;
        self
    }

    /// Set the engine settings
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.regions.is_empty() {
            return Err(crate::Error::config("No regions configured"));
        }

        let mut seen = HashSet::new();
        for region in &self.regions {
            if region.trim().is_empty() {
                return Err(crate::Error::config("Region names cannot be empty"));
            }
            if !seen.insert(region.as_str()) {
                return Err(crate::Error::config(format!(
                    "Region {} is configured more than once",
                    region
                )));
            }
        }

        if self.statuses_to_monitor.is_empty() {
            return Err(crate::Error::config("No statuses to monitor configured"));
        }
        if self.statuses_to_monitor.iter().any(|s| s.trim().is_empty()) {
            return Err(crate::Error::config("Monitored statuses cannot be empty"));
        }

        if self.snapshot_age_days == 0 {
            return Err(crate::Error::config("Snapshot age must be > 0 days"));
        }
        if self.retention_days == Some(0) {
            return Err(crate::Error::config("State retention must be > 0 days"));
        }

        if self.notification_topic.trim().is_empty() {
            return Err(crate::Error::config("Notification topic cannot be empty"));
        }

        if self.lister.is_empty() {
            return Err(crate::Error::config("Snapshot lister name cannot be empty"));
        }

        self.engine.validate()?;
        self.state_store.validate()?;
        self.notifier.validate()?;

        Ok(())
    }

    /// Statuses to monitor as a set
    pub fn monitored_statuses(&self) -> HashSet<String> {
        self.statuses_to_monitor.iter().cloned().collect()
    }

    /// Retention window for persisted state, in days
    pub fn effective_retention_days(&self) -> u32 {
        self.retention_days.unwrap_or(self.snapshot_age_days)
    }

    /// Snapshots created at or before this instant are ignored
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.snapshot_age_days))
    }

    /// Expiry stored on records persisted at `now`
    pub fn expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(i64::from(self.effective_retention_days()))
    }
}

/// Notifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifierConfig {
    /// Amazon SNS topic
    Sns {
        /// Endpoint override (e.g. localstack)
        endpoint_url: Option<String>,
    },

    /// HTTP webhook
    Webhook {
        /// URL the digest is POSTed to
        url: String,
        /// Optional bearer token
        auth_token: Option<String>,
    },

    /// Log the digest instead of delivering it (dry run)
    Log,

    /// Custom notifier
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl NotifierConfig {
    /// Validate the notifier configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            NotifierConfig::Webhook { url, .. } => {
                if url.is_empty() {
                    return Err(crate::Error::config("Webhook URL cannot be empty"));
                }
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "Webhook URL must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )));
                }
                Ok(())
            }
            NotifierConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom notifier factory cannot be empty",
                    ));
                }
                Ok(())
            }
            NotifierConfig::Sns { .. } | NotifierConfig::Log => Ok(()),
        }
    }

    /// Get the notifier type name
    pub fn type_name(&self) -> &str {
        match self {
            NotifierConfig::Sns { .. } => "sns",
            NotifierConfig::Webhook { .. } => "webhook",
            NotifierConfig::Log => "log",
            NotifierConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        NotifierConfig::Sns { endpoint_url: None }
    }
}

/// State store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateStoreConfig {
    /// DynamoDB table (pk = region, sk = snapshot identifier)
    Dynamodb {
        /// Table name
        table_name: String,
        /// Endpoint override (e.g. localstack)
        endpoint_url: Option<String>,
    },

    /// File-based state store
    File {
        /// Path to the state file
        path: String,
    },

    /// In-memory state store (not persistent)
    #[default]
    Memory,

    /// Custom state store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl StateStoreConfig {
    /// Validate the state store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StateStoreConfig::Dynamodb { table_name, .. } if table_name.is_empty() => {
                Err(crate::Error::config("DynamoDB table name cannot be empty"))
            }
            StateStoreConfig::File { path } if path.is_empty() => {
                Err(crate::Error::config("State file path cannot be empty"))
            }
            StateStoreConfig::Custom { factory, .. } if factory.is_empty() => Err(
                crate::Error::config("Custom state store factory cannot be empty"),
            ),
            _ => Ok(()),
        }
    }

    /// Get the state store type name
    pub fn type_name(&self) -> &str {
        match self {
            StateStoreConfig::Dynamodb { .. } => "dynamodb",
            StateStoreConfig::File { .. } => "file",
            StateStoreConfig::Memory => "memory",
            StateStoreConfig::Custom { factory, .. } => factory,
        }
    }
}

/// What a run does when one region fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failing region and return its error
    #[default]
    FailFast,
    /// Record the failure and continue with the remaining regions
    ContinueOnError,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of records per state write
    ///
    /// This is a limit of the persistence collaborator (DynamoDB accepts at
    /// most 25 items per batch write), not a tuning knob.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// What to do when a region fails
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Capacity of the monitoring event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_batch_size == 0 {
            return Err(crate::Error::config("Max batch size must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            failure_policy: FailurePolicy::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// DynamoDB's BatchWriteItem limit
pub const DEFAULT_MAX_BATCH_SIZE: usize = 25;

fn default_statuses_to_monitor() -> Vec<String> {
    vec!["available".to_string(), "failed".to_string()]
}

fn default_snapshot_age_days() -> u32 {
    7
}

fn default_lister() -> String {
    "rds".to_string()
}

fn default_schedule_expression() -> String {
    "rate(10 minutes)".to_string()
}

fn default_max_batch_size() -> usize {
    DEFAULT_MAX_BATCH_SIZE
}

fn default_event_channel_capacity() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MonitorConfig {
        MonitorConfig::new(vec!["us-west-2".to_string()], "arn:aws:sns:us-west-2:1:topic")
    }

    #[test]
    fn test_defaults() {
        let config = config();
        assert_eq!(config.snapshot_age_days, 7);
        assert_eq!(config.effective_retention_days(), 7);
        assert_eq!(config.engine.max_batch_size, 25);
        assert_eq!(config.engine.failure_policy, FailurePolicy::FailFast);
        assert_eq!(config.schedule_expression, "rate(10 minutes)");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_empty_inputs() {
        let mut empty_regions = config();
        empty_regions.regions.clear();
        assert!(empty_regions.validate().is_err());

        let no_statuses = config().with_statuses(Vec::<String>::new());
        assert!(no_statuses.validate().is_err());

        let zero_age = config().with_snapshot_age_days(0);
        assert!(zero_age.validate().is_err());

        let mut duplicate = config();
        duplicate.regions.push("us-west-2".to_string());
        assert!(duplicate.validate().is_err());

        let zero_batch = config().with_engine(EngineConfig {
            max_batch_size: 0,
            ..EngineConfig::default()
        });
        assert!(zero_batch.validate().is_err());
    }

    #[test]
    fn test_cutoff_and_expiry() {
        let now = Utc::now();
        let mut config = config().with_snapshot_age_days(3);
        assert_eq!(config.cutoff(now), now - Duration::days(3));
        assert_eq!(config.expiry(now), now + Duration::days(3));

        config.retention_days = Some(30);
        assert_eq!(config.expiry(now), now + Duration::days(30));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = serde_json::json!({
            "regions": ["us-east-1", "eu-west-1"],
            "notification_topic": "alerts",
            "state_store": { "type": "file", "path": "/tmp/state.json" },
            "notifier": { "type": "log" }
        });

        let config: MonitorConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.regions.len(), 2);
        assert_eq!(config.statuses_to_monitor, vec!["available", "failed"]);
        assert_eq!(config.state_store.type_name(), "file");
        assert_eq!(config.notifier.type_name(), "log");
        assert_eq!(config.lister, "rds");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_webhook_url_scheme_validated() {
        let notifier = NotifierConfig::Webhook {
            url: "ftp://example.com".to_string(),
            auth_token: None,
        };
        assert!(notifier.validate().is_err());
    }
}
