// # AWS Collaborators
//
// This crate connects the snapshot monitor to the AWS services the deployed
// system talks to:
//
// - **RDS**: `DescribeDBSnapshots` / `DescribeDBClusterSnapshots`, one client per region
// - **DynamoDB**: per-region baseline table (`pk` = region, `sk` = snapshot id,
//   `status`, `ttl` in epoch seconds)
// - **SNS**: digest delivery to a topic ARN
//
// ## Trust Level: Untrusted
//
// Every collaborator here makes exactly one service call per trait call. No
// retries beyond the SDK's own transport retry, no caching, no background
// tasks. Errors are returned to the engine as-is.
//
// ## Credentials
//
// Resolved by `aws-config`'s default chain (environment, profile, instance
// metadata). An endpoint override (e.g. localstack) can be given per backend.

pub mod dynamodb;
pub mod rds;
pub mod sns;

pub use dynamodb::{DynamoStateStore, DynamoStateStoreFactory};
pub use rds::{RdsLister, RdsListerFactory};
pub use sns::{SnsNotifier, SnsNotifierFactory};

use aws_config::{BehaviorVersion, Region, SdkConfig};
use snapmon_core::registry::BackendRegistry;
use std::sync::Arc;

/// Load shared SDK configuration
///
/// `region` overrides the default region chain; `endpoint_url` overrides the
/// service endpoint for every client built from the result.
pub(crate) async fn load_sdk_config(region: Option<&str>, endpoint_url: Option<&str>) -> SdkConfig {
    let mut builder = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = region {
        builder = builder.region(Region::new(region.to_string()));
    }
    if let Some(endpoint) = endpoint_url {
        builder = builder.endpoint_url(endpoint);
    }

    builder.load().await
}

/// Register the AWS backends with a registry
///
/// - lister: `rds`
/// - state store: `dynamodb`
/// - notifier: `sns`
///
/// `endpoint_url` applies to the RDS clients; DynamoDB and SNS take theirs
/// from their own configuration sections.
///
/// # Example
///
/// ```rust
/// use snapmon_core::BackendRegistry;
///
/// let registry = BackendRegistry::new();
/// snapmon_aws::register(&registry, None);
/// assert!(registry.has_lister("rds"));
/// ```
pub fn register(registry: &BackendRegistry, endpoint_url: Option<String>) {
    registry.register_lister("rds", Arc::new(RdsListerFactory::new(endpoint_url)));
    registry.register_state_store("dynamodb", Arc::new(DynamoStateStoreFactory));
    registry.register_notifier("sns", Arc::new(SnsNotifierFactory));
}
