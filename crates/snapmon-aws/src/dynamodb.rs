//! DynamoDB state store
//!
//! Table schema:
//! - `pk`: region (String, partition key)
//! - `sk`: snapshot identifier (String, sort key)
//! - `status`: last published status (String)
//! - `ttl`: expiry in epoch seconds (Number), enabled as the table's TTL attribute
//!
//! DynamoDB deletes expired items lazily, so reads skip items whose `ttl` has
//! already passed.

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::{AttributeValue, PutRequest, WriteRequest};
use chrono::{DateTime, Utc};
use snapmon_core::config::StateStoreConfig;
use snapmon_core::snapshot::SnapshotInfo;
use snapmon_core::traits::{Page, StateEntry, StateReader, StateStore, StateStoreFactory, StateWriter};
use snapmon_core::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::load_sdk_config;

/// DynamoDB's BatchWriteItem limit
pub const MAX_BATCH_WRITE_ITEMS: usize = 25;

type Item = HashMap<String, AttributeValue>;

/// DynamoDB implementation of the state traits
pub struct DynamoStateStore {
    client: Client,
    table_name: String,
}

impl DynamoStateStore {
    /// Create a new DynamoDB state store
    pub async fn new(table_name: impl Into<String>, endpoint_url: Option<&str>) -> Result<Self> {
        let table_name = table_name.into();
        if table_name.is_empty() {
            return Err(Error::config("DynamoDB table name cannot be empty"));
        }

        let config = load_sdk_config(None, endpoint_url).await;
        let client = Client::new(&config);

        info!(table = %table_name, "Connected to DynamoDB for snapshot state");

        Ok(Self { client, table_name })
    }

    /// Build a store over an existing client
    pub fn with_client(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

/// Build the item persisted for one record
fn item_for(region: &str, record: &SnapshotInfo, expires_at: DateTime<Utc>) -> Item {
    let mut item = HashMap::new();
    item.insert("pk".to_string(), AttributeValue::S(region.to_string()));
    item.insert("sk".to_string(), AttributeValue::S(record.identifier.clone()));
    item.insert("status".to_string(), AttributeValue::S(record.status.clone()));
    item.insert(
        "ttl".to_string(),
        AttributeValue::N(expires_at.timestamp().to_string()),
    );
    item
}

/// Parse one queried item
fn entry_from_item(item: &Item) -> Result<StateEntry> {
    let identifier = match item.get("sk") {
        Some(AttributeValue::S(sk)) => sk.clone(),
        _ => return Err(Error::backend("dynamodb", "item is missing string attribute sk")),
    };
    let status = match item.get("status") {
        Some(AttributeValue::S(status)) => status.clone(),
        _ => {
            return Err(Error::backend(
                "dynamodb",
                format!("item {} is missing string attribute status", identifier),
            ));
        }
    };
    let expires_at = match item.get("ttl") {
        Some(AttributeValue::N(ttl)) => ttl
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    };

    Ok(StateEntry {
        identifier,
        status,
        expires_at,
    })
}

/// Continuation token from a query's LastEvaluatedKey (the sort key)
fn token_from_key(key: Option<&Item>) -> Option<String> {
    match key?.get("sk") {
        Some(AttributeValue::S(sk)) => Some(sk.clone()),
        _ => None,
    }
}

/// ExclusiveStartKey rebuilt from a continuation token
fn start_key(region: &str, token: &str) -> Item {
    let mut key = HashMap::new();
    key.insert("pk".to_string(), AttributeValue::S(region.to_string()));
    key.insert("sk".to_string(), AttributeValue::S(token.to_string()));
    key
}

#[async_trait]
impl StateReader for DynamoStateStore {
    async fn query_partition(
        &self,
        region: &str,
        page_token: Option<String>,
    ) -> Result<Page<StateEntry>> {
        let output = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("pk = :region")
            .expression_attribute_values(":region", AttributeValue::S(region.to_string()))
            .set_exclusive_start_key(page_token.as_deref().map(|token| start_key(region, token)))
            .send()
            .await
            .map_err(|e| {
                Error::backend(
                    "dynamodb",
                    format!("Query of {} failed for {}: {}", self.table_name, region, e),
                )
            })?;

        let now = Utc::now();
        let mut items = Vec::with_capacity(output.items().len());
        for item in output.items() {
            let entry = entry_from_item(item)?;
            if !entry.is_expired(now) {
                items.push(entry);
            }
        }

        Ok(Page::new(items, token_from_key(output.last_evaluated_key())))
    }
}

#[async_trait]
impl StateWriter for DynamoStateStore {
    async fn write_batch(
        &self,
        region: &str,
        records: &[SnapshotInfo],
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        if records.len() > MAX_BATCH_WRITE_ITEMS {
            return Err(Error::invalid_input(format!(
                "BatchWriteItem accepts at most {} items, got {}",
                MAX_BATCH_WRITE_ITEMS,
                records.len()
            )));
        }

        let requests = records
            .iter()
            .map(|record| {
                let put = PutRequest::builder()
                    .set_item(Some(item_for(region, record, expires_at)))
                    .build()
                    .map_err(|e| Error::backend("dynamodb", format!("Invalid put request: {}", e)))?;
                Ok(WriteRequest::builder().put_request(put).build())
            })
            .collect::<Result<Vec<_>>>()?;

        let output = self
            .client
            .batch_write_item()
            .request_items(&self.table_name, requests)
            .send()
            .await
            .map_err(|e| {
                Error::backend(
                    "dynamodb",
                    format!("BatchWriteItem to {} failed for {}: {}", self.table_name, region, e),
                )
            })?;

        let unprocessed: usize = output
            .unprocessed_items()
            .map(|tables| tables.values().map(Vec::len).sum())
            .unwrap_or(0);
        if unprocessed > 0 {
            return Err(Error::backend(
                "dynamodb",
                format!(
                    "{} of {} item(s) left unprocessed in {} for {}",
                    unprocessed,
                    records.len(),
                    self.table_name,
                    region
                ),
            ));
        }

        debug!(table = %self.table_name, region = %region, items = records.len(), "Stored snapshot states");
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "dynamodb"
    }
}

/// Factory for DynamoDB state stores
pub struct DynamoStateStoreFactory;

#[async_trait]
impl StateStoreFactory for DynamoStateStoreFactory {
    async fn create(&self, config: &StateStoreConfig) -> Result<Arc<dyn StateStore>> {
        match config {
            StateStoreConfig::Dynamodb {
                table_name,
                endpoint_url,
            } => Ok(Arc::new(
                DynamoStateStore::new(table_name.clone(), endpoint_url.as_deref()).await?,
            )),
            _ => Err(Error::config("Invalid config for DynamoDB state store")),
        }
    }
}
