//! Attribute persistence backed by DynamoDB.
//!
//! Attribute bags are JSON objects stored under a partition key derived
//! from the request envelope by a [`PartitionKeygen`].

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use crate::envelope::RequestEnvelope;
use crate::{Error, Result};

/// A bag of attributes as stored for one partition key.
pub type Attributes = Map<String, Value>;

/// Derives the partition key for a request.
pub type PartitionKeygen = fn(&RequestEnvelope) -> Result<String>;

/// Partition by Alexa user id.
pub fn user_id_partition_keygen(envelope: &RequestEnvelope) -> Result<String> {
    envelope.user_id().map(str::to_string).ok_or_else(|| {
        Error::Persistence(
            "Couldn't retrieve user id from request envelope, for partition key use".to_string(),
        )
    })
}

/// Partition by device id.
pub fn device_id_partition_keygen(envelope: &RequestEnvelope) -> Result<String> {
    envelope.device_id().map(str::to_string).ok_or_else(|| {
        Error::Persistence(
            "Couldn't retrieve device id from request envelope, for partition key use".to_string(),
        )
    })
}

/// Partition by request id, one item per request.
pub fn request_id_partition_keygen(envelope: &RequestEnvelope) -> Result<String> {
    envelope.request_id().map(str::to_string).ok_or_else(|| {
        Error::Persistence(
            "Couldn't retrieve request id from request envelope, for partition key use"
                .to_string(),
        )
    })
}

/// Key-value store for attribute bags.
#[async_trait]
pub trait AttributesStore: Send + Sync {
    /// Read the bag for this request's partition key. Absent bags are empty.
    async fn get_attributes(&self, envelope: &RequestEnvelope) -> Result<Attributes>;

    /// Replace the bag for this request's partition key.
    async fn save_attributes(&self, envelope: &RequestEnvelope, attributes: Attributes)
        -> Result<()>;
}

/// Stores each bag as one DynamoDB item: `{<partition key>: S, attributes: M}`.
pub struct DynamoDbAdapter {
    client: DynamoClient,
    table_name: String,
    partition_key_name: String,
    attribute_name: String,
    keygen: PartitionKeygen,
}

impl DynamoDbAdapter {
    /// Create a new adapter. The table must already exist.
    pub fn new(
        client: DynamoClient,
        table_name: impl Into<String>,
        partition_key_name: impl Into<String>,
        keygen: PartitionKeygen,
    ) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            partition_key_name: partition_key_name.into(),
            attribute_name: "attributes".to_string(),
            keygen,
        }
    }
}

#[async_trait]
impl AttributesStore for DynamoDbAdapter {
    async fn get_attributes(&self, envelope: &RequestEnvelope) -> Result<Attributes> {
        let key = (self.keygen)(envelope)?;

        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(&self.partition_key_name, AttributeValue::S(key.clone()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| {
                Error::Aws(format!("Failed to get item from {}: {}", self.table_name, e))
            })?;

        match output.item.and_then(|mut item| item.remove(&self.attribute_name)) {
            Some(AttributeValue::M(map)) => from_attribute_map(map),
            Some(_) => Err(Error::Persistence(format!(
                "Item {} in {} has a non-map {} attribute",
                key, self.table_name, self.attribute_name
            ))),
            None => {
                debug!(table = %self.table_name, key = %key, "No stored attributes");
                Ok(Attributes::new())
            }
        }
    }

    async fn save_attributes(
        &self,
        envelope: &RequestEnvelope,
        attributes: Attributes,
    ) -> Result<()> {
        let key = (self.keygen)(envelope)?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .item(&self.partition_key_name, AttributeValue::S(key))
            .item(&self.attribute_name, AttributeValue::M(to_attribute_map(&attributes)))
            .send()
            .await
            .map_err(|e| {
                Error::Aws(format!("Failed to put item into {}: {}", self.table_name, e))
            })?;

        Ok(())
    }
}

/// Convert a JSON value to a DynamoDB attribute value.
pub fn to_attribute_value(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(to_attribute_value).collect()),
        Value::Object(map) => AttributeValue::M(to_attribute_map(map)),
    }
}

fn to_attribute_map(map: &Attributes) -> HashMap<String, AttributeValue> {
    map.iter()
        .map(|(k, v)| (k.clone(), to_attribute_value(v)))
        .collect()
}

/// Convert a DynamoDB attribute value back to JSON.
pub fn from_attribute_value(value: AttributeValue) -> Result<Value> {
    match value {
        AttributeValue::Null(_) => Ok(Value::Null),
        AttributeValue::Bool(b) => Ok(Value::Bool(b)),
        AttributeValue::N(n) => parse_number(&n),
        AttributeValue::S(s) => Ok(Value::String(s)),
        AttributeValue::L(items) => items
            .into_iter()
            .map(from_attribute_value)
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        AttributeValue::M(map) => from_attribute_map(map).map(Value::Object),
        AttributeValue::Ss(items) => {
            Ok(Value::Array(items.into_iter().map(Value::String).collect()))
        }
        AttributeValue::Ns(items) => items
            .iter()
            .map(|n| parse_number(n))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        other => Err(Error::Persistence(format!(
            "Unsupported attribute type: {:?}",
            other
        ))),
    }
}

fn from_attribute_map(map: HashMap<String, AttributeValue>) -> Result<Attributes> {
    map.into_iter()
        .map(|(k, v)| from_attribute_value(v).map(|v| (k, v)))
        .collect()
}

fn parse_number(n: &str) -> Result<Value> {
    if let Ok(i) = n.parse::<i64>() {
        return Ok(Value::from(i));
    }
    if let Ok(u) = n.parse::<u64>() {
        return Ok(Value::from(u));
    }
    n.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| Error::Persistence(format!("Invalid number attribute: {}", n)))
}

/// Process-local store, used by tests and local runs.
pub struct InMemoryAdapter {
    keygen: PartitionKeygen,
    items: RwLock<HashMap<String, Attributes>>,
    saves: AtomicUsize,
}

impl InMemoryAdapter {
    pub fn new(keygen: PartitionKeygen) -> Self {
        Self {
            keygen,
            items: RwLock::new(HashMap::new()),
            saves: AtomicUsize::new(0),
        }
    }

    /// Seed a bag without counting it as a save.
    pub async fn insert(&self, key: impl Into<String>, attributes: Attributes) {
        self.items.write().await.insert(key.into(), attributes);
    }

    /// Stored bag for a partition key, if any.
    pub async fn item(&self, key: &str) -> Option<Attributes> {
        self.items.read().await.get(key).cloned()
    }

    /// Number of `save_attributes` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AttributesStore for InMemoryAdapter {
    async fn get_attributes(&self, envelope: &RequestEnvelope) -> Result<Attributes> {
        let key = (self.keygen)(envelope)?;
        Ok(self.item(&key).await.unwrap_or_default())
    }

    async fn save_attributes(
        &self,
        envelope: &RequestEnvelope,
        attributes: Attributes,
    ) -> Result<()> {
        let key = (self.keygen)(envelope)?;
        self.items.write().await.insert(key, attributes);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
