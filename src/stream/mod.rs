//! Change-log stream adapter.
//!
//! Consumes batches of change-log records and relays each qualifying insert
//! to the recipient agent's live connection.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::delivery::{DeliveryClient, OutboundMessage};
use crate::error::RelayError;
use crate::resolver::ConnectionResolver;

/// Event kind tag carried by every change-log record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Modify,
    Remove,
}

/// One record from the durable append-only log. Only insert records with
/// string `agentId` and `message` fields are consumed; everything else is
/// skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub kind: ChangeKind,
    #[serde(default)]
    pub item: serde_json::Map<String, serde_json::Value>,
}

impl ChangeRecord {
    pub fn insert(agent_id: &str, message: &str) -> Self {
        let mut item = serde_json::Map::new();
        item.insert("agentId".to_string(), agent_id.into());
        item.insert("message".to_string(), message.into());
        Self {
            kind: ChangeKind::Insert,
            item,
        }
    }

    fn string_field(&self, name: &str) -> Option<&str> {
        self.item.get(name).and_then(|v| v.as_str())
    }
}

/// Routes change-log inserts to live connections.
///
/// Failure granularity is the batch: a malformed insert or a delivery
/// failure aborts the whole batch as one handled error. A recipient with no
/// live connection is not a failure; the record is dropped and processing
/// continues.
pub struct StreamAdapter {
    resolver: ConnectionResolver,
    delivery: Arc<dyn DeliveryClient>,
}

impl StreamAdapter {
    pub fn new(resolver: ConnectionResolver, delivery: Arc<dyn DeliveryClient>) -> Self {
        Self { resolver, delivery }
    }

    /// Process a batch in delivery order. Returns the number of messages
    /// actually delivered.
    pub async fn handle_batch(&self, records: &[ChangeRecord]) -> Result<usize, RelayError> {
        let mut delivered = 0usize;
        for record in records {
            if record.kind != ChangeKind::Insert {
                debug!(kind = ?record.kind, "skipping non-insert change record");
                continue;
            }

            let agent_id = record.string_field("agentId");
            let message = record.string_field("message");
            let (agent_id, message) = match (agent_id, message) {
                (Some(agent_id), Some(message)) => (agent_id, message),
                _ => {
                    return Err(RelayError::Internal(
                        "insert record missing string agentId or message field".to_string(),
                    ))
                }
            };

            let record = match self.resolver.resolve(agent_id).await? {
                Some(record) => record,
                None => {
                    debug!(agent_id, "no live connection for agent; dropping message");
                    continue;
                }
            };

            let envelope = OutboundMessage::now("echo", message);
            self.delivery
                .send(&record.endpoint_url, &record.connection_id, &envelope)
                .await?;
            info!(
                agent_id,
                connection_id = %record.connection_id,
                "relayed change-log message"
            );
            delivered += 1;
        }
        Ok(delivered)
    }
}
