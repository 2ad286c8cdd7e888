//! Connection registry traits and types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One live duplex-channel session registered for an agent.
///
/// Storage is keyed by `connection_id`; routing is done by `agent_id`, which
/// is deliberately not unique — an agent that reconnects without a clean
/// disconnect leaves two records behind until the stale one is disconnected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub agent_id: String,
    pub connection_id: String,
    /// Address future deliveries for this connection must be sent to. Fixed
    /// at connect time; never updated.
    pub endpoint_url: String,
}

/// Failures from the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("registry store failure: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Persistent mapping from agent identity to live connection handles.
///
/// This is the sole source of truth for routing. Implementations must
/// tolerate concurrent put/get/delete from independent workers; operations
/// are keyed independently so no cross-record locking is required.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Insert a record, overwriting any existing record for the same
    /// connection id (idempotent for a given session).
    async fn put(&self, record: ConnectionRecord) -> Result<(), StoreError>;

    /// All records registered under the given agent id. Scan-based filter;
    /// result order is unspecified.
    async fn get_by_agent(&self, agent_id: &str) -> Result<Vec<ConnectionRecord>, StoreError>;

    /// Remove the record for a connection id. No-op when the id is absent.
    async fn delete(&self, connection_id: &str) -> Result<(), StoreError>;

    /// Every live record, for operator tooling.
    async fn list(&self) -> Result<Vec<ConnectionRecord>, StoreError>;

    /// The name of this store implementation.
    fn name(&self) -> &str;
}
