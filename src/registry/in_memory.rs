//! In-memory connection store implementation.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::traits::{ConnectionRecord, ConnectionStore, StoreError};

/// A volatile connection store backed by a mutex-protected hash map.
///
/// State does not survive a restart; use the sqlite backend anywhere routing
/// must outlive the process.
pub struct InMemoryConnectionStore {
    records: Mutex<HashMap<String, ConnectionRecord>>,
}

impl InMemoryConnectionStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryConnectionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionStore for InMemoryConnectionStore {
    async fn put(&self, record: ConnectionRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock();
        records.insert(record.connection_id.clone(), record);
        Ok(())
    }

    async fn get_by_agent(&self, agent_id: &str) -> Result<Vec<ConnectionRecord>, StoreError> {
        let records = self.records.lock();
        Ok(records
            .values()
            .filter(|r| r.agent_id == agent_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, connection_id: &str) -> Result<(), StoreError> {
        let mut records = self.records.lock();
        records.remove(connection_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ConnectionRecord>, StoreError> {
        let records = self.records.lock();
        Ok(records.values().cloned().collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
