//! Resolves an agent identity to its current live connection.

use std::sync::Arc;
use tracing::debug;

use crate::registry::{ConnectionRecord, ConnectionStore, StoreError};

/// Looks up the connection a message for an agent should be routed to.
///
/// Not-found is not an error: an agent that is simply offline resolves to
/// `None`. When multiple records match (an agent reconnected without a clean
/// disconnect), the first record in scan order wins; the registry tracks no
/// write ordering, so no "most recent" semantic is promised.
pub struct ConnectionResolver {
    store: Arc<dyn ConnectionStore>,
}

impl ConnectionResolver {
    pub fn new(store: Arc<dyn ConnectionStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, agent_id: &str) -> Result<Option<ConnectionRecord>, StoreError> {
        let mut records = self.store.get_by_agent(agent_id).await?;
        if records.len() > 1 {
            debug!(
                agent_id,
                matches = records.len(),
                "multiple live connections for agent; picking first match"
            );
        }
        if records.is_empty() {
            return Ok(None);
        }
        Ok(Some(records.swap_remove(0)))
    }
}
