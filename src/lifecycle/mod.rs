//! Connection lifecycle handling.
//!
//! Processes connect/disconnect events from the duplex-channel transport and
//! keeps the registry in step. Per connection the state machine is just
//! {absent, connected}: connect writes a fresh record, disconnect deletes it.
//! There is no reconnect transition; a second connect for the same agent
//! coexists with the first record until its own disconnect arrives.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::error::RelayError;
use crate::registry::{ConnectionRecord, ConnectionStore};

/// A connection-channel event as delivered by the duplex transport.
#[derive(Debug, Clone)]
pub struct ConnectionEvent {
    pub connection_id: String,
    pub route_key: String,
    pub domain_name: String,
    pub stage: String,
    pub query: HashMap<String, String>,
    pub body: Option<String>,
}

impl ConnectionEvent {
    /// The address future deliveries for this connection must be sent to.
    pub fn endpoint_url(&self) -> String {
        format!("https://{}/{}", self.domain_name, self.stage)
    }
}

/// Writes and removes registry entries in response to lifecycle events.
pub struct LifecycleHandler {
    store: Arc<dyn ConnectionStore>,
}

impl LifecycleHandler {
    pub fn new(store: Arc<dyn ConnectionStore>) -> Self {
        Self { store }
    }

    /// `absent -> connected`. Requires the agent identity in the connect
    /// request's query parameters; without it the transition is rejected and
    /// no record is written.
    pub async fn connect(&self, event: &ConnectionEvent) -> Result<(), RelayError> {
        let agent_id = event
            .query
            .get("agentId")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                RelayError::BadRequest("Missing agentId in query parameters.".to_string())
            })?;

        let record = ConnectionRecord {
            agent_id: agent_id.to_string(),
            connection_id: event.connection_id.clone(),
            endpoint_url: event.endpoint_url(),
        };
        self.store.put(record).await?;
        info!(
            agent_id,
            connection_id = %event.connection_id,
            "connection registered"
        );
        Ok(())
    }

    /// `connected -> absent`. Always succeeds; deleting an unknown
    /// connection id is a no-op.
    pub async fn disconnect(&self, connection_id: &str) -> Result<(), RelayError> {
        self.store.delete(connection_id).await?;
        info!(connection_id, "connection deregistered");
        Ok(())
    }
}
