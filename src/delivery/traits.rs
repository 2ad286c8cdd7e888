//! Delivery client traits and message envelope.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The normalized envelope pushed to a live connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundMessage {
    pub action: String,
    pub message: String,
    /// ISO-8601 wall-clock time, generated at send time.
    pub timestamp: String,
}

impl OutboundMessage {
    pub fn now(action: &str, message: &str) -> Self {
        Self {
            action: action.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Failures from the delivery transport.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The target session is gone (closed or expired). The registry entry is
    /// NOT evicted here; cleanup belongs to the lifecycle handler alone.
    #[error("connection {0} is no longer live")]
    ConnectionGone(String),

    #[error("delivery transport failure: {0}")]
    Transport(String),
}

/// Best-effort, single-attempt push of a message to one live connection.
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    /// Serialize `message` and submit it to `connection_id` at
    /// `endpoint_url`. Failure is reported to the caller and never retried.
    async fn send(
        &self,
        endpoint_url: &str,
        connection_id: &str,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError>;

    /// The name of this delivery client implementation.
    fn name(&self) -> &str;
}
