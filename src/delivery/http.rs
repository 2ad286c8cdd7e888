//! HTTP delivery client.
//!
//! Posts serialized envelopes to the duplex-channel management endpoint at
//! `{endpoint_url}/@connections/{connection_id}`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::warn;

use super::traits::{DeliveryClient, DeliveryError, OutboundMessage};
use crate::config::DeliveryConfig;

pub struct HttpDeliveryClient {
    client: Client,
}

impl HttpDeliveryClient {
    pub fn new(config: &DeliveryConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
                .connect_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn post_url(endpoint_url: &str, connection_id: &str) -> String {
        format!(
            "{}/@connections/{}",
            endpoint_url.trim_end_matches('/'),
            connection_id
        )
    }
}

#[async_trait]
impl DeliveryClient for HttpDeliveryClient {
    async fn send(
        &self,
        endpoint_url: &str,
        connection_id: &str,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError> {
        let payload = serde_json::to_vec(message)
            .map_err(|e| DeliveryError::Transport(format!("failed to serialize envelope: {e}")))?;

        let url = Self::post_url(endpoint_url, connection_id);
        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status == StatusCode::GONE {
            warn!(connection_id, "target connection is gone");
            Err(DeliveryError::ConnectionGone(connection_id.to_string()))
        } else {
            Err(DeliveryError::Transport(format!(
                "delivery endpoint returned {status} for {url}"
            )))
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_url_joins_endpoint_and_connection() {
        assert_eq!(
            HttpDeliveryClient::post_url("https://x.com/prod", "c1"),
            "https://x.com/prod/@connections/c1"
        );
    }

    #[test]
    fn post_url_trims_trailing_slash() {
        assert_eq!(
            HttpDeliveryClient::post_url("https://x.com/prod/", "c1"),
            "https://x.com/prod/@connections/c1"
        );
    }

    #[test]
    fn client_constructs_from_config() {
        let client = HttpDeliveryClient::new(&DeliveryConfig::default());
        assert_eq!(client.name(), "http");
    }
}
