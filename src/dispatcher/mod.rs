//! Route dispatcher: the single entry point for every inbound unit of work.
//!
//! Classifies an invocation as either a change-log batch or a
//! connection-channel event, delegates to the stream adapter or lifecycle
//! handler, and converts every internal error kind into a coarse
//! status-class response. Nothing below this boundary leaks raw detail to
//! the caller.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, warn};

use crate::delivery::{DeliveryClient, OutboundMessage};
use crate::error::RelayError;
use crate::lifecycle::{ConnectionEvent, LifecycleHandler};
use crate::registry::ConnectionStore;
use crate::resolver::ConnectionResolver;
use crate::stream::{ChangeRecord, StreamAdapter};

/// The wire shape of one invocation: a change-log batch, a
/// connection-channel event, or (invalidly) neither.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InvocationEvent {
    pub records: Vec<ChangeRecord>,
    pub request_context: Option<RequestContext>,
    pub query_string_parameters: HashMap<String, String>,
    pub body: Option<String>,
}

/// Connection-channel request context from the duplex transport.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub connection_id: String,
    pub route_key: String,
    pub domain_name: String,
    pub stage: String,
}

/// Coarse outcome returned to the invoking environment.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HandlerResponse {
    pub status_code: u16,
    pub body: String,
}

impl HandlerResponse {
    fn ok(body: &str) -> Self {
        Self {
            status_code: 200,
            body: body.to_string(),
        }
    }
}

/// Top-level control component wiring the registry, resolver, lifecycle
/// handler, and delivery client together. Constructed once at composition
/// time; every dependency is passed in explicitly.
pub struct Dispatcher {
    lifecycle: LifecycleHandler,
    adapter: StreamAdapter,
    delivery: Arc<dyn DeliveryClient>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn ConnectionStore>, delivery: Arc<dyn DeliveryClient>) -> Self {
        Self {
            lifecycle: LifecycleHandler::new(store.clone()),
            adapter: StreamAdapter::new(ConnectionResolver::new(store), delivery.clone()),
            delivery,
        }
    }

    /// Entry contract: classify and process one invocation, mapping every
    /// failure to a {200, 400, 500} status with a short text body.
    pub async fn handle(&self, event: InvocationEvent) -> HandlerResponse {
        match self.dispatch(event).await {
            Ok(response) => response,
            Err(err) => Self::failure_response(&err),
        }
    }

    async fn dispatch(&self, event: InvocationEvent) -> Result<HandlerResponse, RelayError> {
        if !event.records.is_empty() {
            self.adapter.handle_batch(&event.records).await?;
            return Ok(HandlerResponse::ok("Stream event processed."));
        }

        let Some(context) = event.request_context else {
            return Err(RelayError::BadRequest(
                "Invalid invocation context.".to_string(),
            ));
        };

        let connection = ConnectionEvent {
            connection_id: context.connection_id,
            route_key: context.route_key,
            domain_name: context.domain_name,
            stage: context.stage,
            query: event.query_string_parameters,
            body: event.body,
        };

        match connection.route_key.trim_start_matches('$') {
            "connect" => {
                self.lifecycle.connect(&connection).await?;
                Ok(HandlerResponse::ok("Connected."))
            }
            "disconnect" => {
                self.lifecycle.disconnect(&connection.connection_id).await?;
                Ok(HandlerResponse::ok("Disconnected."))
            }
            "echo" => {
                let message = Self::body_message(connection.body.as_deref())?;
                let envelope = OutboundMessage::now("echo", &message);
                self.delivery
                    .send(
                        &connection.endpoint_url(),
                        &connection.connection_id,
                        &envelope,
                    )
                    .await?;
                Ok(HandlerResponse::ok("Echo message sent."))
            }
            "default" => {
                // Body must still be well-formed even though its content is
                // not echoed back on this route.
                Self::body_message(connection.body.as_deref())?;
                let envelope = OutboundMessage::now(
                    "default",
                    "Received your message on the default route",
                );
                self.delivery
                    .send(
                        &connection.endpoint_url(),
                        &connection.connection_id,
                        &envelope,
                    )
                    .await?;
                Ok(HandlerResponse::ok("Default message processed."))
            }
            _ => Err(RelayError::BadRequest("Unhandled route.".to_string())),
        }
    }

    /// Extract the `message` string from a connection event body.
    fn body_message(body: Option<&str>) -> Result<String, RelayError> {
        let invalid = || RelayError::BadRequest("Invalid message format.".to_string());
        let body = body.ok_or_else(invalid)?;
        let parsed: serde_json::Value = serde_json::from_str(body).map_err(|_| invalid())?;
        let message = parsed
            .get("message")
            .and_then(|m| m.as_str())
            .ok_or_else(invalid)?;
        Ok(message.to_string())
    }

    /// The single place internal error kinds become external status classes.
    fn failure_response(err: &RelayError) -> HandlerResponse {
        match err {
            RelayError::BadRequest(message) => {
                warn!(%message, "rejecting invocation");
                HandlerResponse {
                    status_code: 400,
                    body: message.clone(),
                }
            }
            RelayError::Store(inner) => {
                error!(error = %inner, "registry operation failed");
                HandlerResponse {
                    status_code: 500,
                    body: "Registry operation failed.".to_string(),
                }
            }
            RelayError::Delivery(inner) => {
                warn!(error = %inner, "message delivery failed");
                HandlerResponse {
                    status_code: 500,
                    body: "Message delivery failed.".to_string(),
                }
            }
            RelayError::Internal(detail) => {
                error!(%detail, "internal relay failure");
                HandlerResponse {
                    status_code: 500,
                    body: "Internal server error.".to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::DeliveryError;
    use crate::registry::InMemoryConnectionStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct RecordingDeliveryClient {
        sent: Mutex<Vec<(String, String, OutboundMessage)>>,
        fail_with_gone: bool,
    }

    impl RecordingDeliveryClient {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_with_gone: false,
            }
        }

        fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_with_gone: true,
            }
        }
    }

    #[async_trait]
    impl DeliveryClient for RecordingDeliveryClient {
        async fn send(
            &self,
            endpoint_url: &str,
            connection_id: &str,
            message: &OutboundMessage,
        ) -> Result<(), DeliveryError> {
            if self.fail_with_gone {
                return Err(DeliveryError::ConnectionGone(connection_id.to_string()));
            }
            self.sent.lock().push((
                endpoint_url.to_string(),
                connection_id.to_string(),
                message.clone(),
            ));
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn fixture() -> (
        Arc<InMemoryConnectionStore>,
        Arc<RecordingDeliveryClient>,
        Dispatcher,
    ) {
        let store = Arc::new(InMemoryConnectionStore::new());
        let delivery = Arc::new(RecordingDeliveryClient::new());
        let dispatcher = Dispatcher::new(store.clone(), delivery.clone());
        (store, delivery, dispatcher)
    }

    fn connect_event(connection_id: &str, agent_id: Option<&str>) -> InvocationEvent {
        let mut query = HashMap::new();
        if let Some(agent_id) = agent_id {
            query.insert("agentId".to_string(), agent_id.to_string());
        }
        InvocationEvent {
            request_context: Some(RequestContext {
                connection_id: connection_id.to_string(),
                route_key: "$connect".to_string(),
                domain_name: "x.com".to_string(),
                stage: "prod".to_string(),
            }),
            query_string_parameters: query,
            ..InvocationEvent::default()
        }
    }

    fn route_event(connection_id: &str, route_key: &str, body: Option<&str>) -> InvocationEvent {
        InvocationEvent {
            request_context: Some(RequestContext {
                connection_id: connection_id.to_string(),
                route_key: route_key.to_string(),
                domain_name: "x.com".to_string(),
                stage: "prod".to_string(),
            }),
            body: body.map(ToString::to_string),
            ..InvocationEvent::default()
        }
    }

    fn stream_event(agent_id: &str, message: &str) -> InvocationEvent {
        InvocationEvent {
            records: vec![ChangeRecord::insert(agent_id, message)],
            ..InvocationEvent::default()
        }
    }

    #[tokio::test]
    async fn connect_registers_and_returns_200() {
        let (store, _, dispatcher) = fixture();

        let response = dispatcher.handle(connect_event("c1", Some("a1"))).await;

        assert_eq!(response, HandlerResponse::ok("Connected."));
        let records = store.get_by_agent("a1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].connection_id, "c1");
        assert_eq!(records[0].endpoint_url, "https://x.com/prod");
    }

    #[tokio::test]
    async fn stream_insert_is_routed_to_registered_connection() {
        let (_, delivery, dispatcher) = fixture();
        dispatcher.handle(connect_event("c1", Some("a1"))).await;

        let response = dispatcher.handle(stream_event("a1", "hello")).await;

        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, "Stream event processed.");
        let sent = delivery.sent.lock();
        assert_eq!(sent.len(), 1);
        let (endpoint, connection_id, message) = &sent[0];
        assert_eq!(endpoint, "https://x.com/prod");
        assert_eq!(connection_id, "c1");
        assert_eq!(message.action, "echo");
        assert_eq!(message.message, "hello");
        assert!(chrono::DateTime::parse_from_rfc3339(&message.timestamp).is_ok());
    }

    #[tokio::test]
    async fn stream_insert_for_offline_agent_returns_200_without_delivery() {
        let (_, delivery, dispatcher) = fixture();
        dispatcher.handle(connect_event("c1", Some("a1"))).await;

        let response = dispatcher.handle(stream_event("a2", "hello")).await;

        assert_eq!(response.status_code, 200);
        assert!(delivery.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn connect_without_agent_id_returns_400_and_writes_nothing() {
        let (store, _, dispatcher) = fixture();

        let response = dispatcher.handle(connect_event("c1", None)).await;

        assert_eq!(response.status_code, 400);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn disconnect_removes_record_and_returns_200() {
        let (store, _, dispatcher) = fixture();
        dispatcher.handle(connect_event("c1", Some("a1"))).await;

        let response = dispatcher.handle(route_event("c1", "$disconnect", None)).await;

        assert_eq!(response, HandlerResponse::ok("Disconnected."));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn disconnect_does_not_require_agent_id() {
        let (_, _, dispatcher) = fixture();
        let response = dispatcher.handle(route_event("c9", "$disconnect", None)).await;
        assert_eq!(response.status_code, 200);
    }

    #[tokio::test]
    async fn echo_route_sends_back_to_requesting_connection() {
        let (_, delivery, dispatcher) = fixture();

        let response = dispatcher
            .handle(route_event("c1", "echo", Some(r#"{"message":"ping"}"#)))
            .await;

        assert_eq!(response, HandlerResponse::ok("Echo message sent."));
        let sent = delivery.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, "c1");
        assert_eq!(sent[0].2.action, "echo");
        assert_eq!(sent[0].2.message, "ping");
    }

    #[tokio::test]
    async fn echo_route_with_invalid_body_returns_400() {
        let (_, delivery, dispatcher) = fixture();

        let response = dispatcher
            .handle(route_event("c1", "echo", Some("not json")))
            .await;

        assert_eq!(response.status_code, 400);
        assert_eq!(response.body, "Invalid message format.");
        assert!(delivery.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn default_route_sends_acknowledgement() {
        let (_, delivery, dispatcher) = fixture();

        let response = dispatcher
            .handle(route_event("c1", "$default", Some(r#"{"message":"anything"}"#)))
            .await;

        assert_eq!(response, HandlerResponse::ok("Default message processed."));
        let sent = delivery.sent.lock();
        assert_eq!(sent[0].2.action, "default");
        assert_eq!(sent[0].2.message, "Received your message on the default route");
    }

    #[tokio::test]
    async fn unhandled_route_returns_400() {
        let (_, _, dispatcher) = fixture();

        let response = dispatcher
            .handle(route_event("c1", "subscribe", Some("{}")))
            .await;

        assert_eq!(response.status_code, 400);
        assert_eq!(response.body, "Unhandled route.");
    }

    #[tokio::test]
    async fn unrecognizable_invocation_returns_400() {
        let (_, _, dispatcher) = fixture();

        let response = dispatcher.handle(InvocationEvent::default()).await;

        assert_eq!(response.status_code, 400);
        assert_eq!(response.body, "Invalid invocation context.");
    }

    #[tokio::test]
    async fn delivery_failure_maps_to_500_and_keeps_record() {
        let store = Arc::new(InMemoryConnectionStore::new());
        let delivery = Arc::new(RecordingDeliveryClient::failing());
        let dispatcher = Dispatcher::new(store.clone(), delivery);
        dispatcher.handle(connect_event("c1", Some("a1"))).await;

        let response = dispatcher.handle(stream_event("a1", "hello")).await;

        assert_eq!(response.status_code, 500);
        assert_eq!(response.body, "Message delivery failed.");
        // Delivery failure never evicts the registry entry.
        assert_eq!(store.get_by_agent("a1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_change_record_returns_500() {
        let (_, _, dispatcher) = fixture();

        let mut record = ChangeRecord::insert("a1", "x");
        record.item.remove("agentId");
        let event = InvocationEvent {
            records: vec![record],
            ..InvocationEvent::default()
        };

        let response = dispatcher.handle(event).await;
        assert_eq!(response.status_code, 500);
        assert_eq!(response.body, "Internal server error.");
    }

    #[tokio::test]
    async fn route_keys_accept_unprefixed_spelling() {
        let (store, _, dispatcher) = fixture();

        let mut event = connect_event("c1", Some("a1"));
        event.request_context.as_mut().unwrap().route_key = "connect".to_string();
        let response = dispatcher.handle(event).await;

        assert_eq!(response.status_code, 200);
        assert_eq!(store.get_by_agent("a1").await.unwrap().len(), 1);
    }

    #[test]
    fn invocation_event_deserializes_connection_shape() {
        let raw = r#"{
            "requestContext": {
                "connectionId": "c1",
                "routeKey": "$connect",
                "domainName": "x.com",
                "stage": "prod"
            },
            "queryStringParameters": {"agentId": "a1"}
        }"#;
        let event: InvocationEvent = serde_json::from_str(raw).unwrap();
        let context = event.request_context.unwrap();
        assert_eq!(context.connection_id, "c1");
        assert_eq!(event.query_string_parameters["agentId"], "a1");
        assert!(event.records.is_empty());
    }

    #[test]
    fn invocation_event_deserializes_stream_shape() {
        let raw = r#"{"records":[{"kind":"insert","item":{"agentId":"a1","message":"hi"}}]}"#;
        let event: InvocationEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.records.len(), 1);
        assert!(event.request_context.is_none());
    }

    #[test]
    fn invocation_event_tolerates_empty_object() {
        let event: InvocationEvent = serde_json::from_str("{}").unwrap();
        assert!(event.records.is_empty());
        assert!(event.request_context.is_none());
    }
}
