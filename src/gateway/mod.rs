//! HTTP host for the relay handler.
//!
//! Exposes the dispatcher's entry contract over a small axum app: the
//! invoking environment POSTs one invocation document at a time and gets the
//! coarse status class back.

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use crate::dispatcher::{Dispatcher, InvocationEvent};

const MAX_BODY_BYTES: usize = 1024 * 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/invoke", post(handle_invoke))
        .route("/health", get(handle_health))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(dispatcher)
}

/// POST /invoke — process one invocation event.
async fn handle_invoke(
    State(dispatcher): State<Arc<Dispatcher>>,
    Json(event): Json<InvocationEvent>,
) -> (StatusCode, String) {
    let response = dispatcher.handle(event).await;
    let status = StatusCode::from_u16(response.status_code)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, response.body)
}

/// GET /health — liveness probe.
async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

pub async fn serve(dispatcher: Arc<Dispatcher>, host: &str, port: u16) -> Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind gateway to {addr}"))?;
    info!(%addr, "relay gateway listening");
    axum::serve(listener, router(dispatcher))
        .await
        .context("gateway server exited")
}
