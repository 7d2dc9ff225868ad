//! Main HTTP Gateway Server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::{
    Form, Json, Router,
    extract::{State, rejection::FormRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use docsnap_channels::InboundForm;
use docsnap_core::PipelineError;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};

use crate::controller::{WebhookController, WebhookOutcome};
use crate::health_api;

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub controller: Arc<WebhookController>,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(controller: Arc<WebhookController>) -> Self {
        Self {
            controller,
            started_at: Instant::now(),
        }
    }
}

fn error_response(status: StatusCode, err: &PipelineError) -> Response {
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

impl IntoResponse for WebhookOutcome {
    fn into_response(self) -> Response {
        match self {
            WebhookOutcome::Completed => Json(json!({ "success": true })).into_response(),
            WebhookOutcome::Failed(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &err),
            WebhookOutcome::TimedOut => (
                StatusCode::GATEWAY_TIMEOUT,
                Json(json!({ "error": "request deadline exceeded" })),
            )
                .into_response(),
        }
    }
}

/// Handler for `POST <webhook path>`
async fn receive_webhook(
    State(state): State<GatewayState>,
    form: Result<Form<InboundForm>, FormRejection>,
) -> Response {
    let message = form
        .map_err(|rejection| PipelineError::InfrastructureFault(rejection.body_text()))
        .and_then(|Form(form)| form.into_inbound());

    match message {
        Ok(message) => state.controller.handle(message).await.into_response(),
        Err(err) => {
            error!(error = %err, "rejecting malformed webhook request");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &err)
        }
    }
}

/// Handler for `GET <webhook path>`
async fn webhook_liveness() -> &'static str {
    "docsnap webhook is running"
}

pub fn build_router(state: GatewayState, webhook_path: &str) -> Router {
    Router::new()
        .route(webhook_path, get(webhook_liveness).post(receive_webhook))
        .route("/api/health", get(health_api::get_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the main Axum HTTP server for the gateway.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, webhook_path: &str, state: GatewayState) -> Result<()> {
    let app = build_router(state, webhook_path);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Gateway HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server error")?;

    info!("Gateway HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
