// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use fieldops_agent::SessionStore;
use fieldops_config::model::GatewayConfig;
use fieldops_core::types::InboundMessage;
use fieldops_core::{ContactStore, FieldopsError, JobStore, PluginAdapter};
use fieldops_cron::{ExecutionLog, Scheduler};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub jobs: Arc<dyn JobStore>,
    pub contacts: Arc<dyn ContactStore>,
    /// `None` when the scheduler is disabled; manual runs then answer 503.
    pub scheduler: Option<Scheduler>,
    pub log: Arc<ExecutionLog>,
    pub sessions: Arc<SessionStore>,
    /// Where webhook messages go. `None` when no bridge is wired.
    pub inbound_tx: Option<mpsc::Sender<InboundMessage>>,
    /// Collaborators reported by `GET /health`.
    pub adapters: Vec<Arc<dyn PluginAdapter>>,
    pub start_time: Instant,
    pub auth: AuthConfig,
}

/// Builds the route table.
///
/// - `GET /health` (public)
/// - `/v1/jobs`, `/v1/jobs/{id}`, `POST /v1/jobs/{id}/run`
/// - `/v1/contacts`, `/v1/contacts/{id}`, `/v1/contact-lists`
/// - `GET /v1/logs`, `GET /v1/sessions`
/// - `POST /v1/inbound` (bridge webhook)
pub fn build_router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/jobs", get(handlers::list_jobs).post(handlers::create_job))
        .route(
            "/v1/jobs/{id}",
            get(handlers::get_job)
                .put(handlers::update_job)
                .delete(handlers::delete_job),
        )
        .route("/v1/jobs/{id}/run", post(handlers::run_job))
        .route(
            "/v1/contacts",
            get(handlers::list_contacts).post(handlers::create_contact),
        )
        .route(
            "/v1/contacts/{id}",
            get(handlers::get_contact)
                .put(handlers::update_contact)
                .delete(handlers::delete_contact),
        )
        .route(
            "/v1/contact-lists",
            get(handlers::list_contact_lists).post(handlers::create_contact_list),
        )
        .route("/v1/logs", get(handlers::get_logs))
        .route("/v1/sessions", get(handlers::get_sessions))
        .route("/v1/inbound", post(handlers::post_inbound))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds to the configured address and serves until `cancel` fires.
pub async fn start_server(
    config: &GatewayConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), FieldopsError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| FieldopsError::Config(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| FieldopsError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
