// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router construction and HTTP server lifecycle.

use axum::Router;
use axum::routing::{get, post};
use macrodesk_core::MacrodeskError;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{AppState, handlers, voice};

/// Builds the gateway router. The voice endpoint is mounted only when
/// enabled in configuration.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/webhook/sms", post(handlers::receive_sms))
        .route("/webhook/email", post(handlers::receive_email))
        .route("/health", get(handlers::health))
        .route("/customers", get(handlers::list_customers))
        .route("/customers/{id}", get(handlers::get_customer))
        .route("/messages/{customer_id}", get(handlers::get_customer_messages))
        .route("/tickets/{customer_id}", get(handlers::get_customer_tickets))
        .route("/articles", get(handlers::list_articles));

    if state.config.voice.enabled {
        router = router.route("/ws/voice", get(voice::voice_ws));
    }

    router.with_state(state)
}

/// Binds and serves the gateway until the cancellation token fires.
pub async fn serve(state: AppState, cancel: CancellationToken) -> Result<(), MacrodeskError> {
    let addr = format!("{}:{}", state.config.gateway.host, state.config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| MacrodeskError::Channel {
            message: format!("failed to bind gateway on {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    info!(addr, voice = state.config.voice.enabled, "gateway listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| MacrodeskError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })
}
