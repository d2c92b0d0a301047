// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `macrodesk serve` command implementation.
//!
//! Wires storage, the OpenRouter provider, the conversation engine, the
//! batch coordinator, and the HTTP gateway, then runs until ctrl-c.

use std::sync::Arc;

use macrodesk_agent::{BatchCoordinator, ConversationEngine, EngineConfig};
use macrodesk_config::MacrodeskConfig;
use macrodesk_core::{MacrodeskError, PluginAdapter, StorageAdapter};
use macrodesk_gateway::AppState;
use macrodesk_openrouter::OpenRouterProvider;
use macrodesk_storage::SqliteStore;
use macrodesk_tools::EscalationPolicy;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Runs the `macrodesk serve` command.
pub async fn run_serve(config: MacrodeskConfig) -> Result<(), MacrodeskError> {
    init_tracing(&config.agent.log_level);
    info!("starting macrodesk serve");

    // Storage.
    let sqlite = SqliteStore::new(config.storage.clone());
    sqlite.initialize().await?;
    let store: Arc<dyn StorageAdapter + Send + Sync> = Arc::new(sqlite);

    // LLM provider.
    let provider = OpenRouterProvider::new(&config).map_err(|e| {
        error!(error = %e, "failed to initialize OpenRouter provider");
        eprintln!(
            "error: OpenRouter API key required. Set openrouter.api_key in macrodesk.toml \
             or the OPENROUTER_API_KEY environment variable."
        );
        e
    })?;
    let provider = Arc::new(provider);

    // Conversation engine and batch coordinator.
    let policy = EscalationPolicy::from_config(&config.escalation);
    let engine = Arc::new(ConversationEngine::new(
        store.clone(),
        provider,
        policy.clone(),
        EngineConfig::from_config(&config),
    ));
    let coordinator = Arc::new(BatchCoordinator::new(store.clone(), engine, &config.batch));

    // Gateway.
    let state = AppState {
        store: store.clone(),
        config: Arc::new(config),
        policy,
    };

    let cancel = CancellationToken::new();

    let gateway_handle = {
        let state = state.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = macrodesk_gateway::serve(state, cancel).await {
                error!(error = %e, "gateway exited with error");
            }
        })
    };

    let coordinator_handle = {
        let coordinator = coordinator.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            coordinator.run(cancel).await;
        })
    };

    // Wait for shutdown signal.
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("ctrl-c received, shutting down"),
        Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
    }
    cancel.cancel();

    let _ = coordinator_handle.await;
    let _ = gateway_handle.await;

    store.shutdown().await?;
    info!("macrodesk stopped");
    Ok(())
}

fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
