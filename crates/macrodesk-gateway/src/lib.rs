// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for the Macrodesk support agent.
//!
//! Ingests inbound messages from the SMS and email webhooks into the batch
//! coordination store, exposes the read API the UI poller uses, and bridges
//! browser voice sessions to the external speech-agent provider.

pub mod handlers;
pub mod server;
pub mod voice;

use std::sync::Arc;

use macrodesk_config::MacrodeskConfig;
use macrodesk_core::StorageAdapter;
use macrodesk_tools::EscalationPolicy;

/// Shared state for all gateway handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StorageAdapter + Send + Sync>,
    pub config: Arc<MacrodeskConfig>,
    pub policy: EscalationPolicy,
}

pub use server::{build_router, serve};
