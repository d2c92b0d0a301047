// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch coordination: the polling loop that hands quiet batches to the
//! conversation engine.
//!
//! Polling is the only scheduling primitive between ingestion and the
//! engine -- there is no push notification. Ingestion stamps messages into
//! the customer's open batch (see `StorageAdapter::open_batch`); this loop
//! claims batches whose window has elapsed and processes each exactly once.
//! A failed batch is marked failed and is NOT retried automatically; its
//! messages remain visible in history.

use std::sync::Arc;
use std::time::Duration;

use macrodesk_config::model::BatchConfig;
use macrodesk_core::StorageAdapter;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::engine::ConversationEngine;

/// Polls the coordination store and drives the engine.
pub struct BatchCoordinator {
    store: Arc<dyn StorageAdapter + Send + Sync>,
    engine: Arc<ConversationEngine>,
    window_seconds: u64,
    poll_interval: Duration,
}

impl BatchCoordinator {
    pub fn new(
        store: Arc<dyn StorageAdapter + Send + Sync>,
        engine: Arc<ConversationEngine>,
        config: &BatchConfig,
    ) -> Self {
        Self {
            store,
            engine,
            window_seconds: config.window_seconds,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    /// Runs the polling loop until the cancellation token fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            window_seconds = self.window_seconds,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "batch coordinator running"
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping batch coordinator");
                    break;
                }
            }
        }
    }

    /// One poll cycle: claim every due batch and process each. Returns the
    /// number successfully processed. Errors are logged, never propagated --
    /// the loop must survive storage and provider outages.
    pub async fn poll_once(&self) -> usize {
        let batches = match self.store.claim_due_batches(self.window_seconds).await {
            Ok(batches) => batches,
            Err(e) => {
                error!(error = %e, "failed to poll for ready batches");
                return 0;
            }
        };

        if !batches.is_empty() {
            info!(count = batches.len(), "found ready batch(es)");
        }

        let mut processed = 0;
        for batch in batches {
            match self.engine.process_batch(&batch).await {
                Ok(outcome) => {
                    if let Err(e) = self.store.complete_batch(&batch.batch_id).await {
                        error!(batch_id = batch.batch_id, error = %e, "failed to close batch");
                        continue;
                    }
                    info!(
                        batch_id = batch.batch_id,
                        customer_id = batch.customer_id,
                        channel = %outcome.channel,
                        iterations = outcome.iterations,
                        "batch processed"
                    );
                    processed += 1;
                }
                Err(e) => {
                    error!(
                        batch_id = batch.batch_id,
                        customer_id = batch.customer_id,
                        error = %e,
                        "batch processing failed"
                    );
                    if let Err(e2) = self.store.fail_batch(&batch.batch_id).await {
                        error!(batch_id = batch.batch_id, error = %e2, "failed to mark batch failed");
                    }
                }
            }
        }
        processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use macrodesk_core::types::{BatchStatus, Channel, Customer, Direction, Message, now_iso};
    use macrodesk_core::{ProviderAdapter, StorageAdapter};
    use macrodesk_storage::SqliteStore;
    use macrodesk_test_utils::{FailingProvider, MockProvider};
    use macrodesk_tools::EscalationPolicy;
    use tempfile::tempdir;

    fn engine_config() -> EngineConfig {
        EngineConfig {
            model: "mock-model".to_string(),
            max_tokens: 256,
            temperature: 0.0,
            max_tool_iterations: 5,
            fallback_reply: "Sorry, let me get a human to help.".to_string(),
            history_limit: None,
            system_prompt: None,
        }
    }

    async fn setup_store(dir: &tempfile::TempDir) -> Arc<SqliteStore> {
        let db_path = dir.path().join("batcher.db");
        let store = SqliteStore::new(macrodesk_config::model::StorageConfig {
            database_path: db_path.to_str().unwrap().to_string(),
            wal_mode: true,
        });
        store.initialize().await.unwrap();
        Arc::new(store)
    }

    async fn seed_inbound(store: &Arc<SqliteStore>, customer_id: &str, content: &str) -> String {
        let customer = Customer {
            id: customer_id.to_string(),
            phone_number: Some(format!("+1555{customer_id}")),
            email: None,
            first_name: None,
            last_name: None,
            company_name: None,
            account_tier: None,
            extracted_data: serde_json::Map::new(),
            created_at: now_iso(),
            updated_at: now_iso(),
        };
        let _ = store.create_customer(&customer).await;
        let batch = store.open_batch(customer_id).await.unwrap();
        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            direction: Direction::Inbound,
            channel: Channel::Sms,
            content: content.to_string(),
            batch_id: Some(batch.batch_id.clone()),
            metadata: None,
            created_at: now_iso(),
        };
        store.insert_message(&message).await.unwrap();
        batch.batch_id
    }

    fn coordinator(
        store: Arc<SqliteStore>,
        provider: Arc<dyn ProviderAdapter + Send + Sync>,
    ) -> BatchCoordinator {
        let engine = Arc::new(ConversationEngine::new(
            store.clone(),
            provider,
            EscalationPolicy::default(),
            engine_config(),
        ));
        BatchCoordinator::new(
            store,
            engine,
            &BatchConfig {
                window_seconds: 0,
                poll_interval_ms: 10,
            },
        )
    }

    #[tokio::test]
    async fn poll_processes_due_batch_and_completes_it() {
        let dir = tempdir().unwrap();
        let store = setup_store(&dir).await;
        let batch_id = seed_inbound(&store, "c1", "hi there").await;

        let provider = Arc::new(MockProvider::with_responses(vec![MockProvider::text(
            "Hello! How can I help?",
        )]));
        let coordinator = coordinator(store.clone(), provider.clone());

        let processed = coordinator.poll_once().await;
        assert_eq!(processed, 1);
        assert_eq!(provider.call_count().await, 1);

        let batch = store.get_batch(&batch_id).await.unwrap().unwrap();
        assert_eq!(batch.status, BatchStatus::Completed);

        let messages = store.messages_for_customer("c1", None).await.unwrap();
        let outbound: Vec<_> = messages
            .iter()
            .filter(|m| m.direction == Direction::Outbound)
            .collect();
        assert_eq!(outbound.len(), 1);
        assert_eq!(outbound[0].content, "Hello! How can I help?");
    }

    #[tokio::test]
    async fn provider_failure_marks_batch_failed_without_outbound() {
        let dir = tempdir().unwrap();
        let store = setup_store(&dir).await;
        let batch_id = seed_inbound(&store, "c1", "hi there").await;

        let coordinator = coordinator(store.clone(), Arc::new(FailingProvider));
        let processed = coordinator.poll_once().await;
        assert_eq!(processed, 0);

        let batch = store.get_batch(&batch_id).await.unwrap().unwrap();
        assert_eq!(batch.status, BatchStatus::Failed);

        // No outbound message, inbound still visible.
        let messages = store.messages_for_customer("c1", None).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].direction, Direction::Inbound);

        // No automatic retry on the next cycle.
        assert_eq!(coordinator.poll_once().await, 0);
    }

    #[tokio::test]
    async fn batches_for_different_customers_process_independently() {
        let dir = tempdir().unwrap();
        let store = setup_store(&dir).await;
        seed_inbound(&store, "c1", "first customer").await;
        seed_inbound(&store, "c2", "second customer").await;

        let provider = Arc::new(MockProvider::new());
        let coordinator = coordinator(store.clone(), provider.clone());

        assert_eq!(coordinator.poll_once().await, 2);
        assert_eq!(provider.call_count().await, 2);
    }

    #[tokio::test]
    async fn run_stops_on_cancellation() {
        let dir = tempdir().unwrap();
        let store = setup_store(&dir).await;
        let coordinator = coordinator(store, Arc::new(MockProvider::new()));

        let cancel = CancellationToken::new();
        let handle = {
            let cancel = cancel.clone();
            let coordinator = Arc::new(coordinator);
            tokio::spawn(async move { coordinator.run(cancel).await })
        };

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("coordinator should stop promptly")
            .unwrap();
    }
}
