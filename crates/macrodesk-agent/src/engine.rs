// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation engine: drives the bounded tool-calling loop for one
//! batch of inbound messages and persists exactly one outbound reply.
//!
//! Per-batch state machine:
//! ASSEMBLING -> MODEL_CALL -> (TOOL_CALLS_PENDING -> MODEL_CALL)* -> FINALIZED.
//!
//! The iteration cap is the only safeguard against runaway billed model
//! calls; on cap the engine degrades to a fallback reply rather than
//! looping or failing silently. Provider transport errors abort the batch
//! with no outbound message -- the coordinator marks it failed.

use std::sync::Arc;

use macrodesk_config::MacrodeskConfig;
use macrodesk_core::types::{
    BatchRecord, Channel, Direction, Message, ProviderMessage, ProviderRequest, ToolCallRecord,
    ToolSchema, now_iso,
};
use macrodesk_core::{MacrodeskError, ProviderAdapter, StorageAdapter};
use macrodesk_tools::{EscalationPolicy, ToolExecutor};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::{context, prompts};

/// Engine knobs, lifted out of the full config so tests can construct them
/// directly.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Hard cap on tool-calling iterations per batch.
    pub max_tool_iterations: u32,
    /// Reply used when the loop never converges on a final answer.
    pub fallback_reply: String,
    /// Bound on prompt history; `None` includes everything.
    pub history_limit: Option<i64>,
    /// Override for the built-in system prompt.
    pub system_prompt: Option<String>,
}

impl EngineConfig {
    pub fn from_config(config: &MacrodeskConfig) -> Self {
        Self {
            model: config.openrouter.model.clone(),
            max_tokens: config.openrouter.max_tokens,
            temperature: config.openrouter.temperature,
            max_tool_iterations: config.agent.max_tool_iterations,
            fallback_reply: config.agent.fallback_reply.clone(),
            history_limit: config.context.history_limit,
            system_prompt: config.agent.system_prompt.clone(),
        }
    }
}

/// What one batch-processing invocation produced.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub batch_id: String,
    pub outbound_message_id: String,
    pub channel: Channel,
    /// Tool-calling iterations executed (0 when the first response was final).
    pub iterations: u32,
    pub tool_calls: usize,
    pub used_fallback: bool,
}

/// Drives the tool-calling loop against the provider and storage.
pub struct ConversationEngine {
    store: Arc<dyn StorageAdapter + Send + Sync>,
    provider: Arc<dyn ProviderAdapter + Send + Sync>,
    policy: EscalationPolicy,
    config: EngineConfig,
}

impl ConversationEngine {
    pub fn new(
        store: Arc<dyn StorageAdapter + Send + Sync>,
        provider: Arc<dyn ProviderAdapter + Send + Sync>,
        policy: EscalationPolicy,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            provider,
            policy,
            config,
        }
    }

    /// Processes one claimed batch end to end.
    ///
    /// On success exactly one outbound message has been persisted. On error
    /// nothing outbound exists and the caller decides the batch's fate.
    pub async fn process_batch(&self, batch: &BatchRecord) -> Result<BatchOutcome, MacrodeskError> {
        // ASSEMBLING
        let customer = self
            .store
            .get_customer(&batch.customer_id)
            .await?
            .ok_or_else(|| {
                MacrodeskError::Internal(format!(
                    "batch {} references unknown customer {}",
                    batch.batch_id, batch.customer_id
                ))
            })?;

        let batch_messages = self.store.messages_for_batch(&batch.batch_id).await?;
        if batch_messages.is_empty() {
            return Err(MacrodeskError::Internal(format!(
                "batch {} has no inbound messages",
                batch.batch_id
            )));
        }

        let history = self
            .store
            .messages_for_customer(&customer.id, self.config.history_limit)
            .await?;

        debug!(
            batch_id = batch.batch_id,
            batch_messages = batch_messages.len(),
            history = history.len(),
            "assembling context"
        );

        let prompt = context::build_prompt(&customer, &history, &batch_messages);
        let system_prompt = self
            .config
            .system_prompt
            .clone()
            .unwrap_or_else(|| prompts::AGENT_SYSTEM_PROMPT.to_string());

        let executor = ToolExecutor::new(
            self.store.clone(),
            self.policy.clone(),
            Some(customer.id.clone()),
        );
        let tools: Vec<ToolSchema> = executor.definitions().to_vec();

        let mut messages = vec![ProviderMessage::user(prompt)];
        let mut records: Vec<ToolCallRecord> = Vec::new();

        // MODEL_CALL
        let mut response = self
            .provider
            .complete(self.build_request(&system_prompt, &messages, &tools))
            .await?;

        let mut iterations = 0u32;
        while !response.tool_calls.is_empty() && iterations < self.config.max_tool_iterations {
            iterations += 1;
            debug!(
                iteration = iterations,
                requested = response.tool_calls.len(),
                "executing tool calls"
            );

            // TOOL_CALLS_PENDING: execute sequentially in model order, feed
            // each result back as a tool turn.
            messages.push(ProviderMessage::assistant(
                response.content.clone(),
                response.tool_calls.clone(),
            ));
            for call in &response.tool_calls {
                let result = executor.execute(&call.name, &call.arguments).await;
                records.push(ToolCallRecord {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    args: call.arguments.clone(),
                    result: result.clone(),
                });
                messages.push(ProviderMessage::tool_result(
                    call.id.clone(),
                    result.to_string(),
                ));
            }

            response = self
                .provider
                .complete(self.build_request(&system_prompt, &messages, &tools))
                .await?;
        }

        let used_fallback =
            !response.tool_calls.is_empty() || response.content.trim().is_empty();
        if used_fallback {
            warn!(
                batch_id = batch.batch_id,
                iterations, "tool loop did not converge; sending fallback reply"
            );
        }
        let final_text = if used_fallback {
            self.config.fallback_reply.clone()
        } else {
            response.content
        };

        // FINALIZED: resolve the outbound channel and persist the reply.
        let (directive, reply_text) = parse_channel_directive(&final_text);
        let outbound_channel = directive
            .or_else(|| context::last_inbound_channel(&batch_messages))
            .unwrap_or(Channel::Sms);

        let metadata = (!records.is_empty())
            .then(|| json!({"tool_calls": records}).to_string());

        let outbound = Message {
            id: uuid::Uuid::new_v4().to_string(),
            customer_id: customer.id.clone(),
            direction: Direction::Outbound,
            channel: outbound_channel,
            content: reply_text,
            batch_id: None,
            metadata,
            created_at: now_iso(),
        };
        self.store.insert_message(&outbound).await?;

        info!(
            batch_id = batch.batch_id,
            channel = %outbound_channel,
            iterations,
            tool_calls = records.len(),
            used_fallback,
            "batch finalized"
        );

        Ok(BatchOutcome {
            batch_id: batch.batch_id.clone(),
            outbound_message_id: outbound.id,
            channel: outbound_channel,
            iterations,
            tool_calls: records.len(),
            used_fallback,
        })
    }

    fn build_request(
        &self,
        system_prompt: &str,
        messages: &[ProviderMessage],
        tools: &[ToolSchema],
    ) -> ProviderRequest {
        ProviderRequest {
            model: self.config.model.clone(),
            system_prompt: Some(system_prompt.to_string()),
            messages: messages.to_vec(),
            tools: Some(tools.to_vec()),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }
}

/// Parses the channel-selection marker protocol.
///
/// A leading `[EMAIL]` or `[SMS]` (exact case, optional following
/// whitespace) is a directive: it is stripped and the indicated channel
/// returned. A marker anywhere else is literal content.
pub fn parse_channel_directive(text: &str) -> (Option<Channel>, String) {
    if let Some(rest) = text.strip_prefix("[EMAIL]") {
        (Some(Channel::Email), rest.trim_start().to_string())
    } else if let Some(rest) = text.strip_prefix("[SMS]") {
        (Some(Channel::Sms), rest.trim_start().to_string())
    } else {
        (None, text.to_string())
    }
}
