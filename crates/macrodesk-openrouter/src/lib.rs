// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenRouter LLM provider adapter for the Macrodesk support agent.
//!
//! This crate implements [`ProviderAdapter`] over the OpenRouter
//! chat-completions API, translating between the workspace provider types
//! and the OpenAI-compatible wire format (where tool-call arguments are
//! JSON-encoded strings).

pub mod client;
pub mod types;

use async_trait::async_trait;
use macrodesk_config::MacrodeskConfig;
use macrodesk_core::types::{
    AdapterType, HealthStatus, ProviderMessage, ProviderRequest, ProviderResponse, TokenUsage,
    ToolInvocation,
};
use macrodesk_core::{MacrodeskError, PluginAdapter, ProviderAdapter};
use tracing::{debug, info};

use crate::client::OpenRouterClient;
use crate::types::{
    ChatMessage, ChatRequest, ChatResponse, FunctionCallPayload, FunctionDefinition,
    ToolCallPayload, ToolDefinition,
};

/// OpenRouter provider implementing [`ProviderAdapter`].
pub struct OpenRouterProvider {
    client: OpenRouterClient,
}

impl OpenRouterProvider {
    /// Creates a new provider from the given configuration.
    ///
    /// # API Key Resolution
    /// 1. `config.openrouter.api_key` if set
    /// 2. `OPENROUTER_API_KEY` environment variable
    /// 3. Returns an error if neither is available
    pub fn new(config: &MacrodeskConfig) -> Result<Self, MacrodeskError> {
        let api_key = resolve_api_key(&config.openrouter.api_key)?;
        let client = OpenRouterClient::new(
            api_key,
            config.openrouter.model.clone(),
            config.openrouter.api_base.clone(),
        )?;

        info!(model = config.openrouter.model, "OpenRouter provider initialized");
        Ok(Self { client })
    }

    /// Creates a provider around an existing client (for tests).
    pub fn with_client(client: OpenRouterClient) -> Self {
        Self { client }
    }
}

fn resolve_api_key(configured: &Option<String>) -> Result<String, MacrodeskError> {
    if let Some(key) = configured
        && !key.is_empty()
    {
        return Ok(key.clone());
    }
    match std::env::var("OPENROUTER_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(key),
        _ => Err(MacrodeskError::Config(
            "OpenRouter API key not found: set openrouter.api_key or OPENROUTER_API_KEY".into(),
        )),
    }
}

/// Converts a workspace [`ProviderRequest`] into the wire [`ChatRequest`].
fn to_chat_request(request: &ProviderRequest) -> ChatRequest {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(ref system) = request.system_prompt {
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: Some(system.clone()),
            tool_calls: None,
            tool_call_id: None,
        });
    }
    for message in &request.messages {
        messages.push(to_chat_message(message));
    }

    let tools = request.tools.as_ref().map(|schemas| {
        schemas
            .iter()
            .map(|schema| ToolDefinition {
                kind: "function".to_string(),
                function: FunctionDefinition {
                    name: schema.name.clone(),
                    description: schema.description.clone(),
                    parameters: schema.parameters.clone(),
                },
            })
            .collect::<Vec<_>>()
    });
    let tool_choice = tools.as_ref().map(|_| "auto".to_string());

    ChatRequest {
        model: request.model.clone(),
        messages,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        tools,
        tool_choice,
    }
}

fn to_chat_message(message: &ProviderMessage) -> ChatMessage {
    let tool_calls = if message.tool_calls.is_empty() {
        None
    } else {
        Some(
            message
                .tool_calls
                .iter()
                .map(|call| ToolCallPayload {
                    id: call.id.clone(),
                    kind: "function".to_string(),
                    function: FunctionCallPayload {
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect(),
        )
    };

    ChatMessage {
        role: message.role.clone(),
        content: Some(message.content.clone()),
        tool_calls,
        tool_call_id: message.tool_call_id.clone(),
    }
}

/// Converts a wire [`ChatResponse`] into the workspace [`ProviderResponse`].
///
/// Tool-call argument strings are parsed defensively: malformed JSON becomes
/// an empty object rather than a fault, so the loop can surface a validation
/// error to the model instead of aborting.
fn from_chat_response(response: ChatResponse, requested_model: &str) -> ProviderResponse {
    let choice = &response.choices[0];
    let content = choice.message.content.clone().unwrap_or_default();

    let tool_calls = choice
        .message
        .tool_calls
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|call| {
            let arguments = serde_json::from_str(&call.function.arguments).unwrap_or_else(|e| {
                debug!(
                    tool = call.function.name,
                    error = %e,
                    "tool call arguments were not valid JSON"
                );
                serde_json::Value::Object(serde_json::Map::new())
            });
            ToolInvocation {
                id: call.id.clone(),
                name: call.function.name.clone(),
                arguments,
            }
        })
        .collect();

    let usage = response.usage.unwrap_or_default();
    ProviderResponse {
        id: response.id.unwrap_or_default(),
        content,
        model: response.model.unwrap_or_else(|| requested_model.to_string()),
        tool_calls,
        finish_reason: choice.finish_reason.clone(),
        usage: TokenUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        },
    }
}

#[async_trait]
impl PluginAdapter for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, MacrodeskError> {
        // A full check would make a billed API call; constructability is
        // enough here.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MacrodeskError> {
        debug!("OpenRouter provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenRouterProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, MacrodeskError> {
        let chat_request = to_chat_request(&request);
        let response = self.client.chat(&chat_request).await?;
        Ok(from_chat_response(response, &request.model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macrodesk_core::types::ToolSchema;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_request(tools: Option<Vec<ToolSchema>>) -> ProviderRequest {
        ProviderRequest {
            model: "anthropic/claude-sonnet-4.5".into(),
            system_prompt: Some("You are a support agent.".into()),
            messages: vec![ProviderMessage::user("Where is ORD-1001?")],
            tools,
            max_tokens: 512,
            temperature: 0.7,
        }
    }

    #[test]
    fn system_prompt_becomes_first_message() {
        let chat = to_chat_request(&provider_request(None));
        assert_eq!(chat.messages[0].role, "system");
        assert_eq!(chat.messages[1].role, "user");
        assert!(chat.tools.is_none());
        assert!(chat.tool_choice.is_none());
    }

    #[test]
    fn tools_enable_auto_tool_choice() {
        let tools = vec![ToolSchema {
            name: "lookup_order".into(),
            description: "Look up an order".into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }];
        let chat = to_chat_request(&provider_request(Some(tools)));
        assert_eq!(chat.tools.as_ref().unwrap().len(), 1);
        assert_eq!(chat.tool_choice.as_deref(), Some("auto"));
    }

    #[test]
    fn assistant_tool_calls_serialize_arguments_as_strings() {
        let message = ProviderMessage::assistant(
            "",
            vec![ToolInvocation {
                id: "call_1".into(),
                name: "lookup_order".into(),
                arguments: serde_json::json!({"order_number": "ORD-1001"}),
            }],
        );
        let chat = to_chat_message(&message);
        let calls = chat.tool_calls.unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&calls[0].function.arguments).unwrap();
        assert_eq!(parsed["order_number"], "ORD-1001");
    }

    #[test]
    fn malformed_tool_arguments_become_empty_object() {
        let response = ChatResponse {
            id: Some("gen-1".into()),
            model: None,
            choices: vec![crate::types::Choice {
                message: crate::types::ResponseMessage {
                    content: None,
                    tool_calls: Some(vec![ToolCallPayload {
                        id: "call_1".into(),
                        kind: "function".into(),
                        function: FunctionCallPayload {
                            name: "lookup_order".into(),
                            arguments: "{not json".into(),
                        },
                    }]),
                },
                finish_reason: Some("tool_calls".into()),
            }],
            usage: None,
        };
        let converted = from_chat_response(response, "anthropic/claude-sonnet-4.5");
        assert_eq!(converted.tool_calls.len(), 1);
        assert!(converted.tool_calls[0].arguments.as_object().unwrap().is_empty());
        assert_eq!(converted.model, "anthropic/claude-sonnet-4.5");
    }

    #[tokio::test]
    async fn complete_round_trips_through_wire_format() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "id": "gen-tool",
            "model": "anthropic/claude-sonnet-4.5",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {
                            "name": "lookup_order",
                            "arguments": "{\"order_number\":\"ORD-1001\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 200, "completion_tokens": 24, "total_tokens": 224}
        });

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(serde_json::json!({"tool_choice": "auto"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let client = OpenRouterClient::new(
            "sk-or-test".into(),
            "anthropic/claude-sonnet-4.5".into(),
            Some(server.uri()),
        )
        .unwrap();
        let provider = OpenRouterProvider::with_client(client);

        let tools = vec![ToolSchema {
            name: "lookup_order".into(),
            description: "Look up an order".into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }];
        let response = provider.complete(provider_request(Some(tools))).await.unwrap();

        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "lookup_order");
        assert_eq!(response.tool_calls[0].arguments["order_number"], "ORD-1001");
        assert_eq!(response.usage.total_tokens, 224);
    }
}
