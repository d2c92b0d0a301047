// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM provider adapter for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with pre-scripted responses,
//! enabling fast, CI-runnable tests of the tool-calling loop without
//! external API calls.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use macrodesk_core::types::{
    AdapterType, HealthStatus, ProviderRequest, ProviderResponse, TokenUsage, ToolInvocation,
};
use macrodesk_core::{MacrodeskError, PluginAdapter, ProviderAdapter};

/// A mock LLM provider that returns pre-scripted responses.
///
/// Responses are popped from a FIFO queue. When the queue is empty, either
/// the configured repeat response is returned (for loop-termination tests)
/// or a default "mock response" text.
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<ProviderResponse>>>,
    repeat: Option<ProviderResponse>,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
}

impl MockProvider {
    /// Empty queue; every call returns the default text response.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            repeat: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Pre-loaded with the given responses, returned in order.
    pub fn with_responses(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            repeat: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns the same response on every call. Used to simulate a model
    /// that never converges on a final answer.
    pub fn always(response: ProviderResponse) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            repeat: Some(response),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Append a response to the end of the queue.
    pub async fn push_response(&self, response: ProviderResponse) {
        self.responses.lock().await.push_back(response);
    }

    /// Every request received so far, in order.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }

    /// Number of completion calls made.
    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// A plain-text final response.
    pub fn text(content: impl Into<String>) -> ProviderResponse {
        ProviderResponse {
            id: format!("mock-{}", uuid::Uuid::new_v4()),
            content: content.into(),
            model: "mock-model".to_string(),
            tool_calls: Vec::new(),
            finish_reason: Some("stop".to_string()),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 20,
                total_tokens: 30,
            },
        }
    }

    /// A response requesting a single tool call.
    pub fn tool_call(name: impl Into<String>, arguments: serde_json::Value) -> ProviderResponse {
        ProviderResponse {
            id: format!("mock-{}", uuid::Uuid::new_v4()),
            content: String::new(),
            model: "mock-model".to_string(),
            tool_calls: vec![ToolInvocation {
                id: format!("call-{}", uuid::Uuid::new_v4()),
                name: name.into(),
                arguments,
            }],
            finish_reason: Some("tool_calls".to_string()),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 20,
                total_tokens: 30,
            },
        }
    }

    async fn next_response(&self) -> ProviderResponse {
        if let Some(response) = self.responses.lock().await.pop_front() {
            return response;
        }
        self.repeat
            .clone()
            .unwrap_or_else(|| Self::text("mock response"))
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, MacrodeskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MacrodeskError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, MacrodeskError> {
        self.requests.lock().await.push(request);
        Ok(self.next_response().await)
    }
}

/// A provider that fails every call, for transport-failure tests.
pub struct FailingProvider;

#[async_trait]
impl PluginAdapter for FailingProvider {
    fn name(&self) -> &str {
        "failing-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, MacrodeskError> {
        Ok(HealthStatus::Unhealthy("always fails".to_string()))
    }

    async fn shutdown(&self) -> Result<(), MacrodeskError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for FailingProvider {
    async fn complete(
        &self,
        _request: ProviderRequest,
    ) -> Result<ProviderResponse, MacrodeskError> {
        Err(MacrodeskError::Provider {
            message: "simulated transport failure".to_string(),
            source: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: "mock-model".to_string(),
            system_prompt: None,
            messages: Vec::new(),
            tools: None,
            max_tokens: 100,
            temperature: 0.0,
        }
    }

    #[tokio::test]
    async fn queued_responses_returned_in_order() {
        let provider = MockProvider::with_responses(vec![
            MockProvider::text("first"),
            MockProvider::text("second"),
        ]);
        assert_eq!(provider.complete(request()).await.unwrap().content, "first");
        assert_eq!(provider.complete(request()).await.unwrap().content, "second");
        // Exhausted queue falls back to the default.
        assert_eq!(
            provider.complete(request()).await.unwrap().content,
            "mock response"
        );
        assert_eq!(provider.call_count().await, 3);
    }

    #[tokio::test]
    async fn always_mode_repeats_forever() {
        let provider =
            MockProvider::always(MockProvider::tool_call("lookup_order", serde_json::json!({})));
        for _ in 0..10 {
            let response = provider.complete(request()).await.unwrap();
            assert_eq!(response.tool_calls.len(), 1);
        }
    }

    #[tokio::test]
    async fn requests_are_captured() {
        let provider = MockProvider::new();
        provider.complete(request()).await.unwrap();
        let requests = provider.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "mock-model");
    }

    #[tokio::test]
    async fn failing_provider_always_errors() {
        let provider = FailingProvider;
        assert!(provider.complete(request()).await.is_err());
    }
}
