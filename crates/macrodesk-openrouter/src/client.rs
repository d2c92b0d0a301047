// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the OpenRouter chat completions API.
//!
//! Handles request construction, authentication, and transient error retry.

use std::time::Duration;

use macrodesk_core::MacrodeskError;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, ChatRequest, ChatResponse};

/// Default base URL for the OpenRouter chat completions endpoint.
const API_BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// HTTP client for OpenRouter communication.
///
/// Manages authentication headers, connection pooling, and retry logic for
/// transient errors (429, 5xx).
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: reqwest::Client,
    default_model: String,
    max_retries: u32,
    base_url: String,
}

impl OpenRouterClient {
    /// Creates a new OpenRouter API client.
    ///
    /// # Arguments
    /// * `api_key` - OpenRouter API key (bearer auth)
    /// * `model` - Default model identifier
    /// * `base_url` - Endpoint override for tests/proxies; `None` uses the
    ///   public API
    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>,
    ) -> Result<Self, MacrodeskError> {
        if !api_key.starts_with("sk-or-") {
            warn!("OpenRouter API key may be invalid (expected sk-or- prefix)");
        }

        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {api_key}");
        headers.insert(
            "authorization",
            HeaderValue::from_str(&bearer).map_err(|e| {
                MacrodeskError::Config(format!("invalid API key header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        // OpenRouter attribution headers.
        headers.insert(
            "http-referer",
            HeaderValue::from_static("https://macrodesk.local"),
        );
        headers.insert("x-title", HeaderValue::from_static("Macrodesk Support Agent"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| MacrodeskError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            default_model: model,
            max_retries: 1,
            base_url: base_url.unwrap_or_else(|| API_BASE_URL.to_string()),
        })
    }

    /// Returns the default model identifier.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Sends a chat completion request and returns the parsed response.
    ///
    /// On transient errors (429, 500, 502, 503), retries once after a
    /// 1-second delay.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, MacrodeskError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying chat request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&self.base_url)
                .json(request)
                .send()
                .await
                .map_err(|e| MacrodeskError::Provider {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "chat response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| MacrodeskError::Provider {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                let chat_response: ChatResponse =
                    serde_json::from_str(&body).map_err(|e| MacrodeskError::Provider {
                        message: format!("failed to parse API response: {e}"),
                        source: Some(Box::new(e)),
                    })?;
                if chat_response.choices.is_empty() {
                    return Err(MacrodeskError::Provider {
                        message: "API response contained no choices".into(),
                        source: None,
                    });
                }
                return Ok(chat_response);
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(MacrodeskError::Provider {
                    message: format!("API returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            // Non-transient error or exhausted retries.
            let body = response.text().await.unwrap_or_default();
            let error_msg = if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&body) {
                format!("OpenRouter API error: {}", api_err.error.message)
            } else {
                format!("API returned {status}: {body}")
            };
            return Err(MacrodeskError::Provider {
                message: error_msg,
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| MacrodeskError::Provider {
            message: "chat request failed after retries".into(),
            source: None,
        }))
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth
/// retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> OpenRouterClient {
        OpenRouterClient::new(
            "sk-or-test-key".into(),
            "anthropic/claude-sonnet-4.5".into(),
            Some(base_url.to_string()),
        )
        .unwrap()
    }

    fn test_request() -> ChatRequest {
        ChatRequest {
            model: "anthropic/claude-sonnet-4.5".into(),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: Some("Hello".into()),
                tool_calls: None,
                tool_call_id: None,
            }],
            temperature: 0.7,
            max_tokens: 256,
            tools: None,
            tool_choice: None,
        }
    }

    fn success_body() -> serde_json::Value {
        serde_json::json!({
            "id": "gen-ok",
            "model": "anthropic/claude-sonnet-4.5",
            "choices": [{
                "message": {"role": "assistant", "content": "Hi there!"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 8, "completion_tokens": 4, "total_tokens": 12}
        })
    }

    #[tokio::test]
    async fn chat_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let response = client.chat(&test_request()).await.unwrap();
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("Hi there!")
        );
    }

    #[tokio::test]
    async fn chat_retries_on_429() {
        let server = MockServer::start().await;
        let error_body = serde_json::json!({"error": {"code": 429, "message": "Rate limited"}});

        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(429).set_body_json(&error_body))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let response = client.chat(&test_request()).await.unwrap();
        assert_eq!(response.id.as_deref(), Some("gen-ok"));
    }

    #[tokio::test]
    async fn chat_fails_on_400_without_retry() {
        let server = MockServer::start().await;
        let error_body =
            serde_json::json!({"error": {"code": 400, "message": "Bad model identifier"}});

        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(&error_body))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.chat(&test_request()).await.unwrap_err();
        assert!(err.to_string().contains("Bad model identifier"), "got: {err}");
    }

    #[tokio::test]
    async fn chat_exhausts_retries_on_503() {
        let server = MockServer::start().await;
        let error_body = serde_json::json!({"error": {"message": "overloaded"}});

        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(503).set_body_json(&error_body))
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        assert!(client.chat(&test_request()).await.is_err());
    }

    #[tokio::test]
    async fn chat_sends_auth_and_attribution_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("authorization", "Bearer sk-or-test-key"))
            .and(header("x-title", "Macrodesk Support Agent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        assert!(client.chat(&test_request()).await.is_ok());
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "gen-x", "choices": []})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.chat(&test_request()).await.unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }
}
