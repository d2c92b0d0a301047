// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Macrodesk support agent.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, producing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Macrodesk configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MacrodeskConfig {
    /// Agent identity and conversation-loop settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// OpenRouter LLM API settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Inbound message batching settings.
    #[serde(default)]
    pub batch: BatchConfig,

    /// Context assembly settings.
    #[serde(default)]
    pub context: ContextConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Voice session bridge settings.
    #[serde(default)]
    pub voice: VoiceConfig,

    /// Escalation policy settings.
    #[serde(default)]
    pub escalation: EscalationConfig,
}

/// Agent identity and conversation-loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Hard cap on tool-calling iterations per batch. Every iteration is a
    /// billed model call.
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: u32,

    /// Override for the built-in system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Reply sent when the tool loop hits the iteration cap without a
    /// final answer.
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            max_tool_iterations: default_max_tool_iterations(),
            system_prompt: None,
            fallback_reply: default_fallback_reply(),
        }
    }
}

fn default_agent_name() -> String {
    "macrodesk".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_tool_iterations() -> u32 {
    5
}

fn default_fallback_reply() -> String {
    "Sorry, I wasn't able to finish looking into that just now. \
     I can connect you with a human agent if you'd like -- just say the word."
        .to_string()
}

/// OpenRouter API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenRouterConfig {
    /// OpenRouter API key. `None` requires the environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier routed through OpenRouter.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens to generate per response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Override for the API base URL (used by tests and proxies).
    #[serde(default)]
    pub api_base: Option<String>,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            api_base: None,
        }
    }
}

fn default_model() -> String {
    "anthropic/claude-sonnet-4.5".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.7
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("macrodesk").join("macrodesk.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("macrodesk.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Inbound message batching configuration.
///
/// A customer's messages are held until no new inbound message has arrived
/// for `window_seconds`, then processed as one batch.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    /// Quiet period before a batch becomes ready, in seconds.
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,

    /// How often the coordinator polls for ready batches, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_window_seconds(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_window_seconds() -> u64 {
    5
}

fn default_poll_interval_ms() -> u64 {
    1000
}

/// Context assembly configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Keep only the most recent N messages in the prompt. `None` means
    /// the full history is included.
    #[serde(default)]
    pub history_limit: Option<i64>,
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Demo identity linking: an unknown phone number links to the customer
    /// holding this email (and vice versa) so one person can be recognized
    /// across channels without real carrier metadata.
    #[serde(default)]
    pub demo_link_email: Option<String>,

    /// See `demo_link_email`.
    #[serde(default)]
    pub demo_link_phone: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            demo_link_email: None,
            demo_link_phone: None,
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8080
}

/// Voice session bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VoiceConfig {
    /// Enable the `/ws/voice` endpoint.
    #[serde(default)]
    pub enabled: bool,

    /// Speech-agent provider API key. `None` requires the environment
    /// variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// WebSocket endpoint of the speech-agent provider.
    #[serde(default = "default_voice_endpoint")]
    pub endpoint: String,

    /// Inbound (microphone) PCM sample rate.
    #[serde(default = "default_input_sample_rate")]
    pub input_sample_rate: u32,

    /// Outbound (TTS) PCM sample rate.
    #[serde(default = "default_output_sample_rate")]
    pub output_sample_rate: u32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            endpoint: default_voice_endpoint(),
            input_sample_rate: default_input_sample_rate(),
            output_sample_rate: default_output_sample_rate(),
        }
    }
}

fn default_voice_endpoint() -> String {
    "wss://agent.deepgram.com/v1/agent/converse".to_string()
}

fn default_input_sample_rate() -> u32 {
    16_000
}

fn default_output_sample_rate() -> u32 {
    24_000
}

/// Escalation policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EscalationConfig {
    /// Refunds above this amount force escalation to a human. Integer cents.
    #[serde(default = "default_refund_limit_cents")]
    pub refund_limit_cents: i64,

    /// Keywords that force escalation when present in a refund reason or
    /// escalation request.
    #[serde(default = "default_fraud_keywords")]
    pub fraud_keywords: Vec<String>,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            refund_limit_cents: default_refund_limit_cents(),
            fraud_keywords: default_fraud_keywords(),
        }
    }
}

fn default_refund_limit_cents() -> i64 {
    50_000
}

fn default_fraud_keywords() -> Vec<String> {
    ["fraud", "chargeback", "dispute", "unauthorized", "stolen"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = MacrodeskConfig::default();
        assert_eq!(config.agent.name, "macrodesk");
        assert_eq!(config.agent.max_tool_iterations, 5);
        assert_eq!(config.batch.window_seconds, 5);
        assert_eq!(config.batch.poll_interval_ms, 1000);
        assert_eq!(config.escalation.refund_limit_cents, 50_000);
        assert!(config.context.history_limit.is_none());
        assert!(!config.voice.enabled);
    }

    #[test]
    fn toml_round_trip_preserves_sections() {
        let config = MacrodeskConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: MacrodeskConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.openrouter.model, config.openrouter.model);
        assert_eq!(parsed.gateway.port, config.gateway.port);
    }

    #[test]
    fn unknown_section_key_is_rejected() {
        let result: Result<AgentConfig, _> =
            toml::from_str("name = \"x\"\nnot_a_real_key = true\n");
        assert!(result.is_err());
    }

    #[test]
    fn fraud_keywords_default_nonempty() {
        let config = EscalationConfig::default();
        assert!(config.fraud_keywords.iter().any(|k| k == "chargeback"));
    }
}
