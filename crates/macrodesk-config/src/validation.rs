// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values that type
//! checking alone cannot enforce.

use crate::diagnostic::ConfigError;
use crate::model::MacrodeskConfig;

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
///
/// Returns all violations at once rather than stopping at the first.
pub fn validate_config(config: &MacrodeskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !VALID_LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "agent.log_level must be one of {}, got `{}`",
                VALID_LOG_LEVELS.join(", "),
                config.agent.log_level
            ),
        });
    }

    if config.agent.max_tool_iterations == 0 {
        errors.push(ConfigError::Validation {
            message: "agent.max_tool_iterations must be at least 1 \
                      (the iteration cap is the only safeguard against runaway model calls)"
                .to_string(),
        });
    }

    if config.batch.window_seconds == 0 {
        errors.push(ConfigError::Validation {
            message: "batch.window_seconds must be at least 1".to_string(),
        });
    }

    if config.batch.poll_interval_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "batch.poll_interval_ms must be at least 1".to_string(),
        });
    }

    if config.escalation.refund_limit_cents < 0 {
        errors.push(ConfigError::Validation {
            message: "escalation.refund_limit_cents must not be negative".to_string(),
        });
    }

    if config.voice.enabled && config.voice.endpoint.is_empty() {
        errors.push(ConfigError::Validation {
            message: "voice.endpoint is required when voice.enabled = true".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
