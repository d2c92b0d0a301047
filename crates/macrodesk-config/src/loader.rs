// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./macrodesk.toml` > `~/.config/macrodesk/macrodesk.toml`
//! > `/etc/macrodesk/macrodesk.toml` with environment variable overrides via
//! the `MACRODESK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::MacrodeskConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/macrodesk/macrodesk.toml` (system-wide)
/// 3. `~/.config/macrodesk/macrodesk.toml` (user XDG config)
/// 4. `./macrodesk.toml` (local directory)
/// 5. `MACRODESK_*` environment variables
pub fn load_config() -> Result<MacrodeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MacrodeskConfig::default()))
        .merge(Toml::file("/etc/macrodesk/macrodesk.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("macrodesk/macrodesk.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("macrodesk.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<MacrodeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MacrodeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MacrodeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MacrodeskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `MACRODESK_OPENROUTER_API_KEY` must map
/// to `openrouter.api_key`, not `openrouter.api.key`.
fn env_provider() -> Env {
    Env::prefixed("MACRODESK_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("openrouter_", "openrouter.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("batch_", "batch.", 1)
            .replacen("context_", "context.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("voice_", "voice.", 1)
            .replacen("escalation_", "escalation.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_str_applies_overrides() {
        let config = load_config_from_str(
            r#"
            [agent]
            max_tool_iterations = 3

            [batch]
            window_seconds = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.agent.max_tool_iterations, 3);
        assert_eq!(config.batch.window_seconds, 10);
        // Untouched sections keep their defaults.
        assert_eq!(config.batch.poll_interval_ms, 1000);
        assert_eq!(config.openrouter.model, "anthropic/claude-sonnet-4.5");
    }

    #[test]
    fn load_from_str_empty_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.agent.name, "macrodesk");
    }

    #[test]
    fn load_from_str_rejects_unknown_keys() {
        let result = load_config_from_str(
            r#"
            [agent]
            max_tool_iteratoins = 3
            "#,
        );
        assert!(result.is_err());
    }
}
